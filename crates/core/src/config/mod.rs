/*
 * Licensed to the Apache Software Foundation (ASF) under one
 * or more contributor license agreements.  See the NOTICE file
 * distributed with this work for additional information
 * regarding copyright ownership.  The ASF licenses this file
 * to you under the Apache License, Version 2.0 (the
 * "License"); you may not use this file except in compliance
 * with the License.  You may obtain a copy of the License at
 *
 *   http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing,
 * software distributed under the License is distributed on an
 * "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
 * KIND, either express or implied.  See the License for the
 * specific language governing permissions and limitations
 * under the License.
 */
//! String-keyed configuration with typed parsers.
use std::any::type_name;
use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{anyhow, Result};

pub mod scan;

pub trait ConfigParser: AsRef<str> {
    type Output;

    fn default_value(&self) -> Option<Self::Output>;

    fn is_required(&self) -> bool {
        false
    }

    /// Absent optional configs are valid; present ones must parse.
    fn validate(&self, configs: &HashMap<String, String>) -> Result<()> {
        if !configs.contains_key(self.as_ref()) {
            if self.is_required() {
                return Err(anyhow!("Config '{}' not found", self.as_ref()));
            }
            return Ok(());
        }
        self.parse_value(configs).map(|_| ())
    }

    fn parse_value(&self, configs: &HashMap<String, String>) -> Result<Self::Output>;

    fn parse_value_or_default(&self, configs: &HashMap<String, String>) -> Result<Self::Output> {
        match self.parse_value(configs) {
            Ok(value) => Ok(value),
            Err(e) => self.default_value().ok_or(e),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigValue {
    UInteger(usize),
    String(String),
}

impl ConfigValue {
    pub fn to<T: TryFrom<ConfigValue, Error = anyhow::Error>>(self) -> Result<T> {
        T::try_from(self)
    }
}

fn cast_error<T>(value: &ConfigValue) -> anyhow::Error {
    anyhow!("Cannot cast {:?} to {}", value, type_name::<T>())
}

impl TryFrom<ConfigValue> for usize {
    type Error = anyhow::Error;

    fn try_from(value: ConfigValue) -> Result<Self> {
        match value {
            ConfigValue::UInteger(v) => Ok(v),
            _ => Err(cast_error::<Self>(&value)),
        }
    }
}

impl TryFrom<ConfigValue> for String {
    type Error = anyhow::Error;

    fn try_from(value: ConfigValue) -> Result<Self> {
        match value {
            ConfigValue::UInteger(v) => Ok(v.to_string()),
            ConfigValue::String(v) => Ok(v),
        }
    }
}

/// Raw configs shared between the components of a scan.
#[derive(Clone, Debug, Default)]
pub struct RiverbedConfigs {
    pub raw_configs: Arc<HashMap<String, String>>,
}

impl RiverbedConfigs {
    pub fn new<I, K, V>(raw_configs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            raw_configs: Arc::new(
                raw_configs
                    .into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn validate(&self, parser: impl ConfigParser<Output = ConfigValue>) -> Result<()> {
        parser.validate(&self.raw_configs)
    }

    pub fn get(&self, parser: impl ConfigParser<Output = ConfigValue>) -> Result<ConfigValue> {
        parser.parse_value(&self.raw_configs)
    }

    pub fn get_or_default(
        &self,
        parser: impl ConfigParser<Output = ConfigValue>,
    ) -> Result<ConfigValue> {
        parser.parse_value_or_default(&self.raw_configs)
    }

    pub fn try_get(&self, parser: impl ConfigParser<Output = ConfigValue>) -> Option<ConfigValue> {
        match parser.parse_value(&self.raw_configs) {
            Ok(v) => Some(v),
            Err(_) => parser.default_value(),
        }
    }
}
