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
//! Configurations of region scans.

use std::collections::HashMap;
use std::str::FromStr;

use anyhow::{anyhow, Result};
use strum_macros::EnumIter;

use crate::config::{ConfigParser, ConfigValue};

/// Configurations for scanning the store files of a region.
///
/// **Example**
///
/// ```rust
/// use riverbed_core::config::scan::ScanConfig::MaxVersions;
/// use riverbed_core::region::ScanOptions;
/// use riverbed_core::config::RiverbedConfigs;
///
/// let configs = RiverbedConfigs::new([(MaxVersions.as_ref(), "3")]);
/// let options = ScanOptions::from_configs(&configs).unwrap();
/// assert_eq!(options.max_versions, 3);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, EnumIter)]
pub enum ScanConfig {
    /// Versions returned per column, newest first; 0 returns all of them
    MaxVersions,

    /// First row of the scan, inclusive; empty starts at the first row
    StartRow,

    /// Row at which the scan stops, exclusive; empty scans to the last row
    StopRow,
}

impl AsRef<str> for ScanConfig {
    fn as_ref(&self) -> &str {
        match self {
            Self::MaxVersions => "riverbed.scan.max.versions",
            Self::StartRow => "riverbed.scan.start.row",
            Self::StopRow => "riverbed.scan.stop.row",
        }
    }
}

impl ConfigParser for ScanConfig {
    type Output = ConfigValue;

    fn default_value(&self) -> Option<ConfigValue> {
        match self {
            Self::MaxVersions => Some(ConfigValue::UInteger(0)),
            Self::StartRow | Self::StopRow => Some(ConfigValue::String(String::new())),
        }
    }

    fn parse_value(&self, configs: &HashMap<String, String>) -> Result<Self::Output> {
        let get_result = configs
            .get(self.as_ref())
            .map(|v| v.as_str())
            .ok_or(anyhow!("Config '{}' not found", self.as_ref()));

        match self {
            Self::MaxVersions => get_result
                .and_then(|v| {
                    usize::from_str(v.trim()).map_err(|e| {
                        anyhow!(
                            "Failed to parse '{}' for config '{}': {}",
                            v,
                            self.as_ref(),
                            e
                        )
                    })
                })
                .map(ConfigValue::UInteger),
            Self::StartRow | Self::StopRow => {
                get_result.map(|v| ConfigValue::String(v.to_string()))
            }
        }
    }
}
