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
use log::debug;

use crate::hfile::{HFileReader, Result};
use crate::storage::SourceProvider;

/// A store file listed for a region and column family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreFileRef {
    pub name: String,
    /// Split references point into a parent region's file and are not read.
    pub is_reference: bool,
}

impl StoreFileRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_reference: false,
        }
    }

    pub fn reference(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_reference: true,
        }
    }
}

/// Open the listed store files, newest first, skipping split references.
pub fn open_store_files<P: SourceProvider>(
    provider: &P,
    files: &[StoreFileRef],
) -> Result<Vec<HFileReader<P::Source>>> {
    files
        .iter()
        .filter(|file| {
            if file.is_reference {
                debug!("Skipping split reference {}", file.name);
            }
            !file.is_reference
        })
        .map(|file| {
            debug!("Opening store file {}", file.name);
            HFileReader::open(provider.open(&file.name)?)
        })
        .collect()
}
