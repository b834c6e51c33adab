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
//! Native reads of HBase store files.
//!
//! - [`hfile`] opens HFile v3 files and scans or seeks their cells.
//! - [`region`] merges the store files of a column family into the cells a
//!   client would read, with deletes and version limits applied.
//! - [`storage`] provides the byte sources files are read from.
//! - [`config`] holds string-keyed scan configurations.

pub mod config;
pub mod hfile;
pub mod region;
pub mod storage;

pub use hfile::{Cell, CellType, HFileError, HFileReader, HFileScanner};
pub use region::{RegionScanner, ScanOptions};
