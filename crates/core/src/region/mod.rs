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
//! Region reads: merging the store files of one column family.
//!
//! A [`RegionScanner`] runs a k-way merge over one [`HFileScanner`] per
//! store file and applies HBase's read path rules: tombstones hide the puts
//! they cover within their row, and at most `max_versions` puts are
//! returned per column.
//!
//! [`HFileScanner`]: crate::hfile::HFileScanner

mod delete_tracker;
mod heap;
mod scanner;
mod store_file;

pub use delete_tracker::{DeleteResult, DeleteTracker};
pub use heap::KeyValueHeap;
pub use scanner::{RegionScanner, ScanOptions};
pub use store_file::{open_store_files, StoreFileRef};
