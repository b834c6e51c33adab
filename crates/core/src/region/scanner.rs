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
use std::collections::HashMap;

use log::{debug, trace};
use strum::IntoEnumIterator;

use crate::config::scan::ScanConfig;
use crate::config::RiverbedConfigs;
use crate::hfile::key::row_key;
use crate::hfile::{Cell, CellRef, HFileError, HFileReader, HFileScanner, Result};
use crate::region::delete_tracker::{DeleteResult, DeleteTracker};
use crate::region::heap::KeyValueHeap;
use crate::storage::ByteSource;

/// Row range and version limit of a region scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanOptions {
    /// Versions returned per column; 0 returns every visible version
    pub max_versions: usize,
    /// First row, inclusive; empty starts at the first row
    pub start_row: Vec<u8>,
    /// Row to stop at, exclusive; empty scans to the end
    pub stop_row: Vec<u8>,
}

impl ScanOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_configs(configs: &RiverbedConfigs) -> anyhow::Result<Self> {
        for config in ScanConfig::iter() {
            configs.validate(config)?;
        }
        Ok(Self {
            max_versions: configs.get_or_default(ScanConfig::MaxVersions)?.to()?,
            start_row: configs
                .get_or_default(ScanConfig::StartRow)?
                .to::<String>()?
                .into_bytes(),
            stop_row: configs
                .get_or_default(ScanConfig::StopRow)?
                .to::<String>()?
                .into_bytes(),
        })
    }

    pub fn with_max_versions(mut self, max_versions: usize) -> Self {
        self.max_versions = max_versions;
        self
    }

    pub fn with_start_row(mut self, row: impl Into<Vec<u8>>) -> Self {
        self.start_row = row.into();
        self
    }

    pub fn with_stop_row(mut self, row: impl Into<Vec<u8>>) -> Self {
        self.stop_row = row.into();
        self
    }

    fn is_past_stop(&self, row: &[u8]) -> bool {
        !self.stop_row.is_empty() && row >= self.stop_row.as_slice()
    }
}

/// Tombstones and version counts of the row being scanned.
#[derive(Debug, Default)]
struct RowState {
    row: Vec<u8>,
    deletes: DeleteTracker,
    versions: HashMap<Vec<u8>, usize>,
}

impl RowState {
    /// Whether `cell` is visible. Tombstones are recorded and never visible.
    fn admit(&mut self, cell: &CellRef<'_>, max_versions: usize) -> bool {
        if self.row != cell.row {
            self.row.clear();
            self.row.extend_from_slice(cell.row);
            self.deletes.reset();
            self.versions.clear();
        }

        if cell.cell_type.is_delete() {
            self.deletes.add(cell);
            return false;
        }

        let deleted = self.deletes.is_deleted(cell);
        if deleted != DeleteResult::NotDeleted {
            trace!(
                "Put {:?}/{:?} at {} hidden: {}",
                String::from_utf8_lossy(cell.row),
                String::from_utf8_lossy(cell.qualifier),
                cell.timestamp,
                deleted
            );
            return false;
        }

        if max_versions > 0 {
            let count = self.versions.entry(cell.qualifier.to_vec()).or_insert(0);
            if *count >= max_versions {
                return false;
            }
            *count += 1;
        }
        true
    }
}

/// Merges the store files of one region and column family into a single
/// ordered stream of visible cells.
///
/// Scanners must be given newest file first: when two files hold the same
/// cell key, the newer file's cell comes out first.
pub struct RegionScanner<'a, S: ByteSource> {
    heap: KeyValueHeap<'a, S>,
    options: ScanOptions,
    row_state: RowState,
    /// Error that ended the merge, returned once the cells before it are out
    pending_error: Option<HFileError>,
    done: bool,
    failed: bool,
}

impl<'a, S: ByteSource> RegionScanner<'a, S> {
    pub fn new(scanners: Vec<HFileScanner<'a, S>>, options: ScanOptions) -> Result<Self> {
        let files = scanners.len();
        let seek_key = (!options.start_row.is_empty()).then(|| row_key(&options.start_row));
        let heap = KeyValueHeap::new(scanners, seek_key.as_deref())?;
        debug!(
            "Region scan over {} files, {} with cells in range, max versions {}",
            files,
            heap.len(),
            options.max_versions
        );
        Ok(Self {
            heap,
            options,
            row_state: RowState::default(),
            pending_error: None,
            done: false,
            failed: false,
        })
    }

    /// Scan the given readers, newest file first.
    pub fn open(readers: &'a [HFileReader<S>], options: ScanOptions) -> Result<Self> {
        Self::new(readers.iter().map(HFileReader::scanner).collect(), options)
    }

    /// Visible cells of `row`, skipping files whose bloom filter rules the
    /// row out.
    pub fn get_row(
        readers: &'a [HFileReader<S>],
        row: &[u8],
        max_versions: usize,
    ) -> Result<Vec<Cell>> {
        let mut scanners = Vec::with_capacity(readers.len());
        for reader in readers {
            if reader.may_contain_row(row)? {
                scanners.push(reader.scanner());
            }
        }
        debug!(
            "Row lookup reads {} of {} files",
            scanners.len(),
            readers.len()
        );

        let mut stop_row = row.to_vec();
        stop_row.push(0);
        let options = ScanOptions {
            max_versions,
            start_row: row.to_vec(),
            stop_row,
        };
        Self::new(scanners, options)?.collect()
    }

    /// The next visible cell, or `None` at the end of the scan.
    pub fn next_cell(&mut self) -> Result<Option<Cell>> {
        if self.failed {
            return Err(HFileError::CursorFailed);
        }
        if self.done {
            return Ok(None);
        }
        loop {
            let Some(cell) = self.heap.peek() else {
                return match self.pending_error.take() {
                    Some(e) => {
                        self.failed = true;
                        Err(e)
                    }
                    None => {
                        self.done = true;
                        Ok(None)
                    }
                };
            };
            if self.options.is_past_stop(cell.row) {
                self.done = true;
                return Ok(None);
            }

            let visible = self
                .row_state
                .admit(&cell, self.options.max_versions)
                .then(|| cell.to_cell());
            if let Err(e) = self.heap.advance() {
                self.pending_error = Some(e);
            }
            if visible.is_some() {
                return Ok(visible);
            }
        }
    }
}

impl<S: ByteSource> Iterator for RegionScanner<'_, S> {
    type Item = Result<Cell>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        self.next_cell().transpose()
    }
}
