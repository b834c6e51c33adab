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
use std::collections::{HashMap, HashSet};

use crate::hfile::{CellRef, CellType};

/// Why a put is hidden, if it is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum DeleteResult {
    NotDeleted,
    /// Covered by a family tombstone at or after its timestamp
    FamilyDeleted,
    /// Covered by a column tombstone at or after its timestamp
    ColumnDeleted,
    /// Its exact version was deleted
    VersionDeleted,
}

/// Tombstones seen so far within one row.
///
/// Tombstones sort before the puts they cover, so feeding every cell of a
/// row in order is enough to decide each put.
#[derive(Debug, Default)]
pub struct DeleteTracker {
    family_ts: Option<u64>,
    column_ts: HashMap<Vec<u8>, u64>,
    version_ts: HashMap<Vec<u8>, HashSet<u64>>,
}

impl DeleteTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget every tombstone. Called when the row changes.
    pub fn reset(&mut self) {
        self.family_ts = None;
        self.column_ts.clear();
        self.version_ts.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.family_ts.is_none() && self.column_ts.is_empty() && self.version_ts.is_empty()
    }

    /// Record a tombstone. Puts are ignored.
    pub fn add(&mut self, cell: &CellRef<'_>) {
        match cell.cell_type {
            CellType::Put => {}
            CellType::DeleteFamily => {
                let ts = self.family_ts.map_or(cell.timestamp, |ts| ts.max(cell.timestamp));
                self.family_ts = Some(ts);
            }
            CellType::DeleteColumn => {
                let ts = self.column_ts.entry(cell.qualifier.to_vec()).or_insert(cell.timestamp);
                *ts = (*ts).max(cell.timestamp);
            }
            CellType::Delete => {
                self.version_ts
                    .entry(cell.qualifier.to_vec())
                    .or_default()
                    .insert(cell.timestamp);
            }
        }
    }

    /// Check a put against the family, column and version tombstones, in
    /// that order.
    pub fn is_deleted(&self, cell: &CellRef<'_>) -> DeleteResult {
        if self.family_ts.is_some_and(|ts| cell.timestamp <= ts) {
            return DeleteResult::FamilyDeleted;
        }
        if self
            .column_ts
            .get(cell.qualifier)
            .is_some_and(|ts| cell.timestamp <= *ts)
        {
            return DeleteResult::ColumnDeleted;
        }
        if self
            .version_ts
            .get(cell.qualifier)
            .is_some_and(|versions| versions.contains(&cell.timestamp))
        {
            return DeleteResult::VersionDeleted;
        }
        DeleteResult::NotDeleted
    }
}
