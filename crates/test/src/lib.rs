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
//! Fixtures for riverbed tests: an HFile v3 writer and cell recipes.
//!
//! The writer produces files the way an HBase region server lays them out,
//! with knobs for every codec, checksum and encoding the reader supports.

use std::cmp::Ordering;

use strum_macros::EnumIter;

mod builder;
mod encode;

pub use builder::{BloomOptions, FileLayout, HFileBuilder};
pub use recipe::CellRecipe;

/// Compression codecs the writer can apply to blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, EnumIter)]
pub enum Codec {
    #[default]
    None,
    Gzip,
    /// Snappy inside Hadoop block compressor framing
    Snappy,
    /// ZSTD inside Hadoop block compressor framing
    Zstd,
    /// ZSTD as a bare frame, as written by the native codec
    ZstdRaw,
}

impl Codec {
    /// Codec id stored in the trailer.
    pub fn id(&self) -> u32 {
        match self {
            Codec::Gzip => 1,
            Codec::None => 2,
            Codec::Snappy => 3,
            Codec::Zstd | Codec::ZstdRaw => 6,
        }
    }
}

/// Block checksum algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, EnumIter)]
pub enum Checksum {
    Null,
    Crc32,
    #[default]
    Crc32C,
}

impl Checksum {
    pub fn id(&self) -> u8 {
        match self {
            Checksum::Null => 0,
            Checksum::Crc32 => 1,
            Checksum::Crc32C => 2,
        }
    }
}

/// Data block encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, EnumIter)]
pub enum Encoding {
    #[default]
    None,
    FastDiff,
}

impl Encoding {
    pub fn id(&self) -> u16 {
        match self {
            Encoding::None => 0,
            Encoding::FastDiff => 4,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Encoding::None => "NONE",
            Encoding::FastDiff => "FAST_DIFF",
        }
    }
}

/// Hash functions of the bloom filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, EnumIter)]
pub enum BloomHash {
    Jenkins,
    #[default]
    Murmur,
    Murmur3,
}

impl BloomHash {
    pub fn id(&self) -> u32 {
        match self {
            BloomHash::Jenkins => 0,
            BloomHash::Murmur => 1,
            BloomHash::Murmur3 => 2,
        }
    }
}

/// Keys a bloom filter is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, EnumIter)]
pub enum BloomKind {
    #[default]
    Row,
    RowCol,
}

impl BloomKind {
    pub fn name(&self) -> &'static str {
        match self {
            BloomKind::Row => "ROW",
            BloomKind::RowCol => "ROWCOL",
        }
    }
}

/// Cell types and their type bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter)]
pub enum CellKind {
    Put = 4,
    Delete = 8,
    DeleteColumn = 12,
    DeleteFamily = 14,
}

impl CellKind {
    pub fn code(&self) -> u8 {
        *self as u8
    }

    pub fn is_delete(&self) -> bool {
        *self != CellKind::Put
    }
}

/// A cell to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCell {
    pub row: Vec<u8>,
    pub family: Vec<u8>,
    pub qualifier: Vec<u8>,
    pub timestamp: u64,
    pub kind: CellKind,
    pub value: Vec<u8>,
    /// Written only by files that include tags
    pub tags: Vec<u8>,
    /// Written only by files that include memstore timestamps
    pub sequence_id: u64,
}

impl TestCell {
    pub fn new(
        row: impl Into<Vec<u8>>,
        family: impl Into<Vec<u8>>,
        qualifier: impl Into<Vec<u8>>,
        timestamp: u64,
        kind: CellKind,
        value: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            row: row.into(),
            family: family.into(),
            qualifier: qualifier.into(),
            timestamp,
            kind,
            value: value.into(),
            tags: Vec::new(),
            sequence_id: 0,
        }
    }

    pub fn put(
        row: impl Into<Vec<u8>>,
        family: impl Into<Vec<u8>>,
        qualifier: impl Into<Vec<u8>>,
        timestamp: u64,
        value: impl Into<Vec<u8>>,
    ) -> Self {
        Self::new(row, family, qualifier, timestamp, CellKind::Put, value)
    }

    /// Tombstone for one version of a column.
    pub fn delete(
        row: impl Into<Vec<u8>>,
        family: impl Into<Vec<u8>>,
        qualifier: impl Into<Vec<u8>>,
        timestamp: u64,
    ) -> Self {
        Self::new(row, family, qualifier, timestamp, CellKind::Delete, "")
    }

    /// Tombstone for every version of a column up to `timestamp`.
    pub fn delete_column(
        row: impl Into<Vec<u8>>,
        family: impl Into<Vec<u8>>,
        qualifier: impl Into<Vec<u8>>,
        timestamp: u64,
    ) -> Self {
        Self::new(row, family, qualifier, timestamp, CellKind::DeleteColumn, "")
    }

    /// Tombstone for the whole row up to `timestamp`.
    pub fn delete_family(
        row: impl Into<Vec<u8>>,
        family: impl Into<Vec<u8>>,
        timestamp: u64,
    ) -> Self {
        Self::new(row, family, "", timestamp, CellKind::DeleteFamily, "")
    }

    pub fn with_tags(mut self, tags: impl Into<Vec<u8>>) -> Self {
        self.tags = tags.into();
        self
    }

    pub fn with_sequence_id(mut self, sequence_id: u64) -> Self {
        self.sequence_id = sequence_id;
        self
    }

    /// Serialized key: row, family, qualifier, timestamp and type.
    pub fn key(&self) -> Vec<u8> {
        let mut key = Vec::with_capacity(
            2 + self.row.len() + 1 + self.family.len() + self.qualifier.len() + 9,
        );
        key.extend_from_slice(&(self.row.len() as u16).to_be_bytes());
        key.extend_from_slice(&self.row);
        key.push(self.family.len() as u8);
        key.extend_from_slice(&self.family);
        key.extend_from_slice(&self.qualifier);
        key.extend_from_slice(&self.timestamp.to_be_bytes());
        key.push(self.kind.code());
        key
    }

    /// HBase cell order: row, family and qualifier ascending, then newest
    /// timestamp and highest type first.
    pub fn compare(&self, other: &TestCell) -> Ordering {
        self.row
            .cmp(&other.row)
            .then_with(|| self.family.cmp(&other.family))
            .then_with(|| self.qualifier.cmp(&other.qualifier))
            .then_with(|| other.timestamp.cmp(&self.timestamp))
            .then_with(|| other.kind.code().cmp(&self.kind.code()))
    }
}

/// Sort cells in file order, keeping the input order of equal keys.
pub fn sort_cells(cells: &mut [TestCell]) {
    cells.sort_by(TestCell::compare);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_layout() {
        let key = TestCell::put("r", "cf", "q", 1, "v").key();
        assert_eq!(
            key,
            vec![0, 1, b'r', 2, b'c', b'f', b'q', 0, 0, 0, 0, 0, 0, 0, 1, 4]
        );
    }

    #[test]
    fn test_sort_order() {
        let mut cells = vec![
            TestCell::put("b", "cf", "q", 1, ""),
            TestCell::put("a", "cf", "q", 1, ""),
            TestCell::put("a", "cf", "q", 2, ""),
            TestCell::delete_column("a", "cf", "q", 1),
            TestCell::delete_family("a", "cf", 5),
        ];
        sort_cells(&mut cells);
        let order: Vec<(u8, u64, CellKind)> = cells
            .iter()
            .map(|c| (c.row[0], c.timestamp, c.kind))
            .collect();
        assert_eq!(
            order,
            vec![
                (b'a', 5, CellKind::DeleteFamily),
                (b'a', 2, CellKind::Put),
                (b'a', 1, CellKind::DeleteColumn),
                (b'a', 1, CellKind::Put),
                (b'b', 1, CellKind::Put),
            ]
        );
    }
}
