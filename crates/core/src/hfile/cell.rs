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
//! Cells stored in HFile data blocks.
//!
//! A canonical cell record is laid out as
//! `keyLen(4) valueLen(4) key value [tagsLen(2) tags] [memstoreTS vlong]`,
//! where the optional parts are present when the file says so.

use std::cmp::Ordering;
use std::fmt;

use crate::hfile::error::{read_u16_at, read_u32_at, slice_at, HFileError, Result};
use crate::hfile::key::{
    encode_key, FAMILY_LENGTH_SIZE, MIN_FULL_KEY_SIZE, ROW_LENGTH_SIZE, TIMESTAMP_TYPE_SIZE,
};
use crate::hfile::vint::read_vlong;

/// Key offset after key length (int32) and value length (int32)
pub const KEY_VALUE_HEADER_SIZE: usize = 8;

/// Size of the tags length prefix
const TAGS_LENGTH_SIZE: usize = 2;

/// Kind of a cell: a value or one of the tombstones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum_macros::Display)]
pub enum CellType {
    Put = 4,
    Delete = 8,
    DeleteColumn = 12,
    DeleteFamily = 14,
}

impl CellType {
    pub fn from_code(code: u8) -> Result<Self> {
        match code {
            4 => Ok(CellType::Put),
            8 => Ok(CellType::Delete),
            12 => Ok(CellType::DeleteColumn),
            14 => Ok(CellType::DeleteFamily),
            _ => Err(HFileError::InvalidFormat(format!("Unknown cell type {code}"))),
        }
    }

    pub fn code(&self) -> u8 {
        *self as u8
    }

    pub fn is_delete(&self) -> bool {
        *self != CellType::Put
    }
}

/// Which optional trailing fields each cell record carries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CellFormat {
    pub include_tags: bool,
    pub include_mvcc: bool,
}

/// Validated offsets of one cell record inside a data block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellLayout {
    key_offset: usize,
    key_len: usize,
    row_len: usize,
    family_len: usize,
    value_len: usize,
    tags: Option<(usize, usize)>,
    timestamp: u64,
    cell_type: CellType,
    sequence_id: u64,
    record_len: usize,
}

impl CellLayout {
    /// Parse the record starting at `offset`, checking every length against
    /// the block.
    pub fn parse(data: &[u8], offset: usize, format: CellFormat) -> Result<Self> {
        let key_len = read_u32_at(data, offset, "cell key length")? as usize;
        let value_len = read_u32_at(data, offset + 4, "cell value length")? as usize;
        if key_len > i32::MAX as usize || value_len > i32::MAX as usize {
            return Err(HFileError::InvalidFormat(format!(
                "Negative cell length at offset {offset}"
            )));
        }

        let key_offset = offset + KEY_VALUE_HEADER_SIZE;
        let key = slice_at(data, key_offset, key_len, "cell key")?;
        slice_at(data, key_offset + key_len, value_len, "cell value")?;
        if key_len < MIN_FULL_KEY_SIZE {
            return Err(HFileError::InvalidFormat(format!(
                "Cell key of {key_len} bytes is shorter than {MIN_FULL_KEY_SIZE}"
            )));
        }

        let row_len = u16::from_be_bytes([key[0], key[1]]) as usize;
        let family_len = key
            .get(ROW_LENGTH_SIZE + row_len)
            .map(|b| *b as usize)
            .ok_or_else(|| {
                HFileError::InvalidFormat(format!("Row length {row_len} exceeds cell key"))
            })?;
        if ROW_LENGTH_SIZE + row_len + FAMILY_LENGTH_SIZE + family_len + TIMESTAMP_TYPE_SIZE
            > key_len
        {
            return Err(HFileError::InvalidFormat(format!(
                "Row and family lengths ({row_len}, {family_len}) exceed key of {key_len} bytes"
            )));
        }

        let ts_offset = key_len - TIMESTAMP_TYPE_SIZE;
        let mut ts = [0u8; 8];
        ts.copy_from_slice(&key[ts_offset..ts_offset + 8]);
        let cell_type = CellType::from_code(key[key_len - 1])?;

        let mut pos = key_offset + key_len + value_len;
        let tags = if format.include_tags {
            let tags_len = read_u16_at(data, pos, "cell tags length")? as usize;
            pos += TAGS_LENGTH_SIZE;
            slice_at(data, pos, tags_len, "cell tags")?;
            let tags = (pos, tags_len);
            pos += tags_len;
            Some(tags)
        } else {
            None
        };

        let sequence_id = if format.include_mvcc {
            let (value, consumed) = read_vlong(data, pos)?;
            pos += consumed;
            u64::try_from(value).map_err(|_| {
                HFileError::InvalidFormat(format!("Negative memstore timestamp {value}"))
            })?
        } else {
            0
        };

        Ok(Self {
            key_offset,
            key_len,
            row_len,
            family_len,
            value_len,
            tags,
            timestamp: u64::from_be_bytes(ts),
            cell_type,
            sequence_id,
            record_len: pos - offset,
        })
    }

    /// Total size of the record, including optional fields.
    pub fn record_len(&self) -> usize {
        self.record_len
    }

    /// View the cell within `data`, the block this layout was parsed from.
    ///
    /// # Panics
    /// If `data` is not the block passed to [`CellLayout::parse`].
    pub fn cell<'a>(&self, data: &'a [u8]) -> CellRef<'a> {
        let key = &data[self.key_offset..self.key_offset + self.key_len];
        let row_start = ROW_LENGTH_SIZE;
        let family_start = row_start + self.row_len + FAMILY_LENGTH_SIZE;
        let qualifier_start = family_start + self.family_len;
        let value_start = self.key_offset + self.key_len;
        CellRef {
            key,
            row: &key[row_start..row_start + self.row_len],
            family: &key[family_start..qualifier_start],
            qualifier: &key[qualifier_start..self.key_len - TIMESTAMP_TYPE_SIZE],
            timestamp: self.timestamp,
            cell_type: self.cell_type,
            value: &data[value_start..value_start + self.value_len],
            tags: self.tags.map(|(start, len)| &data[start..start + len]),
            sequence_id: self.sequence_id,
        }
    }
}

/// A cell borrowed from a scanner's current block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRef<'a> {
    /// The full serialized key
    pub key: &'a [u8],
    pub row: &'a [u8],
    pub family: &'a [u8],
    pub qualifier: &'a [u8],
    pub timestamp: u64,
    pub cell_type: CellType,
    pub value: &'a [u8],
    pub tags: Option<&'a [u8]>,
    /// Memstore timestamp, 0 when the file does not record it
    pub sequence_id: u64,
}

impl CellRef<'_> {
    pub fn to_cell(&self) -> Cell {
        Cell {
            row: self.row.to_vec(),
            family: self.family.to_vec(),
            qualifier: self.qualifier.to_vec(),
            timestamp: self.timestamp,
            cell_type: self.cell_type,
            value: self.value.to_vec(),
            tags: self.tags.map(<[u8]>::to_vec),
            sequence_id: self.sequence_id,
        }
    }
}

/// An owned cell.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Cell {
    pub row: Vec<u8>,
    pub family: Vec<u8>,
    pub qualifier: Vec<u8>,
    pub timestamp: u64,
    pub cell_type: CellType,
    pub value: Vec<u8>,
    pub tags: Option<Vec<u8>>,
    pub sequence_id: u64,
}

impl Cell {
    pub fn new(
        row: impl Into<Vec<u8>>,
        family: impl Into<Vec<u8>>,
        qualifier: impl Into<Vec<u8>>,
        timestamp: u64,
        cell_type: CellType,
        value: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            row: row.into(),
            family: family.into(),
            qualifier: qualifier.into(),
            timestamp,
            cell_type,
            value: value.into(),
            tags: None,
            sequence_id: 0,
        }
    }

    /// The serialized key of this cell.
    pub fn key(&self) -> Vec<u8> {
        encode_key(
            &self.row,
            &self.family,
            &self.qualifier,
            self.timestamp,
            self.cell_type.code(),
        )
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}:{}/{}/{}",
            String::from_utf8_lossy(&self.row),
            String::from_utf8_lossy(&self.family),
            String::from_utf8_lossy(&self.qualifier),
            self.timestamp,
            self.cell_type
        )
    }
}

/// Order cells by row, family and qualifier ascending, then timestamp and
/// type descending.
pub fn compare_cells(left: &CellRef<'_>, right: &CellRef<'_>) -> Ordering {
    left.row
        .cmp(right.row)
        .then_with(|| left.family.cmp(right.family))
        .then_with(|| left.qualifier.cmp(right.qualifier))
        .then_with(|| right.timestamp.cmp(&left.timestamp))
        .then_with(|| right.cell_type.code().cmp(&left.cell_type.code()))
}

/// Append a canonical cell record to `out`.
pub fn write_cell_record(
    out: &mut Vec<u8>,
    key: &[u8],
    value: &[u8],
    tags: Option<&[u8]>,
    mvcc_vlong: Option<&[u8]>,
) {
    out.extend_from_slice(&(key.len() as u32).to_be_bytes());
    out.extend_from_slice(&(value.len() as u32).to_be_bytes());
    out.extend_from_slice(key);
    out.extend_from_slice(value);
    if let Some(tags) = tags {
        out.extend_from_slice(&(tags.len() as u16).to_be_bytes());
        out.extend_from_slice(tags);
    }
    if let Some(raw) = mvcc_vlong {
        out.extend_from_slice(raw);
    }
}
