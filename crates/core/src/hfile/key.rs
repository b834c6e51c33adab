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
//! Serialized cell keys and their ordering.
//!
//! A full key is laid out as
//! `rowLen(2) row famLen(1) family qualifier timestamp(8) type(1)`.
//! Seek targets may also be prefixes of that layout: `rowLen(2) row` or
//! `rowLen(2) row famLen(1) family`. A prefix sorts before every full key
//! that shares it. A qualifier cannot end a raw prefix, since its bytes are
//! indistinguishable from a shorter qualifier followed by a timestamp; column
//! targets go through [`SeekKey::RowColumn`].

use std::borrow::Cow;
use std::cmp::Ordering;

/// Size of the row length prefix
pub const ROW_LENGTH_SIZE: usize = 2;
/// Size of the family length prefix
pub const FAMILY_LENGTH_SIZE: usize = 1;
/// Size of the timestamp and type suffix
pub const TIMESTAMP_TYPE_SIZE: usize = 9;
/// Smallest possible full key: empty row, family and qualifier
pub const MIN_FULL_KEY_SIZE: usize = ROW_LENGTH_SIZE + FAMILY_LENGTH_SIZE + TIMESTAMP_TYPE_SIZE;

/// Type byte sorting before every real cell type.
pub const TYPE_MAXIMUM: u8 = 255;
/// Type byte marking the "last on row" fake key.
pub const TYPE_MINIMUM: u8 = 0;
/// Newest possible timestamp.
pub const LATEST_TIMESTAMP: u64 = i64::MAX as u64;

/// Target of [`HFileScanner::seek`](crate::hfile::HFileScanner::seek).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekKey<'a> {
    /// Before every cell of a row
    Row(&'a [u8]),
    /// Before every cell of a row in one family
    RowFamily(&'a [u8], &'a [u8]),
    /// Before every version of one column: row, family and qualifier
    RowColumn(&'a [u8], &'a [u8], &'a [u8]),
    /// A serialized full key, or a row or row and family prefix
    Key(&'a [u8]),
}

impl SeekKey<'_> {
    /// The serialized key the scanner compares cells against.
    pub fn to_key(&self) -> Cow<'_, [u8]> {
        match *self {
            Self::Row(row) => Cow::Owned(row_key(row)),
            Self::RowFamily(row, family) => Cow::Owned(row_family_key(row, family)),
            Self::RowColumn(row, family, qualifier) => {
                Cow::Owned(row_column_key(row, family, qualifier))
            }
            Self::Key(key) => Cow::Borrowed(key),
        }
    }
}

impl<'a> From<&'a [u8]> for SeekKey<'a> {
    fn from(key: &'a [u8]) -> Self {
        Self::Key(key)
    }
}

impl<'a> From<&'a Vec<u8>> for SeekKey<'a> {
    fn from(key: &'a Vec<u8>) -> Self {
        Self::Key(key)
    }
}

/// The components of a serialized key. Missing trailing components mean the
/// key is a prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyParts<'a> {
    pub row: &'a [u8],
    pub family: Option<&'a [u8]>,
    pub qualifier: Option<&'a [u8]>,
    pub timestamp: Option<u64>,
    pub type_byte: Option<u8>,
}

impl KeyParts<'_> {
    /// HBase's fake "last on row" key: no column and the minimum type.
    fn is_last_on_row(&self) -> bool {
        self.family.map_or(true, |f| f.is_empty())
            && self.qualifier.map_or(true, |q| q.is_empty())
            && self.type_byte == Some(TYPE_MINIMUM)
    }
}

/// Split a serialized key into its components.
///
/// Never fails: lengths running past the end of the key are clamped, so that
/// keys read from damaged index blocks still compare deterministically.
pub fn split_key(key: &[u8]) -> KeyParts<'_> {
    let mut parts = KeyParts {
        row: &[],
        family: None,
        qualifier: None,
        timestamp: None,
        type_byte: None,
    };
    if key.len() < ROW_LENGTH_SIZE {
        return parts;
    }

    let row_len = u16::from_be_bytes([key[0], key[1]]) as usize;
    let row_end = (ROW_LENGTH_SIZE + row_len).min(key.len());
    parts.row = &key[ROW_LENGTH_SIZE..row_end];
    if row_end == key.len() {
        return parts;
    }

    let family_len = key[row_end] as usize;
    let family_start = row_end + FAMILY_LENGTH_SIZE;
    let family_end = (family_start + family_len).min(key.len());
    parts.family = Some(&key[family_start..family_end]);
    if family_end == key.len() {
        return parts;
    }

    let rest = &key[family_end..];
    if rest.len() < TIMESTAMP_TYPE_SIZE {
        parts.qualifier = Some(rest);
        return parts;
    }
    let qualifier_end = rest.len() - TIMESTAMP_TYPE_SIZE;
    parts.qualifier = Some(&rest[..qualifier_end]);
    let mut ts = [0u8; 8];
    ts.copy_from_slice(&rest[qualifier_end..qualifier_end + 8]);
    parts.timestamp = Some(u64::from_be_bytes(ts));
    parts.type_byte = Some(rest[rest.len() - 1]);
    parts
}

/// Compare two serialized keys, either of which may be a prefix.
pub fn compare_keys(left: &[u8], right: &[u8]) -> Ordering {
    compare_key_parts(&split_key(left), &split_key(right))
}

/// Compare split keys: row, then family and qualifier ascending, then
/// timestamp and type descending.
pub fn compare_key_parts(left: &KeyParts<'_>, right: &KeyParts<'_>) -> Ordering {
    let ord = left.row.cmp(right.row);
    if ord != Ordering::Equal {
        return ord;
    }

    match (left.is_last_on_row(), right.is_last_on_row()) {
        (true, false) => return Ordering::Greater,
        (false, true) => return Ordering::Less,
        _ => {}
    }

    left.family
        .cmp(&right.family)
        .then_with(|| left.qualifier.cmp(&right.qualifier))
        .then_with(|| descending(left.timestamp, right.timestamp))
        .then_with(|| descending(left.type_byte, right.type_byte))
}

/// Descending order where an absent value (a prefix) sorts first.
fn descending<T: Ord>(left: Option<T>, right: Option<T>) -> Ordering {
    match (left, right) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(l), Some(r)) => r.cmp(&l),
    }
}

/// Serialize a full key.
///
/// Rows longer than `u16::MAX` bytes and families longer than `u8::MAX`
/// bytes cannot be represented and are cut to those lengths.
pub fn encode_key(
    row: &[u8],
    family: &[u8],
    qualifier: &[u8],
    timestamp: u64,
    type_byte: u8,
) -> Vec<u8> {
    let mut key = row_family_prefix(row, Some(family), qualifier.len() + TIMESTAMP_TYPE_SIZE);
    key.extend_from_slice(qualifier);
    key.extend_from_slice(&timestamp.to_be_bytes());
    key.push(type_byte);
    key
}

/// Seek key positioned before every cell of `row`.
pub fn row_key(row: &[u8]) -> Vec<u8> {
    row_family_prefix(row, None, 0)
}

/// Seek key positioned before every cell of `row` in `family`.
pub fn row_family_key(row: &[u8], family: &[u8]) -> Vec<u8> {
    row_family_prefix(row, Some(family), 0)
}

/// Seek key positioned before every version of one column.
pub fn row_column_key(row: &[u8], family: &[u8], qualifier: &[u8]) -> Vec<u8> {
    encode_key(row, family, qualifier, LATEST_TIMESTAMP, TYPE_MAXIMUM)
}

/// Key sorting after every cell of `row`.
pub fn last_on_row_key(row: &[u8]) -> Vec<u8> {
    encode_key(row, &[], &[], 0, TYPE_MINIMUM)
}

fn row_family_prefix(row: &[u8], family: Option<&[u8]>, extra: usize) -> Vec<u8> {
    let row = &row[..row.len().min(u16::MAX as usize)];
    let family = family.map(|f| &f[..f.len().min(u8::MAX as usize)]);
    let mut key = Vec::with_capacity(
        ROW_LENGTH_SIZE + row.len() + family.map_or(0, |f| f.len() + FAMILY_LENGTH_SIZE) + extra,
    );
    key.extend_from_slice(&(row.len() as u16).to_be_bytes());
    key.extend_from_slice(row);
    if let Some(family) = family {
        key.push(family.len() as u8);
        key.extend_from_slice(family);
    }
    key
}
