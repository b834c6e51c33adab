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
//! Data block encodings.
//!
//! An encoded data block (`DATABLKE`) starts with the 2-byte encoding id and
//! a 4-byte size of the block once decoded. FAST_DIFF records follow:
//!
//! ```text
//! flag(1) [keyLen cint] [valueLen cint] commonPrefix(cint)
//! key suffix, timestamp suffix, [type(1)] [value]
//! [tagsLen cint, tags] [memstoreTS vlong]
//! ```
//!
//! Decoding rebuilds canonical cell records so the rest of the reader only
//! ever sees one record layout.

use std::mem;
use std::ops::Range;
use std::str::FromStr;

use strum_macros::{AsRefStr, EnumString};

use crate::hfile::cell::{write_cell_record, CellFormat};
use crate::hfile::error::{read_u16_at, read_u32_at, slice_at, HFileError, Result};
use crate::hfile::key::{
    FAMILY_LENGTH_SIZE, MIN_FULL_KEY_SIZE, ROW_LENGTH_SIZE, TIMESTAMP_TYPE_SIZE,
};
use crate::hfile::vint::{decode_vint_size, read_compressed_int, read_vlong};

/// Size of the encoding id plus the decoded size hint.
pub const ENCODED_BLOCK_PREFIX_SIZE: usize = 6;

/// Cap on preallocation from the decoded size hint.
const MAX_PREALLOCATION: usize = 4 * 1024 * 1024;

const MASK_TIMESTAMP_LENGTH: u8 = 0x07;
const FLAG_SAME_KEY_LENGTH: u8 = 0x08;
const FLAG_SAME_VALUE_LENGTH: u8 = 0x10;
const FLAG_SAME_TYPE: u8 = 0x20;
const FLAG_SAME_VALUE: u8 = 0x40;

/// Data block encodings, as named in the `DATA_BLOCK_ENCODING` file info entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, AsRefStr, EnumString)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum DataBlockEncoding {
    #[default]
    None = 0,
    FastDiff = 4,
}

impl DataBlockEncoding {
    pub fn from_name(name: &str) -> Result<Self> {
        Self::from_str(name).map_err(|_| HFileError::UnsupportedEncoding(name.to_string()))
    }

    pub fn from_id(id: u16) -> Result<Self> {
        match id {
            0 => Ok(DataBlockEncoding::None),
            4 => Ok(DataBlockEncoding::FastDiff),
            _ => Err(HFileError::UnsupportedEncoding(format!("id {id}"))),
        }
    }

    pub fn id(&self) -> u16 {
        *self as u16
    }

    /// Decode the payload of an encoded data block into canonical records.
    pub fn decode_block(&self, data: &[u8], format: CellFormat) -> Result<Vec<u8>> {
        let id = read_u16_at(data, 0, "encoded block id")?;
        let encoding = Self::from_id(id)?;
        if encoding != *self {
            return Err(HFileError::InvalidFormat(format!(
                "Encoded block uses {}, file declares {}",
                encoding.as_ref(),
                self.as_ref()
            )));
        }
        let size_hint = read_u32_at(data, 2, "encoded block size")? as usize;
        let records = &data[ENCODED_BLOCK_PREFIX_SIZE..];
        match encoding {
            DataBlockEncoding::None => Ok(records.to_vec()),
            DataBlockEncoding::FastDiff => {
                decode_fast_diff(records, format, size_hint.min(MAX_PREALLOCATION))
            }
        }
    }
}

/// Decoder state carried from one record to the next.
#[derive(Default)]
struct FastDiffState {
    key: Vec<u8>,
    prev_key: Vec<u8>,
    key_len: usize,
    value_len: usize,
    row_len: usize,
    family_len: usize,
    timestamp: [u8; 8],
    type_byte: u8,
    /// Position of the previous value in the output
    prev_value: Range<usize>,
    first: bool,
}

/// Decode FAST_DIFF records into canonical cell records.
pub fn decode_fast_diff(input: &[u8], format: CellFormat, capacity: usize) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(capacity);
    let mut state = FastDiffState {
        first: true,
        ..Default::default()
    };
    let mut pos = 0;
    while pos < input.len() {
        pos = state.decode_record(input, pos, format, &mut out)?;
    }
    Ok(out)
}

fn corrupt(message: String) -> HFileError {
    HFileError::InvalidFormat(format!("FAST_DIFF: {message}"))
}

impl FastDiffState {
    fn decode_record(
        &mut self,
        input: &[u8],
        mut pos: usize,
        format: CellFormat,
        out: &mut Vec<u8>,
    ) -> Result<usize> {
        let flag = input[pos];
        pos += 1;

        if self.first && flag & (FLAG_SAME_KEY_LENGTH | FLAG_SAME_VALUE_LENGTH) != 0 {
            return Err(corrupt("first record refers to a previous cell".to_string()));
        }
        if flag & FLAG_SAME_KEY_LENGTH == 0 {
            let (len, consumed) = read_compressed_int(input, pos)?;
            self.key_len = len as usize;
            pos += consumed;
        }
        if flag & FLAG_SAME_VALUE_LENGTH == 0 {
            let (len, consumed) = read_compressed_int(input, pos)?;
            self.value_len = len as usize;
            pos += consumed;
        }
        let (common, consumed) = read_compressed_int(input, pos)?;
        let common = common as usize;
        pos += consumed;

        mem::swap(&mut self.key, &mut self.prev_key);
        self.key.clear();
        let value = if self.first {
            pos = self.read_first_key(input, pos)?;
            let value = slice_at(input, pos, self.value_len, "FAST_DIFF value")?;
            pos += self.value_len;
            Some(value)
        } else {
            pos = self.read_key(input, pos, flag, common)?;
            if flag & FLAG_SAME_VALUE != 0 {
                if self.prev_value.len() != self.value_len {
                    return Err(corrupt(format!(
                        "same value flag with lengths {} and {}",
                        self.prev_value.len(),
                        self.value_len
                    )));
                }
                None
            } else {
                let value = slice_at(input, pos, self.value_len, "FAST_DIFF value")?;
                pos += self.value_len;
                Some(value)
            }
        };

        let tags = if format.include_tags {
            let (len, consumed) = read_compressed_int(input, pos)?;
            pos += consumed;
            if len > u16::MAX as u32 {
                return Err(corrupt(format!("tags length {len} too large")));
            }
            let tags = slice_at(input, pos, len as usize, "FAST_DIFF tags")?;
            pos += tags.len();
            Some(tags)
        } else {
            None
        };

        let mvcc = if format.include_mvcc {
            let first_byte = *input.get(pos).ok_or_else(|| {
                HFileError::truncated("FAST_DIFF memstore timestamp", pos + 1, input.len())
            })?;
            let size = decode_vint_size(first_byte);
            read_vlong(input, pos)?;
            let raw = &input[pos..pos + size];
            pos += size;
            Some(raw)
        } else {
            None
        };

        let record_start = out.len();
        let value_start = record_start + 8 + self.key.len();
        match value {
            Some(value) => write_cell_record(out, &self.key, value, tags, mvcc),
            None => {
                // The value repeats the previous one, already in the output.
                let prev = self.prev_value.clone();
                out.extend_from_slice(&(self.key.len() as u32).to_be_bytes());
                out.extend_from_slice(&(self.value_len as u32).to_be_bytes());
                out.extend_from_slice(&self.key);
                out.extend_from_within(prev);
                if let Some(tags) = tags {
                    out.extend_from_slice(&(tags.len() as u16).to_be_bytes());
                    out.extend_from_slice(tags);
                }
                if let Some(raw) = mvcc {
                    out.extend_from_slice(raw);
                }
            }
        }
        self.prev_value = value_start..value_start + self.value_len;
        self.first = false;
        Ok(pos)
    }

    /// The first record of a block carries its whole key.
    fn read_first_key(&mut self, input: &[u8], pos: usize) -> Result<usize> {
        let key = slice_at(input, pos, self.key_len, "FAST_DIFF key")?;
        if key.len() < MIN_FULL_KEY_SIZE {
            return Err(corrupt(format!("key of {} bytes too short", key.len())));
        }
        let row_len = u16::from_be_bytes([key[0], key[1]]) as usize;
        let family_len = *key
            .get(ROW_LENGTH_SIZE + row_len)
            .ok_or_else(|| corrupt(format!("row length {row_len} exceeds key")))?
            as usize;
        if ROW_LENGTH_SIZE + row_len + FAMILY_LENGTH_SIZE + family_len + TIMESTAMP_TYPE_SIZE
            > key.len()
        {
            return Err(corrupt("row and family exceed key".to_string()));
        }
        self.row_len = row_len;
        self.family_len = family_len;
        let ts_start = key.len() - TIMESTAMP_TYPE_SIZE;
        self.timestamp.copy_from_slice(&key[ts_start..ts_start + 8]);
        self.type_byte = key[key.len() - 1];
        self.key.extend_from_slice(key);
        Ok(pos + self.key_len)
    }

    /// Rebuild a key from the previous one and the encoded differences.
    fn read_key(&mut self, input: &[u8], mut pos: usize, flag: u8, common: usize) -> Result<usize> {
        if common > self.prev_key.len() || common > self.key_len {
            return Err(corrupt(format!(
                "common prefix {common} longer than key ({} / {})",
                self.prev_key.len(),
                self.key_len
            )));
        }
        self.key.extend_from_slice(&self.prev_key[..common]);

        if common < ROW_LENGTH_SIZE + self.row_len {
            // The row changed; its family is the previous one.
            if common < ROW_LENGTH_SIZE {
                let rest = slice_at(input, pos, ROW_LENGTH_SIZE - common, "FAST_DIFF row length")?;
                self.key.extend_from_slice(rest);
                pos += rest.len();
            }
            let row_len = u16::from_be_bytes([self.key[0], self.key[1]]) as usize;
            let row_end = ROW_LENGTH_SIZE + row_len;
            if self.key.len() > row_end {
                return Err(corrupt(format!(
                    "common prefix {common} runs past row of {row_len} bytes"
                )));
            }
            let rest = slice_at(input, pos, row_end - self.key.len(), "FAST_DIFF row")?;
            self.key.extend_from_slice(rest);
            pos += rest.len();

            let family_start = ROW_LENGTH_SIZE + self.row_len;
            let family_end = family_start + FAMILY_LENGTH_SIZE + self.family_len;
            let family = self
                .prev_key
                .get(family_start..family_end)
                .ok_or_else(|| corrupt("previous key has no family".to_string()))?;
            self.key.extend_from_slice(family);
            self.row_len = row_len;
        }

        let qualifier_rest = self
            .key_len
            .checked_sub(self.key.len() + TIMESTAMP_TYPE_SIZE)
            .ok_or_else(|| {
                corrupt(format!(
                    "key length {} shorter than its shared part {}",
                    self.key_len,
                    self.key.len()
                ))
            })?;
        let qualifier = slice_at(input, pos, qualifier_rest, "FAST_DIFF qualifier")?;
        self.key.extend_from_slice(qualifier);
        pos += qualifier_rest;

        let ts_prefix = (flag & MASK_TIMESTAMP_LENGTH) as usize;
        let ts_rest = slice_at(input, pos, 8 - ts_prefix, "FAST_DIFF timestamp")?;
        self.timestamp[ts_prefix..].copy_from_slice(ts_rest);
        pos += ts_rest.len();
        self.key.extend_from_slice(&self.timestamp);

        if flag & FLAG_SAME_TYPE == 0 {
            self.type_byte = *input
                .get(pos)
                .ok_or_else(|| HFileError::truncated("FAST_DIFF type", pos + 1, input.len()))?;
            pos += 1;
        }
        self.key.push(self.type_byte);

        let family_len = *self
            .key
            .get(ROW_LENGTH_SIZE + self.row_len)
            .ok_or_else(|| corrupt("key ends inside its row".to_string()))?
            as usize;
        if ROW_LENGTH_SIZE + self.row_len + FAMILY_LENGTH_SIZE + family_len + TIMESTAMP_TYPE_SIZE
            > self.key.len()
        {
            return Err(corrupt("family exceeds key".to_string()));
        }
        self.family_len = family_len;
        Ok(pos)
    }
}
