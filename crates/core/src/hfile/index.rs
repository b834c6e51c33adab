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
//! Block index parsing.
//!
//! Root-level index blocks hold `offset(8) onDiskSize(4) key(vint-prefixed)`
//! entries back to back. Non-root (intermediate and leaf) blocks start with
//! the entry count and a secondary index of entry offsets:
//!
//! ```text
//! numEntries(4) [entryOffset(4)] * (numEntries + 1) [offset(8) onDiskSize(4) key] * numEntries
//! ```

use std::cmp::Ordering;

use crate::hfile::error::{read_u32_at, read_u64_at, HFileError, Result};
use crate::hfile::vint::read_byte_array;

/// Size of block offset (int64) + block size (int32)
const ENTRY_HEADER_SIZE: usize = 12;

/// Size of the mid-key metadata that follows a multi-level root index
pub const MID_KEY_METADATA_SIZE: usize = 16;

/// Block index entry pointing to a data, index or bloom chunk block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockIndexEntry {
    /// Offset of the block in the file
    pub offset: u64,
    /// On-disk size of the block including header
    pub on_disk_size: u32,
    /// First key of the block, or a key sorting at or before it
    pub key: Vec<u8>,
}

fn entry_header(data: &[u8], pos: usize) -> Result<(u64, u32)> {
    let offset = read_u64_at(data, pos, "index entry")?;
    let size = read_u32_at(data, pos + 8, "index entry")?;
    if offset > i64::MAX as u64 {
        return Err(HFileError::CorruptIndex(format!(
            "Negative block offset {}",
            offset as i64
        )));
    }
    Ok((offset, size))
}

fn corrupt(err: HFileError) -> HFileError {
    match err {
        HFileError::CorruptIndex(_) => err,
        other => HFileError::CorruptIndex(other.to_string()),
    }
}

/// Mid-key metadata stored after the root entries of a multi-level index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MidKeyInfo {
    pub leaf_block_offset: u64,
    pub leaf_block_on_disk_size: u32,
    pub mid_key_entry: u32,
}

/// The root level of a block index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockIndex {
    pub entries: Vec<BlockIndexEntry>,
    /// 1 when root entries point straight at data blocks
    pub num_levels: u32,
    pub mid_key: Option<MidKeyInfo>,
}

impl BlockIndex {
    /// Parse a root index block holding `num_entries` entries.
    pub fn parse_root(data: &[u8], num_entries: usize, num_levels: u32) -> Result<Self> {
        let (entries, consumed) = parse_root_index(data, num_entries)?;
        let mid_key = if num_levels > 1 && data.len() - consumed >= MID_KEY_METADATA_SIZE {
            let rest = &data[consumed..];
            Some(MidKeyInfo {
                leaf_block_offset: read_u64_at(rest, 0, "mid-key metadata")?,
                leaf_block_on_disk_size: read_u32_at(rest, 8, "mid-key metadata")?,
                mid_key_entry: read_u32_at(rest, 12, "mid-key metadata")?,
            })
        } else {
            None
        };
        Ok(Self {
            entries,
            num_levels,
            mid_key,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Parse `num_entries` root-format entries.
/// Returns (entries, bytes_consumed).
pub fn parse_root_index(data: &[u8], num_entries: usize) -> Result<(Vec<BlockIndexEntry>, usize)> {
    // Every entry takes at least 13 bytes; do not trust the count for allocation.
    let mut entries = Vec::with_capacity(num_entries.min(data.len() / (ENTRY_HEADER_SIZE + 1)));
    let mut pos = 0;
    for i in 0..num_entries {
        let (offset, on_disk_size) = entry_header(data, pos).map_err(corrupt)?;
        pos += ENTRY_HEADER_SIZE;
        let (key, consumed) = read_byte_array(data, pos)
            .map_err(|e| HFileError::CorruptIndex(format!("root entry {i} key: {e}")))?;
        pos += consumed;
        entries.push(BlockIndexEntry {
            offset,
            on_disk_size,
            key: key.to_vec(),
        });
    }
    Ok((entries, pos))
}

/// Parse an intermediate or leaf index block.
pub fn parse_non_root_index(data: &[u8]) -> Result<Vec<BlockIndexEntry>> {
    let num_entries = read_u32_at(data, 0, "non-root index entry count").map_err(corrupt)? as usize;
    let secondary_start = 4;
    let entries_start = num_entries
        .checked_add(1)
        .and_then(|n| n.checked_mul(4))
        .and_then(|n| n.checked_add(secondary_start))
        .filter(|end| *end <= data.len())
        .ok_or_else(|| {
            HFileError::CorruptIndex(format!(
                "Secondary index of {num_entries} entries exceeds block of {} bytes",
                data.len()
            ))
        })?;

    let relative = |i: usize| -> Result<usize> {
        read_u32_at(data, secondary_start + i * 4, "secondary index")
            .map(|v| v as usize)
            .map_err(corrupt)
    };

    let mut entries = Vec::with_capacity(num_entries);
    for i in 0..num_entries {
        let start = entries_start + relative(i)?;
        let end = entries_start + relative(i + 1)?;
        if end > data.len() || start + ENTRY_HEADER_SIZE > end {
            return Err(HFileError::CorruptIndex(format!(
                "Non-root entry {i} spans {start}..{end} in block of {} bytes",
                data.len()
            )));
        }
        let (offset, on_disk_size) = entry_header(data, start).map_err(corrupt)?;
        entries.push(BlockIndexEntry {
            offset,
            on_disk_size,
            key: data[start + ENTRY_HEADER_SIZE..end].to_vec(),
        });
    }
    Ok(entries)
}

/// Index of the last entry whose key is `<= key` under `compare`, or `None`
/// when `key` sorts before every entry.
pub fn search_entries<F>(entries: &[BlockIndexEntry], key: &[u8], compare: F) -> Option<usize>
where
    F: Fn(&[u8], &[u8]) -> Ordering,
{
    let after = entries.partition_point(|entry| compare(&entry.key, key) != Ordering::Greater);
    after.checked_sub(1)
}
