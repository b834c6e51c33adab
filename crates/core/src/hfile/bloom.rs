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
//! Compound (chunked) row bloom filters.
//!
//! The `BLMFMET2` block describes the filter and indexes its chunks by the
//! first row each one covers; chunk bit arrays live in `BLMFBLK2` blocks
//! interleaved with the data blocks.

use log::trace;

use crate::hfile::block::HFileBlock;
use crate::hfile::block_type::HFileBlockType;
use crate::hfile::compression::CompressionCodec;
use crate::hfile::error::{read_u32_at, read_u64_at, HFileError, Result};
use crate::hfile::hash::BloomHashType;
use crate::hfile::index::{parse_root_index, search_entries, BlockIndexEntry};
use crate::hfile::vint::read_byte_array;
use crate::storage::ByteSource;

/// The only compound bloom filter version.
pub const BLOOM_VERSION: u32 = 3;

/// Compound bloom filter metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BloomFilter {
    pub total_byte_size: u64,
    pub hash_count: u32,
    pub hash_type: BloomHashType,
    pub total_key_count: u64,
    pub total_max_keys: u64,
    pub num_chunks: u32,
    /// Comparator class recorded by the writer; empty for raw byte order
    pub comparator: String,
    pub chunk_index: Vec<BlockIndexEntry>,
}

impl BloomFilter {
    /// Parse the body of a `BLMFMET2` block.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let version = read_u32_at(data, 0, "bloom metadata")?;
        if version != BLOOM_VERSION {
            return Err(HFileError::InvalidFormat(format!(
                "Unsupported bloom filter version {version}"
            )));
        }
        let total_byte_size = read_u64_at(data, 4, "bloom metadata")?;
        let hash_count = read_u32_at(data, 12, "bloom metadata")?;
        let hash_type = BloomHashType::from_id(read_u32_at(data, 16, "bloom metadata")? as i32)?;
        let total_key_count = read_u64_at(data, 20, "bloom metadata")?;
        let total_max_keys = read_u64_at(data, 28, "bloom metadata")?;
        let num_chunks = read_u32_at(data, 36, "bloom metadata")?;

        let (comparator, consumed) = read_byte_array(data, 40)?;
        let comparator = String::from_utf8_lossy(comparator).into_owned();
        let (chunk_index, _) = parse_root_index(&data[40 + consumed..], num_chunks as usize)?;

        Ok(Self {
            total_byte_size,
            hash_count,
            hash_type,
            total_key_count,
            total_max_keys,
            num_chunks,
            comparator,
            chunk_index,
        })
    }

    /// Whether `row` may be in the file. `false` is definitive.
    pub fn may_contain<S: ByteSource + ?Sized>(
        &self,
        source: &S,
        codec: CompressionCodec,
        row: &[u8],
    ) -> Result<bool> {
        if self.chunk_index.is_empty() {
            return Ok(true);
        }
        let Some(chunk) = search_entries(&self.chunk_index, row, |a, b| a.cmp(b)) else {
            return Ok(false);
        };

        let entry = &self.chunk_index[chunk];
        let block = HFileBlock::read(source, entry.offset, codec)?;
        block.expect_type(&[HFileBlockType::BloomChunk])?;
        trace!("Probing bloom chunk {} at offset {}", chunk, entry.offset);
        Ok(self.chunk_contains(&block.data, row))
    }

    /// Test the `hash_count` bits of `row` in one chunk's bit array.
    pub fn chunk_contains(&self, bits: &[u8], row: &[u8]) -> bool {
        let bit_size = bits.len() as i64 * 8;
        if bit_size == 0 {
            return false;
        }
        let hash1 = self.hash_type.hash(row, 0);
        let hash2 = self.hash_type.hash(row, hash1);

        let mut composite = hash1;
        for _ in 0..self.hash_count {
            let pos = (composite as i64 % bit_size).unsigned_abs() as usize;
            if bits[pos >> 3] & (1 << (pos & 7)) == 0 {
                return false;
            }
            composite = composite.wrapping_add(hash2);
        }
        true
    }
}
