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
//! Per-chunk block checksums.

use crate::hfile::error::{read_u32_at, HFileError, Result};

/// Size of each stored checksum value.
pub const CHECKSUM_SIZE: usize = 4;

/// Checksum algorithms, identified by the byte stored in the block header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChecksumType {
    Null = 0,
    Crc32 = 1,
    Crc32C = 2,
}

impl ChecksumType {
    pub fn from_id(id: u8) -> Result<Self> {
        match id {
            0 => Ok(ChecksumType::Null),
            1 => Ok(ChecksumType::Crc32),
            2 => Ok(ChecksumType::Crc32C),
            _ => Err(HFileError::UnsupportedChecksum(id)),
        }
    }

    /// Checksum of the concatenation of `parts`.
    fn compute(&self, parts: &[&[u8]]) -> u32 {
        match self {
            ChecksumType::Null => 0,
            ChecksumType::Crc32 => {
                let mut hasher = crc32fast::Hasher::new();
                for part in parts {
                    hasher.update(part);
                }
                hasher.finalize()
            }
            ChecksumType::Crc32C => parts
                .iter()
                .fold(0u32, |crc, part| crc32c::crc32c_append(crc, part)),
        }
    }
}

/// Number of checksum bytes covering `len` bytes in `bytes_per_checksum` chunks.
pub fn checksum_bytes_len(len: usize, bytes_per_checksum: usize) -> usize {
    len.div_ceil(bytes_per_checksum) * CHECKSUM_SIZE
}

/// Verify the checksums of a block.
///
/// Checksums cover `header ++ data` split into `bytes_per_checksum` sized
/// chunks; one big-endian value per chunk is stored in `checksums`.
pub fn verify_checksums(
    checksum_type: ChecksumType,
    bytes_per_checksum: usize,
    header: &[u8],
    data: &[u8],
    checksums: &[u8],
) -> Result<()> {
    if checksum_type == ChecksumType::Null {
        return Ok(());
    }
    if bytes_per_checksum == 0 {
        return Err(HFileError::InvalidFormat(
            "bytesPerChecksum must be positive".to_string(),
        ));
    }

    let total = header.len() + data.len();
    let needed = checksum_bytes_len(total, bytes_per_checksum);
    if checksums.len() < needed {
        return Err(HFileError::truncated("block checksums", needed, checksums.len()));
    }

    let mut start = 0;
    let mut chunk = 0;
    while start < total {
        let end = (start + bytes_per_checksum).min(total);
        let actual = checksum_type.compute(&split_range(header, data, start, end));
        let expected = read_u32_at(checksums, chunk * CHECKSUM_SIZE, "block checksums")?;
        if actual != expected {
            return Err(HFileError::ChecksumMismatch {
                chunk,
                expected,
                actual,
            });
        }
        start = end;
        chunk += 1;
    }
    Ok(())
}

/// The pieces of `header ++ data` covering `start..end` without copying.
fn split_range<'a>(header: &'a [u8], data: &'a [u8], start: usize, end: usize) -> [&'a [u8]; 2] {
    let h = header.len();
    let from_header = &header[start.min(h)..end.min(h)];
    let from_data = &data[start.saturating_sub(h)..end.saturating_sub(h)];
    [from_header, from_data]
}
