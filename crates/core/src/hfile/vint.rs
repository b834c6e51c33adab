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
//! Variable-length integer codecs used by the HFile format.
//!
//! Two unrelated schemes appear on disk:
//! - Hadoop `WritableUtils` VLong/VInt, used for index key lengths, the
//!   memstore timestamp of every cell and VInt-prefixed byte arrays.
//! - HBase "compressed int", 7 bits per byte with the least significant group
//!   first, used by the FAST_DIFF data block encoding.

use crate::hfile::error::{slice_at, HFileError, Result};

/// Maximum number of bytes of a compressed int holding a 32-bit value.
const MAX_COMPRESSED_INT_BYTES: usize = 5;

/// Total encoded size of a Hadoop VLong given its first byte.
pub fn decode_vint_size(first_byte: u8) -> usize {
    let signed = first_byte as i8;
    if signed >= -112 {
        1
    } else if signed < -120 {
        (-119 - signed as i32) as usize
    } else {
        (-111 - signed as i32) as usize
    }
}

fn is_negative_vint(first_byte: u8) -> bool {
    (first_byte as i8) < -120
}

/// Read a Hadoop VLong encoded integer at `offset`.
/// Returns (value, bytes_consumed).
pub fn read_vlong(bytes: &[u8], offset: usize) -> Result<(i64, usize)> {
    let first_byte = *bytes
        .get(offset)
        .ok_or_else(|| HFileError::truncated("vint", offset + 1, bytes.len()))?;
    let size = decode_vint_size(first_byte);
    if size == 1 {
        return Ok((first_byte as i8 as i64, 1));
    }

    let rest = slice_at(bytes, offset + 1, size - 1, "vint")?;
    let value = rest.iter().fold(0i64, |acc, b| (acc << 8) | *b as i64);
    if is_negative_vint(first_byte) {
        Ok((!value, size))
    } else {
        Ok((value, size))
    }
}

/// Read a VInt-prefixed byte array at `offset`.
/// Returns (bytes, total_bytes_consumed).
pub fn read_byte_array(bytes: &[u8], offset: usize) -> Result<(&[u8], usize)> {
    let (length, consumed) = read_vlong(bytes, offset)?;
    if length < 0 {
        return Err(HFileError::InvalidFormat(format!(
            "Negative byte array length {length} at offset {offset}"
        )));
    }
    let length = usize::try_from(length).map_err(|_| {
        HFileError::InvalidFormat(format!("Byte array length {length} does not fit in memory"))
    })?;
    let data = slice_at(bytes, offset + consumed, length, "byte array")?;
    Ok((data, consumed + length))
}

/// Read an HBase compressed int at `offset`.
/// Returns (value, bytes_consumed).
pub fn read_compressed_int(bytes: &[u8], offset: usize) -> Result<(u32, usize)> {
    let mut value: u64 = 0;
    for i in 0..MAX_COMPRESSED_INT_BYTES {
        let b = *bytes
            .get(offset + i)
            .ok_or_else(|| HFileError::truncated("compressed int", offset + i + 1, bytes.len()))?;
        value |= ((b & 0x7f) as u64) << (7 * i);
        if b & 0x80 == 0 {
            return u32::try_from(value).map(|v| (v, i + 1)).map_err(|_| {
                HFileError::InvalidFormat(format!("Compressed int overflow at offset {offset}"))
            });
        }
    }
    Err(HFileError::InvalidFormat(format!(
        "Compressed int longer than {MAX_COMPRESSED_INT_BYTES} bytes at offset {offset}"
    )))
}
