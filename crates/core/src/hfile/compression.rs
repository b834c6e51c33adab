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
//! Compression codec support for HFile blocks.
//!
//! Snappy and ZSTD blocks are written through Hadoop's block compressor
//! stream, which frames the payload as
//! `[uncompressed length (4)] ([chunk length (4)] [chunk])+`, repeated until
//! the input is exhausted. Files written by the native ZSTD codec instead hold
//! a bare ZSTD frame under the same codec id, so that codec sniffs the frame
//! magic before choosing a decoder.

use std::io::Read;

use flate2::read::MultiGzDecoder;

use crate::hfile::error::{read_u32_at, slice_at, HFileError, Result};

/// Magic number opening every ZSTD frame.
pub const ZSTD_FRAME_MAGIC: [u8; 4] = [0x28, 0xB5, 0x2F, 0xFD];

/// Upper bound for buffer preallocation driven by on-disk sizes.
const MAX_PREALLOCATION: usize = 4 * 1024 * 1024;

/// Compression codec IDs used in HFile.
/// These IDs are stored in the HFile trailer and must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, strum_macros::Display)]
#[strum(serialize_all = "UPPERCASE")]
pub enum CompressionCodec {
    /// GZIP compression (ID: 1)
    Gzip = 1,
    /// No compression (ID: 2)
    #[default]
    None = 2,
    /// Snappy compression (ID: 3)
    Snappy = 3,
    /// ZSTD compression (ID: 6)
    Zstd = 6,
}

impl CompressionCodec {
    /// Decode compression codec from ID stored in HFile.
    pub fn from_id(id: u32) -> Result<Self> {
        match id {
            1 => Ok(CompressionCodec::Gzip),
            2 => Ok(CompressionCodec::None),
            3 => Ok(CompressionCodec::Snappy),
            6 => Ok(CompressionCodec::Zstd),
            _ => Err(HFileError::UnsupportedCompression(id)),
        }
    }

    pub fn id(&self) -> u32 {
        *self as u32
    }

    /// Decompress data using this codec.
    ///
    /// The output must be exactly `uncompressed_size` bytes long; anything
    /// else means the block is corrupt.
    pub fn decompress(&self, compressed_data: &[u8], uncompressed_size: usize) -> Result<Vec<u8>> {
        let decompressed = match self {
            CompressionCodec::None => compressed_data.to_vec(),
            CompressionCodec::Gzip => gunzip(compressed_data, uncompressed_size)?,
            CompressionCodec::Snappy => {
                decompress_framed(compressed_data, uncompressed_size, snappy_chunk)?
            }
            CompressionCodec::Zstd => {
                if compressed_data.starts_with(&ZSTD_FRAME_MAGIC) {
                    unzstd(compressed_data, uncompressed_size)?
                } else {
                    decompress_framed(compressed_data, uncompressed_size, zstd_chunk)?
                }
            }
        };

        if decompressed.len() != uncompressed_size {
            return Err(HFileError::InvalidFormat(format!(
                "{} block decompressed to {} bytes, header says {}",
                self,
                decompressed.len(),
                uncompressed_size
            )));
        }
        Ok(decompressed)
    }
}

fn gunzip(data: &[u8], uncompressed_size: usize) -> Result<Vec<u8>> {
    let mut decompressed = Vec::with_capacity(uncompressed_size.min(MAX_PREALLOCATION));
    MultiGzDecoder::new(data)
        .take(uncompressed_size as u64 + 1)
        .read_to_end(&mut decompressed)
        .map_err(|e| HFileError::DecompressionError(format!("GZIP decompression failed: {e}")))?;
    Ok(decompressed)
}

/// Stream-decode ZSTD frames, reading at most one byte past `limit` so an
/// oversized frame is caught without buffering all of it.
fn unzstd(data: &[u8], limit: usize) -> Result<Vec<u8>> {
    let failed = |e: std::io::Error| {
        HFileError::DecompressionError(format!("ZSTD decompression failed: {e}"))
    };
    let decoder = zstd::stream::read::Decoder::new(data).map_err(failed)?;
    let mut decompressed = Vec::with_capacity(limit.min(MAX_PREALLOCATION));
    decoder
        .take(limit as u64 + 1)
        .read_to_end(&mut decompressed)
        .map_err(failed)?;
    Ok(decompressed)
}

/// Decode one snappy chunk, producing at most `limit` bytes.
fn snappy_chunk(chunk: &[u8], limit: usize) -> Result<Vec<u8>> {
    let len = snap::raw::decompress_len(chunk)
        .map_err(|e| HFileError::DecompressionError(format!("Snappy decompression failed: {e}")))?;
    if len > limit {
        return Err(HFileError::DecompressionError(format!(
            "Snappy chunk expands to {len} bytes, only {limit} expected"
        )));
    }
    snap::raw::Decoder::new()
        .decompress_vec(chunk)
        .map_err(|e| HFileError::DecompressionError(format!("Snappy decompression failed: {e}")))
}

/// Decode one ZSTD chunk, producing at most `limit` bytes.
fn zstd_chunk(chunk: &[u8], limit: usize) -> Result<Vec<u8>> {
    let decoded = unzstd(chunk, limit)?;
    if decoded.len() > limit {
        return Err(HFileError::DecompressionError(format!(
            "ZSTD chunk expands past the {limit} bytes expected"
        )));
    }
    Ok(decoded)
}

/// Undo Hadoop block compressor framing.
fn decompress_framed<F>(data: &[u8], uncompressed_size: usize, decode_chunk: F) -> Result<Vec<u8>>
where
    F: Fn(&[u8], usize) -> Result<Vec<u8>>,
{
    let mut out = Vec::with_capacity(uncompressed_size.min(MAX_PREALLOCATION));
    let mut pos = 0;
    while pos < data.len() {
        let block_size = read_u32_at(data, pos, "compressed block length")? as usize;
        pos += 4;
        if block_size > uncompressed_size - out.len() {
            return Err(HFileError::DecompressionError(format!(
                "Framed block of {block_size} bytes exceeds the expected {uncompressed_size}"
            )));
        }

        let block_end = out.len() + block_size;
        while out.len() < block_end {
            let chunk_len = read_u32_at(data, pos, "compressed chunk length")? as usize;
            pos += 4;
            let chunk = slice_at(data, pos, chunk_len, "compressed chunk")?;
            pos += chunk_len;
            // each chunk is bounded by what is left of the block
            let decoded = decode_chunk(chunk, block_end - out.len())?;
            out.extend_from_slice(&decoded);
        }
    }
    Ok(out)
}
