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
//! HFile block parsing and handling.

use log::trace;

use crate::hfile::block_type::{HFileBlockType, MAGIC_LENGTH};
use crate::hfile::checksum::{verify_checksums, ChecksumType};
use crate::hfile::compression::CompressionCodec;
use crate::hfile::error::{HFileError, Result};
use crate::storage::ByteSource;

/// Size constants for block header
const SIZEOF_INT32: usize = 4;
const SIZEOF_INT64: usize = 8;
const SIZEOF_BYTE: usize = 1;

/// Block header size without checksum info (HFile v2)
const HEADER_SIZE_NO_CHECKSUM: usize = MAGIC_LENGTH + 2 * SIZEOF_INT32 + SIZEOF_INT64;

/// Block header size with checksum (HFile v3)
/// Header fields:
/// - 8 bytes: magic
/// - 4 bytes: on-disk size without header
/// - 4 bytes: uncompressed size without header
/// - 8 bytes: previous block offset
/// - 1 byte: checksum type
/// - 4 bytes: bytes per checksum
/// - 4 bytes: on-disk data size with header
pub const BLOCK_HEADER_SIZE: usize = HEADER_SIZE_NO_CHECKSUM + SIZEOF_BYTE + 2 * SIZEOF_INT32;

/// Parsed block header information.
///
/// The magic is kept raw so that a damaged magic surfaces as a checksum
/// mismatch once the block has been read in full.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockHeader {
    pub magic: [u8; MAGIC_LENGTH],
    pub on_disk_size_without_header: usize,
    pub uncompressed_size_without_header: usize,
    pub prev_block_offset: i64,
    pub checksum_type: u8,
    pub bytes_per_checksum: usize,
    pub on_disk_data_size_with_header: usize,
}

fn non_negative(value: i32, field: &str) -> Result<usize> {
    usize::try_from(value)
        .map_err(|_| HFileError::InvalidFormat(format!("Negative block {field}: {value}")))
}

impl BlockHeader {
    /// Parse a block header from bytes.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < BLOCK_HEADER_SIZE {
            return Err(HFileError::truncated(
                "block header",
                BLOCK_HEADER_SIZE,
                bytes.len(),
            ));
        }

        let mut magic = [0u8; MAGIC_LENGTH];
        magic.copy_from_slice(&bytes[..MAGIC_LENGTH]);

        let on_disk_size_without_header = non_negative(
            i32::from_be_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]),
            "on-disk size",
        )?;

        let uncompressed_size_without_header = non_negative(
            i32::from_be_bytes([bytes[12], bytes[13], bytes[14], bytes[15]]),
            "uncompressed size",
        )?;

        let prev_block_offset = i64::from_be_bytes([
            bytes[16], bytes[17], bytes[18], bytes[19], bytes[20], bytes[21], bytes[22], bytes[23],
        ]);

        let checksum_type = bytes[24];

        let bytes_per_checksum = non_negative(
            i32::from_be_bytes([bytes[25], bytes[26], bytes[27], bytes[28]]),
            "bytes per checksum",
        )?;

        let on_disk_data_size_with_header = non_negative(
            i32::from_be_bytes([bytes[29], bytes[30], bytes[31], bytes[32]]),
            "on-disk data size",
        )?;

        Ok(Self {
            magic,
            on_disk_size_without_header,
            uncompressed_size_without_header,
            prev_block_offset,
            checksum_type,
            bytes_per_checksum,
            on_disk_data_size_with_header,
        })
    }

    /// Resolve the block type from the magic.
    pub fn block_type(&self) -> Result<HFileBlockType> {
        HFileBlockType::from_magic(&self.magic)
    }

    /// Returns the total on-disk size including header.
    pub fn on_disk_size_with_header(&self) -> usize {
        BLOCK_HEADER_SIZE + self.on_disk_size_without_header
    }

    /// Size of the (possibly compressed) payload, excluding header and checksums.
    pub fn on_disk_data_size(&self) -> Result<usize> {
        self.on_disk_data_size_with_header
            .checked_sub(BLOCK_HEADER_SIZE)
            .filter(|size| *size <= self.on_disk_size_without_header)
            .ok_or_else(|| {
                HFileError::InvalidFormat(format!(
                    "Invalid block data size: {} with header, {} on disk",
                    self.on_disk_data_size_with_header, self.on_disk_size_without_header
                ))
            })
    }
}

/// Read and parse the header of the block at `offset`.
pub fn read_block_header<S: ByteSource + ?Sized>(source: &S, offset: u64) -> Result<BlockHeader> {
    let mut header = [0u8; BLOCK_HEADER_SIZE];
    read_exact_at(source, offset, &mut header, "block header")?;
    BlockHeader::parse(&header)
}

/// Fail unless `len` bytes at `offset` lie within the source.
fn check_range<S: ByteSource + ?Sized>(
    source: &S,
    offset: u64,
    len: usize,
    context: &'static str,
) -> Result<()> {
    let available = source.len();
    match offset.checked_add(len as u64) {
        Some(end) if end <= available => Ok(()),
        _ => Err(HFileError::Truncated {
            context,
            needed: offset.saturating_add(len as u64),
            available,
        }),
    }
}

fn read_exact_at<S: ByteSource + ?Sized>(
    source: &S,
    offset: u64,
    buf: &mut [u8],
    context: &'static str,
) -> Result<()> {
    check_range(source, offset, buf.len(), context)?;
    Ok(source.read_at(offset, buf)?)
}

/// An HFile block with parsed content.
#[derive(Debug)]
pub struct HFileBlock {
    pub header: BlockHeader,
    pub block_type: HFileBlockType,
    /// File offset the block was read from
    pub offset: u64,
    /// Uncompressed block data (after header, before checksum)
    pub data: Vec<u8>,
}

impl HFileBlock {
    /// Read the block at `offset`, verify its checksums and decompress it.
    pub fn read<S: ByteSource + ?Sized>(
        source: &S,
        offset: u64,
        codec: CompressionCodec,
    ) -> Result<Self> {
        let mut header_bytes = [0u8; BLOCK_HEADER_SIZE];
        read_exact_at(source, offset, &mut header_bytes, "block header")?;
        let header = BlockHeader::parse(&header_bytes)?;

        // Sizes come from the file; check them before allocating
        let body_offset = offset + BLOCK_HEADER_SIZE as u64;
        check_range(source, body_offset, header.on_disk_size_without_header, "block body")?;
        let mut on_disk = vec![0u8; header.on_disk_size_without_header];
        read_exact_at(source, body_offset, &mut on_disk, "block body")?;

        let block = Self::from_parts(&header_bytes, header, &on_disk, offset, codec)?;
        trace!(
            "Read {} block at offset {} ({} bytes on disk, {} bytes uncompressed)",
            block.block_type,
            offset,
            block.header.on_disk_size_with_header(),
            block.data.len()
        );
        Ok(block)
    }

    /// Parse a block from a buffer holding the header followed by the on-disk body.
    pub fn parse(bytes: &[u8], offset: u64, codec: CompressionCodec) -> Result<Self> {
        let header = BlockHeader::parse(bytes)?;
        let end = header.on_disk_size_with_header();
        if bytes.len() < end {
            return Err(HFileError::truncated("block body", end, bytes.len()));
        }
        Self::from_parts(
            &bytes[..BLOCK_HEADER_SIZE],
            header,
            &bytes[BLOCK_HEADER_SIZE..end],
            offset,
            codec,
        )
    }

    fn from_parts(
        header_bytes: &[u8],
        header: BlockHeader,
        on_disk: &[u8],
        offset: u64,
        codec: CompressionCodec,
    ) -> Result<Self> {
        let data_size = header.on_disk_data_size()?;
        let checksum_type = ChecksumType::from_id(header.checksum_type)?;
        verify_checksums(
            checksum_type,
            header.bytes_per_checksum,
            header_bytes,
            &on_disk[..data_size],
            &on_disk[data_size..],
        )?;

        let block_type = header.block_type()?;
        let data = codec.decompress(
            &on_disk[..data_size],
            header.uncompressed_size_without_header,
        )?;

        Ok(Self {
            header,
            block_type,
            offset,
            data,
        })
    }

    /// Returns the block type.
    pub fn block_type(&self) -> HFileBlockType {
        self.block_type
    }

    /// Fail unless the block is one of the `expected` types.
    pub fn expect_type(&self, expected: &[HFileBlockType]) -> Result<()> {
        if expected.contains(&self.block_type) {
            return Ok(());
        }
        Err(HFileError::UnexpectedBlockType {
            expected: expected
                .iter()
                .map(|t| t.to_string())
                .collect::<Vec<_>>()
                .join(" or "),
            actual: self.block_type.to_string(),
        })
    }

    /// Offset of the block following this one.
    pub fn next_block_offset(&self) -> u64 {
        self.offset + self.header.on_disk_size_with_header() as u64
    }
}
