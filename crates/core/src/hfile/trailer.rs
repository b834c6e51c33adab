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
//! HFile trailer parsing.

use prost::Message;

use crate::hfile::block_type::{HFileBlockType, MAGIC_LENGTH};
use crate::hfile::compression::CompressionCodec;
use crate::hfile::error::{HFileError, Result};
use crate::hfile::proto::TrailerProto;
use crate::storage::ByteSource;

/// HFile trailer size (fixed at 4096 bytes for HFile v3)
pub const TRAILER_SIZE: usize = 4096;

/// Size of the version word closing the trailer
const VERSION_SIZE: usize = 4;

/// The only supported major version
pub const MAJOR_VERSION: u32 = 3;

/// HFile trailer containing file metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HFileTrailer {
    /// Major version (should be 3 for HFile v3)
    pub major_version: u32,
    /// Minor version
    pub minor_version: u32,
    /// Offset to file info block
    pub file_info_offset: u64,
    /// Offset to load-on-open section
    pub load_on_open_data_offset: u64,
    /// Total uncompressed size of data block index
    pub uncompressed_data_index_size: u64,
    /// Total uncompressed bytes in file
    pub total_uncompressed_bytes: u64,
    /// Number of entries in the root data block index
    pub data_index_count: u32,
    /// Number of entries in meta block index
    pub meta_index_count: u32,
    /// Number of cells in the file
    pub entry_count: u64,
    /// Number of levels in data block index
    pub num_data_index_levels: u32,
    /// Offset to first data block
    pub first_data_block_offset: u64,
    /// Offset of the last data block
    pub last_data_block_offset: u64,
    /// Comparator class name
    pub comparator_class_name: String,
    /// Compression codec used for blocks
    pub compression_codec: CompressionCodec,
}

impl HFileTrailer {
    /// Read and parse the trailer at the end of `source`.
    pub fn read<S: ByteSource + ?Sized>(source: &S) -> Result<Self> {
        let file_size = source.len();
        if file_size < TRAILER_SIZE as u64 {
            return Err(HFileError::Truncated {
                context: "trailer",
                needed: TRAILER_SIZE as u64,
                available: file_size,
            });
        }

        let mut trailer_bytes = vec![0u8; TRAILER_SIZE];
        source.read_at(file_size - TRAILER_SIZE as u64, &mut trailer_bytes)?;
        Self::parse(&trailer_bytes, file_size)
    }

    /// Parse the trailer bytes of a file of `file_size` bytes.
    pub fn parse(trailer_bytes: &[u8], file_size: u64) -> Result<Self> {
        if trailer_bytes.len() != TRAILER_SIZE {
            return Err(HFileError::truncated(
                "trailer",
                TRAILER_SIZE,
                trailer_bytes.len(),
            ));
        }

        HFileBlockType::Trailer.check_magic(trailer_bytes)?;

        // Format: [minor_version (1 byte)] [major_version (3 bytes)]
        let version_bytes = &trailer_bytes[TRAILER_SIZE - VERSION_SIZE..];
        let minor_version = version_bytes[0] as u32;
        let major_version = ((version_bytes[1] as u32) << 16)
            | ((version_bytes[2] as u32) << 8)
            | (version_bytes[3] as u32);

        if major_version != MAJOR_VERSION {
            return Err(HFileError::UnsupportedVersion {
                major: major_version,
                minor: minor_version,
            });
        }

        // Protobuf is length-delimited, followed by zero padding
        let proto_bytes = &trailer_bytes[MAGIC_LENGTH..TRAILER_SIZE - VERSION_SIZE];
        let proto = TrailerProto::decode_length_delimited(proto_bytes)?;

        let compression_codec = proto
            .compression_codec
            .map(CompressionCodec::from_id)
            .transpose()?
            .unwrap_or_default();

        let trailer = Self {
            major_version,
            minor_version,
            file_info_offset: proto.file_info_offset.unwrap_or(0),
            load_on_open_data_offset: proto.load_on_open_data_offset.unwrap_or(0),
            uncompressed_data_index_size: proto.uncompressed_data_index_size.unwrap_or(0),
            total_uncompressed_bytes: proto.total_uncompressed_bytes.unwrap_or(0),
            data_index_count: proto.data_index_count.unwrap_or(0),
            meta_index_count: proto.meta_index_count.unwrap_or(0),
            entry_count: proto.entry_count.unwrap_or(0),
            num_data_index_levels: proto.num_data_index_levels.unwrap_or(1),
            first_data_block_offset: proto.first_data_block_offset.unwrap_or(0),
            last_data_block_offset: proto.last_data_block_offset.unwrap_or(0),
            comparator_class_name: proto.comparator_class_name.unwrap_or_default(),
            compression_codec,
        };

        let trailer_start = file_size.saturating_sub(TRAILER_SIZE as u64);
        if trailer.load_on_open_data_offset >= trailer_start {
            return Err(HFileError::InvalidFormat(format!(
                "Load-on-open offset {} is not before the trailer at {}",
                trailer.load_on_open_data_offset, trailer_start
            )));
        }
        Ok(trailer)
    }

    /// Offset where the trailer starts in a file of `file_size` bytes.
    pub fn start_offset(file_size: u64) -> u64 {
        file_size.saturating_sub(TRAILER_SIZE as u64)
    }
}
