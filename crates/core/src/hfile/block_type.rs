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
//! HFile block type definitions.

use strum_macros::EnumIter;

use crate::hfile::error::{HFileError, Result};

/// Length of block magic bytes
pub const MAGIC_LENGTH: usize = 8;

/// HFile block types with their magic byte sequences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter)]
pub enum HFileBlockType {
    /// Data block containing canonical key-values
    Data,
    /// Data block whose cells use a data block encoding
    EncodedData,
    /// Leaf-level index block (multi-level index)
    LeafIndex,
    /// One chunk of a compound bloom filter
    BloomChunk,
    /// Meta block
    Meta,
    /// Intermediate-level index block (multi-level index)
    IntermediateIndex,
    /// Root-level index block
    RootIndex,
    /// File info block containing metadata key-value pairs
    FileInfo,
    /// Metadata of the general bloom filter
    GeneralBloomMeta,
    /// Metadata of the delete family bloom filter
    DeleteFamilyBloomMeta,
    /// HFile trailer
    Trailer,
    /// Index block of the legacy v1 format
    IndexV1,
}

impl HFileBlockType {
    /// Returns the magic bytes for this block type.
    pub fn magic(&self) -> &'static [u8; MAGIC_LENGTH] {
        match self {
            HFileBlockType::Data => b"DATABLK*",
            HFileBlockType::EncodedData => b"DATABLKE",
            HFileBlockType::LeafIndex => b"IDXLEAF2",
            HFileBlockType::BloomChunk => b"BLMFBLK2",
            HFileBlockType::Meta => b"METABLKc",
            HFileBlockType::IntermediateIndex => b"IDXINTE2",
            HFileBlockType::RootIndex => b"IDXROOT2",
            HFileBlockType::FileInfo => b"FILEINF2",
            HFileBlockType::GeneralBloomMeta => b"BLMFMET2",
            HFileBlockType::DeleteFamilyBloomMeta => b"DFBLMET2",
            HFileBlockType::Trailer => b"TRABLK\"$",
            HFileBlockType::IndexV1 => b"IDXBLK)+",
        }
    }

    /// Parse block type from magic bytes.
    pub fn from_magic(magic: &[u8]) -> Result<Self> {
        if magic.len() < MAGIC_LENGTH {
            return Err(HFileError::InvalidFormat(format!(
                "Magic bytes too short: {} bytes",
                magic.len()
            )));
        }

        match &magic[..MAGIC_LENGTH] {
            b"DATABLK*" => Ok(HFileBlockType::Data),
            b"DATABLKE" => Ok(HFileBlockType::EncodedData),
            b"IDXLEAF2" => Ok(HFileBlockType::LeafIndex),
            b"BLMFBLK2" => Ok(HFileBlockType::BloomChunk),
            b"METABLKc" => Ok(HFileBlockType::Meta),
            b"IDXINTE2" => Ok(HFileBlockType::IntermediateIndex),
            b"IDXROOT2" => Ok(HFileBlockType::RootIndex),
            b"FILEINF2" => Ok(HFileBlockType::FileInfo),
            b"BLMFMET2" => Ok(HFileBlockType::GeneralBloomMeta),
            b"DFBLMET2" => Ok(HFileBlockType::DeleteFamilyBloomMeta),
            b"TRABLK\"$" => Ok(HFileBlockType::Trailer),
            b"IDXBLK)+" => Ok(HFileBlockType::IndexV1),
            other => Err(HFileError::InvalidBlockMagic {
                expected: "valid block magic".to_string(),
                actual: String::from_utf8_lossy(other).to_string(),
            }),
        }
    }

    /// Check if the given bytes start with this block type's magic.
    pub fn check_magic(&self, bytes: &[u8]) -> Result<()> {
        if bytes.len() < MAGIC_LENGTH {
            return Err(HFileError::InvalidFormat(format!(
                "Buffer too short for magic check: {} bytes",
                bytes.len()
            )));
        }

        let expected = self.magic();
        let actual = &bytes[..MAGIC_LENGTH];

        if actual != expected {
            return Err(HFileError::InvalidBlockMagic {
                expected: String::from_utf8_lossy(expected).to_string(),
                actual: String::from_utf8_lossy(actual).to_string(),
            });
        }

        Ok(())
    }

    /// Whether blocks of this type hold cells.
    pub fn is_data(&self) -> bool {
        matches!(self, HFileBlockType::Data | HFileBlockType::EncodedData)
    }
}

impl std::fmt::Display for HFileBlockType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            HFileBlockType::Data => "DATA",
            HFileBlockType::EncodedData => "ENCODED_DATA",
            HFileBlockType::LeafIndex => "LEAF_INDEX",
            HFileBlockType::BloomChunk => "BLOOM_CHUNK",
            HFileBlockType::Meta => "META",
            HFileBlockType::IntermediateIndex => "INTERMEDIATE_INDEX",
            HFileBlockType::RootIndex => "ROOT_INDEX",
            HFileBlockType::FileInfo => "FILE_INFO",
            HFileBlockType::GeneralBloomMeta => "GENERAL_BLOOM_META",
            HFileBlockType::DeleteFamilyBloomMeta => "DELETE_FAMILY_BLOOM_META",
            HFileBlockType::Trailer => "TRAILER",
            HFileBlockType::IndexV1 => "INDEX_V1",
        };
        f.write_str(name)
    }
}
