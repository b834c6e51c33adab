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
//! The file info block: an ordered map of well-known keys to raw bytes.

use std::collections::BTreeMap;

use prost::Message;
use strum_macros::{AsRefStr, Display, EnumString};

use crate::hfile::cell::CellFormat;
use crate::hfile::encoding::DataBlockEncoding;
use crate::hfile::error::{HFileError, Result};
use crate::hfile::proto::InfoProto;

/// Magic preceding protobuf payloads written by HBase.
pub const PBUF_MAGIC: &[u8; 4] = b"PBUF";

pub const AVG_KEY_LEN: &str = "hfile.AVG_KEY_LEN";
pub const AVG_VALUE_LEN: &str = "hfile.AVG_VALUE_LEN";
pub const LAST_KEY: &str = "hfile.LASTKEY";
pub const MAX_TAGS_LEN: &str = "hfile.MAX_TAGS_LEN";
pub const TAGS_COMPRESSED: &str = "hfile.TAGS_COMPRESSED";
pub const DATA_BLOCK_ENCODING: &str = "DATA_BLOCK_ENCODING";
pub const KEY_VALUE_VERSION: &str = "KEY_VALUE_VERSION";
pub const MAX_MEMSTORE_TS_KEY: &str = "MAX_MEMSTORE_TS_KEY";
pub const BLOOM_FILTER_TYPE: &str = "BLOOM_FILTER_TYPE";

/// Key-value version of files whose cells carry a memstore timestamp.
const KEY_VALUE_VERSION_WITH_MVCC: u32 = 1;

/// Keys the general bloom filter was built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, AsRefStr, Display, EnumString)]
pub enum BloomType {
    #[default]
    #[strum(serialize = "NONE")]
    None,
    /// Bare rows
    #[strum(serialize = "ROW")]
    Row,
    /// Row and column keys
    #[strum(serialize = "ROWCOL")]
    RowCol,
    /// Fixed-length row prefixes
    #[strum(serialize = "ROWPREFIX_FIXED_LENGTH")]
    RowPrefixFixedLength,
}

/// Parsed file info entries, ordered by key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileInfo {
    entries: BTreeMap<String, Vec<u8>>,
}

impl FileInfo {
    /// Parse the body of a `FILEINF2` block.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < PBUF_MAGIC.len() || &data[..PBUF_MAGIC.len()] != PBUF_MAGIC {
            return Err(HFileError::InvalidFormat(
                "File info does not start with PBUF magic".to_string(),
            ));
        }
        let proto = InfoProto::decode_length_delimited(&data[PBUF_MAGIC.len()..])?;
        let entries = proto
            .map_entry
            .into_iter()
            .map(|pair| (String::from_utf8_lossy(&pair.first).into_owned(), pair.second))
            .collect();
        Ok(Self { entries })
    }

    pub fn get(&self, key: &str) -> Option<&[u8]> {
        self.entries.get(key).map(Vec::as_slice)
    }

    pub fn entries(&self) -> &BTreeMap<String, Vec<u8>> {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn get_u32(&self, key: &str) -> Result<Option<u32>> {
        self.get(key)
            .map(|v| {
                <[u8; 4]>::try_from(v)
                    .map(u32::from_be_bytes)
                    .map_err(|_| wrong_width(key, v.len(), 4))
            })
            .transpose()
    }

    fn get_u64(&self, key: &str) -> Result<Option<u64>> {
        self.get(key)
            .map(|v| {
                <[u8; 8]>::try_from(v)
                    .map(u64::from_be_bytes)
                    .map_err(|_| wrong_width(key, v.len(), 8))
            })
            .transpose()
    }

    pub fn avg_key_len(&self) -> Result<Option<u32>> {
        self.get_u32(AVG_KEY_LEN)
    }

    pub fn avg_value_len(&self) -> Result<Option<u32>> {
        self.get_u32(AVG_VALUE_LEN)
    }

    /// Serialized key of the last cell in the file.
    pub fn last_key(&self) -> Option<&[u8]> {
        self.get(LAST_KEY)
    }

    pub fn max_tags_len(&self) -> Result<Option<u32>> {
        self.get_u32(MAX_TAGS_LEN)
    }

    /// Cells carry a tags section whenever the writer recorded a max tags
    /// length, even a zero one.
    pub fn includes_tags(&self) -> bool {
        self.get(MAX_TAGS_LEN).is_some()
    }

    pub fn tags_compressed(&self) -> bool {
        self.get(TAGS_COMPRESSED)
            .map_or(false, |v| v.iter().any(|b| *b != 0))
    }

    pub fn data_block_encoding(&self) -> Result<DataBlockEncoding> {
        match self.get(DATA_BLOCK_ENCODING) {
            None => Ok(DataBlockEncoding::None),
            Some(name) => DataBlockEncoding::from_name(&String::from_utf8_lossy(name)),
        }
    }

    pub fn key_value_version(&self) -> Result<Option<u32>> {
        self.get_u32(KEY_VALUE_VERSION)
    }

    /// Cells carry a memstore timestamp when the key-value version says so.
    pub fn includes_mvcc(&self) -> Result<bool> {
        Ok(self.key_value_version()? == Some(KEY_VALUE_VERSION_WITH_MVCC))
    }

    pub fn max_memstore_ts(&self) -> Result<Option<u64>> {
        self.get_u64(MAX_MEMSTORE_TS_KEY)
    }

    /// Keys of the general bloom filter. Files that never recorded a type
    /// have no usable bloom.
    pub fn bloom_type(&self) -> Result<BloomType> {
        match self.get(BLOOM_FILTER_TYPE) {
            None => Ok(BloomType::None),
            Some(name) => {
                let name = String::from_utf8_lossy(name);
                name.parse().map_err(|_| {
                    HFileError::InvalidFormat(format!("Unknown bloom filter type {name}"))
                })
            }
        }
    }

    /// Layout of cell records in this file's data blocks.
    pub fn cell_format(&self) -> Result<CellFormat> {
        if self.tags_compressed() {
            return Err(HFileError::UnsupportedEncoding(
                "compressed tags".to_string(),
            ));
        }
        Ok(CellFormat {
            include_tags: self.includes_tags(),
            include_mvcc: self.includes_mvcc()?,
        })
    }
}

fn wrong_width(key: &str, len: usize, want: usize) -> HFileError {
    HFileError::InvalidFormat(format!("File info {key} has {len} bytes, want {want}"))
}
