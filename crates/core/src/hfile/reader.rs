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
//! HFile reader implementation.

use log::{debug, warn};

use crate::hfile::block::{read_block_header, HFileBlock};
use crate::hfile::block_type::HFileBlockType;
use crate::hfile::bloom::BloomFilter;
use crate::hfile::cell::CellFormat;
use crate::hfile::compression::CompressionCodec;
use crate::hfile::encoding::DataBlockEncoding;
use crate::hfile::error::{HFileError, Result};
use crate::hfile::file_info::{BloomType, FileInfo};
use crate::hfile::index::{parse_non_root_index, parse_root_index, BlockIndex, BlockIndexEntry};
use crate::hfile::scanner::{HFileCells, HFileScanner};
use crate::hfile::trailer::HFileTrailer;
use crate::storage::ByteSource;

/// An opened HFile.
///
/// Opening reads the trailer and the load-on-open section: the root data
/// index, the meta index, the file info and the general bloom filter
/// metadata when present. The reader is immutable afterwards and can back
/// any number of [`HFileScanner`]s.
#[derive(Debug)]
pub struct HFileReader<S: ByteSource> {
    source: S,
    trailer: HFileTrailer,
    data_index: BlockIndex,
    meta_index: Vec<BlockIndexEntry>,
    file_info: FileInfo,
    bloom_filter: Option<BloomFilter>,
    bloom_type: BloomType,
    encoding: DataBlockEncoding,
    cell_format: CellFormat,
}

impl<S: ByteSource> HFileReader<S> {
    /// Open an HFile backed by `source`.
    pub fn open(source: S) -> Result<Self> {
        let trailer = HFileTrailer::read(&source)?;
        let codec = trailer.compression_codec;

        let root = HFileBlock::read(&source, trailer.load_on_open_data_offset, codec)?;
        root.expect_type(&[HFileBlockType::RootIndex])?;
        let data_index = BlockIndex::parse_root(
            &root.data,
            trailer.data_index_count as usize,
            trailer.num_data_index_levels,
        )?;

        // The meta index block is always written, even when empty.
        let meta_offset = root.next_block_offset();
        let (meta_index, file_info_offset) = if trailer.meta_index_count > 0 {
            let block = HFileBlock::read(&source, meta_offset, codec)?;
            block.expect_type(&[HFileBlockType::RootIndex])?;
            let (entries, _) = parse_root_index(&block.data, trailer.meta_index_count as usize)?;
            (entries, block.next_block_offset())
        } else {
            let header = read_block_header(&source, meta_offset)?;
            (vec![], meta_offset + header.on_disk_size_with_header() as u64)
        };

        let block = HFileBlock::read(&source, file_info_offset, codec)?;
        block.expect_type(&[HFileBlockType::FileInfo])?;
        let file_info = FileInfo::parse(&block.data)?;
        let encoding = file_info.data_block_encoding()?;
        let cell_format = file_info.cell_format()?;
        let bloom_type = file_info.bloom_type().unwrap_or_else(|e| {
            warn!("Not using the bloom filter: {e}");
            BloomType::None
        });

        let bloom_filter = Self::read_bloom_filter(&source, block.next_block_offset(), codec)?;

        debug!(
            "Opened HFile v{}.{}: {} entries, codec {}, encoding {}, {} index level(s), \
             {} root entries, {} meta blocks, {} bloom filter {}",
            trailer.major_version,
            trailer.minor_version,
            trailer.entry_count,
            codec,
            encoding.as_ref(),
            trailer.num_data_index_levels,
            data_index.len(),
            meta_index.len(),
            bloom_type,
            if bloom_filter.is_some() { "present" } else { "absent" },
        );

        Ok(Self {
            source,
            trailer,
            data_index,
            meta_index,
            file_info,
            bloom_filter,
            bloom_type,
            encoding,
            cell_format,
        })
    }

    /// Load the general bloom filter if its metadata block directly follows
    /// the file info block.
    fn read_bloom_filter(
        source: &S,
        offset: u64,
        codec: CompressionCodec,
    ) -> Result<Option<BloomFilter>> {
        if offset >= HFileTrailer::start_offset(source.len()) {
            return Ok(None);
        }
        let header = match read_block_header(source, offset) {
            Ok(header) => header,
            Err(e) => {
                warn!("Ignoring unreadable block after file info at offset {offset}: {e}");
                return Ok(None);
            }
        };
        if header.block_type().ok() != Some(HFileBlockType::GeneralBloomMeta) {
            debug!("No general bloom filter at offset {offset}");
            return Ok(None);
        }

        let block = HFileBlock::read(source, offset, codec)?;
        let bloom = BloomFilter::parse(&block.data)?;
        debug!(
            "Loaded {} bloom filter: {} chunks, {} hashes, {} keys",
            bloom.hash_type, bloom.num_chunks, bloom.hash_count, bloom.total_key_count
        );
        Ok(Some(bloom))
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn trailer(&self) -> &HFileTrailer {
        &self.trailer
    }

    pub fn file_info(&self) -> &FileInfo {
        &self.file_info
    }

    /// Number of cells in the file, as recorded in the trailer.
    pub fn num_entries(&self) -> u64 {
        self.trailer.entry_count
    }

    /// Root level of the data block index.
    pub fn data_index(&self) -> &BlockIndex {
        &self.data_index
    }

    /// Meta block entries, keyed by block name.
    pub fn meta_index(&self) -> &[BlockIndexEntry] {
        &self.meta_index
    }

    pub fn bloom_filter(&self) -> Option<&BloomFilter> {
        self.bloom_filter.as_ref()
    }

    /// Keys the bloom filter was built from, per the file info.
    pub fn bloom_type(&self) -> BloomType {
        self.bloom_type
    }

    pub fn compression_codec(&self) -> CompressionCodec {
        self.trailer.compression_codec
    }

    pub fn data_block_encoding(&self) -> DataBlockEncoding {
        self.encoding
    }

    pub fn cell_format(&self) -> CellFormat {
        self.cell_format
    }

    /// Whether the file may hold cells of `row`. Only a row bloom filter
    /// can rule a row out; other files always may.
    pub fn may_contain_row(&self, row: &[u8]) -> Result<bool> {
        match (&self.bloom_filter, self.bloom_type) {
            (Some(bloom), BloomType::Row) => {
                bloom.may_contain(&self.source, self.compression_codec(), row)
            }
            _ => Ok(true),
        }
    }

    /// Body of the meta block named `name`, if the file has one.
    pub fn meta_block(&self, name: &str) -> Result<Option<Vec<u8>>> {
        let Some(entry) = self.meta_index.iter().find(|e| e.key == name.as_bytes()) else {
            return Ok(None);
        };
        let block = self.read_block(entry.offset)?;
        block.expect_type(&[HFileBlockType::Meta])?;
        Ok(Some(block.data))
    }

    /// A scanner positioned before the first cell.
    pub fn scanner(&self) -> HFileScanner<'_, S> {
        HFileScanner::new(self)
    }

    /// Iterate over owned copies of every cell in the file.
    pub fn cells(&self) -> HFileCells<'_, S> {
        self.scanner().cells()
    }

    pub(crate) fn read_block(&self, offset: u64) -> Result<HFileBlock> {
        HFileBlock::read(&self.source, offset, self.compression_codec())
    }

    /// Read the entries of an intermediate or leaf index block.
    pub(crate) fn read_index_block(&self, offset: u64) -> Result<Vec<BlockIndexEntry>> {
        let block = self.read_block(offset)?;
        block.expect_type(&[
            HFileBlockType::IntermediateIndex,
            HFileBlockType::LeafIndex,
        ])?;
        let entries = parse_non_root_index(&block.data)?;
        if entries.is_empty() {
            return Err(HFileError::CorruptIndex(format!(
                "Empty {} block at offset {offset}",
                block.block_type()
            )));
        }
        debug!(
            "Descending into {} block at offset {} with {} entries",
            block.block_type(),
            offset,
            entries.len()
        );
        Ok(entries)
    }
}
