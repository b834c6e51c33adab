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
//! Assembles complete HFile v3 files.
//!
//! Blocks are laid out as an HBase writer does: data blocks and bloom
//! chunks, then meta blocks and non-root index blocks, then the
//! load-on-open section (root data index, meta index, file info and bloom
//! metadata) and finally the fixed-size trailer.

use std::collections::BTreeMap;

use prost::Message;

use crate::block::BlockWriter;
use crate::encode::{encode_fast_diff, write_byte_array, write_record, RecordFormat};
use crate::proto::{BytesBytesPair, InfoProto, TrailerProto};
use crate::{sort_cells, BloomHash, BloomKind, Checksum, Codec, Encoding, TestCell};

pub const TRAILER_SIZE: usize = 4096;
const TRAILER_MAGIC: &[u8; 8] = b"TRABLK\"$";
const MAJOR_VERSION: u32 = 3;
const COMPARATOR: &str = "org.apache.hadoop.hbase.CellComparatorImpl";
const BLOOM_VERSION: u32 = 3;

/// Bloom filter settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BloomOptions {
    pub kind: BloomKind,
    pub hash: BloomHash,
    pub hash_count: u32,
    /// Distinct keys per chunk
    pub keys_per_chunk: usize,
    pub bits_per_key: usize,
    /// Write the metadata as a delete family bloom, which readers skip
    pub delete_family: bool,
}

impl Default for BloomOptions {
    fn default() -> Self {
        Self {
            kind: BloomKind::Row,
            hash: BloomHash::Murmur,
            hash_count: 7,
            keys_per_chunk: 128,
            bits_per_key: 10,
            delete_family: false,
        }
    }
}

impl BloomOptions {
    pub fn with_kind(mut self, kind: BloomKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_hash(mut self, hash: BloomHash) -> Self {
        self.hash = hash;
        self
    }

    pub fn with_keys_per_chunk(mut self, keys: usize) -> Self {
        self.keys_per_chunk = keys.max(1);
        self
    }
}

/// Where the blocks of a built file landed, as (offset, on-disk size).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileLayout {
    pub data_blocks: Vec<(u64, usize)>,
    pub bloom_chunks: Vec<(u64, usize)>,
    pub meta_blocks: Vec<(u64, usize)>,
    /// Leaf and intermediate index blocks, bottom level first
    pub index_blocks: Vec<(u64, usize)>,
    pub root_index: (u64, usize),
    pub meta_index: (u64, usize),
    pub file_info: (u64, usize),
    pub bloom_meta: Option<(u64, usize)>,
    pub trailer_offset: u64,
    pub index_levels: u32,
}

#[derive(Debug, Clone)]
struct IndexEntry {
    offset: u64,
    size: usize,
    key: Vec<u8>,
}

fn root_entries(entries: &[IndexEntry]) -> Vec<u8> {
    let mut out = Vec::new();
    for entry in entries {
        out.extend_from_slice(&entry.offset.to_be_bytes());
        out.extend_from_slice(&(entry.size as u32).to_be_bytes());
        write_byte_array(&mut out, &entry.key);
    }
    out
}

struct DataIndex {
    /// Root block body, mid-key metadata included
    root: Vec<u8>,
    root_entries: usize,
    levels: u32,
    non_root_bytes: usize,
}

fn non_root_entries(entries: &[IndexEntry]) -> Vec<u8> {
    let mut out = (entries.len() as u32).to_be_bytes().to_vec();
    let mut relative = 0u32;
    for entry in entries {
        out.extend_from_slice(&relative.to_be_bytes());
        relative += 12 + entry.key.len() as u32;
    }
    out.extend_from_slice(&relative.to_be_bytes());
    for entry in entries {
        out.extend_from_slice(&entry.offset.to_be_bytes());
        out.extend_from_slice(&(entry.size as u32).to_be_bytes());
        out.extend_from_slice(&entry.key);
    }
    out
}

/// Builds an HFile in memory.
///
/// ```
/// use riverbed_test::{Codec, HFileBuilder, TestCell};
///
/// let bytes = HFileBuilder::new()
///     .codec(Codec::Snappy)
///     .cell(TestCell::put("row", "cf", "q", 1, "value"))
///     .build();
/// assert!(bytes.len() > 4096);
/// ```
#[derive(Debug, Clone)]
pub struct HFileBuilder {
    codec: Codec,
    checksum: Checksum,
    bytes_per_checksum: u32,
    encoding: Encoding,
    block_size: usize,
    index_fanout: usize,
    tags: bool,
    mvcc: bool,
    bloom: Option<BloomOptions>,
    minor_version: u8,
    meta_blocks: BTreeMap<String, Vec<u8>>,
    file_info: Vec<(String, Vec<u8>)>,
    cells: Vec<TestCell>,
}

impl Default for HFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl HFileBuilder {
    pub fn new() -> Self {
        Self {
            codec: Codec::None,
            checksum: Checksum::Crc32C,
            bytes_per_checksum: 16 * 1024,
            encoding: Encoding::None,
            block_size: 64 * 1024,
            index_fanout: usize::MAX,
            tags: false,
            mvcc: false,
            bloom: None,
            minor_version: 3,
            meta_blocks: BTreeMap::new(),
            file_info: Vec::new(),
            cells: Vec::new(),
        }
    }

    pub fn codec(mut self, codec: Codec) -> Self {
        self.codec = codec;
        self
    }

    pub fn checksum(mut self, checksum: Checksum) -> Self {
        self.checksum = checksum;
        self
    }

    pub fn bytes_per_checksum(mut self, bytes: u32) -> Self {
        self.bytes_per_checksum = bytes;
        self
    }

    pub fn encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Uncompressed size at which a data block is closed.
    pub fn block_size(mut self, size: usize) -> Self {
        self.block_size = size.max(1);
        self
    }

    /// Entries per index block; a smaller fanout adds index levels.
    pub fn index_fanout(mut self, fanout: usize) -> Self {
        self.index_fanout = fanout.max(2);
        self
    }

    /// Write a tags section after every value.
    pub fn tags(mut self, include: bool) -> Self {
        self.tags = include;
        self
    }

    /// Write a memstore timestamp after every cell.
    pub fn mvcc(mut self, include: bool) -> Self {
        self.mvcc = include;
        self
    }

    pub fn bloom(mut self, options: BloomOptions) -> Self {
        self.bloom = Some(options);
        self
    }

    pub fn minor_version(mut self, version: u8) -> Self {
        self.minor_version = version;
        self
    }

    pub fn meta_block(mut self, name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        self.meta_blocks.insert(name.into(), data.into());
        self
    }

    /// Extra file info entry; replaces a generated entry of the same key.
    pub fn file_info(mut self, key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        self.file_info.push((key.into(), value.into()));
        self
    }

    pub fn cell(mut self, cell: TestCell) -> Self {
        self.cells.push(cell);
        self
    }

    pub fn cells(mut self, cells: impl IntoIterator<Item = TestCell>) -> Self {
        self.cells.extend(cells);
        self
    }

    pub fn build(&self) -> Vec<u8> {
        self.build_with_layout().0
    }

    pub fn build_with_layout(&self) -> (Vec<u8>, FileLayout) {
        let mut cells = self.cells.clone();
        sort_cells(&mut cells);
        let format = RecordFormat {
            tags: self.tags,
            mvcc: self.mvcc,
        };
        let mut writer = BlockWriter::new(self.codec, self.checksum, self.bytes_per_checksum);
        let mut layout = FileLayout::default();

        let data_entries = self.write_data_blocks(&mut writer, &cells, format, &mut layout);
        let bloom = self
            .bloom
            .as_ref()
            .map(|options| write_bloom_chunks(&mut writer, &cells, options, &mut layout));

        let mut meta_entries = Vec::new();
        for (name, data) in &self.meta_blocks {
            let (offset, size) = writer.write(b"METABLKc", data);
            layout.meta_blocks.push((offset, size));
            meta_entries.push(IndexEntry {
                offset,
                size,
                key: name.as_bytes().to_vec(),
            });
        }

        let index = self.write_index_levels(&mut writer, data_entries.clone(), &mut layout);
        layout.index_levels = index.levels;

        let load_on_open = writer.offset();
        layout.root_index = writer.write(b"IDXROOT2", &index.root);
        layout.meta_index = writer.write(b"IDXROOT2", &root_entries(&meta_entries));
        layout.file_info = writer.write(b"FILEINF2", &self.file_info_block(&cells));
        if let (Some(options), Some(bloom)) = (&self.bloom, &bloom) {
            let magic = if options.delete_family { b"DFBLMET2" } else { b"BLMFMET2" };
            layout.bloom_meta = Some(writer.write(magic, &bloom.meta(options)));
        }

        let trailer = TrailerProto {
            file_info_offset: Some(layout.file_info.0),
            load_on_open_data_offset: Some(load_on_open),
            uncompressed_data_index_size: Some((index.non_root_bytes + index.root.len()) as u64),
            total_uncompressed_bytes: Some(writer.uncompressed_bytes()),
            data_index_count: Some(index.root_entries as u32),
            meta_index_count: Some(meta_entries.len() as u32),
            entry_count: Some(cells.len() as u64),
            num_data_index_levels: Some(index.levels),
            first_data_block_offset: data_entries.first().map(|e| e.offset),
            last_data_block_offset: data_entries.last().map(|e| e.offset),
            comparator_class_name: Some(COMPARATOR.to_string()),
            compression_codec: Some(self.codec.id()),
        };
        layout.trailer_offset = writer.offset();
        writer.extend(&trailer_bytes(&trailer, self.minor_version));
        (writer.into_bytes(), layout)
    }

    fn write_data_blocks(
        &self,
        writer: &mut BlockWriter,
        cells: &[TestCell],
        format: RecordFormat,
        layout: &mut FileLayout,
    ) -> Vec<IndexEntry> {
        let mut entries = Vec::new();
        let mut start = 0;
        while start < cells.len() {
            let mut end = start;
            let mut records = Vec::new();
            while end < cells.len() && records.len() < self.block_size {
                write_record(&mut records, &cells[end], format);
                end += 1;
            }
            let block = &cells[start..end];

            let (magic, payload) = match self.encoding {
                Encoding::None => (b"DATABLK*", records),
                Encoding::FastDiff => {
                    let mut payload = self.encoding.id().to_be_bytes().to_vec();
                    payload.extend_from_slice(&(records.len() as u32).to_be_bytes());
                    payload.extend_from_slice(&encode_fast_diff(block, format));
                    (b"DATABLKE", payload)
                }
            };
            let (offset, size) = writer.write(magic, &payload);
            layout.data_blocks.push((offset, size));
            entries.push(IndexEntry {
                offset,
                size,
                key: block[0].key(),
            });
            start = end;
        }
        entries
    }

    /// Write non-root index levels until the top one fits in the root.
    fn write_index_levels(
        &self,
        writer: &mut BlockWriter,
        data_entries: Vec<IndexEntry>,
        layout: &mut FileLayout,
    ) -> DataIndex {
        let fanout = self.index_fanout;
        let mut level = data_entries;
        let mut levels = 1;
        let mut non_root_bytes = 0;
        let mut leaves = Vec::new();

        while level.len() > fanout {
            let magic = if levels == 1 { b"IDXLEAF2" } else { b"IDXINTE2" };
            let mut next = Vec::new();
            for chunk in level.chunks(fanout) {
                let body = non_root_entries(chunk);
                non_root_bytes += body.len();
                let (offset, size) = writer.write(magic, &body);
                layout.index_blocks.push((offset, size));
                if levels == 1 {
                    leaves.push((offset, size));
                }
                next.push(IndexEntry {
                    offset,
                    size,
                    key: chunk[0].key.clone(),
                });
            }
            level = next;
            levels += 1;
        }

        let mut root = root_entries(&level);
        if levels > 1 {
            // Mid-key metadata: the leaf entry of the middle data block
            let mid = (layout.data_blocks.len() - 1) / 2;
            let (offset, size) = leaves[mid / fanout];
            root.extend_from_slice(&offset.to_be_bytes());
            root.extend_from_slice(&(size as u32).to_be_bytes());
            root.extend_from_slice(&((mid % fanout) as u32).to_be_bytes());
        }
        DataIndex {
            root,
            root_entries: level.len(),
            levels,
            non_root_bytes,
        }
    }

    fn file_info_block(&self, cells: &[TestCell]) -> Vec<u8> {
        let mut info: BTreeMap<String, Vec<u8>> = BTreeMap::new();
        let count = cells.len().max(1);
        let avg_key = cells.iter().map(|c| c.key().len()).sum::<usize>() / count;
        let avg_value = cells.iter().map(|c| c.value.len()).sum::<usize>() / count;
        info.insert("hfile.AVG_KEY_LEN".into(), (avg_key as u32).to_be_bytes().to_vec());
        info.insert("hfile.AVG_VALUE_LEN".into(), (avg_value as u32).to_be_bytes().to_vec());
        if let Some(last) = cells.last() {
            info.insert("hfile.LASTKEY".into(), last.key());
        }
        if self.tags {
            let max_tags = cells.iter().map(|c| c.tags.len()).max().unwrap_or(0);
            info.insert("hfile.MAX_TAGS_LEN".into(), (max_tags as u32).to_be_bytes().to_vec());
            info.insert("hfile.TAGS_COMPRESSED".into(), vec![0]);
        }
        if self.mvcc {
            let max_ts = cells.iter().map(|c| c.sequence_id).max().unwrap_or(0);
            info.insert("KEY_VALUE_VERSION".into(), 1u32.to_be_bytes().to_vec());
            info.insert("MAX_MEMSTORE_TS_KEY".into(), max_ts.to_be_bytes().to_vec());
        }
        info.insert(
            "DATA_BLOCK_ENCODING".into(),
            self.encoding.name().as_bytes().to_vec(),
        );
        if let Some(bloom) = &self.bloom {
            info.insert(
                "BLOOM_FILTER_TYPE".into(),
                bloom.kind.name().as_bytes().to_vec(),
            );
        }
        for (key, value) in &self.file_info {
            info.insert(key.clone(), value.clone());
        }

        let proto = InfoProto {
            map_entry: info
                .into_iter()
                .map(|(first, second)| BytesBytesPair {
                    first: first.into_bytes(),
                    second,
                })
                .collect(),
        };
        let mut out = b"PBUF".to_vec();
        proto.encode_length_delimited(&mut out).unwrap();
        out
    }
}

fn set_bloom_bits(bits: &mut [u8], options: &BloomOptions, row: &[u8]) {
    let bit_size = bits.len() as i64 * 8;
    let hash1 = options.hash.hash(row, 0);
    let hash2 = options.hash.hash(row, hash1);
    let mut composite = hash1;
    for _ in 0..options.hash_count {
        let pos = (composite as i64 % bit_size).unsigned_abs() as usize;
        bits[pos >> 3] |= 1 << (pos & 7);
        composite = composite.wrapping_add(hash2);
    }
}

/// Bloom chunks written to the file.
struct BloomChunks {
    entries: Vec<IndexEntry>,
    total_bytes: usize,
    key_count: usize,
}

impl BloomChunks {
    fn meta(&self, options: &BloomOptions) -> Vec<u8> {
        let max_keys = self.entries.len() * options.keys_per_chunk;
        let mut out = BLOOM_VERSION.to_be_bytes().to_vec();
        out.extend_from_slice(&(self.total_bytes as u64).to_be_bytes());
        out.extend_from_slice(&options.hash_count.to_be_bytes());
        out.extend_from_slice(&options.hash.id().to_be_bytes());
        out.extend_from_slice(&(self.key_count as u64).to_be_bytes());
        out.extend_from_slice(&(max_keys as u64).to_be_bytes());
        out.extend_from_slice(&(self.entries.len() as u32).to_be_bytes());
        // No comparator name: chunk keys compare as raw bytes
        write_byte_array(&mut out, b"");
        out.extend_from_slice(&root_entries(&self.entries));
        out
    }
}

fn write_bloom_chunks(
    writer: &mut BlockWriter,
    cells: &[TestCell],
    options: &BloomOptions,
    layout: &mut FileLayout,
) -> BloomChunks {
    let mut keys: Vec<Vec<u8>> = cells
        .iter()
        .map(|c| match options.kind {
            BloomKind::Row => c.row.clone(),
            BloomKind::RowCol => row_col_bloom_key(c),
        })
        .collect();
    keys.dedup();

    let mut chunks = BloomChunks {
        entries: Vec::new(),
        total_bytes: 0,
        key_count: keys.len(),
    };
    for chunk in keys.chunks(options.keys_per_chunk) {
        let mut bits = vec![0u8; (chunk.len() * options.bits_per_key).div_ceil(8).max(1)];
        for key in chunk {
            set_bloom_bits(&mut bits, options, key);
        }
        let (offset, size) = writer.write(b"BLMFBLK2", &bits);
        layout.bloom_chunks.push((offset, size));
        chunks.total_bytes += bits.len();
        chunks.entries.push(IndexEntry {
            offset,
            size,
            key: chunk[0].clone(),
        });
    }
    chunks
}

/// First-on-column key of a cell with the family left out, as row and
/// column blooms hash it.
fn row_col_bloom_key(cell: &TestCell) -> Vec<u8> {
    let mut key = (cell.row.len() as u16).to_be_bytes().to_vec();
    key.extend_from_slice(&cell.row);
    key.push(0);
    key.extend_from_slice(&cell.qualifier);
    key.extend_from_slice(&(i64::MAX as u64).to_be_bytes());
    key.push(255);
    key
}

fn trailer_bytes(trailer: &TrailerProto, minor_version: u8) -> Vec<u8> {
    let mut out = TRAILER_MAGIC.to_vec();
    trailer.encode_length_delimited(&mut out).unwrap();
    out.resize(TRAILER_SIZE - 4, 0);
    out.extend_from_slice(&(((minor_version as u32) << 24) | MAJOR_VERSION).to_be_bytes());
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(n: usize) -> Vec<TestCell> {
        (0..n)
            .map(|i| TestCell::put(format!("r{i:05}"), "cf", "q", 1, "value"))
            .collect()
    }

    #[test]
    fn test_trailer_closes_file() {
        let (bytes, layout) = HFileBuilder::new().cells(rows(10)).build_with_layout();
        assert_eq!(layout.trailer_offset as usize, bytes.len() - TRAILER_SIZE);
        assert_eq!(&bytes[bytes.len() - TRAILER_SIZE..][..8], TRAILER_MAGIC);
        assert_eq!(&bytes[bytes.len() - 4..], &[3, 0, 0, 3]);
        assert_eq!(layout.index_levels, 1);
        assert_eq!(layout.data_blocks.len(), 1);
        assert_eq!(layout.data_blocks[0].0, 0);
    }

    #[test]
    fn test_small_fanout_adds_levels() {
        let (_, layout) = HFileBuilder::new()
            .block_size(1)
            .index_fanout(3)
            .cells(rows(30))
            .build_with_layout();
        // 30 blocks -> 10 leaves -> 4 intermediates -> 2 root entries
        assert_eq!(layout.data_blocks.len(), 30);
        assert_eq!(layout.index_levels, 4);
        assert_eq!(layout.index_blocks.len(), 10 + 4 + 2);
    }

    #[test]
    fn test_load_on_open_order() {
        let (_, layout) = HFileBuilder::new()
            .cells(rows(5))
            .bloom(BloomOptions::default())
            .meta_block("m", "x")
            .build_with_layout();
        let (root, root_size) = layout.root_index;
        assert_eq!(layout.meta_index.0, root + root_size as u64);
        let (meta, meta_size) = layout.meta_index;
        assert_eq!(layout.file_info.0, meta + meta_size as u64);
        let (info, info_size) = layout.file_info;
        assert_eq!(layout.bloom_meta.unwrap().0, info + info_size as u64);
        assert_eq!(layout.bloom_chunks.len(), 1);
        assert!(layout.bloom_chunks[0].0 < root);
    }
}
