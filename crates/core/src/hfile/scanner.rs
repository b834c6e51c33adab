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
//! Forward, seekable cursors over the cells of one HFile.

use std::borrow::Cow;
use std::cmp::Ordering;

use log::trace;

use crate::hfile::block_type::HFileBlockType;
use crate::hfile::cell::{Cell, CellLayout, CellRef};
use crate::hfile::error::{HFileError, Result};
use crate::hfile::index::{search_entries, BlockIndexEntry};
use crate::hfile::key::{compare_keys, SeekKey};
use crate::hfile::reader::HFileReader;
use crate::storage::ByteSource;

/// Position within one level of the block index.
#[derive(Debug)]
struct IndexFrame<'a> {
    entries: Cow<'a, [BlockIndexEntry]>,
    /// Entry to visit next
    next: usize,
}

/// A cursor over the cells of an [`HFileReader`].
///
/// The cursor starts before the first cell. Index blocks below the root are
/// read lazily, one frame per level. Any error is terminal: later calls
/// return [`HFileError::CursorFailed`].
#[derive(Debug)]
pub struct HFileScanner<'a, S: ByteSource> {
    reader: &'a HFileReader<S>,
    frames: Vec<IndexFrame<'a>>,
    /// Canonical records of the current data block
    block: Vec<u8>,
    /// Offset of the next record in `block`
    block_pos: usize,
    current: Option<CellLayout>,
    failed: bool,
}

impl<'a, S: ByteSource> HFileScanner<'a, S> {
    pub fn new(reader: &'a HFileReader<S>) -> Self {
        let mut scanner = Self {
            reader,
            frames: Vec::with_capacity(reader.data_index().num_levels.max(1) as usize),
            block: vec![],
            block_pos: 0,
            current: None,
            failed: false,
        };
        scanner.reset();
        scanner
    }

    fn num_levels(&self) -> usize {
        self.reader.data_index().num_levels.max(1) as usize
    }

    fn reset(&mut self) {
        let reader = self.reader;
        self.frames.clear();
        self.frames.push(IndexFrame {
            entries: Cow::Borrowed(&reader.data_index().entries),
            next: 0,
        });
        self.block.clear();
        self.block_pos = 0;
        self.current = None;
    }

    /// The cell under the cursor, valid until the cursor moves.
    pub fn cell(&self) -> Option<CellRef<'_>> {
        self.current.map(|layout| layout.cell(&self.block))
    }

    /// Move to the next cell. Returns `false` once the file is exhausted.
    pub fn next(&mut self) -> Result<bool> {
        if self.failed {
            return Err(HFileError::CursorFailed);
        }
        let result = self.advance();
        self.fail_on_error(result)
    }

    /// Position at the first cell of the file.
    pub fn seek_to_first(&mut self) -> Result<bool> {
        if self.failed {
            return Err(HFileError::CursorFailed);
        }
        self.reset();
        let result = self.advance();
        self.fail_on_error(result)
    }

    /// Position at the first cell whose key is `>= target`.
    ///
    /// `target` is a serialized key (`&[u8]` or `&Vec<u8>`) or a
    /// [`SeekKey`] naming a row, a row and family, or a single column.
    /// Returns `false` when no such cell exists.
    pub fn seek<'k>(&mut self, target: impl Into<SeekKey<'k>>) -> Result<bool> {
        if self.failed {
            return Err(HFileError::CursorFailed);
        }
        let target = target.into();
        let result = self.seek_inner(&target.to_key());
        self.fail_on_error(result)
    }

    /// Consume the scanner, yielding owned cells from the current position.
    pub fn cells(self) -> HFileCells<'a, S> {
        HFileCells {
            scanner: self,
            done: false,
        }
    }

    fn fail_on_error(&mut self, result: Result<bool>) -> Result<bool> {
        if result.is_err() {
            self.failed = true;
            self.current = None;
            self.frames.clear();
            self.block.clear();
        }
        result
    }

    fn seek_inner(&mut self, key: &[u8]) -> Result<bool> {
        let reader = self.reader;
        let levels = self.num_levels();
        self.reset();
        self.frames.clear();

        let mut entries: Cow<'a, [BlockIndexEntry]> = Cow::Borrowed(&reader.data_index().entries);
        for level in 0..levels {
            if entries.is_empty() {
                if level > 0 {
                    return Err(HFileError::CorruptIndex(format!(
                        "Empty index block at level {level}"
                    )));
                }
                self.frames.push(IndexFrame { entries, next: 0 });
                return Ok(false);
            }

            // Keys before the first entry may still be in the first block.
            let pos = search_entries(&entries, key, compare_keys).unwrap_or(0);
            if level + 1 < levels {
                let child = entries[pos].offset;
                self.frames.push(IndexFrame {
                    entries,
                    next: pos + 1,
                });
                entries = Cow::Owned(reader.read_index_block(child)?);
            } else {
                self.frames.push(IndexFrame { entries, next: pos });
                break;
            }
        }

        while self.advance()? {
            if let Some(cell) = self.cell() {
                if compare_keys(cell.key, key) != Ordering::Less {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }

    fn advance(&mut self) -> Result<bool> {
        loop {
            if self.block_pos < self.block.len() {
                let layout =
                    CellLayout::parse(&self.block, self.block_pos, self.reader.cell_format())?;
                self.block_pos += layout.record_len();
                self.current = Some(layout);
                return Ok(true);
            }

            self.current = None;
            match self.next_data_block()? {
                Some(offset) => self.load_data_block(offset)?,
                None => return Ok(false),
            }
        }
    }

    /// Walk the frame stack to the next data block entry, reading index
    /// blocks as needed.
    fn next_data_block(&mut self) -> Result<Option<u64>> {
        let levels = self.num_levels();
        loop {
            let Some(depth) = self.frames.len().checked_sub(1) else {
                return Ok(None);
            };
            let frame = &mut self.frames[depth];
            if frame.next >= frame.entries.len() {
                if depth == 0 {
                    return Ok(None);
                }
                self.frames.pop();
                continue;
            }

            let offset = frame.entries[frame.next].offset;
            frame.next += 1;
            if depth + 1 >= levels {
                return Ok(Some(offset));
            }
            let children = self.reader.read_index_block(offset)?;
            self.frames.push(IndexFrame {
                entries: Cow::Owned(children),
                next: 0,
            });
        }
    }

    fn load_data_block(&mut self, offset: u64) -> Result<()> {
        let block = self.reader.read_block(offset)?;
        block.expect_type(&[HFileBlockType::Data, HFileBlockType::EncodedData])?;
        self.block = match block.block_type() {
            HFileBlockType::EncodedData => self
                .reader
                .data_block_encoding()
                .decode_block(&block.data, self.reader.cell_format())?,
            _ => block.data,
        };
        self.block_pos = 0;
        trace!(
            "Loaded data block at offset {} ({} decoded bytes)",
            offset,
            self.block.len()
        );
        Ok(())
    }
}

/// Owned cells of an [`HFileScanner`]; stops after the first error.
#[derive(Debug)]
pub struct HFileCells<'a, S: ByteSource> {
    scanner: HFileScanner<'a, S>,
    done: bool,
}

impl<S: ByteSource> Iterator for HFileCells<'_, S> {
    type Item = Result<Cell>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.scanner.next() {
            Ok(true) => self.scanner.cell().map(|cell| Ok(cell.to_cell())),
            Ok(false) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
