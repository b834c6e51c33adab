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
//! K-way merge of HFile scanners.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::hfile::{compare_cells, CellRef, HFileScanner, Result};
use crate::storage::ByteSource;

/// A positioned scanner and its file order; lower orders are newer files.
struct HeapEntry<'a, S: ByteSource> {
    scanner: HFileScanner<'a, S>,
    order: usize,
}

impl<S: ByteSource> HeapEntry<'_, S> {
    /// Cell order, then file order. Exhausted scanners sort last.
    fn compare(&self, other: &Self) -> Ordering {
        let by_cell = match (self.scanner.cell(), other.scanner.cell()) {
            (Some(left), Some(right)) => compare_cells(&left, &right),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        by_cell.then_with(|| self.order.cmp(&other.order))
    }
}

// BinaryHeap is a max-heap; reverse so the smallest cell is on top.
impl<S: ByteSource> Ord for HeapEntry<'_, S> {
    fn cmp(&self, other: &Self) -> Ordering {
        other.compare(self)
    }
}

impl<S: ByteSource> PartialOrd for HeapEntry<'_, S> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<S: ByteSource> PartialEq for HeapEntry<'_, S> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<S: ByteSource> Eq for HeapEntry<'_, S> {}

/// Min-heap of scanners keyed by their current cell.
///
/// The scanner holding the smallest cell is kept out of the heap in
/// `current`, so advancing it costs one push and one pop.
pub struct KeyValueHeap<'a, S: ByteSource> {
    heap: BinaryHeap<HeapEntry<'a, S>>,
    current: Option<HeapEntry<'a, S>>,
}

impl<'a, S: ByteSource> KeyValueHeap<'a, S> {
    /// Position every scanner, at its first cell or at the first cell
    /// `>= seek_key`, and keep those that found one. Scanners are given
    /// newest file first.
    pub fn new(scanners: Vec<HFileScanner<'a, S>>, seek_key: Option<&[u8]>) -> Result<Self> {
        let mut heap = BinaryHeap::with_capacity(scanners.len());
        for (order, mut scanner) in scanners.into_iter().enumerate() {
            let positioned = match seek_key {
                Some(key) => scanner.seek(key)?,
                None => scanner.next()?,
            };
            if positioned {
                heap.push(HeapEntry { scanner, order });
            }
        }
        let current = heap.pop();
        Ok(Self { heap, current })
    }

    /// The smallest cell across all scanners.
    pub fn peek(&self) -> Option<CellRef<'_>> {
        self.current.as_ref().and_then(|entry| entry.scanner.cell())
    }

    /// Move past the cell returned by [`KeyValueHeap::peek`].
    ///
    /// On error the heap is emptied; the error is the end of the merge.
    pub fn advance(&mut self) -> Result<()> {
        let Some(mut entry) = self.current.take() else {
            return Ok(());
        };
        match entry.scanner.next() {
            Ok(true) => self.heap.push(entry),
            Ok(false) => {}
            Err(e) => {
                self.heap.clear();
                return Err(e);
            }
        }
        self.current = self.heap.pop();
        Ok(())
    }

    /// Number of scanners that still have cells.
    pub fn len(&self) -> usize {
        self.heap.len() + usize::from(self.current.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_none()
    }
}
