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
//! HFile v3 reader implementation.
//!
//! HFile is HBase's immutable, sorted, block-structured store file format.
//! A file is a sequence of blocks (data, index, bloom and metadata blocks)
//! followed by a fixed-size trailer that locates the load-on-open section.
//!
//! # Example
//! ```no_run
//! use riverbed_core::hfile::{key, HFileReader};
//! use riverbed_core::storage::LocalFile;
//!
//! # fn main() -> riverbed_core::hfile::Result<()> {
//! let reader = HFileReader::open(LocalFile::open("store/cf/0123abcd")?)?;
//!
//! // Iterate all cells
//! for cell in reader.cells() {
//!     println!("{}", cell?);
//! }
//!
//! // Position on the first cell of a row
//! let mut scanner = reader.scanner();
//! if scanner.seek(key::SeekKey::Row(b"row-42"))? {
//!     let cell = scanner.cell().expect("positioned");
//!     println!("{:?}", cell.value);
//! }
//! # Ok(())
//! # }
//! ```

mod block;
mod block_type;
mod bloom;
mod cell;
mod checksum;
mod compression;
mod encoding;
mod error;
mod file_info;
mod hash;
mod index;
pub mod key;
mod proto;
mod reader;
mod scanner;
mod trailer;
mod vint;

pub use block::{read_block_header, BlockHeader, HFileBlock, BLOCK_HEADER_SIZE};
pub use block_type::HFileBlockType;
pub use bloom::BloomFilter;
pub use cell::{compare_cells, Cell, CellFormat, CellRef, CellType};
pub use checksum::ChecksumType;
pub use compression::CompressionCodec;
pub use encoding::DataBlockEncoding;
pub use error::{ErrorKind, HFileError, Result};
pub use file_info::{BloomType, FileInfo};
pub use hash::BloomHashType;
pub use index::{BlockIndex, BlockIndexEntry, MidKeyInfo};
pub use key::{compare_keys, SeekKey};
pub use reader::HFileReader;
pub use scanner::{HFileCells, HFileScanner};
pub use trailer::{HFileTrailer, TRAILER_SIZE};
