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
//! HFile error types.

use std::io;
use thiserror::Error;

pub type Result<T, E = HFileError> = std::result::Result<T, E>;

#[derive(Error, Debug)]
pub enum HFileError {
    #[error("Invalid HFile: {0}")]
    InvalidFormat(String),

    #[error("Invalid block magic: expected {expected}, got {actual}")]
    InvalidBlockMagic { expected: String, actual: String },

    #[error("Unsupported HFile version: major={major}, minor={minor}")]
    UnsupportedVersion { major: u32, minor: u32 },

    #[error("Unexpected block type: expected {expected}, got {actual}")]
    UnexpectedBlockType { expected: String, actual: String },

    #[error("Truncated {context}: need {needed} bytes, only {available} available")]
    Truncated {
        context: &'static str,
        needed: u64,
        available: u64,
    },

    #[error("Checksum mismatch in chunk {chunk}: expected {expected:08x}, computed {actual:08x}")]
    ChecksumMismatch {
        chunk: usize,
        expected: u32,
        actual: u32,
    },

    #[error("Unsupported compression codec: {0}")]
    UnsupportedCompression(u32),

    #[error("Unsupported data block encoding: {0}")]
    UnsupportedEncoding(String),

    #[error("Unsupported checksum type: {0}")]
    UnsupportedChecksum(u8),

    #[error("Unsupported bloom filter hash type: {0}")]
    UnsupportedHash(i32),

    #[error("Decompression error: {0}")]
    DecompressionError(String),

    #[error("Protobuf decode error: {0}")]
    ProtobufError(#[from] prost::DecodeError),

    #[error("Corrupt block index: {0}")]
    CorruptIndex(String),

    #[error("IO error: {0}")]
    IoError(#[from] io::Error),

    #[error("Cursor has failed and can no longer be advanced")]
    CursorFailed,
}

/// Coarse classification of [`HFileError`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Format,
    Truncated,
    ChecksumMismatch,
    UnsupportedCodec,
    CorruptIndex,
    Io,
    CursorFailed,
}

impl HFileError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            HFileError::InvalidFormat(_)
            | HFileError::InvalidBlockMagic { .. }
            | HFileError::UnsupportedVersion { .. }
            | HFileError::UnexpectedBlockType { .. }
            | HFileError::DecompressionError(_)
            | HFileError::ProtobufError(_) => ErrorKind::Format,
            HFileError::Truncated { .. } => ErrorKind::Truncated,
            HFileError::ChecksumMismatch { .. } => ErrorKind::ChecksumMismatch,
            HFileError::UnsupportedCompression(_)
            | HFileError::UnsupportedEncoding(_)
            | HFileError::UnsupportedChecksum(_)
            | HFileError::UnsupportedHash(_) => ErrorKind::UnsupportedCodec,
            HFileError::CorruptIndex(_) => ErrorKind::CorruptIndex,
            HFileError::IoError(_) => ErrorKind::Io,
            HFileError::CursorFailed => ErrorKind::CursorFailed,
        }
    }

    pub(crate) fn truncated(context: &'static str, needed: usize, available: usize) -> Self {
        HFileError::Truncated {
            context,
            needed: needed as u64,
            available: available as u64,
        }
    }
}

/// Returns `bytes[start..start + len]`, or a [`HFileError::Truncated`] error
/// naming `context` when the range falls outside the buffer.
pub(crate) fn slice_at<'a>(
    bytes: &'a [u8],
    start: usize,
    len: usize,
    context: &'static str,
) -> Result<&'a [u8]> {
    match start.checked_add(len) {
        Some(end) if end <= bytes.len() => Ok(&bytes[start..end]),
        _ => Err(HFileError::truncated(
            context,
            start.saturating_add(len),
            bytes.len(),
        )),
    }
}

pub(crate) fn read_u16_at(bytes: &[u8], start: usize, context: &'static str) -> Result<u16> {
    let b = slice_at(bytes, start, 2, context)?;
    Ok(u16::from_be_bytes([b[0], b[1]]))
}

pub(crate) fn read_u32_at(bytes: &[u8], start: usize, context: &'static str) -> Result<u32> {
    let b = slice_at(bytes, start, 4, context)?;
    Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
}

pub(crate) fn read_u64_at(bytes: &[u8], start: usize, context: &'static str) -> Result<u64> {
    let b = slice_at(bytes, start, 8, context)?;
    let mut buf = [0u8; 8];
    buf.copy_from_slice(b);
    Ok(u64::from_be_bytes(buf))
}
