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
//! Cell record serialization: canonical key-values and FAST_DIFF.

use crate::TestCell;

const FLAG_SAME_KEY_LENGTH: u8 = 1 << 3;
const FLAG_SAME_VALUE_LENGTH: u8 = 1 << 4;
const FLAG_SAME_TYPE: u8 = 1 << 5;
const FLAG_SAME_VALUE: u8 = 1 << 6;

/// Which optional sections follow each value.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecordFormat {
    pub tags: bool,
    pub mvcc: bool,
}

/// Hadoop `WritableUtils.writeVLong`.
pub fn write_vlong(out: &mut Vec<u8>, value: i64) {
    if (-112..=127).contains(&value) {
        out.push(value as u8);
        return;
    }
    let (magnitude, mut marker) = if value < 0 { (!value, -120i32) } else { (value, -112i32) };
    let len = 8 - magnitude.leading_zeros() as i32 / 8;
    marker -= len;
    out.push(marker as u8);
    for i in (0..len).rev() {
        out.push((magnitude >> (8 * i)) as u8);
    }
}

/// Length-prefixed byte array as written by `Bytes.writeByteArray`.
pub fn write_byte_array(out: &mut Vec<u8>, bytes: &[u8]) {
    write_vlong(out, bytes.len() as i64);
    out.extend_from_slice(bytes);
}

/// HBase `ByteBufferUtils.putCompressedInt`: 7-bit groups, low first.
pub fn write_compressed_int(out: &mut Vec<u8>, mut value: u32) {
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            return;
        }
        out.push(byte | 0x80);
    }
}

/// Append the canonical record of `cell`.
pub fn write_record(out: &mut Vec<u8>, cell: &TestCell, format: RecordFormat) {
    let key = cell.key();
    out.extend_from_slice(&(key.len() as u32).to_be_bytes());
    out.extend_from_slice(&(cell.value.len() as u32).to_be_bytes());
    out.extend_from_slice(&key);
    out.extend_from_slice(&cell.value);
    write_trailing_sections(out, cell, format, false);
}

fn write_trailing_sections(
    out: &mut Vec<u8>,
    cell: &TestCell,
    format: RecordFormat,
    encoded: bool,
) {
    if format.tags {
        if encoded {
            write_compressed_int(out, cell.tags.len() as u32);
        } else {
            out.extend_from_slice(&(cell.tags.len() as u16).to_be_bytes());
        }
        out.extend_from_slice(&cell.tags);
    }
    if format.mvcc {
        write_vlong(out, cell.sequence_id as i64);
    }
}

/// Common prefix of two flat keys up to the end of the qualifier, counting
/// the family as shared whenever the rows match.
fn key_common_prefix(cell: &TestCell, prev: &TestCell) -> usize {
    let row_len = (cell.row.len() as u16).to_be_bytes();
    let prev_row_len = (prev.row.len() as u16).to_be_bytes();
    if row_len != prev_row_len {
        return usize::from(row_len[0] == prev_row_len[0]);
    }
    let row_common = common_prefix(&cell.row, &prev.row);
    if row_common != cell.row.len() {
        return 2 + row_common;
    }
    2 + cell.row.len() + 1 + cell.family.len() + common_prefix(&cell.qualifier, &prev.qualifier)
}

fn common_prefix(a: &[u8], b: &[u8]) -> usize {
    a.iter().zip(b).take_while(|(x, y)| x == y).count()
}

/// Encode one block of cells with FAST_DIFF. All cells must share a family.
pub fn encode_fast_diff(cells: &[TestCell], format: RecordFormat) -> Vec<u8> {
    let mut out = Vec::new();
    let mut prev: Option<&TestCell> = None;
    for cell in cells {
        let key = cell.key();
        match prev {
            None => {
                out.push(0);
                write_compressed_int(&mut out, key.len() as u32);
                write_compressed_int(&mut out, cell.value.len() as u32);
                write_compressed_int(&mut out, 0);
                out.extend_from_slice(&key);
                out.extend_from_slice(&cell.value);
            }
            Some(prev) => encode_diff(&mut out, cell, &key, prev),
        }
        write_trailing_sections(&mut out, cell, format, true);
        prev = Some(cell);
    }
    out
}

fn encode_diff(out: &mut Vec<u8>, cell: &TestCell, key: &[u8], prev: &TestCell) {
    let prev_key_len = prev.key().len();
    let common = key_common_prefix(cell, prev);
    let ts = cell.timestamp.to_be_bytes();
    let common_ts = common_prefix(&ts[..7], &prev.timestamp.to_be_bytes()[..7]);

    let mut flag = common_ts as u8;
    if key.len() == prev_key_len {
        flag |= FLAG_SAME_KEY_LENGTH;
    }
    if cell.value.len() == prev.value.len() {
        flag |= FLAG_SAME_VALUE_LENGTH;
        if cell.value == prev.value {
            flag |= FLAG_SAME_VALUE;
        }
    }
    if cell.kind == prev.kind {
        flag |= FLAG_SAME_TYPE;
    }

    out.push(flag);
    if flag & FLAG_SAME_KEY_LENGTH == 0 {
        write_compressed_int(out, key.len() as u32);
    }
    if flag & FLAG_SAME_VALUE_LENGTH == 0 {
        write_compressed_int(out, cell.value.len() as u32);
    }
    write_compressed_int(out, common as u32);

    let row_end = 2 + cell.row.len();
    if common < row_end {
        // New row: its remainder, then the qualifier; the family is implied
        out.extend_from_slice(&key[common..row_end]);
        out.extend_from_slice(&cell.qualifier);
    } else {
        out.extend_from_slice(&key[common..key.len() - 9]);
    }
    out.extend_from_slice(&ts[common_ts..]);
    if flag & FLAG_SAME_TYPE == 0 {
        out.push(cell.kind.code());
    }
    if flag & FLAG_SAME_VALUE == 0 {
        out.extend_from_slice(&cell.value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vlong() {
        let encode = |v: i64| {
            let mut out = Vec::new();
            write_vlong(&mut out, v);
            out
        };
        assert_eq!(encode(5), vec![5]);
        assert_eq!(encode(-112), vec![0x90]);
        assert_eq!(encode(300), vec![0x8e, 0x01, 0x2c]);
        assert_eq!(encode(200), vec![0x8f, 0xc8]);
        assert_eq!(encode(-200), vec![0x87, 0xc7]);
    }

    #[test]
    fn test_compressed_int() {
        let mut out = Vec::new();
        write_compressed_int(&mut out, 300);
        assert_eq!(out, vec![0xac, 0x02]);
    }

    #[test]
    fn test_fast_diff_shares_row_and_value() {
        let cells = [
            TestCell::put("row", "cf", "a", 10, "same"),
            TestCell::put("row", "cf", "b", 10, "same"),
        ];
        let encoded = encode_fast_diff(&cells, RecordFormat::default());
        let first_len = 4 + cells[0].key().len() + 4;
        let second = &encoded[first_len..];
        // All flags set, timestamp fully shared except its last byte
        let all = FLAG_SAME_KEY_LENGTH | FLAG_SAME_VALUE_LENGTH | FLAG_SAME_TYPE | FLAG_SAME_VALUE;
        assert_eq!(second[0], 7 | all);
        // Common prefix covers row and family
        assert_eq!(second[1] as usize, 2 + 3 + 1 + 2);
        assert_eq!(&second[2..], &[b'b', 10]);
    }
}
