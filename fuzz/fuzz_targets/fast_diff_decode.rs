#![no_main]

use libfuzzer_sys::fuzz_target;
use riverbed_core::hfile::{CellFormat, DataBlockEncoding};

fuzz_target!(|data: &[u8]| {
    let Some((flags, block)) = data.split_first() else {
        return;
    };
    let format = CellFormat {
        include_tags: flags & 1 != 0,
        include_mvcc: flags & 2 != 0,
    };
    let _ = DataBlockEncoding::FastDiff.decode_block(block, format);
});
