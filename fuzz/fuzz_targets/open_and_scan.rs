#![no_main]

use libfuzzer_sys::fuzz_target;
use riverbed_core::hfile::key::row_key;
use riverbed_core::hfile::HFileReader;

fuzz_target!(|data: &[u8]| {
    let Ok(reader) = HFileReader::open(data.to_vec()) else {
        return;
    };
    let _ = reader.may_contain_row(b"row");
    let mut scanner = reader.scanner();
    let _ = scanner.seek(&row_key(b"row"));
    for cell in reader.cells().take(10_000) {
        if cell.is_err() {
            break;
        }
    }
});
