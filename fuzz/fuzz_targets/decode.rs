#![no_main]

use dotprobe::{assembly::decode_body, metadata::method::MethodBody};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let decoded = decode_body(data, &());
    let consumed: u32 = decoded.instructions.iter().map(|i| i.size).sum();
    if decoded.is_complete() {
        assert_eq!(consumed as usize, data.len());
    }

    if let Ok(body) = MethodBody::parse(data) {
        let _ = decode_body(body.code(data), &());
    }
});
