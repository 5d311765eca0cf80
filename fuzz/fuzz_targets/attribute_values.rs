#![no_main]

use cilimport::metadata::attributes::{decode, ValueKind};
use libfuzzer_sys::fuzz_target;

const KINDS: [ValueKind; 10] = [
    ValueKind::String,
    ValueKind::Bool,
    ValueKind::Int16,
    ValueKind::Int32,
    ValueKind::Int64,
    ValueKind::StringAndInt,
    ValueKind::BoolArray,
    ValueKind::Decimal,
    ValueKind::Obsolete,
    ValueKind::Deprecated,
];

fuzz_target!(|data: &[u8]| {
    for kind in KINDS {
        let _ = decode(kind, data);
    }
});
