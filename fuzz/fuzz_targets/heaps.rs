#![no_main]

use cilimport::{
    metadata::streams::{Blob, Guid, Strings},
    Parser,
};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Some((&selector, rest)) = data.split_first() else {
        return;
    };
    let index = usize::from(selector);

    if let Ok(blob) = Blob::from(rest) {
        let _ = blob.get(index);
    }
    if let Ok(strings) = Strings::from(rest) {
        let _ = strings.get(index);
    }
    if let Ok(guids) = Guid::from(rest) {
        let _ = guids.get(index);
    }

    let mut parser = Parser::new(rest);
    while parser.has_more_data() {
        if parser.read_compressed_uint().is_err() {
            break;
        }
    }
    let _ = Parser::new(rest).read_compressed_token();
});
