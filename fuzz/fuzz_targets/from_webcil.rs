#![no_main]

use std::io::Cursor;

use libfuzzer_sys::fuzz_target;
use webcil::convert_from_webcil;

fuzz_target!(|data: &[u8]| {
    let _ = convert_from_webcil(&mut Cursor::new(data), true);
    let _ = convert_from_webcil(&mut Cursor::new(data), false);
});
