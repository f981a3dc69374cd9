#![no_main]

use libfuzzer_sys::fuzz_target;
use webcil::{pe_to_webcil, File};

fuzz_target!(|data: &[u8]| {
    if let Ok(file) = File::from_mem(data.to_vec()) {
        let _ = pe_to_webcil(&file);
    }
});
