#![no_main]
#[macro_use] extern crate libfuzzer_sys;
extern crate ustar;

use std::io::Cursor;

fuzz_target!(|data: &[u8]| {
    let mut storage = Cursor::new(data.to_vec());
    if let Ok(mut archive) = ustar::Archive::read(&mut storage) {
        let names: Vec<String> = archive.entries().iter().take(1).map(|e| e.name.clone()).collect();
        let _result = archive.remove(&mut storage, &names);
    }
});
