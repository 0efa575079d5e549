#![no_main]
#[macro_use] extern crate libfuzzer_sys;
extern crate ustar_core;

fuzz_target!(|data: &[u8]| {
    if let Ok(header) = ustar_core::Header::from_bytes(data) {
        let entry = header.to_entry(0);
        let _verified = header.verify_checksum();
        let _encoded = ustar_core::Header::from_entry(&entry);
    }
});
