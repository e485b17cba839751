#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() > 16384 { return; }
    if let Ok(v) = serde_json::from_slice::<serde_json::Value>(data) {
        let _ = nexus_query::query::process(&v, true);
        let _ = nexus_query::query::process(&v, false);
    }
});
