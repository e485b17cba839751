#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() > 8192 { return; }
    if let Ok(s) = std::str::from_utf8(data) {
        // Parse then compile; neither step should panic
        if let Ok(request) = nexus_query::query::parse_query_json(s) {
            let compiler = nexus_query::query::QueryCompiler::new("");
            let _ = compiler.compile_select(&request);
        }
    }
});
