#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Parse and resolve as a TOML config - only attempt if valid UTF-8
    if let Ok(s) = std::str::from_utf8(data)
        && let Ok(file) = toml::from_str::<testgate_types::ConfigFile>(s)
    {
        let _ = testgate_app::resolve_config(file);
    }
});
