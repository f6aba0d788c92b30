//! Fuzz target for store configuration parsing.
//!
//! The TOML parser and `StoreConfig::validate` must never panic, and a
//! config that validates must describe a usable store.
//!
//! Run with: `cargo +nightly fuzz run fuzz_config_parsing`

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use ttlcache::config::StoreConfig;

#[derive(Arbitrary, Debug)]
struct ConfigInput {
    /// Raw TOML string to test
    toml_string: String,
    /// Structured values spliced into a well-formed document
    structured: Option<(String, i64, i64)>,
}

impl ConfigInput {
    fn build(&self) -> String {
        match &self.structured {
            None => self.toml_string.clone(),
            Some((path, max_size, interval)) => format!(
                "path = {path:?}\nmax_size = {max_size}\nreap_interval_secs = {interval}\n"
            ),
        }
    }
}

fuzz_target!(|data: ConfigInput| {
    let toml_str = data.build();

    let Ok(config) = toml::from_str::<StoreConfig>(&toml_str) else {
        return;
    };

    if config.validate().is_ok() {
        assert!(config.max_size > 0);
        assert!(config.reap_interval_secs > 0);
        assert!(!config.path.as_os_str().is_empty());
        assert!(config.db_file().starts_with(&config.path));
    }
});
