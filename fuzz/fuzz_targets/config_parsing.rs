#![no_main]

use fakecheck_core::{CoreError, FullConfig};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    // Arbitrary input must either load or fail with a configuration error
    for result in [FullConfig::from_json_str(text), FullConfig::from_yaml_str(text)] {
        match result {
            Ok(config) => {
                let threshold = config.app.similarity_threshold();
                assert!((0.0..=1.0).contains(&threshold));
                assert!(config.database.port() > 0);
                assert!(config.app.caches().dedup.max_entries() > 0);
            }
            Err(CoreError::Configuration { field, .. }) => assert!(!field.is_empty()),
            Err(other) => panic!("unexpected error kind: {}", other),
        }
    }
});
