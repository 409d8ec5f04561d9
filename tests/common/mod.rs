//! Fixture loading helpers for integration tests.

#![allow(dead_code)]

use std::path::PathBuf;

use treemax::compat::LgbDump;
use treemax::TreeEnsemble;

/// Base directory for test cases.
pub fn test_cases_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/test-cases")
}

/// Directory for LightGBM `dump_model()` fixtures.
pub fn lightgbm_dump_dir() -> PathBuf {
    test_cases_dir().join("lightgbm/dump")
}

/// Path of a named dump fixture.
pub fn dump_path(name: &str) -> PathBuf {
    lightgbm_dump_dir().join(format!("{name}.json"))
}

/// Load and parse a named dump fixture.
pub fn load_dump(name: &str) -> LgbDump {
    let path = dump_path(name);
    LgbDump::from_file(&path).unwrap_or_else(|e| panic!("Failed to parse {}: {e}", path.display()))
}

/// Load a dump fixture and convert it with the given learning rate.
pub fn load_ensemble(name: &str, learning_rate: f64) -> TreeEnsemble {
    load_dump(name)
        .to_ensemble(learning_rate)
        .unwrap_or_else(|e| panic!("Failed to convert {name}: {e}"))
}

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}
