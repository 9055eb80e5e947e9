//! Integration tests for the dataset codec
//!
//! These tests verify:
//! - Header text and version selection
//! - ASCII and binary pages written and read back
//! - Writer state rules and value checks

mod binary_tests;
mod writer_tests;

use std::path::{Path, PathBuf};

use sdds::{Config, DataMode, DataType, Description, SddsContext};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn setup_temp(name: &str) -> (TempDir, PathBuf) {
    init_logging();
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join(name);
    (temp_dir, path)
}

pub fn context() -> SddsContext {
    SddsContext::new(Config::default())
}

/// One page: `count` (short) = 7, column `x` (double) = [1.5, 2.5, 3.5]
pub fn write_scenario(ctx: &SddsContext, path: &Path, mode: DataMode) {
    let mut writer = ctx
        .initialize_output(path, mode, Description::default())
        .unwrap();
    writer.define_simple_parameter("count", DataType::Short).unwrap();
    writer.define_simple_column("x", DataType::Double).unwrap();
    writer.write_layout().unwrap();

    writer.start_page(3).unwrap();
    writer.set_parameter("count", 7i16).unwrap();
    writer.set_column("x", vec![1.5, 2.5, 3.5]).unwrap();
    assert_eq!(writer.write_page().unwrap(), 1);
    writer.terminate().unwrap();
}
