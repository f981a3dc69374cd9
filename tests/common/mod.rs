//! Shared fixtures of the integration tests
#![allow(dead_code)]

mod builder;

pub use builder::*;

use std::path::PathBuf;

/// Returns a fresh scratch directory for the test called `name`
pub fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("webcil_{name}_{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}
