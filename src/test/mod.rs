//! Fixtures shared between unit tests and the integration tests under `tests/`.
#[path = "../../tests/common/builder.rs"]
mod builder;

pub use builder::*;
