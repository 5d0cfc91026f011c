// Path: crates/meridian-test-utils/src/lib.rs

//! Test harness, fixtures, and assertion helpers shared by the meridian
//! workspace's integration tests. Panicking on bad fixtures via `expect` is
//! the intended behavior here, not a lint violation: a broken test helper
//! should fail loudly and immediately.

pub mod assertions;
pub mod fixtures;
pub mod harness;
pub mod randomness;
