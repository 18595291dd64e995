//! Integration test crate for voterlink.
//!
//! This crate has no library code; it only contains tests that exercise
//! flows across the types, store and application crates.
//!
//! ```sh
//! cargo test -p voterlink-integration-tests
//! ```
