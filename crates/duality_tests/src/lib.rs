//! Integration test crate: everything lives under `tests/`.
