//! `vmaster-cli` — library surface for the `vmaster` binary and its tests.

pub mod cycle;
pub mod exit_codes;
pub mod export;
