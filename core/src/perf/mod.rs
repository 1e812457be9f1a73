//! Shared workloads used by benches, the CLI and tests.
//!
//! Keeping the programs in one place means every tool measures and demonstrates exactly the
//! same IR.

pub mod scenarios;
