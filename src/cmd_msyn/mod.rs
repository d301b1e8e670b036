//! Subcommand modules for the `msyn` binary.

pub mod genes;
pub mod hits;
pub mod walk;
