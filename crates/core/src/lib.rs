//! Core business logic for Enrollo.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! The enrollment state machine, the fee ledger and the role policy live here;
//! persistence and transport call into it.
//!
//! # Modules
//!
//! - `enrollment` - Enrollment lifecycle state machine and fee ledger

pub mod enrollment;
