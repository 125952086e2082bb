//! FST: Field Service Toolkit
//!
//! A Unix-style toolkit for managing clients, quotes, and work orders as
//! plain text files with a validated lifecycle and a per-entity audit
//! trail.

pub mod cli;
pub mod core;
pub mod entities;
