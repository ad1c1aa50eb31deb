//! Workstation Config Library
//!
//! Layered YAML settings resolution: six precedence tiers, a shared file
//! cache, parallel directory parsing and structural validation.

pub mod cli;
pub mod config;
pub mod error;
pub mod format;
pub mod paths;
