//! Common utilities shared across the directory crates.
//!
//! This crate provides:
//! - The error taxonomy and its HTTP rendering
//! - Configuration structures

pub mod config;
pub mod error;

pub use config::*;
pub use error::{AppError, AppResult, ErrorKind, OptionExt};
