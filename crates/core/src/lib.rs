//! Core library with shared error handling.
//!
//! This crate provides reusable components for the report pipeline:
//! - `AppError`, the error type every library crate returns
//! - Extension traits that map foreign errors into `AppError` with logging

pub mod error;

pub use error::{AppError, AppResult, OptionExt, ResultExt};
