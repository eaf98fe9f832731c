//! Core error types shared by every part of the update system.
//!
//! See [`error`] for the taxonomy and the conventions used to attach typed kinds to
//! `anyhow` errors without losing the underlying cause.

pub mod error;

pub use error::{
    ErrorContext, UpdateError, find_update_error, format_error_chain, user_friendly_error,
};
