// src/errors/mod.rs
//! Structured error reporting for the Decaf compiler core.
//!
//! Every diagnostic the core produces is a [`SemanticError`] with a stable
//! code; the driver gates code generation on the collected set being
//! empty, so nothing the analyzer rejects ever reaches the emitter.

pub mod report;
pub mod sema;

pub use report::{render_to_stderr, render_to_string};
pub use sema::SemanticError;
