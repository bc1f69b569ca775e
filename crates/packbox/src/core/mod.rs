//! Core types used throughout the engine
//!
//! Errors and progress events are shared by the resolver, the installer and
//! the manifest layer, so they live here rather than in any one of them.

pub mod error;
pub mod progress;

pub use error::{FileOperation, PackboxError, Result};
pub use progress::{IntoProgressCallback, ProgressCallback, ProgressEvent, ProgressReporter};
