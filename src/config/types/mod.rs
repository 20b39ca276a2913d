//! Configuration utility types.
//!
//! | Module   | Purpose                                          |
//! |----------|--------------------------------------------------|
//! | `error`  | Configuration error types                        |
//! | `handle` | Reloadable presentation snapshot (thread-safe)   |

mod error;
pub mod handle;

pub use error::ConfigError;
pub use handle::{Presentation, PresentationStore};
