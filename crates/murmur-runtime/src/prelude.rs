//! Murmur Runtime Prelude — convenient imports for common usage.
//!
//! ```rust
//! use murmur_runtime::prelude::*;
//! ```

pub use crate::config::ControllerConfig;
pub use crate::controller::Controller;
pub use crate::logging::{level_directive, LogLevelSink, LogTarget};
