//! Reference platforms.
//!
//! Real actuation drivers live outside this workspace. These two exist so
//! behaviors can be exercised end to end: `null` accepts every move
//! instantly, `simulated` travels at a fixed speed per tick.

pub mod null;
pub mod simulated;

pub use null::NullPlatform;
pub use simulated::SimulatedPlatform;
