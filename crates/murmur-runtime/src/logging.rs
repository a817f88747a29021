//! Runtime log-level control.
//!
//! The Controller does not own a logger. When the shared debug levels
//! change it reports the new level through a [`LogLevelSink`] installed by
//! the driver, which maps it onto whatever subscriber is running.

/// Which of the two independently tracked levels changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogTarget {
    /// Controller and behavior logging.
    Controller,
    /// Store and transport logging.
    Store,
}

impl LogTarget {
    /// Module path whose filter the level applies to.
    pub fn module(self) -> &'static str {
        match self {
            LogTarget::Controller => "murmur",
            LogTarget::Store => "murmur_core::store",
        }
    }
}

/// Receives debug-level changes from the Controller.
pub trait LogLevelSink: Send {
    fn set_level(&self, target: LogTarget, level: i64);
}

impl<F> LogLevelSink for F
where
    F: Fn(LogTarget, i64) + Send,
{
    fn set_level(&self, target: LogTarget, level: i64) {
        self(target, level)
    }
}

/// Filter directive for a numeric level: 0 off, 1 error, 2 warn, 3 info,
/// 4 debug, 5 and above trace.
pub fn level_directive(level: i64) -> &'static str {
    match level {
        i64::MIN..=0 => "off",
        1 => "error",
        2 => "warn",
        3 => "info",
        4 => "debug",
        _ => "trace",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_map_to_directives() {
        assert_eq!(level_directive(-3), "off");
        assert_eq!(level_directive(0), "off");
        assert_eq!(level_directive(2), "warn");
        assert_eq!(level_directive(4), "debug");
        assert_eq!(level_directive(6), "trace");
    }
}
