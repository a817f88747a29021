//! Status codes returned by tick phases, and the per-instance status flags
//! published to the store.

use crate::store::SharedStore;
use serde::{Deserialize, Serialize};
use std::ops::{BitOr, BitOrAssign};

/// Bitmask returned by every phase. `OK` (0) means nothing signaled trouble.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct StatusCode(u32);

impl StatusCode {
    pub const OK: StatusCode = StatusCode(0);
    /// Waiting on peers or on arrival.
    pub const WAITING: StatusCode = StatusCode(1);
    pub const DEADLOCKED: StatusCode = StatusCode(1 << 1);
    pub const FAILED: StatusCode = StatusCode(1 << 2);
    /// A required collaborator (platform, sensors, self) was not bound.
    pub const UNBOUND: StatusCode = StatusCode(1 << 3);

    pub fn from_bits(bits: u32) -> Self {
        StatusCode(bits)
    }

    pub fn bits(self) -> u32 {
        self.0
    }

    pub fn is_ok(self) -> bool {
        self.0 == 0
    }

    pub fn contains(self, other: StatusCode) -> bool {
        other.0 != 0 && self.0 & other.0 == other.0
    }
}

impl BitOr for StatusCode {
    type Output = StatusCode;

    fn bitor(self, rhs: StatusCode) -> StatusCode {
        StatusCode(self.0 | rhs.0)
    }
}

impl BitOrAssign for StatusCode {
    fn bitor_assign(&mut self, rhs: StatusCode) {
        self.0 |= rhs.0;
    }
}

impl std::fmt::Display for StatusCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_ok() {
            return f.write_str("ok");
        }
        let names: Vec<&str> = [
            (StatusCode::WAITING, "waiting"),
            (StatusCode::DEADLOCKED, "deadlocked"),
            (StatusCode::FAILED, "failed"),
            (StatusCode::UNBOUND, "unbound"),
        ]
        .iter()
        .filter(|(code, _)| self.contains(*code))
        .map(|(_, name)| *name)
        .collect();
        f.write_str(&names.join("|"))
    }
}

/// One independently settable status flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatusFlag {
    Ok,
    Paused,
    Waiting,
    Deadlocked,
    Failed,
    Moving,
    Rotating,
    SensorsAvailable,
    MovementAvailable,
    CommunicationAvailable,
    GpsSpoofed,
    ReducedSensing,
    ReducedMovement,
}

impl StatusFlag {
    pub const ALL: [StatusFlag; 13] = [
        StatusFlag::Ok,
        StatusFlag::Paused,
        StatusFlag::Waiting,
        StatusFlag::Deadlocked,
        StatusFlag::Failed,
        StatusFlag::Moving,
        StatusFlag::Rotating,
        StatusFlag::SensorsAvailable,
        StatusFlag::MovementAvailable,
        StatusFlag::CommunicationAvailable,
        StatusFlag::GpsSpoofed,
        StatusFlag::ReducedSensing,
        StatusFlag::ReducedMovement,
    ];

    /// The store key suffix for this flag.
    pub fn key(self) -> &'static str {
        match self {
            StatusFlag::Ok => "ok",
            StatusFlag::Paused => "paused",
            StatusFlag::Waiting => "waiting",
            StatusFlag::Deadlocked => "deadlocked",
            StatusFlag::Failed => "failed",
            StatusFlag::Moving => "moving",
            StatusFlag::Rotating => "rotating",
            StatusFlag::SensorsAvailable => "sensors_available",
            StatusFlag::MovementAvailable => "movement_available",
            StatusFlag::CommunicationAvailable => "communication_available",
            StatusFlag::GpsSpoofed => "gps_spoofed",
            StatusFlag::ReducedSensing => "reduced_sensing",
            StatusFlag::ReducedMovement => "reduced_movement",
        }
    }

    fn bit(self) -> u16 {
        1 << (self as u16)
    }
}

/// Health flags of one running algorithm or platform.
///
/// Flags are not mutually exclusive. The record lives under a scope such as
/// `waypoints.agent.0` and is written to the store by [`publish`](Self::publish).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlgorithmStatus {
    scope: String,
    flags: u16,
}

/// Platforms publish the same flag set under a `platform.` scope.
pub type PlatformStatus = AlgorithmStatus;

impl AlgorithmStatus {
    /// Status scoped to `<algorithm>.<agent-prefix>`, starting as ok.
    pub fn for_algorithm(algorithm: &str, agent_prefix: &str) -> Self {
        Self::with_scope(format!("{}.{}", algorithm, agent_prefix))
    }

    /// Status scoped to `platform.<platform>.<agent-prefix>`, starting as ok.
    pub fn for_platform(platform: &str, agent_prefix: &str) -> Self {
        Self::with_scope(format!("platform.{}.{}", platform, agent_prefix))
    }

    pub fn with_scope(scope: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
            flags: StatusFlag::Ok.bit(),
        }
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn get(&self, flag: StatusFlag) -> bool {
        self.flags & flag.bit() != 0
    }

    pub fn set(&mut self, flag: StatusFlag, on: bool) {
        if on {
            self.flags |= flag.bit();
        } else {
            self.flags &= !flag.bit();
        }
    }

    /// Raise `Failed` and lower `Ok`.
    pub fn mark_failed(&mut self) {
        self.set(StatusFlag::Failed, true);
        self.set(StatusFlag::Ok, false);
    }

    /// Clear a previous failure once things work again.
    pub fn mark_recovered(&mut self) {
        self.set(StatusFlag::Failed, false);
        self.set(StatusFlag::Ok, true);
    }

    /// Flags currently raised.
    pub fn raised(&self) -> Vec<StatusFlag> {
        StatusFlag::ALL
            .iter()
            .copied()
            .filter(|f| self.get(*f))
            .collect()
    }

    /// Write every flag as an integer at `<scope>.<flag>`.
    pub fn publish(&self, store: &SharedStore) {
        for flag in StatusFlag::ALL {
            store.set(format!("{}.{}", self.scope, flag.key()), self.get(flag) as i64);
        }
    }

    /// Read flags back from the store (e.g. a peer's published status).
    pub fn load(store: &SharedStore, scope: &str) -> Self {
        let mut status = Self {
            scope: scope.to_string(),
            flags: 0,
        };
        for flag in StatusFlag::ALL {
            status.set(flag, store.get_integer(&format!("{}.{}", scope, flag.key())) != 0);
        }
        status
    }
}
