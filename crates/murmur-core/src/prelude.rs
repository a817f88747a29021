//! Murmur Core Prelude — convenient imports for common usage.
//!
//! ```rust
//! use murmur_core::prelude::*;
//! ```

pub use crate::types::{
    AgentId, KnowledgeMap, MoveOutcome, Pose, Position, ReferenceFrame, Sensor, Sensors, Tick,
    Value,
};

pub use crate::store::{LoopbackFabric, SharedStore, Transport, Update};

pub use crate::status::{AlgorithmStatus, PlatformStatus, StatusCode, StatusFlag};

pub use crate::barrier::Barrier;

pub use crate::group::{
    find_member_index, FixedListGroup, Group, GroupFactoryRepository, GroupKind, TransientGroup,
};

pub use crate::platform::{Platform, PlatformRef, PlatformSlot, SharedPlatform};

pub use crate::algorithm::{Algorithm, AlgorithmBindings, AlgorithmCore};

pub use crate::registry::{AlgorithmRegistry, FactoryContext, PlatformRegistry, Registries};

pub use crate::variables::{AgentVars, CommandRecord, Kinematic, SwarmVars};

pub use crate::error::{FactoryKind, MurmurError, Result};
