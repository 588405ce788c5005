//! Reconciliation error taxonomy.
//!
//! None of these are fatal to a session. Each one degrades to "entity not
//! visible" or "update dropped"; callers decide the log level.

use crate::protocol::{EntityKind, MonsterId};

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// The network-event collaborator never became ready during startup.
    #[error("event source not ready after {attempts} attempts")]
    DependencyNotReady { attempts: u32 },

    /// Asset key failed to resolve and no default handle is configured.
    #[error("asset unavailable: {key:?}")]
    ResourceUnavailable { key: String },

    /// The persisted character-selection payload could not be parsed.
    #[error("malformed handoff payload: {0}")]
    MalformedHandoffPayload(#[from] serde_json::Error),

    /// The persisted payload is older than the configured maximum age.
    #[error("stale handoff payload ({age_secs}s old)")]
    StaleHandoffPayload { age_secs: i64 },

    /// An event referenced an entity that is not registered.
    #[error("unknown {kind} {id}")]
    UnknownEntityReference { kind: EntityKind, id: String },

    /// A monster could not be spawned because its visual asset is missing.
    #[error("monster {id} has no spawnable asset (key {key:?})")]
    MissingSpawnAsset { id: MonsterId, key: String },
}

impl SyncError {
    pub fn unknown_player(id: impl Into<String>) -> Self {
        Self::UnknownEntityReference {
            kind: EntityKind::Player,
            id: id.into(),
        }
    }

    pub fn unknown_monster(id: impl ToString) -> Self {
        Self::UnknownEntityReference {
            kind: EntityKind::Monster,
            id: id.to_string(),
        }
    }
}
