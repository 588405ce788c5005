//! `realm_client`
//!
//! Client-side world state:
//! - Spawn placement policy
//! - Entity registry (players keyed by id, monsters by numeric id)
//! - Event reconciliation into the registry and scene
//! - Character-selection handoff between scenes
//! - Session wiring and the network link feeding the event hub

pub mod client;
pub mod handoff;
pub mod link;
pub mod reconcile;
pub mod registry;
pub mod spawn;

pub use client::{ClientState, GameClient};
pub use handoff::{HandoffPayload, PendingHandoff};
pub use reconcile::Reconciler;
pub use registry::EntityRegistry;
pub use spawn::SpawnPositionPolicy;
