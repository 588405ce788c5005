//! `realm_shared`
//!
//! Libraries shared by the world client and the tools that feed it.
//!
//! Design goals:
//! - Event payloads and transport stay independent of how they are applied.
//! - Everything the reconciler talks to (scene, terrain, storage, assets) is a
//!   trait so tests and headless runs can swap it out.
//! - No `unsafe`.

pub mod config;
pub mod error;
pub mod event;
pub mod math;
pub mod net;
pub mod physics;
pub mod protocol;
pub mod render;
pub mod resources;
pub mod storage;

pub mod prelude {
    //! Commonly used exports.

    pub use crate::config::*;
    pub use crate::error::*;
    pub use crate::event::*;
    pub use crate::math::*;
    pub use crate::protocol::*;
    pub use crate::render::*;
}
