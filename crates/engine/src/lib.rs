//! Delver Engine library.
//!
//! Server-side code for the Delver multiplayer dungeon crawler.
//!
//! ## Structure
//!
//! - `universe` - the lobby task: accounts, characters, world management
//! - `world` - one task per world, ticking its locations
//! - `session` - per-connection client state moved between the two
//! - `infrastructure/` - accounts store, archetype loader, clock (ports + adapters)
//! - `api/` - WebSocket entry point
//! - `config` - environment configuration

pub mod api;
pub mod config;
pub mod infrastructure;
pub mod session;
pub mod universe;
pub mod world;
