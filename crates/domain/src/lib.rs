extern crate self as delver_domain;

pub mod archetype;
pub mod catalog;
pub mod cell;
pub mod character;
pub mod desire;
pub mod error;
pub mod event;
pub mod generation;
pub mod geometry;
pub mod ids;
pub mod location;
pub mod object;

pub use archetype::{
    Archetype, ArchetypeKind, ArmorArchetype, CharacterArchetype, DamageProfile, DoorArchetype,
    ItemArchetype, TileArchetype, WeaponArchetype,
};
pub use catalog::Catalog;
pub use cell::{BlockKind, Cell};
pub use character::{Character, CharacterStats};
pub use desire::Desire;
pub use error::DomainError;
pub use event::Event;
pub use generation::{GenCell, GenGrid, GenerationError, GenerationTarget, Pass, Style, StyleRegistry};
pub use geometry::{Direction, Position};
pub use ids::{ContentId, LocationId, Namespaces, Wid, WidGenerator, WorldId, CONTENT_KINDS};
pub use location::{Location, LocationSnapshot, Pace, TurnHook};
pub use object::{Door, Equipment, Mob, Object, ObjectBase, ObjectKind, WorldObject};
