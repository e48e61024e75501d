//! Delver Protocol - messages exchanged between the server and its clients
//!
//! Pure data types and their JSON encoding. Domain values (desires, events,
//! objects, cells) travel as-is, inside their own `{type, data}` envelopes.

pub mod codec;
pub mod messages;
pub mod responses;

pub use codec::{decode, encode, ProtocolError};
pub use messages::{
    CharacterData, CredentialsData, DesireData, EventData, EventsData, InventoryData,
    LocationData, Message, OwnerData, PingData, SkillsData, StatusData, TileData, WorldData,
    WorldSummary, WorldsData,
};
pub use responses::{Reply, ResultCode};
