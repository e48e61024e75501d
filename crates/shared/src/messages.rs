//! Messages exchanged over the websocket connection
//!
//! Every message is a `{type, data}` envelope whose `type` selects the payload
//! record. The same enum is used in both directions: a client sends a request
//! payload and the server answers with the same variant, filled in with a
//! `result` and a `result_code`.

use std::collections::BTreeMap;

use delver_domain::{
    Cell, ContentId, Desire, Event, LocationId, LocationSnapshot, Object, TileArchetype, Wid,
    WorldId,
};
use serde::{Deserialize, Serialize};

use crate::responses::{impl_reply, ResultCode};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "kebab-case")]
pub enum Message {
    Ping(PingData),
    Login(CredentialsData),
    Register(CredentialsData),
    Logout(StatusData),
    CreateCharacter(CharacterData),
    DeleteCharacter(CharacterData),
    JoinCharacter(CharacterData),
    UnjoinCharacter(StatusData),
    Worlds(WorldsData),
    CreateWorld(WorldData),
    JoinWorld(WorldData),
    Location(LocationData),
    Tile(TileData),
    Owner(OwnerData),
    Inventory(InventoryData),
    Skills(SkillsData),
    Desire(DesireData),
    Event(EventData),
    Events(EventsData),
}

impl Message {
    /// The envelope tag, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Message::Ping(_) => "ping",
            Message::Login(_) => "login",
            Message::Register(_) => "register",
            Message::Logout(_) => "logout",
            Message::CreateCharacter(_) => "create-character",
            Message::DeleteCharacter(_) => "delete-character",
            Message::JoinCharacter(_) => "join-character",
            Message::UnjoinCharacter(_) => "unjoin-character",
            Message::Worlds(_) => "worlds",
            Message::CreateWorld(_) => "create-world",
            Message::JoinWorld(_) => "join-world",
            Message::Location(_) => "location",
            Message::Tile(_) => "tile",
            Message::Owner(_) => "owner",
            Message::Inventory(_) => "inventory",
            Message::Skills(_) => "skills",
            Message::Desire(_) => "desire",
            Message::Event(_) => "event",
            Message::Events(_) => "events",
        }
    }

    pub fn ping() -> Self {
        Message::Ping(PingData {})
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PingData {}

/// `login` and `register`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialsData {
    pub user: String,
    pub password: String,
    pub result: String,
    pub result_code: ResultCode,
    /// Character names of the account, filled in on a successful login.
    pub characters: Vec<String>,
}

/// `logout` and `unjoin-character`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusData {
    pub result: String,
    pub result_code: ResultCode,
}

/// `create-character`, `delete-character` and `join-character`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CharacterData {
    pub result: String,
    pub result_code: ResultCode,
    pub name: String,
    /// Character archetype name, with or without the `character:` prefix.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archetype: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldSummary {
    pub name: String,
    pub id: WorldId,
    pub private: bool,
    pub players: usize,
    pub max_players: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldsData {
    pub result: String,
    pub result_code: ResultCode,
    pub worlds: Vec<WorldSummary>,
}

/// `create-world` and `join-world`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldData {
    pub result: String,
    pub result_code: ResultCode,
    pub name: String,
    pub id: Option<WorldId>,
    pub password: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationData {
    pub result: String,
    pub result_code: ResultCode,
    pub id: Option<LocationId>,
    pub width: i32,
    pub height: i32,
    pub objects: Vec<Object>,
    pub cells: Vec<Vec<Cell>>,
}

impl From<LocationSnapshot> for LocationData {
    fn from(snapshot: LocationSnapshot) -> Self {
        Self {
            result: String::new(),
            result_code: ResultCode::OK,
            id: Some(snapshot.id),
            width: snapshot.width,
            height: snapshot.height,
            objects: snapshot.objects,
            cells: snapshot.cells,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TileData {
    pub result: String,
    pub result_code: ResultCode,
    pub id: Option<ContentId>,
    pub tile: Option<TileArchetype>,
}

/// Sent once when a character enters a world.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OwnerData {
    pub wid: Wid,
    pub inventory: Vec<Object>,
    pub skills: BTreeMap<String, u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InventoryData {
    pub wid: Wid,
    pub inventory: Vec<Object>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkillsData {
    pub wid: Wid,
    pub skills: BTreeMap<String, u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DesireData {
    pub result: String,
    pub result_code: ResultCode,
    pub wid: Wid,
    pub desire: Option<Desire>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventData {
    pub event: Event,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventsData {
    pub events: Vec<Event>,
}

impl_reply!(
    CredentialsData,
    StatusData,
    CharacterData,
    WorldsData,
    WorldData,
    LocationData,
    TileData,
    DesireData,
);
