use serde::{Deserialize, Serialize};

use crate::geometry::Position;
use crate::ids::Wid;
use crate::object::Object;

/// Something that happened in a location. Transient: forwarded, never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "kebab-case")]
pub enum Event {
    Position { wid: Wid, position: Position },
    Sound { origin: Position, message: String },
    Remove { wid: Wid },
    Add { object: Object },
    Pickup { wid: Wid, target: Wid },
    Drop { wid: Wid, target: Wid, position: Position },
    Apply { wid: Wid, target: Wid, applied: bool },
    Notice { message: String },
    Turn { round: u64 },
}

impl Event {
    /// The acting character, for events that have one.
    pub fn actor(&self) -> Option<Wid> {
        match self {
            Event::Position { wid, .. }
            | Event::Pickup { wid, .. }
            | Event::Drop { wid, .. }
            | Event::Apply { wid, .. } => Some(*wid),
            _ => None,
        }
    }

    /// Whether the actor's inventory changed.
    pub fn changes_inventory(&self) -> bool {
        matches!(
            self,
            Event::Pickup { .. } | Event::Drop { .. } | Event::Apply { .. }
        )
    }
}
