use serde::{Deserialize, Serialize};

use crate::geometry::Direction;
use crate::ids::Wid;

/// What a client wants its character to do on the next tick.
///
/// A character holds at most one; a newer desire overwrites an unprocessed one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "kebab-case")]
pub enum Desire {
    Move { direction: Direction },
    /// `applied == false` unapplies.
    Apply { wid: Wid, applied: bool },
    Pickup { wid: Wid },
    Drop { wid: Wid },
    Bash { wid: Wid },
    /// `open == false` closes.
    Open { wid: Wid, open: bool },
}
