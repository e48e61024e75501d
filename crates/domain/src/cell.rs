use serde::{Deserialize, Serialize};

use crate::ids::ContentId;

/// Which movers a cell stops. Only `None` cells accept a newly placed character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BlockKind {
    #[default]
    None,
    Walk,
    Swim,
    Hover,
    Fly,
    All,
}

/// One grid tile of a location.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Cell {
    pub tile: Option<ContentId>,
    pub blocks: BlockKind,
}

impl Cell {
    pub fn open(tile: Option<ContentId>) -> Self {
        Self {
            tile,
            blocks: BlockKind::None,
        }
    }

    pub fn solid(tile: Option<ContentId>) -> Self {
        Self {
            tile,
            blocks: BlockKind::All,
        }
    }

    pub fn is_open(&self) -> bool {
        self.blocks == BlockKind::None
    }

    pub fn blocks_all(&self) -> bool {
        self.blocks == BlockKind::All
    }
}
