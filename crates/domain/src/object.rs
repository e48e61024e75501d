//! Runtime objects placed in a location
//!
//! Every variant composes an [`ObjectBase`] and exposes it through the
//! [`WorldObject`] capability trait, so location code can query identity,
//! position and containment without matching on the variant.

use serde::{Deserialize, Serialize};

use crate::character::Character;
use crate::error::DomainError;
use crate::geometry::Position;
use crate::ids::{ContentId, Wid};

/// Fields shared by every object variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectBase {
    pub wid: Wid,
    pub archetype: ContentId,
    pub position: Position,
    /// Owning object when held in an inventory; such objects are off the grid.
    #[serde(default)]
    pub container: Option<Wid>,
}

impl ObjectBase {
    pub fn new(archetype: ContentId) -> Self {
        Self {
            wid: Wid::NONE,
            archetype,
            position: Position::default(),
            container: None,
        }
    }
}

pub trait WorldObject {
    fn base(&self) -> &ObjectBase;
    fn base_mut(&mut self) -> &mut ObjectBase;

    fn wid(&self) -> Wid {
        self.base().wid
    }

    fn archetype(&self) -> ContentId {
        self.base().archetype
    }

    fn position(&self) -> Position {
        self.base().position
    }

    fn is_contained(&self) -> bool {
        self.base().container.is_some()
    }
}

/// Weapons, armor and plain items: things that can be carried and applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Equipment {
    #[serde(flatten)]
    pub base: ObjectBase,
    #[serde(default)]
    pub applied: bool,
}

impl Equipment {
    pub fn new(archetype: ContentId) -> Self {
        Self {
            base: ObjectBase::new(archetype),
            applied: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Door {
    #[serde(flatten)]
    pub base: ObjectBase,
    #[serde(default)]
    pub open: bool,
    #[serde(default)]
    pub locked: bool,
}

impl Door {
    pub fn new(archetype: ContentId, locked: bool) -> Self {
        Self {
            base: ObjectBase::new(archetype),
            open: false,
            locked,
        }
    }

    pub fn open(&mut self) -> Result<(), DomainError> {
        if self.open {
            return Err(DomainError::AlreadyOpen);
        }
        if self.locked {
            return Err(DomainError::Locked);
        }
        self.open = true;
        Ok(())
    }

    pub fn close(&mut self) -> Result<(), DomainError> {
        if !self.open {
            return Err(DomainError::AlreadyClosed);
        }
        self.open = false;
        Ok(())
    }
}

/// Non-player creature. Its behaviour is driven by a location's turn hook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mob {
    #[serde(flatten)]
    pub base: ObjectBase,
    pub health: i32,
}

impl Mob {
    pub fn new(archetype: ContentId, health: i32) -> Self {
        Self {
            base: ObjectBase::new(archetype),
            health,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ObjectKind {
    Character,
    Weapon,
    Armor,
    Item,
    Door,
    Mob,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "kebab-case")]
pub enum Object {
    Character(Character),
    Weapon(Equipment),
    Armor(Equipment),
    Item(Equipment),
    Door(Door),
    Mob(Mob),
}

impl WorldObject for Object {
    fn base(&self) -> &ObjectBase {
        match self {
            Object::Character(c) => &c.base,
            Object::Weapon(e) | Object::Armor(e) | Object::Item(e) => &e.base,
            Object::Door(d) => &d.base,
            Object::Mob(m) => &m.base,
        }
    }

    fn base_mut(&mut self) -> &mut ObjectBase {
        match self {
            Object::Character(c) => &mut c.base,
            Object::Weapon(e) | Object::Armor(e) | Object::Item(e) => &mut e.base,
            Object::Door(d) => &mut d.base,
            Object::Mob(m) => &mut m.base,
        }
    }
}

impl Object {
    pub fn kind(&self) -> ObjectKind {
        match self {
            Object::Character(_) => ObjectKind::Character,
            Object::Weapon(_) => ObjectKind::Weapon,
            Object::Armor(_) => ObjectKind::Armor,
            Object::Item(_) => ObjectKind::Item,
            Object::Door(_) => ObjectKind::Door,
            Object::Mob(_) => ObjectKind::Mob,
        }
    }

    /// Items, armor and weapons are the only kinds that can be picked up.
    pub fn is_lootable(&self) -> bool {
        matches!(self, Object::Weapon(_) | Object::Armor(_) | Object::Item(_))
    }

    pub fn as_character(&self) -> Option<&Character> {
        match self {
            Object::Character(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_character_mut(&mut self) -> Option<&mut Character> {
        match self {
            Object::Character(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_equipment(&self) -> Option<&Equipment> {
        match self {
            Object::Weapon(e) | Object::Armor(e) | Object::Item(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_equipment_mut(&mut self) -> Option<&mut Equipment> {
        match self {
            Object::Weapon(e) | Object::Armor(e) | Object::Item(e) => Some(e),
            _ => None,
        }
    }

    pub fn is_applied(&self) -> bool {
        self.as_equipment().is_some_and(|e| e.applied)
    }

    /// Apply damage if this object can take it, returning remaining health.
    pub fn take_damage(&mut self, amount: i32) -> Option<i32> {
        let health = match self {
            Object::Character(c) => &mut c.health,
            Object::Mob(m) => &mut m.health,
            _ => return None,
        };
        *health = (*health - amount).max(0);
        Some(*health)
    }

    /// Closed doors stop movement onto their cell.
    pub fn blocks_movement(&self) -> bool {
        matches!(self, Object::Door(d) if !d.open)
    }
}
