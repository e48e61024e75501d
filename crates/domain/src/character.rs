//! Player and non-player characters

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::archetype::DamageProfile;
use crate::catalog::Catalog;
use crate::desire::Desire;
use crate::error::DomainError;
use crate::event::Event;
use crate::geometry::Position;
use crate::ids::{ContentId, Wid, WidGenerator};
use crate::object::{Object, ObjectBase, WorldObject};

const WEAPON_SLOT: &str = "hands";

/// Stats derived from the archetype and whatever is applied. Never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CharacterStats {
    pub max_health: i32,
    pub damage: DamageProfile,
    pub armor: i32,
}

/// A character with an inventory and a pending action.
///
/// # Invariants
///
/// - Every inventory object has `container == Some(self.wid)` once the
///   character has been placed in a location.
/// - `desire`, `last_desire` and `events` are per-tick state and are never
///   persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Character {
    #[serde(flatten)]
    pub base: ObjectBase,
    pub name: String,
    pub health: i32,
    #[serde(default)]
    pub hunger: i32,
    #[serde(default)]
    pub skills: BTreeMap<String, u32>,
    #[serde(default)]
    pub inventory: Vec<Object>,
    #[serde(skip)]
    pub desire: Option<Desire>,
    #[serde(skip)]
    pub last_desire: Option<Desire>,
    #[serde(skip)]
    pub events: Vec<Event>,
}

impl WorldObject for Character {
    fn base(&self) -> &ObjectBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ObjectBase {
        &mut self.base
    }
}

impl Character {
    /// Create a character from its archetype. Unknown archetypes give defaults.
    pub fn new(name: impl Into<String>, archetype: ContentId, catalog: &Catalog) -> Self {
        let template = catalog.character(archetype);
        Self {
            base: ObjectBase::new(archetype),
            name: name.into(),
            health: template.map(|t| t.health).unwrap_or(10),
            hunger: 0,
            skills: template.map(|t| t.skills.clone()).unwrap_or_default(),
            inventory: Vec::new(),
            desire: None,
            last_desire: None,
            events: Vec::new(),
        }
    }

    pub fn with_inventory(mut self, inventory: Vec<Object>) -> Self {
        self.inventory = inventory;
        self
    }

    pub fn stats(&self, catalog: &Catalog) -> CharacterStats {
        let template = catalog.character(self.base.archetype);
        let mut stats = CharacterStats {
            max_health: template.map(|t| t.health).unwrap_or(10),
            damage: template.map(|t| t.damage).unwrap_or_default(),
            armor: 0,
        };
        for object in self.inventory.iter().filter(|o| o.is_applied()) {
            match object {
                Object::Weapon(weapon) => {
                    if let Some(archetype) = catalog.weapon(weapon.base.archetype) {
                        stats.damage = archetype.damage;
                    }
                }
                Object::Armor(armor) => {
                    if let Some(archetype) = catalog.armor(armor.base.archetype) {
                        stats.armor += archetype.armor;
                    }
                }
                _ => {}
            }
        }
        stats
    }

    /// Give the character and everything it carries fresh world ids.
    pub fn assign_wids(&mut self, wids: &WidGenerator) {
        self.base.wid = wids.next();
        let owner = self.base.wid;
        for object in &mut self.inventory {
            let base = object.base_mut();
            base.wid = wids.next();
            base.container = Some(owner);
            base.position = Position::CONTAINED;
        }
    }

    pub fn owns(&self, wid: Wid) -> bool {
        self.inventory.iter().any(|o| o.wid() == wid)
    }

    pub fn inventory_item(&self, wid: Wid) -> Option<&Object> {
        self.inventory.iter().find(|o| o.wid() == wid)
    }

    pub fn inventory_item_mut(&mut self, wid: Wid) -> Option<&mut Object> {
        self.inventory.iter_mut().find(|o| o.wid() == wid)
    }

    /// Put an object into the inventory, marking it as contained.
    pub fn stow(&mut self, mut object: Object) {
        let base = object.base_mut();
        base.container = Some(self.base.wid);
        base.position = Position::CONTAINED;
        self.inventory.push(object);
    }

    /// Take an object out of the inventory, unapplying it first.
    pub fn unstow(&mut self, wid: Wid) -> Result<Object, DomainError> {
        let index = self
            .inventory
            .iter()
            .position(|o| o.wid() == wid)
            .ok_or(DomainError::NotOwned(wid))?;
        let mut object = self.inventory.remove(index);
        if let Some(equipment) = object.as_equipment_mut() {
            equipment.applied = false;
        }
        let base = object.base_mut();
        base.container = None;
        base.position = self.base.position;
        Ok(object)
    }

    pub fn apply(&mut self, wid: Wid, catalog: &Catalog) -> Result<(), DomainError> {
        let slot = {
            let object = self.inventory_item(wid).ok_or(DomainError::NotOwned(wid))?;
            let equipment = object.as_equipment().ok_or(DomainError::NotApplicable)?;
            if equipment.applied {
                return Err(DomainError::AlreadyApplied);
            }
            slot_of(object, catalog)
        };
        if let Some(slot) = slot {
            let occupied = self
                .inventory
                .iter()
                .filter(|o| o.wid() != wid && o.is_applied())
                .any(|o| slot_of(o, catalog).as_deref() == Some(slot.as_str()));
            if occupied {
                return Err(DomainError::slot_occupied(slot));
            }
        }
        if let Some(equipment) = self
            .inventory_item_mut(wid)
            .and_then(Object::as_equipment_mut)
        {
            equipment.applied = true;
        }
        Ok(())
    }

    pub fn unapply(&mut self, wid: Wid) -> Result<(), DomainError> {
        let object = self
            .inventory_item_mut(wid)
            .ok_or(DomainError::NotOwned(wid))?;
        let equipment = object.as_equipment_mut().ok_or(DomainError::NotApplicable)?;
        if !equipment.applied {
            return Err(DomainError::NotApplied);
        }
        equipment.applied = false;
        Ok(())
    }

    pub fn notice(&mut self, message: impl Into<String>) {
        self.events.push(Event::Notice {
            message: message.into(),
        });
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    /// Drop per-tick state and the world id before the character is stored.
    pub fn clear_transient(&mut self) {
        self.base.wid = Wid::NONE;
        self.desire = None;
        self.last_desire = None;
        self.events.clear();
    }
}

fn slot_of(object: &Object, catalog: &Catalog) -> Option<String> {
    match object {
        Object::Weapon(_) => Some(WEAPON_SLOT.to_string()),
        Object::Armor(armor) => catalog.armor(armor.base.archetype).map(|a| a.slot.clone()),
        _ => None,
    }
}
