//! Read-only archetype catalog

use crate::archetype::{
    Archetype, ArmorArchetype, CharacterArchetype, DoorArchetype, ItemArchetype, TileArchetype,
    WeaponArchetype,
};
use crate::cell::BlockKind;
use crate::ids::ContentId;
use crate::object::{Door, Equipment, Object};

/// In-memory list of every archetype known to the server.
///
/// Lookups are linear; the catalog is small and built once.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entries: Vec<(ContentId, Archetype)>,
}

macro_rules! typed_view {
    ($fn_name:ident, $variant:ident, $ty:ty) => {
        pub fn $fn_name(&self) -> impl Iterator<Item = (ContentId, &$ty)> + '_ {
            self.entries.iter().filter_map(|(id, archetype)| match archetype {
                Archetype::$variant(inner) => Some((*id, inner)),
                _ => None,
            })
        }
    };
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace an archetype.
    pub fn insert(&mut self, id: ContentId, archetype: Archetype) {
        match self.entries.iter_mut().find(|(existing, _)| *existing == id) {
            Some(entry) => entry.1 = archetype,
            None => self.entries.push((id, archetype)),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn archetype(&self, id: ContentId) -> Option<&Archetype> {
        self.entries
            .iter()
            .find(|(existing, _)| *existing == id)
            .map(|(_, archetype)| archetype)
    }

    pub fn title(&self, id: ContentId) -> &str {
        self.archetype(id).map(Archetype::title).unwrap_or("thing")
    }

    typed_view!(character_archetypes, Character, CharacterArchetype);
    typed_view!(weapon_archetypes, Weapon, WeaponArchetype);
    typed_view!(armor_archetypes, Armor, ArmorArchetype);
    typed_view!(item_archetypes, Item, ItemArchetype);
    typed_view!(tile_archetypes, Tile, TileArchetype);
    typed_view!(door_archetypes, Door, DoorArchetype);

    pub fn character(&self, id: ContentId) -> Option<&CharacterArchetype> {
        match self.archetype(id) {
            Some(Archetype::Character(a)) => Some(a),
            _ => None,
        }
    }

    pub fn weapon(&self, id: ContentId) -> Option<&WeaponArchetype> {
        match self.archetype(id) {
            Some(Archetype::Weapon(a)) => Some(a),
            _ => None,
        }
    }

    pub fn armor(&self, id: ContentId) -> Option<&ArmorArchetype> {
        match self.archetype(id) {
            Some(Archetype::Armor(a)) => Some(a),
            _ => None,
        }
    }

    /// First tile archetype with the given block classification.
    pub fn first_tile(&self, blocks: BlockKind) -> Option<ContentId> {
        self.tile_archetypes()
            .find(|(_, tile)| tile.blocks == blocks)
            .map(|(id, _)| id)
    }

    /// A fresh, unplaced object for a lootable or door archetype.
    ///
    /// Characters and tiles are not spawned this way.
    pub fn spawn(&self, id: ContentId) -> Option<Object> {
        match self.archetype(id)? {
            Archetype::Weapon(_) => Some(Object::Weapon(Equipment::new(id))),
            Archetype::Armor(_) => Some(Object::Armor(Equipment::new(id))),
            Archetype::Item(_) => Some(Object::Item(Equipment::new(id))),
            Archetype::Door(door) => Some(Object::Door(Door::new(id, door.locked))),
            Archetype::Character(_) | Archetype::Tile(_) => None,
        }
    }
}
