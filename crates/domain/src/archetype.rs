//! Archetypes - immutable templates for everything that can exist in a location
//!
//! Archetypes are loaded once at startup and never mutated afterwards. Runtime
//! objects refer to them by [`ContentId`](crate::ContentId) and resolve them
//! through the [`Catalog`](crate::Catalog) when they need stats.

use std::collections::BTreeMap;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::cell::BlockKind;

/// Inclusive damage range rolled on a bash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DamageProfile {
    pub min: i32,
    pub max: i32,
}

impl DamageProfile {
    pub const UNARMED: DamageProfile = DamageProfile { min: 1, max: 2 };

    pub fn new(min: i32, max: i32) -> Self {
        Self { min, max }
    }

    pub fn roll<R: Rng + ?Sized>(&self, rng: &mut R) -> i32 {
        if self.max <= self.min {
            return self.min;
        }
        rng.gen_range(self.min..=self.max)
    }
}

impl Default for DamageProfile {
    fn default() -> Self {
        Self::UNARMED
    }
}

fn default_health() -> i32 {
    10
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterArchetype {
    pub title: String,
    #[serde(default)]
    pub image: String,
    #[serde(default = "default_health")]
    pub health: i32,
    #[serde(default)]
    pub damage: DamageProfile,
    #[serde(default)]
    pub skills: BTreeMap<String, u32>,
    /// Starting inventory as `kind:name` references.
    #[serde(default)]
    pub inventory: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeaponArchetype {
    pub title: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub damage: DamageProfile,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArmorArchetype {
    pub title: String,
    #[serde(default)]
    pub image: String,
    pub slot: String,
    #[serde(default)]
    pub armor: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemArchetype {
    pub title: String,
    #[serde(default)]
    pub image: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileArchetype {
    pub title: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub blocks: BlockKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoorArchetype {
    pub title: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub locked: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArchetypeKind {
    Character,
    Weapon,
    Armor,
    Item,
    Tile,
    Door,
}

impl ArchetypeKind {
    pub const ALL: [ArchetypeKind; 6] = [
        ArchetypeKind::Character,
        ArchetypeKind::Weapon,
        ArchetypeKind::Armor,
        ArchetypeKind::Item,
        ArchetypeKind::Tile,
        ArchetypeKind::Door,
    ];

    /// Prefix used in content names, e.g. `tile:cobblestone-floor`.
    pub fn prefix(self) -> &'static str {
        match self {
            ArchetypeKind::Character => "character",
            ArchetypeKind::Weapon => "weapon",
            ArchetypeKind::Armor => "armor",
            ArchetypeKind::Item => "item",
            ArchetypeKind::Tile => "tile",
            ArchetypeKind::Door => "door",
        }
    }

    /// Data directory holding this kind's files.
    pub fn directory(self) -> &'static str {
        match self {
            ArchetypeKind::Character => "characters",
            ArchetypeKind::Weapon => "weapons",
            ArchetypeKind::Armor => "armors",
            ArchetypeKind::Item => "items",
            ArchetypeKind::Tile => "tiles",
            ArchetypeKind::Door => "doors",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "kebab-case")]
pub enum Archetype {
    Character(CharacterArchetype),
    Weapon(WeaponArchetype),
    Armor(ArmorArchetype),
    Item(ItemArchetype),
    Tile(TileArchetype),
    Door(DoorArchetype),
}

impl Archetype {
    pub fn kind(&self) -> ArchetypeKind {
        match self {
            Archetype::Character(_) => ArchetypeKind::Character,
            Archetype::Weapon(_) => ArchetypeKind::Weapon,
            Archetype::Armor(_) => ArchetypeKind::Armor,
            Archetype::Item(_) => ArchetypeKind::Item,
            Archetype::Tile(_) => ArchetypeKind::Tile,
            Archetype::Door(_) => ArchetypeKind::Door,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Archetype::Character(a) => &a.title,
            Archetype::Weapon(a) => &a.title,
            Archetype::Armor(a) => &a.title,
            Archetype::Item(a) => &a.title,
            Archetype::Tile(a) => &a.title,
            Archetype::Door(a) => &a.title,
        }
    }

    pub fn image(&self) -> &str {
        match self {
            Archetype::Character(a) => &a.image,
            Archetype::Weapon(a) => &a.image,
            Archetype::Armor(a) => &a.image,
            Archetype::Item(a) => &a.image,
            Archetype::Tile(a) => &a.image,
            Archetype::Door(a) => &a.image,
        }
    }

    /// Prefix the image path with `dir/`, as done when loading from disk.
    pub fn tag_image(&mut self, dir: &str) {
        let image = match self {
            Archetype::Character(a) => &mut a.image,
            Archetype::Weapon(a) => &mut a.image,
            Archetype::Armor(a) => &mut a.image,
            Archetype::Item(a) => &mut a.image,
            Archetype::Tile(a) => &mut a.image,
            Archetype::Door(a) => &mut a.image,
        };
        if !image.is_empty() {
            *image = format!("{dir}/{image}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_damage_roll_stays_in_range() {
        let mut rng = StdRng::seed_from_u64(7);
        let profile = DamageProfile::new(2, 5);
        for _ in 0..100 {
            let roll = profile.roll(&mut rng);
            assert!((2..=5).contains(&roll));
        }
    }

    #[test]
    fn test_degenerate_damage_returns_min() {
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(DamageProfile::new(3, 3).roll(&mut rng), 3);
    }

    #[test]
    fn test_archetype_uses_type_data_envelope() {
        let archetype = Archetype::Item(ItemArchetype {
            title: "Torch".into(),
            image: "torch.png".into(),
        });
        let json = serde_json::to_value(&archetype).unwrap();
        assert_eq!(json["type"], "item");
        assert_eq!(json["data"]["title"], "Torch");
    }

    #[test]
    fn test_tag_image_prefixes_directory() {
        let mut archetype = Archetype::Tile(TileArchetype {
            title: "Floor".into(),
            image: "floor.png".into(),
            blocks: BlockKind::None,
        });
        archetype.tag_image("tiles");
        assert_eq!(archetype.image(), "tiles/floor.png");
    }
}
