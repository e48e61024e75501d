//! Location - the turn and event engine for one grid
//!
//! A location owns its cells and every object in it. Top-level objects live
//! in a flat list; anything carried lives only inside its owner's inventory,
//! so there is exactly one copy of every object.
//!
//! A location is active while at least one player character is present. Only
//! active locations do any work in [`Location::process`]. Events produced by
//! `add_character`/`remove_character` are queued and handed out by the next
//! `process` call, ahead of the events of that tick.

mod pacing;
mod resolve;

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};

use crate::catalog::Catalog;
use crate::cell::{BlockKind, Cell};
use crate::character::Character;
use crate::desire::Desire;
use crate::error::DomainError;
use crate::event::Event;
use crate::generation::GenGrid;
use crate::geometry::Position;
use crate::ids::{LocationId, Wid, WidGenerator};
use crate::object::{Object, WorldObject};

pub use pacing::{Pace, TurnPacing, OUT_OF_COMBAT_LATCH};

/// Called whenever a turn completes, with the location's top-level objects.
///
/// Non-player behaviour plugs in here. Events pushed are public.
pub trait TurnHook: Send {
    fn on_turn(&mut self, pace: Pace, objects: &mut [Object], events: &mut Vec<Event>);
}

/// What a client needs to draw a location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationSnapshot {
    pub id: LocationId,
    pub width: i32,
    pub height: i32,
    /// Rows of cells, north to south.
    pub cells: Vec<Vec<Cell>>,
    /// Objects on the grid; carried objects travel inside their owner.
    pub objects: Vec<Object>,
}

pub struct Location {
    id: LocationId,
    width: i32,
    height: i32,
    cells: Vec<Cell>,
    objects: Vec<Object>,
    roster: Vec<Wid>,
    active: bool,
    empty_since: Option<DateTime<Utc>>,
    pacing: TurnPacing,
    outbox: Vec<Event>,
    catalog: Arc<Catalog>,
    wids: Arc<WidGenerator>,
    hook: Option<Box<dyn TurnHook>>,
}

impl fmt::Debug for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Location")
            .field("id", &self.id)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("objects", &self.objects.len())
            .field("roster", &self.roster)
            .field("active", &self.active)
            .finish_non_exhaustive()
    }
}

impl Location {
    /// Build a location from row-major cells. Missing cells are solid.
    pub fn new(
        id: LocationId,
        width: i32,
        height: i32,
        mut cells: Vec<Cell>,
        catalog: Arc<Catalog>,
        wids: Arc<WidGenerator>,
    ) -> Self {
        let len = (width.max(0) * height.max(0)) as usize;
        cells.resize(len, Cell::solid(None));
        Self {
            id,
            width,
            height,
            cells,
            objects: Vec::new(),
            roster: Vec::new(),
            active: false,
            empty_since: None,
            pacing: TurnPacing::new(),
            outbox: Vec::new(),
            catalog,
            wids,
            hook: None,
        }
    }

    /// Turn a generated grid into cells: room floor becomes open, the rest solid.
    pub fn from_grid(
        id: LocationId,
        grid: &GenGrid,
        catalog: Arc<Catalog>,
        wids: Arc<WidGenerator>,
    ) -> Self {
        let floor = catalog.first_tile(BlockKind::None);
        let wall = catalog.first_tile(BlockKind::All);
        let cells = grid
            .iter()
            .map(|(_, _, cell)| {
                if cell.is_walkable() {
                    Cell::open(floor)
                } else {
                    Cell::solid(wall)
                }
            })
            .collect();
        Self::new(id, grid.width(), grid.height(), cells, catalog, wids)
    }

    pub fn with_hook(mut self, hook: impl TurnHook + 'static) -> Self {
        self.hook = Some(Box::new(hook));
        self
    }

    pub fn id(&self) -> LocationId {
        self.id
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// When the last player character left, if the location is empty.
    pub fn idle_since(&self) -> Option<DateTime<Utc>> {
        self.empty_since
    }

    pub fn round(&self) -> u64 {
        self.pacing.round()
    }

    pub fn in_turns(&self) -> bool {
        self.pacing.in_turns()
    }

    pub fn start_turns(&mut self) {
        self.pacing.start_turns();
    }

    pub fn stop_turns(&mut self) {
        self.pacing.stop_turns();
    }

    /// Player characters in join order.
    pub fn roster(&self) -> &[Wid] {
        &self.roster
    }

    pub fn objects(&self) -> &[Object] {
        &self.objects
    }

    fn index(&self, position: Position) -> Option<usize> {
        if position.x < 0 || position.y < 0 || position.x >= self.width || position.y >= self.height
        {
            return None;
        }
        Some((position.y * self.width + position.x) as usize)
    }

    pub fn cell(&self, position: Position) -> Option<&Cell> {
        self.index(position).map(|i| &self.cells[i])
    }

    pub fn set_cell(&mut self, position: Position, cell: Cell) {
        if let Some(i) = self.index(position) {
            self.cells[i] = cell;
        }
    }

    /// Grid-visible objects on a cell. Carried objects never match.
    pub fn objects_at(&self, position: Position) -> impl Iterator<Item = &Object> + '_ {
        self.objects
            .iter()
            .filter(move |o| !o.is_contained() && o.position() == position)
    }

    /// Any object in the location, on the grid or carried.
    pub fn object(&self, wid: Wid) -> Option<&Object> {
        self.objects.iter().find(|o| o.wid() == wid).or_else(|| {
            self.objects
                .iter()
                .filter_map(Object::as_character)
                .find_map(|c| c.inventory_item(wid))
        })
    }

    pub(crate) fn object_mut(&mut self, wid: Wid) -> Option<&mut Object> {
        if let Some(i) = self.objects.iter().position(|o| o.wid() == wid) {
            return self.objects.get_mut(i);
        }
        self.objects
            .iter_mut()
            .filter_map(Object::as_character_mut)
            .find_map(|c| c.inventory_item_mut(wid))
    }

    pub fn character(&self, wid: Wid) -> Option<&Character> {
        self.objects
            .iter()
            .filter_map(Object::as_character)
            .find(|c| c.wid() == wid)
    }

    pub(crate) fn character_mut(&mut self, wid: Wid) -> Option<&mut Character> {
        self.objects
            .iter_mut()
            .filter_map(Object::as_character_mut)
            .find(|c| c.wid() == wid)
    }

    /// Place a character on a random open cell and add it to the roster.
    pub fn add_character(
        &mut self,
        mut character: Character,
        rng: &mut dyn RngCore,
    ) -> Result<Wid, DomainError> {
        let wid = character.wid();
        if !wid.is_none() && self.roster.contains(&wid) {
            return Err(DomainError::CharacterAlreadyInLocation(wid));
        }
        let open: Vec<usize> = self
            .cells
            .iter()
            .enumerate()
            .filter(|(_, cell)| cell.is_open())
            .map(|(i, _)| i)
            .collect();
        if open.is_empty() {
            return Err(DomainError::CharacterCannotPlaceInLocation);
        }
        let index = open[rng.gen_range(0..open.len())] as i32;

        character.assign_wids(&self.wids);
        character.base.position = Position::new(index % self.width, index / self.width);
        character.desire = None;
        character.last_desire = None;
        let wid = character.wid();

        self.outbox.push(Event::Add {
            object: Object::Character(character.clone()),
        });
        self.objects.push(Object::Character(character));
        self.roster.push(wid);
        self.active = true;
        self.empty_since = None;
        self.pacing.join();
        Ok(wid)
    }

    /// Take a character and everything it carries out of the location.
    pub fn remove_character(
        &mut self,
        wid: Wid,
        now: DateTime<Utc>,
    ) -> Result<Character, DomainError> {
        let slot = self
            .roster
            .iter()
            .position(|w| *w == wid)
            .ok_or(DomainError::CharacterNotInLocation(wid))?;
        let index = self
            .objects
            .iter()
            .position(|o| o.wid() == wid && o.as_character().is_some())
            .ok_or(DomainError::CharacterNotInLocation(wid))?;

        let Object::Character(mut character) = self.objects.remove(index) else {
            return Err(DomainError::CharacterNotInLocation(wid));
        };
        self.roster.remove(slot);
        self.pacing.leave(wid);
        self.outbox.push(Event::Remove { wid });
        if self.roster.is_empty() {
            self.active = false;
            self.empty_since = Some(now);
        }
        character.desire = None;
        Ok(character)
    }

    /// Put a non-player object on the grid, returning its new WID.
    pub fn place_object(&mut self, mut object: Object, position: Position) -> Wid {
        let wid = self.wids.next();
        let base = object.base_mut();
        base.wid = wid;
        base.position = position;
        base.container = None;
        self.outbox.push(Event::Add {
            object: object.clone(),
        });
        self.objects.push(object);
        wid
    }

    /// Store the next action for a character, replacing any unprocessed one.
    pub fn set_desire(&mut self, wid: Wid, desire: Desire) -> Result<(), DomainError> {
        if !self.roster.contains(&wid) {
            return Err(DomainError::CharacterNotInLocation(wid));
        }
        let character = self
            .character_mut(wid)
            .ok_or(DomainError::CharacterNotInLocation(wid))?;
        character.desire = Some(desire);
        Ok(())
    }

    /// Drain the notices meant only for one character.
    pub fn take_private_events(&mut self, wid: Wid) -> Vec<Event> {
        self.character_mut(wid)
            .map(Character::take_events)
            .unwrap_or_default()
    }

    /// Advance the location by one tick and return its public events.
    pub fn process(&mut self, rng: &mut dyn RngCore) -> Vec<Event> {
        let mut events = std::mem::take(&mut self.outbox);
        if !self.active {
            return events;
        }

        for wid in self.roster.clone() {
            if !self.pacing.can_act(wid) {
                continue;
            }
            let Some(desire) = self.character_mut(wid).and_then(|c| c.desire.take()) else {
                continue;
            };
            self.resolve(wid, desire, rng, &mut events);
            if let Some(character) = self.character_mut(wid) {
                character.last_desire = Some(desire);
            }
            self.pacing.record_action(wid);
        }

        let pace = self.pacing.advance();
        if let Pace::Round(round) = pace {
            events.push(Event::Turn { round });
        }
        if pace != Pace::Continue {
            if let Some(hook) = self.hook.as_mut() {
                hook.on_turn(pace, &mut self.objects, &mut events);
            }
        }
        events
    }

    pub fn snapshot(&self) -> LocationSnapshot {
        let width = self.width.max(1) as usize;
        LocationSnapshot {
            id: self.id,
            width: self.width,
            height: self.height,
            cells: self.cells.chunks(width).map(<[Cell]>::to_vec).collect(),
            objects: self
                .objects
                .iter()
                .filter(|o| !o.is_contained())
                .cloned()
                .collect(),
        }
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use std::collections::BTreeMap;

    use super::*;
    use crate::archetype::{
        Archetype, ArmorArchetype, CharacterArchetype, DamageProfile, DoorArchetype,
        ItemArchetype, TileArchetype, WeaponArchetype,
    };
    use crate::ids::{ContentId, Namespaces};

    pub fn catalog(ns: &Namespaces) -> Catalog {
        let mut catalog = Catalog::new();
        let entries = [
            (
                "tile:floor",
                Archetype::Tile(TileArchetype {
                    title: "Floor".into(),
                    image: String::new(),
                    blocks: BlockKind::None,
                }),
            ),
            (
                "tile:wall",
                Archetype::Tile(TileArchetype {
                    title: "Wall".into(),
                    image: String::new(),
                    blocks: BlockKind::All,
                }),
            ),
            (
                "character:fighter",
                Archetype::Character(CharacterArchetype {
                    title: "Fighter".into(),
                    image: String::new(),
                    health: 12,
                    damage: DamageProfile::new(3, 3),
                    skills: BTreeMap::new(),
                    inventory: Vec::new(),
                }),
            ),
            (
                "weapon:dagger",
                Archetype::Weapon(WeaponArchetype {
                    title: "Dagger".into(),
                    image: String::new(),
                    damage: DamageProfile::new(2, 4),
                }),
            ),
            (
                "armor:helm",
                Archetype::Armor(ArmorArchetype {
                    title: "Helm".into(),
                    image: String::new(),
                    slot: "head".into(),
                    armor: 1,
                }),
            ),
            (
                "item:torch",
                Archetype::Item(ItemArchetype {
                    title: "Torch".into(),
                    image: String::new(),
                }),
            ),
            (
                "door:oak",
                Archetype::Door(DoorArchetype {
                    title: "Oak door".into(),
                    image: String::new(),
                    locked: false,
                }),
            ),
        ];
        for (name, archetype) in entries {
            catalog.insert(ns.content_id(name), archetype);
        }
        catalog
    }

    pub fn id(name: &str) -> ContentId {
        Namespaces::default().content_id(name)
    }

    /// An all-open room of the given size.
    pub fn open_location(width: i32, height: i32) -> Location {
        let ns = Namespaces::default();
        let catalog = catalog(&ns);
        let floor = catalog.first_tile(BlockKind::None);
        let cells = vec![Cell::open(floor); (width * height) as usize];
        Location::new(
            LocationId::new(),
            width,
            height,
            cells,
            Arc::new(catalog),
            Arc::new(WidGenerator::new()),
        )
    }

    pub fn fighter(location: &Location) -> Character {
        Character::new("Ana", id("character:fighter"), location.catalog())
    }

    /// Add a fighter and move it onto `position`.
    pub fn fighter_at(location: &mut Location, rng: &mut dyn RngCore, position: Position) -> Wid {
        let character = fighter(location);
        let wid = location
            .add_character(character, rng)
            .expect("open cell available");
        if let Some(c) = location.character_mut(wid) {
            c.base.position = position;
        }
        wid
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::fixtures::*;
    use super::*;
    use crate::generation::StyleRegistry;
    use crate::ids::Namespaces;
    use crate::object::Equipment;

    #[test]
    fn test_add_character_places_on_open_cell_and_activates() {
        let mut location = open_location(5, 5);
        let mut rng = StdRng::seed_from_u64(1);
        let character = fighter(&location)
            .with_inventory(vec![Object::Item(Equipment::new(id("item:torch")))]);

        let wid = location.add_character(character, &mut rng).unwrap();

        assert!(location.is_active());
        assert_eq!(location.roster(), &[wid]);
        let placed = location.character(wid).unwrap();
        assert!(location.cell(placed.position()).unwrap().is_open());
        let torch = placed.inventory[0].wid();
        assert!(!torch.is_none());
        assert_eq!(placed.inventory[0].base().container, Some(wid));
        assert_eq!(location.objects_at(placed.position()).count(), 1);
        assert!(location.object(torch).is_some());
    }

    #[test]
    fn test_add_without_open_cells_leaves_objects_unchanged() {
        let ns = Namespaces::default();
        let catalog = Arc::new(catalog(&ns));
        let mut location = Location::new(
            LocationId::new(),
            3,
            3,
            vec![Cell::solid(None); 9],
            catalog.clone(),
            Arc::new(WidGenerator::new()),
        );
        let mut rng = StdRng::seed_from_u64(1);
        let before = location.objects().to_vec();

        let result = location.add_character(fighter(&location), &mut rng);

        assert_eq!(result, Err(DomainError::CharacterCannotPlaceInLocation));
        assert_eq!(location.objects(), before.as_slice());
        assert!(!location.is_active());
    }

    #[test]
    fn test_adding_the_same_character_twice_fails() {
        let mut location = open_location(4, 4);
        let mut rng = StdRng::seed_from_u64(1);
        let wid = location.add_character(fighter(&location), &mut rng).unwrap();
        let copy = location.character(wid).unwrap().clone();

        assert_eq!(
            location.add_character(copy, &mut rng),
            Err(DomainError::CharacterAlreadyInLocation(wid))
        );
        assert_eq!(location.roster().len(), 1);
    }

    #[test]
    fn test_remove_character_deactivates_and_stamps_idle_time() {
        let mut location = open_location(4, 4);
        let mut rng = StdRng::seed_from_u64(1);
        let wid = location.add_character(fighter(&location), &mut rng).unwrap();
        let now = Utc::now();

        let character = location.remove_character(wid, now).unwrap();

        assert_eq!(character.name, "Ana");
        assert!(!location.is_active());
        assert_eq!(location.idle_since(), Some(now));
        assert!(location.objects().is_empty());
        assert_eq!(
            location.remove_character(wid, now),
            Err(DomainError::CharacterNotInLocation(wid))
        );
    }

    #[test]
    fn test_add_and_remove_are_reported_by_next_process() {
        let mut location = open_location(4, 4);
        let mut rng = StdRng::seed_from_u64(1);
        let wid = location.add_character(fighter(&location), &mut rng).unwrap();

        let events = location.process(&mut rng);
        assert!(matches!(&events[0], Event::Add { object } if object.wid() == wid));

        location.remove_character(wid, Utc::now()).unwrap();
        let events = location.process(&mut rng);
        assert_eq!(events, vec![Event::Remove { wid }]);
        assert!(location.process(&mut rng).is_empty());
    }

    #[test]
    fn test_set_desire_overwrites_pending_desire() {
        let mut location = open_location(4, 4);
        let mut rng = StdRng::seed_from_u64(1);
        let wid = location.add_character(fighter(&location), &mut rng).unwrap();

        location
            .set_desire(wid, Desire::Bash { wid: Wid::new(99) })
            .unwrap();
        location
            .set_desire(wid, Desire::Pickup { wid: Wid::new(98) })
            .unwrap();

        assert_eq!(
            location.character(wid).unwrap().desire,
            Some(Desire::Pickup { wid: Wid::new(98) })
        );
        assert_eq!(
            location.set_desire(Wid::new(500), Desire::Bash { wid }),
            Err(DomainError::CharacterNotInLocation(Wid::new(500)))
        );
    }

    #[test]
    fn test_out_of_combat_turn_is_silent() {
        let mut location = open_location(4, 4);
        let mut rng = StdRng::seed_from_u64(1);
        location.add_character(fighter(&location), &mut rng).unwrap();
        location.process(&mut rng);

        for _ in 1..OUT_OF_COMBAT_LATCH {
            location.process(&mut rng);
        }
        let events: Vec<Event> = (0..OUT_OF_COMBAT_LATCH)
            .flat_map(|_| location.process(&mut rng))
            .collect();

        assert!(events.is_empty());
        assert_eq!(location.round(), 0);
    }

    #[test]
    fn test_in_turns_round_fires_after_each_player_acts_once() {
        let mut location = open_location(6, 6);
        let mut rng = StdRng::seed_from_u64(4);
        let players: Vec<Wid> = (0..3)
            .map(|_| location.add_character(fighter(&location), &mut rng).unwrap())
            .collect();
        location.process(&mut rng);
        location.start_turns();

        for (i, wid) in players.iter().enumerate() {
            location
                .set_desire(*wid, Desire::Bash { wid: Wid::new(999) })
                .unwrap();
            let events = location.process(&mut rng);
            let turned = events.iter().any(|e| matches!(e, Event::Turn { .. }));
            assert_eq!(turned, i == players.len() - 1, "after {} actions", i + 1);
        }
        assert_eq!(location.round(), 1);
    }

    #[test]
    fn test_player_who_acted_waits_for_the_round() {
        let mut location = open_location(6, 6);
        let mut rng = StdRng::seed_from_u64(4);
        let first = location.add_character(fighter(&location), &mut rng).unwrap();
        let second = location.add_character(fighter(&location), &mut rng).unwrap();
        location.process(&mut rng);
        location.start_turns();

        location
            .set_desire(first, Desire::Bash { wid: Wid::new(999) })
            .unwrap();
        location.process(&mut rng);
        location
            .set_desire(first, Desire::Bash { wid: Wid::new(998) })
            .unwrap();
        location.process(&mut rng);
        assert!(location.character(first).unwrap().desire.is_some());
        assert_eq!(location.round(), 0);

        location
            .set_desire(second, Desire::Bash { wid: Wid::new(999) })
            .unwrap();
        let events = location.process(&mut rng);
        assert!(events.contains(&Event::Turn { round: 1 }));

        location.process(&mut rng);
        assert!(location.character(first).unwrap().desire.is_none());
    }

    struct CountingHook(Arc<std::sync::atomic::AtomicUsize>);

    impl TurnHook for CountingHook {
        fn on_turn(&mut self, _pace: Pace, _objects: &mut [Object], _events: &mut Vec<Event>) {
            self.0.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        }
    }

    #[test]
    fn test_turn_hook_runs_once_per_completed_turn() {
        let calls = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let mut location = open_location(4, 4).with_hook(CountingHook(calls.clone()));
        let mut rng = StdRng::seed_from_u64(1);
        location.add_character(fighter(&location), &mut rng).unwrap();

        for _ in 0..OUT_OF_COMBAT_LATCH * 2 {
            location.process(&mut rng);
        }
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 2);
    }

    #[test]
    fn test_from_grid_opens_only_room_floor() {
        let ns = Namespaces::default();
        let catalog = Arc::new(catalog(&ns));
        let mut grid = GenGrid::new(60, 60);
        let mut rng = StdRng::seed_from_u64(7);
        StyleRegistry::with_defaults()
            .generate("rooms", &mut grid, &mut rng)
            .unwrap();

        let location = Location::from_grid(
            LocationId::new(),
            &grid,
            catalog.clone(),
            Arc::new(WidGenerator::new()),
        );

        for (x, y, generated) in grid.iter() {
            let cell = location.cell(Position::new(x, y)).unwrap();
            assert_eq!(cell.is_open(), generated.is_walkable());
            let expected = if generated.is_walkable() {
                catalog.first_tile(BlockKind::None)
            } else {
                catalog.first_tile(BlockKind::All)
            };
            assert_eq!(cell.tile, expected);
        }
    }

    #[test]
    fn test_snapshot_hides_carried_objects() {
        let mut location = open_location(3, 2);
        let mut rng = StdRng::seed_from_u64(1);
        let character = fighter(&location)
            .with_inventory(vec![Object::Item(Equipment::new(id("item:torch")))]);
        location.add_character(character, &mut rng).unwrap();
        location.place_object(
            Object::Item(Equipment::new(id("item:torch"))),
            Position::new(0, 0),
        );

        let snapshot = location.snapshot();
        assert_eq!(snapshot.cells.len(), 2);
        assert_eq!(snapshot.cells[0].len(), 3);
        assert_eq!(snapshot.objects.len(), 2);
    }
}
