//! Desire resolution
//!
//! State changes bystanders can see (moving, picking up, dropping, applying)
//! become public events. Everything else, including every failure, is a
//! notice queued on the acting character only.

use rand::RngCore;

use super::Location;
use crate::desire::Desire;
use crate::error::DomainError;
use crate::event::Event;
use crate::geometry::{Direction, Position};
use crate::ids::Wid;
use crate::object::{Object, WorldObject};

const BUMP: &str = "*bump*";
const BUMP_EDGE: &str = "*pmub*";

const CANT_REACH: &str = "You can't reach that.";
const CANT_PICK_UP: &str = "You can't pick that up.";
const NOT_OWNED: &str = "You don't have that.";
const KICK_AIR: &str = "You kick at the air.";
const LOCKED: &str = "It is locked.";
const ALREADY_OPEN: &str = "It is already open.";
const ALREADY_CLOSED: &str = "It is already closed.";

impl Location {
    pub(super) fn resolve(
        &mut self,
        wid: Wid,
        desire: Desire,
        rng: &mut dyn RngCore,
        events: &mut Vec<Event>,
    ) {
        match desire {
            Desire::Move { direction } => self.resolve_move(wid, direction, events),
            Desire::Apply { wid: target, applied } => {
                self.resolve_apply(wid, target, applied, events)
            }
            Desire::Pickup { wid: target } => self.resolve_pickup(wid, target, events),
            Desire::Drop { wid: target } => self.resolve_drop(wid, target, events),
            Desire::Bash { wid: target } => self.resolve_bash(wid, target, rng),
            Desire::Open { wid: target, open } => self.resolve_open(wid, target, open),
        }
    }

    fn notify(&mut self, wid: Wid, message: impl Into<String>) {
        if let Some(character) = self.character_mut(wid) {
            character.notice(message);
        }
    }

    /// Step a character one cell in `direction`.
    pub fn move_character(
        &mut self,
        wid: Wid,
        direction: Direction,
    ) -> Result<Position, DomainError> {
        let from = self
            .character(wid)
            .map(WorldObject::position)
            .ok_or(DomainError::CharacterNotInLocation(wid))?;
        let to = from.offset(direction);
        let cell = self
            .cell(to)
            .ok_or(DomainError::out_of_bounds(to.x, to.y))?;
        if cell.blocks_all() || self.objects_at(to).any(Object::blocks_movement) {
            return Err(DomainError::blocked(to.x, to.y));
        }
        if let Some(character) = self.character_mut(wid) {
            character.base.position = to;
        }
        Ok(to)
    }

    fn resolve_move(&mut self, wid: Wid, direction: Direction, events: &mut Vec<Event>) {
        let repeated = self.character(wid).is_some_and(|c| {
            matches!(c.last_desire, Some(Desire::Move { direction: last }) if last == direction)
        });
        match self.move_character(wid, direction) {
            Ok(position) => events.push(Event::Position { wid, position }),
            Err(DomainError::MovementBlocked { x, y }) if repeated => events.push(Event::Sound {
                origin: Position::new(x, y),
                message: BUMP.to_string(),
            }),
            Err(DomainError::OutOfBoundCell { x, y }) if repeated => events.push(Event::Sound {
                origin: Position::new(x, y),
                message: BUMP_EDGE.to_string(),
            }),
            Err(_) => {}
        }
    }

    fn resolve_apply(&mut self, wid: Wid, target: Wid, applied: bool, events: &mut Vec<Event>) {
        if self.object(target).is_none() {
            return;
        }
        let catalog = self.catalog.clone();
        let Some(character) = self.character_mut(wid) else {
            return;
        };
        let result = if applied {
            character.apply(target, &catalog)
        } else {
            character.unapply(target)
        };
        match result {
            Ok(()) => events.push(Event::Apply {
                wid,
                target,
                applied,
            }),
            Err(error) => {
                let message = match error {
                    DomainError::NotOwned(_) => NOT_OWNED.to_string(),
                    DomainError::AlreadyApplied => "You are already using that.".to_string(),
                    DomainError::NotApplied => "You are not using that.".to_string(),
                    DomainError::SlotOccupied(slot) => format!("Your {slot} slot is in use."),
                    _ => "You can't use that.".to_string(),
                };
                character.notice(message);
            }
        }
    }

    fn resolve_pickup(&mut self, wid: Wid, target: Wid, events: &mut Vec<Event>) {
        let Some(actor) = self.character(wid).map(WorldObject::position) else {
            return;
        };
        let verdict = match self.object(target) {
            None => Err(CANT_REACH),
            Some(object) if object.position() != actor => Err(CANT_REACH),
            Some(object) if object.is_contained() || !object.is_lootable() => Err(CANT_PICK_UP),
            Some(_) => Ok(()),
        };
        if let Err(message) = verdict {
            self.notify(wid, message);
            return;
        }

        let Some(index) = self.objects.iter().position(|o| o.wid() == target) else {
            return;
        };
        let object = self.objects.remove(index);
        if let Some(character) = self.character_mut(wid) {
            character.stow(object);
            events.push(Event::Pickup { wid, target });
        }
    }

    fn resolve_drop(&mut self, wid: Wid, target: Wid, events: &mut Vec<Event>) {
        let Some(character) = self.character_mut(wid) else {
            return;
        };
        match character.unstow(target) {
            Ok(object) => {
                let position = object.position();
                self.objects.push(object);
                events.push(Event::Drop {
                    wid,
                    target,
                    position,
                });
            }
            Err(_) => character.notice(NOT_OWNED),
        }
    }

    fn resolve_bash(&mut self, wid: Wid, target: Wid, rng: &mut dyn RngCore) {
        let Some(stats) = self.character(wid).map(|c| c.stats(&self.catalog)) else {
            return;
        };
        let Some(object) = self.object(target) else {
            self.notify(wid, KICK_AIR);
            return;
        };
        let title = self.catalog.title(object.archetype()).to_lowercase();

        let damage = stats.damage.roll(rng);
        let message = match self.object_mut(target).and_then(|o| o.take_damage(damage)) {
            Some(_) => format!("You hit the {title} for {damage}."),
            None => format!("You bash the {title}. Nothing happens."),
        };
        self.notify(wid, message);
    }

    fn resolve_open(&mut self, wid: Wid, target: Wid, open: bool) {
        let verb = if open { "open" } else { "close" };
        let message = match self.object_mut(target) {
            None => format!("There is nothing to {verb}."),
            Some(Object::Door(door)) => {
                let result = if open { door.open() } else { door.close() };
                match result {
                    Ok(()) => format!("You {verb} the door."),
                    Err(DomainError::Locked) => LOCKED.to_string(),
                    Err(DomainError::AlreadyOpen) => ALREADY_OPEN.to_string(),
                    Err(_) => ALREADY_CLOSED.to_string(),
                }
            }
            Some(_) => format!("You cannot {verb} that."),
        };
        self.notify(wid, message);
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::cell::Cell;
    use crate::location::fixtures::*;
    use crate::object::{Door, Equipment, Mob};

    fn notices(location: &mut Location, wid: Wid) -> Vec<String> {
        location
            .take_private_events(wid)
            .into_iter()
            .filter_map(|e| match e {
                Event::Notice { message } => Some(message),
                _ => None,
            })
            .collect()
    }

    /// Set a desire and run one tick, skipping the queued add events.
    fn act(location: &mut Location, rng: &mut StdRng, wid: Wid, desire: Desire) -> Vec<Event> {
        location.set_desire(wid, desire).unwrap();
        location
            .process(rng)
            .into_iter()
            .filter(|e| !matches!(e, Event::Add { .. }))
            .collect()
    }

    #[test]
    fn test_move_in_every_direction() {
        for direction in Direction::ALL {
            let mut location = open_location(5, 5);
            let mut rng = StdRng::seed_from_u64(1);
            let wid = fighter_at(&mut location, &mut rng, Position::new(2, 2));

            let to = location.move_character(wid, direction).unwrap();

            let (dx, dy) = direction.delta();
            assert_eq!(to, Position::new(2 + dx, 2 + dy));
            assert_eq!(location.character(wid).unwrap().position(), to);
        }
    }

    #[test]
    fn test_move_into_solid_cell_is_blocked() {
        let mut location = open_location(5, 5);
        let mut rng = StdRng::seed_from_u64(1);
        let wid = fighter_at(&mut location, &mut rng, Position::new(2, 2));
        location.set_cell(Position::new(3, 2), Cell::solid(None));

        assert_eq!(
            location.move_character(wid, Direction::East),
            Err(DomainError::blocked(3, 2))
        );
        assert_eq!(
            location.character(wid).unwrap().position(),
            Position::new(2, 2)
        );
    }

    #[test]
    fn test_closed_door_blocks_until_opened() {
        let mut location = open_location(5, 5);
        let mut rng = StdRng::seed_from_u64(1);
        let wid = fighter_at(&mut location, &mut rng, Position::new(2, 2));
        let door = location.place_object(
            Object::Door(Door::new(id("door:oak"), false)),
            Position::new(2, 1),
        );

        assert_eq!(
            location.move_character(wid, Direction::North),
            Err(DomainError::blocked(2, 1))
        );
        act(&mut location, &mut rng, wid, Desire::Open { wid: door, open: true });
        assert_eq!(
            location.move_character(wid, Direction::North),
            Ok(Position::new(2, 1))
        );
    }

    #[test]
    fn test_repeated_bump_makes_exactly_one_sound() {
        let mut location = open_location(5, 5);
        let mut rng = StdRng::seed_from_u64(1);
        let wid = fighter_at(&mut location, &mut rng, Position::new(2, 2));
        location.set_cell(Position::new(2, 3), Cell::solid(None));
        let bump = Desire::Move {
            direction: Direction::South,
        };

        let first = act(&mut location, &mut rng, wid, bump);
        let second = act(&mut location, &mut rng, wid, bump);

        assert!(first.is_empty());
        assert_eq!(
            second,
            vec![Event::Sound {
                origin: Position::new(2, 3),
                message: "*bump*".into()
            }]
        );
    }

    #[test]
    fn test_repeated_edge_bump_sounds_reversed() {
        let mut location = open_location(3, 3);
        let mut rng = StdRng::seed_from_u64(1);
        let wid = fighter_at(&mut location, &mut rng, Position::new(0, 0));
        let bump = Desire::Move {
            direction: Direction::West,
        };

        act(&mut location, &mut rng, wid, bump);
        let events = act(&mut location, &mut rng, wid, bump);

        assert_eq!(
            events,
            vec![Event::Sound {
                origin: Position::new(-1, 0),
                message: "*pmub*".into()
            }]
        );
    }

    #[test]
    fn test_successful_move_is_public() {
        let mut location = open_location(4, 4);
        let mut rng = StdRng::seed_from_u64(1);
        let wid = fighter_at(&mut location, &mut rng, Position::new(1, 1));

        let events = act(
            &mut location,
            &mut rng,
            wid,
            Desire::Move {
                direction: Direction::SouthEast,
            },
        );

        assert_eq!(
            events,
            vec![Event::Position {
                wid,
                position: Position::new(2, 2)
            }]
        );
    }

    #[test]
    fn test_pickup_then_drop_keeps_the_wid() {
        let mut location = open_location(5, 5);
        let mut rng = StdRng::seed_from_u64(1);
        let wid = fighter_at(&mut location, &mut rng, Position::new(1, 1));
        let torch = location.place_object(
            Object::Item(Equipment::new(id("item:torch"))),
            Position::new(1, 1),
        );

        let events = act(&mut location, &mut rng, wid, Desire::Pickup { wid: torch });
        assert_eq!(events, vec![Event::Pickup { wid, target: torch }]);
        assert!(location.objects_at(Position::new(1, 1)).all(|o| o.wid() != torch));
        assert!(location.character(wid).unwrap().owns(torch));
        assert_eq!(location.object(torch).unwrap().position(), Position::CONTAINED);

        location.move_character(wid, Direction::East).unwrap();
        let events = act(&mut location, &mut rng, wid, Desire::Drop { wid: torch });
        assert_eq!(
            events,
            vec![Event::Drop {
                wid,
                target: torch,
                position: Position::new(2, 1)
            }]
        );
        assert!(location.objects_at(Position::new(2, 1)).any(|o| o.wid() == torch));
        assert!(!location.character(wid).unwrap().owns(torch));
    }

    #[test]
    fn test_pickup_out_of_reach_is_private() {
        let mut location = open_location(5, 5);
        let mut rng = StdRng::seed_from_u64(1);
        let wid = fighter_at(&mut location, &mut rng, Position::new(1, 1));
        let torch = location.place_object(
            Object::Item(Equipment::new(id("item:torch"))),
            Position::new(3, 3),
        );

        let events = act(&mut location, &mut rng, wid, Desire::Pickup { wid: torch });

        assert!(events.is_empty());
        assert_eq!(notices(&mut location, wid), vec![CANT_REACH]);
    }

    #[test]
    fn test_only_lootable_kinds_can_be_picked_up() {
        let mut location = open_location(5, 5);
        let mut rng = StdRng::seed_from_u64(1);
        let wid = fighter_at(&mut location, &mut rng, Position::new(1, 1));
        let door = location.place_object(
            Object::Door(Door::new(id("door:oak"), false)),
            Position::new(1, 1),
        );
        let rat = location.place_object(
            Object::Mob(Mob::new(id("character:fighter"), 4)),
            Position::new(1, 1),
        );

        act(&mut location, &mut rng, wid, Desire::Pickup { wid: door });
        act(&mut location, &mut rng, wid, Desire::Pickup { wid: rat });
        act(&mut location, &mut rng, wid, Desire::Pickup { wid });

        assert_eq!(
            notices(&mut location, wid),
            vec![CANT_PICK_UP, CANT_PICK_UP, CANT_PICK_UP]
        );
    }

    #[test]
    fn test_drop_of_unowned_object_is_private() {
        let mut location = open_location(4, 4);
        let mut rng = StdRng::seed_from_u64(1);
        let wid = fighter_at(&mut location, &mut rng, Position::new(1, 1));

        let events = act(&mut location, &mut rng, wid, Desire::Drop { wid: Wid::new(77) });

        assert!(events.is_empty());
        assert_eq!(notices(&mut location, wid), vec![NOT_OWNED]);
    }

    #[test]
    fn test_bash_at_nothing_kicks_the_air() {
        let mut location = open_location(4, 4);
        let mut rng = StdRng::seed_from_u64(1);
        let wid = fighter_at(&mut location, &mut rng, Position::new(1, 1));
        assert!(location.character(wid).unwrap().inventory.is_empty());

        let events = act(&mut location, &mut rng, wid, Desire::Bash { wid: Wid::new(404) });

        assert!(events.is_empty());
        assert_eq!(
            location.take_private_events(wid),
            vec![Event::Notice {
                message: KICK_AIR.into()
            }]
        );
    }

    #[test]
    fn test_bash_damages_privately() {
        let mut location = open_location(4, 4);
        let mut rng = StdRng::seed_from_u64(1);
        let wid = fighter_at(&mut location, &mut rng, Position::new(1, 1));
        let rat = location.place_object(
            Object::Mob(Mob::new(id("character:fighter"), 5)),
            Position::new(2, 1),
        );

        let events = act(&mut location, &mut rng, wid, Desire::Bash { wid: rat });

        assert!(events.is_empty());
        assert_eq!(
            notices(&mut location, wid),
            vec!["You hit the fighter for 3."]
        );
        assert!(matches!(location.object(rat), Some(Object::Mob(m)) if m.health == 2));
    }

    #[test]
    fn test_door_open_and_close_are_idempotent() {
        let mut location = open_location(4, 4);
        let mut rng = StdRng::seed_from_u64(1);
        let wid = fighter_at(&mut location, &mut rng, Position::new(1, 1));
        let door = location.place_object(
            Object::Door(Door::new(id("door:oak"), false)),
            Position::new(1, 2),
        );
        let open = Desire::Open { wid: door, open: true };
        let close = Desire::Open { wid: door, open: false };

        for desire in [open, open, close, close] {
            let events = act(&mut location, &mut rng, wid, desire);
            assert!(events.is_empty());
        }

        assert_eq!(
            notices(&mut location, wid),
            vec![
                "You open the door.",
                ALREADY_OPEN,
                "You close the door.",
                ALREADY_CLOSED
            ]
        );
        assert!(matches!(location.object(door), Some(Object::Door(d)) if !d.open));
    }

    #[test]
    fn test_locked_door_stays_shut() {
        let mut location = open_location(4, 4);
        let mut rng = StdRng::seed_from_u64(1);
        let wid = fighter_at(&mut location, &mut rng, Position::new(1, 1));
        let door = location.place_object(
            Object::Door(Door::new(id("door:oak"), true)),
            Position::new(1, 2),
        );

        act(&mut location, &mut rng, wid, Desire::Open { wid: door, open: true });

        assert_eq!(notices(&mut location, wid), vec![LOCKED]);
    }

    #[test]
    fn test_apply_is_public_and_failures_private() {
        let mut location = open_location(4, 4);
        let mut rng = StdRng::seed_from_u64(1);
        let character = fighter(&location).with_inventory(vec![
            Object::Weapon(Equipment::new(id("weapon:dagger"))),
            Object::Weapon(Equipment::new(id("weapon:dagger"))),
        ]);
        let wid = location.add_character(character, &mut rng).unwrap();
        let (first, second) = {
            let c = location.character(wid).unwrap();
            (c.inventory[0].wid(), c.inventory[1].wid())
        };

        let events = act(
            &mut location,
            &mut rng,
            wid,
            Desire::Apply {
                wid: first,
                applied: true,
            },
        );
        assert_eq!(
            events,
            vec![Event::Apply {
                wid,
                target: first,
                applied: true
            }]
        );

        let events = act(
            &mut location,
            &mut rng,
            wid,
            Desire::Apply {
                wid: second,
                applied: true,
            },
        );
        assert!(events.is_empty());
        assert_eq!(notices(&mut location, wid), vec!["Your hands slot is in use."]);
    }

    #[test]
    fn test_apply_on_missing_object_is_ignored() {
        let mut location = open_location(4, 4);
        let mut rng = StdRng::seed_from_u64(1);
        let wid = fighter_at(&mut location, &mut rng, Position::new(1, 1));

        let events = act(
            &mut location,
            &mut rng,
            wid,
            Desire::Apply {
                wid: Wid::new(321),
                applied: true,
            },
        );

        assert!(events.is_empty());
        assert!(location.take_private_events(wid).is_empty());
    }

    #[test]
    fn test_dropping_applied_item_unapplies_it() {
        let mut location = open_location(4, 4);
        let mut rng = StdRng::seed_from_u64(1);
        let character = fighter(&location)
            .with_inventory(vec![Object::Armor(Equipment::new(id("armor:helm")))]);
        let wid = location.add_character(character, &mut rng).unwrap();
        let helm = location.character(wid).unwrap().inventory[0].wid();

        act(
            &mut location,
            &mut rng,
            wid,
            Desire::Apply {
                wid: helm,
                applied: true,
            },
        );
        act(&mut location, &mut rng, wid, Desire::Drop { wid: helm });

        assert!(!location.object(helm).unwrap().is_applied());
    }
}
