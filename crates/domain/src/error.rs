//! Domain error taxonomy
//!
//! Every operation on a location returns one of these on failure. None of them
//! are fatal: the caller turns them into a private notice or a result code for
//! the requesting client.

use thiserror::Error;

use crate::ids::Wid;

/// Unified error type for per-request domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// The character is not in this location
    #[error("Character {0} is not in the location")]
    CharacterNotInLocation(Wid),

    /// The character was already added
    #[error("Character {0} is already in the location")]
    CharacterAlreadyInLocation(Wid),

    /// No open cell exists to place a character on
    #[error("No open cell to place the character")]
    CharacterCannotPlaceInLocation,

    /// Destination cell blocks movement
    #[error("Movement blocked at ({x}, {y})")]
    MovementBlocked { x: i32, y: i32 },

    /// Destination is outside the grid
    #[error("Cell ({x}, {y}) is out of bounds")]
    OutOfBoundCell { x: i32, y: i32 },

    /// No object with that WID exists here
    #[error("Object {0} not found")]
    ObjectNotFound(Wid),

    /// The object is not in the actor's inventory
    #[error("Object {0} is not owned by the actor")]
    NotOwned(Wid),

    /// Another applied object already uses the slot
    #[error("Slot {0} is already occupied")]
    SlotOccupied(String),

    /// The object is already applied
    #[error("Object is already applied")]
    AlreadyApplied,

    /// The object is not applied
    #[error("Object is not applied")]
    NotApplied,

    /// The object cannot be applied, opened or picked up
    #[error("Object cannot be used that way")]
    NotApplicable,

    /// The door is already open
    #[error("Door is already open")]
    AlreadyOpen,

    /// The door is already closed
    #[error("Door is already closed")]
    AlreadyClosed,

    /// The door is locked
    #[error("Door is locked")]
    Locked,
}

impl DomainError {
    /// Create a movement blocked error for the given destination
    pub fn blocked(x: i32, y: i32) -> Self {
        Self::MovementBlocked { x, y }
    }

    /// Create an out of bounds error for the given destination
    pub fn out_of_bounds(x: i32, y: i32) -> Self {
        Self::OutOfBoundCell { x, y }
    }

    /// Create a slot occupied error
    pub fn slot_occupied(slot: impl Into<String>) -> Self {
        Self::SlotOccupied(slot.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blocked_error() {
        let err = DomainError::blocked(3, 4);
        assert!(matches!(err, DomainError::MovementBlocked { x: 3, y: 4 }));
        assert_eq!(err.to_string(), "Movement blocked at (3, 4)");
    }

    #[test]
    fn test_out_of_bounds_error() {
        let err = DomainError::out_of_bounds(-1, 0);
        assert_eq!(err.to_string(), "Cell (-1, 0) is out of bounds");
    }

    #[test]
    fn test_slot_occupied_error() {
        let err = DomainError::slot_occupied("torso");
        assert_eq!(err.to_string(), "Slot torso is already occupied");
    }
}
