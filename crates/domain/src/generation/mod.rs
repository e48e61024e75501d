//! Dungeon generation
//!
//! A style is an ordered list of passes run over a [`GenerationTarget`]. Styles
//! are registered by name in a [`StyleRegistry`] that is built once at startup
//! and handed to whoever needs to generate a grid. All randomness is injected.

mod boxed;
mod rooms;

use std::collections::HashMap;

use rand::RngCore;
use thiserror::Error;

pub use boxed::BoxPass;
pub use rooms::{JoinWallsPass, RoomsPass};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GenerationError {
    #[error("Unknown generation style: {0}")]
    UnknownStyle(String),

    #[error("Grid {width}x{height} is too small")]
    GridTooSmall { width: i32, height: i32 },
}

/// Generator-side view of a cell.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenCell {
    pub blocked: bool,
    /// Room index when the cell is room floor.
    pub floor: Option<usize>,
    /// Rooms that tagged this cell as wall, without duplicates.
    pub walls: Vec<usize>,
}

impl GenCell {
    /// Neither blocked nor part of a room floor.
    pub fn is_open(&self) -> bool {
        !self.blocked && self.floor.is_none()
    }

    pub fn tag_wall(&mut self, room: usize) {
        if !self.walls.contains(&room) {
            self.walls.push(room);
        }
    }

    /// Walkable once turned into a location cell.
    pub fn is_walkable(&self) -> bool {
        !self.blocked && self.walls.is_empty() && self.floor.is_some()
    }
}

/// Capability handed to passes: read and write cells by coordinate.
pub trait GenerationTarget {
    fn size(&self) -> (i32, i32);
    fn cell(&self, x: i32, y: i32) -> Option<&GenCell>;
    fn set_cell(&mut self, x: i32, y: i32, cell: GenCell);
}

#[derive(Debug, Clone)]
pub struct GenGrid {
    width: i32,
    height: i32,
    cells: Vec<GenCell>,
}

impl GenGrid {
    pub fn new(width: i32, height: i32) -> Self {
        let len = (width.max(0) * height.max(0)) as usize;
        Self {
            width,
            height,
            cells: vec![GenCell::default(); len],
        }
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x >= self.width || y >= self.height {
            return None;
        }
        Some((y * self.width + x) as usize)
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn iter(&self) -> impl Iterator<Item = (i32, i32, &GenCell)> + '_ {
        let width = self.width;
        self.cells
            .iter()
            .enumerate()
            .map(move |(i, cell)| (i as i32 % width, i as i32 / width, cell))
    }
}

impl GenerationTarget for GenGrid {
    fn size(&self) -> (i32, i32) {
        (self.width, self.height)
    }

    fn cell(&self, x: i32, y: i32) -> Option<&GenCell> {
        self.index(x, y).map(|i| &self.cells[i])
    }

    fn set_cell(&mut self, x: i32, y: i32, cell: GenCell) {
        if let Some(i) = self.index(x, y) {
            self.cells[i] = cell;
        }
    }
}

/// One pass of a generation style.
pub trait Pass: Send + Sync {
    fn run(
        &self,
        target: &mut dyn GenerationTarget,
        rng: &mut dyn RngCore,
    ) -> Result<(), GenerationError>;
}

/// A named multi-pass procedure.
#[derive(Default)]
pub struct Style {
    passes: Vec<Box<dyn Pass>>,
}

impl Style {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pass(mut self, pass: impl Pass + 'static) -> Self {
        self.passes.push(Box::new(pass));
        self
    }

    pub fn run(
        &self,
        target: &mut dyn GenerationTarget,
        rng: &mut dyn RngCore,
    ) -> Result<(), GenerationError> {
        for pass in &self.passes {
            pass.run(target, rng)?;
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct StyleRegistry {
    styles: HashMap<String, Style>,
}

impl StyleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in "rooms" and "box" styles.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(
            "rooms",
            Style::new()
                .with_pass(RoomsPass::default())
                .with_pass(JoinWallsPass),
        );
        registry.register("box", Style::new().with_pass(BoxPass));
        registry
    }

    pub fn register(&mut self, name: impl Into<String>, style: Style) {
        self.styles.insert(name.into(), style);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.styles.contains_key(name)
    }

    pub fn generate(
        &self,
        name: &str,
        target: &mut dyn GenerationTarget,
        rng: &mut dyn RngCore,
    ) -> Result<(), GenerationError> {
        let style = self
            .styles
            .get(name)
            .ok_or_else(|| GenerationError::UnknownStyle(name.to_string()))?;
        style.run(target, rng)
    }
}
