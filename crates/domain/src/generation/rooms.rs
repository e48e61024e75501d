use rand::{Rng, RngCore};

use super::{GenCell, GenerationError, GenerationTarget, Pass};

/// Consecutive failed placements after which the pass gives up.
const MAX_CONSECUTIVE_FAILURES: u32 = 20;

/// Quadrants needed for a placement to count.
const MIN_OPEN_QUADRANTS: usize = 2;

/// Scatters rooms built from up to four quadrants around a centre point.
///
/// A placement succeeds when at least two of the north-west, north-east,
/// south-west and south-east rectangles (padded by `overlap`) contain no room
/// floor, no blocked cell and stay inside the grid. Each open quadrant is
/// filled: its outer edges become room wall, the rest room floor. The centre
/// is tagged room wall.
#[derive(Debug, Clone, Copy)]
pub struct RoomsPass {
    pub min_size: i32,
    pub max_size: i32,
    pub max_rooms: usize,
    pub overlap: i32,
}

impl Default for RoomsPass {
    fn default() -> Self {
        Self {
            min_size: 5,
            max_size: 7,
            max_rooms: 20,
            overlap: 0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Rect {
    x0: i32,
    y0: i32,
    x1: i32,
    y1: i32,
}

impl Rect {
    fn padded(self, margin: i32) -> Self {
        Self {
            x0: self.x0 - margin,
            y0: self.y0 - margin,
            x1: self.x1 + margin,
            y1: self.y1 + margin,
        }
    }

    fn points(self) -> impl Iterator<Item = (i32, i32)> {
        (self.y0..=self.y1).flat_map(move |y| (self.x0..=self.x1).map(move |x| (x, y)))
    }
}

#[derive(Debug, Clone, Copy)]
struct Quadrant {
    rect: Rect,
    outer_x: i32,
    outer_y: i32,
}

fn quadrants(cx: i32, cy: i32, half_w: i32, half_h: i32) -> [Quadrant; 4] {
    let (west, east) = (cx - half_w, cx + half_w);
    let (north, south) = (cy - half_h, cy + half_h);
    [
        Quadrant {
            rect: Rect { x0: west, y0: north, x1: cx, y1: cy },
            outer_x: west,
            outer_y: north,
        },
        Quadrant {
            rect: Rect { x0: cx, y0: north, x1: east, y1: cy },
            outer_x: east,
            outer_y: north,
        },
        Quadrant {
            rect: Rect { x0: west, y0: cy, x1: cx, y1: south },
            outer_x: west,
            outer_y: south,
        },
        Quadrant {
            rect: Rect { x0: cx, y0: cy, x1: east, y1: south },
            outer_x: east,
            outer_y: south,
        },
    ]
}

fn is_free(target: &dyn GenerationTarget, rect: Rect) -> bool {
    rect.points().all(|(x, y)| {
        target
            .cell(x, y)
            .is_some_and(|cell| !cell.blocked && cell.floor.is_none())
    })
}

fn random_open_point(target: &dyn GenerationTarget, rng: &mut dyn RngCore) -> Option<(i32, i32)> {
    let (width, height) = target.size();
    let open: Vec<(i32, i32)> = (0..height)
        .flat_map(|y| (0..width).map(move |x| (x, y)))
        .filter(|&(x, y)| target.cell(x, y).is_some_and(GenCell::is_open))
        .collect();
    if open.is_empty() {
        return None;
    }
    Some(open[rng.gen_range(0..open.len())])
}

fn update(target: &mut dyn GenerationTarget, x: i32, y: i32, f: impl FnOnce(&mut GenCell)) {
    if let Some(cell) = target.cell(x, y) {
        let mut cell = cell.clone();
        f(&mut cell);
        target.set_cell(x, y, cell);
    }
}

fn fill(target: &mut dyn GenerationTarget, quadrant: Quadrant, room: usize) {
    for (x, y) in quadrant.rect.points() {
        let edge = x == quadrant.outer_x || y == quadrant.outer_y;
        update(target, x, y, |cell| {
            if edge {
                cell.tag_wall(room);
            } else if cell.floor.is_none() {
                cell.floor = Some(room);
            }
        });
    }
}

impl RoomsPass {
    /// `min_size` plus up to `max_size` extra cells, both ends inclusive.
    fn room_extent(&self, rng: &mut dyn RngCore) -> i32 {
        self.min_size + rng.gen_range(0..=self.max_size.max(0))
    }
}

impl Pass for RoomsPass {
    fn run(
        &self,
        target: &mut dyn GenerationTarget,
        rng: &mut dyn RngCore,
    ) -> Result<(), GenerationError> {
        let (width, height) = target.size();
        if width < 3 || height < 3 {
            return Err(GenerationError::GridTooSmall { width, height });
        }

        let mut rooms = 0;
        let mut failures = 0;
        while rooms < self.max_rooms && failures < MAX_CONSECUTIVE_FAILURES {
            let Some((cx, cy)) = random_open_point(target, rng) else {
                break;
            };
            let room_w = self.room_extent(rng);
            let room_h = self.room_extent(rng);
            let half_w = room_w.div_euclid(2).max(2);
            let half_h = room_h.div_euclid(2).max(2);

            let open: Vec<Quadrant> = quadrants(cx, cy, half_w, half_h)
                .into_iter()
                .filter(|q| is_free(target, q.rect.padded(self.overlap)))
                .collect();
            if open.len() < MIN_OPEN_QUADRANTS {
                failures += 1;
                continue;
            }

            failures = 0;
            for quadrant in open {
                fill(target, quadrant, rooms);
            }
            update(target, cx, cy, |cell| cell.tag_wall(rooms));
            rooms += 1;
        }
        Ok(())
    }
}

/// Opens walls shared by more than one room into floor of the first room.
#[derive(Debug, Clone, Copy, Default)]
pub struct JoinWallsPass;

impl Pass for JoinWallsPass {
    fn run(
        &self,
        target: &mut dyn GenerationTarget,
        _rng: &mut dyn RngCore,
    ) -> Result<(), GenerationError> {
        let (width, height) = target.size();
        for y in 0..height {
            for x in 0..width {
                let shared = target.cell(x, y).is_some_and(|c| c.walls.len() > 1);
                if shared {
                    update(target, x, y, |cell| {
                        cell.floor = cell.floor.or(cell.walls.first().copied());
                        cell.walls.clear();
                    });
                }
            }
        }
        Ok(())
    }
}
