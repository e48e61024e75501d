use rand::RngCore;

use super::{GenerationError, GenerationTarget, Pass};

/// Blocks the outer perimeter of the grid.
#[derive(Debug, Clone, Copy, Default)]
pub struct BoxPass;

impl Pass for BoxPass {
    fn run(
        &self,
        target: &mut dyn GenerationTarget,
        _rng: &mut dyn RngCore,
    ) -> Result<(), GenerationError> {
        let (width, height) = target.size();
        for y in 0..height {
            for x in 0..width {
                if x != 0 && y != 0 && x != width - 1 && y != height - 1 {
                    continue;
                }
                if let Some(cell) = target.cell(x, y) {
                    let mut cell = cell.clone();
                    cell.blocked = true;
                    target.set_cell(x, y, cell);
                }
            }
        }
        Ok(())
    }
}
