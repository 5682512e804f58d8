use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{debug, warn};

use crate::grid::{Cell, Grid, Tile};
use crate::pathfinding::find_path;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;
const FALLBACK_SPACING: usize = 4;

pub struct MazeRequest<'a> {
    pub height: usize,
    pub width: usize,
    pub start: Cell,
    pub goal: Cell,
    /// Cells that must stay open besides start and goal, e.g. agent spawns.
    pub reserved: &'a [Cell],
    /// Cells besides `start` that must also reach the goal. They are kept
    /// open like reserved cells.
    pub also_from: &'a [Cell],
    pub wall_density: f64,
    pub max_attempts: u32,
}

#[derive(Debug)]
pub struct Maze {
    pub grid: Grid,
    /// Number of random layouts tried before one passed (or all failed).
    pub attempts: u32,
    pub fallback: bool,
}

/// Random wall layout with a verified start-goal path, or the sparse
/// fallback layout once `max_attempts` random layouts have failed.
pub fn generate(rng: &mut impl Rng, req: &MazeRequest<'_>) -> Maze {
    let mut attempts = 0;
    while attempts < req.max_attempts {
        attempts += 1;
        let grid = random_layout(rng, req);
        if is_traversable(&grid, req) {
            debug!(attempts, walls = grid.wall_count(), "maze generated");
            return Maze {
                grid,
                attempts,
                fallback: false,
            };
        }
    }

    warn!(
        attempts,
        height = req.height,
        width = req.width,
        "could not generate a traversable maze, using fallback layout"
    );
    Maze {
        grid: fallback_layout(req),
        attempts,
        fallback: true,
    }
}

fn random_layout(rng: &mut impl Rng, req: &MazeRequest<'_>) -> Grid {
    let mut grid = Grid::bordered(req.height, req.width);
    let target = (req.height as f64 * req.width as f64 * req.wall_density).floor() as usize;

    let mut candidates: Vec<Cell> = grid
        .interior_cells()
        .filter(|cell| is_placeable(*cell, req))
        .collect();
    candidates.shuffle(rng);
    for cell in candidates.into_iter().take(target) {
        grid.set(cell, Tile::Wall);
    }
    grid
}

/// Border ring plus isolated pillars on a regular lattice. Pillars never
/// touch one another, so every open cell stays connected.
pub fn fallback_layout(req: &MazeRequest<'_>) -> Grid {
    let mut grid = Grid::bordered(req.height, req.width);
    let mut row = 2;
    while row + 2 < req.height {
        let mut col = 2;
        while col + 2 < req.width {
            let cell = Cell::new(row, col);
            if is_placeable(cell, req) {
                grid.set(cell, Tile::Wall);
            }
            col += FALLBACK_SPACING;
        }
        row += FALLBACK_SPACING;
    }
    grid
}

fn is_traversable(grid: &Grid, req: &MazeRequest<'_>) -> bool {
    std::iter::once(req.start)
        .chain(req.also_from.iter().copied())
        .all(|from| !find_path(grid, from, req.goal).is_empty())
}

fn is_placeable(cell: Cell, req: &MazeRequest<'_>) -> bool {
    cell != req.start
        && cell != req.goal
        && !req.reserved.contains(&cell)
        && !req.also_from.contains(&cell)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn request(reserved: &[Cell]) -> MazeRequest<'_> {
        MazeRequest {
            height: 12,
            width: 16,
            start: Cell::new(1, 1),
            goal: Cell::new(10, 14),
            reserved,
            also_from: &[],
            wall_density: 0.25,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    #[test]
    fn reserved_cells_stay_open() {
        let reserved = [Cell::new(6, 8), Cell::new(3, 3)];
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for _ in 0..20 {
            let maze = generate(&mut rng, &request(&reserved));
            assert!(reserved.iter().all(|c| maze.grid.is_open(*c)));
        }
    }

    #[test]
    fn zero_attempts_goes_straight_to_fallback() {
        let mut req = request(&[]);
        req.max_attempts = 0;
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let maze = generate(&mut rng, &req);
        assert!(maze.fallback);
        assert_eq!(maze.grid, fallback_layout(&req));
        assert!(!find_path(&maze.grid, req.start, req.goal).is_empty());
    }
}
