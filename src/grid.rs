use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Cell {
    pub row: usize,
    pub col: usize,
}

impl Cell {
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    pub fn manhattan(self, other: Cell) -> usize {
        self.row.abs_diff(other.row) + self.col.abs_diff(other.col)
    }

    /// The neighbouring cell in `dir`, or `None` when that would leave the
    /// non-negative quadrant. Upper bounds are the grid's concern.
    pub fn step(self, dir: Dir) -> Option<Cell> {
        let (dr, dc) = dir.delta();
        let row = self.row.checked_add_signed(dr)?;
        let col = self.col.checked_add_signed(dc)?;
        Some(Cell { row, col })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dir {
    Up,
    Down,
    Left,
    Right,
}

impl Dir {
    pub const ALL: [Dir; 4] = [Dir::Up, Dir::Down, Dir::Left, Dir::Right];

    pub fn delta(self) -> (isize, isize) {
        match self {
            Dir::Up => (-1, 0),
            Dir::Down => (1, 0),
            Dir::Left => (0, -1),
            Dir::Right => (0, 1),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tile {
    Wall,
    Open,
}

/// Binary occupancy grid addressed by [`Cell`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid {
    height: usize,
    width: usize,
    tiles: Vec<Tile>,
}

impl Grid {
    pub fn filled(height: usize, width: usize, tile: Tile) -> Self {
        Self {
            height,
            width,
            tiles: vec![tile; height * width],
        }
    }

    /// All-open interior with a wall ring around it.
    pub fn bordered(height: usize, width: usize) -> Self {
        let mut grid = Self::filled(height, width, Tile::Open);
        for col in 0..width {
            grid.set(Cell::new(0, col), Tile::Wall);
            grid.set(Cell::new(height.saturating_sub(1), col), Tile::Wall);
        }
        for row in 0..height {
            grid.set(Cell::new(row, 0), Tile::Wall);
            grid.set(Cell::new(row, width.saturating_sub(1)), Tile::Wall);
        }
        grid
    }

    /// Parses rows of `#` (wall) and anything else (open). Rows must share a
    /// length; ragged input is padded with walls.
    pub fn from_rows(rows: &[&str]) -> Self {
        let height = rows.len();
        let width = rows.iter().map(|r| r.chars().count()).max().unwrap_or(0);
        let mut grid = Self::filled(height, width, Tile::Wall);
        for (row, line) in rows.iter().enumerate() {
            for (col, ch) in line.chars().enumerate() {
                if ch != '#' {
                    grid.set(Cell::new(row, col), Tile::Open);
                }
            }
        }
        grid
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn in_bounds(&self, cell: Cell) -> bool {
        cell.row < self.height && cell.col < self.width
    }

    pub fn is_border(&self, cell: Cell) -> bool {
        cell.row == 0 || cell.col == 0 || cell.row + 1 == self.height || cell.col + 1 == self.width
    }

    /// `None` for out-of-bounds cells.
    pub fn tile(&self, cell: Cell) -> Option<Tile> {
        if self.in_bounds(cell) {
            Some(self.tiles[cell.row * self.width + cell.col])
        } else {
            None
        }
    }

    pub fn is_open(&self, cell: Cell) -> bool {
        self.tile(cell) == Some(Tile::Open)
    }

    pub fn is_wall(&self, cell: Cell) -> bool {
        self.tile(cell) == Some(Tile::Wall)
    }

    pub fn set(&mut self, cell: Cell, tile: Tile) {
        if self.in_bounds(cell) {
            self.tiles[cell.row * self.width + cell.col] = tile;
        }
    }

    /// Turns an interior wall into open floor. Border walls and open cells are
    /// left untouched; returns whether anything changed.
    pub fn break_wall(&mut self, cell: Cell) -> bool {
        if self.is_wall(cell) && !self.is_border(cell) {
            self.set(cell, Tile::Open);
            true
        } else {
            false
        }
    }

    /// The in-bounds cell one step from `cell` in `dir`.
    pub fn neighbor(&self, cell: Cell, dir: Dir) -> Option<Cell> {
        cell.step(dir).filter(|next| self.in_bounds(*next))
    }

    /// Open 4-neighbours of `cell`, in [`Dir::ALL`] order.
    pub fn open_neighbors(&self, cell: Cell) -> impl Iterator<Item = Cell> + '_ {
        Dir::ALL
            .into_iter()
            .filter_map(move |dir| self.neighbor(cell, dir))
            .filter(move |next| self.is_open(*next))
    }

    pub fn interior_cells(&self) -> impl Iterator<Item = Cell> + '_ {
        let rows = 1..self.height.saturating_sub(1);
        rows.flat_map(move |row| (1..self.width.saturating_sub(1)).map(move |col| Cell::new(row, col)))
    }

    pub fn open_cells(&self) -> impl Iterator<Item = Cell> + '_ {
        (0..self.height)
            .flat_map(move |row| (0..self.width).map(move |col| Cell::new(row, col)))
            .filter(move |cell| self.is_open(*cell))
    }

    pub fn wall_count(&self) -> usize {
        self.tiles.iter().filter(|t| **t == Tile::Wall).count()
    }

    pub fn border_is_walled(&self) -> bool {
        (0..self.height)
            .flat_map(|row| (0..self.width).map(move |col| Cell::new(row, col)))
            .filter(|cell| self.is_border(*cell))
            .all(|cell| self.is_wall(cell))
    }
}
