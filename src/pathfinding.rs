//! A* search over the open cells of a [`Grid`].
//!
//! Edges are 4-directional with unit cost and the heuristic is Manhattan
//! distance, so returned paths are shortest paths. Equal-cost frontier
//! entries are popped in cell order; callers must not depend on which of
//! several shortest paths comes back.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use crate::grid::{Cell, Grid};

/// Shortest path from `start` to `goal`, both ends included.
///
/// `start == goal` yields `[start]`. An unreachable goal, a wall start, or a
/// start outside the grid yields an empty path. The grid is only read.
pub fn find_path(grid: &Grid, start: Cell, goal: Cell) -> Vec<Cell> {
    if !grid.in_bounds(start) || !grid.in_bounds(goal) {
        return Vec::new();
    }
    if start == goal {
        return vec![start];
    }
    if !grid.is_open(start) {
        return Vec::new();
    }

    let width = grid.width();
    let index = |cell: Cell| cell.row * width + cell.col;
    let size = grid.height() * width;

    let mut g_score: Vec<Option<usize>> = vec![None; size];
    let mut came_from: Vec<Option<Cell>> = vec![None; size];
    let mut closed = vec![false; size];
    let mut open = BinaryHeap::new();

    g_score[index(start)] = Some(0);
    open.push(Reverse((start.manhattan(goal), start)));

    while let Some(Reverse((_, current))) = open.pop() {
        if current == goal {
            return reconstruct(&came_from, index, current);
        }
        let current_idx = index(current);
        if closed[current_idx] {
            continue;
        }
        closed[current_idx] = true;

        let Some(current_g) = g_score[current_idx] else {
            continue;
        };
        for next in grid.open_neighbors(current) {
            let next_idx = index(next);
            if closed[next_idx] {
                continue;
            }
            let tentative = current_g + 1;
            if g_score[next_idx].map_or(true, |g| tentative < g) {
                g_score[next_idx] = Some(tentative);
                came_from[next_idx] = Some(current);
                open.push(Reverse((tentative + next.manhattan(goal), next)));
            }
        }
    }

    Vec::new()
}

fn reconstruct(came_from: &[Option<Cell>], index: impl Fn(Cell) -> usize, end: Cell) -> Vec<Cell> {
    let mut path = vec![end];
    let mut node = end;
    while let Some(prev) = came_from[index(node)] {
        path.push(prev);
        node = prev;
    }
    path.reverse();
    path
}
