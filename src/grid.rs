use serde::Serialize;
use thiserror::Error;

use crate::cell::{Category, Cell};

#[derive(Debug, Error)]
pub enum GridError {
    #[error("cell ({x}, {y}) must be exactly one of nature/built")]
    RoleConflict { x: usize, y: usize },
    #[error("cell ({x}, {y}) is a centrality but not built")]
    CentralityNotBuilt { x: usize, y: usize },
    #[error("nature cell ({x}, {y}) has {inhabitants} inhabitants")]
    InhabitedNature {
        x: usize,
        y: usize,
        inhabitants: f64,
    },
    #[error("layout is {got_x}x{got_y}, grid is {want_x}x{want_y}")]
    DimensionMismatch {
        got_x: usize,
        got_y: usize,
        want_x: usize,
        want_y: usize,
    },
    #[error("unknown category code {code} at ({x}, {y})")]
    UnknownCategory { x: usize, y: usize, code: u8 },
}

/// Read-only view handed to rendering/export collaborators: one category
/// code and one inhabitant count per cell, indexed `[x][y]`.
#[derive(Debug, Clone, Serialize)]
pub struct Projection {
    pub categories: Vec<Vec<u8>>,
    pub inhabitants: Vec<Vec<f64>>,
}

/// Fixed-size rectangular cell matrix. Created fully nature; mutated only
/// by seeding and by the growth driver.
#[derive(Debug, Clone)]
pub struct Grid {
    size_x: usize,
    size_y: usize,
    t_star: usize,
    cells: Vec<Cell>,
}

impl Grid {
    pub fn new(size_x: usize, size_y: usize, t_star: usize) -> Self {
        assert!(size_x > 0 && size_y > 0, "grid dimensions must be positive");
        assert!(t_star > 0, "T* must be positive");
        let mut cells = Vec::with_capacity(size_x * size_y);
        for x in 0..size_x {
            for y in 0..size_y {
                cells.push(Cell::new_nature(x, y));
            }
        }
        Self {
            size_x,
            size_y,
            t_star,
            cells,
        }
    }

    pub fn size_x(&self) -> usize {
        self.size_x
    }

    pub fn size_y(&self) -> usize {
        self.size_y
    }

    pub fn t_star(&self) -> usize {
        self.t_star
    }

    fn index(&self, x: usize, y: usize) -> usize {
        assert!(x < self.size_x && y < self.size_y, "({x}, {y}) out of bounds");
        x * self.size_y + y
    }

    pub fn cell(&self, x: usize, y: usize) -> &Cell {
        &self.cells[self.index(x, y)]
    }

    pub fn cell_mut(&mut self, x: usize, y: usize) -> &mut Cell {
        let index = self.index(x, y);
        &mut self.cells[index]
    }

    pub fn cells(&self) -> impl Iterator<Item = &Cell> {
        self.cells.iter()
    }

    /// All coordinates in deterministic x-major order.
    pub fn coordinates(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        (0..self.size_x).flat_map(move |x| (0..self.size_y).map(move |y| (x, y)))
    }

    pub fn total_population(&self) -> f64 {
        self.cells.iter().map(|c| c.inhabitants).sum()
    }

    /// Marks each coordinate as built + centrality. Initial seeding only;
    /// centralities start uninhabited.
    pub fn seed_centralities(&mut self, centralities: &[(usize, usize)]) {
        for &(x, y) in centralities {
            let cell = self.cell_mut(x, y);
            cell.nature = false;
            cell.built = true;
            cell.centrality = true;
        }
    }

    /// Replaces the whole grid state from a pre-decoded category layout
    /// (0 = nature, 1 = built, 2 = centrality), indexed `[x][y]`. All cells
    /// start uninhabited. The grid is left untouched if the layout is
    /// malformed.
    pub fn load_from_external_layout(&mut self, layout: &[Vec<u8>]) -> Result<(), GridError> {
        if layout.len() != self.size_x || layout.iter().any(|row| row.len() != self.size_y) {
            return Err(GridError::DimensionMismatch {
                got_x: layout.len(),
                got_y: layout.first().map_or(0, |row| row.len()),
                want_x: self.size_x,
                want_y: self.size_y,
            });
        }
        for (x, row) in layout.iter().enumerate() {
            for (y, &code) in row.iter().enumerate() {
                if Category::from_code(code).is_none() {
                    return Err(GridError::UnknownCategory { x, y, code });
                }
            }
        }
        for (x, row) in layout.iter().enumerate() {
            for (y, &code) in row.iter().enumerate() {
                let cell = self.cell_mut(x, y);
                match Category::from_code(code).unwrap() {
                    Category::Nature => {
                        cell.nature = true;
                        cell.built = false;
                        cell.centrality = false;
                        cell.inhabitants = 0.0;
                    }
                    Category::Built => {
                        cell.nature = false;
                        cell.built = true;
                        cell.centrality = false;
                        cell.inhabitants = 0.0;
                    }
                    Category::Centrality => {
                        cell.nature = false;
                        cell.built = true;
                        cell.centrality = true;
                        cell.inhabitants = 0.0;
                    }
                }
            }
        }
        Ok(())
    }

    /// Full-grid invariant sweep, run as a post-condition after every
    /// mutation phase. Fails on the first violation found.
    pub fn check_consistency(&self) -> Result<(), GridError> {
        for cell in &self.cells {
            if cell.nature == cell.built {
                return Err(GridError::RoleConflict {
                    x: cell.x,
                    y: cell.y,
                });
            }
            if cell.centrality && !cell.built {
                return Err(GridError::CentralityNotBuilt {
                    x: cell.x,
                    y: cell.y,
                });
            }
            if cell.nature && cell.inhabitants > 0.0 {
                return Err(GridError::InhabitedNature {
                    x: cell.x,
                    y: cell.y,
                    inhabitants: cell.inhabitants,
                });
            }
        }
        Ok(())
    }

    pub fn export_projection(&self) -> Projection {
        let mut categories = vec![vec![0u8; self.size_y]; self.size_x];
        let mut inhabitants = vec![vec![0.0f64; self.size_y]; self.size_x];
        for cell in &self.cells {
            categories[cell.x][cell.y] = cell.category().code();
            inhabitants[cell.x][cell.y] = cell.inhabitants;
        }
        Projection {
            categories,
            inhabitants,
        }
    }

    /// 8-connected neighbors of (x, y), clipped at the grid edge.
    pub fn neighbors8(&self, x: usize, y: usize) -> impl Iterator<Item = (usize, usize)> + '_ {
        let size_x = self.size_x as isize;
        let size_y = self.size_y as isize;
        (-1isize..=1).flat_map(move |dx| {
            (-1isize..=1).filter_map(move |dy| {
                if dx == 0 && dy == 0 {
                    return None;
                }
                let nx = x as isize + dx;
                let ny = y as isize + dy;
                if nx < 0 || ny < 0 || nx >= size_x || ny >= size_y {
                    None
                } else {
                    Some((nx as usize, ny as usize))
                }
            })
        })
    }

    /// True if any 8-connected neighbor is built. Only meaningful for
    /// frontier detection, so querying a built cell is a precondition
    /// violation.
    pub fn has_built_neighbor(&self, x: usize, y: usize) -> bool {
        assert!(
            !self.cell(x, y).built,
            "frontier query on already-built cell ({x}, {y})"
        );
        self.neighbors8(x, y).any(|(nx, ny)| self.cell(nx, ny).built)
    }

    /// True if a centrality sits within a square window of radius T*
    /// around (x, y).
    pub fn has_centrality_nearby(&self, x: usize, y: usize) -> bool {
        let x_min = x.saturating_sub(self.t_star);
        let y_min = y.saturating_sub(self.t_star);
        let x_max = (x + self.t_star).min(self.size_x - 1);
        let y_max = (y + self.t_star).min(self.size_y - 1);
        for nx in x_min..=x_max {
            for ny in y_min..=y_max {
                if self.cell(nx, ny).centrality {
                    return true;
                }
            }
        }
        false
    }

    /// Hypothetically builds (x, y) and checks that every nature run along
    /// the row and the column through it stays at least T* cells wide.
    pub fn nature_width_preserved(&self, x: usize, y: usize) -> bool {
        let row: Vec<bool> = (0..self.size_x)
            .map(|i| i != x && self.cell(i, y).nature)
            .collect();
        let column: Vec<bool> = (0..self.size_y)
            .map(|j| j != y && self.cell(x, j).nature)
            .collect();
        is_nature_corridor_wide(&row, self.t_star) && is_nature_corridor_wide(&column, self.t_star)
    }

    /// Hypothetically builds (x, y) and checks that no nature region is
    /// split off from the rest of the nature mask.
    pub fn nature_remains_reachable(&self, x: usize, y: usize) -> bool {
        let before = self.nature_component_count(None);
        let after = self.nature_component_count(Some((x, y)));
        after <= before
    }

    /// Number of 4-connected components of the nature mask, optionally
    /// with one cell hypothetically flipped to built.
    fn nature_component_count(&self, exclude: Option<(usize, usize)>) -> usize {
        let is_nature = |x: usize, y: usize| -> bool {
            if exclude == Some((x, y)) {
                return false;
            }
            self.cell(x, y).nature
        };
        let mut visited = vec![false; self.size_x * self.size_y];
        let mut components = 0;
        let mut stack = Vec::new();
        for (x, y) in self.coordinates() {
            if visited[x * self.size_y + y] || !is_nature(x, y) {
                continue;
            }
            components += 1;
            visited[x * self.size_y + y] = true;
            stack.push((x, y));
            while let Some((cx, cy)) = stack.pop() {
                let mut push = |nx: usize, ny: usize, stack: &mut Vec<(usize, usize)>| {
                    let idx = nx * self.size_y + ny;
                    if !visited[idx] && is_nature(nx, ny) {
                        visited[idx] = true;
                        stack.push((nx, ny));
                    }
                };
                if cx > 0 {
                    push(cx - 1, cy, &mut stack);
                }
                if cx + 1 < self.size_x {
                    push(cx + 1, cy, &mut stack);
                }
                if cy > 0 {
                    push(cx, cy - 1, &mut stack);
                }
                if cy + 1 < self.size_y {
                    push(cx, cy + 1, &mut stack);
                }
            }
        }
        components
    }
}

/// True iff every maximal run of nature cells in `line` is at least
/// `t_star` long. Runs bounded by the line edge count the same as runs
/// bounded by a built cell.
pub fn is_nature_corridor_wide(line: &[bool], t_star: usize) -> bool {
    let mut run = 0usize;
    for &nature in line {
        if nature {
            run += 1;
        } else {
            if run > 0 && run < t_star {
                return false;
            }
            run = 0;
        }
    }
    run == 0 || run >= t_star
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(grid: &mut Grid, x: usize, y: usize) {
        let cell = grid.cell_mut(x, y);
        cell.nature = false;
        cell.built = true;
    }

    #[test]
    fn corridor_runs_bounded_by_edges_and_built_cells() {
        let line: Vec<bool> = [1, 1, 1, 1, 1, 1, 0, 1, 1, 1, 1, 1, 1, 0, 1, 1, 1, 1, 1, 1]
            .iter()
            .map(|&v| v == 1)
            .collect();
        assert!(is_nature_corridor_wide(&line, 5));
        assert!(!is_nature_corridor_wide(&line, 7));
    }

    #[test]
    fn corridor_degenerate_lines() {
        assert!(is_nature_corridor_wide(&[true; 8], 8));
        assert!(!is_nature_corridor_wide(&[true; 7], 8));
        // A fully built line has no nature runs to violate.
        assert!(is_nature_corridor_wide(&[false; 7], 3));
        assert!(is_nature_corridor_wide(&[], 3));
    }

    #[test]
    fn component_count_tracks_hypothetical_builds() {
        let mut grid = Grid::new(9, 9, 2);
        // A wall with a single gap at (4, 4).
        for y in 0..9 {
            if y != 4 {
                build(&mut grid, 4, y);
            }
        }
        assert!(grid.nature_remains_reachable(2, 2));
        assert!(!grid.nature_remains_reachable(4, 4));
    }

    #[test]
    fn reachability_tolerates_isolated_single_builds() {
        let grid = Grid::new(10, 10, 3);
        assert!(grid.nature_remains_reachable(5, 5));
        assert!(grid.nature_remains_reachable(0, 0));
    }
}
