//! Aggregate quality metrics over the current grid: how far built cells
//! sit from nature, from centralities and (classical model only) from
//! nature regions large enough to count as real parks.

use std::collections::VecDeque;

use serde::Serialize;

use crate::config::UrbanismModel;
use crate::grid::Grid;

/// Per-step statistics over built, non-centrality cells. Nature distances
/// are Chebyshev, centrality distances Euclidean. The wide-nature pair is
/// only populated for the classical model.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LandStats {
    pub avg_dist_from_nature: f64,
    pub max_dist_from_nature: f64,
    pub avg_dist_from_centrality: f64,
    pub max_dist_from_centrality: f64,
    pub avg_dist_from_wide_nature: Option<f64>,
    pub max_dist_from_wide_nature: Option<f64>,
}

impl LandStats {
    pub fn compute(grid: &Grid, model: UrbanismModel) -> Self {
        let measured: Vec<(usize, usize)> = grid
            .cells()
            .filter(|c| c.built && !c.centrality)
            .map(|c| (c.x, c.y))
            .collect();
        if measured.is_empty() {
            return Self::default();
        }

        let nature_sources: Vec<(usize, usize)> = grid
            .cells()
            .filter(|c| c.nature)
            .map(|c| (c.x, c.y))
            .collect();
        let nature_dist = chebyshev_distance_field(grid, &nature_sources);

        let centralities: Vec<(usize, usize)> = grid
            .cells()
            .filter(|c| c.centrality)
            .map(|c| (c.x, c.y))
            .collect();

        let mut stats = LandStats::default();
        let count = measured.len() as f64;
        for &(x, y) in &measured {
            let dn = nature_dist[x * grid.size_y() + y].unwrap_or(0) as f64;
            stats.avg_dist_from_nature += dn / count;
            stats.max_dist_from_nature = stats.max_dist_from_nature.max(dn);

            let dc = nearest_euclidean(x, y, &centralities);
            stats.avg_dist_from_centrality += dc / count;
            stats.max_dist_from_centrality = stats.max_dist_from_centrality.max(dc);
        }

        if model == UrbanismModel::Classical {
            let wide_sources = wide_nature_cells(grid);
            let wide_dist = chebyshev_distance_field(grid, &wide_sources);
            let mut avg = 0.0;
            let mut max = 0.0f64;
            for &(x, y) in &measured {
                let dw = wide_dist[x * grid.size_y() + y].unwrap_or(0) as f64;
                avg += dw / count;
                max = max.max(dw);
            }
            stats.avg_dist_from_wide_nature = Some(avg);
            stats.max_dist_from_wide_nature = Some(max);
        }
        stats
    }
}

/// Chebyshev distance from every cell to the nearest source, via a
/// multi-source BFS over the 8-connected grid. `None` where no source
/// exists at all.
fn chebyshev_distance_field(grid: &Grid, sources: &[(usize, usize)]) -> Vec<Option<u32>> {
    let mut field: Vec<Option<u32>> = vec![None; grid.size_x() * grid.size_y()];
    let mut queue = VecDeque::new();
    for &(x, y) in sources {
        field[x * grid.size_y() + y] = Some(0);
        queue.push_back((x, y));
    }
    while let Some((x, y)) = queue.pop_front() {
        let here = field[x * grid.size_y() + y].unwrap();
        for (nx, ny) in grid.neighbors8(x, y) {
            let idx = nx * grid.size_y() + ny;
            if field[idx].is_none() {
                field[idx] = Some(here + 1);
                queue.push_back((nx, ny));
            }
        }
    }
    field
}

fn nearest_euclidean(x: usize, y: usize, targets: &[(usize, usize)]) -> f64 {
    if targets.is_empty() {
        return 0.0;
    }
    targets
        .iter()
        .map(|&(tx, ty)| {
            let dx = x as f64 - tx as f64;
            let dy = y as f64 - ty as f64;
            (dx * dx + dy * dy).sqrt()
        })
        .fold(f64::INFINITY, f64::min)
}

/// Nature cells belonging to a "wide" region: a 4-connected nature
/// component holding at least T*² cells.
fn wide_nature_cells(grid: &Grid) -> Vec<(usize, usize)> {
    let size_x = grid.size_x();
    let size_y = grid.size_y();
    let threshold = grid.t_star() * grid.t_star();
    let mut label = vec![usize::MAX; size_x * size_y];
    let mut component_sizes = Vec::new();
    let mut stack = Vec::new();

    for (x, y) in grid.coordinates() {
        if !grid.cell(x, y).nature || label[x * size_y + y] != usize::MAX {
            continue;
        }
        let id = component_sizes.len();
        let mut size = 0usize;
        label[x * size_y + y] = id;
        stack.push((x, y));
        while let Some((cx, cy)) = stack.pop() {
            size += 1;
            let mut visit = |nx: usize, ny: usize, stack: &mut Vec<(usize, usize)>| {
                let idx = nx * size_y + ny;
                if label[idx] == usize::MAX && grid.cell(nx, ny).nature {
                    label[idx] = id;
                    stack.push((nx, ny));
                }
            };
            if cx > 0 {
                visit(cx - 1, cy, &mut stack);
            }
            if cx + 1 < size_x {
                visit(cx + 1, cy, &mut stack);
            }
            if cy > 0 {
                visit(cx, cy - 1, &mut stack);
            }
            if cy + 1 < size_y {
                visit(cx, cy + 1, &mut stack);
            }
        }
        component_sizes.push(size);
    }

    grid.coordinates()
        .filter(|&(x, y)| {
            let id = label[x * size_y + y];
            id != usize::MAX && component_sizes[id] >= threshold
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_grid_yields_zero_stats() {
        let grid = Grid::new(10, 10, 5);
        let stats = LandStats::compute(&grid, UrbanismModel::Isobenefit);
        assert_eq!(stats.avg_dist_from_nature, 0.0);
        assert_eq!(stats.max_dist_from_centrality, 0.0);
        assert!(stats.avg_dist_from_wide_nature.is_none());
    }

    #[test]
    fn wide_nature_ignores_small_pockets() {
        let mut grid = Grid::new(12, 12, 3);
        // Wall off a 2x2 nature pocket in the corner; 4 < T*^2 = 9.
        for (x, y) in [(2, 0), (2, 1), (2, 2), (0, 2), (1, 2)] {
            let cell = grid.cell_mut(x, y);
            cell.nature = false;
            cell.built = true;
        }
        let wide = wide_nature_cells(&grid);
        assert!(!wide.contains(&(0, 0)));
        assert!(!wide.contains(&(1, 1)));
        assert!(wide.contains(&(5, 5)));
    }

    #[test]
    fn distance_field_is_chebyshev() {
        let grid = Grid::new(8, 8, 2);
        let field = chebyshev_distance_field(&grid, &[(0, 0)]);
        assert_eq!(field[0], Some(0));
        assert_eq!(field[3 * 8 + 3], Some(3));
        assert_eq!(field[7 * 8 + 2], Some(7));
    }
}
