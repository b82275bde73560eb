use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::grid::Grid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UrbanismModel {
    Isobenefit,
    Classical,
}

fn default_build_probability() -> f64 {
    0.3
}

fn default_neighboring_centrality_probability() -> f64 {
    0.1
}

fn default_t_star() -> usize {
    5
}

fn default_random_seed() -> u64 {
    42
}

fn default_prob_distribution() -> [f64; 3] {
    [0.7, 0.3, 0.0]
}

fn default_density_factors() -> [f64; 3] {
    [1.0, 0.1, 0.01]
}

fn default_snapshot_interval_steps() -> u64 {
    1
}

/// Flat run configuration for one simulation, loaded from YAML. Density
/// tuples are ordered (high, medium, low).
#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub urbanism_model: UrbanismModel,
    pub size_x: usize,
    pub size_y: usize,
    pub n_steps: u64,
    #[serde(default = "default_build_probability")]
    pub build_probability: f64,
    #[serde(default = "default_neighboring_centrality_probability")]
    pub neighboring_centrality_probability: f64,
    #[serde(default)]
    pub isolated_centrality_probability: f64,
    #[serde(default = "default_t_star")]
    pub t_star: usize,
    #[serde(default = "default_random_seed")]
    pub random_seed: u64,
    pub max_population: f64,
    pub max_ab_km2: f64,
    #[serde(default = "default_prob_distribution")]
    pub prob_distribution: [f64; 3],
    #[serde(default = "default_density_factors")]
    pub density_factors: [f64; 3],
    #[serde(default = "default_snapshot_interval_steps")]
    pub snapshot_interval_steps: u64,
    /// Explicit centrality coordinates; an empty list seeds the grid
    /// center instead.
    #[serde(default)]
    pub centralities: Vec<(usize, usize)>,
}

impl Scenario {
    pub fn validate(&self) -> Result<()> {
        if self.size_x == 0 || self.size_y == 0 {
            bail!("grid dimensions must be positive");
        }
        if self.t_star == 0 {
            bail!("T* must be at least 1");
        }
        for (label, p) in [
            ("build_probability", self.build_probability),
            (
                "neighboring_centrality_probability",
                self.neighboring_centrality_probability,
            ),
            (
                "isolated_centrality_probability",
                self.isolated_centrality_probability,
            ),
        ] {
            if !(0.0..=1.0).contains(&p) {
                bail!("{label} must lie in [0, 1], got {p}");
            }
        }
        if self.prob_distribution.iter().any(|&p| p < 0.0) {
            bail!("prob_distribution entries must be non-negative");
        }
        let prob_sum: f64 = self.prob_distribution.iter().sum();
        if (prob_sum - 1.0).abs() > 1e-9 {
            bail!("prob_distribution must sum to 1, got {prob_sum}");
        }
        for &f in &self.density_factors {
            if !(0.0..=1.0).contains(&f) {
                bail!("density_factors must lie in [0, 1], got {f}");
            }
        }
        if self.max_population <= 0.0 || self.max_ab_km2 <= 0.0 {
            bail!("population caps must be positive");
        }
        for &(x, y) in &self.centralities {
            if x >= self.size_x || y >= self.size_y {
                bail!(
                    "centrality ({x}, {y}) outside {}x{} grid",
                    self.size_x,
                    self.size_y
                );
            }
        }
        Ok(())
    }

    /// Inhabitant capacity of one fully dense cell. Cells are 100 m on a
    /// side, so each covers 0.01 km² of the density cap.
    pub fn capacity_per_cell(&self) -> f64 {
        self.max_ab_km2 / 100.0
    }

    pub fn build_grid(&self) -> Grid {
        let mut grid = Grid::new(self.size_x, self.size_y, self.t_star);
        if self.centralities.is_empty() {
            grid.seed_centralities(&[(self.size_x / 2, self.size_y / 2)]);
        } else {
            grid.seed_centralities(&self.centralities);
        }
        grid
    }
}

pub struct ScenarioLoader {
    base_dir: PathBuf,
}

impl ScenarioLoader {
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }

    pub fn load(&self, file: impl AsRef<Path>) -> Result<Scenario> {
        let path = self.base_dir.join(file);
        let data = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read scenario file {}", path.display()))?;
        let scenario: Scenario = serde_yaml::from_str(&data)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        scenario.validate()?;
        Ok(scenario)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_yaml() -> &'static str {
        "\
name: test_city
urbanism_model: isobenefit
size_x: 40
size_y: 30
n_steps: 10
max_population: 100000
max_ab_km2: 10000
centralities: [[20, 15]]
"
    }

    #[test]
    fn parses_with_defaults() {
        let scenario: Scenario = serde_yaml::from_str(minimal_yaml()).unwrap();
        scenario.validate().unwrap();
        assert_eq!(scenario.t_star, 5);
        assert_eq!(scenario.random_seed, 42);
        assert_eq!(scenario.build_probability, 0.3);
        assert_eq!(scenario.prob_distribution, [0.7, 0.3, 0.0]);
        assert_eq!(scenario.capacity_per_cell(), 100.0);
    }

    #[test]
    fn rejects_bad_probability_distribution() {
        let mut scenario: Scenario = serde_yaml::from_str(minimal_yaml()).unwrap();
        scenario.prob_distribution = [0.7, 0.7, 0.0];
        assert!(scenario.validate().is_err());
    }

    #[test]
    fn rejects_density_factor_above_one() {
        let mut scenario: Scenario = serde_yaml::from_str(minimal_yaml()).unwrap();
        scenario.density_factors = [1.5, 0.1, 0.01];
        assert!(scenario.validate().is_err());
    }

    #[test]
    fn rejects_out_of_bounds_centrality() {
        let mut scenario: Scenario = serde_yaml::from_str(minimal_yaml()).unwrap();
        scenario.centralities = vec![(40, 0)];
        assert!(scenario.validate().is_err());
    }

    #[test]
    fn empty_centrality_list_seeds_grid_center() {
        let mut scenario: Scenario = serde_yaml::from_str(minimal_yaml()).unwrap();
        scenario.centralities.clear();
        let grid = scenario.build_grid();
        assert!(grid.cell(20, 15).centrality);
    }
}
