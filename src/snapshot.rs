//! Per-step export of the grid projection and statistics. The core hands
//! records off here and never depends on what consumers do with them.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;

use crate::{
    grid::{Grid, Projection},
    stats::LandStats,
};

#[derive(Debug, Serialize)]
pub struct StepRecord<'a> {
    pub scenario: &'a str,
    pub step: u64,
    pub written_at: String,
    pub population: f64,
    pub stats: &'a LandStats,
    #[serde(flatten)]
    pub projection: Projection,
}

pub struct SnapshotWriter {
    output_dir: PathBuf,
    interval_steps: u64,
}

impl SnapshotWriter {
    /// Interval 0 disables writing entirely.
    pub fn new(output_dir: impl AsRef<Path>, interval_steps: u64) -> Self {
        Self {
            output_dir: output_dir.as_ref().to_path_buf(),
            interval_steps,
        }
    }

    pub fn maybe_write(
        &mut self,
        step: u64,
        scenario: &str,
        grid: &Grid,
        stats: &LandStats,
    ) -> Result<Option<PathBuf>> {
        if self.interval_steps == 0 || step % self.interval_steps != 0 {
            return Ok(None);
        }
        let dir = self.output_dir.join(scenario);
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create snapshot dir {}", dir.display()))?;
        let record = StepRecord {
            scenario,
            step,
            written_at: chrono::Local::now().to_rfc3339(),
            population: grid.total_population(),
            stats,
            projection: grid.export_projection(),
        };
        let path = dir.join(format!("step_{step:06}.json"));
        let json = serde_json::to_string_pretty(&record)?;
        fs::write(&path, json)
            .with_context(|| format!("Failed to write snapshot {}", path.display()))?;
        Ok(Some(path))
    }
}
