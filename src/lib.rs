pub mod cell;
pub mod config;
pub mod engine;
pub mod grid;
pub mod snapshot;
pub mod stats;

pub use cell::{Category, Cell, DensityTier};
pub use config::{Scenario, ScenarioLoader, UrbanismModel};
pub use engine::{Engine, EngineBuilder, RunReport, StepSummary};
pub use grid::{is_nature_corridor_wide, Grid, GridError, Projection};
pub use snapshot::SnapshotWriter;
pub use stats::LandStats;
