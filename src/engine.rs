use std::path::PathBuf;

use anyhow::Result;
use log::{debug, info};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::{
    cell::DensityTier,
    config::{Scenario, UrbanismModel},
    grid::Grid,
    snapshot::SnapshotWriter,
    stats::LandStats,
};

pub struct StepContext<'a> {
    pub step: u64,
    pub config: &'a Scenario,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RuleOutcome {
    pub added_blocks: u64,
    pub added_centralities: u64,
}

/// One stochastic growth rule, applied once per step in registration
/// order. Rules draw all randomness from the engine's single seeded
/// generator so a fixed seed reproduces an identical run.
pub trait GrowthRule {
    fn name(&self) -> &'static str;
    fn apply(
        &mut self,
        ctx: &StepContext<'_>,
        grid: &mut Grid,
        rng: &mut ChaCha8Rng,
    ) -> Result<RuleOutcome>;
}

/// A frontier cell passes the model's legality predicates: the isobenefit
/// model demands corridor width and reachability, the classical model
/// relaxes the width requirement.
fn candidate_is_legal(grid: &Grid, x: usize, y: usize, model: UrbanismModel) -> bool {
    match model {
        UrbanismModel::Isobenefit => {
            grid.nature_width_preserved(x, y) && grid.nature_remains_reachable(x, y)
        }
        UrbanismModel::Classical => grid.nature_remains_reachable(x, y),
    }
}

fn draw_density_tier(rng: &mut ChaCha8Rng, distribution: &[f64; 3]) -> DensityTier {
    let roll: f64 = rng.gen();
    let mut cumulative = 0.0;
    for tier in DensityTier::ALL {
        cumulative += distribution[tier.index()];
        if roll < cumulative {
            return tier;
        }
    }
    DensityTier::Low
}

/// Urbanizes frontier cells. All predicates are evaluated against the
/// pre-mutation state of the step, so cells built within a step never
/// widen the same step's frontier.
pub struct BuildRule;

impl GrowthRule for BuildRule {
    fn name(&self) -> &'static str {
        "build"
    }

    fn apply(
        &mut self,
        ctx: &StepContext<'_>,
        grid: &mut Grid,
        rng: &mut ChaCha8Rng,
    ) -> Result<RuleOutcome> {
        let config = ctx.config;
        let frozen = grid.clone();
        let mut population = grid.total_population();
        let mut outcome = RuleOutcome::default();

        for (x, y) in frozen.coordinates() {
            if !frozen.cell(x, y).nature || !frozen.has_built_neighbor(x, y) {
                continue;
            }
            if !candidate_is_legal(&frozen, x, y, config.urbanism_model) {
                continue;
            }
            if !rng.gen_bool(config.build_probability) {
                continue;
            }
            if population >= config.max_population {
                debug!("population cap reached, no further builds this step");
                break;
            }
            let tier = draw_density_tier(rng, &config.prob_distribution);
            let inhabitants = config.density_factors[tier.index()] * config.capacity_per_cell();
            let cell = grid.cell_mut(x, y);
            cell.nature = false;
            cell.built = true;
            cell.inhabitants = inhabitants;
            population += inhabitants;
            outcome.added_blocks += 1;
        }
        Ok(outcome)
    }
}

/// Hub growth: with one Bernoulli draw per step, promotes a built cell
/// adjacent to an existing centrality.
pub struct PromoteCentralityRule;

impl GrowthRule for PromoteCentralityRule {
    fn name(&self) -> &'static str {
        "promote-centrality"
    }

    fn apply(
        &mut self,
        ctx: &StepContext<'_>,
        grid: &mut Grid,
        rng: &mut ChaCha8Rng,
    ) -> Result<RuleOutcome> {
        let mut outcome = RuleOutcome::default();
        if !rng.gen_bool(ctx.config.neighboring_centrality_probability) {
            return Ok(outcome);
        }
        let candidates: Vec<(usize, usize)> = grid
            .coordinates()
            .filter(|&(x, y)| {
                let cell = grid.cell(x, y);
                cell.built
                    && !cell.centrality
                    && grid
                        .neighbors8(x, y)
                        .any(|(nx, ny)| grid.cell(nx, ny).centrality)
            })
            .collect();
        if candidates.is_empty() {
            return Ok(outcome);
        }
        let (x, y) = candidates[rng.gen_range(0..candidates.len())];
        grid.cell_mut(x, y).centrality = true;
        outcome.added_centralities += 1;
        debug!("promoted ({x}, {y}) to centrality");
        Ok(outcome)
    }
}

/// Diversified growth: with one Bernoulli draw per step, seeds a brand-new
/// centrality on a legal nature cell away from the urban frontier and from
/// every existing centrality.
pub struct SpawnCentralityRule;

impl GrowthRule for SpawnCentralityRule {
    fn name(&self) -> &'static str {
        "spawn-centrality"
    }

    fn apply(
        &mut self,
        ctx: &StepContext<'_>,
        grid: &mut Grid,
        rng: &mut ChaCha8Rng,
    ) -> Result<RuleOutcome> {
        let mut outcome = RuleOutcome::default();
        if !rng.gen_bool(ctx.config.isolated_centrality_probability) {
            return Ok(outcome);
        }
        let candidates: Vec<(usize, usize)> = grid
            .coordinates()
            .filter(|&(x, y)| {
                grid.cell(x, y).nature
                    && !grid.has_built_neighbor(x, y)
                    && !grid.has_centrality_nearby(x, y)
                    && candidate_is_legal(grid, x, y, ctx.config.urbanism_model)
            })
            .collect();
        if candidates.is_empty() {
            return Ok(outcome);
        }
        let (x, y) = candidates[rng.gen_range(0..candidates.len())];
        let cell = grid.cell_mut(x, y);
        cell.nature = false;
        cell.built = true;
        cell.centrality = true;
        outcome.added_centralities += 1;
        debug!("seeded isolated centrality at ({x}, {y})");
        Ok(outcome)
    }
}

#[derive(Debug, Clone)]
pub struct StepSummary {
    pub step: u64,
    pub added_blocks: u64,
    pub added_centralities: u64,
    pub population: f64,
    pub stats: LandStats,
    pub snapshot_path: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct RunReport {
    pub steps_completed: u64,
    pub final_population: f64,
    pub final_stats: LandStats,
}

pub struct EngineBuilder {
    config: Scenario,
    rules: Vec<Box<dyn GrowthRule>>,
    writer: Option<SnapshotWriter>,
}

impl EngineBuilder {
    pub fn new(config: Scenario) -> Self {
        Self {
            config,
            rules: Vec::new(),
            writer: None,
        }
    }

    pub fn with_rule(mut self, rule: impl GrowthRule + 'static) -> Self {
        self.rules.push(Box::new(rule));
        self
    }

    pub fn with_snapshot_writer(mut self, writer: SnapshotWriter) -> Self {
        self.writer = Some(writer);
        self
    }

    pub fn build(self) -> Engine {
        Engine {
            rng: ChaCha8Rng::seed_from_u64(self.config.random_seed),
            rules: self.rules,
            writer: self.writer,
            config: self.config,
        }
    }
}

pub struct Engine {
    config: Scenario,
    rng: ChaCha8Rng,
    rules: Vec<Box<dyn GrowthRule>>,
    writer: Option<SnapshotWriter>,
}

impl Engine {
    /// Engine with the default rule stack. Centrality promotion runs
    /// before isolated spawning; the ordering is part of the contract.
    pub fn from_scenario(config: Scenario) -> Self {
        EngineBuilder::new(config)
            .with_rule(BuildRule)
            .with_rule(PromoteCentralityRule)
            .with_rule(SpawnCentralityRule)
            .build()
    }

    pub fn with_snapshot_writer(mut self, writer: SnapshotWriter) -> Self {
        self.writer = Some(writer);
        self
    }

    pub fn config(&self) -> &Scenario {
        &self.config
    }

    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|rule| rule.name()).collect()
    }

    /// One full transition: rules in order, then the consistency sweep,
    /// statistics and the snapshot hand-off.
    pub fn step(&mut self, grid: &mut Grid, step: u64) -> Result<StepSummary> {
        let ctx = StepContext {
            step,
            config: &self.config,
        };
        let mut added_blocks = 0;
        let mut added_centralities = 0;
        for rule in self.rules.iter_mut() {
            let outcome = rule.apply(&ctx, grid, &mut self.rng)?;
            added_blocks += outcome.added_blocks;
            added_centralities += outcome.added_centralities;
        }
        grid.check_consistency()?;
        let stats = LandStats::compute(grid, self.config.urbanism_model);
        let population = grid.total_population();
        let snapshot_path = match &mut self.writer {
            Some(writer) => writer.maybe_write(step, &self.config.name, grid, &stats)?,
            None => None,
        };
        info!(
            "step {step}: +{added_blocks} blocks, +{added_centralities} centralities, population {population:.0}"
        );
        Ok(StepSummary {
            step,
            added_blocks,
            added_centralities,
            population,
            stats,
            snapshot_path,
        })
    }

    /// Runs `n_steps` transitions, stopping early once the population cap
    /// is reached.
    pub fn run(&mut self, grid: &mut Grid) -> Result<RunReport> {
        let mut steps_completed = 0;
        for step in 1..=self.config.n_steps {
            let summary = self.step(grid, step)?;
            steps_completed = step;
            if summary.population >= self.config.max_population {
                info!("max population reached after step {step}, stopping");
                break;
            }
        }
        Ok(RunReport {
            steps_completed,
            final_population: grid.total_population(),
            final_stats: LandStats::compute(grid, self.config.urbanism_model),
        })
    }
}
