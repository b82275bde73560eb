use isobenefit::{Engine, Grid, Scenario, ScenarioLoader, UrbanismModel};

fn scenario(model: UrbanismModel) -> Scenario {
    Scenario {
        name: "growth_test".into(),
        description: None,
        urbanism_model: model,
        size_x: 30,
        size_y: 30,
        n_steps: 20,
        build_probability: 0.3,
        neighboring_centrality_probability: 0.0,
        isolated_centrality_probability: 0.0,
        t_star: 5,
        random_seed: 42,
        max_population: 1_000_000.0,
        max_ab_km2: 10_000.0,
        prob_distribution: [0.7, 0.3, 0.0],
        density_factors: [1.0, 0.1, 0.01],
        snapshot_interval_steps: 0,
        centralities: vec![(15, 15)],
    }
}

fn run(config: Scenario) -> (Grid, isobenefit::RunReport) {
    let mut grid = config.build_grid();
    let mut engine = Engine::from_scenario(config);
    let report = engine.run(&mut grid).unwrap();
    (grid, report)
}

#[test]
fn same_seed_reproduces_identical_runs() {
    let (grid_a, report_a) = run(scenario(UrbanismModel::Isobenefit));
    let (grid_b, report_b) = run(scenario(UrbanismModel::Isobenefit));

    let proj_a = grid_a.export_projection();
    let proj_b = grid_b.export_projection();
    assert_eq!(proj_a.categories, proj_b.categories);
    assert_eq!(proj_a.inhabitants, proj_b.inhabitants);
    assert_eq!(report_a.final_population, report_b.final_population);
    assert_eq!(
        report_a.final_stats.avg_dist_from_nature,
        report_b.final_stats.avg_dist_from_nature
    );
    assert_eq!(
        report_a.final_stats.avg_dist_from_centrality,
        report_b.final_stats.avg_dist_from_centrality
    );
}

#[test]
fn changing_the_seed_changes_the_outcome() {
    let (grid_a, _) = run(scenario(UrbanismModel::Isobenefit));
    let mut other = scenario(UrbanismModel::Isobenefit);
    other.random_seed = 43;
    let (grid_b, _) = run(other);
    assert_ne!(
        grid_a.export_projection().categories,
        grid_b.export_projection().categories
    );
}

#[test]
fn growth_stays_consistent_and_connected_to_the_seed() {
    let (grid, report) = run(scenario(UrbanismModel::Isobenefit));
    grid.check_consistency().unwrap();
    assert!(report.final_population > 0.0);

    // With no isolated spawning, built land must form one 8-connected
    // region around the seeded centrality.
    let mut visited = vec![vec![false; 30]; 30];
    let mut stack = vec![(15usize, 15usize)];
    visited[15][15] = true;
    while let Some((x, y)) = stack.pop() {
        for (nx, ny) in grid.neighbors8(x, y) {
            if grid.cell(nx, ny).built && !visited[nx][ny] {
                visited[nx][ny] = true;
                stack.push((nx, ny));
            }
        }
    }
    for cell in grid.cells() {
        if cell.built {
            assert!(visited[cell.x][cell.y], "({}, {}) detached", cell.x, cell.y);
        }
    }
}

#[test]
fn population_cap_halts_the_run_early() {
    let mut config = scenario(UrbanismModel::Isobenefit);
    config.n_steps = 120;
    config.max_population = 500.0;
    let (grid, report) = run(config);

    assert!(report.steps_completed < 120, "cap should stop the run early");
    assert!(report.final_population >= 500.0);
    // Overshoot is bounded by one cell's worth of inhabitants.
    assert!(report.final_population <= 500.0 + 100.0);
    grid.check_consistency().unwrap();
}

#[test]
fn default_rule_stack_promotes_before_spawning() {
    let engine = Engine::from_scenario(scenario(UrbanismModel::Isobenefit));
    assert_eq!(
        engine.rule_names(),
        vec!["build", "promote-centrality", "spawn-centrality"]
    );
}

#[test]
fn promotion_and_spawning_fire_in_the_same_step() {
    let mut config = scenario(UrbanismModel::Isobenefit);
    config.size_x = 40;
    config.size_y = 40;
    config.build_probability = 0.0;
    config.neighboring_centrality_probability = 1.0;
    config.isolated_centrality_probability = 1.0;
    config.centralities = vec![(20, 20)];

    let mut grid = config.build_grid();
    {
        let cell = grid.cell_mut(20, 21);
        cell.nature = false;
        cell.built = true;
        cell.inhabitants = 10.0;
    }

    let mut engine = Engine::from_scenario(config);
    let summary = engine.step(&mut grid, 1).unwrap();

    assert_eq!(summary.added_blocks, 0);
    assert_eq!(summary.added_centralities, 2);
    assert!(grid.cell(20, 21).centrality, "adjacent cell gets promoted");

    let centralities: Vec<_> = grid
        .cells()
        .filter(|c| c.centrality)
        .map(|c| (c.x, c.y))
        .collect();
    assert_eq!(centralities.len(), 3);
    let spawned = centralities
        .iter()
        .find(|&&(x, y)| !(19..=21).contains(&x) || !(19..=22).contains(&y))
        .expect("an isolated centrality somewhere else");
    // Spawn sites must sit away from existing hubs.
    let (sx, sy) = *spawned;
    assert!(sx.abs_diff(20).max(sy.abs_diff(20)) > 5);
    grid.check_consistency().unwrap();
}

#[test]
fn build_probability_applies_uniformly_across_the_frontier() {
    let mut config = scenario(UrbanismModel::Classical);
    config.size_x = 30;
    config.size_y = 15;
    config.build_probability = 1.0;
    config.centralities = vec![(5, 7)];

    let mut grid = config.build_grid();
    // Built corridor stretching far beyond the hub's T* window.
    for x in 6..26 {
        let cell = grid.cell_mut(x, 7);
        cell.nature = false;
        cell.built = true;
    }

    let mut engine = Engine::from_scenario(config);
    let summary = engine.step(&mut grid, 1).unwrap();

    // The frontier wraps the corridor: 23 cells above, 23 below, 2 ends.
    assert_eq!(summary.added_blocks, 48);
    assert!(grid.cell(4, 6).built, "cell inside the hub window builds");
    assert!(
        grid.cell(26, 7).built,
        "cell far outside every hub window builds at the same probability"
    );
    grid.check_consistency().unwrap();
}

#[test]
fn classical_model_relaxes_the_width_requirement() {
    let mut config = scenario(UrbanismModel::Isobenefit);
    config.size_x = 20;
    config.size_y = 20;
    config.n_steps = 1;
    config.build_probability = 1.0;
    config.centralities = vec![(5, 5)];

    let mut grid = config.build_grid();
    let mut engine = Engine::from_scenario(config.clone());
    let iso = engine.step(&mut grid, 1).unwrap();
    // Only (5, 6), (6, 5) and (6, 6) leave every corridor at least T* wide.
    assert_eq!(iso.added_blocks, 3);

    config.urbanism_model = UrbanismModel::Classical;
    let mut grid = config.build_grid();
    let mut engine = Engine::from_scenario(config);
    let classical = engine.step(&mut grid, 1).unwrap();
    // The whole frontier passes once the width check is relaxed.
    assert_eq!(classical.added_blocks, 8);
}

#[test]
fn bundled_scenario_parses_and_validates() {
    let loader = ScenarioLoader::new(env!("CARGO_MANIFEST_DIR"));
    let scenario = loader.load("scenarios/small_city.yaml").unwrap();
    assert_eq!(scenario.name, "small_city");
    assert_eq!(scenario.urbanism_model, UrbanismModel::Isobenefit);
    assert_eq!(scenario.centralities, vec![(30, 30)]);
    let grid = scenario.build_grid();
    assert!(grid.cell(30, 30).centrality);
}
