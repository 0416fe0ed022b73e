//! sim-runner: headless SIR runner for flickering networks.
//!
//! Usage:
//!   sim-runner --network networks/elitist-500.txt --config run.json --seed 12345 --trials 50
//!   sim-runner --config agents.json --trials 20 --db results.db
//!   sim-runner --network ring.txt --json
//!   sim-runner --network city.txt --flicker-edges city-bridges.txt --config run.json
//!
//! Without `--network`, the network is generated from the config's
//! `rewiring` section. Without `--config`, built-in test defaults are used.
//! `--flicker-edges` supplies the eligible edge set for flicker policies
//! whose config names no edges of its own.

use anyhow::{bail, Result};
use flicker_core::{
    adjacency::AdjacencyMatrix,
    config::RunConfig,
    make_starting_sir,
    network_file::{read_edge_list, NetworkFile},
    policy::FlickerEdges,
    rewiring::generate_with_retries,
    simulate,
    store::{new_run_id, SimStore},
    RngBank, SnapshotHistory,
};
use std::env;

#[derive(serde::Serialize)]
struct RunSummary {
    run_id:                String,
    policy:                String,
    nodes:                 usize,
    edges:                 usize,
    trials:                u64,
    mean_survival_rate:    f64,
    mean_extinction_tick:  Option<f64>,
    extinct_trials:        u64,
}

fn main() -> Result<()> {
    env_logger::init();
    let started = chrono::Utc::now();

    let args: Vec<String> = env::args().collect();
    let seed = parse_arg(&args, "--seed", 42u64);
    let trials = parse_arg(&args, "--trials", 1u64);
    let print_json = args.iter().any(|a| a == "--json");
    let network_path = flag_value(&args, "--network");
    let config_path = flag_value(&args, "--config");
    let db = flag_value(&args, "--db");
    let flicker_path = flag_value(&args, "--flicker-edges");

    let config = match config_path {
        Some(path) => RunConfig::load(path)?,
        None => RunConfig::default_test(),
    };

    let bank = RngBank::new(seed);
    let network = load_network(network_path, &config, &bank)?;
    let adjacency = &network.adjacency;
    let flicker_edges = match flicker_path {
        Some(path) => Some(FlickerEdges::new(adjacency, &read_edge_list(path)?)?),
        None => None,
    };

    let store = match db {
        Some(path) => {
            let store = SimStore::open(path)?;
            store.migrate()?;
            Some(store)
        }
        None => None,
    };

    let run_id = new_run_id();
    let policy_name = config
        .policy
        .build(adjacency, flicker_edges.as_ref())?
        .name()
        .to_string();

    if !print_json {
        println!("Flicker sim-runner");
        println!("  seed:      {seed}");
        println!("  trials:    {trials}");
        println!("  nodes:     {}", adjacency.node_count());
        println!("  edges:     {}", adjacency.edge_count());
        println!("  policy:    {policy_name}");
        if let Some(edges) = &flicker_edges {
            println!(
                "  flicker:   {} edges ({:.1}%)",
                edges.len(),
                100.0 * edges.proportion_of(adjacency)
            );
        }
        println!("  db:        {}", db.unwrap_or("(none)"));
        println!();
    }

    if let Some(store) = &store {
        let config_json = serde_json::to_string(&config)?;
        store.insert_run(&run_id, seed, env!("CARGO_PKG_VERSION"), &policy_name, &config_json)?;
    }

    let mut histories: Vec<SnapshotHistory> = Vec::with_capacity(trials as usize);
    for trial in 0..trials {
        // Trial streams start after the generation stream (index 0).
        let mut rng = bank.for_trial(trial + 1);
        let sir0 = make_starting_sir(
            adjacency.node_count(),
            &config.initial_infected,
            &config.disease,
            &mut rng,
        )?;
        let mut policy = config.policy.build(adjacency, flicker_edges.as_ref())?;
        let history = simulate(
            adjacency,
            &sir0,
            &config.disease,
            policy.as_mut(),
            config.max_steps,
            &mut rng,
        )?;

        if let Some(store) = &store {
            store.record_trial(&run_id, trial, rng.seed(), &history)?;
            if trial == 0 {
                store.save_history(&run_id, trial, &history)?;
            }
        }
        log::info!("trial {trial}: survival_rate={:.3}", history.survival_rate());
        histories.push(history);
    }

    if print_json {
        match histories.first() {
            Some(history) => println!("{}", serde_json::to_string(history)?),
            None => bail!("--json needs at least one trial"),
        }
        return Ok(());
    }

    let summary = summarize(&run_id, &policy_name, adjacency, &histories);
    print_summary(&summary);
    println!(
        "  elapsed:            {} ms",
        (chrono::Utc::now() - started).num_milliseconds()
    );
    Ok(())
}

fn load_network(path: Option<&str>, config: &RunConfig, bank: &RngBank) -> Result<NetworkFile> {
    if let Some(path) = path {
        return NetworkFile::read(path);
    }
    let Some(rewiring) = &config.rewiring else {
        bail!("no --network given and the config has no rewiring section");
    };
    let mut rng = bank.for_trial(0);
    let start = AdjacencyMatrix::empty(rewiring.agents);
    let adjacency = generate_with_retries(
        &start,
        || rewiring.make_behavior(),
        rewiring.max_steps,
        rewiring.max_failures,
        &mut rng,
    )?;
    Ok(NetworkFile { adjacency, layout: None })
}

fn summarize(
    run_id: &str,
    policy: &str,
    adjacency: &AdjacencyMatrix,
    histories: &[SnapshotHistory],
) -> RunSummary {
    let trials = histories.len() as u64;
    let mean_survival_rate = if histories.is_empty() {
        0.0
    } else {
        histories.iter().map(|h| h.survival_rate()).sum::<f64>() / histories.len() as f64
    };
    let extinctions: Vec<f64> = histories
        .iter()
        .filter_map(|h| h.time_to_extinction())
        .map(|t| t as f64)
        .collect();
    let mean_extinction_tick = if extinctions.is_empty() {
        None
    } else {
        Some(extinctions.iter().sum::<f64>() / extinctions.len() as f64)
    };
    RunSummary {
        run_id: run_id.to_string(),
        policy: policy.to_string(),
        nodes: adjacency.node_count(),
        edges: adjacency.edge_count(),
        trials,
        mean_survival_rate,
        mean_extinction_tick,
        extinct_trials: extinctions.len() as u64,
    }
}

fn print_summary(summary: &RunSummary) {
    println!("=== RUN SUMMARY ===");
    println!("  run_id:             {}", summary.run_id);
    println!("  policy:             {}", summary.policy);
    println!("  trials:             {}", summary.trials);
    println!("  mean survival rate: {:.3}", summary.mean_survival_rate);
    println!("  died out:           {}/{}", summary.extinct_trials, summary.trials);
    match summary.mean_extinction_tick {
        Some(t) => println!("  mean extinction:    tick {t:.1}"),
        None => println!("  mean extinction:    (never within the step budget)"),
    }
    if let Ok(json) = serde_json::to_string(summary) {
        log::debug!("summary: {json}");
    }
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}
