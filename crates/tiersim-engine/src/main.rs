//! tiersim CLI
//!
//! Sweeps iterations × scenarios × device counts × placement policies and
//! prints a comparison table

use anyhow::{Context, Result, bail};
use chrono::Local;
use clap::Parser;
use std::fs;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tiersim_engine::{
    config::ScenarioConfig,
    logger::SimulationReport,
    policies::PolicyKind,
    simulator::Simulator,
};

#[derive(Parser, Debug)]
#[command(name = "tiersim")]
#[command(about = "Simulate task offloading across mobile, edge and cloud tiers", long_about = None)]
struct Args {
    /// Scenario file (JSON); built-in defaults when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Policies to compare (comma-separated, e.g. FIRST_FIT,NEXT_FIT, or "all")
    #[arg(short, long)]
    policies: Option<String>,

    /// Smallest device count of the sweep
    #[arg(long)]
    min_devices: Option<usize>,

    /// Largest device count of the sweep
    #[arg(long)]
    max_devices: Option<usize>,

    /// Scenario variants to run (comma-separated); every variant when omitted
    #[arg(long)]
    scenarios: Option<String>,

    /// Repetitions of the whole sweep, each with its own seed
    #[arg(short, long, default_value_t = 1)]
    iterations: usize,

    /// Device count increment
    #[arg(long, default_value_t = 100)]
    step: usize,

    /// Simulated time in seconds
    #[arg(short, long)]
    duration: Option<f64>,

    /// RNG seed
    #[arg(short, long)]
    seed: Option<u64>,

    /// Output JSON file path (optional)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn parse_policies(list: &str) -> Result<Vec<PolicyKind>> {
    if list.trim().eq_ignore_ascii_case("all") {
        return Ok(PolicyKind::all().collect());
    }
    list.split(',')
        .filter(|name| !name.trim().is_empty())
        .map(|name| name.parse::<PolicyKind>().map_err(Into::into))
        .collect()
}

fn select_scenarios(config: &ScenarioConfig, list: Option<&str>) -> Result<Vec<ScenarioConfig>> {
    let Some(list) = list else {
        return Ok(config.variants());
    };
    list.split(',')
        .filter(|name| !name.trim().is_empty())
        .map(|name| config.variant(name).map_err(Into::into))
        .collect()
}

fn print_results(reports: &[SimulationReport]) {
    println!("\n╔══════════════════════════════════════════════════════════╗");
    println!("║  Simulation Results                                      ║");
    println!("╚══════════════════════════════════════════════════════════╝\n");

    println!(
        "{:<18} {:>4} {:>8} {:<24} {:>8} {:>10} {:>8} {:>8} {:>8} {:>9} {:>11} {:>11}",
        "Scenario", "Iter", "Devices", "Policy", "Tasks", "Completed", "BW", "Capacity", "Mobility", "Failed %", "Service (s)", "Network (s)"
    );
    println!("{}", "-".repeat(138));

    for report in reports {
        println!(
            "{:<18} {:>4} {:>8} {:<24} {:>8} {:>10} {:>8} {:>8} {:>8} {:>8.2}% {:>11.4} {:>11.4}",
            report.scenario,
            report.iteration,
            report.num_devices,
            report.policy_name,
            report.total_tasks,
            report.completed_tasks,
            report.rejected_bandwidth,
            report.rejected_capacity,
            report.failed_mobility,
            report.failure_percentage(),
            report.average_service_time,
            report.average_network_delay,
        );
    }
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tiersim=info,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => ScenarioConfig::load(path)
            .with_context(|| format!("Failed to load scenario from {}", path.display()))?,
        None => ScenarioConfig::default(),
    };
    if let Some(duration) = args.duration {
        config.simulation_time = duration;
    }
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    config.validate().context("Invalid scenario")?;

    let policies = match &args.policies {
        Some(list) => parse_policies(list)?,
        None => config.policy_kinds()?,
    };
    if policies.is_empty() {
        bail!("No policies selected");
    }

    let scenarios = select_scenarios(&config, args.scenarios.as_deref())?;
    if scenarios.is_empty() {
        bail!("No scenarios selected");
    }
    if args.iterations == 0 {
        bail!("At least one iteration is required");
    }

    let min_devices = args.min_devices.unwrap_or(config.num_devices);
    let max_devices = args.max_devices.unwrap_or(min_devices.max(config.num_devices));
    if args.step == 0 || min_devices == 0 || min_devices > max_devices {
        bail!("Invalid device sweep {min_devices}..={max_devices} step {}", args.step);
    }

    println!("╔══════════════════════════════════════════════════════════╗");
    println!("║  tiersim - mobile/edge/cloud offloading                  ║");
    println!("╚══════════════════════════════════════════════════════════╝\n");

    println!("Configuration:");
    println!(
        "  Scenarios: {}",
        scenarios.iter().map(|s| s.name.as_str()).collect::<Vec<_>>().join(", ")
    );
    println!("  Iterations: {}", args.iterations);
    println!("  Duration: {} s (warm-up {} s)", config.simulation_time, config.warm_up_period);
    println!("  Devices: {min_devices}..={max_devices} step {}", args.step);
    println!("  Edge hosts: {}, cloud hosts: {}", config.edge_hosts.len(), config.cloud_hosts.len());
    println!(
        "  Policies: {}\n",
        policies.iter().map(PolicyKind::name).collect::<Vec<_>>().join(", ")
    );

    let started = Local::now();
    println!("Scenario started at {}", started.format("%d/%m/%Y %H:%M:%S"));

    let mut reports = Vec::new();
    for iteration in 1..=args.iterations {
        for scenario in &scenarios {
            for devices in (min_devices..=max_devices).step_by(args.step) {
                for &policy in &policies {
                    let run_started = Local::now();
                    info!(scenario = %scenario.name, iteration, devices, policy = %policy, "running");

                    let report = Simulator::with_iteration(scenario, policy, devices, iteration)
                        .and_then(Simulator::run)
                        .with_context(|| {
                            format!(
                                "Simulation failed for {} / {policy} with {devices} devices (iteration {iteration})",
                                scenario.name
                            )
                        })?;

                    let elapsed = Local::now() - run_started;
                    println!(
                        "  #{iteration} {:<18} {devices:>6} devices, {:<24} done in {:.3} s",
                        scenario.name,
                        policy.name(),
                        elapsed.num_milliseconds() as f64 / 1000.0
                    );
                    reports.push(report);
                }
            }
        }
    }

    let finished = Local::now();
    println!("Scenario finished at {}", finished.format("%d/%m/%Y %H:%M:%S"));
    println!("Duration: {} s", (finished - started).num_seconds());

    print_results(&reports);

    if let Some(path) = &args.output {
        println!("\nWriting results to {}...", path.display());
        let json = serde_json::to_string_pretty(&reports)?;
        fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
        println!("  Results saved");
    }

    println!("\nSimulation complete!\n");
    Ok(())
}
