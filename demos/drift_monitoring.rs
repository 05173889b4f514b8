//! Drift Monitoring: reference population vs. a shifted production window
//!
//! This demo builds a known-good reference from 50 simulated runs, then
//! produces a second window of runs whose target thickness is pushed toward
//! the top of its range, and reports how the detector classifies it.
//!
//! Toyota Way: Jidoka (stop the line when the process leaves its envelope)
//!
//! Run with: cargo run --example drift_monitoring
//! Verbose:  RUST_LOG=spraywatch=debug cargo run --example drift_monitoring

use anyhow::Context;
use spraywatch::simulation::{Coating, SetupParams, Substrate};
use spraywatch::{ProcessMonitor, SimulationConfig};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    println!("=== Spraywatch Drift Monitoring ===\n");

    let config = SimulationConfig::default().with_seed(42);
    let monitor = ProcessMonitor::new(config).context("building monitor")?;

    println!("=== Step 1: Reference Population ===");
    let reference = monitor
        .initialize(config.num_initial_runs)
        .context("generating reference runs")?;
    println!("  Reference runs: {}", reference.len());
    if let Some(summary) = monitor.summary() {
        println!("  Avg thickness: {:.1} µm", summary.avg_thickness_um);
        println!("  Avg porosity: {:.2} %", summary.avg_porosity_pct);
        println!("  Defect rate: {:.1} %", summary.defect_rate_pct);
    }

    println!("\n=== Step 2: In-Control Window ===");
    for _ in 0..config.recent_window {
        monitor.add_run()?;
    }
    let status = monitor.drift_status(config.recent_window);
    println!("  Status: {}", status.overall_status);
    println!("  PSI: {:.4}", status.psi);
    println!("  Drifted features: {}", status.drifted_features.len());

    println!("\n=== Step 3: Shifted Window (thick coatings) ===");
    let mut shifted = Vec::with_capacity(config.recent_window);
    for i in 0..config.recent_window {
        #[allow(clippy::cast_precision_loss)]
        let thickness = 380.0 + (i % 5) as f64 * 4.0;
        let setup = SetupParams::new(Substrate::Steel, Coating::Ysz, thickness, 120.0, 500.0)?;
        let mut orch = spraywatch::RunOrchestrator::with_config(config.with_seed(1_000 + i as u64))?;
        shifted.push(orch.generate_single_run(
            config.duration_seconds,
            config.sample_rate_hz,
            None,
            Some(setup),
        )?);
    }
    let status = monitor
        .detector()
        .detect_drift(&shifted, spraywatch::FeatureEngineer::feature_count());
    println!("  Status: {}", status.overall_status);
    println!("  PSI: {:.4}", status.psi);

    let summary = status.summary();
    println!("  Recommendation: {}", summary.recommendation);
    for feature in &summary.top_drifted_features {
        println!("    {:<45} shift {:.3}", feature.name, feature.shift);
    }

    println!("\n=== Drift Summary (JSON) ===");
    println!("{}", serde_json::to_string_pretty(&summary)?);

    Ok(())
}
