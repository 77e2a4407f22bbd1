// ------------------------------------------------------------
// Sensitivity to initial conditions
//   - Three identical double pendulums, bottom rod released at 90, 89 and 88 degrees
//   - Integrated in parallel, drawn in one scene with colored trails
//   - Pairwise tip distance logged over time
//
// Output folder (relative to where you run the program):
//   output/pendulum_divergence/divergence.mp4
//   output/pendulum_divergence/tip_distances.csv
//   output/pendulum_divergence/tip_distances.png   (feature "plots")
// ------------------------------------------------------------

use std::fs;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use double_pendulum::cli::OutputArgs;
use double_pendulum::diagnostics::{pairwise_tip_distances, write_distances_csv};
use double_pendulum::{rgb, solve_ensemble, InitialState, PhysicalParams};

#[derive(Parser)]
#[command(name = "pendulum_divergence")]
#[command(about = "Render diverging double pendulums and log their tip distances")]
struct Cli {
    #[arg(long, default_value_t = 250.0)]
    l1: f64,

    #[arg(long, default_value_t = 250.0)]
    l2: f64,

    #[arg(long, default_value_t = 200.0)]
    m1: f64,

    #[arg(long, default_value_t = 200.0)]
    m2: f64,

    /// Shared initial top rod angle (degrees)
    #[arg(long, default_value_t = 90.0)]
    theta1: f64,

    /// Initial bottom rod angle of each pendulum (degrees)
    #[arg(long, value_delimiter = ',', default_value = "90,89,88")]
    theta2: Vec<f64>,

    /// Simulated duration (s)
    #[arg(long, default_value_t = 400.0)]
    duration: f64,

    #[command(flatten)]
    out: OutputArgs,
}

// Trail palette, cycled when more than three pendulums are requested.
const TRAIL_COLORS: [(f32, f32, f32); 3] = [(0.8, 0.8, 0.0), (0.8, 0.5, 0.0), (0.8, 0.0, 0.0)];

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    // ----------------------------
    // Configuration
    // ----------------------------
    let physics = PhysicalParams::new(cli.l1, cli.l2, cli.m1, cli.m2);
    let initials: Vec<InitialState> = cli
        .theta2
        .iter()
        .map(|&th2| InitialState::at_rest_degrees(cli.theta1, th2))
        .collect();
    let colors = (0..initials.len())
        .map(|i| {
            let (r, g, b) = TRAIL_COLORS[i % TRAIL_COLORS.len()];
            rgb(r, g, b)
        })
        .collect();

    let config = cli
        .out
        .animation_config(physics, initials, colors, cli.duration)
        .context("Invalid configuration")?;

    let out_dir = cli.out.output_dir("pendulum_divergence");
    fs::create_dir_all(&out_dir).context("Failed to create output directories")?;

    // ----------------------------
    // Simulation (one rayon task per pendulum)
    // ----------------------------
    info!(
        pendulums = config.initial_states.len(),
        samples = config.simulation.num_eval_points,
        "simulating ensemble"
    );
    let trajectories = solve_ensemble(
        &config.physics,
        &config.initial_states,
        &config.simulation,
        &cli.out.solver_options(),
    )
    .context("Simulation failed")?;

    // ----------------------------
    // Divergence log
    // ----------------------------
    let distances = pairwise_tip_distances(&config.physics, &trajectories)
        .context("Failed to compute tip distances")?;
    let t = trajectories[0].t();
    write_distances_csv(&out_dir.join("tip_distances.csv"), t, &distances)
        .context("Failed to write tip distance CSV")?;

    #[cfg(feature = "plots")]
    double_pendulum::diagnostics::save_distance_plot_png(
        &out_dir.join("tip_distances.png"),
        "Tip distance between pendulums",
        t,
        &distances,
    )
    .context("Failed to save tip distance plot")?;

    for d in &distances {
        let final_distance = d.distance.last().copied().unwrap_or(0.0);
        info!(pair = ?d.pair, final_distance, "tip separation");
    }

    // ----------------------------
    // Rendering
    // ----------------------------
    let summary = cli
        .out
        .render_video(&config, &trajectories, &out_dir, "divergence")
        .context("Rendering failed")?;

    info!(
        frames = summary.frames_written,
        "done, results are in {}",
        out_dir.display()
    );
    Ok(())
}
