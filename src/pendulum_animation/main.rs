// ------------------------------------------------------------
// Double Pendulum animation
//   - Equations of motion integrated once with adaptive RK45 (dense output)
//   - One frame per evaluation point: rods, hinge pins, fading tip trail
//   - Frames drawn at 2x resolution and area-averaged down
//
// Output folder (relative to where you run the program):
//   output/pendulum_animation/double_pendulum.mp4
//   output/pendulum_animation/frames/frame_000000.png ...   (with --png-frames)
//   output/pendulum_animation/trajectory.csv
// ------------------------------------------------------------

use std::fs;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use double_pendulum::cli::OutputArgs;
use double_pendulum::diagnostics::write_trajectory_csv;
use double_pendulum::trajectory::solve_with_stats;
use double_pendulum::{rgb, InitialState, PhysicalParams};

#[derive(Parser)]
#[command(name = "pendulum_animation")]
#[command(about = "Render a single double pendulum to video")]
struct Cli {
    /// Top rod length (m)
    #[arg(long, default_value_t = 200.0)]
    l1: f64,

    /// Bottom rod length (m)
    #[arg(long, default_value_t = 300.0)]
    l2: f64,

    /// Elbow mass
    #[arg(long, default_value_t = 100.0)]
    m1: f64,

    /// Tip mass
    #[arg(long, default_value_t = 300.0)]
    m2: f64,

    /// Initial top rod angle from the downward vertical (degrees)
    #[arg(long, default_value_t = 45.0)]
    theta1: f64,

    /// Initial bottom rod angle from the downward vertical (degrees)
    #[arg(long, default_value_t = 140.0)]
    theta2: f64,

    /// Simulated duration (s)
    #[arg(long, default_value_t = 450.0)]
    duration: f64,

    /// Draw the tip without a trail
    #[arg(long, default_value = "false")]
    no_trail: bool,

    #[command(flatten)]
    out: OutputArgs,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    // ----------------------------
    // Configuration
    // ----------------------------
    let physics = PhysicalParams::new(cli.l1, cli.l2, cli.m1, cli.m2);
    let initial = InitialState::at_rest_degrees(cli.theta1, cli.theta2);
    let trail_colors = if cli.no_trail {
        Vec::new()
    } else {
        vec![rgb(0.8, 0.0, 0.0)]
    };

    let config = cli
        .out
        .animation_config(physics, vec![initial], trail_colors, cli.duration)
        .context("Invalid configuration")?;

    let out_dir = cli.out.output_dir("pendulum_animation");
    fs::create_dir_all(&out_dir).context("Failed to create output directories")?;

    // ----------------------------
    // Simulation
    // ----------------------------
    info!(
        duration = config.simulation.duration,
        samples = config.simulation.num_eval_points,
        "simulating"
    );
    let (trajectory, stats) = solve_with_stats(
        &config.physics,
        &config.initial_states[0],
        &config.simulation,
        &cli.out.solver_options(),
    )
    .context("Simulation failed")?;
    info!(
        accepted = stats.accepted_steps,
        rejected = stats.rejected_steps,
        evaluations = stats.evaluations,
        "integration finished"
    );

    write_trajectory_csv(&out_dir.join("trajectory.csv"), &config.physics, &trajectory)
        .context("Failed to write trajectory CSV")?;

    // ----------------------------
    // Rendering
    // ----------------------------
    let summary = cli
        .out
        .render_video(&config, std::slice::from_ref(&trajectory), &out_dir, "double_pendulum")
        .context("Rendering failed")?;

    info!(
        frames = summary.frames_written,
        width = summary.output_resolution.0,
        height = summary.output_resolution.1,
        "done, results are in {}",
        out_dir.display()
    );
    Ok(())
}
