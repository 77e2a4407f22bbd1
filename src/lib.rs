//! Double pendulum simulation and video rendering.
//!
//! The pipeline runs one way: parameters are integrated once into a [`Trajectory`]
//! with an adaptive Dormand-Prince solver, each evaluation sample is mapped to pixel
//! space, drawn (fading tip trails, rods, hinges) at a supersampled resolution,
//! reduced, and written to a [`FrameSink`].

pub mod cli;
pub mod config;
pub mod diagnostics;
pub mod dynamics;
pub mod error;
pub mod integrator;
pub mod mapper;
pub mod render;
pub mod sequencer;
pub mod sink;
pub mod trail;
pub mod trajectory;

pub use config::{
    AnimationConfig, InitialState, PhysicalParams, RenderConfig, SimulationConfig, TrailConfig,
    VideoConfig,
};
pub use error::{Error, Result};
pub use integrator::SolverOptions;
pub use mapper::{CoordinateMapper, PixelPoint, PosePixels};
pub use render::{rgb, Color, FrameRenderer, RodStyle};
pub use sequencer::{FrameSequencer, SequenceSummary};
pub use sink::{FfmpegSink, FrameSink, PngSequenceSink, VideoCodec};
pub use trail::{TrailBuffer, TrailStyle};
pub use trajectory::{solve, solve_ensemble, Trajectory, TrajectorySample};
