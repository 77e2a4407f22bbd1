// ------------------------------------------------------------
// Command-line options shared by the binaries.
//
// Each binary owns its physical scenario (rod lengths, masses, start angles) and
// flattens OutputArgs for everything about timing, raster geometry, the solver
// and where frames go.
// ------------------------------------------------------------

use std::path::{Path, PathBuf};

use clap::Args;
use tracing::info;

use crate::config::{
    AnimationConfig, InitialState, PhysicalParams, RenderConfig, SimulationConfig, TrailConfig,
    VideoConfig,
};
use crate::error::Result;
use crate::integrator::SolverOptions;
use crate::mapper::PixelPoint;
use crate::render::{Color, RodStyle};
use crate::sequencer::{FrameSequencer, SequenceSummary};
use crate::sink::{encode_png_sequence, FfmpegSink, PngSequenceSink, VideoCodec};
use crate::trajectory::Trajectory;

#[derive(Debug, Clone, Args)]
pub struct OutputArgs {
    /// Video frame rate
    #[arg(long, default_value_t = 25)]
    pub fps: u32,

    /// Simulated seconds per second of video
    #[arg(long, default_value_t = 10.0)]
    pub speedup: f64,

    #[arg(long, value_enum, default_value_t = VideoCodec::Mpeg4)]
    pub codec: VideoCodec,

    /// Internal (supersampled) frame width in pixels
    #[arg(long, default_value_t = 2000)]
    pub width: u32,

    /// Internal (supersampled) frame height in pixels
    #[arg(long, default_value_t = 2000)]
    pub height: u32,

    /// Supersampling factor; the video is width/factor x height/factor
    #[arg(long, default_value_t = 2)]
    pub downsample: u32,

    #[arg(long, default_value_t = 1.5)]
    pub pixels_per_meter: f64,

    /// Fixed hinge x in internal pixels (defaults to width/2)
    #[arg(long, allow_hyphen_values = true)]
    pub hinge_x: Option<i32>,

    /// Fixed hinge y in internal pixels (defaults to height/2 - 200)
    #[arg(long, allow_hyphen_values = true)]
    pub hinge_y: Option<i32>,

    /// Rod width in internal pixels (even)
    #[arg(long, default_value_t = 100)]
    pub rod_width: u32,

    /// Age (in frames) at which trail dots start fading
    #[arg(long, default_value_t = 100)]
    pub fadeout_start: usize,

    /// Age (in frames) at which trail dots have fully faded
    #[arg(long, default_value_t = 200)]
    pub fadeout_end: usize,

    #[arg(long, default_value_t = 1e-3)]
    pub rtol: f64,

    #[arg(long, default_value_t = 1e-6)]
    pub atol: f64,

    /// Stop after this many frames
    #[arg(long)]
    pub max_frames: Option<usize>,

    /// Write frames/frame_%06d.png and encode afterwards instead of piping to ffmpeg
    #[arg(long, default_value = "false")]
    pub png_frames: bool,

    /// Output directory (defaults to output/<program>)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    #[arg(long, default_value = "false")]
    pub no_progress: bool,
}

impl OutputArgs {
    pub fn video_config(&self) -> VideoConfig {
        VideoConfig {
            frames_per_sec: self.fps,
            speedup_ratio: self.speedup,
            codec: self.codec,
        }
    }

    pub fn render_config(&self) -> RenderConfig {
        let hinge = PixelPoint::new(
            self.hinge_x.unwrap_or(self.width as i32 / 2),
            self.hinge_y.unwrap_or(self.height as i32 / 2 - 200),
        );
        RenderConfig {
            image_resolution: (self.width, self.height),
            downsample_factor: self.downsample,
            pixels_per_meter: self.pixels_per_meter,
            fixed_hinge: hinge,
            rod: RodStyle {
                width: self.rod_width,
                ..RodStyle::default()
            },
            ..RenderConfig::default()
        }
    }

    pub fn trail_config(&self) -> TrailConfig {
        TrailConfig {
            fadeout_start: self.fadeout_start,
            fadeout_end: self.fadeout_end,
            ..TrailConfig::default()
        }
    }

    pub fn solver_options(&self) -> SolverOptions {
        SolverOptions::with_tolerances(self.rtol, self.atol)
    }

    pub fn output_dir(&self, program: &str) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| PathBuf::from("output").join(program))
    }

    /// Assemble and validate the immutable run configuration.
    pub fn animation_config(
        &self,
        physics: PhysicalParams,
        initial_states: Vec<InitialState>,
        trail_colors: Vec<Color>,
        duration: f64,
    ) -> Result<AnimationConfig> {
        let video = self.video_config();
        video.validate()?;
        let config = AnimationConfig {
            physics,
            initial_states,
            trail_colors,
            simulation: SimulationConfig::from_time_step(duration, video.simulation_time_step())?,
            video,
            render: self.render_config(),
            trail: self.trail_config(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Render `trajectories` into `<out_dir>/<stem>.mp4`, either through an ffmpeg pipe
    /// or through a PNG frame sequence.
    pub fn render_video(
        &self,
        config: &AnimationConfig,
        trajectories: &[Trajectory],
        out_dir: &Path,
        stem: &str,
    ) -> Result<SequenceSummary> {
        let mut sequencer = FrameSequencer::new(&config.render, config.trail_styles())
            .with_progress(!self.no_progress);
        if let Some(limit) = self.max_frames {
            sequencer = sequencer.with_frame_limit(limit);
        }

        let video_path = out_dir.join(format!("{stem}.mp4"));
        let size = config.render.output_resolution();
        let fps = config.video.frames_per_sec;

        if self.png_frames {
            let frames_dir = out_dir.join("frames");
            let mut sink = PngSequenceSink::create(&frames_dir, size)?;
            let summary = sequencer.run(&config.physics, trajectories, &mut sink)?;
            encode_png_sequence(&frames_dir, config.video.codec, fps, &video_path)?;
            Ok(summary)
        } else {
            let mut sink = FfmpegSink::open(&video_path, config.video.codec, fps, size)?;
            let summary = sequencer.run(&config.physics, trajectories, &mut sink)?;
            info!(path = %video_path.display(), "video complete");
            Ok(summary)
        }
    }
}
