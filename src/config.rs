// ------------------------------------------------------------
// Immutable run configuration.
//
// Everything a run needs is gathered into an AnimationConfig that is built once,
// validated once, and then passed by reference into each stage of the pipeline.
// ------------------------------------------------------------

use crate::error::{Error, Result};
use crate::mapper::PixelPoint;
use crate::render::{rgb, Color, RodStyle};
use crate::sink::VideoCodec;
use crate::trail::TrailStyle;

pub const GRAVITATIONAL_ACCELERATION: f64 = 9.81;

fn ensure_positive(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(Error::config(format!("{name} must be positive and finite, got {value}")))
    }
}

// ------------------------------------------------------------
// Physical parameters
// ------------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhysicalParams {
    pub l1: f64, // top rod length (m)
    pub l2: f64, // bottom rod length (m)
    pub m1: f64, // point mass at the elbow
    pub m2: f64, // point mass at the tip
    pub g: f64,
}

impl PhysicalParams {
    pub fn new(l1: f64, l2: f64, m1: f64, m2: f64) -> Self {
        Self {
            l1,
            l2,
            m1,
            m2,
            g: GRAVITATIONAL_ACCELERATION,
        }
    }

    pub fn validate(&self) -> Result<()> {
        ensure_positive("L1", self.l1)?;
        ensure_positive("L2", self.l2)?;
        ensure_positive("m1", self.m1)?;
        ensure_positive("m2", self.m2)?;
        if !self.g.is_finite() {
            return Err(Error::config(format!("g must be finite, got {}", self.g)));
        }
        Ok(())
    }
}

// ------------------------------------------------------------
// Initial condition (theta measured from the downward vertical)
// ------------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InitialState {
    pub theta1: f64,
    pub theta1_dot: f64,
    pub theta2: f64,
    pub theta2_dot: f64,
}

impl InitialState {
    /// Both rods released at rest from the given angles in degrees.
    pub fn at_rest_degrees(theta1_deg: f64, theta2_deg: f64) -> Self {
        Self {
            theta1: theta1_deg.to_radians(),
            theta1_dot: 0.0,
            theta2: theta2_deg.to_radians(),
            theta2_dot: 0.0,
        }
    }

    pub fn validate(&self) -> Result<()> {
        let all = [self.theta1, self.theta1_dot, self.theta2, self.theta2_dot];
        if all.iter().all(|v| v.is_finite()) {
            Ok(())
        } else {
            Err(Error::config(format!("initial state must be finite, got {self:?}")))
        }
    }
}

// ------------------------------------------------------------
// Simulation span and evaluation grid
// ------------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationConfig {
    pub duration: f64,
    pub num_eval_points: usize,
}

impl SimulationConfig {
    pub fn new(duration: f64, num_eval_points: usize) -> Self {
        Self {
            duration,
            num_eval_points,
        }
    }

    /// One evaluation point per `time_step` seconds of simulated time.
    pub fn from_time_step(duration: f64, time_step: f64) -> Result<Self> {
        ensure_positive("simulation time step", time_step)?;
        ensure_positive("duration", duration)?;
        Ok(Self::new(duration, (duration / time_step) as usize))
    }

    pub fn grid_spacing(&self) -> f64 {
        self.duration / (self.num_eval_points - 1) as f64
    }

    pub fn validate(&self) -> Result<()> {
        ensure_positive("duration", self.duration)?;
        if self.num_eval_points < 2 {
            return Err(Error::config(format!(
                "at least 2 evaluation points are required, got {}",
                self.num_eval_points
            )));
        }
        Ok(())
    }
}

// ------------------------------------------------------------
// Video timing
// ------------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VideoConfig {
    pub frames_per_sec: u32,
    /// Simulated seconds per second of video.
    pub speedup_ratio: f64,
    pub codec: VideoCodec,
}

impl VideoConfig {
    pub fn simulation_time_step(&self) -> f64 {
        self.speedup_ratio / self.frames_per_sec as f64
    }

    pub fn validate(&self) -> Result<()> {
        if self.frames_per_sec == 0 {
            return Err(Error::config("frames per second must be at least 1"));
        }
        ensure_positive("speedup ratio", self.speedup_ratio)
    }
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            frames_per_sec: 25,
            speedup_ratio: 10.0,
            codec: VideoCodec::Mpeg4,
        }
    }
}

// ------------------------------------------------------------
// Raster geometry
// ------------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderConfig {
    /// Internal (supersampled) drawing resolution.
    pub image_resolution: (u32, u32),
    pub downsample_factor: u32,
    pub pixels_per_meter: f64,
    /// Fixed top hinge, in internal-resolution pixels.
    pub fixed_hinge: PixelPoint,
    pub background: Color,
    pub rod: RodStyle,
}

impl RenderConfig {
    pub fn output_resolution(&self) -> (u32, u32) {
        (
            self.image_resolution.0 / self.downsample_factor,
            self.image_resolution.1 / self.downsample_factor,
        )
    }

    pub fn validate(&self) -> Result<()> {
        let (w, h) = self.image_resolution;
        if w == 0 || h == 0 {
            return Err(Error::config(format!("image resolution {w}x{h} is empty")));
        }
        if self.downsample_factor == 0 {
            return Err(Error::config("downsample factor must be at least 1"));
        }
        if w % self.downsample_factor != 0 || h % self.downsample_factor != 0 {
            return Err(Error::config(format!(
                "image resolution {w}x{h} is not divisible by downsample factor {}",
                self.downsample_factor
            )));
        }
        ensure_positive("pixels per meter", self.pixels_per_meter)?;
        self.rod.validate()
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        let (w, h) = (2000, 2000);
        Self {
            image_resolution: (w, h),
            downsample_factor: 2,
            pixels_per_meter: 1.5,
            fixed_hinge: PixelPoint::new(w as i32 / 2, h as i32 / 2 - 200),
            background: rgb(1.0, 1.0, 1.0),
            rod: RodStyle::default(),
        }
    }
}

// ------------------------------------------------------------
// Trail fade thresholds (colors are per tracked body)
// ------------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrailConfig {
    pub fadeout_start: usize,
    pub fadeout_end: usize,
    pub dot_radius: i32,
}

impl TrailConfig {
    pub fn validate(&self) -> Result<()> {
        if self.fadeout_start >= self.fadeout_end {
            return Err(Error::config(format!(
                "trail fadeout start ({}) must be below fadeout end ({})",
                self.fadeout_start, self.fadeout_end
            )));
        }
        if self.dot_radius < 0 {
            return Err(Error::config("trail dot radius must not be negative"));
        }
        Ok(())
    }

    pub fn style(&self, color: Color, background: Color) -> TrailStyle {
        TrailStyle {
            color,
            background,
            fadeout_start: self.fadeout_start,
            fadeout_end: self.fadeout_end,
            dot_radius: self.dot_radius,
        }
    }
}

impl Default for TrailConfig {
    fn default() -> Self {
        Self {
            fadeout_start: 100,
            fadeout_end: 200,
            dot_radius: 5,
        }
    }
}

// ------------------------------------------------------------
// Complete run
// ------------------------------------------------------------
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationConfig {
    pub physics: PhysicalParams,
    /// One entry per pendulum sharing the scene.
    pub initial_states: Vec<InitialState>,
    /// Trail color per pendulum; an empty list disables trails.
    pub trail_colors: Vec<Color>,
    pub simulation: SimulationConfig,
    pub video: VideoConfig,
    pub render: RenderConfig,
    pub trail: TrailConfig,
}

impl AnimationConfig {
    pub fn validate(&self) -> Result<()> {
        self.physics.validate()?;
        if self.initial_states.is_empty() {
            return Err(Error::config("at least one initial state is required"));
        }
        for state in &self.initial_states {
            state.validate()?;
        }
        if !self.trail_colors.is_empty() && self.trail_colors.len() != self.initial_states.len() {
            return Err(Error::config(format!(
                "{} trail colors given for {} pendulums",
                self.trail_colors.len(),
                self.initial_states.len()
            )));
        }
        self.simulation.validate()?;
        self.video.validate()?;
        self.render.validate()?;
        self.trail.validate()
    }

    pub fn trail_styles(&self) -> Vec<TrailStyle> {
        self.trail_colors
            .iter()
            .map(|&c| self.trail.style(c, self.render.background))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> AnimationConfig {
        let video = VideoConfig::default();
        AnimationConfig {
            physics: PhysicalParams::new(250.0, 250.0, 200.0, 200.0),
            initial_states: vec![InitialState::at_rest_degrees(90.0, 90.0)],
            trail_colors: vec![rgb(0.8, 0.0, 0.0)],
            simulation: SimulationConfig::from_time_step(400.0, video.simulation_time_step())
                .unwrap(),
            video,
            render: RenderConfig::default(),
            trail: TrailConfig::default(),
        }
    }

    #[test]
    fn defaults_are_valid() {
        let cfg = sample();
        cfg.validate().unwrap();
        assert_eq!(cfg.simulation.num_eval_points, 1000);
        assert!((cfg.simulation.grid_spacing() - 400.0 / 999.0).abs() < 1e-12);
        assert_eq!(cfg.render.output_resolution(), (1000, 1000));
    }

    #[test]
    fn rejects_non_positive_physics() {
        let mut cfg = sample();
        cfg.physics.m2 = 0.0;
        assert!(matches!(cfg.validate(), Err(Error::InvalidConfig(_))));

        let mut cfg = sample();
        cfg.physics.l1 = -1.0;
        assert!(matches!(cfg.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn rejects_degenerate_grid() {
        let mut cfg = sample();
        cfg.simulation.num_eval_points = 1;
        assert!(matches!(cfg.validate(), Err(Error::InvalidConfig(_))));

        let mut cfg = sample();
        cfg.simulation.duration = 0.0;
        assert!(matches!(cfg.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn rejects_indivisible_resolution() {
        let mut cfg = sample();
        cfg.render.image_resolution = (2001, 2000);
        assert!(matches!(cfg.validate(), Err(Error::InvalidConfig(_))));

        let mut cfg = sample();
        cfg.render.downsample_factor = 0;
        assert!(matches!(cfg.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn rejects_trail_color_count_mismatch() {
        let mut cfg = sample();
        cfg.trail_colors.push(rgb(0.0, 0.0, 0.8));
        assert!(matches!(cfg.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn rejects_inverted_fade_thresholds() {
        let mut cfg = sample();
        cfg.trail.fadeout_start = 200;
        assert!(matches!(cfg.validate(), Err(Error::InvalidConfig(_))));
    }
}
