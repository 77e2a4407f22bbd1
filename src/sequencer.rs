// ------------------------------------------------------------
// Trajectory samples to ordered video frames.
//
// Per evaluation index the sequencer maps every pendulum to pixels, extends each
// tip trail, composites `background -> trails -> rods` at the supersampled
// resolution, reduces the frame and hands the 8-bit result to the sink.
// ------------------------------------------------------------

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use crate::config::{PhysicalParams, RenderConfig};
use crate::error::{Error, Result};
use crate::mapper::CoordinateMapper;
use crate::render::{downsample, to_rgb8, FrameRenderer};
use crate::sink::FrameSink;
use crate::trail::{TrailBuffer, TrailStyle};
use crate::trajectory::Trajectory;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequenceSummary {
    pub frames_written: usize,
    pub output_resolution: (u32, u32),
}

pub struct FrameSequencer {
    renderer: FrameRenderer,
    mapper: CoordinateMapper,
    downsample_factor: u32,
    output_resolution: (u32, u32),
    trail_styles: Vec<TrailStyle>,
    frame_limit: Option<usize>,
    progress: bool,
}

impl FrameSequencer {
    /// `trail_styles` holds one style per pendulum, or nothing to draw without trails.
    pub fn new(render: &RenderConfig, trail_styles: Vec<TrailStyle>) -> Self {
        Self {
            renderer: FrameRenderer::new(render),
            mapper: CoordinateMapper::new(render.fixed_hinge, render.pixels_per_meter),
            downsample_factor: render.downsample_factor,
            output_resolution: render.output_resolution(),
            trail_styles,
            frame_limit: None,
            progress: false,
        }
    }

    /// Stop after `limit` frames even if the trajectories are longer.
    pub fn with_frame_limit(mut self, limit: usize) -> Self {
        self.frame_limit = Some(limit);
        self
    }

    /// Show a console progress bar while rendering.
    pub fn with_progress(mut self, enabled: bool) -> Self {
        self.progress = enabled;
        self
    }

    fn progress_bar(&self, total: usize) -> ProgressBar {
        if !self.progress {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(total as u64);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40}] {pos}/{len} frames ({per_sec})")
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        pb.set_style(style);
        pb
    }

    /// Render every evaluation index of `trajectories` into `sink`, then release it.
    pub fn run(
        &self,
        params: &PhysicalParams,
        trajectories: &[Trajectory],
        sink: &mut dyn FrameSink,
    ) -> Result<SequenceSummary> {
        let first = trajectories
            .first()
            .ok_or_else(|| Error::config("no trajectories to render"))?;
        let len = first.len();
        if let Some(bad) = trajectories.iter().find(|tr| tr.len() != len) {
            return Err(Error::config(format!(
                "trajectory lengths differ: {len} vs {}",
                bad.len()
            )));
        }
        if !self.trail_styles.is_empty() && self.trail_styles.len() != trajectories.len() {
            return Err(Error::config(format!(
                "{} trail styles given for {} trajectories",
                self.trail_styles.len(),
                trajectories.len()
            )));
        }

        let total = self.frame_limit.map_or(len, |limit| limit.min(len));
        let mut trails: Vec<TrailBuffer> =
            self.trail_styles.iter().copied().map(TrailBuffer::new).collect();

        info!(
            frames = total,
            pendulums = trajectories.len(),
            width = self.output_resolution.0,
            height = self.output_resolution.1,
            "rendering frames"
        );
        let pb = self.progress_bar(total);

        for i in 0..total {
            let poses: Vec<_> = trajectories
                .iter()
                .map(|tr| self.mapper.pose_pixels(params, &tr.sample(i)))
                .collect();

            let mut frame = self.renderer.blank_frame();
            for (trail, pose) in trails.iter_mut().zip(&poses) {
                trail.add_point(pose.tip);
                trail.render(&mut frame);
            }
            for pose in &poses {
                self.renderer.draw_pendulum(&mut frame, pose);
            }

            let out = to_rgb8(&downsample(&frame, self.downsample_factor));
            sink.write(&out)?;

            debug!(frame = i, t = first.t()[i], "frame written");
            pb.inc(1);
        }

        sink.release()?;
        pb.finish_and_clear();

        Ok(SequenceSummary {
            frames_written: total,
            output_resolution: self.output_resolution,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{InitialState, SimulationConfig, TrailConfig};
    use crate::integrator::SolverOptions;
    use crate::mapper::PixelPoint;
    use crate::render::{rgb, RodStyle};
    use crate::trajectory::solve;
    use image::RgbImage;

    #[derive(Default)]
    struct CollectingSink {
        frames: Vec<RgbImage>,
        released: bool,
    }

    impl FrameSink for CollectingSink {
        fn write(&mut self, frame: &RgbImage) -> Result<()> {
            self.frames.push(frame.clone());
            Ok(())
        }

        fn release(&mut self) -> Result<()> {
            self.released = true;
            Ok(())
        }
    }

    fn small_render() -> RenderConfig {
        RenderConfig {
            image_resolution: (120, 120),
            downsample_factor: 2,
            pixels_per_meter: 20.0,
            fixed_hinge: PixelPoint::new(60, 40),
            background: rgb(1.0, 1.0, 1.0),
            rod: RodStyle {
                width: 10,
                border_thickness: 1,
                pin_radius: 2,
                ..RodStyle::default()
            },
        }
    }

    fn run_pair(n: usize) -> (PhysicalParams, Vec<Trajectory>) {
        let p = PhysicalParams::new(1.0, 1.0, 1.0, 1.0);
        let sim = SimulationConfig::new(1.0, n);
        let opts = SolverOptions::default();
        let trs = [
            InitialState::at_rest_degrees(30.0, 30.0),
            InitialState::at_rest_degrees(-30.0, 10.0),
        ]
        .iter()
        .map(|init| solve(&p, init, &sim, &opts).unwrap())
        .collect();
        (p, trs)
    }

    #[test]
    fn writes_one_frame_per_sample_at_output_resolution() {
        let (p, trs) = run_pair(6);
        let render = small_render();
        let styles = vec![
            TrailConfig::default().style(rgb(0.8, 0.0, 0.0), render.background),
            TrailConfig::default().style(rgb(0.0, 0.0, 0.8), render.background),
        ];
        let mut sink = CollectingSink::default();
        let summary = FrameSequencer::new(&render, styles)
            .run(&p, &trs, &mut sink)
            .unwrap();

        assert_eq!(summary.frames_written, 6);
        assert_eq!(summary.output_resolution, (60, 60));
        assert_eq!(sink.frames.len(), 6);
        assert!(sink.released);
        for frame in &sink.frames {
            assert_eq!(frame.dimensions(), (60, 60));
        }
        // Corner pixel stays background.
        assert_eq!(sink.frames[0].get_pixel(0, 59).0, [255, 255, 255]);
    }

    #[test]
    fn rods_are_drawn_over_trails() {
        // Hanging at rest: hinge (60, 40), elbow (60, 60), tip (60, 80) internally.
        let p = PhysicalParams::new(1.0, 1.0, 1.0, 1.0);
        let sim = SimulationConfig::new(1.0, 2);
        let tr = solve(&p, &InitialState::at_rest_degrees(0.0, 0.0), &sim, &SolverOptions::default())
            .unwrap();

        let render = small_render();
        let trail = TrailConfig {
            dot_radius: 10,
            ..TrailConfig::default()
        };
        let styles = vec![trail.style(rgb(0.0, 0.0, 0.0), render.background)];
        let mut sink = CollectingSink::default();
        FrameSequencer::new(&render, styles)
            .run(&p, &[tr], &mut sink)
            .unwrap();

        let frame = &sink.frames[0];
        // Lower rod body inside the trail dot keeps the rod fill.
        assert_eq!(frame.get_pixel(31, 37).0, [0, 128, 255]);
        // Trail dot beside the rod stays trail colored.
        assert_eq!(frame.get_pixel(26, 40).0, [0, 0, 0]);
    }

    #[test]
    fn frame_limit_stops_early() {
        let (p, trs) = run_pair(10);
        let mut sink = CollectingSink::default();
        let summary = FrameSequencer::new(&small_render(), Vec::new())
            .with_frame_limit(3)
            .run(&p, &trs, &mut sink)
            .unwrap();
        assert_eq!(summary.frames_written, 3);
        assert_eq!(sink.frames.len(), 3);
    }

    #[test]
    fn rejects_mismatched_lengths() {
        let (p, mut trs) = run_pair(5);
        let (_, longer) = run_pair(7);
        trs.push(longer[0].clone());
        let mut sink = CollectingSink::default();
        let err = FrameSequencer::new(&small_render(), Vec::new())
            .run(&p, &trs, &mut sink)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
        assert!(sink.frames.is_empty());
    }

    #[test]
    fn rejects_trail_count_mismatch() {
        let (p, trs) = run_pair(4);
        let render = small_render();
        let styles = vec![TrailConfig::default().style(rgb(0.8, 0.0, 0.0), render.background)];
        let mut sink = CollectingSink::default();
        let err = FrameSequencer::new(&render, styles)
            .run(&p, &trs, &mut sink)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[test]
    fn identical_runs_produce_identical_frames() {
        let (p, trs) = run_pair(4);
        let render = small_render();
        let mut a = CollectingSink::default();
        let mut b = CollectingSink::default();
        let seq = FrameSequencer::new(&render, Vec::new());
        seq.run(&p, &trs, &mut a).unwrap();
        seq.run(&p, &trs, &mut b).unwrap();
        assert_eq!(a.frames, b.frames);
    }
}
