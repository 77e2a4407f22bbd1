//! Trajectory -> frames -> PNG sequence on disk.

use double_pendulum::render::RodStyle;
use double_pendulum::{
    rgb, solve_ensemble, FrameSequencer, FrameSink, InitialState, PhysicalParams, PixelPoint,
    PngSequenceSink, RenderConfig, SimulationConfig, SolverOptions, TrailConfig,
};

fn small_scene() -> RenderConfig {
    RenderConfig {
        image_resolution: (200, 160),
        downsample_factor: 2,
        pixels_per_meter: 30.0,
        fixed_hinge: PixelPoint::new(100, 60),
        background: rgb(1.0, 1.0, 1.0),
        rod: RodStyle {
            width: 12,
            border_thickness: 1,
            pin_radius: 3,
            ..RodStyle::default()
        },
    }
}

#[test]
fn writes_png_sequence_at_output_resolution() {
    let params = PhysicalParams::new(1.0, 1.0, 1.0, 1.0);
    let initials = [
        InitialState::at_rest_degrees(90.0, 90.0),
        InitialState::at_rest_degrees(90.0, 88.0),
    ];
    let sim = SimulationConfig::new(2.0, 8);
    let trajectories = solve_ensemble(&params, &initials, &sim, &SolverOptions::default()).unwrap();

    let render = small_scene();
    let trail = TrailConfig {
        fadeout_start: 2,
        fadeout_end: 4,
        dot_radius: 2,
    };
    let styles = vec![
        trail.style(rgb(0.8, 0.8, 0.0), render.background),
        trail.style(rgb(0.8, 0.0, 0.0), render.background),
    ];

    let dir = tempfile::tempdir().unwrap();
    let frames_dir = dir.path().join("frames");
    let mut sink = PngSequenceSink::create(&frames_dir, render.output_resolution()).unwrap();
    let summary = FrameSequencer::new(&render, styles)
        .run(&params, &trajectories, &mut sink)
        .unwrap();

    assert_eq!(summary.frames_written, 8);
    assert_eq!(summary.output_resolution, (100, 80));
    assert_eq!(sink.frames_written(), 8);

    for i in 0..8 {
        let img = image::open(frames_dir.join(format!("frame_{i:06}.png")))
            .unwrap()
            .to_rgb8();
        assert_eq!(img.dimensions(), (100, 80));
    }

    // First frame: the top rods lie horizontally from the hinge (100, 60) to the elbow
    // (130, 60); output pixel (57, 30) covers the middle of that body.
    let first = image::open(frames_dir.join("frame_000000.png")).unwrap().to_rgb8();
    let fill = first.get_pixel(57, 30).0;
    assert_eq!(fill, [0, 128, 255]);
    // Far above the rods nothing is drawn.
    assert_eq!(first.get_pixel(10, 2).0, [255, 255, 255]);
}

#[test]
fn sink_rejects_frames_of_the_wrong_size() {
    let dir = tempfile::tempdir().unwrap();
    let mut sink = PngSequenceSink::create(dir.path(), (10, 10)).unwrap();
    let err = sink.write(&image::RgbImage::new(12, 10)).unwrap_err();
    assert!(matches!(err, double_pendulum::Error::SinkFailure(_)));
}
