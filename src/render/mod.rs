// ------------------------------------------------------------
// CPU rasterization of pendulum frames.
//
// Frames are drawn in normalized `f32` RGB at a supersampled resolution, reduced by
// area averaging, and converted to 8-bit exactly once by to_rgb8 right before
// they are handed to a sink.
// ------------------------------------------------------------

mod rod;

pub use rod::RodStyle;

use image::{ImageBuffer, Rgb, Rgb32FImage, RgbImage};

use crate::config::RenderConfig;
use crate::mapper::{PixelPoint, PosePixels};

/// Normalized RGB, each channel in `[0, 1]`.
pub type Color = Rgb<f32>;

/// Supersampled working frame.
pub type Frame = Rgb32FImage;

pub const fn rgb(r: f32, g: f32, b: f32) -> Color {
    Rgb([r, g, b])
}

/// `alpha * a + (1 - alpha) * b`, clamped to the valid channel range.
pub fn blend(a: Color, b: Color, alpha: f32) -> Color {
    let mix = |i: usize| (alpha * a[i] + (1.0 - alpha) * b[i]).clamp(0.0, 1.0);
    rgb(mix(0), mix(1), mix(2))
}

// Area-averaging reduction by an integer factor. Each output pixel is the mean of the
// factor x factor block it covers.
pub fn downsample(frame: &Frame, factor: u32) -> Frame {
    if factor <= 1 {
        return frame.clone();
    }

    let (w, h) = frame.dimensions();
    let (ow, oh) = (w / factor, h / factor);
    let f = factor as usize;
    let in_stride = w as usize * 3;
    let src = frame.as_raw();
    let norm = 1.0 / (f * f) as f32;

    // Accumulate straight into the zeroed output; its size is fixed by construction.
    let mut out: Frame = ImageBuffer::new(ow, oh);
    if ow == 0 || oh == 0 {
        return out;
    }
    let out_stride = ow as usize * 3;

    for (oy, out_row) in out.chunks_exact_mut(out_stride).enumerate() {
        for dy in 0..f {
            let row = &src[(oy * f + dy) * in_stride..][..in_stride];
            for (ox, px) in out_row.chunks_exact_mut(3).enumerate() {
                let block = &row[ox * f * 3..][..f * 3];
                for (c, acc) in px.iter_mut().enumerate() {
                    *acc += block.iter().skip(c).step_by(3).sum::<f32>();
                }
            }
        }
        out_row.iter_mut().for_each(|v| *v *= norm);
    }

    out
}

/// The single normalized -> 8-bit conversion applied at frame emission.
pub fn to_rgb8(frame: &Frame) -> RgbImage {
    let quantize = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
    ImageBuffer::from_fn(frame.width(), frame.height(), |x, y| {
        let p = frame.get_pixel(x, y);
        Rgb([quantize(p[0]), quantize(p[1]), quantize(p[2])])
    })
}

/// Draws rods and hinges onto supersampled frames.
#[derive(Debug, Clone)]
pub struct FrameRenderer {
    resolution: (u32, u32),
    background: Color,
    rod: RodStyle,
}

impl FrameRenderer {
    pub fn new(config: &RenderConfig) -> Self {
        Self {
            resolution: config.image_resolution,
            background: config.background,
            rod: config.rod,
        }
    }

    pub fn background(&self) -> Color {
        self.background
    }

    pub fn blank_frame(&self) -> Frame {
        ImageBuffer::from_pixel(self.resolution.0, self.resolution.1, self.background)
    }

    /// One rigid rod between two hinges: filled body, stroked long edges, rounded caps
    /// and a pin at each end.
    pub fn draw_rod(&self, frame: &mut Frame, a: PixelPoint, b: PixelPoint) {
        rod::draw_rod(frame, &self.rod, self.background, a, b);
    }

    pub fn draw_pendulum(&self, frame: &mut Frame, pose: &PosePixels) {
        self.draw_rod(frame, pose.hinge, pose.elbow);
        self.draw_rod(frame, pose.elbow, pose.tip);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn renderer() -> FrameRenderer {
        let mut cfg = RenderConfig::default();
        cfg.image_resolution = (100, 100);
        cfg.rod = RodStyle {
            width: 20,
            fill: rgb(0.0, 0.5, 1.0),
            border: rgb(0.0, 0.2, 0.8),
            border_thickness: 1,
            pin_radius: 4,
        };
        FrameRenderer::new(&cfg)
    }

    #[test]
    fn blend_endpoints_and_clamp() {
        let a = rgb(1.0, 0.0, 0.5);
        let b = rgb(0.0, 1.0, 0.5);
        assert_eq!(blend(a, b, 1.0), a);
        assert_eq!(blend(a, b, 0.0), b);
        assert_eq!(blend(rgb(2.0, -1.0, 0.0), b, 1.0), rgb(1.0, 0.0, 0.0));
    }

    #[test]
    fn downsample_averages_blocks() {
        let frame: Frame = ImageBuffer::from_fn(4, 2, |x, _| {
            if x < 2 {
                rgb(1.0, 0.0, 0.0)
            } else if x == 2 {
                rgb(0.0, 1.0, 0.0)
            } else {
                rgb(0.0, 0.0, 1.0)
            }
        });
        let small = downsample(&frame, 2);
        assert_eq!(small.dimensions(), (2, 1));
        assert_eq!(*small.get_pixel(0, 0), rgb(1.0, 0.0, 0.0));
        let p = small.get_pixel(1, 0);
        assert_relative_eq!(p[0], 0.0);
        assert_relative_eq!(p[1], 0.5);
        assert_relative_eq!(p[2], 0.5);
    }

    #[test]
    fn downsample_keeps_every_block_of_a_gradient() {
        let frame: Frame = ImageBuffer::from_fn(6, 4, |x, y| rgb(x as f32 / 8.0, y as f32 / 8.0, 0.25));
        let small = downsample(&frame, 2);
        assert_eq!(small.dimensions(), (3, 2));
        for (ox, oy, p) in small.enumerate_pixels() {
            assert_relative_eq!(p[0], (4.0 * ox as f32 + 1.0) / 16.0);
            assert_relative_eq!(p[1], (4.0 * oy as f32 + 1.0) / 16.0);
            assert_relative_eq!(p[2], 0.25);
        }
    }

    #[test]
    fn downsample_by_one_is_identity() {
        let frame: Frame = ImageBuffer::from_pixel(3, 3, rgb(0.25, 0.5, 0.75));
        assert_eq!(downsample(&frame, 1), frame);
    }

    #[test]
    fn rgb8_conversion_clamps_and_rounds() {
        let frame: Frame = ImageBuffer::from_fn(3, 1, |x, _| match x {
            0 => rgb(1.5, -0.2, 0.5),
            1 => rgb(0.0, 1.0, 0.2),
            _ => rgb(f32::NAN, 0.999, 0.001),
        });
        let out = to_rgb8(&frame);
        assert_eq!(out.get_pixel(0, 0).0, [255, 0, 128]);
        assert_eq!(out.get_pixel(1, 0).0, [0, 255, 51]);
        assert_eq!(out.get_pixel(2, 0).0, [0, 255, 0]);
    }

    #[test]
    fn horizontal_rod_geometry() {
        let r = renderer();
        let mut frame = r.blank_frame();
        let (a, b) = (PixelPoint::new(20, 50), PixelPoint::new(80, 50));
        r.draw_rod(&mut frame, a, b);

        let fill = rgb(0.0, 0.5, 1.0);
        let bg = r.background();
        // body
        assert_eq!(*frame.get_pixel(50, 50), fill);
        assert_eq!(*frame.get_pixel(50, 45), fill);
        // outside the rod width
        assert_eq!(*frame.get_pixel(50, 30), bg);
        assert_eq!(*frame.get_pixel(50, 70), bg);
        // rounded caps extend past both hinges
        assert_eq!(*frame.get_pixel(12, 50), fill);
        assert_eq!(*frame.get_pixel(88, 50), fill);
        assert_eq!(*frame.get_pixel(2, 50), bg);
        // pins are drawn over the fill
        assert_eq!(*frame.get_pixel(20, 50), bg);
        assert_eq!(*frame.get_pixel(80, 50), bg);
    }

    #[test]
    fn degenerate_rod_draws_caps_only() {
        let r = renderer();
        let mut frame = r.blank_frame();
        let p = PixelPoint::new(50, 50);
        r.draw_rod(&mut frame, p, p);
        assert_eq!(*frame.get_pixel(50, 50), r.background());
        // Well inside both half discs, clear of the pin ring and the rim stroke.
        assert_eq!(*frame.get_pixel(44, 46), rgb(0.0, 0.5, 1.0));
        assert_eq!(*frame.get_pixel(56, 54), rgb(0.0, 0.5, 1.0));
    }
}
