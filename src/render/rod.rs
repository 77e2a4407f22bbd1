// ------------------------------------------------------------
// Rod and hinge primitives
//
// Angles follow image space: y grows downward, so a positive angle turns
// clockwise on screen.
// ------------------------------------------------------------

use std::f64::consts::{FRAC_PI_2, PI};
use std::ops::RangeInclusive;

use imageproc::drawing::{draw_filled_circle_mut, draw_line_segment_mut, draw_polygon_mut};
use imageproc::point::Point;

use super::{rgb, Color, Frame};
use crate::error::{Error, Result};
use crate::mapper::PixelPoint;

// Segments used to approximate a half circle.
const ARC_SEGMENTS: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RodStyle {
    /// Full rod width in pixels; also the diameter of the end caps.
    pub width: u32,
    pub fill: Color,
    pub border: Color,
    /// Stroke width in pixels; odd values are centred on the outline.
    pub border_thickness: u32,
    pub pin_radius: i32,
}

impl RodStyle {
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.width % 2 != 0 {
            return Err(Error::config(format!(
                "rod width must be a positive even number, got {}",
                self.width
            )));
        }
        if self.pin_radius < 0 {
            return Err(Error::config("hinge pin radius must not be negative"));
        }
        Ok(())
    }
}

impl Default for RodStyle {
    fn default() -> Self {
        Self {
            width: 100,
            fill: rgb(0.0, 0.5, 1.0),
            border: rgb(0.0, 0.2, 0.8),
            border_thickness: 3,
            pin_radius: 20,
        }
    }
}

// imageproc closes polygons itself and refuses an explicitly closed outline.
fn fill_polygon(frame: &mut Frame, pts: &[Point<i32>], color: Color) {
    if pts.len() < 3 || pts.first() == pts.last() {
        return;
    }
    draw_polygon_mut(frame, pts, color);
}

// Offsets of the one-pixel strokes that make up a line `thickness` pixels wide.
// Odd thickness is centred on the path; even thickness puts its extra pixel on the
// positive normal side.
fn stroke_offsets(thickness: u32) -> RangeInclusive<i32> {
    let t = thickness.max(1) as i32;
    -((t - 1) / 2)..=t / 2
}

// Thick segment drawn as parallel one-pixel lines offset along the normal.
fn draw_thick_line_segment(
    frame: &mut Frame,
    start: (f32, f32),
    end: (f32, f32),
    thickness: u32,
    color: Color,
) {
    let dx = end.0 - start.0;
    let dy = end.1 - start.1;

    let len = (dx * dx + dy * dy).sqrt();
    if len < 1e-3 {
        return;
    }

    let nx = -dy / len;
    let ny = dx / len;

    for k in stroke_offsets(thickness) {
        let off = k as f32;
        let s = ((start.0 + nx * off).round(), (start.1 + ny * off).round());
        let e = ((end.0 + nx * off).round(), (end.1 + ny * off).round());
        draw_line_segment_mut(frame, s, e, color);
    }
}

fn arc_points(center: PixelPoint, radius: f64, start: f64) -> Vec<(f64, f64)> {
    (0..=ARC_SEGMENTS)
        .map(|i| {
            let phi = start + PI * i as f64 / ARC_SEGMENTS as f64;
            (
                center.x as f64 + radius * phi.cos(),
                center.y as f64 + radius * phi.sin(),
            )
        })
        .collect()
}

// Half disc spanning [start, start + pi], filled, with its arc stroked.
fn draw_cap(frame: &mut Frame, style: &RodStyle, center: PixelPoint, start: f64) {
    let radius = style.width as f64 / 2.0;

    let outline: Vec<Point<i32>> = arc_points(center, radius, start)
        .into_iter()
        .map(|(x, y)| Point::new(x.round() as i32, y.round() as i32))
        .collect();
    fill_polygon(frame, &outline, style.fill);

    // Concentric arcs keep the stroke width uniform around the curve.
    let snap = |p: (f64, f64)| (p.0.round() as f32, p.1.round() as f32);
    for k in stroke_offsets(style.border_thickness) {
        let pts = arc_points(center, radius + k as f64, start);
        for pair in pts.windows(2) {
            draw_line_segment_mut(frame, snap(pair[0]), snap(pair[1]), style.border);
        }
    }
}

// Hinge pin: background-colored disc inside a border ring.
fn draw_pin(frame: &mut Frame, style: &RodStyle, pin_fill: Color, center: PixelPoint) {
    let t = style.border_thickness as i32;
    let outer = style.pin_radius + t / 2;
    let inner = style.pin_radius - (t - t / 2);
    draw_filled_circle_mut(frame, center.as_tuple(), outer, style.border);
    if inner >= 0 {
        draw_filled_circle_mut(frame, center.as_tuple(), inner, pin_fill);
    }
}

pub(super) fn draw_rod(
    frame: &mut Frame,
    style: &RodStyle,
    pin_fill: Color,
    a: PixelPoint,
    b: PixelPoint,
) {
    let dx = (b.x - a.x) as f64;
    let dy = (b.y - a.y) as f64;
    let angle = dy.atan2(dx);
    let (px, py) = (angle.sin(), -angle.cos());
    let hw = style.width as f64 / 2.0;

    let corner = |p: PixelPoint, side: f64| {
        Point::new(
            (p.x as f64 + side * hw * px).round() as i32,
            (p.y as f64 + side * hw * py).round() as i32,
        )
    };
    let body = [corner(a, 1.0), corner(a, -1.0), corner(b, -1.0), corner(b, 1.0)];

    if a != b {
        fill_polygon(frame, &body, style.fill);
        let as_f32 = |p: Point<i32>| (p.x as f32, p.y as f32);
        for (s, e) in [(body[1], body[2]), (body[0], body[3])] {
            draw_thick_line_segment(frame, as_f32(s), as_f32(e), style.border_thickness, style.border);
        }
    }

    // Caps face away from the rod at each end; pins go on top.
    draw_cap(frame, style, a, angle + FRAC_PI_2);
    draw_pin(frame, style, pin_fill, a);
    draw_cap(frame, style, b, angle + 3.0 * FRAC_PI_2);
    draw_pin(frame, style, pin_fill, b);
}
