// ------------------------------------------------------------
// Physical (meters) -> pixel mapping
// ------------------------------------------------------------

use nalgebra::Vector2;

use crate::config::PhysicalParams;
use crate::dynamics;
use crate::trajectory::TrajectorySample;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PixelPoint {
    pub x: i32,
    pub y: i32,
}

impl PixelPoint {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn as_tuple(self) -> (i32, i32) {
        (self.x, self.y)
    }
}

/// The three hinge positions of one pendulum in pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PosePixels {
    pub hinge: PixelPoint,
    pub elbow: PixelPoint,
    pub tip: PixelPoint,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateMapper {
    pub fixed_hinge: PixelPoint,
    pub pixels_per_meter: f64,
}

impl CoordinateMapper {
    pub fn new(fixed_hinge: PixelPoint, pixels_per_meter: f64) -> Self {
        Self {
            fixed_hinge,
            pixels_per_meter,
        }
    }

    // Floor toward zero: the `as` cast truncates, so -3.7 maps to -3.
    pub fn to_pixel(&self, offset_m: Vector2<f64>) -> PixelPoint {
        let x = self.fixed_hinge.x as f64 + offset_m.x * self.pixels_per_meter;
        let y = self.fixed_hinge.y as f64 + offset_m.y * self.pixels_per_meter;
        PixelPoint::new(x as i32, y as i32)
    }

    pub fn pose_pixels(&self, params: &PhysicalParams, sample: &TrajectorySample) -> PosePixels {
        let (elbow, tip) = dynamics::positions(params, sample.theta1, sample.theta2);
        PosePixels {
            hinge: self.fixed_hinge,
            elbow: self.to_pixel(elbow),
            tip: self.to_pixel(tip),
        }
    }
}
