// ------------------------------------------------------------
// Fading history of a tracked point.
// ------------------------------------------------------------

use std::collections::VecDeque;

use imageproc::drawing::draw_filled_circle_mut;

use crate::mapper::PixelPoint;
use crate::render::{blend, Color, Frame};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrailStyle {
    pub color: Color,
    pub background: Color,
    /// Points up to this age keep the full trail color.
    pub fadeout_start: usize,
    /// Capacity of the trail; a point this old has fully faded into the background.
    pub fadeout_end: usize,
    pub dot_radius: i32,
}

impl TrailStyle {
    /// Color of a point that has `age` newer points after it.
    pub fn color_for_age(&self, age: usize) -> Color {
        if age <= self.fadeout_start {
            self.color
        } else if age >= self.fadeout_end {
            self.background
        } else {
            let span = (self.fadeout_end - self.fadeout_start) as f32;
            let alpha = 1.0 - (age - self.fadeout_start) as f32 / span;
            blend(self.color, self.background, alpha)
        }
    }
}

/// Bounded trail stored oldest-first. Holds at most `fadeout_end` points.
#[derive(Debug, Clone)]
pub struct TrailBuffer {
    style: TrailStyle,
    points: VecDeque<PixelPoint>,
}

impl TrailBuffer {
    pub fn new(style: TrailStyle) -> Self {
        Self {
            style,
            points: VecDeque::with_capacity(style.fadeout_end),
        }
    }

    pub fn style(&self) -> &TrailStyle {
        &self.style
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn add_point(&mut self, p: PixelPoint) {
        self.points.push_back(p);
        while self.points.len() > self.style.fadeout_end {
            self.points.pop_front();
        }
    }

    /// Retained points paired with their age, oldest first.
    pub fn aged_points(&self) -> impl Iterator<Item = (PixelPoint, usize)> + '_ {
        let newest = self.points.len().saturating_sub(1);
        self.points
            .iter()
            .enumerate()
            .map(move |(i, &p)| (p, newest - i))
    }

    // Oldest first, so the most recent dots end up on top.
    pub fn render(&self, frame: &mut Frame) {
        for (p, age) in self.aged_points() {
            let color = self.style.color_for_age(age);
            draw_filled_circle_mut(frame, p.as_tuple(), self.style.dot_radius, color);
        }
    }
}
