//! # Math Helpers
//!
//! Geometry value types shared by the model: an axis-aligned rectangle and
//! an RGBA color alias.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// RGBA color, components in `0.0..=1.0`.
pub type Color = glam::Vec4;

/// Padding applied around contained nodes when a container auto-fits.
pub const CONTAINER_PADDING: f32 = 30.0;
/// Vertical space reserved for a container's title bar.
pub const TITLE_BAR_HEIGHT: f32 = 24.0;

/// An axis-aligned rectangle in world space.
///
/// `(x, y)` is the top-left corner; `w`/`h` extend right and down.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub const ZERO: Self = Self {
        x: 0.0,
        y: 0.0,
        w: 0.0,
        h: 0.0,
    };

    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    pub fn from_pos_size(pos: Vec2, size: Vec2) -> Self {
        Self {
            x: pos.x,
            y: pos.y,
            w: size.x,
            h: size.y,
        }
    }

    pub fn from_min_max(min: Vec2, max: Vec2) -> Self {
        Self {
            x: min.x,
            y: min.y,
            w: max.x - min.x,
            h: max.y - min.y,
        }
    }

    pub fn min(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    pub fn max(&self) -> Vec2 {
        Vec2::new(self.x + self.w, self.y + self.h)
    }

    pub fn size(&self) -> Vec2 {
        Vec2::new(self.w, self.h)
    }

    pub fn center(&self) -> Vec2 {
        self.min() + self.size() * 0.5
    }

    pub fn contains(&self, point: Vec2) -> bool {
        point.x >= self.x
            && point.y >= self.y
            && point.x <= self.x + self.w
            && point.y <= self.y + self.h
    }

    /// The smallest rectangle covering both `self` and `other`.
    pub fn union(&self, other: &Rect) -> Rect {
        Rect::from_min_max(self.min().min(other.min()), self.max().max(other.max()))
    }

    /// Grows the rectangle outward by `amount` on every side.
    pub fn expanded(&self, amount: f32) -> Rect {
        Rect {
            x: self.x - amount,
            y: self.y - amount,
            w: self.w + amount * 2.0,
            h: self.h + amount * 2.0,
        }
    }

    /// Reserves `height` extra space above the rectangle (title bars grow up).
    pub fn with_title_bar(&self, height: f32) -> Rect {
        Rect {
            x: self.x,
            y: self.y - height,
            w: self.w,
            h: self.h + height,
        }
    }
}
