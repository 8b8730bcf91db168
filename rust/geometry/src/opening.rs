// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Window and door rectangles cut into a wall
//!
//! Openings are expressed in wall-local coordinates: `x` along the wall from
//! its start vertex, `y` up from the wall base.

use nalgebra::{Point2, Vector2};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum OpeningKind {
    /// Interior hole in the wall face
    Window,
    /// Notch cut from the bottom edge of the wall outline
    Door,
}

/// Vertical anchoring of an opening's center point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Alignment {
    /// `center.y` is the bottom edge
    Bottom,
    /// `center.y` is the vertical middle
    #[default]
    Center,
}

impl Alignment {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "bottom" => Some(Self::Bottom),
            "center" | "middle" => Some(Self::Center),
            _ => None,
        }
    }
}

/// Rectangular opening: center, half extents and alignment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Opening {
    pub kind: OpeningKind,
    pub center: Point2<f64>,
    pub half_width: f64,
    pub half_height: f64,
    pub alignment: Alignment,
}

impl Opening {
    /// A window, vertically centered on `center`
    pub fn window(center: Point2<f64>, half_width: f64, half_height: f64) -> Self {
        Self {
            kind: OpeningKind::Window,
            center,
            half_width,
            half_height,
            alignment: Alignment::Center,
        }
    }

    /// A door standing on `center`
    pub fn door(center: Point2<f64>, half_width: f64, half_height: f64) -> Self {
        Self {
            kind: OpeningKind::Door,
            center,
            half_width,
            half_height,
            alignment: Alignment::Bottom,
        }
    }

    pub fn with_alignment(mut self, alignment: Alignment) -> Self {
        self.alignment = alignment;
        self
    }

    #[inline]
    pub fn is_door(&self) -> bool {
        self.kind == OpeningKind::Door
    }

    /// Lower-left and upper-right corners in wall-local coordinates.
    pub fn rect(&self) -> (Point2<f64>, Point2<f64>) {
        let half = Vector2::new(self.half_width, self.half_height);
        let center = match self.alignment {
            Alignment::Center => self.center,
            Alignment::Bottom => Point2::new(self.center.x, self.center.y + self.half_height),
        };
        (center - half, center + half)
    }

    /// Hole contour, wound clockwise so it can sit inside a
    /// counter-clockwise exterior.
    pub fn hole_contour(&self) -> [Point2<f64>; 4] {
        let (min, max) = self.rect();
        [
            Point2::new(min.x, min.y),
            Point2::new(min.x, max.y),
            Point2::new(max.x, max.y),
            Point2::new(max.x, min.y),
        ]
    }

    /// Notch cut up from the base line, listed left to right as it appears
    /// along the bottom of a counter-clockwise outline.
    pub fn notch_contour(&self) -> [Point2<f64>; 4] {
        let (min, max) = self.rect();
        [
            Point2::new(min.x, 0.0),
            Point2::new(min.x, max.y),
            Point2::new(max.x, max.y),
            Point2::new(max.x, 0.0),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn door_rect_stands_on_base() {
        let door = Opening::door(Point2::new(2.0, 0.0), 0.45, 1.05);
        let (min, max) = door.rect();
        assert_relative_eq!(min.x, 1.55);
        assert_relative_eq!(max.x, 2.45);
        assert_relative_eq!(min.y, 0.0);
        assert_relative_eq!(max.y, 2.1);
    }

    #[test]
    fn window_rect_is_centered() {
        let window = Opening::window(Point2::new(1.0, 1.2), 0.5, 0.4);
        let (min, max) = window.rect();
        assert_relative_eq!(min.y, 0.8);
        assert_relative_eq!(max.y, 1.6);
    }

    #[test]
    fn hole_contour_is_clockwise() {
        let window = Opening::window(Point2::new(1.0, 1.2), 0.5, 0.4);
        let c = window.hole_contour();
        let area2: f64 = (0..4)
            .map(|i| {
                let (a, b) = (c[i], c[(i + 1) % 4]);
                a.x * b.y - b.x * a.y
            })
            .sum();
        assert!(area2 < 0.0);
    }

    #[test]
    fn alignment_override() {
        let window = Opening::window(Point2::new(1.0, 1.0), 0.5, 0.5).with_alignment(Alignment::Bottom);
        let (min, _) = window.rect();
        assert_relative_eq!(min.y, 1.0);
        assert_eq!(Alignment::parse("Bottom"), Some(Alignment::Bottom));
    }
}
