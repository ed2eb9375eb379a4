//! Geometric primitives for force layout.
//!
//! This module provides the planar types the simulation and its render sinks
//! exchange.
//!
//! # Overview
//!
//! - [`Point`] - A 2D coordinate or displacement in layout space
//! - [`Bounds`] - An axis-aligned rectangle defined by minimum and maximum coordinates
//!
//! # Coordinate System
//!
//! Drift uses the SVG convention:
//!
//! ```text
//!   (0,0) ────────► +X
//!     │
//!     │
//!     ▼
//!    +Y
//! ```
//!
//! The layout itself has no preferred origin; nodes settle around the
//! configured layout center.

use serde::{Deserialize, Serialize};

/// A 2D point in layout coordinate space.
///
/// Points use `f64` coordinates and double as displacement vectors
/// (velocities, accelerations) in the simulation.
///
/// # Examples
///
/// ```
/// # use drift_core::geometry::Point;
/// let p1 = Point::new(10.0, 20.0);
/// let p2 = Point::new(5.0, 5.0);
///
/// let sum = p1.add_point(p2);
/// assert_eq!(sum.x(), 15.0);
/// assert_eq!(sum.y(), 25.0);
///
/// let mid = p1.midpoint(p2);
/// assert_eq!(mid.x(), 7.5);
/// assert_eq!(mid.y(), 12.5);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    x: f64,
    y: f64,
}

impl Point {
    /// The origin `(0, 0)`.
    pub const ORIGIN: Point = Point { x: 0.0, y: 0.0 };

    /// Creates a new point with the specified coordinates
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Returns the x-coordinate of the point
    pub fn x(self) -> f64 {
        self.x
    }

    /// Returns the y-coordinate of the point
    pub fn y(self) -> f64 {
        self.y
    }

    /// Checks if both x and y coordinates are zero
    pub fn is_zero(self) -> bool {
        self.x == 0.0 && self.y == 0.0
    }

    /// Checks that both coordinates are finite numbers
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Adds another point to this point, returning a new point.
    pub fn add_point(self, other: Point) -> Self {
        Self {
            x: self.x + other.x,
            y: self.y + other.y,
        }
    }

    /// Subtracts another point from this point, returning a new point
    pub fn sub_point(self, other: Point) -> Self {
        Self {
            x: self.x - other.x,
            y: self.y - other.y,
        }
    }

    /// Calculates the midpoint between this point and another point
    pub fn midpoint(self, other: Point) -> Self {
        Self {
            x: (self.x + other.x) / 2.0,
            y: (self.y + other.y) / 2.0,
        }
    }

    /// Calculates the hypotenuse (Euclidean length from origin)
    pub fn hypot(self) -> f64 {
        self.x.hypot(self.y)
    }

    /// Squared Euclidean length, avoiding the square root.
    pub fn length_squared(self) -> f64 {
        self.x * self.x + self.y * self.y
    }

    /// Euclidean distance to another point.
    ///
    /// # Examples
    ///
    /// ```
    /// # use drift_core::geometry::Point;
    /// let a = Point::new(0.0, 0.0);
    /// let b = Point::new(3.0, 4.0);
    /// assert_eq!(a.distance(b), 5.0);
    /// ```
    pub fn distance(self, other: Point) -> f64 {
        other.sub_point(self).hypot()
    }

    /// Multiplies both coordinates by the given factor.
    pub fn scale(self, factor: f64) -> Self {
        Self {
            x: self.x * factor,
            y: self.y * factor,
        }
    }

    /// Returns the arithmetic mean of the given points, or `None` if there are none.
    ///
    /// # Examples
    ///
    /// ```
    /// # use drift_core::geometry::Point;
    /// let points = [Point::new(0.0, 0.0), Point::new(4.0, 2.0)];
    /// assert_eq!(Point::centroid(points), Some(Point::new(2.0, 1.0)));
    /// assert_eq!(Point::centroid(std::iter::empty()), None);
    /// ```
    pub fn centroid(points: impl IntoIterator<Item = Point>) -> Option<Self> {
        let (sum, count) = points
            .into_iter()
            .fold((Point::ORIGIN, 0usize), |(sum, count), p| {
                (sum.add_point(p), count + 1)
            });
        (count > 0).then(|| sum.scale(1.0 / count as f64))
    }
}

/// An axis-aligned rectangle given by its minimum and maximum corners.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Bounds {
    min: Point,
    max: Point,
}

impl Bounds {
    /// Creates bounds from two corners, normalising their order.
    pub fn new(a: Point, b: Point) -> Self {
        Self {
            min: Point::new(a.x.min(b.x), a.y.min(b.y)),
            max: Point::new(a.x.max(b.x), a.y.max(b.y)),
        }
    }

    /// Smallest bounds enclosing every point, or `None` for an empty iterator.
    pub fn from_points(points: impl IntoIterator<Item = Point>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        Some(iter.fold(Self::new(first, first), |acc, p| acc.include(p)))
    }

    /// Returns the minimum corner
    pub fn min(self) -> Point {
        self.min
    }

    /// Returns the maximum corner
    pub fn max(self) -> Point {
        self.max
    }

    pub fn width(self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn height(self) -> f64 {
        self.max.y - self.min.y
    }

    /// Grows the bounds so that it contains `point`.
    pub fn include(self, point: Point) -> Self {
        Self {
            min: Point::new(self.min.x.min(point.x), self.min.y.min(point.y)),
            max: Point::new(self.max.x.max(point.x), self.max.y.max(point.y)),
        }
    }

    /// Expands every side outward by `amount`.
    pub fn inflate(self, amount: f64) -> Self {
        let delta = Point::new(amount, amount);
        Self {
            min: self.min.sub_point(delta),
            max: self.max.add_point(delta),
        }
    }

    /// Checks whether the point lies within the bounds (inclusive)
    pub fn contains(self, point: Point) -> bool {
        point.x >= self.min.x && point.x <= self.max.x && point.y >= self.min.y && point.y <= self.max.y
    }
}


#[cfg(test)]
mod proptest_tests {
    use float_cmp::approx_eq;
    use proptest::prelude::*;

    use super::*;

    // ===================
    // Strategies
    // ===================

    fn point_strategy() -> impl Strategy<Value = Point> {
        (-1000.0f64..1000.0, -1000.0f64..1000.0).prop_map(|(x, y)| Point::new(x, y))
    }

    // ===================
    // Property Test Functions
    // ===================

    /// Distance is symmetric.
    fn check_distance_is_symmetric(p1: Point, p2: Point) -> Result<(), TestCaseError> {
        prop_assert!(approx_eq!(f64, p1.distance(p2), p2.distance(p1), ulps = 4));
        Ok(())
    }

    /// The centroid always lies inside the bounds of its inputs.
    fn check_centroid_within_bounds(points: Vec<Point>) -> Result<(), TestCaseError> {
        let centroid = Point::centroid(points.iter().copied()).unwrap();
        let bounds = Bounds::from_points(points).unwrap().inflate(1e-9);
        prop_assert!(bounds.contains(centroid));
        Ok(())
    }

    /// Growing bounds keeps every earlier corner and the new point inside.
    fn check_include_contains_all(a: Point, b: Point, c: Point) -> Result<(), TestCaseError> {
        let grown = Bounds::new(a, b).include(c);
        for p in [a, b, c] {
            prop_assert!(grown.contains(p));
        }
        Ok(())
    }

    // ===================
    // Proptest Wrappers
    // ===================

    proptest! {
        #[test]
        fn distance_is_symmetric(p1 in point_strategy(), p2 in point_strategy()) {
            check_distance_is_symmetric(p1, p2)?;
        }

        #[test]
        fn centroid_within_bounds(points in prop::collection::vec(point_strategy(), 1..32)) {
            check_centroid_within_bounds(points)?;
        }

        #[test]
        fn include_contains_all(
            a in point_strategy(),
            b in point_strategy(),
            c in point_strategy(),
        ) {
            check_include_contains_all(a, b, c)?;
        }
    }
}
