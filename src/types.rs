//! Common numeric types and traits for 3D load geometry.
//!
//! All lengths are millimeters and all weights kilograms. Coordinates use
//! the trailer frame: `x` runs from the front wall towards the doors, `y`
//! across the trailer from the left wall and `z` up from the floor.

use std::ops::{Add, Mul};

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Represents a 3D vector or point in the trailer frame.
///
/// Used for positions, centers and dimension arithmetic.
///
/// # Examples
/// ```
/// use load_planner::types::Vec3;
///
/// let position = Vec3::new(1000.0, 0.0, 0.0);
/// let dimensions = Vec3::new(1200.0, 800.0, 1440.0);
/// let center = position + dimensions * 0.5;
/// assert_eq!(center, Vec3::new(1600.0, 400.0, 720.0));
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    /// Creates a new 3D vector.
    ///
    /// # Parameters
    /// * `x` - X component (along the trailer length)
    /// * `y` - Y component (across the trailer width)
    /// * `z` - Z component (height above the floor)
    #[inline]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Creates a zero vector (origin, front-left floor corner).
    #[inline]
    pub const fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    /// Calculates the 2D distance (XY plane only).
    #[inline]
    pub fn distance_2d(&self, other: &Self) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Checks if all components are finite and non-negative.
    #[inline]
    pub fn is_valid_position(&self) -> bool {
        self.x.is_finite()
            && self.y.is_finite()
            && self.z.is_finite()
            && self.x >= 0.0
            && self.y >= 0.0
            && self.z >= 0.0
    }
}

impl Add for Vec3 {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self::Output {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Mul<f64> for Vec3 {
    type Output = Self;

    #[inline]
    fn mul(self, scalar: f64) -> Self::Output {
        Self::new(self.x * scalar, self.y * scalar, self.z * scalar)
    }
}

impl From<(f64, f64, f64)> for Vec3 {
    #[inline]
    fn from(tuple: (f64, f64, f64)) -> Self {
        Self::new(tuple.0, tuple.1, tuple.2)
    }
}

/// Trait for objects with 3D dimensions.
///
/// Dimensions returned here are the *effective* ones, i.e. after any
/// rotation has been applied.
pub trait Dimensional {
    /// Returns the effective dimensions (length, width, height) as a vector.
    fn extent(&self) -> Vec3;
}

/// Trait for objects with a position in 3D space.
pub trait Positioned {
    /// Returns the origin corner (minimum x, y and z).
    fn origin(&self) -> Vec3;
}

/// Trait for objects with weight.
pub trait Weighted {
    /// Returns the weight in kg.
    fn weight_kg(&self) -> f64;
}

/// Represents an Axis-Aligned Bounding Box (AABB).
///
/// Used for collision detection, containment and footprint tests.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    /// Minimum corner (position)
    pub min: Vec3,
    /// Maximum corner (position + effective dimensions)
    pub max: Vec3,
}

impl BoundingBox {
    /// Creates a bounding box from position and dimensions.
    #[inline]
    pub fn from_position_and_dims(position: Vec3, dims: Vec3) -> Self {
        Self {
            min: position,
            max: position + dims,
        }
    }

    /// Bounding box of any positioned, dimensioned object.
    #[inline]
    pub fn of<T: Positioned + Dimensional + ?Sized>(item: &T) -> Self {
        Self::from_position_and_dims(item.origin(), item.extent())
    }

    /// Checks if two bounding boxes intersect.
    ///
    /// Open intervals on every axis: boxes sharing a face do not intersect.
    #[inline]
    pub fn intersects(&self, other: &Self) -> bool {
        !(self.max.x <= other.min.x
            || other.max.x <= self.min.x
            || self.max.y <= other.min.y
            || other.max.y <= self.min.y
            || self.max.z <= other.min.z
            || other.max.z <= self.min.z)
    }

    /// Checks if the floor-plane projections of two boxes overlap (open intervals).
    #[inline]
    pub fn overlaps_xy(&self, other: &Self) -> bool {
        self.min.x < other.max.x
            && self.max.x > other.min.x
            && self.min.y < other.max.y
            && self.max.y > other.min.y
    }

    /// Checks if this box lies completely inside `outer` (closed bounds).
    #[inline]
    pub fn is_inside(&self, outer: &Self) -> bool {
        self.min.x >= outer.min.x
            && self.min.y >= outer.min.y
            && self.min.z >= outer.min.z
            && self.max.x <= outer.max.x
            && self.max.y <= outer.max.y
            && self.max.z <= outer.max.z
    }

    /// Returns the top (Z maximum).
    #[inline]
    pub fn top_z(&self) -> f64 {
        self.max.z
    }

    /// Returns the center point.
    #[inline]
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }
}

/// Center of mass calculation helper.
///
/// Accumulates weighted positions. Summation makes the result independent
/// of the order in which points are added.
#[derive(Clone, Debug, Default)]
pub struct CenterOfMassCalculator {
    weighted_x: f64,
    weighted_y: f64,
    weighted_z: f64,
    total_weight: f64,
}

impl CenterOfMassCalculator {
    /// Creates a new calculator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a weighted point.
    pub fn add_point(&mut self, point: Vec3, weight: f64) {
        self.weighted_x += point.x * weight;
        self.weighted_y += point.y * weight;
        self.weighted_z += point.z * weight;
        self.total_weight += weight;
    }

    /// Sum of all weights added so far.
    pub fn total_weight(&self) -> f64 {
        self.total_weight
    }

    /// Calculates the center of mass.
    ///
    /// # Returns
    /// `Some(point)` for a valid center of mass, `None` if no weight is present
    pub fn compute(&self) -> Option<Vec3> {
        if self.total_weight <= 0.0 {
            None
        } else {
            Some(Vec3::new(
                self.weighted_x / self.total_weight,
                self.weighted_y / self.total_weight,
                self.weighted_z / self.total_weight,
            ))
        }
    }
}
