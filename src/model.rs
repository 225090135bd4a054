//! Data models for trailer load planning.
//!
//! This module defines the spatial entity model shared by the packer and
//! the validator:
//! - `CargoDefinition`: a catalog entry with dimensions, weight and handling limits
//! - `Placement`: one positioned unit of a cargo definition inside the trailer
//! - `TrailerBounds`: the usable loading volume with payload and zoning data
//! - `LoadedPlacement` / `PlacedBox`: placements that geometry can reason about
//!
//! Everything arriving from outside is checked here, so the packing and
//! validation core can assume well-formed numbers.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
#[allow(unused_imports)]
use serde_json::json;
use thiserror::Error;
use utoipa::ToSchema;

use crate::types::{BoundingBox, Dimensional, Positioned, Vec3, Weighted};

/// Boundary error for malformed model data.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    #[error("Invalid dimension: {0}")]
    InvalidDimension(String),
    #[error("Invalid weight: {0}")]
    InvalidWeight(String),
    #[error("Invalid position: {0}")]
    InvalidPosition(String),
    #[error("Invalid rotation: {0}° (allowed are 0, 90, 180 and 270)")]
    InvalidRotation(u16),
    #[error("Invalid temperature range: {0}")]
    InvalidTemperatureRange(String),
    #[error("Invalid temperature zone: {0}")]
    InvalidZone(String),
    #[error("Placement '{placement_id}' references unknown cargo '{cargo_id}'")]
    UnknownCargo {
        placement_id: String,
        cargo_id: String,
    },
    #[error("Cargo id '{0}' is defined more than once")]
    DuplicateCargo(String),
}

fn validate_weight_value(value: f64, name: &str) -> Result<(), ModelError> {
    if value <= 0.0 || value.is_nan() || value.is_infinite() {
        return Err(ModelError::InvalidWeight(format!(
            "{} must be positive, got: {}",
            name, value
        )));
    }
    Ok(())
}

fn validate_optional_limit(value: Option<f64>, name: &str) -> Result<(), ModelError> {
    match value {
        Some(limit) if limit < 0.0 || !limit.is_finite() => Err(ModelError::InvalidWeight(
            format!("{} must not be negative, got: {}", name, limit),
        )),
        _ => Ok(()),
    }
}

/// Physical size of a cargo unit in whole millimeters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub struct Dimensions {
    /// Extent along the trailer length when unrotated
    pub length: u32,
    /// Extent across the trailer when unrotated
    pub width: u32,
    /// Vertical extent, never affected by rotation
    pub height: u32,
}

impl Dimensions {
    /// Creates validated dimensions.
    ///
    /// # Examples
    /// ```
    /// use load_planner::model::Dimensions;
    ///
    /// assert!(Dimensions::new(1200, 800, 1440).is_ok());
    /// assert!(Dimensions::new(0, 800, 1440).is_err());
    /// ```
    pub fn new(length: u32, width: u32, height: u32) -> Result<Self, ModelError> {
        let dims = Self {
            length,
            width,
            height,
        };
        dims.validate()?;
        Ok(dims)
    }

    /// Checks that every side is strictly positive.
    pub fn validate(&self) -> Result<(), ModelError> {
        for (value, name) in [
            (self.length, "Length"),
            (self.width, "Width"),
            (self.height, "Height"),
        ] {
            if value == 0 {
                return Err(ModelError::InvalidDimension(format!(
                    "{} must be positive, got: 0",
                    name
                )));
            }
        }
        Ok(())
    }

    /// Dimensions after turning the unit about the vertical axis.
    ///
    /// Quarter turns swap length and width; height is never touched.
    #[inline]
    pub fn rotated(&self, rotation: Rotation) -> Self {
        if rotation.swaps_footprint() {
            Self {
                length: self.width,
                width: self.length,
                height: self.height,
            }
        } else {
            *self
        }
    }

    /// Volume in cubic millimeters.
    #[inline]
    pub fn volume_mm3(&self) -> u64 {
        u64::from(self.length) * u64::from(self.width) * u64::from(self.height)
    }

    /// Converts the dimensions to a Vec3 (length, width, height).
    #[inline]
    pub fn as_vec3(&self) -> Vec3 {
        Vec3::new(
            f64::from(self.length),
            f64::from(self.width),
            f64::from(self.height),
        )
    }
}

/// Rotation about the vertical axis, restricted to quarter turns.
///
/// Serialized as plain degrees (`0`, `90`, `180`, `270`).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    /// Every allowed rotation in enumeration order.
    pub const ALL: [Rotation; 4] = [
        Rotation::Deg0,
        Rotation::Deg90,
        Rotation::Deg180,
        Rotation::Deg270,
    ];

    /// Rotations that keep the marked side facing up and the front facing forward or back.
    pub const UPRIGHT: [Rotation; 2] = [Rotation::Deg0, Rotation::Deg180];

    /// Angle in degrees.
    pub const fn degrees(self) -> u16 {
        match self {
            Rotation::Deg0 => 0,
            Rotation::Deg90 => 90,
            Rotation::Deg180 => 180,
            Rotation::Deg270 => 270,
        }
    }

    /// Quarter turns exchange the footprint's length and width.
    pub const fn swaps_footprint(self) -> bool {
        matches!(self, Rotation::Deg90 | Rotation::Deg270)
    }
}

impl TryFrom<u16> for Rotation {
    type Error = ModelError;

    fn try_from(degrees: u16) -> Result<Self, Self::Error> {
        match degrees {
            0 => Ok(Rotation::Deg0),
            90 => Ok(Rotation::Deg90),
            180 => Ok(Rotation::Deg180),
            270 => Ok(Rotation::Deg270),
            other => Err(ModelError::InvalidRotation(other)),
        }
    }
}

impl From<Rotation> for u16 {
    fn from(rotation: Rotation) -> Self {
        rotation.degrees()
    }
}

fn default_stackable() -> bool {
    true
}

/// Catalog entry describing one kind of cargo unit.
///
/// Placements reference a definition by `id`; the definition itself is
/// owned by the caller's catalog.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "id": "euro-pallet",
    "dimensions": { "length": 1200, "width": 800, "height": 1440 },
    "weight": 1200.0,
    "is_stackable": true,
    "max_stack_weight": 1000.0
}))]
pub struct CargoDefinition {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub dimensions: Dimensions,
    /// Weight of one unit in kg
    pub weight: f64,
    /// Whether this unit may be placed on top of other units
    #[serde(default = "default_stackable")]
    pub is_stackable: bool,
    /// Maximum weight in kg this unit may carry on top of it
    #[serde(default)]
    pub max_stack_weight: Option<f64>,
    /// Maximum stack height in mm above this unit
    #[serde(default)]
    pub max_stack_height: Option<f64>,
    #[serde(default)]
    pub is_fragile: bool,
    /// Restricts rotations to 0° and 180°
    #[serde(default)]
    pub this_side_up: bool,
    /// Lowest admissible transport temperature in °C
    #[serde(default)]
    pub temperature_min: Option<f64>,
    /// Highest admissible transport temperature in °C
    #[serde(default)]
    pub temperature_max: Option<f64>,
    /// Hazardous goods (ADR) class code, e.g. `"3"`
    #[serde(default)]
    pub hazard_class: Option<String>,
}

impl CargoDefinition {
    /// Creates a stackable, unrestricted cargo definition after validation.
    ///
    /// # Examples
    /// ```
    /// use load_planner::model::{CargoDefinition, Dimensions};
    ///
    /// let dims = Dimensions::new(1200, 800, 1440).unwrap();
    /// let pallet = CargoDefinition::new("euro-pallet", dims, 1200.0).unwrap();
    /// assert!(pallet.is_stackable);
    /// assert!(CargoDefinition::new("broken", dims, -1.0).is_err());
    /// ```
    pub fn new(
        id: impl Into<String>,
        dimensions: Dimensions,
        weight: f64,
    ) -> Result<Self, ModelError> {
        let cargo = Self {
            id: id.into(),
            name: None,
            dimensions,
            weight,
            is_stackable: true,
            max_stack_weight: None,
            max_stack_height: None,
            is_fragile: false,
            this_side_up: false,
            temperature_min: None,
            temperature_max: None,
            hazard_class: None,
        };
        cargo.validate()?;
        Ok(cargo)
    }

    /// Checks all numeric invariants of the definition.
    pub fn validate(&self) -> Result<(), ModelError> {
        self.dimensions.validate()?;
        validate_weight_value(self.weight, "Weight")?;
        validate_optional_limit(self.max_stack_weight, "Max stack weight")?;
        validate_optional_limit(self.max_stack_height, "Max stack height")?;

        for value in [self.temperature_min, self.temperature_max].into_iter().flatten() {
            if !value.is_finite() {
                return Err(ModelError::InvalidTemperatureRange(format!(
                    "cargo '{}' has a non-finite temperature",
                    self.id
                )));
            }
        }
        if let (Some(min), Some(max)) = (self.temperature_min, self.temperature_max) {
            if min > max {
                return Err(ModelError::InvalidTemperatureRange(format!(
                    "cargo '{}' requires {}°C..{}°C",
                    self.id, min, max
                )));
            }
        }
        Ok(())
    }

    /// Marks the cargo as not stackable (Builder pattern light).
    pub fn not_stackable(mut self) -> Self {
        self.is_stackable = false;
        self
    }

    /// Marks the cargo as fragile.
    pub fn fragile(mut self) -> Self {
        self.is_fragile = true;
        self
    }

    /// Restricts rotations to upright ones.
    pub fn this_side_up(mut self) -> Self {
        self.this_side_up = true;
        self
    }

    /// Sets stacking limits (weight in kg, height in mm).
    pub fn with_stack_limits(mut self, max_weight: Option<f64>, max_height: Option<f64>) -> Self {
        self.max_stack_weight = max_weight;
        self.max_stack_height = max_height;
        self
    }

    /// Sets the admissible temperature range in °C.
    pub fn with_temperature(mut self, min: f64, max: Option<f64>) -> Self {
        self.temperature_min = Some(min);
        self.temperature_max = max;
        self
    }

    /// Sets the hazardous goods class.
    pub fn with_hazard_class(mut self, class: impl Into<String>) -> Self {
        self.hazard_class = Some(class.into());
        self
    }

    /// Stack weight limit, if one is in force.
    ///
    /// A limit of zero counts as "not set".
    pub fn stack_weight_limit(&self) -> Option<f64> {
        self.max_stack_weight.filter(|limit| *limit > 0.0)
    }

    /// Stack height limit, if one is in force.
    ///
    /// A limit of zero counts as "not set".
    pub fn stack_height_limit(&self) -> Option<f64> {
        self.max_stack_height.filter(|limit| *limit > 0.0)
    }

    /// Rotations the packer may try for this cargo, in enumeration order.
    pub fn allowed_rotations(&self) -> &'static [Rotation] {
        if self.this_side_up {
            &Rotation::UPRIGHT
        } else {
            &Rotation::ALL
        }
    }

    /// Volume of one unit in cubic millimeters.
    pub fn volume_mm3(&self) -> u64 {
        self.dimensions.volume_mm3()
    }
}

/// A cargo definition together with the number of units to load.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct PackItem {
    pub cargo: CargoDefinition,
    pub quantity: u32,
}

impl PackItem {
    pub fn new(cargo: CargoDefinition, quantity: u32) -> Self {
        Self { cargo, quantity }
    }
}

/// One positioned unit of cargo inside the trailer.
///
/// # Fields
/// * `id` - Unique identification of the placement
/// * `cargo_id` - Id of the referenced cargo definition
/// * `position` - Origin corner (minimum x, y, z) in mm
/// * `rotation` - Quarter turn about the vertical axis
/// * `weight` - Resolved weight of the unit in kg
/// * `stack_level` - Tier index, 0 = floor
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Placement {
    pub id: String,
    pub cargo_id: String,
    pub position: Vec3,
    #[serde(default)]
    #[schema(value_type = u16, example = 90)]
    pub rotation: Rotation,
    pub weight: f64,
    #[serde(default)]
    pub stack_level: u32,
}

impl Placement {
    /// Checks position and weight of a placement received from outside.
    pub fn validate(&self) -> Result<(), ModelError> {
        if !self.position.is_valid_position() {
            return Err(ModelError::InvalidPosition(format!(
                "placement '{}' has position ({}, {}, {})",
                self.id, self.position.x, self.position.y, self.position.z
            )));
        }
        if self.weight < 0.0 || !self.weight.is_finite() {
            return Err(ModelError::InvalidWeight(format!(
                "placement '{}' has weight {}",
                self.id, self.weight
            )));
        }
        Ok(())
    }
}

/// A positioned, rotated unit that geometry can reason about.
pub trait CargoBox {
    /// Identifier reported in collision lists and findings.
    fn box_id(&self) -> &str;
    /// Origin corner in mm.
    fn position(&self) -> Vec3;
    /// Unrotated dimensions.
    fn dimensions(&self) -> Dimensions;
    fn rotation(&self) -> Rotation;
    /// Weight in kg.
    fn weight(&self) -> f64;
}

impl<T: CargoBox> Positioned for T {
    fn origin(&self) -> Vec3 {
        self.position()
    }
}

impl<T: CargoBox> Dimensional for T {
    fn extent(&self) -> Vec3 {
        self.dimensions().rotated(self.rotation()).as_vec3()
    }
}

impl<T: CargoBox> Weighted for T {
    fn weight_kg(&self) -> f64 {
        self.weight()
    }
}

/// A free-standing box with its own dimensions.
///
/// Used for candidate positions inside the packer and wherever geometry
/// is needed without a catalog.
#[derive(Clone, Debug, PartialEq)]
pub struct PlacedBox {
    pub id: String,
    pub position: Vec3,
    pub dimensions: Dimensions,
    pub rotation: Rotation,
    pub weight: f64,
}

impl PlacedBox {
    /// Creates a new unrotated PlacedBox.
    pub fn new(id: impl Into<String>, position: Vec3, dimensions: Dimensions, weight: f64) -> Self {
        Self {
            id: id.into(),
            position,
            dimensions,
            rotation: Rotation::Deg0,
            weight,
        }
    }

    /// Returns the same box turned to `rotation`.
    pub fn with_rotation(mut self, rotation: Rotation) -> Self {
        self.rotation = rotation;
        self
    }

    /// Returns the same box moved to `position`.
    pub fn at(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }
}

impl CargoBox for PlacedBox {
    fn box_id(&self) -> &str {
        &self.id
    }

    fn position(&self) -> Vec3 {
        self.position
    }

    fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    fn rotation(&self) -> Rotation {
        self.rotation
    }

    fn weight(&self) -> f64 {
        self.weight
    }
}

/// A placement paired with the cargo definition it references.
#[derive(Clone, Debug)]
pub struct LoadedPlacement<'a> {
    pub placement: Placement,
    pub cargo: &'a CargoDefinition,
}

impl<'a> LoadedPlacement<'a> {
    pub fn new(placement: Placement, cargo: &'a CargoDefinition) -> Self {
        Self { placement, cargo }
    }

    /// Stack level of the underlying placement.
    #[inline]
    pub fn stack_level(&self) -> u32 {
        self.placement.stack_level
    }

    /// Bounding box using effective dimensions.
    #[inline]
    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox::of(self)
    }
}

impl CargoBox for LoadedPlacement<'_> {
    fn box_id(&self) -> &str {
        &self.placement.id
    }

    fn position(&self) -> Vec3 {
        self.placement.position
    }

    fn dimensions(&self) -> Dimensions {
        self.cargo.dimensions
    }

    fn rotation(&self) -> Rotation {
        self.placement.rotation
    }

    fn weight(&self) -> f64 {
        self.placement.weight
    }
}

/// Caller-owned set of cargo definitions, indexed by id.
#[derive(Clone, Debug, Default)]
pub struct CargoCatalog {
    entries: HashMap<String, CargoDefinition>,
}

impl CargoCatalog {
    /// Builds a catalog after validating every definition.
    pub fn new(definitions: Vec<CargoDefinition>) -> Result<Self, ModelError> {
        let mut entries = HashMap::with_capacity(definitions.len());
        for definition in definitions {
            definition.validate()?;
            if entries.contains_key(&definition.id) {
                return Err(ModelError::DuplicateCargo(definition.id));
            }
            entries.insert(definition.id.clone(), definition);
        }
        Ok(Self { entries })
    }

    pub fn get(&self, id: &str) -> Option<&CargoDefinition> {
        self.entries.get(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Pairs each placement with its cargo definition, keeping input order.
    pub fn resolve(&self, placements: Vec<Placement>) -> Result<Vec<LoadedPlacement<'_>>, ModelError> {
        placements
            .into_iter()
            .map(|placement| {
                placement.validate()?;
                match self.entries.get(&placement.cargo_id) {
                    Some(cargo) => Ok(LoadedPlacement::new(placement, cargo)),
                    None => Err(ModelError::UnknownCargo {
                        placement_id: placement.id,
                        cargo_id: placement.cargo_id,
                    }),
                }
            })
            .collect()
    }
}

/// Wheel arch intrusion into the loading floor.
///
/// Advisory only: the validator does not treat arches as obstacles.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct WheelArches {
    pub height: u32,
    pub width: u32,
    /// Distance of the arches from the front wall in mm
    #[serde(default)]
    pub position_x: Option<u32>,
}

/// Floor-plane rectangle with an admissible temperature range.
///
/// The rectangle spans `x..x + width` along the trailer length and
/// `y..y + height` across it.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TemperatureZone {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub temp_min: f64,
    pub temp_max: f64,
}

impl TemperatureZone {
    /// Checks the zone rectangle and range.
    pub fn validate(&self) -> Result<(), ModelError> {
        let finite = [
            self.x,
            self.y,
            self.width,
            self.height,
            self.temp_min,
            self.temp_max,
        ]
        .iter()
        .all(|v| v.is_finite());
        if !finite || self.width <= 0.0 || self.height <= 0.0 {
            return Err(ModelError::InvalidZone(format!(
                "rectangle ({}, {}, {}, {}) is not a valid area",
                self.x, self.y, self.width, self.height
            )));
        }
        if self.temp_min > self.temp_max {
            return Err(ModelError::InvalidZone(format!(
                "range {}°C..{}°C is inverted",
                self.temp_min, self.temp_max
            )));
        }
        Ok(())
    }

    /// Closed containment test for a floor-plane point.
    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        x >= self.x && x <= self.x + self.width && y >= self.y && y <= self.y + self.height
    }

    /// Whether a required range fits inside the zone's range.
    ///
    /// A missing upper bound only checks the lower one.
    pub fn accepts_range(&self, min: f64, max: Option<f64>) -> bool {
        min >= self.temp_min && max.is_none_or(|max| max <= self.temp_max)
    }
}

/// Usable internal volume of a trailer plus its load limits.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "length": 13600,
    "width": 2450,
    "height": 2700,
    "max_payload": 24000.0
}))]
pub struct TrailerBounds {
    pub length: u32,
    pub width: u32,
    pub height: u32,
    /// Maximum payload in kg
    pub max_payload: f64,
    /// Maximum axle load in kg; enables the axle-position check
    #[serde(default)]
    pub max_axle_load: Option<f64>,
    #[serde(default)]
    pub wheel_arches: Option<WheelArches>,
    #[serde(default)]
    pub temperature_zones: Vec<TemperatureZone>,
}

impl TrailerBounds {
    /// Creates a trailer without zones, arches or axle data.
    ///
    /// # Examples
    /// ```
    /// use load_planner::model::TrailerBounds;
    ///
    /// let trailer = TrailerBounds::new(13600, 2450, 2700, 24000.0).unwrap();
    /// assert_eq!(trailer.volume_mm3(), 13600 * 2450 * 2700);
    /// ```
    pub fn new(length: u32, width: u32, height: u32, max_payload: f64) -> Result<Self, ModelError> {
        let trailer = Self {
            length,
            width,
            height,
            max_payload,
            max_axle_load: None,
            wheel_arches: None,
            temperature_zones: Vec::new(),
        };
        trailer.validate()?;
        Ok(trailer)
    }

    /// Checks dimensions, payload and zones.
    pub fn validate(&self) -> Result<(), ModelError> {
        Dimensions {
            length: self.length,
            width: self.width,
            height: self.height,
        }
        .validate()?;
        validate_weight_value(self.max_payload, "Max payload")?;
        validate_optional_limit(self.max_axle_load, "Max axle load")?;
        for zone in &self.temperature_zones {
            zone.validate()?;
        }
        Ok(())
    }

    pub fn with_axle_load(mut self, max_axle_load: f64) -> Self {
        self.max_axle_load = Some(max_axle_load);
        self
    }

    pub fn with_zone(mut self, zone: TemperatureZone) -> Self {
        self.temperature_zones.push(zone);
        self
    }

    /// The loading volume as a bounding box anchored at the origin.
    #[inline]
    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox::from_position_and_dims(Vec3::zero(), self.dims_as_vec3())
    }

    #[inline]
    pub fn dims_as_vec3(&self) -> Vec3 {
        Vec3::new(
            f64::from(self.length),
            f64::from(self.width),
            f64::from(self.height),
        )
    }

    /// Volume in cubic millimeters.
    pub fn volume_mm3(&self) -> u64 {
        u64::from(self.length) * u64::from(self.width) * u64::from(self.height)
    }

    /// Axle-load limit, if one is in force. Zero counts as "not set".
    pub fn axle_load_limit(&self) -> Option<f64> {
        self.max_axle_load.filter(|limit| *limit > 0.0)
    }
}
