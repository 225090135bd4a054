//! Automatic placement of cargo units in a trailer.
//!
//! Implements a greedy "largest volume first, first fit" heuristic:
//! - every requested unit is packed individually
//! - units are sorted by descending volume, ties keep input order
//! - per rotation, stackable units first try to sit on an already placed
//!   unit, then a 50 mm floor grid is scanned front to back, left to right
//! - units without any valid position are left out, never forced
//!
//! The result is reproducible and explainable, not optimal. There is no
//! backtracking: a committed unit is never moved by later ones.

use std::collections::HashMap;

use serde::Serialize;
use tracing::{debug, warn};
use utoipa::ToSchema;

use crate::geometry::{effective_dimensions, overlap, top_z, within_bounds};
use crate::model::{
    CargoBox, CargoDefinition, Dimensions, LoadedPlacement, PackItem, PlacedBox, Placement,
    Rotation, TrailerBounds,
};
use crate::types::Vec3;

/// Configuration for the packing heuristic.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PackingConfig {
    /// Step of the floor search grid in mm
    pub grid_step: f64,
    /// Run the full overlap test before accepting a stacked position
    pub check_stack_collisions: bool,
    /// Leave units out once the running weight would exceed the payload
    pub respect_payload: bool,
}

impl PackingConfig {
    pub const DEFAULT_GRID_STEP: f64 = 50.0;
    /// Smallest accepted grid step; finer grids are raised to this.
    pub const MIN_GRID_STEP: f64 = 1.0;
    pub const DEFAULT_CHECK_STACK_COLLISIONS: bool = true;
    pub const DEFAULT_RESPECT_PAYLOAD: bool = false;

    /// Creates a builder for a custom configuration.
    pub fn builder() -> PackingConfigBuilder {
        PackingConfigBuilder::default()
    }
}

impl Default for PackingConfig {
    fn default() -> Self {
        Self {
            grid_step: Self::DEFAULT_GRID_STEP,
            check_stack_collisions: Self::DEFAULT_CHECK_STACK_COLLISIONS,
            respect_payload: Self::DEFAULT_RESPECT_PAYLOAD,
        }
    }
}

/// Builder for PackingConfig.
#[derive(Clone, Debug, Default)]
pub struct PackingConfigBuilder {
    config: PackingConfig,
}

impl PackingConfigBuilder {
    /// Sets the floor grid step, at least `MIN_GRID_STEP`.
    pub fn grid_step(mut self, step: f64) -> Self {
        self.config.grid_step = step.max(PackingConfig::MIN_GRID_STEP);
        self
    }

    /// Enables or disables the overlap test for stacked positions.
    pub fn check_stack_collisions(mut self, enabled: bool) -> Self {
        self.config.check_stack_collisions = enabled;
        self
    }

    /// Enables or disables the running payload limit.
    pub fn respect_payload(mut self, enabled: bool) -> Self {
        self.config.respect_payload = enabled;
        self
    }

    /// Creates the final configuration.
    pub fn build(self) -> PackingConfig {
        self.config
    }
}

/// Reasons why a unit could not be placed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnplacedReason {
    TooHeavyForTrailer,
    DimensionsExceedTrailer,
    NoFreePosition,
}

impl UnplacedReason {
    pub fn code(&self) -> &'static str {
        match self {
            UnplacedReason::TooHeavyForTrailer => "too_heavy_for_trailer",
            UnplacedReason::DimensionsExceedTrailer => "dimensions_exceed_trailer",
            UnplacedReason::NoFreePosition => "no_free_position",
        }
    }
}

impl std::fmt::Display for UnplacedReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnplacedReason::TooHeavyForTrailer => {
                write!(f, "Unit would exceed the trailer's maximum payload")
            }
            UnplacedReason::DimensionsExceedTrailer => {
                write!(
                    f,
                    "Unit does not fit the trailer in any allowed rotation"
                )
            }
            UnplacedReason::NoFreePosition => {
                write!(f, "No free position left in the trailer")
            }
        }
    }
}

/// A unit that could not be placed.
#[derive(Clone, Debug, PartialEq)]
pub struct UnplacedUnit {
    pub id: String,
    pub cargo_id: String,
    pub reason: UnplacedReason,
}

/// Full result of a packing run.
#[derive(Clone, Debug, Default)]
pub struct PackingOutcome {
    /// Accepted placements in packing order
    pub placements: Vec<Placement>,
    /// Units left out, in packing order
    pub unplaced: Vec<UnplacedUnit>,
}

impl PackingOutcome {
    /// Whether every requested unit was placed.
    pub fn is_complete(&self) -> bool {
        self.unplaced.is_empty()
    }

    pub fn requested_units(&self) -> usize {
        self.placements.len() + self.unplaced.len()
    }
}

/// Events emitted while packing, for live visualization.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type")]
pub enum PackEvent {
    /// A unit was placed.
    ItemPlaced {
        id: String,
        cargo_id: String,
        pos: (f64, f64, f64),
        rotation: u16,
        stack_level: u32,
        total_weight: f64,
    },
    /// A unit could not be placed.
    ItemRejected {
        id: String,
        cargo_id: String,
        reason_code: String,
        reason_text: String,
    },
    /// Packing finished.
    Finished { placed: usize, unplaced: usize },
}

/// Load figures a caller would otherwise recompute from placements.
#[derive(Clone, Debug, PartialEq, Serialize, ToSchema)]
pub struct PackingSummary {
    pub requested_units: usize,
    pub placed_units: usize,
    pub unplaced_units: usize,
    /// Sum of placed weights in kg
    pub total_weight: f64,
    /// Sum of placed volumes in mm³
    pub total_volume: u64,
    /// Placed volume relative to the trailer volume in percent
    pub volume_utilization: f64,
    /// Placed weight relative to the maximum payload in percent
    pub weight_utilization: f64,
}

impl PackingSummary {
    /// Builds the summary from a packing outcome and the items it came from.
    pub fn new(items: &[PackItem], outcome: &PackingOutcome, trailer: &TrailerBounds) -> Self {
        let mut catalog: HashMap<&str, &CargoDefinition> = HashMap::new();
        for item in items {
            catalog.entry(item.cargo.id.as_str()).or_insert(&item.cargo);
        }

        let total_weight: f64 = outcome.placements.iter().map(|p| p.weight).sum();
        let total_volume: u64 = outcome
            .placements
            .iter()
            .filter_map(|p| catalog.get(p.cargo_id.as_str()))
            .map(|cargo| cargo.volume_mm3())
            .sum();

        let trailer_volume = trailer.volume_mm3();
        let volume_utilization = if trailer_volume > 0 {
            total_volume as f64 / trailer_volume as f64 * 100.0
        } else {
            0.0
        };
        let weight_utilization = if trailer.max_payload > 0.0 {
            total_weight / trailer.max_payload * 100.0
        } else {
            0.0
        };

        Self {
            requested_units: outcome.requested_units(),
            placed_units: outcome.placements.len(),
            unplaced_units: outcome.unplaced.len(),
            total_weight,
            total_volume,
            volume_utilization,
            weight_utilization,
        }
    }
}

/// Packs the requested units into the trailer with the default configuration.
///
/// Units that cannot be placed are silently omitted; compare the number of
/// returned placements with the requested quantities to detect them.
///
/// # Examples
/// ```
/// use load_planner::model::{CargoDefinition, Dimensions, PackItem, TrailerBounds};
/// use load_planner::packer::pack;
///
/// let pallet = CargoDefinition::new("pallet", Dimensions::new(1200, 800, 1440).unwrap(), 1200.0).unwrap();
/// let trailer = TrailerBounds::new(13600, 2450, 2700, 24000.0).unwrap();
/// let placements = pack(&[PackItem::new(pallet, 3)], &trailer);
/// assert_eq!(placements.len(), 3);
/// ```
pub fn pack(items: &[PackItem], trailer: &TrailerBounds) -> Vec<Placement> {
    pack_with_config(items, trailer, &PackingConfig::default())
}

/// Like `pack`, but with adjustable parameters.
pub fn pack_with_config(
    items: &[PackItem],
    trailer: &TrailerBounds,
    config: &PackingConfig,
) -> Vec<Placement> {
    pack_with_report(items, trailer, config).placements
}

/// Packs and also reports which units were left out and why.
pub fn pack_with_report(
    items: &[PackItem],
    trailer: &TrailerBounds,
    config: &PackingConfig,
) -> PackingOutcome {
    pack_with_progress(items, trailer, config, |_| {})
}

/// One physical unit expanded from a pack item.
struct Unit<'a> {
    id: String,
    cargo: &'a CargoDefinition,
    volume: u64,
}

/// Chosen spot for a unit.
struct Slot {
    position: Vec3,
    rotation: Rotation,
    stack_level: u32,
}

/// Packing with a live progress callback.
///
/// Calls `on_event` for each placed or rejected unit and once at the end.
pub fn pack_with_progress(
    items: &[PackItem],
    trailer: &TrailerBounds,
    config: &PackingConfig,
    mut on_event: impl FnMut(&PackEvent),
) -> PackingOutcome {
    let mut units: Vec<Unit<'_>> = items
        .iter()
        .flat_map(|item| {
            (0..item.quantity).map(move |index| Unit {
                id: format!("{}-{}", item.cargo.id, index),
                cargo: &item.cargo,
                volume: item.cargo.volume_mm3(),
            })
        })
        .collect();

    // Largest first; sort_by is stable, so equal volumes keep input order
    units.sort_by(|a, b| b.volume.cmp(&a.volume));

    let mut placed: Vec<LoadedPlacement<'_>> = Vec::with_capacity(units.len());
    let mut unplaced: Vec<UnplacedUnit> = Vec::new();
    let mut total_weight = 0.0;

    for unit in units {
        let slot = if config.respect_payload
            && total_weight + unit.cargo.weight > trailer.max_payload
        {
            Err(UnplacedReason::TooHeavyForTrailer)
        } else {
            find_slot(unit.cargo, &placed, trailer, config).ok_or_else(|| {
                if fits_any_rotation(unit.cargo, trailer) {
                    UnplacedReason::NoFreePosition
                } else {
                    UnplacedReason::DimensionsExceedTrailer
                }
            })
        };

        match slot {
            Ok(slot) => {
                total_weight += unit.cargo.weight;
                debug!(
                    unit = %unit.id,
                    x = slot.position.x,
                    y = slot.position.y,
                    z = slot.position.z,
                    rotation = slot.rotation.degrees(),
                    stack_level = slot.stack_level,
                    "unit placed"
                );
                on_event(&PackEvent::ItemPlaced {
                    id: unit.id.clone(),
                    cargo_id: unit.cargo.id.clone(),
                    pos: (slot.position.x, slot.position.y, slot.position.z),
                    rotation: slot.rotation.degrees(),
                    stack_level: slot.stack_level,
                    total_weight,
                });
                placed.push(LoadedPlacement::new(
                    Placement {
                        id: unit.id,
                        cargo_id: unit.cargo.id.clone(),
                        position: slot.position,
                        rotation: slot.rotation,
                        weight: unit.cargo.weight,
                        stack_level: slot.stack_level,
                    },
                    unit.cargo,
                ));
            }
            Err(reason) => {
                warn!(unit = %unit.id, reason = reason.code(), "could not place unit");
                on_event(&PackEvent::ItemRejected {
                    id: unit.id.clone(),
                    cargo_id: unit.cargo.id.clone(),
                    reason_code: reason.code().to_string(),
                    reason_text: reason.to_string(),
                });
                unplaced.push(UnplacedUnit {
                    id: unit.id,
                    cargo_id: unit.cargo.id.clone(),
                    reason,
                });
            }
        }
    }

    on_event(&PackEvent::Finished {
        placed: placed.len(),
        unplaced: unplaced.len(),
    });

    PackingOutcome {
        placements: placed.into_iter().map(|p| p.placement).collect(),
        unplaced,
    }
}

/// Finds the first valid slot over all allowed rotations.
///
/// Per rotation: stacking on placed units (placement order) first, if the
/// cargo is stackable, then the floor grid.
fn find_slot(
    cargo: &CargoDefinition,
    placed: &[LoadedPlacement<'_>],
    trailer: &TrailerBounds,
    config: &PackingConfig,
) -> Option<Slot> {
    for &rotation in cargo.allowed_rotations() {
        let dims = cargo.dimensions.rotated(rotation);

        if cargo.is_stackable {
            for base in placed {
                if let Some(position) = try_stack_on(base, dims, placed, trailer, config) {
                    return Some(Slot {
                        position,
                        rotation,
                        stack_level: base.stack_level() + 1,
                    });
                }
            }
        }

        if let Some(position) = find_floor_position(dims, placed, trailer, config) {
            return Some(Slot {
                position,
                rotation,
                stack_level: 0,
            });
        }
    }
    None
}

/// Tries to put a unit with effective `dims` on top of `base`.
///
/// Candidates are the base's origin (aligned) and the centered position.
fn try_stack_on(
    base: &LoadedPlacement<'_>,
    dims: Dimensions,
    placed: &[LoadedPlacement<'_>],
    trailer: &TrailerBounds,
    config: &PackingConfig,
) -> Option<Vec3> {
    let top = top_z(base);
    if top + f64::from(dims.height) > f64::from(trailer.height) {
        return None;
    }

    let base_dims = effective_dimensions(base);
    let origin = base.position();
    let candidates = [
        (origin.x, origin.y),
        (
            origin.x + (f64::from(base_dims.length) - f64::from(dims.length)) / 2.0,
            origin.y + (f64::from(base_dims.width) - f64::from(dims.width)) / 2.0,
        ),
    ];

    candidates.into_iter().find_map(|(x, y)| {
        let candidate = PlacedBox::new("candidate", Vec3::new(x, y, top), dims, 0.0);
        if !within_bounds(&candidate, trailer) {
            return None;
        }
        if config.check_stack_collisions && placed.iter().any(|p| overlap(p, &candidate)) {
            return None;
        }
        Some(candidate.position)
    })
}

/// Scans the floor grid, x outer and y inner, for the first free spot.
fn find_floor_position(
    dims: Dimensions,
    placed: &[LoadedPlacement<'_>],
    trailer: &TrailerBounds,
    config: &PackingConfig,
) -> Option<Vec3> {
    if dims.height > trailer.height {
        return None;
    }

    let xs = axis_positions(trailer.length, dims.length, config.grid_step);
    let ys = axis_positions(trailer.width, dims.width, config.grid_step);

    for &x in &xs {
        for &y in &ys {
            let candidate = PlacedBox::new("candidate", Vec3::new(x, y, 0.0), dims, 0.0);
            if placed.iter().any(|p| overlap(p, &candidate)) {
                continue;
            }
            if within_bounds(&candidate, trailer) {
                return Some(candidate.position);
            }
        }
    }
    None
}

/// Grid positions along one axis: `0, step, 2·step, …` up to the last
/// origin at which the unit still fits.
///
/// Empty if the unit is longer than the axis.
fn axis_positions(container_len: u32, object_len: u32, step: f64) -> Vec<f64> {
    let mut positions = Vec::new();
    if object_len > container_len {
        return positions;
    }
    // NaN also ends up at the minimum
    let step = step.max(PackingConfig::MIN_GRID_STEP);

    let max_pos = f64::from(container_len - object_len);
    let mut index = 0u32;
    loop {
        let pos = f64::from(index) * step;
        if pos > max_pos {
            break;
        }
        positions.push(pos);
        index += 1;
    }
    positions
}

/// Whether the unit's footprint and height fit the empty trailer in some allowed rotation.
fn fits_any_rotation(cargo: &CargoDefinition, trailer: &TrailerBounds) -> bool {
    cargo.allowed_rotations().iter().any(|&rotation| {
        let dims = cargo.dimensions.rotated(rotation);
        dims.length <= trailer.length && dims.width <= trailer.width && dims.height <= trailer.height
    })
}
