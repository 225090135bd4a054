//! Rule engine for load plans.
//!
//! Classifies an arrangement, whether produced by the packer or edited by
//! hand, against a fixed battery of checks. Rules never short-circuit each
//! other; their findings are concatenated in this order:
//! 1. boundary
//! 2. collision
//! 3. payload weight and axle position
//! 4. stacking limits
//! 5. temperature zoning
//! 6. center of gravity
//! 7. hazardous goods adjacency
//!
//! The validator is a pure function of its inputs. Running it twice on the
//! same plan yields the same findings.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;
use utoipa::ToSchema;

use crate::geometry::{
    CenterOfGravity, center_of_gravity, detect_collisions, effective_dimensions,
    footprints_overlap, top_z, within_bounds,
};
use crate::hazard::HazardMatrix;
use crate::model::{CargoBox, LoadedPlacement, TrailerBounds};

/// Kind of rule a finding comes from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FindingType {
    BoundaryExceeded,
    Collision,
    WeightExceeded,
    AxleLoadWarning,
    StackingViolation,
    FragilePlacement,
    TemperatureZoneMismatch,
    CenterOfGravityWarning,
    AdrConflict,
}

/// How serious a finding is.
///
/// `Info` is reserved; no rule emits it yet.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

/// A single rule result.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ValidationFinding {
    #[serde(rename = "type")]
    pub kind: FindingType,
    pub severity: Severity,
    pub message: String,
    /// Placement the finding points at, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_id: Option<String>,
}

impl ValidationFinding {
    fn error(kind: FindingType, message: String, item_id: Option<&str>) -> Self {
        Self {
            kind,
            severity: Severity::Error,
            message,
            item_id: item_id.map(str::to_string),
        }
    }

    fn warning(kind: FindingType, message: String, item_id: Option<&str>) -> Self {
        Self {
            kind,
            severity: Severity::Warning,
            message,
            item_id: item_id.map(str::to_string),
        }
    }
}

/// Thresholds used by the rules.
///
/// Defaults reproduce the standard rule set.
#[derive(Clone, Debug, PartialEq)]
pub struct ValidationConfig {
    /// Share of the max payload above which a weight warning is raised
    pub payload_warning_ratio: f64,
    /// Assumed rear axle position as share of the trailer length
    pub rear_axle_ratio: f64,
    /// COG closer to the front than this share of the length is too far forward
    pub cog_front_ratio: f64,
    /// COG beyond this share of the length is too far back
    pub cog_rear_ratio: f64,
    /// Weight in kg above which a unit on a fragile base is flagged
    pub fragile_weight_limit: f64,
    /// Planar distance in mm below which hazard classes count as adjacent
    pub hazard_distance: f64,
    pub hazard_matrix: HazardMatrix,
}

impl ValidationConfig {
    pub const DEFAULT_PAYLOAD_WARNING_RATIO: f64 = 0.9;
    pub const DEFAULT_REAR_AXLE_RATIO: f64 = 0.7;
    pub const DEFAULT_COG_FRONT_RATIO: f64 = 0.25;
    pub const DEFAULT_COG_REAR_RATIO: f64 = 0.75;
    pub const DEFAULT_FRAGILE_WEIGHT_LIMIT: f64 = 500.0;
    pub const DEFAULT_HAZARD_DISTANCE: f64 = 1000.0;

    /// Creates a builder for a custom configuration.
    pub fn builder() -> ValidationConfigBuilder {
        ValidationConfigBuilder::default()
    }
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            payload_warning_ratio: Self::DEFAULT_PAYLOAD_WARNING_RATIO,
            rear_axle_ratio: Self::DEFAULT_REAR_AXLE_RATIO,
            cog_front_ratio: Self::DEFAULT_COG_FRONT_RATIO,
            cog_rear_ratio: Self::DEFAULT_COG_REAR_RATIO,
            fragile_weight_limit: Self::DEFAULT_FRAGILE_WEIGHT_LIMIT,
            hazard_distance: Self::DEFAULT_HAZARD_DISTANCE,
            hazard_matrix: HazardMatrix::default(),
        }
    }
}

/// Builder for ValidationConfig.
#[derive(Clone, Debug, Default)]
pub struct ValidationConfigBuilder {
    config: ValidationConfig,
}

impl ValidationConfigBuilder {
    pub fn payload_warning_ratio(mut self, ratio: f64) -> Self {
        self.config.payload_warning_ratio = ratio;
        self
    }

    pub fn fragile_weight_limit(mut self, limit: f64) -> Self {
        self.config.fragile_weight_limit = limit;
        self
    }

    pub fn hazard_distance(mut self, distance: f64) -> Self {
        self.config.hazard_distance = distance;
        self
    }

    pub fn hazard_matrix(mut self, matrix: HazardMatrix) -> Self {
        self.config.hazard_matrix = matrix;
        self
    }

    pub fn build(self) -> ValidationConfig {
        self.config
    }
}

/// Findings plus the flags callers usually derive from them.
#[derive(Clone, Debug, PartialEq, Serialize, ToSchema)]
pub struct ValidationReport {
    pub findings: Vec<ValidationFinding>,
    pub has_errors: bool,
    pub has_warnings: bool,
}

impl ValidationReport {
    pub fn from_findings(findings: Vec<ValidationFinding>) -> Self {
        let has_errors = findings.iter().any(|f| f.severity == Severity::Error);
        let has_warnings = findings.iter().any(|f| f.severity == Severity::Warning);
        Self {
            findings,
            has_errors,
            has_warnings,
        }
    }

    /// Number of findings with the given severity.
    pub fn count(&self, severity: Severity) -> usize {
        self.findings
            .iter()
            .filter(|f| f.severity == severity)
            .count()
    }
}

/// Validates a plan with the default thresholds.
pub fn validate(items: &[LoadedPlacement<'_>], trailer: &TrailerBounds) -> Vec<ValidationFinding> {
    validate_with_config(items, trailer, &ValidationConfig::default())
}

/// Validates a plan and wraps the result in a report.
pub fn validate_report(
    items: &[LoadedPlacement<'_>],
    trailer: &TrailerBounds,
    config: &ValidationConfig,
) -> ValidationReport {
    ValidationReport::from_findings(validate_with_config(items, trailer, config))
}

/// Runs every rule and concatenates the findings in rule order.
pub fn validate_with_config(
    items: &[LoadedPlacement<'_>],
    trailer: &TrailerBounds,
    config: &ValidationConfig,
) -> Vec<ValidationFinding> {
    let mut findings = Vec::new();
    let cog = center_of_gravity(items);

    check_boundaries(items, trailer, &mut findings);
    check_collisions(items, &mut findings);
    check_weight(items, trailer, &cog, config, &mut findings);
    check_stacking(items, config, &mut findings);
    check_temperature_zones(items, trailer, &mut findings);
    check_center_of_gravity(trailer, &cog, config, &mut findings);
    check_hazard_adjacency(items, config, &mut findings);

    debug!(
        items = items.len(),
        findings = findings.len(),
        "load plan validated"
    );
    findings
}

fn check_boundaries(
    items: &[LoadedPlacement<'_>],
    trailer: &TrailerBounds,
    findings: &mut Vec<ValidationFinding>,
) {
    for item in items {
        if !within_bounds(item, trailer) {
            findings.push(ValidationFinding::error(
                FindingType::BoundaryExceeded,
                format!("Item {} exceeds trailer boundaries", item.box_id()),
                Some(item.box_id()),
            ));
        }
    }
}

fn check_collisions(items: &[LoadedPlacement<'_>], findings: &mut Vec<ValidationFinding>) {
    let report = detect_collisions(items);
    for id in &report.colliding_ids {
        findings.push(ValidationFinding::error(
            FindingType::Collision,
            format!("Item {} collides with another item", id),
            Some(id),
        ));
    }
}

fn check_weight(
    items: &[LoadedPlacement<'_>],
    trailer: &TrailerBounds,
    cog: &CenterOfGravity,
    config: &ValidationConfig,
    findings: &mut Vec<ValidationFinding>,
) {
    let total_weight: f64 = items.iter().map(|item| item.weight()).sum();

    if total_weight > trailer.max_payload {
        findings.push(ValidationFinding::error(
            FindingType::WeightExceeded,
            format!(
                "Total weight {}kg exceeds max payload {}kg",
                total_weight, trailer.max_payload
            ),
            None,
        ));
    } else if total_weight > trailer.max_payload * config.payload_warning_ratio {
        findings.push(ValidationFinding::warning(
            FindingType::WeightExceeded,
            format!(
                "Total weight {}kg is close to max payload {}kg",
                total_weight, trailer.max_payload
            ),
            None,
        ));
    }

    if trailer.axle_load_limit().is_some() {
        let rear_axle = f64::from(trailer.length) * config.rear_axle_ratio;
        if cog.x > rear_axle {
            findings.push(ValidationFinding::warning(
                FindingType::AxleLoadWarning,
                format!(
                    "Center of gravity ({:.2}m from front) is behind the rear axle position ({:.2}m)",
                    cog.x / 1000.0,
                    rear_axle / 1000.0
                ),
                None,
            ));
        }
    }
}

fn check_stacking(
    items: &[LoadedPlacement<'_>],
    config: &ValidationConfig,
    findings: &mut Vec<ValidationFinding>,
) {
    let mut levels: BTreeMap<u32, Vec<&LoadedPlacement<'_>>> = BTreeMap::new();
    for item in items {
        levels.entry(item.stack_level()).or_default().push(item);
    }

    for (&level, level_items) in levels.range(1..) {
        for &item in level_items {
            if !item.cargo.is_stackable {
                findings.push(ValidationFinding::error(
                    FindingType::StackingViolation,
                    format!(
                        "Item {} is not stackable but is placed on level {}",
                        item.box_id(),
                        level
                    ),
                    Some(item.box_id()),
                ));
                continue;
            }

            // First lower-level unit under the footprint, in input order
            let Some(base) = items
                .iter()
                .find(|below| below.stack_level() < level && footprints_overlap(*below, item))
            else {
                continue;
            };

            let carried = move || {
                items.iter().filter(move |above| {
                    above.stack_level() > base.stack_level() && footprints_overlap(base, *above)
                })
            };

            if let Some(limit) = base.cargo.stack_weight_limit() {
                let weight_above: f64 = carried().map(|above| above.weight()).sum();
                if weight_above > limit {
                    findings.push(ValidationFinding::error(
                        FindingType::StackingViolation,
                        format!(
                            "Weight above item {} ({}kg) exceeds max stack weight {}kg",
                            base.box_id(),
                            weight_above,
                            limit
                        ),
                        Some(base.box_id()),
                    ));
                }
            }

            if let Some(limit) = base.cargo.stack_height_limit() {
                let highest_top = carried().map(top_z).fold(None, |acc: Option<f64>, z| {
                    Some(acc.map_or(z, |current| current.max(z)))
                });
                if let Some(highest_top) = highest_top {
                    let height_above = highest_top - top_z(base);
                    if height_above > limit {
                        findings.push(ValidationFinding::error(
                            FindingType::StackingViolation,
                            format!(
                                "Stack height above item {} ({}mm) exceeds max stack height {}mm",
                                base.box_id(),
                                height_above,
                                limit
                            ),
                            Some(base.box_id()),
                        ));
                    }
                }
            }

            if base.cargo.is_fragile && item.weight() > config.fragile_weight_limit {
                findings.push(ValidationFinding::warning(
                    FindingType::FragilePlacement,
                    format!(
                        "Heavy item {} placed on fragile item {}",
                        item.box_id(),
                        base.box_id()
                    ),
                    Some(item.box_id()),
                ));
            }
        }
    }
}

fn format_range(min: f64, max: Option<f64>) -> String {
    match max {
        Some(max) => format!("{}-{}°C", min, max),
        None => format!("at least {}°C", min),
    }
}

fn check_temperature_zones(
    items: &[LoadedPlacement<'_>],
    trailer: &TrailerBounds,
    findings: &mut Vec<ValidationFinding>,
) {
    if trailer.temperature_zones.is_empty() {
        return;
    }

    for item in items {
        let Some(required_min) = item.cargo.temperature_min else {
            continue;
        };
        let required_max = item.cargo.temperature_max;

        let dims = effective_dimensions(item);
        let position = item.position();
        let center_x = position.x + f64::from(dims.length) / 2.0;
        let center_y = position.y + f64::from(dims.width) / 2.0;

        let zone = trailer
            .temperature_zones
            .iter()
            .find(|zone| zone.contains_point(center_x, center_y));

        match zone {
            None => findings.push(ValidationFinding::error(
                FindingType::TemperatureZoneMismatch,
                format!(
                    "Item {} requires temperature {} but is not in a matching zone",
                    item.box_id(),
                    format_range(required_min, required_max)
                ),
                Some(item.box_id()),
            )),
            Some(zone) if !zone.accepts_range(required_min, required_max) => {
                findings.push(ValidationFinding::error(
                    FindingType::TemperatureZoneMismatch,
                    format!(
                        "Item {} temperature range {} does not match zone temperature {}",
                        item.box_id(),
                        format_range(required_min, required_max),
                        format_range(zone.temp_min, Some(zone.temp_max))
                    ),
                    Some(item.box_id()),
                ))
            }
            Some(_) => {}
        }
    }
}

fn check_center_of_gravity(
    trailer: &TrailerBounds,
    cog: &CenterOfGravity,
    config: &ValidationConfig,
    findings: &mut Vec<ValidationFinding>,
) {
    // An empty plan has its COG at the origin and reports as too far forward
    let length = f64::from(trailer.length);
    if cog.x > length * config.cog_rear_ratio {
        findings.push(ValidationFinding::warning(
            FindingType::CenterOfGravityWarning,
            format!(
                "Center of gravity is too far back ({:.2}m from front)",
                cog.x / 1000.0
            ),
            None,
        ));
    } else if cog.x < length * config.cog_front_ratio {
        findings.push(ValidationFinding::warning(
            FindingType::CenterOfGravityWarning,
            format!(
                "Center of gravity is too far forward ({:.2}m from front)",
                cog.x / 1000.0
            ),
            None,
        ));
    }
}

fn check_hazard_adjacency(
    items: &[LoadedPlacement<'_>],
    config: &ValidationConfig,
    findings: &mut Vec<ValidationFinding>,
) {
    let hazardous: Vec<(&LoadedPlacement<'_>, &str)> = items
        .iter()
        .filter_map(|item| item.cargo.hazard_class.as_deref().map(|class| (item, class)))
        .collect();

    for (i, &(first, first_class)) in hazardous.iter().enumerate() {
        for &(second, second_class) in &hazardous[i + 1..] {
            let distance = first.position().distance_2d(&second.position());
            if distance >= config.hazard_distance {
                continue;
            }
            if config
                .hazard_matrix
                .is_incompatible(first_class, second_class)
            {
                findings.push(ValidationFinding::error(
                    FindingType::AdrConflict,
                    format!(
                        "ADR class {} item {} and class {} item {} cannot be adjacent",
                        first_class,
                        first.box_id(),
                        second_class,
                        second.box_id()
                    ),
                    Some(first.box_id()),
                ));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CargoDefinition, Dimensions, Placement, Rotation, TemperatureZone};
    use crate::types::Vec3;

    fn trailer() -> TrailerBounds {
        TrailerBounds::new(13600, 2450, 2700, 24000.0).unwrap()
    }

    fn cargo(id: &str, length: u32, width: u32, height: u32, weight: f64) -> CargoDefinition {
        CargoDefinition::new(id, Dimensions::new(length, width, height).unwrap(), weight).unwrap()
    }

    fn place<'a>(
        cargo: &'a CargoDefinition,
        id: &str,
        pos: (f64, f64, f64),
        stack_level: u32,
    ) -> LoadedPlacement<'a> {
        LoadedPlacement::new(
            Placement {
                id: id.to_string(),
                cargo_id: cargo.id.clone(),
                position: Vec3::from(pos),
                rotation: Rotation::Deg0,
                weight: cargo.weight,
                stack_level,
            },
            cargo,
        )
    }

    fn of_type(findings: &[ValidationFinding], kind: FindingType) -> Vec<&ValidationFinding> {
        findings.iter().filter(|f| f.kind == kind).collect()
    }

    #[test]
    fn balanced_plan_has_no_findings() {
        let pallet = cargo("pallet", 1200, 800, 1440, 1200.0);
        let items = vec![
            place(&pallet, "a", (6200.0, 0.0, 0.0), 0),
            place(&pallet, "b", (6200.0, 800.0, 0.0), 0),
        ];
        assert!(validate(&items, &trailer()).is_empty());
    }

    #[test]
    fn empty_plan_is_too_far_forward() {
        let findings = validate(&[], &trailer());
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].kind, FindingType::CenterOfGravityWarning);
        assert_eq!(findings[0].severity, Severity::Warning);
        assert!(findings[0].message.contains("too far forward"));
    }

    #[test]
    fn weightless_plan_is_too_far_forward() {
        let pallet = cargo("pallet", 1200, 800, 1440, 1000.0);
        let mut item = place(&pallet, "a", (6200.0, 0.0, 0.0), 0);
        item.placement.weight = 0.0;
        let findings = validate(&[item], &trailer());
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].kind, FindingType::CenterOfGravityWarning);
    }

    #[test]
    fn boundary_and_collision_errors() {
        let pallet = cargo("pallet", 1200, 800, 1440, 1000.0);
        let items = vec![
            place(&pallet, "a", (6000.0, 0.0, 0.0), 0),
            place(&pallet, "b", (6500.0, 400.0, 0.0), 0),
            place(&pallet, "c", (6000.0, 2000.0, 0.0), 0),
        ];
        let findings = validate(&items, &trailer());

        let boundary = of_type(&findings, FindingType::BoundaryExceeded);
        assert_eq!(boundary.len(), 1);
        assert_eq!(boundary[0].item_id.as_deref(), Some("c"));
        assert_eq!(boundary[0].severity, Severity::Error);

        let collisions = of_type(&findings, FindingType::Collision);
        let ids: Vec<_> = collisions.iter().filter_map(|f| f.item_id.as_deref()).collect();
        // c sits clear of both across the width
        assert_eq!(ids, vec!["a", "b"]);

        // Boundary findings come before collision findings
        assert_eq!(findings[0].kind, FindingType::BoundaryExceeded);
        assert_eq!(findings[1].kind, FindingType::Collision);
    }

    #[test]
    fn boundary_uses_rotated_footprint() {
        let pallet = cargo("pallet", 1200, 800, 1440, 1000.0);
        let mut item = place(&pallet, "a", (6000.0, 1650.0, 0.0), 0);
        assert!(validate(&[item.clone()], &trailer()).is_empty());

        // Turned, the pallet is 1200 across: 1650 + 1200 > 2450
        item.placement.rotation = Rotation::Deg90;
        let findings = validate(&[item.clone()], &trailer());
        assert_eq!(of_type(&findings, FindingType::BoundaryExceeded).len(), 1);

        item.placement.position = Vec3::new(6000.0, 1250.0, 0.0);
        assert!(validate(&[item], &trailer()).is_empty());
    }

    #[test]
    fn payload_over_limit_is_an_error() {
        let heavy = cargo("heavy", 1000, 1000, 1000, 12500.0);
        let items = vec![
            place(&heavy, "a", (6000.0, 0.0, 0.0), 0),
            place(&heavy, "b", (6000.0, 1000.0, 0.0), 0),
        ];
        let findings = validate(&items, &trailer());
        let weight = of_type(&findings, FindingType::WeightExceeded);
        assert_eq!(weight.len(), 1);
        assert_eq!(weight[0].severity, Severity::Error);
        assert!(weight[0].message.contains("25000kg"));
    }

    #[test]
    fn payload_near_limit_is_a_warning() {
        let heavy = cargo("heavy", 1000, 1000, 1000, 11000.0);
        let items = vec![
            place(&heavy, "a", (6000.0, 0.0, 0.0), 0),
            place(&heavy, "b", (6000.0, 1000.0, 0.0), 0),
        ];
        let findings = validate(&items, &trailer());
        let weight = of_type(&findings, FindingType::WeightExceeded);
        assert_eq!(weight.len(), 1);
        assert_eq!(weight[0].severity, Severity::Warning);

        let light = cargo("light", 1000, 1000, 1000, 10000.0);
        let items = vec![
            place(&light, "a", (6000.0, 0.0, 0.0), 0),
            place(&light, "b", (6000.0, 1000.0, 0.0), 0),
        ];
        assert!(of_type(&validate(&items, &trailer()), FindingType::WeightExceeded).is_empty());
    }

    #[test]
    fn axle_warning_needs_axle_limit() {
        let pallet = cargo("pallet", 1200, 800, 1440, 1000.0);
        // Center at x = 10000, behind 0.7 * 13600 = 9520 but before 0.75 * 13600 = 10200
        let items = vec![place(&pallet, "a", (9400.0, 0.0, 0.0), 0)];

        let without = validate(&items, &trailer());
        assert!(without.is_empty());

        let with_axle = trailer().with_axle_load(11500.0);
        let findings = validate(&items, &with_axle);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].kind, FindingType::AxleLoadWarning);
        assert_eq!(findings[0].severity, Severity::Warning);
        assert_eq!(findings[0].item_id, None);
    }

    #[test]
    fn axle_and_center_of_gravity_warnings_are_independent() {
        let pallet = cargo("pallet", 1200, 800, 1440, 1000.0);
        // Center at x = 13000, behind both the axle line and the rear COG limit
        let items = vec![place(&pallet, "a", (12400.0, 0.0, 0.0), 0)];
        let findings = validate(&items, &trailer().with_axle_load(11500.0));
        let kinds: Vec<_> = findings.iter().map(|f| f.kind).collect();
        assert_eq!(
            kinds,
            vec![FindingType::AxleLoadWarning, FindingType::CenterOfGravityWarning]
        );
    }

    #[test]
    fn center_of_gravity_band() {
        let pallet = cargo("pallet", 1200, 800, 1440, 1000.0);

        let front = validate(&[place(&pallet, "a", (0.0, 0.0, 0.0), 0)], &trailer());
        assert_eq!(front.len(), 1);
        assert_eq!(front[0].kind, FindingType::CenterOfGravityWarning);
        assert!(front[0].message.contains("too far forward"));

        let back = validate(&[place(&pallet, "a", (12400.0, 0.0, 0.0), 0)], &trailer());
        assert_eq!(back.len(), 1);
        assert!(back[0].message.contains("too far back"));
    }

    #[test]
    fn non_stackable_unit_on_upper_level() {
        let base = cargo("base", 1200, 800, 1000, 300.0);
        let top = cargo("top", 1200, 800, 1000, 300.0).not_stackable();
        let items = vec![
            place(&base, "low", (6000.0, 0.0, 0.0), 0),
            place(&top, "high", (6000.0, 0.0, 1000.0), 1),
        ];
        let findings = validate(&items, &trailer());
        let stacking = of_type(&findings, FindingType::StackingViolation);
        assert_eq!(stacking.len(), 1);
        assert_eq!(stacking[0].item_id.as_deref(), Some("high"));
    }

    #[test]
    fn stack_weight_limit_is_checked_on_the_base() {
        let base = cargo("base", 1200, 800, 1000, 300.0).with_stack_limits(Some(500.0), None);
        let top = cargo("top", 1200, 800, 1000, 600.0);
        let items = vec![
            place(&base, "low", (6000.0, 0.0, 0.0), 0),
            place(&top, "high", (6000.0, 0.0, 1000.0), 1),
        ];
        let findings = validate(&items, &trailer());
        let stacking = of_type(&findings, FindingType::StackingViolation);
        assert_eq!(stacking.len(), 1);
        assert_eq!(stacking[0].item_id.as_deref(), Some("low"));
        assert_eq!(stacking[0].severity, Severity::Error);

        let light_top = cargo("top", 1200, 800, 1000, 400.0);
        let items = vec![
            place(&base, "low", (6000.0, 0.0, 0.0), 0),
            place(&light_top, "high", (6000.0, 0.0, 1000.0), 1),
        ];
        assert!(validate(&items, &trailer()).is_empty());
    }

    #[test]
    fn stack_height_limit_counts_every_unit_above() {
        let base = cargo("base", 1200, 800, 800, 300.0).with_stack_limits(None, Some(1500.0));
        let layer = cargo("layer", 1200, 800, 800, 100.0);
        let items = vec![
            place(&base, "low", (6000.0, 0.0, 0.0), 0),
            place(&layer, "mid", (6000.0, 0.0, 800.0), 1),
            place(&layer, "high", (6000.0, 0.0, 1600.0), 2),
        ];
        let findings = validate(&items, &trailer());
        let stacking = of_type(&findings, FindingType::StackingViolation);
        // Both upper units resolve to the same base, so the base is reported twice
        assert_eq!(stacking.len(), 2);
        assert!(stacking.iter().all(|f| f.item_id.as_deref() == Some("low")));
        assert!(stacking[0].message.contains("1600mm"));
    }

    #[test]
    fn stacking_base_is_first_overlapping_unit_in_input_order() {
        let limited = cargo("limited", 1200, 800, 1000, 300.0).with_stack_limits(Some(500.0), None);
        let open = cargo("open", 1200, 800, 1000, 300.0);
        let bridge = cargo("bridge", 1200, 800, 500, 600.0);
        // The upper unit straddles both floor units
        let first = place(&limited, "first", (6000.0, 0.0, 0.0), 0);
        let second = place(&open, "second", (7200.0, 0.0, 0.0), 0);
        let top = place(&bridge, "top", (6600.0, 0.0, 1000.0), 1);

        let findings = validate(&[first.clone(), second.clone(), top.clone()], &trailer());
        let stacking = of_type(&findings, FindingType::StackingViolation);
        assert_eq!(stacking.len(), 1);
        assert_eq!(stacking[0].item_id.as_deref(), Some("first"));

        // Listed first, the unlimited unit becomes the base and nothing is reported
        let findings = validate(&[second, first, top], &trailer());
        assert!(of_type(&findings, FindingType::StackingViolation).is_empty());
    }

    #[test]
    fn heavy_unit_on_fragile_base_warns() {
        let base = cargo("glass", 1200, 800, 1000, 200.0).fragile();
        let top = cargo("steel", 1200, 800, 500, 600.0);
        let items = vec![
            place(&base, "low", (6000.0, 0.0, 0.0), 0),
            place(&top, "high", (6000.0, 0.0, 1000.0), 1),
        ];
        let findings = validate(&items, &trailer());
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].kind, FindingType::FragilePlacement);
        assert_eq!(findings[0].severity, Severity::Warning);
        assert_eq!(findings[0].item_id.as_deref(), Some("high"));
    }

    #[test]
    fn floor_level_units_are_not_checked_for_stacking() {
        let top = cargo("top", 1200, 800, 1000, 300.0).not_stackable();
        let items = vec![place(&top, "floor", (6000.0, 0.0, 0.0), 0)];
        assert!(validate(&items, &trailer()).is_empty());
    }

    fn zoned_trailer() -> TrailerBounds {
        trailer()
            .with_zone(TemperatureZone {
                x: 0.0,
                y: 0.0,
                width: 6800.0,
                height: 2450.0,
                temp_min: -20.0,
                temp_max: -15.0,
            })
            .with_zone(TemperatureZone {
                x: 6800.0,
                y: 0.0,
                width: 3400.0,
                height: 2450.0,
                temp_min: 2.0,
                temp_max: 8.0,
            })
    }

    #[test]
    fn temperature_zones_are_skipped_without_zones() {
        let chilled = cargo("chilled", 1200, 800, 1440, 500.0).with_temperature(2.0, Some(6.0));
        let items = vec![place(&chilled, "a", (6200.0, 0.0, 0.0), 0)];
        assert!(validate(&items, &trailer()).is_empty());
    }

    #[test]
    fn temperature_zone_matching() {
        let chilled = cargo("chilled", 1200, 800, 1440, 500.0).with_temperature(2.0, Some(6.0));
        let frozen = cargo("frozen", 1200, 800, 1440, 500.0).with_temperature(-25.0, Some(-18.0));
        let dry = cargo("dry", 1200, 800, 1440, 500.0);
        let items = vec![
            // Center x = 7600 lies in the chilled zone
            place(&chilled, "ok", (7000.0, 0.0, 0.0), 0),
            // Center x = 7600 but needs -25°C
            place(&frozen, "too-warm", (7000.0, 800.0, 0.0), 0),
            // Center x = 11000 lies outside every zone
            place(&chilled, "no-zone", (10400.0, 0.0, 0.0), 0),
            // No temperature requirement, never checked
            place(&dry, "dry", (10400.0, 800.0, 0.0), 0),
        ];
        let findings = validate(&items, &zoned_trailer());
        let temperature = of_type(&findings, FindingType::TemperatureZoneMismatch);
        let ids: Vec<_> = temperature.iter().filter_map(|f| f.item_id.as_deref()).collect();
        assert_eq!(ids, vec!["too-warm", "no-zone"]);
        assert!(temperature.iter().all(|f| f.severity == Severity::Error));
        assert!(temperature[1].message.contains("not in a matching zone"));
    }

    #[test]
    fn hazard_classes_three_and_eight_conflict_when_close() {
        let flammable = cargo("flammable", 600, 400, 400, 50.0).with_hazard_class("3");
        let corrosive = cargo("corrosive", 600, 400, 400, 50.0).with_hazard_class("8");
        let items = vec![
            place(&flammable, "f", (6500.0, 0.0, 0.0), 0),
            place(&corrosive, "c", (6500.0, 600.0, 0.0), 0),
        ];
        let findings = validate(&items, &trailer());
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].kind, FindingType::AdrConflict);
        assert_eq!(findings[0].item_id.as_deref(), Some("f"));

        // Reverse order is caught as well
        let reversed = vec![items[1].clone(), items[0].clone()];
        let findings = validate(&reversed, &trailer());
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].item_id.as_deref(), Some("c"));

        // Exactly 1000 mm apart is no longer adjacent
        let apart = vec![
            place(&flammable, "f", (6000.0, 0.0, 0.0), 0),
            place(&corrosive, "c", (7000.0, 0.0, 0.0), 0),
        ];
        assert!(validate(&apart, &trailer()).is_empty());
    }

    #[test]
    fn hazard_matrix_is_injectable() {
        let oxidizer = cargo("oxidizer", 600, 400, 400, 50.0).with_hazard_class("5.1");
        let explosive = cargo("explosive", 600, 400, 400, 50.0).with_hazard_class("1");
        let items = vec![
            place(&oxidizer, "o", (6500.0, 0.0, 0.0), 0),
            place(&explosive, "e", (6500.0, 600.0, 0.0), 0),
        ];
        assert!(validate(&items, &trailer()).is_empty());

        let config = ValidationConfig::builder()
            .hazard_matrix(HazardMatrix::from_pairs([("1", "5.1")]))
            .build();
        let findings = validate_with_config(&items, &trailer(), &config);
        assert_eq!(of_type(&findings, FindingType::AdrConflict).len(), 1);
    }

    #[test]
    fn validation_is_idempotent() {
        let pallet = cargo("pallet", 1200, 800, 1440, 9000.0);
        let items = vec![
            place(&pallet, "a", (0.0, 0.0, 0.0), 0),
            place(&pallet, "b", (100.0, 0.0, 0.0), 0),
            place(&pallet, "c", (13000.0, 0.0, 0.0), 0),
        ];
        let first = validate(&items, &trailer());
        let second = validate(&items, &trailer());
        assert_eq!(first, second);
        assert!(!first.is_empty());
    }

    #[test]
    fn report_flags_follow_severities() {
        let pallet = cargo("pallet", 1200, 800, 1440, 1000.0);
        let items = vec![place(&pallet, "a", (0.0, 0.0, 0.0), 0)];
        let report = validate_report(&items, &trailer(), &ValidationConfig::default());
        assert!(!report.has_errors);
        assert!(report.has_warnings);
        assert_eq!(report.count(Severity::Warning), 1);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["findings"][0]["type"], "CENTER_OF_GRAVITY_WARNING");
        assert_eq!(json["findings"][0]["severity"], "WARNING");
        assert!(json["findings"][0].get("item_id").is_none());
    }
}
