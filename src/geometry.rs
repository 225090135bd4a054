//! Geometric predicates shared by the packer and the validator.
//!
//! Every test works on effective dimensions, i.e. after the box's rotation
//! about the vertical axis has been applied.

use serde::Serialize;
use utoipa::ToSchema;

use crate::model::{CargoBox, Dimensions, TrailerBounds};
use crate::types::{BoundingBox, CenterOfMassCalculator, Weighted};

/// Dimensions of a box after applying its rotation.
///
/// Quarter turns swap length and width. Height never changes because
/// units are never tipped onto a side.
pub fn effective_dimensions<B: CargoBox>(b: &B) -> Dimensions {
    b.dimensions().rotated(b.rotation())
}

fn bounds_of<B: CargoBox>(b: &B) -> BoundingBox {
    BoundingBox::of(b)
}

/// Checks whether two boxes occupy common space.
///
/// Open intervals on all three axes: boxes sharing a face are flush, not
/// overlapping.
///
/// # Examples
/// ```
/// use load_planner::geometry::overlap;
/// use load_planner::model::{Dimensions, PlacedBox};
/// use load_planner::types::Vec3;
///
/// let dims = Dimensions::new(1000, 800, 1000).unwrap();
/// let a = PlacedBox::new("a", Vec3::zero(), dims, 1000.0);
/// let b = PlacedBox::new("b", Vec3::new(1000.0, 0.0, 0.0), dims, 1000.0);
/// assert!(!overlap(&a, &b));
/// ```
pub fn overlap<A: CargoBox, B: CargoBox>(a: &A, b: &B) -> bool {
    bounds_of(a).intersects(&bounds_of(b))
}

/// Checks whether the floor-plane footprints of two boxes overlap.
///
/// Same open-interval semantics as [`overlap`], ignoring height.
pub fn footprints_overlap<A: CargoBox, B: CargoBox>(a: &A, b: &B) -> bool {
    bounds_of(a).overlaps_xy(&bounds_of(b))
}

/// Checks whether a box lies completely inside the trailer.
///
/// The upper bound is closed, so a box filling the trailer exactly is valid.
pub fn within_bounds<B: CargoBox>(b: &B, trailer: &TrailerBounds) -> bool {
    b.position().is_valid_position() && bounds_of(b).is_inside(&trailer.bounding_box())
}

/// Z coordinate of the top face of a box.
pub fn top_z<B: CargoBox>(b: &B) -> f64 {
    bounds_of(b).top_z()
}

/// Weighted center of gravity of a load.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, ToSchema)]
pub struct CenterOfGravity {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub total_weight: f64,
}

/// Computes the weight-weighted average of all box centers.
///
/// An empty input (or zero total weight) yields the all-zero value.
pub fn center_of_gravity<B: CargoBox>(boxes: &[B]) -> CenterOfGravity {
    let mut calc = CenterOfMassCalculator::new();
    for b in boxes {
        calc.add_point(bounds_of(b).center(), b.weight_kg());
    }

    match calc.compute() {
        Some(center) => CenterOfGravity {
            x: center.x,
            y: center.y,
            z: center.z,
            total_weight: calc.total_weight(),
        },
        None => CenterOfGravity {
            total_weight: calc.total_weight(),
            ..CenterOfGravity::default()
        },
    }
}

/// Result of a pairwise collision sweep.
#[derive(Clone, Debug, Default, PartialEq, Serialize, ToSchema)]
pub struct CollisionReport {
    pub has_collision: bool,
    /// Ids of every box involved in at least one collision, first-seen order
    pub colliding_ids: Vec<String>,
}

/// Tests every pair of boxes for overlap.
///
/// Each offending id is reported once, in the order it was first seen.
pub fn detect_collisions<B: CargoBox>(boxes: &[B]) -> CollisionReport {
    let bounds: Vec<BoundingBox> = boxes.iter().map(|b| bounds_of(b)).collect();
    let mut colliding_ids: Vec<String> = Vec::new();

    for i in 0..boxes.len() {
        for j in (i + 1)..boxes.len() {
            if !bounds[i].intersects(&bounds[j]) {
                continue;
            }
            for id in [boxes[i].box_id(), boxes[j].box_id()] {
                if !colliding_ids.iter().any(|seen| seen == id) {
                    colliding_ids.push(id.to_string());
                }
            }
        }
    }

    CollisionReport {
        has_collision: !colliding_ids.is_empty(),
        colliding_ids,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{PlacedBox, Rotation};
    use crate::types::Vec3;

    fn dims(length: u32, width: u32, height: u32) -> Dimensions {
        Dimensions::new(length, width, height).unwrap()
    }

    fn cube(id: &str, pos: (f64, f64, f64), weight: f64) -> PlacedBox {
        PlacedBox::new(id, Vec3::from(pos), dims(1000, 800, 1000), weight)
    }

    fn trailer() -> TrailerBounds {
        TrailerBounds::new(5000, 2500, 3000, 24000.0).unwrap()
    }

    #[test]
    fn effective_dimensions_follow_rotation() {
        let b = PlacedBox::new("a", Vec3::zero(), dims(1200, 800, 1440), 10.0);
        assert_eq!(effective_dimensions(&b), dims(1200, 800, 1440));
        let turned = b.clone().with_rotation(Rotation::Deg270);
        assert_eq!(effective_dimensions(&turned), dims(800, 1200, 1440));
    }

    #[test]
    fn overlapping_boxes_collide() {
        let a = cube("a", (0.0, 0.0, 0.0), 1000.0);
        let b = cube("b", (500.0, 400.0, 500.0), 1000.0);
        assert!(overlap(&a, &b));

        let moved = b.at(Vec3::new(2000.0, 0.0, 0.0));
        assert!(!overlap(&a, &moved));
    }

    #[test]
    fn flush_boxes_do_not_collide_on_any_axis() {
        let a = cube("a", (0.0, 0.0, 0.0), 1000.0);
        assert!(!overlap(&a, &cube("x", (1000.0, 0.0, 0.0), 1.0)));
        assert!(!overlap(&a, &cube("y", (0.0, 800.0, 0.0), 1.0)));
        assert!(!overlap(&a, &cube("z", (0.0, 0.0, 1000.0), 1.0)));
    }

    #[test]
    fn rotation_changes_overlap() {
        // 1200 x 800 at the origin, neighbour starts at x = 1000
        let a = PlacedBox::new("a", Vec3::zero(), dims(1200, 800, 1000), 1.0);
        let b = PlacedBox::new("b", Vec3::new(1000.0, 0.0, 0.0), dims(500, 500, 500), 1.0);
        assert!(overlap(&a, &b));
        assert!(!overlap(&a.with_rotation(Rotation::Deg90), &b));
    }

    #[test]
    fn footprint_overlap_ignores_height() {
        let a = cube("a", (0.0, 0.0, 0.0), 1.0);
        let b = cube("b", (500.0, 0.0, 1000.0), 1.0);
        assert!(!overlap(&a, &b));
        assert!(footprints_overlap(&a, &b));
    }

    #[test]
    fn within_bounds_is_closed_and_strict_by_one_millimeter() {
        let t = trailer();
        let exact = PlacedBox::new("full", Vec3::zero(), dims(5000, 2500, 3000), 1.0);
        assert!(within_bounds(&exact, &t));

        let inside = cube("a", (4000.0, 1700.0, 2000.0), 1.0);
        assert!(within_bounds(&inside, &t));
        assert!(!within_bounds(&inside.clone().at(Vec3::new(4001.0, 1700.0, 2000.0)), &t));
        assert!(!within_bounds(&inside.clone().at(Vec3::new(4000.0, 1701.0, 2000.0)), &t));
        assert!(!within_bounds(&inside.clone().at(Vec3::new(4000.0, 1700.0, 2001.0)), &t));

        let origin = cube("b", (0.0, 0.0, 0.0), 1.0);
        assert!(!within_bounds(&origin.clone().at(Vec3::new(-1.0, 0.0, 0.0)), &t));
        assert!(!within_bounds(&origin.at(Vec3::new(0.0, -1.0, 0.0)), &t));
    }

    #[test]
    fn within_bounds_uses_effective_dimensions() {
        let t = trailer();
        // 800 wide fits at y = 1700, 1200 wide does not
        let b = PlacedBox::new("a", Vec3::new(0.0, 1700.0, 0.0), dims(1200, 800, 1000), 1.0);
        assert!(within_bounds(&b, &t));
        assert!(!within_bounds(&b.with_rotation(Rotation::Deg90), &t));
    }

    #[test]
    fn center_of_gravity_weighted_average() {
        let boxes = vec![
            PlacedBox::new("a", Vec3::zero(), dims(1000, 1000, 1000), 1000.0),
            PlacedBox::new(
                "b",
                Vec3::new(2000.0, 0.0, 0.0),
                dims(1000, 1000, 1000),
                2000.0,
            ),
        ];
        let cog = center_of_gravity(&boxes);
        assert!((cog.x - 1833.333).abs() < 0.01);
        assert!((cog.y - 500.0).abs() < 1e-9);
        assert!((cog.z - 500.0).abs() < 1e-9);
        assert_eq!(cog.total_weight, 3000.0);
    }

    #[test]
    fn center_of_gravity_empty_is_zero() {
        let cog = center_of_gravity::<PlacedBox>(&[]);
        assert_eq!(cog, CenterOfGravity::default());
        assert_eq!(cog.total_weight, 0.0);
    }

    #[test]
    fn center_of_gravity_ignores_input_order() {
        let boxes = vec![
            cube("a", (0.0, 0.0, 0.0), 300.0),
            cube("b", (3000.0, 1200.0, 0.0), 700.0),
            cube("c", (1500.0, 0.0, 1000.0), 450.0),
        ];
        let mut reversed = boxes.clone();
        reversed.reverse();

        let forward = center_of_gravity(&boxes);
        let backward = center_of_gravity(&reversed);
        assert!((forward.x - backward.x).abs() < 1e-9);
        assert!((forward.y - backward.y).abs() < 1e-9);
        assert!((forward.z - backward.z).abs() < 1e-9);
        assert_eq!(forward.total_weight, backward.total_weight);
    }

    #[test]
    fn detect_collisions_reports_each_id_once_in_first_seen_order() {
        let boxes = vec![
            cube("a", (0.0, 0.0, 0.0), 1.0),
            cube("b", (500.0, 0.0, 0.0), 1.0),
            cube("c", (3000.0, 0.0, 0.0), 1.0),
            cube("d", (200.0, 100.0, 0.0), 1.0),
        ];
        let report = detect_collisions(&boxes);
        assert!(report.has_collision);
        assert_eq!(report.colliding_ids, vec!["a", "b", "d"]);
    }

    #[test]
    fn detect_collisions_clean_load() {
        let boxes = vec![
            cube("a", (0.0, 0.0, 0.0), 1.0),
            cube("b", (1000.0, 0.0, 0.0), 1.0),
            cube("c", (0.0, 0.0, 1000.0), 1.0),
        ];
        let report = detect_collisions(&boxes);
        assert!(!report.has_collision);
        assert!(report.colliding_ids.is_empty());
    }
}
