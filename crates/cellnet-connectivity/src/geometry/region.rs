// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
3D regions used for axonal arbours and bounding volumes.
*/

use serde::{Deserialize, Serialize};

use super::Point3;

/// A closed 3D volume
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Region {
    /// Axis-aligned box spanning `corner` to `corner + size`
    Rectangular { corner: Point3, size: Point3 },
    Spherical { centre: Point3, radius: f32 },
    /// Cylinder around the axis from `start` to `end`
    Cylindrical {
        start: Point3,
        end: Point3,
        radius: f32,
    },
    /// Cone whose radius shrinks linearly from `base_radius` to zero at `apex`
    Conical {
        base_centre: Point3,
        apex: Point3,
        base_radius: f32,
    },
}

/// Sphere enclosing some geometry
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingSphere {
    pub centre: Point3,
    pub radius: f32,
}

impl BoundingSphere {
    /// Smallest distance from `point` to anything inside the sphere
    pub fn min_distance_from(&self, point: Point3) -> f32 {
        (point.distance_to(self.centre) - self.radius).max(0.0)
    }

    /// Sphere around an axis-aligned box: centred on its midpoint, touching its corners
    pub fn around_box(min: Point3, max: Point3) -> Self {
        let centre = min.lerp(max, 0.5);
        Self {
            centre,
            radius: centre.distance_to(min),
        }
    }
}

impl Region {
    /// Same region moved by `offset`
    pub fn translated(&self, offset: Point3) -> Region {
        match self {
            Region::Rectangular { corner, size } => Region::Rectangular {
                corner: *corner + offset,
                size: *size,
            },
            Region::Spherical { centre, radius } => Region::Spherical {
                centre: *centre + offset,
                radius: *radius,
            },
            Region::Cylindrical { start, end, radius } => Region::Cylindrical {
                start: *start + offset,
                end: *end + offset,
                radius: *radius,
            },
            Region::Conical {
                base_centre,
                apex,
                base_radius,
            } => Region::Conical {
                base_centre: *base_centre + offset,
                apex: *apex + offset,
                base_radius: *base_radius,
            },
        }
    }

    pub fn contains(&self, point: Point3) -> bool {
        match self {
            Region::Rectangular { corner, size } => {
                let far = *corner + *size;
                let low = corner.component_min(far);
                let high = corner.component_max(far);
                point.x >= low.x
                    && point.x <= high.x
                    && point.y >= low.y
                    && point.y <= high.y
                    && point.z >= low.z
                    && point.z <= high.z
            }
            Region::Spherical { centre, radius } => point.distance_to(*centre) <= *radius,
            Region::Cylindrical { start, end, radius } => {
                match axial_position(*start, *end, point) {
                    Some((height, along, off_axis)) => {
                        along >= 0.0 && along <= height && off_axis <= *radius
                    }
                    // Degenerate axis
                    None => point.distance_to(*start) <= *radius,
                }
            }
            Region::Conical {
                base_centre,
                apex,
                base_radius,
            } => match axial_position(*base_centre, *apex, point) {
                Some((height, along, off_axis)) => {
                    if along < 0.0 || along > height {
                        return false;
                    }
                    let allowed = base_radius - along * base_radius / height;
                    off_axis <= allowed
                }
                None => false,
            },
        }
    }

    pub fn enclosing_sphere(&self) -> BoundingSphere {
        match self {
            Region::Rectangular { corner, size } => {
                let far = *corner + *size;
                BoundingSphere::around_box(corner.component_min(far), corner.component_max(far))
            }
            Region::Spherical { centre, radius } => BoundingSphere {
                centre: *centre,
                radius: *radius,
            },
            Region::Cylindrical { start, end, radius } => {
                let centre = start.lerp(*end, 0.5);
                let half = start.distance_to(*end) / 2.0;
                BoundingSphere {
                    centre,
                    radius: (half * half + radius * radius).sqrt(),
                }
            }
            Region::Conical {
                base_centre,
                apex,
                base_radius,
            } => {
                let centre = base_centre.lerp(*apex, 0.5);
                let half = base_centre.distance_to(*apex) / 2.0;
                BoundingSphere {
                    centre,
                    radius: (half * half + base_radius * base_radius).sqrt(),
                }
            }
        }
    }
}

/// Decomposes `point` relative to the axis `from -> to`.
///
/// Returns (axis length, position along the axis, distance from the axis),
/// or `None` when the axis has zero length.
fn axial_position(from: Point3, to: Point3, point: Point3) -> Option<(f32, f32, f32)> {
    let axis = to - from;
    let height = axis.norm();
    if height == 0.0 {
        return None;
    }
    let relative = point - from;
    let along = relative.dot(axis) / height;
    let off_axis_sq = (relative.dot(relative) - along * along).max(0.0);
    Some((height, along, off_axis_sq.sqrt()))
}

/// Named axonal arbour region attached to a cell type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AxonalArbour {
    pub name: String,
    /// Region relative to the pre-synaptic attachment point
    pub region: Region,
}

impl AxonalArbour {
    pub fn new(name: impl Into<String>, region: Region) -> Self {
        Self {
            name: name.into(),
            region,
        }
    }
}
