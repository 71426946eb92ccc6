use glam::{Affine2, Vec2};

/// Axis-aligned 2D bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb2 {
    pub min: Vec2,
    pub max: Vec2,
}

impl Aabb2 {
    /// An inverted box that any included point replaces.
    pub const EMPTY: Aabb2 = Aabb2 {
        min: Vec2::splat(f32::INFINITY),
        max: Vec2::splat(f32::NEG_INFINITY),
    };

    #[must_use]
    pub fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    #[must_use]
    pub fn from_points(points: impl IntoIterator<Item = Vec2>) -> Option<Self> {
        let mut bounds = Self::EMPTY;
        for p in points {
            bounds.include(p);
        }
        bounds.is_valid().then_some(bounds)
    }

    pub fn include(&mut self, point: Vec2) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.min.x <= self.max.x && self.min.y <= self.max.y
    }

    #[inline]
    #[must_use]
    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }

    #[inline]
    #[must_use]
    pub fn size(&self) -> Vec2 {
        self.max - self.min
    }

    #[must_use]
    pub fn union(&self, other: &Aabb2) -> Aabb2 {
        Aabb2 {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }
}

/// Linear blend of up to four bone influences, the same sum the skinning
/// shader computes. Weights summing to zero leave the position untouched.
#[must_use]
pub fn skin_position(
    position: Vec2,
    bone_indices: [f32; 4],
    weights: [f32; 4],
    bones: &[Affine2],
) -> Vec2 {
    let mut blended = Vec2::ZERO;
    let mut total = 0.0;
    for (index, weight) in bone_indices.into_iter().zip(weights) {
        if weight == 0.0 {
            continue;
        }
        let bone = bones
            .get(index as usize)
            .copied()
            .unwrap_or(Affine2::IDENTITY);
        blended += bone.transform_point2(position) * weight;
        total += weight;
    }
    if total == 0.0 { position } else { blended }
}
