//! Zone geometry: a union of shapes with precomputed bounding boxes.

use crate::{Aabb, Shape, Vec2};

/// Union of shapes. Bounding boxes are computed once so that most points
/// are rejected without an exact test.
#[derive(Debug, Clone, PartialEq)]
pub struct ZoneGeometry {
    shapes: Vec<Shape>,
    boxes: Vec<Aabb>,
    global: Aabb,
}

impl ZoneGeometry {
    pub fn new(shapes: Vec<Shape>) -> Self {
        let boxes: Vec<Aabb> = shapes.iter().map(Shape::bounding_box).collect();
        let global = boxes.iter().fold(Aabb::empty(), |acc, b| acc.union(b));
        Self {
            shapes,
            boxes,
            global,
        }
    }

    pub fn shapes(&self) -> &[Shape] {
        &self.shapes
    }

    pub fn bounding_box(&self) -> &Aabb {
        &self.global
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    pub fn contains(&self, p: &Vec2) -> bool {
        if !self.global.contains(p) {
            return false;
        }
        self.shapes
            .iter()
            .zip(&self.boxes)
            .any(|(shape, bb)| bb.contains(p) && shape.contains(p))
    }
}
