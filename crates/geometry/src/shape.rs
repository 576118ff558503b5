//! Primitive shapes.
//!
//! All shapes are immutable values in image (pixel) coordinates. Body part
//! capsules are described in the ant's own frame and moved into the image with
//! [`Capsule::transformed`].

use nalgebra::{Rotation2, Vector2};

/// Point or vector in image coordinates.
pub type Vec2 = Vector2<f64>;

const EPSILON: f64 = 1e-12;

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec2,
    pub max: Vec2,
}

impl Aabb {
    pub fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    /// Box of no points; the identity of [`Aabb::union`].
    pub fn empty() -> Self {
        Self {
            min: Vec2::new(f64::INFINITY, f64::INFINITY),
            max: Vec2::new(f64::NEG_INFINITY, f64::NEG_INFINITY),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y
    }

    pub fn contains(&self, p: &Vec2) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: self.min.inf(&other.min),
            max: self.max.sup(&other.max),
        }
    }

    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min.x <= other.max.x
            && other.min.x <= self.max.x
            && self.min.y <= other.max.y
            && other.min.y <= self.max.y
    }
}

/// Disc.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Circle {
    pub center: Vec2,
    pub radius: f64,
}

impl Circle {
    pub fn new(center: Vec2, radius: f64) -> Self {
        Self { center, radius }
    }

    pub fn contains(&self, p: &Vec2) -> bool {
        (p - self.center).norm_squared() <= self.radius * self.radius
    }

    pub fn bounding_box(&self) -> Aabb {
        let r = Vec2::new(self.radius, self.radius);
        Aabb::new(self.center - r, self.center + r)
    }
}

/// Convex hull of two circles of possibly different radii.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Capsule {
    pub c1: Vec2,
    pub c2: Vec2,
    pub r1: f64,
    pub r2: f64,
}

impl Capsule {
    pub fn new(c1: Vec2, c2: Vec2, r1: f64, r2: f64) -> Self {
        Self { c1, c2, r1, r2 }
    }

    /// Radius at parameter `t` along the axis.
    #[inline]
    fn radius_at(&self, t: f64) -> f64 {
        self.r1 + t * (self.r2 - self.r1)
    }

    /// Moves a capsule from an ant frame into the image: rotate by `angle`
    /// then translate by `position`.
    pub fn transformed(&self, position: &Vec2, angle: f64) -> Capsule {
        let rot = Rotation2::new(angle);
        Capsule {
            c1: rot * self.c1 + position,
            c2: rot * self.c2 + position,
            r1: self.r1,
            r2: self.r2,
        }
    }

    pub fn contains(&self, p: &Vec2) -> bool {
        let axis = self.c2 - self.c1;
        let len2 = axis.norm_squared();
        let t = if len2 <= EPSILON {
            0.0
        } else {
            ((p - self.c1).dot(&axis) / len2).clamp(0.0, 1.0)
        };
        let closest = self.c1 + axis * t;
        let r = self.radius_at(t);
        (p - closest).norm_squared() <= r * r
    }

    /// Closest approach of both axes, radii interpolated at the closest
    /// points.
    pub fn intersects(&self, other: &Capsule) -> bool {
        let (s, t, a, b) = closest_points_segments(&self.c1, &self.c2, &other.c1, &other.c2);
        let reach = self.radius_at(s) + other.radius_at(t);
        (a - b).norm_squared() <= reach * reach
    }

    pub fn bounding_box(&self) -> Aabb {
        Circle::new(self.c1, self.r1)
            .bounding_box()
            .union(&Circle::new(self.c2, self.r2).bounding_box())
    }
}

/// Closest points between segments `[p1, q1]` and `[p2, q2]`.
///
/// Returns `(s, t, c1, c2)` with `c1 = p1 + s (q1 - p1)` and
/// `c2 = p2 + t (q2 - p2)`, `s, t` in `[0, 1]`.
fn closest_points_segments(p1: &Vec2, q1: &Vec2, p2: &Vec2, q2: &Vec2) -> (f64, f64, Vec2, Vec2) {
    let d1 = q1 - p1;
    let d2 = q2 - p2;
    let r = p1 - p2;
    let a = d1.norm_squared();
    let e = d2.norm_squared();
    let f = d2.dot(&r);

    let (s, t) = if a <= EPSILON && e <= EPSILON {
        (0.0, 0.0)
    } else if a <= EPSILON {
        (0.0, (f / e).clamp(0.0, 1.0))
    } else {
        let c = d1.dot(&r);
        if e <= EPSILON {
            ((-c / a).clamp(0.0, 1.0), 0.0)
        } else {
            let b = d1.dot(&d2);
            let denom = a * e - b * b;
            let mut s = if denom > EPSILON {
                ((b * f - c * e) / denom).clamp(0.0, 1.0)
            } else {
                0.0
            };
            let mut t = (b * s + f) / e;
            if t < 0.0 {
                t = 0.0;
                s = (-c / a).clamp(0.0, 1.0);
            } else if t > 1.0 {
                t = 1.0;
                s = ((b - c) / a).clamp(0.0, 1.0);
            }
            (s, t)
        }
    };
    (s, t, p1 + d1 * s, p2 + d2 * t)
}

/// Simple polygon (no self intersection), vertices in order.
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    vertices: Vec<Vec2>,
}

impl Polygon {
    pub fn new(vertices: Vec<Vec2>) -> Self {
        Self { vertices }
    }

    pub fn vertices(&self) -> &[Vec2] {
        &self.vertices
    }

    /// Even-odd ray casting.
    pub fn contains(&self, p: &Vec2) -> bool {
        let n = self.vertices.len();
        if n < 3 {
            return false;
        }
        let mut inside = false;
        let mut j = n - 1;
        for i in 0..n {
            let vi = &self.vertices[i];
            let vj = &self.vertices[j];
            if (vi.y > p.y) != (vj.y > p.y) {
                let x_cross = vj.x + (p.y - vj.y) / (vi.y - vj.y) * (vi.x - vj.x);
                if p.x < x_cross {
                    inside = !inside;
                }
            }
            j = i;
        }
        inside
    }

    pub fn bounding_box(&self) -> Aabb {
        self.vertices.iter().fold(Aabb::empty(), |acc, v| Aabb {
            min: acc.min.inf(v),
            max: acc.max.sup(v),
        })
    }
}

/// Closed set of shapes usable in zone definitions.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Circle(Circle),
    Capsule(Capsule),
    Polygon(Polygon),
}

impl Shape {
    pub fn contains(&self, p: &Vec2) -> bool {
        match self {
            Shape::Circle(c) => c.contains(p),
            Shape::Capsule(c) => c.contains(p),
            Shape::Polygon(poly) => poly.contains(p),
        }
    }

    pub fn bounding_box(&self) -> Aabb {
        match self {
            Shape::Circle(c) => c.bounding_box(),
            Shape::Capsule(c) => c.bounding_box(),
            Shape::Polygon(poly) => poly.bounding_box(),
        }
    }
}

impl From<Circle> for Shape {
    fn from(value: Circle) -> Self {
        Shape::Circle(value)
    }
}

impl From<Capsule> for Shape {
    fn from(value: Capsule) -> Self {
        Shape::Capsule(value)
    }
}

impl From<Polygon> for Shape {
    fn from(value: Polygon) -> Self {
        Shape::Polygon(value)
    }
}
