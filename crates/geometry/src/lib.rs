//! # Geometry
//!
//! Shapes used for zones and body part collision tests: [`Circle`],
//! [`Capsule`] and [`Polygon`], the closed [`Shape`] enum over them, and
//! [`ZoneGeometry`].

mod shape;
mod zone;

pub use shape::{Aabb, Capsule, Circle, Polygon, Shape, Vec2};
pub use zone::ZoneGeometry;
