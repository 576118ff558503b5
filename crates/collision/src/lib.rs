//! # Collision
//!
//! Zone resolution and capsule based collision detection on identified
//! frames.
//!
//! Zones are resolved in place on the identified frame, then ants are
//! partitioned by zone: two ants in different zones never collide.

mod solver;
mod zone;

pub use solver::{AntShapes, CollisionSolver, TypeFilter};
pub use zone::{DefinitionId, ZoneError, ZoneRegistry, ZoneResolver};
