use std::sync::Arc;

use collision::{AntShapes, CollisionSolver, TypeFilter, ZoneRegistry};
use contracts::{CollisionFrame, IdentifiedFrame, RawFrame};
use identification::{CompiledIdentifier, MutableIdentifier};

/// Immutable state shared by the compute workers of one query.
///
/// Built from the editable identifier and zone registry between queries;
/// later edits do not affect it.
#[derive(Debug, Clone, Default)]
pub struct QuerySnapshot {
    identifier: Arc<CompiledIdentifier>,
    solver: Arc<CollisionSolver>,
}

impl QuerySnapshot {
    pub fn new(identifier: CompiledIdentifier, solver: CollisionSolver) -> Self {
        Self {
            identifier: Arc::new(identifier),
            solver: Arc::new(solver),
        }
    }

    /// Compiles the current state of an experiment.
    pub fn compile(
        identifier: &MutableIdentifier,
        zones: &ZoneRegistry,
        shapes: AntShapes,
        filter: TypeFilter,
    ) -> Self {
        Self::new(
            identifier.compile(),
            CollisionSolver::new(zones.compile(), shapes, filter),
        )
    }

    pub fn identifier(&self) -> &CompiledIdentifier {
        &self.identifier
    }

    pub fn solver(&self) -> &CollisionSolver {
        &self.solver
    }

    pub fn identify(&self, frame: &RawFrame, compute_zones: bool) -> IdentifiedFrame {
        let mut identified = self.identifier.identify_frame(frame);
        if compute_zones {
            self.solver.resolve_zones(&mut identified);
        }
        identified
    }

    pub fn collide(&self, frame: &RawFrame) -> (IdentifiedFrame, CollisionFrame) {
        let mut identified = self.identifier.identify_frame(frame);
        let collisions = self.solver.collide(&mut identified);
        (identified, collisions)
    }
}
