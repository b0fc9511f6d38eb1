use std::collections::BTreeSet;

use tracing::debug;

use crate::domain::Galaxy;

/// A direct gate connection from `source` to `destination`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Edge {
    pub source: i32,
    pub destination: i32,
}

/// Gate connections among `systems`, one per gate.
///
/// A mutual link shows up once from each side, so the result holds both
/// orientations. Systems unknown to the galaxy have no gates and contribute
/// nothing.
pub fn derive_edges(galaxy: &Galaxy, systems: &[i32]) -> Vec<Edge> {
    let members: BTreeSet<i32> = systems.iter().copied().collect();
    let mut edges = Vec::new();

    for &source in &members {
        let Some(system) = galaxy.system(source) else {
            debug!(system_id = source, "system not in galaxy, no gates to follow");
            continue;
        };
        edges.extend(
            system
                .neighbours()
                .filter(|destination| members.contains(destination))
                .map(|destination| Edge {
                    source,
                    destination,
                }),
        );
    }
    edges
}
