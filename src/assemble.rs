use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{info, warn};

use crate::domain::{Constellation, Galaxy, Region, Stargate, System};
use crate::pipeline::FetchedUniverse;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChildKind {
    Constellation,
    System,
    Stargate,
}

/// A child id declared by a parent but missing from the fetched results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DanglingReference {
    pub kind: ChildKind,
    pub parent_id: i32,
    pub child_id: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AssemblyReport {
    pub regions: usize,
    pub constellations: usize,
    pub systems: usize,
    pub stargates: usize,
    pub dangling: Vec<DanglingReference>,
}

/// Folds the flat stage results into the owned hierarchy.
///
/// Children are keyed by the id their parent declared. Declared ids with no
/// fetched entity are left out and recorded in the report.
pub fn assemble(universe: &FetchedUniverse) -> (Galaxy, AssemblyReport) {
    let mut report = AssemblyReport::default();
    let mut regions = BTreeMap::new();

    let mut region_ids: Vec<i32> = universe.regions.keys().copied().collect();
    region_ids.sort_unstable();

    for region_id in region_ids {
        let fetched = &universe.regions[&region_id];
        let mut region = Region {
            id: region_id,
            name: fetched.name.clone(),
            description: fetched.description.clone(),
            constellations: BTreeMap::new(),
        };

        for &constellation_id in &fetched.constellations {
            let Some(source) = universe.constellations.get(&constellation_id) else {
                report.dangle(ChildKind::Constellation, region_id, constellation_id);
                continue;
            };
            let mut constellation = Constellation {
                id: constellation_id,
                name: source.name.clone(),
                position: source.position,
                systems: BTreeMap::new(),
            };

            for &system_id in &source.systems {
                let Some(source) = universe.systems.get(&system_id) else {
                    report.dangle(ChildKind::System, constellation_id, system_id);
                    continue;
                };
                let mut system = System {
                    id: system_id,
                    name: source.name.clone(),
                    security_class: source.security_class.clone(),
                    security_status: source.security_status,
                    planets: source.planets.clone(),
                    position: source.position,
                    star_id: source.star_id,
                    stargates: BTreeMap::new(),
                    stations: source.stations.clone(),
                };

                for &stargate_id in &source.stargates {
                    let Some(source) = universe.stargates.get(&stargate_id) else {
                        report.dangle(ChildKind::Stargate, system_id, stargate_id);
                        continue;
                    };
                    system.stargates.insert(
                        stargate_id,
                        Stargate {
                            id: stargate_id,
                            name: source.name.clone(),
                            type_id: source.type_id,
                            destination: source.destination,
                            position: source.position,
                        },
                    );
                    report.stargates += 1;
                }

                constellation.systems.insert(system_id, system);
                report.systems += 1;
            }

            region.constellations.insert(constellation_id, constellation);
            report.constellations += 1;
        }

        regions.insert(region_id, region);
        report.regions += 1;
    }

    info!(
        regions = report.regions,
        constellations = report.constellations,
        systems = report.systems,
        stargates = report.stargates,
        dangling = report.dangling.len(),
        "assembled galaxy"
    );
    (Galaxy::new(regions), report)
}

impl AssemblyReport {
    fn dangle(&mut self, kind: ChildKind, parent_id: i32, child_id: i32) {
        warn!(?kind, parent_id, child_id, "dangling reference omitted");
        self.dangling.push(DanglingReference {
            kind,
            parent_id,
            child_id,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::StargateDestination;
    use crate::esi::{UniverseConstellation, UniverseRegion, UniverseStargate, UniverseSystem};

    fn universe() -> FetchedUniverse {
        let mut universe = FetchedUniverse::default();
        universe.regions.insert(
            1,
            UniverseRegion {
                region_id: 1,
                name: "Alpha".to_string(),
                description: "first".to_string(),
                constellations: vec![10, 11],
            },
        );
        universe.constellations.insert(
            10,
            UniverseConstellation {
                constellation_id: 10,
                name: "Ten".to_string(),
                region_id: 1,
                systems: vec![100, 101],
                ..UniverseConstellation::default()
            },
        );
        universe.systems.insert(
            100,
            UniverseSystem {
                system_id: 100,
                name: "Hundred".to_string(),
                security_status: 0.5,
                stargates: vec![1000, 1001],
                ..UniverseSystem::default()
            },
        );
        universe.stargates.insert(
            1000,
            UniverseStargate {
                stargate_id: 1000,
                name: "Stargate (Elsewhere)".to_string(),
                system_id: 100,
                type_id: 16,
                destination: StargateDestination {
                    stargate_id: 9999,
                    system_id: 999,
                },
                ..UniverseStargate::default()
            },
        );
        universe
    }

    #[test]
    fn missing_children_are_omitted() {
        let (galaxy, report) = assemble(&universe());
        let region = galaxy.region(1).unwrap();
        assert_eq!(region.constellations.len(), 1);
        let constellation = &region.constellations[&10];
        assert_eq!(constellation.systems.keys().copied().collect::<Vec<_>>(), vec![100]);
        let system = &constellation.systems[&100];
        assert_eq!(system.stargates.len(), 1);
        assert_eq!(
            report.dangling,
            vec![
                DanglingReference {
                    kind: ChildKind::Stargate,
                    parent_id: 100,
                    child_id: 1001,
                },
                DanglingReference {
                    kind: ChildKind::System,
                    parent_id: 10,
                    child_id: 101,
                },
                DanglingReference {
                    kind: ChildKind::Constellation,
                    parent_id: 1,
                    child_id: 11,
                },
            ]
        );
    }

    #[test]
    fn fields_are_copied_into_place() {
        let (galaxy, report) = assemble(&universe());
        let system = galaxy.system(100).unwrap();
        assert_eq!(system.name, "Hundred");
        assert_eq!(system.security_status, 0.5);
        let gate = &system.stargates[&1000];
        assert_eq!(gate.destination.system_id, 999);
        assert_eq!(gate.type_id, 16);
        assert_eq!(galaxy.region(1).unwrap().description, "first");
        assert_eq!(
            (report.regions, report.constellations, report.systems, report.stargates),
            (1, 1, 1, 1)
        );
    }
}
