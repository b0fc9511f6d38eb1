#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;

use spyglass_mapper::app::{ProgressEvent, ProgressSink};
use spyglass_mapper::domain::StargateDestination;
use spyglass_mapper::error::MapperError;
use spyglass_mapper::esi::{
    UniverseConstellation, UniverseRegion, UniverseSource, UniverseStargate, UniverseSystem,
};
use spyglass_mapper::layout::LayoutSource;
use spyglass_mapper::pipeline::Stage;

pub const REGION: i32 = 10000001;
pub const CONSTELLATION: i32 = 20000001;
pub const ALPHA: i32 = 30000001;
pub const BRAVO: i32 = 30000002;
pub const CHARLIE: i32 = 30000003;

/// In-memory universe: one region, one constellation and the chain
/// Alpha <-> Bravo <-> Charlie.
#[derive(Default)]
pub struct FakeUniverse {
    pub regions: HashMap<i32, UniverseRegion>,
    pub constellations: HashMap<i32, UniverseConstellation>,
    pub systems: HashMap<i32, UniverseSystem>,
    pub stargates: HashMap<i32, UniverseStargate>,
    pub failing: Option<(Stage, i32)>,
    pub calls: Mutex<Vec<(Stage, i32)>>,
}

impl FakeUniverse {
    pub fn chain() -> Self {
        let mut universe = FakeUniverse::default();
        universe.regions.insert(
            REGION,
            UniverseRegion {
                region_id: REGION,
                name: "Test Reach".to_string(),
                description: "A quiet corner".to_string(),
                constellations: vec![CONSTELLATION],
            },
        );
        universe.constellations.insert(
            CONSTELLATION,
            UniverseConstellation {
                constellation_id: CONSTELLATION,
                name: "Chain".to_string(),
                region_id: REGION,
                systems: vec![ALPHA, BRAVO, CHARLIE],
                ..UniverseConstellation::default()
            },
        );
        let links = [
            (50000001, ALPHA, 50000002, BRAVO),
            (50000002, BRAVO, 50000001, ALPHA),
            (50000003, BRAVO, 50000004, CHARLIE),
            (50000004, CHARLIE, 50000003, BRAVO),
        ];
        for (name, id) in [("Alpha", ALPHA), ("Bravo", BRAVO), ("Charlie", CHARLIE)] {
            universe.systems.insert(
                id,
                UniverseSystem {
                    system_id: id,
                    name: name.to_string(),
                    constellation_id: CONSTELLATION,
                    security_class: "B".to_string(),
                    security_status: 0.5,
                    stargates: links
                        .iter()
                        .filter(|link| link.1 == id)
                        .map(|link| link.0)
                        .collect(),
                    ..UniverseSystem::default()
                },
            );
        }
        for (gate, system, target_gate, target_system) in links {
            universe.stargates.insert(
                gate,
                UniverseStargate {
                    stargate_id: gate,
                    name: format!("Stargate ({target_system})"),
                    system_id: system,
                    type_id: 29624,
                    destination: StargateDestination {
                        stargate_id: target_gate,
                        system_id: target_system,
                    },
                    ..UniverseStargate::default()
                },
            );
        }
        universe
    }

    pub fn failing_at(mut self, stage: Stage, id: i32) -> Self {
        self.failing = Some((stage, id));
        self
    }

    pub fn recorded(&self) -> Vec<(Stage, i32)> {
        self.calls.lock().unwrap().clone()
    }

    fn lookup<T: Clone>(&self, stage: Stage, id: i32, table: &HashMap<i32, T>) -> Result<T, MapperError> {
        self.calls.lock().unwrap().push((stage, id));
        if self.failing == Some((stage, id)) {
            return Err(MapperError::RetriesExceeded {
                url: format!("fake://{stage}/{id}"),
                attempts: 8,
            });
        }
        table.get(&id).cloned().ok_or_else(|| MapperError::RetriesExceeded {
            url: format!("fake://{stage}/{id}"),
            attempts: 8,
        })
    }
}

impl UniverseSource for FakeUniverse {
    fn region_ids(&self) -> Result<Vec<i32>, MapperError> {
        let mut ids: Vec<i32> = self.regions.keys().copied().collect();
        ids.sort();
        Ok(ids)
    }

    fn region(&self, id: i32) -> Result<UniverseRegion, MapperError> {
        self.lookup(Stage::Region, id, &self.regions)
    }

    fn constellation(&self, id: i32) -> Result<UniverseConstellation, MapperError> {
        self.lookup(Stage::Constellation, id, &self.constellations)
    }

    fn system(&self, id: i32) -> Result<UniverseSystem, MapperError> {
        self.lookup(Stage::System, id, &self.systems)
    }

    fn stargate(&self, id: i32) -> Result<UniverseStargate, MapperError> {
        self.lookup(Stage::Stargate, id, &self.stargates)
    }
}

/// Chart of the test region: Alpha and Bravo inside, Charlie on the border.
pub const TEST_REACH_CHART: &str = r##"<?xml version="1.0" encoding="UTF-8"?>
<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink" width="1024" height="768">
  <defs>
    <symbol id="def30000001"><rect id="rect30000001" class="s" x="0" y="0" width="50" height="22"/></symbol>
    <symbol id="def30000002"><rect id="rect30000002" class="s" x="0" y="0" width="50" height="22"/></symbol>
    <symbol id="def30000003"><rect id="rect30000003" class="e" x="0" y="0" width="50" height="22"/></symbol>
  </defs>
  <g id="sysuse">
    <use id="sys30000001" xlink:href="#def30000001" x="100" y="100" width="62.5" height="30"/>
    <use id="sys30000002" xlink:href="#def30000002" x="300" y="100" width="62.5" height="30"/>
    <use id="sys30000003" xlink:href="#def30000003" x="500" y="300" width="62.5" height="30"/>
  </g>
</svg>
"##;

/// Serves fixed charts by region name; anything else is unreachable.
#[derive(Default)]
pub struct FakeLayouts {
    pub charts: HashMap<String, String>,
}

impl FakeLayouts {
    pub fn with_chart(mut self, region: &str, svg: &str) -> Self {
        self.charts.insert(region.to_string(), svg.to_string());
        self
    }
}

impl LayoutSource for FakeLayouts {
    fn fetch_layout(&self, region: &str) -> Result<String, MapperError> {
        self.charts
            .get(region)
            .cloned()
            .ok_or_else(|| MapperError::RegionImport {
                region: region.to_string(),
                message: "returned status 404".to_string(),
            })
    }
}

#[derive(Default)]
pub struct RecordingSink {
    pub messages: Mutex<Vec<String>>,
}

impl ProgressSink for RecordingSink {
    fn event(&self, event: ProgressEvent) {
        self.messages.lock().unwrap().push(event.message);
    }
}
