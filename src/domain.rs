use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Planet {
    #[serde(rename = "planet_id")]
    pub id: i32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub asteroid_belts: Vec<i32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub moons: Vec<i32>,
}

/// Points at a gate in another system. Only ever resolved by id lookup; the
/// target may live in another region or not exist at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct StargateDestination {
    pub stargate_id: i32,
    pub system_id: i32,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Stargate {
    #[serde(rename = "stargate_id")]
    pub id: i32,
    pub name: String,
    pub type_id: i32,
    pub destination: StargateDestination,
    /// Not written to the galaxy snapshot.
    #[serde(skip)]
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct System {
    #[serde(rename = "system_id")]
    pub id: i32,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub security_class: String,
    pub security_status: f64,
    #[serde(default)]
    pub planets: Vec<Planet>,
    #[serde(default)]
    pub position: Position,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub star_id: Option<i32>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub stargates: BTreeMap<i32, Stargate>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stations: Vec<i32>,
}

impl System {
    /// Systems directly reachable through this system's gates, in gate order.
    pub fn neighbours(&self) -> impl Iterator<Item = i32> + '_ {
        self.stargates
            .values()
            .map(|gate| gate.destination.system_id)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Constellation {
    #[serde(rename = "constellation_id")]
    pub id: i32,
    pub name: String,
    #[serde(default)]
    pub position: Position,
    #[serde(default)]
    pub systems: BTreeMap<i32, System>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Region {
    #[serde(rename = "region_id")]
    pub id: i32,
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub constellations: BTreeMap<i32, Constellation>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SystemLocation {
    pub region_id: i32,
    pub constellation_id: i32,
}

/// The whole assembled universe, keyed by region id.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Galaxy {
    regions: BTreeMap<i32, Region>,
}

impl Galaxy {
    pub fn new(regions: BTreeMap<i32, Region>) -> Self {
        Self { regions }
    }

    pub fn regions(&self) -> &BTreeMap<i32, Region> {
        &self.regions
    }

    pub fn region(&self, id: i32) -> Option<&Region> {
        self.regions.get(&id)
    }

    /// Looks a region up by display name. Layout sources write spaces as
    /// underscores (`The_Forge`), so both spellings match.
    pub fn region_by_name(&self, name: &str) -> Option<&Region> {
        let wanted = name.replace('_', " ");
        self.regions
            .values()
            .find(|region| region.name == name || region.name == wanted)
    }

    pub fn systems(&self) -> impl Iterator<Item = (&Region, &Constellation, &System)> + '_ {
        self.regions.values().flat_map(|region| {
            region.constellations.values().flat_map(move |constellation| {
                constellation
                    .systems
                    .values()
                    .map(move |system| (region, constellation, system))
            })
        })
    }

    pub fn system(&self, id: i32) -> Option<&System> {
        self.regions
            .values()
            .flat_map(|region| region.constellations.values())
            .find_map(|constellation| constellation.systems.get(&id))
    }

    pub fn locate(&self, id: i32) -> Option<SystemLocation> {
        self.systems()
            .find(|(_, _, system)| system.id == id)
            .map(|(region, constellation, _)| SystemLocation {
                region_id: region.id,
                constellation_id: constellation.id,
            })
    }

    /// Display name for a system, falling back to the raw id.
    pub fn system_name(&self, id: i32) -> String {
        match self.system(id) {
            Some(system) if !system.name.is_empty() => system.name.clone(),
            _ => id.to_string(),
        }
    }

    pub fn system_count(&self) -> usize {
        self.systems().count()
    }

    pub fn stargate_count(&self) -> usize {
        self.systems()
            .map(|(_, _, system)| system.stargates.len())
            .sum()
    }
}
