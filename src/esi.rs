use serde::{Deserialize, Serialize};

use crate::domain::{Planet, Position, StargateDestination};
use crate::error::MapperError;
use crate::fetch::{FetchClient, Transport};

pub const DEFAULT_ESI_BASE_URL: &str = "https://esi.evetech.net";

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct UniverseRegion {
    pub region_id: i32,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub constellations: Vec<i32>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct UniverseConstellation {
    pub constellation_id: i32,
    pub name: String,
    #[serde(default)]
    pub position: Position,
    #[serde(default)]
    pub region_id: i32,
    #[serde(default)]
    pub systems: Vec<i32>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct UniverseSystem {
    pub system_id: i32,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub constellation_id: i32,
    #[serde(default)]
    pub security_class: String,
    #[serde(default)]
    pub security_status: f64,
    #[serde(default)]
    pub planets: Vec<Planet>,
    #[serde(default)]
    pub position: Position,
    #[serde(default)]
    pub star_id: Option<i32>,
    #[serde(default)]
    pub stargates: Vec<i32>,
    #[serde(default)]
    pub stations: Vec<i32>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct UniverseStargate {
    pub stargate_id: i32,
    pub name: String,
    #[serde(default)]
    pub system_id: i32,
    pub type_id: i32,
    pub destination: StargateDestination,
    #[serde(default)]
    pub position: Position,
}

/// Read-only view of the remote universe, one call per entity.
pub trait UniverseSource: Send + Sync {
    fn region_ids(&self) -> Result<Vec<i32>, MapperError>;
    fn region(&self, id: i32) -> Result<UniverseRegion, MapperError>;
    fn constellation(&self, id: i32) -> Result<UniverseConstellation, MapperError>;
    fn system(&self, id: i32) -> Result<UniverseSystem, MapperError>;
    fn stargate(&self, id: i32) -> Result<UniverseStargate, MapperError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EsiEndpoints {
    base_url: String,
}

impl EsiEndpoints {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn regions_url(&self) -> String {
        format!("{}/v1/universe/regions/", self.base_url)
    }

    pub fn region_url(&self, id: i32) -> String {
        format!("{}/v1/universe/regions/{id}/", self.base_url)
    }

    pub fn constellation_url(&self, id: i32) -> String {
        format!("{}/v1/universe/constellations/{id}/", self.base_url)
    }

    pub fn system_url(&self, id: i32) -> String {
        format!("{}/v4/universe/systems/{id}/", self.base_url)
    }

    pub fn stargate_url(&self, id: i32) -> String {
        format!("{}/v1/universe/stargates/{id}/", self.base_url)
    }
}

impl Default for EsiEndpoints {
    fn default() -> Self {
        Self::new(DEFAULT_ESI_BASE_URL)
    }
}

#[derive(Clone)]
pub struct EsiClient<T: Transport> {
    fetch: FetchClient<T>,
    endpoints: EsiEndpoints,
}

impl<T: Transport> EsiClient<T> {
    pub fn new(fetch: FetchClient<T>, endpoints: EsiEndpoints) -> Self {
        Self { fetch, endpoints }
    }

    pub fn endpoints(&self) -> &EsiEndpoints {
        &self.endpoints
    }
}

impl<T: Transport> UniverseSource for EsiClient<T> {
    fn region_ids(&self) -> Result<Vec<i32>, MapperError> {
        self.fetch.get_json(&self.endpoints.regions_url())
    }

    fn region(&self, id: i32) -> Result<UniverseRegion, MapperError> {
        self.fetch.get_json(&self.endpoints.region_url(id))
    }

    fn constellation(&self, id: i32) -> Result<UniverseConstellation, MapperError> {
        self.fetch.get_json(&self.endpoints.constellation_url(id))
    }

    fn system(&self, id: i32) -> Result<UniverseSystem, MapperError> {
        self.fetch.get_json(&self.endpoints.system_url(id))
    }

    fn stargate(&self, id: i32) -> Result<UniverseStargate, MapperError> {
        self.fetch.get_json(&self.endpoints.stargate_url(id))
    }
}
