use std::sync::Arc;

use serde::Serialize;

use crate::domain::Galaxy;
use crate::error::MapperError;
use crate::render::{Renderer, StatusSource};
use crate::store::MapStore;

#[derive(Debug, Clone, Serialize)]
pub struct MapListing {
    pub maps: Vec<String>,
}

/// Read side of the stored output. The galaxy is loaded once and shared,
/// map documents are read from disk on every request.
#[derive(Clone)]
pub struct MapService {
    store: MapStore,
    galaxy: Arc<Galaxy>,
    status: Arc<dyn StatusSource>,
}

impl MapService {
    pub fn new(store: MapStore, galaxy: Arc<Galaxy>, status: Arc<dyn StatusSource>) -> Self {
        Self {
            store,
            galaxy,
            status,
        }
    }

    pub fn open(store: MapStore, status: Arc<dyn StatusSource>) -> Result<Self, MapperError> {
        let galaxy = store.load_galaxy()?;
        Ok(Self::new(store, Arc::new(galaxy), status))
    }

    pub fn galaxy(&self) -> &Galaxy {
        &self.galaxy
    }

    pub fn list(&self) -> Result<MapListing, MapperError> {
        Ok(MapListing {
            maps: self.store.list_maps()?,
        })
    }

    pub fn render(&self, id: &str) -> Result<String, MapperError> {
        let document = self.store.load_map(id)?;
        Ok(Renderer::new(&self.galaxy, self.status.as_ref()).render(&document))
    }
}
