use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::info;

use crate::assemble::assemble;
use crate::config::ResolvedConfig;
use crate::document::{MapDocument, build_document};
use crate::error::MapperError;
use crate::esi::UniverseSource;
use crate::layout::{LayoutSource, import_layouts};
use crate::pipeline::Pipeline;
use crate::store::MapStore;

#[derive(Debug, Clone, Serialize)]
pub struct GenerateResult {
    pub generated_at: String,
    pub regions: usize,
    pub constellations: usize,
    pub systems: usize,
    pub stargates: usize,
    pub dangling_references: usize,
    pub maps: Vec<String>,
    pub skipped_regions: Vec<String>,
    pub galaxy_path: String,
    pub maps_dir: String,
    pub elapsed_ms: u128,
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    pub elapsed: Option<Duration>,
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

/// Forwards progress to the `info` log.
pub struct TracingSink;

impl ProgressSink for TracingSink {
    fn event(&self, event: ProgressEvent) {
        match event.elapsed {
            Some(elapsed) => info!(?elapsed, "{}", event.message),
            None => info!("{}", event.message),
        }
    }
}

pub struct NoopSink;

impl ProgressSink for NoopSink {
    fn event(&self, _event: ProgressEvent) {}
}

pub struct App<S: UniverseSource, L: LayoutSource> {
    store: MapStore,
    universe: S,
    layouts: L,
    config: ResolvedConfig,
}

impl<S: UniverseSource, L: LayoutSource> App<S, L> {
    pub fn new(store: MapStore, universe: S, layouts: L, config: ResolvedConfig) -> Self {
        Self {
            store,
            universe,
            layouts,
            config,
        }
    }

    pub fn store(&self) -> &MapStore {
        &self.store
    }

    /// Fetches the universe, imports the region charts and replaces the
    /// stored snapshot and map documents. Nothing is written unless every
    /// step succeeded.
    pub fn generate(&self, sink: &dyn ProgressSink) -> Result<GenerateResult, MapperError> {
        let started = Instant::now();

        let universe = Pipeline::new(&self.universe, self.config.tuning).run(sink)?;

        sink.event(ProgressEvent {
            message: "phase=Assemble; building galaxy".to_string(),
            elapsed: None,
        });
        let (galaxy, report) = assemble(&universe);

        let import = import_layouts(&self.layouts, &self.config.layout_regions, sink)?;
        let documents: Vec<MapDocument> = import
            .layouts
            .iter()
            .map(|layout| {
                build_document(
                    layout,
                    &galaxy,
                    self.config.canvas,
                    self.config.author.as_deref(),
                )
            })
            .collect();

        sink.event(ProgressEvent {
            message: format!("phase=Store; writing {} maps", documents.len()),
            elapsed: None,
        });
        let written = self.store.write_output(&galaxy, &documents)?;

        let elapsed = started.elapsed();
        sink.event(ProgressEvent {
            message: "phase=Done; generation complete".to_string(),
            elapsed: Some(elapsed),
        });

        Ok(GenerateResult {
            generated_at: chrono::Utc::now().to_rfc3339(),
            regions: report.regions,
            constellations: report.constellations,
            systems: report.systems,
            stargates: report.stargates,
            dangling_references: report.dangling.len(),
            maps: documents.into_iter().map(|document| document.name).collect(),
            skipped_regions: import.skipped,
            galaxy_path: written.galaxy_path.to_string(),
            maps_dir: self.store.maps_dir().to_string(),
            elapsed_ms: elapsed.as_millis(),
        })
    }
}
