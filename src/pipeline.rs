use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Instant;

use crossbeam::channel;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::app::{ProgressEvent, ProgressSink};
use crate::error::MapperError;
use crate::esi::{
    UniverseConstellation, UniverseRegion, UniverseSource, UniverseStargate, UniverseSystem,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Stage {
    Region,
    Constellation,
    System,
    Stargate,
}

impl Stage {
    pub const ALL: [Stage; 4] = [
        Stage::Region,
        Stage::Constellation,
        Stage::System,
        Stage::Stargate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Region => "region",
            Stage::Constellation => "constellation",
            Stage::System => "system",
            Stage::Stargate => "stargate",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Throughput knobs for one stage. None of them affect the result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageTuning {
    pub workers: usize,
    pub input_capacity: usize,
    pub output_capacity: usize,
}

impl StageTuning {
    pub fn default_for(stage: Stage) -> Self {
        let (workers, input_capacity, output_capacity) = match stage {
            Stage::Region => (16, 128, 64),
            Stage::Constellation => (32, 1024, 128),
            Stage::System => (64, 8096, 512),
            Stage::Stargate => (128, 16192, 4096),
        };
        Self {
            workers,
            input_capacity,
            output_capacity,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineTuning {
    pub region: StageTuning,
    pub constellation: StageTuning,
    pub system: StageTuning,
    pub stargate: StageTuning,
}

impl PipelineTuning {
    pub fn uniform(tuning: StageTuning) -> Self {
        Self {
            region: tuning,
            constellation: tuning,
            system: tuning,
            stargate: tuning,
        }
    }

    pub fn for_stage(&self, stage: Stage) -> StageTuning {
        match stage {
            Stage::Region => self.region,
            Stage::Constellation => self.constellation,
            Stage::System => self.system,
            Stage::Stargate => self.stargate,
        }
    }
}

impl Default for PipelineTuning {
    fn default() -> Self {
        Self {
            region: StageTuning::default_for(Stage::Region),
            constellation: StageTuning::default_for(Stage::Constellation),
            system: StageTuning::default_for(Stage::System),
            stargate: StageTuning::default_for(Stage::Stargate),
        }
    }
}

/// Flat results of one ingestion run, each keyed by the id it was fetched with.
#[derive(Debug, Clone, Default)]
pub struct FetchedUniverse {
    pub regions: HashMap<i32, UniverseRegion>,
    pub constellations: HashMap<i32, UniverseConstellation>,
    pub systems: HashMap<i32, UniverseSystem>,
    pub stargates: HashMap<i32, UniverseStargate>,
}

/// Fetches every id through a fixed pool of workers and waits for all of them.
///
/// Ids are fed by a producer thread into a bounded queue that is closed once
/// the last id is in. The calling thread drains exactly `ids.len()` results.
/// The first error stops the drain: the abort flag keeps idle workers from
/// picking up more ids and dropping the result receiver unblocks busy ones.
pub fn run_stage<T, F>(
    stage: Stage,
    ids: BTreeSet<i32>,
    tuning: StageTuning,
    fetch: F,
) -> Result<HashMap<i32, T>, MapperError>
where
    T: Send,
    F: Fn(i32) -> Result<T, MapperError> + Sync,
{
    let expected = ids.len();
    if expected == 0 {
        return Ok(HashMap::new());
    }

    let workers = tuning.workers.clamp(1, expected);
    let (job_tx, job_rx) = channel::bounded::<i32>(tuning.input_capacity.max(1));
    let (result_tx, result_rx) =
        channel::bounded::<(i32, Result<T, MapperError>)>(tuning.output_capacity.max(1));
    let abort = AtomicBool::new(false);

    thread::scope(|scope| {
        scope.spawn(move || {
            for id in ids {
                if job_tx.send(id).is_err() {
                    break;
                }
            }
        });

        for _ in 0..workers {
            let jobs = job_rx.clone();
            let results = result_tx.clone();
            let fetch = &fetch;
            let abort = &abort;
            scope.spawn(move || {
                for id in jobs.iter() {
                    if abort.load(Ordering::Relaxed) {
                        break;
                    }
                    if results.send((id, fetch(id))).is_err() {
                        break;
                    }
                }
            });
        }
        drop(job_rx);
        drop(result_tx);

        let mut collected = HashMap::with_capacity(expected);
        while collected.len() < expected {
            match result_rx.recv() {
                Ok((id, Ok(entity))) => {
                    collected.insert(id, entity);
                }
                Ok((id, Err(err))) => {
                    warn!(%stage, id, error = %err, "aborting pipeline");
                    abort.store(true, Ordering::Relaxed);
                    drop(result_rx);
                    return Err(err);
                }
                Err(_) => {
                    return Err(MapperError::StageDisconnected {
                        stage: stage.as_str(),
                        received: collected.len(),
                        expected,
                    });
                }
            }
        }
        Ok(collected)
    })
}

pub struct Pipeline<'a, S: UniverseSource> {
    source: &'a S,
    tuning: PipelineTuning,
}

impl<'a, S: UniverseSource> Pipeline<'a, S> {
    pub fn new(source: &'a S, tuning: PipelineTuning) -> Self {
        Self { source, tuning }
    }

    /// Runs region -> constellation -> system -> stargate. Each stage starts
    /// only after the previous one returned its complete result set.
    pub fn run(&self, sink: &dyn ProgressSink) -> Result<FetchedUniverse, MapperError> {
        sink.event(ProgressEvent {
            message: "phase=Fetch; downloading region list".to_string(),
            elapsed: None,
        });
        let region_ids: BTreeSet<i32> = self.source.region_ids()?.into_iter().collect();

        let regions = self.stage(Stage::Region, region_ids, sink, |id| {
            self.source.region(id)
        })?;

        let constellation_ids = regions
            .values()
            .flat_map(|region| region.constellations.iter().copied())
            .collect();
        let constellations = self.stage(Stage::Constellation, constellation_ids, sink, |id| {
            self.source.constellation(id)
        })?;

        let system_ids = constellations
            .values()
            .flat_map(|constellation| constellation.systems.iter().copied())
            .collect();
        let systems = self.stage(Stage::System, system_ids, sink, |id| {
            self.source.system(id)
        })?;

        let stargate_ids = systems
            .values()
            .flat_map(|system| system.stargates.iter().copied())
            .collect();
        let stargates = self.stage(Stage::Stargate, stargate_ids, sink, |id| {
            self.source.stargate(id)
        })?;

        Ok(FetchedUniverse {
            regions,
            constellations,
            systems,
            stargates,
        })
    }

    fn stage<T, F>(
        &self,
        stage: Stage,
        ids: BTreeSet<i32>,
        sink: &dyn ProgressSink,
        fetch: F,
    ) -> Result<HashMap<i32, T>, MapperError>
    where
        T: Send,
        F: Fn(i32) -> Result<T, MapperError> + Sync,
    {
        let tuning = self.tuning.for_stage(stage);
        let started = Instant::now();
        sink.event(ProgressEvent {
            message: format!("phase=Fetch; {stage} stage, {} ids", ids.len()),
            elapsed: None,
        });
        debug!(%stage, ids = ids.len(), workers = tuning.workers, "starting stage");

        let results = run_stage(stage, ids, tuning, fetch)?;

        let elapsed = started.elapsed();
        debug!(%stage, fetched = results.len(), ?elapsed, "stage complete");
        sink.event(ProgressEvent {
            message: format!("phase=Fetch; fetched {} {stage} entities", results.len()),
            elapsed: Some(elapsed),
        });
        Ok(results)
    }
}
