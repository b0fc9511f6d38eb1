mod common;

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use assert_matches::assert_matches;

use spyglass_mapper::app::NoopSink;
use spyglass_mapper::error::MapperError;
use spyglass_mapper::fetch::{FetchClient, RawResponse, Transport};
use spyglass_mapper::pipeline::{Pipeline, PipelineTuning, Stage, StageTuning};

use common::{ALPHA, BRAVO, CHARLIE, CONSTELLATION, FakeUniverse, REGION, RecordingSink};

fn tight() -> PipelineTuning {
    PipelineTuning::uniform(StageTuning {
        workers: 3,
        input_capacity: 1,
        output_capacity: 1,
    })
}

#[test]
fn stages_run_in_order_behind_a_barrier() {
    let universe = FakeUniverse::chain();
    let fetched = Pipeline::new(&universe, tight()).run(&NoopSink).unwrap();

    assert_eq!(fetched.regions.len(), 1);
    assert_eq!(fetched.constellations.len(), 1);
    assert_eq!(fetched.systems.len(), 3);
    assert_eq!(fetched.stargates.len(), 4);

    let stages: Vec<Stage> = universe.recorded().into_iter().map(|(stage, _)| stage).collect();
    assert!(stages.windows(2).all(|pair| pair[0] <= pair[1]), "{stages:?}");
    assert_eq!(stages.first(), Some(&Stage::Region));
    assert_eq!(stages.last(), Some(&Stage::Stargate));
}

#[test]
fn results_are_keyed_by_requested_id() {
    let universe = FakeUniverse::chain();
    let fetched = Pipeline::new(&universe, PipelineTuning::default())
        .run(&NoopSink)
        .unwrap();
    assert_eq!(fetched.regions[&REGION].name, "Test Reach");
    assert_eq!(fetched.constellations[&CONSTELLATION].systems, vec![ALPHA, BRAVO, CHARLIE]);
    assert_eq!(fetched.systems[&BRAVO].stargates.len(), 2);
}

#[test]
fn duplicate_child_ids_are_fetched_once() {
    let mut universe = FakeUniverse::chain();
    universe
        .constellations
        .get_mut(&CONSTELLATION)
        .unwrap()
        .systems
        .extend([ALPHA, BRAVO]);

    let fetched = Pipeline::new(&universe, tight()).run(&NoopSink).unwrap();
    assert_eq!(fetched.systems.len(), 3);

    let mut per_system: HashMap<i32, usize> = HashMap::new();
    for (stage, id) in universe.recorded() {
        if stage == Stage::System {
            *per_system.entry(id).or_default() += 1;
        }
    }
    assert!(per_system.values().all(|count| *count == 1), "{per_system:?}");
}

#[test]
fn fatal_fetch_stops_before_later_stages() {
    let universe = FakeUniverse::chain().failing_at(Stage::System, BRAVO);
    let result = Pipeline::new(&universe, tight()).run(&NoopSink);

    assert_matches!(result, Err(MapperError::RetriesExceeded { url, .. }) if url.ends_with("/30000002"));
    assert!(
        universe
            .recorded()
            .iter()
            .all(|(stage, _)| *stage != Stage::Stargate)
    );
}

#[test]
fn progress_reports_every_stage() {
    let universe = FakeUniverse::chain();
    let sink = RecordingSink::default();
    Pipeline::new(&universe, tight()).run(&sink).unwrap();

    let messages = sink.messages.lock().unwrap();
    for stage in Stage::ALL {
        assert!(
            messages.iter().any(|m| m.contains(&format!("{stage} stage"))),
            "no progress for {stage}"
        );
    }
}

struct ScriptedTransport {
    responses: Mutex<Vec<RawResponse>>,
    calls: AtomicUsize,
}

impl ScriptedTransport {
    fn new(mut responses: Vec<RawResponse>) -> Self {
        responses.reverse();
        Self {
            responses: Mutex::new(responses),
            calls: AtomicUsize::new(0),
        }
    }
}

impl Transport for ScriptedTransport {
    fn get(&self, _url: &str) -> Result<RawResponse, MapperError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.responses.lock().unwrap().pop().unwrap_or(RawResponse {
            status: 599,
            body: Vec::new(),
        }))
    }
}

fn status(code: u16) -> RawResponse {
    RawResponse {
        status: code,
        body: Vec::new(),
    }
}

#[test]
fn eight_server_errors_exhaust_the_retries() {
    let client = FetchClient::new(ScriptedTransport::new(vec![status(500); 8]), 8);
    let result = client.get_json::<Vec<i32>>("https://esi.example/v1/universe/regions/");

    assert_matches!(result, Err(MapperError::RetriesExceeded { attempts: 8, .. }));
    assert_eq!(client.transport().calls.load(Ordering::SeqCst), 8);
}

#[test]
fn success_on_third_attempt_stops_retrying() {
    let client = FetchClient::new(
        ScriptedTransport::new(vec![
            status(500),
            status(500),
            RawResponse {
                status: 200,
                body: b"[10000001,10000002]".to_vec(),
            },
            status(200),
        ]),
        8,
    );
    let ids: Vec<i32> = client
        .get_json("https://esi.example/v1/universe/regions/")
        .unwrap();

    assert_eq!(ids, vec![10000001, 10000002]);
    assert_eq!(client.transport().calls.load(Ordering::SeqCst), 3);
}
