//! Integration tests for the dispatcher.
//!
//! Mock engines record how they are called so these tests can check
//! activation, download gating, merging, sequencing and listener semantics
//! without any network access.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use retaggr::engine::not_available;
use retaggr::{
    Engine, EngineCompletion, EngineKind, ReverseSearch, ReverseSearchConfig, RetaggrError,
    SearchListener, SearchOption, SearchOptions, SearchResult,
};

const PAHEAL_URL: &str = "https://iris.paheal.net/_images/f0a277f7c4e80330b843f8002daf627e/1876780%20-%20Dancer_of_the_Boreal_Valley%20Dark_Souls%20Dark_Souls_3%20Sinensian.jpg";

/// Shared instrumentation for one test run.
#[derive(Default)]
struct Probe {
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    listener_active: AtomicBool,
    overlapped_listener: AtomicBool,
    calls: Mutex<Vec<EngineKind>>,
}

struct MockEngine {
    kind: EngineKind,
    download_required: bool,
    result: SearchResult,
    probe: Arc<Probe>,
}

impl MockEngine {
    fn new(kind: EngineKind, tags: &[&str], sources: &[&str], probe: &Arc<Probe>) -> Self {
        Self {
            kind,
            download_required: false,
            result: SearchResult::from_parts(tags.iter().copied(), sources.iter().copied()),
            probe: Arc::clone(probe),
        }
    }

    fn needing_download(mut self) -> Self {
        self.download_required = true;
        self
    }
}

impl Engine for MockEngine {
    async fn search_image_source(&self, _url: &str) -> Result<SearchResult, RetaggrError> {
        if self.probe.listener_active.load(Ordering::SeqCst) {
            self.probe.overlapped_listener.store(true, Ordering::SeqCst);
        }
        let now = self.probe.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.probe.max_in_flight.fetch_max(now, Ordering::SeqCst);
        self.probe
            .calls
            .lock()
            .expect("calls lock")
            .push(self.kind);

        tokio::time::sleep(Duration::from_millis(5)).await;

        self.probe.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(self.result.clone())
    }

    async fn search_tag(&self, _tag: &str) -> Result<SearchResult, RetaggrError> {
        Err(not_available(self.kind, SearchOption::Tag))
    }

    fn kind(&self) -> EngineKind {
        self.kind
    }

    fn download_required(&self) -> bool {
        self.download_required
    }
}

/// Records events and holds the "listener active" flag while it sleeps.
struct RecordingListener {
    probe: Arc<Probe>,
    events: Mutex<Vec<EngineCompletion>>,
}

impl RecordingListener {
    fn new(probe: &Arc<Probe>) -> Self {
        Self {
            probe: Arc::clone(probe),
            events: Mutex::new(Vec::new()),
        }
    }

    fn events(&self) -> Vec<EngineCompletion> {
        self.events.lock().expect("events lock").clone()
    }
}

impl SearchListener for RecordingListener {
    async fn on_engine_complete(&self, event: EngineCompletion) {
        self.probe.listener_active.store(true, Ordering::SeqCst);
        self.events.lock().expect("events lock").push(event);
        tokio::time::sleep(Duration::from_millis(5)).await;
        self.probe.listener_active.store(false, Ordering::SeqCst);
    }
}

fn three_engines(probe: &Arc<Probe>) -> ReverseSearch<MockEngine> {
    ReverseSearch::from_engines([
        MockEngine::new(
            EngineKind::Danbooru,
            &["1girl", "solo"],
            &["https://www.pixiv.net/artworks/1"],
            probe,
        ),
        MockEngine::new(EngineKind::Iqdb, &["solo", "armor"], &[], probe),
        MockEngine::new(
            EngineKind::SauceNao,
            &[],
            &["https://www.pixiv.net/artworks/1", "https://mangadex.org/c/2"],
            probe,
        ),
    ])
    .expect("unique engines")
}

// ── Registry built from configuration ──────────────────────────────────

#[tokio::test]
async fn invalid_engine_names_fail() {
    let search = ReverseSearch::new(&ReverseSearchConfig::default()).expect("build");
    for name in ["nO", "", "google", "danbooru2", "e 621"] {
        let err = search.search_image(name, "irrelevant").await.unwrap_err();
        assert!(
            matches!(err, RetaggrError::NotAValidEngine(_)),
            "{name:?} gave {err}"
        );
    }
}

#[tokio::test]
async fn unconfigured_engines_are_missing_keys() {
    let search = ReverseSearch::new(&ReverseSearchConfig::default()).expect("build");
    for name in ["danbooru", "e621", "iqdb", "saucenao"] {
        let err = search.search_image(name, "irrelevant").await.unwrap_err();
        assert!(
            matches!(err, RetaggrError::MissingApiKeys(_)),
            "{name} gave {err}"
        );
    }
}

#[tokio::test]
async fn paheal_tags_come_from_the_url() {
    let search = ReverseSearch::new(&ReverseSearchConfig::default()).expect("build");
    let result = search.search_image("paheal", PAHEAL_URL).await.expect("search");

    let expected: HashSet<String> = [
        "Dancer_of_the_Boreal_Valley",
        "Dark_Souls",
        "Dark_Souls_3",
        "Sinensian",
    ]
    .into_iter()
    .map(String::from)
    .collect();
    assert_eq!(result.tags, expected);
    assert!(result.sources.is_empty());
}

#[test]
fn activation_follows_credentials() {
    let config = ReverseSearchConfig {
        saucenao_api_key: Some("key".into()),
        min_score: Some(70.0),
        ..Default::default()
    };
    let search = ReverseSearch::new(&config).expect("build");
    assert_eq!(
        search.engines(),
        vec![EngineKind::Iqdb, EngineKind::Paheal, EngineKind::SauceNao]
    );
    assert!(!search.is_active(EngineKind::Danbooru));
}

// ── Download gating ────────────────────────────────────────────────────

#[tokio::test]
async fn download_engines_skipped_unless_enabled() {
    let probe = Arc::new(Probe::default());
    let search = ReverseSearch::from_engines([
        MockEngine::new(EngineKind::Iqdb, &["a"], &[], &probe),
        MockEngine::new(EngineKind::SauceNao, &["b"], &[], &probe).needing_download(),
    ])
    .expect("build");

    let result = search
        .search_image_source("u", &SearchOptions::default())
        .await
        .expect("search");
    assert_eq!(*probe.calls.lock().expect("calls"), vec![EngineKind::Iqdb]);
    assert!(!result.tags.contains("b"));

    let result = search
        .search_image_source("u", &SearchOptions::default().with_download(true))
        .await
        .expect("search");
    assert_eq!(
        *probe.calls.lock().expect("calls"),
        vec![EngineKind::Iqdb, EngineKind::Iqdb, EngineKind::SauceNao]
    );
    assert!(result.tags.contains("b"));
}

// ── Merging ────────────────────────────────────────────────────────────

#[tokio::test]
async fn merged_result_is_exact_union() {
    let probe = Arc::new(Probe::default());
    let search = three_engines(&probe);

    let merged = search
        .search_image_source("u", &SearchOptions::default())
        .await
        .expect("search");

    let mut expected = SearchResult::new();
    for kind in search.engines() {
        expected.merge(&search.search_engine(kind, "u").await.expect("single"));
    }
    assert_eq!(merged, expected);
    assert_eq!(merged.tags.len(), 3);
    assert_eq!(merged.sources.len(), 2);
}

#[tokio::test]
async fn merge_does_not_depend_on_order() {
    let probe = Arc::new(Probe::default());
    let forward = three_engines(&probe);
    let reversed = ReverseSearch::from_engines([
        MockEngine::new(
            EngineKind::SauceNao,
            &[],
            &["https://www.pixiv.net/artworks/1", "https://mangadex.org/c/2"],
            &probe,
        ),
        MockEngine::new(EngineKind::Iqdb, &["solo", "armor"], &[], &probe),
        MockEngine::new(
            EngineKind::Danbooru,
            &["1girl", "solo"],
            &["https://www.pixiv.net/artworks/1"],
            &probe,
        ),
    ])
    .expect("build");

    let options = SearchOptions::default();
    let a = forward.search_image_source("u", &options).await.expect("a");
    let b = reversed.search_image_source("u", &options).await.expect("b");
    assert_eq!(a, b);
}

// ── Sequencing and listener ────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn engines_never_overlap() {
    let probe = Arc::new(Probe::default());
    let search = three_engines(&probe);
    let listener = RecordingListener::new(&probe);

    search
        .search_image_source_with_listener("u", &SearchOptions::default(), &listener)
        .await
        .expect("search");

    assert_eq!(probe.max_in_flight.load(Ordering::SeqCst), 1);
    assert!(
        !probe.overlapped_listener.load(Ordering::SeqCst),
        "an engine started while the listener was still running"
    );
}

#[tokio::test]
async fn listener_sees_per_engine_results_in_dispatch_order() {
    let probe = Arc::new(Probe::default());
    let search = three_engines(&probe);
    let listener = RecordingListener::new(&probe);

    search
        .search_image_source_with_listener("u", &SearchOptions::default(), &listener)
        .await
        .expect("search");

    let events = listener.events();
    let order: Vec<EngineKind> = events.iter().map(|e| e.engine).collect();
    assert_eq!(order, search.engines());

    for event in &events {
        let own = search
            .search_engine(event.engine, "u")
            .await
            .expect("single");
        assert_eq!(event.result, own, "{} event carried merged data", event.engine);
    }
}

#[tokio::test]
async fn listener_count_matches_searched_engines() {
    let probe = Arc::new(Probe::default());
    let search = ReverseSearch::from_engines([
        MockEngine::new(EngineKind::Danbooru, &["a"], &[], &probe),
        MockEngine::new(EngineKind::Iqdb, &["b"], &[], &probe).needing_download(),
        MockEngine::new(EngineKind::Paheal, &["c"], &[], &probe),
        MockEngine::new(EngineKind::SauceNao, &["d"], &[], &probe),
    ])
    .expect("build");
    let listener = RecordingListener::new(&probe);
    let options = SearchOptions::default().skip(EngineKind::Paheal);

    search
        .search_image_source_with_listener("u", &options, &listener)
        .await
        .expect("search");

    let order: Vec<EngineKind> = listener.events().iter().map(|e| e.engine).collect();
    assert_eq!(order, vec![EngineKind::Danbooru, EngineKind::SauceNao]);
}

#[tokio::test]
async fn channel_listener_receives_every_completion() {
    let probe = Arc::new(Probe::default());
    let search = three_engines(&probe);
    let (tx, mut rx) = tokio::sync::mpsc::channel(8);

    search
        .search_image_source_with_listener("u", &SearchOptions::default(), &tx)
        .await
        .expect("search");
    drop(tx);

    let mut received = Vec::new();
    while let Some(event) = rx.recv().await {
        received.push(event.engine);
    }
    assert_eq!(received, search.engines());
}
