//! Orchestrator behavior against a scripted in-memory archive

use async_trait::async_trait;
use letter_harvester::config::MarkupConfig;
use letter_harvester::crawler::{
    ArchiveMarkup, FetchError, Orchestrator, PageFetcher, Renderer, RetryPolicy,
};
use letter_harvester::storage::{LetterRecord, LetterStore, SqliteStorage, UNKNOWN};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;

const BASE: &str = "https://archive.test/letters";

/// Archive double that records every detail request and the peak number of
/// detail renders in flight
#[derive(Default)]
struct ScriptedArchive {
    pages: HashMap<u32, Vec<String>>,
    broken: HashSet<String>,
    detail_delay: Duration,
    requested: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl ScriptedArchive {
    fn with_pages(pages: &[&[&str]]) -> Self {
        Self {
            pages: pages
                .iter()
                .enumerate()
                .map(|(i, ids)| (i as u32 + 1, ids.iter().map(|id| id.to_string()).collect()))
                .collect(),
            ..Self::default()
        }
    }

    fn requested(&self) -> Vec<String> {
        let mut ids = self.requested.lock().unwrap().clone();
        ids.sort();
        ids
    }

    fn listing(&self, url: &Url) -> String {
        let page: u32 = url
            .query_pairs()
            .find(|(key, _)| key == "page")
            .and_then(|(_, value)| value.parse().ok())
            .unwrap_or(1);
        let anchors: String = self
            .pages
            .get(&page)
            .into_iter()
            .flatten()
            .map(|id| format!(r#"<a class="js-open_letter" data-letter_id="{}">#</a>"#, id))
            .collect();
        format!("<html><body><div class=\"letters\">{}</div></body></html>", anchors)
    }

    async fn detail(&self, id: &str) -> Result<String, FetchError> {
        self.requested.lock().unwrap().push(id.to_string());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.detail_delay).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.broken.contains(id) {
            return Err(FetchError::Status {
                url: format!("{}#letter-{}", BASE, id),
                status: 502,
            });
        }

        Ok(format!(
            r#"<html><body><div class="b-letter-text">
                <p>22.06.1941</p>
                <p><span>От кого:</span> Автор {id}</p>
                <p><span>Кому:</span> Адресат {id}</p>
                <div class="text"><p>Письмо {id}</p></div>
            </div></body></html>"#
        ))
    }
}

#[async_trait]
impl Renderer for ScriptedArchive {
    async fn render(&self, url: &str, _timeout: Duration) -> Result<String, FetchError> {
        let parsed = Url::parse(url).map_err(|e| FetchError::Render {
            url: url.to_string(),
            message: e.to_string(),
        })?;
        match parsed.fragment() {
            Some(fragment) => self.detail(fragment.trim_start_matches("letter-")).await,
            None => Ok(self.listing(&parsed)),
        }
    }
}

fn orchestrator(
    archive: Arc<ScriptedArchive>,
    max_concurrent: usize,
    store: SqliteStorage,
) -> Orchestrator<SqliteStorage> {
    let policy = RetryPolicy {
        max_attempts: 2,
        initial_backoff: Duration::from_millis(1),
        max_backoff: Duration::from_millis(2),
    };
    let fetcher = PageFetcher::new(archive, policy, Duration::from_secs(5));
    Orchestrator::new(
        Arc::new(fetcher),
        Url::parse(BASE).unwrap(),
        24,
        ArchiveMarkup::from_config(&MarkupConfig::default()).unwrap(),
        max_concurrent,
        store,
    )
}

fn stored_letter(id: &str) -> LetterRecord {
    LetterRecord {
        id: id.to_string(),
        date: chrono::NaiveDate::from_ymd_opt(1942, 1, 1).unwrap(),
        author: "Earlier run".to_string(),
        sender: UNKNOWN.to_string(),
        recipient: UNKNOWN.to_string(),
        destination: UNKNOWN.to_string(),
        text: "stored before".to_string(),
        url: format!("{}#letter-{}", BASE, id),
    }
}

#[tokio::test]
async fn test_second_run_persists_nothing_new() {
    let archive = Arc::new(ScriptedArchive::with_pages(&[&["a", "b", "c"], &["d", "e"]]));
    let mut orchestrator = orchestrator(archive.clone(), 5, SqliteStorage::open_in_memory().unwrap());

    let first = orchestrator.run(10).await.unwrap();
    assert_eq!(first.persisted, 5);
    assert_eq!(first.final_count, 5);

    let second = orchestrator.run(10).await.unwrap();
    assert_eq!(second.persisted, 0);
    assert_eq!(second.already_known, 5);
    assert_eq!(second.final_count, 5);

    // Detail views were only fetched by the first run
    assert_eq!(archive.requested(), vec!["a", "b", "c", "d", "e"]);
}

#[tokio::test]
async fn test_empty_listing_page_stops_run_before_target() {
    let archive = Arc::new(ScriptedArchive::with_pages(&[&["a", "b"], &["c"]]));
    let mut orchestrator = orchestrator(archive, 5, SqliteStorage::open_in_memory().unwrap());

    let report = orchestrator.run(100).await.unwrap();

    assert_eq!(report.pages_visited, 2);
    assert_eq!(report.persisted, 3);
    assert_eq!(report.final_count, 3);
}

#[tokio::test]
async fn test_detail_fetches_never_exceed_ceiling() {
    let ids: Vec<String> = (0..20).map(|i| format!("id{}", i)).collect();
    let refs: Vec<&str> = ids.iter().map(String::as_str).collect();
    let mut archive = ScriptedArchive::with_pages(&[refs.as_slice()]);
    archive.detail_delay = Duration::from_millis(20);
    let archive = Arc::new(archive);
    let mut orchestrator = orchestrator(archive.clone(), 5, SqliteStorage::open_in_memory().unwrap());

    let report = orchestrator.run(20).await.unwrap();

    assert_eq!(report.persisted, 20);
    assert_eq!(archive.peak.load(Ordering::SeqCst), 5);
    assert_eq!(archive.in_flight.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_only_unknown_ids_are_fetched() {
    let mut store = SqliteStorage::open_in_memory().unwrap();
    store.create_if_absent(&stored_letter("a")).unwrap();
    store.create_if_absent(&stored_letter("b")).unwrap();

    let archive = Arc::new(ScriptedArchive::with_pages(&[&["a", "b", "c"]]));
    let mut orchestrator = orchestrator(archive.clone(), 5, store);

    let report = orchestrator.run(3).await.unwrap();

    assert_eq!(archive.requested(), vec!["c"]);
    assert_eq!(report.already_known, 2);
    assert_eq!(report.persisted, 1);

    let store = orchestrator.into_store();
    assert_eq!(store.count().unwrap(), 3);
    assert_eq!(store.get("a").unwrap().unwrap().author, "Earlier run");
    assert_eq!(store.get("c").unwrap().unwrap().author, "Автор c");
}

#[tokio::test]
async fn test_page_is_truncated_to_missing_count() {
    let archive = Arc::new(ScriptedArchive::with_pages(&[&["v", "w", "x", "y", "z"]]));
    let mut orchestrator = orchestrator(archive.clone(), 5, SqliteStorage::open_in_memory().unwrap());

    let report = orchestrator.run(2).await.unwrap();

    assert_eq!(archive.requested(), vec!["v", "w"]);
    assert_eq!(report.pages_visited, 1);
    assert_eq!(report.final_count, 2);
}

#[tokio::test]
async fn test_failed_detail_fetch_only_skips_that_letter() {
    let mut archive = ScriptedArchive::with_pages(&[&["a", "b", "c"]]);
    archive.broken.insert("b".to_string());
    let archive = Arc::new(archive);
    let mut orchestrator = orchestrator(archive.clone(), 5, SqliteStorage::open_in_memory().unwrap());

    let report = orchestrator.run(3).await.unwrap();

    assert_eq!(report.extracted, 2);
    assert_eq!(report.discarded, 1);
    assert_eq!(report.persisted, 2);
    // Two attempts for the broken letter, one for each of the others
    assert_eq!(archive.requested(), vec!["a", "b", "b", "c"]);

    let store = orchestrator.store();
    assert!(store.exists("a").unwrap());
    assert!(!store.exists("b").unwrap());
    assert!(store.exists("c").unwrap());
}
