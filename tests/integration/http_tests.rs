//! End-to-end harvests over HTTP
//!
//! These tests use wiremock to stand in for the archive and run the same
//! `harvest` entry point the binary's trigger calls.

use letter_harvester::config::{load_config, Config};
use letter_harvester::harvest;
use letter_harvester::storage::{LetterStore, RunLog, RunStatus, SqliteStorage};
use std::io::Write;
use std::path::Path;
use tempfile::{NamedTempFile, TempDir};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Match, Mock, MockServer, Request, ResponseTemplate};

/// Matches requests without a query string, i.e. detail views
struct NoQuery;

impl Match for NoQuery {
    fn matches(&self, request: &Request) -> bool {
        request.url.query().is_none()
    }
}

const DETAIL_PAGE: &str = r#"<html><body>
<div class="b-letter-text">
    <p>09.05.1945</p>
    <p><span class="label">От кого:</span> Сидоров Николай</p>
    <p><span class="label">Откуда:</span> Берлин</p>
    <p><span class="label">Кому:</span> Сидоровой Анне</p>
    <p><span class="label">Куда:</span> Тула</p>
    <div class="text"><p>Дорогая Аня!</p><p>Победа!</p></div>
</div>
</body></html>"#;

fn listing_page(ids: &[&str]) -> String {
    let anchors: String = ids
        .iter()
        .map(|id| format!(r#"<a class="js-open_letter" data-letter_id="{}">Письмо</a>"#, id))
        .collect();
    format!("<html><body>{}</body></html>", anchors)
}

/// Writes a config pointing at the mock archive and a fresh database
fn write_config(server_uri: &str, db_path: &Path, target_count: u64) -> (NamedTempFile, Config) {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
[archive]
base-url = "{}/letters"
target-count = {}

[fetcher]
max-attempts = 2
initial-backoff-ms = 1
max-backoff-ms = 5
navigation-timeout-ms = 2000

[crawler]
max-concurrent-fetches = 3

[output]
database-path = "{}"
"#,
        server_uri,
        target_count,
        db_path.display()
    )
    .unwrap();
    file.flush().unwrap();

    let config = load_config(file.path()).unwrap();
    (file, config)
}

async fn mount_archive(server: &MockServer, pages: &[&[&str]], expected_details: u64) {
    for (index, ids) in pages.iter().enumerate() {
        Mock::given(method("GET"))
            .and(path("/letters"))
            .and(query_param("order_field", "published_desc"))
            .and(query_param("page", (index + 1).to_string()))
            .and(query_param("per", "24"))
            .respond_with(ResponseTemplate::new(200).set_body_string(listing_page(ids)))
            .mount(server)
            .await;
    }

    Mock::given(method("GET"))
        .and(path("/letters"))
        .and(query_param("page", (pages.len() + 1).to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing_page(&[])))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/letters"))
        .and(NoQuery)
        .respond_with(ResponseTemplate::new(200).set_body_string(DETAIL_PAGE))
        .expect(expected_details)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_full_harvest_over_http() {
    let server = MockServer::start().await;
    mount_archive(&server, &[&["1001", "1002", "1003"], &["1004"]], 4).await;

    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("letters.db");
    let (_file, config) = write_config(&server.uri(), &db_path, 10);

    let report = harvest(&config, "hash-1").await.unwrap();

    assert_eq!(report.pages_visited, 2);
    assert_eq!(report.persisted, 4);
    assert_eq!(report.final_count, 4);

    let storage = SqliteStorage::new(&db_path).unwrap();
    assert_eq!(storage.count().unwrap(), 4);

    let letter = storage.get("1003").unwrap().unwrap();
    assert_eq!(letter.date.to_string(), "1945-05-09");
    assert_eq!(letter.author, "Сидоров Николай");
    assert_eq!(letter.sender, "Берлин");
    assert_eq!(letter.recipient, "Сидоровой Анне");
    assert_eq!(letter.destination, "Тула");
    assert_eq!(letter.text, "Дорогая Аня!\nПобеда!");
    assert_eq!(letter.url, format!("{}/letters#letter-1003", server.uri()));

    let runs = storage.recent_runs(10).unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].status, RunStatus::Completed);
    assert_eq!(runs[0].new_letters, 4);
    assert_eq!(runs[0].config_hash, "hash-1");
    assert!(runs[0].finished_at.is_some());
}

#[tokio::test]
async fn test_repeated_harvest_fetches_no_known_letter() {
    let server = MockServer::start().await;
    // Details are only requested by the first harvest
    mount_archive(&server, &[&["1", "2"]], 2).await;

    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("letters.db");
    let (_file, config) = write_config(&server.uri(), &db_path, 5);

    let first = harvest(&config, "hash").await.unwrap();
    let second = harvest(&config, "hash").await.unwrap();

    assert_eq!(first.persisted, 2);
    assert_eq!(second.persisted, 0);
    assert_eq!(second.already_known, 2);

    let storage = SqliteStorage::new(&db_path).unwrap();
    let runs = storage.recent_runs(10).unwrap();
    assert_eq!(runs.len(), 2);
    assert!(runs.iter().all(|run| run.status == RunStatus::Completed));
    assert_eq!(runs[0].new_letters, 0);
    assert_eq!(runs[1].new_letters, 2);
}

#[tokio::test]
async fn test_unreachable_listing_ends_run_without_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .expect(2)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("letters.db");
    let (_file, config) = write_config(&server.uri(), &db_path, 5);

    let report = harvest(&config, "hash").await.unwrap();

    assert_eq!(report.pages_visited, 0);
    assert_eq!(report.persisted, 0);

    let storage = SqliteStorage::new(&db_path).unwrap();
    let runs = storage.recent_runs(1).unwrap();
    assert_eq!(runs[0].status, RunStatus::Completed);
}
