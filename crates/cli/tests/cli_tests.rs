use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::json;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fitfind(queue_file: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("fitfind").unwrap();
    cmd.env("FITFIND_QUEUE_PATH", queue_file)
        .env("FITFIND_API_URL", "http://127.0.0.1:9")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_cli_help() {
    let mut cmd = Command::cargo_bin("fitfind").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Manage your FitFind wishlist"));
}

#[test]
fn test_cli_collections_help_lists_subcommands() {
    let mut cmd = Command::cargo_bin("fitfind").unwrap();
    cmd.args(["collections", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("add-item"))
        .stdout(predicate::str::contains("reorder"));
}

#[test]
fn test_cli_offline_remove_is_queued_and_persisted() {
    let dir = tempfile::tempdir().unwrap();
    let queue_file = dir.path().join("queue.json");

    fitfind(&queue_file)
        .args(["--offline", "wishlist", "remove", "p1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"status\": \"queued\""));

    fitfind(&queue_file)
        .args(["queue", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("remove_from_wishlist"))
        .stdout(predicate::str::contains("p1"));

    fitfind(&queue_file)
        .args(["queue", "clear"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"cleared\": 1"));
}

#[test]
fn test_cli_sync_refuses_when_offline() {
    let dir = tempfile::tempdir().unwrap();
    fitfind(&dir.path().join("queue.json"))
        .args(["--offline", "queue", "sync"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("offline"));
}

#[test]
fn test_cli_rejects_unknown_sort() {
    let dir = tempfile::tempdir().unwrap();
    fitfind(&dir.path().join("queue.json"))
        .args(["wishlist", "list", "--sort", "colour"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown sort order"));
}

#[test]
fn test_cli_corrupt_queue_file_is_reported_and_kept() {
    let dir = tempfile::tempdir().unwrap();
    let queue_file = dir.path().join("queue.json");
    let raw = r#"[{"partially": "valid""#;
    std::fs::write(&queue_file, raw).unwrap();

    fitfind(&queue_file)
        .args(["--offline", "wishlist", "remove", "p1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("could not open the offline queue"));

    assert_eq!(std::fs::read_to_string(&queue_file).unwrap(), raw);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_cli_remove_finds_item_past_first_page() {
    let server = MockServer::start().await;
    for (offset, product_id, has_more) in [(0, "p1", true), (1, "p2", false)] {
        Mock::given(method("GET"))
            .and(path("/api/wishlist"))
            .and(query_param("offset", offset.to_string()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "wishlist": [{"id": format!("w-{product_id}"), "product_id": product_id}],
                "pagination": {"limit": 1, "offset": offset, "has_more": has_more, "total_count": 2}
            })))
            .mount(&server)
            .await;
    }
    Mock::given(method("POST"))
        .and(path("/api/wishlist/remove"))
        .and(body_json(json!({"product_id": "p2"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let queue_file = dir.path().join("queue.json");
    let uri = server.uri();
    tokio::task::spawn_blocking(move || {
        fitfind(&queue_file)
            .env("FITFIND_API_URL", uri)
            .env("FITFIND_PAGE_SIZE", "1")
            .args(["wishlist", "remove", "p2"])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"status\": \"success\""));
    })
    .await
    .unwrap();
}
