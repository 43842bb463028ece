//! Binary-level tests

use assert_cmd::Command;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

fn crawler_cmd(data_dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("crypto-crawler").unwrap();
    cmd.current_dir(data_dir.path())
        .env_remove("RUST_LOG")
        .env("CRYPTO_DATA_DIR", data_dir.path());
    cmd
}

#[test]
fn help_lists_commands() {
    let temp_dir = TempDir::new().unwrap();
    let output = crawler_cmd(&temp_dir).arg("--help").output().unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    for command in ["poll", "crawl", "compare", "run"] {
        assert!(stdout.contains(command), "help is missing {command}");
    }
}

#[test]
fn invalid_environment_exits_with_failure() {
    let temp_dir = TempDir::new().unwrap();
    let output = crawler_cmd(&temp_dir)
        .env("CRYPTO_HTTP_TIMEOUT", "0")
        .arg("compare")
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("http_timeout"));
}

#[tokio::test(flavor = "multi_thread")]
async fn crawl_writes_csv_from_listing_api() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"cryptoCurrencyList": [
                {"cmcRank": 1, "name": "Bitcoin", "symbol": "BTC",
                 "quotes": [{"price": 43000.0, "percentChange24h": 1.5, "marketCap": 8.4e11}]}
            ]}
        })))
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let mut cmd = crawler_cmd(&temp_dir);
    cmd.env("COINMARKETCAP_API_URL", format!("{}/listing", server.uri()))
        .env("CRYPTO_JSON_DELAY", "0")
        .args(["--requests-per-second", "0", "crawl", "--pages", "2", "--per-page", "1"]);

    let output = tokio::task::spawn_blocking(move || cmd.output().unwrap())
        .await
        .unwrap();

    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert!(String::from_utf8_lossy(&output.stdout).contains("Crawled 2 coins via api"));

    let csv = std::fs::read_to_string(temp_dir.path().join("crypto_listings.csv")).unwrap();
    assert_eq!(csv.lines().count(), 3);
}
