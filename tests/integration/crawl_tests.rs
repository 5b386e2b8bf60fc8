//! Integration tests for the crawler
//!
//! These tests use wiremock to stand in for the soundboard site and run
//! the full listing → detail → download → store cycle end-to-end.

use sb_harvest::config::Config;
use sb_harvest::crawler::Coordinator;
use sb_harvest::output::read_metadata;
use sb_harvest::storage::{ItemStore, SnapshotStore, WritePolicy};
use std::path::Path;
use tempfile::TempDir;
use wiremock::matchers::{header, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration pointed at the mock server, with no delays
fn create_test_config(base_url: &str, dir: &Path, quota: usize) -> Config {
    let mut config = Config::default();
    config.crawler.listing_url = format!("{}/sb/", base_url);
    config.crawler.max_new_items = quota;
    config.crawler.page_delay_ms = 0;
    config.user_agent.crawler_name = "TestBot".to_string();
    config.download.retry_base_delay_ms = 0;
    config.download.batch_delay_ms = 0;
    config.output.output_dir = dir.join("output");
    config.output.database_path = dir.join("data/posts.json");
    config
}

fn html(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(body)
        .insert_header("content-type", "text/html")
}

fn article(id: u32, slug: &str, title: &str) -> String {
    format!(
        r#"<article id="post-{id}" class="post">
            <h2 class="entry-title"><a href="/sb/{slug}/">{title}</a></h2>
            <span class="entry-date"><a href="/2024/01/">January 5, 2024</a></span>
            <span class="entry-author"><a href="/author/admin/">admin</a></span>
            <span class="entry-categories"><a href="/category/movies/">Movies</a></span>
            <div class="entry-excerpt"><p>Sounds from {title}.</p></div>
            <a class="continue-reading" href="/sb/{slug}/">Continue reading</a>
        </article>"#
    )
}

fn listing_page(articles: &[String]) -> String {
    format!("<html><body><main>{}</main></body></html>", articles.concat())
}

fn detail_page(slug: &str, buttons: &[&str]) -> String {
    let buttons: String = buttons
        .iter()
        .map(|id| format!(r#"<button id="{id}">{id}</button>"#))
        .collect();
    format!(
        r#"<html><head>
            <script src="/sb/{slug}/sounds.js"></script>
            <script src="/sb/{slug}/behavior.js?v=2"></script>
        </head><body>
            <div id="soundboard">{buttons}<button id="stop">Stop All</button></div>
        </body></html>"#
    )
}

/// Mounts the detail page, its two scripts and a clip for every button
async fn mount_board(server: &MockServer, slug: &str, buttons: &[&str]) {
    Mock::given(method("GET"))
        .and(path(format!("/sb/{}/", slug)))
        .respond_with(html(detail_page(slug, buttons)))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("/sb/{}/sounds.js", slug)))
        .respond_with(ResponseTemplate::new(200).set_body_string("var sounds = [];"))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("/sb/{}/behavior.js", slug)))
        .respond_with(ResponseTemplate::new(200).set_body_string(format!(
            r#"function play(sound) {{ new Audio("/sb/sounds/{slug}/" + sound + ".mp3").play(); }}"#
        )))
        .mount(server)
        .await;
}

async fn mount_clip(server: &MockServer, slug: &str, name: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/sb/sounds/{}/{}.mp3", slug, name)))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(format!("ID3 {}", name).into_bytes())
                .insert_header("content-type", "audio/mpeg"),
        )
        .mount(server)
        .await;
}

fn reopen_store(dir: &Path) -> SnapshotStore {
    SnapshotStore::open(&dir.join("data/posts.json"), WritePolicy::Immediate)
        .expect("store should reopen after the run")
}

#[tokio::test]
async fn test_full_paginated_crawl() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let tmp = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/sb/"))
        .and(header_exists("user-agent"))
        .respond_with(html(listing_page(&[
            article(10, "amy", "Amy Soundboard"),
            article(11, "bob", "Bob Soundboard"),
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/sb/page/2/"))
        .respond_with(html(listing_page(&[])))
        .expect(1)
        .mount(&mock_server)
        .await;

    mount_board(&mock_server, "amy", &["hello", "bye"]).await;
    mount_board(&mock_server, "bob", &["yo"]).await;
    mount_clip(&mock_server, "amy", "hello").await;
    mount_clip(&mock_server, "amy", "bye").await;

    // Asset requests carry the detail page as referer
    Mock::given(method("GET"))
        .and(path("/sb/sounds/bob/yo.mp3"))
        .and(header("referer", format!("{}/sb/bob/", base_url).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"ID3 yo".to_vec()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&base_url, tmp.path(), 5);
    let stats = {
        let mut coordinator = Coordinator::from_config(config).unwrap();
        coordinator.run().await.unwrap()
    };

    assert_eq!(stats.total, 2);
    assert_eq!(stats.new, 2);
    assert_eq!(stats.updated, 0);
    assert_eq!(stats.errors, 0);
    assert_eq!(stats.details_crawled, 2);
    assert_eq!(stats.pages_scanned, 2);

    let output = tmp.path().join("output");
    assert_eq!(
        std::fs::read(output.join("amy-soundboard/assets/hello.mp3")).unwrap(),
        b"ID3 hello"
    );
    assert!(output.join("amy-soundboard/assets/bye.mp3").exists());
    assert!(output.join("bob-soundboard/assets/yo.mp3").exists());

    let metadata = read_metadata(&output.join("amy-soundboard")).await.unwrap();
    assert_eq!(metadata.id, "10");
    assert_eq!(metadata.base_path, "/sb/sounds/amy/");
    assert_eq!(metadata.assets.len(), 2);
    assert_eq!(metadata.assets[0].position_id, 1);
    assert_eq!(metadata.assets[1].remote_name, "bye");

    let store = reopen_store(tmp.path());
    assert_eq!(store.len(), 2);
    let amy = store.get("10").unwrap();
    assert_eq!(amy.title.text.as_deref(), Some("Amy Soundboard"));
    assert_eq!(amy.date.as_deref(), Some("January 5, 2024"));
    assert_eq!(amy.categories.len(), 1);
    assert_eq!(amy.assets.len(), 2);
    for asset in &amy.assets {
        let rel = asset.local_relative_path.as_deref().unwrap();
        let len = std::fs::metadata(output.join("amy-soundboard").join(rel))
            .unwrap()
            .len();
        assert!(len > 0);
    }
}

#[tokio::test]
async fn test_quota_stops_pagination() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let tmp = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/sb/"))
        .respond_with(html(listing_page(&[
            article(1, "one", "One"),
            article(2, "two", "Two"),
            article(3, "three", "Three"),
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/sb/page/2/"))
        .respond_with(html(listing_page(&[article(4, "four", "Four")])))
        .expect(0)
        .mount(&mock_server)
        .await;

    for slug in ["one", "two"] {
        mount_board(&mock_server, slug, &["a"]).await;
        mount_clip(&mock_server, slug, "a").await;
    }

    // Third record is over quota and must not be crawled
    Mock::given(method("GET"))
        .and(path("/sb/three/"))
        .respond_with(html(detail_page("three", &["a"])))
        .expect(0)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&base_url, tmp.path(), 2);
    let stats = {
        let mut coordinator = Coordinator::from_config(config).unwrap();
        coordinator.run().await.unwrap()
    };

    assert_eq!(stats.details_crawled, 2);
    assert_eq!(stats.new, 2);
    assert_eq!(stats.pages_scanned, 1);

    let store = reopen_store(tmp.path());
    assert!(store.has("1"));
    assert!(store.has("2"));
    assert!(!store.has("3"));
}

#[tokio::test]
async fn test_empty_first_page_ends_run() {
    let mock_server = MockServer::start().await;
    let tmp = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/sb/"))
        .respond_with(html(listing_page(&[])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri(), tmp.path(), 5);
    let mut coordinator = Coordinator::from_config(config).unwrap();
    let stats = coordinator.run().await.unwrap();

    assert_eq!(stats.pages_scanned, 1);
    assert_eq!(stats.total, 0);
    assert_eq!(stats.details_crawled, 0);
}

#[tokio::test]
async fn test_failing_asset_is_pruned() {
    let mock_server = MockServer::start().await;
    let tmp = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/sb/"))
        .respond_with(html(listing_page(&[article(20, "cat", "Cat")])))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/sb/page/2/"))
        .respond_with(html(listing_page(&[])))
        .mount(&mock_server)
        .await;

    mount_board(&mock_server, "cat", &["meow", "hiss", "purr"]).await;
    mount_clip(&mock_server, "cat", "meow").await;
    mount_clip(&mock_server, "cat", "purr").await;

    Mock::given(method("GET"))
        .and(path("/sb/sounds/cat/hiss.mp3"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri(), tmp.path(), 5);
    let stats = {
        let mut coordinator = Coordinator::from_config(config).unwrap();
        coordinator.run().await.unwrap()
    };

    assert_eq!(stats.new, 1);
    assert_eq!(stats.errors, 0);

    let item_dir = tmp.path().join("output/cat");
    let metadata = read_metadata(&item_dir).await.unwrap();
    let names: Vec<_> = metadata
        .assets
        .iter()
        .map(|a| a.remote_name.as_str())
        .collect();
    assert_eq!(names, vec!["meow", "purr"]);
    assert!(!item_dir.join("assets/hiss.mp3").exists());

    let store = reopen_store(tmp.path());
    assert_eq!(store.get("20").unwrap().assets.len(), 2);
}

#[tokio::test]
async fn test_single_target_twice_skips_existing_assets() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let tmp = TempDir::new().unwrap();

    mount_board(&mock_server, "dark-knight", &["laugh"]).await;
    Mock::given(method("GET"))
        .and(path("/sb/sounds/dark-knight/laugh.mp3"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"ID3 laugh".to_vec()))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/sb/"))
        .respond_with(html(listing_page(&[])))
        .expect(0)
        .mount(&mock_server)
        .await;

    let mut config = create_test_config(&base_url, tmp.path(), 5);
    config.crawler.target_url = Some(format!("{}/sb/dark-knight/", base_url));

    let first = {
        let mut coordinator = Coordinator::from_config(config.clone()).unwrap();
        coordinator.run().await.unwrap()
    };
    assert_eq!(first.total, 1);
    assert_eq!(first.new, 1);
    assert_eq!(first.details_crawled, 1);

    let crawled_at = reopen_store(tmp.path()).get("dark-knight").unwrap().crawled_at;

    let second = {
        let mut coordinator = Coordinator::from_config(config).unwrap();
        coordinator.run().await.unwrap()
    };
    assert_eq!(second.new, 0);
    assert_eq!(second.updated, 1);

    let store = reopen_store(tmp.path());
    let item = store.get("dark-knight").unwrap();
    assert_eq!(item.title.text.as_deref(), Some("Dark Knight"));
    assert_eq!(item.crawled_at, crawled_at);
    assert!(item.updated_at >= item.crawled_at);
    assert_eq!(
        item.assets[0].local_relative_path.as_deref(),
        Some("assets/laugh.mp3")
    );
    assert!(tmp
        .path()
        .join("output/dark-knight/assets/laugh.mp3")
        .exists());
}

#[tokio::test]
async fn test_second_run_refreshes_known_items() {
    let mock_server = MockServer::start().await;
    let tmp = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/sb/"))
        .respond_with(html(listing_page(&[article(30, "owl", "Owl")])))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/sb/page/2/"))
        .respond_with(html(listing_page(&[])))
        .mount(&mock_server)
        .await;

    mount_board(&mock_server, "owl", &["hoot"]).await;
    Mock::given(method("GET"))
        .and(path("/sb/sounds/owl/hoot.mp3"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"ID3 hoot".to_vec()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri(), tmp.path(), 5);
    for _ in 0..2 {
        let mut coordinator = Coordinator::from_config(config.clone()).unwrap();
        coordinator.run().await.unwrap();
    }

    let store = reopen_store(tmp.path());
    assert_eq!(store.len(), 1);
    assert_eq!(store.get("30").unwrap().assets.len(), 1);
}
