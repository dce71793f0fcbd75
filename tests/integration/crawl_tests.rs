//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and run the crawl
//! loop end-to-end against them. Random target generation is always off so
//! nothing outside the mock servers is contacted.

use knot_crawler::config::CrawlerConfig;
use knot_crawler::crawler::{CrawlEvent, CrawlOptions, CrawlReport, Crawler};
use knot_crawler::storage::{Client, SqliteClient};
use knot_crawler::SharedConfig;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration that never generates random targets
fn create_test_config(targets_cap: usize) -> SharedConfig {
    SharedConfig::new(CrawlerConfig {
        request_timeout: 2000,
        targets_cap,
        unsafe_mode: false,
        generate_random_targets: false,
        log_to_console: false,
    })
}

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.to_string(), "text/html")
}

fn one_batch(targets: Vec<String>) -> CrawlOptions {
    CrawlOptions {
        targets,
        repetitions: Some(1),
        run_for: None,
    }
}

fn drain(events: &mut UnboundedReceiver<CrawlEvent>) -> Vec<CrawlEvent> {
    let mut drained = Vec::new();
    while let Ok(event) = events.try_recv() {
        drained.push(event);
    }
    drained
}

fn log_messages(events: &[CrawlEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|event| match event {
            CrawlEvent::Log(entry) => Some(entry.message.clone()),
            _ => None,
        })
        .collect()
}

async fn request_count(server: &MockServer) -> usize {
    server
        .received_requests()
        .await
        .map_or(0, |requests| requests.len())
}

#[tokio::test]
async fn test_crawl_single_page_discovers_links() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(
            r#"<html><head><title>Home</title></head><body>
            <p>Welcome to the home page</p>
            <a href="http://alpha.example/">Alpha</a>
            <a href="http://beta.example/docs">Beta</a>
            <a href="https://gamma.example/?q=1">Gamma</a>
            <a href="about.html">About</a>
            <a href="http://alpha.example/">Alpha again</a>
            </body></html>"#,
        ))
        .expect(1)
        .mount(&mock_server)
        .await;

    let crawler = Crawler::new(create_test_config(10)).unwrap();
    let mut events = crawler.subscribe();

    let report = crawler.run(one_batch(vec![base_url.clone()])).await;

    assert_eq!(report.batches, 1);
    assert_eq!(report.examined, 1);
    assert_eq!(report.valid, 1);

    let frontier: HashSet<String> = report.frontier.into_iter().collect();
    let expected: HashSet<String> = [
        "http://alpha.example/".to_string(),
        "http://beta.example/docs".to_string(),
        "https://gamma.example/?q=1".to_string(),
        format!("{}/about.html", base_url),
    ]
    .into_iter()
    .collect();
    assert_eq!(frontier, expected);

    let events = drain(&mut events);
    assert!(log_messages(&events).contains(&"Detected 4 new targets".to_string()));
    assert!(events.contains(&CrawlEvent::Valid { count: 1, total: 1 }));
    assert!(events.contains(&CrawlEvent::Examined { count: 1, total: 1 }));
    assert_eq!(events.last(), Some(&CrawlEvent::Finished { batches: 1 }));
}

#[tokio::test]
async fn test_pause_before_start_waits_for_resume() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html("<html><body><p>Paused page content</p></body></html>"))
        .mount(&mock_server)
        .await;

    let crawler = Arc::new(Crawler::new(create_test_config(10)).unwrap());
    let handle = crawler.handle();
    let mut events = crawler.subscribe();

    handle.pause();

    let runner = {
        let crawler = crawler.clone();
        let targets = vec![mock_server.uri()];
        tokio::spawn(async move { crawler.run(one_batch(targets)).await })
    };

    // The loop must announce the pause and then sit idle
    let first = tokio::time::timeout(Duration::from_secs(2), events.recv())
        .await
        .unwrap();
    assert_eq!(first, Some(CrawlEvent::Pause(true)));

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(request_count(&mock_server).await, 0);
    assert!(!runner.is_finished());

    handle.resume();

    let report: CrawlReport = tokio::time::timeout(Duration::from_secs(5), runner)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(report.batches, 1);
    assert_eq!(request_count(&mock_server).await, 1);

    let events = drain(&mut events);
    let paused = events
        .iter()
        .filter(|e| **e == CrawlEvent::Pause(true))
        .count();
    let resumed = events
        .iter()
        .filter(|e| **e == CrawlEvent::Pause(false))
        .count();
    assert_eq!(paused, 0, "pause event was already received");
    assert_eq!(resumed, 1);
    assert_eq!(events.first(), Some(&CrawlEvent::Pause(false)));
}

#[tokio::test]
async fn test_unusual_error_is_logged_once() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let target = format!("{}/broken", mock_server.uri());
    let crawler = Crawler::new(create_test_config(10)).unwrap();
    let mut events = crawler.subscribe();

    let report = crawler.run(one_batch(vec![target.clone()])).await;

    assert_eq!(report.valid, 0);
    assert!(report.frontier.is_empty());

    let logs = log_messages(&drain(&mut events));
    assert_eq!(logs.len(), 1, "{:?}", logs);
    assert!(logs[0].contains(&target));
    assert!(logs[0].contains("500"));
}

#[tokio::test]
async fn test_refused_connection_is_silent() {
    // Bind then drop a listener to get a local port nobody listens on
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let crawler = Crawler::new(create_test_config(10)).unwrap();
    let mut events = crawler.subscribe();

    let report = crawler
        .run(one_batch(vec![format!("127.0.0.1:{}", port)]))
        .await;

    assert_eq!(report.batches, 1);
    assert_eq!(report.examined, 1);
    assert_eq!(report.valid, 0);
    assert!(log_messages(&drain(&mut events)).is_empty());
}

#[tokio::test]
async fn test_non_html_page_is_skipped() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data.json"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(r#"{"href": "http://alpha.example/"}"#, "application/json"),
        )
        .mount(&mock_server)
        .await;

    let client = Arc::new(SqliteClient::open_in_memory().unwrap());
    client.test().unwrap();

    let crawler = Crawler::new(create_test_config(10))
        .unwrap()
        .with_client(client.clone());
    let mut events = crawler.subscribe();

    let report = crawler
        .run(one_batch(vec![format!("{}/data.json", mock_server.uri())]))
        .await;

    assert_eq!(report.valid, 0);
    assert!(report.frontier.is_empty());
    assert_eq!(client.count_hosts().unwrap(), 0);
    assert!(log_messages(&drain(&mut events)).is_empty());
}

#[tokio::test]
async fn test_inspected_pages_are_stored() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/gallery/"))
        .respond_with(
            html(
                r#"<html><head><title>Gallery</title></head><body>
                <h1>Photo gallery</h1>
                <p>Pictures from the trip</p>
                <div>Sunset<img src="sunset.jpg" alt="Beach"></div>
                </body></html>"#,
            )
            .insert_header("server", "nginx"),
        )
        .mount(&mock_server)
        .await;

    let client = Arc::new(SqliteClient::open_in_memory().unwrap());
    client.test().unwrap();

    let crawler = Crawler::new(create_test_config(10))
        .unwrap()
        .with_client(client.clone());

    let addr = format!("{}/gallery/", mock_server.uri());
    let report = crawler.run(one_batch(vec![addr.clone()])).await;
    assert_eq!(report.valid, 1);

    let hosts = client.recent_hosts(10).unwrap();
    assert_eq!(hosts.len(), 1);
    assert_eq!(hosts[0].addr, addr);
    assert_eq!(hosts[0].title, "Gallery");
    assert_eq!(hosts[0].contents, "Photo gallery Pictures from the trip");
    assert_eq!(hosts[0].keywords, "nginx");

    let images = client.images_for(&addr).unwrap();
    assert_eq!(images.len(), 1);
    assert_eq!(images[0].src, format!("{}sunset.jpg", addr));
    assert_eq!(images[0].dsc, "Beach Sunset");
}

#[tokio::test]
async fn test_discovered_links_respect_cap() {
    let mock_server = MockServer::start().await;

    let links = (0..6)
        .map(|i| format!(r#"<a href="/page{}">Page {}</a>"#, i, i))
        .collect::<String>();
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(&format!(
            "<html><body><p>Lots of links here</p>{}</body></html>",
            links
        )))
        .mount(&mock_server)
        .await;

    let crawler = Crawler::new(create_test_config(3)).unwrap();
    let report = crawler.run(one_batch(vec![mock_server.uri()])).await;

    assert_eq!(report.frontier.len(), 3);
}

#[tokio::test]
async fn test_frontier_feeds_next_batch() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(
            r#"<html><body><p>Start page with a link</p><a href="/next">Next</a></body></html>"#,
        ))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/next"))
        .respond_with(html("<html><body><p>The end of the road</p></body></html>"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let crawler = Crawler::new(create_test_config(10)).unwrap();
    let mut events = crawler.subscribe();

    let report = crawler
        .run(CrawlOptions {
            targets: vec![base_url],
            repetitions: Some(5),
            run_for: None,
        })
        .await;

    // The second page has no links, so the third iteration has nothing to do
    assert_eq!(report.batches, 2);
    assert_eq!(report.valid, 2);
    assert!(report.frontier.is_empty());

    let logs = log_messages(&drain(&mut events));
    assert_eq!(logs.last().map(String::as_str), Some("No targets"));
}

#[tokio::test]
async fn test_cap_lowered_at_runtime_drops_targets() {
    let mock_server = MockServer::start().await;

    let config = create_test_config(10);
    let crawler = Crawler::new(config.clone()).unwrap();
    let mut events = crawler.subscribe();

    config.set_targets_cap(1);

    let targets = vec![
        format!("{}/a", mock_server.uri()),
        format!("{}/b", mock_server.uri()),
    ];
    let report = crawler.run(one_batch(targets)).await;

    assert_eq!(report.batches, 0);
    assert_eq!(request_count(&mock_server).await, 0);

    let logs = log_messages(&drain(&mut events));
    assert_eq!(logs.len(), 2, "{:?}", logs);
    assert!(logs[0].contains("dropped 2 targets"));
    assert_eq!(logs[1], "No targets");
}

#[tokio::test]
async fn test_pause_during_crawl_waits_for_batch_boundary() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(
            r#"<html><body><p>First page of the chain</p><a href="/one">One</a></body></html>"#,
        ))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/one"))
        .respond_with(
            html(r#"<html><body><p>Second page of the chain</p><a href="/two">Two</a></body></html>"#)
                .set_delay(Duration::from_millis(300)),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/two"))
        .respond_with(html("<html><body><p>Last page of the chain</p></body></html>"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let crawler = Arc::new(Crawler::new(create_test_config(10)).unwrap());
    let handle = crawler.handle();
    let mut events = crawler.subscribe();

    let runner = {
        let crawler = crawler.clone();
        let options = CrawlOptions {
            targets: vec![mock_server.uri()],
            repetitions: Some(3),
            run_for: None,
        };
        tokio::spawn(async move { crawler.run(options).await })
    };

    // Request the pause as soon as the first batch is reported
    let mut before_pause = Vec::new();
    loop {
        let event = tokio::time::timeout(Duration::from_secs(5), events.recv())
            .await
            .unwrap()
            .unwrap();
        let first_batch_done = matches!(event, CrawlEvent::Examined { total: 1, .. });
        before_pause.push(event);
        if first_batch_done {
            handle.pause();
            break;
        }
    }

    // The loop only stops once the batch in flight (if any) has settled
    loop {
        let event = tokio::time::timeout(Duration::from_secs(5), events.recv())
            .await
            .unwrap()
            .unwrap();
        if event == CrawlEvent::Pause(true) {
            break;
        }
        before_pause.push(event);
    }
    assert!(matches!(before_pause.last(), Some(CrawlEvent::Rates { .. })));

    let batches_before_pause = before_pause
        .iter()
        .filter(|e| matches!(e, CrawlEvent::Examined { .. }))
        .count();
    assert!(batches_before_pause >= 1);
    assert_eq!(request_count(&mock_server).await, batches_before_pause);

    // Nothing moves while paused
    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(request_count(&mock_server).await, batches_before_pause);
    assert!(!runner.is_finished());

    handle.resume();

    let report = tokio::time::timeout(Duration::from_secs(5), runner)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(report.batches, 3);
    assert_eq!(report.valid, 3);
    assert_eq!(request_count(&mock_server).await, 3);

    let after_pause = drain(&mut events);
    assert_eq!(after_pause.first(), Some(&CrawlEvent::Pause(false)));
    assert_eq!(
        after_pause
            .iter()
            .filter(|e| matches!(e, CrawlEvent::Pause(_)))
            .count(),
        1
    );
    assert!(!before_pause
        .iter()
        .any(|e| matches!(e, CrawlEvent::Pause(_))));
    assert_eq!(after_pause.last(), Some(&CrawlEvent::Finished { batches: 3 }));
}

#[tokio::test]
async fn test_duplicate_seeds_are_fetched_once() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let bare = base_url.trim_start_matches("http://").to_string();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html("<html><body><p>Only fetched a single time</p></body></html>"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let crawler = Crawler::new(create_test_config(10)).unwrap();
    let report = crawler
        .run(one_batch(vec![bare.clone(), base_url.clone(), bare]))
        .await;

    assert_eq!(report.examined, 1);
    assert_eq!(report.valid, 1);
    assert_eq!(request_count(&mock_server).await, 1);
}
