//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and run full crawls
//! through the real HTTP fetcher, end-to-end.

use docwatch::config::{SiteConfig, StaticSites, TomlSiteSource};
use docwatch::crawler::{CrawlSettings, HttpFetcher, Orchestrator, RunRegistry};
use docwatch::output::TriggerType;
use docwatch::state::{content_hash, SiteStatus};
use docwatch::storage::{DocumentStore, MemoryStore, SqliteStore};
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tempfile::{NamedTempFile, TempDir};
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const REPORT_BYTES: &[u8] = b"%PDF-1.4 annual report";
const OFFSITE_BYTES: &[u8] = b"%PDF-1.4 hosted elsewhere";

/// Fast settings for tests: no polite delay, short timeouts
fn test_settings() -> CrawlSettings {
    CrawlSettings {
        page_timeout: Duration::from_secs(5),
        download_timeout: Duration::from_secs(5),
        sub_crawl_cap: 100,
        polite_delay: Duration::ZERO,
    }
}

fn html(body: impl Into<String>) -> ResponseTemplate {
    let body: String = body.into();
    ResponseTemplate::new(200).set_body_raw(body, "text/html")
}

fn pdf(bytes: &[u8]) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(bytes.to_vec(), "application/pdf")
}

async fn mount_get(server: &MockServer, route: &str, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(response)
        .mount(server)
        .await;
}

fn orchestrator(sites: Vec<SiteConfig>, store: Arc<dyn DocumentStore>) -> Orchestrator {
    let fetcher = HttpFetcher::new(Some("docwatch-test/1.0")).expect("Failed to build fetcher");
    Orchestrator::new(
        Arc::new(StaticSites::new(sites)),
        store,
        Arc::new(fetcher),
        test_settings(),
    )
}

/// Site whose entry page links one local report and one document on another server
async fn site_with_offsite_link() -> (MockServer, MockServer) {
    let site = MockServer::start().await;
    let other = MockServer::start().await;

    mount_get(
        &site,
        "/",
        html(format!(
            r#"<html><body>
            <a href="/docs/report.pdf">Annual report</a>
            <a href="{}/x.pdf">Partner publication</a>
            <a href="/about">About us</a>
            </body></html>"#,
            other.uri()
        )),
    )
    .await;
    mount_get(&site, "/docs/report.pdf", pdf(REPORT_BYTES)).await;
    mount_get(&other, "/x.pdf", pdf(OFFSITE_BYTES)).await;

    (site, other)
}

#[tokio::test]
async fn test_full_run_then_unchanged_rerun() {
    let (site, _other) = site_with_offsite_link().await;
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let store: Arc<dyn DocumentStore> = Arc::new(
        SqliteStore::new(&temp_dir.path().join("docwatch.db")).expect("Failed to open store"),
    );

    let orch = orchestrator(
        vec![SiteConfig::new("agency", "Example Agency", format!("{}/", site.uri()))],
        store.clone(),
    );

    // First run: everything is new
    let first = orch.run(TriggerType::Manual, CancellationToken::new()).await;
    let totals = first.totals();

    assert_eq!(first.sites[0].status, SiteStatus::Success);
    assert_eq!(totals.found, 2);
    assert_eq!(totals.new, 2);
    assert_eq!(totals.uploaded, 2);
    assert_eq!(first.ledger_entries, 2);
    assert!(first.validation.as_ref().unwrap().matches);

    let ledger = store.get_hash_ledger().await.unwrap();
    let report = ledger
        .get(&format!("{}/docs/report.pdf", site.uri()))
        .expect("report should be in the ledger");
    assert_eq!(report.content_hash, content_hash(REPORT_BYTES));
    assert!(report.storage_key.starts_with("example-agency/"));
    assert!(report.storage_key.ends_with("_report.pdf"));

    // Second run: nothing changed, nothing uploaded
    let second = orch.run(TriggerType::Scheduled, CancellationToken::new()).await;
    let totals = second.totals();

    assert_eq!(totals.unchanged, 2);
    assert_eq!(totals.uploaded, 0);
    assert_eq!(store.stored_document_count().await.unwrap(), 2);

    let history = store.run_history(10).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].trigger, TriggerType::Scheduled);
    assert_eq!(history[1].totals().uploaded, 2);
}

#[tokio::test]
async fn test_changed_document_is_stored_again() {
    let site = MockServer::start().await;
    mount_get(&site, "/", html(r#"<a href="/policy.docx">Policy</a>"#)).await;

    // First version served once, then the updated version
    Mock::given(method("GET"))
        .and(path("/policy.docx"))
        .respond_with(pdf(b"version one"))
        .up_to_n_times(1)
        .mount(&site)
        .await;
    mount_get(&site, "/policy.docx", pdf(b"version two")).await;

    let store = Arc::new(MemoryStore::new());
    let orch = orchestrator(
        vec![SiteConfig::new("p", "Policies", format!("{}/", site.uri()))],
        store.clone(),
    );

    orch.run(TriggerType::Manual, CancellationToken::new()).await;
    let second = orch.run(TriggerType::Manual, CancellationToken::new()).await;

    assert_eq!(second.totals().changed, 1);
    assert_eq!(second.totals().uploaded, 1);
    let record = store
        .ledger()
        .get(&format!("{}/policy.docx", site.uri()))
        .cloned()
        .unwrap();
    assert_eq!(record.content_hash, content_hash(b"version two"));
    assert_eq!(store.document(&record.storage_key).unwrap().bytes, b"version two");
}

#[tokio::test]
async fn test_blocked_site_does_not_affect_others() {
    let (good, _other) = site_with_offsite_link().await;
    let blocked = MockServer::start().await;
    mount_get(&blocked, "/", ResponseTemplate::new(403)).await;

    let store = Arc::new(MemoryStore::new());
    let orch = orchestrator(
        vec![
            SiteConfig::new("blocked", "Blocked Agency", format!("{}/", blocked.uri())),
            SiteConfig::new("good", "Good Agency", format!("{}/", good.uri())),
        ],
        store.clone(),
    );

    let summary = orch.run(TriggerType::Manual, CancellationToken::new()).await;

    assert_eq!(summary.sites_total(), 2);
    assert_eq!(summary.sites_blocked(), 1);
    assert_eq!(summary.sites_successful(), 1);

    let blocked_result = summary.site("blocked").unwrap();
    assert_eq!(blocked_result.status, SiteStatus::Blocked);
    assert_eq!(blocked_result.error.as_deref(), Some("HTTP 403 - access blocked"));
    assert_eq!(summary.site("good").unwrap().counts.uploaded, 2);
}

#[tokio::test]
async fn test_server_error_and_empty_site() {
    let broken = MockServer::start().await;
    mount_get(&broken, "/", ResponseTemplate::new(500)).await;

    let empty = MockServer::start().await;
    mount_get(&empty, "/", html(r#"<a href="/contact">Contact</a>"#)).await;

    let orch = orchestrator(
        vec![
            SiteConfig::new("broken", "Broken", format!("{}/", broken.uri())),
            SiteConfig::new("empty", "Empty", format!("{}/", empty.uri())),
        ],
        Arc::new(MemoryStore::new()),
    );

    let summary = orch.run(TriggerType::Manual, CancellationToken::new()).await;

    let broken_result = summary.site("broken").unwrap();
    assert_eq!(broken_result.status, SiteStatus::Error);
    assert!(broken_result.error.as_ref().unwrap().contains("HTTP 500"));
    assert_eq!(summary.site("empty").unwrap().status, SiteStatus::NoDocuments);
}

#[tokio::test]
async fn test_multi_level_stays_on_site() {
    let site = MockServer::start().await;
    let elsewhere = MockServer::start().await;

    mount_get(&site, "/", html(r#"<a href="/publications/index">Publications</a>"#)).await;
    mount_get(
        &site,
        "/publications/index",
        html(format!(
            r#"<a href="/publications/deep.pdf">Deep</a>
               <a href="{}/offsite.pdf">Offsite</a>"#,
            elsewhere.uri()
        )),
    )
    .await;
    mount_get(&site, "/publications/deep.pdf", pdf(b"%PDF deep")).await;

    Mock::given(method("GET"))
        .and(path("/offsite.pdf"))
        .respond_with(pdf(OFFSITE_BYTES))
        .expect(0)
        .mount(&elsewhere)
        .await;

    let mut config = SiteConfig::new("pubs", "Publications", format!("{}/", site.uri()));
    config.multi_level = true;
    config.max_depth = 2;

    let store = Arc::new(MemoryStore::new());
    let summary = orchestrator(vec![config], store.clone())
        .run(TriggerType::Manual, CancellationToken::new())
        .await;

    let counts = summary.sites[0].counts;
    // The index page itself is a pattern-only candidate and is skipped
    assert_eq!(counts.found, 2);
    assert_eq!(counts.skipped, 1);
    assert_eq!(counts.uploaded, 1);

    let key = &store.keys()[0];
    let stored = store.document(key).unwrap();
    assert_eq!(stored.metadata.crawl_level, 2);
    assert_eq!(stored.metadata.source_url, format!("{}/publications/deep.pdf", site.uri()));
}

#[tokio::test]
async fn test_guidance_capture() {
    let site = MockServer::start().await;
    let paragraph = "Prosecutors should consider bail conditions carefully and record their reasons. ";

    mount_get(
        &site,
        "/guidance",
        html(r#"<a href="/guidance/bail">Bail</a><a href="/guidance?page=2">Next page</a>"#),
    )
    .await;
    mount_get(
        &site,
        "/guidance/bail",
        html(
            r#"<nav><a href="/guidance/bail/conditions">Conditions</a></nav>
               <a href="/guidance/bail/brief">Brief</a>
               <a href="/guidance/bail/form.pdf">Form</a>"#,
        ),
    )
    .await;
    mount_get(
        &site,
        "/guidance/bail/conditions",
        html(format!(
            r#"<html><head><title>Bail conditions</title></head><body>
               <nav>Home | Guidance</nav>
               <main><h1>Bail conditions</h1><p>{}</p></main>
               <footer>Crown copyright</footer></body></html>"#,
            paragraph.repeat(4)
        )),
    )
    .await;
    mount_get(
        &site,
        "/guidance/bail/brief",
        html("<main><p>Under review.</p></main>"),
    )
    .await;

    let mut config = SiteConfig::new("guidance", "Guidance Hub", format!("{}/guidance", site.uri()));
    config.capture_html_guidance = true;

    let store = Arc::new(MemoryStore::new());
    let summary = orchestrator(vec![config], store.clone())
        .run(TriggerType::Manual, CancellationToken::new())
        .await;

    let counts = summary.sites[0].counts;
    assert_eq!(counts.found, 2);
    assert_eq!(counts.uploaded, 1);
    assert_eq!(counts.rejected, 1);

    let url = format!("{}/guidance/bail/conditions", site.uri());
    let record = store.ledger().get(&url).cloned().unwrap();
    assert!(record.storage_key.ends_with("_conditions.txt"));

    let text = String::from_utf8(store.document(&record.storage_key).unwrap().bytes).unwrap();
    assert!(text.starts_with(&format!("Bail conditions\nSource: {}\n\n", url)));
    assert!(text.contains("record their reasons"));
    assert!(!text.contains("Crown copyright"));
}

#[tokio::test]
async fn test_store_failure_retries_next_run() {
    let (site, _other) = site_with_offsite_link().await;
    let store = Arc::new(MemoryStore::new().failing_puts());
    let orch = orchestrator(
        vec![SiteConfig::new("agency", "Example Agency", format!("{}/", site.uri()))],
        store.clone(),
    );

    let first = orch.run(TriggerType::Manual, CancellationToken::new()).await;
    assert_eq!(first.totals().failed, 2);
    assert_eq!(first.totals().uploaded, 0);
    assert!(store.ledger().is_empty());

    // Hashes were never recorded, so the documents are still new
    let second = orch.run(TriggerType::Manual, CancellationToken::new()).await;
    assert_eq!(second.totals().new, 2);
}

#[tokio::test]
async fn test_entry_page_timeout() {
    let slow = MockServer::start().await;
    mount_get(
        &slow,
        "/",
        html("<p>late</p>").set_delay(Duration::from_secs(3)),
    )
    .await;

    let fetcher = HttpFetcher::new(None).unwrap();
    let orch = Orchestrator::new(
        Arc::new(StaticSites::new(vec![SiteConfig::new(
            "slow",
            "Slow",
            format!("{}/", slow.uri()),
        )])),
        Arc::new(MemoryStore::new()),
        Arc::new(fetcher),
        CrawlSettings {
            page_timeout: Duration::from_millis(300),
            ..test_settings()
        },
    );

    let summary = orch.run(TriggerType::Manual, CancellationToken::new()).await;
    let result = &summary.sites[0];
    assert_eq!(result.status, SiteStatus::Error);
    assert!(result.error.as_ref().unwrap().contains("Timed out"));
}

#[tokio::test]
async fn test_registry_timeout_cancels_unfinished_sites() {
    let (fast, _other) = site_with_offsite_link().await;
    let slow = MockServer::start().await;
    mount_get(
        &slow,
        "/",
        html("<p>late</p>").set_delay(Duration::from_secs(4)),
    )
    .await;

    let store = Arc::new(MemoryStore::new());
    let orch = orchestrator(
        vec![
            SiteConfig::new("fast", "Fast", format!("{}/", fast.uri())),
            SiteConfig::new("slow", "Slow", format!("{}/", slow.uri())),
        ],
        store.clone(),
    );
    let registry = RunRegistry::new(orch).with_timeout(Some(Duration::from_millis(1500)));

    let id = registry.start_run(TriggerType::Orchestrated);
    let summary = registry.wait(id).await.unwrap();

    assert!(summary.cancelled);
    assert_eq!(summary.site("fast").unwrap().status, SiteStatus::Success);
    assert_eq!(
        summary.site("slow").unwrap().error.as_deref(),
        Some("cancelled before completion")
    );
    // Work finished before the cancellation is kept
    assert_eq!(store.ledger().len(), 2);
    assert_eq!(store.run_history(1).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_sites_loaded_from_toml() {
    let (site, _other) = site_with_offsite_link().await;
    let disabled = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(html("<p>never</p>"))
        .expect(0)
        .mount(&disabled)
        .await;

    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
[crawler]
polite-delay-ms = 0

[output]
database-path = "./unused.db"
summary-path = "./unused.md"

[[site]]
id = "agency"
name = "Example Agency"
url = "{}/"
enabled = true

[[site]]
id = "retired"
name = "Retired Site"
url = "{}/"
"#,
        site.uri(),
        disabled.uri()
    )
    .unwrap();
    file.flush().unwrap();

    let fetcher = HttpFetcher::new(None).unwrap();
    let orch = Orchestrator::new(
        Arc::new(TomlSiteSource::new(file.path())),
        Arc::new(MemoryStore::new()),
        Arc::new(fetcher),
        test_settings(),
    );

    let summary = orch.run(TriggerType::Scheduled, CancellationToken::new()).await;

    assert_eq!(summary.sites_total(), 1);
    assert_eq!(summary.sites[0].site_id, "agency");
    assert_eq!(summary.totals().uploaded, 2);
}
