//! End-to-end harvest scenarios

use kb_harvester::config::{
    AuthConfig, Config, FetchConfig, HarvestConfig, ImageConfig, NestedIndexConfig, OutputConfig,
    ScopeConfig, SelectorConfig,
};
use kb_harvester::{HarvestError, HarvestStats, Harvester};
use std::fs;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a, 7, 7, 7];

/// Creates a test configuration harvesting `roots` (paths on the mock server)
fn create_test_config(server: &MockServer, dir: &TempDir, roots: &[&str], max_depth: u32) -> Config {
    Config {
        harvest: HarvestConfig {
            roots: roots
                .iter()
                .map(|root| format!("{}{}", server.uri(), root))
                .collect(),
            max_depth,
            reset_visited_per_root: true,
            recheck_duplicates_below_depth: None,
            dedup_fragments: false,
        },
        scope: ScopeConfig {
            allowed_domains: vec!["127.0.0.1".to_string()],
        },
        selectors: SelectorConfig {
            content: vec!["main".to_string()],
            title: vec!["h1".to_string(), "title".to_string()],
            ignored: vec![".footer".to_string()],
            navigation: vec![".pagination".to_string()],
            non_recursive: vec![".external".to_string()],
            fragments: vec![".see-also".to_string()],
            nested_index: None,
        },
        fetch: FetchConfig {
            timeout_secs: 5,
            user_agent: "kb-harvester-tests".to_string(),
        },
        auth: None,
        images: ImageConfig {
            enabled: true,
            directory: dir.path().join("images").to_string_lossy().to_string(),
            max_attempts: 3,
            retry_delay_ms: 10,
        },
        output: OutputConfig {
            directory: dir.path().join("out").to_string_lossy().to_string(),
        },
    }
}

fn page(title: &str, body: &str) -> String {
    format!(
        "<html><head><title>{}</title></head><body><main>{}</main></body></html>",
        title, body
    )
}

async fn mount_page(server: &MockServer, route: &str, html: String, expected: u64) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_raw(html, "text/html"))
        .expect(expected)
        .mount(server)
        .await;
}

async fn harvest(config: Config) -> HarvestStats {
    Harvester::connect(config)
        .await
        .expect("harvester should start")
        .run()
        .await
        .expect("harvest should succeed")
}

/// Names of the artifact files written so far, sorted
fn artifact_files(dir: &TempDir) -> Vec<String> {
    let mut names: Vec<String> = match fs::read_dir(dir.path().join("out")) {
        Ok(entries) => entries
            .map(|entry| entry.unwrap().file_name().to_string_lossy().to_string())
            .collect(),
        Err(_) => Vec::new(),
    };
    names.sort();
    names
}

/// Every artifact's text, concatenated in file name order
fn artifact(dir: &TempDir) -> String {
    artifact_files(dir)
        .iter()
        .map(|name| fs::read_to_string(dir.path().join("out").join(name)).unwrap())
        .collect()
}

#[tokio::test]
async fn test_linked_page_embedded_between_markers() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/a",
        page("Page A", r#"<p>Intro</p><p>See <a href="/b">B</a>.</p>"#),
        1,
    )
    .await;
    mount_page(&server, "/b", page("Page B", "<p>Bravo body</p>"), 1).await;

    let dir = TempDir::new().unwrap();
    let stats = harvest(create_test_config(&server, &dir, &["/a"], 2)).await;

    let text = artifact(&dir);
    assert!(text.starts_with("---\nTITLE: \"Page A\"\n"));
    assert!(text.contains(&format!("url: \"{}/a\"", base)));
    assert!(text.contains(&format!("##START##: {}/a", base)));
    assert!(text.contains(&format!(
        "##START_LINKED_CONTENT_FROM: {}/b\n\nBravo body\n\n##END_LINKED_CONTENT_FROM: {}/b",
        base, base
    )));
    assert!(!text.contains(&format!("[B]({}/b)", base)));
    assert!(text.ends_with("===================================\n\n"));

    assert_eq!(stats.pages_fetched, 2);
    assert_eq!(stats.pages_embedded, 1);
    assert_eq!(stats.entries_written, 1);
}

#[tokio::test]
async fn test_depth_limit_leaves_link() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(&server, "/a", page("A", r#"<a href="/b">B</a>"#), 1).await;
    mount_page(&server, "/b", page("B", r#"<p>Bravo</p><a href="/c">C</a>"#), 1).await;
    mount_page(&server, "/c", page("C", "<p>Charlie</p>"), 0).await;

    let dir = TempDir::new().unwrap();
    let stats = harvest(create_test_config(&server, &dir, &["/a"], 1)).await;

    let text = artifact(&dir);
    assert!(text.contains("Bravo"));
    assert!(!text.contains("Charlie"));
    assert!(text.contains(&format!("[C]({}/c)", base)));
    assert_eq!(stats.depth_exceeded, 1);
}

#[tokio::test]
async fn test_max_depth_zero_fetches_only_root() {
    let server = MockServer::start().await;

    mount_page(&server, "/a", page("A", r#"<a href="/b">B</a>"#), 1).await;
    mount_page(&server, "/b", page("B", "<p>Bravo</p>"), 0).await;

    let dir = TempDir::new().unwrap();
    harvest(create_test_config(&server, &dir, &["/a"], 0)).await;

    assert!(!artifact(&dir).contains("Bravo"));
}

#[tokio::test]
async fn test_page_fetched_once_per_context() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/a",
        page("A", r#"<a href="/b">B</a><a href="/c">C</a><a href="/b?utm_source=menu">B again</a>"#),
        1,
    )
    .await;
    mount_page(&server, "/b", page("B", "<p>Bravo</p>"), 1).await;
    mount_page(&server, "/c", page("C", r#"<p>Charlie</p><a href="/b">B</a>"#), 1).await;

    let dir = TempDir::new().unwrap();
    let stats = harvest(create_test_config(&server, &dir, &["/a"], 3)).await;

    let text = artifact(&dir);
    assert_eq!(text.matches("Bravo").count(), 1);
    assert!(text.contains(&format!("[B again]({}/b?utm_source=menu)", base)));
    assert_eq!(stats.already_visited, 2);
}

#[tokio::test]
async fn test_failed_fetch_leaves_anchor() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(&server, "/a", page("A", r#"<a href="/gone">Gone</a>"#), 1).await;
    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let stats = harvest(create_test_config(&server, &dir, &["/a"], 2)).await;

    assert!(artifact(&dir).contains(&format!("[Gone]({}/gone)", base)));
    assert_eq!(stats.fetch_failures, 1);
}

#[tokio::test]
async fn test_failed_root_writes_no_entry() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/a"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let stats = harvest(create_test_config(&server, &dir, &["/a"], 2)).await;

    assert_eq!(artifact(&dir), "");
    assert_eq!(stats.entries_written, 0);
}

#[tokio::test]
async fn test_non_recursive_links_not_followed() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/a",
        page("A", r#"<div class="external"><p><a href="/x">X</a></p></div>"#),
        1,
    )
    .await;
    mount_page(&server, "/x", page("X", "<p>Xray</p>"), 0).await;

    let dir = TempDir::new().unwrap();
    harvest(create_test_config(&server, &dir, &["/a"], 3)).await;

    assert!(artifact(&dir).contains(&format!("[X]({}/x)", base)));
}

#[tokio::test]
async fn test_identical_images_share_one_file() {
    let server = MockServer::start().await;

    mount_page(
        &server,
        "/a",
        page("A", r#"<img src="/img/first.png"><a href="/b">B</a>"#),
        1,
    )
    .await;
    mount_page(&server, "/b", page("B", r#"<img src="/img/second.png">"#), 1).await;
    for route in ["/img/first.png", "/img/second.png"] {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(200).set_body_raw(PNG.to_vec(), "image/png"))
            .expect(1)
            .mount(&server)
            .await;
    }

    let dir = TempDir::new().unwrap();
    let stats = harvest(create_test_config(&server, &dir, &["/a"], 2)).await;

    let files: Vec<String> = fs::read_dir(dir.path().join("images"))
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    assert_eq!(files.len(), 1);
    assert!(files[0].starts_with("first_"));
    assert!(files[0].ends_with(".png"));

    let token = format!("##IMAGE## {}", files[0]);
    assert_eq!(artifact(&dir).matches(&token).count(), 2);
    assert_eq!(stats.images_saved, 2);
}

#[tokio::test]
async fn test_failing_image_retried_three_times() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(&server, "/a", page("A", r#"<img src="/broken.png" alt="diagram">"#), 1).await;
    Mock::given(method("GET"))
        .and(path("/broken.png"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let stats = harvest(create_test_config(&server, &dir, &["/a"], 1)).await;

    let text = artifact(&dir);
    assert!(!text.contains("##IMAGE##"));
    assert!(text.contains(&format!("![diagram]({}/broken.png)", base)));
    assert_eq!(stats.image_failures, 1);
}

#[tokio::test]
async fn test_navigation_widget_emitted_once_and_expanded() {
    let server = MockServer::start().await;
    let base = server.uri();

    let nav = r#"<div class="pagination"><a href="/next">Next page</a></div>"#;
    let with_nav = |title: &str, body: &str| {
        format!(
            "<html><head><title>{}</title></head><body>{}<main>{}</main></body></html>",
            title, nav, body
        )
    };

    mount_page(&server, "/a", with_nav("A", r#"<p>Alpha</p><a href="/b">B</a>"#), 1).await;
    mount_page(&server, "/b", with_nav("B", "<p>Bravo</p>"), 1).await;
    mount_page(
        &server,
        "/next",
        with_nav("Next", r#"<p>Next body</p><a href="/deep">Deep</a>"#),
        1,
    )
    .await;
    mount_page(&server, "/deep", page("Deep", "<p>Deep body</p>"), 1).await;

    let dir = TempDir::new().unwrap();
    let stats = harvest(create_test_config(&server, &dir, &["/a"], 1)).await;

    let text = artifact(&dir);
    assert_eq!(text.matches("TITLE: \"Navigation: A\"").count(), 1);
    assert_eq!(text.matches("TITLE: \"Navigation:").count(), 1);
    assert!(text.contains(&format!("[Next page]({}/next)", base)));

    // The navigation target is its own entry, never spliced into the root document
    assert!(text.contains(&format!("TITLE: \"Next\"\nurl: \"{}/next\"", base)));
    assert_eq!(text.matches("Next body").count(), 1);
    assert!(!text.contains(&format!("##START_LINKED_CONTENT_FROM: {}/next", base)));

    // It is harvested at the widget's depth, so its own links are embedded one level down
    assert!(text.contains(&format!(
        "##START_LINKED_CONTENT_FROM: {}/deep\n\nDeep body",
        base
    )));

    // The root entry comes first, then the entries produced under it
    assert!(text.starts_with("---\nTITLE: \"A\"\n"));
    assert!(text.find("Navigation: A").unwrap() < text.find("TITLE: \"Next\"").unwrap());

    assert_eq!(stats.navigation_emitted, 1);
    assert_eq!(stats.navigation_expanded, 1);
    assert_eq!(stats.entries_written, 3);
}

#[tokio::test]
async fn test_linkless_navigation_emitted_for_every_page() {
    let server = MockServer::start().await;

    let nav = r#"<div class="pagination"><span>Last updated by the docs team</span></div>"#;
    let with_nav = |title: &str, body: &str| {
        format!(
            "<html><head><title>{}</title></head><body>{}<main>{}</main></body></html>",
            title, nav, body
        )
    };
    mount_page(&server, "/a", with_nav("A", r#"<a href="/b">B</a>"#), 1).await;
    mount_page(&server, "/b", with_nav("B", "<p>Bravo</p>"), 1).await;

    let dir = TempDir::new().unwrap();
    let stats = harvest(create_test_config(&server, &dir, &["/a"], 2)).await;

    assert_eq!(artifact(&dir).matches("Last updated by the docs team").count(), 2);
    assert_eq!(stats.navigation_emitted, 2);
}

#[tokio::test]
async fn test_duplicate_fragments_suppressed() {
    let server = MockServer::start().await;

    let see_also = r#"<aside class="see-also"><p>See also</p><a href="https://other.example.org/guide">Guide</a></aside>"#;
    mount_page(
        &server,
        "/a",
        page("A", &format!(r#"{}<a href="/b">B</a>"#, see_also)),
        1,
    )
    .await;
    mount_page(&server, "/b", page("B", &format!("<p>Bravo</p>{}", see_also)), 1).await;

    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&server, &dir, &["/a"], 2);
    config.harvest.dedup_fragments = true;
    let stats = harvest(config).await;

    let text = artifact(&dir);
    assert!(text.contains("Bravo"));
    assert_eq!(text.matches("See also").count(), 1);
    assert_eq!(stats.fragments_suppressed, 1);
}

#[tokio::test]
async fn test_fragments_kept_without_dedup() {
    let server = MockServer::start().await;

    let see_also = r#"<aside class="see-also"><p>See also</p><a href="https://other.example.org/guide">Guide</a></aside>"#;
    mount_page(
        &server,
        "/a",
        page("A", &format!(r#"{}<a href="/b">B</a>"#, see_also)),
        1,
    )
    .await;
    mount_page(&server, "/b", page("B", see_also), 1).await;

    let dir = TempDir::new().unwrap();
    harvest(create_test_config(&server, &dir, &["/a"], 2)).await;

    assert_eq!(artifact(&dir).matches("See also").count(), 2);
}

#[tokio::test]
async fn test_visited_reset_per_root() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(&server, "/r1", page("R1", r#"<a href="/shared">S</a>"#), 1).await;
    mount_page(&server, "/r2", page("R2", r#"<a href="/shared">S</a>"#), 1).await;
    mount_page(&server, "/shared", page("Shared", "<p>Shared body</p>"), 2).await;

    let dir = TempDir::new().unwrap();
    let stats = harvest(create_test_config(&server, &dir, &["/r1", "/r2"], 2)).await;

    // One artifact per crawl root, named after the root URL
    let port = server.address().port();
    assert_eq!(
        artifact_files(&dir),
        vec![
            format!("127.0.0.1_{}_r1.md", port),
            format!("127.0.0.1_{}_r2.md", port),
        ]
    );
    for (name, root) in artifact_files(&dir).iter().zip(["/r1", "/r2"]) {
        let text = fs::read_to_string(dir.path().join("out").join(name)).unwrap();
        assert!(text.contains(&format!("##START##: {}{}", base, root)));
        assert_eq!(text.matches("Shared body").count(), 1);
        assert_eq!(text.matches("##START##").count(), 1);
    }
    assert_eq!(stats.roots, 2);
    assert_eq!(stats.entries_written, 2);
}

#[tokio::test]
async fn test_visited_shared_across_roots() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(&server, "/r1", page("R1", r#"<a href="/shared">S</a>"#), 1).await;
    mount_page(&server, "/r2", page("R2", r#"<a href="/shared">S</a>"#), 1).await;
    mount_page(&server, "/shared", page("Shared", "<p>Shared body</p>"), 1).await;

    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&server, &dir, &["/r1", "/r2"], 2);
    config.harvest.reset_visited_per_root = false;
    harvest(config).await;

    let text = artifact(&dir);
    assert_eq!(text.matches("Shared body").count(), 1);
    assert!(text.contains(&format!("[S]({}/shared)", base)));
}

#[tokio::test]
async fn test_shallower_recheck_refetches() {
    let server = MockServer::start().await;

    mount_page(
        &server,
        "/a",
        page("A", r#"<a href="/b">B</a><a href="/s">S</a>"#),
        1,
    )
    .await;
    mount_page(&server, "/b", page("B", r#"<a href="/s">S</a>"#), 1).await;
    mount_page(&server, "/s", page("S", "<p>Sierra</p>"), 2).await;

    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&server, &dir, &["/a"], 3);
    config.harvest.recheck_duplicates_below_depth = Some(2);
    harvest(config).await;

    assert_eq!(artifact(&dir).matches("Sierra").count(), 2);
}

#[tokio::test]
async fn test_nested_index_items_embedded() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/a",
        page("A", r#"<ul><li data-page-id="42">Child page</li></ul>"#),
        1,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/pages/viewpage.action"))
        .and(query_param("pageId", "42"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(page("Child", "<p>Child body</p>"), "text/html"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&server, &dir, &["/a"], 2);
    config.selectors.nested_index = Some(NestedIndexConfig {
        attribute: "data-page-id".to_string(),
        url_template: format!("{}/pages/viewpage.action?pageId={{id}}", base),
    });
    harvest(config).await;

    let text = artifact(&dir);
    assert!(text.contains("Child body"));
    assert!(text.contains(&format!(
        "##START_LINKED_CONTENT_FROM: {}/pages/viewpage.action?pageId=42",
        base
    )));
}

#[tokio::test]
async fn test_failed_index_item_children_still_embedded() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/a",
        page("A", r#"<ul><li keyname="x">X<ul><li keyname="y">Y</li></ul></li></ul>"#),
        1,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/item"))
        .and(query_param("id", "x"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/item"))
        .and(query_param("id", "y"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(page("Y", "<p>Yankee body</p>"), "text/html"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&server, &dir, &["/a"], 2);
    config.selectors.nested_index = Some(NestedIndexConfig {
        attribute: "keyname".to_string(),
        url_template: format!("{}/item?id={{id}}", base),
    });
    let stats = harvest(config).await;

    assert!(artifact(&dir).contains("Yankee body"));
    assert_eq!(stats.fetch_failures, 1);
    assert_eq!(stats.pages_embedded, 1);
}

#[tokio::test]
async fn test_rejected_login_aborts_before_fetching() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    mount_page(&server, "/a", page("A", "<p>Alpha</p>"), 0).await;

    std::env::set_var("KB_HARVESTER_IT_REJECTED_PASSWORD", "wrong");
    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&server, &dir, &["/a"], 1);
    config.auth = Some(AuthConfig {
        login_url: format!("{}/login", server.uri()),
        username_field: "os_username".to_string(),
        password_field: "os_password".to_string(),
        username: "reader".to_string(),
        password_env: "KB_HARVESTER_IT_REJECTED_PASSWORD".to_string(),
        failure_marker: None,
    });

    let result = Harvester::connect(config).await;
    assert!(matches!(result, Err(HarvestError::Authentication(_))));
    assert_eq!(artifact(&dir), "");
}

#[tokio::test]
async fn test_login_then_harvest() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("<p>Welcome</p>", "text/html"))
        .expect(1)
        .mount(&server)
        .await;
    mount_page(&server, "/a", page("A", "<p>Alpha</p>"), 1).await;

    std::env::set_var("KB_HARVESTER_IT_ACCEPTED_PASSWORD", "secret");
    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&server, &dir, &["/a"], 1);
    config.auth = Some(AuthConfig {
        login_url: format!("{}/login", server.uri()),
        username_field: "os_username".to_string(),
        password_field: "os_password".to_string(),
        username: "reader".to_string(),
        password_env: "KB_HARVESTER_IT_ACCEPTED_PASSWORD".to_string(),
        failure_marker: Some("Invalid username or password".to_string()),
    });

    let stats = harvest(config).await;
    assert_eq!(stats.pages_fetched, 1);
    assert!(artifact(&dir).contains("Alpha"));
}
