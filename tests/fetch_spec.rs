use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use page_composer::app::App;
use page_composer::behavior::BehaviorCatalog;
use page_composer::fetch::{DirFetcher, FetchError, Fetcher, HttpFetcher, Source};
use page_composer::models::{LogicalPath, RouteTable};
use page_composer::serve::create_router;

fn write_component(root: &Path, logical: &str, markup: &str) {
    let path = LogicalPath::parse(logical).expect("valid path");
    let dir = root.join(path.as_str());
    fs::create_dir_all(&dir).expect("Failed to create component dir");
    let name = path.basename();
    fs::write(dir.join(format!("{}.html", name)), markup).expect("Failed to write markup");
    fs::write(dir.join(format!("{}.css", name)), "p { margin: 0; }").expect("Failed to write style");
    fs::write(dir.join(format!("{}.js", name)), "// behavior").expect("Failed to write behavior");
}

fn site_dir() -> tempfile::TempDir {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    write_component(dir.path(), "routes/home", "<p>Welcome</p>");
    write_component(dir.path(), "routes/notfound", "<p>Lost</p>");
    dir
}

fn routes() -> RouteTable {
    RouteTable::new(
        [("/".to_string(), LogicalPath::parse("routes/home").unwrap())],
        LogicalPath::parse("routes/notfound").unwrap(),
    )
}

async fn spawn_server(root: &Path) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind");
    let addr = listener.local_addr().expect("Failed to read address");
    let router = create_router(root, routes());
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("Server failed");
    });
    addr
}

mod dir_fetcher {
    use super::*;

    #[tokio::test]
    async fn reads_resources_below_the_root() {
        let dir = site_dir();
        let fetcher = DirFetcher::new(dir.path());

        let bytes = fetcher.fetch("routes/home/home.html").await.unwrap();
        assert_eq!(bytes, b"<p>Welcome</p>");
    }

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let dir = site_dir();
        let fetcher = DirFetcher::new(dir.path());

        let err = fetcher.fetch("routes/about/about.html").await.unwrap_err();
        assert!(matches!(err, FetchError::NotFound(location) if location == "routes/about/about.html"));
    }

    #[tokio::test]
    async fn locations_cannot_escape_the_root() {
        let dir = site_dir();
        let fetcher = DirFetcher::new(dir.path().join("routes"));

        let err = fetcher.fetch("../routes/home/home.html").await.unwrap_err();
        assert!(matches!(err, FetchError::InvalidLocation(_)));
    }

    #[tokio::test]
    async fn configured_directory_source_reads_files() {
        let dir = site_dir();
        let fetcher = Source::parse(&dir.path().display().to_string()).into_fetcher();

        let bytes = fetcher.fetch("routes/home/home.css").await.unwrap();
        assert_eq!(bytes, b"p { margin: 0; }");
    }
}

mod http_fetcher {
    use super::*;

    #[tokio::test]
    async fn fetches_from_a_served_site() {
        let dir = site_dir();
        let addr = spawn_server(dir.path()).await;
        let fetcher = HttpFetcher::new(format!("http://{}/", addr));

        let bytes = fetcher.fetch("routes/home/home.html").await.unwrap();
        assert_eq!(bytes, b"<p>Welcome</p>");
    }

    #[tokio::test]
    async fn missing_resource_is_not_found() {
        let dir = site_dir();
        let addr = spawn_server(dir.path()).await;
        let fetcher = HttpFetcher::new(format!("http://{}", addr));

        let err = fetcher.fetch("routes/about/about.html").await.unwrap_err();
        assert!(matches!(err, FetchError::NotFound(_)));
    }

    #[tokio::test]
    async fn app_composes_pages_over_http() {
        let dir = site_dir();
        let addr = spawn_server(dir.path()).await;
        let fetcher: Arc<dyn Fetcher> = Arc::new(HttpFetcher::new(format!("http://{}", addr)));

        let local = tokio::task::LocalSet::new();
        local
            .run_until(async {
                let app = App::new(routes(), fetcher).with_catalog(BehaviorCatalog::new());

                let outcome = app.navigate("/").await;
                let report = outcome.report().expect("page composed");
                assert_eq!(report.page.as_ref().map(LogicalPath::as_str), Some("routes/home"));

                let outcome = app.navigate("/about").await;
                let report = outcome.report().expect("page composed");
                assert!(report.fell_back);

                let document = app.document();
                let doc = document.borrow();
                let container = doc.get_element_by_id("container").unwrap();
                assert_eq!(doc.text_content(container), "Lost");
            })
            .await;
    }
}
