use std::cell::Cell;
use std::future::Future;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

use page_composer::app::{App, NavigationOutcome, NavigationReport};
use page_composer::behavior::{Behavior, BehaviorCatalog, BehaviorContext, Registrar};
use page_composer::config::SiteConfig;
use page_composer::dom::{Document, NodeId};
use page_composer::fetch::MemoryFetcher;
use page_composer::models::{ComponentSpec, LogicalPath, RouteTable, Tag};

const FIRST_MESSAGE: &str = "I enjoy making open source software.";

fn path(raw: &str) -> LogicalPath {
    LogicalPath::parse(raw).expect("valid path")
}

fn component(fetcher: &MemoryFetcher, logical: &str, markup: &str, style: &str) {
    let stem = path(logical).resource_stem();
    fetcher.insert(format!("{}.html", stem), markup);
    fetcher.insert(format!("{}.css", stem), style);
    fetcher.insert(format!("{}.js", stem), format!("// {}", logical));
}

fn site() -> MemoryFetcher {
    let fetcher = MemoryFetcher::new();
    component(
        &fetcher,
        "components/navbar",
        r##"<ul class="links"><li><a href="#/">Home</a></li><li><a href="#/projects">Projects</a></li></ul>"##,
        ":root { --text-color: #e0e0e0; }",
    );
    component(
        &fetcher,
        "routes/home",
        &format!(
            r#"<h1><span id="typing-text">{}</span><span id="cursor"></span></h1><section id="about"><object class="svg" data="icons/github.svg"></object></section><div class="$components/button"></div>"#,
            FIRST_MESSAGE
        ),
        "h1 { margin: 0; }",
    );
    component(
        &fetcher,
        "components/button",
        r#"<button class="cta">Contact</button>"#,
        ".cta { color: red; }",
    );
    component(&fetcher, "routes/projects", "<h2>Projects</h2>", "");
    component(&fetcher, "routes/notfound", "<h2>Not found</h2>", "");
    fetcher.insert("icons/github.svg", r#"<svg viewBox="0 0 1 1"><path d="M0 0"/></svg>"#);
    fetcher
}

fn routes() -> RouteTable {
    RouteTable::new(
        [
            ("/".to_string(), path("routes/home")),
            ("/projects".to_string(), path("routes/projects")),
        ],
        path("routes/notfound"),
    )
}

fn app(fetcher: Arc<MemoryFetcher>, catalog: BehaviorCatalog) -> App {
    App::new(routes(), fetcher)
        .with_chrome(ComponentSpec::chrome(
            path("components/navbar"),
            Tag::Nav,
            "navbar",
        ))
        .with_catalog(catalog)
}

async fn local<F: Future>(future: F) -> F::Output {
    tokio::task::LocalSet::new().run_until(future).await
}

fn composed(outcome: NavigationOutcome) -> NavigationReport {
    match outcome {
        NavigationOutcome::Composed(report) => report,
        other => panic!("expected a composed page, got {:?}", other),
    }
}

fn root_of(app: &App, logical: &str) -> NodeId {
    app.descriptor(&path(logical))
        .and_then(|d| d.borrow().root())
        .expect("component is loaded")
}

fn connected(app: &App, node: NodeId) -> bool {
    app.document().borrow().is_connected(node)
}

fn typed_text(app: &App) -> String {
    let document = app.document();
    let doc = document.borrow();
    let node = doc.get_element_by_id("typing-text").expect("typing text mounted");
    doc.text_content(node)
}

#[derive(Default)]
struct Counts {
    runs: Cell<usize>,
    cleanups: Cell<usize>,
}

struct Recorder(Rc<Counts>);

impl Behavior for Recorder {
    fn run(&mut self, _ctx: &BehaviorContext) {
        self.0.runs.set(self.0.runs.get() + 1);
    }

    fn cleanup(&mut self, _document: &mut Document) {
        self.0.cleanups.set(self.0.cleanups.get() + 1);
    }
}

fn recording_catalog(name: &str) -> (BehaviorCatalog, Rc<Counts>) {
    let counts = Rc::new(Counts::default());
    let shared = counts.clone();
    let catalog = BehaviorCatalog::new().with(name, move |registrar: &mut Registrar<'_>| {
        registrar.register(Recorder(shared.clone()))
    });
    (catalog, counts)
}

mod caching {
    use super::*;

    #[tokio::test]
    async fn first_visit_fetches_each_resource_once() {
        local(async {
            let fetcher = Arc::new(site());
            let app = app(fetcher.clone(), BehaviorCatalog::new());

            let report = composed(app.navigate("/projects").await);
            assert_eq!(report.page, Some(path("routes/projects")));
            assert_eq!(
                report.fetched,
                vec![path("components/navbar"), path("routes/projects")]
            );
            for ext in ["html", "css", "js"] {
                assert_eq!(fetcher.requests(&format!("routes/projects/projects.{}", ext)), 1);
            }
        })
        .await;
    }

    #[tokio::test]
    async fn revisit_reuses_the_same_fragment_without_fetching() {
        local(async {
            let fetcher = Arc::new(site());
            let app = app(fetcher.clone(), BehaviorCatalog::new());

            app.navigate("/projects").await;
            let first_root = root_of(&app, "routes/projects");
            app.navigate("/").await;
            assert!(!connected(&app, first_root));
            let requests = fetcher.total_requests();

            let report = composed(app.navigate("/projects").await);
            assert!(report.fetched.is_empty());
            assert_eq!(fetcher.total_requests(), requests);
            assert_eq!(root_of(&app, "routes/projects"), first_root);
            assert!(connected(&app, first_root));
        })
        .await;
    }

    #[tokio::test]
    async fn persistent_chrome_keeps_its_node_across_navigations() {
        local(async {
            let fetcher = Arc::new(site());
            let app = app(fetcher.clone(), BehaviorCatalog::new());

            app.navigate("/").await;
            let navbar = root_of(&app, "components/navbar");

            for route in ["/projects", "/missing", "/"] {
                let report = composed(app.navigate(route).await);
                assert!(!report.unmounted.contains(&path("components/navbar")));
                assert_eq!(root_of(&app, "components/navbar"), navbar);
                assert!(connected(&app, navbar));
            }
            assert_eq!(fetcher.requests("components/navbar/navbar.html"), 1);
        })
        .await;
    }
}

mod lifecycle {
    use super::*;

    #[tokio::test]
    async fn unmount_cleans_up_once_and_detaches_every_node() {
        local(async {
            let (catalog, counts) = recording_catalog("projects");
            let app = app(Arc::new(site()), catalog);

            app.navigate("/projects").await;
            assert_eq!(counts.runs.get(), 1);
            let descriptor = app.descriptor(&path("routes/projects")).unwrap();
            let (root, style, script) = {
                let d = descriptor.borrow();
                assert!(d.has_behavior());
                (d.root().unwrap(), d.style().unwrap(), d.script().unwrap())
            };
            assert!(connected(&app, style));
            assert!(connected(&app, script));

            let report = composed(app.navigate("/").await);
            assert_eq!(report.unmounted, vec![path("routes/projects")]);
            assert_eq!(counts.cleanups.get(), 1);
            for node in [root, style, script] {
                assert!(!connected(&app, node));
            }
            assert!(!app.is_mounted(&path("routes/projects")));
            assert!(app.is_cached(&path("routes/projects")));

            app.navigate("/projects").await;
            assert_eq!(counts.runs.get(), 2);
            assert_eq!(counts.cleanups.get(), 1);
        })
        .await;
    }

    #[tokio::test]
    async fn batch_attaches_styles_then_content_then_scripts() {
        local(async {
            let app = app(Arc::new(site()), BehaviorCatalog::new());
            app.navigate("/").await;

            let document = app.document();
            let doc = document.borrow();
            let styles: Vec<String> = doc
                .children(doc.head())
                .iter()
                .filter_map(|n| doc.element(*n)?.attr("data-component").map(str::to_string))
                .collect();
            assert_eq!(
                styles,
                vec!["components/navbar", "routes/home", "components/button"]
            );

            let body: Vec<String> = doc
                .children(doc.body())
                .iter()
                .filter_map(|n| doc.element(*n).map(|el| el.tag.clone()))
                .collect();
            assert_eq!(body, vec!["nav", "div", "script", "script", "script"]);
            assert_eq!(doc.get_element_by_id("container"), Some(root_of(&app, "routes/home")));
        })
        .await;
    }

    #[tokio::test(start_paused = true)]
    async fn typing_effect_restarts_when_home_is_revisited() {
        local(async {
            let app = app(Arc::new(site()), BehaviorCatalog::with_defaults());

            app.navigate("/").await;
            assert_eq!(typed_text(&app), FIRST_MESSAGE);
            tokio::time::sleep(Duration::from_millis(6125)).await;
            assert_eq!(typed_text(&app), FIRST_MESSAGE.trim_end_matches('.'));

            app.navigate("/projects").await;
            {
                let document = app.document();
                let doc = document.borrow();
                assert!(doc.get_element_by_id("typing-text").is_none());
                let navbar = doc.get_element_by_id("navbar").expect("navbar stays");
                assert!(doc.text_content(navbar).contains("Projects"));
            }
            tokio::time::sleep(Duration::from_secs(20)).await;

            app.navigate("/").await;
            assert_eq!(typed_text(&app), FIRST_MESSAGE);
            let document = app.document();
            {
                let doc = document.borrow();
                let cursor = doc.get_element_by_id("cursor").unwrap();
                assert!(!doc.element(cursor).unwrap().has_class("typing"));
            }

            tokio::time::sleep(Duration::from_millis(6125)).await;
            assert_eq!(typed_text(&app), FIRST_MESSAGE.trim_end_matches('.'));
        })
        .await;
    }
}

mod reentrancy {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn navigation_requested_mid_navigation_is_dropped() {
        local(async {
            let fetcher = Arc::new(site().with_latency(Duration::from_millis(50)));
            let app = app(fetcher.clone(), BehaviorCatalog::new());

            let (first, second) = tokio::join!(app.navigate("/"), app.navigate("/projects"));
            assert!(!first.is_dropped());
            assert!(second.is_dropped());
            assert!(!app.is_navigating());
            assert_eq!(fetcher.requests("routes/projects/projects.html"), 0);
            assert!(app.is_mounted(&path("routes/home")));

            let report = composed(app.navigate("/projects").await);
            assert_eq!(report.page, Some(path("routes/projects")));
        })
        .await;
    }

    #[tokio::test(start_paused = true)]
    async fn listen_drops_changes_that_arrive_while_navigating() {
        local(async {
            let fetcher = Arc::new(site().with_latency(Duration::from_millis(50)));
            let app = Rc::new(app(fetcher, BehaviorCatalog::new()));

            let (tx, rx) = tokio::sync::mpsc::channel(8);
            tx.send("#/projects".to_string()).await.unwrap();
            drop(tx);

            let outcomes = app.clone().listen("", rx).await;
            assert_eq!(outcomes.len(), 2);
            assert_eq!(
                outcomes[0].report().and_then(|r| r.page.clone()),
                Some(path("routes/home"))
            );
            assert!(outcomes[1].is_dropped());
        })
        .await;
    }
}

mod fallback {
    use super::*;

    #[tokio::test]
    async fn unknown_route_shows_the_not_found_page() {
        local(async {
            let app = app(Arc::new(site()), BehaviorCatalog::new());

            let report = composed(app.navigate_hash("#/nowhere").await);
            assert_eq!(report.route, "/nowhere");
            assert_eq!(report.page, Some(path("routes/notfound")));
            assert!(report.fell_back);
            assert_eq!(
                app.mounted_paths(),
                vec![path("components/navbar"), path("routes/notfound")]
            );
        })
        .await;
    }

    #[tokio::test]
    async fn failing_page_falls_back_and_is_retried_later() {
        local(async {
            let fetcher = Arc::new(site());
            fetcher.fail("routes/projects/projects.css", 500);
            let app = app(fetcher.clone(), BehaviorCatalog::new());

            let report = composed(app.navigate("/projects").await);
            assert_eq!(report.page, Some(path("routes/notfound")));
            assert!(report.fell_back);
            assert!(!app.is_cached(&path("routes/projects")));

            fetcher.insert("routes/projects/projects.css", "h2 { color: blue; }");
            app.navigate("/").await;
            let report = composed(app.navigate("/projects").await);
            assert_eq!(report.page, Some(path("routes/projects")));
            assert!(!report.fell_back);
        })
        .await;
    }

    #[tokio::test]
    async fn not_found_failure_leaves_chrome_in_place() {
        local(async {
            let fetcher = Arc::new(site());
            fetcher.remove("routes/notfound/notfound.html");
            let app = app(fetcher, BehaviorCatalog::new());

            let report = composed(app.navigate("/missing").await);
            assert_eq!(report.page, None);
            assert_eq!(app.mounted_paths(), vec![path("components/navbar")]);
            assert!(connected(&app, root_of(&app, "components/navbar")));
        })
        .await;
    }
}

mod anchors {
    use super::*;

    #[tokio::test]
    async fn route_naming_a_mounted_element_scrolls_without_remounting() {
        local(async {
            let fetcher = Arc::new(site());
            let app = app(fetcher.clone(), BehaviorCatalog::new());
            app.navigate("/").await;
            let mounted = app.mounted_paths();
            let requests = fetcher.total_requests();

            let target = match app.navigate_hash("#about").await {
                NavigationOutcome::Scrolled { target } => target,
                other => panic!("expected a scroll, got {:?}", other),
            };

            let document = app.document();
            let doc = document.borrow();
            assert_eq!(doc.get_element_by_id("about"), Some(target));
            assert_eq!(doc.scroll_target(), Some(target));
            assert_eq!(app.mounted_paths(), mounted);
            assert_eq!(fetcher.total_requests(), requests);
        })
        .await;
    }
}

mod nesting {
    use super::*;

    #[tokio::test]
    async fn nested_component_replaces_its_marker_and_restores_it() {
        local(async {
            let fetcher = Arc::new(site());
            let app = app(fetcher.clone(), BehaviorCatalog::new());

            app.navigate("/").await;
            let home = root_of(&app, "routes/home");
            let button = root_of(&app, "components/button");
            let marker = app.descriptor(&path("routes/home")).unwrap().borrow().children()[0].marker;
            {
                let document = app.document();
                let doc = document.borrow();
                assert_eq!(doc.parent(button), Some(home));
                assert_eq!(doc.element(button).unwrap().id(), Some("components/button"));
                assert!(!doc.is_connected(marker));
            }

            let report = composed(app.navigate("/projects").await);
            assert!(report.unmounted.contains(&path("components/button")));
            {
                let document = app.document();
                let doc = document.borrow();
                assert_eq!(doc.parent(marker), Some(home));
                assert_eq!(doc.parent(button), None);
            }

            let report = composed(app.navigate("/").await);
            assert!(report.fetched.is_empty());
            assert_eq!(root_of(&app, "components/button"), button);
            assert!(connected(&app, button));
            assert_eq!(fetcher.requests("components/button/button.html"), 1);
        })
        .await;
    }

    const NAVBAR_WITH_BUTTON: &str = r#"<ul class="links"></ul><div class="$components/button"></div>"#;

    #[tokio::test]
    async fn child_of_persistent_chrome_stays_mounted() {
        local(async {
            let fetcher = Arc::new(site());
            component(&fetcher, "components/navbar", NAVBAR_WITH_BUTTON, "");
            let app = app(fetcher.clone(), BehaviorCatalog::new());

            app.navigate("/projects").await;
            let navbar = root_of(&app, "components/navbar");
            let button = root_of(&app, "components/button");

            for route in ["/missing", "/", "/projects"] {
                let report = composed(app.navigate(route).await);
                assert!(!report.unmounted.contains(&path("components/button")));
                assert!(app.is_mounted(&path("components/button")));
                assert_eq!(root_of(&app, "components/button"), button);
                assert_eq!(app.document().borrow().parent(button), Some(navbar));
            }
            assert_eq!(fetcher.requests("components/button/button.html"), 1);
        })
        .await;
    }

    #[tokio::test]
    async fn cached_child_takes_persistence_from_its_current_parent() {
        local(async {
            let fetcher = Arc::new(site());
            fetcher.fail("components/navbar/navbar.html", 503);
            let app = app(fetcher.clone(), BehaviorCatalog::new());

            // Navbar is unavailable, so the button is first cached under the home page.
            app.navigate("/").await;
            assert!(!app.is_mounted(&path("components/navbar")));
            let button = root_of(&app, "components/button");
            assert_eq!(app.document().borrow().parent(button), Some(root_of(&app, "routes/home")));

            component(&fetcher, "components/navbar", NAVBAR_WITH_BUTTON, "");
            app.navigate("/projects").await;
            let navbar = root_of(&app, "components/navbar");
            assert_eq!(app.document().borrow().parent(button), Some(navbar));

            let report = composed(app.navigate("/missing").await);
            assert!(!report.unmounted.contains(&path("components/button")));
            assert!(app.is_mounted(&path("components/button")));
            assert!(connected(&app, button));
            assert_eq!(app.document().borrow().parent(button), Some(navbar));
        })
        .await;
    }

    #[tokio::test]
    async fn two_level_nesting_unmounts_and_remounts_from_cache() {
        local(async {
            let fetcher = Arc::new(site());
            component(&fetcher, "routes/projects", r#"<div class="$components/card"></div>"#, "");
            component(&fetcher, "components/card", r#"<div class="$components/button"></div>"#, "");
            let app = app(fetcher.clone(), BehaviorCatalog::new());

            app.navigate("/projects").await;
            let projects = root_of(&app, "routes/projects");
            let card = root_of(&app, "components/card");
            let button = root_of(&app, "components/button");
            let card_marker = app.descriptor(&path("routes/projects")).unwrap().borrow().children()[0].marker;
            let button_marker = app.descriptor(&path("components/card")).unwrap().borrow().children()[0].marker;
            {
                let document = app.document();
                let doc = document.borrow();
                assert_eq!(doc.parent(card), Some(projects));
                assert_eq!(doc.parent(button), Some(card));
            }

            let report = composed(app.navigate("/missing").await);
            assert_eq!(
                report.unmounted,
                vec![
                    path("components/button"),
                    path("components/card"),
                    path("routes/projects"),
                ]
            );
            {
                let document = app.document();
                let doc = document.borrow();
                assert_eq!(doc.parent(button_marker), Some(card));
                assert_eq!(doc.parent(card_marker), Some(projects));
                assert_eq!(doc.parent(button), None);
                assert_eq!(doc.parent(card), None);
            }

            let report = composed(app.navigate("/projects").await);
            assert!(report.fetched.is_empty());
            let document = app.document();
            let doc = document.borrow();
            assert_eq!(doc.parent(card), Some(projects));
            assert_eq!(doc.parent(button), Some(card));
            assert!(doc.is_connected(button));
            assert!(!doc.is_connected(card_marker));
            assert!(!doc.is_connected(button_marker));
        })
        .await;
    }

    #[tokio::test]
    async fn self_reference_is_mounted_once() {
        local(async {
            let fetcher = Arc::new(site());
            component(
                &fetcher,
                "routes/projects",
                r#"<div class="$routes/projects"></div>"#,
                "",
            );
            let app = app(fetcher, BehaviorCatalog::new());

            let report = composed(app.navigate("/projects").await);
            assert_eq!(
                report.mounted,
                vec![path("components/navbar"), path("routes/projects")]
            );
        })
        .await;
    }

    #[tokio::test]
    async fn nesting_stops_at_the_depth_limit() {
        local(async {
            let fetcher = Arc::new(site());
            component(
                &fetcher,
                "routes/projects",
                r#"<div class="$components/outer"></div>"#,
                "",
            );
            component(&fetcher, "components/outer", r#"<div class="$components/inner"></div>"#, "");
            component(&fetcher, "components/inner", "<p>deep</p>", "");
            let app = app(fetcher.clone(), BehaviorCatalog::new()).with_max_depth(1);

            app.navigate("/projects").await;
            assert!(app.is_mounted(&path("components/outer")));
            assert!(!app.is_mounted(&path("components/inner")));
            assert_eq!(fetcher.requests("components/inner/inner.html"), 0);
        })
        .await;
    }
}

mod enhancement {
    use super::*;

    #[tokio::test]
    async fn graphics_are_recolored_after_mount() {
        local(async {
            let app = app(Arc::new(site()), BehaviorCatalog::new());

            let mut report = composed(app.navigate("/").await);
            let enhanced = report.enhanced().await.expect("recolor pass ran");
            assert_eq!(enhanced.recolored, 1);
            assert_eq!(enhanced.color.as_deref(), Some("#e0e0e0"));

            let document = app.document();
            let doc = document.borrow();
            let object = doc.find_by_tag(doc.body(), "object").unwrap();
            let svg = doc.find_by_tag(doc.object_content(object).unwrap(), "svg").unwrap();
            assert_eq!(doc.element(svg).unwrap().attr("fill"), Some("#e0e0e0"));
        })
        .await;
    }
}

mod configuration {
    use super::*;

    #[tokio::test]
    async fn pages_mount_into_the_configured_root() {
        local(async {
            let config = SiteConfig::default();
            let app = App::from_config(&config, Arc::new(site()), BehaviorCatalog::new());

            app.navigate("/").await;
            let document = app.document();
            let doc = document.borrow();
            let container = doc.get_element_by_id("app").expect("shell root");
            let children = doc.children(container);
            assert_eq!(children.len(), 2);
            assert_eq!(doc.element(children[0]).unwrap().tag, "nav");
            assert_eq!(doc.element(children[1]).unwrap().id(), Some("container"));
        })
        .await;
    }
}
