use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use page_composer::app::{App, NavigationOutcome};
use page_composer::behavior::BehaviorCatalog;
use page_composer::config::SiteConfig;
use page_composer::dom::{outline, to_html};
use page_composer::fetch::Source;
use page_composer::serve;

#[derive(Parser)]
#[command(name = "pcomp")]
#[command(about = "Compose component-based pages from a site directory or URL")]
struct Cli {
    /// Site configuration file (defaults to $PAGE_COMPOSER_CONFIG or the user config dir)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Navigate through routes headlessly and print the resulting document
    Render {
        /// Routes or location fragments to visit, in order
        #[arg(default_value = "/")]
        routes: Vec<String>,

        /// Print the element tree instead of HTML
        #[arg(long)]
        outline: bool,

        /// Base URL or directory to read components from
        #[arg(short, long)]
        source: Option<String>,
    },
    /// Serve a site directory over HTTP
    Serve {
        /// Directory to serve (defaults to the configured source)
        #[arg(short, long)]
        dir: Option<PathBuf>,

        #[arg(short, long, default_value = "8080")]
        port: u16,
    },
    /// List the route table
    Routes,
}

/// Logs go to stderr so rendered output on stdout stays clean.
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "page_composer=info".into()),
    );

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let mut config = SiteConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Render {
            routes,
            outline: as_outline,
            source,
        } => {
            if let Some(source) = source {
                config.source = source;
            }
            let local = tokio::task::LocalSet::new();
            let output = local.run_until(render(&config, &routes, as_outline)).await?;
            print!("{}", output);
        }
        Commands::Serve { dir, port } => {
            let dir = match dir {
                Some(dir) => dir,
                None => match config.source() {
                    Source::Dir(dir) => dir,
                    Source::Http(url) => {
                        anyhow::bail!("Configured source {} is remote; pass --dir", url)
                    }
                },
            };

            let app = serve::create_router(&dir, config.route_table());
            let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port))
                .await
                .with_context(|| format!("Failed to bind port {}", port))?;
            tracing::info!(
                "Serving {} on http://127.0.0.1:{}",
                dir.display(),
                port
            );

            axum::serve(listener, app).await?;
        }
        Commands::Routes => {
            let routes = config.route_table();
            for (route, path) in routes.iter() {
                println!("{:<16} {}", route, path);
            }
            println!("{:<16} {}", "(not found)", routes.not_found());
        }
    }

    Ok(())
}

async fn render(config: &SiteConfig, routes: &[String], as_outline: bool) -> anyhow::Result<String> {
    let fetcher = config.source().into_fetcher();
    let app = App::from_config(config, fetcher, BehaviorCatalog::with_defaults());

    for route in routes {
        let outcome = if route.starts_with('#') {
            app.navigate_hash(route).await
        } else {
            app.navigate(route).await
        };

        match outcome {
            NavigationOutcome::Composed(mut report) => {
                if report.page.is_none() {
                    anyhow::bail!("Nothing could be mounted for {}", route);
                }
                if let Some(enhanced) = report.enhanced().await {
                    tracing::debug!(
                        "Recolored {} graphics for {}",
                        enhanced.recolored,
                        route
                    );
                }
            }
            NavigationOutcome::Scrolled { .. } => {}
            NavigationOutcome::Dropped => tracing::warn!("Navigation to {} dropped", route),
        }
    }

    let document = app.document();
    let doc = document.borrow();
    Ok(if as_outline {
        outline(&doc, doc.body())
    } else {
        format!("<!DOCTYPE html>\n{}\n", to_html(&doc, doc.root()))
    })
}
