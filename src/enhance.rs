//! Post-mount SVG recolor pass.
//!
//! Embedded vector graphics (`<object class="svg" data="...">`) do not inherit
//! the page's colours, so after every navigation their content is loaded and
//! the `<svg>` root gets a `fill` matching the theme's `--text-color`.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{FuturesUnordered, StreamExt};

use crate::dom::{parse_markup, Document, NodeId, SharedDocument};
use crate::fetch::{FetchError, Fetcher};

/// Custom property holding the theme's text colour.
pub const TEXT_COLOR_PROPERTY: &str = "--text-color";

/// Outcome of one recolor pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnhanceReport {
    /// Colour applied, if the theme defines one.
    pub color: Option<String>,
    pub recolored: usize,
    pub failed: usize,
}

fn is_graphic(doc: &Document, node: NodeId) -> bool {
    doc.element(node).is_some_and(|el| {
        el.tag == "object" && (el.has_class("svg") || el.attr("type") == Some("image/svg+xml"))
    })
}

/// Recolor every graphic below `roots`.
///
/// Graphics whose content is already loaded are recolored directly; the rest
/// are loaded concurrently and recolored in completion order. Without a
/// `timeout` a graphic that never loads keeps the pass pending forever.
pub async fn recolor_graphics(
    document: SharedDocument,
    fetcher: Arc<dyn Fetcher>,
    roots: Vec<NodeId>,
    timeout: Option<Duration>,
) -> EnhanceReport {
    let mut report = EnhanceReport::default();

    let (color, pending) = {
        let mut doc = document.borrow_mut();
        let Some(color) = doc.computed_root_property(TEXT_COLOR_PROPERTY) else {
            tracing::debug!("Theme defines no {}, skipping recolor", TEXT_COLOR_PROPERTY);
            return report;
        };

        // Nested component roots sit inside their parent's root.
        let mut seen = HashSet::new();
        let graphics: Vec<NodeId> = roots
            .iter()
            .flat_map(|root| doc.descendants(*root))
            .filter(|node| seen.insert(*node) && is_graphic(&doc, *node))
            .collect();

        let mut pending = Vec::new();
        for graphic in graphics {
            if let Some(content) = doc.object_content(graphic) {
                if fill(&mut doc, content, &color) {
                    report.recolored += 1;
                }
                continue;
            }
            match doc.element(graphic).and_then(|el| el.attr("data")) {
                Some(data) => pending.push((graphic, data.to_string())),
                None => {
                    tracing::warn!("Graphic object without a data attribute");
                    report.failed += 1;
                }
            }
        }
        (color, pending)
    };

    let mut loads: FuturesUnordered<_> = pending
        .into_iter()
        .map(|(graphic, location)| {
            let fetcher = fetcher.clone();
            async move {
                let result = match timeout {
                    Some(limit) => tokio::time::timeout(limit, fetcher.fetch(&location))
                        .await
                        .unwrap_or_else(|_| Err(FetchError::TimedOut(location.clone()))),
                    None => fetcher.fetch(&location).await,
                };
                (graphic, location, result)
            }
        })
        .collect();

    while let Some((graphic, location, result)) = loads.next().await {
        let mut doc = document.borrow_mut();
        let content = result
            .map_err(|e| e.to_string())
            .and_then(|bytes| parse_markup(&mut doc, &bytes).map_err(|e| e.to_string()));

        match content {
            Ok(fragment) => {
                let holder = doc.create_element("document");
                for node in fragment.nodes {
                    doc.append_child(holder, node);
                }
                doc.set_object_content(graphic, holder);
                if fill(&mut doc, holder, &color) {
                    report.recolored += 1;
                } else {
                    tracing::warn!("{} contains no <svg> element", location);
                    report.failed += 1;
                }
            }
            Err(e) => {
                tracing::warn!("Failed to load graphic {}: {}", location, e);
                report.failed += 1;
            }
        }
    }

    tracing::debug!(
        "Recolored {} graphics ({} failed)",
        report.recolored,
        report.failed
    );
    report.color = Some(color);
    report
}

fn fill(doc: &mut Document, content: NodeId, color: &str) -> bool {
    let Some(svg) = doc.find_by_tag(content, "svg") else {
        return false;
    };
    match doc.element_mut(svg) {
        Some(el) => {
            el.set_attr("fill", color);
            true
        }
        None => false,
    }
}
