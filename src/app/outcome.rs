use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::dom::NodeId;
use crate::enhance::EnhanceReport;
use crate::models::LogicalPath;

/// What a navigation request ended up doing.
#[derive(Debug)]
pub enum NavigationOutcome {
    /// Another navigation was in progress; nothing changed.
    Dropped,
    /// The route named an element already in the document.
    Scrolled { target: NodeId },
    /// Components were unmounted and mounted.
    Composed(NavigationReport),
}

impl NavigationOutcome {
    pub fn is_dropped(&self) -> bool {
        matches!(self, Self::Dropped)
    }

    pub fn report(&self) -> Option<&NavigationReport> {
        match self {
            Self::Composed(report) => Some(report),
            _ => None,
        }
    }

    pub fn into_report(self) -> Option<NavigationReport> {
        match self {
            Self::Composed(report) => Some(report),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub struct NavigationReport {
    pub id: Uuid,
    pub route: String,
    /// Page that ended up mounted, `None` if even the not-found page failed.
    pub page: Option<LogicalPath>,
    /// The not-found page was shown instead of the requested one.
    pub fell_back: bool,
    pub unmounted: Vec<LogicalPath>,
    pub mounted: Vec<LogicalPath>,
    /// Components whose resources were fetched rather than taken from cache.
    pub fetched: Vec<LogicalPath>,
    /// Recolor pass started after the mount, if anything was attached.
    pub enhancement: Option<JoinHandle<EnhanceReport>>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl NavigationReport {
    /// Wait for the recolor pass to finish.
    pub async fn enhanced(&mut self) -> Option<EnhanceReport> {
        let handle = self.enhancement.take()?;
        match handle.await {
            Ok(report) => Some(report),
            Err(e) => {
                tracing::warn!("Recolor pass for {} did not finish: {}", self.route, e);
                None
            }
        }
    }
}
