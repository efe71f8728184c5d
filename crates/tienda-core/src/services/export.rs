//! Export mutation state
//!
//! Exports are side-effecting requests: every invocation hits the backend,
//! nothing is shared between calls and nothing is written to the report
//! cache. Observers see one status slot that follows the most recent call.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::watch;

use crate::error::{Error, Result};
use crate::models::ExportArtifact;

/// Status of the most recent export
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ExportState {
    #[default]
    Idle,
    InFlight,
    Succeeded(ExportArtifact),
    Failed(Error),
}

impl ExportState {
    pub fn is_idle(&self) -> bool {
        matches!(self, ExportState::Idle)
    }

    pub fn is_in_flight(&self) -> bool {
        matches!(self, ExportState::InFlight)
    }

    pub fn artifact(&self) -> Option<&ExportArtifact> {
        match self {
            ExportState::Succeeded(artifact) => Some(artifact),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&Error> {
        match self {
            ExportState::Failed(err) => Some(err),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ExportState::Idle => "idle",
            ExportState::InFlight => "in_flight",
            ExportState::Succeeded(_) => "succeeded",
            ExportState::Failed(_) => "failed",
        }
    }
}

/// Tracks export invocations and publishes the latest one's status
#[derive(Debug, Clone)]
pub struct ExportMutation {
    tx: Arc<watch::Sender<ExportState>>,
    latest: Arc<AtomicU64>,
}

impl Default for ExportMutation {
    fn default() -> Self {
        Self::new()
    }
}

impl ExportMutation {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(ExportState::Idle);
        Self {
            tx: Arc::new(tx),
            latest: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn state(&self) -> ExportState {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ExportState> {
        self.tx.subscribe()
    }

    /// Back to idle; results of calls still running are not published
    pub fn reset(&self) {
        self.latest.fetch_add(1, Ordering::SeqCst);
        self.tx.send_replace(ExportState::Idle);
    }

    /// Drive one export request
    ///
    /// The shared state only reflects this call if no newer call (or reset)
    /// started while it was running. The caller always gets its own outcome.
    pub async fn run<Fut>(&self, request: Fut) -> Result<ExportArtifact>
    where
        Fut: Future<Output = Result<ExportArtifact>>,
    {
        let ticket = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
        self.tx.send_replace(ExportState::InFlight);

        let outcome = match request.await {
            Ok(artifact) if artifact.is_empty() => Err(Error::invalid_response(format!(
                "export {} came back empty",
                artifact.file_name
            ))),
            other => other,
        };

        if self.latest.load(Ordering::SeqCst) == ticket {
            let state = match &outcome {
                Ok(artifact) => ExportState::Succeeded(artifact.clone()),
                Err(err) => ExportState::Failed(err.clone()),
            };
            self.tx.send_replace(state);
        } else {
            log::debug!("[reports:export] Superseded export #{} finished", ticket);
        }

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ArtifactLocation;
    use std::time::Duration;

    fn artifact(name: &str) -> ExportArtifact {
        ExportArtifact {
            file_name: name.to_string(),
            content_type: "text/csv".to_string(),
            location: ArtifactLocation::Url {
                url: format!("https://files.example.cr/{}", name),
            },
        }
    }

    #[tokio::test]
    async fn test_success_and_reset() {
        let mutation = ExportMutation::new();
        assert!(mutation.state().is_idle());

        let result = mutation.run(async { Ok(artifact("sales.csv")) }).await;
        assert_eq!(result.unwrap().file_name, "sales.csv");
        assert_eq!(
            mutation.state().artifact().map(|a| a.file_name.as_str()),
            Some("sales.csv")
        );

        mutation.reset();
        assert!(mutation.state().is_idle());
    }

    #[tokio::test]
    async fn test_failure_is_published() {
        let mutation = ExportMutation::new();
        let result = mutation
            .run(async { Err(Error::server(503, "unavailable")) })
            .await;
        assert!(result.is_err());
        assert_eq!(
            mutation.state().error(),
            Some(&Error::server(503, "unavailable"))
        );
    }

    #[tokio::test]
    async fn test_empty_artifact_fails() {
        let mutation = ExportMutation::new();
        let empty = ExportArtifact {
            file_name: "orders.pdf".to_string(),
            content_type: "application/pdf".to_string(),
            location: ArtifactLocation::Inline { data: Vec::new() },
        };
        let result = mutation.run(async move { Ok(empty) }).await;
        assert!(matches!(result, Err(Error::InvalidResponse(_))));
        assert_eq!(mutation.state().label(), "failed");
    }

    #[tokio::test]
    async fn test_in_flight_is_observable() {
        let mutation = ExportMutation::new();
        let mut rx = mutation.subscribe();

        let runner = mutation.clone();
        let handle = tokio::spawn(async move {
            runner
                .run(async {
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    Ok(artifact("products.xlsx"))
                })
                .await
        });

        rx.wait_for(|s| s.is_in_flight()).await.unwrap();
        handle.await.unwrap().unwrap();
        assert_eq!(mutation.state().label(), "succeeded");
    }

    #[tokio::test]
    async fn test_older_call_does_not_overwrite_newer() {
        let mutation = ExportMutation::new();

        let slow = mutation.clone();
        let slow_handle = tokio::spawn(async move {
            slow.run(async {
                tokio::time::sleep(Duration::from_millis(120)).await;
                Ok(artifact("old.csv"))
            })
            .await
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        let fresh = mutation.run(async { Ok(artifact("new.csv")) }).await;
        assert_eq!(fresh.unwrap().file_name, "new.csv");

        // The slow caller still gets its own artifact
        let old = slow_handle.await.unwrap().unwrap();
        assert_eq!(old.file_name, "old.csv");
        assert_eq!(
            mutation.state().artifact().map(|a| a.file_name.as_str()),
            Some("new.csv")
        );
    }
}
