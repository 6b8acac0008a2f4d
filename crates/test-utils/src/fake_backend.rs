use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use buildgraph::engine::EngineEvent;
use buildgraph::errors::Result;
use buildgraph::exec::{BuildBackend, BuildCompletion, BuildRequest};

/// A fake build backend that:
/// - records every request it was handed
/// - optionally reports an immediate completion for each request over an
///   engine event channel.
///
/// Sync tests leave the channel off, read the started tickets back out of
/// the shared request log and feed completions into the manager by hand.
pub struct FakeBackend {
    requests: Arc<Mutex<Vec<BuildRequest>>>,
    completion_tx: Option<mpsc::Sender<EngineEvent>>,
    succeed: bool,
}

impl FakeBackend {
    /// Record-only backend; completions are the test's job.
    pub fn new(requests: Arc<Mutex<Vec<BuildRequest>>>) -> Self {
        Self {
            requests,
            completion_tx: None,
            succeed: true,
        }
    }

    /// Backend that immediately completes every request with `succeed`,
    /// delivered as [`EngineEvent::BuildCompleted`] on `tx`.
    pub fn completing(
        requests: Arc<Mutex<Vec<BuildRequest>>>,
        tx: mpsc::Sender<EngineEvent>,
        succeed: bool,
    ) -> Self {
        Self {
            requests,
            completion_tx: Some(tx),
            succeed,
        }
    }
}

impl BuildBackend for FakeBackend {
    fn start_build(&mut self, request: BuildRequest) -> Result<()> {
        {
            let mut guard = self.requests.lock().unwrap();
            guard.push(request.clone());
        }

        if let Some(tx) = &self.completion_tx {
            tx.try_send(EngineEvent::BuildCompleted(BuildCompletion {
                node: request.node,
                ticket: request.ticket,
                success: self.succeed,
            }))
            .map_err(anyhow::Error::from)?;
        }

        Ok(())
    }
}
