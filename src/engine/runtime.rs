// src/engine/runtime.rs

use std::fmt;
use std::time::Instant;

use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::errors::Result;
use crate::exec::BuildBackend;
use crate::manager::BuildManager;
use crate::target::TargetSource;

use super::EngineEvent;

/// Drives a [`BuildManager`] in response to interval ticks and
/// [`EngineEvent`]s.
///
/// This is a pure IO shell: all scheduling semantics live in the manager.
/// Callback delivery and poll ticks are serialized by construction, since
/// both run on this single loop.
pub struct Runtime<B: BuildBackend, S: TargetSource> {
    manager: BuildManager<B, S>,
    event_rx: mpsc::Receiver<EngineEvent>,
}

impl<B: BuildBackend, S: TargetSource> fmt::Debug for Runtime<B, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime").finish_non_exhaustive()
    }
}

impl<B: BuildBackend, S: TargetSource> Runtime<B, S> {
    pub fn new(manager: BuildManager<B, S>, event_rx: mpsc::Receiver<EngineEvent>) -> Self {
        Self { manager, event_rx }
    }

    pub fn manager(&self) -> &BuildManager<B, S> {
        &self.manager
    }

    /// Main event loop.
    ///
    /// - Polls the manager once per interval tick.
    /// - Feeds engine events into the manager.
    /// - Exits on [`EngineEvent::Shutdown`] or when the event channel
    ///   closes, handing the manager back for inspection.
    pub async fn run(mut self) -> Result<BuildManager<B, S>> {
        info!("buildgraph runtime started");

        let mut ticker = tokio::time::interval(self.manager.config().poll_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.manager.poll(Instant::now());
                }
                event = self.event_rx.recv() => {
                    let Some(event) = event else {
                        info!("runtime event channel closed; exiting");
                        break;
                    };

                    debug!(?event, "runtime received event");

                    match event {
                        EngineEvent::RunRequested => {
                            if let Err(e) = self.manager.run(Instant::now()) {
                                warn!(error = %e, "run request refused");
                            }
                        }
                        EngineEvent::CancelRequested => self.manager.cancel(),
                        EngineEvent::BuildCompleted(completion) => {
                            self.manager.apply_completion(completion);
                        }
                        EngineEvent::Shutdown => {
                            info!("shutdown requested; stopping runtime");
                            break;
                        }
                    }
                }
            }
        }

        info!("runtime exiting");
        Ok(self.manager)
    }
}
