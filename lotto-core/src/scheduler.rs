//! Periodic draw extraction.

use crate::engine::LottoEngine;
use crate::error::Result;
use crate::types::Draw;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Default time between extractions.
pub const DEFAULT_EXTRACTION_PERIOD: Duration = Duration::from_secs(5 * 60);

/// What the scheduler is doing right now. Published on a watch channel so
/// interested parties can observe extraction boundaries without polling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Extracting,
}

/// Runs an extraction cycle on a fixed period. The engine's exclusive gate
/// keeps request handlers out for the duration of each cycle; a failed cycle
/// is logged and retried on the next tick rather than taking the service
/// down.
pub struct ExtractionScheduler {
    engine: Arc<LottoEngine>,
    period: Duration,
    state_tx: watch::Sender<SchedulerState>,
}

impl ExtractionScheduler {
    pub fn new(engine: Arc<LottoEngine>, period: Duration) -> Self {
        let (state_tx, _) = watch::channel(SchedulerState::Idle);
        Self {
            engine,
            period,
            state_tx,
        }
    }

    pub fn state(&self) -> watch::Receiver<SchedulerState> {
        self.state_tx.subscribe()
    }

    /// One extraction cycle, with the state transitions published around it.
    pub async fn tick_once(&self) -> Result<Draw> {
        let _ = self.state_tx.send(SchedulerState::Extracting);
        let result = self.engine.run_extraction().await;
        let _ = self.state_tx.send(SchedulerState::Idle);
        result
    }

    /// Consumes the scheduler and runs it until the process exits.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick of a tokio interval fires immediately; the
            // first extraction belongs one full period after startup.
            ticker.tick().await;

            loop {
                ticker.tick().await;
                match self.tick_once().await {
                    Ok(draw) => {
                        tracing::info!("scheduled extraction done at {}", draw.timestamp);
                    }
                    Err(e) => {
                        tracing::error!("extraction failed, retrying next tick: {}", e);
                    }
                }
            }
        })
    }
}
