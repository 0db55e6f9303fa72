use std::{
    sync::{Arc, Mutex},
    thread::JoinHandle,
    time::Duration,
};

use tokio::{
    runtime::Builder,
    time::{self, MissedTickBehavior},
};
use tracing::{info, warn};

use crate::{
    dispatcher::FrameDispatcher,
    error::BridgeError,
    mapper::AxisOutcome,
    node::FrameSource,
    servo::Actuator,
};

#[derive(Debug, Clone, Copy)]
pub struct BridgeConfig {
    /// Loop period. At most one frame is handled per step.
    pub step_period: Duration,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self { step_period: Duration::from_millis(10) }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BridgeStats {
    pub frames_received: u64,
    pub frames_ignored: u64,
    pub moves_issued: u64,
    pub move_failures: u64,
    pub last_sequence: Option<u8>,
}

impl BridgeStats {
    fn record(&mut self, outcome: &AxisOutcome) {
        match outcome {
            AxisOutcome::Moved(_) => self.moves_issued += 1,
            AxisOutcome::Failed(_) => self.move_failures += 1,
            AxisOutcome::Unchanged => {}
        }
    }
}

pub struct BridgeHandle {
    stats: Arc<Mutex<BridgeStats>>,
    stop: Arc<Mutex<bool>>,
    thread: Option<JoinHandle<()>>,
}

impl BridgeHandle {
    pub fn stats(&self) -> Result<BridgeStats, BridgeError> {
        Ok(self.stats.lock().map_err(|_| BridgeError::Closed)?.clone())
    }

    pub fn close(&self) {
        if let Ok(mut stop) = self.stop.lock() {
            *stop = true;
        }
    }

    /// Stop the loop and wait for its thread to finish.
    pub fn join(mut self) -> Result<(), BridgeError> {
        self.close();
        match self.thread.take() {
            Some(thread) => thread.join().map_err(|_| BridgeError::Closed),
            None => Ok(()),
        }
    }
}

/// Run the bridge on its own thread: every `step_period` the source is
/// polled once and a received frame is dispatched before the next tick.
/// The next poll happens one full step after a dispatch finishes, however
/// long the bus exchanges took.
pub fn start_bridge<S, A>(
    mut source: S,
    mut dispatcher: FrameDispatcher<A>,
    cfg: BridgeConfig,
) -> Result<BridgeHandle, BridgeError>
where
    S: FrameSource,
    A: Actuator + Send + 'static,
{
    let runtime = Builder::new_current_thread().enable_time().build()?;

    let stop = Arc::new(Mutex::new(false));
    let stop_clone = Arc::clone(&stop);
    let stats = Arc::new(Mutex::new(BridgeStats::default()));
    let stats_clone = Arc::clone(&stats);

    info!(universe = dispatcher.universe(), step_ms = cfg.step_period.as_millis() as u64, "bridge starting");

    let thread = std::thread::spawn(move || {
        runtime.block_on(async move {
            let mut interval = time::interval(cfg.step_period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                interval.tick().await;

                if *stop_clone.lock().unwrap_or_else(|p| p.into_inner()) {
                    break;
                }
                if !source.is_ready() {
                    continue;
                }

                let frame = match source.poll() {
                    Ok(Some(frame)) => frame,
                    Ok(None) => continue,
                    Err(e) => {
                        warn!("frame source failed: {e}");
                        continue;
                    }
                };

                let report = dispatcher.handle_frame(&frame.as_frame());
                // a slow bus exchange still leaves a full step before the next poll
                interval.reset();
                if let Ok(mut s) = stats_clone.lock() {
                    s.frames_received += 1;
                    s.last_sequence = Some(frame.sequence);
                    match &report {
                        Some(r) => {
                            s.record(&r.pan);
                            s.record(&r.tilt);
                        }
                        None => s.frames_ignored += 1,
                    }
                }
            }
        });
        info!("bridge stopped");
    });

    Ok(BridgeHandle { stats, stop, thread: Some(thread) })
}
