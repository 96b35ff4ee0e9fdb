//! Background training with an interactive plateau handshake.
//!
//! [`TrainingSession::spawn`] moves a [`TrainingController`] onto a dedicated
//! worker thread and hands back a [`TrainingHandle`]. The worker streams
//! [`TrainingEvent`]s over a channel. When it reports a plateau it blocks on the
//! control channel until the handle delivers exactly one decision.
//!
//! By default the worker waits forever for that decision: training is meant to
//! be paced by a human. Set [`TrainConfig::decision_timeout`] to turn an
//! unanswered prompt into [`Error::StalledHandshake`] instead.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, error, warn};

use crate::{
    Dataset, Error, Result, TrainConfig, TrainingController, TrainingDecision, TrainingObserver,
    TrainingOutcome,
};

/// Everything the worker reports, in emission order.
#[derive(Debug, Clone, PartialEq)]
pub enum TrainingEvent {
    Progress { epoch: usize, mean_error: f32 },
    /// Training is suspended until [`TrainingHandle::decide`] is called.
    Plateau { epoch: usize, mean_error: f32 },
    /// Last event of a successful run.
    Completed(TrainingOutcome),
    /// Last event of a run that aborted.
    Failed(Error),
}

impl TrainingEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TrainingEvent::Completed(_) | TrainingEvent::Failed(_))
    }
}

enum Control {
    Decide(TrainingDecision),
    Stop,
}

#[derive(Debug, Default)]
struct Shared {
    stop: AtomicBool,
    /// Set while a plateau prompt is waiting for its one answer.
    pending: AtomicBool,
}

pub struct TrainingSession;

impl TrainingSession {
    /// Validate `config` against `data`, then start training on a new thread.
    ///
    /// Configuration, topology and dataset-shape errors are returned here,
    /// before the worker exists.
    pub fn spawn(config: TrainConfig, data: Dataset) -> Result<TrainingHandle> {
        let controller = TrainingController::new(config)?;
        Self::spawn_controller(controller, data)
    }

    /// Start training an already-built controller on a new thread.
    pub fn spawn_controller(controller: TrainingController, data: Dataset) -> Result<TrainingHandle> {
        controller.check_dataset(&data)?;

        let shared = Arc::new(Shared::default());
        let (events_tx, events_rx) = mpsc::channel();
        let (control_tx, control_rx) = mpsc::channel();

        let mut observer = ChannelObserver {
            events: events_tx,
            control: control_rx,
            shared: Arc::clone(&shared),
            timeout: controller.config().decision_timeout_duration(),
        };
        let worker_shared = Arc::clone(&shared);

        let worker = thread::Builder::new()
            .name("mlp-trainer".into())
            .spawn(move || {
                let result = controller.run(&data, &mut observer, &worker_shared.stop);
                let event = match &result {
                    Ok(outcome) => TrainingEvent::Completed(outcome.clone()),
                    Err(e) => {
                        error!(error = %e, "training failed");
                        TrainingEvent::Failed(e.clone())
                    }
                };
                observer.emit(event);
                result
            })
            .map_err(|e| Error::Worker(format!("failed to spawn training thread: {e}")))?;

        Ok(TrainingHandle {
            events: events_rx,
            control: control_tx,
            shared,
            worker: Some(worker),
        })
    }
}

/// Caller-side end of a running session.
///
/// Dropping the handle without [`TrainingHandle::join`] requests a stop.
pub struct TrainingHandle {
    events: Receiver<TrainingEvent>,
    control: Sender<Control>,
    shared: Arc<Shared>,
    worker: Option<JoinHandle<Result<TrainingOutcome>>>,
}

impl TrainingHandle {
    /// Events emitted by the worker. The channel closes after the terminal event.
    pub fn events(&self) -> &Receiver<TrainingEvent> {
        &self.events
    }

    /// Block for the next event; `None` once the worker is gone.
    pub fn recv(&self) -> Option<TrainingEvent> {
        self.events.recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<TrainingEvent> {
        self.events.recv_timeout(timeout).ok()
    }

    /// Answer the outstanding plateau prompt.
    ///
    /// Fails with [`Error::NoPendingDecision`] if the worker is not waiting
    /// (including when this prompt was already answered).
    pub fn decide(&self, decision: TrainingDecision) -> Result<()> {
        if self
            .shared
            .pending
            .compare_exchange(true, false, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(Error::NoPendingDecision);
        }
        self.control
            .send(Control::Decide(decision))
            .map_err(|_| Error::Worker("training thread has exited".to_owned()))
    }

    /// Ask the worker to finish at the next epoch boundary.
    ///
    /// If a plateau prompt is outstanding it is answered with an implicit stop.
    pub fn request_stop(&self) {
        self.shared.stop.store(true, Ordering::SeqCst);
        if self.shared.pending.swap(false, Ordering::SeqCst) {
            // The worker may already have exited; nothing left to stop then.
            let _ = self.control.send(Control::Stop);
        }
    }

    /// True while the worker is waiting on [`TrainingHandle::decide`].
    pub fn is_awaiting_decision(&self) -> bool {
        self.shared.pending.load(Ordering::SeqCst)
    }

    pub fn is_finished(&self) -> bool {
        self.worker.as_ref().is_none_or(|w| w.is_finished())
    }

    /// Wait for the worker and return its result.
    pub fn join(mut self) -> Result<TrainingOutcome> {
        let worker = self
            .worker
            .take()
            .ok_or_else(|| Error::Worker("training thread already joined".to_owned()))?;
        worker
            .join()
            .map_err(|_| Error::Worker("training thread panicked".to_owned()))?
    }
}

impl Drop for TrainingHandle {
    fn drop(&mut self) {
        // No-op once the worker has finished.
        self.request_stop();
    }
}

/// Worker-side observer: forwards events and performs the blocking handshake.
struct ChannelObserver {
    events: Sender<TrainingEvent>,
    control: Receiver<Control>,
    shared: Arc<Shared>,
    timeout: Option<Duration>,
}

impl ChannelObserver {
    fn emit(&self, event: TrainingEvent) {
        if self.events.send(event).is_err() {
            debug!("event receiver dropped");
        }
    }
}

impl TrainingObserver for ChannelObserver {
    fn on_progress(&mut self, epoch: usize, mean_error: f32) {
        self.emit(TrainingEvent::Progress { epoch, mean_error });
    }

    fn on_plateau(&mut self, epoch: usize, mean_error: f32) -> Result<TrainingDecision> {
        // Publish the prompt before re-checking the stop flag; `request_stop`
        // does the reverse, so one side always sees the other.
        self.shared.pending.store(true, Ordering::SeqCst);
        if self.shared.stop.load(Ordering::SeqCst) {
            self.shared.pending.store(false, Ordering::SeqCst);
            return Ok(TrainingDecision::Stop);
        }
        self.emit(TrainingEvent::Plateau { epoch, mean_error });

        let received = match self.timeout {
            None => self.control.recv().map_err(|_| RecvTimeoutError::Disconnected),
            Some(t) => self.control.recv_timeout(t),
        };

        match received {
            Ok(Control::Decide(decision)) => Ok(decision),
            Ok(Control::Stop) => Ok(TrainingDecision::Stop),
            Err(RecvTimeoutError::Disconnected) => {
                self.shared.pending.store(false, Ordering::SeqCst);
                warn!(epoch, "decision channel closed, stopping");
                Ok(TrainingDecision::Stop)
            }
            Err(RecvTimeoutError::Timeout) => {
                self.shared.pending.store(false, Ordering::SeqCst);
                Err(Error::StalledHandshake {
                    epoch,
                    waited: self.timeout.unwrap_or_default(),
                })
            }
        }
    }
}
