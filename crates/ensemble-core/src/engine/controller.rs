use crate::engine::error::EngineError;
use crate::engine::integrator::Integrator;
use crate::engine::simulation::Simulation;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};
use tracing::{debug, error, warn};

/// Lifecycle of one urgent action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionStatus {
    /// Queued, not yet picked up by the worker.
    Pending,
    /// Executing on the worker thread right now.
    Current,
    /// Ran to completion.
    Completed,
    /// Discarded because the run ended before it could execute.
    Stopped,
    /// Panicked on the worker thread; carries the panic message.
    Failed(String),
}

#[derive(Default)]
struct ActionState {
    status: Mutex<Option<ActionStatus>>,
    changed: Condvar,
}

impl ActionState {
    fn set(&self, status: ActionStatus) {
        let mut guard = self
            .status
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = Some(status);
        self.changed.notify_all();
    }
}

/// Tracks one submitted urgent action; cloneable, waitable from any thread.
#[derive(Clone)]
pub struct ActionHandle {
    state: Arc<ActionState>,
}

impl ActionHandle {
    fn new() -> Self {
        let state = Arc::new(ActionState::default());
        state.set(ActionStatus::Pending);
        Self { state }
    }

    pub fn status(&self) -> ActionStatus {
        self.state
            .status
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
            .unwrap_or(ActionStatus::Pending)
    }

    /// Blocks until the action has left the queue: completed, stopped, or
    /// failed.
    pub fn wait(&self) -> ActionStatus {
        let mut guard = self
            .state
            .status
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        loop {
            match guard.as_ref() {
                Some(ActionStatus::Pending) | Some(ActionStatus::Current) | None => {
                    guard = self
                        .state
                        .changed
                        .wait(guard)
                        .unwrap_or_else(|poisoned| poisoned.into_inner());
                }
                Some(done) => return done.clone(),
            }
        }
    }
}

type UrgentFn<I> = Box<dyn FnOnce(&mut Simulation, &mut I) + Send>;

enum Command<I> {
    Pause,
    Resume,
    Urgent(UrgentFn<I>, Arc<ActionState>),
    Halt,
}

/// Everything the worker hands back when a run ends.
pub struct RunOutcome<I> {
    pub simulation: Simulation,
    pub integrator: I,
    /// `Ok` if the run completed its step budget or was halted cleanly;
    /// otherwise the error that stopped it.
    pub result: Result<(), EngineError>,
}

/// Drives an integrator on a dedicated worker thread.
///
/// The worker owns the [`Simulation`] and the integrator outright, so every
/// state mutation happens between steps on that one thread. Outside threads
/// interact only through commands: pause and resume take effect at the next
/// step boundary, urgent actions run exactly once between steps (or
/// immediately while paused), and halting hands the simulation back.
pub struct Controller<I: Integrator> {
    sender: Sender<Command<I>>,
    worker: Option<JoinHandle<RunOutcome<I>>>,
    completed_steps: Arc<AtomicU64>,
    finished: Arc<AtomicBool>,
}

impl<I: Integrator + 'static> Controller<I> {
    /// Resets the integrator and starts stepping on a new worker thread.
    /// With `max_steps = None` the run continues until halted.
    pub fn spawn(simulation: Simulation, integrator: I, max_steps: Option<u64>) -> Self {
        let (sender, receiver) = mpsc::channel();
        let completed_steps = Arc::new(AtomicU64::new(0));
        let finished = Arc::new(AtomicBool::new(false));

        let steps_counter = Arc::clone(&completed_steps);
        let finished_flag = Arc::clone(&finished);
        let worker = thread::Builder::new()
            .name("ensemble-worker".into())
            .spawn(move || {
                let outcome =
                    worker_loop(simulation, integrator, receiver, max_steps, &steps_counter);
                finished_flag.store(true, Ordering::Release);
                outcome
            })
            .unwrap_or_else(|e| panic!("failed to spawn worker thread: {e}"));

        Self {
            sender,
            worker: Some(worker),
            completed_steps,
            finished,
        }
    }

    /// Steps completed so far; safe to poll from any thread.
    pub fn completed_steps(&self) -> u64 {
        self.completed_steps.load(Ordering::Acquire)
    }

    /// Whether the worker has finished (step budget exhausted or failed).
    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }

    /// Suspends stepping at the next step boundary.
    pub fn pause(&self) -> Result<(), EngineError> {
        self.sender
            .send(Command::Pause)
            .map_err(|_| EngineError::WorkerDisconnected)
    }

    /// Resumes a paused run.
    pub fn resume(&self) -> Result<(), EngineError> {
        self.sender
            .send(Command::Resume)
            .map_err(|_| EngineError::WorkerDisconnected)
    }

    /// Queues an action to run on the worker between steps, with exclusive
    /// access to the simulation and the integrator. While paused the action
    /// runs as soon as the worker sees it.
    pub fn urgent<F>(&self, action: F) -> Result<ActionHandle, EngineError>
    where
        F: FnOnce(&mut Simulation, &mut I) + Send + 'static,
    {
        let handle = ActionHandle::new();
        self.sender
            .send(Command::Urgent(Box::new(action), Arc::clone(&handle.state)))
            .map_err(|_| EngineError::WorkerDisconnected)?;
        Ok(handle)
    }

    /// Stops the run and hands back the simulation, the integrator, and the
    /// run result. Queued urgent actions that never ran are marked stopped.
    pub fn halt(mut self) -> Result<RunOutcome<I>, EngineError> {
        // The worker may already have finished its budget; a dead channel is
        // fine, joining still retrieves the outcome.
        let _ = self.sender.send(Command::Halt);
        let Some(worker) = self.worker.take() else {
            return Err(EngineError::Internal("controller already halted".into()));
        };
        worker
            .join()
            .map_err(|_| EngineError::Internal("worker thread panicked".into()))
    }
}

impl<I: Integrator> Drop for Controller<I> {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.take() {
            let _ = self.sender.send(Command::Halt);
            if worker.join().is_err() {
                error!("worker thread panicked during shutdown");
            }
        }
    }
}

fn worker_loop<I: Integrator>(
    mut simulation: Simulation,
    mut integrator: I,
    receiver: Receiver<Command<I>>,
    max_steps: Option<u64>,
    completed_steps: &AtomicU64,
) -> RunOutcome<I> {
    let mut result = integrator.reset(&mut simulation);
    let mut paused = false;

    'run: while result.is_ok() {
        if max_steps.is_some_and(|max| completed_steps.load(Ordering::Relaxed) >= max) {
            debug!("step budget complete");
            break;
        }

        // Drain queued commands; while paused, block for the next one.
        loop {
            let command = if paused {
                match receiver.recv() {
                    Ok(c) => c,
                    // All handles dropped; nothing can ever resume us.
                    Err(_) => break 'run,
                }
            } else {
                match receiver.try_recv() {
                    Ok(c) => c,
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => break 'run,
                }
            };
            match command {
                Command::Pause => {
                    debug!("pausing at step boundary");
                    paused = true;
                }
                Command::Resume => {
                    debug!("resuming");
                    paused = false;
                    break;
                }
                Command::Urgent(action, state) => {
                    state.set(ActionStatus::Current);
                    let panicked = panic::catch_unwind(AssertUnwindSafe(|| {
                        action(&mut simulation, &mut integrator)
                    }))
                    .err();
                    match panicked {
                        None => state.set(ActionStatus::Completed),
                        Some(payload) => {
                            let message = panic_message(payload.as_ref());
                            warn!(message, "urgent action panicked");
                            state.set(ActionStatus::Failed(message.clone()));
                            result = Err(EngineError::UrgentActionPanicked(message));
                            break 'run;
                        }
                    }
                }
                Command::Halt => break 'run,
            }
        }

        result = integrator.step(&mut simulation);
        if result.is_ok() {
            completed_steps.fetch_add(1, Ordering::Release);
        }
    }

    // Anything still queued will never run.
    while let Ok(command) = receiver.try_recv() {
        if let Command::Urgent(_, state) = command {
            state.set(ActionStatus::Stopped);
        }
    }

    if let Err(e) = &result {
        error!(error = %e, "run stopped with an error");
    }
    RunOutcome {
        simulation,
        integrator,
        result,
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
