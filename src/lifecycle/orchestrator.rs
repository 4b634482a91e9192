//! Concurrent action runner with a single coordinated shutdown.
//!
//! Every action runs on its own task. Whichever finishes first (success,
//! error or panic) fires the shared [`Shutdown`] and runs the caller's
//! shutdown callback exactly once; the rest are expected to observe the
//! shutdown and return. `run` waits for all of them and reports every
//! failure, in the order the actions were registered.

use std::any::Any;
use std::backtrace::Backtrace;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, PoisonError};

use futures_util::future::BoxFuture;
use futures_util::FutureExt;

use crate::lifecycle::signals::wait_for_signal;
use crate::lifecycle::{BoxError, Shutdown, ShutdownListener};

/// Name of the implicit action that waits for SIGINT/SIGTERM.
pub const SIGNAL_ACTION: &str = "signal-wait";

/// A named unit of work owned by the orchestrator for one run.
pub struct Action {
    name: String,
    future: BoxFuture<'static, Result<(), BoxError>>,
}

impl Action {
    pub fn new<F, E>(name: impl Into<String>, future: F) -> Self
    where
        F: Future<Output = Result<(), E>> + Send + 'static,
        E: Into<BoxError>,
    {
        Self {
            name: name.into(),
            future: Box::pin(future.map(|result| result.map_err(Into::<BoxError>::into))),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Action").field("name", &self.name).finish()
    }
}

/// How a single action ended. Never leaves this module as-is.
enum RunOutcome {
    Success,
    Failure(BoxError),
    Panic { message: String, backtrace: String },
}

/// A failed action, as reported to the caller.
#[derive(Debug, thiserror::Error)]
pub enum TaskFailure {
    #[error("action '{action}' failed: {error}")]
    Failed { action: String, error: BoxError },

    #[error("action '{action}' panicked: {message}")]
    Panicked {
        action: String,
        message: String,
        stack: String,
    },
}

impl TaskFailure {
    pub fn action(&self) -> &str {
        match self {
            TaskFailure::Failed { action, .. } | TaskFailure::Panicked { action, .. } => action,
        }
    }

    pub fn is_panic(&self) -> bool {
        matches!(self, TaskFailure::Panicked { .. })
    }
}

/// Every failure from one run, ordered by action registration.
#[derive(Debug, thiserror::Error)]
#[error("{}", Joined(.failures))]
pub struct RunError {
    failures: Vec<TaskFailure>,
}

struct Joined<'a>(&'a [TaskFailure]);

impl fmt::Display for Joined<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, failure) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{failure}")?;
        }
        Ok(())
    }
}

impl RunError {
    pub fn failures(&self) -> &[TaskFailure] {
        &self.failures
    }

    /// Failure of the earliest-registered failing action.
    pub fn first(&self) -> &TaskFailure {
        &self.failures[0]
    }

    pub fn into_failures(self) -> Vec<TaskFailure> {
        self.failures
    }
}

/// Builder for one orchestrated run.
pub struct Orchestrator {
    shutdown: Shutdown,
    actions: Vec<Action>,
    wait_for_signal: bool,
}

impl Orchestrator {
    pub fn new() -> Self {
        Self {
            shutdown: Shutdown::new(),
            actions: Vec::new(),
            wait_for_signal: true,
        }
    }

    /// Listener on the run's shared shutdown, for actions that want to stop
    /// themselves when another action ends.
    pub fn shutdown_listener(&self) -> ShutdownListener {
        self.shutdown.subscribe()
    }

    pub fn action<F, E>(mut self, name: impl Into<String>, future: F) -> Self
    where
        F: Future<Output = Result<(), E>> + Send + 'static,
        E: Into<BoxError>,
    {
        self.actions.push(Action::new(name, future));
        self
    }

    /// Skip the implicit SIGINT/SIGTERM action.
    pub fn without_signal_wait(mut self) -> Self {
        self.wait_for_signal = false;
        self
    }

    /// Run every action to completion. `on_shutdown` is invoked at most once,
    /// as soon as the first action finishes.
    pub async fn run<C>(self, on_shutdown: C) -> Result<(), RunError>
    where
        C: FnOnce() + Send + 'static,
    {
        let Self {
            shutdown,
            mut actions,
            wait_for_signal: with_signal,
        } = self;

        if with_signal {
            actions.push(Action::new(SIGNAL_ACTION, wait_for_signal(shutdown.subscribe())));
        }

        run_actions(shutdown, on_shutdown, actions).await
    }
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::new()
    }
}

/// Run `actions` plus the implicit signal-wait action, invoking
/// `on_shutdown` once when the first of them finishes.
pub async fn run<C>(
    on_shutdown: C,
    actions: impl IntoIterator<Item = Action>,
) -> Result<(), RunError>
where
    C: FnOnce() + Send + 'static,
{
    let mut orchestrator = Orchestrator::new();
    orchestrator.actions.extend(actions);
    orchestrator.run(on_shutdown).await
}

async fn run_actions<C>(
    shutdown: Shutdown,
    on_shutdown: C,
    actions: Vec<Action>,
) -> Result<(), RunError>
where
    C: FnOnce() + Send + 'static,
{
    let callback = Arc::new(Mutex::new(Some(on_shutdown)));
    let mut handles = Vec::with_capacity(actions.len());

    tracing::debug!(actions = actions.len(), "Starting actions");

    for Action { name, future } in actions {
        let gate = shutdown.clone();
        let callback = Arc::clone(&callback);
        let task_name = name.clone();
        let handle = tokio::spawn(async move {
            let outcome = invoke(future).await;
            match &outcome {
                RunOutcome::Success => tracing::debug!(action = %task_name, "Action finished"),
                RunOutcome::Failure(error) => {
                    tracing::error!(action = %task_name, error = %error, "Action failed")
                }
                RunOutcome::Panic { message, backtrace } => tracing::error!(
                    action = %task_name,
                    panic = %message,
                    backtrace = %backtrace,
                    "Action panicked"
                ),
            }
            fire_shutdown(&gate, &callback, &task_name);
            outcome
        });
        handles.push((name, handle));
    }

    let mut failures = Vec::new();
    for (action, handle) in handles {
        let outcome = match handle.await {
            Ok(outcome) => outcome,
            Err(join_error) => {
                // Only reachable if the task died outside `invoke`.
                fire_shutdown(&shutdown, &callback, &action);
                if join_error.is_panic() {
                    RunOutcome::Panic {
                        message: panic_message(&*join_error.into_panic()),
                        backtrace: Backtrace::force_capture().to_string(),
                    }
                } else {
                    RunOutcome::Failure("task cancelled".into())
                }
            }
        };
        match outcome {
            RunOutcome::Success => {}
            RunOutcome::Failure(error) => failures.push(TaskFailure::Failed { action, error }),
            RunOutcome::Panic { message, backtrace } => failures.push(TaskFailure::Panicked {
                action,
                message,
                stack: backtrace,
            }),
        }
    }

    if failures.is_empty() {
        Ok(())
    } else {
        Err(RunError { failures })
    }
}

/// Drive an action, converting a panic into a [`RunOutcome::Panic`].
async fn invoke(future: BoxFuture<'static, Result<(), BoxError>>) -> RunOutcome {
    match AssertUnwindSafe(future).catch_unwind().await {
        Ok(Ok(())) => RunOutcome::Success,
        Ok(Err(error)) => RunOutcome::Failure(error),
        Err(payload) => RunOutcome::Panic {
            message: panic_message(&*payload),
            backtrace: Backtrace::force_capture().to_string(),
        },
    }
}

/// Single-fire gate: only the caller that flips the shared shutdown runs the
/// callback. A panicking callback is logged, never propagated.
fn fire_shutdown<C: FnOnce()>(shutdown: &Shutdown, callback: &Mutex<Option<C>>, trigger: &str) {
    if !shutdown.trigger() {
        return;
    }
    tracing::info!(action = trigger, "Shutting down");

    let callback = callback.lock().unwrap_or_else(PoisonError::into_inner).take();
    if let Some(callback) = callback {
        if let Err(payload) = std::panic::catch_unwind(AssertUnwindSafe(callback)) {
            tracing::error!(
                panic = %panic_message(&*payload),
                backtrace = %Backtrace::force_capture(),
                "Shutdown callback panicked"
            );
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
