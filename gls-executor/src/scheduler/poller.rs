//! Polling monitor
//!
//! One long-lived loop per run that owns every outstanding task handle.
//! The loop wakes on a short tick to admit new handles and react to
//! shutdown, while each handle's remote request is spaced out independently
//! by `min_poll_spacing`. Requests within a pass run concurrently, bounded by
//! `max_concurrent_requests`, so one slow or failing handle never holds the
//! others back.

use futures_util::future::{BoxFuture, FutureExt};
use futures_util::stream::{self, StreamExt};
use gls_core::domain::task::{TaskSnapshot, TaskState};
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TryRecvError};
use tokio::sync::watch;
use tokio::time::{self, Duration, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::config::MonitorConfig;
use crate::error::{MonitorError, RemoteError};
use crate::repository::RemoteJobClient;
use crate::scheduler::handle::TaskHandle;
use crate::scheduler::task_watch::TaskWatch;

/// A handle together with the channel its snapshots are published on
struct Tracked {
    handle: TaskHandle,
    publisher: watch::Sender<TaskSnapshot>,
}

impl Tracked {
    fn publish(&self) {
        self.publisher.send_replace(self.handle.snapshot());
    }
}

const MIN_POLL_TICK: Duration = Duration::from_millis(1);

/// Outcome of one remote request, for the reachability counter
enum Contact {
    /// The service answered, possibly with a rejection
    Reached,
    /// The request failed transiently
    Unreachable,
    /// No request was sent
    Skipped,
}

/// The polling loop; consumed by [`run`](Self::run)
pub struct PollingMonitor {
    config: MonitorConfig,
    client: Arc<dyn RemoteJobClient>,
    admissions: mpsc::UnboundedReceiver<Tracked>,
    shutdown: watch::Receiver<bool>,
    outstanding: Vec<Tracked>,
    /// Consecutive passes in which no request reached the service
    consecutive_failures: u32,
}

/// Cloneable control side of a [`PollingMonitor`]
#[derive(Clone)]
pub struct MonitorHandle {
    admissions: mpsc::UnboundedSender<Tracked>,
    shutdown: Arc<watch::Sender<bool>>,
}

impl MonitorHandle {
    /// Hands a freshly created task handle to the monitor
    ///
    /// Fails once shutdown has been requested.
    pub fn admit(&self, handle: TaskHandle) -> Result<TaskWatch, MonitorError> {
        if *self.shutdown.borrow() {
            return Err(MonitorError::ShutDown);
        }

        let (publisher, receiver) = watch::channel(handle.snapshot());
        debug!("Admitting task {}", handle.task_id());
        self.admissions
            .send(Tracked { handle, publisher })
            .map_err(|_| MonitorError::ShutDown)?;

        Ok(TaskWatch::new(receiver))
    }

    /// Stops the monitor; every non-terminal handle ends up `Aborted`
    pub fn shutdown(&self) {
        if !self.shutdown.send_replace(true) {
            info!("Polling monitor shutdown requested");
        }
    }

    pub fn is_shut_down(&self) -> bool {
        *self.shutdown.borrow()
    }
}

impl PollingMonitor {
    /// Creates a monitor and its control handle
    ///
    /// A zero `poll_tick` or `max_concurrent_requests` is raised to the
    /// smallest usable value.
    pub fn new(
        mut config: MonitorConfig,
        client: Arc<dyn RemoteJobClient>,
    ) -> (Self, MonitorHandle) {
        if config.poll_tick.is_zero() {
            warn!("poll_tick of zero raised to {:?}", MIN_POLL_TICK);
            config.poll_tick = MIN_POLL_TICK;
        }
        if config.max_concurrent_requests == 0 {
            warn!("max_concurrent_requests of zero raised to 1");
            config.max_concurrent_requests = 1;
        }

        let (admissions_tx, admissions_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let monitor = Self {
            config,
            client,
            admissions: admissions_rx,
            shutdown: shutdown_rx,
            outstanding: Vec::new(),
            consecutive_failures: 0,
        };
        let handle = MonitorHandle {
            admissions: admissions_tx,
            shutdown: Arc::new(shutdown_tx),
        };

        (monitor, handle)
    }

    /// Runs the loop
    ///
    /// Returns `Ok` after shutdown, or once every [`MonitorHandle`] is dropped
    /// and no task is outstanding. Returns [`MonitorError::RemoteUnavailable`]
    /// when the service stays unreachable for too many consecutive passes; the
    /// outstanding handles are aborted in that case.
    pub async fn run(mut self) -> Result<(), MonitorError> {
        info!(
            "Starting polling monitor (tick: {:?}, min poll spacing: {:?})",
            self.config.poll_tick, self.config.min_poll_spacing
        );

        let mut ticker = time::interval(self.config.poll_tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut controllers_alive = true;

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                changed = self.shutdown.changed(), if controllers_alive => {
                    if changed.is_err() {
                        controllers_alive = false;
                    }
                }
            }

            if *self.shutdown.borrow() {
                self.abort_all("monitor shut down").await;
                info!("Polling monitor stopped");
                return Ok(());
            }

            let admissions_closed = self.admit_pending();
            if self.interruptible_pass().await {
                self.abort_all("monitor shut down").await;
                info!("Polling monitor stopped during a poll pass");
                return Ok(());
            }
            self.outstanding
                .retain(|tracked| !tracked.handle.state().is_terminal());

            if self.consecutive_failures >= self.config.max_consecutive_failures {
                let err = MonitorError::RemoteUnavailable {
                    consecutive_failures: self.consecutive_failures,
                };
                error!("{}", err);
                self.abort_all(&err.to_string()).await;
                return Err(err);
            }

            if admissions_closed && self.outstanding.is_empty() {
                info!("No task outstanding and no controller left, stopping polling monitor");
                return Ok(());
            }
        }
    }

    /// Moves queued admissions into the outstanding set
    ///
    /// Returns true once every sender is gone.
    fn admit_pending(&mut self) -> bool {
        loop {
            match self.admissions.try_recv() {
                Ok(tracked) => {
                    debug!("Task {} is now outstanding", tracked.handle.task_id());
                    self.outstanding.push(tracked);
                }
                Err(TryRecvError::Empty) => return false,
                Err(TryRecvError::Disconnected) => return true,
            }
        }
    }

    /// Runs one pass, cut short by shutdown
    ///
    /// Once shutdown is requested the requests already in flight get
    /// `cancel_timeout` to finish, so a submission that completes is still
    /// seen and cancelled. Returns true if shutdown was requested.
    async fn interruptible_pass(&mut self) -> bool {
        let grace = self.config.cancel_timeout;
        let mut shutdown = self.shutdown.clone();

        let pass = self.poll_pass();
        tokio::pin!(pass);

        tokio::select! {
            _ = &mut pass => false,
            _ = shutdown_requested(&mut shutdown) => {
                if time::timeout(grace, &mut pass).await.is_err() {
                    warn!("Abandoning requests still in flight after {:?}", grace);
                }
                true
            }
        }
    }

    /// Sends one request for every due handle
    async fn poll_pass(&mut self) {
        let now = Instant::now();
        let client = self.client.as_ref();
        let config = &self.config;
        let shutdown = &self.shutdown;

        let due: Vec<&mut Tracked> = self
            .outstanding
            .iter_mut()
            .filter(|tracked| tracked.handle.is_due(now))
            .collect();

        if due.is_empty() {
            return;
        }

        debug!("Poll pass over {} due handle(s)", due.len());

        let requests: Vec<BoxFuture<'_, Contact>> = due
            .into_iter()
            .map(|tracked| advance(client, config, shutdown, tracked).boxed())
            .collect();

        let contacts: Vec<Contact> = stream::iter(requests)
            .buffer_unordered(config.max_concurrent_requests)
            .collect()
            .await;

        let reached = contacts
            .iter()
            .filter(|c| matches!(c, Contact::Reached))
            .count();
        let unreachable = contacts
            .iter()
            .filter(|c| matches!(c, Contact::Unreachable))
            .count();

        if reached > 0 {
            self.consecutive_failures = 0;
        } else if unreachable > 0 {
            self.consecutive_failures += 1;
            warn!(
                "Remote service unreachable for {} consecutive pass(es)",
                self.consecutive_failures
            );
        }
    }

    /// Aborts every outstanding and queued handle, then cancels their operations
    async fn abort_all(&mut self, reason: &str) {
        self.admissions.close();
        self.admit_pending();

        let mut in_flight = Vec::new();
        for tracked in &mut self.outstanding {
            let operation_id = tracked.handle.remote_operation_id().map(str::to_string);
            if tracked.handle.abort(reason) {
                tracked.publish();
                in_flight.extend(operation_id);
            }
        }
        self.outstanding.clear();

        if in_flight.is_empty() {
            return;
        }

        info!("Cancelling {} in-flight operation(s)", in_flight.len());
        let client = self.client.as_ref();
        let limit = self.config.cancel_timeout;
        let cancels: Vec<BoxFuture<'_, ()>> = in_flight
            .iter()
            .map(|operation_id| cancel_best_effort(client, operation_id, limit).boxed())
            .collect();

        stream::iter(cancels)
            .for_each_concurrent(self.config.max_concurrent_requests, |cancel| cancel)
            .await;
    }
}

/// Sends the request a due handle needs and applies its outcome
async fn advance(
    client: &dyn RemoteJobClient,
    config: &MonitorConfig,
    shutdown: &watch::Receiver<bool>,
    tracked: &mut Tracked,
) -> Contact {
    let contact = match tracked.handle.state() {
        TaskState::Created => submit(client, config, shutdown, &mut tracked.handle).await,
        TaskState::Submitted | TaskState::Running => {
            poll(client, config, &mut tracked.handle).await
        }
        TaskState::Succeeded | TaskState::Failed | TaskState::Aborted => Contact::Skipped,
    };

    tracked.publish();
    contact
}

async fn submit(
    client: &dyn RemoteJobClient,
    config: &MonitorConfig,
    shutdown: &watch::Receiver<bool>,
    handle: &mut TaskHandle,
) -> Contact {
    if *shutdown.borrow() {
        handle.abort("monitor shut down before submission");
        return Contact::Skipped;
    }

    let submitted = time::timeout(config.request_timeout, client.submit(handle.job()))
        .await
        .unwrap_or_else(|_| Err(timed_out(config.request_timeout)));

    match submitted {
        Ok(operation_id) => {
            if *shutdown.borrow() {
                warn!(
                    "Task {} was submitted as {} after shutdown, cancelling",
                    handle.task_id(),
                    operation_id
                );
                cancel_best_effort(client, &operation_id, config.cancel_timeout).await;
                handle.abort_after_submit(operation_id, "monitor shut down during submission");
            } else {
                handle.mark_submitted(operation_id, Instant::now(), config.min_poll_spacing);
            }
            Contact::Reached
        }
        Err(e) => {
            handle.mark_submit_failed(&e.to_string());
            if e.is_transient() {
                Contact::Unreachable
            } else {
                Contact::Reached
            }
        }
    }
}

async fn poll(
    client: &dyn RemoteJobClient,
    config: &MonitorConfig,
    handle: &mut TaskHandle,
) -> Contact {
    let Some(operation_id) = handle.remote_operation_id().map(str::to_string) else {
        return Contact::Skipped;
    };
    let spacing = config.min_poll_spacing;

    let polled = time::timeout(config.request_timeout, client.poll(&operation_id))
        .await
        .unwrap_or_else(|_| Err(timed_out(config.request_timeout)));

    match polled {
        Ok(response) => {
            handle.record_poll(response, Instant::now(), spacing);
            Contact::Reached
        }
        Err(RemoteError::Transient(message)) => {
            warn!(
                "Transient poll failure for task {} ({}): {}",
                handle.task_id(),
                operation_id,
                message
            );
            handle.record_poll_error(&message, Instant::now(), spacing);
            Contact::Unreachable
        }
        Err(RemoteError::Rejected(message)) => {
            handle.abort(&format!(
                "remote service rejected status query for {}: {}",
                operation_id, message
            ));
            Contact::Reached
        }
    }
}

fn timed_out(limit: Duration) -> RemoteError {
    RemoteError::Transient(format!("no answer within {:?}", limit))
}

/// Resolves once shutdown is flagged; never resolves if every controller is gone first
async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

async fn cancel_best_effort(client: &dyn RemoteJobClient, operation_id: &str, limit: Duration) {
    match time::timeout(limit, client.cancel(operation_id)).await {
        Ok(Ok(())) => debug!("Cancelled operation {}", operation_id),
        Ok(Err(e)) => warn!("Failed to cancel operation {}: {}", operation_id, e),
        Err(_) => warn!("Timed out cancelling operation {}", operation_id),
    }
}
