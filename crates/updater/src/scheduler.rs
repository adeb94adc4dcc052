//! Periodic and on-demand update checks
//!
//! `Idle -> Checking -> Idle` with at most one pending timer. Entering
//! `Checking` cancels the timer; leaving it re-arms the timer only when
//! automatic checks are enabled.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use wdm_events::{EventEmitter, EventSender, UpdateEvent};

use crate::checker::UpdateChecker;

/// What started a check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Trigger {
    OnDemand,
    Automatic,
    /// The armed timer of the given generation
    Timer(u64),
}

struct Inner {
    checker: UpdateChecker,
    interval: Duration,
    timer: Mutex<Option<JoinHandle<()>>>,
    /// Bumped whenever the timer is armed or cancelled
    generation: AtomicU64,
    checking: tokio::sync::Mutex<()>,
    event_sender: Option<EventSender>,
}

/// Owns the recheck timer and serializes checks
#[derive(Clone)]
pub struct UpdateScheduler {
    inner: Arc<Inner>,
}

impl EventEmitter for UpdateScheduler {
    fn event_sender(&self) -> Option<&EventSender> {
        self.inner.event_sender.as_ref()
    }
}

impl UpdateScheduler {
    #[must_use]
    pub fn new(
        checker: UpdateChecker,
        interval: Duration,
        event_sender: Option<EventSender>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                checker,
                interval,
                timer: Mutex::new(None),
                generation: AtomicU64::new(0),
                checking: tokio::sync::Mutex::new(()),
                event_sender,
            }),
        }
    }

    /// Run a check requested by the user
    ///
    /// Runs regardless of the automatic-checks preference and clears any
    /// suppressed version first.
    pub async fn check_now(&self) -> bool {
        self.spawn_check(Trigger::OnDemand).await
    }

    /// Run a check if automatic checks are enabled, arming the timer after it
    pub async fn start(&self) -> bool {
        if self.inner.checker.preferences().automatic_checks().await {
            self.spawn_check(Trigger::Automatic).await
        } else {
            tracing::debug!("automatic update checks disabled");
            false
        }
    }

    /// Whether a future check is armed
    #[must_use]
    pub fn has_pending_check(&self) -> bool {
        self.timer_slot()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Cancel the pending check, if any
    ///
    /// A timer that already fired but has not started its check yet is
    /// superseded as well.
    pub fn cancel(&self) {
        let handle = {
            let mut slot = self.timer_slot();
            self.inner.generation.fetch_add(1, Ordering::AcqRel);
            slot.take()
        };
        if let Some(handle) = handle {
            handle.abort();
            tracing::debug!("scheduled update check cancelled");
            self.emit_update(UpdateEvent::ScheduleCancelled);
        }
    }

    fn timer_slot(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
        self.inner
            .timer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn is_current(&self, generation: u64) -> bool {
        self.inner.generation.load(Ordering::Acquire) == generation
    }

    /// Run the check on a worker task and wait for its outcome
    async fn spawn_check(&self, trigger: Trigger) -> bool {
        let this = self.clone();
        match tokio::spawn(async move { this.run_check(trigger).await }).await {
            Ok(notified) => notified,
            Err(e) => {
                tracing::error!(error = %e, "update check task failed");
                false
            }
        }
    }

    async fn run_check(&self, trigger: Trigger) -> bool {
        let _checking = self.inner.checking.lock().await;
        if let Trigger::Timer(generation) = trigger {
            if !self.is_current(generation) {
                tracing::debug!("superseded scheduled check skipped");
                return false;
            }
        }
        self.cancel();

        let on_demand = trigger == Trigger::OnDemand;
        self.emit_update(UpdateEvent::CheckStarted { on_demand });
        self.emit_update(UpdateEvent::ControlsDisabled);

        let preferences = self.inner.checker.preferences();
        if on_demand {
            match preferences.clear_suppression().await {
                Ok(true) => self.emit_update(UpdateEvent::SuppressionCleared),
                Ok(false) => {}
                Err(e) => tracing::warn!(error = %e, "failed to clear suppressed version"),
            }
        }

        let notified = self.inner.checker.check_for_updates().await;

        self.emit_update(UpdateEvent::ControlsEnabled);
        if preferences.automatic_checks().await {
            self.arm();
        }
        notified
    }

    /// Body of an armed timer once its interval elapsed
    async fn fire(&self, generation: u64) {
        {
            let mut slot = self.timer_slot();
            if !self.is_current(generation) {
                return;
            }
            // Release our own handle so the check does not abort this task
            drop(slot.take());
        }
        self.run_check(Trigger::Timer(generation)).await;
    }

    fn arm(&self) {
        let interval = self.inner.interval;
        {
            let mut slot = self.timer_slot();
            let generation = self.inner.generation.fetch_add(1, Ordering::AcqRel) + 1;
            let this = self.clone();
            let handle = tokio::spawn(async move {
                tokio::time::sleep(interval).await;
                this.fire(generation).await;
            });
            if let Some(previous) = slot.replace(handle) {
                previous.abort();
            }
        }

        tracing::debug!(in_secs = interval.as_secs(), "next update check armed");
        self.emit_update(UpdateEvent::NextCheckScheduled {
            in_secs: interval.as_secs(),
        });
    }
}
