use std::{collections::HashMap, sync::Arc, time::Duration};

use metrics::counter;
use tokio::{
    sync::{mpsc, watch},
    task::AbortHandle,
};
use tracing::{debug, info};

use crate::application::source::{ContentSource, FetchOutcome, FetchPolicy};
use crate::domain::articles::{ArticleRecord, ArticleSlug};

use super::machine::{
    ArticleSnapshot, Effect, FetchTicket, PollingConfig, ReadinessMachine, TimerKind, TimerToken,
};

const TARGET: &str = "prepwise::readiness::watcher";

enum WatchEvent {
    Fetched {
        ticket: FetchTicket,
        outcome: FetchOutcome,
    },
    TimerFired(TimerToken),
}

/// One cancellable timer per [`TimerKind`]. Arming a slot replaces the
/// previous occupant; cancelling an empty or already-fired slot is a no-op.
#[derive(Default)]
struct TimerSlots {
    slots: HashMap<TimerKind, AbortHandle>,
}

impl TimerSlots {
    fn arm(
        &mut self,
        token: TimerToken,
        delay: Duration,
        events: mpsc::UnboundedSender<WatchEvent>,
    ) {
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = events.send(WatchEvent::TimerFired(token));
        });
        if let Some(previous) = self.slots.insert(token.kind(), handle.abort_handle()) {
            previous.abort();
        }
    }

    fn cancel_all(&mut self) {
        for (_, handle) in self.slots.drain() {
            handle.abort();
        }
    }
}

/// Drives a [`ReadinessMachine`] on the tokio event loop.
///
/// Fetches and timers run as spawned tasks that report back through a channel;
/// the watcher applies those events one at a time, so the machine itself is
/// never shared. Snapshots are published on a `watch` channel for views.
pub struct ArticleWatcher<S> {
    machine: ReadinessMachine,
    source: Arc<S>,
    events_tx: mpsc::UnboundedSender<WatchEvent>,
    events_rx: mpsc::UnboundedReceiver<WatchEvent>,
    timers: TimerSlots,
    in_flight: Vec<AbortHandle>,
    snapshots: watch::Sender<ArticleSnapshot>,
}

impl<S> ArticleWatcher<S>
where
    S: ContentSource + 'static,
{
    pub fn new(source: Arc<S>, config: PollingConfig) -> Self {
        Self::with_machine(source, ReadinessMachine::new(config))
    }

    pub fn with_machine(source: Arc<S>, machine: ReadinessMachine) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (snapshots, _) = watch::channel(machine.snapshot());
        Self {
            machine,
            source,
            events_tx,
            events_rx,
            timers: TimerSlots::default(),
            in_flight: Vec::new(),
            snapshots,
        }
    }

    pub fn snapshot(&self) -> ArticleSnapshot {
        self.machine.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<ArticleSnapshot> {
        self.snapshots.subscribe()
    }

    pub fn ready_article(&self) -> Option<&ArticleRecord> {
        self.machine.ready_article()
    }

    /// Start following `slug`, discarding whatever was followed before.
    pub fn watch(&mut self, slug: ArticleSlug) {
        let effects = self.machine.initialize(slug);
        self.apply(effects);
    }

    pub fn change_identifier(&mut self, slug: ArticleSlug) {
        let effects = self.machine.identifier_changed(slug);
        self.apply(effects);
    }

    pub fn retry(&mut self) {
        let effects = self.machine.retry();
        self.apply(effects);
    }

    /// Stop following the current article and cancel all pending work.
    pub fn unmount(&mut self) {
        let effects = self.machine.unmount();
        self.apply(effects);
        self.abort_in_flight();
    }

    /// Wait for the next fetch result or timer and apply it.
    pub async fn step(&mut self) -> ArticleSnapshot {
        if let Some(event) = self.events_rx.recv().await {
            let effects = match event {
                WatchEvent::Fetched { ticket, outcome } => {
                    self.machine.on_fetch_result(ticket, outcome)
                }
                WatchEvent::TimerFired(token) => self.machine.on_timer(token),
            };
            self.apply(effects);
        }
        self.snapshot()
    }

    /// Drive events until the article is `Ready` or `Failed`.
    pub async fn settle(&mut self) -> ArticleSnapshot {
        loop {
            let snapshot = self.snapshot();
            if snapshot.slug.is_none() || snapshot.state.is_terminal() {
                return snapshot;
            }
            self.step().await;
        }
    }

    fn apply(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Fetch {
                    ticket,
                    slug,
                    policy,
                } => self.spawn_fetch(ticket, slug, policy),
                Effect::ArmTimer { token, delay } => {
                    self.timers.arm(token, delay, self.events_tx.clone());
                }
                Effect::CancelTimers => {
                    self.timers.cancel_all();
                    self.abort_in_flight();
                }
            }
        }
        self.publish();
    }

    fn spawn_fetch(&mut self, ticket: FetchTicket, slug: ArticleSlug, policy: FetchPolicy) {
        counter!("prepwise_article_fetch_total").increment(1);
        if policy == FetchPolicy::NetworkOnly {
            counter!("prepwise_article_poll_total").increment(1);
        }
        debug!(target = TARGET, slug = %slug, ?policy, "issuing article fetch");

        let source = Arc::clone(&self.source);
        let events = self.events_tx.clone();
        let handle = tokio::spawn(async move {
            let outcome = FetchOutcome::from(source.fetch(&slug, policy).await);
            let _ = events.send(WatchEvent::Fetched { ticket, outcome });
        });

        self.in_flight.retain(|handle| !handle.is_finished());
        self.in_flight.push(handle.abort_handle());
    }

    fn abort_in_flight(&mut self) {
        for handle in self.in_flight.drain(..) {
            handle.abort();
        }
    }

    fn publish(&self) {
        let snapshot = self.machine.snapshot();
        let changed = {
            let current = self.snapshots.borrow();
            current.state != snapshot.state || current.slug != snapshot.slug
        };
        if changed {
            info!(
                target = TARGET,
                slug = snapshot.slug.as_ref().map(ArticleSlug::as_str).unwrap_or(""),
                state = snapshot.state.label(),
                "article readiness changed"
            );
        }
        self.snapshots.send_replace(snapshot);
    }
}

impl<S> Drop for ArticleWatcher<S> {
    fn drop(&mut self) {
        self.timers.cancel_all();
        for handle in self.in_flight.drain(..) {
            handle.abort();
        }
    }
}
