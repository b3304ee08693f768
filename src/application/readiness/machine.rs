use std::{fmt, sync::Arc, time::Duration};

use rand::{Rng, SeedableRng, rngs::StdRng};
use tracing::debug;

use crate::application::source::{FetchOutcome, FetchPolicy};
use crate::domain::articles::{ArticleRecord, ArticleSlug};

use super::status::{status_message, status_message_count};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

const TARGET: &str = "prepwise::readiness";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollingConfig {
    /// Delay between a non-generated result and the next network fetch.
    pub poll_interval: Duration,
    /// Cadence of the cosmetic status-line rotation.
    pub status_interval: Duration,
    /// Fixed seed for status-line selection; `None` seeds from the OS.
    pub status_seed: Option<u64>,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            status_interval: DEFAULT_POLL_INTERVAL,
            status_seed: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    NotFound,
    /// Transport-layer message, kept verbatim.
    Transport(String),
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::NotFound => f.write_str("not found"),
            FailureReason::Transport(message) => f.write_str(message),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadinessState {
    Loading,
    Generating,
    Ready,
    Failed(FailureReason),
}

impl ReadinessState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ReadinessState::Ready | ReadinessState::Failed(_))
    }

    pub fn label(&self) -> &'static str {
        match self {
            ReadinessState::Loading => "loading",
            ReadinessState::Generating => "generating",
            ReadinessState::Ready => "ready",
            ReadinessState::Failed(_) => "failed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    Poll,
    StatusRotation,
}

/// Identifies one issued fetch. Results carrying a ticket from an earlier
/// epoch, or older than the last applied result, are discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket {
    epoch: u64,
    sequence: u64,
}

/// Identifies one armed timer. Only the most recent arm of a kind is live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerToken {
    epoch: u64,
    kind: TimerKind,
    arm: u64,
}

impl TimerToken {
    pub fn kind(&self) -> TimerKind {
        self.kind
    }
}

/// Work the driver must perform on behalf of the machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Fetch {
        ticket: FetchTicket,
        slug: ArticleSlug,
        policy: FetchPolicy,
    },
    ArmTimer {
        token: TimerToken,
        delay: Duration,
    },
    CancelTimers,
}

/// Read-only view handed to the presentation side.
#[derive(Debug, Clone, PartialEq)]
pub struct ArticleSnapshot {
    pub slug: Option<ArticleSlug>,
    pub state: ReadinessState,
    pub status_message: Option<&'static str>,
    /// Full record when `Ready`; a content-stripped copy while `Generating`.
    pub article: Option<Arc<ArticleRecord>>,
}

impl ArticleSnapshot {
    pub fn idle() -> Self {
        Self {
            slug: None,
            state: ReadinessState::Loading,
            status_message: None,
            article: None,
        }
    }
}

/// Readiness controller for one displayed article.
///
/// The machine owns no timers and performs no I/O: every operation returns the
/// [`Effect`]s the caller has to execute. Identifier changes bump an epoch so
/// that results and timers belonging to a previous article are ignored.
pub struct ReadinessMachine {
    config: PollingConfig,
    slug: Option<ArticleSlug>,
    epoch: u64,
    next_sequence: u64,
    last_applied: Option<u64>,
    next_arm: u64,
    poll_arm: Option<u64>,
    status_arm: Option<u64>,
    state: ReadinessState,
    article: Option<Arc<ArticleRecord>>,
    status_message: Option<&'static str>,
    rng: StdRng,
}

impl ReadinessMachine {
    pub fn new(config: PollingConfig) -> Self {
        let rng = match config.status_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        Self {
            config,
            slug: None,
            epoch: 0,
            next_sequence: 0,
            last_applied: None,
            next_arm: 0,
            poll_arm: None,
            status_arm: None,
            state: ReadinessState::Loading,
            article: None,
            status_message: None,
            rng,
        }
    }

    pub fn slug(&self) -> Option<&ArticleSlug> {
        self.slug.as_ref()
    }

    pub fn state(&self) -> &ReadinessState {
        &self.state
    }

    pub fn status_message(&self) -> Option<&'static str> {
        self.status_message
    }

    /// The stored record, only once its body is final.
    pub fn ready_article(&self) -> Option<&ArticleRecord> {
        match self.state {
            ReadinessState::Ready => self.article.as_deref(),
            _ => None,
        }
    }

    pub fn snapshot(&self) -> ArticleSnapshot {
        ArticleSnapshot {
            slug: self.slug.clone(),
            state: self.state.clone(),
            status_message: self.status_message,
            article: self.article.clone(),
        }
    }

    /// Start following `slug`: discard prior state and issue the first fetch.
    pub fn initialize(&mut self, slug: ArticleSlug) -> Vec<Effect> {
        self.start(slug, FetchPolicy::CacheFirst)
    }

    /// Switch to a different article. Pending timers are cancelled and results
    /// still in flight for the old slug are discarded when they arrive.
    pub fn identifier_changed(&mut self, slug: ArticleSlug) -> Vec<Effect> {
        if self.slug.as_ref() == Some(&slug) {
            return Vec::new();
        }
        self.initialize(slug)
    }

    /// Manual retry after a failure. Bypasses the query cache.
    pub fn retry(&mut self) -> Vec<Effect> {
        if !matches!(self.state, ReadinessState::Failed(_)) {
            return Vec::new();
        }
        match self.slug.clone() {
            Some(slug) => self.start(slug, FetchPolicy::NetworkOnly),
            None => Vec::new(),
        }
    }

    /// Stop following the current article. Later results and timers are no-ops.
    pub fn unmount(&mut self) -> Vec<Effect> {
        self.epoch += 1;
        self.slug = None;
        self.poll_arm = None;
        self.status_arm = None;
        vec![Effect::CancelTimers]
    }

    pub fn on_fetch_result(&mut self, ticket: FetchTicket, outcome: FetchOutcome) -> Vec<Effect> {
        if ticket.epoch != self.epoch {
            debug!(target = TARGET, "discarding fetch result from a previous article");
            return Vec::new();
        }
        if self.last_applied.is_some_and(|last| ticket.sequence <= last) {
            debug!(
                target = TARGET,
                sequence = ticket.sequence,
                "discarding out-of-order fetch result"
            );
            return Vec::new();
        }
        if self.state.is_terminal() {
            return Vec::new();
        }
        self.last_applied = Some(ticket.sequence);

        match outcome {
            FetchOutcome::NotFound => self.fail(FailureReason::NotFound),
            FetchOutcome::Transport(message) => self.fail(FailureReason::Transport(message)),
            FetchOutcome::Found(record) if record.is_generated => {
                self.transition(ReadinessState::Ready);
                self.article = Some(Arc::new(record));
                self.status_message = None;
                self.poll_arm = None;
                self.status_arm = None;
                vec![Effect::CancelTimers]
            }
            FetchOutcome::Found(record) => {
                let entering = self.state != ReadinessState::Generating;
                self.transition(ReadinessState::Generating);
                self.article = Some(Arc::new(record.without_content()));

                let mut effects = vec![self.arm(TimerKind::Poll)];
                if entering {
                    self.rotate_status();
                    effects.push(self.arm(TimerKind::StatusRotation));
                }
                effects
            }
        }
    }

    pub fn on_timer(&mut self, token: TimerToken) -> Vec<Effect> {
        if token.epoch != self.epoch {
            return Vec::new();
        }

        let slot = match token.kind {
            TimerKind::Poll => &mut self.poll_arm,
            TimerKind::StatusRotation => &mut self.status_arm,
        };
        if *slot != Some(token.arm) {
            return Vec::new();
        }
        *slot = None;

        if self.state != ReadinessState::Generating {
            return Vec::new();
        }

        match token.kind {
            TimerKind::Poll => {
                let Some(slug) = self.slug.clone() else {
                    return Vec::new();
                };
                vec![self.issue_fetch(slug, FetchPolicy::NetworkOnly)]
            }
            TimerKind::StatusRotation => {
                self.rotate_status();
                vec![self.arm(TimerKind::StatusRotation)]
            }
        }
    }

    fn start(&mut self, slug: ArticleSlug, policy: FetchPolicy) -> Vec<Effect> {
        self.epoch += 1;
        self.next_sequence = 0;
        self.last_applied = None;
        self.poll_arm = None;
        self.status_arm = None;
        self.state = ReadinessState::Loading;
        self.article = None;
        self.status_message = None;
        self.slug = Some(slug.clone());

        debug!(target = TARGET, slug = %slug, epoch = self.epoch, "following article");

        vec![Effect::CancelTimers, self.issue_fetch(slug, policy)]
    }

    fn fail(&mut self, reason: FailureReason) -> Vec<Effect> {
        self.transition(ReadinessState::Failed(reason));
        self.status_message = None;
        self.poll_arm = None;
        self.status_arm = None;
        vec![Effect::CancelTimers]
    }

    fn transition(&mut self, next: ReadinessState) {
        if self.state != next {
            debug!(
                target = TARGET,
                from = self.state.label(),
                to = next.label(),
                "readiness transition"
            );
        }
        self.state = next;
    }

    fn issue_fetch(&mut self, slug: ArticleSlug, policy: FetchPolicy) -> Effect {
        let ticket = FetchTicket {
            epoch: self.epoch,
            sequence: self.next_sequence,
        };
        self.next_sequence += 1;
        Effect::Fetch {
            ticket,
            slug,
            policy,
        }
    }

    fn arm(&mut self, kind: TimerKind) -> Effect {
        let arm = self.next_arm;
        self.next_arm += 1;
        let delay = match kind {
            TimerKind::Poll => {
                self.poll_arm = Some(arm);
                self.config.poll_interval
            }
            TimerKind::StatusRotation => {
                self.status_arm = Some(arm);
                self.config.status_interval
            }
        };
        Effect::ArmTimer {
            token: TimerToken {
                epoch: self.epoch,
                kind,
                arm,
            },
            delay,
        }
    }

    fn rotate_status(&mut self) {
        let index = self.rng.random_range(0..status_message_count());
        self.status_message = Some(status_message(index));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::articles::fixtures;

    fn machine() -> ReadinessMachine {
        ReadinessMachine::new(PollingConfig {
            status_seed: Some(7),
            ..PollingConfig::default()
        })
    }

    fn slug(raw: &str) -> ArticleSlug {
        ArticleSlug::parse(raw).expect("valid slug")
    }

    fn fetch_ticket(effects: &[Effect]) -> FetchTicket {
        effects
            .iter()
            .find_map(|effect| match effect {
                Effect::Fetch { ticket, .. } => Some(*ticket),
                _ => None,
            })
            .expect("fetch effect")
    }

    fn timer_token(effects: &[Effect], kind: TimerKind) -> TimerToken {
        effects
            .iter()
            .find_map(|effect| match effect {
                Effect::ArmTimer { token, .. } if token.kind() == kind => Some(*token),
                _ => None,
            })
            .expect("timer effect")
    }

    fn pending(slug: &str) -> FetchOutcome {
        FetchOutcome::Found(fixtures::article(slug, false, Some("partial")))
    }

    fn ready(slug: &str) -> FetchOutcome {
        FetchOutcome::Found(fixtures::article(slug, true, Some("# Title\n\nBody")))
    }

    #[test]
    fn initialize_issues_cache_first_fetch() {
        let mut machine = machine();
        let effects = machine.initialize(slug("two-sum"));

        assert_eq!(effects[0], Effect::CancelTimers);
        assert!(matches!(
            &effects[1],
            Effect::Fetch { policy: FetchPolicy::CacheFirst, slug, .. } if slug.as_str() == "two-sum"
        ));
        assert_eq!(machine.state(), &ReadinessState::Loading);
    }

    #[test]
    fn generated_on_first_fetch_goes_straight_to_ready() {
        let mut machine = machine();
        let ticket = fetch_ticket(&machine.initialize(slug("two-sum")));

        let effects = machine.on_fetch_result(ticket, ready("two-sum"));

        assert_eq!(effects, vec![Effect::CancelTimers]);
        assert_eq!(machine.state(), &ReadinessState::Ready);
        assert!(machine.ready_article().is_some());
        assert!(machine.status_message().is_none());
    }

    #[test]
    fn pending_record_schedules_poll_and_status_rotation() {
        let mut machine = machine();
        let ticket = fetch_ticket(&machine.initialize(slug("two-sum")));

        let effects = machine.on_fetch_result(ticket, pending("two-sum"));

        assert_eq!(machine.state(), &ReadinessState::Generating);
        assert!(effects.iter().any(|effect| matches!(
            effect,
            Effect::ArmTimer { token, delay } if token.kind() == TimerKind::Poll && *delay == DEFAULT_POLL_INTERVAL
        )));
        timer_token(&effects, TimerKind::StatusRotation);
        assert!(machine.status_message().is_some());
    }

    #[test]
    fn generating_never_exposes_partial_content() {
        let mut machine = machine();
        let ticket = fetch_ticket(&machine.initialize(slug("two-sum")));
        machine.on_fetch_result(ticket, pending("two-sum"));

        let snapshot = machine.snapshot();
        assert!(snapshot.article.expect("metadata").content.is_none());
        assert!(machine.ready_article().is_none());
    }

    #[test]
    fn poll_timer_refetches_network_only_until_ready() {
        let mut machine = machine();
        let ticket = fetch_ticket(&machine.initialize(slug("two-sum")));
        let effects = machine.on_fetch_result(ticket, pending("two-sum"));

        let effects = machine.on_timer(timer_token(&effects, TimerKind::Poll));
        assert!(matches!(
            &effects[..],
            [Effect::Fetch { policy: FetchPolicy::NetworkOnly, .. }]
        ));
        assert_eq!(machine.state(), &ReadinessState::Generating);

        let ticket = fetch_ticket(&effects);
        let effects = machine.on_fetch_result(ticket, pending("two-sum"));
        assert_eq!(machine.state(), &ReadinessState::Generating);
        let poll = timer_token(&effects, TimerKind::Poll);
        assert!(
            !effects.iter().any(|effect| matches!(
                effect,
                Effect::ArmTimer { token, .. } if token.kind() == TimerKind::StatusRotation
            )),
            "status rotation keeps its own cadence"
        );

        let ticket = fetch_ticket(&machine.on_timer(poll));
        let effects = machine.on_fetch_result(ticket, ready("two-sum"));
        assert_eq!(effects, vec![Effect::CancelTimers]);
        assert_eq!(machine.state(), &ReadinessState::Ready);
    }

    #[test]
    fn late_result_for_previous_slug_is_discarded() {
        let mut machine = machine();
        let old_ticket = fetch_ticket(&machine.initialize(slug("old-article")));
        machine.identifier_changed(slug("new-article"));

        let effects = machine.on_fetch_result(old_ticket, ready("old-article"));

        assert!(effects.is_empty());
        assert_eq!(machine.state(), &ReadinessState::Loading);
        assert_eq!(machine.slug().map(ArticleSlug::as_str), Some("new-article"));
        assert!(machine.snapshot().article.is_none());
    }

    #[test]
    fn timers_from_previous_slug_are_ignored() {
        let mut machine = machine();
        let ticket = fetch_ticket(&machine.initialize(slug("old-article")));
        let effects = machine.on_fetch_result(ticket, pending("old-article"));
        let poll = timer_token(&effects, TimerKind::Poll);
        let status = timer_token(&effects, TimerKind::StatusRotation);

        let effects = machine.identifier_changed(slug("new-article"));
        assert_eq!(effects[0], Effect::CancelTimers);

        assert!(machine.on_timer(poll).is_empty());
        assert!(machine.on_timer(status).is_empty());
    }

    #[test]
    fn same_identifier_is_not_reinitialized() {
        let mut machine = machine();
        machine.initialize(slug("two-sum"));
        assert!(machine.identifier_changed(slug("two-sum")).is_empty());
    }

    #[test]
    fn redelivered_result_is_not_applied_twice() {
        let mut machine = machine();
        let first = fetch_ticket(&machine.initialize(slug("two-sum")));
        let effects = machine.on_fetch_result(first, pending("two-sum"));
        let second = fetch_ticket(&machine.on_timer(timer_token(&effects, TimerKind::Poll)));
        machine.on_fetch_result(second, pending("two-sum"));

        assert!(machine.on_fetch_result(first, ready("two-sum")).is_empty());
        assert_eq!(machine.state(), &ReadinessState::Generating);
    }

    #[test]
    fn not_found_and_transport_errors_are_terminal() {
        let mut machine = machine();
        let ticket = fetch_ticket(&machine.initialize(slug("missing")));
        assert_eq!(
            machine.on_fetch_result(ticket, FetchOutcome::NotFound),
            vec![Effect::CancelTimers]
        );
        assert_eq!(
            machine.state(),
            &ReadinessState::Failed(FailureReason::NotFound)
        );
        assert_eq!(FailureReason::NotFound.to_string(), "not found");

        let ticket = fetch_ticket(&machine.initialize(slug("broken")));
        let effects = machine.on_fetch_result(ticket, pending("broken"));
        let poll = timer_token(&effects, TimerKind::Poll);
        let ticket = fetch_ticket(&machine.on_timer(poll));
        machine.on_fetch_result(
            ticket,
            FetchOutcome::Transport("502 Bad Gateway".to_string()),
        );

        match machine.state() {
            ReadinessState::Failed(reason) => assert_eq!(reason.to_string(), "502 Bad Gateway"),
            other => panic!("unexpected state {other:?}"),
        }
        assert!(machine.on_timer(poll).is_empty());
    }

    #[test]
    fn retry_only_applies_after_failure() {
        let mut machine = machine();
        let ticket = fetch_ticket(&machine.initialize(slug("two-sum")));
        assert!(machine.retry().is_empty());

        machine.on_fetch_result(ticket, FetchOutcome::Transport("timeout".into()));
        let effects = machine.retry();

        assert!(matches!(
            &effects[1],
            Effect::Fetch { policy: FetchPolicy::NetworkOnly, .. }
        ));
        assert_eq!(machine.state(), &ReadinessState::Loading);
        assert!(machine.on_fetch_result(ticket, ready("two-sum")).is_empty());
    }

    #[test]
    fn status_rotation_rearms_while_generating() {
        let mut machine = machine();
        let ticket = fetch_ticket(&machine.initialize(slug("two-sum")));
        let effects = machine.on_fetch_result(ticket, pending("two-sum"));
        let status = timer_token(&effects, TimerKind::StatusRotation);

        let effects = machine.on_timer(status);
        let next = timer_token(&effects, TimerKind::StatusRotation);
        assert_ne!(next, status);
        assert!(machine.status_message().is_some());

        assert!(machine.on_timer(status).is_empty(), "fired token is spent");
    }

    #[test]
    fn unmount_silences_everything() {
        let mut machine = machine();
        let ticket = fetch_ticket(&machine.initialize(slug("two-sum")));
        let effects = machine.on_fetch_result(ticket, pending("two-sum"));
        let poll = timer_token(&effects, TimerKind::Poll);

        assert_eq!(machine.unmount(), vec![Effect::CancelTimers]);
        assert!(machine.on_timer(poll).is_empty());
    }
}
