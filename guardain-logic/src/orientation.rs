//! Device orientation adapter.
//!
//! Hosts deliver orientation data in one of two incompatible shapes: a standards based
//! absolute orientation triplet or a vendor specific, pre-computed compass heading. A session
//! attaches to every source the platform offers, lets the first source that produces a valid
//! sample win, detaches the other and from then on forwards one normalized [Heading] per event.

use std::{
    fmt,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use log::{debug, info, trace, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

use crate::bearing::normalize_degrees;

/// Platform events are queued here until the session task consumes them
const EVENT_QUEUE_SIZE: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
/// The direction the device is facing, degrees clockwise from north in `[0, 360)`
pub struct Heading(f64);

#[derive(Debug, Clone, Copy, PartialEq, Error)]
#[error("Heading must be a finite number of degrees, got {0}")]
pub struct InvalidHeading(pub f64);

impl Heading {
    /// Normalize a raw heading, non-finite values are rejected
    pub fn from_degrees(degrees: f64) -> Option<Self> {
        degrees
            .is_finite()
            .then(|| Self(normalize_degrees(degrees)))
    }

    pub fn degrees(self) -> f64 {
        self.0
    }
}

impl TryFrom<f64> for Heading {
    type Error = InvalidHeading;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::from_degrees(value).ok_or(InvalidHeading(value))
    }
}

impl From<Heading> for f64 {
    fn from(value: Heading) -> Self {
        value.0
    }
}

/// Heading from an absolute orientation triplet.
///
/// This is a heuristic tilt correction, `-(alpha + beta * gamma / 90)`, not a physically exact
/// compensation. Its accuracy on strongly tilted devices is unverified.
pub fn absolute_heading(alpha: f64, beta: f64, gamma: f64) -> Option<Heading> {
    Heading::from_degrees(-(alpha + beta * gamma / 90.0))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceKind {
    /// Standard absolute device orientation (alpha, beta, gamma)
    AbsoluteOrientation,
    /// Vendor specific compass heading delivered as a single scalar
    VendorCompassHeading,
}

impl SourceKind {
    pub const ALL: [Self; 2] = [Self::AbsoluteOrientation, Self::VendorCompassHeading];
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
/// A raw orientation event as delivered by the platform
pub enum OrientationEvent {
    Absolute {
        alpha: Option<f64>,
        beta: Option<f64>,
        gamma: Option<f64>,
        /// Whether the platform claims the angles are relative to the earth frame
        #[serde(default)]
        absolute: bool,
    },
    VendorCompass { heading: Option<f64> },
}

impl OrientationEvent {
    pub fn source(&self) -> SourceKind {
        match self {
            Self::Absolute { .. } => SourceKind::AbsoluteOrientation,
            Self::VendorCompass { .. } => SourceKind::VendorCompassHeading,
        }
    }

    /// The normalized heading this event carries, or `None` if the sample must be dropped
    pub fn heading(&self) -> Option<Heading> {
        match *self {
            Self::Absolute {
                alpha: Some(alpha),
                beta: Some(beta),
                gamma: Some(gamma),
                absolute: true,
            } => absolute_heading(alpha, beta, gamma),
            Self::Absolute { .. } => None,
            Self::VendorCompass { heading } => heading.and_then(Heading::from_degrees),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    Unsubscribed,
    /// Listeners are attached (or permission is pending), no valid sample yet
    Subscribing,
    Active(SourceKind),
    /// No source is available or permission was denied
    Unsupported,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Arbitration {
    /// First valid sample of the session, the given source now owns it
    Won(SourceKind, Heading),
    /// Another sample from the established source
    Sample(Heading),
    /// Malformed sample or one from the losing source
    Dropped,
}

#[derive(Debug, Default, Clone)]
/// Decides which source a session listens to, first valid sample wins
pub struct SourceArbiter {
    winner: Option<SourceKind>,
}

impl SourceArbiter {
    pub fn winner(&self) -> Option<SourceKind> {
        self.winner
    }

    pub fn offer(&mut self, event: &OrientationEvent) -> Arbitration {
        let source = event.source();
        match (self.winner, event.heading()) {
            (_, None) => Arbitration::Dropped,
            (Some(winner), Some(_)) if winner != source => Arbitration::Dropped,
            (Some(_), Some(heading)) => Arbitration::Sample(heading),
            (None, Some(heading)) => {
                self.winner = Some(source);
                Arbitration::Won(source, heading)
            }
        }
    }

    pub fn reset(&mut self) {
        self.winner = None;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
/// Identifies a single listener registration on a platform
pub struct ListenerId(pub u64);

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener#{}", self.0)
    }
}

pub type EventSender = mpsc::Sender<OrientationEvent>;

/// The host's orientation event bus
pub trait OrientationPlatform: Send + Sync + 'static {
    /// Whether listeners may only be attached after an explicit grant
    fn permission_required(&self) -> bool {
        false
    }
    /// Ask the user for orientation access, resolves to whether it was granted
    fn request_permission(&self) -> impl Future<Output = bool> + Send {
        async { true }
    }
    /// Whether the platform can deliver events of this kind at all
    fn supports(&self, source: SourceKind) -> bool;
    /// Start delivering events of `source` into `events`
    fn attach(&self, source: SourceKind, events: EventSender) -> anyhow::Result<ListenerId>;
    /// Stop delivering events to the given listener
    fn detach(&self, listener: ListenerId);
}

/// Receives normalized headings, called once per accepted sensor event
pub trait HeadingSink: Send + Sync + 'static {
    fn send_heading(&self, heading: Heading);
}

impl HeadingSink for watch::Sender<Option<Heading>> {
    fn send_heading(&self, heading: Heading) {
        self.send_replace(Some(heading));
    }
}

impl HeadingSink for mpsc::UnboundedSender<Heading> {
    fn send_heading(&self, heading: Heading) {
        self.send(heading).ok();
    }
}

struct SessionInner {
    state: SessionState,
    arbiter: SourceArbiter,
    listeners: Vec<(SourceKind, ListenerId)>,
    cancel: Option<CancellationToken>,
}

/// One subscription to the platform's orientation events. Sessions share nothing, several can
/// run against the same platform at once.
pub struct OrientationSession<P: OrientationPlatform, S: HeadingSink> {
    platform: Arc<P>,
    sink: S,
    inner: Mutex<SessionInner>,
}

impl<P: OrientationPlatform, S: HeadingSink> OrientationSession<P, S> {
    pub fn new(platform: Arc<P>, sink: S) -> Arc<Self> {
        Arc::new(Self {
            platform,
            sink,
            inner: Mutex::new(SessionInner {
                state: SessionState::Unsubscribed,
                arbiter: SourceArbiter::default(),
                listeners: Vec::with_capacity(SourceKind::ALL.len()),
                cancel: None,
            }),
        })
    }

    /// Create a session and subscribe it, the returned guard cleans up when dropped
    pub async fn start(platform: Arc<P>, sink: S) -> SessionGuard<P, S> {
        let session = Self::new(platform, sink);
        session.subscribe().await;
        SessionGuard(session)
    }

    fn lock(&self) -> MutexGuard<'_, SessionInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self) -> SessionState {
        self.lock().state
    }

    /// Sources that currently have a listener attached
    pub fn attached_sources(&self) -> Vec<SourceKind> {
        self.lock().listeners.iter().map(|(kind, _)| *kind).collect()
    }

    /// Attach listeners to every available source. Does nothing if the session is already
    /// subscribed. Returns the state the session ends up in.
    pub async fn subscribe(self: &Arc<Self>) -> SessionState {
        let cancel = {
            let mut inner = self.lock();
            if inner.state != SessionState::Unsubscribed {
                return inner.state;
            }
            let token = CancellationToken::new();
            inner.state = SessionState::Subscribing;
            inner.cancel = Some(token.clone());
            token
        };

        if self.platform.permission_required() {
            debug!("Requesting orientation permission");
            let granted = self.platform.request_permission().await;
            if cancel.is_cancelled() {
                debug!("Session cleaned up while waiting for permission");
                return self.state();
            }
            if !granted {
                info!("Orientation permission denied");
                return self.mark_unsupported();
            }
        }

        let (tx, rx) = mpsc::channel(EVENT_QUEUE_SIZE);

        let mut inner = self.lock();
        if cancel.is_cancelled() {
            return inner.state;
        }

        for source in SourceKind::ALL {
            if !self.platform.supports(source) {
                continue;
            }
            match self.platform.attach(source, tx.clone()) {
                Ok(id) => {
                    debug!("Attached {id} for {source:?}");
                    inner.listeners.push((source, id));
                }
                Err(why) => warn!("Failed to attach to {source:?}: {why:?}"),
            }
        }

        if inner.listeners.is_empty() {
            info!("No orientation source available");
            inner.state = SessionState::Unsupported;
            inner.cancel = None;
            return inner.state;
        }

        tokio::spawn({
            let session = self.clone();
            async move {
                session.main_loop(rx, cancel).await;
            }
        });

        inner.state
    }

    fn mark_unsupported(&self) -> SessionState {
        let mut inner = self.lock();
        inner.state = SessionState::Unsupported;
        inner.cancel = None;
        inner.state
    }

    async fn main_loop(&self, mut rx: mpsc::Receiver<OrientationEvent>, cancel: CancellationToken) {
        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => break,

                event = rx.recv() => {
                    match event {
                        Some(event) => self.handle_event(event),
                        None => break,
                    }
                }
            }
        }
        trace!("Orientation session loop exited");
    }

    /// Run a single platform event through the arbiter and forward the result
    pub fn handle_event(&self, event: OrientationEvent) {
        let heading = {
            let mut inner = self.lock();
            if !matches!(
                inner.state,
                SessionState::Subscribing | SessionState::Active(_)
            ) {
                return;
            }
            match inner.arbiter.offer(&event) {
                Arbitration::Won(source, heading) => {
                    info!("Using {source:?} for orientation");
                    inner.state = SessionState::Active(source);
                    let (keep, losers) = inner
                        .listeners
                        .drain(..)
                        .partition::<Vec<_>, _>(|(kind, _)| *kind == source);
                    for (kind, id) in losers {
                        debug!("Detaching {id} ({kind:?}), lost to {source:?}");
                        self.platform.detach(id);
                    }
                    inner.listeners = keep;
                    heading
                }
                Arbitration::Sample(heading) => heading,
                Arbitration::Dropped => {
                    trace!("Dropped orientation sample {event:?}");
                    return;
                }
            }
        };

        self.sink.send_heading(heading);
    }

    /// Detach all listeners and return to [SessionState::Unsubscribed]. Safe to call any number
    /// of times.
    pub fn cleanup(&self) {
        let mut inner = self.lock();
        if let Some(cancel) = inner.cancel.take() {
            cancel.cancel();
        }
        for (kind, id) in inner.listeners.drain(..) {
            debug!("Detaching {id} ({kind:?}) on cleanup");
            self.platform.detach(id);
        }
        inner.arbiter.reset();
        if inner.state != SessionState::Unsubscribed {
            debug!("Orientation session closed");
        }
        inner.state = SessionState::Unsubscribed;
    }
}

/// Cleanup handle for a running [OrientationSession], releases the subscription when dropped
pub struct SessionGuard<P: OrientationPlatform, S: HeadingSink>(Arc<OrientationSession<P, S>>);

impl<P: OrientationPlatform, S: HeadingSink> SessionGuard<P, S> {
    pub fn session(&self) -> &Arc<OrientationSession<P, S>> {
        &self.0
    }

    pub fn state(&self) -> SessionState {
        self.0.state()
    }

    pub fn cleanup(&self) {
        self.0.cleanup();
    }
}

impl<P: OrientationPlatform, S: HeadingSink> Drop for SessionGuard<P, S> {
    fn drop(&mut self) {
        self.0.cleanup();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::tests::MockPlatform;
    use tokio::{sync::mpsc::UnboundedReceiver, task::yield_now};

    fn absolute(alpha: f64, beta: f64, gamma: f64) -> OrientationEvent {
        OrientationEvent::Absolute {
            alpha: Some(alpha),
            beta: Some(beta),
            gamma: Some(gamma),
            absolute: true,
        }
    }

    fn vendor(heading: f64) -> OrientationEvent {
        OrientationEvent::VendorCompass {
            heading: Some(heading),
        }
    }

    fn mk_sink() -> (mpsc::UnboundedSender<Heading>, UnboundedReceiver<Heading>) {
        mpsc::unbounded_channel()
    }

    async fn settle() {
        for _ in 0..10 {
            yield_now().await;
        }
    }

    fn drain(rx: &mut UnboundedReceiver<Heading>) -> Vec<f64> {
        let mut out = Vec::new();
        while let Ok(h) = rx.try_recv() {
            out.push(h.degrees());
        }
        out
    }

    #[test]
    fn test_absolute_zero_is_north() {
        let heading = absolute(0.0, 0.0, 0.0).heading().expect("Dropped");
        assert_eq!(heading.degrees(), 0.0);
    }

    #[test]
    fn test_absolute_negative_wraps() {
        // -(90 + 0) = -90 => 270
        let heading = absolute(90.0, 0.0, 0.0).heading().expect("Dropped");
        assert!((heading.degrees() - 270.0).abs() < 1e-9);

        // -(10 + 45 * 30 / 90) = -25 => 335
        let heading = absolute(10.0, 45.0, 30.0).heading().expect("Dropped");
        assert!((heading.degrees() - 335.0).abs() < 1e-9);
    }

    #[test]
    fn test_absolute_requires_flag_and_components() {
        let not_absolute = OrientationEvent::Absolute {
            alpha: Some(10.0),
            beta: Some(0.0),
            gamma: Some(0.0),
            absolute: false,
        };
        assert!(not_absolute.heading().is_none());

        let missing = OrientationEvent::Absolute {
            alpha: Some(10.0),
            beta: None,
            gamma: Some(0.0),
            absolute: true,
        };
        assert!(missing.heading().is_none());
    }

    #[test]
    fn test_vendor_heading_validation() {
        assert_eq!(vendor(123.5).heading().map(Heading::degrees), Some(123.5));
        assert_eq!(vendor(370.0).heading().map(Heading::degrees), Some(10.0));
        assert!(vendor(f64::NAN).heading().is_none());
        assert!(vendor(f64::INFINITY).heading().is_none());
        assert!(
            OrientationEvent::VendorCompass { heading: None }
                .heading()
                .is_none()
        );
    }

    #[test]
    fn test_heading_json_is_normalized() {
        let heading = serde_json::from_str::<Heading>("720.5").expect("Failed to parse");
        assert_eq!(heading.degrees(), 0.5);
        assert_eq!(serde_json::to_string(&heading).expect("Failed to serialize"), "0.5");

        assert!(serde_json::from_str::<Heading>("-90").is_ok_and(|h| h.degrees() == 270.0));
        assert!(Heading::try_from(f64::NAN).is_err());
        assert!(Heading::try_from(f64::NEG_INFINITY).is_err());
    }

    #[test]
    fn test_event_json_shapes() {
        let ev: OrientationEvent = serde_json::from_str(
            r#"{"type":"absolute","alpha":12.0,"beta":null,"gamma":3.0,"absolute":true}"#,
        )
        .expect("Failed to parse");
        assert_eq!(ev.source(), SourceKind::AbsoluteOrientation);
        assert!(ev.heading().is_none());

        let ev: OrientationEvent =
            serde_json::from_str(r#"{"type":"vendor_compass","heading":42.0}"#)
                .expect("Failed to parse");
        assert_eq!(ev.source(), SourceKind::VendorCompassHeading);
        assert_eq!(ev.heading().map(Heading::degrees), Some(42.0));
    }

    #[test]
    fn test_arbiter_first_valid_wins() {
        let mut arbiter = SourceArbiter::default();

        // Invalid samples don't pick a winner
        let invalid = OrientationEvent::VendorCompass { heading: None };
        assert_eq!(arbiter.offer(&invalid), Arbitration::Dropped);
        assert_eq!(arbiter.winner(), None);

        let won = arbiter.offer(&absolute(0.0, 0.0, 0.0));
        assert!(matches!(
            won,
            Arbitration::Won(SourceKind::AbsoluteOrientation, _)
        ));

        // Late events from the loser are ignored
        assert_eq!(arbiter.offer(&vendor(90.0)), Arbitration::Dropped);
        assert!(matches!(
            arbiter.offer(&absolute(350.0, 0.0, 0.0)),
            Arbitration::Sample(_)
        ));

        arbiter.reset();
        assert!(matches!(
            arbiter.offer(&vendor(90.0)),
            Arbitration::Won(SourceKind::VendorCompassHeading, _)
        ));
    }

    #[tokio::test]
    async fn test_subscribe_attaches_all_sources() {
        let platform = Arc::new(MockPlatform::new());
        let (tx, _rx) = mk_sink();
        let guard = OrientationSession::start(platform.clone(), tx).await;

        assert_eq!(guard.state(), SessionState::Subscribing);
        assert_eq!(platform.listener_count(), 2);
        assert_eq!(guard.session().attached_sources(), SourceKind::ALL.to_vec());
    }

    #[tokio::test]
    async fn test_loser_detached_after_first_sample() {
        let platform = Arc::new(MockPlatform::new());
        let (tx, mut rx) = mk_sink();
        let guard = OrientationSession::start(platform.clone(), tx).await;

        platform.emit(vendor(45.0)).await;
        settle().await;

        assert_eq!(
            guard.state(),
            SessionState::Active(SourceKind::VendorCompassHeading)
        );
        assert_eq!(
            platform.attached_sources(),
            vec![SourceKind::VendorCompassHeading]
        );

        // The absolute listener is gone, so this never reaches the session
        let delivered = platform.emit(absolute(10.0, 0.0, 0.0)).await;
        assert_eq!(delivered, 0);
        platform.emit(vendor(50.0)).await;
        settle().await;

        assert_eq!(drain(&mut rx), vec![45.0, 50.0]);
    }

    #[tokio::test]
    async fn test_invalid_samples_dropped_silently() {
        let platform = Arc::new(MockPlatform::new());
        let (tx, mut rx) = mk_sink();
        let guard = OrientationSession::start(platform.clone(), tx).await;

        platform
            .emit(OrientationEvent::Absolute {
                alpha: None,
                beta: Some(1.0),
                gamma: Some(1.0),
                absolute: true,
            })
            .await;
        platform
            .emit(OrientationEvent::VendorCompass {
                heading: Some(f64::NAN),
            })
            .await;
        settle().await;

        assert!(drain(&mut rx).is_empty());
        assert_eq!(guard.state(), SessionState::Subscribing);
        assert_eq!(platform.listener_count(), 2);
    }

    #[tokio::test]
    async fn test_one_callback_per_event() {
        let platform = Arc::new(MockPlatform::new());
        let (tx, mut rx) = mk_sink();
        let _guard = OrientationSession::start(platform.clone(), tx).await;

        for alpha in [0.0, 10.0, 20.0, 30.0] {
            platform.emit(absolute(alpha, 0.0, 0.0)).await;
        }
        settle().await;

        assert_eq!(drain(&mut rx), vec![0.0, 350.0, 340.0, 330.0]);
    }

    #[tokio::test]
    async fn test_cleanup_is_idempotent() {
        let platform = Arc::new(MockPlatform::new());
        let (tx, mut rx) = mk_sink();
        let guard = OrientationSession::start(platform.clone(), tx).await;

        platform.emit(vendor(10.0)).await;
        settle().await;

        guard.cleanup();
        guard.cleanup();

        assert_eq!(guard.state(), SessionState::Unsubscribed);
        assert_eq!(platform.listener_count(), 0);

        assert_eq!(platform.emit(vendor(20.0)).await, 0);
        settle().await;
        assert_eq!(drain(&mut rx), vec![10.0]);

        drop(guard);
        assert_eq!(platform.listener_count(), 0);
    }

    #[tokio::test]
    async fn test_drop_releases_listeners() {
        let platform = Arc::new(MockPlatform::new());
        for _ in 0..3 {
            let (tx, _rx) = mk_sink();
            let guard = OrientationSession::start(platform.clone(), tx).await;
            assert_eq!(platform.listener_count(), 2);
            drop(guard);
            assert_eq!(platform.listener_count(), 0);
        }
    }

    #[tokio::test]
    async fn test_permission_denied_is_unsupported() {
        let platform = Arc::new(MockPlatform::requiring_permission(false));
        let (tx, _rx) = mk_sink();
        let guard = OrientationSession::start(platform.clone(), tx).await;

        assert_eq!(guard.state(), SessionState::Unsupported);
        assert_eq!(platform.listener_count(), 0);
        assert_eq!(platform.permission_requests(), 1);

        guard.cleanup();
        assert_eq!(guard.state(), SessionState::Unsubscribed);
    }

    #[tokio::test]
    async fn test_permission_granted_attaches() {
        let platform = Arc::new(MockPlatform::requiring_permission(true));
        let (tx, _rx) = mk_sink();
        let guard = OrientationSession::start(platform.clone(), tx).await;

        assert_eq!(guard.state(), SessionState::Subscribing);
        assert_eq!(platform.permission_requests(), 1);
        assert_eq!(platform.listener_count(), 2);
    }

    #[tokio::test]
    async fn test_no_sources_is_unsupported() {
        let platform = Arc::new(MockPlatform::with_sources(&[]));
        let (tx, _rx) = mk_sink();
        let guard = OrientationSession::start(platform.clone(), tx).await;
        assert_eq!(guard.state(), SessionState::Unsupported);
    }

    #[tokio::test]
    async fn test_single_source_platform() {
        let platform = Arc::new(MockPlatform::with_sources(&[SourceKind::AbsoluteOrientation]));
        let (tx, mut rx) = mk_sink();
        let guard = OrientationSession::start(platform.clone(), tx).await;

        assert_eq!(
            guard.session().attached_sources(),
            vec![SourceKind::AbsoluteOrientation]
        );
        platform.emit(absolute(0.0, 0.0, 0.0)).await;
        settle().await;
        assert_eq!(
            guard.state(),
            SessionState::Active(SourceKind::AbsoluteOrientation)
        );
        assert_eq!(drain(&mut rx), vec![0.0]);
    }

    #[tokio::test]
    async fn test_subscribe_twice_keeps_one_subscription() {
        let platform = Arc::new(MockPlatform::new());
        let (tx, _rx) = mk_sink();
        let guard = OrientationSession::start(platform.clone(), tx).await;

        let state = guard.session().subscribe().await;
        assert_eq!(state, SessionState::Subscribing);
        assert_eq!(platform.listener_count(), 2);
    }

    #[tokio::test]
    async fn test_resubscribe_after_cleanup() {
        let platform = Arc::new(MockPlatform::new());
        let (tx, mut rx) = mk_sink();
        let guard = OrientationSession::start(platform.clone(), tx).await;

        platform.emit(vendor(10.0)).await;
        settle().await;
        guard.cleanup();

        assert_eq!(guard.session().subscribe().await, SessionState::Subscribing);
        platform.emit(absolute(0.0, 0.0, 0.0)).await;
        settle().await;

        assert_eq!(
            guard.state(),
            SessionState::Active(SourceKind::AbsoluteOrientation)
        );
        assert_eq!(drain(&mut rx), vec![10.0, 0.0]);
    }

    #[tokio::test]
    async fn test_sessions_are_independent() {
        let platform = Arc::new(MockPlatform::new());
        let (tx1, mut rx1) = mk_sink();
        let (tx2, mut rx2) = mk_sink();
        let first = OrientationSession::start(platform.clone(), tx1).await;
        let second = OrientationSession::start(platform.clone(), tx2).await;
        assert_eq!(platform.listener_count(), 4);

        platform.emit(vendor(90.0)).await;
        settle().await;
        assert_eq!(platform.listener_count(), 2);

        drop(first);
        assert_eq!(platform.listener_count(), 1);

        platform.emit(vendor(100.0)).await;
        settle().await;

        assert_eq!(drain(&mut rx1), vec![90.0]);
        assert_eq!(drain(&mut rx2), vec![90.0, 100.0]);
        assert_eq!(
            second.state(),
            SessionState::Active(SourceKind::VendorCompassHeading)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_event_leaves_session_waiting() {
        let platform = Arc::new(MockPlatform::new());
        let (tx, mut rx) = mk_sink();
        let guard = OrientationSession::start(platform.clone(), tx).await;

        tokio::time::sleep(Duration::from_secs(3600)).await;

        assert_eq!(guard.state(), SessionState::Subscribing);
        assert!(drain(&mut rx).is_empty());
    }
}
