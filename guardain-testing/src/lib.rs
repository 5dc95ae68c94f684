use std::{
    sync::{
        Mutex, PoisonError,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use guardain_logic::{
    EventSender, ListenerId, Location, LocationError, LocationService, OrientationEvent,
    OrientationPlatform, SourceKind, StateUpdateSender,
};
use log::{debug, trace};
use serde::{Deserialize, Serialize};

pub mod prelude {
    pub use anyhow::{Context, anyhow, bail};
    pub type Result<T = (), E = anyhow::Error> = std::result::Result<T, E>;
}

pub use prelude::*;

#[derive(Debug, Clone, Serialize, Deserialize)]
/// One line of a compass script: wait, then deliver an event
pub struct ScriptStep {
    #[serde(default)]
    pub delay_ms: u64,
    pub event: OrientationEvent,
}

/// Parse a JSON lines script, blank lines and `#` comments are skipped
pub fn parse_script(raw: &str) -> Result<Vec<ScriptStep>> {
    raw.lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
        .map(|(n, line)| {
            serde_json::from_str::<ScriptStep>(line)
                .with_context(|| format!("Invalid script step on line {n}"))
        })
        .collect()
}

/// An event from `source` that decodes to roughly `heading`
pub fn event_for(source: SourceKind, heading: f64) -> OrientationEvent {
    match source {
        SourceKind::AbsoluteOrientation => OrientationEvent::Absolute {
            alpha: Some(360.0 - heading),
            beta: Some(0.0),
            gamma: Some(0.0),
            absolute: true,
        },
        SourceKind::VendorCompassHeading => OrientationEvent::VendorCompass {
            heading: Some(heading),
        },
    }
}

/// A device held roughly still, `count` samples scattered up to `spread` degrees either side
/// of `heading`
pub fn jitter_script(
    source: SourceKind,
    heading: f64,
    spread: f64,
    count: usize,
    delay_ms: u64,
) -> Vec<ScriptStep> {
    let spread = spread.abs();
    (0..count)
        .map(|_| ScriptStep {
            delay_ms,
            event: event_for(source, heading + rand::random_range(-spread..=spread)),
        })
        .collect()
}

/// Orientation platform that replays a prepared script, every source is available
pub struct ScriptPlatform {
    steps: Vec<ScriptStep>,
    next_id: AtomicU64,
    listeners: Mutex<Vec<(ListenerId, SourceKind, EventSender)>>,
}

impl ScriptPlatform {
    pub fn new(steps: Vec<ScriptStep>) -> Self {
        Self {
            steps,
            next_id: AtomicU64::new(0),
            listeners: Mutex::new(Vec::new()),
        }
    }

    fn senders_for(&self, source: SourceKind) -> Vec<EventSender> {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(_, kind, _)| *kind == source)
            .map(|(_, _, tx)| tx.clone())
            .collect()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Play the script through once, returns how many events reached a listener
    pub async fn play(&self) -> usize {
        let mut delivered = 0;
        for step in &self.steps {
            if step.delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(step.delay_ms)).await;
            }
            let senders = self.senders_for(step.event.source());
            if senders.is_empty() {
                trace!("Nobody listening for {:?}", step.event.source());
            }
            for tx in senders {
                if tx.send(step.event.clone()).await.is_ok() {
                    delivered += 1;
                }
            }
        }
        delivered
    }
}

impl OrientationPlatform for ScriptPlatform {
    fn supports(&self, _source: SourceKind) -> bool {
        true
    }

    fn attach(&self, source: SourceKind, events: EventSender) -> Result<ListenerId> {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        debug!("Script attaching {id} to {source:?}");
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, source, events));
        Ok(id)
    }

    fn detach(&self, listener: ListenerId) {
        debug!("Script detaching {listener}");
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|(id, _, _)| *id != listener);
    }
}

/// Location service that always reports the same spot
pub struct FixedLocation(pub Location);

impl LocationService for FixedLocation {
    async fn get_loc(&self) -> Result<Location, LocationError> {
        Ok(self.0)
    }
}

/// Logs dashboard state changes
pub struct LogUpdates;

impl StateUpdateSender for LogUpdates {
    fn send_update(&self) {
        debug!("Dashboard state changed");
    }
}
