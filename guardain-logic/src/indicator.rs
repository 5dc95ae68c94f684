use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::{
    bearing::{Bearing, normalize_degrees},
    location::Location,
    orientation::{Heading, SessionState},
};

/// Rotation of the direction arrow: the raw bearing until a heading arrives, then
/// `bearing - heading`. The result is deliberately left unwrapped, it may be negative.
pub fn rotation(bearing: Bearing, heading: Option<Heading>) -> f64 {
    match heading {
        Some(heading) => bearing.degrees() - heading.degrees(),
        None => bearing.degrees(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IndicatorStatus {
    /// No heading sample yet, show the raw bearing and a waiting hint
    Waiting,
    Tracking,
    /// The device can't report its heading, the raw bearing is all there is
    Unsupported,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
/// Everything the view needs to draw the arrow
pub struct IndicatorView {
    pub bearing: f64,
    pub heading: Option<f64>,
    pub rotation: f64,
    pub status: IndicatorStatus,
}

#[derive(Debug, Clone)]
/// Points an arrow at a target given the device's heading
pub struct DirectionIndicator {
    bearing: Bearing,
    heading: Option<Heading>,
    unsupported: bool,
}

impl DirectionIndicator {
    pub fn new(bearing: Bearing) -> Self {
        Self {
            bearing,
            heading: None,
            unsupported: false,
        }
    }

    pub fn between(observer: &Location, target: &Location) -> Self {
        Self::new(observer.bearing_to(target))
    }

    pub fn bearing(&self) -> Bearing {
        self.bearing
    }

    pub fn heading(&self) -> Option<Heading> {
        self.heading
    }

    /// Recompute after either end of the bearing moved
    pub fn set_bearing(&mut self, bearing: Bearing) {
        self.bearing = bearing;
    }

    pub fn observe_heading(&mut self, heading: Heading) {
        self.heading = Some(heading);
    }

    pub fn observe_session(&mut self, state: SessionState) {
        self.unsupported = state == SessionState::Unsupported;
    }

    pub fn rotation(&self) -> f64 {
        rotation(self.bearing, self.heading)
    }

    /// [Self::rotation] wrapped into `[0, 360)`, for consumers that need it
    pub fn wrapped_rotation(&self) -> f64 {
        normalize_degrees(self.rotation())
    }

    pub fn status(&self) -> IndicatorStatus {
        match (self.heading, self.unsupported) {
            (Some(_), _) => IndicatorStatus::Tracking,
            (None, true) => IndicatorStatus::Unsupported,
            (None, false) => IndicatorStatus::Waiting,
        }
    }

    pub fn view(&self) -> IndicatorView {
        IndicatorView {
            bearing: self.bearing.degrees(),
            heading: self.heading.map(Heading::degrees),
            rotation: self.rotation(),
            status: self.status(),
        }
    }

    /// Re-render on every new heading until the sending side goes away. The current view is
    /// rendered once up front so nothing waits on the first sample.
    pub async fn follow(
        &mut self,
        mut headings: watch::Receiver<Option<Heading>>,
        mut render: impl FnMut(IndicatorView),
    ) {
        if let Some(heading) = *headings.borrow_and_update() {
            self.observe_heading(heading);
        }
        render(self.view());

        while headings.changed().await.is_ok() {
            if let Some(heading) = *headings.borrow_and_update() {
                self.observe_heading(heading);
                render(self.view());
            }
        }
    }
}
