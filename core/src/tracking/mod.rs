pub mod conical;
pub mod kalman;
pub mod lobing;
pub mod monopulse;

use std::fmt;

pub use conical::ConicalScanTracker;
pub use kalman::AngleKalman;
pub use lobing::SequentialLobingTracker;
pub use monopulse::MonopulseTracker;

use crate::prelude::{RadarResult, RadarTask, StageReport};
use crate::store::RadarStore;

/// The three interchangeable angle-measurement techniques.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerMethod {
    Monopulse,
    Sequential,
    Conical,
}

impl TrackerMethod {
    pub const ALL: [TrackerMethod; 3] = [
        TrackerMethod::Monopulse,
        TrackerMethod::Sequential,
        TrackerMethod::Conical,
    ];

    /// Result table owned by this method.
    pub fn table(&self) -> &'static str {
        match self {
            TrackerMethod::Monopulse => "TrackingResults_Monopulse",
            TrackerMethod::Sequential => "TrackingResults_Sequential",
            TrackerMethod::Conical => "TrackingResults_Conical",
        }
    }

    /// Run the tracker for this method against the store.
    pub fn run(&self, store: &mut RadarStore) -> RadarResult<StageReport> {
        match self {
            TrackerMethod::Monopulse => MonopulseTracker::new().run(store),
            TrackerMethod::Sequential => SequentialLobingTracker::new().run(store),
            TrackerMethod::Conical => ConicalScanTracker::new().run(store),
        }
    }
}

impl fmt::Display for TrackerMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TrackerMethod::Monopulse => "monopulse",
            TrackerMethod::Sequential => "sequential",
            TrackerMethod::Conical => "conical",
        };
        f.write_str(name)
    }
}
