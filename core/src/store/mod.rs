pub mod db;
pub mod records;

pub use db::RadarStore;
pub use records::{AdaptiveState, DetectionRow, EchoRow, TargetRow, TrackingRow};
