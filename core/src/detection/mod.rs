pub mod cfar;

pub use cfar::{CfarDetector, ThresholdPolicy, DEFAULT_THRESHOLD_DB, FALLBACK_TOP_K};
