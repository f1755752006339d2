pub mod controller;
pub mod waveform;

pub use controller::{Adaptation, CognitiveController, ControllerState};
