pub mod echo;
pub mod scene;

pub use echo::EchoSynthesizer;
pub use scene::{SceneConfig, SceneGenerator};
