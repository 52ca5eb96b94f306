// AOA signal conditioning, zone classification, and pulse scheduling.

pub mod classifier;
pub mod engine;
pub mod error;
pub mod filter;
pub mod output;
pub mod player;
pub mod scheduler;
pub mod state;

pub use engine::{AudioEngine, TickReport};
pub use error::AudioError;
pub use player::TonePlayer;
