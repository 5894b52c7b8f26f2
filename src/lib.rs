pub mod audio;
pub mod config;
pub mod detector;
pub mod error;
pub mod providers;
pub mod state;
pub mod view;

pub use config::{Config, DetectorConfig};
pub use detector::Detector;
pub use error::DetectorError;
pub use state::{AudioSelection, FormState, Prediction};
