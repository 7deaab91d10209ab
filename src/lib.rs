pub mod acquisition;
pub mod args;
pub mod chirp;
pub mod complex;
pub mod config;
pub mod error;
pub mod fft;
pub mod frontend;
pub mod mixer;
pub mod monitoring;
pub mod pipeline;
pub mod spectrum;
pub mod telemetry;

pub use chirp::ReferenceChirp;
pub use complex::ComplexSample;
pub use config::RadarConfig;
pub use error::{RadarError, RadarResult};
pub use spectrum::RangeEstimate;
