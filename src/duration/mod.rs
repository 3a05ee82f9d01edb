pub mod estimator;
pub mod probe;

pub use estimator::{DurationEstimator, DurationTask};
pub use probe::{DurationProbe, FfprobeProbe, Mp4HeaderProbe};
