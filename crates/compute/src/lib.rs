pub mod algorithms;
pub mod detectors;
pub mod engine;
pub mod ensemble;
pub mod guard;
pub mod metrics;
pub mod model_state;
pub mod pool;
pub mod preprocess;
pub mod stats;

pub use detectors::{Detector, DetectorKind, DetectorSet, DetectorSnapshot};
pub use engine::{DetectionEngine, DetectionOutcome, HealthStatus};
pub use ensemble::DetectorScores;
pub use guard::{ReliabilityGuard, ReliabilityState};
pub use metrics::{PerformanceSnapshot, PerformanceTracker, RingBuffer};
pub use model_state::{ModelState, ModelStateManager};
