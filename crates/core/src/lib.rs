pub mod batch;
pub mod config;
pub mod error;
pub mod result;

pub use batch::FeatureMatrix;
pub use config::Config;
pub use error::*;
pub use result::EnsembleResult;
