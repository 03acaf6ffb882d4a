//! Processing pipeline components.

mod driver;
mod processor;

pub use driver::{BatchDriver, ensure_output_writable};
pub use processor::{
    PhotoAnalysis, PhotoFailure, PhotoOutcome, PhotoStage, RunConfig, analyze_photo,
    process_photo,
};
