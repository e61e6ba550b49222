// Moderation pipeline - payload, filter contract, the ordered manager and the
// five content filters.

pub mod filters;
pub mod pipeline_manager;
pub mod pipeline_models;

pub use pipeline_manager::{Filter, FilterError, PipelineError, PipelineManager};
pub use pipeline_models::*;
