// Core moderation module - mutes, violations, admins, link tokens and the
// service facade that ties them to the filter pipeline.

pub mod moderation_models;
pub mod moderation_service;
pub mod moderation_store;
pub mod stat_recorder;
pub mod violation_tracker;

pub use moderation_models::*;
pub use moderation_service::*;
pub use moderation_store::*;
pub use stat_recorder::StatRecorder;
pub use violation_tracker::{
    ViolationTracker, ESCALATION_MUTE_DURATION, VIOLATIONS_BEFORE_MUTE, VIOLATION_WINDOW,
};
