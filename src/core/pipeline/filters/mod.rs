// The five content filters and the standard chain they form.

pub mod attachment_filter;
pub mod link_filter;
pub mod mute_filter;
pub mod rate_limit_filter;
pub mod word_filter;

pub use attachment_filter::AttachmentFilter;
pub use link_filter::LinkFilter;
pub use mute_filter::MuteFilter;
pub use rate_limit_filter::RateLimitFilter;
pub use word_filter::WordFilter;

use super::pipeline_manager::{Filter, PipelineManager};
use crate::core::moderation::{MuteStore, StatRecorder};
use crate::core::settings::SettingsRepository;
use std::sync::Arc;

/// Build the production chain: RateLimit -> Mute -> Link -> Word -> Attachment.
///
/// Memory-only checks run before the ones that read settings or storage.
pub fn standard_pipeline(
    rate_limit: Arc<RateLimitFilter>,
    settings: Arc<SettingsRepository>,
    mutes: Arc<dyn MuteStore>,
    stats: StatRecorder,
) -> PipelineManager {
    let filters: Vec<Arc<dyn Filter>> = vec![
        rate_limit,
        Arc::new(MuteFilter::new(Arc::clone(&settings), mutes)),
        Arc::new(LinkFilter::new(Arc::clone(&settings), stats.clone())),
        Arc::new(WordFilter::new(Arc::clone(&settings), stats.clone())),
        Arc::new(AttachmentFilter::new(settings, stats)),
    ];
    PipelineManager::new(filters)
}
