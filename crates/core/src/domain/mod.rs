//! Domain entities and business rules

pub mod config;
pub mod ignore;
pub mod output;
pub mod override_list;
pub mod player;
pub mod resolver;
pub mod voice_override;

// Re-export specific items to avoid ambiguous glob imports
pub use config::{ConfigError, OverrideConfig, ResolverConfig, SceneConfig};
pub use ignore::IgnoreRegistry;
pub use output::{AudioOutput, TickSummary, VoiceDecision};
pub use override_list::{
    consolidate, copy_high_priority_overrides, get_insert_index, remove_from_slots, OverrideError,
    OverrideList, Slot,
};
pub use player::{PlayerId, PlayerList};
pub use resolver::{
    other_player_with_override_can_be_heard, ListenerContext, OverrideEvent, VoiceResolver,
};
pub use voice_override::{
    OverrideEntry, OverrideId, VoiceOverride, VoiceParameters, NO_PRIVACY_CHANNEL,
};
