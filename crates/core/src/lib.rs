//! Earshot core: voice override priority resolution
//!
//! Competing voice overrides (private rooms, megaphones, proximity zones)
//! claim players. For every speaker the [`VoiceResolver`] picks the highest
//! priority override, applies the listener's privacy rules and hands the
//! resulting decision to an [`AudioOutput`].

pub mod domain;

pub use domain::{
    AudioOutput, ConfigError, OverrideError, OverrideEvent, OverrideId, OverrideList, PlayerId,
    SceneConfig, TickSummary, VoiceDecision, VoiceOverride, VoiceParameters, VoiceResolver,
};
