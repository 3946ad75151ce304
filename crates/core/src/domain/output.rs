//! Resolution results and the audio output seam
//!
//! The resolver only decides which parameter set governs a speaker. Applying
//! it (gain, falloff, reverb) is left to an [`AudioOutput`] implementation
//! backed by the actual audio engine.

use crate::domain::player::PlayerId;
use crate::domain::voice_override::{OverrideId, VoiceParameters};
use serde::{Deserialize, Serialize};

/// Outcome of resolving one (listener, speaker) pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VoiceDecision {
    /// The speaker cannot be heard
    Muted,
    /// The speaker is heard with the default parameters
    Default,
    /// The speaker is heard with the parameters of this override
    Override(OverrideId),
}

impl VoiceDecision {
    pub fn is_audible(&self) -> bool {
        !matches!(self, VoiceDecision::Muted)
    }

    pub fn source_override(&self) -> Option<OverrideId> {
        match self {
            VoiceDecision::Override(id) => Some(*id),
            _ => None,
        }
    }
}

/// Receiver of per-speaker decisions
pub trait AudioOutput {
    /// Apply a parameter set to the speaker's voice for this listener.
    ///
    /// `decision` is [`VoiceDecision::Default`] or the winning override.
    fn apply_parameters(
        &mut self,
        listener: PlayerId,
        speaker: PlayerId,
        decision: VoiceDecision,
        parameters: &VoiceParameters,
    );

    /// Silence the speaker for this listener
    fn mute(&mut self, listener: PlayerId, speaker: PlayerId);
}

/// Counts of decisions emitted during one update tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickSummary {
    pub overridden: usize,
    pub defaulted: usize,
    pub muted: usize,
}

impl TickSummary {
    pub fn record(&mut self, decision: VoiceDecision) {
        match decision {
            VoiceDecision::Muted => self.muted += 1,
            VoiceDecision::Default => self.defaulted += 1,
            VoiceDecision::Override(_) => self.overridden += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.overridden + self.defaulted + self.muted
    }
}
