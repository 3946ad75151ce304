//! Override records and the audio parameters they carry
//!
//! A [`VoiceOverride`] is one competing rule (private room, megaphone,
//! proximity zone...). The resolver owns the records and hands out
//! [`OverrideId`] handles; priority lists only ever store
//! [`OverrideEntry`] references, never copies of the record.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Privacy channel value meaning "not in any channel"
pub const NO_PRIVACY_CHANNEL: i32 = -1;

/// Handle of an override registered with the resolver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OverrideId(u32);

impl OverrideId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn get(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for OverrideId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "override#{}", self.0)
    }
}

/// Voice settings applied to a speaker when an override wins
///
/// The resolver never interprets these values, it only forwards them to the
/// audio output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceParameters {
    /// Voice gain in decibels
    pub gain_db: f32,
    /// Distance in meters at which falloff starts
    pub distance_near: f32,
    /// Distance in meters at which the voice becomes inaudible
    pub distance_far: f32,
    /// Radius in meters over which the voice is non-positional
    pub volumetric_radius: f32,
    pub lowpass: bool,
    /// Attenuation through level geometry (0 = none, 1 = full)
    pub occlusion_factor: f32,
    /// Attenuation through other players (0 = none, 1 = full)
    pub player_occlusion_factor: f32,
    pub listener_directionality: f32,
    pub player_directionality: f32,
    /// Named reverb preset, `None` clears reverb
    pub reverb_preset: Option<String>,
}

impl Default for VoiceParameters {
    fn default() -> Self {
        Self {
            gain_db: 15.0,
            distance_near: 0.0,
            distance_far: 25.0,
            volumetric_radius: 0.0,
            lowpass: true,
            occlusion_factor: 0.7,
            player_occlusion_factor: 0.85,
            listener_directionality: 0.5,
            player_directionality: 0.3,
            reverb_preset: None,
        }
    }
}

/// A competing voice override rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceOverride {
    pub name: String,
    /// Higher wins
    pub priority: i32,
    /// [`NO_PRIVACY_CHANNEL`] or a non-negative room id
    pub privacy_channel: i32,
    /// Members of the channel neither hear nor are heard by outsiders
    pub mute_outsiders: bool,
    /// A listener under this override cannot hear its own channel
    pub disallow_listening_to_channel: bool,
    pub parameters: VoiceParameters,
}

impl VoiceOverride {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            priority: 0,
            privacy_channel: NO_PRIVACY_CHANNEL,
            mute_outsiders: false,
            disallow_listening_to_channel: false,
            parameters: VoiceParameters::default(),
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_privacy_channel(mut self, channel: i32) -> Self {
        self.privacy_channel = channel;
        self
    }

    pub fn with_mute_outsiders(mut self, mute: bool) -> Self {
        self.mute_outsiders = mute;
        self
    }

    pub fn with_disallow_listening_to_channel(mut self, disallow: bool) -> Self {
        self.disallow_listening_to_channel = disallow;
        self
    }

    pub fn with_parameters(mut self, parameters: VoiceParameters) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn has_privacy_channel(&self) -> bool {
        self.privacy_channel != NO_PRIVACY_CHANNEL
    }
}

/// Reference to an override as stored in a priority list slot
///
/// The priority is captured at insertion so ordering never has to reach back
/// into the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OverrideEntry {
    pub id: OverrideId,
    pub priority: i32,
}

impl OverrideEntry {
    pub fn new(id: OverrideId, priority: i32) -> Self {
        Self { id, priority }
    }
}
