//! Scene configuration for Earshot
//!
//! This module provides:
//! - Serializable descriptions of override zones and resolver settings
//! - TOML scene files loaded and saved asynchronously
//! - Conversion between a scene description and a live [`VoiceResolver`]

use crate::domain::override_list::{OverrideError, OverrideList};
use crate::domain::player::PlayerId;
use crate::domain::resolver::VoiceResolver;
use crate::domain::voice_override::{VoiceOverride, VoiceParameters, NO_PRIVACY_CHANNEL};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tracing::{debug, info, instrument};

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors that can occur during configuration operations
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Override error: {0}")]
    Override(#[from] OverrideError),
}

/// Resolver-wide settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Slots per player override list
    #[serde(default = "default_list_capacity")]
    pub list_capacity: usize,

    /// Parameters used for speakers no override claims
    #[serde(default)]
    pub default_parameters: VoiceParameters,
}

fn default_list_capacity() -> usize {
    OverrideList::DEFAULT_CAPACITY
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            list_capacity: default_list_capacity(),
            default_parameters: VoiceParameters::default(),
        }
    }
}

/// One override zone of a scene
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverrideConfig {
    pub name: String,

    #[serde(default)]
    pub priority: i32,

    #[serde(default = "default_privacy_channel")]
    pub privacy_channel: i32,

    #[serde(default)]
    pub mute_outsiders: bool,

    #[serde(default)]
    pub disallow_listening_to_channel: bool,

    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Players inside the zone
    #[serde(default)]
    pub members: Vec<PlayerId>,

    #[serde(default)]
    pub parameters: VoiceParameters,
}

fn default_privacy_channel() -> i32 {
    NO_PRIVACY_CHANNEL
}

fn default_enabled() -> bool {
    true
}

impl OverrideConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            priority: 0,
            privacy_channel: NO_PRIVACY_CHANNEL,
            mute_outsiders: false,
            disallow_listening_to_channel: false,
            enabled: true,
            members: Vec::new(),
            parameters: VoiceParameters::default(),
        }
    }

    pub fn to_override(&self) -> VoiceOverride {
        VoiceOverride::new(self.name.clone())
            .with_priority(self.priority)
            .with_privacy_channel(self.privacy_channel)
            .with_mute_outsiders(self.mute_outsiders)
            .with_disallow_listening_to_channel(self.disallow_listening_to_channel)
            .with_parameters(self.parameters.clone())
    }
}

impl From<&VoiceOverride> for OverrideConfig {
    fn from(record: &VoiceOverride) -> Self {
        Self {
            name: record.name.clone(),
            priority: record.priority,
            privacy_channel: record.privacy_channel,
            mute_outsiders: record.mute_outsiders,
            disallow_listening_to_channel: record.disallow_listening_to_channel,
            enabled: true,
            members: Vec::new(),
            parameters: record.parameters.clone(),
        }
    }
}

/// Complete scene: who listens, who speaks and which zones compete
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneConfig {
    /// The listener the resolver is built for
    pub local_player: PlayerId,

    /// Everyone present in the voice space, local player included
    #[serde(default)]
    pub players: Vec<PlayerId>,

    /// Speakers the listener has silenced
    #[serde(default)]
    pub ignored: Vec<PlayerId>,

    #[serde(default)]
    pub resolver: ResolverConfig,

    #[serde(default)]
    pub overrides: Vec<OverrideConfig>,
}

impl SceneConfig {
    /// Empty scene for `local_player`
    pub fn new(local_player: PlayerId) -> Self {
        Self {
            local_player,
            players: vec![local_player],
            ignored: Vec::new(),
            resolver: ResolverConfig::default(),
            overrides: Vec::new(),
        }
    }

    /// `<config dir>/earshot/scene.toml`, if the platform has a config dir
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("earshot").join("scene.toml"))
    }

    /// Load configuration from TOML file
    #[instrument(skip(path))]
    pub async fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading scene");

        let contents = fs::read_to_string(path).await?;
        let config: Self = toml::from_str(&contents)?;
        config.validate()?;

        debug!(overrides = config.overrides.len(), "Scene loaded successfully");
        Ok(config)
    }

    /// Save configuration to TOML file
    #[instrument(skip(self, path))]
    pub async fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        info!(path = %path.display(), "Saving scene");

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let toml_str = toml::to_string_pretty(self)?;
        fs::write(path, toml_str).await?;

        debug!("Scene saved successfully");
        Ok(())
    }

    /// Check the scene can be turned into a resolver
    pub fn validate(&self) -> Result<()> {
        if !self.local_player.is_valid() {
            return Err(ConfigError::Invalid(format!(
                "local player {} is not a valid player",
                self.local_player
            )));
        }
        if self.resolver.list_capacity == 0 {
            return Err(ConfigError::Invalid(
                "list_capacity must be at least 1".to_string(),
            ));
        }
        if let Some(player) = self
            .players
            .iter()
            .chain(&self.ignored)
            .find(|player| !player.is_valid())
        {
            return Err(ConfigError::Invalid(format!(
                "player {} is not a valid player",
                player
            )));
        }

        let mut names = HashSet::new();
        let mut claims: HashMap<PlayerId, usize> = HashMap::new();
        for zone in &self.overrides {
            if zone.name.trim().is_empty() {
                return Err(ConfigError::Invalid("override name is empty".to_string()));
            }
            if !names.insert(zone.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "override '{}' is defined twice",
                    zone.name
                )));
            }
            if zone.privacy_channel < NO_PRIVACY_CHANNEL {
                return Err(ConfigError::Invalid(format!(
                    "override '{}' has invalid privacy channel {}",
                    zone.name, zone.privacy_channel
                )));
            }
            for member in &zone.members {
                if !member.is_valid() {
                    return Err(ConfigError::Invalid(format!(
                        "override '{}' has invalid member {}",
                        zone.name, member
                    )));
                }
                if zone.enabled {
                    *claims.entry(*member).or_default() += 1;
                }
            }
        }

        if let Some((player, count)) = claims
            .iter()
            .find(|(_, count)| **count > self.resolver.list_capacity)
        {
            return Err(ConfigError::Invalid(format!(
                "player {} is claimed by {} overrides, capacity is {}",
                player, count, self.resolver.list_capacity
            )));
        }

        Ok(())
    }

    /// Build a live resolver from this scene.
    ///
    /// Overrides are registered in file order, so the n-th entry of
    /// `overrides` gets `OverrideId::new(n)`.
    pub fn build_resolver(&self) -> Result<VoiceResolver> {
        self.validate()?;

        let mut resolver = VoiceResolver::new(
            self.local_player,
            self.resolver.list_capacity,
            self.resolver.default_parameters.clone(),
        )?;

        for &player in &self.players {
            if player != self.local_player {
                resolver.create_override_slot(player)?;
            }
        }

        for zone in &self.overrides {
            let id = resolver.register_override(zone.to_override());
            if !zone.enabled {
                resolver.disable_override(id)?;
            }
            resolver.replace_members(id, zone.members.iter().copied())?;
        }

        for &player in &self.ignored {
            resolver.ignore_player(player);
        }

        debug!(
            local_player = %self.local_player,
            overrides = self.overrides.len(),
            "Resolver built from scene"
        );
        Ok(resolver)
    }

    /// Snapshot a resolver back into a scene description
    pub fn from_resolver(resolver: &VoiceResolver) -> Self {
        let overrides = resolver
            .overrides()
            .map(|(id, record)| {
                let mut zone = OverrideConfig::from(record);
                zone.enabled = resolver.is_enabled(id);
                zone.members = resolver.members(id).map(<[_]>::to_vec).unwrap_or_default();
                zone
            })
            .collect();

        let mut players = vec![resolver.local_player()];
        players.extend(resolver.non_local_players_with_overrides());

        Self {
            local_player: resolver.local_player(),
            players,
            ignored: resolver.ignored_players().collect(),
            resolver: ResolverConfig {
                list_capacity: resolver.list_capacity(),
                default_parameters: resolver.default_parameters().clone(),
            },
            overrides,
        }
    }

    /// Every player except the listener
    pub fn speakers(&self) -> impl Iterator<Item = PlayerId> + '_ {
        self.players
            .iter()
            .copied()
            .filter(move |player| *player != self.local_player)
    }

    /// Create factory default scene
    pub fn factory_default() -> Self {
        let local = PlayerId::new(0);
        let mut config = Self::new(local);
        config.players = (0..=5).map(PlayerId::new).collect();

        config.overrides.push(OverrideConfig {
            priority: 10,
            privacy_channel: 1,
            mute_outsiders: true,
            members: vec![PlayerId::new(1), PlayerId::new(2)],
            parameters: VoiceParameters {
                distance_far: 8.0,
                reverb_preset: Some("small_room".to_string()),
                ..VoiceParameters::default()
            },
            ..OverrideConfig::new("private room")
        });

        config.overrides.push(OverrideConfig {
            priority: 20,
            members: vec![PlayerId::new(3)],
            parameters: VoiceParameters {
                gain_db: 24.0,
                distance_far: 120.0,
                volumetric_radius: 5.0,
                lowpass: false,
                ..VoiceParameters::default()
            },
            ..OverrideConfig::new("megaphone")
        });

        config.overrides.push(OverrideConfig {
            members: vec![local, PlayerId::new(4)],
            parameters: VoiceParameters {
                distance_far: 15.0,
                ..VoiceParameters::default()
            },
            ..OverrideConfig::new("proximity")
        });

        config
    }
}
