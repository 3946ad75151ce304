//! Voice override resolution for the local listener
//!
//! [`VoiceResolver`] is the explicit resolution context of one listener. It
//! owns the registered override zones and their membership, one
//! [`OverrideList`] per affected player, the slot registry for remote players
//! and the listener's [`IgnoreRegistry`]. Every mutation and query goes
//! through `&mut self` / `&self`, so a single writer per tick is enforced by
//! the borrow checker rather than by convention.
//!
//! Per speaker the resolver makes exactly one decision: muted, default
//! parameters, or the parameters of the winning override.

use crate::domain::ignore::IgnoreRegistry;
use crate::domain::output::{AudioOutput, TickSummary, VoiceDecision};
use crate::domain::override_list::{OverrideError, OverrideList, Result};
use crate::domain::player::{PlayerId, PlayerList};
use crate::domain::voice_override::{
    OverrideEntry, OverrideId, VoiceOverride, VoiceParameters, NO_PRIVACY_CHANNEL,
};
use std::collections::HashMap;
use tracing::{debug, trace, warn};

/// Can the listener hear a speaker whose active override is `candidate`?
///
/// Evaluated from the listener's own channel and flags plus the speaker's
/// channel, first match wins:
/// 1. the listener refuses its own (real) channel and the speaker shares it
/// 2. the listener's override mutes outsiders and the speaker is outside
/// 3. otherwise audible
pub fn other_player_with_override_can_be_heard(
    candidate: &VoiceOverride,
    listener_has_override: bool,
    listener_privacy_channel: i32,
    listener_mute_outsiders: bool,
    listener_disallow_listening: bool,
) -> bool {
    channel_can_be_heard(
        candidate.privacy_channel,
        listener_has_override,
        listener_privacy_channel,
        listener_mute_outsiders,
        listener_disallow_listening,
    )
}

fn channel_can_be_heard(
    speaker_channel: i32,
    listener_has_override: bool,
    listener_channel: i32,
    listener_mute_outsiders: bool,
    listener_disallow_listening: bool,
) -> bool {
    if listener_disallow_listening
        && speaker_channel == listener_channel
        && listener_channel != NO_PRIVACY_CHANNEL
    {
        return false;
    }
    if listener_has_override && listener_mute_outsiders && speaker_channel != listener_channel {
        return false;
    }
    true
}

/// Channel and flags of the listener's own active override
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListenerContext {
    pub has_override: bool,
    pub privacy_channel: i32,
    pub mute_outsiders: bool,
    pub disallow_listening: bool,
}

impl ListenerContext {
    /// Context of a listener without any override
    pub fn none() -> Self {
        Self {
            has_override: false,
            privacy_channel: NO_PRIVACY_CHANNEL,
            mute_outsiders: false,
            disallow_listening: false,
        }
    }

    pub fn from_override(record: Option<&VoiceOverride>) -> Self {
        match record {
            Some(record) => Self {
                has_override: true,
                privacy_channel: record.privacy_channel,
                mute_outsiders: record.mute_outsiders,
                disallow_listening: record.disallow_listening_to_channel,
            },
            None => Self::none(),
        }
    }

    /// Gate a speaker whose active override is `candidate`
    pub fn can_hear(&self, candidate: &VoiceOverride) -> bool {
        other_player_with_override_can_be_heard(
            candidate,
            self.has_override,
            self.privacy_channel,
            self.mute_outsiders,
            self.disallow_listening,
        )
    }

    /// Gate a speaker without any override (treated as channel -1)
    pub fn can_hear_unzoned(&self) -> bool {
        channel_can_be_heard(
            NO_PRIVACY_CHANNEL,
            self.has_override,
            self.privacy_channel,
            self.mute_outsiders,
            self.disallow_listening,
        )
    }
}

/// Notifications about the local player entering or leaving an override
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverrideEvent {
    LocalPlayerAdded(OverrideId),
    LocalPlayerRemoved(OverrideId),
}

#[derive(Debug, Clone)]
struct OverrideZone {
    record: VoiceOverride,
    members: PlayerList,
    enabled: bool,
}

#[derive(Debug, Clone)]
struct RemoteSlot {
    slot: usize,
    overrides: OverrideList,
}

/// Winning verdict with a borrow of the record that produced it
enum Verdict<'a> {
    Muted,
    Default,
    Override(OverrideId, &'a VoiceOverride),
}

impl Verdict<'_> {
    fn decision(&self) -> VoiceDecision {
        match self {
            Verdict::Muted => VoiceDecision::Muted,
            Verdict::Default => VoiceDecision::Default,
            Verdict::Override(id, _) => VoiceDecision::Override(*id),
        }
    }
}

/// Resolution context of the local listener
#[derive(Debug, Clone)]
pub struct VoiceResolver {
    local_player: PlayerId,
    list_capacity: usize,
    default_parameters: VoiceParameters,
    zones: Vec<Option<OverrideZone>>,
    local_overrides: OverrideList,
    remote: HashMap<PlayerId, RemoteSlot>,
    next_slot: usize,
    ignored: IgnoreRegistry,
    events: Vec<OverrideEvent>,
}

impl VoiceResolver {
    /// Create a resolver for `local_player` with per-player lists of
    /// `list_capacity` slots
    pub fn new(
        local_player: PlayerId,
        list_capacity: usize,
        default_parameters: VoiceParameters,
    ) -> Result<Self> {
        if !local_player.is_valid() {
            return Err(OverrideError::InvalidArgument(format!(
                "local player {} is not a valid player",
                local_player
            )));
        }
        if list_capacity == 0 {
            return Err(OverrideError::InvalidArgument(
                "override list capacity must be at least 1".to_string(),
            ));
        }

        debug!(local_player = %local_player, list_capacity, "Creating voice resolver");
        Ok(Self {
            local_player,
            list_capacity,
            default_parameters,
            zones: Vec::new(),
            local_overrides: OverrideList::with_capacity(list_capacity),
            remote: HashMap::new(),
            next_slot: 0,
            ignored: IgnoreRegistry::new(),
            events: Vec::new(),
        })
    }

    /// Resolver with the default capacity and parameters
    pub fn for_local_player(local_player: PlayerId) -> Result<Self> {
        Self::new(
            local_player,
            OverrideList::DEFAULT_CAPACITY,
            VoiceParameters::default(),
        )
    }

    pub fn local_player(&self) -> PlayerId {
        self.local_player
    }

    pub fn list_capacity(&self) -> usize {
        self.list_capacity
    }

    pub fn default_parameters(&self) -> &VoiceParameters {
        &self.default_parameters
    }

    pub fn set_default_parameters(&mut self, parameters: VoiceParameters) {
        self.default_parameters = parameters;
    }

    // ------------------------------------------------------------------
    // Override zones
    // ------------------------------------------------------------------

    /// Register a new, enabled override without members.
    ///
    /// Ids are never reused: destroyed overrides leave a retired entry, so
    /// the zone table only grows.
    pub fn register_override(&mut self, record: VoiceOverride) -> OverrideId {
        let id = OverrideId::new(self.zones.len() as u32);
        debug!(
            override_id = %id,
            name = %record.name,
            priority = record.priority,
            privacy_channel = record.privacy_channel,
            "Registering override"
        );
        self.zones.push(Some(OverrideZone {
            record,
            members: PlayerList::new(),
            enabled: true,
        }));
        id
    }

    pub fn override_record(&self, id: OverrideId) -> Option<&VoiceOverride> {
        self.zone(id).ok().map(|zone| &zone.record)
    }

    pub fn is_enabled(&self, id: OverrideId) -> bool {
        self.zone(id).map(|zone| zone.enabled).unwrap_or(false)
    }

    /// Players currently claimed by the override, ascending
    pub fn members(&self, id: OverrideId) -> Option<&[PlayerId]> {
        self.zone(id).ok().map(|zone| zone.members.players())
    }

    /// Registered (not destroyed) overrides
    pub fn overrides(&self) -> impl Iterator<Item = (OverrideId, &VoiceOverride)> + '_ {
        self.zones.iter().enumerate().filter_map(|(index, zone)| {
            zone.as_ref()
                .map(|zone| (OverrideId::new(index as u32), &zone.record))
        })
    }

    /// A player entered the override's zone
    pub fn add_player(&mut self, id: OverrideId, player: PlayerId) -> Result<()> {
        let player = Self::validate_player(player)?;
        let zone = self.zone_mut(id)?;
        if !zone.members.add(player) {
            return Err(OverrideError::AlreadyPresent(format!(
                "player {} is already affected by {}",
                player, id
            )));
        }
        let enabled = zone.enabled;
        debug!(override_id = %id, player = %player, enabled, "Player entered override");

        if !enabled {
            return Ok(());
        }
        match self.insert_into(player, id) {
            Ok(()) | Err(OverrideError::AlreadyPresent(_)) => Ok(()),
            Err(e) => {
                if let Ok(zone) = self.zone_mut(id) {
                    zone.members.remove(player);
                }
                warn!(override_id = %id, player = %player, error = %e, "Failed to apply override");
                Err(e)
            }
        }
    }

    /// A player left the override's zone
    pub fn remove_player(&mut self, id: OverrideId, player: PlayerId) -> Result<()> {
        let player = Self::validate_player(player)?;
        let zone = self.zone_mut(id)?;
        if !zone.members.remove(player) {
            return Err(OverrideError::NotPresent(format!(
                "player {} is not affected by {}",
                player, id
            )));
        }
        let enabled = zone.enabled;
        debug!(override_id = %id, player = %player, "Player exited override");

        if enabled {
            if let Err(e) = self.remove_from(player, id) {
                debug!(override_id = %id, player = %player, error = %e, "Override already vacated");
            }
        }
        Ok(())
    }

    /// Is the player a member of the override's zone?
    pub fn is_affected(&self, id: OverrideId, player: PlayerId) -> bool {
        self.zone(id)
            .map(|zone| zone.members.contains(player))
            .unwrap_or(false)
    }

    /// Overwrite the override's membership with a replicated set and bring
    /// every affected list in line with it.
    ///
    /// All players are processed; the first failure is returned afterwards.
    pub fn replace_members(
        &mut self,
        id: OverrideId,
        players: impl IntoIterator<Item = PlayerId>,
    ) -> Result<()> {
        let incoming: PlayerList = players.into_iter().collect();
        let zone = self.zone_mut(id)?;
        let previous = std::mem::replace(&mut zone.members, incoming.clone());
        let enabled = zone.enabled;
        debug!(override_id = %id, members = incoming.len(), "Replacing override members");

        if !enabled {
            return Ok(());
        }

        for &player in previous.players() {
            if !incoming.contains(player) {
                if let Err(e) = self.remove_from(player, id) {
                    trace!(override_id = %id, player = %player, error = %e, "Nothing to vacate");
                }
            }
        }

        let mut first_error = None;
        for &player in incoming.players() {
            match self.insert_into(player, id) {
                Ok(()) | Err(OverrideError::AlreadyPresent(_)) => {}
                Err(e) => {
                    warn!(
                        override_id = %id,
                        player = %player,
                        error = %e,
                        "Failed to apply override"
                    );
                    if let Ok(zone) = self.zone_mut(id) {
                        zone.members.remove(player);
                    }
                    first_error.get_or_insert(e);
                }
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Re-apply the override to all of its members.
    ///
    /// Members whose list cannot take the override lose their membership.
    /// All members are processed; the first failure is returned afterwards.
    pub fn enable_override(&mut self, id: OverrideId) -> Result<()> {
        let zone = self.zone_mut(id)?;
        if zone.enabled {
            return Ok(());
        }
        zone.enabled = true;
        let members = zone.members.players().to_vec();
        debug!(override_id = %id, members = members.len(), "Override enabled");

        let mut first_error = None;
        for player in members {
            match self.insert_into(player, id) {
                Ok(()) | Err(OverrideError::AlreadyPresent(_)) => {}
                Err(e) => {
                    warn!(
                        override_id = %id,
                        player = %player,
                        error = %e,
                        "Failed to apply override"
                    );
                    if let Ok(zone) = self.zone_mut(id) {
                        zone.members.remove(player);
                    }
                    first_error.get_or_insert(e);
                }
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Vacate the override from every list before returning.
    ///
    /// Membership is kept so that a later enable restores it.
    pub fn disable_override(&mut self, id: OverrideId) -> Result<()> {
        let zone = self.zone_mut(id)?;
        if !zone.enabled {
            return Ok(());
        }
        zone.enabled = false;
        debug!(override_id = %id, "Override disabled");
        self.vacate(id);
        Ok(())
    }

    /// Vacate the override everywhere and retire its id
    pub fn destroy_override(&mut self, id: OverrideId) -> Result<()> {
        self.zone(id)?;
        self.vacate(id);
        if let Some(zone) = self.zones.get_mut(id.get() as usize) {
            *zone = None;
        }
        debug!(override_id = %id, "Override destroyed");
        Ok(())
    }

    /// Apply an override to a player without making it a zone member
    pub fn override_player_settings(&mut self, id: OverrideId, player: PlayerId) -> Result<()> {
        let player = Self::validate_player(player)?;
        if !self.zone(id)?.enabled {
            return Err(OverrideError::InvalidArgument(format!("{} is disabled", id)));
        }
        self.insert_into(player, id)
    }

    /// Drop every override applied to a player
    pub fn clear_player_override(&mut self, player: PlayerId) -> Result<()> {
        let player = Self::validate_player(player)?;
        if player == self.local_player {
            let removed: Vec<OverrideId> = self.local_overrides.iter().map(|e| e.id).collect();
            self.local_overrides.clear();
            self.events
                .extend(removed.into_iter().map(OverrideEvent::LocalPlayerRemoved));
        } else if let Some(remote) = self.remote.get_mut(&player) {
            remote.overrides.clear();
        }
        debug!(player = %player, "Player overrides cleared");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Remote player slots
    // ------------------------------------------------------------------

    /// Slot id of a remote player, assigning the next one on first use.
    ///
    /// Slot ids start at 1 and count every remote player ever tracked.
    pub fn create_override_slot(&mut self, player: PlayerId) -> Result<usize> {
        let player = Self::validate_player(player)?;
        if player == self.local_player {
            return Err(OverrideError::InvalidArgument(format!(
                "local player {} does not use an override slot",
                player
            )));
        }
        Ok(self.remote_slot(player).slot)
    }

    pub fn override_slot(&self, player: PlayerId) -> Option<usize> {
        self.remote.get(&player).map(|remote| remote.slot)
    }

    /// Remote players that own a slot, ascending
    pub fn non_local_players_with_overrides(&self) -> Vec<PlayerId> {
        let mut players: Vec<PlayerId> = self.remote.keys().copied().collect();
        players.sort_unstable();
        players
    }

    /// A remote player left the session
    pub fn on_player_left(&mut self, player: PlayerId) -> Result<()> {
        let player = Self::validate_player(player)?;
        if player == self.local_player {
            return Err(OverrideError::InvalidArgument(format!(
                "local player {} cannot leave its own resolver",
                player
            )));
        }
        for zone in self.zones.iter_mut().flatten() {
            zone.members.remove(player);
        }
        self.remote.remove(&player);
        self.ignored.unignore(player);
        debug!(player = %player, "Player left");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Ignore registry
    // ------------------------------------------------------------------

    /// Silence a speaker unconditionally. Returns whether anything changed.
    pub fn ignore_player(&mut self, player: PlayerId) -> bool {
        if !player.is_valid() {
            warn!(player = %player, "Cannot ignore invalid player");
            return false;
        }
        self.ignored.ignore(player)
    }

    /// Undo [`ignore_player`](Self::ignore_player). Returns whether anything changed.
    pub fn unignore_player(&mut self, player: PlayerId) -> bool {
        if !player.is_valid() {
            warn!(player = %player, "Cannot unignore invalid player");
            return false;
        }
        self.ignored.unignore(player)
    }

    pub fn is_ignored(&self, player: PlayerId) -> bool {
        self.ignored.is_ignored(player)
    }

    pub fn ignored_players(&self) -> impl Iterator<Item = PlayerId> + '_ {
        self.ignored.ignored()
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// The override list of a player, if one exists
    pub fn player_overrides(&self, player: PlayerId) -> Option<&OverrideList> {
        if player == self.local_player {
            Some(&self.local_overrides)
        } else {
            self.remote.get(&player).map(|remote| &remote.overrides)
        }
    }

    /// Highest priority override currently applied to `player`
    pub fn get_max_priority_override(&self, player: PlayerId) -> Option<OverrideId> {
        if !player.is_valid() {
            warn!(player = %player, "Max priority override requested for invalid player");
            return None;
        }
        self.player_overrides(player)?.first().map(|entry| entry.id)
    }

    pub fn max_priority_override_record(&self, player: PlayerId) -> Option<&VoiceOverride> {
        self.get_max_priority_override(player)
            .and_then(|id| self.override_record(id))
    }

    /// True if the player is not ignored and no override claims it
    pub fn uses_default_effects(&self, player: PlayerId) -> bool {
        if !player.is_valid() {
            warn!(player = %player, "Default effects requested for invalid player");
            return false;
        }
        !self.is_ignored(player) && self.get_max_priority_override(player).is_none()
    }

    /// True if any override claims the player, ignore list notwithstanding
    pub fn has_voice_overrides(&self, player: PlayerId) -> bool {
        self.get_max_priority_override(player).is_some()
    }

    /// True if an override claims the player and the player is not ignored
    pub fn uses_voice_override(&self, player: PlayerId) -> bool {
        !self.is_ignored(player) && self.has_voice_overrides(player)
    }

    /// Channel and flags of the local listener's active override
    pub fn listener_context(&self) -> ListenerContext {
        ListenerContext::from_override(self.max_priority_override_record(self.local_player))
    }

    /// Decide how the local listener hears `speaker`
    pub fn resolve(&self, speaker: PlayerId) -> VoiceDecision {
        self.verdict(speaker, &self.listener_context()).decision()
    }

    /// Resolve every speaker and hand the result to the audio output.
    ///
    /// The local player is skipped.
    pub fn update<O>(
        &self,
        speakers: impl IntoIterator<Item = PlayerId>,
        output: &mut O,
    ) -> TickSummary
    where
        O: AudioOutput + ?Sized,
    {
        let listener = self.listener_context();
        let mut summary = TickSummary::default();

        for speaker in speakers {
            if speaker == self.local_player {
                continue;
            }
            let verdict = self.verdict(speaker, &listener);
            let decision = verdict.decision();
            match &verdict {
                Verdict::Muted => output.mute(self.local_player, speaker),
                Verdict::Default => output.apply_parameters(
                    self.local_player,
                    speaker,
                    decision,
                    &self.default_parameters,
                ),
                Verdict::Override(_, record) => output.apply_parameters(
                    self.local_player,
                    speaker,
                    decision,
                    &record.parameters,
                ),
            }
            summary.record(decision);
        }

        debug!(
            overridden = summary.overridden,
            defaulted = summary.defaulted,
            muted = summary.muted,
            "Voice update tick"
        );
        summary
    }

    /// Hand out queued local-player notifications
    pub fn drain_events(&mut self) -> Vec<OverrideEvent> {
        std::mem::take(&mut self.events)
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn verdict(&self, speaker: PlayerId, listener: &ListenerContext) -> Verdict<'_> {
        if !speaker.is_valid() {
            warn!(player = %speaker, "Cannot resolve invalid speaker");
            return Verdict::Muted;
        }
        if speaker == self.local_player || self.is_ignored(speaker) {
            return Verdict::Muted;
        }

        let active = self
            .get_max_priority_override(speaker)
            .and_then(|id| self.override_record(id).map(|record| (id, record)));

        match active {
            Some((id, record)) if listener.can_hear(record) => Verdict::Override(id, record),
            Some(_) => Verdict::Muted,
            None if listener.can_hear_unzoned() => Verdict::Default,
            None => Verdict::Muted,
        }
    }

    fn validate_player(player: PlayerId) -> Result<PlayerId> {
        if player.is_valid() {
            Ok(player)
        } else {
            Err(OverrideError::InvalidArgument(format!(
                "player {} is not a valid player",
                player
            )))
        }
    }

    fn zone(&self, id: OverrideId) -> Result<&OverrideZone> {
        self.zones
            .get(id.get() as usize)
            .and_then(Option::as_ref)
            .ok_or_else(|| OverrideError::InvalidArgument(format!("{} is not registered", id)))
    }

    fn zone_mut(&mut self, id: OverrideId) -> Result<&mut OverrideZone> {
        self.zones
            .get_mut(id.get() as usize)
            .and_then(Option::as_mut)
            .ok_or_else(|| OverrideError::InvalidArgument(format!("{} is not registered", id)))
    }

    fn remote_slot(&mut self, player: PlayerId) -> &mut RemoteSlot {
        let capacity = self.list_capacity;
        let next_slot = &mut self.next_slot;
        self.remote.entry(player).or_insert_with(|| {
            *next_slot += 1;
            let slot = *next_slot;
            debug!(player = %player, slot, "Override slot created");
            RemoteSlot {
                slot,
                overrides: OverrideList::with_capacity(capacity),
            }
        })
    }

    fn list_mut(&mut self, player: PlayerId) -> &mut OverrideList {
        if player == self.local_player {
            return &mut self.local_overrides;
        }
        &mut self.remote_slot(player).overrides
    }

    fn insert_into(&mut self, player: PlayerId, id: OverrideId) -> Result<()> {
        let priority = self.zone(id)?.record.priority;
        self.list_mut(player)
            .insert(OverrideEntry::new(id, priority))?;
        if player == self.local_player {
            self.events.push(OverrideEvent::LocalPlayerAdded(id));
        }
        Ok(())
    }

    fn remove_from(&mut self, player: PlayerId, id: OverrideId) -> Result<()> {
        let list = if player == self.local_player {
            &mut self.local_overrides
        } else {
            self.remote
                .get_mut(&player)
                .map(|remote| &mut remote.overrides)
                .ok_or_else(|| {
                    OverrideError::NotPresent(format!("player {} has no override slot", player))
                })?
        };
        list.remove(id)?;
        if player == self.local_player {
            self.events.push(OverrideEvent::LocalPlayerRemoved(id));
        }
        Ok(())
    }

    fn vacate(&mut self, id: OverrideId) {
        if self.local_overrides.remove(id).is_ok() {
            self.events.push(OverrideEvent::LocalPlayerRemoved(id));
        }
        for (player, remote) in self.remote.iter_mut() {
            if remote.overrides.remove(id).is_ok() {
                trace!(override_id = %id, player = %player, "Override vacated");
            }
        }
    }
}
