//! End-to-end resolution scenarios

use crate::fixtures::*;
use earshot_core::domain::*;

fn resolver_for(local: i32) -> VoiceResolver {
    VoiceResolver::for_local_player(player(local)).unwrap()
}

// ============================================================================
// PRIORITY
// ============================================================================

#[test]
fn test_competing_zones_follow_enable_state() {
    let mut resolver = resolver_for(0);
    let z1 = resolver.register_override(VoiceOverride::new("z1").with_priority(1));
    let z2 = resolver.register_override(VoiceOverride::new("z2").with_priority(2));
    let p = player(7);

    resolver.add_player(z1, p).unwrap();
    resolver.add_player(z2, p).unwrap();
    assert_eq!(resolver.get_max_priority_override(p), Some(z2));

    resolver.disable_override(z2).unwrap();
    assert_eq!(resolver.get_max_priority_override(p), Some(z1));

    resolver.enable_override(z2).unwrap();
    assert_eq!(resolver.get_max_priority_override(p), Some(z2));
}

#[test]
fn test_descending_order_for_every_insertion_permutation() {
    let permutations = [
        [2, 1, 0],
        [2, 0, 1],
        [1, 2, 0],
        [1, 0, 2],
        [0, 2, 1],
        [0, 1, 2],
    ];

    for order in permutations {
        let mut list = OverrideList::with_capacity(3);
        for priority in order {
            list.insert(OverrideEntry::new(OverrideId::new(priority as u32), priority))
                .unwrap();
        }

        let priorities: Vec<i32> = (0..3).filter_map(|i| list.get(i)).map(|e| e.priority).collect();
        assert_eq!(priorities, vec![2, 1, 0], "insertion order {:?}", order);
    }
}

#[test]
fn test_churn_keeps_highest_priority_on_top() {
    let mut resolver = resolver_for(0);
    let zones: Vec<OverrideId> = (0..6)
        .map(|i| {
            resolver.register_override(
                VoiceOverride::new(format!("zone{}", i)).with_priority(i % 3),
            )
        })
        .collect();
    let p = player(1);

    for round in 0..4 {
        for (i, zone) in zones.iter().enumerate() {
            if (i + round) % 2 == 0 {
                resolver.add_player(*zone, p).unwrap();
            }
        }

        let expected = zones
            .iter()
            .filter(|zone| resolver.is_affected(**zone, p))
            .map(|zone| resolver.override_record(*zone).unwrap().priority)
            .max();
        let winner = resolver
            .max_priority_override_record(p)
            .map(|record| record.priority);
        assert_eq!(winner, expected, "round {}", round);

        for zone in &zones {
            if resolver.is_affected(*zone, p) {
                resolver.remove_player(*zone, p).unwrap();
            }
        }
        assert!(!resolver.has_voice_overrides(p));
    }
}

#[test]
fn test_latest_equal_priority_zone_wins() {
    let mut resolver = resolver_for(0);
    let first = resolver.register_override(VoiceOverride::new("first").with_priority(1));
    let second = resolver.register_override(VoiceOverride::new("second").with_priority(1));

    resolver.add_player(first, player(2)).unwrap();
    resolver.add_player(second, player(2)).unwrap();
    assert_eq!(resolver.get_max_priority_override(player(2)), Some(second));

    // Re-entering moves the first zone back in front
    resolver.remove_player(first, player(2)).unwrap();
    resolver.add_player(first, player(2)).unwrap();
    assert_eq!(resolver.get_max_priority_override(player(2)), Some(first));
}

// ============================================================================
// PRIVACY
// ============================================================================

#[test]
fn test_private_room_mutes_outsiders() {
    let mut resolver = resolver_for(0);
    let room = resolver.register_override(
        VoiceOverride::new("room")
            .with_priority(1)
            .with_privacy_channel(3)
            .with_mute_outsiders(true),
    );
    let street = resolver.register_override(VoiceOverride::new("street"));
    let annex = resolver.register_override(
        VoiceOverride::new("annex")
            .with_priority(5)
            .with_privacy_channel(3),
    );

    resolver.add_player(room, player(0)).unwrap();
    resolver.add_player(street, player(1)).unwrap();

    let listener = resolver.listener_context();
    let street_record = resolver.override_record(street).unwrap();
    assert!(!other_player_with_override_can_be_heard(
        street_record,
        listener.has_override,
        listener.privacy_channel,
        listener.mute_outsiders,
        listener.disallow_listening,
    ));
    assert_eq!(resolver.resolve(player(1)), VoiceDecision::Muted);

    resolver.add_player(annex, player(1)).unwrap();
    assert_eq!(resolver.resolve(player(1)), VoiceDecision::Override(annex));

    // Unzoned speakers stay outside the room
    assert_eq!(resolver.resolve(player(2)), VoiceDecision::Muted);
}

#[test]
fn test_booth_cannot_hear_its_own_channel() {
    let mut resolver = resolver_for(0);
    let booth = resolver.register_override(
        VoiceOverride::new("booth")
            .with_privacy_channel(2)
            .with_disallow_listening_to_channel(true),
    );
    let stage = resolver.register_override(VoiceOverride::new("stage").with_privacy_channel(4));

    resolver.add_player(booth, player(0)).unwrap();
    resolver.add_player(booth, player(1)).unwrap();
    resolver.add_player(stage, player(2)).unwrap();

    assert_eq!(resolver.resolve(player(1)), VoiceDecision::Muted);
    assert_eq!(resolver.resolve(player(2)), VoiceDecision::Override(stage));
    assert_eq!(resolver.resolve(player(3)), VoiceDecision::Default);

    resolver.remove_player(booth, player(0)).unwrap();
    assert_eq!(resolver.resolve(player(1)), VoiceDecision::Override(booth));
}

// ============================================================================
// TICKS
// ============================================================================

#[test]
fn test_tick_applies_winning_parameters() {
    let resolver = hall_and_stage_scene().build_resolver().unwrap();
    let mut output = RecordingOutput::new();

    let summary = resolver.update((0..=4).map(player), &mut output);

    assert_eq!(summary.overridden, 3);
    assert_eq!(summary.defaulted, 1);
    assert_eq!(summary.muted, 0);
    assert_eq!(output.len(), 4);
    assert!(output.calls.iter().all(|(listener, _, _)| *listener == player(0)));

    assert_eq!(
        output.for_speaker(player(1)),
        Some(&Applied::Parameters(parameters_with_gain(1.0)))
    );
    assert_eq!(
        output.for_speaker(player(2)),
        Some(&Applied::Parameters(parameters_with_gain(2.0)))
    );
    assert_eq!(
        output.for_speaker(player(4)),
        Some(&Applied::Parameters(VoiceParameters::default()))
    );
    assert_eq!(output.for_speaker(player(0)), None);
}

#[test]
fn test_tick_hands_over_each_decision_once() {
    let resolver = hall_and_stage_scene().build_resolver().unwrap();
    let mut output = RecordingOutput::new();

    resolver.update((1..=4).map(player), &mut output);

    assert_eq!(output.decisions.len(), 4);
    for speaker in (1..=4).map(player) {
        assert_eq!(output.decision_for(speaker), Some(resolver.resolve(speaker)));
    }
    assert_eq!(
        output.decision_for(player(2)),
        Some(VoiceDecision::Override(OverrideId::new(1)))
    );
    assert_eq!(output.decision_for(player(4)), Some(VoiceDecision::Default));
}

#[test]
fn test_tick_mutes_ignored_speakers() {
    let mut resolver = hall_and_stage_scene().build_resolver().unwrap();
    resolver.ignore_player(player(2));
    let mut output = RecordingOutput::new();

    let summary = resolver.update([player(2), player(3)], &mut output);

    assert_eq!(summary.muted, 1);
    assert_eq!(summary.overridden, 1);
    assert_eq!(output.for_speaker(player(2)), Some(&Applied::Muted));

    resolver.unignore_player(player(2));
    output.clear();
    resolver.update([player(2)], &mut output);
    assert_eq!(
        output.for_speaker(player(2)),
        Some(&Applied::Parameters(parameters_with_gain(2.0)))
    );
}

#[test]
fn test_disabled_stage_falls_back_to_hall() {
    let mut resolver = hall_and_stage_scene().build_resolver().unwrap();
    let stage = OverrideId::new(1);
    let mut output = RecordingOutput::new();

    resolver.disable_override(stage).unwrap();
    resolver.update([player(2)], &mut output);
    assert_eq!(
        output.for_speaker(player(2)),
        Some(&Applied::Parameters(parameters_with_gain(1.0)))
    );

    resolver.destroy_override(stage).unwrap();
    assert_eq!(resolver.get_max_priority_override(player(2)), Some(OverrideId::new(0)));
}

// ============================================================================
// SESSION
// ============================================================================

#[test]
fn test_local_events_follow_zone_lifecycle() {
    let mut resolver = resolver_for(0);
    let room = resolver.register_override(VoiceOverride::new("room"));

    resolver.replace_members(room, [player(0), player(5)]).unwrap();
    resolver.disable_override(room).unwrap();
    resolver.enable_override(room).unwrap();
    resolver.destroy_override(room).unwrap();

    assert_eq!(
        resolver.drain_events(),
        vec![
            OverrideEvent::LocalPlayerAdded(room),
            OverrideEvent::LocalPlayerRemoved(room),
            OverrideEvent::LocalPlayerAdded(room),
            OverrideEvent::LocalPlayerRemoved(room),
        ]
    );
}

#[test]
fn test_player_leaving_and_rejoining() {
    let mut resolver = hall_and_stage_scene().build_resolver().unwrap();
    let hall = OverrideId::new(0);
    let slot = resolver.override_slot(player(3)).unwrap();

    resolver.on_player_left(player(3)).unwrap();
    assert!(!resolver.non_local_players_with_overrides().contains(&player(3)));
    assert_eq!(resolver.resolve(player(3)), VoiceDecision::Default);

    resolver.add_player(hall, player(3)).unwrap();
    let new_slot = resolver.override_slot(player(3)).unwrap();
    assert!(new_slot > slot);
    assert_eq!(resolver.resolve(player(3)), VoiceDecision::Override(hall));
}

#[test]
fn test_microphone_pickup_overrides_speaker() {
    let mut resolver = hall_and_stage_scene().build_resolver().unwrap();
    let microphone = resolver.register_override(VoiceOverride::new("microphone").with_priority(50));

    resolver.override_player_settings(microphone, player(4)).unwrap();
    assert_eq!(resolver.resolve(player(4)), VoiceDecision::Override(microphone));
    assert!(resolver.members(microphone).unwrap().is_empty());

    resolver.clear_player_override(player(4)).unwrap();
    assert_eq!(resolver.resolve(player(4)), VoiceDecision::Default);
}
