//! Scene files driving a full resolver

use crate::fixtures::*;
use earshot_core::domain::*;
use tempfile::TempDir;

#[tokio::test]
async fn test_scene_file_to_tick() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("scene.toml");

    hall_and_stage_scene().save_to_file(&path).await.unwrap();
    let scene = SceneConfig::load_from_file(&path).await.unwrap();
    let resolver = scene.build_resolver().unwrap();

    let mut output = RecordingOutput::new();
    let summary = resolver.update(scene.speakers(), &mut output);

    assert_eq!(summary.total(), 4);
    assert_eq!(summary.overridden, 3);
    assert_eq!(
        output.for_speaker(player(2)),
        Some(&Applied::Parameters(parameters_with_gain(2.0)))
    );
}

#[tokio::test]
async fn test_handwritten_scene() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("booth.toml");
    let contents = r#"
local_player = 1
players = [1, 2, 3]
ignored = [3]

[resolver]
list_capacity = 4

[resolver.default_parameters]
gain_db = 6.0

[[overrides]]
name = "booth"
priority = 3
privacy_channel = 2
mute_outsiders = true
members = [1, 2]

[overrides.parameters]
gain_db = 9.0
reverb_preset = "booth"
"#;
    tokio::fs::write(&path, contents).await.unwrap();

    let scene = SceneConfig::load_from_file(&path).await.unwrap();
    let resolver = scene.build_resolver().unwrap();
    assert_eq!(resolver.list_capacity(), 4);
    assert_eq!(resolver.default_parameters().gain_db, 6.0);

    let mut output = RecordingOutput::new();
    resolver.update(scene.speakers(), &mut output);

    match output.for_speaker(player(2)) {
        Some(Applied::Parameters(parameters)) => {
            assert_eq!(parameters.gain_db, 9.0);
            assert_eq!(parameters.reverb_preset.as_deref(), Some("booth"));
        }
        other => panic!("unexpected output for speaker 2: {:?}", other),
    }
    assert_eq!(output.for_speaker(player(3)), Some(&Applied::Muted));
}

#[tokio::test]
async fn test_snapshot_survives_disk_round_trip() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("snapshot.toml");

    let mut resolver = hall_and_stage_scene().build_resolver().unwrap();
    let stage = OverrideId::new(1);
    resolver.disable_override(stage).unwrap();
    resolver.ignore_player(player(4));

    SceneConfig::from_resolver(&resolver)
        .save_to_file(&path)
        .await
        .unwrap();
    let restored = SceneConfig::load_from_file(&path)
        .await
        .unwrap()
        .build_resolver()
        .unwrap();

    assert!(!restored.is_enabled(stage));
    assert!(restored.is_affected(stage, player(2)));
    assert!(restored.is_ignored(player(4)));
    assert_eq!(restored.resolve(player(2)), VoiceDecision::Override(OverrideId::new(0)));
}

#[test]
fn test_over_capacity_scene_is_rejected() {
    let mut scene = empty_scene(2);
    scene.resolver.list_capacity = 1;
    scene.overrides.push(zone("a", 0, -1, &[1]));
    scene.overrides.push(zone("b", 1, -1, &[1]));

    assert!(matches!(scene.build_resolver(), Err(ConfigError::Invalid(_))));
}
