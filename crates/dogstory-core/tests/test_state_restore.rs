//! Integration tests for the server lifecycle around the state file.
//!
//! Exercises: parse_config → Game → StateFile observer → SimulationHost
//! → shutdown (final save) → restore_or_fresh on a fresh Game.

use std::fs;
use std::time::Duration;

use dogstory_core::prelude::*;

const CONFIG: &str = r#"{
    "defaultDogSpeed": 2.0,
    "defaultBagCapacity": 2,
    "dogRetirementTime": 3600.0,
    "lootGeneratorConfig": { "period": 0.5, "probability": 0.8 },
    "maps": [{
        "id": "town",
        "name": "Town",
        "roads": [
            { "x0": 0, "y0": 0, "x1": 20 },
            { "x0": 20, "y0": 0, "y1": 20 },
            { "x0": 0, "y0": 20, "x1": 20 }
        ],
        "offices": [{ "id": "post", "x": 20, "y": 10 }],
        "lootTypes": [{ "name": "bone", "value": 5 }, { "name": "ball", "value": 9 }]
    }]
}"#;

// ── Helpers ────────────────────────────────────────────────────────────

fn fresh_game() -> Game {
    let mut config = parse_config(CONFIG).unwrap();
    config.settings.seed = Some(3);
    config.into_game().unwrap()
}

fn play(client: &SimulationClient) -> Vec<DogId> {
    let town = MapId::new("town");
    let mut dogs = Vec::new();
    for name in ["Rex", "Fido", "Bella"] {
        dogs.push(client.join(&town, name).unwrap().dog_id);
    }
    let commands = [MoveCommand::Right, MoveCommand::Down, MoveCommand::Left];
    for step in 0..30 {
        for (i, id) in dogs.iter().enumerate() {
            client
                .move_dog(&town, *id, commands[(step / 8 + i) % 3])
                .unwrap();
        }
        client.tick(Duration::from_millis(250)).unwrap();
    }
    dogs
}

// ── Round trip ─────────────────────────────────────────────────────────

#[test]
fn shutdown_save_restores_identical_state() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.bin");
    let town = MapId::new("town");

    let mut game = fresh_game();
    game.add_observer(Box::new(StateFile::new(&path, Duration::ZERO)));
    let host = SimulationHost::spawn(game, HostConfig::default()).unwrap();
    play(&host.client());
    let before = host.client().state(&town).unwrap().unwrap();
    let played = host.shutdown().unwrap();
    assert!(path.exists());

    let mut restored = fresh_game();
    assert_eq!(
        restore_or_fresh(&path, &mut restored).unwrap(),
        RestoreOutcome::Restored
    );
    assert_eq!(restored.state(&town), Some(before));
    assert_eq!(
        restored.find_session(&town).map(GameSession::next_loot_id),
        played.find_session(&town).map(GameSession::next_loot_id)
    );
}

#[test]
fn restored_game_keeps_playing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.bin");
    let town = MapId::new("town");

    let mut game = fresh_game();
    game.add_observer(Box::new(StateFile::new(&path, Duration::from_secs(1))));
    let host = SimulationHost::spawn(game, HostConfig::default()).unwrap();
    let dogs = play(&host.client());
    host.shutdown().unwrap();

    let mut restored = fresh_game();
    restore_or_fresh(&path, &mut restored).unwrap();
    let newcomer = restored.join(&town, "Max").unwrap();
    assert!(!dogs.contains(&newcomer.dog_id));
    assert!(restored.join(&town, "Rex").is_err());

    restored.move_dog(&town, dogs[0], MoveCommand::Up).unwrap();
    restored.tick(Duration::from_millis(100)).unwrap();
    assert_eq!(restored.state(&town).unwrap().dogs.len(), 4);
}

// ── Fallback ───────────────────────────────────────────────────────────

#[test]
fn corrupt_state_file_falls_back_to_fresh_config() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.bin");
    fs::write(&path, [0xFFu8; 64]).unwrap();

    let mut game = fresh_game();
    assert!(restore_or_fresh(&path, &mut game).is_err());
    // The game is untouched and usable as a fresh start
    assert!(game.sessions().is_empty());
    assert!(game.join(&MapId::new("town"), "Rex").is_ok());
}

#[test]
fn state_for_unknown_map_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.bin");

    let mut game = fresh_game();
    game.join(&MapId::new("town"), "Rex").unwrap();
    dogstory_core::state_file::write_state(&path, &game).unwrap();

    // Same save, but the config no longer has the map
    let mut other = parse_config(r#"{ "maps": [{ "id": "park", "name": "Park",
        "roads": [{ "x0": 0, "y0": 0, "x1": 5 }], "lootTypes": [{ "value": 1 }] }] }"#)
    .unwrap()
    .into_game()
    .unwrap();
    assert!(matches!(
        restore_or_fresh(&path, &mut other),
        Err(SaveError::UnknownMap(_))
    ));
    assert!(other.sessions().is_empty());
}
