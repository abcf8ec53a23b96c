//! State file - periodic crash-safe snapshots and startup restore.

use std::fs::{self, File};
use std::io::{self, BufReader, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::game::{Game, ObserverError, TickObserver};
use crate::persistence::SaveError;

/// Tick observer that saves the game every `save_period` of simulated time
/// and once more on shutdown. A zero period only saves on shutdown.
pub struct StateFile {
    path: PathBuf,
    save_period: Duration,
    since_save: Duration,
}

impl StateFile {
    pub fn new(path: impl Into<PathBuf>, save_period: Duration) -> Self {
        Self {
            path: path.into(),
            save_period,
            since_save: Duration::ZERO,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn save(&mut self, game: &Game) -> Result<(), SaveError> {
        write_state(&self.path, game)?;
        self.since_save = Duration::ZERO;
        log::info!("Game state saved to {}", self.path.display());
        Ok(())
    }
}

impl TickObserver for StateFile {
    fn on_tick(&mut self, game: &Game, dt: Duration) -> Result<(), ObserverError> {
        if self.save_period.is_zero() {
            return Ok(());
        }
        self.since_save += dt;
        if self.since_save >= self.save_period {
            self.save(game)?;
        }
        Ok(())
    }

    fn on_shutdown(&mut self, game: &Game) -> Result<(), ObserverError> {
        self.save(game)?;
        Ok(())
    }
}

/// Encode `game` and atomically replace the file at `path`.
pub fn write_state(path: &Path, game: &Game) -> Result<(), SaveError> {
    let mut bytes = Vec::new();
    game.save(&mut bytes)?;
    write_bytes_atomic(path, &bytes)?;
    Ok(())
}

fn write_bytes_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let tmp_path = temp_path_for(path);
    let result = write_synced(&tmp_path, bytes).and_then(|()| fs::rename(&tmp_path, path));
    if result.is_err() {
        let _ = fs::remove_file(&tmp_path);
    }
    result
}

/// Write `bytes` and flush them to disk before returning.
fn write_synced(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

fn temp_path_for(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("state");
    let tmp_name = format!("{file_name}.tmp");
    match path.parent() {
        Some(parent) => parent.join(tmp_name),
        None => PathBuf::from(tmp_name),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreOutcome {
    /// No state file; the game is unchanged
    Fresh,
    Restored,
}

/// Restore `game` from the file at `path` if it exists.
///
/// A missing file is not an error. A file that exists but cannot be decoded
/// or does not match the game's maps is, and leaves `game` untouched; the
/// caller should then start over from a freshly loaded config.
pub fn restore_or_fresh(path: &Path, game: &mut Game) -> Result<RestoreOutcome, SaveError> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            log::info!("No state file at {}, starting fresh", path.display());
            return Ok(RestoreOutcome::Fresh);
        }
        Err(e) => return Err(e.into()),
    };
    game.load(BufReader::new(file))?;
    log::info!("Game state restored from {}", path.display());
    Ok(RestoreOutcome::Restored)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::GameSettings;
    use crate::map::{LootType, MapBuilder, MapId};
    use dogstory_logic::geometry::GridPoint;
    use dogstory_logic::roads::Road;

    fn game() -> Game {
        let mut game = Game::new(GameSettings::default());
        game.add_map(
            MapBuilder::new(MapId::new("m"), "m")
                .road(Road::horizontal(GridPoint::new(0, 0), 10))
                .loot_type(LootType::with_value(1))
                .build()
                .unwrap(),
        )
        .unwrap();
        game
    }

    #[test]
    fn test_temp_path() {
        assert_eq!(
            temp_path_for(Path::new("/var/lib/dog/state.bin")),
            PathBuf::from("/var/lib/dog/state.bin.tmp")
        );
        assert_eq!(temp_path_for(Path::new("state")), PathBuf::from("state.tmp"));
    }

    #[test]
    fn test_atomic_write_replaces_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.bin");

        write_bytes_atomic(&path, b"first snapshot").unwrap();
        write_bytes_atomic(&path, b"second").unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"second");
        assert!(!dir.path().join("state.bin.tmp").exists());
    }

    #[test]
    fn test_failed_write_leaves_previous_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.bin");
        write_bytes_atomic(&path, b"good").unwrap();

        // A directory in the temp file's place makes the write fail
        fs::create_dir(dir.path().join("state.bin.tmp")).unwrap();
        assert!(write_bytes_atomic(&path, b"lost").is_err());
        assert_eq!(fs::read(&path).unwrap(), b"good");
    }

    #[test]
    fn test_saves_after_period_of_ticks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.bin");
        let mut game = game();
        game.join(&MapId::new("m"), "rex").unwrap();
        game.add_observer(Box::new(StateFile::new(&path, Duration::from_secs(1))));

        game.tick(Duration::from_millis(600)).unwrap();
        assert!(!path.exists());
        game.tick(Duration::from_millis(600)).unwrap();
        assert!(path.exists());
        assert!(!dir.path().join("state.bin.tmp").exists());
    }

    #[test]
    fn test_zero_period_saves_only_on_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("state.bin");
        let mut game = game();
        game.add_observer(Box::new(StateFile::new(&path, Duration::ZERO)));

        game.tick(Duration::from_secs(100)).unwrap();
        assert!(!path.exists());
        game.shutdown().unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_missing_file_is_fresh() {
        let dir = tempfile::tempdir().unwrap();
        let mut game = game();
        let outcome = restore_or_fresh(&dir.path().join("absent.bin"), &mut game).unwrap();
        assert_eq!(outcome, RestoreOutcome::Fresh);
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.bin");
        fs::write(&path, b"definitely not a save file").unwrap();
        let mut game = game();
        assert!(restore_or_fresh(&path, &mut game).is_err());
        assert!(game.sessions().is_empty());
    }

    #[test]
    fn test_write_then_restore() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.bin");
        let mut original = game();
        original.join(&MapId::new("m"), "rex").unwrap();
        write_state(&path, &original).unwrap();

        let mut restored = game();
        assert_eq!(
            restore_or_fresh(&path, &mut restored).unwrap(),
            RestoreOutcome::Restored
        );
        assert_eq!(
            restored.state(&MapId::new("m")),
            original.state(&MapId::new("m"))
        );
    }
}
