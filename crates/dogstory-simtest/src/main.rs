//! Dog Story Headless Simulation Harness
//!
//! Loads a game config, optionally restores a state file, and runs the game on
//! the simulation host with a handful of bot dogs making random moves.
//! Runs entirely in-process: no networking, no rendering.
//!
//! Usage:
//!   cargo run -p dogstory-simtest -- --config-file data/config.json
//!   cargo run -p dogstory-simtest -- --config-file data/config.json \
//!     --tick-period 50 --run-for 10 --state-file /tmp/dogstory.bin --save-state-period 1000
//!
//! Without `--tick-period` the harness drives ticks itself in simulated time,
//! so `--run-for` finishes instantly. Log level comes from `RUST_LOG`.

use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;
use std::thread;
use std::time::{Duration, Instant};

use clap::Parser;
use dogstory_core::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing_subscriber::EnvFilter;

/// Simulated time advanced per harness-driven tick
const MANUAL_TICK: Duration = Duration::from_millis(50);

/// Headless Dog Story game run
#[derive(Parser, Debug)]
#[command(name = "dogstory-simtest")]
#[command(about = "Run a Dog Story game with bot players")]
struct Args {
    /// Game config JSON
    #[arg(long, short = 'c')]
    config_file: PathBuf,

    /// Automatic tick period in milliseconds; omit to tick from the harness
    #[arg(long, short = 't')]
    tick_period: Option<u64>,

    /// State file to restore from and save to
    #[arg(long)]
    state_file: Option<PathBuf>,

    /// Save the state file every N milliseconds of game time (0: only on exit)
    #[arg(long, default_value_t = 0, requires = "state_file")]
    save_state_period: u64,

    /// Spawn dogs at random road points
    #[arg(long)]
    randomize_spawn_points: bool,

    /// Seed for sessions and bots
    #[arg(long)]
    seed: Option<u64>,

    /// Number of bot dogs
    #[arg(long, default_value_t = 4)]
    bots: usize,

    /// Game time to run, in seconds
    #[arg(long, default_value_t = 30)]
    run_for: u64,
}

fn main() -> ExitCode {
    init_tracing();
    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}

fn run(args: &Args) -> Result<(), Box<dyn Error>> {
    let mut config = load_config(&args.config_file)?;
    config.settings.randomize_spawn_points = args.randomize_spawn_points;
    config.settings.seed = args.seed;
    let mut game = config.into_game()?;

    if let Some(path) = &args.state_file {
        // Restore is all-or-nothing, so on failure `game` is still the fresh config
        if let Err(e) = restore_or_fresh(path, &mut game) {
            log::warn!("Ignoring state file {}: {}", path.display(), e);
        }
        game.add_observer(Box::new(StateFile::new(
            path,
            Duration::from_millis(args.save_state_period),
        )));
    }

    let map_ids: Vec<MapId> = game.maps().iter().map(|m| m.id().clone()).collect();
    if map_ids.is_empty() {
        return Err("config has no maps".into());
    }
    let bots = join_bots(&mut game, &map_ids, args.bots)?;

    let tick_period = args.tick_period.map(Duration::from_millis);
    let host = SimulationHost::spawn(game, HostConfig { tick_period })?;
    let client = host.client();
    let run_for = Duration::from_secs(args.run_for);
    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    println!("=== Dog Story Simulation Harness ===\n");
    let started = Instant::now();
    let mut simulated = Duration::ZERO;
    let mut steps = 0u64;
    while simulated < run_for {
        // Bots that retired simply stop sending moves
        for (map_id, dog_id) in &bots {
            let _ = client.move_dog(map_id, *dog_id, random_command(&mut rng));
        }
        match tick_period {
            Some(period) => {
                thread::sleep(period);
                simulated = started.elapsed();
            }
            None => {
                client.tick(MANUAL_TICK)?;
                simulated += MANUAL_TICK;
            }
        }
        steps += 1;
        if host.is_finished() {
            break;
        }
    }
    log::info!("Ran {} bot steps over {:.1}s of game time", steps, simulated.as_secs_f64());

    let game = host.shutdown()?;
    print_summary(&game);
    Ok(())
}

/// Join `count` bots round-robin across maps. Bots already present in a
/// restored game are picked up by name.
fn join_bots(
    game: &mut Game,
    map_ids: &[MapId],
    count: usize,
) -> Result<Vec<(MapId, DogId)>, GameError> {
    let mut bots = Vec::with_capacity(count);
    for i in 0..count {
        let map_id = &map_ids[i % map_ids.len()];
        let name = format!("bot{i}");
        let existing = game
            .find_session(map_id)
            .and_then(|s| s.dog_by_name(&name))
            .map(|dog| dog.id);
        let dog_id = match existing {
            Some(id) => id,
            None => game.join(map_id, &name)?.dog_id,
        };
        bots.push((map_id.clone(), dog_id));
    }
    Ok(bots)
}

fn random_command(rng: &mut impl Rng) -> MoveCommand {
    match rng.gen_range(0..5) {
        0 => MoveCommand::Left,
        1 => MoveCommand::Right,
        2 => MoveCommand::Up,
        3 => MoveCommand::Down,
        _ => MoveCommand::Stand,
    }
}

fn print_summary(game: &Game) {
    // ── Sessions ──
    for session in game.sessions() {
        let state = session.state();
        println!(
            "Map {} ({}): {} dogs, {} loot on the ground",
            session.map_id(),
            session.map().name(),
            session.dog_count(),
            session.loot_count()
        );
        for dog in &state.dogs {
            println!(
                "  #{:<3} {:<10} score {:>5}  bag {}  at ({:.2}, {:.2}) facing {}",
                dog.id.0,
                dog.name,
                dog.score,
                dog.bag.len(),
                dog.position.x,
                dog.position.y,
                dog.direction.as_str()
            );
        }
    }

    // ── Leaderboard ──
    println!();
    let records = game.records(0, 10);
    if records.is_empty() {
        println!("Leaderboard is empty");
        return;
    }
    println!("Leaderboard:");
    for (rank, record) in records.iter().enumerate() {
        println!(
            "  {:>2}. {:<10} {:>5} points  {:.1}s",
            rank + 1,
            record.name,
            record.score,
            record.play_time.as_secs_f64()
        );
    }
}
