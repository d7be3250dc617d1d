//! Craftworld - interactive play
//!
//! Plays the build-order environment from the terminal. Each tick prompts
//! for the next selection of the current action stage; an empty line
//! submits nothing and lets the world tick.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use craftworld::actions::read_components;
use craftworld::agent::RawAction;
use craftworld::core::error::Result;
use craftworld::core::Config;
use craftworld::episode::{Env, State};

#[derive(Parser, Debug)]
#[command(name = "craftworld")]
#[command(about = "Play the build-order environment by hand")]
struct Args {
    /// TOML config; built-in defaults when omitted
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Override the configured seed
    #[arg(long)]
    seed: Option<u64>,

    /// Evaluation mode: no time limit, no failure replay
    #[arg(long)]
    evaluating: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("craftworld=info")),
        )
        .init();

    let args = Args::parse();
    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(seed) = args.seed {
        config.env.seed = seed;
    }
    config.env.evaluating |= args.evaluating;

    let mut env = Env::new(config.env, &config.curriculum)?;
    env.reset();

    let stdin = io::stdin();
    let mut reader = stdin.lock();
    let stdout = io::stdout();
    let mut writer = stdout.lock();

    loop {
        let Some(state) = env.state() else {
            break;
        };
        render(&env, state, &mut writer)?;
        let action = state.action.clone();
        let Some(components) = read_components(&action, env.dims(), &mut reader, &mut writer)?
        else {
            break;
        };
        let raw = RawAction {
            a: action.encode(&components, env.dims()),
            ..RawAction::default()
        };
        let result = env.step(&raw)?;
        writeln!(writer, "Reward: {}", result.reward)?;
        if let Some(info) = result.info {
            writeln!(writer, "{}", serde_json::to_string_pretty(&info)?)?;
            write!(writer, "Play again? [y/N] ")?;
            writer.flush()?;
            let mut answer = String::new();
            reader.read_line(&mut answer)?;
            if !answer.trim().eq_ignore_ascii_case("y") {
                break;
            }
            env.reset();
        }
    }
    Ok(())
}

fn render(env: &Env, state: &State, out: &mut impl Write) -> io::Result<()> {
    writeln!(out)?;
    if let Some(lines) = env.lines() {
        for (i, line) in lines.iter().enumerate() {
            let marker = if line.required { "*" } else { " " };
            writeln!(out, "{i:2}{marker} {}", line.building)?;
        }
    }

    let world = &state.world;
    let side = world.size.side() as i32;
    for i in 0..side {
        let mut row = Vec::with_capacity(side as usize);
        for j in 0..side {
            let coord = craftworld::core::Coord::new(i, j);
            let mut cell = String::new();
            if let Some(building) = world.buildings.get(&coord) {
                cell.push_str(building.symbol());
            } else if let Some(building) = world.pending.get(&coord) {
                cell.push_str(&building.symbol().to_lowercase());
            }
            if let Some(resource) = world.positions.resource_on(coord) {
                cell.push_str(resource.symbol());
            }
            for (worker, at) in world.positions.workers() {
                if at == coord {
                    cell.push_str(&worker.symbol());
                }
            }
            if cell.is_empty() {
                cell.push('.');
            }
            row.push(format!("{cell:>4}"));
        }
        writeln!(out, "{}", row.join(""))?;
    }

    writeln!(
        out,
        "Minerals: {}  Gas: {}  Time remaining: {}",
        world.stockpile.minerals, world.stockpile.gas, state.time_remaining
    )?;
    if let Some(reason) = &state.rejection {
        writeln!(out, "Rejected: {reason}")?;
    }
    writeln!(out, "Action: {:?}", state.action)
}
