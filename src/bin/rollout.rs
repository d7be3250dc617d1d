//! Headless rollout
//!
//! Runs a mask-respecting random policy over a vectorized environment and
//! prints a JSON summary of the finished episodes.

use std::path::PathBuf;

use clap::Parser;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use craftworld::agent::{Policy, RandomPolicy};
use craftworld::core::error::Result;
use craftworld::core::Config;
use craftworld::episode::VecEnv;
use craftworld::core::SubtaskConfig;
use craftworld::subtask::{LowerAction, Subtask, SubtaskAction, SubtaskEnv};

#[derive(Parser, Debug)]
#[command(name = "rollout")]
#[command(about = "Roll out a random policy and report episode statistics")]
struct Args {
    /// TOML config; built-in defaults when omitted
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Parallel environment instances
    #[arg(long, default_value_t = 8)]
    num_envs: usize,

    /// Vectorized steps to run
    #[arg(long, default_value_t = 1000)]
    steps: usize,

    /// Override the configured seed
    #[arg(long)]
    seed: Option<u64>,

    /// Roll out the subtask (room-crossing) environment instead
    #[arg(long)]
    subtask: bool,

    /// Save each instance's failure buffer here when done
    #[arg(long)]
    save_dir: Option<PathBuf>,
}

#[derive(Debug, Default, Serialize)]
struct RolloutSummary {
    episodes: usize,
    successes: usize,
    success_rate: f64,
    mean_progress: f64,
    mean_instruction_len: f64,
    replayed: usize,
    curriculum_level: u32,
}

impl RolloutSummary {
    fn record(&mut self, success: bool, progress: f64, instruction_len: usize, replayed: bool) {
        self.episodes += 1;
        self.successes += usize::from(success);
        self.mean_progress += progress;
        self.mean_instruction_len += instruction_len as f64;
        self.replayed += usize::from(replayed);
    }

    fn finish(mut self) -> Self {
        if self.episodes > 0 {
            let n = self.episodes as f64;
            self.success_rate = self.successes as f64 / n;
            self.mean_progress /= n;
            self.mean_instruction_len /= n;
        }
        self
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("craftworld=warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(seed) = args.seed {
        config.env.seed = seed;
        config.subtask.seed = seed;
    }

    let summary = if args.subtask {
        rollout_subtask(&config, &args)?
    } else {
        rollout_build_order(&config, &args)?
    };
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn rollout_build_order(config: &Config, args: &Args) -> Result<RolloutSummary> {
    let mut envs = VecEnv::new(config, args.num_envs)?;
    let mut policies: Vec<RandomPolicy> = (0..envs.len())
        .map(|rank| RandomPolicy::new(config.env.seed.wrapping_add(rank as u64)))
        .collect();
    let mut observations = envs.reset();
    let mut summary = RolloutSummary::default();

    for _ in 0..args.steps {
        let actions = policies
            .iter_mut()
            .zip(&observations)
            .map(|(policy, observation)| policy.act(observation, &()).action)
            .collect::<Vec<_>>();
        let results = envs.step(&actions)?;
        for info in results.iter().filter_map(|r| r.info.as_ref()) {
            summary.record(info.success, info.progress, info.instruction_len, info.use_failure_buf);
        }
        observations = results.into_iter().map(|r| r.observation).collect();
    }

    summary.curriculum_level = envs.curriculum_setting().level;
    if let Some(dir) = &args.save_dir {
        envs.save_failure_buffers(dir)?;
    }
    Ok(summary.finish())
}

fn rollout_subtask(config: &Config, args: &Args) -> Result<RolloutSummary> {
    let mut summary = RolloutSummary::default();
    for rank in 0..args.num_envs {
        let seed = config.subtask.seed.wrapping_add(rank as u64);
        let mut env = SubtaskEnv::new(SubtaskConfig {
            seed,
            ..config.subtask.clone()
        })?;
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        env.reset();
        for _ in 0..args.steps {
            let action = SubtaskAction {
                upper: rng.gen_range(0..Subtask::ALL.len()),
                lower: rng.gen_range(0..LowerAction::ALL.len()),
                ..SubtaskAction::default()
            };
            let result = env.step(&action)?;
            if let Some(info) = result.info {
                summary.record(info.success, info.progress, info.instruction_len, info.use_failure_buf);
                env.reset();
            }
        }
        if let Some(dir) = &args.save_dir {
            std::fs::create_dir_all(dir)?;
            env.save_failure_buffer(&dir.join(format!("subtask_failure_buffer_{rank}.json")))?;
        }
    }
    Ok(summary.finish())
}
