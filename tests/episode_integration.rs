//! Integration tests for failure replay and the curriculum
//!
//! These tests cover the episode driver across resets:
//! - Replay probability clamps at zero below the target success rate
//! - Replayed episodes reproduce the failed episode exactly
//! - Failure buffers stay bounded and survive a save/load cycle
//! - Curriculum levels never decrease and never pass the cap

use craftworld::agent::RawAction;
use craftworld::core::{CurriculumConfig, EnvConfig, ReplayConfig, WorldSize};
use craftworld::episode::{replay_probability, Curriculum, Env, FailureReplay};
use proptest::prelude::*;

fn replay_config(target_success_rate: f64, failure_buffer_size: usize) -> ReplayConfig {
    ReplayConfig {
        failure_buffer_size,
        target_success_rate,
        success_smoothing: 0.2,
        failure_buffer_load_path: None,
    }
}

fn fail(replay: &mut FailureReplay, times: usize) {
    for _ in 0..times {
        replay.begin();
        replay.finish(false);
    }
}

// ============================================================================
// Failure replay
// ============================================================================

/// Three stored failures, target 0.9, running average well below it:
/// the buffer is never sampled.
#[test]
fn test_replay_clamped_below_target() {
    assert_eq!(replay_probability(0.9, 0.3), 0.0);

    let mut replay = FailureReplay::new(&replay_config(0.9, 10), 7, false).unwrap();
    fail(&mut replay, 3);
    assert_eq!(replay.buffer().len(), 3);
    assert!(replay.success_avg() < 0.9);

    for _ in 0..50 {
        assert!(!replay.begin().replayed);
    }
    assert_eq!(replay.buffer().len(), 3);
}

#[test]
fn test_replayed_entry_leaves_then_returns_on_failure() {
    let mut replay = FailureReplay::new(&replay_config(0.0, 10), 7, false).unwrap();
    let first = replay.begin();
    replay.finish(false);
    assert_eq!(replay.buffer().len(), 1);

    let second = replay.begin();
    assert!(second.replayed);
    assert_eq!(second.rng, first.rng);
    assert!(replay.buffer().is_empty());

    replay.finish(false);
    assert_eq!(replay.buffer().len(), 1);

    replay.begin();
    replay.finish(true);
    assert!(replay.buffer().is_empty());
}

#[test]
fn test_evaluation_never_replays() {
    let mut replay = FailureReplay::new(&replay_config(0.0, 10), 7, true).unwrap();
    fail(&mut replay, 2);
    assert_eq!(replay.buffer().len(), 2);
    assert!(!replay.begin().replayed);
}

#[test]
fn test_failure_buffer_stays_bounded() {
    let mut replay = FailureReplay::new(&replay_config(1.0, 2), 7, false).unwrap();
    fail(&mut replay, 5);
    assert_eq!(replay.buffer().len(), 2);
}

#[test]
fn test_failure_buffer_save_and_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("failures.json");

    let mut replay = FailureReplay::new(&replay_config(1.0, 10), 7, false).unwrap();
    fail(&mut replay, 4);
    replay.save(&path).unwrap();

    let config = ReplayConfig {
        failure_buffer_load_path: Some(path),
        ..replay_config(1.0, 3)
    };
    let loaded = FailureReplay::new(&config, 99, false).unwrap();
    assert_eq!(loaded.buffer().len(), 3);
    let newest: Vec<_> = replay.buffer().iter().skip(1).collect();
    assert_eq!(loaded.buffer().iter().collect::<Vec<_>>(), newest);
}

/// Depth 1 makes every building a root, so no prerequisite lines appear
#[test]
fn test_initial_build_tree_depth_reaches_first_task() {
    let config = EnvConfig {
        world_size: WorldSize::new(4).unwrap(),
        num_workers: 1,
        min_lines: 10,
        max_lines: 10,
        ..EnvConfig::default()
    };

    let shallow = CurriculumConfig {
        initial_build_tree_depth: 1,
        ..CurriculumConfig::default()
    };
    let mut env = Env::new(config.clone(), &shallow).unwrap();
    assert_eq!(env.curriculum_setting().max_build_tree_depth, 1);
    for _ in 0..10 {
        env.reset();
        assert!(env.lines().unwrap().iter().all(|line| line.required));
    }

    let deep = CurriculumConfig {
        initial_build_tree_depth: 14,
        ..CurriculumConfig::default()
    };
    let mut env = Env::new(config, &deep).unwrap();
    assert_eq!(env.curriculum_setting().max_build_tree_depth, 14);
    let mut saw_prerequisite = false;
    for _ in 0..20 {
        env.reset();
        saw_prerequisite |= env.lines().unwrap().iter().any(|line| !line.required);
    }
    assert!(saw_prerequisite);
}

/// A failed episode comes back with the same instruction
#[test]
fn test_env_replays_failed_episode() {
    let config = EnvConfig {
        world_size: WorldSize::new(4).unwrap(),
        num_workers: 1,
        time_per_line: 2,
        replay: replay_config(0.0, 10),
        ..EnvConfig::default()
    };
    let mut env = Env::new(config, &CurriculumConfig::default()).unwrap();
    let noop = RawAction {
        a: vec![1; env.dims().rows()],
        ..RawAction::default()
    };

    let mut failed_lines = None;
    for _ in 0..20 {
        env.reset();
        let lines = env.lines().unwrap().to_vec();
        let info = loop {
            if let Some(info) = env.step(&noop).unwrap().info {
                break info;
            }
        };
        if !info.success {
            failed_lines = Some(lines);
            break;
        }
    }
    let failed_lines = failed_lines.expect("an idle episode should eventually fail");

    env.reset();
    assert_eq!(env.lines().unwrap(), failed_lines.as_slice());
    let info = loop {
        if let Some(info) = env.step(&noop).unwrap().info {
            break info;
        }
    };
    assert!(info.use_failure_buf);
    assert_eq!(info.success_without_failure_buf, None);
    assert_eq!(info.reward_without_failure_buf, None);
}

// ============================================================================
// Curriculum
// ============================================================================

fn curriculum_configs(log_dir: Option<std::path::PathBuf>) -> (EnvConfig, CurriculumConfig) {
    let env = EnvConfig {
        min_lines: 1,
        max_lines: 4,
        ..EnvConfig::default()
    };
    let curriculum = CurriculumConfig {
        threshold: 0.6,
        max_level: 5,
        smoothing: 0.5,
        log_dir,
        ..CurriculumConfig::default()
    };
    (env, curriculum)
}

proptest! {
    #[test]
    fn test_curriculum_level_monotone_and_capped(
        batches in prop::collection::vec(prop::collection::vec(any::<bool>(), 0..6), 0..60),
    ) {
        let (env, config) = curriculum_configs(None);
        let mut curriculum = Curriculum::new(&env, &config).unwrap();
        let mut level = curriculum.level();
        for batch in batches {
            curriculum.record(&batch).unwrap();
            let setting = curriculum.setting();
            prop_assert!(setting.level >= level);
            prop_assert!(setting.level <= config.max_level);
            prop_assert!(setting.n_lines_space.high <= env.max_lines);
            level = setting.level;
        }
    }
}

#[test]
fn test_curriculum_resumes_from_persisted_setting() {
    let dir = tempfile::tempdir().unwrap();
    let (env, config) = curriculum_configs(Some(dir.path().to_path_buf()));
    let mut curriculum = Curriculum::new(&env, &config).unwrap();
    for _ in 0..10 {
        curriculum.record(&[true, true]).unwrap();
    }
    let reached = curriculum.setting();
    assert!(reached.level > 0);

    let resumed_config = CurriculumConfig {
        setting_load_path: Some(dir.path().join("curriculum_setting.json")),
        log_dir: None,
        ..config
    };
    let resumed = Curriculum::new(&env, &resumed_config).unwrap();
    assert_eq!(resumed.setting(), reached);
}
