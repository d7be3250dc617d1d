//! Benchmark for environment stepping
//!
//! Measures single-instance steps under a random policy, the vectorized
//! step across rayon workers, and mask computation.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use craftworld::actions::CompoundAction;
use craftworld::agent::{Policy, RandomPolicy};
use craftworld::core::{Config, CurriculumConfig, EnvConfig};
use craftworld::episode::{Env, VecEnv};

fn bench_env_step(c: &mut Criterion) {
    let mut env = Env::new(EnvConfig::default(), &CurriculumConfig::default()).unwrap();
    let mut policy = RandomPolicy::new(0);
    let mut observation = env.reset();

    c.bench_function("env_step_random_policy", |b| {
        b.iter(|| {
            let action = policy.act(&observation, &()).action;
            let result = env.step(black_box(&action)).unwrap();
            observation = if result.done {
                env.reset()
            } else {
                result.observation
            };
        })
    });
}

fn bench_vec_env_step(c: &mut Criterion) {
    let mut envs = VecEnv::new(&Config::default(), 16).unwrap();
    let mut policies: Vec<RandomPolicy> = (0..16).map(RandomPolicy::new).collect();
    let mut observations = envs.reset();

    c.bench_function("vec_env_step_16", |b| {
        b.iter(|| {
            let actions: Vec<_> = policies
                .iter_mut()
                .zip(&observations)
                .map(|(policy, observation)| policy.act(observation, &()).action)
                .collect();
            let results = envs.step(black_box(&actions)).unwrap();
            observations = results.into_iter().map(|r| r.observation).collect();
        })
    });
}

fn bench_mask(c: &mut Criterion) {
    let env = Env::new(EnvConfig::default(), &CurriculumConfig::default()).unwrap();
    let action = CompoundAction::NoWorkers;

    c.bench_function("compound_action_mask", |b| {
        b.iter(|| black_box(action.mask(black_box(env.dims()))))
    });
}

criterion_group!(benches, bench_env_step, bench_vec_env_step, bench_mask);
criterion_main!(benches);
