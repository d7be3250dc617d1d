//! Failure replay - resample the initial PRNG states of failed episodes
//!
//! Replay probability is `max(0, 1 - target / success_avg)`: once the agent
//! succeeds more often than the target, a growing share of resets replay a
//! stored failure instead of drawing a fresh episode.

use std::collections::VecDeque;
use std::path::Path;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::core::config::ReplayConfig;
use crate::core::error::Result;

/// Bounded FIFO of entries; pushing into a full buffer evicts the oldest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureBuffer<S> {
    entries: VecDeque<S>,
    capacity: usize,
}

impl<S> FailureBuffer<S> {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn push(&mut self, entry: S) {
        if self.capacity == 0 {
            return;
        }
        while self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    /// Remove and return the entry at `index`
    pub fn take(&mut self, index: usize) -> Option<S> {
        self.entries.remove(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &S> {
        self.entries.iter()
    }
}

impl<S: Serialize> FailureBuffer<S> {
    /// Write the entries as JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        let file = std::fs::File::create(path)?;
        serde_json::to_writer(std::io::BufWriter::new(file), &self.entries)?;
        Ok(())
    }
}

impl<S: DeserializeOwned> FailureBuffer<S> {
    /// Read entries saved by [`FailureBuffer::save`]
    ///
    /// Entries are not checked against the current configuration. Only the
    /// newest `capacity` entries are kept.
    pub fn load(path: &Path, capacity: usize) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let entries: Vec<S> = serde_json::from_reader(std::io::BufReader::new(file))?;
        let mut buffer = Self::new(capacity);
        for entry in entries {
            buffer.push(entry);
        }
        Ok(buffer)
    }
}

/// Probability of replaying a stored failure, clamped at 0
pub fn replay_probability(target_success_rate: f64, success_avg: f64) -> f64 {
    if success_avg <= 0.0 {
        return 0.0;
    }
    (1.0 - target_success_rate / success_avg).max(0.0)
}

/// Where an episode's randomness comes from
#[derive(Debug, Clone)]
pub struct EpisodeSeed {
    pub rng: ChaCha8Rng,
    pub replayed: bool,
}

/// Schedules fresh and replayed episodes for one environment instance
#[derive(Debug, Clone)]
pub struct FailureReplay {
    buffer: FailureBuffer<ChaCha8Rng>,
    /// Drives the replay decision and entry choice
    decision_rng: ChaCha8Rng,
    /// Fresh episodes are forked from this stream
    fresh_rng: ChaCha8Rng,
    success_avg: f64,
    smoothing: f64,
    target_success_rate: f64,
    evaluating: bool,
    current: Option<EpisodeSeed>,
}

impl FailureReplay {
    pub fn new(config: &ReplayConfig, seed: u64, evaluating: bool) -> Result<Self> {
        let buffer = match &config.failure_buffer_load_path {
            Some(path) => {
                let buffer = FailureBuffer::load(path, config.failure_buffer_size)?;
                tracing::info!(
                    "Loaded failure buffer of length {} from {}",
                    buffer.len(),
                    path.display()
                );
                buffer
            }
            None => FailureBuffer::new(config.failure_buffer_size),
        };
        let mut fresh_rng = ChaCha8Rng::seed_from_u64(seed);
        let decision_rng = fork(&mut fresh_rng);
        Ok(Self {
            buffer,
            decision_rng,
            fresh_rng,
            success_avg: 0.5,
            smoothing: config.success_smoothing,
            target_success_rate: config.target_success_rate,
            evaluating,
            current: None,
        })
    }

    pub fn success_avg(&self) -> f64 {
        self.success_avg
    }

    pub fn buffer(&self) -> &FailureBuffer<ChaCha8Rng> {
        &self.buffer
    }

    /// Choose the next episode's PRNG
    ///
    /// A replayed entry leaves the buffer; a fresh episode forks a new
    /// stream and advances the fresh one. A replayed episode abandoned
    /// before `finish` goes back into the buffer.
    pub fn begin(&mut self) -> EpisodeSeed {
        if let Some(abandoned) = self.current.take() {
            if abandoned.replayed {
                self.buffer.push(abandoned.rng);
            }
        }

        let replay = !self.evaluating
            && !self.buffer.is_empty()
            && self.decision_rng.gen::<f64>()
                < replay_probability(self.target_success_rate, self.success_avg);

        let replayed = if replay {
            let index = self.decision_rng.gen_range(0..self.buffer.len());
            self.buffer.take(index)
        } else {
            None
        };
        let seed = match replayed {
            Some(rng) => EpisodeSeed { rng, replayed: true },
            None => EpisodeSeed {
                rng: fork(&mut self.fresh_rng),
                replayed: false,
            },
        };
        self.current = Some(seed.clone());
        seed
    }

    /// Record the outcome of the episode started by the last `begin`
    ///
    /// Failures, replayed or not, go back into the buffer.
    pub fn finish(&mut self, success: bool) {
        let outcome = if success { 1.0 } else { 0.0 };
        self.success_avg += self.smoothing * (outcome - self.success_avg);
        if let Some(current) = self.current.take() {
            if !success {
                self.buffer.push(current.rng);
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        self.buffer.save(path)
    }
}

fn fork(rng: &mut ChaCha8Rng) -> ChaCha8Rng {
    let mut seed = <ChaCha8Rng as SeedableRng>::Seed::default();
    rng.fill(&mut seed[..]);
    ChaCha8Rng::from_seed(seed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(size: usize, target: f64) -> ReplayConfig {
        ReplayConfig {
            failure_buffer_size: size,
            target_success_rate: target,
            success_smoothing: 0.05,
            failure_buffer_load_path: None,
        }
    }

    #[test]
    fn test_replay_probability_clamped() {
        assert_eq!(replay_probability(0.9, 0.3), 0.0);
        assert_eq!(replay_probability(0.9, 0.0), 0.0);
        assert!((replay_probability(0.5, 1.0) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_buffer_evicts_oldest() {
        let mut buffer = FailureBuffer::new(3);
        for i in 0..5 {
            buffer.push(i);
            assert!(buffer.len() <= 3);
        }
        assert_eq!(buffer.iter().copied().collect::<Vec<_>>(), vec![2, 3, 4]);
        assert_eq!(buffer.take(1), Some(3));
        assert_eq!(buffer.len(), 2);
    }

    #[test]
    fn test_failures_are_buffered() {
        let mut replay = FailureReplay::new(&config(10, 0.8), 0, false).unwrap();
        let seed = replay.begin();
        assert!(!seed.replayed);
        replay.finish(false);
        assert_eq!(replay.buffer().len(), 1);
        assert!((replay.success_avg() - 0.475).abs() < 1e-12);

        replay.begin();
        replay.finish(true);
        assert_eq!(replay.buffer().len(), 1);
    }

    #[test]
    fn test_replayed_state_reproduces_episode() {
        let mut replay = FailureReplay::new(&config(10, 0.0), 3, false).unwrap();
        let first = replay.begin();
        replay.finish(false);
        // Target 0 replays whenever the buffer is non-empty
        let second = replay.begin();
        assert!(second.replayed);
        assert_eq!(replay.buffer().len(), 0);
        let (mut a, mut b) = (first.rng, second.rng);
        assert_eq!(a.gen::<u64>(), b.gen::<u64>());
    }

    #[test]
    fn test_abandoned_replay_returns_to_buffer() {
        let mut replay = FailureReplay::new(&config(10, 0.0), 4, false).unwrap();
        let first = replay.begin();
        replay.finish(false);
        assert!(replay.begin().replayed);
        assert!(replay.buffer().is_empty());

        // Reset mid-episode without finishing
        let again = replay.begin();
        assert!(again.replayed);
        let (mut a, mut b) = (first.rng, again.rng);
        assert_eq!(a.gen::<u64>(), b.gen::<u64>());

        // An abandoned fresh episode is not recorded
        let mut fresh = FailureReplay::new(&config(10, 0.0), 4, false).unwrap();
        fresh.begin();
        assert!(!fresh.begin().replayed);
        assert!(fresh.buffer().is_empty());
    }

    #[test]
    fn test_evaluation_never_replays() {
        let mut replay = FailureReplay::new(&config(10, 0.0), 0, true).unwrap();
        replay.begin();
        replay.finish(false);
        assert!(!replay.begin().replayed);
    }

    #[test]
    fn test_buffer_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("failures.json");
        let mut replay = FailureReplay::new(&config(10, 0.8), 1, false).unwrap();
        for _ in 0..4 {
            replay.begin();
            replay.finish(false);
        }
        replay.save(&path).unwrap();

        let mut loaded_config = config(2, 0.8);
        loaded_config.failure_buffer_load_path = Some(path);
        let loaded = FailureReplay::new(&loaded_config, 1, false).unwrap();
        assert_eq!(loaded.buffer().len(), 2);
        let newest: Vec<_> = replay.buffer().iter().skip(2).cloned().collect();
        assert_eq!(loaded.buffer().iter().cloned().collect::<Vec<_>>(), newest);
    }
}
