//Copyright 2024 Felix Engl
//
//Licensed under the Apache License, Version 2.0 (the "License");
//you may not use this file except in compliance with the License.
//You may obtain a copy of the License at
//
//    http://www.apache.org/licenses/LICENSE-2.0
//
//Unless required by applicable law or agreed to in writing, software
//distributed under the License is distributed on an "AS IS" BASIS,
//WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//See the License for the specific language governing permissions and
//limitations under the License.

use crate::gibbs::errors::StateConsistencyError;
use crate::gibbs::random::UniformSource;
use crate::gibbs::sampler::TopicSampler;
use crate::gibbs::state::CountState;

/// Reassigns the topic of every occurrence once per sweep.
#[derive(Debug, Clone)]
pub struct SweepEngine {
    /// The number of finished sweeps.
    completed: usize,
    cumulative: Vec<f64>,
}

impl SweepEngine {
    pub fn new(topic_count: usize) -> Self {
        Self { completed: 0, cumulative: vec![0.0; topic_count] }
    }

    /// The 0-based index of the last finished sweep, `None` before the first one.
    pub fn iteration(&self) -> Option<usize> {
        self.completed.checked_sub(1)
    }

    pub fn completed_sweeps(&self) -> usize {
        self.completed
    }

    /// Removes, resamples and adds back every occurrence in document, term and
    /// repetition order. Returns the 0-based index of the finished sweep.
    pub fn sweep<R>(&mut self, state: &mut CountState, sampler: &TopicSampler, random: &mut R) -> Result<usize, StateConsistencyError>
    where
        R: UniformSource + ?Sized
    {
        for document in 0..state.document_count() {
            for occurrence in state.occurrences_of(document) {
                let term = state.term_of(occurrence);
                state.remove(document, term, occurrence)?;
                let topic = sampler.sample_topic(state, document, term, &mut self.cumulative, random);
                state.add(document, term, occurrence, topic)?;
            }
        }
        let iteration = self.completed;
        self.completed += 1;
        log::debug!("Finished sweep {iteration}.");
        Ok(iteration)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::gibbs::random::ScriptedSource;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn corpus() -> Vec<Vec<u32>> {
        vec![vec![2, 0, 1], vec![0, 3, 1]]
    }

    #[test]
    fn sweeps_keep_the_counts_consistent() {
        let _ = env_logger::builder().is_test(true).try_init();
        let mut random = StdRng::seed_from_u64(42);
        let mut state = CountState::initialize(&corpus(), 2, &mut random).unwrap();
        let sampler = TopicSampler::new(1.0, 1.0, state.term_count());
        let mut engine = SweepEngine::new(2);
        assert_eq!(None, engine.iteration());
        for expected in 0..25 {
            assert_eq!(expected, engine.sweep(&mut state, &sampler, &mut random).unwrap());
            state.check_consistency().unwrap();
            assert_eq!(&vec![3, 4], state.document_topic_sums());
            assert_eq!(7, state.topic_term_sums().iter().sum::<usize>());
        }
        assert_eq!(Some(24), engine.iteration());
        assert_eq!(25, engine.completed_sweeps());
    }

    #[test]
    fn a_sweep_draws_once_per_occurrence() {
        let mut random = ScriptedSource::new(vec![0.3]);
        let mut state = CountState::initialize(&corpus(), 3, &mut random).unwrap();
        let before = random.consumed();
        let sampler = TopicSampler::new(0.1, 0.1, state.term_count());
        SweepEngine::new(3).sweep(&mut state, &sampler, &mut random).unwrap();
        assert_eq!(7, before);
        assert_eq!(14, random.consumed());
    }

    #[test]
    fn same_draws_give_the_same_trajectory() {
        let run = || {
            let mut random = StdRng::seed_from_u64(3);
            let mut state = CountState::initialize(&corpus(), 2, &mut random).unwrap();
            let sampler = TopicSampler::new(0.5, 0.5, state.term_count());
            let mut engine = SweepEngine::new(2);
            let mut trajectory = vec![state.occurrence_topics().to_vec()];
            for _ in 0..10 {
                engine.sweep(&mut state, &sampler, &mut random).unwrap();
                trajectory.push(state.occurrence_topics().to_vec());
            }
            trajectory
        };
        assert_eq!(run(), run());
    }
}
