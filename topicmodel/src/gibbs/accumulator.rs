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

use ldagibbs_toolkit::argument::assert_is_positive;
use crate::gibbs::errors::InvalidInputError;
use crate::gibbs::state::CountState;
use crate::model::LdaResult;

/// Decides which sweeps are samples of the model parameters and averages them.
///
/// Until [finalize](SampleAccumulator::finalize) the probabilities in the result
/// are the sum over all samples taken so far.
#[derive(Debug, Clone)]
pub struct SampleAccumulator {
    alpha: f64,
    beta: f64,
    burn_in_iterations: usize,
    iterations_per_sample: usize,
    result: LdaResult,
    finalized: bool,
}

impl SampleAccumulator {
    pub fn new(
        state: &CountState,
        alpha: f64,
        beta: f64,
        burn_in_iterations: usize,
        iterations_per_sample: usize
    ) -> Result<Self, InvalidInputError> {
        let alpha = assert_is_positive("alpha", alpha)?;
        let beta = assert_is_positive("beta", beta)?;
        let iterations_per_sample = assert_is_positive("iterations_per_sample", iterations_per_sample)?;
        Ok(Self {
            alpha,
            beta,
            burn_in_iterations,
            iterations_per_sample,
            result: LdaResult::empty(
                state.topic_count(),
                state.document_lengths(),
                state.term_frequencies(),
            ),
            finalized: false,
        })
    }

    /// True if the sweep with the 0-based `iteration` is a sample.
    pub fn is_sample_iteration(&self, iteration: usize) -> bool {
        iteration >= self.burn_in_iterations
            && (iteration - self.burn_in_iterations) % self.iterations_per_sample == 0
    }

    /// Reads the parameters if `iteration` is a sample. Returns true if a sample was taken.
    pub fn maybe_sample(&mut self, iteration: usize, state: &CountState) -> bool {
        if self.is_sample_iteration(iteration) {
            self.read_parameters(state);
            log::debug!("Took sample {} at iteration {iteration}.", self.result.sample_count);
            true
        } else {
            false
        }
    }

    /// Adds the current parameter estimates to the sums.
    pub fn read_parameters(&mut self, state: &CountState) {
        debug_assert!(!self.finalized, "Sampling after finalize mixes averages with sums!");
        self.result.sample_count += 1;

        let beta = self.beta;
        let term_count_times_beta = state.term_count() as f64 * beta;
        for (topic, probabilities) in self.result.topic_term_probabilities.iter_mut().enumerate() {
            let denominator = state.topic_term_sum(topic) as f64 + term_count_times_beta;
            for (term, probability) in probabilities.iter_mut().enumerate() {
                *probability += (state.topic_term_count(topic, term) as f64 + beta) / denominator;
            }
        }

        let alpha = self.alpha;
        let topic_count_times_alpha = state.topic_count() as f64 * alpha;
        for (document, probabilities) in self.result.document_topic_probabilities.iter_mut().enumerate() {
            let denominator = state.document_topic_sum(document) as f64 + topic_count_times_alpha;
            for (topic, probability) in probabilities.iter_mut().enumerate() {
                *probability += (state.document_topic_count(document, topic) as f64 + alpha) / denominator;
            }
        }
    }

    /// Makes sure there is at least one sample and turns the sums into averages.
    pub fn finalize(&mut self, state: &CountState) {
        if self.finalized {
            log::warn!("The samples are already finalized.");
            return;
        }
        if self.result.sample_count == 0 {
            log::debug!("No sample was taken so far, take one now.");
            self.read_parameters(state);
        } else if self.result.sample_count > 1 {
            let samples = self.result.sample_count as f64;
            self.result.topic_term_probabilities
                .iter_mut()
                .chain(self.result.document_topic_probabilities.iter_mut())
                .flat_map(|row| row.iter_mut())
                .for_each(|value| *value /= samples);
        }
        self.finalized = true;
    }

    pub fn sample_count(&self) -> usize {
        self.result.sample_count
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// The (possibly not yet averaged) result.
    pub fn result(&self) -> &LdaResult {
        &self.result
    }

    pub fn into_result(self) -> LdaResult {
        self.result
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::gibbs::random::ScriptedSource;
    use approx::assert_relative_eq;

    fn state() -> CountState {
        let corpus = vec![vec![2u32, 0, 1], vec![0, 3, 1]];
        // topics of the occurrences: 0, 0, 0, 1, 1, 1, 0
        CountState::initialize(&corpus, 2, &mut ScriptedSource::new(vec![0.1, 0.1, 0.1, 0.6, 0.6, 0.6, 0.1])).unwrap()
    }

    #[test]
    fn schedule_starts_after_burn_in() {
        let accumulator = SampleAccumulator::new(&state(), 1.0, 1.0, 2, 3).unwrap();
        let eligible = (0..12).filter(|&it| accumulator.is_sample_iteration(it)).collect::<Vec<_>>();
        assert_eq!(vec![2, 5, 8, 11], eligible);

        let accumulator = SampleAccumulator::new(&state(), 1.0, 1.0, 0, 1).unwrap();
        assert!((0..5).all(|it| accumulator.is_sample_iteration(it)));
    }

    #[test]
    fn illegal_schedules_are_rejected() {
        let state = state();
        assert!(matches!(
            SampleAccumulator::new(&state, 1.0, 1.0, 2, 0),
            Err(InvalidInputError::IllegalParameter(err)) if err.name == "iterations_per_sample"
        ));
        assert!(matches!(
            SampleAccumulator::new(&state, 0.0, 1.0, 2, 1),
            Err(InvalidInputError::IllegalParameter(err)) if err.name == "alpha"
        ));
        assert!(SampleAccumulator::new(&state, 1.0, 1.0, 0, 1).is_ok());
    }

    #[test]
    fn estimates_are_smoothed_counts() {
        let state = state();
        let mut accumulator = SampleAccumulator::new(&state, 1.0, 1.0, 0, 1).unwrap();
        assert!(accumulator.maybe_sample(0, &state));
        accumulator.finalize(&state);
        let result = accumulator.result();
        assert_eq!(1, result.sample_count());
        // topic 0 holds terms 0, 0, 2, 2
        assert_relative_eq!(3.0 / 7.0, result.topic_term_probabilities()[0][0]);
        assert_relative_eq!(1.0 / 7.0, result.topic_term_probabilities()[0][1]);
        assert_relative_eq!(3.0 / 7.0, result.topic_term_probabilities()[0][2]);
        // document 1 has one occurrence in topic 0 and three in topic 1
        assert_relative_eq!(2.0 / 6.0, result.document_topic_probabilities()[1][0]);
        assert_relative_eq!(4.0 / 6.0, result.document_topic_probabilities()[1][1]);
    }

    #[test]
    fn finalize_forces_a_single_sample() {
        let state = state();
        let mut accumulator = SampleAccumulator::new(&state, 0.5, 0.5, 100, 10).unwrap();
        assert!(!accumulator.maybe_sample(3, &state));
        assert_eq!(0, accumulator.sample_count());
        accumulator.finalize(&state);
        assert_eq!(1, accumulator.sample_count());
        accumulator.finalize(&state);
        assert_eq!(1, accumulator.sample_count());
        assert!(accumulator.is_finalized());
    }

    #[test]
    fn finalize_averages_multiple_samples() {
        let state = state();
        let mut single = SampleAccumulator::new(&state, 1.0, 1.0, 0, 1).unwrap();
        single.read_parameters(&state);
        single.finalize(&state);

        let mut triple = SampleAccumulator::new(&state, 1.0, 1.0, 0, 1).unwrap();
        for iteration in 0..3 {
            triple.maybe_sample(iteration, &state);
        }
        assert_relative_eq!(3.0 * 3.0 / 7.0, triple.result().topic_term_probabilities()[0][0]);
        triple.finalize(&state);
        assert_eq!(3, triple.sample_count());
        let triple = triple.into_result();
        let single = single.into_result();
        for (a, b) in triple.topic_term_probabilities().iter().flatten().zip(single.topic_term_probabilities().iter().flatten()) {
            assert_relative_eq!(*a, *b, epsilon = 1e-12);
        }
        for (a, b) in triple.document_topic_probabilities().iter().flatten().zip(single.document_topic_probabilities().iter().flatten()) {
            assert_relative_eq!(*a, *b, epsilon = 1e-12);
        }
    }
}
