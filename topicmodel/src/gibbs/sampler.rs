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

use crate::gibbs::random::UniformSource;
use crate::gibbs::state::CountState;
use crate::model::{DocumentId, TermId, TopicId};

/// Draws the topic of an occurrence from the collapsed conditional
/// `(n_kt + beta) * (n_dk + alpha) / (n_k + T * beta)`.
///
/// The counts must not contain the occurrence that is resampled.
#[derive(Debug, Copy, Clone)]
pub struct TopicSampler {
    alpha: f64,
    beta: f64,
    term_count_times_beta: f64,
}

impl TopicSampler {
    pub fn new(alpha: f64, beta: f64, term_count: usize) -> Self {
        Self { alpha, beta, term_count_times_beta: term_count as f64 * beta }
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn beta(&self) -> f64 {
        self.beta
    }

    /// Fills `cumulative` with the cumulative unnormalized topic weights for `term` in `document`.
    /// `cumulative` needs exactly one slot per topic.
    pub fn cumulative_proportions(&self, state: &CountState, document: DocumentId, term: TermId, cumulative: &mut [f64]) {
        debug_assert_eq!(state.topic_count(), cumulative.len());
        let mut sum = 0.0;
        for (topic, slot) in cumulative.iter_mut().enumerate() {
            let numerator = (state.topic_term_count(topic, term) as f64 + self.beta)
                * (state.document_topic_count(document, topic) as f64 + self.alpha);
            let denominator = state.topic_term_sum(topic) as f64 + self.term_count_times_beta;
            sum += numerator / denominator;
            *slot = sum;
        }
    }

    /// Samples a topic for `term` in `document`, `cumulative` is used as workspace.
    pub fn sample_topic<R>(
        &self,
        state: &CountState,
        document: DocumentId,
        term: TermId,
        cumulative: &mut [f64],
        random: &mut R
    ) -> TopicId
    where
        R: UniformSource + ?Sized
    {
        self.cumulative_proportions(state, document, term, cumulative);
        let topic = sample_index_from_cumulative_proportions(random, cumulative);
        assert!(topic < state.topic_count(), "Sampled the topic {topic} but there are only {} topics!", state.topic_count());
        topic
    }
}

/// Roulette wheel selection: draws a value from `[0, total)` and returns the first index
/// whose cumulative proportion exceeds it.
pub fn sample_index_from_cumulative_proportions<R>(random: &mut R, cumulative: &[f64]) -> usize
where
    R: UniformSource + ?Sized
{
    let total = *cumulative.last().expect("Can not sample from an empty distribution!");
    let value = random.next_unit() * total;
    let index = cumulative.partition_point(|&proportion| proportion <= value);
    assert!(
        index < cumulative.len(),
        "The draw {value} is outside of the cumulative proportions with the total {total}!"
    );
    index
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::gibbs::random::ScriptedSource;
    use approx::assert_relative_eq;

    fn state_with_topics(draws: Vec<f64>) -> CountState {
        let corpus = vec![vec![2u32, 0, 1], vec![0, 3, 1]];
        CountState::initialize(&corpus, 2, &mut ScriptedSource::new(draws)).unwrap()
    }

    #[test]
    fn index_sampling_picks_first_exceeding_proportion() {
        let cumulative = [1.0, 3.0, 3.0, 4.0];
        let mut random = ScriptedSource::new(vec![0.0, 0.24, 0.25, 0.74, 0.75, 0.99]);
        let picks = (0..6)
            .map(|_| sample_index_from_cumulative_proportions(&mut random, &cumulative))
            .collect::<Vec<_>>();
        // index 2 has no mass and is never picked
        assert_eq!(vec![0, 0, 1, 1, 3, 3], picks);
    }

    #[test]
    fn equal_weights_are_well_defined() {
        let cumulative = [0.5, 1.0, 1.5];
        let mut random = ScriptedSource::new(vec![0.0, 0.4, 0.7]);
        assert_eq!(0, sample_index_from_cumulative_proportions(&mut random, &cumulative));
        assert_eq!(1, sample_index_from_cumulative_proportions(&mut random, &cumulative));
        assert_eq!(2, sample_index_from_cumulative_proportions(&mut random, &cumulative));
    }

    #[test]
    fn proportions_follow_the_collapsed_conditional() {
        // topics of the occurrences: 0, 0, 0, 1, 1, 1, 0
        let state = state_with_topics(vec![0.1, 0.1, 0.1, 0.6, 0.6, 0.6, 0.1]);
        let sampler = TopicSampler::new(1.0, 1.0, state.term_count());
        let mut cumulative = vec![0.0; 2];
        sampler.cumulative_proportions(&state, 0, 2, &mut cumulative);
        // topic 0: (2 + 1) * (3 + 1) / (4 + 3), topic 1: (0 + 1) * (0 + 1) / (3 + 3)
        let first = 3.0 * 4.0 / 7.0;
        let second = 1.0 / 6.0;
        assert_relative_eq!(first, cumulative[0]);
        assert_relative_eq!(first + second, cumulative[1]);
    }

    #[test]
    fn sampling_uses_the_workspace() {
        let state = state_with_topics(vec![0.1, 0.1, 0.1, 0.6, 0.6, 0.6, 0.1]);
        let sampler = TopicSampler::new(0.5, 0.5, state.term_count());
        let mut cumulative = vec![f64::NAN; 2];
        let mut random = ScriptedSource::new(vec![0.999]);
        assert_eq!(1, sampler.sample_topic(&state, 1, 1, &mut cumulative, &mut random));
        assert!(cumulative.iter().all(|value| value.is_finite()));
        let mut random = ScriptedSource::new(vec![0.0]);
        assert_eq!(0, sampler.sample_topic(&state, 1, 1, &mut cumulative, &mut random));
    }
}
