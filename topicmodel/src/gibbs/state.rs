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

use std::ops::Range;
use crate::corpus::{corpus_dimensionality, total_occurrences, CountVector};
use crate::gibbs::errors::{InvalidInputError, StateConsistencyError};
use crate::gibbs::random::UniformSource;
use crate::model::{DocumentId, DocumentLength, DocumentTo, TermFrequency, TermId, TermTo, TopicId, TopicTo};
use ldagibbs_toolkit::argument::assert_is_positive;

/// The sufficient statistics of the sampler together with the topic of every occurrence.
///
/// The occurrences of the corpus are flattened in document order, then term order,
/// then repetition order. `document_bounds[d]..document_bounds[d + 1]` are the
/// occurrences of document `d` and `occurrence_terms` knows the term of each one,
/// so a sweep does not need the corpus anymore.
#[derive(Debug, Clone)]
pub struct CountState {
    topic_count: usize,
    term_count: usize,
    document_topic_count: DocumentTo<TopicTo<usize>>,
    document_topic_sum: DocumentTo<usize>,
    topic_term_count: TopicTo<TermTo<usize>>,
    topic_term_sum: TopicTo<usize>,
    occurrence_topics: Vec<TopicId>,
    occurrence_terms: Vec<TermId>,
    document_bounds: Vec<usize>,
}

impl CountState {
    /// Assigns a uniformly drawn topic to every occurrence in `corpus` and counts them.
    pub fn initialize<D, R>(corpus: &[D], topic_count: usize, random: &mut R) -> Result<Self, InvalidInputError>
    where
        D: CountVector,
        R: UniformSource + ?Sized
    {
        assert_is_positive("topic_count", topic_count)?;
        let term_count = corpus_dimensionality(corpus)?;
        if term_count == 0 {
            return Err(InvalidInputError::NoTerms);
        }
        let document_count = corpus.len();
        let total = total_occurrences(corpus) as usize;

        let mut state = Self {
            topic_count,
            term_count,
            document_topic_count: vec![vec![0; topic_count]; document_count],
            document_topic_sum: vec![0; document_count],
            topic_term_count: vec![vec![0; term_count]; topic_count],
            topic_term_sum: vec![0; topic_count],
            occurrence_topics: Vec::with_capacity(total),
            occurrence_terms: Vec::with_capacity(total),
            document_bounds: Vec::with_capacity(document_count + 1),
        };

        state.document_bounds.push(0);
        for (document, vector) in corpus.iter().enumerate() {
            for (term, count) in vector.entries() {
                if term >= term_count {
                    return Err(InvalidInputError::TermOutOfRange { term, dimensionality: term_count });
                }
                for _ in 0..count {
                    let topic = random.next_index(topic_count);
                    state.document_topic_count[document][topic] += 1;
                    state.document_topic_sum[document] += 1;
                    state.topic_term_count[topic][term] += 1;
                    state.topic_term_sum[topic] += 1;
                    state.occurrence_topics.push(topic);
                    state.occurrence_terms.push(term);
                }
            }
            state.document_bounds.push(state.occurrence_topics.len());
        }

        Ok(state)
    }

    /// Takes `occurrence` out of the counts and returns the topic it had.
    /// The assignment itself stays untouched until [add](Self::add).
    pub fn remove(&mut self, document: DocumentId, term: TermId, occurrence: usize) -> Result<TopicId, StateConsistencyError> {
        self.check_indices(document, term)?;
        let topic = *self.occurrence_topics.get(occurrence).ok_or(StateConsistencyError::OccurrenceOutOfRange {
            occurrence,
            total: self.occurrence_topics.len()
        })?;

        // All four tables are checked first so a failed remove changes nothing.
        if self.document_topic_count[document][topic] == 0 {
            return Err(StateConsistencyError::NegativeCount { table: "document_topic_count", row: document, column: topic });
        }
        if self.document_topic_sum[document] == 0 {
            return Err(StateConsistencyError::NegativeCount { table: "document_topic_sum", row: document, column: 0 });
        }
        if self.topic_term_count[topic][term] == 0 {
            return Err(StateConsistencyError::NegativeCount { table: "topic_term_count", row: topic, column: term });
        }
        if self.topic_term_sum[topic] == 0 {
            return Err(StateConsistencyError::NegativeCount { table: "topic_term_sum", row: topic, column: 0 });
        }

        self.document_topic_count[document][topic] -= 1;
        self.document_topic_sum[document] -= 1;
        self.topic_term_count[topic][term] -= 1;
        self.topic_term_sum[topic] -= 1;
        Ok(topic)
    }

    /// Assigns `topic` to `occurrence` and counts it.
    pub fn add(&mut self, document: DocumentId, term: TermId, occurrence: usize, topic: TopicId) -> Result<(), StateConsistencyError> {
        if topic >= self.topic_count {
            return Err(StateConsistencyError::TopicOutOfRange { topic, topic_count: self.topic_count });
        }
        self.check_indices(document, term)?;
        let total = self.occurrence_topics.len();
        let slot = self.occurrence_topics.get_mut(occurrence).ok_or(StateConsistencyError::OccurrenceOutOfRange {
            occurrence,
            total
        })?;
        *slot = topic;
        self.document_topic_count[document][topic] += 1;
        self.document_topic_sum[document] += 1;
        self.topic_term_count[topic][term] += 1;
        self.topic_term_sum[topic] += 1;
        Ok(())
    }

    fn check_indices(&self, document: DocumentId, term: TermId) -> Result<(), StateConsistencyError> {
        if self.document_topic_sum.get(document).is_none() {
            return Err(StateConsistencyError::DocumentOutOfRange { document, document_count: self.document_count() });
        }
        if term >= self.term_count {
            return Err(StateConsistencyError::TermOutOfRange { term, term_count: self.term_count });
        }
        Ok(())
    }

    /// Recounts everything from the assignments and compares it with the tables.
    pub fn check_consistency(&self) -> Result<(), StateConsistencyError> {
        let mut document_topic_count = vec![vec![0usize; self.topic_count]; self.document_count()];
        let mut topic_term_count = vec![vec![0usize; self.term_count]; self.topic_count];
        for document in 0..self.document_count() {
            for occurrence in self.occurrences_of(document) {
                let topic = self.occurrence_topics[occurrence];
                if topic >= self.topic_count {
                    return Err(StateConsistencyError::TopicOutOfRange { topic, topic_count: self.topic_count });
                }
                document_topic_count[document][topic] += 1;
                topic_term_count[topic][self.occurrence_terms[occurrence]] += 1;
            }
        }

        fn compare(table: &'static str, expected: &[usize], found: &[usize], offset: usize) -> Result<(), StateConsistencyError> {
            match expected.iter().zip(found).position(|(a, b)| a != b) {
                None => Ok(()),
                Some(pos) => Err(StateConsistencyError::CountMismatch {
                    table,
                    index: offset + pos,
                    expected: expected[pos],
                    found: found[pos],
                }),
            }
        }

        for (document, expected) in document_topic_count.iter().enumerate() {
            compare("document_topic_count", expected, &self.document_topic_count[document], document * self.topic_count)?;
        }
        let sums = document_topic_count.iter().map(|row| row.iter().sum()).collect::<Vec<usize>>();
        compare("document_topic_sum", &sums, &self.document_topic_sum, 0)?;
        let lengths = self.document_lengths().into_iter().map(|value| value as usize).collect::<Vec<_>>();
        compare("document_topic_sum", &lengths, &self.document_topic_sum, 0)?;

        for (topic, expected) in topic_term_count.iter().enumerate() {
            compare("topic_term_count", expected, &self.topic_term_count[topic], topic * self.term_count)?;
        }
        let sums = topic_term_count.iter().map(|row| row.iter().sum()).collect::<Vec<usize>>();
        compare("topic_term_sum", &sums, &self.topic_term_sum, 0)
    }

    pub fn topic_count(&self) -> usize {
        self.topic_count
    }

    pub fn term_count(&self) -> usize {
        self.term_count
    }

    pub fn document_count(&self) -> usize {
        self.document_topic_sum.len()
    }

    pub fn occurrence_count(&self) -> usize {
        self.occurrence_topics.len()
    }

    /// The global indices of the occurrences in `document`.
    pub fn occurrences_of(&self, document: DocumentId) -> Range<usize> {
        self.document_bounds[document]..self.document_bounds[document + 1]
    }

    #[inline]
    pub fn term_of(&self, occurrence: usize) -> TermId {
        self.occurrence_terms[occurrence]
    }

    #[inline]
    pub fn topic_of(&self, occurrence: usize) -> TopicId {
        self.occurrence_topics[occurrence]
    }

    pub fn occurrence_topics(&self) -> &[TopicId] {
        &self.occurrence_topics
    }

    #[inline]
    pub fn document_topic_count(&self, document: DocumentId, topic: TopicId) -> usize {
        self.document_topic_count[document][topic]
    }

    #[inline]
    pub fn document_topic_sum(&self, document: DocumentId) -> usize {
        self.document_topic_sum[document]
    }

    #[inline]
    pub fn topic_term_count(&self, topic: TopicId, term: TermId) -> usize {
        self.topic_term_count[topic][term]
    }

    #[inline]
    pub fn topic_term_sum(&self, topic: TopicId) -> usize {
        self.topic_term_sum[topic]
    }

    pub fn document_topic_counts(&self) -> &DocumentTo<TopicTo<usize>> {
        &self.document_topic_count
    }

    pub fn document_topic_sums(&self) -> &DocumentTo<usize> {
        &self.document_topic_sum
    }

    pub fn topic_term_counts(&self) -> &TopicTo<TermTo<usize>> {
        &self.topic_term_count
    }

    pub fn topic_term_sums(&self) -> &TopicTo<usize> {
        &self.topic_term_sum
    }

    /// The number of occurrences per document, fixed for the whole fit.
    pub fn document_lengths(&self) -> DocumentTo<DocumentLength> {
        self.document_bounds.windows(2).map(|bounds| (bounds[1] - bounds[0]) as DocumentLength).collect()
    }

    /// The number of occurrences per term over the whole corpus.
    pub fn term_frequencies(&self) -> TermTo<TermFrequency> {
        let mut frequencies = vec![0; self.term_count];
        for &term in &self.occurrence_terms {
            frequencies[term] += 1;
        }
        frequencies
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::gibbs::random::ScriptedSource;
    use crate::gibbs::InvalidInputError;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn small_corpus() -> Vec<Vec<u32>> {
        vec![vec![2, 0, 1], vec![0, 3, 1]]
    }

    #[test]
    fn initialization_counts_every_occurrence() {
        let mut random = StdRng::seed_from_u64(1);
        let state = CountState::initialize(&small_corpus(), 2, &mut random).unwrap();
        assert_eq!(2, state.document_count());
        assert_eq!(3, state.term_count());
        assert_eq!(7, state.occurrence_count());
        assert_eq!(&vec![3, 4], state.document_topic_sums());
        assert_eq!(7, state.topic_term_sums().iter().sum::<usize>());
        assert_eq!(vec![3, 4], state.document_lengths());
        assert_eq!(vec![2, 3, 2], state.term_frequencies());
        state.check_consistency().unwrap();
    }

    #[test]
    fn occurrences_are_flattened_in_document_term_order() {
        let mut random = ScriptedSource::new(vec![0.1, 0.6]);
        let state = CountState::initialize(&small_corpus(), 2, &mut random).unwrap();
        assert_eq!(0..3, state.occurrences_of(0));
        assert_eq!(3..7, state.occurrences_of(1));
        let terms = (0..7).map(|occurrence| state.term_of(occurrence)).collect::<Vec<_>>();
        assert_eq!(vec![0, 0, 2, 1, 1, 1, 2], terms);
        assert_eq!(&[0, 1, 0, 1, 0, 1, 0], state.occurrence_topics());
        assert_eq!(2, state.document_topic_count(0, 0));
        assert_eq!(1, state.topic_term_count(1, 0));
    }

    #[test]
    fn remove_then_add_keeps_consistency() {
        let mut random = ScriptedSource::new(vec![0.1]);
        let mut state = CountState::initialize(&small_corpus(), 2, &mut random).unwrap();
        let old = state.remove(1, 1, 4).unwrap();
        assert_eq!(0, old);
        assert_eq!(3, state.document_topic_sum(1));
        assert!(state.check_consistency().is_err());
        state.add(1, 1, 4, 1).unwrap();
        state.check_consistency().unwrap();
        assert_eq!(1, state.topic_of(4));
        assert_eq!(1, state.topic_term_count(1, 1));
        assert_eq!(6, state.topic_term_sum(0));
    }

    #[test]
    fn broken_updates_are_reported() {
        let mut random = ScriptedSource::new(vec![0.1, 0.1, 0.1, 0.6, 0.6, 0.6, 0.1]);
        let mut state = CountState::initialize(&small_corpus(), 2, &mut random).unwrap();
        assert_eq!(
            Err(StateConsistencyError::OccurrenceOutOfRange { occurrence: 7, total: 7 }),
            state.remove(1, 2, 7)
        );
        assert_eq!(
            Err(StateConsistencyError::TopicOutOfRange { topic: 2, topic_count: 2 }),
            state.add(0, 0, 0, 2)
        );
        // term 1 is only assigned to topic 1
        assert_eq!(
            Err(StateConsistencyError::NegativeCount { table: "topic_term_count", row: 0, column: 1 }),
            state.remove(0, 1, 0)
        );
        state.check_consistency().unwrap();
    }

    #[test]
    fn unknown_documents_and_terms_are_reported() {
        let mut random = ScriptedSource::new(vec![0.1]);
        let mut state = CountState::initialize(&small_corpus(), 2, &mut random).unwrap();
        assert_eq!(
            Err(StateConsistencyError::DocumentOutOfRange { document: 2, document_count: 2 }),
            state.remove(2, 0, 0)
        );
        assert_eq!(
            Err(StateConsistencyError::TermOutOfRange { term: 3, term_count: 3 }),
            state.remove(0, 3, 0)
        );
        assert_eq!(
            Err(StateConsistencyError::DocumentOutOfRange { document: 5, document_count: 2 }),
            state.add(5, 0, 0, 1)
        );
        assert_eq!(
            Err(StateConsistencyError::TermOutOfRange { term: 7, term_count: 3 }),
            state.add(0, 7, 0, 1)
        );
        state.check_consistency().unwrap();
    }

    #[test]
    fn documents_without_terms_are_rejected() {
        let mut random = StdRng::seed_from_u64(1);
        let no_terms: Vec<Vec<u32>> = vec![vec![], vec![]];
        assert_eq!(
            InvalidInputError::NoTerms,
            CountState::initialize(&no_terms, 2, &mut random).unwrap_err()
        );
    }

    #[test]
    fn empty_corpus_and_zero_topics_are_rejected() {
        let mut random = StdRng::seed_from_u64(1);
        let empty: Vec<Vec<u32>> = Vec::new();
        assert_eq!(
            InvalidInputError::EmptyCorpus,
            CountState::initialize(&empty, 2, &mut random).unwrap_err()
        );
        assert!(matches!(
            CountState::initialize(&small_corpus(), 0, &mut random),
            Err(InvalidInputError::IllegalParameter(_))
        ));
    }
}
