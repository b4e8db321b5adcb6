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

mod persist;
pub use persist::*;

use std::fmt::{Display, Formatter};
use std::io;
use std::io::Write;
use std::ops::Range;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

pub type TopicTo<T> = Vec<T>;
pub type TermTo<T> = Vec<T>;
pub type DocumentTo<T> = Vec<T>;
pub type Probability = f64;

pub type TermId = usize;
pub type TopicId = usize;
pub type DocumentId = usize;
pub type TermFrequency = u64;
pub type DocumentLength = u64;

/// The parameters of a fitted LDA model.
///
/// Rows of both matrices are distributions: `topic_term_probabilities[k][t]` is the
/// probability of term `t` in topic `k` (phi) and `document_topic_probabilities[d][k]`
/// the probability of topic `k` in document `d` (theta).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LdaResult {
    // Row = Topic
    // Col = Term
    pub(crate) topic_term_probabilities: TopicTo<TermTo<Probability>>,
    // Row = Document
    // Col = Topic
    pub(crate) document_topic_probabilities: DocumentTo<TopicTo<Probability>>,
    pub(crate) sample_count: usize,
    pub(crate) document_lengths: DocumentTo<DocumentLength>,
    pub(crate) term_frequencies: TermTo<TermFrequency>,
}

/// Simple statistics over the probabilities of a single topic.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicStats {
    pub topic_id: TopicId,
    pub max_value: Probability,
    pub min_value: Probability,
    pub average_value: Probability,
    pub sum_value: Probability,
}

impl LdaResult {
    /// A result with all probabilities set to zero.
    pub(crate) fn empty(
        topic_count: usize,
        document_lengths: DocumentTo<DocumentLength>,
        term_frequencies: TermTo<TermFrequency>
    ) -> Self {
        Self {
            topic_term_probabilities: vec![vec![0.0; term_frequencies.len()]; topic_count],
            document_topic_probabilities: vec![vec![0.0; topic_count]; document_lengths.len()],
            sample_count: 0,
            document_lengths,
            term_frequencies,
        }
    }

    pub fn new(
        topic_term_probabilities: TopicTo<TermTo<Probability>>,
        document_topic_probabilities: DocumentTo<TopicTo<Probability>>,
        sample_count: usize,
        document_lengths: DocumentTo<DocumentLength>,
        term_frequencies: TermTo<TermFrequency>,
    ) -> Self {
        Self {
            topic_term_probabilities,
            document_topic_probabilities,
            sample_count,
            document_lengths,
            term_frequencies,
        }
    }

    pub fn topic_count(&self) -> usize {
        self.topic_term_probabilities.len()
    }

    pub fn document_count(&self) -> usize {
        self.document_topic_probabilities.len()
    }

    pub fn term_count(&self) -> usize {
        self.term_frequencies.len()
    }

    /// The number of sweeps averaged into this result.
    pub fn sample_count(&self) -> usize {
        self.sample_count
    }

    pub fn topic_ids(&self) -> Range<TopicId> {
        0..self.topic_count()
    }

    pub fn topic_term_probabilities(&self) -> &TopicTo<TermTo<Probability>> {
        &self.topic_term_probabilities
    }

    pub fn document_topic_probabilities(&self) -> &DocumentTo<TopicTo<Probability>> {
        &self.document_topic_probabilities
    }

    pub fn document_lengths(&self) -> &DocumentTo<DocumentLength> {
        &self.document_lengths
    }

    pub fn term_frequencies(&self) -> &TermTo<TermFrequency> {
        &self.term_frequencies
    }

    /// The probability of `term` in `topic`.
    pub fn get_probability(&self, topic: TopicId, term: TermId) -> Option<Probability> {
        self.topic_term_probabilities.get(topic)?.get(term).copied()
    }

    /// The topic distribution of `document`.
    pub fn get_document_topics(&self, document: DocumentId) -> Option<&TopicTo<Probability>> {
        self.document_topic_probabilities.get(document)
    }

    /// The most likely topic of `document`, the lowest id wins ties.
    pub fn dominant_topic(&self, document: DocumentId) -> Option<TopicId> {
        self.get_document_topics(document)?
            .iter()
            .enumerate()
            .fold(None, |best: Option<(TopicId, Probability)>, (topic, &probability)| match best {
                Some((_, best_probability)) if best_probability >= probability => best,
                _ => Some((topic, probability)),
            })
            .map(|(topic, _)| topic)
    }

    /// The `n` most probable terms of `topic`, ties are ordered by term id.
    pub fn top_terms_for_topic(&self, topic: TopicId, n: usize) -> Option<Vec<(TermId, Probability)>> {
        let probabilities = self.topic_term_probabilities.get(topic)?;
        Some(
            probabilities
                .iter()
                .copied()
                .enumerate()
                .sorted_by(|(term_a, a), (term_b, b)| b.total_cmp(a).then(term_a.cmp(term_b)))
                .take(n)
                .collect()
        )
    }

    /// The `n` most probable terms for every topic.
    pub fn top_terms_for_topics(&self, n: usize) -> TopicTo<Vec<(TermId, Probability)>> {
        self.topic_ids()
            .map(|topic| self.top_terms_for_topic(topic, n).unwrap_or_default())
            .collect()
    }

    pub fn topic_stats(&self) -> TopicTo<TopicStats> {
        self.topic_term_probabilities.iter().enumerate().map(|(topic_id, topic)| {
            let mut max_value: f64 = f64::MIN;
            let mut min_value: f64 = f64::MAX;
            let mut sum_value: f64 = 0.0;

            for &value in topic {
                max_value = max_value.max(value);
                min_value = min_value.min(value);
                sum_value += value;
            }

            TopicStats {
                topic_id,
                max_value,
                min_value,
                sum_value,
                average_value: sum_value / (topic.len() as f64)
            }
        }).collect()
    }

    /// Writes the `n` best terms of every topic. Terms without an entry in
    /// `vocabulary` are shown by their id.
    pub fn show_to<T: Display>(&self, n: usize, vocabulary: &[T], out: &mut impl Write) -> io::Result<()> {
        for (topic_id, topic_entries) in self.top_terms_for_topics(n).iter().enumerate() {
            if topic_id != 0 {
                out.write_all(b"\n")?;
            }
            write!(out, "Topic({topic_id}):")?;
            for (rank, (term_id, probability)) in topic_entries.iter().enumerate() {
                out.write_all(b"\n")?;
                match vocabulary.get(*term_id) {
                    Some(term) => write!(out, "    {}: {} ({})", term, probability, rank + 1)?,
                    None => write!(out, "    #{}: {} ({})", term_id, probability, rank + 1)?,
                }
            }
        }
        Ok(())
    }
}

impl Display for LdaResult {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "LDA Result ({} topics, {} documents, {} terms, {} samples):",
            self.topic_count(),
            self.document_count(),
            self.term_count(),
            self.sample_count
        )?;
        for (topic_id, topic) in self.topic_term_probabilities.iter().enumerate() {
            write!(f, "\n    Topic({topic_id})")?;
            for (term_id, probability) in topic.iter().enumerate() {
                write!(f, "\n        {term_id}: {probability}")?;
            }
        }
        Ok(())
    }
}
