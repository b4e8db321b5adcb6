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

use serde::{Deserialize, Serialize};
use crate::gibbs::InvalidInputError;
use crate::model::TermId;

/// A document as a vector of non-negative term counts.
pub trait CountVector {
    /// The number of terms this vector is defined over.
    fn dimensionality(&self) -> usize;

    /// All non-zero `(term, count)` entries in ascending term order.
    fn entries(&self) -> impl Iterator<Item = (TermId, u32)> + '_;

    /// The number of occurrences in this document.
    fn l1_norm(&self) -> u64 {
        self.entries().map(|(_, count)| count as u64).sum()
    }
}

/// A sparse count vector, the entries are sorted by term and unique.
#[derive(Debug, Clone, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct SparseDocument {
    dimensionality: usize,
    entries: Vec<(TermId, u32)>,
}

impl SparseDocument {
    /// Creates a document, duplicate terms are summed up and zero counts dropped.
    pub fn new(dimensionality: usize, entries: impl IntoIterator<Item = (TermId, u32)>) -> Result<Self, InvalidInputError> {
        let mut entries: Vec<(TermId, u32)> = entries.into_iter().collect();
        if let Some(&(term, _)) = entries.iter().find(|(term, _)| *term >= dimensionality) {
            return Err(InvalidInputError::TermOutOfRange { term, dimensionality });
        }
        entries.sort_by_key(|(term, _)| *term);
        let mut merged: Vec<(TermId, u32)> = Vec::with_capacity(entries.len());
        for (term, count) in entries {
            match merged.last_mut() {
                Some((last, last_count)) if *last == term => *last_count += count,
                _ => merged.push((term, count)),
            }
        }
        merged.retain(|(_, count)| *count > 0);
        Ok(Self { dimensionality, entries: merged })
    }

    pub fn from_dense(counts: &[u32]) -> Self {
        Self {
            dimensionality: counts.len(),
            entries: counts.iter().copied().enumerate().filter(|(_, count)| *count > 0).collect(),
        }
    }

    /// Changes the dimensionality, used when the vocabulary size is only known after reading all documents.
    pub fn with_dimensionality(mut self, dimensionality: usize) -> Result<Self, InvalidInputError> {
        if let Some(&(term, _)) = self.entries.last() {
            if term >= dimensionality {
                return Err(InvalidInputError::TermOutOfRange { term, dimensionality });
            }
        }
        self.dimensionality = dimensionality;
        Ok(self)
    }

    pub fn get(&self, term: TermId) -> u32 {
        self.entries
            .binary_search_by_key(&term, |(t, _)| *t)
            .map_or(0, |pos| self.entries[pos].1)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl CountVector for SparseDocument {
    fn dimensionality(&self) -> usize {
        self.dimensionality
    }

    fn entries(&self) -> impl Iterator<Item = (TermId, u32)> + '_ {
        self.entries.iter().copied()
    }
}

impl CountVector for [u32] {
    fn dimensionality(&self) -> usize {
        self.len()
    }

    fn entries(&self) -> impl Iterator<Item = (TermId, u32)> + '_ {
        self.iter().copied().enumerate().filter(|(_, count)| *count > 0)
    }
}

impl CountVector for Vec<u32> {
    fn dimensionality(&self) -> usize {
        self.len()
    }

    fn entries(&self) -> impl Iterator<Item = (TermId, u32)> + '_ {
        self.as_slice().entries()
    }
}

/// The dimensionality shared by all documents in `corpus`.
pub fn corpus_dimensionality<D: CountVector>(corpus: &[D]) -> Result<usize, InvalidInputError> {
    let (first, rest) = corpus.split_first().ok_or(InvalidInputError::EmptyCorpus)?;
    let expected = first.dimensionality();
    for (pos, document) in rest.iter().enumerate() {
        let actual = document.dimensionality();
        if actual != expected {
            return Err(InvalidInputError::DimensionMismatch { document: pos + 1, expected, actual });
        }
    }
    Ok(expected)
}

/// The number of term occurrences in `corpus`.
pub fn total_occurrences<D: CountVector>(corpus: &[D]) -> u64 {
    corpus.iter().map(CountVector::l1_norm).sum()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn sparse_documents_are_normalized() {
        let doc = SparseDocument::new(5, vec![(3, 1), (0, 2), (3, 4), (1, 0)]).unwrap();
        assert_eq!(vec![(0, 2), (3, 5)], doc.entries().collect::<Vec<_>>());
        assert_eq!(7, doc.l1_norm());
        assert_eq!(5, doc.get(3));
        assert_eq!(0, doc.get(1));
    }

    #[test]
    fn sparse_documents_reject_unknown_terms() {
        let err = SparseDocument::new(2, vec![(2, 1)]).unwrap_err();
        assert_eq!(InvalidInputError::TermOutOfRange { term: 2, dimensionality: 2 }, err);
        let doc = SparseDocument::new(4, vec![(3, 1)]).unwrap();
        assert!(doc.clone().with_dimensionality(3).is_err());
        assert_eq!(10, doc.with_dimensionality(10).unwrap().dimensionality());
    }

    #[test]
    fn dense_and_sparse_agree() {
        let dense = vec![2u32, 0, 1];
        let sparse = SparseDocument::from_dense(&dense);
        assert_eq!(dense.entries().collect::<Vec<_>>(), sparse.entries().collect::<Vec<_>>());
        assert_eq!(3, sparse.dimensionality());
    }

    #[test]
    fn corpus_checks() {
        let empty: Vec<Vec<u32>> = Vec::new();
        assert_eq!(Err(InvalidInputError::EmptyCorpus), corpus_dimensionality(&empty));
        let corpus = vec![vec![2u32, 0, 1], vec![0, 3, 1]];
        assert_eq!(Ok(3), corpus_dimensionality(&corpus));
        assert_eq!(7, total_occurrences(&corpus));
        let broken = vec![vec![2u32, 0, 1], vec![0, 3]];
        assert_eq!(
            Err(InvalidInputError::DimensionMismatch { document: 1, expected: 3, actual: 2 }),
            corpus_dimensionality(&broken)
        );
    }
}
