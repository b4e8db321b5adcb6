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

use ldagibbs_toolkit::argument::IllegalArgument;
use thiserror::Error;
use crate::model::{DocumentId, TermId, TopicId};

/// The input of a fit is not usable. Nothing was changed when this error is returned.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum InvalidInputError {
    #[error("The corpus is empty, there is nothing to fit!")]
    EmptyCorpus,
    #[error("The documents of the corpus have no terms, there is nothing to fit!")]
    NoTerms,
    #[error(transparent)]
    IllegalParameter(#[from] IllegalArgument),
    #[error("The document {document} has the dimensionality {actual} but the corpus has {expected}!")]
    DimensionMismatch {
        document: DocumentId,
        expected: usize,
        actual: usize,
    },
    #[error("The term {term} is outside of the dimensionality {dimensionality}!")]
    TermOutOfRange {
        term: TermId,
        dimensionality: usize,
    },
    #[error("The config is incomplete: {0}")]
    IncompleteConfig(String),
}

/// The count tables differ from the assignments. Only happens if the sampler is broken.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StateConsistencyError {
    #[error("Removing from {table} at ({row}, {column}) would result in a negative count!")]
    NegativeCount {
        table: &'static str,
        row: usize,
        column: usize,
    },
    #[error("The occurrence {occurrence} does not exist, there are only {total} occurrences!")]
    OccurrenceOutOfRange {
        occurrence: usize,
        total: usize,
    },
    #[error("The topic {topic} does not exist, there are only {topic_count} topics!")]
    TopicOutOfRange {
        topic: TopicId,
        topic_count: usize,
    },
    #[error("The document {document} does not exist, there are only {document_count} documents!")]
    DocumentOutOfRange {
        document: DocumentId,
        document_count: usize,
    },
    #[error("The term {term} does not exist, there are only {term_count} terms!")]
    TermOutOfRange {
        term: TermId,
        term_count: usize,
    },
    #[error("The {table} does not match the assignments at {index}: expected {expected} but found {found}!")]
    CountMismatch {
        table: &'static str,
        index: usize,
        expected: usize,
        found: usize,
    },
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum LdaError {
    #[error(transparent)]
    InvalidInput(#[from] InvalidInputError),
    #[error(transparent)]
    StateConsistency(#[from] StateConsistencyError),
    #[error("The sampler has to be initialized before it can be used!")]
    NotInitialized,
    #[error("The samples are already averaged, initialize the sampler again to continue!")]
    AlreadyFinalized,
}

impl From<IllegalArgument> for LdaError {
    fn from(value: IllegalArgument) -> Self {
        Self::InvalidInput(value.into())
    }
}
