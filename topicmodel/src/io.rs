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

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::num::ParseIntError;
use std::path::Path;
use thiserror::Error;
use crate::corpus::SparseDocument;
use crate::gibbs::InvalidInputError;
use crate::model::TermId;

#[derive(Debug, Error)]
pub enum CorpusReadError {
    #[error(transparent)]
    IO(#[from] std::io::Error),
    #[error("Expected index:count in line {line} at position {position} but got {found:?}!")]
    MalformedPair { line: usize, position: usize, found: String },
    #[error("Failed to parse a number in line {line} at position {position}: {source}")]
    ParseInt { line: usize, position: usize, #[source] source: ParseIntError },
    #[error("Indices are one-based, but line {line} has index 0 at position {position}!")]
    ZeroIndex { line: usize, position: usize },
    #[error(transparent)]
    InvalidDocument(#[from] InvalidInputError),
}

/// Reads a corpus of bags, one document per line with whitespace separated
/// `index:count` pairs. The indices are one-based, the dimensionality of every
/// document is the largest index in the whole corpus.
pub fn read_bags(reader: impl BufRead) -> Result<Vec<SparseDocument>, CorpusReadError> {
    let mut bags = Vec::new();
    let mut dimensionality = 0usize;
    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        let mut bag: Vec<(TermId, u32)> = Vec::new();
        for (position, pair) in line.split_whitespace().enumerate() {
            let (index, count) = pair.split_once(':').ok_or_else(|| CorpusReadError::MalformedPair {
                line: line_no + 1,
                position,
                found: pair.to_string(),
            })?;
            let parse_error = |source| CorpusReadError::ParseInt { line: line_no + 1, position, source };
            let index: usize = index.parse().map_err(parse_error)?;
            let count: u32 = count.parse().map_err(parse_error)?;
            if index == 0 {
                return Err(CorpusReadError::ZeroIndex { line: line_no + 1, position })
            }
            dimensionality = dimensionality.max(index);
            bag.push((index - 1, count));
        }
        bags.push(bag);
    }
    log::debug!("Read {} documents over {dimensionality} terms.", bags.len());
    bags.into_iter()
        .map(|bag| SparseDocument::new(dimensionality, bag).map_err(CorpusReadError::from))
        .collect()
}

pub fn read_bags_from_file(path: impl AsRef<Path>) -> Result<Vec<SparseDocument>, CorpusReadError> {
    read_bags(BufReader::new(File::open(path)?))
}

/// Reads a vocabulary with one term per line, the line number is the term id.
pub fn read_vocabulary(reader: impl BufRead) -> std::io::Result<Vec<String>> {
    reader.lines().collect()
}

pub fn read_vocabulary_from_file(path: impl AsRef<Path>) -> std::io::Result<Vec<String>> {
    read_vocabulary(BufReader::new(File::open(path)?))
}
