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
use std::io;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use flate2::Compression;
use itertools::Itertools;
use strum::{AsRefStr, Display, EnumString};
use thiserror::Error;
use crate::model::LdaResult;

const PATH_VERSION_INFO: &str = "version.info";
const PATH_TO_MODEL: [&str; 2] = ["model", "topic.model"];
const PATH_TO_DOC_TOPIC_DISTS: [&str; 2] = ["doc", "doc_topic_dists.freq"];
const PATH_TO_DOC_LENGTHS: [&str; 2] = ["doc", "doc_lengths.freq"];
const PATH_TO_VOCABULARY_FREQ: [&str; 2] = ["voc", "vocabulary.freq"];
const PATH_SAMPLE_COUNT: &str = "sample.count";
const DEFLATE_EXTENSION: &str = "deflate";
const MARKER_FILE: &str = "COMPLETED_TM";

/// The storing version of a result.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Display, AsRefStr, EnumString)]
pub enum ResultVersion {
    V1,
}

/// The errors while writing
#[derive(Debug, Error)]
pub enum WriteError {
    #[error(transparent)]
    IO(#[from] io::Error),
    #[error("The result at {0} is already finished and saved!")]
    AlreadyFinished(PathBuf),
    #[error("The directory {0} is not empty and does not contain a result!")]
    NotAResultDirectory(PathBuf),
}

/// The errors while reading
#[derive(Debug, Error)]
pub enum ReadError {
    #[error(transparent)]
    IO(#[from] io::Error),
    #[error("Failed at {line}:{position} with {err:?}")]
    ParseFloat {
        line: usize,
        position: usize,
        #[source]
        err: std::num::ParseFloatError
    },
    #[error("Failed at {line}:{position} with {err:?}")]
    ParseInt {
        line: usize,
        position: usize,
        #[source]
        err: std::num::ParseIntError
    },
    #[error(transparent)]
    StrumParse(#[from] strum::ParseError),
    #[error("The result at {0} is not finished!")]
    NotFinishedError(PathBuf),
    #[error("The stored tables do not fit together: {0}")]
    Inconsistent(String),
}

fn join_all(root: &Path, parts: &[&str]) -> PathBuf {
    parts.iter().fold(root.to_path_buf(), |path, part| path.join(part))
}

fn deflated(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".");
    name.push(DEFLATE_EXTENSION);
    PathBuf::from(name)
}

fn create_file(path: &Path) -> io::Result<File> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    File::create(path)
}

impl LdaResult {
    pub fn is_already_finished(path: impl AsRef<Path>) -> bool {
        path.as_ref().join(MARKER_FILE).exists()
    }

    /// Stores the result in the directory `path`. The matrices are deflate compressed if `deflate` is set.
    pub fn save(&self, path: impl AsRef<Path>, deflate: bool, replace: bool) -> Result<usize, WriteError> {
        let path = path.as_ref();
        if Self::is_already_finished(path) && !replace {
            return Err(WriteError::AlreadyFinished(path.to_path_buf()))
        }
        if path.exists() {
            let is_empty = std::fs::read_dir(path)?.next().is_none();
            if !is_empty && !path.join(PATH_VERSION_INFO).exists() {
                return Err(WriteError::NotAResultDirectory(path.to_path_buf()))
            }
            std::fs::remove_dir_all(path)?;
        }
        std::fs::create_dir_all(path)?;

        let mut bytes_written = Self::write_vec(&path.join(PATH_VERSION_INFO), &[ResultVersion::V1])?;
        bytes_written += Self::write_vec(&join_all(path, &PATH_TO_VOCABULARY_FREQ), &self.term_frequencies)?;
        bytes_written += Self::write_vec(&join_all(path, &PATH_TO_DOC_LENGTHS), &self.document_lengths)?;
        bytes_written += Self::write_vec(&path.join(PATH_SAMPLE_COUNT), &[self.sample_count])?;
        bytes_written += Self::write_matrix_f64(&join_all(path, &PATH_TO_DOC_TOPIC_DISTS), &self.document_topic_probabilities, deflate)?;
        bytes_written += Self::write_matrix_f64(&join_all(path, &PATH_TO_MODEL), &self.topic_term_probabilities, deflate)?;

        File::create_new(path.join(MARKER_FILE))?;
        log::info!("Saved the result to {} ({bytes_written} bytes).", path.display());
        Ok(bytes_written)
    }

    /// Loads a result stored by [save](Self::save).
    pub fn load(path: impl AsRef<Path>, allow_unfinished: bool) -> Result<(LdaResult, ResultVersion), ReadError> {
        let path = path.as_ref();
        if !allow_unfinished && !Self::is_already_finished(path) {
            return Err(ReadError::NotFinishedError(path.to_path_buf()))
        }

        let mut buf = String::new();
        File::open(path.join(PATH_VERSION_INFO))?.read_to_string(&mut buf)?;
        let version: ResultVersion = if buf.trim().is_empty() {
            ResultVersion::V1
        } else {
            buf.trim().parse()?
        };

        match version {
            ResultVersion::V1 => {
                let term_frequencies = Self::read_vec_u64(File::open(join_all(path, &PATH_TO_VOCABULARY_FREQ))?)?;
                let document_lengths = Self::read_vec_u64(File::open(join_all(path, &PATH_TO_DOC_LENGTHS))?)?;
                let sample_count = Self::read_vec_u64(File::open(path.join(PATH_SAMPLE_COUNT))?)?
                    .first()
                    .copied()
                    .unwrap_or(1) as usize;
                let document_topic_probabilities = Self::read_matrix_at(&join_all(path, &PATH_TO_DOC_TOPIC_DISTS))?;
                let topic_term_probabilities = Self::read_matrix_at(&join_all(path, &PATH_TO_MODEL))?;

                if document_topic_probabilities.len() != document_lengths.len() {
                    return Err(ReadError::Inconsistent(format!(
                        "{} document distributions but {} document lengths",
                        document_topic_probabilities.len(),
                        document_lengths.len()
                    )))
                }
                if let Some(row) = topic_term_probabilities.iter().find(|row| row.len() != term_frequencies.len()) {
                    return Err(ReadError::Inconsistent(format!(
                        "a topic with {} terms but {} term frequencies",
                        row.len(),
                        term_frequencies.len()
                    )))
                }

                Ok((
                    LdaResult::new(
                        topic_term_probabilities,
                        document_topic_probabilities,
                        sample_count,
                        document_lengths,
                        term_frequencies
                    ),
                    version
                ))
            }
        }
    }

    fn write_vec<T: ToString>(path: &Path, values: &[T]) -> io::Result<usize> {
        let content = values.iter().map(|value| value.to_string()).join("\n");
        create_file(path)?.write_all(content.as_bytes())?;
        Ok(content.len())
    }

    fn write_matrix_f64(path: &Path, target: &[Vec<f64>], deflate: bool) -> io::Result<usize> {
        fn write_lines(out: &mut impl Write, target: &[Vec<f64>]) -> io::Result<usize> {
            let mut bytes = 0usize;
            for doubles in target {
                let line = doubles.iter().map(|value| format!("{:.20}", value)).join(" ");
                out.write_all(line.as_bytes())?;
                out.write_all(b"\n")?;
                bytes += line.len() + 1;
            }
            Ok(bytes)
        }

        if deflate {
            let mut encoder = flate2::write::DeflateEncoder::new(
                BufWriter::new(create_file(&deflated(path))?),
                Compression::default()
            );
            let bytes = write_lines(&mut encoder, target)?;
            encoder.finish()?.flush()?;
            Ok(bytes)
        } else {
            let mut out = BufWriter::new(create_file(path)?);
            let bytes = write_lines(&mut out, target)?;
            out.flush()?;
            Ok(bytes)
        }
    }

    fn read_matrix_at(path: &Path) -> Result<Vec<Vec<f64>>, ReadError> {
        let compressed = deflated(path);
        if compressed.exists() {
            Self::read_matrix_f64(File::open(compressed)?, true)
        } else {
            Self::read_matrix_f64(File::open(path)?, false)
        }
    }

    fn read_vec_u64(inp: impl Read) -> Result<Vec<u64>, ReadError> {
        BufReader::new(inp).lines().process_results(|lines| {
            lines
                .enumerate()
                .filter(|(_, line)| !line.trim().is_empty())
                .map(|(pos, line)| line.trim().parse::<u64>().map_err(|err| ReadError::ParseInt {
                    line: pos,
                    position: 0,
                    err
                }))
                .collect::<Result<Vec<_>, _>>()
        })?
    }

    fn read_matrix_f64(inp: impl Read, deflate: bool) -> Result<Vec<Vec<f64>>, ReadError> {
        let reader: Box<dyn BufRead> = if deflate {
            Box::new(BufReader::new(flate2::read::DeflateDecoder::new(inp)))
        } else {
            Box::new(BufReader::new(inp))
        };

        reader.lines().process_results(|lines| {
            lines.enumerate().filter_map(move |(line_no, line)| {
                let line = line.trim();
                if line.is_empty() {
                    None
                } else {
                    Some(line.split(' ').enumerate().map(
                        |(pos, it)| it.replace(',', ".").parse::<f64>().map_err(|err| ReadError::ParseFloat {
                            line: line_no,
                            position: pos,
                            err
                        })
                    ).collect::<Result<Vec<f64>, _>>())
                }
            }).collect::<Result<Vec<_>, _>>()
        })?
    }
}
