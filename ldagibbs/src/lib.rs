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
use std::io::{BufReader, Write};
use std::path::PathBuf;
use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use thiserror::Error;
use ldagibbs_toolkit::anytime::StopHandle;
use ldagibbs_topicmodel::gibbs::{InvalidInputError, LdaError, LdaGibbsConfig, LdaGibbsSampler};
use ldagibbs_topicmodel::io::{read_bags_from_file, read_vocabulary_from_file, CorpusReadError};
use ldagibbs_topicmodel::model::{LdaResult, WriteError};

/// Latent Dirichlet Allocation with collapsed Gibbs sampling.
#[derive(Debug, Clone, Parser)]
#[command(name = "ldagibbs", version)]
pub struct Args {
    /// The corpus, one document per line as one-based `index:count` pairs.
    #[arg(long, value_name = "BAGS")]
    pub corpus: PathBuf,
    /// One term per line, line n names the term with index n.
    #[arg(long, value_name = "FILE")]
    pub vocabulary: Option<PathBuf>,
    /// A json file with the sampler configuration, missing fields keep their defaults.
    #[arg(long, value_name = "JSON")]
    pub config: Option<PathBuf>,
    #[arg(long, value_name = "NUMBER")]
    pub topics: Option<usize>,
    #[arg(long, value_name = "FLOAT")]
    pub alpha: Option<f64>,
    #[arg(long, value_name = "FLOAT")]
    pub beta: Option<f64>,
    #[arg(long, value_name = "NUMBER")]
    pub max_iterations: Option<usize>,
    #[arg(long, value_name = "NUMBER")]
    pub burn_in: Option<usize>,
    #[arg(long, value_name = "NUMBER")]
    pub iterations_per_sample: Option<usize>,
    /// Seed for the random numbers, a random seed is logged if not set.
    #[arg(long, value_name = "NUMBER")]
    pub seed: Option<u64>,
    /// Number of terms shown per topic, 0 shows nothing.
    #[arg(long, value_name = "NUMBER", default_value_t = 10)]
    pub show: usize,
    /// Directory to save the result to.
    #[arg(long, value_name = "DIR")]
    pub output: Option<PathBuf>,
    #[arg(long, requires = "output")]
    pub deflate: bool,
    /// Overwrite an already saved result.
    #[arg(long, requires = "output")]
    pub replace: bool,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    IO(#[from] std::io::Error),
    #[error("Failed to read the config: {0}")]
    Config(#[from] serde_json::Error),
    #[error(transparent)]
    Corpus(#[from] CorpusReadError),
    #[error(transparent)]
    InvalidInput(#[from] InvalidInputError),
    #[error(transparent)]
    Lda(#[from] LdaError),
    #[error(transparent)]
    Write(#[from] WriteError),
}

impl Args {
    /// The config file (or the defaults) with the flags applied on top.
    pub fn load_config(&self) -> Result<LdaGibbsConfig, AppError> {
        let mut config = match &self.config {
            Some(path) => serde_json::from_reader(BufReader::new(File::open(path)?))?,
            None => LdaGibbsConfig::default(),
        };
        if let Some(topics) = self.topics {
            config.topic_count = topics;
        }
        if let Some(alpha) = self.alpha {
            config.alpha = alpha;
        }
        if let Some(beta) = self.beta {
            config.beta = beta;
        }
        if let Some(max_iterations) = self.max_iterations {
            config.max_iterations = max_iterations;
        }
        if let Some(burn_in) = self.burn_in {
            config.burn_in_iterations = burn_in;
        }
        if let Some(iterations_per_sample) = self.iterations_per_sample {
            config.iterations_per_sample = iterations_per_sample;
        }
        config.validate()?;
        Ok(config)
    }
}

/// Fits the model described by `args`, shows it on `out` and saves it if requested.
pub fn run(args: &Args, out: &mut impl Write) -> Result<LdaResult, AppError> {
    let config = args.load_config()?;
    log::info!("Using {config:?}");
    let corpus = read_bags_from_file(&args.corpus)?;
    let vocabulary = match &args.vocabulary {
        Some(path) => read_vocabulary_from_file(path)?,
        None => Vec::new(),
    };

    let seed = args.seed.unwrap_or_else(rand::random);
    log::info!("Seed: {seed}");
    let mut sampler = LdaGibbsSampler::new(config, StdRng::seed_from_u64(seed))?;
    let (result, summary) = sampler.learn_until(&corpus, StopHandle::new())?;
    log::info!("Stopped after {} iterations by {:?}.", summary.iterations, summary.stopped_by);

    if !vocabulary.is_empty() && vocabulary.len() != result.term_count() {
        log::warn!(
            "The vocabulary has {} entries but the corpus has {} terms.",
            vocabulary.len(),
            result.term_count()
        );
    }
    if args.show > 0 {
        result.show_to(args.show, vocabulary.as_slice(), out)?;
        writeln!(out)?;
    }
    if let Some(output) = &args.output {
        result.save(output, args.deflate, args.replace)?;
    }
    Ok(result)
}

#[cfg(test)]
mod test {
    use super::*;

    fn write_corpus(dir: &std::path::Path) -> PathBuf {
        let path = dir.join("corpus.bags");
        std::fs::write(&path, "1:3 2:1\n2:2 3:4\n1:1 3:2\n").unwrap();
        path
    }

    #[test]
    fn flags_override_the_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("config.json");
        std::fs::write(&config, r#"{"topic_count": 4, "alpha": 0.2, "max_iterations": 300}"#).unwrap();
        let args = Args::try_parse_from([
            "ldagibbs",
            "--corpus", "corpus.bags",
            "--config", config.to_str().unwrap(),
            "--alpha", "0.7",
            "--burn-in", "10",
        ]).unwrap();
        let loaded = args.load_config().unwrap();
        assert_eq!(4, loaded.topic_count);
        assert_eq!(0.7, loaded.alpha);
        assert_eq!(LdaGibbsConfig::DEFAULT_BETA, loaded.beta);
        assert_eq!(300, loaded.max_iterations);
        assert_eq!(10, loaded.burn_in_iterations);
    }

    #[test]
    fn bad_arguments_are_rejected() {
        assert!(Args::try_parse_from(["ldagibbs"]).is_err());
        assert!(Args::try_parse_from(["ldagibbs", "--corpus", "c", "--deflate"]).is_err());
        let args = Args::try_parse_from(["ldagibbs", "--corpus", "c", "--topics", "0"]).unwrap();
        assert!(matches!(args.load_config(), Err(AppError::InvalidInput(InvalidInputError::IllegalParameter(_)))));
    }

    #[test]
    fn runs_shows_and_saves() {
        let _ = env_logger::builder().is_test(true).try_init();
        let dir = tempfile::tempdir().unwrap();
        let corpus = write_corpus(dir.path());
        let vocabulary = dir.path().join("vocabulary.txt");
        std::fs::write(&vocabulary, "apple\nbanana\ncherry\n").unwrap();
        let output = dir.path().join("model");
        let args = Args::try_parse_from([
            "ldagibbs",
            "--corpus", corpus.to_str().unwrap(),
            "--vocabulary", vocabulary.to_str().unwrap(),
            "--topics", "2",
            "--max-iterations", "20",
            "--burn-in", "5",
            "--iterations-per-sample", "5",
            "--seed", "42",
            "--show", "2",
            "--output", output.to_str().unwrap(),
            "--deflate",
        ]).unwrap();

        let mut shown = Vec::new();
        let result = run(&args, &mut shown).unwrap();
        assert_eq!(3, result.sample_count());
        assert_eq!(3, result.document_count());
        assert_eq!(3, result.term_count());
        let shown = String::from_utf8(shown).unwrap();
        assert!(shown.starts_with("Topic(0):"), "{shown}");
        assert!(shown.contains("Topic(1):"), "{shown}");

        let (loaded, _) = LdaResult::load(&output, false).unwrap();
        assert_eq!(result.sample_count(), loaded.sample_count());
        assert_eq!(result.document_lengths(), loaded.document_lengths());

        let mut again = Vec::new();
        assert!(matches!(run(&args, &mut again), Err(AppError::Write(WriteError::AlreadyFinished(_)))));
    }

    #[test]
    fn same_seed_same_result() {
        let dir = tempfile::tempdir().unwrap();
        let corpus = write_corpus(dir.path());
        let args = Args::try_parse_from([
            "ldagibbs",
            "--corpus", corpus.to_str().unwrap(),
            "--topics", "2",
            "--max-iterations", "15",
            "--seed", "7",
            "--show", "0",
        ]).unwrap();
        let first = run(&args, &mut Vec::new()).unwrap();
        let second = run(&args, &mut Vec::new()).unwrap();
        assert_eq!(first, second);
    }
}
