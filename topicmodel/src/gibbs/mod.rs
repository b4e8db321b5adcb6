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

//! A collapsed Gibbs sampler for Latent Dirichlet Allocation.
//!
//! See Blei, Ng and Jordan, "Latent Dirichlet Allocation" (JMLR 2003) and
//! Heinrich, "Parameter estimation for text analysis" (2009).

mod accumulator;
mod config;
mod errors;
mod random;
mod sampler;
mod state;
mod sweep;

pub use accumulator::*;
pub use config::*;
pub use errors::*;
pub use random::*;
pub use sampler::*;
pub use state::*;
pub use sweep::*;

use ldagibbs_toolkit::anytime::{AnytimeBatchLearner, AnytimeRunner, RunSummary, StopHandle};
use crate::corpus::CountVector;
use crate::model::LdaResult;

/// Everything that lives for exactly one fit.
#[derive(Debug, Clone)]
struct Fit {
    state: CountState,
    sampler: TopicSampler,
    engine: SweepEngine,
    accumulator: SampleAccumulator,
}

/// Fits an LDA model with collapsed Gibbs sampling.
///
/// Use it directly as an [AnytimeBatchLearner] or call [learn](LdaGibbsSampler::learn)
/// to run all `max_iterations` sweeps.
#[derive(Debug, Clone)]
pub struct LdaGibbsSampler<R> {
    config: LdaGibbsConfig,
    random: R,
    fit: Option<Fit>,
}

impl<R: UniformSource> LdaGibbsSampler<R> {
    pub fn new(config: LdaGibbsConfig, random: R) -> Result<Self, LdaError> {
        config.validate()?;
        if config.burn_in_iterations >= config.max_iterations {
            log::warn!(
                "The burn in of {} iterations is not shorter than the {} iterations, only one sample will be taken.",
                config.burn_in_iterations,
                config.max_iterations
            );
        }
        Ok(Self { config, random, fit: None })
    }

    pub fn config(&self) -> &LdaGibbsConfig {
        &self.config
    }

    pub fn random(&self) -> &R {
        &self.random
    }

    /// Runs a complete fit on `corpus`.
    pub fn learn<D: CountVector>(&mut self, corpus: &[D]) -> Result<LdaResult, LdaError> {
        self.learn_until(corpus, StopHandle::new()).map(|(result, _)| result)
    }

    /// Runs a fit on `corpus` that ends early when `stop` is triggered.
    pub fn learn_until<D: CountVector>(&mut self, corpus: &[D], stop: StopHandle) -> Result<(LdaResult, RunSummary), LdaError> {
        let runner = AnytimeRunner::with_stop_handle(self.config.max_iterations, stop);
        let summary = runner.learn(self, corpus)?;
        let result = self.take_result().ok_or(LdaError::NotInitialized)?;
        Ok((result, summary))
    }

    /// Moves the finalized result out of the sampler, the fit is discarded.
    pub fn take_result(&mut self) -> Option<LdaResult> {
        if self.fit.as_ref()?.accumulator.is_finalized() {
            self.fit.take().map(|fit| fit.accumulator.into_result())
        } else {
            None
        }
    }

    pub fn state(&self) -> Option<&CountState> {
        self.fit.as_ref().map(|fit| &fit.state)
    }

    pub fn document_count(&self) -> usize {
        self.state().map_or(0, CountState::document_count)
    }

    pub fn term_count(&self) -> usize {
        self.state().map_or(0, CountState::term_count)
    }

    /// The 0-based index of the last finished sweep.
    pub fn iteration(&self) -> Option<usize> {
        self.fit.as_ref()?.engine.iteration()
    }

    pub fn sample_count(&self) -> usize {
        self.fit.as_ref().map_or(0, |fit| fit.accumulator.sample_count())
    }
}

impl<D: CountVector, R: UniformSource> AnytimeBatchLearner<[D]> for LdaGibbsSampler<R> {
    type Output = LdaResult;
    type Error = LdaError;

    fn initialize(&mut self, corpus: &[D]) -> Result<bool, LdaError> {
        self.fit = None;
        let state = CountState::initialize(corpus, self.config.topic_count, &mut self.random)?;
        log::info!(
            "Initialized LDA with {} documents, {} terms, {} occurrences and {} topics.",
            state.document_count(),
            state.term_count(),
            state.occurrence_count(),
            state.topic_count()
        );
        let sampler = TopicSampler::new(self.config.alpha, self.config.beta, state.term_count());
        let engine = SweepEngine::new(state.topic_count());
        let accumulator = SampleAccumulator::new(
            &state,
            self.config.alpha,
            self.config.beta,
            self.config.burn_in_iterations,
            self.config.iterations_per_sample,
        )?;
        self.fit = Some(Fit { state, sampler, engine, accumulator });
        Ok(true)
    }

    fn step(&mut self) -> Result<bool, LdaError> {
        let Self { fit, random, .. } = self;
        let fit = fit.as_mut().ok_or(LdaError::NotInitialized)?;
        if fit.accumulator.is_finalized() {
            return Err(LdaError::AlreadyFinalized)
        }
        let iteration = fit.engine.sweep(&mut fit.state, &fit.sampler, random)?;
        fit.accumulator.maybe_sample(iteration, &fit.state);
        Ok(true)
    }

    fn cleanup(&mut self) -> Result<(), LdaError> {
        let fit = self.fit.as_mut().ok_or(LdaError::NotInitialized)?;
        fit.accumulator.finalize(&fit.state);
        log::info!(
            "Finished LDA after {} sweeps with {} samples.",
            fit.engine.completed_sweeps(),
            fit.accumulator.sample_count()
        );
        Ok(())
    }

    fn result(&self) -> Option<&LdaResult> {
        let fit = self.fit.as_ref()?;
        fit.accumulator.is_finalized().then(|| fit.accumulator.result())
    }
}
