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

use derive_builder::Builder;
use ldagibbs_toolkit::argument::{assert_is_non_negative, assert_is_positive};
use serde::{Deserialize, Serialize};
use crate::gibbs::errors::InvalidInputError;

/// The hyperparameters and the sampling schedule of a fit.
#[derive(Debug, Clone, PartialEq, Builder, Serialize, Deserialize)]
#[builder(build_fn(private, name = "fallible_build"))]
#[serde(default)]
pub struct LdaGibbsConfig {
    /// The number of topics (k).
    #[builder(default = "LdaGibbsConfig::DEFAULT_TOPIC_COUNT")]
    pub topic_count: usize,
    /// The prior weight of the document-topic counts.
    #[builder(default = "LdaGibbsConfig::DEFAULT_ALPHA")]
    pub alpha: f64,
    /// The prior weight of the topic-term counts.
    #[builder(default = "LdaGibbsConfig::DEFAULT_BETA")]
    pub beta: f64,
    #[builder(default = "LdaGibbsConfig::DEFAULT_MAX_ITERATIONS")]
    pub max_iterations: usize,
    /// The sweeps before the first sample is taken.
    #[builder(default = "LdaGibbsConfig::DEFAULT_BURN_IN_ITERATIONS")]
    pub burn_in_iterations: usize,
    /// The sweeps between two samples after the burn-in.
    #[builder(default = "LdaGibbsConfig::DEFAULT_ITERATIONS_PER_SAMPLE")]
    pub iterations_per_sample: usize,
}

impl LdaGibbsConfig {
    pub const DEFAULT_TOPIC_COUNT: usize = 10;
    pub const DEFAULT_ALPHA: f64 = 5.0;
    pub const DEFAULT_BETA: f64 = 0.5;
    pub const DEFAULT_MAX_ITERATIONS: usize = 10000;
    pub const DEFAULT_BURN_IN_ITERATIONS: usize = 2000;
    pub const DEFAULT_ITERATIONS_PER_SAMPLE: usize = 100;

    pub fn builder() -> LdaGibbsConfigBuilder {
        LdaGibbsConfigBuilder::default()
    }

    /// Checks every parameter, the first violation is returned.
    pub fn validate(&self) -> Result<(), InvalidInputError> {
        assert_is_positive("topic_count", self.topic_count)?;
        assert_is_positive("alpha", self.alpha)?;
        assert_is_positive("beta", self.beta)?;
        assert_is_non_negative("max_iterations", self.max_iterations)?;
        assert_is_non_negative("burn_in_iterations", self.burn_in_iterations)?;
        assert_is_positive("iterations_per_sample", self.iterations_per_sample)?;
        Ok(())
    }

    /// The number of samples a run over all `max_iterations` will produce.
    pub fn expected_sample_count(&self) -> usize {
        if self.max_iterations <= self.burn_in_iterations {
            1
        } else {
            (self.max_iterations - 1 - self.burn_in_iterations) / self.iterations_per_sample + 1
        }
    }
}

impl Default for LdaGibbsConfig {
    fn default() -> Self {
        Self {
            topic_count: Self::DEFAULT_TOPIC_COUNT,
            alpha: Self::DEFAULT_ALPHA,
            beta: Self::DEFAULT_BETA,
            max_iterations: Self::DEFAULT_MAX_ITERATIONS,
            burn_in_iterations: Self::DEFAULT_BURN_IN_ITERATIONS,
            iterations_per_sample: Self::DEFAULT_ITERATIONS_PER_SAMPLE,
        }
    }
}

impl LdaGibbsConfigBuilder {
    /// Builds and validates the config.
    pub fn build(&self) -> Result<LdaGibbsConfig, InvalidInputError> {
        let config = self.fallible_build().map_err(|err| InvalidInputError::IncompleteConfig(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}
