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

use rand::Rng;

/// A source of uniform random draws.
pub trait UniformSource {
    /// A uniform draw from `[0, 1)`.
    fn next_unit(&mut self) -> f64;

    /// A uniform draw from `[0, bound)`. `bound` has to be positive.
    fn next_index(&mut self, bound: usize) -> usize {
        assert!(bound > 0, "The bound for an index has to be positive!");
        ((self.next_unit() * bound as f64) as usize).min(bound - 1)
    }
}

impl<R: Rng + ?Sized> UniformSource for R {
    #[inline]
    fn next_unit(&mut self) -> f64 {
        self.random::<f64>()
    }

    #[inline]
    fn next_index(&mut self, bound: usize) -> usize {
        assert!(bound > 0, "The bound for an index has to be positive!");
        self.random_range(0..bound)
    }
}

/// Replays a fixed list of unit draws in a cycle.
#[derive(Debug, Clone)]
pub struct ScriptedSource {
    draws: Vec<f64>,
    position: usize,
}

impl ScriptedSource {
    /// Creates the source, every draw has to be in `[0, 1)`.
    pub fn new(draws: Vec<f64>) -> Self {
        assert!(!draws.is_empty(), "A scripted source needs at least one draw!");
        assert!(
            draws.iter().all(|value| (0.0..1.0).contains(value)),
            "All scripted draws have to be in [0, 1)!"
        );
        Self { draws, position: 0 }
    }

    /// The number of draws made so far.
    pub fn consumed(&self) -> usize {
        self.position
    }
}

impl UniformSource for ScriptedSource {
    fn next_unit(&mut self) -> f64 {
        let value = self.draws[self.position % self.draws.len()];
        self.position += 1;
        value
    }
}
