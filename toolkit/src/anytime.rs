use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A batch learner that can be stopped after any step and still produce a result.
///
/// The contract for a caller is: [initialize](AnytimeBatchLearner::initialize) once,
/// then [step](AnytimeBatchLearner::step) zero or more times and finally
/// [cleanup](AnytimeBatchLearner::cleanup) exactly once.
pub trait AnytimeBatchLearner<D: ?Sized> {
    type Output;
    type Error;

    /// Prepares the learner for `data`. Returns false if the learner can not run on it.
    fn initialize(&mut self, data: &D) -> Result<bool, Self::Error>;

    /// Performs one step. Returns false if the learner wants to stop.
    fn step(&mut self) -> Result<bool, Self::Error>;

    /// Finishes the learning, called after the last step.
    fn cleanup(&mut self) -> Result<(), Self::Error>;

    /// The current result, if any.
    fn result(&self) -> Option<&Self::Output>;
}

/// A shareable flag to request the stop of a running learner.
#[derive(Debug, Clone, Default)]
pub struct StopHandle {
    flag: Arc<AtomicBool>,
}

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_stop(&self) {
        self.flag.store(true, Ordering::Release)
    }

    pub fn is_stop_requested(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    pub fn reset(&self) {
        self.flag.store(false, Ordering::Release)
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum StopReason {
    /// The maximum number of iterations was reached.
    MaxIterations,
    /// The learner returned false in a step.
    Learner,
    /// Someone used the [StopHandle].
    Requested,
    /// The learner refused the data in initialize, no step and no cleanup happened.
    NotInitialized,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct RunSummary {
    pub iterations: usize,
    pub stopped_by: StopReason,
}

/// Drives an [AnytimeBatchLearner] until it stops, the iterations are exhausted
/// or a stop is requested.
#[derive(Debug, Clone)]
pub struct AnytimeRunner {
    max_iterations: usize,
    stop: StopHandle,
}

impl AnytimeRunner {
    pub fn new(max_iterations: usize) -> Self {
        Self { max_iterations, stop: StopHandle::new() }
    }

    pub fn with_stop_handle(max_iterations: usize, stop: StopHandle) -> Self {
        Self { max_iterations, stop }
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    pub fn stop_handle(&self) -> &StopHandle {
        &self.stop
    }

    pub fn learn<D, L>(&self, learner: &mut L, data: &D) -> Result<RunSummary, L::Error>
    where
        D: ?Sized,
        L: AnytimeBatchLearner<D>
    {
        self.learn_with(learner, data, |_, _| {})
    }

    /// Same as [learn](Self::learn) but calls `after_step` with the learner and the
    /// number of finished iterations after every step.
    pub fn learn_with<D, L, F>(&self, learner: &mut L, data: &D, mut after_step: F) -> Result<RunSummary, L::Error>
    where
        D: ?Sized,
        L: AnytimeBatchLearner<D>,
        F: FnMut(&L, usize)
    {
        if !learner.initialize(data)? {
            log::warn!("The learner refused to initialize, nothing to do.");
            return Ok(RunSummary { iterations: 0, stopped_by: StopReason::NotInitialized })
        }

        let mut iterations = 0usize;
        let stopped_by = loop {
            if iterations >= self.max_iterations {
                break StopReason::MaxIterations;
            }
            if self.stop.is_stop_requested() {
                break StopReason::Requested;
            }
            log::trace!("Step {iterations}");
            let keep_going = learner.step()?;
            iterations += 1;
            after_step(learner, iterations);
            if !keep_going {
                break StopReason::Learner;
            }
        };

        learner.cleanup()?;
        log::debug!("Finished after {iterations} iterations, stopped by {stopped_by:?}.");
        Ok(RunSummary { iterations, stopped_by })
    }
}
