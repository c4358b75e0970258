//! Deferred outcomes
//!
//! A [`FutureOutcome`] is a single-assignment cell for an [`Outcome`] that may
//! only become available after a delayed action has run. Futures combine by
//! conjunction and complete once every constituent has completed. There is
//! no cancellation: a caller that loses interest simply stops waiting.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;

use crate::outcome::{CombinedOutcome, Outcome};

type Listener = Box<dyn FnOnce(&Outcome) + Send>;

#[derive(Default)]
struct State {
    value: Option<Outcome>,
    listeners: Vec<Listener>,
}

#[derive(Default)]
struct Shared {
    state: Mutex<State>,
    notify: Notify,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// An outcome that may complete later
#[derive(Clone, Default)]
pub struct FutureOutcome {
    shared: Arc<Shared>,
}

impl FutureOutcome {
    /// Create a future that has not completed yet
    pub fn pending() -> Self {
        Self::default()
    }

    /// Create an already completed future
    pub fn completed(outcome: Outcome) -> Self {
        let future = Self::pending();
        future.complete(outcome);
        future
    }

    /// Complete the future
    ///
    /// Returns `false` if it had already been completed, in which case the
    /// given outcome is dropped.
    pub fn complete(&self, outcome: Outcome) -> bool {
        let listeners = {
            let mut state = self.shared.lock();
            if state.value.is_some() {
                return false;
            }
            state.value = Some(outcome.clone());
            std::mem::take(&mut state.listeners)
        };

        for listener in listeners {
            listener(&outcome);
        }
        self.shared.notify.notify_waiters();
        true
    }

    pub fn is_complete(&self) -> bool {
        self.shared.lock().value.is_some()
    }

    /// The outcome, if completed
    pub fn get(&self) -> Option<Outcome> {
        self.shared.lock().value.clone()
    }

    /// Run `listener` once the future completes
    ///
    /// Runs immediately on the calling thread if already completed.
    pub fn on_complete<F>(&self, listener: F)
    where
        F: FnOnce(&Outcome) + Send + 'static,
    {
        let value = {
            let mut state = self.shared.lock();
            match &state.value {
                Some(value) => value.clone(),
                None => {
                    state.listeners.push(Box::new(listener));
                    return;
                }
            }
        };
        listener(&value);
    }

    /// Wait for the outcome
    pub async fn wait(&self) -> Outcome {
        loop {
            let notified = self.shared.notify.notified();
            if let Some(value) = self.get() {
                return value;
            }
            notified.await;
        }
    }

    /// Conjunction with another future
    pub fn combine(&self, other: &FutureOutcome) -> FutureOutcome {
        FutureOutcome::all([self.clone(), other.clone()])
    }

    /// Conjunction of every future, in order
    ///
    /// Completes with [`Outcome::Empty`] immediately when given no futures.
    pub fn all(futures: impl IntoIterator<Item = FutureOutcome>) -> FutureOutcome {
        let futures: Vec<FutureOutcome> = futures.into_iter().collect();
        match futures.len() {
            0 => return FutureOutcome::completed(Outcome::Empty),
            1 => return futures.into_iter().next().unwrap_or_default(),
            _ => {}
        }

        let combined = FutureOutcome::pending();
        let slots = Arc::new(Mutex::new(Slots {
            values: vec![None; futures.len()],
            remaining: futures.len(),
        }));

        for (index, future) in futures.iter().enumerate() {
            let slots = Arc::clone(&slots);
            let combined = combined.clone();
            future.on_complete(move |outcome| {
                let finished = {
                    let mut slots = slots.lock().unwrap_or_else(PoisonError::into_inner);
                    slots.values[index] = Some(outcome.clone());
                    slots.remaining -= 1;
                    if slots.remaining == 0 {
                        Some(
                            slots
                                .values
                                .drain(..)
                                .flatten()
                                .collect::<CombinedOutcome>(),
                        )
                    } else {
                        None
                    }
                };
                if let Some(result) = finished {
                    combined.complete(result.into_outcome());
                }
            });
        }

        combined
    }
}

struct Slots {
    values: Vec<Option<Outcome>>,
    remaining: usize,
}

impl From<Outcome> for FutureOutcome {
    fn from(outcome: Outcome) -> Self {
        FutureOutcome::completed(outcome)
    }
}

impl fmt::Debug for FutureOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FutureOutcome")
            .field("value", &self.get())
            .finish()
    }
}
