//! Per-(node, target) execution bookkeeping
//!
//! Nodes themselves stay immutable; last execution times and passed
//! `check_once` requirements are kept here, keyed by node id and target id.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use trellis_core::{format_duration, ActionConfig, TriggerConfig};
use trellis_flow::NodeId;

type Key = (NodeId, String);

#[derive(Debug, Clone, Default)]
struct Record {
    last: Option<DateTime<Utc>>,
    in_flight: bool,
}

/// Idempotency rules of a node
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Policy {
    pub cooldown: Duration,
    pub execute_once: bool,
}

impl Policy {
    fn is_active(&self) -> bool {
        self.execute_once || !self.cooldown.is_zero()
    }
}

impl From<&ActionConfig> for Policy {
    fn from(config: &ActionConfig) -> Self {
        Self {
            cooldown: config.cooldown,
            execute_once: config.execute_once,
        }
    }
}

impl From<&TriggerConfig> for Policy {
    fn from(config: &TriggerConfig) -> Self {
        Self {
            cooldown: config.cooldown,
            execute_once: config.execute_once,
        }
    }
}

/// Why a node may not run for a target right now
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Denial {
    AlreadyExecuted,
    Cooldown { remaining: Duration },
    InFlight,
}

impl fmt::Display for Denial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Denial::AlreadyExecuted => write!(f, "already executed once"),
            Denial::Cooldown { remaining } => {
                write!(f, "still on cooldown, {} remaining", format_duration(*remaining))
            }
            Denial::InFlight => write!(f, "already executing for this target"),
        }
    }
}

/// Concurrent bookkeeping store
#[derive(Debug, Default)]
pub struct ExecutionStore {
    records: Arc<DashMap<Key, Record>>,
    passed: DashMap<Key, DateTime<Utc>>,
}

impl ExecutionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check the policy for `(node, target)` and reserve the entry
    ///
    /// While the returned claim is alive, other claims for the same pair are
    /// denied if the policy is active. Committing records the execution time;
    /// dropping the claim without committing releases it. Pairs without an
    /// active policy are never recorded.
    pub fn claim(
        &self,
        node: NodeId,
        target: &str,
        policy: Policy,
        now: DateTime<Utc>,
    ) -> Result<Claim, Denial> {
        let key = (node, target.to_string());
        let tracked = policy.is_active();

        if tracked {
            let mut record = self.records.entry(key.clone()).or_default();
            if record.in_flight {
                return Err(Denial::InFlight);
            }
            if let Some(last) = record.last {
                if policy.execute_once {
                    return Err(Denial::AlreadyExecuted);
                }
                let elapsed = (now - last).to_std().unwrap_or(Duration::ZERO);
                if elapsed < policy.cooldown {
                    return Err(Denial::Cooldown {
                        remaining: policy.cooldown - elapsed,
                    });
                }
            }
            record.in_flight = true;
        }

        Ok(Claim {
            records: Arc::clone(&self.records),
            key,
            tracked,
            settled: false,
        })
    }

    /// Last recorded execution of `node` for `target`
    pub fn last_execution(&self, node: NodeId, target: &str) -> Option<DateTime<Utc>> {
        self.records
            .get(&(node, target.to_string()))
            .and_then(|record| record.last)
    }

    /// Whether a `check_once` requirement has passed for `target`
    pub fn has_passed(&self, node: NodeId, target: &str) -> bool {
        self.passed.contains_key(&(node, target.to_string()))
    }

    pub fn mark_passed(&self, node: NodeId, target: &str, at: DateTime<Utc>) {
        self.passed.insert((node, target.to_string()), at);
    }

    /// Forget everything recorded for `target`
    pub fn reset_target(&self, target: &str) {
        self.records.retain(|(_, id), record| id != target || record.in_flight);
        self.passed.retain(|(_, id), _| id != target);
    }

    pub fn clear(&self) {
        self.records.retain(|_, record| record.in_flight);
        self.passed.clear();
    }

    /// Number of (node, target) pairs with a recorded execution
    pub fn len(&self) -> usize {
        self.records.iter().filter(|r| r.last.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A reservation to run a node for one target
#[must_use = "dropping a claim releases it"]
pub struct Claim {
    records: Arc<DashMap<Key, Record>>,
    key: Key,
    tracked: bool,
    settled: bool,
}

impl Claim {
    /// Record a successful execution at `at`
    pub fn commit(mut self, at: DateTime<Utc>) {
        if self.tracked {
            let mut record = self.records.entry(self.key.clone()).or_default();
            record.last = Some(at);
            record.in_flight = false;
        }
        self.settled = true;
    }

    /// Give the reservation back without recording anything
    pub fn release(mut self) {
        self.unmark();
        self.settled = true;
    }

    fn unmark(&self) {
        if self.tracked {
            if let Some(mut record) = self.records.get_mut(&self.key) {
                record.in_flight = false;
            }
        }
    }
}

impl Drop for Claim {
    fn drop(&mut self) {
        if !self.settled {
            self.unmark();
        }
    }
}

impl fmt::Debug for Claim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Claim")
            .field("node", &self.key.0)
            .field("target", &self.key.1)
            .field("tracked", &self.tracked)
            .finish()
    }
}
