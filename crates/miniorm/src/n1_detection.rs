//! N+1 detection for per-record relation loads.
//!
//! Resolving a relation on each record of a list issues one query per
//! record. The tracker counts these loads per (model, relation) pair and
//! warns once a pair reaches the threshold, pointing at `with(...)`, which
//! loads the same relation for the whole list in one query.
//!
//! Only the most recent call sites of each pair are kept, so a tracker that
//! lives as long as its [`Database`](crate::Database) holds bounded memory.
//! The database's tracker is off until a unit of work opens an
//! [`N1Scope`](crate::database::N1Scope); counts then cover that unit only.
//!
//! ```ignore
//! let _scope = db.n1_scope();
//! // Warns on the third iteration:
//! for post in &posts {
//!     post.belongs_to::<User, _>(&db, None)?;
//! }
//!
//! // One query for all authors:
//! Post::with(&db, ["user"])?.get()?;
//! ```

use std::collections::{HashMap, VecDeque};
use std::panic::Location;

/// Default number of loads of one relation that triggers a warning.
pub const DEFAULT_THRESHOLD: usize = 3;

/// Recent call sites kept per (model, relation) pair and logged with a
/// warning.
pub const REPORTED_SITES: usize = 5;

/// Counts per-record relation loads.
#[derive(Debug)]
pub struct N1QueryTracker {
    loads: HashMap<(&'static str, &'static str), PairLoads>,
    threshold: usize,
    enabled: bool,
}

#[derive(Debug, Default)]
struct PairLoads {
    count: usize,
    recent: VecDeque<CallSite>,
}

impl Default for N1QueryTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Where a per-record load was triggered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSite {
    /// Model the relation was resolved on.
    pub model: &'static str,
    /// Relation name.
    pub relation: &'static str,
    /// Source file of the caller.
    pub file: &'static str,
    /// Line in that file.
    pub line: u32,
}

/// Snapshot of the tracker's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct N1Stats {
    /// Loads recorded across all relations.
    pub total_loads: usize,
    /// Distinct (model, relation) pairs loaded.
    pub relations_loaded: usize,
    /// Pairs at or above the threshold.
    pub potential_n1: usize,
}

impl N1QueryTracker {
    /// Enabled tracker with the default threshold.
    #[must_use]
    pub fn new() -> Self {
        Self {
            loads: HashMap::new(),
            threshold: DEFAULT_THRESHOLD,
            enabled: true,
        }
    }

    /// Tracker that records nothing until [`enable`](Self::enable)d.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::new()
        }
    }

    /// Change the warning threshold. Zero is treated as one.
    #[must_use]
    pub fn with_threshold(mut self, threshold: usize) -> Self {
        self.threshold = threshold.max(1);
        self
    }

    /// The warning threshold.
    #[must_use]
    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// True while loads are being counted.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Stop counting.
    pub fn disable(&mut self) {
        self.enabled = false;
    }

    /// Resume counting.
    pub fn enable(&mut self) {
        self.enabled = true;
    }

    /// Record one per-record load of `relation` on `model`.
    ///
    /// Emits a warning on target `miniorm::n1` when the pair's count reaches
    /// the threshold, and again at every further multiple of it.
    #[track_caller]
    pub fn record_load(&mut self, model: &'static str, relation: &'static str) {
        if !self.enabled {
            return;
        }

        let caller = Location::caller();
        let pair = self.loads.entry((model, relation)).or_default();
        pair.count += 1;
        if pair.recent.len() == REPORTED_SITES {
            pair.recent.pop_front();
        }
        pair.recent.push_back(CallSite {
            model,
            relation,
            file: caller.file(),
            line: caller.line(),
        });

        let count = pair.count;
        if count % self.threshold == 0 {
            self.warn(model, relation, count);
        }
    }

    fn warn(&self, model: &'static str, relation: &'static str, count: usize) {
        tracing::warn!(
            target: "miniorm::n1",
            model = model,
            relation = relation,
            loads = count,
            threshold = self.threshold,
            "Possible N+1 query pattern: relation loaded once per record; use with(...) to load it in one query"
        );

        for (i, site) in self.call_sites(model, relation).rev().enumerate() {
            tracing::debug!(
                target: "miniorm::n1",
                index = i,
                file = site.file,
                line = site.line,
                "N+1 call site"
            );
        }
    }

    /// Forget all counts and call sites.
    pub fn reset(&mut self) {
        self.loads.clear();
    }

    /// Loads recorded for one pair.
    #[must_use]
    pub fn count_for(&self, model: &str, relation: &str) -> usize {
        self.pair(model, relation).map_or(0, |p| p.count)
    }

    /// Current counters.
    #[must_use]
    pub fn stats(&self) -> N1Stats {
        N1Stats {
            total_loads: self.loads.values().map(|p| p.count).sum(),
            relations_loaded: self.loads.len(),
            potential_n1: self
                .loads
                .values()
                .filter(|p| p.count >= self.threshold)
                .count(),
        }
    }

    /// The most recent call sites of one pair (at most [`REPORTED_SITES`]),
    /// oldest first.
    pub fn call_sites(
        &self,
        model: &str,
        relation: &str,
    ) -> impl DoubleEndedIterator<Item = &CallSite> {
        self.pair(model, relation)
            .into_iter()
            .flat_map(|p| p.recent.iter())
    }

    /// Call sites currently held across all pairs.
    #[must_use]
    pub fn retained_call_sites(&self) -> usize {
        self.loads.values().map(|p| p.recent.len()).sum()
    }

    fn pair(&self, model: &str, relation: &str) -> Option<&PairLoads> {
        self.loads
            .iter()
            .find(|((m, r), _)| *m == model && *r == relation)
            .map(|(_, pair)| pair)
    }
}
