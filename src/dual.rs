//! Walking two rings at once.
//!
//! When two differently keyed manifests are compared, trust may be recorded in either
//! party's ring or split across both. The dual walk treats the two rings as one graph:
//! it swaps to the other ring when the active one has no trust for the current key, and
//! branches when both rings hold a different trust for the same key.
//!
//! Keys are remembered per ring side, so reaching a key on the other ring after a swap is
//! not a revisit. Branches are explored recursively up to [`WalkConfig::max_depth`], and
//! every key reached across all branches counts against [`WalkConfig::visit_budget`].
//!
//! [`WalkConfig::max_depth`]: crate::walk::WalkConfig::max_depth
//! [`WalkConfig::visit_budget`]: crate::walk::WalkConfig::visit_budget
use crate::cascade::Ring;
use crate::errors::{Error, WalkError};
use crate::traits::CascadeKey;
use crate::walk::{EventKind, ExecutionReturn, Side, Walker};
use std::collections::HashSet;

/// Result of walking one branch
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Outcome {
    /// The target key was reached
    Success,
    /// A split branch ran out of trusts; the parent branch should carry on
    Unsplit,
    /// The walk failed
    Failure(WalkError),
}

type Seen<'r, K> = [HashSet<&'r K>; 2];

struct Branch<'r, K> {
    current: &'r K,
    active: Side,
    seen: Seen<'r, K>,
    depth: usize,
    splitting: Option<&'r K>,
}

struct DualWalk<'w, 'a, 'r, K: CascadeKey> {
    walker: &'w mut Walker<'a, K>,
    rings: [&'r Ring<K>; 2],
    target: &'r K,
    visits: usize,
}

/// Merge the two rings ahead of a walk.
///
/// Trusts recorded identically in both rings are kept once, in the primary ring. Trusts
/// only the secondary ring holds move into the primary ring. What remains in the
/// secondary ring are the trusts that diverge from the primary ring's for the same key.
pub(crate) fn normalize<K: CascadeKey>(
    primary: &Ring<K>,
    secondary: &Ring<K>,
) -> (Ring<K>, Ring<K>) {
    let mut merged = primary.clone();
    let mut divergent = Ring::new();
    for (index, trust) in secondary.iter() {
        match primary.get(index) {
            Some(existing) if existing == trust => {}
            Some(_) => divergent.insert_unchecked(index.clone(), trust.clone()),
            None => merged.insert_unchecked(index.clone(), trust.clone()),
        }
    }
    (merged, divergent)
}

impl<'w, 'a, 'r, K: CascadeKey> DualWalk<'w, 'a, 'r, K> {
    fn ring(&self, side: Side) -> &'r Ring<K> {
        self.rings[side.index()]
    }

    fn visit(&mut self) -> Result<(), WalkError> {
        self.visits += 1;
        match self.walker.config.visit_budget {
            Some(budget) if self.visits > budget => Err(WalkError::VisitBudgetExhausted(budget)),
            _ => Ok(()),
        }
    }

    fn walk(&mut self, mut branch: Branch<'r, K>) -> Outcome {
        loop {
            let current = branch.current;
            if current == self.target {
                return Outcome::Success;
            }
            if let Err(e) = self.visit() {
                return Outcome::Failure(e);
            }
            self.walker
                .emit(EventKind::Saw, branch.active, branch.depth, current);

            if !self.ring(branch.active).contains(current) {
                branch.active = branch.active.other();
                self.walker
                    .emit(EventKind::Swap, branch.active, branch.depth, current);
                if !self.ring(branch.active).contains(current) {
                    if branch.depth == 0 {
                        return Outcome::Failure(WalkError::BrokenCascade(current.fingerprint()));
                    }
                    return Outcome::Unsplit;
                }
            }

            // recorded before splitting, so a branch that comes back here on this side
            // is a revisit
            if !branch.seen[branch.active.index()].insert(current) {
                return Outcome::Failure(WalkError::CircularCascade(current.fingerprint()));
            }

            if branch.splitting != Some(current)
                && self.ring(branch.active.other()).contains(current)
            {
                if let Some(outcome) = self.split(&branch) {
                    return outcome;
                }
            }

            let trust = match self.ring(branch.active).get(current) {
                Some(trust) => trust,
                None => return Outcome::Failure(WalkError::BrokenCascade(current.fingerprint())),
            };
            if trust.voucher() != current {
                return Outcome::Failure(WalkError::InsaneCascade {
                    index: current.fingerprint(),
                    voucher: trust.voucher().fingerprint(),
                });
            }
            self.walker
                .emit(EventKind::Check, branch.active, branch.depth, current);
            if trust.verify().is_err() {
                return Outcome::Failure(WalkError::InvalidCascade(current.fingerprint()));
            }
            branch.current = trust.vouchee();
            self.walker
                .emit(EventKind::Accept, branch.active, branch.depth, branch.current);
        }
    }

    /// Explore the other ring's trust for the parent's current key. Returns the outcome
    /// the parent must return, or `None` if the parent should carry on along its own ring.
    fn split(&mut self, parent: &Branch<'r, K>) -> Option<Outcome> {
        let current = parent.current;
        let depth = parent.depth + 1;
        if depth > self.walker.config.max_depth {
            return Some(Outcome::Failure(WalkError::CascadeTooDeep(
                self.walker.config.max_depth,
            )));
        }
        self.walker
            .emit(EventKind::Split, parent.active.other(), depth, current);
        let child = Branch {
            current,
            active: parent.active.other(),
            seen: parent.seen.clone(),
            depth,
            splitting: Some(current),
        };
        match self.walk(child) {
            Outcome::Success => Some(Outcome::Success),
            Outcome::Unsplit => {
                self.walker
                    .emit(EventKind::Reject, parent.active, parent.depth, current);
                None
            }
            Outcome::Failure(
                e @ WalkError::CascadeTooDeep(_) | e @ WalkError::VisitBudgetExhausted(_),
            ) => Some(Outcome::Failure(e)),
            Outcome::Failure(e) if self.walker.config.resilient => {
                tracing::debug!(error = %e, depth, "rejected cascade branch");
                self.walker
                    .emit(EventKind::Reject, parent.active, parent.depth, current);
                None
            }
            Outcome::Failure(e) => Some(Outcome::Failure(e)),
        }
    }
}

impl<'a, K: CascadeKey> Walker<'a, K> {
    fn walk_dual(
        &mut self,
        target: &K,
        source: &K,
        primary: &Ring<K>,
        secondary: &Ring<K>,
    ) -> Result<(), WalkError> {
        let (merged, divergent) = normalize(primary, secondary);
        tracing::debug!(
            primary = merged.len(),
            divergent = divergent.len(),
            resilient = self.config.resilient,
            "starting dual cascade walk"
        );
        let mut walk = DualWalk {
            walker: self,
            rings: [&merged, &divergent],
            target,
            visits: 0,
        };
        let outcome = walk.walk(Branch {
            current: source,
            active: Side::Primary,
            seen: [HashSet::new(), HashSet::new()],
            depth: 0,
            splitting: None,
        });
        match outcome {
            Outcome::Success => Ok(()),
            Outcome::Failure(e) => {
                tracing::debug!(error = %e, "dual cascade walk failed");
                Err(e)
            }
            // only split branches give up without a verdict
            Outcome::Unsplit => Err(WalkError::BrokenCascade(source.fingerprint())),
        }
    }

    /// Walk `primary` and `secondary` together from `source` until `target` is reached.
    ///
    /// # Errors
    /// * `ResilientRequiresReturnCode` if the walker is resilient; use
    ///   [`Walker::dual_run_code`] instead
    /// * any [`WalkError`], as for [`Walker::run`], plus `CascadeTooDeep` and
    ///   `VisitBudgetExhausted` when the configured limits are hit
    pub fn dual_run(
        &mut self,
        target: &K,
        source: &K,
        primary: &Ring<K>,
        secondary: &Ring<K>,
    ) -> Result<(), Error> {
        if self.config.resilient {
            return Err(Error::ResilientRequiresReturnCode);
        }
        self.walk_dual(target, source, primary, secondary)
            .map_err(Error::from)
    }

    /// Same as [`Walker::dual_run`], reporting the outcome as a return code. This is the
    /// only form that honours [`WalkConfig::resilient`](crate::walk::WalkConfig::resilient).
    pub fn dual_run_code(
        &mut self,
        target: &K,
        source: &K,
        primary: &Ring<K>,
        secondary: &Ring<K>,
    ) -> ExecutionReturn {
        ExecutionReturn::from(&self.walk_dual(target, source, primary, secondary))
    }
}

/// Dual walk with a default [`Walker`].
pub fn dual_run<K: CascadeKey>(
    target: &K,
    source: &K,
    primary: &Ring<K>,
    secondary: &Ring<K>,
) -> Result<(), Error> {
    Walker::new().dual_run(target, source, primary, secondary)
}
