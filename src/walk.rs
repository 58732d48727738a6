//! Walking a ring from a source key to a target key, verifying every hop.
//!
//! A [`Walker`] carries the walk configuration and an optional event callback. Each walk
//! comes in two forms: a `Result` form and a return-code form producing an
//! [`ExecutionReturn`]. Both forms run the same algorithm and classify failures the same way.
use crate::cascade::Ring;
use crate::common::PublicKey;
use crate::errors::{Error, WalkError};
use crate::traits::CascadeKey;
use std::collections::HashSet;
use std::fmt;

#[cfg(feature = "serde_enabled")]
use serde::{Deserialize, Serialize};

/// Default ceiling on dual-walk branching depth
pub const DEFAULT_MAX_DEPTH: usize = 256;
/// Default ceiling on the number of keys a dual walk may visit across all branches
pub const DEFAULT_VISIT_BUDGET: usize = 1 << 20;

/// Return code of a walk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExecutionReturn {
    /// The target key was reached
    Success,
    /// A key was visited twice
    Circular,
    /// A trust was indexed under a key other than its voucher
    Insane,
    /// A trust failed signature verification
    InvalidSignature,
    /// The chain ended before the target key
    Broken,
    /// Dual-walk branching exceeded the depth ceiling
    TooDeep,
    /// The visit budget ran out
    BudgetExhausted,
}

impl ExecutionReturn {
    /// Whether this code means the walk succeeded
    pub fn is_success(self) -> bool {
        self == ExecutionReturn::Success
    }
}

impl From<&WalkError> for ExecutionReturn {
    fn from(err: &WalkError) -> Self {
        match err {
            WalkError::BrokenCascade(_) => ExecutionReturn::Broken,
            WalkError::InvalidCascade(_) => ExecutionReturn::InvalidSignature,
            WalkError::CircularCascade(_) => ExecutionReturn::Circular,
            WalkError::InsaneCascade { .. } => ExecutionReturn::Insane,
            WalkError::CascadeTooDeep(_) => ExecutionReturn::TooDeep,
            WalkError::VisitBudgetExhausted(_) => ExecutionReturn::BudgetExhausted,
        }
    }
}

impl From<&Result<(), WalkError>> for ExecutionReturn {
    fn from(res: &Result<(), WalkError>) -> Self {
        match res {
            Ok(()) => ExecutionReturn::Success,
            Err(e) => e.into(),
        }
    }
}

/// Walk limits and behaviour
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde_enabled", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde_enabled", serde(default))]
pub struct WalkConfig {
    /// Maximum recursion depth when a dual walk branches on divergent trusts
    pub max_depth: usize,
    /// Maximum number of keys a dual walk visits across all its branches, if bounded
    pub visit_budget: Option<usize>,
    /// Continue the parent branch when a split branch fails instead of failing the walk.
    /// Only available through the return-code form.
    pub resilient: bool,
}

impl Default for WalkConfig {
    fn default() -> Self {
        WalkConfig {
            max_depth: DEFAULT_MAX_DEPTH,
            visit_budget: Some(DEFAULT_VISIT_BUDGET),
            resilient: false,
        }
    }
}

/// Which of the two rings of a dual walk a step happened on. Single walks only use
/// `Primary`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    /// The first ring given to the walk
    Primary,
    /// The second ring given to the walk
    Secondary,
}

impl Side {
    pub(crate) fn other(self) -> Side {
        match self {
            Side::Primary => Side::Secondary,
            Side::Secondary => Side::Primary,
        }
    }

    pub(crate) fn index(self) -> usize {
        match self {
            Side::Primary => 0,
            Side::Secondary => 1,
        }
    }
}

/// What happened at a walk step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// A key was reached
    Saw,
    /// The trust leaving a key is about to be verified
    Check,
    /// The trust leaving a key verified; the key is its vouchee
    Accept,
    /// The walk switched to the other ring
    Swap,
    /// Both rings hold a trust for the key; a branch is being explored
    Split,
    /// A branch failed and was abandoned
    Reject,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EventKind::Saw => "saw",
            EventKind::Check => "check",
            EventKind::Accept => "accept",
            EventKind::Swap => "swap",
            EventKind::Split => "split",
            EventKind::Reject => "reject",
        };
        f.write_str(s)
    }
}

/// Event handed to a walker's info callback
#[derive(Debug, Clone, Copy)]
pub struct WalkEvent<'k, K> {
    /// What happened
    pub kind: EventKind,
    /// The ring active at the time
    pub side: Side,
    /// Branch depth, zero for the top-level walk
    pub depth: usize,
    /// The key concerned
    pub key: &'k K,
}

type InfoCallback<'a, K> = Box<dyn for<'k> FnMut(&WalkEvent<'k, K>) + 'a>;

/// Runs single and dual walks with a fixed configuration.
///
/// # Example
/// ```
/// use key_cascade::cascade::Ring;
/// use key_cascade::common::SecretKey;
/// use key_cascade::traits::CascadeSigner;
/// use key_cascade::trust::Trust;
/// use key_cascade::walk::{ExecutionReturn, Walker};
///
/// let keys: Vec<_> = (0..3u8).map(|i| SecretKey::from_bytes(&[i; 32]).unwrap()).collect();
/// let ring: Ring = vec![
///     Trust::create(&keys[0], keys[1].public_key()),
///     Trust::create(&keys[1], keys[2].public_key()),
/// ]
/// .into_iter()
/// .collect();
///
/// let mut walker = Walker::new();
/// assert!(walker.run(&ring, &keys[2].public_key(), &keys[0].public_key()).is_ok());
/// assert_eq!(
///     walker.run_code(&ring, &keys[0].public_key(), &keys[2].public_key()),
///     ExecutionReturn::Broken
/// );
/// ```
pub struct Walker<'a, K: CascadeKey = PublicKey> {
    pub(crate) config: WalkConfig,
    info_callback: Option<InfoCallback<'a, K>>,
}

impl<'a, K: CascadeKey> Default for Walker<'a, K> {
    fn default() -> Self {
        Walker {
            config: WalkConfig::default(),
            info_callback: None,
        }
    }
}

impl<'a, K: CascadeKey> fmt::Debug for Walker<'a, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Walker")
            .field("config", &self.config)
            .field("info_callback", &self.info_callback.is_some())
            .finish()
    }
}

impl<'a, K: CascadeKey> Walker<'a, K> {
    /// A walker with the default configuration and no callback
    pub fn new() -> Self {
        Self::default()
    }

    /// A walker with the given configuration
    pub fn with_config(config: WalkConfig) -> Self {
        Walker {
            config,
            info_callback: None,
        }
    }

    /// The active configuration
    pub fn config(&self) -> &WalkConfig {
        &self.config
    }

    /// Set the dual-walk depth ceiling
    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.config.max_depth = max_depth;
        self
    }

    /// Set or lift the dual-walk visit budget
    pub fn visit_budget(mut self, budget: Option<usize>) -> Self {
        self.config.visit_budget = budget;
        self
    }

    /// Enable or disable resilient dual walks
    pub fn resilient(mut self, resilient: bool) -> Self {
        self.config.resilient = resilient;
        self
    }

    /// Receive every walk event. The callback only observes; it cannot alter the walk.
    pub fn info_callback<F>(mut self, callback: F) -> Self
    where
        F: for<'k> FnMut(&WalkEvent<'k, K>) + 'a,
    {
        self.info_callback = Some(Box::new(callback));
        self
    }

    pub(crate) fn emit(&mut self, kind: EventKind, side: Side, depth: usize, key: &K) {
        tracing::trace!(event = %kind, ?side, depth, key = %key.fingerprint(), "cascade walk");
        if let Some(callback) = self.info_callback.as_mut() {
            callback(&WalkEvent {
                kind,
                side,
                depth,
                key,
            });
        }
    }

    /// Walk `ring` from `source` until `target` is reached.
    ///
    /// # Errors
    /// * `BrokenCascade` if the chain ends before `target`
    /// * `CircularCascade` if a key is reached twice
    /// * `InsaneCascade` if a trust is indexed under a key other than its voucher
    /// * `InvalidCascade` if a trust fails verification
    pub fn run(&mut self, ring: &Ring<K>, target: &K, source: &K) -> Result<(), Error> {
        self.walk_single(ring, target, source).map_err(Error::from)
    }

    /// Same as [`Walker::run`], reporting the outcome as a return code.
    pub fn run_code(&mut self, ring: &Ring<K>, target: &K, source: &K) -> ExecutionReturn {
        ExecutionReturn::from(&self.walk_single(ring, target, source))
    }

    fn walk_single(&mut self, ring: &Ring<K>, target: &K, source: &K) -> Result<(), WalkError> {
        if source == target {
            return Ok(());
        }
        let res = self.walk_single_inner(ring, target, source);
        if let Err(e) = &res {
            tracing::debug!(error = %e, "cascade walk failed");
        }
        res
    }

    fn walk_single_inner(
        &mut self,
        ring: &Ring<K>,
        target: &K,
        source: &K,
    ) -> Result<(), WalkError> {
        let mut seen: HashSet<&K> = HashSet::new();
        let mut current = source;
        loop {
            self.emit(EventKind::Saw, Side::Primary, 0, current);
            if !seen.insert(current) {
                return Err(WalkError::CircularCascade(current.fingerprint()));
            }
            let trust = ring
                .get(current)
                .ok_or_else(|| WalkError::BrokenCascade(current.fingerprint()))?;
            if trust.voucher() != current {
                return Err(WalkError::InsaneCascade {
                    index: current.fingerprint(),
                    voucher: trust.voucher().fingerprint(),
                });
            }
            self.emit(EventKind::Check, Side::Primary, 0, current);
            trust
                .verify()
                .map_err(|_| WalkError::InvalidCascade(current.fingerprint()))?;
            current = trust.vouchee();
            self.emit(EventKind::Accept, Side::Primary, 0, current);
            if current == target {
                return Ok(());
            }
        }
    }
}

/// Walk `ring` from `source` to `target` with a default [`Walker`].
pub fn run<K: CascadeKey>(ring: &Ring<K>, target: &K, source: &K) -> Result<(), Error> {
    Walker::new().run(ring, target, source)
}
