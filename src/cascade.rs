//! Rings of trusts and the guarded operations that build them.
//!
//! Terminology:
//! * voucher: a public key that vouches for another public key (the vouchee) in a trust
//! * chain: trusts linked together, each vouchee becoming the voucher of the next trust
//! * ring (or cascade): every trust held by one party, indexed by voucher
use crate::common::PublicKey;
use crate::errors::{Error, WalkError};
use crate::traits::{CascadeHolder, CascadeKey, CascadeSigner};
use crate::trust::Trust;
use std::collections::btree_map::{self, BTreeMap};
use std::collections::HashSet;

#[cfg(feature = "serde_enabled")]
use serde::{Deserialize, Serialize};

/// A mapping from voucher key to the single trust that voucher has made.
///
/// Every entry should satisfy `ring[k].voucher() == k`. Rings loaded from untrusted input
/// may violate this; walkers check it at every hop and [`Ring::check_sanity`] checks it
/// up front.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde_enabled", derive(Serialize, Deserialize))]
#[cfg_attr(
    feature = "serde_enabled",
    serde(
        transparent,
        bound(
            serialize = "K: Serialize, K::Sig: Serialize",
            deserialize = "K: Deserialize<'de>, K::Sig: Deserialize<'de>"
        )
    )
)]
pub struct Ring<K: CascadeKey = PublicKey> {
    trusts: BTreeMap<K, Trust<K>>,
}

impl<K: CascadeKey> Default for Ring<K> {
    fn default() -> Self {
        Ring {
            trusts: BTreeMap::new(),
        }
    }
}

impl<K: CascadeKey> Ring<K> {
    /// An empty ring
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of trusts in the ring
    pub fn len(&self) -> usize {
        self.trusts.len()
    }

    /// Whether the ring holds no trusts
    pub fn is_empty(&self) -> bool {
        self.trusts.is_empty()
    }

    /// Whether `voucher` has an entry
    pub fn contains(&self, voucher: &K) -> bool {
        self.trusts.contains_key(voucher)
    }

    /// The trust indexed under `voucher`
    pub fn get(&self, voucher: &K) -> Option<&Trust<K>> {
        self.trusts.get(voucher)
    }

    /// Iterate over `(index, trust)` entries in key order
    pub fn iter(&self) -> btree_map::Iter<'_, K, Trust<K>> {
        self.trusts.iter()
    }

    /// Insert `trust` under its voucher.
    ///
    /// # Errors
    /// Fails with `KeyAlreadyInCascade` if the voucher already has an entry and
    /// `overwrite` is false. The ring is left untouched in that case.
    pub fn insert(&mut self, trust: Trust<K>, overwrite: bool) -> Result<(), Error> {
        if !overwrite && self.trusts.contains_key(trust.voucher()) {
            return Err(Error::KeyAlreadyInCascade(trust.voucher().fingerprint()));
        }
        self.trusts.insert(trust.voucher().clone(), trust);
        Ok(())
    }

    /// Insert under an arbitrary index without any checks. Used when merging rings that
    /// may already be insane; walkers still catch the mismatch.
    pub(crate) fn insert_unchecked(&mut self, index: K, trust: Trust<K>) {
        self.trusts.insert(index, trust);
    }

    /// Report the first entry indexed under a key other than its voucher.
    pub fn check_sanity(&self) -> Result<(), WalkError> {
        match self.trusts.iter().find(|(k, t)| *k != t.voucher()) {
            Some((index, trust)) => Err(WalkError::InsaneCascade {
                index: index.fingerprint(),
                voucher: trust.voucher().fingerprint(),
            }),
            None => Ok(()),
        }
    }

    /// Follow the chain starting at `from`, yielding each trust reached. Signatures are
    /// not verified; iteration stops at the end of the chain or on a repeated key.
    pub fn chain<'a>(&'a self, from: &'a K) -> Chain<'a, K> {
        Chain {
            ring: self,
            next: Some(from),
            seen: HashSet::new(),
        }
    }
}

impl<K: CascadeKey> FromIterator<Trust<K>> for Ring<K> {
    /// Later trusts from the same voucher replace earlier ones.
    fn from_iter<I: IntoIterator<Item = Trust<K>>>(iter: I) -> Self {
        let mut ring = Ring::new();
        for trust in iter {
            ring.insert_unchecked(trust.voucher().clone(), trust);
        }
        ring
    }
}

/// Iterator returned by [`Ring::chain`]
#[derive(Debug)]
pub struct Chain<'a, K: CascadeKey> {
    ring: &'a Ring<K>,
    next: Option<&'a K>,
    seen: HashSet<&'a K>,
}

impl<'a, K: CascadeKey> Iterator for Chain<'a, K> {
    type Item = &'a Trust<K>;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next.take()?;
        if !self.seen.insert(current) {
            return None;
        }
        let trust = self.ring.get(current)?;
        self.next = Some(trust.vouchee());
        Some(trust)
    }
}

/// Options for [`add_trust`] and [`add_key`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddOptions {
    /// Create an empty ring when the holder has none yet
    pub init_if_empty: bool,
    /// Replace an existing trust from the same voucher
    pub overwrite: bool,
}

impl Default for AddOptions {
    fn default() -> Self {
        AddOptions {
            init_if_empty: true,
            overwrite: false,
        }
    }
}

/// Add `trust` to the ring held by `holder`.
///
/// # Errors
/// * `NotACascadeHolder` if `holder` cannot hold a cascade
/// * `UninitializedCascade` if it holds none and `init_if_empty` is false
/// * `KeyAlreadyInCascade` if the voucher already vouched and `overwrite` is false
pub fn add_trust<K, H>(holder: &mut H, trust: Trust<K>, options: AddOptions) -> Result<(), Error>
where
    K: CascadeKey,
    H: CascadeHolder<K> + ?Sized,
{
    let slot = holder.cascade_slot_mut().ok_or(Error::NotACascadeHolder)?;
    if slot.is_none() {
        if !options.init_if_empty {
            return Err(Error::UninitializedCascade);
        }
        tracing::debug!("initializing empty cascade");
    }
    let fingerprint = trust.voucher().fingerprint();
    slot.get_or_insert_with(Ring::new)
        .insert(trust, options.overwrite)?;
    tracing::debug!(
        voucher = %fingerprint,
        overwrite = options.overwrite,
        "added trust to cascade"
    );
    Ok(())
}

/// Create a trust in which `authority` vouches for `target` and add it to `holder`.
///
/// Shorthand for `add_trust(holder, Trust::create(authority, target), options)`.
pub fn add_key<S, H>(
    holder: &mut H,
    authority: &S,
    target: S::Key,
    options: AddOptions,
) -> Result<(), Error>
where
    S: CascadeSigner,
    H: CascadeHolder<S::Key> + ?Sized,
{
    add_trust(holder, Trust::create(authority, target), options)
}
