//! Deciding whether a differently keyed update can be trusted.
//!
//! Migration establishes that the key of a `target` holder descends from the key of a
//! `local` holder through the cascades the two carry, then verifies the target's own
//! payload signature. No partial result is ever accepted: a failed key walk or a bad
//! payload signature both reject the target.
use crate::errors::Error;
use crate::traits::{CascadeHolder, CascadeKey, Keyholder};
use crate::walk::{WalkConfig, Walker};

/// Which cascades a migration may draw on, and how walks are run.
///
/// # Example
/// ```
/// use key_cascade::cascade::{add_key, AddOptions};
/// use key_cascade::common::SecretKey;
/// use key_cascade::manifest::Manifest;
/// use key_cascade::migrate::Migration;
/// use key_cascade::traits::CascadeSigner;
///
/// let old = SecretKey::from_bytes(&[1u8; 32]).unwrap();
/// let new = SecretKey::from_bytes(&[2u8; 32]).unwrap();
///
/// let mut local = Manifest::new("core", 0);
/// local.sign(&old);
///
/// let mut target = Manifest::new("core", 1);
/// add_key(&mut target, &old, new.public_key(), AddOptions::default()).unwrap();
/// target.sign(&new);
///
/// assert!(Migration::new().run(&target, &local).is_ok());
/// assert!(Migration::new().use_target_cascade(false).run(&target, &local).is_err());
/// ```
#[derive(Debug)]
pub struct Migration<'a, K: CascadeKey = crate::common::PublicKey> {
    use_target_cascade: bool,
    use_local_cascade: bool,
    walker: Walker<'a, K>,
}

impl<'a, K: CascadeKey> Default for Migration<'a, K> {
    fn default() -> Self {
        Migration {
            use_target_cascade: true,
            use_local_cascade: true,
            walker: Walker::new(),
        }
    }
}

impl<'a, K: CascadeKey> Migration<'a, K> {
    /// A migration drawing on both cascades with a default walker
    pub fn new() -> Self {
        Self::default()
    }

    /// Allow or forbid walking the target's cascade
    pub fn use_target_cascade(mut self, enabled: bool) -> Self {
        self.use_target_cascade = enabled;
        self
    }

    /// Allow or forbid walking the local cascade
    pub fn use_local_cascade(mut self, enabled: bool) -> Self {
        self.use_local_cascade = enabled;
        self
    }

    /// Run walks with `walker`, e.g. one carrying an info callback. The walker must not
    /// be resilient: [`Migration::run`] refuses it with `ResilientRequiresReturnCode`.
    pub fn walker(mut self, walker: Walker<'a, K>) -> Self {
        self.walker = walker;
        self
    }

    /// Run walks with a default walker using `config`. As for [`Migration::walker`],
    /// `config.resilient` must be false.
    pub fn walk_config(mut self, config: WalkConfig) -> Self {
        self.walker = Walker::with_config(config);
        self
    }

    /// Check that `target` may replace `local`.
    ///
    /// # Errors
    /// * `ResilientRequiresReturnCode` if the walker is resilient, whatever the keys
    /// * `NotAKeyholder` if either side has no key
    /// * `KeyMismatch` if the keys differ and both cascades are disallowed
    /// * `NotACascadeHolder` if the keys differ and neither side has a usable cascade
    /// * any walk error if the keys cannot be linked
    /// * `Unsigned` or `InvalidPayloadSignature` if the target's payload does not verify
    pub fn run<T, L>(&mut self, target: &T, local: &L) -> Result<(), Error>
    where
        T: Keyholder<K> + CascadeHolder<K> + ?Sized,
        L: Keyholder<K> + CascadeHolder<K> + ?Sized,
    {
        if self.walker.config.resilient {
            return Err(Error::ResilientRequiresReturnCode);
        }
        let target_key = target.key().ok_or(Error::NotAKeyholder)?;
        let local_key = local.key().ok_or(Error::NotAKeyholder)?;

        if target_key != local_key {
            self.link(target_key, local_key, target, local)?;
        } else {
            tracing::debug!(key = %target_key.fingerprint(), "keys match, skipping cascades");
        }

        target.verify_payload()
    }

    fn link<T, L>(
        &mut self,
        target_key: &K,
        local_key: &K,
        target: &T,
        local: &L,
    ) -> Result<(), Error>
    where
        T: CascadeHolder<K> + ?Sized,
        L: CascadeHolder<K> + ?Sized,
    {
        if !self.use_target_cascade && !self.use_local_cascade {
            return Err(Error::KeyMismatch);
        }
        let target_ring = target.cascade().ok().filter(|_| self.use_target_cascade);
        let local_ring = local.cascade().ok().filter(|_| self.use_local_cascade);

        tracing::debug!(
            from = %local_key.fingerprint(),
            to = %target_key.fingerprint(),
            target_cascade = target_ring.is_some(),
            local_cascade = local_ring.is_some(),
            "migrating between keys"
        );
        match (target_ring, local_ring) {
            (Some(t), Some(l)) => self.walker.dual_run(target_key, local_key, t, l),
            (Some(ring), None) | (None, Some(ring)) => self.walker.run(ring, target_key, local_key),
            (None, None) => Err(Error::NotACascadeHolder),
        }
    }
}

/// Check that `target` may replace `local`, drawing on both cascades.
pub fn migrate<K, T, L>(target: &T, local: &L) -> Result<(), Error>
where
    K: CascadeKey,
    T: Keyholder<K> + CascadeHolder<K> + ?Sized,
    L: Keyholder<K> + CascadeHolder<K> + ?Sized,
{
    Migration::new().run(target, local)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::cascade::{add_key, AddOptions};
    use crate::common::SecretKey;
    use crate::errors::WalkError;
    use crate::manifest::Manifest;
    use crate::traits::CascadeSigner;

    fn key(seed: u8) -> SecretKey {
        SecretKey::from_bytes(&[seed; 32]).unwrap()
    }

    fn signed(rel: u64, sk: &SecretKey) -> Manifest {
        let mut m = Manifest::new("pkg", rel);
        m.add_file("main.rs", b"fn main() {}");
        m.sign(sk);
        m
    }

    #[test]
    fn same_key_skips_cascades() {
        let local = signed(0, &key(0));
        let mut target = signed(1, &key(0));
        assert!(migrate(&target, &local).is_ok());

        // an invalid cascade on either side is never consulted
        let mut bogus = crate::cascade::Ring::new();
        bogus.insert_unchecked(
            key(0).public_key(),
            crate::trust::Trust::create(&key(3), key(4).public_key()),
        );
        target.cascade = Some(bogus);
        target.sign(&key(0));
        assert!(migrate(&target, &local).is_ok());

        target.rel = 7;
        assert_eq!(migrate(&target, &local), Err(Error::InvalidPayloadSignature));
    }

    #[test]
    fn differing_keys_without_cascades() {
        let local = signed(0, &key(0));
        let target = signed(1, &key(1));
        assert_eq!(
            Migration::new()
                .use_target_cascade(false)
                .use_local_cascade(false)
                .run(&target, &local),
            Err(Error::KeyMismatch)
        );
        assert_eq!(migrate(&target, &local), Err(Error::NotACascadeHolder));
    }

    #[test]
    fn target_cascade_links_keys() {
        let local = signed(0, &key(0));
        let mut target = Manifest::new("pkg", 1);
        add_key(&mut target, &key(0), key(1).public_key(), AddOptions::default()).unwrap();
        target.sign(&key(1));
        assert!(migrate(&target, &local).is_ok());
    }

    #[test]
    fn local_cascade_links_keys() {
        let mut local = Manifest::new("pkg", 0);
        add_key(&mut local, &key(0), key(1).public_key(), AddOptions::default()).unwrap();
        local.sign(&key(0));
        let target = signed(1, &key(1));
        assert!(migrate(&target, &local).is_ok());
        assert_eq!(
            Migration::new().use_local_cascade(false).run(&target, &local),
            Err(Error::NotACascadeHolder)
        );
    }

    #[test]
    fn split_trust_needs_both_cascades() {
        let mut local = Manifest::new("pkg", 0);
        add_key(&mut local, &key(0), key(1).public_key(), AddOptions::default()).unwrap();
        local.sign(&key(0));
        let mut target = Manifest::new("pkg", 1);
        add_key(&mut target, &key(1), key(2).public_key(), AddOptions::default()).unwrap();
        target.sign(&key(2));

        assert!(migrate(&target, &local).is_ok());
        assert!(matches!(
            Migration::new().use_local_cascade(false).run(&target, &local),
            Err(Error::Walk(WalkError::BrokenCascade(_)))
        ));
    }

    #[test]
    fn cascade_to_wrong_key_is_rejected() {
        let local = signed(0, &key(0));
        let mut target = Manifest::new("pkg", 1);
        add_key(&mut target, &key(0), key(9).public_key(), AddOptions::default()).unwrap();
        target.sign(&key(1));
        assert!(matches!(
            migrate(&target, &local),
            Err(Error::Walk(WalkError::BrokenCascade(_)))
        ));
    }

    #[test]
    fn linked_key_with_bad_payload_is_rejected() {
        let local = signed(0, &key(0));
        let mut target = Manifest::new("pkg", 1);
        add_key(&mut target, &key(0), key(1).public_key(), AddOptions::default()).unwrap();
        target.sign(&key(1));
        target.add_file("extra.rs", b"// injected");
        assert_eq!(migrate(&target, &local), Err(Error::InvalidPayloadSignature));
    }

    #[test]
    fn resilient_walker_is_refused_up_front() {
        let local = signed(0, &key(0));
        let mut target = Manifest::new("pkg", 1);
        add_key(&mut target, &key(0), key(1).public_key(), AddOptions::default()).unwrap();
        target.sign(&key(1));
        assert!(migrate(&target, &local).is_ok());

        // single cascade, two cascades and matching keys are all refused alike
        let config = WalkConfig {
            resilient: true,
            ..WalkConfig::default()
        };
        assert_eq!(
            Migration::new().walk_config(config).run(&target, &local),
            Err(Error::ResilientRequiresReturnCode)
        );
        let mut both = signed(0, &key(0));
        add_key(&mut both, &key(0), key(1).public_key(), AddOptions::default()).unwrap();
        both.sign(&key(0));
        assert_eq!(
            Migration::new()
                .walker(Walker::new().resilient(true))
                .run(&target, &both),
            Err(Error::ResilientRequiresReturnCode)
        );
        assert_eq!(
            Migration::new().walk_config(config).run(&local, &local),
            Err(Error::ResilientRequiresReturnCode)
        );
    }

    #[test]
    fn unkeyed_sides_are_refused() {
        let local = Manifest::new("pkg", 0);
        let target = signed(1, &key(1));
        assert_eq!(migrate(&target, &local), Err(Error::NotAKeyholder));
    }
}
