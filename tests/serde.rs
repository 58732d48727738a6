//! Persisted rings, manifests and walk configuration must load back into values that walk
//! and verify exactly like the originals.
#![cfg(feature = "serde_enabled")]

use key_cascade::cascade::{add_key, AddOptions, Ring};
use key_cascade::common::{PublicKey, SecretKey, Signature};
use key_cascade::manifest::Manifest;
use key_cascade::traits::CascadeSigner;
use key_cascade::trust::Trust;
use key_cascade::walk::{run, ExecutionReturn, WalkConfig, Walker};
use std::collections::BTreeMap;

fn key(seed: u8) -> SecretKey {
    SecretKey::from_bytes(&[seed; 32]).unwrap()
}

#[test]
fn walk_config_from_json() {
    let config: WalkConfig =
        serde_json::from_str(r#"{"max_depth": 8, "resilient": true}"#).unwrap();
    assert_eq!(config.max_depth, 8);
    assert!(config.resilient);
    assert_eq!(config.visit_budget, WalkConfig::default().visit_budget);
}

#[test]
fn trust_cbor() {
    let trust = Trust::create(&key(0), key(1).public_key());
    let bytes = serde_cbor::to_vec(&trust).unwrap();
    let back: Trust = serde_cbor::from_slice(&bytes).unwrap();
    assert_eq!(back, trust);
    assert!(back.verify().is_ok());

    let bytes = serde_cbor::to_vec(trust.signature()).unwrap();
    let signature: Signature = serde_cbor::from_slice(&bytes).unwrap();
    assert_eq!(&signature, trust.signature());
}

#[test]
fn ring_cbor_keeps_walking() {
    let ring: Ring = (0..4u8)
        .map(|i| Trust::create(&key(i), key(i + 1).public_key()))
        .collect();
    let bytes = serde_cbor::to_vec(&ring).unwrap();
    let back: Ring = serde_cbor::from_slice(&bytes).unwrap();

    assert_eq!(back, ring);
    assert!(back.check_sanity().is_ok());
    assert!(run(&back, &key(4).public_key(), &key(0).public_key()).is_ok());
}

#[test]
fn misindexed_ring_loads_but_is_caught() {
    // hand-assemble a ring whose only entry is indexed under the wrong key
    let trust = Trust::create(&key(0), key(1).public_key());
    let mut entries: BTreeMap<PublicKey, Trust> = BTreeMap::new();
    entries.insert(key(7).public_key(), trust);
    let bytes = serde_cbor::to_vec(&entries).unwrap();
    let ring: Ring = serde_cbor::from_slice(&bytes).unwrap();

    assert!(ring.check_sanity().is_err());
    assert_eq!(
        Walker::new().run_code(&ring, &key(1).public_key(), &key(7).public_key()),
        ExecutionReturn::Insane
    );
}

#[test]
fn manifest_cbor_still_verifies() {
    let mut m = Manifest::new("core", 2);
    m.add_file("lib.rs", b"pub fn f() {}");
    add_key(&mut m, &key(0), key(1).public_key(), AddOptions::default()).unwrap();
    m.sign(&key(1));

    let bytes = serde_cbor::to_vec(&m).unwrap();
    let back: Manifest = serde_cbor::from_slice(&bytes).unwrap();
    assert_eq!(back, m);
    assert!(back.verify().is_ok());
}
