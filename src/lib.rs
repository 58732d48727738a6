//! Key cascades: signed key-delegation chains.
//!
//! A cascade (or ring) is a set of trusts, each one a statement signed by a voucher key
//! that a vouchee key is its legitimate successor. A consumer that only ever trusted key
//! A can accept an artifact signed by key B once a chain of verified trusts leads from A
//! to B, without A's original signature being redistributed.
//!
//! * [`trust`]: creating single trusts
//! * [`cascade`]: rings and the guarded insertion into a holder's ring
//! * [`walk`]: verifying a chain through one ring
//! * [`dual`]: verifying a chain through two rings at once
//! * [`migrate`]: deciding whether a differently keyed update can be accepted
//!
#![warn(missing_docs, rust_2018_idioms)]

pub mod cascade;
pub mod common;
pub mod dual;
mod errors;
pub mod manifest;
pub mod migrate;
pub mod traits;
pub mod trust;
pub mod walk;

pub use errors::{Error, WalkError};
