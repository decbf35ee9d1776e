//! Outbound adapters implementing domain ports for external infrastructure.
//!
//! Adapters are thin translators between domain types and storage
//! representations. They contain no business logic: invariants such as the
//! package state machine or audit pairing live in the domain services.

pub mod persistence;
