//! Content domain model.
//!
//! # Responsibility
//! - Define the typed article record and the repository node read model.
//! - Keep write-side validation next to the data it guards.
//!
//! # Invariants
//! - Every node is addressed by a canonical content path.
//! - Article paths always end with their language segment.

pub mod article;
pub mod node;
