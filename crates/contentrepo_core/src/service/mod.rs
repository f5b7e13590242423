//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository sessions into article-level APIs.
//! - Keep CLI and other callers decoupled from storage details.

pub mod article_accessor;
