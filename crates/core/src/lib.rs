//! Domain types for the NSSPIP enrichment core.
//!
//! Dependency-light crate shared by the enrichment library and the
//! monitor daemon: entity/feed types, AI-engine wire types, overlay
//! annotation derivation, and input validation.

pub mod error;
pub mod overlay;
pub mod types;
pub mod validation;
