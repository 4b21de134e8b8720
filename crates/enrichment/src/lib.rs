//! Concurrent per-entity enrichment core.
//!
//! Manages N independent asynchronous enrichment lifecycles against a
//! keyed collection of display entities: camera feeds polled on a
//! fixed cadence ([`scheduler::PollScheduler`]) and incidents scored
//! on explicit user action ([`dispatcher::TriggerDispatcher`]). Both
//! drive the same [`tracker::LifecycleTracker`], which serializes
//! enrichment per entity id while allowing full concurrency across
//! distinct ids.
//!
//! Result updates and failures are broadcast via a
//! [`tokio::sync::broadcast`] channel. Call
//! [`tracker::LifecycleTracker::subscribe`] to receive them.

pub mod client;
pub mod dispatcher;
pub mod events;
pub mod scheduler;
pub mod status;
pub mod tracker;
