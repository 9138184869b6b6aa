//! Search dispatcher: engine registry, sequential fan-out, result merging.
//!
//! This module holds the engines activated from configuration, routes
//! single-engine searches by name, and runs multi-engine searches one engine
//! at a time, merging tags and sources by set union.

pub mod listener;
pub mod reverse_search;

pub use listener::{EngineCompletion, NoopListener, SearchListener};
pub use reverse_search::{ReverseSearch, SearchOptions};
