// src/watch/mod.rs

//! File watching and change detection.
//!
//! - [`patterns`] compiles `[[watch]]` bindings into glob matchers.
//! - [`event_handler`] turns a batch of changed paths into one trigger,
//!   dropping tasks already covered by a dependent and, for `use_hash`
//!   bindings, changes that leave the watched contents identical.
//! - [`watcher`] wires `notify` to the handler with debouncing and feeds
//!   the runtime and the live-reload hub.

pub mod cache;
pub mod dag_filter;
pub mod event_handler;
pub mod hash;
pub mod path_utils;
pub mod patterns;
pub mod watcher;

pub use event_handler::{WatchDecision, WatchEventHandler};
pub use hash::MemoryHashStore;
pub use patterns::{
    BindingProfile, WatchBinding, bindings_from_config, build_globset, compile_bindings,
};
pub use watcher::{WatcherHandle, spawn_watcher};
