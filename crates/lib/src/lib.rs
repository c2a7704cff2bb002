//! skbuild-lib: per-architecture build orchestration for SK-Build
//!
//! This crate provides everything behind the `skb` binary:
//! - `model`: projects and their targets (`project.json`)
//! - `build`: the pipeline that compiles changed sources and links a target
//! - `detect` and `directive`: change detection and architecture gating
//! - `events` and `plugin`: lifecycle hooks and the built-in plugins
//! - `config`: string-typed access to plugin configuration

pub mod arch;
pub mod build;
pub mod config;
pub mod detect;
pub mod directive;
pub mod events;
pub mod exec;
pub mod layout;
pub mod model;
pub mod paths;
pub mod placeholder;
pub mod plugin;
pub mod util;
