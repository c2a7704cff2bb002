//! Lifecycle events plugins can hook into.
//!
//! Every build fires four phases in a fixed order:
//!
//! 1. [`Phase::PreBuild`]: target resolved, nothing compiled yet
//! 2. [`Phase::PreLink`]: every source compiled, linker not started
//! 3. [`Phase::PostLink`]: link succeeded
//! 4. [`Phase::PostBuild`]: snapshot refreshed, build about to return
//!
//! Handlers run synchronously in registration order and receive a fresh
//! [`BuildContext`] for the phase. Edits to the context's variables are seen
//! by later handlers and by the pipeline. Only an abort requested during
//! `PreBuild` stops the build; later aborts are logged and ignored.

use std::collections::HashMap;
use std::fmt;

use crate::arch::Arch;
use crate::model::{Project, Target};
use crate::placeholder::Variables;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
  PreBuild,
  PreLink,
  PostLink,
  PostBuild,
}

impl Phase {
  pub const ALL: [Phase; 4] = [Phase::PreBuild, Phase::PreLink, Phase::PostLink, Phase::PostBuild];

  /// Whether an abort requested in this phase stops the build.
  pub fn can_abort(self) -> bool {
    matches!(self, Phase::PreBuild)
  }
}

impl fmt::Display for Phase {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      Phase::PreBuild => "pre-build",
      Phase::PreLink => "pre-link",
      Phase::PostLink => "post-link",
      Phase::PostBuild => "post-build",
    };
    f.write_str(name)
  }
}

/// Payload handed to handlers for the duration of one phase.
///
/// Handlers must not keep references to it past their own invocation.
pub struct BuildContext<'a> {
  pub target: &'a Target,
  pub project: &'a Project,
  pub arch: Arch,
  pub variables: &'a mut Variables,
  abort: Option<String>,
}

impl<'a> BuildContext<'a> {
  pub fn new(target: &'a Target, project: &'a Project, variables: &'a mut Variables) -> Self {
    Self {
      target,
      project,
      arch: target.architecture,
      variables,
      abort: None,
    }
  }

  /// Request that the build stop, with an operator-facing reason.
  ///
  /// A later call replaces the reason of an earlier one.
  pub fn abort(&mut self, reason: impl Into<String>) {
    self.abort = Some(reason.into());
  }

  pub fn is_aborted(&self) -> bool {
    self.abort.is_some()
  }

  pub fn abort_reason(&self) -> Option<&str> {
    self.abort.as_deref()
  }

  /// Set a build variable visible to flag templates.
  pub fn set_var(&mut self, name: impl Into<String>, value: impl Into<String>) {
    self.variables.insert(name.into(), value.into());
  }

  /// Current value of a build variable.
  ///
  /// Path variables (`src`, `obj`, `dep`, `lds`, `bin`, `map`) hold plain
  /// paths relative to the project root. `objs` is already an argument list
  /// with each object quoted.
  pub fn var(&self, name: &str) -> Option<&str> {
    self.variables.get(name).map(String::as_str)
  }
}

pub type Handler = Box<dyn FnMut(&mut BuildContext<'_>)>;

/// Per-phase subscriber lists, owned by the pipeline.
#[derive(Default)]
pub struct EventBus {
  handlers: HashMap<Phase, Vec<Handler>>,
}

impl EventBus {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn subscribe<F>(&mut self, phase: Phase, handler: F)
  where
    F: FnMut(&mut BuildContext<'_>) + 'static,
  {
    self.handlers.entry(phase).or_default().push(Box::new(handler));
  }

  pub fn handler_count(&self, phase: Phase) -> usize {
    self.handlers.get(&phase).map_or(0, Vec::len)
  }

  /// Notify every handler of `phase`, in registration order.
  pub fn emit(&mut self, phase: Phase, ctx: &mut BuildContext<'_>) {
    if let Some(handlers) = self.handlers.get_mut(&phase) {
      for handler in handlers.iter_mut() {
        handler(ctx);
      }
    }
  }
}

impl fmt::Debug for EventBus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let mut map = f.debug_map();
    for phase in Phase::ALL {
      map.entry(&phase, &self.handler_count(phase));
    }
    map.finish()
  }
}
