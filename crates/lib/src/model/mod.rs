//! Static description of what can be built.
//!
//! - [`Target`]: one architecture/toolchain/flags/output configuration
//! - [`Project`]: project metadata plus its ordered list of targets

mod project;
mod target;

pub use project::{ModelError, PROJECT_FILENAME, Project};
pub use target::{Target, Tool};
