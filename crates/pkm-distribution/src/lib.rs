//! Package, environment, and archive-filename types shared by the repository, solver, build,
//! and install layers — the vocabulary the rest of the workspace is built from.

mod descriptor;
mod environment;
mod filename;
mod package;

pub use descriptor::PackageDescriptor;
pub use environment::{Environment, EnvironmentLayout, EnvironmentState, UninitializedEnvironment};
pub use filename::{FilenameError, SourceDistFilename, WheelFilename, WheelTags};
pub use package::Package;
