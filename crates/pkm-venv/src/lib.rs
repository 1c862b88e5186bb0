//! Environment lifecycle: bare virtualenv creation, the environment zoo managing named general
//! and application environments, their `envinfo.toml`/`packages-lock.toml` persistence, and the
//! content-addressed shared-package store.

mod bare;
mod envinfo;
mod error;
mod store;
mod zoo;

pub use bare::{canonical_interpreter_path, create_bare_venv};
pub use envinfo::{EnvInfo, PackagesLock};
pub use error::Error;
pub use store::{LinkMode, SharedPackageStore};
pub use zoo::{EnvironmentKind, EnvironmentZoo, ZooEntry};
