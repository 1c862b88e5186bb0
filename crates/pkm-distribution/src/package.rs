use std::fmt;

use pkm_pep508::Dependency;

use crate::descriptor::PackageDescriptor;
use crate::environment::Environment;

/// A single resolvable unit: a concrete `(name, version)` plus the behavior needed to place it
/// onto disk. Repository backends (`pkm-resolver`) return `Package` implementations; the build
/// orchestrator (`pkm-build`) and installer (`pkm-install`) provide the concrete variants (wheel,
/// sdist-needing-build, local directory, VCS checkout, direct URL).
///
/// Dynamic dispatch: this is a trait object boundary so third-party backends can plug in, in
/// contrast to the closed enum `pkm-resolver` uses for its fixed URL-scheme table.
pub trait Package: fmt::Debug {
    type Err: std::error::Error + Send + Sync + 'static;

    fn descriptor(&self) -> &PackageDescriptor;

    /// Whether this package's artifact (a wheel's tags, a sdist's `requires-python`) can be used
    /// in `env` at all, independent of the solver's version constraints.
    fn is_compatible_with(&self, env: &Environment) -> bool;

    /// The dependencies this package declares, marker-filtered for `env`. Some packages (sdists
    /// whose `build-system` table must be read from disk, or those needing a network fetch) may
    /// require the environment to resolve extras-conditional dependencies.
    fn dependencies(&self, env: &Environment) -> Result<Vec<Dependency>, Self::Err>;

    /// Materializes this package into `env`: for a wheel, unpacks it; for a source archive,
    /// routes through the build orchestrator first. Returns once the package is installed and
    /// its `RECORD` verified.
    fn install_to(&self, env: &mut Environment) -> Result<(), Self::Err>;
}
