use camino::Utf8PathBuf;
use pkm_pep508::MarkerEnvironment;

/// The fields of a discovered interpreter that matter to the rest of the workspace: its version
/// (for satisfying a `python` dependency and for picking `site-packages` paths), the marker
/// values it contributes to dependency evaluation, and the wheel compatibility tags it accepts.
///
/// Queried once per interpreter path and cached by the zoo — re-querying on every
/// lookup would mean spawning a subprocess per candidate every time a dependency is resolved.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct InterpreterInfo {
    pub major: u8,
    pub minor: u8,
    pub patch: u8,
    /// `CPython`, `PyPy`, etc — `platform_python_implementation`.
    pub implementation: String,
    pub base_prefix: String,
    pub base_exec_prefix: String,
    /// `(python_tag, abi_tag, platform_tag)` triples this interpreter's wheels may carry,
    /// most-specific first.
    pub compatible_tags: Vec<(String, String, String)>,
    pub markers: MarkerEnvironmentFields,
}

/// The string-valued marker fields queried from the interpreter; converted into a
/// [`MarkerEnvironment`] by [`InterpreterInfo::marker_environment`].
#[derive(Debug, Clone, serde::Deserialize)]
pub struct MarkerEnvironmentFields {
    pub os_name: String,
    pub sys_platform: String,
    pub platform_machine: String,
    pub platform_python_implementation: String,
    pub platform_release: String,
    pub platform_system: String,
    pub platform_version: String,
    pub python_version: String,
    pub python_full_version: String,
    pub implementation_name: String,
    pub implementation_version: String,
}

impl InterpreterInfo {
    pub fn python_version(&self) -> String {
        format!("{}.{}.{}", self.major, self.minor, self.patch)
    }

    pub fn marker_environment(&self) -> MarkerEnvironment {
        use pkm_pep508::MarkerVar;
        MarkerEnvironment::new()
            .with(MarkerVar::OsName, self.markers.os_name.clone())
            .with(MarkerVar::SysPlatform, self.markers.sys_platform.clone())
            .with(MarkerVar::PlatformMachine, self.markers.platform_machine.clone())
            .with(MarkerVar::PlatformPythonImplementation, self.markers.platform_python_implementation.clone())
            .with(MarkerVar::PlatformRelease, self.markers.platform_release.clone())
            .with(MarkerVar::PlatformSystem, self.markers.platform_system.clone())
            .with(MarkerVar::PlatformVersion, self.markers.platform_version.clone())
            .with(MarkerVar::PythonVersion, self.markers.python_version.clone())
            .with(MarkerVar::PythonFullVersion, self.markers.python_full_version.clone())
            .with(MarkerVar::ImplementationName, self.markers.implementation_name.clone())
            .with(MarkerVar::ImplementationVersion, self.markers.implementation_version.clone())
    }
}

/// A discovered interpreter: its executable path plus the introspected [`InterpreterInfo`].
#[derive(Debug, Clone)]
pub struct Interpreter {
    pub path: Utf8PathBuf,
    pub info: InterpreterInfo,
}

impl Interpreter {
    pub fn version(&self) -> pkm_version::Version {
        pkm_version::Version::parse(&self.info.python_version()).expect("queried interpreter version is well-formed")
    }
}
