use camino::Utf8PathBuf;
use pkm_interpreter::Interpreter;
use pkm_venv::EnvironmentZoo;
use url::Url;

const DEFAULT_INDEX_URL: &str = "https://pypi.org/simple/";

/// The single explicit state bag every command draws from, in place of module-level globals.
/// Built once in `main`, then threaded by reference into every command function. `index_url`
/// rather than a prebuilt `RegistryClient` because each resolve needs its own populate-once
/// candidate cache for per-run determinism, not one shared across unrelated commands.
pub struct Context {
    pub home: Utf8PathBuf,
    pub zoo: EnvironmentZoo,
    pub index_url: Url,
    pub interpreters: Vec<Interpreter>,
    pub verbose: bool,
}

impl Context {
    /// Builds the context for one invocation: resolves `<home>` (§6 `PKM_HOME` override or the
    /// OS-conventional user-data directory), points the registry client at the default index, and
    /// discovers local interpreters once up front so every command shares the same PATH scan.
    pub fn discover(home_override: Option<Utf8PathBuf>, verbose: bool) -> anyhow::Result<Self> {
        let home = home_override.unwrap_or_else(Self::default_home);
        let index_url = Url::parse(DEFAULT_INDEX_URL).expect("default index url is valid");
        Ok(Self {
            zoo: EnvironmentZoo::new(home.join("zoo")),
            index_url,
            interpreters: pkm_interpreter::discover_interpreters(),
            home,
            verbose,
        })
    }

    fn default_home() -> Utf8PathBuf {
        if let Ok(path) = std::env::var("PKM_HOME") {
            return Utf8PathBuf::from(path);
        }
        directories::ProjectDirs::from("", "", "pkm")
            .and_then(|dirs| Utf8PathBuf::from_path_buf(dirs.data_dir().join("pkm")).ok())
            .unwrap_or_else(|| Utf8PathBuf::from(".pkm"))
    }

    pub fn source_builds_dir(&self) -> Utf8PathBuf {
        self.home.join("source-builds")
    }
}
