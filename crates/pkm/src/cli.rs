use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand, ValueEnum};

/// pkm: resolve, build, and install Python packages.
#[derive(Parser)]
#[command(name = "pkm", author, version, about)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Use verbose output.
    #[arg(global = true, long, short)]
    pub verbose: bool,

    /// Path to a project context (a directory holding `pyproject.toml`) to operate on instead of
    /// the current directory.
    #[arg(global = true, long, short = 'c')]
    pub context: Option<Utf8PathBuf>,

    /// Use the global (cross-project) context instead of a per-project one.
    #[arg(global = true, long, short = 'g')]
    pub global_context: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Build the project (or every project in the workspace group).
    Build,
    /// Resolve and install dependencies; with no arguments, installs from the project/lockfile.
    Install(InstallArgs),
    /// Uninstall packages and drop them from the project config.
    Remove(RemoveArgs),
    /// Scaffold a new project from a named template.
    New(NewArgs),
    /// Upload built artifacts to the package index.
    Publish(PublishArgs),
    /// Bump the project version.
    Vbump(VbumpArgs),
    /// Activate the project environment and spawn the user's shell.
    Shell,
    /// Print reports about the project or a specific dependency.
    Show(ShowArgs),
}

#[derive(Args)]
pub struct InstallArgs {
    /// Dependencies to add, e.g. `requests>=2` — resolved and installed if given; if omitted,
    /// installs from the project's existing requirements.
    pub deps: Vec<String>,
}

#[derive(Args)]
pub struct RemoveArgs {
    /// Packages to uninstall and drop from the project config.
    #[clap(required = true)]
    pub packages: Vec<String>,
}

#[derive(Args)]
pub struct NewArgs {
    /// The name of the scaffolding template to use.
    pub template: String,
    /// Arguments passed through to the template.
    pub args: Vec<String>,
}

#[derive(Args)]
pub struct PublishArgs {
    pub user: String,
    pub password: String,
}

#[derive(Args)]
pub struct VbumpArgs {
    /// Which part of the version to bump; defaults to `patch`.
    #[clap(value_enum, default_value = "patch")]
    pub part: VersionPart,
}

#[derive(Copy, Clone, ValueEnum)]
pub enum VersionPart {
    Major,
    Minor,
    Patch,
    A,
    B,
    Rc,
}

#[derive(Args)]
pub struct ShowArgs {
    #[command(subcommand)]
    pub target: Option<ShowTarget>,
}

#[derive(Subcommand)]
pub enum ShowTarget {
    /// Print a report about one installed dependency.
    Package { dep: String },
}
