use std::process::ExitCode;

mod build;
mod install;
mod new;
mod publish;
mod remove;
mod shell;
mod show;
mod vbump;

pub use build::build;
pub use install::install;
pub use new::new;
pub use publish::publish;
pub use remove::remove;
pub use shell::shell;
pub use show::show;
pub use vbump::vbump;

/// Exit codes: 0 success, 1 user error, 2 build/install failure, 3 unsolvable resolution.
#[derive(Copy, Clone)]
pub enum ExitStatus {
    Success,
    UserError,
    OperationFailure,
    Unsolvable,
}

impl From<ExitStatus> for ExitCode {
    fn from(status: ExitStatus) -> Self {
        match status {
            ExitStatus::Success => ExitCode::from(0),
            ExitStatus::UserError => ExitCode::from(1),
            ExitStatus::OperationFailure => ExitCode::from(2),
            ExitStatus::Unsolvable => ExitCode::from(3),
        }
    }
}
