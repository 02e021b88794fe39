use std::thread;
use std::time::Duration;

use shell_escape::unix::escape;

use super::{Progress, Reporter};
use crate::remote::{RemoteError, RemoteHost};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceAction {
    Stop,
    Start,
}

impl ServiceAction {
    pub fn verb(self) -> &'static str {
        match self {
            ServiceAction::Stop => "stop",
            ServiceAction::Start => "start",
        }
    }
}

pub fn systemctl_command(service: &str, action: ServiceAction) -> String {
    format!("systemctl {} {}", action.verb(), escape(service.into()))
}

/// Issues `systemctl <action> <service>` and waits `settle` for the unit to
/// finish stopping or starting.
pub fn manage_service(
    remote: &mut dyn RemoteHost,
    service: &str,
    action: ServiceAction,
    settle: Duration,
    reporter: &dyn Reporter,
) -> Result<(), RemoteError> {
    reporter.progress(Progress::Service(action));
    tracing::info!("{} {service}", action.verb());

    let output = remote.run_shell(&[systemctl_command(service, action)])?;
    tracing::debug!("systemctl output: {}", output.trim());

    thread::sleep(settle);
    Ok(())
}
