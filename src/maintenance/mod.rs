//! The three canned device actions and the stop → change → start bracket
//! around them.

pub mod json_patch;
pub mod mask;
pub mod service;
#[cfg(test)]
pub(crate) mod testing;

use std::path::PathBuf;
use std::sync::mpsc;
use std::time::Duration;

use serde_json::Value;
use thiserror::Error;

use crate::model::config::{AppConfig, DeviceConfig};
use crate::msg::Msg;
use crate::remote::{ConnectParams, Connector, RemoteError, RemoteHost, remote_join};

pub use service::ServiceAction;

const PIXEL_KEYS: [&str; 2] = ["pixelSizeX", "pixelSizeY"];

const POWER_KEYS: [&str; 5] = [
    "smallArea",
    "smallAreaOffset",
    "normalArea",
    "normalAreaOffset",
    "largeAreaPower",
];

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    UpdatePixelSizes { x: f64, y: f64 },
    UploadMask { local: PathBuf },
    UpdatePowerSettings { value: i64 },
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::UpdatePixelSizes { .. } => "update pixel sizes",
            Action::UploadMask { .. } => "upload mask",
            Action::UpdatePowerSettings { .. } => "update power settings",
        }
    }
}

/// Intermediate steps worth showing on the status line.
#[derive(Debug, Clone, PartialEq)]
pub enum Progress {
    Connecting { host: String },
    Service(ServiceAction),
    MaskRenamed { backup: String },
    NoExistingMask,
    Uploading { file_name: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    PixelSizesUpdated { x: f64, y: f64 },
    MaskUploaded,
    PowerSettingsUpdated { value: i64 },
}

#[derive(Debug, Error)]
pub enum MaintenanceError {
    #[error(transparent)]
    Remote(#[from] RemoteError),
    #[error("invalid JSON in {path}: {source}")]
    InvalidJson {
        path: String,
        source: serde_json::Error,
    },
    #[error("{path} does not contain a JSON object")]
    NotAnObject { path: String },
    #[error("local file {} is not readable", .0.display())]
    LocalFileMissing(PathBuf),
}

impl MaintenanceError {
    pub fn is_invalid_json(&self) -> bool {
        matches!(
            self,
            MaintenanceError::InvalidJson { .. } | MaintenanceError::NotAnObject { .. }
        )
    }
}

pub trait Reporter {
    fn progress(&self, progress: Progress);
}

impl Reporter for mpsc::Sender<Msg> {
    fn progress(&self, progress: Progress) {
        let _ = self.send(Msg::JobProgress(progress));
    }
}

/// Runs actions against the device described by [`DeviceConfig`].
#[derive(Debug, Clone)]
pub struct Maintenance {
    device: DeviceConfig,
    settle: Duration,
}

impl Maintenance {
    pub fn new(device: DeviceConfig, settle: Duration) -> Self {
        Self { device, settle }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.device.clone(), config.service_settle())
    }

    /// Connects, runs `action` with the service stopped, and disconnects.
    pub fn run(
        &self,
        connector: &dyn Connector,
        params: &ConnectParams,
        action: &Action,
        reporter: &dyn Reporter,
    ) -> Result<Outcome, MaintenanceError> {
        params.validate()?;
        if let Action::UploadMask { local } = action {
            if !local.is_file() {
                return Err(MaintenanceError::LocalFileMissing(local.clone()));
            }
        }

        tracing::info!("{}: connecting to {}", action.name(), params.host);
        reporter.progress(Progress::Connecting {
            host: params.host.clone(),
        });
        let mut remote = connector.connect(params)?;

        let outcome = self.with_service_stopped(remote.as_mut(), reporter, |remote| {
            self.apply(remote, action, reporter)
        })?;

        tracing::info!("{} finished: {outcome:?}", action.name());
        Ok(outcome)
    }

    fn apply(
        &self,
        remote: &mut dyn RemoteHost,
        action: &Action,
        reporter: &dyn Reporter,
    ) -> Result<Outcome, MaintenanceError> {
        match action {
            Action::UpdatePixelSizes { x, y } => {
                let fields = [
                    (PIXEL_KEYS[0], Value::from(*x)),
                    (PIXEL_KEYS[1], Value::from(*y)),
                ];
                json_patch::update_remote_json(remote, &self.device.machine_json, &fields)?;
                Ok(Outcome::PixelSizesUpdated { x: *x, y: *y })
            }
            Action::UploadMask { local } => {
                let target = mask::MaskTarget {
                    path: remote_join(&self.device.mask_dir, &self.device.mask_file),
                    backup: remote_join(&self.device.mask_dir, &self.device.mask_backup),
                };
                mask::replace_mask(remote, &target, local, reporter)?;
                Ok(Outcome::MaskUploaded)
            }
            Action::UpdatePowerSettings { value } => {
                let fields = POWER_KEYS.map(|key| (key, Value::from(*value)));
                json_patch::update_remote_json(remote, &self.device.power_json, &fields)?;
                Ok(Outcome::PowerSettingsUpdated { value: *value })
            }
        }
    }

    /// Stops the service, runs `body`, then starts the service again even when
    /// `body` failed. The body's error wins over a restart error.
    fn with_service_stopped<T>(
        &self,
        remote: &mut dyn RemoteHost,
        reporter: &dyn Reporter,
        body: impl FnOnce(&mut dyn RemoteHost) -> Result<T, MaintenanceError>,
    ) -> Result<T, MaintenanceError> {
        let service = &self.device.service;
        service::manage_service(remote, service, ServiceAction::Stop, self.settle, reporter)?;

        let result = body(&mut *remote);
        let restart =
            service::manage_service(remote, service, ServiceAction::Start, self.settle, reporter);

        match (result, restart) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(err)) => Err(err.into()),
            (Err(err), Ok(())) => Err(err),
            (Err(err), Err(restart_err)) => {
                tracing::error!("failed to restart {service} after error: {restart_err}");
                Err(err)
            }
        }
    }
}
