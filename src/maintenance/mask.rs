use std::path::Path;

use shell_escape::unix::escape;

use super::{MaintenanceError, Progress, Reporter};
use crate::remote::RemoteHost;

/// Where the calibration image lives and where the previous one is kept.
#[derive(Debug, Clone)]
pub struct MaskTarget {
    pub path: String,
    pub backup: String,
}

pub fn rename_command(from: &str, to: &str) -> String {
    format!("mv {} {}", escape(from.into()), escape(to.into()))
}

/// Moves any existing mask aside, then uploads `local` in its place.
pub fn replace_mask(
    remote: &mut dyn RemoteHost,
    target: &MaskTarget,
    local: &Path,
    reporter: &dyn Reporter,
) -> Result<(), MaintenanceError> {
    if remote.exists(&target.path)? {
        remote.run_shell(&[rename_command(&target.path, &target.backup)])?;
        tracing::info!("moved {} to {}", target.path, target.backup);
        reporter.progress(Progress::MaskRenamed {
            backup: target.backup.clone(),
        });
    } else {
        tracing::info!("no mask at {}", target.path);
        reporter.progress(Progress::NoExistingMask);
    }

    let file_name = local
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| local.display().to_string());
    reporter.progress(Progress::Uploading { file_name });

    remote.upload(local, &target.path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rename_quotes_paths_with_spaces() {
        assert_eq!(
            rename_command("/data/my mask.png", "/data/old.png"),
            "mv '/data/my mask.png' /data/old.png"
        );
    }
}
