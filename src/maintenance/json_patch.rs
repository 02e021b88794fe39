//! Read-modify-write of a handful of keys in a remote JSON document.

use serde::Serialize;
use serde_json::Value;
use serde_json::ser::PrettyFormatter;

use super::MaintenanceError;
use crate::remote::RemoteHost;

/// Replaces `fields` in the top-level object of `document`, leaving every other
/// key where it was. Keys missing from the document are appended.
pub fn patch_fields(
    document: &[u8],
    fields: &[(&str, Value)],
    path: &str,
) -> Result<Vec<u8>, MaintenanceError> {
    let mut root: Value =
        serde_json::from_slice(document).map_err(|source| MaintenanceError::InvalidJson {
            path: path.to_string(),
            source,
        })?;

    let Value::Object(object) = &mut root else {
        return Err(MaintenanceError::NotAnObject {
            path: path.to_string(),
        });
    };

    for (key, value) in fields {
        object.insert((*key).to_string(), value.clone());
    }

    to_pretty_json(&root).map_err(|source| MaintenanceError::InvalidJson {
        path: path.to_string(),
        source,
    })
}

/// Four-space indented output, matching the files shipped on the device.
pub fn to_pretty_json(value: &Value) -> Result<Vec<u8>, serde_json::Error> {
    let mut out = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
    value.serialize(&mut serializer)?;
    Ok(out)
}

pub fn update_remote_json(
    remote: &mut dyn RemoteHost,
    path: &str,
    fields: &[(&str, Value)],
) -> Result<(), MaintenanceError> {
    let current = remote.read_file(path)?;
    let patched = patch_fields(&current, fields, path)?;
    remote.write_file(path, &patched)?;

    let keys: Vec<&str> = fields.iter().map(|(k, _)| *k).collect();
    tracing::info!("updated {} in {path}", keys.join(", "));
    Ok(())
}
