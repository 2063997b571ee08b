//! Reading and writing model artifacts

use std::fs;
use std::path::Path;

use prost::Message;
use serde::Serialize;
use tracing::info;

use crate::error::Result;
use crate::proto::ModelProto;

/// Serialize a model to `path`, creating parent directories, and return
/// the number of bytes written
pub fn save_model<P: AsRef<Path>>(path: P, model: &ModelProto) -> Result<u64> {
    let path = path.as_ref();
    ensure_parent(path)?;

    let bytes = model.encode_to_vec();
    fs::write(path, &bytes)?;

    info!(path = %path.display(), bytes = bytes.len(), "Model written");
    Ok(bytes.len() as u64)
}

/// Read and decode a model file without checking it
pub fn load_model<P: AsRef<Path>>(path: P) -> Result<ModelProto> {
    let bytes = fs::read(path.as_ref())?;
    Ok(ModelProto::decode(bytes.as_slice())?)
}

/// Write any serializable value as pretty-printed JSON
pub fn write_json<P: AsRef<Path>, T: Serialize>(path: P, value: &T) -> Result<u64> {
    let path = path.as_ref();
    ensure_parent(path)?;

    let content = serde_json::to_string_pretty(value)?;
    fs::write(path, &content)?;
    Ok(content.len() as u64)
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
