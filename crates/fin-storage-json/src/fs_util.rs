use std::{
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
};

use fin_core::CoreError;

const TMP_SUFFIX: &str = "tmp";

const ESCAPE: char = '_';
const EMPTY_NAME: &str = "_";

/// Filesystem-safe, collision-free file name for a user identifier.
///
/// Lowercase ASCII letters, digits and `-` pass through; every other byte becomes
/// `_xx` (lowercase hex), so distinct ids never share a file, even on
/// case-insensitive filesystems.
pub(crate) fn canonical_name(name: &str) -> String {
    if name.is_empty() {
        return EMPTY_NAME.into();
    }
    let mut encoded = String::with_capacity(name.len());
    for byte in name.bytes() {
        match byte {
            b'a'..=b'z' | b'0'..=b'9' | b'-' => encoded.push(char::from(byte)),
            _ => {
                encoded.push(ESCAPE);
                encoded.push_str(&format!("{byte:02x}"));
            }
        }
    }
    encoded
}

pub(crate) fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.to_path_buf();
    let ext = match path.extension().and_then(|ext| ext.to_str()) {
        Some(existing) => format!("{}.{}", existing, TMP_SUFFIX),
        None => TMP_SUFFIX.to_string(),
    };
    tmp.set_extension(ext);
    tmp
}

/// Stages `data` next to `path` and renames it into place.
pub(crate) fn write_atomic(path: &Path, data: &str) -> Result<(), CoreError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp = tmp_path(path);
    let mut file = File::create(&tmp)?;
    file.write_all(data.as_bytes())?;
    file.flush()?;
    file.sync_all()?;
    fs::rename(&tmp, path)?;
    Ok(())
}

pub(crate) fn remove_if_exists(path: &Path) -> Result<(), CoreError> {
    if path.exists() {
        fs::remove_file(path)?;
    }
    Ok(())
}
