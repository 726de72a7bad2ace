//! Mapping remote keys onto flat local file names

/// Local file name for a remote key
///
/// Takes everything after the last `/` when that `/` is past the first
/// character; otherwise the key is used as-is. Remote folder structure is
/// discarded, so keys from different folders can map to the same name.
pub fn local_file_name(key: &str) -> &str {
    match key.rfind('/') {
        Some(idx) if idx > 0 => &key[idx + 1..],
        _ => key,
    }
}

/// Whether `name` can be joined onto the config folder without leaving it
pub fn is_safe_file_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', '\0'])
}
