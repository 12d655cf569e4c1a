use std::path::{Component, Path, PathBuf};

/// Turns a `/`-separated path taken from an archive or manifest into a
/// relative `PathBuf` that stays inside whatever root it gets joined to.
///
/// Returns `None` for empty paths and for paths with `..`, a root or a drive prefix.
pub fn safe_relative_path(raw: &str) -> Option<PathBuf> {
    let normalized = raw.replace('\\', "/");
    let mut result = PathBuf::new();

    for component in Path::new(&normalized).components() {
        match component {
            Component::Normal(part) => result.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }

    if result.as_os_str().is_empty() {
        None
    } else {
        Some(result)
    }
}

/// The file name of a manifest path if it sits directly inside `dir_name`
/// (e.g. `mods/sodium.jar` with `mods` gives `sodium.jar`).
pub fn file_name_in_dir(relative: &Path, dir_name: &str) -> Option<String> {
    let mut components = relative.components();
    match (components.next(), components.next(), components.next()) {
        (Some(Component::Normal(dir)), Some(Component::Normal(name)), None)
            if dir == dir_name =>
        {
            Some(name.to_string_lossy().into_owned())
        }
        _ => None,
    }
}
