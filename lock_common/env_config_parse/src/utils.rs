use std::env;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Searches the current working directory recursively for `file_name`.
pub fn find_file(file_name: &str) -> Result<PathBuf, String> {
    let current_dir = env::current_dir()
        .map_err(|e| format!("Failed to get current directory: {}", e))?;
    find_file_in(&current_dir, file_name)
}

/// Searches `root` recursively for `file_name` and returns its absolute path.
/// A file directly under `root` wins over nested ones.
pub fn find_file_in(root: &Path, file_name: &str) -> Result<PathBuf, String> {
    let root = root.canonicalize()
        .map_err(|e| format!("Failed to canonicalize path: {}", e))?;
    let direct = root.join(file_name);
    if direct.is_file() {
        return Ok(direct);
    }

    for entry in WalkDir::new(&root).into_iter().filter_map(|e| e.ok()) {
        let path = entry.path();
        if path.is_file() && path.file_name() == Some(Path::new(file_name).as_os_str()) {
            return path.canonicalize()
                .map_err(|e| format!("Failed to canonicalize file path: {}", e));
        }
    }

    Err(format!("File '{}' not found in {}", file_name, root.display()))
}
