use std::path::{Path, PathBuf};

/// File extension appended to the corpus directory name for its snapshot.
pub const DB_EXTENSION: &str = "lmdb";

/// Compute the default snapshot path for a corpus rooted at `root`:
/// `<parent>/<basename>.lmdb`, i.e. beside the corpus directory.
///
/// This does *not* touch the filesystem beyond resolving `root` to an absolute path.
pub fn default_db_path(root: impl AsRef<Path>) -> PathBuf {
    let root = root.as_ref();
    let absolute = root.canonicalize().unwrap_or_else(|_| match std::env::current_dir() {
        Ok(cwd) => cwd.join(root),
        Err(_) => root.to_path_buf(),
    });
    let name = absolute
        .file_name()
        .and_then(|os_str| os_str.to_str())
        .unwrap_or("unnamed-corpus")
        .to_string();
    let parent = absolute.parent().map(Path::to_path_buf).unwrap_or_default();
    parent.join(format!("{name}.{DB_EXTENSION}"))
}

