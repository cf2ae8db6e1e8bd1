use std::path::{Path, PathBuf};

/// Centralized helpers for the per-user folders the client writes to.
/// Keeps the credential location consistent between the CLI and embedders.
#[inline]
pub fn home_dir() -> Option<PathBuf> {
    std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .ok()
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
}

#[inline]
pub fn client_root(home: &Path) -> PathBuf { home.join(".careerscope") }

#[inline]
pub fn credentials_file(home: &Path) -> PathBuf { client_root(home).join("credentials.json") }

/// Default credential file; falls back to the working directory when no home is set.
pub fn default_credentials_file() -> PathBuf {
    match home_dir() {
        Some(h) => credentials_file(&h),
        None => PathBuf::from(".careerscope").join("credentials.json"),
    }
}
