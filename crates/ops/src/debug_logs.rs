//! Debug-log administration: status, clearing, and the `.env` toggle.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use regex::Regex;
use serde::Serialize;

use crate::OpsError;
use crate::config::API_DEBUG_ENV;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DebugLogStatus {
    pub enabled: bool,
    pub dir: PathBuf,
    /// Log files currently on disk, across all services.
    pub files: usize,
}

/// Report whether debug logging is on and how many files exist.
pub fn status(dir: &Path, enabled: bool) -> Result<DebugLogStatus, OpsError> {
    Ok(DebugLogStatus {
        enabled,
        dir: dir.to_path_buf(),
        files: count_files(dir)?,
    })
}

/// Delete the log directory and everything in it.
///
/// Returns the number of files removed, or `None` when there was nothing
/// to clear.
pub fn clear(dir: &Path) -> Result<Option<usize>, OpsError> {
    if !dir.exists() {
        return Ok(None);
    }
    let files = count_files(dir)?;
    fs::remove_dir_all(dir)?;
    tracing::info!(dir = %dir.display(), files, "cleared debug logs");
    Ok(Some(files))
}

/// Set `API_DEBUG` in a `.env` file.
///
/// An existing assignment is rewritten in place; otherwise one is appended.
/// Disabling when the file does not exist is a no-op.
pub fn set_debug_flag(env_file: &Path, enabled: bool) -> Result<(), OpsError> {
    let content = match fs::read_to_string(env_file) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            if !enabled {
                return Ok(());
            }
            String::new()
        }
        Err(e) => return Err(e.into()),
    };

    let line = format!("{API_DEBUG_ENV}={}", if enabled { "true" } else { "false" });
    let pattern = Regex::new(&format!(r"(?m)^{API_DEBUG_ENV}\s*=.*$"))
        .map_err(|e| OpsError::Configuration(e.to_string()))?;

    let updated = if pattern.is_match(&content) {
        pattern.replace_all(&content, line.as_str()).into_owned()
    } else if content.is_empty() || content.ends_with('\n') {
        format!("{content}{line}\n")
    } else {
        format!("{content}\n{line}\n")
    };

    fs::write(env_file, updated)?;
    Ok(())
}

fn count_files(dir: &Path) -> Result<usize, OpsError> {
    if !dir.exists() {
        return Ok(0);
    }
    let mut count = 0;
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            count += count_files(&entry.path())?;
        } else {
            count += 1;
        }
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "{}").unwrap();
    }

    #[test]
    fn status_counts_files_across_services() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("api_log");
        touch(&dir.join("plausible/a.json"));
        touch(&dir.join("plausible/b.json"));
        touch(&dir.join("vercel/c.json"));

        let status = status(&dir, true).unwrap();
        assert!(status.enabled);
        assert_eq!(status.files, 3);
    }

    #[test]
    fn status_of_missing_dir_is_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let status = status(&tmp.path().join("nope"), false).unwrap();
        assert_eq!(status.files, 0);
    }

    #[test]
    fn clear_removes_everything() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("api_log");
        touch(&dir.join("plausible/a.json"));
        touch(&dir.join("vercel/b.json"));

        assert_eq!(clear(&dir).unwrap(), Some(2));
        assert!(!dir.exists());
        assert_eq!(clear(&dir).unwrap(), None);
    }

    #[test]
    fn enabling_creates_env_file() {
        let tmp = tempfile::tempdir().unwrap();
        let env = tmp.path().join(".env");
        set_debug_flag(&env, true).unwrap();
        assert_eq!(fs::read_to_string(&env).unwrap(), "API_DEBUG=true\n");
    }

    #[test]
    fn disabling_without_env_file_is_noop() {
        let tmp = tempfile::tempdir().unwrap();
        let env = tmp.path().join(".env");
        set_debug_flag(&env, false).unwrap();
        assert!(!env.exists());
    }

    #[test]
    fn existing_assignment_is_rewritten_in_place() {
        let tmp = tempfile::tempdir().unwrap();
        let env = tmp.path().join(".env");
        fs::write(&env, "PLAUSIBLE_API_KEY=abc\nAPI_DEBUG = true\nOTHER=1\n").unwrap();

        set_debug_flag(&env, false).unwrap();
        assert_eq!(
            fs::read_to_string(&env).unwrap(),
            "PLAUSIBLE_API_KEY=abc\nAPI_DEBUG=false\nOTHER=1\n"
        );
    }

    #[test]
    fn assignment_is_appended_after_last_line() {
        let tmp = tempfile::tempdir().unwrap();
        let env = tmp.path().join(".env");
        fs::write(&env, "PLAUSIBLE_API_KEY=abc").unwrap();

        set_debug_flag(&env, true).unwrap();
        assert_eq!(
            fs::read_to_string(&env).unwrap(),
            "PLAUSIBLE_API_KEY=abc\nAPI_DEBUG=true\n"
        );
    }
}
