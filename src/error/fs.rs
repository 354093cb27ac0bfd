//! File system error constructors

use std::path::Path;

use super::OpkgError;

/// Error for a failed read of `path`
pub fn read_failed(path: &Path, err: impl std::fmt::Display) -> OpkgError {
    OpkgError::FileReadFailed {
        path: path.display().to_string(),
        reason: err.to_string(),
    }
}

/// Error for a failed write (or delete) of `path`
pub fn write_failed(path: &Path, err: impl std::fmt::Display) -> OpkgError {
    OpkgError::FileWriteFailed {
        path: path.display().to_string(),
        reason: err.to_string(),
    }
}

pub fn not_found(path: &Path) -> OpkgError {
    OpkgError::FileNotFound {
        path: path.display().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_failed_keeps_path_and_reason() {
        let err = read_failed(Path::new("a/b.md"), "denied");
        match err {
            OpkgError::FileReadFailed { path, reason } => {
                assert_eq!(path, "a/b.md");
                assert_eq!(reason, "denied");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
