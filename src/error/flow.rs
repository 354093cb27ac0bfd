//! Pattern and flow execution error constructors

use super::OpkgError;

pub fn unresolved_variable(pattern: &str, variable: &str) -> OpkgError {
    OpkgError::PatternResolution {
        pattern: pattern.to_string(),
        variable: variable.to_string(),
    }
}

pub fn invalid_pattern(pattern: &str, reason: impl std::fmt::Display) -> OpkgError {
    OpkgError::InvalidPattern {
        pattern: pattern.to_string(),
        reason: reason.to_string(),
    }
}

pub fn execution_failed(source_path: &str, reason: impl std::fmt::Display) -> OpkgError {
    OpkgError::FlowExecution {
        source_path: source_path.to_string(),
        reason: reason.to_string(),
    }
}

pub fn parse_failed(path: &str, format: &str, reason: impl std::fmt::Display) -> OpkgError {
    OpkgError::DocumentParse {
        path: path.to_string(),
        format: format.to_string(),
        reason: reason.to_string(),
    }
}
