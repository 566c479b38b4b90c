//! PL-005: Error types for compilation and configuration loading.

use std::path::PathBuf;

/// Compile-time failure. Fatal to the current compilation; never retried here.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlannerError {
    /// A get or put names a resource absent from the resource table.
    #[error("unknown resource: {0}")]
    UnknownResource(String),

    /// A run step names a prototype absent from the prototype table.
    #[error("unknown prototype: {0}")]
    UnknownPrototype(String),

    /// A get step has no bound version in the build inputs.
    #[error("version for input {0} not provided")]
    VersionNotProvided(String),
}

/// Failure loading or validating a compile request or planner config.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml_ng::Error),

    #[error("invalid compile request: {}", .0.join("; "))]
    Invalid(Vec<String>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pl005_planner_error_messages() {
        assert_eq!(
            PlannerError::UnknownResource("src".into()).to_string(),
            "unknown resource: src"
        );
        assert_eq!(
            PlannerError::UnknownPrototype("oci-build".into()).to_string(),
            "unknown prototype: oci-build"
        );
        assert_eq!(
            PlannerError::VersionNotProvided("src".into()).to_string(),
            "version for input src not provided"
        );
    }

    #[test]
    fn test_pl005_config_error_messages() {
        let err = ConfigError::Read {
            path: PathBuf::from("/missing.yaml"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
        };
        assert!(err.to_string().contains("/missing.yaml"));

        let err = ConfigError::Invalid(vec!["a".into(), "b".into()]);
        assert_eq!(err.to_string(), "invalid compile request: a; b");
    }
}
