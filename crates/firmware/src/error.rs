use orolexa_core::error::CoreError;

/// Errors from firmware registry, collector and service operations.
///
/// `Core` carries caller-facing failures (validation, duplicate version,
/// not found, artifact missing). `Database` and `Storage` are
/// infrastructure faults.
#[derive(Debug, thiserror::Error)]
pub enum OtaError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Artifact storage error: {0}")]
    Storage(#[from] std::io::Error),
}

/// Convenience alias for firmware operations.
pub type OtaResult<T> = Result<T, OtaError>;

impl OtaError {
    /// Bad input: rejected before any I/O and never retried.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Core(core) if core.is_client_error())
    }

    /// Storage or database fault.
    pub fn is_infrastructure(&self) -> bool {
        matches!(self, Self::Database(_) | Self::Storage(_))
            || matches!(self, Self::Core(CoreError::Internal(_)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification() {
        let validation = OtaError::from(CoreError::Validation("bad".into()));
        assert!(validation.is_validation());
        assert!(!validation.is_infrastructure());

        let duplicate = OtaError::from(CoreError::Conflict("dup".into()));
        assert!(duplicate.is_validation());

        let db = OtaError::from(sqlx::Error::PoolTimedOut);
        assert!(db.is_infrastructure());
        assert!(!db.is_validation());

        let io = OtaError::from(std::io::Error::other("disk full"));
        assert!(io.is_infrastructure());

        let missing = OtaError::from(CoreError::ArtifactMissing {
            filename: "f.bin".into(),
        });
        assert!(!missing.is_validation());
        assert!(!missing.is_infrastructure());
    }
}
