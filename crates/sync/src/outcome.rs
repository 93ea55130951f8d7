use fitfind_core::FitFindError;
use uuid::Uuid;

/// Result of a mutation routed through the resilience helper.
#[derive(Debug, Clone, PartialEq)]
pub enum OperationOutcome<T> {
    Success(T),
    Failed(FitFindError),
    /// Stored in the offline queue under this operation id.
    Queued(Uuid),
}

impl<T> OperationOutcome<T> {
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    #[must_use]
    pub const fn is_queued(&self) -> bool {
        matches!(self, Self::Queued(_))
    }

    #[must_use]
    pub const fn error(&self) -> Option<&FitFindError> {
        match self {
            Self::Failed(err) => Some(err),
            _ => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> OperationOutcome<U> {
        match self {
            Self::Success(value) => OperationOutcome::Success(f(value)),
            Self::Failed(err) => OperationOutcome::Failed(err),
            Self::Queued(id) => OperationOutcome::Queued(id),
        }
    }
}

impl<T> From<Result<T, FitFindError>> for OperationOutcome<T> {
    fn from(result: Result<T, FitFindError>) -> Self {
        match result {
            Ok(value) => Self::Success(value),
            Err(err) => Self::Failed(err),
        }
    }
}
