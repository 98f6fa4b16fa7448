use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Enumerated outcome taxonomy for a lifecycle operation.
///
/// More than one reason may apply to a single call; callers receive the
/// full ordered list through [`OperationReport`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureReason {
    None,
    DuplicateEmail,
    MissingRequired,
    InactiveProfile,
    UnconfirmedEmail,
    NonExistentProfile,
    Unknown,
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            FailureReason::None => "NONE",
            FailureReason::DuplicateEmail => "DUPLICATE_EMAIL",
            FailureReason::MissingRequired => "MISSING_REQUIRED",
            FailureReason::InactiveProfile => "INACTIVE_PROFILE",
            FailureReason::UnconfirmedEmail => "UNCONFIRMED_EMAIL",
            FailureReason::NonExistentProfile => "NON_EXISTENT_PROFILE",
            FailureReason::Unknown => "UNKNOWN",
        };
        write!(f, "{}", label)
    }
}

/// The completed result of one lifecycle operation.
///
/// Holds every reason that applied, in emission order, the id of a newly
/// created profile, and the raw underlying error when one occurred. The raw
/// error exists for logging only; business logic must branch on `reasons`.
#[derive(Debug)]
pub struct OperationReport {
    reasons: Vec<FailureReason>,
    profile_id: Option<Uuid>,
    error: Option<String>,
}

impl OperationReport {
    /// Every reason that applied, in the order it was emitted.
    pub fn reasons(&self) -> &[FailureReason] {
        &self.reasons
    }

    /// Whether the operation completed without any failure reason.
    pub fn succeeded(&self) -> bool {
        self.reasons.first() == Some(&FailureReason::None)
    }

    /// The id of the profile created by this operation, if any.
    pub fn profile_id(&self) -> Option<Uuid> {
        self.profile_id
    }

    /// The raw underlying error, when one occurred. Loggable; not a
    /// branching signal.
    pub fn raw_error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

/// Ordered reason collector with an explicit completion point.
///
/// `complete` consumes the emitter, so a report is produced exactly once
/// per operation and nothing can be emitted afterwards.
#[derive(Debug, Default)]
pub(crate) struct ReasonEmitter {
    reasons: Vec<FailureReason>,
    profile_id: Option<Uuid>,
    error: Option<String>,
}

impl ReasonEmitter {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn emit(&mut self, reason: FailureReason) {
        self.reasons.push(reason);
    }

    pub(crate) fn created(&mut self, id: Uuid) {
        self.profile_id = Some(id);
    }

    pub(crate) fn fail<E: std::fmt::Display>(&mut self, error: E) {
        self.error = Some(error.to_string());
    }

    pub(crate) fn complete(self) -> OperationReport {
        OperationReport {
            reasons: self.reasons,
            profile_id: self.profile_id,
            error: self.error,
        }
    }
}
