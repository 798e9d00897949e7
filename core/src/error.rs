use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DeskError {
    #[error("Invalid availability: '{value}'")]
    InvalidAvailability { value: String },

    #[error("Invalid max assignments: {value} (must be >= 0)")]
    InvalidMaxAssignments { value: i64 },

    #[error("Invalid amount: {value} (must be a positive integer)")]
    InvalidAmount { value: i64 },

    #[error("Invalid review duration: {value}ms (must be >= 0)")]
    InvalidDuration { value: i64 },

    #[error("Invalid rating: {value} (must be 1..=5)")]
    InvalidRating { value: i64 },

    #[error("Invalid count: {value} (must be >= 1)")]
    InvalidCount { value: i64 },

    #[error("Schedule overrides cannot use availability '{value}'")]
    InvalidScheduleAvailability { value: String },

    #[error("Invalid time range: end {end} is not after start {start}")]
    InvalidTimeRange { start: String, end: String },

    #[error("Invalid window: {seconds}s (must be positive)")]
    InvalidWindow { seconds: i64 },

    #[error("Reviewer id must not be empty")]
    InvalidReviewerId,

    #[error("Reviewer '{reviewer_id}' cannot delegate to itself")]
    InvalidDelegate { reviewer_id: String },

    #[error("No reviewers available")]
    NoReviewersAvailable,

    #[error("No suitable reviewers after filtering")]
    NoSuitableReviewers,

    #[error("Delegation is disabled")]
    DelegationDisabled,

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type DeskResult<T> = Result<T, DeskError>;

/// Stable machine-readable codes. Callers branch on these, never on
/// the human-readable message.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    InvalidAvailability,
    InvalidMaxAssignments,
    InvalidAmount,
    InvalidDuration,
    InvalidRating,
    InvalidCount,
    InvalidScheduleAvailability,
    InvalidTimeRange,
    InvalidWindow,
    InvalidReviewerId,
    InvalidDelegate,
    NoReviewersAvailable,
    NoSuitableReviewers,
    DelegationDisabled,
    PersistenceError,
    SerializationError,
    InternalError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidAvailability         => "INVALID_AVAILABILITY",
            Self::InvalidMaxAssignments       => "INVALID_MAX_ASSIGNMENTS",
            Self::InvalidAmount               => "INVALID_AMOUNT",
            Self::InvalidDuration             => "INVALID_DURATION",
            Self::InvalidRating               => "INVALID_RATING",
            Self::InvalidCount                => "INVALID_COUNT",
            Self::InvalidScheduleAvailability => "INVALID_SCHEDULE_AVAILABILITY",
            Self::InvalidTimeRange            => "INVALID_TIME_RANGE",
            Self::InvalidWindow               => "INVALID_WINDOW",
            Self::InvalidReviewerId           => "INVALID_REVIEWER_ID",
            Self::InvalidDelegate             => "INVALID_DELEGATE",
            Self::NoReviewersAvailable        => "NO_REVIEWERS_AVAILABLE",
            Self::NoSuitableReviewers         => "NO_SUITABLE_REVIEWERS",
            Self::DelegationDisabled          => "DELEGATION_DISABLED",
            Self::PersistenceError            => "PERSISTENCE_ERROR",
            Self::SerializationError          => "SERIALIZATION_ERROR",
            Self::InternalError               => "INTERNAL_ERROR",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl DeskError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidAvailability { .. }         => ErrorCode::InvalidAvailability,
            Self::InvalidMaxAssignments { .. }       => ErrorCode::InvalidMaxAssignments,
            Self::InvalidAmount { .. }               => ErrorCode::InvalidAmount,
            Self::InvalidDuration { .. }             => ErrorCode::InvalidDuration,
            Self::InvalidRating { .. }               => ErrorCode::InvalidRating,
            Self::InvalidCount { .. }                => ErrorCode::InvalidCount,
            Self::InvalidScheduleAvailability { .. } => ErrorCode::InvalidScheduleAvailability,
            Self::InvalidTimeRange { .. }            => ErrorCode::InvalidTimeRange,
            Self::InvalidWindow { .. }               => ErrorCode::InvalidWindow,
            Self::InvalidReviewerId                  => ErrorCode::InvalidReviewerId,
            Self::InvalidDelegate { .. }             => ErrorCode::InvalidDelegate,
            Self::NoReviewersAvailable               => ErrorCode::NoReviewersAvailable,
            Self::NoSuitableReviewers                => ErrorCode::NoSuitableReviewers,
            Self::DelegationDisabled                 => ErrorCode::DelegationDisabled,
            Self::Database(_)                        => ErrorCode::PersistenceError,
            Self::Serialization(_)                   => ErrorCode::SerializationError,
            Self::Other(_)                           => ErrorCode::InternalError,
        }
    }

    /// True for the validation family: the call was refused before
    /// any state was touched.
    pub fn is_validation(&self) -> bool {
        matches!(
            self.code(),
            ErrorCode::InvalidAvailability
                | ErrorCode::InvalidMaxAssignments
                | ErrorCode::InvalidAmount
                | ErrorCode::InvalidDuration
                | ErrorCode::InvalidRating
                | ErrorCode::InvalidCount
                | ErrorCode::InvalidScheduleAvailability
                | ErrorCode::InvalidTimeRange
                | ErrorCode::InvalidWindow
                | ErrorCode::InvalidReviewerId
                | ErrorCode::InvalidDelegate
        )
    }
}
