/// Asset state definitions for tracking one asset through a download pass
///
/// ```text
/// Pending ─┬─> AlreadyPresent
///          ├─> FailedPermanent (unusable asset, no request made)
///          └─> Downloading ─┬─> Downloaded
///                           └─> Retrying(n) ─┬─> Downloading
///                                            └─> FailedPermanent
/// ```
use std::fmt;

/// Represents the current state of an asset during a download pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetState {
    // ===== Active States =====
    /// Not yet looked at
    Pending,

    /// A fetch attempt is in flight
    Downloading,

    /// The given attempt failed and another one is scheduled
    Retrying(u32),

    // ===== Terminal Success States =====
    /// A non-empty local file already existed; no request was made
    AlreadyPresent,

    /// Fetched, written and verified non-empty
    Downloaded,

    // ===== Terminal Error States =====
    /// Every attempt failed; the asset is dropped from the record
    FailedPermanent,
}

impl AssetState {
    /// Returns true if this is a terminal state (no further processing needed)
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::AlreadyPresent | Self::Downloaded | Self::FailedPermanent
        )
    }

    /// Returns true if the asset ended up on disk
    pub fn is_success(&self) -> bool {
        matches!(self, Self::AlreadyPresent | Self::Downloaded)
    }

    /// Returns true if the asset is dropped from the record
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::FailedPermanent)
    }

    /// Checks whether moving from `self` to `next` is a legal transition
    pub fn can_transition_to(&self, next: AssetState) -> bool {
        match (self, next) {
            (Self::Pending, Self::AlreadyPresent) => true,
            (Self::Pending, Self::Downloading) => true,
            (Self::Pending, Self::FailedPermanent) => true,
            (Self::Downloading, Self::Downloaded) => true,
            (Self::Downloading, Self::Retrying(_)) => true,
            (Self::Downloading, Self::FailedPermanent) => true,
            (Self::Retrying(_), Self::Downloading) => true,
            (Self::Retrying(_), Self::FailedPermanent) => true,
            _ => false,
        }
    }

    /// Short name used in log output
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Downloading => "downloading",
            Self::Retrying(_) => "retrying",
            Self::AlreadyPresent => "already_present",
            Self::Downloaded => "downloaded",
            Self::FailedPermanent => "failed_permanent",
        }
    }
}

impl fmt::Display for AssetState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Retrying(attempt) => write!(f, "retrying({})", attempt),
            other => write!(f, "{}", other.as_str()),
        }
    }
}
