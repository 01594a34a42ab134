use std::sync::Arc;

/// Failure raised by a network-backed primary source.
///
/// These are supplied by transport adapters (see [`from_http_status`]) and
/// consumed as opaque tags by the fallback classification filters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NetworkFailure {
    /// No connection could be established.
    #[error("no network connection")]
    NoConnection,
    /// The server answered with a 5xx status.
    #[error("server-side failure")]
    ServerError,
    /// The server rejected the request (4xx other than 404/422).
    #[error("unauthorised request")]
    Unauthorised,
    /// The server answered with a 3xx status.
    #[error("redirected response")]
    Redirect,
    /// The resource has not changed since the last request (304).
    #[error("resource not modified")]
    NotModified,
    /// A generic network error with an optional message.
    #[error("network error: {}", .0.as_deref().unwrap_or("unknown"))]
    NetworkError(Option<String>),
    /// A network failure that maps to no other tag.
    #[error("unclassified network failure")]
    Unclassified,
}

/// Failure type for every operation of the engine.
///
/// The taxonomy is closed: fallback classification, expiration handling and
/// the repositories all match exhaustively on it. `Unhandled` wraps a truly
/// unexpected runtime error caught at the data-source boundary; it is always
/// propagated verbatim and never triggers a fallback.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Failure {
    /// No value exists for the key.
    #[error("no value found for the requested key")]
    NotFound,
    /// A write was attempted without a value.
    #[error("a write was attempted without a value")]
    Empty,
    /// A value exists but failed validation or is expired.
    #[error("value is invalid or expired")]
    Invalid,
    /// A transport-classified failure from a network primary.
    #[error(transparent)]
    Network(#[from] NetworkFailure),
    /// An unexpected runtime error from a source implementation.
    #[error("unhandled error: {0}")]
    Unhandled(Arc<dyn std::error::Error + Send + Sync>),
    /// Sentinel for "no request issued yet" projections; the core read path
    /// never produces it.
    #[error("no request has been issued yet")]
    Idle,
}

/// Comparable tag of a [`Failure`], used by classification filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    NotFound,
    Empty,
    Invalid,
    NoConnection,
    ServerError,
    Unauthorised,
    Redirect,
    NotModified,
    NetworkError,
    UnclassifiedNetwork,
    Unhandled,
    Idle,
}

impl Failure {
    /// Wrap an unexpected runtime error from a source implementation.
    pub fn unhandled(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Failure::Unhandled(Arc::new(err))
    }

    /// The comparable tag of this failure.
    pub fn kind(&self) -> FailureKind {
        match self {
            Failure::NotFound => FailureKind::NotFound,
            Failure::Empty => FailureKind::Empty,
            Failure::Invalid => FailureKind::Invalid,
            Failure::Network(network) => match network {
                NetworkFailure::NoConnection => FailureKind::NoConnection,
                NetworkFailure::ServerError => FailureKind::ServerError,
                NetworkFailure::Unauthorised => FailureKind::Unauthorised,
                NetworkFailure::Redirect => FailureKind::Redirect,
                NetworkFailure::NotModified => FailureKind::NotModified,
                NetworkFailure::NetworkError(_) => FailureKind::NetworkError,
                NetworkFailure::Unclassified => FailureKind::UnclassifiedNetwork,
            },
            Failure::Unhandled(_) => FailureKind::Unhandled,
            Failure::Idle => FailureKind::Idle,
        }
    }
}

impl PartialEq for Failure {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Failure::Network(a), Failure::Network(b)) => a == b,
            // Unhandled failures carry arbitrary causes; identity is the only
            // meaningful equality.
            (Failure::Unhandled(a), Failure::Unhandled(b)) => Arc::ptr_eq(a, b),
            _ => self.kind() == other.kind(),
        }
    }
}

/// Map an HTTP status code to a [`Failure`].
///
/// Transport adapters call this once at the boundary so the rest of the
/// engine only ever sees tagged failures.
pub fn from_http_status(status: u16) -> Failure {
    match status {
        304 => NetworkFailure::NotModified.into(),
        404 => Failure::NotFound,
        422 => Failure::Invalid,
        300..=399 => NetworkFailure::Redirect.into(),
        400..=499 => NetworkFailure::Unauthorised.into(),
        500..=599 => NetworkFailure::ServerError.into(),
        _ => NetworkFailure::Unclassified.into(),
    }
}
