use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use crate::clock::{Clock, SystemClock};
use crate::error::{Failure, FailureKind};
use crate::registry::ExpirationRegistry;

/// Classification predicate deciding which failures justify trying the other
/// side of a strategy.
///
/// `Unhandled` is always fatal: no filter ever matches it, regardless of how
/// the filter was built.
#[derive(Clone)]
pub struct FailureFilter {
    allowed: Arc<dyn Fn(&Failure) -> bool + Send + Sync>,
}

impl FailureFilter {
    /// A filter from an arbitrary predicate.
    pub fn new(predicate: impl Fn(&Failure) -> bool + Send + Sync + 'static) -> Self {
        FailureFilter {
            allowed: Arc::new(predicate),
        }
    }

    /// A filter matching exactly the given failure tags.
    pub fn kinds(kinds: impl IntoIterator<Item = FailureKind>) -> Self {
        let set: HashSet<FailureKind> = kinds.into_iter().collect();
        Self::new(move |failure| set.contains(&failure.kind()))
    }

    /// A filter matching nothing.
    pub fn none() -> Self {
        Self::new(|_| false)
    }

    /// Failures that make a primary read fall back to the store.
    pub fn primary_defaults() -> Self {
        Self::kinds([
            FailureKind::NotFound,
            FailureKind::Invalid,
            FailureKind::NoConnection,
            FailureKind::ServerError,
            FailureKind::Redirect,
            FailureKind::UnclassifiedNetwork,
        ])
    }

    /// Failures that make a store read fall back to the primary.
    pub fn store_defaults() -> Self {
        Self::kinds([FailureKind::NotFound, FailureKind::Invalid])
    }

    /// Whether `failure` triggers a fallback attempt.
    pub fn matches(&self, failure: &Failure) -> bool {
        !matches!(failure, Failure::Unhandled(_)) && (self.allowed)(failure)
    }
}

impl fmt::Debug for FailureFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FailureFilter(..)")
    }
}

/// Explicit configuration of a strategy: classification filters, clock,
/// expiration registry and the expiry-bypass flag.
///
/// This is passed by value at composition time; nothing in the engine reads
/// ambient or global configuration state.
#[derive(Clone)]
pub struct CacheConfig {
    /// Primary failures that justify falling back to the store.
    pub primary_fallbacks: FailureFilter,
    /// Store failures that justify falling back to the primary.
    pub store_fallbacks: FailureFilter,
    /// Registry consulted by `After`-policy stores.
    pub registry: Arc<ExpirationRegistry>,
    /// Time source for the expiration policy.
    pub clock: Arc<dyn Clock>,
    /// When set, `After`-policy reads treat every record as valid.
    pub ignore_expiry: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            primary_fallbacks: FailureFilter::primary_defaults(),
            store_fallbacks: FailureFilter::store_defaults(),
            registry: ExpirationRegistry::shared(),
            clock: Arc::new(SystemClock),
            ignore_expiry: false,
        }
    }
}

impl fmt::Debug for CacheConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheConfig")
            .field("ignore_expiry", &self.ignore_expiry)
            .finish_non_exhaustive()
    }
}
