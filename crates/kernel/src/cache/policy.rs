//! Page cache policy.
//!
//! Decides per request whether the page cache may be read or written.
//! The decision is a pure function of [`CachePolicyContext`].

use std::fmt;

use axum::http::Method;
use tracing::trace;

/// Which cache a check is made for.
///
/// Each kind has its own toggle under `general/caching/` in the site
/// configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheKind {
    /// Fully rendered pages, keyed by request path and query.
    Request,
    /// Rendered template fragments.
    Template,
}

impl CacheKind {
    /// Configuration key name for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheKind::Request => "request",
            CacheKind::Template => "template",
        }
    }
}

impl fmt::Display for CacheKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether the caller wants to read from or write to the cache.
///
/// Only reads honour the `force_refresh` override: a forced refresh skips
/// the cached copy but still stores the fresh render for everyone else.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheAccess {
    Read,
    Write,
}

/// Inputs to the cache policy, derived fresh for every request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachePolicyContext {
    /// Rendering for a safe-mode (preview) environment.
    pub is_safe_mode: bool,
    /// HTTP method of the current request.
    pub method: Method,
    /// Request path.
    pub path: String,
    /// Raw query string (without the leading `?`).
    pub query: String,
    /// A user is logged in for this request.
    pub is_authenticated: bool,
    /// The request asked for `force_refresh=1`.
    pub override_requested: bool,
    /// Caching is enabled in configuration for the kind being checked.
    pub cache_type_enabled: bool,
    /// `general/caching/authenticated` is on.
    pub authenticated_caching_enabled: bool,
}

/// Rule that denied cache use, for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
    SafeMode,
    Method,
    Disabled,
    Authenticated,
    ForcedRefresh,
}

/// Evaluate the policy rules in order, returning the first one that denies.
pub fn evaluate(ctx: &CachePolicyContext, access: CacheAccess) -> Result<(), Denial> {
    // Never read or seed the cache from safe mode; cached output from an
    // unsafe run must not bleed into a preview, nor the other way round.
    if ctx.is_safe_mode {
        return Err(Denial::SafeMode);
    }

    if ctx.method != Method::GET {
        return Err(Denial::Method);
    }

    if !ctx.cache_type_enabled {
        return Err(Denial::Disabled);
    }

    if ctx.is_authenticated && !ctx.authenticated_caching_enabled {
        return Err(Denial::Authenticated);
    }

    if access == CacheAccess::Read && ctx.override_requested {
        return Err(Denial::ForcedRefresh);
    }

    Ok(())
}

/// Check whether the cache of `kind` may be used for `access`.
pub fn can_use_cache(ctx: &CachePolicyContext, kind: CacheKind, access: CacheAccess) -> bool {
    match evaluate(ctx, access) {
        Ok(()) => true,
        Err(denial) => {
            trace!(
                kind = %kind,
                access = ?access,
                path = %ctx.path,
                denial = ?denial,
                "page cache bypassed"
            );
            false
        }
    }
}
