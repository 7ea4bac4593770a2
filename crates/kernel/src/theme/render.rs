//! Render wrapper around the theme engine.
//!
//! [`Render`] resolves and renders templates, renders sandboxed snippets,
//! and decides when full pages may be served from or stored in the page
//! cache.

use std::sync::Arc;

use axum::response::Response;
use serde_json::{Map, Value};
use tracing::{debug, debug_span};

use super::engine::ThemeEngine;
use super::error::RenderError;
use super::response::TemplateResponse;
use super::sandbox::SandboxExtension;
use crate::cache::{
    CacheAccess, CacheKind, CachePolicyContext, PageCache, cached_response, can_use_cache,
};
use crate::request::RequestContext;
use crate::settings::CachingSettings;
use crate::stopwatch::{Stopwatch, StopwatchEvent};

/// Stopwatch event bracketing every template render.
pub const RENDER_EVENT: &str = "bolt.render";

/// One template name, or candidates tried in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateNames {
    One(String),
    List(Vec<String>),
}

impl TemplateNames {
    /// Names in resolution order.
    pub fn names(&self) -> Vec<&str> {
        match self {
            TemplateNames::One(name) => vec![name.as_str()],
            TemplateNames::List(names) => names.iter().map(String::as_str).collect(),
        }
    }
}

impl From<&str> for TemplateNames {
    fn from(name: &str) -> Self {
        TemplateNames::One(name.to_string())
    }
}

impl From<String> for TemplateNames {
    fn from(name: String) -> Self {
        TemplateNames::One(name)
    }
}

impl From<Vec<String>> for TemplateNames {
    fn from(names: Vec<String>) -> Self {
        TemplateNames::List(names)
    }
}

impl From<&[&str]> for TemplateNames {
    fn from(names: &[&str]) -> Self {
        TemplateNames::List(names.iter().map(|n| (*n).to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for TemplateNames {
    fn from(names: [&str; N]) -> Self {
        TemplateNames::List(names.iter().map(|n| (*n).to_string()).collect())
    }
}

/// Template rendering with page caching.
pub struct Render {
    engine: Arc<ThemeEngine>,
    sandbox: Arc<SandboxExtension>,
    cache: PageCache,
    caching: CachingSettings,
    stopwatch: Arc<dyn Stopwatch>,
    /// Safe mode: used for previews, never touches the page cache.
    safe: bool,
}

impl Render {
    pub fn new(
        engine: Arc<ThemeEngine>,
        sandbox: Arc<SandboxExtension>,
        cache: PageCache,
        caching: CachingSettings,
        stopwatch: Arc<dyn Stopwatch>,
        safe: bool,
    ) -> Self {
        Self {
            engine,
            sandbox,
            cache,
            caching,
            stopwatch,
            safe,
        }
    }

    /// Whether this renderer runs in safe mode.
    pub fn is_safe(&self) -> bool {
        self.safe
    }

    pub fn engine(&self) -> &ThemeEngine {
        &self.engine
    }

    pub fn sandbox(&self) -> &SandboxExtension {
        &self.sandbox
    }

    /// Render the first existing template out of `names`.
    ///
    /// The template sees the engine's globals, then `globals`, then
    /// `context`, later entries shadowing earlier ones. Nothing is kept
    /// between calls.
    pub fn render(
        &self,
        names: impl Into<TemplateNames>,
        context: Map<String, Value>,
        globals: Map<String, Value>,
    ) -> Result<TemplateResponse, RenderError> {
        let _event = StopwatchEvent::start(self.stopwatch.as_ref(), RENDER_EVENT, "template");

        let names = names.into();
        let candidates = names.names();
        let template = self.engine.resolve_template(&candidates).ok_or_else(|| {
            RenderError::TemplateNotFound {
                names: candidates.iter().map(|n| (*n).to_string()).collect(),
            }
        })?;

        let _span = debug_span!("bolt.render", template = %template).entered();

        let merged = self.merge_context(&context, &globals);
        let html = self.engine.render(&template, &merged)?;
        debug!(template = %template, bytes = html.len(), "template rendered");

        Ok(TemplateResponse::new(template, context, globals, html))
    }

    fn merge_context(
        &self,
        context: &Map<String, Value>,
        globals: &Map<String, Value>,
    ) -> tera::Context {
        let mut merged = tera::Context::new();
        for (name, value) in self.engine.globals().iter().chain(globals).chain(context) {
            merged.insert(name.as_str(), value);
        }
        merged
    }

    /// Check whether a template exists.
    ///
    /// Any loader error counts as "does not exist".
    #[deprecated(note = "use ThemeEngine::resolve_template")]
    pub fn has_template(&self, name: &str) -> bool {
        self.engine.has_template(name)
    }

    /// Render an ad-hoc template string.
    ///
    /// With `sandboxed` set, the snippet runs with the sandbox on and is
    /// checked against its policy first. A sandbox switched on by a caller
    /// stays on; one switched on here is switched off again on every exit
    /// path, errors included.
    pub fn render_snippet(
        &self,
        source: &str,
        context: &Map<String, Value>,
        sandboxed: bool,
    ) -> Result<String, RenderError> {
        let scope = self.sandbox.scope(sandboxed);
        scope.check(source)?;

        let mut ctx = tera::Context::new();
        for (name, value) in context {
            ctx.insert(name.as_str(), value);
        }

        let html = self.engine.render_str(source, &ctx)?;
        drop(scope);
        Ok(html)
    }

    /// Gather the cache policy inputs for `req`.
    pub fn policy_context(&self, req: &RequestContext, kind: CacheKind) -> CachePolicyContext {
        let cache_type_enabled = match kind {
            CacheKind::Request => self.caching.request,
            CacheKind::Template => self.caching.template,
        };

        CachePolicyContext {
            is_safe_mode: self.safe,
            method: req.method.clone(),
            path: req.path.clone(),
            query: req.query.clone(),
            is_authenticated: req.is_authenticated(),
            override_requested: req.force_refresh,
            cache_type_enabled,
            authenticated_caching_enabled: self.caching.authenticated,
        }
    }

    /// Check if the current conditions are suitable for caching.
    pub fn check_cache_conditions(
        &self,
        req: &RequestContext,
        kind: CacheKind,
        access: CacheAccess,
    ) -> bool {
        can_use_cache(&self.policy_context(req, kind), kind, access)
    }

    /// Cache lifetime in seconds.
    pub fn cache_duration(&self) -> u64 {
        self.caching.duration_secs()
    }

    /// Serve a fully cached page, if policy allows and one exists.
    pub async fn fetch_cached_request(
        &self,
        req: &RequestContext,
    ) -> Result<Option<Response>, RenderError> {
        if !self.check_cache_conditions(req, CacheKind::Request, CacheAccess::Read) {
            return Ok(None);
        }

        let cached = self.cache.fetch(&req.path, &req.query).await?;
        Ok(cached.map(|html| cached_response(html, self.cache_duration())))
    }

    /// Store a fully rendered page, if policy allows.
    ///
    /// Returns whether the page was stored.
    pub async fn cache_request(
        &self,
        req: &RequestContext,
        html: &str,
    ) -> Result<bool, RenderError> {
        if !self.check_cache_conditions(req, CacheKind::Request, CacheAccess::Write) {
            return Ok(false);
        }

        self.cache
            .store(&req.path, &req.query, html, self.cache_duration())
            .await?;
        Ok(true)
    }
}

impl std::fmt::Debug for Render {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Render")
            .field("safe", &self.safe)
            .field("caching", &self.caching)
            .finish_non_exhaustive()
    }
}
