//! Template sandbox for untrusted snippets.
//!
//! The sandbox is a shared on/off flag plus a [`SecurityPolicy`] listing the
//! tags, filters, and functions a snippet may use while the flag is on.
//! [`SandboxExtension::scope`] is the only way render code should touch the
//! flag: it holds the sandbox lock for the whole render and restores the
//! previous state when dropped.

use std::cell::Cell;
use std::collections::BTreeSet;

use parking_lot::{ReentrantMutex, ReentrantMutexGuard};
use tera::Template;
use tera::ast::{Expr, ExprVal, FunctionCall, Node};
use thiserror::Error;
use tracing::debug;

use super::engine::SNIPPET_TEMPLATE;
use super::error::RenderError;

/// A snippet used something the policy does not allow.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SecurityError {
    #[error("tag \"{0}\" is not allowed in sandboxed templates")]
    Tag(String),

    #[error("filter \"{0}\" is not allowed in sandboxed templates")]
    Filter(String),

    #[error("function \"{0}\" is not allowed in sandboxed templates")]
    Function(String),

    #[error("variable \"{0}\" is not accessible in sandboxed templates")]
    Variable(String),
}

/// Tags allowed in sandboxed snippets by default.
pub const DEFAULT_ALLOWED_TAGS: &[&str] = &[
    "if", "for", "set", "raw", "filter", "break", "continue",
];

/// Filters allowed in sandboxed snippets by default.
pub const DEFAULT_ALLOWED_FILTERS: &[&str] = &[
    "abs", "capitalize", "date", "default", "escape", "excerpt", "first", "format_date",
    "join", "last", "length", "lower", "nth", "replace", "reverse", "round", "slugify", "sort",
    "split", "striptags", "title", "trim", "truncate", "unique", "upper", "urlencode",
    "wordcount",
];

/// Functions allowed in sandboxed snippets by default.
pub const DEFAULT_ALLOWED_FUNCTIONS: &[&str] = &["range"];

/// Variables that expose engine internals and are never readable.
const FORBIDDEN_VARIABLES: &[&str] = &["__tera_context"];

/// What a sandboxed snippet may use.
#[derive(Debug, Clone)]
pub struct SecurityPolicy {
    tags: BTreeSet<String>,
    filters: BTreeSet<String>,
    functions: BTreeSet<String>,
}

impl Default for SecurityPolicy {
    fn default() -> Self {
        Self::new(
            DEFAULT_ALLOWED_TAGS,
            DEFAULT_ALLOWED_FILTERS,
            DEFAULT_ALLOWED_FUNCTIONS,
        )
    }
}

impl SecurityPolicy {
    pub fn new(tags: &[&str], filters: &[&str], functions: &[&str]) -> Self {
        let set = |names: &[&str]| names.iter().map(|n| (*n).to_string()).collect();
        Self {
            tags: set(tags),
            filters: set(filters),
            functions: set(functions),
        }
    }

    /// Allow an additional filter.
    pub fn allow_filter(mut self, name: &str) -> Self {
        self.filters.insert(name.to_string());
        self
    }

    /// Allow an additional function.
    pub fn allow_function(mut self, name: &str) -> Self {
        self.functions.insert(name.to_string());
        self
    }

    /// Check a parsed template against the policy.
    ///
    /// Works on the same syntax tree Tera renders, so comments, string
    /// literals and `raw` sections are told apart exactly as the renderer
    /// does. `raw` content is not inspected.
    pub fn check_template(&self, template: &Template) -> Result<(), SecurityError> {
        self.check_nodes(&template.ast)
    }

    fn check_nodes(&self, nodes: &[Node]) -> Result<(), SecurityError> {
        nodes.iter().try_for_each(|node| self.check_node(node))
    }

    fn check_node(&self, node: &Node) -> Result<(), SecurityError> {
        match node {
            Node::Text(_) | Node::Comment(..) => Ok(()),
            Node::VariableBlock(_, expr) => self.check_expr(expr),
            Node::Super => Err(SecurityError::Function("super".to_string())),
            Node::MacroDefinition(..) => self.require_tag("macro"),
            Node::Extends(..) => self.require_tag("extends"),
            Node::Include(..) => self.require_tag("include"),
            Node::ImportMacro(..) => self.require_tag("import"),
            Node::Block(..) => self.require_tag("block"),
            Node::Raw(..) => self.require_tag("raw"),
            Node::Break(_) => self.require_tag("break"),
            Node::Continue(_) => self.require_tag("continue"),
            Node::Set(_, set) => {
                self.require_tag(if set.global { "set_global" } else { "set" })?;
                self.check_expr(&set.value)
            }
            Node::FilterSection(_, section, _) => {
                self.require_tag("filter")?;
                self.check_filter(&section.filter)?;
                self.check_nodes(&section.body)
            }
            Node::Forloop(_, forloop, _) => {
                self.require_tag("for")?;
                self.check_expr(&forloop.container)?;
                self.check_nodes(&forloop.body)?;
                forloop
                    .empty_body
                    .as_deref()
                    .map_or(Ok(()), |body| self.check_nodes(body))
            }
            Node::If(branches, _) => {
                self.require_tag("if")?;
                for (_, condition, body) in &branches.conditions {
                    self.check_expr(condition)?;
                    self.check_nodes(body)?;
                }
                branches
                    .otherwise
                    .as_ref()
                    .map_or(Ok(()), |(_, body)| self.check_nodes(body))
            }
        }
    }

    fn require_tag(&self, name: &str) -> Result<(), SecurityError> {
        if self.tags.contains(name) {
            Ok(())
        } else {
            Err(SecurityError::Tag(name.to_string()))
        }
    }

    fn check_filter(&self, filter: &FunctionCall) -> Result<(), SecurityError> {
        if !self.filters.contains(&filter.name) {
            return Err(SecurityError::Filter(filter.name.clone()));
        }
        filter.args.values().try_for_each(|arg| self.check_expr(arg))
    }

    fn check_expr(&self, expr: &Expr) -> Result<(), SecurityError> {
        expr.filters
            .iter()
            .try_for_each(|filter| self.check_filter(filter))?;
        self.check_value(&expr.val)
    }

    fn check_value(&self, value: &ExprVal) -> Result<(), SecurityError> {
        match value {
            ExprVal::String(_) | ExprVal::Int(_) | ExprVal::Float(_) | ExprVal::Bool(_) => Ok(()),
            ExprVal::Ident(ident) => check_ident(ident),
            ExprVal::Math(math) => {
                self.check_expr(&math.lhs)?;
                self.check_expr(&math.rhs)
            }
            ExprVal::Logic(logic) => {
                self.check_expr(&logic.lhs)?;
                self.check_expr(&logic.rhs)
            }
            ExprVal::In(within) => {
                self.check_expr(&within.lhs)?;
                self.check_expr(&within.rhs)
            }
            ExprVal::Test(test) => {
                check_ident(&test.ident)?;
                test.args.iter().try_for_each(|arg| self.check_expr(arg))
            }
            ExprVal::MacroCall(call) => Err(SecurityError::Function(format!(
                "{}::{}",
                call.namespace, call.name
            ))),
            ExprVal::FunctionCall(call) => {
                if !self.functions.contains(&call.name) {
                    return Err(SecurityError::Function(call.name.clone()));
                }
                call.args.values().try_for_each(|arg| self.check_expr(arg))
            }
            ExprVal::Array(items) => items.iter().try_for_each(|item| self.check_expr(item)),
            ExprVal::StringConcat(concat) => concat
                .values
                .iter()
                .try_for_each(|value| self.check_value(value)),
        }
    }
}

/// Reject identifiers that reach a forbidden variable, including through a
/// subscript such as `page[__tera_context]`.
fn check_ident(ident: &str) -> Result<(), SecurityError> {
    let forbidden = ident
        .split(['.', '[', ']'])
        .map(str::trim)
        .find(|segment| FORBIDDEN_VARIABLES.contains(segment));

    match forbidden {
        Some(segment) => Err(SecurityError::Variable(segment.to_string())),
        None => Ok(()),
    }
}

/// Shared sandbox flag with its policy.
pub struct SandboxExtension {
    state: ReentrantMutex<Cell<bool>>,
    policy: SecurityPolicy,
}

impl SandboxExtension {
    pub fn new(policy: SecurityPolicy) -> Self {
        Self {
            state: ReentrantMutex::new(Cell::new(false)),
            policy,
        }
    }

    /// Whether the sandbox is currently on.
    pub fn is_sandboxed(&self) -> bool {
        self.state.lock().get()
    }

    /// Turn the sandbox on for everyone until [`disable_sandbox`] is called.
    ///
    /// [`disable_sandbox`]: Self::disable_sandbox
    pub fn enable_sandbox(&self) {
        self.state.lock().set(true);
    }

    /// Turn the sandbox off.
    pub fn disable_sandbox(&self) {
        self.state.lock().set(false);
    }

    pub fn policy(&self) -> &SecurityPolicy {
        &self.policy
    }

    /// Enter a sandbox scope.
    ///
    /// With `enable` set, the sandbox is switched on if it was off and
    /// switched back off when the scope ends. A sandbox that was already on
    /// is left on. Other threads wait until the scope ends; the same thread
    /// may open nested scopes.
    pub fn scope(&self, enable: bool) -> SandboxScope<'_> {
        let guard = self.state.lock();
        let enabled_here = enable && !guard.get();
        if enabled_here {
            guard.set(true);
            debug!("sandbox enabled for scope");
        }

        SandboxScope {
            guard,
            enabled_here,
            policy: &self.policy,
        }
    }
}

impl Default for SandboxExtension {
    fn default() -> Self {
        Self::new(SecurityPolicy::default())
    }
}

impl std::fmt::Debug for SandboxExtension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SandboxExtension")
            .field("sandboxed", &self.is_sandboxed())
            .finish_non_exhaustive()
    }
}

/// An open sandbox scope. Restores the flag on drop.
#[must_use = "the sandbox scope ends as soon as the guard is dropped"]
pub struct SandboxScope<'a> {
    guard: ReentrantMutexGuard<'a, Cell<bool>>,
    enabled_here: bool,
    policy: &'a SecurityPolicy,
}

impl SandboxScope<'_> {
    /// Whether the sandbox is on inside this scope.
    pub fn is_active(&self) -> bool {
        self.guard.get()
    }

    /// Parse `source` and check it against the policy if the sandbox is on.
    pub fn check(&self, source: &str) -> Result<(), RenderError> {
        if !self.is_active() {
            return Ok(());
        }
        let template = Template::new(SNIPPET_TEMPLATE, None, source)?;
        self.policy.check_template(&template)?;
        Ok(())
    }
}

impl Drop for SandboxScope<'_> {
    fn drop(&mut self) {
        if self.enabled_here {
            self.guard.set(false);
            debug!("sandbox disabled at end of scope");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn check(policy: &SecurityPolicy, source: &str) -> Result<(), SecurityError> {
        let template = Template::new("test", None, source).unwrap();
        policy.check_template(&template)
    }

    #[test]
    fn test_policy_allows_plain_output() {
        let policy = SecurityPolicy::default();
        assert!(check(&policy, "Hello {{ name | upper }}!").is_ok());
        assert!(
            check(&policy, "{% for i in range(end=3) %}{{ i }}{% endfor %}")
                .is_ok()
        );
        assert!(
            check(&policy, "{% if user is defined and not user.admin %}x{% endif %}")
                .is_ok()
        );
    }

    #[test]
    fn test_policy_rejects_include() {
        let policy = SecurityPolicy::default();
        assert_eq!(
            check(&policy, "{% include \"secret.html\" %}"),
            Err(SecurityError::Tag("include".to_string()))
        );
    }

    #[test]
    fn test_policy_rejects_safe_filter() {
        let policy = SecurityPolicy::default();
        assert_eq!(
            check(&policy, "{{ body | safe }}"),
            Err(SecurityError::Filter("safe".to_string()))
        );
        assert_eq!(
            check(&policy, "{% filter safe %}x{% endfilter %}"),
            Err(SecurityError::Filter("safe".to_string()))
        );
    }

    #[test]
    fn test_policy_rejects_get_env() {
        let policy = SecurityPolicy::default();
        assert_eq!(
            check(&policy, "{{ get_env(name=\"HOME\") }}"),
            Err(SecurityError::Function("get_env".to_string()))
        );
    }

    #[test]
    fn test_policy_rejects_context_dump() {
        let policy = SecurityPolicy::default();
        assert_eq!(
            check(&policy, "{{ __tera_context }}"),
            Err(SecurityError::Variable("__tera_context".to_string()))
        );
    }

    #[test]
    fn test_policy_ignores_strings_comments_and_raw() {
        let policy = SecurityPolicy::default();
        assert!(check(&policy, "{{ \"| safe get_env()\" }}").is_ok());
        assert!(check(&policy, "{# {{ get_env(name='X') }} #}ok").is_ok());
        assert!(
            check(&policy, "{% raw %}{% include \"x\" %}{% endraw %}")
                .is_ok()
        );
    }

    #[test]
    fn test_comment_markers_inside_strings_hide_nothing() {
        let policy = SecurityPolicy::default();
        assert_eq!(
            check(&policy, r##"{{ "{#" }}{{ get_env(name="HOME") }}{{ "#}" }}"##),
            Err(SecurityError::Function("get_env".to_string()))
        );
        assert_eq!(
            check(&policy, r##"{{ "{#" }}{% include "x.html" %}{{ "#}" }}"##),
            Err(SecurityError::Tag("include".to_string()))
        );
    }

    #[test]
    fn test_policy_checks_nested_bodies() {
        let policy = SecurityPolicy::default();
        assert_eq!(
            check(&policy, "{% for i in items %}{% if i %}{{ i | safe }}{% endif %}{% endfor %}"),
            Err(SecurityError::Filter("safe".to_string()))
        );
        assert_eq!(
            check(&policy, "{% if x %}a{% else %}{{ get_env(name='X') }}{% endif %}"),
            Err(SecurityError::Function("get_env".to_string()))
        );
        assert_eq!(
            check(&policy, "{{ items | join(sep=__tera_context) }}"),
            Err(SecurityError::Variable("__tera_context".to_string()))
        );
    }

    #[test]
    fn test_policy_rejects_context_through_subscript_and_global_set() {
        let policy = SecurityPolicy::default();
        assert_eq!(
            check(&policy, "{{ page[__tera_context] }}"),
            Err(SecurityError::Variable("__tera_context".to_string()))
        );
        assert!(check(&policy, r#"{{ page["__tera_context"] }}"#).is_ok());
        assert_eq!(
            check(&policy, "{% set_global x = 1 %}"),
            Err(SecurityError::Tag("set_global".to_string()))
        );
    }

    #[test]
    fn test_active_scope_reports_syntax_errors() {
        let sandbox = SandboxExtension::default();
        let scope = sandbox.scope(true);
        assert!(matches!(
            scope.check("{{ name "),
            Err(RenderError::Template(_))
        ));
    }

    #[test]
    fn test_policy_extension() {
        let policy = SecurityPolicy::default().allow_filter("safe");
        assert!(check(&policy, "{{ body | safe }}").is_ok());
        let policy = SecurityPolicy::default().allow_function("now");
        assert!(check(&policy, "{{ now() }}").is_ok());
    }

    #[test]
    fn test_scope_restores_flag() {
        let sandbox = SandboxExtension::default();
        {
            let scope = sandbox.scope(true);
            assert!(scope.is_active());
        }
        assert!(!sandbox.is_sandboxed());
    }

    #[test]
    fn test_scope_leaves_enclosing_sandbox_on() {
        let sandbox = SandboxExtension::default();
        sandbox.enable_sandbox();
        {
            let scope = sandbox.scope(true);
            assert!(scope.is_active());
        }
        assert!(sandbox.is_sandboxed());
    }

    #[test]
    fn test_nested_scopes_same_thread() {
        let sandbox = SandboxExtension::default();
        let outer = sandbox.scope(true);
        {
            let inner = sandbox.scope(true);
            assert!(inner.is_active());
        }
        assert!(outer.is_active());
        drop(outer);
        assert!(!sandbox.is_sandboxed());
    }

    #[test]
    fn test_unsandboxed_scope_skips_policy() {
        let sandbox = SandboxExtension::default();
        let scope = sandbox.scope(false);
        assert!(!scope.is_active());
        assert!(scope.check("{% include \"x\" %}").is_ok());
    }
}
