#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Page cache policy tests.

mod common;

use axum::http::Method;
use bolt_kernel::cache::{CacheAccess, CacheKind, CachePolicyContext, can_use_cache};
use bolt_kernel::request::RequestContext;
use bolt_kernel::settings::CachingSettings;

use common::{TestRender, request_caching};

fn contexts() -> Vec<CachePolicyContext> {
    let mut all = Vec::new();
    for bits in 0u8..64 {
        let bit = |n: u8| bits & (1 << n) != 0;
        all.push(CachePolicyContext {
            is_safe_mode: bit(0),
            method: if bit(1) { Method::GET } else { Method::POST },
            path: "/entry/hello".to_string(),
            query: String::new(),
            is_authenticated: bit(2),
            override_requested: bit(3),
            cache_type_enabled: bit(4),
            authenticated_caching_enabled: bit(5),
        });
    }
    all
}

#[test]
fn test_policy_table() {
    for ctx in contexts() {
        for access in [CacheAccess::Read, CacheAccess::Write] {
            let expected = !ctx.is_safe_mode
                && ctx.method == Method::GET
                && ctx.cache_type_enabled
                && (!ctx.is_authenticated || ctx.authenticated_caching_enabled)
                && !(access == CacheAccess::Read && ctx.override_requested);

            for kind in [CacheKind::Request, CacheKind::Template] {
                assert_eq!(
                    can_use_cache(&ctx, kind, access),
                    expected,
                    "{ctx:?} {kind} {access:?}"
                );
            }
        }
    }
}

#[test]
fn test_policy_is_idempotent() {
    for ctx in contexts() {
        let first = can_use_cache(&ctx, CacheKind::Request, CacheAccess::Read);
        let second = can_use_cache(&ctx, CacheKind::Request, CacheAccess::Read);
        assert_eq!(first, second);
    }
}

#[test]
fn test_render_builds_policy_from_request() {
    let t = TestRender::new(&[], request_caching(), false);

    let anonymous = RequestContext::new(Method::GET, "/about", "");
    assert!(
        t.render
            .check_cache_conditions(&anonymous, CacheKind::Request, CacheAccess::Read)
    );
    assert!(
        !t.render
            .check_cache_conditions(&anonymous, CacheKind::Template, CacheAccess::Read)
    );

    let user = anonymous.clone().with_username(Some("admin".to_string()));
    assert!(
        !t.render
            .check_cache_conditions(&user, CacheKind::Request, CacheAccess::Read)
    );
}

#[test]
fn test_force_refresh_blocks_read_but_not_write() {
    let t = TestRender::new(&[], request_caching(), false);
    let req = RequestContext::new(Method::GET, "/about", "force_refresh=1");

    assert!(req.force_refresh);
    assert!(
        !t.render
            .check_cache_conditions(&req, CacheKind::Request, CacheAccess::Read)
    );
    assert!(
        t.render
            .check_cache_conditions(&req, CacheKind::Request, CacheAccess::Write)
    );
}

#[test]
fn test_safe_render_never_caches() {
    let t = TestRender::new(&[], request_caching(), true);
    let req = RequestContext::new(Method::GET, "/about", "");

    assert!(t.render.is_safe());
    for access in [CacheAccess::Read, CacheAccess::Write] {
        assert!(
            !t.render
                .check_cache_conditions(&req, CacheKind::Request, access)
        );
    }
}

#[test]
fn test_authenticated_caching_setting() {
    let caching = CachingSettings {
        authenticated: true,
        ..request_caching()
    };
    let t = TestRender::new(&[], caching, false);
    let req =
        RequestContext::new(Method::GET, "/about", "").with_username(Some("bob".to_string()));

    assert!(
        t.render
            .check_cache_conditions(&req, CacheKind::Request, CacheAccess::Read)
    );
}
