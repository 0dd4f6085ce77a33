//! Recursive path resolution.
//!
//! # Responsibilities
//! - Walk the router tree against a request path
//! - Accumulate converted parameters and middleware (root to leaf)
//! - Fall back to `no_route` handlers, or report a miss
//!
//! # Design Decisions
//! - Parameters accumulate in one `Vec` threaded by `&mut`; a subtree that
//!   fails truncates back to where it started, so siblings never see stale values
//! - Folding into the `ParamMap` keeps order, so the deepest duplicate wins
//! - First matching child in registration order wins

use std::sync::Arc;

use crate::converters::ParamValue;
use crate::http::{Handler, ParamMap};
use crate::middleware::Middleware;
use crate::routing::node::{RouterNode, ViewSet};
use crate::routing::pattern::NodeKind;

/// What a successful resolution points at.
#[derive(Clone)]
pub enum Target<'a> {
    /// A leaf's method → handler map.
    Views(&'a ViewSet),
    /// An internal node's `no_route` handler.
    Fallback(Arc<dyn Handler>),
}

/// Result of resolving a path.
pub struct Resolution<'a> {
    pub target: Target<'a>,
    /// Middleware of every traversed node, outermost (root) first.
    pub middleware: Vec<Arc<dyn Middleware>>,
    pub params: ParamMap,
}

impl std::fmt::Debug for Resolution<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let target = match &self.target {
            Target::Views(views) => format!("{:?}", views),
            Target::Fallback(_) => "fallback".to_string(),
        };
        f.debug_struct("Resolution")
            .field("target", &target)
            .field("middleware", &self.middleware.len())
            .field("params", &self.params)
            .finish()
    }
}

type Resolved<'a> = (Target<'a>, Vec<Arc<dyn Middleware>>);

impl RouterNode {
    /// Resolve `path` (without its leading `/`) against this subtree.
    pub fn resolve(&self, path: &str) -> Option<Resolution<'_>> {
        let mut captured = Vec::new();
        let (target, middleware) = self.resolve_into(path, &mut captured)?;
        let params = captured.into_iter().collect();
        Some(Resolution {
            target,
            middleware,
            params,
        })
    }

    fn resolve_into<'a>(
        &'a self,
        path: &str,
        params: &mut Vec<(String, ParamValue)>,
    ) -> Option<Resolved<'a>> {
        let mark = params.len();
        let consumed = self.pattern().match_into(path, params)?;

        if self.kind() == NodeKind::Leaf {
            return Some((Target::Views(&self.views), self.middleware.clone()));
        }

        let rest = &path[consumed..];
        for child in &self.children {
            if let Some((target, inner)) = child.resolve_into(rest, params) {
                let mut chain = Vec::with_capacity(self.middleware.len() + inner.len());
                chain.extend(self.middleware.iter().cloned());
                chain.extend(inner);
                return Some((target, chain));
            }
        }

        if let Some(handler) = &self.no_route {
            return Some((Target::Fallback(handler.clone()), self.middleware.clone()));
        }

        params.truncate(mark);
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converters::{ConvertError, ConverterRegistry};
    use crate::http::{handler_fn, Request};
    use crate::middleware::Middleware;
    use axum::http::Method;

    struct Named(&'static str);

    impl Middleware for Named {
        fn name(&self) -> &'static str {
            self.0
        }
    }

    fn views() -> ViewSet {
        ViewSet::new().get(handler_fn(|_req: Request| async { "ok" }))
    }

    fn root() -> RouterNode {
        RouterNode::root(Arc::new(ConverterRegistry::with_builtins()))
    }

    #[test]
    fn test_nested_typed_param() {
        let mut root = root();
        root.include("api/").unwrap().path("users/<int:id>", views()).unwrap();

        let res = root.resolve("api/users/42").unwrap();
        assert_eq!(res.params.value("id"), Some(&ParamValue::Int(42)));
        assert!(matches!(res.target, Target::Views(v) if v.handler_for(&Method::GET).is_some()));

        assert!(root.resolve("api/users/abc").is_none());
        assert!(root.resolve("api/users/").is_none());
        assert!(root.resolve("other").is_none());
    }

    #[test]
    fn test_duplicate_names_deepest_wins() {
        let mut root = root();
        root.include("org/<int:id>/")
            .unwrap()
            .path("team/<int:id>", views())
            .unwrap();

        let res = root.resolve("org/1/team/2").unwrap();
        assert_eq!(res.params.get::<i64>("id").unwrap(), 2);
        assert_eq!(res.params.get_vec::<i64>("id").unwrap(), vec![1, 2]);
    }

    #[test]
    fn test_first_registered_wins() {
        let mut root = root();
        root.path("items/<int:id>", views()).unwrap().use_middleware(Named("first"));
        root.path("items/<str:key>", views()).unwrap().use_middleware(Named("second"));

        let res = root.resolve("items/7").unwrap();
        assert_eq!(res.middleware[0].name(), "first");
        assert!(res.params.contains("id"));

        let res = root.resolve("items/seven").unwrap();
        assert_eq!(res.middleware[0].name(), "second");
    }

    #[test]
    fn test_middleware_root_to_leaf() {
        let mut root = root();
        root.use_middleware(Named("root"));
        let api = root.include("api/").unwrap();
        api.use_middleware(Named("api"));
        api.path("ping", views()).unwrap().use_middleware(Named("leaf"));

        let res = root.resolve("api/ping").unwrap();
        let names: Vec<&str> = res.middleware.iter().map(|m| m.name()).collect();
        assert_eq!(names, ["root", "api", "leaf"]);
    }

    #[test]
    fn test_no_route_fallback() {
        let mut root = root();
        let api = root.include("api/<str:version>/").unwrap();
        api.use_middleware(Named("api"));
        api.path("users", views()).unwrap();
        api.set_no_route(handler_fn(|_req: Request| async { "fallback" }));

        let res = root.resolve("api/v1/unknown").unwrap();
        assert!(matches!(res.target, Target::Fallback(_)));
        assert_eq!(res.params.get::<String>("version").unwrap(), "v1");
        assert_eq!(res.middleware.len(), 1);

        // prefix itself must still match
        assert!(root.resolve("web/v1/unknown").is_none());
    }

    #[test]
    fn test_failed_subtree_leaves_no_stale_params() {
        let mut root = root();
        let org = root.include("org/<int:id>/").unwrap();
        org.include("team/<int:team>/")
            .unwrap()
            .path("only", views())
            .unwrap();
        org.set_no_route(handler_fn(|_req: Request| async { "org fallback" }));

        let res = root.resolve("org/1/team/2/nothing").unwrap();
        assert!(matches!(res.target, Target::Fallback(_)));
        assert!(!res.params.contains("team"));
        assert_eq!(res.params.get::<i64>("id").unwrap(), 1);
        assert_eq!(res.params.len(), 1);
    }

    #[test]
    fn test_internal_miss_without_fallback_resolves_nothing() {
        let mut root = root();
        let shop = root.include("shop/").unwrap();
        shop.include("<slug:cat>/").unwrap().path("list", views()).unwrap();
        root.path("shops", views()).unwrap();

        assert!(root.resolve("shop/books/used").is_none());
        let res = root.resolve("shops").unwrap();
        assert!(matches!(res.target, Target::Views(_)));
        assert!(res.params.is_empty());
    }

    #[test]
    fn test_semantic_converter_failure_tries_sibling() {
        let mut registry = ConverterRegistry::with_builtins();
        registry
            .register("year", "([0-9]{4})", |raw: &str| -> Result<ParamValue, ConvertError> {
                let year: i64 = raw.parse().map_err(|_| ConvertError("nan".into()))?;
                if year >= 1900 {
                    Ok(ParamValue::Int(year))
                } else {
                    Err(ConvertError("too old".into()))
                }
            })
            .unwrap();

        let mut root = RouterNode::root(Arc::new(registry));
        root.path("archive/<year:y>", views()).unwrap().use_middleware(Named("year"));
        root.path("archive/<str:raw>", views()).unwrap().use_middleware(Named("raw"));

        let res = root.resolve("archive/1850").unwrap();
        assert_eq!(res.middleware[0].name(), "raw");
        let res = root.resolve("archive/2001").unwrap();
        assert_eq!(res.middleware[0].name(), "year");
    }
}
