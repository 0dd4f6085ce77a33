//! Router tree and route registration.
//!
//! # Responsibilities
//! - Own compiled patterns, view sets, children, fallbacks and middleware
//! - Register internal (`include`) and leaf (`path`) children
//! - Reject colliding sibling templates at startup
//!
//! # Design Decisions
//! - A node's kind is fixed at creation: leaves never get children
//! - Collisions are judged on literal prefixes whenever an internal node
//!   is involved. Two distinct leaf templates never collide; registration
//!   order settles overlap between leaves
//! - The tree is read-only once serving starts; no interior mutability

use std::fmt;
use std::sync::Arc;

use axum::http::Method;

use crate::converters::ConverterRegistry;
use crate::http::Handler;
use crate::middleware::Middleware;
use crate::routing::pattern::{CompiledPattern, NodeKind};
use crate::routing::RouteError;

/// Method → handler mapping of a leaf route.
#[derive(Clone, Default)]
pub struct ViewSet {
    handlers: Vec<(Method, Arc<dyn Handler>)>,
}

impl ViewSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `handler` to `method`, replacing any previous binding.
    pub fn on(mut self, method: Method, handler: Arc<dyn Handler>) -> Self {
        self.handlers.retain(|(m, _)| *m != method);
        self.handlers.push((method, handler));
        self
    }

    pub fn get(self, handler: Arc<dyn Handler>) -> Self {
        self.on(Method::GET, handler)
    }

    pub fn post(self, handler: Arc<dyn Handler>) -> Self {
        self.on(Method::POST, handler)
    }

    pub fn put(self, handler: Arc<dyn Handler>) -> Self {
        self.on(Method::PUT, handler)
    }

    pub fn patch(self, handler: Arc<dyn Handler>) -> Self {
        self.on(Method::PATCH, handler)
    }

    pub fn delete(self, handler: Arc<dyn Handler>) -> Self {
        self.on(Method::DELETE, handler)
    }

    pub fn handler_for(&self, method: &Method) -> Option<&Arc<dyn Handler>> {
        self.handlers
            .iter()
            .find(|(m, _)| m == method)
            .map(|(_, h)| h)
    }

    pub fn allowed_methods(&self) -> Vec<Method> {
        self.handlers.iter().map(|(m, _)| m.clone()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl fmt::Debug for ViewSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.handlers.iter().map(|(m, _)| m))
            .finish()
    }
}

/// Flattened view of one registered route, for startup logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteInfo {
    pub template: String,
    pub methods: Vec<Method>,
    pub fallback: bool,
    pub middleware: usize,
}

/// A node of the router tree.
pub struct RouterNode {
    registry: Arc<ConverterRegistry>,
    pattern: CompiledPattern,
    pub(crate) views: ViewSet,
    pub(crate) children: Vec<RouterNode>,
    pub(crate) no_route: Option<Arc<dyn Handler>>,
    pub(crate) middleware: Vec<Arc<dyn Middleware>>,
}

impl RouterNode {
    /// Create the root node: an internal node with an empty template.
    pub fn root(registry: Arc<ConverterRegistry>) -> Self {
        let pattern = CompiledPattern::compile("", NodeKind::Internal, &registry)
            .expect("empty template always compiles");
        Self::with_pattern(registry, pattern)
    }

    fn with_pattern(registry: Arc<ConverterRegistry>, pattern: CompiledPattern) -> Self {
        Self {
            registry,
            pattern,
            views: ViewSet::new(),
            children: Vec::new(),
            no_route: None,
            middleware: Vec::new(),
        }
    }

    /// Register an internal child and return it for further registration.
    pub fn include(&mut self, template: &str) -> Result<&mut RouterNode, RouteError> {
        self.add_child(template, NodeKind::Internal, ViewSet::new())
    }

    /// Register a leaf child serving `views`.
    pub fn path(&mut self, template: &str, views: ViewSet) -> Result<&mut RouterNode, RouteError> {
        if views.is_empty() {
            return Err(RouteError::EmptyViewSet {
                template: template.to_string(),
            });
        }
        self.add_child(template, NodeKind::Leaf, views)
    }

    /// Bind middleware to this node and everything below it.
    pub fn use_middleware<M: Middleware>(&mut self, middleware: M) -> &mut Self {
        self.use_shared(Arc::new(middleware))
    }

    pub fn use_shared(&mut self, middleware: Arc<dyn Middleware>) -> &mut Self {
        self.middleware.push(middleware);
        self
    }

    /// Handler used when this node's prefix matched but no child did.
    pub fn set_no_route(&mut self, handler: Arc<dyn Handler>) -> &mut Self {
        self.no_route = Some(handler);
        self
    }

    pub fn template(&self) -> &str {
        self.pattern.template()
    }

    pub fn kind(&self) -> NodeKind {
        self.pattern.kind()
    }

    pub fn pattern(&self) -> &CompiledPattern {
        &self.pattern
    }

    pub fn children(&self) -> &[RouterNode] {
        &self.children
    }

    pub fn views(&self) -> &ViewSet {
        &self.views
    }

    pub fn middleware(&self) -> &[Arc<dyn Middleware>] {
        &self.middleware
    }

    pub fn registry(&self) -> &ConverterRegistry {
        &self.registry
    }

    /// Every leaf and fallback under this node, with full templates.
    pub fn routes(&self) -> Vec<RouteInfo> {
        let mut out = Vec::new();
        self.collect_routes("", 0, &mut out);
        out
    }

    fn collect_routes(&self, prefix: &str, inherited: usize, out: &mut Vec<RouteInfo>) {
        let template = format!("{}{}", prefix, self.template());
        let middleware = inherited + self.middleware.len();
        match self.kind() {
            NodeKind::Leaf => out.push(RouteInfo {
                template,
                methods: self.views.allowed_methods(),
                fallback: false,
                middleware,
            }),
            NodeKind::Internal => {
                for child in &self.children {
                    child.collect_routes(&template, middleware, out);
                }
                if self.no_route.is_some() {
                    out.push(RouteInfo {
                        template,
                        methods: Vec::new(),
                        fallback: true,
                        middleware,
                    });
                }
            }
        }
    }

    fn add_child(
        &mut self,
        template: &str,
        kind: NodeKind,
        views: ViewSet,
    ) -> Result<&mut RouterNode, RouteError> {
        if self.kind() == NodeKind::Leaf {
            return Err(RouteError::LeafParent {
                parent: self.template().to_string(),
                template: template.to_string(),
            });
        }
        let pattern = CompiledPattern::compile(template, kind, &self.registry)?;
        self.check_collision(&pattern)?;
        let mut child = Self::with_pattern(self.registry.clone(), pattern);
        child.views = views;

        tracing::debug!(
            parent = %self.template(),
            template = %template,
            kind = ?kind,
            "Route registered"
        );

        let index = self.children.len();
        self.children.push(child);
        Ok(&mut self.children[index])
    }

    /// Reject a new child whose inputs could overlap a sibling's.
    ///
    /// Equal templates always collide. When either side is internal, the
    /// literal prefixes (text before the first placeholder) are compared:
    /// overlapping prefixes collide, except that a placeholder-free leaf
    /// only collides with an internal sibling whose prefix it starts with.
    /// Two leaves with different templates never collide.
    fn check_collision(&self, pattern: &CompiledPattern) -> Result<(), RouteError> {
        for sibling in &self.children {
            if collides(sibling.pattern(), pattern) {
                return Err(RouteError::Collision {
                    existing: sibling.template().to_string(),
                    template: pattern.template().to_string(),
                });
            }
        }
        Ok(())
    }
}

fn collides(a: &CompiledPattern, b: &CompiledPattern) -> bool {
    if a.template() == b.template() {
        return true;
    }
    match (a.kind(), b.kind()) {
        (NodeKind::Leaf, NodeKind::Leaf) => false,
        (NodeKind::Internal, NodeKind::Internal) => prefixes_overlap(a, b),
        (NodeKind::Internal, NodeKind::Leaf) => internal_overlaps_leaf(a, b),
        (NodeKind::Leaf, NodeKind::Internal) => internal_overlaps_leaf(b, a),
    }
}

fn internal_overlaps_leaf(internal: &CompiledPattern, leaf: &CompiledPattern) -> bool {
    if leaf.params().is_empty() {
        leaf.template().starts_with(internal.literal_prefix())
    } else {
        prefixes_overlap(internal, leaf)
    }
}

fn prefixes_overlap(a: &CompiledPattern, b: &CompiledPattern) -> bool {
    let (a, b) = (a.literal_prefix(), b.literal_prefix());
    a.starts_with(b) || b.starts_with(a)
}

impl fmt::Debug for RouterNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouterNode")
            .field("template", &self.template())
            .field("kind", &self.kind())
            .field("views", &self.views)
            .field("children", &self.children)
            .field("middleware", &self.middleware.len())
            .field("no_route", &self.no_route.is_some())
            .finish()
    }
}
