//! Reference visiting and reachability tracing.
//!
//! Objects, environments and realms are reference counted. Every type that
//! holds strong references to them implements [`Trace`], yielding each edge to
//! a [`Visitor`]. [`Tracer`] uses that to compute what a root keeps alive,
//! which is how hosts (and tests) check that closures retain exactly the
//! environments they captured.

use crate::env::{EnvRef, PrivateEnvironment};
use crate::prelude::*;
use crate::realm::Realm;
use crate::value::{CheapClone, JsObjectRef};

// ============================================================================
// Edges
// ============================================================================

/// A strong reference from one engine structure to another
#[derive(Clone)]
pub enum GcEdge {
    Object(JsObjectRef),
    Environment(EnvRef),
    PrivateEnvironment(Rc<PrivateEnvironment>),
    Realm(Rc<Realm>),
}

impl GcEdge {
    /// Identity of the referenced allocation
    fn address(&self) -> usize {
        match self {
            GcEdge::Object(o) => Rc::as_ptr(o) as *const () as usize,
            GcEdge::Environment(e) => Rc::as_ptr(e) as *const () as usize,
            GcEdge::PrivateEnvironment(p) => Rc::as_ptr(p) as *const () as usize,
            GcEdge::Realm(r) => Rc::as_ptr(r) as *const () as usize,
        }
    }

    fn visit_children(&self, visitor: &mut dyn Visitor) {
        match self {
            GcEdge::Object(o) => o.borrow().visit_references(visitor),
            GcEdge::Environment(e) => e.borrow().visit_references(visitor),
            GcEdge::PrivateEnvironment(p) => p.visit_references(visitor),
            GcEdge::Realm(r) => r.visit_references(visitor),
        }
    }
}

impl fmt::Debug for GcEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            GcEdge::Object(_) => "Object",
            GcEdge::Environment(_) => "Environment",
            GcEdge::PrivateEnvironment(_) => "PrivateEnvironment",
            GcEdge::Realm(_) => "Realm",
        };
        write!(f, "{}@{:#x}", kind, self.address())
    }
}

// ============================================================================
// Trace / Visitor
// ============================================================================

/// Receives each strong reference a structure holds
pub trait Visitor {
    fn visit(&mut self, edge: GcEdge);
}

impl<F: FnMut(GcEdge)> Visitor for F {
    fn visit(&mut self, edge: GcEdge) {
        self(edge)
    }
}

/// Trait for types that hold strong references to engine structures.
///
/// Implementations must report every `Rc` they own that points at an object,
/// environment, private environment or realm. Forgetting one makes the
/// referenced structure look unreachable to reachability analysis.
pub trait Trace {
    fn visit_references(&self, visitor: &mut dyn Visitor);
}

// ============================================================================
// Tracer
// ============================================================================

/// Counts of distinct structures reached from the traced roots
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TraceStats {
    pub objects: usize,
    pub environments: usize,
    pub private_environments: usize,
    pub realms: usize,
}

/// Mark phase over the reference graph, starting from explicit roots.
#[derive(Default)]
pub struct Tracer {
    visited: FxHashSet<usize>,
    mark_stack: Vec<GcEdge>,
    stats: TraceStats,
}

impl Tracer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark everything reachable from `root`
    pub fn trace(&mut self, root: GcEdge) {
        self.mark_stack.push(root);
        while let Some(edge) = self.mark_stack.pop() {
            if !self.visited.insert(edge.address()) {
                continue;
            }
            match edge {
                GcEdge::Object(_) => self.stats.objects += 1,
                GcEdge::Environment(_) => self.stats.environments += 1,
                GcEdge::PrivateEnvironment(_) => self.stats.private_environments += 1,
                GcEdge::Realm(_) => self.stats.realms += 1,
            }
            let mut children = Vec::new();
            edge.visit_children(&mut |child: GcEdge| children.push(child));
            self.mark_stack
                .extend(children.into_iter().filter(|c| !self.visited.contains(&c.address())));
        }
    }

    /// Mark everything reachable from a traceable value that is not itself
    /// a heap structure (an execution context, a function descriptor)
    pub fn trace_from(&mut self, root: &dyn Trace) {
        let mut roots = Vec::new();
        root.visit_references(&mut |edge: GcEdge| roots.push(edge));
        for edge in roots {
            self.trace(edge);
        }
    }

    pub fn is_object_reachable(&self, obj: &JsObjectRef) -> bool {
        self.visited
            .contains(&GcEdge::Object(obj.cheap_clone()).address())
    }

    pub fn is_environment_reachable(&self, env: &EnvRef) -> bool {
        self.visited
            .contains(&GcEdge::Environment(env.cheap_clone()).address())
    }

    pub fn stats(&self) -> TraceStats {
        self.stats
    }
}

/// Collect the direct edges of `value`, in visiting order
pub fn direct_references(value: &dyn Trace) -> Vec<GcEdge> {
    let mut edges = Vec::new();
    value.visit_references(&mut |edge: GcEdge| edges.push(edge));
    edges
}

/// `env` followed by each of its outer environments, innermost first
pub fn environment_chain(env: &EnvRef) -> Vec<EnvRef> {
    let mut chain = vec![env.cheap_clone()];
    let mut current = env.borrow().outer();
    while let Some(e) = current {
        current = e.borrow().outer();
        chain.push(e);
    }
    chain
}
