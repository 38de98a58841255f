//! Differentiation sessions.
//!
//! Every [`diff`](crate::diff) call creates a fresh [`Context`]. Each
//! dual value it produces is stamped with that context, and the
//! dispatch layer only reads tangents stamped with the context that is
//! intercepting the current operation. Two contexts are equal only if
//! they are the same session; ids come from a global counter and are
//! never reused.
//!
//! While a traced function runs, its context is *active*: pushed on a
//! per-thread stack through an [`ActiveScope`] guard. Nested `diff`
//! calls push on top, so the stack mirrors the call stack of the
//! traced code and scopes never overlap.

use crate::rules::RuleTable;
use std::cell::RefCell;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static ACTIVE: RefCell<Vec<u64>> = const { RefCell::new(Vec::new()) };
}

/// The identity of one differentiation session.
///
/// A context also carries the rule table its session differentiates
/// with, so sessions built from different catalogs can nest.
///
/// # Examples
///
/// ```
/// use dualtag::{Context, Engine};
///
/// let engine = Engine::default();
/// let a = engine.context();
/// let b = engine.context();
///
/// assert_eq!(a, a.clone());
/// assert_ne!(a, b);
/// assert!(!a.is_active());
///
/// let scope = a.enter();
/// assert!(a.is_active());
/// drop(scope);
/// assert!(!a.is_active());
/// ```
#[derive(Clone)]
pub struct Context {
    id: u64,
    rules: Arc<RuleTable>,
}

impl Context {
    /// Allocate a new session identity.
    pub fn new(rules: Arc<RuleTable>) -> Self {
        let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
        log::trace!("context #{id}: created");
        Context { id, rules }
    }

    /// The numeric id, unique for the life of the process.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// The rule table this session propagates tangents with.
    pub fn rules(&self) -> &RuleTable {
        &self.rules
    }

    /// Make this context active on the current thread until the
    /// returned guard is dropped.
    pub fn enter(&self) -> ActiveScope {
        ACTIVE.with(|stack| stack.borrow_mut().push(self.id));
        ActiveScope {
            id: self.id,
            _not_send: PhantomData,
        }
    }

    /// Whether this context is active anywhere on the current thread's
    /// scope stack.
    pub fn is_active(&self) -> bool {
        self.depth().is_some()
    }

    /// Position on the current thread's scope stack, innermost highest.
    pub fn depth(&self) -> Option<usize> {
        ACTIVE.with(|stack| stack.borrow().iter().rposition(|&id| id == self.id))
    }

    /// Ordering key used to pick which of several owners intercepts an
    /// operation: active contexts outrank inactive ones, deeper scopes
    /// outrank shallower ones, and inactive contexts fall back to
    /// creation order.
    pub(crate) fn precedence(&self) -> (Option<usize>, u64) {
        (self.depth(), self.id)
    }
}

/// Number of contexts active on the current thread.
pub fn active_depth() -> usize {
    ACTIVE.with(|stack| stack.borrow().len())
}

impl PartialEq for Context {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Context {}

impl Hash for Context {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Context(#{})", self.id)
    }
}

/// Guard returned by [`Context::enter`]; deactivates the context on
/// drop, including during unwinding.
#[must_use = "the context is only active while the scope is alive"]
pub struct ActiveScope {
    id: u64,
    _not_send: PhantomData<*const ()>,
}

impl Drop for ActiveScope {
    fn drop(&mut self) {
        ACTIVE.with(|stack| {
            let mut stack = stack.borrow_mut();
            match stack.iter().rposition(|&id| id == self.id) {
                Some(pos) => {
                    debug_assert_eq!(pos + 1, stack.len(), "scopes must close innermost first");
                    stack.remove(pos);
                }
                None => log::warn!("context #{}: scope closed twice", self.id),
            }
        });
    }
}
