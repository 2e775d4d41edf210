//! Task-local context.
//!
//! A [`Context`] is an immutable chain of variable bindings. Each task
//! captures the context current at its creation and runs every resume of
//! its body inside it, so a [`ContextVar`] read from a task sees the value
//! bound where the task was created, regardless of which other tasks run
//! in between.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Source of unique variable identifiers.
static NEXT_VAR: AtomicU64 = AtomicU64::new(0);

thread_local! {
    /// The context in effect on this thread; `None` means the root.
    static CURRENT: RefCell<Option<Context>> = const { RefCell::new(None) };

    /// Root context of this thread.
    static ROOT: Context = Context {
        node: Rc::new(Node { binding: None, parent: None }),
    };
}

/// One link of the chain.
struct Node {
    /// Variable id and value bound at this link; `None` for a root.
    binding: Option<(u64, Rc<dyn Any>)>,
    parent: Option<Rc<Node>>,
}

/// An immutable set of task-local variable bindings.
///
/// Contexts are cheap to clone and never shared between threads.
///
/// # Examples
///
/// ```rust,ignore
/// static REQUEST: ContextVar<u32> = ContextVar::new();
///
/// let ctx = Context::current().with(&REQUEST, 7);
/// ctx.run(|| assert_eq!(REQUEST.get(), Some(7)));
/// assert_eq!(REQUEST.get(), None);
/// ```
#[derive(Clone)]
pub struct Context {
    node: Rc<Node>,
}

impl Context {
    /// Returns the context in effect on this thread.
    ///
    /// Inside a task this is the context the task was created with.
    pub fn current() -> Context {
        CURRENT
            .with(|cell| cell.borrow().clone())
            .unwrap_or_else(Context::background)
    }

    /// Returns the root context of this thread, which binds nothing.
    pub fn background() -> Context {
        ROOT.with(Context::clone)
    }

    /// Derives a child context binding `var` to `value`.
    ///
    /// Bindings of `self` stay visible in the child unless shadowed.
    pub fn with<T: 'static>(&self, var: &ContextVar<T>, value: T) -> Context {
        Context {
            node: Rc::new(Node {
                binding: Some((var.id(), Rc::new(value))),
                parent: Some(self.node.clone()),
            }),
        }
    }

    /// Runs `f` with this context in effect, restoring the previous one
    /// afterwards.
    pub fn run<R>(&self, f: impl FnOnce() -> R) -> R {
        let prev = CURRENT.with(|cell| cell.borrow_mut().replace(self.clone()));
        let _guard = Restore(prev);

        f()
    }

    fn lookup<T: Clone + 'static>(&self, id: u64) -> Option<T> {
        let mut node = Some(&self.node);

        while let Some(current) = node {
            match &current.binding {
                Some((bound, value)) if *bound == id => {
                    return value.downcast_ref::<T>().cloned();
                }
                _ => {}
            }

            node = current.parent.as_ref();
        }

        None
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut depth = 0;
        let mut node = self.node.parent.as_ref();

        while let Some(current) = node {
            depth += 1;
            node = current.parent.as_ref();
        }

        f.debug_struct("Context").field("depth", &depth).finish()
    }
}

/// Puts the previous context back.
struct Restore(Option<Context>);

impl Drop for Restore {
    fn drop(&mut self) {
        let prev = self.0.take();
        CURRENT.with(|cell| *cell.borrow_mut() = prev);
    }
}

/// A key into task-local contexts.
///
/// Each variable is distinct, even when two variables share a value type.
pub struct ContextVar<T> {
    id: AtomicU64,
    _marker: PhantomData<fn() -> T>,
}

impl<T: 'static> ContextVar<T> {
    /// Creates a new variable. Usable in `static` items.
    pub const fn new() -> Self {
        Self {
            id: AtomicU64::new(u64::MAX),
            _marker: PhantomData,
        }
    }

    /// Identifier, assigned lazily on first use.
    fn id(&self) -> u64 {
        let id = self.id.load(Ordering::Acquire);

        if id != u64::MAX {
            return id;
        }

        let fresh = NEXT_VAR.fetch_add(1, Ordering::Relaxed);

        match self
            .id
            .compare_exchange(u64::MAX, fresh, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) => fresh,
            Err(existing) => existing,
        }
    }
}

impl<T: Clone + 'static> ContextVar<T> {
    /// Reads the value bound in the current context.
    pub fn get(&self) -> Option<T> {
        self.get_in(&Context::current())
    }

    /// Reads the value bound in `context`.
    pub fn get_in(&self, context: &Context) -> Option<T> {
        context.lookup(self.id())
    }
}

impl<T: 'static> Default for ContextVar<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for ContextVar<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextVar")
            .field("id", &self.id.load(Ordering::Relaxed))
            .finish()
    }
}
