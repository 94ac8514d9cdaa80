use crate::error::NotResolved;
use defer_heavy::defer;
use parking_lot::Mutex;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;
use std::{mem, thread, vec};
use tracing::trace;

/// Terminal value of a settled [`Deferred`].
pub type Outcome<T, E> = Result<T, E>;

type SuccessHandler<T> = Box<dyn FnOnce(&T) + Send>;
type FailureHandler<E> = Box<dyn FnOnce(Option<&E>) + Send>;
type CompleteHandler<T, E> = Box<dyn FnOnce(Option<&Outcome<T, E>>) + Send>;
type CancelHandler = Box<dyn FnOnce() + Send>;

/// Status of a deferred, derived from its stored outcome and cancellation flag.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum Status {
    Unresolved,
    Resolved,
    /// Settled with an error.
    Rejected,
    /// Settled by [`Deferred::cancel`]. A cancelled deferred also counts as rejected.
    Cancelled,
}

impl Status {
    pub fn is_unresolved(self) -> bool {
        self == Status::Unresolved
    }

    pub fn is_resolved(self) -> bool {
        self == Status::Resolved
    }

    pub fn is_rejected(self) -> bool {
        matches!(self, Status::Rejected | Status::Cancelled)
    }

    pub fn is_cancelled(self) -> bool {
        self == Status::Cancelled
    }
}

///
/// A single-shot value that becomes available later.
///
/// A deferred settles at most once: it is resolved with a value, rejected with an error
/// or cancelled. Handlers registered before that moment are queued and fire in registration
/// order when it happens. Handlers registered afterwards fire immediately, in the calling thread,
/// before the registering function returns.
///
/// The handle is reference counted. Cloning it yields another handle to the same deferred.
///
/// # Triggers Execution
/// `resolve`, `reject` and `cancel` run every queued handler in the current thread before they return.
/// No lock is held while a handler runs, so handlers may freely call back into any deferred.
///
pub struct Deferred<T: Send + Sync + 'static, E: Send + Sync + 'static>(Arc<DeferredInner<T, E>>);

impl<T: Send + Sync + 'static, E: Send + Sync + 'static> Clone for Deferred<T, E> {
    fn clone(&self) -> Self {
        Deferred(self.0.clone())
    }
}

impl<T: Send + Sync + 'static, E: Send + Sync + 'static> Default for Deferred<T, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send + Sync + 'static, E: Send + Sync + 'static> Debug for Deferred<T, E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Deferred").field("status", &self.status()).finish()
    }
}

struct DeferredInner<T, E> {
    state: Mutex<DeferredState<T, E>>,
}

struct DeferredState<T, E> {
    /// Never set for a cancelled deferred.
    outcome: Option<Arc<Outcome<T, E>>>,
    cancelled: bool,
    handlers: Handlers<T, E>,
}

impl<T, E> DeferredState<T, E> {
    fn status(&self) -> Status {
        if self.cancelled {
            return Status::Cancelled;
        }

        match self.outcome.as_deref() {
            None => Status::Unresolved,
            Some(Ok(_)) => Status::Resolved,
            Some(Err(_)) => Status::Rejected,
        }
    }

    fn is_unresolved(&self) -> bool {
        self.status().is_unresolved()
    }
}

struct Handlers<T, E> {
    success: Vec<SuccessHandler<T>>,
    failure: Vec<FailureHandler<E>>,
    complete: Vec<CompleteHandler<T, E>>,
    cancel: Vec<CancelHandler>,
}

impl<T, E> Default for Handlers<T, E> {
    fn default() -> Self {
        Self {
            success: Vec::new(),
            failure: Vec::new(),
            complete: Vec::new(),
            cancel: Vec::new(),
        }
    }
}

impl<T, E> Handlers<T, E> {
    fn len(&self) -> usize {
        self.success.len() + self.failure.len() + self.complete.len()
    }

    /// Fires the queues for a terminal event. `None` means cancellation.
    /// Cancel handlers are dropped, they only ever run from `Deferred::cancel`.
    fn fire(self, outcome: Option<&Outcome<T, E>>) {
        match outcome {
            Some(Ok(value)) => drain(self.success, |handler| handler(value)),
            Some(Err(error)) => drain(self.failure, |handler| handler(Some(error))),
            None => drain(self.failure, |handler| handler(None)),
        }

        drain(self.complete, |handler| handler(outcome));
    }
}

/// Invokes every handler in order.
/// If one of them panics the rest of the queue still runs while unwinding.
fn drain<H>(queue: Vec<H>, invoke: impl Fn(H)) {
    let mut pending = queue.into_iter();
    while let Some(handler) = pending.next() {
        invoke_next(&mut pending, &invoke, handler);
    }
}

fn invoke_next<H>(pending: &mut vec::IntoIter<H>, invoke: &impl Fn(H), handler: H) {
    defer! {
        unwind_remaining(pending, invoke);
    }
    invoke(handler);
}

fn unwind_remaining<H>(pending: &mut vec::IntoIter<H>, invoke: &impl Fn(H)) {
    if thread::panicking() {
        for handler in pending {
            invoke(handler);
        }
    }
}

/// Settles the deferred it was handed out for.
/// Given to the setup closure of [`Deferred::with_setup`].
pub struct Resolver<T: Send + Sync + 'static, E: Send + Sync + 'static>(Deferred<T, E>);

impl<T: Send + Sync + 'static, E: Send + Sync + 'static> Clone for Resolver<T, E> {
    fn clone(&self) -> Self {
        Resolver(self.0.clone())
    }
}

impl<T: Send + Sync + 'static, E: Send + Sync + 'static> Debug for Resolver<T, E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Resolver").field(&self.0).finish()
    }
}

impl<T: Send + Sync + 'static, E: Send + Sync + 'static> Resolver<T, E> {
    pub fn resolve(&self, value: T) {
        self.0.resolve(value);
    }

    pub fn reject(&self, error: E) {
        self.0.reject(error);
    }

    pub fn cancel(&self) {
        self.0.cancel();
    }

    /// True once the deferred has settled in any way.
    /// Producers can use this to skip work nobody is waiting for any more.
    pub fn is_settled(&self) -> bool {
        !self.0.is_unresolved()
    }
}

impl<T: Send + Sync + 'static, E: Send + Sync + 'static> Deferred<T, E> {
    pub fn new() -> Self {
        Self::with_state(None)
    }

    /// Create a deferred that is already settled with the given outcome.
    pub fn from_outcome(outcome: Outcome<T, E>) -> Self {
        Self::with_state(Some(Arc::new(outcome)))
    }

    pub fn resolved(value: T) -> Self {
        Self::from_outcome(Ok(value))
    }

    pub fn rejected(error: E) -> Self {
        Self::from_outcome(Err(error))
    }

    /// Create a deferred that is already cancelled.
    pub fn cancelled() -> Self {
        let deferred = Self::new();
        deferred.cancel();
        deferred
    }

    ///
    /// Create a deferred and hand a [`Resolver`] for it to `setup`.
    ///
    /// `setup` runs before this function returns. It typically passes the resolver to whatever
    /// executor, timer or callback will eventually produce the value.
    ///
    /// # Example
    /// ```rust
    /// use std::thread;
    /// use deferred::Deferred;
    ///
    /// let deferred = Deferred::<i32, String>::with_setup(|resolver| {
    ///     thread::spawn(move || resolver.resolve(42)).join().unwrap();
    /// });
    ///
    /// assert_eq!(deferred.value(), Ok(42));
    /// ```
    ///
    pub fn with_setup(setup: impl FnOnce(Resolver<T, E>)) -> Self {
        let deferred = Self::new();
        setup(deferred.resolver());
        deferred
    }

    fn with_state(outcome: Option<Arc<Outcome<T, E>>>) -> Self {
        Self(Arc::new(DeferredInner {
            state: Mutex::new(DeferredState {
                outcome,
                cancelled: false,
                handlers: Handlers::default(),
            }),
        }))
    }

    pub fn resolver(&self) -> Resolver<T, E> {
        Resolver(self.clone())
    }

    /// Returns true if both handles refer to the same deferred.
    pub fn ptr_eq(this: &Self, other: &Self) -> bool {
        Arc::ptr_eq(&this.0, &other.0)
    }

    ///
    /// Resolve this deferred with the given value.
    /// Does nothing if the deferred has already settled.
    ///
    /// # Order of execution
    /// Success handlers run first, then complete handlers, each in registration order.
    ///
    pub fn resolve(&self, value: T) -> &Self {
        self.settle(Ok(value));
        self
    }

    ///
    /// Reject this deferred with the given error.
    /// Does nothing if the deferred has already settled.
    ///
    /// # Order of execution
    /// Failure handlers run first, then complete handlers, each in registration order.
    ///
    pub fn reject(&self, error: E) -> &Self {
        self.settle(Err(error));
        self
    }

    fn settle(&self, outcome: Outcome<T, E>) {
        let mut state = self.0.state.lock();
        if !state.is_unresolved() {
            return;
        }

        let outcome = Arc::new(outcome);
        state.outcome = Some(outcome.clone());
        let handlers = mem::take(&mut state.handlers);
        drop(state);

        trace!(
            handlers = handlers.len(),
            "deferred {}",
            if outcome.is_ok() { "resolved" } else { "rejected" }
        );
        handlers.fire(Some(&*outcome));
    }

    ///
    /// Cancel this deferred.
    /// Does nothing if the deferred has already settled.
    ///
    /// # Order of execution
    /// Cancel handlers run first, while the deferred still reports itself as unresolved.
    /// Then the deferred becomes cancelled, failure handlers run with `None` and complete handlers run with `None`.
    /// Success handlers never run.
    ///
    /// If a cancel handler settles this deferred itself, that settlement stands and the cancellation stops there.
    ///
    pub fn cancel(&self) -> &Self {
        let mut state = self.0.state.lock();
        if !state.is_unresolved() {
            return self;
        }
        let cancellers = mem::take(&mut state.handlers.cancel);
        drop(state);

        drain(cancellers, |handler| handler());

        let mut state = self.0.state.lock();
        if !state.is_unresolved() {
            return self;
        }
        state.cancelled = true;
        let handlers = mem::take(&mut state.handlers);
        drop(state);

        trace!(handlers = handlers.len(), "deferred cancelled");
        handlers.fire(None);
        self
    }

    /// Snapshot of the stored outcome. `None` while unresolved and for a cancelled deferred.
    fn settled(&self) -> Option<Arc<Outcome<T, E>>> {
        self.0.state.lock().outcome.clone()
    }

    ///
    /// Register a handler that runs with the value once this deferred resolves.
    ///
    /// If the deferred is already resolved the handler runs immediately.
    /// If it is rejected or cancelled the handler is dropped without running.
    ///
    pub fn success(&self, handler: impl FnOnce(&T) + Send + 'static) -> &Self {
        let mut state = self.0.state.lock();
        if state.is_unresolved() {
            state.handlers.success.push(Box::new(handler));
            return self;
        }
        drop(state);

        if let Some(Ok(value)) = self.settled().as_deref() {
            handler(value);
        }
        self
    }

    ///
    /// Register a handler that runs once this deferred is rejected or cancelled.
    /// The handler receives the error, or `None` on cancellation.
    ///
    /// If the deferred is already rejected or cancelled the handler runs immediately.
    /// If it is resolved the handler is dropped without running.
    ///
    pub fn failure(&self, handler: impl FnOnce(Option<&E>) + Send + 'static) -> &Self {
        let mut state = self.0.state.lock();
        if state.is_unresolved() {
            state.handlers.failure.push(Box::new(handler));
            return self;
        }
        drop(state);

        match self.settled().as_deref() {
            Some(Ok(_)) => (),
            Some(Err(error)) => handler(Some(error)),
            None => handler(None),
        }
        self
    }

    ///
    /// Register a handler that runs only if this deferred gets cancelled, before any other handler.
    ///
    /// Unlike every other handler, a canceller registered after the deferred has settled is dropped
    /// without running.
    ///
    pub fn canceller(&self, handler: impl FnOnce() + Send + 'static) -> &Self {
        let mut state = self.0.state.lock();
        if state.is_unresolved() {
            state.handlers.cancel.push(Box::new(handler));
        }
        self
    }

    ///
    /// Register a handler that runs once this deferred settles in any way.
    /// The handler receives the outcome, or `None` on cancellation.
    ///
    /// If the deferred has already settled the handler runs immediately.
    ///
    pub fn complete(&self, handler: impl FnOnce(Option<&Outcome<T, E>>) + Send + 'static) -> &Self {
        let mut state = self.0.state.lock();
        if state.is_unresolved() {
            state.handlers.complete.push(Box::new(handler));
            return self;
        }
        drop(state);

        handler(self.settled().as_deref());
        self
    }

    pub fn status(&self) -> Status {
        self.0.state.lock().status()
    }

    pub fn is_unresolved(&self) -> bool {
        self.status().is_unresolved()
    }

    pub fn is_resolved(&self) -> bool {
        self.status().is_resolved()
    }

    /// True if the deferred was rejected or cancelled.
    pub fn is_rejected(&self) -> bool {
        self.status().is_rejected()
    }

    pub fn is_cancelled(&self) -> bool {
        self.status().is_cancelled()
    }

    /// Copy of the stored outcome.
    /// `None` while unresolved and for a cancelled deferred.
    pub fn outcome(&self) -> Option<Outcome<T, E>>
    where
        T: Clone,
        E: Clone,
    {
        self.settled().map(|outcome| outcome.as_ref().clone())
    }

    ///
    /// Copy of the value this deferred resolved with.
    ///
    /// # Errors
    /// [`NotResolved`] carrying the actual status if the deferred is not resolved.
    ///
    pub fn value(&self) -> Result<T, NotResolved>
    where
        T: Clone,
    {
        let state = self.0.state.lock();
        match state.outcome.as_deref() {
            Some(Ok(value)) if !state.cancelled => Ok(value.clone()),
            _ => Err(NotResolved {
                status: state.status(),
            }),
        }
    }

    /// Copy of the error this deferred was rejected with.
    /// `None` unless it was rejected, in particular `None` when it was cancelled.
    pub fn error(&self) -> Option<E>
    where
        E: Clone,
    {
        match self.settled().as_deref() {
            Some(Err(error)) => Some(error.clone()),
            _ => None,
        }
    }
}
