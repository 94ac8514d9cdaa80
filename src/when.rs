use crate::deferred::Deferred;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering::SeqCst;
use std::sync::Arc;
use tracing::trace;

///
/// Creates a deferred that resolves once every deferred in `deferreds` has resolved.
///
/// The first rejection among them rejects the result with the same error. Later outcomes are ignored.
/// An empty slice gives an already resolved deferred.
///
/// # Cancellation
/// Cancelling the result cancels every deferred in `deferreds` that is still pending.
/// A cancelled input does not settle the result on its own.
///
pub fn when_void<T, E>(deferreds: &[Deferred<T, E>]) -> Deferred<(), E>
where
    T: Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    let aggregate = Deferred::new();
    if deferreds.is_empty() {
        aggregate.resolve(());
        return aggregate;
    }

    trace!(children = deferreds.len(), "when aggregate created");
    let unresolved = Arc::new(AtomicUsize::new(deferreds.len()));
    for deferred in deferreds {
        let unresolved = unresolved.clone();
        let target = aggregate.clone();
        deferred.complete(move |outcome| match outcome {
            Some(Ok(_)) => {
                if unresolved.fetch_sub(1, SeqCst) == 1 {
                    target.resolve(());
                }
            }
            Some(Err(error)) => _ = target.reject(error.clone()),
            None => (),
        });

        let child = deferred.clone();
        aggregate.canceller(move || {
            child.cancel();
        });
    }

    aggregate
}

/// Same as [`when_void`], but the result carries the values of all inputs in input order.
pub fn when_all<T, E>(deferreds: &[Deferred<T, E>]) -> Deferred<Vec<T>, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    let children = deferreds.to_vec();
    when_void(deferreds).map(move |_| children.iter().map(resolved_value).collect())
}

/// Reads the value of an input once the aggregate over it has resolved, which implies the input has resolved.
fn resolved_value<T: Clone + Send + Sync + 'static, E: Send + Sync + 'static>(deferred: &Deferred<T, E>) -> T {
    match deferred.value() {
        Ok(value) => value,
        Err(e) => unreachable!("when aggregate resolved before its input: {e}"),
    }
}

/// Waits for two deferreds of different value types. See [`when_void`].
pub fn when2<A, B, E>(a: &Deferred<A, E>, b: &Deferred<B, E>) -> Deferred<(A, B), E>
where
    A: Clone + Send + Sync + 'static,
    B: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    let (a, b) = (a.clone(), b.clone());
    when_void(&[a.as_void(), b.as_void()]).map(move |_| (resolved_value(&a), resolved_value(&b)))
}

/// Waits for three deferreds of different value types. See [`when_void`].
pub fn when3<A, B, C, E>(a: &Deferred<A, E>, b: &Deferred<B, E>, c: &Deferred<C, E>) -> Deferred<(A, B, C), E>
where
    A: Clone + Send + Sync + 'static,
    B: Clone + Send + Sync + 'static,
    C: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    let (a, b, c) = (a.clone(), b.clone(), c.clone());
    when_void(&[a.as_void(), b.as_void(), c.as_void()])
        .map(move |_| (resolved_value(&a), resolved_value(&b), resolved_value(&c)))
}

/// Waits for four deferreds of different value types. See [`when_void`].
pub fn when4<A, B, C, D, E>(
    a: &Deferred<A, E>,
    b: &Deferred<B, E>,
    c: &Deferred<C, E>,
    d: &Deferred<D, E>,
) -> Deferred<(A, B, C, D), E>
where
    A: Clone + Send + Sync + 'static,
    B: Clone + Send + Sync + 'static,
    C: Clone + Send + Sync + 'static,
    D: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    let (a, b, c, d) = (a.clone(), b.clone(), c.clone(), d.clone());
    when_void(&[a.as_void(), b.as_void(), c.as_void(), d.as_void()])
        .map(move |_| (resolved_value(&a), resolved_value(&b), resolved_value(&c), resolved_value(&d)))
}
