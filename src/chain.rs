use crate::deferred::{Deferred, Outcome};

impl<T: Send + Sync + 'static, E: Send + Sync + 'static> Deferred<T, E> {
    ///
    /// Creates a child deferred that settles with the deferred `handler` produces from this deferred's outcome.
    ///
    /// `handler` runs once this deferred settles. It receives the outcome, or `None` if this deferred was cancelled,
    /// and must return the deferred that stands for the next step. When that deferred resolves or rejects,
    /// the child resolves or rejects the same way. If it gets cancelled, the child is left pending until it is cancelled itself.
    ///
    /// # Cancellation
    /// Cancelling the child cancels this deferred, and once `handler` has run, also the deferred it returned.
    /// The child keeps both alive until it settles, even if nothing else holds them.
    ///
    /// # Triggers Execution
    /// If this deferred has already settled, `handler` runs immediately in the current thread.
    ///
    pub fn pipe<T2, E2>(
        &self,
        handler: impl FnOnce(Option<&Outcome<T, E>>) -> Deferred<T2, E2> + Send + 'static,
    ) -> Deferred<T2, E2>
    where
        T2: Clone + Send + Sync + 'static,
        E2: Clone + Send + Sync + 'static,
    {
        let child = Deferred::new();
        let source = self.clone();
        child.canceller(move || {
            source.cancel();
        });

        let target = child.clone();
        self.complete(move |outcome| {
            let branch = handler(outcome);

            let forward = target.clone();
            branch.complete(move |outcome| match outcome {
                Some(Ok(value)) => _ = forward.resolve(value.clone()),
                Some(Err(error)) => _ = forward.reject(error.clone()),
                None => (),
            });

            target.canceller(move || {
                branch.cancel();
            });
        });

        child
    }

    ///
    /// Same as [`Deferred::pipe`] for a handler that maps the outcome directly.
    /// A `Some` result settles the child with it, a `None` result cancels the child.
    ///
    pub fn pipe_outcome<T2, E2>(
        &self,
        handler: impl FnOnce(Option<&Outcome<T, E>>) -> Option<Outcome<T2, E2>> + Send + 'static,
    ) -> Deferred<T2, E2>
    where
        T2: Clone + Send + Sync + 'static,
        E2: Clone + Send + Sync + 'static,
    {
        self.pipe(move |outcome| match handler(outcome) {
            Some(outcome) => Deferred::from_outcome(outcome),
            None => Deferred::cancelled(),
        })
    }

    ///
    /// Creates a child deferred that continues with the deferred `handler` returns for the value of this deferred.
    ///
    /// `handler` only runs if this deferred resolves. A rejection is passed on to the child unchanged,
    /// a cancellation cancels the child.
    ///
    pub fn then<T2>(&self, handler: impl FnOnce(&T) -> Deferred<T2, E> + Send + 'static) -> Deferred<T2, E>
    where
        T2: Clone + Send + Sync + 'static,
        E: Clone,
    {
        self.pipe(move |outcome| match outcome {
            Some(Ok(value)) => handler(value),
            Some(Err(error)) => Deferred::rejected(error.clone()),
            None => Deferred::cancelled(),
        })
    }

    /// Same as [`Deferred::then`] for a handler that produces the outcome of the next step directly.
    pub fn then_outcome<T2>(&self, handler: impl FnOnce(&T) -> Outcome<T2, E> + Send + 'static) -> Deferred<T2, E>
    where
        T2: Clone + Send + Sync + 'static,
        E: Clone,
    {
        self.then(move |value| Deferred::from_outcome(handler(value)))
    }

    /// Same as [`Deferred::then`] for a handler that cannot fail.
    pub fn map<T2>(&self, handler: impl FnOnce(&T) -> T2 + Send + 'static) -> Deferred<T2, E>
    where
        T2: Clone + Send + Sync + 'static,
        E: Clone,
    {
        self.then_outcome(move |value| Ok(handler(value)))
    }

    /// Discards the value while keeping rejection and cancellation.
    pub fn as_void(&self) -> Deferred<(), E>
    where
        E: Clone,
    {
        self.map(|_| ())
    }

    ///
    /// Makes this deferred follow `other`.
    ///
    /// Once `other` resolves, rejects or gets cancelled, this deferred does the same.
    /// Cancelling this deferred while it is pending cancels `other`.
    /// Has no effect on a deferred that has already settled.
    ///
    pub fn sync(&self, other: &Deferred<T, E>) -> &Self
    where
        T: Clone,
        E: Clone,
    {
        let source = other.clone();
        self.canceller(move || {
            source.cancel();
        });

        let target = self.clone();
        other.complete(move |outcome| match outcome {
            Some(Ok(value)) => _ = target.resolve(value.clone()),
            Some(Err(error)) => _ = target.reject(error.clone()),
            None => _ = target.cancel(),
        });

        self
    }
}
