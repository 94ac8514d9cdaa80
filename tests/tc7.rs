use deferred::{when_void, Deferred, Outcome};
use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum TestError {
    Fail,
}

#[test]
fn test() {
    let log = Arc::new(Mutex::new(Vec::new()));

    let d1 = Deferred::<String, TestError>::new();
    let cl = log.clone();
    d1.canceller(move || cl.lock().push("d1 cancel".to_string()));

    let d2 = d1.pipe_outcome(|outcome| outcome.cloned());
    let d3 = d2.pipe_outcome(|outcome| outcome.cloned());

    let cl = log.clone();
    d3.failure(move |error| cl.lock().push(format!("d3 failure {error:?}")));

    d3.cancel();
    assert_eq!(*log.lock(), vec!["d1 cancel".to_string(), "d3 failure None".to_string()]);
    assert!(d1.is_cancelled());
    assert!(d2.is_cancelled());
    assert!(d3.is_cancelled());
}

#[test]
fn test_cancel_pipe_source_dropped() {
    let log = Arc::new(Mutex::new(Vec::new()));

    let d3 = {
        let d1 = Deferred::<String, TestError>::new();
        let cl = log.clone();
        d1.canceller(move || cl.lock().push("d1 cancel".to_string()));

        d1.pipe_outcome(|outcome| outcome.cloned())
            .pipe_outcome(|outcome| outcome.cloned())
    };

    let cl = log.clone();
    d3.failure(move |error| cl.lock().push(format!("d3 failure {error:?}")));

    d3.cancel();
    assert_eq!(*log.lock(), vec!["d1 cancel".to_string(), "d3 failure None".to_string()]);
    assert!(d3.is_cancelled());
}

fn logged_branch(log: &Arc<Mutex<Vec<&'static str>>>) -> Deferred<String, TestError> {
    let branch = Deferred::<String, TestError>::new();
    let (l1, l2) = (log.clone(), log.clone());
    branch
        .success(|_| panic!("success handler called on a cancelled branch"))
        .failure(move |_| l1.lock().push("branch failure"))
        .canceller(move || l2.lock().push("branch cancel"));
    branch
}

#[test]
fn test_cancel_pipe_halfway() {
    let log = Arc::new(Mutex::new(Vec::new()));

    let cl = log.clone();
    let deferred = Deferred::<String, TestError>::resolved("start".to_string())
        .pipe(move |_| logged_branch(&cl))
        .pipe_outcome(|outcome| {
            assert!(outcome.is_none());
            outcome.cloned()
        });

    let cl = log.clone();
    deferred
        .success(|_| panic!("success handler called on a cancelled pipe"))
        .failure(move |_| cl.lock().push("downstream failure"));

    deferred.cancel();
    assert_eq!(*log.lock(), vec!["branch cancel", "branch failure", "downstream failure"]);
}

#[test]
fn test_cancel_pipe_last() {
    let log = Arc::new(Mutex::new(Vec::new()));

    let cl = log.clone();
    let deferred = Deferred::<String, TestError>::resolved("start".to_string())
        .pipe(|outcome| {
            assert_eq!(outcome, Some(&Ok("start".to_string())));
            let next = Deferred::<String, TestError>::resolved("first".to_string());
            next.canceller(|| panic!("canceller of a resolved step"));
            next
        })
        .pipe(|outcome| {
            assert_eq!(outcome, Some(&Ok("first".to_string())));
            let next = Deferred::<String, TestError>::resolved("second".to_string());
            next.canceller(|| panic!("canceller of a resolved step"));
            next
        })
        .pipe(move |_| logged_branch(&cl));

    let cl = log.clone();
    deferred
        .success(|_| panic!("success handler called on a cancelled pipe"))
        .failure(move |_| cl.lock().push("downstream failure"));

    deferred.cancel();
    assert_eq!(*log.lock(), vec!["branch cancel", "branch failure", "downstream failure"]);
    assert!(deferred.is_cancelled());
}

#[test]
fn test_cancel_in_pipe() {
    let log = Arc::new(Mutex::new(Vec::new()));

    // Stands in for work that is still in flight when the cancellation arrives.
    let in_flight = Deferred::<(), TestError>::new();
    let cl = log.clone();
    in_flight.canceller(move || cl.lock().push("in flight cancel"));

    let (l1, l2, step) = (log.clone(), log.clone(), in_flight.clone());
    let d1 = Deferred::<(), TestError>::resolved(())
        .pipe(move |_| {
            l1.lock().push("step 1");
            let next = Deferred::<(), TestError>::resolved(());
            next.canceller(|| panic!("canceller of a resolved step"));
            next
        })
        .pipe(move |_| {
            l2.lock().push("step 2");
            step
        })
        .pipe_outcome(|outcome| outcome.cloned())
        .pipe_outcome(|outcome| outcome.cloned());

    let d2 = Deferred::<(), TestError>::resolved(());
    d2.canceller(|| panic!("canceller of a resolved deferred"));

    let outer = Deferred::<(), TestError>::new();
    let setup = when_void(&[d1.clone(), d2]);
    let (cl, target) = (log.clone(), outer.clone());
    setup
        .success(|_| panic!("success handler called on a cancelled aggregate"))
        .failure(move |error| {
            assert!(error.is_none());
            cl.lock().push("setup failure");
            target.reject(TestError::Fail);
        });

    let (cl, aggregate) = (log.clone(), setup.clone());
    outer.canceller(move || {
        cl.lock().push("outer cancel");
        aggregate.cancel();
    });

    outer.cancel();
    assert_eq!(
        *log.lock(),
        vec!["step 1", "step 2", "outer cancel", "in flight cancel", "setup failure"]
    );
    assert!(in_flight.is_cancelled());
    assert!(d1.is_cancelled());
    assert!(setup.is_cancelled());

    // The rejection issued from inside the cancellation settled `outer` first.
    assert_eq!(outer.error(), Some(TestError::Fail));
    assert!(!outer.is_cancelled());

    in_flight.resolve(());
    assert!(in_flight.is_cancelled());
}

#[test]
fn test_cancel_source_cancels_chain() {
    let deferred = Deferred::<i32, TestError>::new();
    let piped = deferred.pipe_outcome(|outcome: Option<&Outcome<i32, TestError>>| outcome.cloned());
    let log = Arc::new(Mutex::new(Vec::new()));

    let cl = log.clone();
    piped.complete(move |outcome| cl.lock().push(outcome.cloned()));

    deferred.cancel();
    assert!(piped.is_cancelled());
    assert_eq!(*log.lock(), vec![None]);
}
