use std::thread;
use std::time::Duration;
use deferred::Deferred;

fn main() {
    let (tx, rx) = std::sync::mpsc::channel();

    Deferred::<i32, String>::with_setup(|resolver| {
        // The deferred never runs anything on its own.
        // Here a plain thread plays the executor, any timer or event loop would do.
        thread::spawn(move || {
            thread::sleep(Duration::from_secs(1));
            resolver.resolve(12345);
        });
    })
    .map(|intermediate| {
        // Executed in the thread above, right when it resolves.
        format!("The result is {intermediate}")
    })
    .complete(move |outcome| {
        _ = tx.send(outcome.cloned());
    });

    match rx.recv() {
        Ok(Some(Ok(result))) => println!("{result}"),
        Ok(Some(Err(error))) => println!("failed: {error}"),
        Ok(None) => println!("cancelled"),
        Err(_) => println!("dropped"),
    }
}
