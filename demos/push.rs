use std::thread;
use std::time::Duration;
use deferred::{when2, Deferred};

fn main() {
    let first: Deferred<i32, String> = Deferred::new();
    let second: Deferred<String, String> = Deferred::new();
    {
        //The deferred is reference counted so it can be sent/shared with any thread.
        let first = first.clone();
        let second = second.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_secs(1));

            //'Push' the values and run every handler right here!
            first.resolve(12345);
            second.resolve("abc".to_string());
        });
    }

    let slow: Deferred<(), String> = Deferred::new();
    slow.canceller(|| println!("slow work cancelled"));
    let chained = slow.map(|_| println!("never printed"));
    chained.cancel();

    let (tx, rx) = std::sync::mpsc::channel();
    when2(&first, &second).success(move |(number, text)| {
        _ = tx.send(format!("{number} {text}"));
    });

    if let Ok(line) = rx.recv() {
        println!("{line}");
    }
}
