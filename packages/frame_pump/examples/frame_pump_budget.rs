//! Demonstrates item-budgeted draining: five items, two per tick.

use std::num::NonZero;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use frame_pump::FramePump;

fn main() {
    let pump = FramePump::builder()
        .items_per_tick(NonZero::new(2).unwrap())
        .build()
        .unwrap();
    let dispatcher = pump.dispatcher();

    let executed = Arc::new(AtomicUsize::new(0));

    for index in 0..5 {
        let executed = Arc::clone(&executed);
        dispatcher.post(move || {
            executed.fetch_add(1, Ordering::Relaxed);
            println!("item {index} ran");
        });
    }

    for counter in 1..=3 {
        pump.tick(0.016, 0.016, counter);
        println!(
            "after tick {counter}: {} items executed",
            executed.load(Ordering::Relaxed)
        );
    }

    assert_eq!(executed.load(Ordering::Relaxed), 5);
}
