//! Example from the README.

use std::thread;

use frame_pump::FramePump;

fn main() {
    // Build on the thread that the host will tick.
    let pump = FramePump::builder().build().unwrap();
    let dispatcher = pump.dispatcher();

    let producer = {
        let dispatcher = dispatcher.clone();
        thread::spawn(move || {
            dispatcher.post(|| println!("posted from a background thread"));

            // send blocks until the continuation has run on the owner thread.
            dispatcher
                .send(|| println!("sent from a background thread"))
                .unwrap();
        })
    };

    // What the host does once per frame.
    loop {
        let reschedule = pump.tick(0.016, 0.016, 1);
        assert_eq!(reschedule, -1.0);

        if producer.is_finished() {
            break;
        }
        thread::sleep(std::time::Duration::from_millis(1));
    }

    producer.join().unwrap();

    // Drains anything still queued and waits for announced operations.
    dispatcher.dispose();
}
