//! Simulates a host callback shim driving pumps through refcon tokens.

use frame_pump::{FramePump, TickRegistry, TickToken};

/// What a C callback shim receives from the host: an opaque pointer-sized refcon.
fn host_callback(registry: &TickRegistry, refcon: usize, counter: i32) -> f32 {
    registry.dispatch(TickToken::from_raw(refcon), 0.016, 0.016, counter)
}

fn main() {
    let mut registry = TickRegistry::new();

    let pump = FramePump::builder().build().unwrap();
    let dispatcher = pump.dispatcher();
    dispatcher.post(|| println!("dispatched through the registry"));

    let token = registry.register(pump);
    let refcon = token.to_raw();

    assert_eq!(host_callback(&registry, refcon, 1), -1.0);

    // After removal the token is stale; a late host callback is harmless and asks
    // the host to stop.
    let pump = registry.remove(token).unwrap();
    assert_eq!(host_callback(&registry, refcon, 2), 0.0);

    drop(pump); // disposes the dispatcher
}
