//! Interrupt handling

use deploy_orchestration::Cancellation;
use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook::iterator::Signals;
use std::thread;
use tracing::warn;

/// Cancel `cancellation` on the first SIGINT or SIGTERM.
///
/// A second signal exits immediately with status 130. Containers are never
/// stopped here; the next run picks up whatever state they are in.
pub fn cancel_on_interrupt(cancellation: Cancellation) -> std::io::Result<()> {
    let mut signals = Signals::new([SIGINT, SIGTERM])?;

    thread::spawn(move || {
        for signal in signals.forever() {
            if cancellation.is_cancelled() {
                eprintln!("Received signal {} again, exiting", signal);
                std::process::exit(130);
            }
            warn!(
                "Received signal {}, cancelling deployment (containers are left running)",
                signal
            );
            cancellation.cancel();
        }
    });

    Ok(())
}
