use crossbeam_channel::{Receiver, Sender, unbounded};
use tracing::{debug, warn};

use crate::OverlayCommand;

/// Producer handle on the coordinator's command queue.
///
/// Cheap to clone; every clone enqueues into the same FIFO, so commands
/// from one producer are consumed in the order they were posted.
#[derive(Clone, Debug)]
pub struct OverlayInbox {
    tx: Sender<OverlayCommand>,
}

impl OverlayInbox {
    /// Enqueue a command. A stopped coordinator is logged, never reported.
    pub fn send(&self, command: OverlayCommand) {
        debug!(command = command.name(), "Posting overlay command");
        if self.tx.send(command).is_err() {
            warn!("Overlay coordinator is gone, command dropped");
        }
    }
}

/// Creates the inbox and the receiving end handed to the coordinator.
pub fn overlay_channel() -> (OverlayInbox, Receiver<OverlayCommand>) {
    let (tx, rx) = unbounded();
    (OverlayInbox { tx }, rx)
}
