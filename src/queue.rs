//! The shared message channel between producers and the consumer.
//!
//! Any number of workers hold cloned senders; exactly one consumer thread
//! drains the receiver. Per-sender FIFO order is guaranteed by the channel;
//! relative order across distinct senders is not.

use crossbeam_channel::{Receiver, Sender, unbounded};

use crate::message::ProgressMessage;

/// Create the producer/consumer pair for one session.
pub(crate) fn channel() -> (ProgressSender, ProgressReceiver) {
    let (tx, rx) = unbounded();
    (ProgressSender { tx }, ProgressReceiver { rx })
}

/// Producer side of the session channel. Cheap to clone into workers.
#[derive(Debug, Clone)]
pub struct ProgressSender {
    tx: Sender<ProgressMessage>,
}

impl ProgressSender {
    /// Enqueue a message without blocking.
    ///
    /// A send after the consumer has exited is silently discarded: producers
    /// never observe consumer availability.
    pub fn put(&self, msg: ProgressMessage) {
        let _ = self.tx.send(msg);
    }
}

/// Consumer side of the session channel. Held by exactly one thread.
#[derive(Debug)]
pub(crate) struct ProgressReceiver {
    rx: Receiver<ProgressMessage>,
}

impl ProgressReceiver {
    /// Block until the next message arrives.
    ///
    /// Returns `None` once every sender has been dropped, so a consumer is
    /// never wedged on a channel nobody can write to anymore.
    pub(crate) fn get(&self) -> Option<ProgressMessage> {
        self.rx.recv().ok()
    }
}
