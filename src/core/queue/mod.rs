use crate::core::gpu::GpuSink;
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use tracing::debug;

/*
Single-producer single-consumer channel between the emulator actor and the
renderer actor. The emulator side blocks at cycle-billing boundaries when
the queue is full; the renderer blocks waiting for work and drains until
the close signal.
 */

const QUEUE_DEPTH: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GpuCommand {
    Gp0(u32),
    Gp1(u32),
    /// Close signal: the emulator is shutting down.
    EndProcessing,
}

pub struct WorkQueue {
    sender: Sender<GpuCommand>,
    receiver: Receiver<GpuCommand>,
}

impl WorkQueue {
    pub fn new() -> Self {
        let (sender, receiver) = bounded(QUEUE_DEPTH);
        WorkQueue { sender, receiver }
    }

    pub fn split(self) -> (WorkQueueProducer, WorkQueueConsumer) {
        (
            WorkQueueProducer { sender: self.sender },
            WorkQueueConsumer { receiver: self.receiver },
        )
    }
}

#[derive(Clone)]
pub struct WorkQueueProducer {
    sender: Sender<GpuCommand>,
}

impl WorkQueueProducer {
    /// Backpressure point: a full queue parks the emulator actor until
    /// the renderer catches up.
    pub fn push(&self, command: GpuCommand) {
        match self.sender.try_send(command) {
            Ok(()) => {}
            Err(TrySendError::Full(command)) => {
                let _ = self.sender.send(command);
            }
            Err(TrySendError::Disconnected(_)) => {
                debug!("work queue consumer is gone, dropping {:?}", command);
            }
        }
    }

    /// Releases a renderer blocked in `wait_for_item`.
    pub fn end_processing(&self) {
        let _ = self.sender.send(GpuCommand::EndProcessing);
    }
}

/// GPU port traffic feeds straight into the queue.
impl GpuSink for WorkQueueProducer {
    fn gp0_write(&mut self, word: u32) {
        self.push(GpuCommand::Gp0(word));
    }

    fn gp1_write(&mut self, word: u32) {
        self.push(GpuCommand::Gp1(word));
    }
}

pub struct WorkQueueConsumer {
    receiver: Receiver<GpuCommand>,
}

impl WorkQueueConsumer {
    /// Blocks until the next command; None means the producer closed the
    /// queue and the renderer should drain out.
    pub fn wait_for_item(&self) -> Option<GpuCommand> {
        match self.receiver.recv() {
            Ok(GpuCommand::EndProcessing) | Err(_) => None,
            Ok(command) => Some(command),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_arrive_in_order() {
        let (producer, consumer) = WorkQueue::new().split();
        producer.push(GpuCommand::Gp0(1));
        producer.push(GpuCommand::Gp1(2));
        assert_eq!(consumer.wait_for_item(), Some(GpuCommand::Gp0(1)));
        assert_eq!(consumer.wait_for_item(), Some(GpuCommand::Gp1(2)));
    }

    #[test]
    fn end_processing_wakes_the_consumer() {
        let (producer, consumer) = WorkQueue::new().split();
        let renderer = std::thread::spawn(move || {
            let mut seen = 0;
            while consumer.wait_for_item().is_some() {
                seen += 1;
            }
            seen
        });
        producer.push(GpuCommand::Gp0(0xAA));
        producer.end_processing();
        assert_eq!(renderer.join().unwrap(), 1);
    }
}
