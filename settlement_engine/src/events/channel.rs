//! A small stateless pub-sub channel.
//!
//! Components subscribe to engine events (an order being paid, for instance) by registering a hook. Hooks only see
//! the event itself, never the engine's internal state. Each event is handled in its own task, so a slow hook (a
//! webhook subscriber that takes ten seconds to answer, say) never holds up the code that published the event.
use std::{future::Future, pin::Pin, sync::Arc};

use log::*;
use tokio::{sync::mpsc, task::JoinSet};

pub type Handler<E> = Arc<dyn Fn(E) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

pub struct EventHandler<E: Send + Sync + 'static> {
    listener: mpsc::Receiver<E>,
    sender: mpsc::Sender<E>,
    handler: Handler<E>,
}

impl<E: Send + Sync + 'static> EventHandler<E> {
    pub fn new(buffer_size: usize, handler: Handler<E>) -> Self {
        let (sender, receiver) = mpsc::channel(buffer_size);
        Self { listener: receiver, sender, handler }
    }

    pub fn subscribe(&self) -> EventProducer<E> {
        EventProducer::new(self.sender.clone())
    }

    /// Runs until every producer has been dropped, then waits for in-flight jobs to finish.
    pub async fn start_handler(mut self) {
        debug!("📬️ Starting event handler");
        // Dropping our own sender means the loop ends once the last producer goes away
        drop(self.sender);
        let mut jobs = JoinSet::new();
        while let Some(ev) = self.listener.recv().await {
            trace!("📬️ Handling event");
            let handler = Arc::clone(&self.handler);
            jobs.spawn(async move {
                (handler)(ev).await;
            });
            // Reap finished jobs so the set doesn't grow without bound on long-running servers
            while let Some(done) = jobs.try_join_next() {
                if let Err(e) = done {
                    warn!("📬️ An event hook panicked or was cancelled. {e}");
                }
            }
        }
        if !jobs.is_empty() {
            debug!("📬️ Waiting for {} event jobs to complete", jobs.len());
        }
        while let Some(done) = jobs.join_next().await {
            if let Err(e) = done {
                warn!("📬️ An event hook panicked or was cancelled. {e}");
            }
        }
        debug!("📬️ Event handler has shut down");
    }
}

#[derive(Clone)]
pub struct EventProducer<E: Send + Sync> {
    sender: mpsc::Sender<E>,
}

impl<E: Send + Sync> EventProducer<E> {
    pub fn new(sender: mpsc::Sender<E>) -> Self {
        Self { sender }
    }

    /// Queues the event for the handler. Returns false if the handler has gone away.
    pub async fn publish_event(&self, event: E) -> bool {
        match self.sender.send(event).await {
            Ok(()) => true,
            Err(e) => {
                error!("📬️ Failed to send event: {e}");
                false
            },
        }
    }
}
