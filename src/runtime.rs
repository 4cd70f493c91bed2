use std::time::Duration;

use futures::StreamExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::application::Action;
use crate::message::Message;

/// Executes [`Action`]s on tokio and funnels the resulting messages into a
/// single queue. Performs are fire-and-forget: their completions arrive in
/// whatever order they finish.
pub struct Runtime {
    tx: mpsc::UnboundedSender<Message>,
    rx: mpsc::UnboundedReceiver<Message>,
}

impl Runtime {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self { tx, rx }
    }

    pub fn execute(&self, action: Action) {
        match action {
            Action::None => {}
            Action::Batch(actions) => {
                for action in actions {
                    self.execute(action);
                }
            }
            Action::Perform(future) => {
                let tx = self.tx.clone();
                tokio::spawn(async move {
                    let message = future.await;
                    let _ = tx.send(message);
                });
            }
            Action::Listen(mut stream) => {
                let tx = self.tx.clone();
                tokio::spawn(async move {
                    while let Some(message) = stream.next().await {
                        if tx.send(message).is_err() {
                            break;
                        }
                    }
                    log::debug!("Subscription stream ended");
                });
            }
        }
    }

    /// Send `make()` every `period`, starting one period from now.
    pub fn every(&self, period: Duration, make: fn() -> Message) -> JoinHandle<()> {
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                if tx.send(make()).is_err() {
                    break;
                }
            }
        })
    }

    pub async fn next(&mut self) -> Option<Message> {
        self.rx.recv().await
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}
