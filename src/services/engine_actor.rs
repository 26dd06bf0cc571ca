use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::services::command::Command;
use crate::services::contest_engine::ContestEngine;
use crate::services::protocol::{self, Outcome};

const QUEUE_CAPACITY: usize = 256;

#[derive(Debug, Error)]
pub enum ActorError {
    #[error("engine task has stopped")]
    Stopped,
}

struct Request {
    command: Command,
    reply: oneshot::Sender<Outcome>,
}

/// Cloneable sender side of the engine task. Commands from every handle are
/// applied one at a time, in the order they reach the queue.
#[derive(Debug, Clone)]
pub struct EngineHandle {
    tx: mpsc::Sender<Request>,
}

impl EngineHandle {
    pub async fn execute(&self, command: Command) -> Result<Outcome, ActorError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Request { command, reply })
            .await
            .map_err(|_| ActorError::Stopped)?;
        rx.await.map_err(|_| ActorError::Stopped)
    }
}

/// Moves `engine` onto its own task. The task ends after END or once every
/// handle is dropped, and hands the engine back for inspection.
pub fn spawn(mut engine: ContestEngine) -> (EngineHandle, JoinHandle<ContestEngine>) {
    let (tx, mut rx) = mpsc::channel::<Request>(QUEUE_CAPACITY);

    let task = tokio::spawn(async move {
        info!("Engine task started");
        while let Some(Request { command, reply }) = rx.recv().await {
            debug!("Applying {:?}", command);
            let outcome = protocol::execute(&mut engine, command);
            let finished = outcome.finished;
            let _ = reply.send(outcome);
            if finished {
                break;
            }
        }
        info!("Engine task stopped");
        engine
    });

    (EngineHandle { tx }, task)
}
