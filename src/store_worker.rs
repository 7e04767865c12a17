//! A store owned by its own thread and reached over channels.
//!
//! The engine calls a [`StoreHandle`] like any other [`FightDataSource`]; each call sends a
//! command to the worker and blocks on the reply. Whatever the worker does to answer is
//! invisible to the caller.

use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};

use anyhow::{Context, Result, anyhow};

use crate::model::{Fight, FightId, FightRecord, Fighter, FighterId};
use crate::snapshot::FighterSnapshot;
use crate::store::FightDataSource;

type Reply<T> = Sender<Result<T>>;

pub enum StoreCommand {
    Fight {
        id: FightId,
        reply: Reply<Option<Fight>>,
    },
    Fighter {
        id: FighterId,
        reply: Reply<Option<Fighter>>,
    },
    History {
        id: FighterId,
        reply: Reply<Vec<FightRecord>>,
    },
    Snapshot {
        fighter: FighterId,
        fight: FightId,
        reply: Reply<Option<FighterSnapshot>>,
    },
    Upcoming {
        limit: usize,
        reply: Reply<Vec<Fight>>,
    },
    Completed {
        reply: Reply<Vec<Fight>>,
    },
    Shutdown,
}

/// Cloneable, thread-safe front for a store running on a worker thread.
#[derive(Debug, Clone)]
pub struct StoreHandle {
    tx: Sender<StoreCommand>,
}

pub struct StoreWorker {
    handle: StoreHandle,
    join: Option<JoinHandle<()>>,
}

impl StoreWorker {
    pub fn handle(&self) -> StoreHandle {
        self.handle.clone()
    }

    /// Stops the worker after it drains the commands already queued.
    pub fn shutdown(mut self) -> Result<()> {
        self.stop()
    }

    fn stop(&mut self) -> Result<()> {
        let Some(join) = self.join.take() else {
            return Ok(());
        };
        let _ = self.handle.tx.send(StoreCommand::Shutdown);
        join.join().map_err(|_| anyhow!("store worker panicked"))
    }
}

impl Drop for StoreWorker {
    fn drop(&mut self) {
        if let Err(err) = self.stop() {
            tracing::warn!(error = %err, "store worker did not stop cleanly");
        }
    }
}

/// Moves `source` onto a new thread and returns the worker that owns it.
pub fn spawn_store_worker<S>(source: S) -> StoreWorker
where
    S: FightDataSource + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    let join = thread::spawn(move || serve(source, rx));
    StoreWorker {
        handle: StoreHandle { tx },
        join: Some(join),
    }
}

fn serve<S: FightDataSource>(source: S, rx: Receiver<StoreCommand>) {
    tracing::debug!("store worker started");
    let mut served = 0u64;
    while let Ok(cmd) = rx.recv() {
        // A dropped reply receiver only means the caller gave up waiting.
        match cmd {
            StoreCommand::Fight { id, reply } => {
                let _ = reply.send(source.fight(id));
            }
            StoreCommand::Fighter { id, reply } => {
                let _ = reply.send(source.fighter(id));
            }
            StoreCommand::History { id, reply } => {
                let _ = reply.send(source.fighter_history(id));
            }
            StoreCommand::Snapshot {
                fighter,
                fight,
                reply,
            } => {
                let _ = reply.send(source.snapshot(fighter, fight));
            }
            StoreCommand::Upcoming { limit, reply } => {
                let _ = reply.send(source.upcoming_fights(limit));
            }
            StoreCommand::Completed { reply } => {
                let _ = reply.send(source.completed_fights());
            }
            StoreCommand::Shutdown => break,
        }
        served += 1;
    }
    tracing::debug!(served, "store worker stopped");
}

impl StoreHandle {
    fn request<T>(&self, make: impl FnOnce(Reply<T>) -> StoreCommand) -> Result<T> {
        let (reply, rx) = mpsc::channel();
        self.tx
            .send(make(reply))
            .map_err(|_| anyhow!("store worker is not running"))?;
        rx.recv().context("store worker dropped the request")?
    }
}

impl FightDataSource for StoreHandle {
    fn fight(&self, id: FightId) -> Result<Option<Fight>> {
        self.request(|reply| StoreCommand::Fight { id, reply })
    }

    fn fighter(&self, id: FighterId) -> Result<Option<Fighter>> {
        self.request(|reply| StoreCommand::Fighter { id, reply })
    }

    fn fighter_history(&self, id: FighterId) -> Result<Vec<FightRecord>> {
        self.request(|reply| StoreCommand::History { id, reply })
    }

    fn snapshot(&self, fighter: FighterId, fight: FightId) -> Result<Option<FighterSnapshot>> {
        self.request(|reply| StoreCommand::Snapshot {
            fighter,
            fight,
            reply,
        })
    }

    fn upcoming_fights(&self, limit: usize) -> Result<Vec<Fight>> {
        self.request(|reply| StoreCommand::Upcoming { limit, reply })
    }

    fn completed_fights(&self) -> Result<Vec<Fight>> {
        self.request(|reply| StoreCommand::Completed { reply })
    }
}
