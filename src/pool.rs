use std::{future::Future, sync::Arc};

use log::{debug, warn};
use tokio::{sync::Semaphore, task::JoinHandle};

use crate::{
    error::{Error, Result},
    interface::ProbeRange,
};

/// Admits at most `limit` tasks at a time, launching them in index order.
#[derive(Debug, Clone)]
pub struct WorkerPool {
    slots: Arc<Semaphore>,
    limit: usize,
}

impl WorkerPool {
    /// Creates a pool with `limit` slots; zero is rejected.
    pub fn new(limit: usize) -> Result<Self> {
        if limit == 0 {
            return Err(Error::InvalidConcurrency);
        }
        Ok(Self {
            slots: Arc::new(Semaphore::new(limit)),
            limit,
        })
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn available_slots(&self) -> usize {
        self.slots.available_permits()
    }

    /// Schedules `task(index)` once for every index in `range`.
    ///
    /// A slot is taken before each task is spawned and given back when the task
    /// returns. The returned handle resolves once every task has finished;
    /// dropping it leaves the dispatcher and its tasks running.
    pub fn spawn_range<F, Fut>(&self, range: ProbeRange, task: F) -> JoinHandle<()>
    where
        F: Fn(u32) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let slots = Arc::clone(&self.slots);
        tokio::spawn(async move {
            let mut handles = Vec::with_capacity(range.len());
            for index in range.iter() {
                let permit = match Arc::clone(&slots).acquire_owned().await {
                    Ok(permit) => permit,
                    Err(err) => {
                        warn!("worker pool closed before {} was admitted: {}", index, err);
                        break;
                    }
                };
                debug!("admitted {} ({} slots left)", index, slots.available_permits());
                let work = task(index);
                handles.push(tokio::spawn(async move {
                    work.await;
                    drop(permit);
                }));
            }
            for result in futures::future::join_all(handles).await {
                if let Err(err) = result {
                    warn!("worker task failed: {}", err);
                }
            }
        })
    }
}
