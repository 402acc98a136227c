//! Control-thread dispatch queue
//!
//! Host state is single-threaded. A module doing background work posts a job
//! through its [`DispatchHandle`]; the host runs queued jobs on the control
//! thread when it calls [`Dispatcher::pump`], handing each job an
//! [`InvokeContext`] so it can reach loaded modules through the registry.

use crossbeam_channel::{unbounded, Receiver, Sender};

use crate::module::{InvokeContext, Lookup};

type Job = Box<dyn FnOnce(&InvokeContext<'_>) + Send + 'static>;

/// Owner side of the queue, held by the host
pub struct Dispatcher {
    sender: Sender<Job>,
    receiver: Receiver<Job>,
}

impl Dispatcher {
    pub fn new() -> Self {
        let (sender, receiver) = unbounded();
        Dispatcher { sender, receiver }
    }

    /// A cloneable, `Send` handle for posting jobs from any thread
    pub fn handle(&self) -> DispatchHandle {
        DispatchHandle {
            sender: self.sender.clone(),
        }
    }

    /// Number of jobs waiting to run
    pub fn pending(&self) -> usize {
        self.receiver.len()
    }

    /// Run every job queued so far on the calling thread. Returns how many ran.
    ///
    /// Jobs posted while pumping are left for the next call.
    pub fn pump(&self, lookup: &dyn Lookup) -> usize {
        let queued = self.receiver.len();
        let mut ran = 0;
        for _ in 0..queued {
            let Ok(job) = self.receiver.try_recv() else {
                break;
            };
            let ctx = InvokeContext::new(lookup, self.handle());
            job(&ctx);
            ran += 1;
        }
        ran
    }

    /// Drop queued jobs without running them. Returns how many were dropped.
    pub fn discard(&self) -> usize {
        self.receiver.try_iter().count()
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("pending", &self.pending())
            .finish()
    }
}

/// Sender side of the queue, handed to modules
#[derive(Clone)]
pub struct DispatchHandle {
    sender: Sender<Job>,
}

impl DispatchHandle {
    /// Queue `job` for the control thread. Returns false if the host is gone.
    pub fn post<F>(&self, job: F) -> bool
    where
        F: FnOnce(&InvokeContext<'_>) + Send + 'static,
    {
        self.sender.send(Box::new(job)).is_ok()
    }
}

impl std::fmt::Debug for DispatchHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchHandle").finish_non_exhaustive()
    }
}
