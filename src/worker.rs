//! Worker Module
//!
//! Runs a [`CacheStore`] on its own thread so callers on any thread can use
//! the cache while the store itself only ever sees one operation at a time.
//!
//! ```text
//!   caller ──┐
//!   caller ──┼──► job channel ──► worker thread ──► CacheStore
//!   caller ──┘        ▲                 │
//!                     └── reply (1) ◄───┘
//! ```

use std::thread::{self, JoinHandle};

use crossbeam::channel::{self, Sender};
use tracing::{debug, error};

use crate::codec::{Record, RegionCoord};
use crate::error::{CacheError, Result};
use crate::schema::{OverlayDescriptor, OverlayKind};
use crate::store::CacheStore;

type Job = Box<dyn FnOnce(&mut CacheStore) + Send>;

/// Background owner of a cache store
pub struct CacheWorker {
    jobs: Option<Sender<Job>>,
    thread: Option<JoinHandle<()>>,
}

impl CacheWorker {
    const THREAD_NAME: &'static str = "overlaycache-worker";

    /// Move `store` onto a new worker thread
    pub fn spawn(mut store: CacheStore) -> Result<Self> {
        let (tx, rx) = channel::unbounded::<Job>();

        let thread = thread::Builder::new()
            .name(Self::THREAD_NAME.to_string())
            .spawn(move || {
                debug!("cache worker started");
                for job in rx {
                    job(&mut store);
                }
                debug!("cache worker stopping");
                // store dropped here, which closes it
            })?;

        Ok(Self {
            jobs: Some(tx),
            thread: Some(thread),
        })
    }

    /// Run `f` against the store on the worker thread and wait for its result
    pub fn execute<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut CacheStore) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let (reply_tx, reply_rx) = channel::bounded(1);
        let job: Job = Box::new(move |store: &mut CacheStore| {
            let _ = reply_tx.send(f(store));
        });

        self.jobs
            .as_ref()
            .ok_or(CacheError::WorkerStopped)?
            .send(job)
            .map_err(|_| CacheError::WorkerStopped)?;

        reply_rx.recv().map_err(|_| CacheError::WorkerStopped)?
    }

    pub fn get_data(
        &self,
        overlay: OverlayKind,
        suffix: Option<String>,
        coord: RegionCoord,
    ) -> Result<Option<Record>> {
        self.execute(move |store| store.get_data(&overlay, suffix.as_deref(), coord))
    }

    pub fn set_data(
        &self,
        overlay: OverlayKind,
        suffix: Option<String>,
        coord: RegionCoord,
        values: Record,
    ) -> Result<()> {
        self.execute(move |store| store.set_data(&overlay, suffix.as_deref(), coord, &values))
    }

    pub fn delete_data(
        &self,
        overlay: OverlayKind,
        suffix: Option<String>,
        coord: RegionCoord,
    ) -> Result<()> {
        self.execute(move |store| store.delete_data(&overlay, suffix.as_deref(), coord))
    }

    pub fn delete_region(&self, coord: RegionCoord) -> Result<()> {
        self.execute(move |store| store.delete_region(coord))
    }

    pub fn init_tables(&self, overlays: Vec<OverlayKind>) -> Result<()> {
        self.execute(move |store| {
            let descriptors: Vec<&dyn OverlayDescriptor> = overlays
                .iter()
                .map(|o| o as &dyn OverlayDescriptor)
                .collect();
            store.init_tables(&descriptors)
        })
    }

    pub fn clear(&self) -> Result<()> {
        self.execute(|store| store.clear())
    }

    /// Stop the worker and close the store
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        // Closing the channel ends the worker loop
        self.jobs.take();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("cache worker panicked");
            }
        }
    }
}

impl Drop for CacheWorker {
    fn drop(&mut self) {
        self.stop();
    }
}
