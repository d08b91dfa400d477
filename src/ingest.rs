//! Catalog ingestion.
//!
//! Fetches run on their own thread and deliver through an mpsc channel; the
//! frame loop polls the receiving `CatalogFeed` without blocking.

use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread::JoinHandle;

use log::{info, warn};

use crate::error::Result;
use crate::tle::{fetch_tle_data, read_tle_file, CatalogSource, ElementRecord};

pub type Delivery = Result<Vec<ElementRecord>>;

pub struct CatalogFeed {
    rx: Receiver<Delivery>,
    connected: bool,
}

pub fn channel() -> (Sender<Delivery>, CatalogFeed) {
    let (tx, rx) = mpsc::channel();
    (tx, CatalogFeed { rx, connected: true })
}

impl CatalogFeed {
    /// Drains pending deliveries and returns the newest successful one.
    /// Failed deliveries are logged and skipped.
    pub fn poll(&mut self) -> Option<Vec<ElementRecord>> {
        let mut newest = None;
        loop {
            match self.rx.try_recv() {
                Ok(Ok(records)) => {
                    if newest.is_some() {
                        info!("superseding queued catalog delivery");
                    }
                    newest = Some(records);
                }
                Ok(Err(e)) => warn!("catalog delivery failed: {e}"),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.connected = false;
                    break;
                }
            }
        }
        newest
    }

    /// False once every sender has been dropped and the queue is drained.
    pub fn is_connected(&self) -> bool {
        self.connected
    }
}

pub fn spawn_fetch(source: CatalogSource, tx: Sender<Delivery>) -> JoinHandle<()> {
    std::thread::spawn(move || {
        info!("fetching {} catalog", source.label());
        let _ = tx.send(fetch_tle_data(&source.url()));
    })
}

pub fn spawn_file_load(path: PathBuf, tx: Sender<Delivery>) -> JoinHandle<()> {
    std::thread::spawn(move || {
        info!("reading catalog from {}", path.display());
        let _ = tx.send(read_tle_file(&path));
    })
}
