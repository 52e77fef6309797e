//! Background execution host.
//!
//! A UI thread submits [`Operation`]s and reads [`Response`]s off a channel. The
//! host runs its own single-threaded tokio runtime on a dedicated thread and
//! spawns every operation as a separate task, so a stalled source never holds
//! up the others.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinSet;
use tracing::debug;

use crate::classify::{classify, SiteType};
use crate::filter::{filter, Category};
use crate::merge::merge;
use crate::resolver::Resolved;
use crate::types::{ScrapeResult, UrlMap, WeightMode};
use crate::{PageRequest, Scraper};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    Classify { url: String },
    Filter { category: Category, urls: Vec<String>, strict: bool },
    Resolve { url: String },
    Merge { prior: UrlMap, urls: Vec<String>, source: String, weight: WeightMode },
    FetchPage(PageRequest),
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Classify { .. } => "classify",
            Operation::Filter { .. } => "filter",
            Operation::Resolve { .. } => "resolve",
            Operation::Merge { .. } => "merge",
            Operation::FetchPage(_) => "fetch_page",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "reply", content = "value", rename_all = "snake_case")]
pub enum Reply {
    Site(SiteType),
    Urls(Vec<String>),
    Resolved(Resolved),
    Map(UrlMap),
    Page(Box<ScrapeResult>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub id: u64,
    pub reply: Reply,
}

async fn dispatch(scraper: &Scraper, op: Operation) -> Reply {
    match op {
        Operation::Classify { url } => Reply::Site(classify(&url)),
        Operation::Filter { category, urls, strict } => Reply::Urls(filter(category, &urls, strict)),
        Operation::Resolve { url } => Reply::Resolved(scraper.resolve(&url).await),
        Operation::Merge { prior, urls, source, weight } => Reply::Map(merge(&prior, &urls, &source, weight)),
        Operation::FetchPage(req) => Reply::Page(Box::new(scraper.fetch_page(req).await)),
    }
}

pub struct Host;

impl Host {
    /// Spawn the worker thread. Replies arrive on the returned receiver in completion order.
    pub fn start(scraper: Arc<Scraper>) -> Result<(HostHandle, UnboundedReceiver<Response>)> {
        let (req_tx, mut req_rx) = mpsc::unbounded_channel::<(u64, Operation)>();
        let (resp_tx, resp_rx) = mpsc::unbounded_channel::<Response>();
        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;

        let worker = std::thread::Builder::new().name("sourcewalk-host".into()).spawn(move || {
            runtime.block_on(async move {
                let mut tasks = JoinSet::new();
                loop {
                    tokio::select! {
                        msg = req_rx.recv() => {
                            let Some((id, op)) = msg else { break };
                            debug!(id, op = op.name(), "dispatch");
                            let (scraper, tx) = (scraper.clone(), resp_tx.clone());
                            tasks.spawn(async move {
                                let reply = dispatch(&scraper, op).await;
                                // The UI may have gone away; nothing to do then.
                                let _ = tx.send(Response { id, reply });
                            });
                        }
                        Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
                    }
                }
                // Let in-flight pages finish before the runtime goes away.
                while tasks.join_next().await.is_some() {}
            });
        })?;

        Ok((HostHandle { tx: Some(req_tx), next_id: AtomicU64::new(1), worker: Some(worker) }, resp_rx))
    }
}

/// Submission side of a running host. Dropping it drains in-flight work and stops the thread.
pub struct HostHandle {
    tx: Option<UnboundedSender<(u64, Operation)>>,
    next_id: AtomicU64,
    worker: Option<JoinHandle<()>>,
}

impl HostHandle {
    /// Queue an operation; the returned id tags its [`Response`].
    pub fn submit(&self, op: Operation) -> Result<u64> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let tx = self.tx.as_ref().ok_or_else(|| anyhow!("execution host is shut down"))?;
        tx.send((id, op)).map_err(|_| anyhow!("execution host has stopped"))?;
        Ok(id)
    }
}

impl Drop for HostHandle {
    fn drop(&mut self) {
        self.tx.take();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}
