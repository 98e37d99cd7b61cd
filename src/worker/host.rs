//! The page-side half of the worker protocol: open pages, registration of
//! worker generations and routing of page fetches.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::WorkerError;
use crate::worker::actor::{self, WorkerArguments, WorkerHandle};
use crate::worker::cache::CacheStorage;
use crate::worker::fetch::{Network, Request, Response};
use crate::worker::manifest::WorkerScript;

pub type PageId = u64;

/// Open pages a worker can take control of.
#[async_trait]
pub trait Clients: Send + Sync {
    /// Make `generation` the controller of every open page; returns how many.
    async fn claim(&self, generation: &str) -> Result<usize, WorkerError>;
}

/// Open pages and the generation controlling each (`None` = uncontrolled).
#[derive(Clone, Default)]
pub struct ClientRegistry {
    inner: Arc<Mutex<RegistryInner>>,
}

#[derive(Default)]
struct RegistryInner {
    next_id: PageId,
    pages: BTreeMap<PageId, Option<String>>,
}

impl ClientRegistry {
    pub async fn open(&self, controller: Option<String>) -> PageId {
        let mut inner = self.inner.lock().await;
        inner.next_id += 1;
        let id = inner.next_id;
        inner.pages.insert(id, controller);
        id
    }

    pub async fn close(&self, page: PageId) {
        self.inner.lock().await.pages.remove(&page);
    }

    pub async fn controller(&self, page: PageId) -> Option<String> {
        self.inner.lock().await.pages.get(&page).cloned().flatten()
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.pages.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl Clients for ClientRegistry {
    async fn claim(&self, generation: &str) -> Result<usize, WorkerError> {
        let mut inner = self.inner.lock().await;
        for controller in inner.pages.values_mut() {
            *controller = Some(generation.to_string());
        }
        Ok(inner.pages.len())
    }
}

/// What a registration did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationOutcome {
    /// This generation is already active.
    Unchanged,
    Activated {
        generation: String,
        cached: usize,
        removed: Vec<String>,
        claimed: usize,
    },
}

#[derive(Default)]
struct Workers {
    active: Option<WorkerHandle>,
    installing: Option<WorkerHandle>,
}

/// One origin's worker registration plus its open pages.
///
/// At most two generations overlap: the active one and one installing.
#[derive(Clone)]
pub struct ServiceHost {
    caches: Arc<dyn CacheStorage>,
    network: Arc<dyn Network>,
    clients: ClientRegistry,
    workers: Arc<Mutex<Workers>>,
}

impl ServiceHost {
    pub fn new(caches: Arc<dyn CacheStorage>, network: Arc<dyn Network>) -> Self {
        Self {
            caches,
            network,
            clients: ClientRegistry::default(),
            workers: Arc::new(Mutex::new(Workers::default())),
        }
    }

    pub fn caches(&self) -> &Arc<dyn CacheStorage> {
        &self.caches
    }

    pub fn clients(&self) -> &ClientRegistry {
        &self.clients
    }

    pub async fn active_generation(&self) -> Option<String> {
        let workers = self.workers.lock().await;
        workers.active.as_ref().map(|w| w.generation().to_string())
    }

    pub async fn active_worker(&self) -> Option<WorkerHandle> {
        self.workers.lock().await.active.clone()
    }

    /// Open a page; it is controlled by the active generation, if any.
    pub async fn open_page(&self) -> PageId {
        let controller = self.active_generation().await;
        self.clients.open(controller).await
    }

    pub async fn close_page(&self, page: PageId) {
        self.clients.close(page).await;
    }

    /// Install `script` as a new generation and, on success, activate it
    /// immediately and retire the previous one. A failed install leaves the
    /// active generation untouched.
    pub async fn register(&self, script: WorkerScript) -> Result<RegistrationOutcome, WorkerError> {
        {
            let workers = self.workers.lock().await;
            if workers
                .active
                .as_ref()
                .is_some_and(|w| w.generation() == script.generation)
            {
                debug!(generation = %script.generation, "generation already active");
                return Ok(RegistrationOutcome::Unchanged);
            }
        }

        let worker = actor::spawn(WorkerArguments {
            script,
            caches: self.caches.clone(),
            network: self.network.clone(),
            clients: Arc::new(self.clients.clone()),
        })
        .await?;
        if let Some(previous) = self.workers.lock().await.installing.replace(worker.clone()) {
            previous.supersede();
        }

        let installed = match worker.install().await {
            Ok(outcome) => outcome,
            Err(e) => {
                self.discard_installing(&worker).await;
                return Err(e);
            }
        };
        if !self.still_installing(&worker).await {
            self.drop_orphan_bucket(&worker).await;
            return Err(WorkerError::Superseded(worker.generation().to_string()));
        }

        let activated = match worker.activate().await {
            Ok(outcome) => outcome,
            Err(e) => {
                self.discard_installing(&worker).await;
                return Err(e);
            }
        };

        let previous = {
            let mut workers = self.workers.lock().await;
            if workers
                .installing
                .as_ref()
                .is_some_and(|w| w.same_worker(&worker))
            {
                workers.installing = None;
            }
            workers.active.replace(worker)
        };
        if let Some(previous) = previous {
            info!(
                old = %previous.generation(),
                new = %activated.generation,
                "retiring previous generation"
            );
            previous.supersede();
        }

        Ok(RegistrationOutcome::Activated {
            generation: activated.generation,
            cached: installed.cached,
            removed: activated.removed,
            claimed: activated.claimed,
        })
    }

    async fn still_installing(&self, worker: &WorkerHandle) -> bool {
        let workers = self.workers.lock().await;
        workers
            .installing
            .as_ref()
            .is_some_and(|w| w.same_worker(worker))
    }

    /// Delete the bucket a superseded install committed, unless a live
    /// generation shares its name.
    async fn drop_orphan_bucket(&self, worker: &WorkerHandle) {
        let generation = worker.generation();
        let in_use = {
            let workers = self.workers.lock().await;
            [workers.active.as_ref(), workers.installing.as_ref()]
                .into_iter()
                .flatten()
                .any(|w| w.generation() == generation)
        };
        if in_use {
            return;
        }
        match self.caches.delete(generation).await {
            Ok(true) => info!(generation, "removed bucket of superseded install"),
            Ok(false) => {}
            Err(e) => warn!(generation, error = %e, "removing superseded bucket failed"),
        }
    }

    async fn discard_installing(&self, worker: &WorkerHandle) {
        let mut workers = self.workers.lock().await;
        if workers
            .installing
            .as_ref()
            .is_some_and(|w| w.same_worker(worker))
        {
            workers.installing = None;
        }
        worker.supersede();
    }

    /// Issue `request` from `page`: through its controlling worker when it
    /// has one, straight to the network otherwise.
    pub async fn fetch(&self, page: PageId, request: Request) -> Result<Response, WorkerError> {
        let controller = self.clients.controller(page).await;
        let worker = match controller {
            Some(generation) => {
                let workers = self.workers.lock().await;
                [workers.active.as_ref(), workers.installing.as_ref()]
                    .into_iter()
                    .flatten()
                    .find(|w| w.generation() == generation)
                    .cloned()
            }
            None => None,
        };

        match worker {
            Some(worker) => worker.fetch(request).await,
            None => {
                debug!(page, url = %request.url, "uncontrolled page; fetching from network");
                Ok(self.network.fetch(&request).await?)
            }
        }
    }
}
