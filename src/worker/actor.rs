use futures::future::try_join_all;
use ractor::{Actor, ActorProcessingErr, ActorRef, RpcReplyPort};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::WorkerError;
use crate::worker::Lifecycle;
use crate::worker::cache::CacheStorage;
use crate::worker::fetch::{Network, Request, Response, ResponseType};
use crate::worker::host::Clients;
use crate::worker::manifest::WorkerScript;

/// Result of a successful install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallOutcome {
    pub generation: String,
    pub cached: usize,
}

/// Result of a successful activation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivateOutcome {
    pub generation: String,
    /// Buckets of earlier generations that were deleted.
    pub removed: Vec<String>,
    /// Pages taken over without reload.
    pub claimed: usize,
}

/// Messages the host delivers to one worker generation.
#[derive(Debug)]
pub enum WorkerMessage {
    Install(RpcReplyPort<Result<InstallOutcome, WorkerError>>),
    Activate(RpcReplyPort<Result<ActivateOutcome, WorkerError>>),
    Fetch(Request, RpcReplyPort<Result<Response, WorkerError>>),
    Lifecycle(RpcReplyPort<Lifecycle>),
    /// A newer generation took over; stop.
    Supersede,
}

/// Handle for interacting with a worker actor.
#[derive(Clone)]
pub struct WorkerHandle {
    actor: ActorRef<WorkerMessage>,
    generation: String,
}

impl WorkerHandle {
    pub fn generation(&self) -> &str {
        &self.generation
    }

    /// True when both handles point at the same actor.
    pub fn same_worker(&self, other: &WorkerHandle) -> bool {
        self.actor.get_id() == other.actor.get_id()
    }

    pub async fn install(&self) -> Result<InstallOutcome, WorkerError> {
        ractor::call!(self.actor, WorkerMessage::Install)
            .map_err(|e| WorkerError::Unavailable(format!("Install RPC failed: {e}")))?
    }

    pub async fn activate(&self) -> Result<ActivateOutcome, WorkerError> {
        ractor::call!(self.actor, WorkerMessage::Activate)
            .map_err(|e| WorkerError::Unavailable(format!("Activate RPC failed: {e}")))?
    }

    pub async fn fetch(&self, request: Request) -> Result<Response, WorkerError> {
        ractor::call!(self.actor, WorkerMessage::Fetch, request)
            .map_err(|e| WorkerError::Unavailable(format!("Fetch RPC failed: {e}")))?
    }

    pub async fn lifecycle(&self) -> Result<Lifecycle, WorkerError> {
        ractor::call!(self.actor, WorkerMessage::Lifecycle)
            .map_err(|e| WorkerError::Unavailable(format!("Lifecycle RPC failed: {e}")))
    }

    pub fn supersede(&self) {
        let _ = ractor::cast!(self.actor, WorkerMessage::Supersede);
    }
}

pub struct WorkerArguments {
    pub script: WorkerScript,
    pub caches: Arc<dyn CacheStorage>,
    pub network: Arc<dyn Network>,
    pub clients: Arc<dyn Clients>,
}

struct WorkerState {
    script: WorkerScript,
    caches: Arc<dyn CacheStorage>,
    network: Arc<dyn Network>,
    clients: Arc<dyn Clients>,
    lifecycle: Lifecycle,
}

struct CacheWorker;

#[ractor::async_trait]
impl Actor for CacheWorker {
    type Msg = WorkerMessage;
    type State = WorkerState;
    type Arguments = WorkerArguments;

    async fn pre_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        args: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        debug!(generation = %args.script.generation, "worker parsed");
        Ok(WorkerState {
            script: args.script,
            caches: args.caches,
            network: args.network,
            clients: args.clients,
            lifecycle: Lifecycle::Installing,
        })
    }

    async fn handle(
        &self,
        myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            WorkerMessage::Install(rp) => {
                let res = self.handle_install(state).await;
                let _ = rp.send(res);
            }
            WorkerMessage::Activate(rp) => {
                let res = self.handle_activate(state).await;
                let _ = rp.send(res);
            }
            WorkerMessage::Fetch(request, rp) => {
                let res = self.handle_fetch(state, request).await;
                let _ = rp.send(res);
            }
            WorkerMessage::Lifecycle(rp) => {
                let _ = rp.send(state.lifecycle);
            }
            WorkerMessage::Supersede => {
                info!(generation = %state.script.generation, "worker superseded");
                state.lifecycle = Lifecycle::Redundant;
                myself.stop(None);
            }
        }
        Ok(())
    }
}

impl CacheWorker {
    /// Fetch the whole asset manifest, then commit it to this generation's
    /// bucket in one step. Any failed asset aborts without committing.
    async fn handle_install(&self, state: &mut WorkerState) -> Result<InstallOutcome, WorkerError> {
        if state.lifecycle != Lifecycle::Installing {
            return Err(WorkerError::InvalidState(state.lifecycle));
        }
        let generation = state.script.generation.clone();
        info!(generation = %generation, assets = state.script.assets.len(), "installing app shell");

        let entries = match Self::fetch_manifest(state).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!(generation = %generation, error = %e, "install failed; nothing cached");
                state.lifecycle = Lifecycle::Redundant;
                return Err(e);
            }
        };

        let cached = entries.len();
        if let Err(e) = state.caches.put_all(&generation, entries).await {
            warn!(generation = %generation, error = %e, "install commit failed");
            state.lifecycle = Lifecycle::Redundant;
            return Err(e);
        }

        state.lifecycle = Lifecycle::Installed;
        info!(generation = %generation, cached, "installed; skipping wait");
        Ok(InstallOutcome { generation, cached })
    }

    async fn fetch_manifest(state: &WorkerState) -> Result<Vec<(String, Response)>, WorkerError> {
        let requests = state
            .script
            .assets
            .iter()
            .map(|path| -> Result<(String, Request), WorkerError> {
                Ok((path.clone(), Request::get(state.script.resolve(path)?)))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let network = state.network.clone();
        try_join_all(requests.into_iter().map(|(path, request)| {
            let network = network.clone();
            async move {
                let response = network
                    .fetch(&request)
                    .await
                    .map_err(|source| WorkerError::AssetFetch {
                        path: path.clone(),
                        source,
                    })?;
                if !response.ok() {
                    return Err(WorkerError::AssetStatus {
                        path,
                        status: response.status,
                    });
                }
                Ok((request.cache_key(), response))
            }
        }))
        .await
    }

    /// Drop every bucket but ours, then take control of all open pages.
    async fn handle_activate(
        &self,
        state: &mut WorkerState,
    ) -> Result<ActivateOutcome, WorkerError> {
        if state.lifecycle != Lifecycle::Installed {
            return Err(WorkerError::InvalidState(state.lifecycle));
        }
        state.lifecycle = Lifecycle::Activating;
        let generation = state.script.generation.clone();

        match Self::take_over(state).await {
            Ok((removed, claimed)) => {
                state.lifecycle = Lifecycle::Activated;
                info!(
                    generation = %generation,
                    removed = ?removed,
                    claimed,
                    "worker activated"
                );
                Ok(ActivateOutcome {
                    generation,
                    removed,
                    claimed,
                })
            }
            Err(e) => {
                warn!(generation = %generation, error = %e, "activation failed");
                state.lifecycle = Lifecycle::Redundant;
                Err(e)
            }
        }
    }

    async fn take_over(state: &WorkerState) -> Result<(Vec<String>, usize), WorkerError> {
        let generation = state.script.generation.as_str();
        let mut removed = Vec::new();
        for bucket in state.caches.keys().await? {
            if bucket != generation && state.caches.delete(&bucket).await? {
                removed.push(bucket);
            }
        }
        let claimed = state.clients.claim(generation).await?;
        Ok((removed, claimed))
    }

    /// Cache first, then network with write-through for same-origin 200 GETs.
    /// Offline navigations fall back to the cached root document.
    async fn handle_fetch(
        &self,
        state: &mut WorkerState,
        request: Request,
    ) -> Result<Response, WorkerError> {
        if state.lifecycle != Lifecycle::Activated {
            return Ok(state.network.fetch(&request).await?);
        }
        let bucket = state.script.generation.as_str();
        let key = request.cache_key();
        // Only GET requests ever match or populate the cache.
        let cacheable = request.method == reqwest::Method::GET;

        if cacheable {
            match state.caches.match_in(bucket, &key).await {
                Ok(Some(cached)) => {
                    debug!(url = %key, "cache hit");
                    return Ok(cached);
                }
                Ok(None) => debug!(url = %key, "cache miss"),
                Err(e) => warn!(url = %key, error = %e, "cache lookup failed; going to network"),
            }
        }

        match state.network.fetch(&request).await {
            Ok(response) => {
                if cacheable
                    && response.status == 200
                    && response.response_type == ResponseType::Basic
                {
                    if let Err(e) = state.caches.put(bucket, key.clone(), response.clone()).await {
                        warn!(url = %key, error = %e, "write-through to cache failed");
                    }
                }
                Ok(response)
            }
            Err(err) => {
                if request.is_navigation() {
                    let fallback = state.script.fallback_key()?;
                    if let Ok(Some(doc)) = state.caches.match_in(bucket, &fallback).await {
                        info!(url = %key, "offline navigation; serving cached root document");
                        return Ok(doc);
                    }
                }
                Err(err.into())
            }
        }
    }
}

/// Spawn one worker generation in the `Installing` state.
pub async fn spawn(args: WorkerArguments) -> Result<WorkerHandle, WorkerError> {
    let generation = args.script.generation.clone();
    let (actor, _jh) = Actor::spawn(None, CacheWorker, args)
        .await
        .map_err(|e| WorkerError::Unavailable(format!("failed to spawn worker: {e}")))?;
    Ok(WorkerHandle { actor, generation })
}
