use apk_storefront::WorkerError;
use apk_storefront::worker::actor::{self, WorkerArguments};
use apk_storefront::worker::{
    CacheStorage, Clients, Lifecycle, MemoryCacheStorage, Network, RegistrationOutcome, Request,
    Response, ResponseType, ServiceHost, WorkerScript,
};
use apk_storefront::error::NetworkError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use reqwest::Method;
use tokio::sync::Notify;
use url::Url;

const ORIGIN: &str = "http://store.test";

/// Canned responses keyed by full URL (optionally prefixed with a method),
/// with an offline switch, per-URL gates and a call log.
struct ScriptedNetwork {
    origin: Url,
    routes: Mutex<HashMap<String, (u16, Vec<u8>)>>,
    gates: Mutex<HashMap<String, Arc<Notify>>>,
    online: AtomicBool,
    calls: Mutex<Vec<(Method, String)>>,
}

impl ScriptedNetwork {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            origin: Url::parse(ORIGIN).expect("origin"),
            routes: Mutex::new(HashMap::new()),
            gates: Mutex::new(HashMap::new()),
            online: AtomicBool::new(true),
            calls: Mutex::new(Vec::new()),
        })
    }

    fn route(&self, url: &str, status: u16, body: &[u8]) {
        self.routes
            .lock()
            .expect("routes lock")
            .insert(url.to_string(), (status, body.to_vec()));
    }

    fn route_method(&self, method: Method, url: &str, status: u16, body: &[u8]) {
        self.route(&format!("{method} {url}"), status, body);
    }

    /// Hold every fetch of `url` until the returned gate is notified.
    fn gate(&self, url: &str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.gates
            .lock()
            .expect("gates lock")
            .insert(url.to_string(), gate.clone());
        gate
    }

    fn calls_with(&self, method: Method, url: &str) -> usize {
        self.calls
            .lock()
            .expect("calls lock")
            .iter()
            .filter(|(m, u)| *m == method && u.as_str() == url)
            .count()
    }

    fn shell(&self) {
        for path in ["/", "/index.html"] {
            self.route(&format!("{ORIGIN}{path}"), 200, b"<html>shell</html>");
        }
        self.route(&format!("{ORIGIN}/style.css"), 200, b"body{}");
    }

    fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    fn calls_to(&self, url: &str) -> usize {
        self.calls
            .lock()
            .expect("calls lock")
            .iter()
            .filter(|(_, u)| u.as_str() == url)
            .count()
    }
}

#[async_trait]
impl Network for ScriptedNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, NetworkError> {
        let url = request.url.to_string();
        self.calls
            .lock()
            .expect("calls lock")
            .push((request.method.clone(), url.clone()));
        let gate = self.gates.lock().expect("gates lock").get(&url).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        if !self.online.load(Ordering::SeqCst) {
            return Err(NetworkError {
                url,
                reason: "offline".to_string(),
            });
        }
        let (status, body) = {
            let routes = self.routes.lock().expect("routes lock");
            routes
                .get(&format!("{} {url}", request.method))
                .or_else(|| routes.get(&url))
                .cloned()
                .unwrap_or((404, b"not found".to_vec()))
        };
        let response_type = if request.url.origin() == self.origin.origin() {
            ResponseType::Basic
        } else {
            ResponseType::Cors
        };
        Ok(Response {
            url: request.url.clone(),
            status,
            response_type,
            headers: Vec::new(),
            body,
        })
    }
}

struct FailingClients;

#[async_trait]
impl Clients for FailingClients {
    async fn claim(&self, _generation: &str) -> Result<usize, WorkerError> {
        Err(WorkerError::ClaimFailed("clients unavailable".to_string()))
    }
}

fn scope() -> Url {
    Url::parse(ORIGIN).expect("scope")
}

fn script(generation: &str) -> WorkerScript {
    WorkerScript::new(
        generation,
        scope(),
        vec!["/".into(), "/index.html".into(), "/style.css".into()],
    )
}

fn url(path: &str) -> Url {
    scope().join(path).expect("url")
}

fn host(network: &Arc<ScriptedNetwork>) -> (ServiceHost, MemoryCacheStorage) {
    let caches = MemoryCacheStorage::new();
    let host = ServiceHost::new(Arc::new(caches.clone()), network.clone());
    (host, caches)
}

#[tokio::test]
async fn install_caches_every_asset_byte_for_byte() {
    let network = ScriptedNetwork::new();
    network.shell();
    let (host, caches) = host(&network);

    let outcome = host.register(script("v1")).await.expect("register");
    match outcome {
        RegistrationOutcome::Activated {
            generation, cached, ..
        } => {
            assert_eq!(generation, "v1");
            assert_eq!(cached, 3);
        }
        other => panic!("unexpected outcome {other:?}"),
    }

    let css = caches
        .match_in("v1", &format!("{ORIGIN}/style.css"))
        .await
        .expect("match")
        .expect("cached stylesheet");
    assert_eq!(css.body, b"body{}");
    assert_eq!(caches.entries("v1").await.expect("entries").len(), 3);
    assert_eq!(host.active_generation().await.as_deref(), Some("v1"));
}

#[tokio::test]
async fn failed_install_commits_nothing_and_keeps_previous_generation() {
    let network = ScriptedNetwork::new();
    network.shell();
    let (host, caches) = host(&network);
    host.register(script("v1")).await.expect("register v1");

    let mut broken = script("v2");
    broken.assets.push("/missing.js".into());
    let err = host.register(broken).await.expect_err("install must fail");
    assert!(err.is_install_failure(), "{err}");

    assert!(!caches.has("v2").await.expect("has"));
    assert!(caches.has("v1").await.expect("has"));
    assert_eq!(host.active_generation().await.as_deref(), Some("v1"));
}

#[tokio::test]
async fn failed_install_marks_worker_redundant() {
    let network = ScriptedNetwork::new();
    let caches = Arc::new(MemoryCacheStorage::new());
    let worker = actor::spawn(WorkerArguments {
        script: script("v1"),
        caches: caches.clone(),
        network: network.clone(),
        clients: Arc::new(FailingClients),
    })
    .await
    .expect("spawn");

    network.set_online(false);
    let err = worker.install().await.expect_err("offline install");
    assert!(matches!(err, WorkerError::AssetFetch { .. }), "{err}");
    assert_eq!(worker.lifecycle().await.expect("lifecycle"), Lifecycle::Redundant);
    assert!(caches.keys().await.expect("keys").is_empty());
}

#[tokio::test]
async fn activation_removes_buckets_of_other_generations() {
    let network = ScriptedNetwork::new();
    network.shell();
    let (host, caches) = host(&network);
    caches
        .put(
            "stale-generation",
            format!("{ORIGIN}/old.js"),
            Response {
                url: url("/old.js"),
                status: 200,
                response_type: ResponseType::Basic,
                headers: Vec::new(),
                body: b"old".to_vec(),
            },
        )
        .await
        .expect("seed stale bucket");

    host.register(script("v1")).await.expect("register v1");
    let outcome = host.register(script("v2")).await.expect("register v2");
    match outcome {
        RegistrationOutcome::Activated { removed, .. } => assert_eq!(removed, vec!["v1"]),
        other => panic!("unexpected outcome {other:?}"),
    }
    assert_eq!(caches.keys().await.expect("keys"), vec!["v2"]);
}

#[tokio::test]
async fn cached_same_origin_response_is_served_without_network() {
    let network = ScriptedNetwork::new();
    network.shell();
    network.route(&format!("{ORIGIN}/apps"), 200, b"[]");
    let (host, caches) = host(&network);
    host.register(script("v1")).await.expect("register");
    let page = host.open_page().await;

    let first = host.fetch(page, Request::get(url("/apps"))).await.expect("fetch");
    let second = host.fetch(page, Request::get(url("/apps"))).await.expect("fetch");
    assert_eq!(first, second);
    assert_eq!(network.calls_to(&format!("{ORIGIN}/apps")), 1);
    assert!(caches
        .match_in("v1", &format!("{ORIGIN}/apps"))
        .await
        .expect("match")
        .is_some());

    let before = network.calls_to(&format!("{ORIGIN}/style.css"));
    host.fetch(page, Request::get(url("/style.css#top")))
        .await
        .expect("fetch");
    assert_eq!(network.calls_to(&format!("{ORIGIN}/style.css")), before);
}

#[tokio::test]
async fn cross_origin_error_and_post_responses_are_not_cached() {
    let network = ScriptedNetwork::new();
    network.shell();
    network.route("http://cdn.test/lib.js", 200, b"lib");
    network.route(&format!("{ORIGIN}/login"), 200, b"{}");
    let (host, caches) = host(&network);
    host.register(script("v1")).await.expect("register");
    let page = host.open_page().await;

    let cdn = Url::parse("http://cdn.test/lib.js").expect("url");
    host.fetch(page, Request::get(cdn)).await.expect("fetch");
    let missing = host
        .fetch(page, Request::get(url("/nope")))
        .await
        .expect("fetch");
    assert_eq!(missing.status, 404);
    host.fetch(page, Request::post_json(url("/login"), b"{}".to_vec()))
        .await
        .expect("fetch");

    let mut entries = caches.entries("v1").await.expect("entries");
    entries.sort();
    assert_eq!(
        entries,
        vec![
            format!("{ORIGIN}/"),
            format!("{ORIGIN}/index.html"),
            format!("{ORIGIN}/style.css"),
        ]
    );
}

#[tokio::test]
async fn offline_navigation_falls_back_to_root_document() {
    let network = ScriptedNetwork::new();
    network.shell();
    let (host, _caches) = host(&network);
    host.register(script("v1")).await.expect("register");
    let page = host.open_page().await;

    network.set_online(false);
    let doc = host
        .fetch(page, Request::navigate(url("/admin.html")))
        .await
        .expect("fallback document");
    assert_eq!(doc.body, b"<html>shell</html>");

    let err = host
        .fetch(page, Request::get(url("/apps")))
        .await
        .expect_err("offline data request");
    assert!(matches!(err, WorkerError::Network(_)), "{err}");
}

#[tokio::test]
async fn activation_claims_already_open_pages() {
    let network = ScriptedNetwork::new();
    network.shell();
    network.route(&format!("{ORIGIN}/apps"), 200, b"[]");
    let (host, _caches) = host(&network);

    let early = host.open_page().await;
    assert_eq!(host.clients().controller(early).await, None);
    host.fetch(early, Request::get(url("/apps"))).await.expect("fetch");
    host.fetch(early, Request::get(url("/apps"))).await.expect("fetch");
    assert_eq!(network.calls_to(&format!("{ORIGIN}/apps")), 2);

    let outcome = host.register(script("v1")).await.expect("register");
    assert!(matches!(
        outcome,
        RegistrationOutcome::Activated { claimed: 1, .. }
    ));
    assert_eq!(host.clients().controller(early).await.as_deref(), Some("v1"));

    host.fetch(early, Request::get(url("/apps"))).await.expect("fetch");
    host.fetch(early, Request::get(url("/apps"))).await.expect("fetch");
    assert_eq!(network.calls_to(&format!("{ORIGIN}/apps")), 3);
}

#[tokio::test]
async fn claim_failure_makes_worker_redundant() {
    let network = ScriptedNetwork::new();
    network.shell();
    let worker = actor::spawn(WorkerArguments {
        script: script("v1"),
        caches: Arc::new(MemoryCacheStorage::new()),
        network: network.clone(),
        clients: Arc::new(FailingClients),
    })
    .await
    .expect("spawn");

    worker.install().await.expect("install");
    assert_eq!(worker.lifecycle().await.expect("lifecycle"), Lifecycle::Installed);
    let err = worker.activate().await.expect_err("claim must fail");
    assert!(matches!(err, WorkerError::ClaimFailed(_)), "{err}");
    assert_eq!(worker.lifecycle().await.expect("lifecycle"), Lifecycle::Redundant);
}

#[tokio::test]
async fn activate_before_install_is_rejected() {
    let network = ScriptedNetwork::new();
    let worker = actor::spawn(WorkerArguments {
        script: script("v1"),
        caches: Arc::new(MemoryCacheStorage::new()),
        network,
        clients: Arc::new(FailingClients),
    })
    .await
    .expect("spawn");

    let err = worker.activate().await.expect_err("not installed");
    assert!(
        matches!(err, WorkerError::InvalidState(Lifecycle::Installing)),
        "{err}"
    );
}

#[tokio::test]
async fn registering_active_generation_again_is_a_no_op() {
    let network = ScriptedNetwork::new();
    network.shell();
    let (host, _caches) = host(&network);
    host.register(script("v1")).await.expect("register");
    let installs = network.calls_to(&format!("{ORIGIN}/style.css"));

    let outcome = host.register(script("v1")).await.expect("register again");
    assert_eq!(outcome, RegistrationOutcome::Unchanged);
    assert_eq!(network.calls_to(&format!("{ORIGIN}/style.css")), installs);
}

#[tokio::test]
async fn upgrade_supersedes_previous_worker() {
    let network = ScriptedNetwork::new();
    network.shell();
    let (host, _caches) = host(&network);
    host.register(script("v1")).await.expect("register v1");
    let old = host.active_worker().await.expect("active worker");
    let page = host.open_page().await;

    host.register(script("v2")).await.expect("register v2");
    assert_eq!(host.active_generation().await.as_deref(), Some("v2"));
    assert_eq!(host.clients().controller(page).await.as_deref(), Some("v2"));
    assert!(!matches!(old.lifecycle().await, Ok(Lifecycle::Activated)));
}

#[tokio::test]
async fn non_get_requests_bypass_the_cache() {
    let network = ScriptedNetwork::new();
    network.shell();
    let thing = format!("{ORIGIN}/thing");
    network.route(&thing, 200, b"GET response");
    network.route_method(Method::POST, &thing, 200, b"POST response");
    network.route_method(Method::DELETE, &thing, 200, b"DELETE response");
    let (host, caches) = host(&network);
    host.register(script("v1")).await.expect("register");
    let page = host.open_page().await;

    let got = host.fetch(page, Request::get(url("/thing"))).await.expect("get");
    assert_eq!(got.body, b"GET response");
    assert!(caches.match_in("v1", &thing).await.expect("match").is_some());

    let posted = host
        .fetch(page, Request::post_json(url("/thing"), b"{}".to_vec()))
        .await
        .expect("post");
    assert_eq!(posted.body, b"POST response");
    let deleted = host
        .fetch(page, Request::delete(url("/thing")))
        .await
        .expect("delete");
    assert_eq!(deleted.body, b"DELETE response");

    assert_eq!(network.calls_with(Method::GET, &thing), 1);
    assert_eq!(network.calls_with(Method::POST, &thing), 1);
    assert_eq!(network.calls_with(Method::DELETE, &thing), 1);

    network.set_online(false);
    let err = host
        .fetch(page, Request::post_json(url("/thing"), b"{}".to_vec()))
        .await
        .expect_err("offline post is not served from cache");
    assert!(matches!(err, WorkerError::Network(_)), "{err}");
}

#[tokio::test]
async fn install_overtaken_by_newer_generation_leaves_no_bucket() {
    let network = ScriptedNetwork::new();
    network.shell();
    let slow = format!("{ORIGIN}/slow.js");
    network.route(&slow, 200, b"slow");
    let gate = network.gate(&slow);
    let (host, caches) = host(&network);

    let mut first = script("v1");
    first.assets.push("/slow.js".into());
    let pending = tokio::spawn({
        let host = host.clone();
        async move { host.register(first).await }
    });
    while network.calls_to(&slow) == 0 {
        tokio::task::yield_now().await;
    }

    host.register(script("v2")).await.expect("register v2");
    assert_eq!(host.active_generation().await.as_deref(), Some("v2"));

    gate.notify_one();
    let err = pending
        .await
        .expect("register task")
        .expect_err("overtaken install must not activate");
    assert!(matches!(err, WorkerError::Superseded(ref g) if g == "v1"), "{err}");

    assert_eq!(caches.keys().await.expect("keys"), vec!["v2"]);
    assert_eq!(host.active_generation().await.as_deref(), Some("v2"));
}
