//! Controller scenarios against in-memory collaborators

use async_trait::async_trait;
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use swcache::controller::{
    reply_channel, Controller, ControllerOptions, ControlReply, FetchOutcome, MessageOutcome,
    PassthroughReason, ResponseSource,
};
use swcache::error::{SwError, SwResult};
use swcache::host::InMemoryHost;
use swcache::http::{Method, Request, Response, ResponseType};
use swcache::net::Network;
use swcache::policy::CacheVersion;
use swcache::store::{CacheStore, CachedEntry, DiskStore, MemoryStore, RequestKey};
use url::Url;

const SCOPE: &str = "https://app.example.com/";

/// Origin server with a connectivity switch
struct FakeOrigin {
    scope: Url,
    online: AtomicBool,
    routes: Mutex<HashMap<String, (u16, String)>>,
    calls: AtomicUsize,
}

impl FakeOrigin {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            scope: Url::parse(SCOPE).unwrap(),
            online: AtomicBool::new(true),
            routes: Mutex::new(HashMap::new()),
            calls: AtomicUsize::new(0),
        })
    }

    fn serve(&self, url: &str, status: u16, body: &str) {
        self.routes
            .lock()
            .unwrap()
            .insert(url.to_string(), (status, body.to_string()));
    }

    fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Network for FakeOrigin {
    async fn fetch(&self, request: &Request) -> SwResult<Response> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.online.load(Ordering::SeqCst) {
            return Err(SwError::Offline(request.url.to_string()));
        }

        let route = self.routes.lock().unwrap().get(request.url.as_str()).cloned();
        let (status, body) = route.unwrap_or((404, "not found".to_string()));
        Ok(Response::new(status, request.url.clone(), body)
            .with_kind(ResponseType::classify(&request.url, &self.scope)))
    }

    fn name(&self) -> &'static str {
        "fake-origin"
    }
}

/// Memory store whose writes or deletes can be made to fail
#[derive(Default)]
struct FlakyStore {
    inner: MemoryStore,
    fail_put: AtomicBool,
    fail_delete: AtomicBool,
}

#[async_trait]
impl CacheStore for FlakyStore {
    async fn open(&self, bucket: &str) -> SwResult<()> {
        self.inner.open(bucket).await
    }

    async fn keys(&self) -> SwResult<Vec<String>> {
        self.inner.keys().await
    }

    async fn delete(&self, bucket: &str) -> SwResult<bool> {
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(SwError::storage(bucket, "disk is read-only"));
        }
        self.inner.delete(bucket).await
    }

    async fn put(&self, bucket: &str, entry: CachedEntry) -> SwResult<()> {
        if self.fail_put.load(Ordering::SeqCst) {
            return Err(SwError::storage(bucket, "quota exceeded"));
        }
        self.inner.put(bucket, entry).await
    }

    async fn get(&self, bucket: &str, key: &RequestKey) -> SwResult<Option<CachedEntry>> {
        self.inner.get(bucket, key).await
    }

    async fn entries(&self, bucket: &str) -> SwResult<Vec<CachedEntry>> {
        self.inner.entries(bucket).await
    }
}

fn options(version: &str) -> ControllerOptions {
    ControllerOptions::new(CacheVersion::new(version).unwrap(), Url::parse(SCOPE).unwrap())
        .unwrap()
        .with_static_assets(&["/", "/index.html"])
}

fn controller(
    options: ControllerOptions,
    store: Arc<dyn CacheStore>,
    origin: Arc<FakeOrigin>,
    host: Arc<InMemoryHost>,
) -> Controller {
    Controller::new(options, store, origin, host).unwrap()
}

fn get(path: &str) -> Request {
    Request::get(Url::parse(SCOPE).unwrap().join(path).unwrap())
}

fn url(path: &str) -> String {
    Url::parse(SCOPE).unwrap().join(path).unwrap().to_string()
}

fn body(outcome: &FetchOutcome) -> &[u8] {
    &outcome.response().expect("controller responded").body
}

fn serve_shell(origin: &FakeOrigin) {
    origin.serve(&url("/"), 200, "<html>root</html>");
    origin.serve(&url("/index.html"), 200, "<html>shell</html>");
}

#[tokio::test]
async fn offline_read_through() {
    let origin = FakeOrigin::new();
    origin.serve(&url("/app.js"), 200, "console.log(1)");
    let store = Arc::new(MemoryStore::new());
    let c = controller(options("v1"), store.clone(), origin.clone(), Arc::new(InMemoryHost::new(1)));

    let online = c.on_fetch(&get("/app.js")).await.unwrap();
    assert_eq!(online.source(), Some(ResponseSource::Network));
    c.flush().await;

    origin.set_online(false);
    let offline = c.on_fetch(&get("/app.js")).await.unwrap();
    assert_eq!(offline.source(), Some(ResponseSource::Cache));
    assert_eq!(body(&offline), b"console.log(1)");
    assert!(store.has("v1-dynamic").await.unwrap());
}

#[tokio::test]
async fn latest_network_response_wins() {
    let origin = FakeOrigin::new();
    let store = Arc::new(MemoryStore::new());
    let c = controller(options("v1"), store, origin.clone(), Arc::new(InMemoryHost::new(1)));

    origin.serve(&url("/data.json"), 200, r#"{"n":1}"#);
    c.on_fetch(&get("/data.json")).await.unwrap();
    c.flush().await;

    origin.serve(&url("/data.json"), 200, r#"{"n":2}"#);
    let fresh = c.on_fetch(&get("/data.json")).await.unwrap();
    assert_eq!(body(&fresh), br#"{"n":2}"#);
    c.flush().await;

    origin.set_online(false);
    let cached = c.on_fetch(&get("/data.json")).await.unwrap();
    assert_eq!(body(&cached), br#"{"n":2}"#);
}

#[tokio::test]
async fn html_navigation_falls_back_to_shell() {
    let origin = FakeOrigin::new();
    serve_shell(&origin);
    let host = Arc::new(InMemoryHost::new(1));
    let c = controller(options("v1"), Arc::new(MemoryStore::new()), origin.clone(), host);
    c.on_install().await.unwrap();

    origin.set_online(false);
    let navigation = get("/dashboard").with_header("Accept", "text/html,application/xhtml+xml");
    let outcome = c.on_fetch(&navigation).await.unwrap();
    assert_eq!(outcome.source(), Some(ResponseSource::Shell));
    assert_eq!(body(&outcome), b"<html>shell</html>");

    // Same URL without an HTML Accept header surfaces the network error
    let err = c.on_fetch(&get("/dashboard")).await.unwrap_err();
    assert!(err.is_network());
}

#[tokio::test]
async fn no_shell_cached_returns_network_error() {
    let origin = FakeOrigin::new();
    origin.set_online(false);
    let c = controller(
        options("v1"),
        Arc::new(MemoryStore::new()),
        origin,
        Arc::new(InMemoryHost::new(1)),
    );

    let navigation = get("/dashboard").with_header("Accept", "text/html");
    let err = c.on_fetch(&navigation).await.unwrap_err();
    assert!(matches!(err, SwError::Offline(ref u) if u.ends_with("/dashboard")));
}

#[tokio::test]
async fn corrupt_dynamic_copy_does_not_hide_static_shell() {
    let dir = tempfile::TempDir::new().unwrap();
    let origin = FakeOrigin::new();
    serve_shell(&origin);
    let store = Arc::new(DiskStore::new(dir.path()));
    let c = controller(options("v1"), store.clone(), origin.clone(), Arc::new(InMemoryHost::new(1)));
    c.on_install().await.unwrap();

    // Damaged copy of the shell in the bucket consulted first
    let key = RequestKey::get(url("/index.html"));
    store.open("v1-dynamic").await.unwrap();
    std::fs::write(
        dir.path()
            .join("v1-dynamic")
            .join(format!("{}.entry", key.digest())),
        b"not json",
    )
    .unwrap();

    origin.set_online(false);
    let navigation = get("/rooms/42").with_header("Accept", "text/html");
    let outcome = c.on_fetch(&navigation).await.unwrap();
    assert_eq!(outcome.source(), Some(ResponseSource::Shell));
    assert_eq!(body(&outcome), b"<html>shell</html>");

    let direct = c.on_fetch(&get("/index.html")).await.unwrap();
    assert_eq!(direct.source(), Some(ResponseSource::Cache));
    assert_eq!(body(&direct), b"<html>shell</html>");
}

#[tokio::test]
async fn lookup_spans_previous_generation() {
    let origin = FakeOrigin::new();
    origin.serve(&url("/app.js"), 200, "old build");
    let store = Arc::new(MemoryStore::new());
    let host = Arc::new(InMemoryHost::new(1));

    let v1 = controller(options("v1"), store.clone(), origin.clone(), host.clone());
    v1.on_fetch(&get("/app.js")).await.unwrap();
    v1.flush().await;

    // v2 installed but not yet activated; v1 buckets still present
    origin.set_online(false);
    let v2 = controller(options("v2"), store, origin, host);
    let outcome = v2.on_fetch(&get("/app.js")).await.unwrap();
    assert_eq!(outcome.source(), Some(ResponseSource::Cache));
    assert_eq!(body(&outcome), b"old build");
}

#[tokio::test]
async fn bypassed_requests_never_touch_the_cache() {
    let origin = FakeOrigin::new();
    let store = Arc::new(MemoryStore::new());
    let c = controller(options("v1"), store.clone(), origin.clone(), Arc::new(InMemoryHost::new(1)));

    let request = Request::get(Url::parse("https://abc.supabase.co/rest/v1/items").unwrap());
    let outcome = c.on_fetch(&request).await.unwrap();
    c.flush().await;

    match outcome {
        FetchOutcome::Passthrough(PassthroughReason::Bypass(rule)) => {
            assert!(rule.contains("supabase"))
        }
        other => panic!("expected bypass, got {:?}", other),
    }
    assert_eq!(origin.calls(), 0);
    assert!(store.keys().await.unwrap().is_empty());

    // Passthrough leaves the host's native fetch result untouched
    let native = origin.fetch(&request).await.unwrap();
    let again = origin.fetch(&request).await.unwrap();
    assert_eq!(native, again);
}

#[tokio::test]
async fn bypass_applies_to_websocket_prefix() {
    let c = controller(
        options("v1"),
        Arc::new(MemoryStore::new()),
        FakeOrigin::new(),
        Arc::new(InMemoryHost::new(1)),
    );
    let request = Request::get(Url::parse("wss://realtime.example.net/socket").unwrap());
    assert!(matches!(
        c.passthrough_reason(&request),
        Some(PassthroughReason::Bypass(_))
    ));
}

#[tokio::test]
async fn non_get_requests_pass_through() {
    let origin = FakeOrigin::new();
    let store = Arc::new(MemoryStore::new());
    let c = controller(options("v1"), store.clone(), origin.clone(), Arc::new(InMemoryHost::new(1)));

    for method in [Method::Post, Method::Put, Method::Delete] {
        let request = Request::new(method, Url::parse(&url("/api/items")).unwrap());
        let outcome = c.on_fetch(&request).await.unwrap();
        assert!(matches!(
            outcome,
            FetchOutcome::Passthrough(PassthroughReason::Method(m)) if m == method
        ));
    }
    c.flush().await;
    assert_eq!(origin.calls(), 0);
    assert!(store.keys().await.unwrap().is_empty());
}

#[tokio::test]
async fn only_status_200_is_cached() {
    let origin = FakeOrigin::new();
    origin.serve(&url("/created"), 201, "made");
    let store = Arc::new(MemoryStore::new());
    let c = controller(options("v1"), store.clone(), origin, Arc::new(InMemoryHost::new(1)));

    let missing = c.on_fetch(&get("/nope")).await.unwrap();
    assert_eq!(missing.response().unwrap().status, 404);
    assert_eq!(missing.source(), Some(ResponseSource::Network));
    c.on_fetch(&get("/created")).await.unwrap();
    c.flush().await;

    assert!(store.entries("v1-dynamic").await.unwrap().is_empty());
}

#[tokio::test]
async fn same_origin_flag_controls_cross_origin_caching() {
    let cdn = "https://cdn.example.net/font.woff2";

    for (same_origin_only, expect_cached) in [(false, true), (true, false)] {
        let origin = FakeOrigin::new();
        origin.serve(cdn, 200, "woff");
        origin.serve(&url("/app.css"), 200, "body{}");
        let store = Arc::new(MemoryStore::new());
        let c = controller(
            options("v1").with_same_origin_only(same_origin_only),
            store.clone(),
            origin,
            Arc::new(InMemoryHost::new(1)),
        );

        c.on_fetch(&Request::get(Url::parse(cdn).unwrap())).await.unwrap();
        c.on_fetch(&get("/app.css")).await.unwrap();
        c.flush().await;

        let cached_cdn = store.get("v1-dynamic", &RequestKey::get(cdn)).await.unwrap();
        assert_eq!(cached_cdn.is_some(), expect_cached);
        let cached_css = store
            .get("v1-dynamic", &RequestKey::get(url("/app.css")))
            .await
            .unwrap();
        assert!(cached_css.is_some());
    }
}

#[tokio::test]
async fn install_write_failure_leaves_no_static_bucket() {
    let origin = FakeOrigin::new();
    serve_shell(&origin);
    let store = Arc::new(FlakyStore::default());
    store.fail_put.store(true, Ordering::SeqCst);
    let host = Arc::new(InMemoryHost::new(1));
    let c = controller(options("v1"), store.clone(), origin, host.clone());

    let err = c.on_install().await.unwrap_err();
    assert!(matches!(err, SwError::InstallWrite { ref bucket, .. } if bucket == "v1-static"));
    assert!(!store.has("v1-static").await.unwrap());
    assert_eq!(host.skip_waiting_calls(), 0);
}

#[tokio::test]
async fn cache_write_failure_is_invisible() {
    let origin = FakeOrigin::new();
    origin.serve(&url("/app.js"), 200, "code");
    let store = Arc::new(FlakyStore::default());
    store.fail_put.store(true, Ordering::SeqCst);
    let c = controller(options("v1"), store, origin, Arc::new(InMemoryHost::new(1)));

    let outcome = c.on_fetch(&get("/app.js")).await.unwrap();
    assert_eq!(outcome.source(), Some(ResponseSource::Network));
    assert_eq!(body(&outcome), b"code");
    c.flush().await;
}

#[tokio::test]
async fn upgrade_purges_previous_generation() {
    let origin = FakeOrigin::new();
    serve_shell(&origin);
    origin.serve(&url("/app.js"), 200, "code");
    let store = Arc::new(MemoryStore::new());
    let host = Arc::new(InMemoryHost::new(3));

    let v1 = controller(options("v1"), store.clone(), origin.clone(), host.clone());
    v1.on_install().await.unwrap();
    v1.on_activate().await.unwrap();
    v1.on_fetch(&get("/app.js")).await.unwrap();
    v1.flush().await;
    assert_eq!(store.keys().await.unwrap(), vec!["v1-dynamic", "v1-static"]);

    let v2 = controller(options("v2"), store.clone(), origin, host.clone());
    v2.on_install().await.unwrap();
    let report = v2.on_activate().await.unwrap();

    assert_eq!(report.purged, vec!["v1-dynamic", "v1-static"]);
    assert_eq!(report.clients_claimed, 3);
    assert_eq!(store.keys().await.unwrap(), vec!["v2-static"]);
    assert_eq!(host.skip_waiting_calls(), 2);
}

#[tokio::test]
async fn activate_claims_clients_even_when_purge_fails() {
    let store = Arc::new(FlakyStore::default());
    store.inner.open("v1-static").await.unwrap();
    store.fail_delete.store(true, Ordering::SeqCst);
    let host = Arc::new(InMemoryHost::new(2));
    let c = controller(options("v2"), store.clone(), FakeOrigin::new(), host.clone());

    let err = c.on_activate().await.unwrap_err();
    assert!(matches!(err, SwError::Activate { ref failed } if failed == &vec!["v1-static".to_string()]));
    assert_eq!(host.claimed(), 2);
    assert!(store.has("v1-static").await.unwrap());
}

#[tokio::test]
async fn force_update_clears_every_bucket_and_acknowledges() {
    let store = Arc::new(MemoryStore::new());
    for bucket in ["v1-static", "v1-dynamic", "v0-static", "unrelated"] {
        store.open(bucket).await.unwrap();
    }
    let host = Arc::new(InMemoryHost::new(1));
    let c = controller(options("v1"), store.clone(), FakeOrigin::new(), host.clone());

    let (port, reply) = reply_channel();
    let outcome = c.on_message(&json!("FORCE_UPDATE"), Some(port)).await.unwrap();
    assert!(matches!(outcome, MessageOutcome::ForceUpdated { ref deleted } if deleted.len() == 4));
    assert_eq!(reply.await.unwrap(), ControlReply::update_complete());
    assert!(store.keys().await.unwrap().is_empty());
    assert_eq!(host.skip_waiting_calls(), 1);

    // Idempotent on an empty store
    let (port, reply) = reply_channel();
    c.on_message(&json!({"type": "FORCE_UPDATE"}), Some(port))
        .await
        .unwrap();
    assert_eq!(reply.await.unwrap(), ControlReply::update_complete());
    assert_eq!(host.skip_waiting_calls(), 2);
}

#[tokio::test]
async fn failed_force_update_sends_no_acknowledgment() {
    let store = Arc::new(FlakyStore::default());
    store.inner.open("v1-static").await.unwrap();
    store.fail_delete.store(true, Ordering::SeqCst);
    let host = Arc::new(InMemoryHost::new(1));
    let c = controller(options("v1"), store, FakeOrigin::new(), host.clone());

    let (port, reply) = reply_channel();
    let err = c.on_message(&json!("FORCE_UPDATE"), Some(port)).await.unwrap_err();
    assert!(matches!(err, SwError::ForceUpdate(_)));
    assert!(reply.await.is_err());
    assert_eq!(host.skip_waiting_calls(), 0);
}

#[tokio::test]
async fn get_version_replies_with_version() {
    let c = controller(
        options("shell-v11.0.0"),
        Arc::new(MemoryStore::new()),
        FakeOrigin::new(),
        Arc::new(InMemoryHost::new(1)),
    );

    let (port, reply) = reply_channel();
    let outcome = c.on_message(&json!("GET_VERSION"), Some(port)).await.unwrap();
    assert_eq!(outcome, MessageOutcome::VersionReported("shell-v11.0.0".to_string()));
    assert_eq!(
        serde_json::to_value(reply.await.unwrap()).unwrap(),
        json!({"version": "shell-v11.0.0"})
    );

    // No reply port is fine
    c.on_message(&json!("GET_VERSION"), None).await.unwrap();
}

#[tokio::test]
async fn unknown_messages_are_ignored() {
    let store = Arc::new(MemoryStore::new());
    store.open("v1-static").await.unwrap();
    let host = Arc::new(InMemoryHost::new(1));
    let c = controller(options("v1"), store.clone(), FakeOrigin::new(), host.clone());

    for message in [json!("SYNC_NOW"), json!({"type": "SKIP"}), json!(null)] {
        let (port, reply) = reply_channel();
        let outcome = c.on_message(&message, Some(port)).await.unwrap();
        assert_eq!(outcome, MessageOutcome::Ignored);
        assert!(reply.await.is_err());
    }
    assert_eq!(store.keys().await.unwrap(), vec!["v1-static"]);
    assert_eq!(host.skip_waiting_calls(), 0);
}
