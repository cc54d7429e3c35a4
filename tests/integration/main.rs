//! Integration tests for swcache

mod controller_tests;

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::path::{Path, PathBuf};
    use swcache::http::Response;
    use swcache::store::{CacheStore, CachedEntry, DiskStore, RequestKey};
    use tempfile::TempDir;
    use url::Url;

    const ORIGIN: &str = "http://127.0.0.1:9/";

    /// Isolated config, state and bucket directories
    struct Sandbox {
        dir: TempDir,
        config: PathBuf,
    }

    impl Sandbox {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let config = dir.path().join("swcache.toml");
            let buckets = dir.path().join("buckets");
            std::fs::write(
                &config,
                format!(
                    r#"
                    [worker]
                    version = "t-v1"
                    origin = "{ORIGIN}"
                    static_assets = ["/", "/index.html"]

                    [store]
                    path = "{}"

                    [network]
                    timeout_secs = 2
                    "#,
                    buckets.display()
                ),
            )
            .unwrap();
            Self { dir, config }
        }

        fn cmd(&self) -> Command {
            let mut cmd = cargo_bin_cmd!("swcache");
            cmd.env("HOME", self.dir.path())
                .env("XDG_CONFIG_HOME", self.dir.path().join("config"))
                .env("XDG_STATE_HOME", self.dir.path().join("state"))
                .env_remove("SWCACHE_CONFIG")
                .arg("--config")
                .arg(&self.config);
            cmd
        }

        fn buckets(&self) -> PathBuf {
            self.dir.path().join("buckets")
        }

        fn audit_log(&self) -> PathBuf {
            self.dir.path().join("state").join("swcache").join("audit.log")
        }

        async fn seed(&self, bucket: &str, path: &str, content_type: &str, body: &str) {
            let url = Url::parse(ORIGIN).unwrap().join(path).unwrap();
            let response = Response::new(200, url.clone(), body.to_string())
                .with_header("Content-Type", content_type);
            DiskStore::new(self.buckets())
                .put(bucket, CachedEntry::capture(RequestKey::get(url.as_str()), &response))
                .await
                .unwrap();
        }
    }

    fn bucket_exists(root: &Path, bucket: &str) -> bool {
        root.join(bucket).is_dir()
    }

    #[test]
    fn help_displays() {
        cargo_bin_cmd!("swcache")
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("offline cache controller"));
    }

    #[test]
    fn version_displays() {
        cargo_bin_cmd!("swcache")
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("swcache"));
    }

    #[test]
    fn config_path_honors_flag() {
        let sandbox = Sandbox::new();
        sandbox
            .cmd()
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("swcache.toml"));
    }

    #[test]
    fn config_show() {
        let sandbox = Sandbox::new();
        sandbox
            .cmd()
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[worker]"))
            .stdout(predicate::str::contains("t-v1"))
            .stdout(predicate::str::contains("[[bypass.rules]]"));
    }

    #[test]
    fn config_set_then_show() {
        let sandbox = Sandbox::new();
        sandbox
            .cmd()
            .args(["config", "set", "worker.version", "t-v2"])
            .assert()
            .success();
        sandbox
            .cmd()
            .args(["message", "get-version"])
            .assert()
            .success()
            .stdout(predicate::str::contains("t-v2"));
    }

    #[test]
    fn config_set_unknown_key_fails() {
        let sandbox = Sandbox::new();
        sandbox
            .cmd()
            .args(["config", "set", "vm.name", "x"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Unknown config key"));
    }

    #[test]
    fn check_bypassed_url() {
        let sandbox = Sandbox::new();
        sandbox
            .cmd()
            .args(["check", "https://abc.supabase.co/rest/v1/items"])
            .assert()
            .success()
            .stdout(predicate::str::contains("passthrough"))
            .stdout(predicate::str::contains("substring \"supabase\""));
    }

    #[test]
    fn check_intercepted_url() {
        let sandbox = Sandbox::new();
        sandbox
            .cmd()
            .args(["check", "/assets/app.js"])
            .assert()
            .success()
            .stdout(predicate::str::contains("intercepted"))
            .stdout(predicate::str::contains("t-v1-dynamic"));
    }

    #[test]
    fn check_non_get() {
        let sandbox = Sandbox::new();
        sandbox
            .cmd()
            .args(["check", "-X", "POST", "/api/items"])
            .assert()
            .success()
            .stdout(predicate::str::contains("POST requests are not intercepted"));
    }

    #[test]
    fn get_version_replies() {
        let sandbox = Sandbox::new();
        sandbox
            .cmd()
            .args(["message", "get-version"])
            .assert()
            .success()
            .stdout(predicate::str::diff("t-v1\n"));
    }

    #[test]
    fn unknown_message_ignored() {
        let sandbox = Sandbox::new();
        sandbox
            .cmd()
            .args(["message", "raw", r#""PING""#])
            .assert()
            .success()
            .stdout(predicate::str::contains("no reply"));
    }

    #[test]
    fn invalid_raw_message_rejected() {
        let sandbox = Sandbox::new();
        sandbox
            .cmd()
            .args(["message", "raw", "{not json"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("not valid JSON"));
    }

    #[test]
    fn buckets_list_empty() {
        let sandbox = Sandbox::new();
        sandbox
            .cmd()
            .args(["buckets", "list"])
            .assert()
            .success()
            .stdout(predicate::str::contains("No cache buckets"));
    }

    #[test]
    fn install_against_unreachable_origin_caches_nothing() {
        let sandbox = Sandbox::new();
        sandbox
            .cmd()
            .arg("install")
            .assert()
            .failure()
            .stderr(predicate::str::contains("Install failed"));
        assert!(!bucket_exists(&sandbox.buckets(), "t-v1-static"));
    }

    #[test]
    fn offline_fetch_of_uncached_url_fails() {
        let sandbox = Sandbox::new();
        sandbox
            .cmd()
            .args(["fetch", "/missing.js", "--offline"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("offline"));
    }

    #[tokio::test]
    async fn offline_fetch_served_from_cache() {
        let sandbox = Sandbox::new();
        sandbox
            .seed("t-v1-dynamic", "/app.js", "text/javascript", "console.log(1)")
            .await;

        sandbox
            .cmd()
            .args(["fetch", "/app.js", "--offline", "--format", "body"])
            .assert()
            .success()
            .stdout(predicate::str::diff("console.log(1)"));
    }

    #[tokio::test]
    async fn offline_navigation_gets_shell() {
        let sandbox = Sandbox::new();
        sandbox
            .seed("t-v1-static", "/index.html", "text/html", "<html>shell</html>")
            .await;

        sandbox
            .cmd()
            .args(["fetch", "/dashboard", "--offline", "--accept", "text/html", "-f", "json"])
            .assert()
            .success()
            .stdout(predicate::str::contains(r#""via": "shell""#))
            .stdout(predicate::str::contains("/index.html"));
    }

    #[tokio::test]
    async fn buckets_list_marks_stale() {
        let sandbox = Sandbox::new();
        sandbox.seed("t-v0-static", "/", "text/html", "old").await;
        sandbox.seed("t-v1-static", "/", "text/html", "new").await;

        sandbox
            .cmd()
            .args(["buckets", "list", "--format", "json"])
            .assert()
            .success()
            .stdout(predicate::str::contains(r#""name": "t-v0-static""#))
            .stdout(predicate::str::contains(r#""current": false"#))
            .stdout(predicate::str::contains(r#""current": true"#));

        sandbox
            .cmd()
            .args(["buckets", "show", "t-v1-static", "-f", "plain"])
            .assert()
            .success()
            .stdout(predicate::str::diff(format!("{ORIGIN}\n")));
    }

    #[tokio::test]
    async fn force_update_clears_everything() {
        let sandbox = Sandbox::new();
        sandbox.seed("t-v1-static", "/", "text/html", "a").await;
        sandbox.seed("t-v1-dynamic", "/x.js", "text/javascript", "b").await;
        sandbox.seed("other-cache", "/y.js", "text/javascript", "c").await;

        sandbox
            .cmd()
            .args(["message", "force-update", "--yes"])
            .assert()
            .success()
            .stdout(predicate::str::contains(r#"{"status":"UPDATE_COMPLETE"}"#));

        assert!(!bucket_exists(&sandbox.buckets(), "t-v1-static"));
        assert!(!bucket_exists(&sandbox.buckets(), "t-v1-dynamic"));
        assert!(!bucket_exists(&sandbox.buckets(), "other-cache"));

        let audit = std::fs::read_to_string(sandbox.audit_log()).unwrap();
        assert!(audit.contains("cache.force_update"));

        // Idempotent on an empty store
        sandbox
            .cmd()
            .args(["message", "force-update", "--yes"])
            .assert()
            .success()
            .stdout(predicate::str::contains("UPDATE_COMPLETE"));

        // No install ran, so no worker is registered
        sandbox
            .cmd()
            .arg("status")
            .assert()
            .success()
            .stdout(predicate::str::contains("Not installed"));
    }

    #[tokio::test]
    async fn activate_without_install_still_purges() {
        let sandbox = Sandbox::new();
        sandbox.seed("t-v0-static", "/", "text/html", "old").await;

        sandbox
            .cmd()
            .arg("activate")
            .assert()
            .failure()
            .stderr(predicate::str::contains("No worker installed"));
        assert!(!bucket_exists(&sandbox.buckets(), "t-v0-static"));
    }

    #[tokio::test]
    async fn reset_removes_all_buckets() {
        let sandbox = Sandbox::new();
        sandbox.seed("t-v1-static", "/", "text/html", "a").await;

        sandbox
            .cmd()
            .args(["reset", "--yes"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Reset complete"));
        assert!(!bucket_exists(&sandbox.buckets(), "t-v1-static"));
    }

    #[test]
    fn status_reports_not_installed() {
        let sandbox = Sandbox::new();
        sandbox
            .cmd()
            .arg("status")
            .assert()
            .success()
            .stdout(predicate::str::contains("Not installed"))
            .stdout(predicate::str::contains("t-v1-static: 0 of 2 assets"));
    }

    #[test]
    fn completions_generate() {
        cargo_bin_cmd!("swcache")
            .args(["completions", "bash"])
            .assert()
            .success()
            .stdout(predicate::str::contains("swcache"));
    }
}
