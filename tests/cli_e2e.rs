//! End-to-end CLI tests for the family-cloud binary.
//!
//! Every test runs against its own temporary config and storage directories
//! and never reaches the network.

// `Command::cargo_bin` is deprecated in assert_cmd >=2.0.17 in favor of
// `cargo::cargo_bin_cmd!` macro. Suppressed until migration to the new API.
#![allow(deprecated)]

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use family_cloud_core::{Database, LocalStorage, TokenStore};
use predicates::prelude::*;
use tempfile::TempDir;

struct Sandbox {
    dir: TempDir,
}

impl Sandbox {
    fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    fn config_home(&self) -> PathBuf {
        self.dir.path().join("config")
    }

    fn db_path(&self) -> PathBuf {
        self.dir.path().join("data").join("family-cloud.db")
    }

    fn write_config(&self, contents: &str) {
        let config_dir = self.config_home().join("family-cloud");
        std::fs::create_dir_all(&config_dir).unwrap();
        std::fs::write(config_dir.join("config.toml"), contents).unwrap();
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("family-cloud").unwrap();
        cmd.env("XDG_CONFIG_HOME", self.config_home())
            .env("XDG_DATA_HOME", self.dir.path().join("data-home"))
            .env_remove("RUST_LOG")
            .env_remove("FAMILY_CLOUD_API_BASE_URL")
            .env_remove("FAMILY_CLOUD_COGNITO_DOMAIN")
            .env_remove("FAMILY_CLOUD_CLIENT_ID")
            .env_remove("FAMILY_CLOUD_REDIRECT_URI")
            .env_remove("FAMILY_CLOUD_STORAGE_PATH")
            .arg("--storage-path")
            .arg(self.db_path())
            // Nothing listens here; offline commands must never need it.
            .arg("--api-url")
            .arg("http://127.0.0.1:9");
        cmd
    }
}

fn fake_jwt(payload: &str) -> String {
    format!(
        "{}.{}.sig",
        URL_SAFE_NO_PAD.encode(r#"{"alg":"none"}"#),
        URL_SAFE_NO_PAD.encode(payload)
    )
}

fn stored_id_token(db_path: &Path) -> Option<String> {
    tokio_test::block_on(async {
        let db = Database::new(db_path).await.unwrap();
        TokenStore::new(LocalStorage::new(db)).id_token().await
    })
}

#[test]
fn test_binary_help_displays_usage() {
    Sandbox::new()
        .cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Family video cloud"));
}

#[test]
fn test_binary_version_displays_version() {
    Sandbox::new()
        .cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("family-cloud"));
}

#[test]
fn test_binary_without_command_fails() {
    Sandbox::new().cmd().assert().failure();
}

#[test]
fn test_binary_invalid_flag_returns_error() {
    Sandbox::new()
        .cmd()
        .arg("--invalid-flag")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}

#[test]
fn test_login_url_uses_token_flow() {
    Sandbox::new()
        .cmd()
        .args(["auth", "login-url"])
        .assert()
        .success()
        .stdout(predicate::str::contains("/login?client_id="))
        .stdout(predicate::str::contains("response_type=token"));
}

#[test]
fn test_env_overrides_client_id() {
    Sandbox::new()
        .cmd()
        .env("FAMILY_CLOUD_CLIENT_ID", "env-client")
        .args(["auth", "signup-url"])
        .assert()
        .success()
        .stdout(predicate::str::contains("/signup?client_id=env-client"));
}

#[test]
fn test_config_file_sets_hosted_ui() {
    let sandbox = Sandbox::new();
    sandbox.write_config(
        r#"
cognito_domain = "auth.example.test"
client_id = "file-client" # from the config file
"#,
    );

    sandbox
        .cmd()
        .args(["auth", "logout-url"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with(
            "https://auth.example.test/logout?client_id=file-client",
        ));
}

#[test]
fn test_invalid_config_file_fails() {
    let sandbox = Sandbox::new();
    sandbox.write_config("concurrency = 4\n");

    sandbox
        .cmd()
        .args(["auth", "login-url"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown configuration key"));
}

#[test]
fn test_callback_stores_tokens_and_logout_clears_them() {
    let sandbox = Sandbox::new();
    let id_token = fake_jwt(r#"{"name":"Ada Lovelace","email":"ada@example.com"}"#);
    let redirect =
        format!("https://app.example/#id_token={id_token}&access_token=acc&expires_in=3600");

    sandbox
        .cmd()
        .args(["auth", "callback", &redirect])
        .assert()
        .success()
        .stdout(predicate::str::contains("Signed in as Ada Lovelace"));
    assert_eq!(stored_id_token(&sandbox.db_path()), Some(id_token));

    sandbox
        .cmd()
        .args(["auth", "whoami"])
        .assert()
        .success()
        .stdout(predicate::str::contains("ada@example.com"));

    sandbox
        .cmd()
        .args(["auth", "logout"])
        .assert()
        .success()
        .stdout(predicate::str::contains("/logout?client_id="));
    assert_eq!(stored_id_token(&sandbox.db_path()), None);
}

#[test]
fn test_callback_error_fragment_fails() {
    Sandbox::new()
        .cmd()
        .args([
            "auth",
            "callback",
            "#error=access_denied&error_description=User+cancelled",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("access_denied"));
}

#[test]
fn test_whoami_when_signed_out() {
    Sandbox::new()
        .cmd()
        .args(["auth", "whoami"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Not signed in"));
}

#[test]
fn test_videos_list_requires_sign_in() {
    Sandbox::new()
        .cmd()
        .args(["videos", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("authentication required"));
}

#[test]
fn test_blank_search_makes_no_request() {
    Sandbox::new()
        .cmd()
        .args(["search", "   "])
        .assert()
        .success()
        .stdout(predicate::str::contains("Enter something to search for"));
}

#[test]
fn test_search_signed_out_finds_nothing() {
    Sandbox::new()
        .cmd()
        .args(["search", "beach"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No videos match \"beach\""));
}

#[test]
fn test_profiles_seeded_then_added_and_selected() {
    let sandbox = Sandbox::new();

    sandbox
        .cmd()
        .args(["profiles", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Dad"))
        .stdout(predicate::str::contains("Tobi\tchild"));

    sandbox
        .cmd()
        .args(["profiles", "add", "Ada", "--child"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Added profile Ada"));

    sandbox
        .cmd()
        .args(["profiles", "select", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Watching as Mum"));

    sandbox
        .cmd()
        .args(["profiles", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("* 2\tMum"))
        .stdout(predicate::str::contains("Ada\tchild\t#ff6b00"));
}

#[test]
fn test_profile_name_too_long_is_rejected() {
    Sandbox::new()
        .cmd()
        .args(["profiles", "add", "A name that is far too long"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("20 characters or less"));
}

#[test]
fn test_select_unknown_profile_fails() {
    Sandbox::new()
        .cmd()
        .args(["profiles", "select", "nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No profile with id 'nope'"));
}

#[test]
fn test_playlist_add_is_deduplicated() {
    let sandbox = Sandbox::new();

    sandbox
        .cmd()
        .args(["playlists", "add", "4", "9"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Birthday Celebrations now has 2 videos"));

    sandbox
        .cmd()
        .args(["playlists", "add", "4", "9"])
        .assert()
        .success()
        .stdout(predicate::str::contains("now has 2 videos"));

    sandbox
        .cmd()
        .args(["playlists", "show", "4"])
        .assert()
        .success()
        .stdout(predicate::str::contains("  9"));
}

#[test]
fn test_playlist_create_and_delete() {
    let sandbox = Sandbox::new();

    sandbox
        .cmd()
        .args(["playlists", "create", "Summer", "--description", "Beach days"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created playlist Summer"));

    sandbox
        .cmd()
        .args(["playlists", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Summer\t0 videos"));

    sandbox
        .cmd()
        .args(["playlists", "delete", "1"])
        .assert()
        .success();
    sandbox
        .cmd()
        .args(["playlists", "delete", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No playlist with id '1'"));
}

#[test]
fn test_watching_requires_active_profile() {
    Sandbox::new()
        .cmd()
        .args(["watching", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No active profile"));
}

#[test]
fn test_watching_progress_is_listed_offline() {
    let sandbox = Sandbox::new();
    sandbox
        .cmd()
        .args(["profiles", "select", "1"])
        .assert()
        .success();

    sandbox
        .cmd()
        .args(["watching", "progress", "v1", "0.5", "--title", "Beach Day"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Dad has 1 videos in progress"));

    sandbox
        .cmd()
        .args(["watching", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("v1\tBeach Day\t50%"));

    sandbox
        .cmd()
        .args(["watching", "clear"])
        .assert()
        .success();
    sandbox
        .cmd()
        .args(["watching", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Nothing to continue for Dad"));
}
