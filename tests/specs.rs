//! Full-stack black-box specs for oted.
//!
//! These spawn the real `oted` binary against a scratch SQLite file and
//! drive it over HTTP, the way the teacher's CLI specs drive `oj`/`ojd` as
//! subprocesses rather than calling library code directly.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::net::TcpListener;
use std::process::{Child, Command, Stdio};
use std::time::Duration;

use assert_cmd::cargo::cargo_bin;
use serde_json::Value;

struct Daemon {
    child: Child,
    base_url: String,
    _dir: tempfile::TempDir,
}

impl Daemon {
    fn start() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let port = free_port();

        let child = Command::new(cargo_bin("oted"))
            .env("SERVER_PORT", port.to_string())
            .env("DB_FILE", dir.path().join("oted.db"))
            .env("TASK_LOGGER_DIR_PATH", dir.path().join("logs"))
            .env("CMD_VALIDATE", "false")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .expect("oted should spawn");

        let base_url = format!("http://127.0.0.1:{port}");
        wait_for_listening(&base_url);
        Daemon {
            child,
            base_url,
            _dir: dir,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for Daemon {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

fn free_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

fn wait_for_listening(base_url: &str) {
    let client = reqwest::blocking::Client::new();
    let deadline = std::time::Instant::now() + Duration::from_secs(5);
    while std::time::Instant::now() < deadline {
        if client
            .get(format!("{base_url}/api/v1/tasks"))
            .send()
            .is_ok()
        {
            return;
        }
        std::thread::sleep(Duration::from_millis(20));
    }
    panic!("oted did not start listening within 5s");
}

fn poll_status(client: &reqwest::blocking::Client, url: &str, timeout: Duration) -> Value {
    let deadline = std::time::Instant::now() + timeout;
    loop {
        let body: Value = client.get(url).send().unwrap().json().unwrap();
        let status = body["data"]["status"].as_str().unwrap_or("");
        if status != "Queued" && status != "Running" {
            return body;
        }
        if std::time::Instant::now() > deadline {
            panic!("task did not reach a terminal state in time: {body}");
        }
        std::thread::sleep(Duration::from_millis(20));
    }
}

#[test]
fn create_list_get_and_read_logs() {
    let daemon = Daemon::start();
    let client = reqwest::blocking::Client::new();

    let created: Value = client
        .post(daemon.url("/api/v1/tasks"))
        .json(&serde_json::json!({"name": "hello", "command": "echo hi"}))
        .send()
        .unwrap()
        .json()
        .unwrap();
    assert!(created["success"].as_bool().unwrap());
    let id = created["data"]["id"].as_i64().unwrap();

    let task_url = daemon.url(&format!("/api/v1/tasks/{id}"));
    let finished = poll_status(&client, &task_url, Duration::from_secs(5));
    assert_eq!(finished["data"]["status"], "Completed");
    assert_eq!(finished["data"]["exit_code"], 0);

    let listed: Value = client
        .get(daemon.url("/api/v1/tasks"))
        .send()
        .unwrap()
        .json()
        .unwrap();
    assert!(listed["data"]["tasks"]
        .as_array()
        .unwrap()
        .iter()
        .any(|t| t["id"].as_i64() == Some(id)));

    let logs: Value = client
        .get(daemon.url(&format!("/api/v1/tasks/{id}/logs")))
        .send()
        .unwrap()
        .json()
        .unwrap();
    assert_eq!(logs["data"]["logs"], serde_json::json!(["hi"]));
}

#[test]
fn cancel_a_long_running_task() {
    let daemon = Daemon::start();
    let client = reqwest::blocking::Client::new();

    let created: Value = client
        .post(daemon.url("/api/v1/tasks"))
        .json(&serde_json::json!({"name": "slow", "command": "sleep 30"}))
        .send()
        .unwrap()
        .json()
        .unwrap();
    let id = created["data"]["id"].as_i64().unwrap();

    let task_url = daemon.url(&format!("/api/v1/tasks/{id}"));
    let deadline = std::time::Instant::now() + Duration::from_secs(5);
    loop {
        let body: Value = client.get(&task_url).send().unwrap().json().unwrap();
        if body["data"]["status"] == "Running" {
            break;
        }
        assert!(std::time::Instant::now() < deadline, "task never started running");
        std::thread::sleep(Duration::from_millis(20));
    }

    let cancel: Value = client
        .delete(daemon.url(&format!("/api/v1/tasks/{id}/cancel")))
        .send()
        .unwrap()
        .json()
        .unwrap();
    assert!(cancel["success"].as_bool().unwrap());

    let finished = poll_status(&client, &task_url, Duration::from_secs(5));
    assert_eq!(finished["data"]["status"], "Cancelled");
}

#[test]
fn validation_errors_are_rejected_with_400() {
    let daemon = Daemon::start();
    let client = reqwest::blocking::Client::new();

    let resp = client
        .post(daemon.url("/api/v1/tasks"))
        .json(&serde_json::json!({"name": "", "command": ""}))
        .send()
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::BAD_REQUEST);

    let resp = client
        .get(daemon.url("/api/v1/tasks/999999"))
        .send()
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::NOT_FOUND);
}

#[test]
fn download_log_file_is_rejected_while_running() {
    let daemon = Daemon::start();
    let client = reqwest::blocking::Client::new();

    let created: Value = client
        .post(daemon.url("/api/v1/tasks"))
        .json(&serde_json::json!({"name": "slow", "command": "sleep 30"}))
        .send()
        .unwrap()
        .json()
        .unwrap();
    let id = created["data"]["id"].as_i64().unwrap();

    let task_url = daemon.url(&format!("/api/v1/tasks/{id}"));
    let deadline = std::time::Instant::now() + Duration::from_secs(5);
    loop {
        let body: Value = client.get(&task_url).send().unwrap().json().unwrap();
        if body["data"]["status"] == "Running" {
            break;
        }
        assert!(std::time::Instant::now() < deadline, "task never started running");
        std::thread::sleep(Duration::from_millis(20));
    }

    let resp = client
        .get(daemon.url(&format!("/api/v1/tasks/{id}/logs/download")))
        .send()
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::BAD_REQUEST);

    client
        .delete(daemon.url(&format!("/api/v1/tasks/{id}/cancel")))
        .send()
        .unwrap();
}
