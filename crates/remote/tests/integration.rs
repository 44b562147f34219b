// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Integration tests for the tally-remote server binary.

#![allow(clippy::panic)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use std::process::{Child, Command, Stdio};
use std::time::Duration;

use serde_json::{json, Value};

/// Helper to spawn a server process and clean it up on drop.
struct ServerProcess {
    child: Child,
    port: u16,
}

impl ServerProcess {
    fn spawn(offset: u16) -> Self {
        // Use a port range that's less likely to conflict
        // Starting from a high ephemeral port
        let port = 49152 + (std::process::id() % 1000) as u16 + offset;

        let child = Command::new(env!("CARGO_BIN_EXE_tally-remote"))
            .arg("--bind")
            .arg(format!("127.0.0.1:{}", port))
            .arg("--seed")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .expect("spawn server process");

        ServerProcess { child, port }
    }

    fn url(&self, path: &str) -> String {
        format!("http://127.0.0.1:{}{}", self.port, path)
    }

    /// Poll the health endpoint until the server answers.
    async fn wait_ready(&self, http: &reqwest::Client) {
        // CI runners can be slow, so we use generous timeouts
        for _ in 0..20 {
            let probe = http
                .get(self.url("/api/health"))
                .timeout(Duration::from_millis(500))
                .send()
                .await;
            if matches!(probe, Ok(ref r) if r.status().is_success()) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(200)).await;
        }
        panic!("server did not become ready within retries");
    }
}

impl Drop for ServerProcess {
    fn drop(&mut self) {
        // Kill the server process
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

#[tokio::test]
async fn test_server_lifecycle() {
    let server = ServerProcess::spawn(0);
    let http = reqwest::Client::new();
    server.wait_ready(&http).await;

    let response = http
        .post(server.url("/api/perform"))
        .json(&json!({"kind": "listTabs", "operationId": "op-1"}))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());

    let tabs: Value = response.json().await.unwrap();
    let tabs = tabs.as_array().expect("tab list");
    assert_eq!(tabs.len(), 3);
    assert_eq!(tabs[0]["kind"], "Tab");
    assert_eq!(tabs[0]["status"], "OPEN");
}

#[tokio::test]
async fn test_client_against_binary() {
    let server = ServerProcess::spawn(1);
    server.wait_ready(&reqwest::Client::new()).await;

    let config = tally_client::ClientConfig::with_url(format!("http://127.0.0.1:{}", server.port));
    let client = tally_client::Client::new(config).unwrap();

    client.list_tabs().unwrap();
    client.settle().await;

    let tabs = client.list_tabs().unwrap();
    assert_eq!(tabs.len(), 3);
    assert!(client.pending().is_empty());
}
