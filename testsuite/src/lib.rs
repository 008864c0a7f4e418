//
// Copyright 2017-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Shared fixtures for cross-crate end-to-end tests
//!
//! Spins up a real [`TelemetryServer`] over a throwaway store and hands back
//! everything a test needs to run real [`telemetrix_client`] sessions
//! against it.

use std::sync::Arc;
use telemetrix_client::ClientConfig;
use telemetrix_service::{ServerConfig, TelemetryServer};
use telemetrix_store::TelemetryStore;

/// A running server over a temporary store, torn down with the value.
pub struct TestRig {
    /// The running server
    pub server: TelemetryServer,
    /// The store behind it
    pub store: Arc<TelemetryStore>,
}

impl TestRig {
    /// Start a server on an ephemeral port with the given accounts provisioned.
    pub async fn start(users: &[(&str, &str)]) -> TestRig {
        let (store, _) = TelemetryStore::open_temporary().expect("temporary store");
        for (username, password) in users {
            store
                .credentials()
                .add_user(username, password)
                .expect("provision user");
        }
        let store = Arc::new(store);

        let config = ServerConfig::new("127.0.0.1:0".parse().unwrap());
        let server = TelemetryServer::bind(config, store.clone())
            .await
            .expect("bind server");
        server.start().await.expect("start server");

        TestRig { server, store }
    }

    /// Client configuration pointed at this server.
    pub fn client_config(&self, username: &str, password: &str) -> ClientConfig {
        let addr = self.server.bind_address();
        ClientConfig::new(addr.ip().to_string(), addr.port(), username, password)
    }

    /// Stop the server, draining the persistence spool.
    pub async fn shutdown(&self) {
        self.server.shutdown().await.expect("shutdown server");
    }
}
