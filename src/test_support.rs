//! Helpers shared by unit tests.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::io;
use std::sync::{Arc, Mutex};

use tracing::Level;
use tracing::subscriber::DefaultGuard;

use crate::config::{AuthConfig, Config};
use crate::providers::{ProviderKind, build_provider};
use crate::state::AppState;

/// Collects JSON log lines emitted on the current thread.
#[derive(Clone, Default)]
pub struct LogCapture(Arc<Mutex<Vec<u8>>>);

impl io::Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl LogCapture {
    /// Route this thread's events into the capture until the guard drops.
    pub fn install(&self) -> DefaultGuard {
        let writer = self.clone();
        let subscriber = tracing_subscriber::fmt()
            .json()
            .with_max_level(Level::DEBUG)
            .with_writer(move || writer.clone())
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    pub fn raw(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }

    pub fn records(&self) -> Vec<serde_json::Value> {
        self.raw()
            .lines()
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect()
    }
}

/// State whose backend address refuses connections.
pub fn test_state(auth: AuthConfig) -> AppState {
    let config = Config {
        auth,
        ..Config::default()
    };
    let provider =
        build_provider(ProviderKind::Anthropic, "anthropic", Some("http://127.0.0.1:1")).unwrap();
    AppState::new(config, provider).unwrap()
}
