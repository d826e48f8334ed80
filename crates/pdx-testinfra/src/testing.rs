//! In-process stand-in for a database container.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::container::{Coordinates, DatabaseContainer};
use crate::error::{HarnessError, HarnessResult};

pub struct FakeContainer {
    available: bool,
    running: AtomicBool,
    start_calls: AtomicUsize,
    stop_calls: AtomicUsize,
}

impl FakeContainer {
    pub fn new() -> Self {
        Self {
            available: true,
            running: AtomicBool::new(false),
            start_calls: AtomicUsize::new(0),
            stop_calls: AtomicUsize::new(0),
        }
    }

    /// A container whose runtime is missing; `start` always fails.
    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::new()
        }
    }

    pub fn start_calls(&self) -> usize {
        self.start_calls.load(Ordering::SeqCst)
    }

    pub fn stop_calls(&self) -> usize {
        self.stop_calls.load(Ordering::SeqCst)
    }

    fn coordinates(&self, what: &'static str) -> HarnessResult<Coordinates> {
        if !self.is_running() {
            return Err(HarnessError::NotStarted(what));
        }
        Ok(Coordinates {
            host: "fake-host".into(),
            port: 15432,
            database: "pokedex_test".into(),
            username: "test".into(),
            password: "test".into(),
        })
    }
}

#[async_trait]
impl DatabaseContainer for FakeContainer {
    async fn start(&self) -> HarnessResult<()> {
        self.start_calls.fetch_add(1, Ordering::SeqCst);
        if !self.available {
            return Err(HarnessError::environment(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "docker daemon not reachable",
            )));
        }
        self.running.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn jdbc_url(&self) -> HarnessResult<String> {
        self.coordinates("jdbc url").map(|c| c.jdbc_url())
    }

    fn username(&self) -> HarnessResult<String> {
        self.coordinates("username").map(|c| c.username)
    }

    fn password(&self) -> HarnessResult<String> {
        self.coordinates("password").map(|c| c.password)
    }

    async fn stop(&self) -> HarnessResult<()> {
        self.stop_calls.fetch_add(1, Ordering::SeqCst);
        self.running.store(false, Ordering::SeqCst);
        Ok(())
    }
}
