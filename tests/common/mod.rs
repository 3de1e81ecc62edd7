//! Shared utilities for integration tests.
//!
//! `ScriptedProvider` stands in for the browser: it serves fixed table rows
//! (or fails, or hangs) and counts every acquisition, navigation and release.

#![allow(dead_code)]

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Semaphore;

use resi_tracker::cache::{MemoryStore, TrackingCache};
use resi_tracker::config::SiteConfig;
use resi_tracker::extraction::{ExtractionRegistry, SiteProfile};
use resi_tracker::page::{PageProvider, PageSession, SessionError};
use resi_tracker::resilience::{AdmissionController, CircuitBreaker};
use resi_tracker::TrackingService;

/// What every session handed out by the provider does.
#[derive(Debug, Clone)]
pub enum Behaviour {
    /// Navigate fine and serve these rows.
    Rows(Vec<Vec<String>>),
    /// Fail the navigation step.
    FailNavigation,
    /// Fail to open a session at all.
    FailAcquire,
    /// Never finish navigating.
    Hang,
}

#[derive(Debug, Default)]
pub struct Counters {
    pub acquired: AtomicUsize,
    pub released: AtomicUsize,
    pub navigations: AtomicUsize,
    pub clicks: Mutex<Vec<String>>,
}

pub struct ScriptedProvider {
    pub counters: Arc<Counters>,
    behaviour: Mutex<Behaviour>,
    gate: Option<Arc<Semaphore>>,
}

impl ScriptedProvider {
    pub fn new(behaviour: Behaviour) -> Arc<Self> {
        Arc::new(Self {
            counters: Arc::new(Counters::default()),
            behaviour: Mutex::new(behaviour),
            gate: None,
        })
    }

    /// Sessions block in `goto` until a permit is available on `gate`.
    pub fn gated(behaviour: Behaviour, gate: Arc<Semaphore>) -> Arc<Self> {
        Arc::new(Self {
            counters: Arc::new(Counters::default()),
            behaviour: Mutex::new(behaviour),
            gate: Some(gate),
        })
    }

    pub fn set_behaviour(&self, behaviour: Behaviour) {
        *self.behaviour.lock().unwrap() = behaviour;
    }

    pub fn acquired(&self) -> usize {
        self.counters.acquired.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.counters.released.load(Ordering::SeqCst)
    }

    pub fn navigations(&self) -> usize {
        self.counters.navigations.load(Ordering::SeqCst)
    }

    pub fn clicks(&self) -> Vec<String> {
        self.counters.clicks.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageProvider for ScriptedProvider {
    async fn acquire(&self) -> Result<Box<dyn PageSession>, SessionError> {
        let behaviour = self.behaviour.lock().unwrap().clone();
        if let Behaviour::FailAcquire = behaviour {
            return Err(SessionError::Unavailable("browser crashed".into()));
        }
        self.counters.acquired.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(ScriptedSession {
            counters: Arc::clone(&self.counters),
            behaviour,
            gate: self.gate.clone(),
        }))
    }

    async fn release(&self, session: Box<dyn PageSession>) {
        session.close().await;
        self.counters.released.fetch_add(1, Ordering::SeqCst);
    }
}

struct ScriptedSession {
    counters: Arc<Counters>,
    behaviour: Behaviour,
    gate: Option<Arc<Semaphore>>,
}

#[async_trait]
impl PageSession for ScriptedSession {
    fn user_agent(&self) -> &str {
        "scripted"
    }

    async fn goto(&mut self, url: &str) -> Result<(), SessionError> {
        self.counters.navigations.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            let _permit = gate.acquire().await;
        }
        match self.behaviour {
            Behaviour::FailNavigation => Err(SessionError::Navigation {
                url: url.to_string(),
                reason: "connection refused".into(),
            }),
            Behaviour::Hang => std::future::pending().await,
            _ => Ok(()),
        }
    }

    async fn click(&mut self, selector: &str) -> Result<(), SessionError> {
        self.counters.clicks.lock().unwrap().push(selector.to_string());
        Ok(())
    }

    async fn wait_for(&mut self, _selector: &str) -> Result<(), SessionError> {
        Ok(())
    }

    async fn table_rows(&mut self, _selector: &str) -> Result<Vec<Vec<String>>, SessionError> {
        match &self.behaviour {
            Behaviour::Rows(rows) => Ok(rows.clone()),
            _ => Ok(Vec::new()),
        }
    }

    async fn close(self: Box<Self>) {}
}

/// A typical results table: a header row and two events.
pub fn sample_rows() -> Vec<Vec<String>> {
    vec![
        vec!["Tanggal".to_string()],
        vec!["2024-03-02 08:00".to_string(), "DELIVERED".to_string()],
        vec!["2024-03-01 09:12".to_string(), "SHIPMENT RECEIVED".to_string()],
    ]
}

pub struct Options {
    pub max_concurrent: usize,
    pub threshold: u32,
    pub cooldown: Duration,
    pub request_timeout: Duration,
    pub step_timeout: Duration,
    pub cache: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            max_concurrent: 5,
            threshold: 5,
            cooldown: Duration::from_secs(60),
            request_timeout: Duration::from_secs(5),
            step_timeout: Duration::from_secs(5),
            cache: true,
        }
    }
}

pub fn build_service(provider: Arc<ScriptedProvider>, options: Options) -> Arc<TrackingService> {
    let site_config = SiteConfig {
        base_url: "https://tracking.test/".to_string(),
        ..SiteConfig::default()
    };
    let site = SiteProfile::from_config(&site_config, options.step_timeout).unwrap();
    let cache = if options.cache {
        TrackingCache::new(Arc::new(MemoryStore::new()), Duration::from_secs(300), "track")
    } else {
        TrackingCache::disabled()
    };

    let service = TrackingService::new(
        AdmissionController::new(options.max_concurrent, Duration::from_secs(5)),
        CircuitBreaker::new(options.threshold, options.cooldown),
        cache,
        ExtractionRegistry::with_builtin_couriers(&site),
        provider,
        options.request_timeout,
    )
    .with_instance_id("test-instance");
    Arc::new(service)
}

/// Poll `condition` until it holds or two seconds pass.
pub async fn wait_until<F>(mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    for _ in 0..200 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}

/// Run `fut` with a generous deadline so a regression hangs the test
/// for seconds, not forever.
pub async fn within<T>(fut: impl Future<Output = T>) -> T {
    tokio::time::timeout(Duration::from_secs(10), fut)
        .await
        .expect("test future timed out")
}
