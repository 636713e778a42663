//! Per-endpoint circuit breaker: generalizes "Unavailable" handling for a
//! system that polls several independently flaky Usenet indexers and
//! downloaders. One breaker is kept per configured indexer/downloader id
//! in a [`CircuitBreakerRegistry`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    pub failure_threshold: u32,
    pub success_threshold: u32,
    pub open_timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            success_threshold: 2,
            open_timeout: Duration::from_secs(60),
        }
    }
}

pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    state: Mutex<CircuitState>,
    failure_count: AtomicU32,
    success_count: AtomicU32,
    opened_at: Mutex<Option<Instant>>,
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            state: Mutex::new(CircuitState::Closed),
            failure_count: AtomicU32::new(0),
            success_count: AtomicU32::new(0),
            opened_at: Mutex::new(None),
        }
    }

    /// Current state, applying the Open → HalfOpen transition if the
    /// timeout has elapsed.
    pub fn state(&self) -> CircuitState {
        let mut state = self.state.lock().unwrap();
        if *state == CircuitState::Open {
            let opened_at = *self.opened_at.lock().unwrap();
            if let Some(opened_at) = opened_at {
                if opened_at.elapsed() >= self.config.open_timeout {
                    *state = CircuitState::HalfOpen;
                    self.success_count.store(0, Ordering::SeqCst);
                }
            }
        }
        *state
    }

    /// Whether a call should be allowed right now.
    pub fn allow_request(&self) -> bool {
        self.state() != CircuitState::Open
    }

    pub fn on_success(&self) {
        match self.state() {
            CircuitState::HalfOpen => {
                let count = self.success_count.fetch_add(1, Ordering::SeqCst) + 1;
                if count >= self.config.success_threshold {
                    *self.state.lock().unwrap() = CircuitState::Closed;
                    self.failure_count.store(0, Ordering::SeqCst);
                }
            }
            CircuitState::Closed => {
                self.failure_count.store(0, Ordering::SeqCst);
            }
            CircuitState::Open => {}
        }
    }

    pub fn on_failure(&self) {
        match self.state() {
            CircuitState::HalfOpen => self.open(),
            CircuitState::Closed => {
                let count = self.failure_count.fetch_add(1, Ordering::SeqCst) + 1;
                if count >= self.config.failure_threshold {
                    self.open();
                }
            }
            CircuitState::Open => {}
        }
    }

    fn open(&self) {
        *self.state.lock().unwrap() = CircuitState::Open;
        *self.opened_at.lock().unwrap() = Some(Instant::now());
        self.failure_count.store(0, Ordering::SeqCst);
    }
}

/// One breaker per service id (indexer id, downloader id, ...).
pub struct CircuitBreakerRegistry {
    breakers: RwLock<HashMap<String, std::sync::Arc<CircuitBreaker>>>,
    default_config: CircuitBreakerConfig,
}

impl CircuitBreakerRegistry {
    pub fn new(default_config: CircuitBreakerConfig) -> Self {
        Self {
            breakers: RwLock::new(HashMap::new()),
            default_config,
        }
    }

    pub async fn get(&self, service_id: &str) -> std::sync::Arc<CircuitBreaker> {
        if let Some(existing) = self.breakers.read().await.get(service_id) {
            return existing.clone();
        }
        let mut breakers = self.breakers.write().await;
        breakers
            .entry(service_id.to_string())
            .or_insert_with(|| std::sync::Arc::new(CircuitBreaker::new(self.default_config.clone())))
            .clone()
    }
}

impl Default for CircuitBreakerRegistry {
    fn default() -> Self {
        Self::new(CircuitBreakerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opens_after_failure_threshold() {
        let cb = CircuitBreaker::new(CircuitBreakerConfig {
            failure_threshold: 2,
            success_threshold: 1,
            open_timeout: Duration::from_millis(20),
        });
        assert_eq!(cb.state(), CircuitState::Closed);
        cb.on_failure();
        assert_eq!(cb.state(), CircuitState::Closed);
        cb.on_failure();
        assert_eq!(cb.state(), CircuitState::Open);
        assert!(!cb.allow_request());
    }

    #[test]
    fn transitions_to_half_open_after_timeout_then_closes_on_success() {
        let cb = CircuitBreaker::new(CircuitBreakerConfig {
            failure_threshold: 1,
            success_threshold: 1,
            open_timeout: Duration::from_millis(10),
        });
        cb.on_failure();
        assert_eq!(cb.state(), CircuitState::Open);
        std::thread::sleep(Duration::from_millis(15));
        assert_eq!(cb.state(), CircuitState::HalfOpen);
        cb.on_success();
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[tokio::test]
    async fn registry_reuses_breaker_per_service() {
        let registry = CircuitBreakerRegistry::default();
        let a = registry.get("indexer-1").await;
        let b = registry.get("indexer-1").await;
        assert!(std::sync::Arc::ptr_eq(&a, &b));
        let c = registry.get("indexer-2").await;
        assert!(!std::sync::Arc::ptr_eq(&a, &c));
    }
}
