use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

// ============================================================================
// Circuit Breaker
// ============================================================================
//
// Tracks the outcome of the last `window_size` calls. Once at least
// `minimum_calls` outcomes are recorded and the failure percentage reaches
// `failure_rate_threshold`, the circuit opens and calls are rejected without
// polling the wrapped future.
//
// States:
// - Closed: Normal operation, requests pass through
// - Open: Failure rate too high, requests rejected until `open_timeout` elapses
// - HalfOpen: Probing recovery; `half_open_successes` successes close the
//   circuit, any failure reopens it
//
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half_open",
        }
    }

    /// Gauge encoding (0=Closed, 1=Open, 2=HalfOpen)
    pub fn as_gauge(&self) -> i64 {
        match self {
            CircuitState::Closed => 0,
            CircuitState::Open => 1,
            CircuitState::HalfOpen => 2,
        }
    }
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Called on every state change with (from, to)
pub type TransitionHook = Arc<dyn Fn(CircuitState, CircuitState) + Send + Sync>;

#[derive(Debug, Clone, PartialEq)]
pub struct CircuitBreakerConfig {
    /// Number of most recent outcomes considered
    pub window_size: usize,
    /// Outcomes required before the failure rate is evaluated
    pub minimum_calls: usize,
    /// Failure percentage (0-100) that opens the circuit
    pub failure_rate_threshold: f64,
    /// Time to stay open before probing
    pub open_timeout: Duration,
    /// Successes needed to close circuit from half-open
    pub half_open_successes: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            window_size: 10,
            minimum_calls: 5,
            failure_rate_threshold: 50.0,
            open_timeout: Duration::from_secs(30),
            half_open_successes: 3,
        }
    }
}

struct CircuitBreakerState {
    state: CircuitState,
    outcomes: VecDeque<bool>,
    half_open_successes: u32,
    opened_at: Option<Instant>,
}

impl CircuitBreakerState {
    fn failure_rate(&self) -> f64 {
        if self.outcomes.is_empty() {
            return 0.0;
        }
        let failures = self.outcomes.iter().filter(|ok| !**ok).count();
        failures as f64 * 100.0 / self.outcomes.len() as f64
    }
}

#[derive(Clone)]
pub struct CircuitBreaker {
    name: &'static str,
    state: Arc<Mutex<CircuitBreakerState>>,
    config: CircuitBreakerConfig,
    on_transition: Option<TransitionHook>,
}

impl CircuitBreaker {
    pub fn new(name: &'static str, config: CircuitBreakerConfig) -> Self {
        Self {
            name,
            state: Arc::new(Mutex::new(CircuitBreakerState {
                state: CircuitState::Closed,
                outcomes: VecDeque::with_capacity(config.window_size),
                half_open_successes: 0,
                opened_at: None,
            })),
            config,
            on_transition: None,
        }
    }

    pub fn with_transition_hook(mut self, hook: TransitionHook) -> Self {
        self.on_transition = Some(hook);
        self
    }

    /// Execute an operation with circuit breaker protection
    pub async fn call<F, T, E>(&self, operation: F) -> Result<T, CircuitBreakerError<E>>
    where
        F: Future<Output = Result<T, E>>,
    {
        {
            let mut state = self.state.lock().await;

            if state.state == CircuitState::Open {
                let cooled_down = state
                    .opened_at
                    .map(|opened| opened.elapsed() >= self.config.open_timeout)
                    .unwrap_or(true);

                if !cooled_down {
                    return Err(CircuitBreakerError::CircuitOpen);
                }

                state.half_open_successes = 0;
                self.transition(&mut state, CircuitState::HalfOpen);
            }
        }

        match operation.await {
            Ok(result) => {
                self.record_success().await;
                Ok(result)
            }
            Err(err) => {
                self.record_failure().await;
                Err(CircuitBreakerError::OperationFailed(err))
            }
        }
    }

    async fn record_success(&self) {
        let mut state = self.state.lock().await;

        match state.state {
            CircuitState::HalfOpen => {
                state.half_open_successes += 1;
                if state.half_open_successes >= self.config.half_open_successes {
                    state.outcomes.clear();
                    state.half_open_successes = 0;
                    state.opened_at = None;
                    self.transition(&mut state, CircuitState::Closed);
                }
            }
            CircuitState::Closed => {
                self.push_outcome(&mut state, true);
            }
            CircuitState::Open => {
                // a call admitted before another caller opened the circuit
                tracing::debug!(breaker = self.name, "Success recorded while circuit is open");
            }
        }
    }

    async fn record_failure(&self) {
        let mut state = self.state.lock().await;

        match state.state {
            CircuitState::Closed => {
                self.push_outcome(&mut state, false);

                let rate = state.failure_rate();
                if state.outcomes.len() >= self.config.minimum_calls
                    && rate >= self.config.failure_rate_threshold
                {
                    tracing::warn!(
                        breaker = self.name,
                        failure_rate = rate,
                        window = state.outcomes.len(),
                        "Circuit breaker opening"
                    );
                    state.opened_at = Some(Instant::now());
                    self.transition(&mut state, CircuitState::Open);
                }
            }
            CircuitState::HalfOpen => {
                tracing::warn!(breaker = self.name, "Failure during half-open, reopening circuit");
                state.half_open_successes = 0;
                state.opened_at = Some(Instant::now());
                self.transition(&mut state, CircuitState::Open);
            }
            CircuitState::Open => {
                state.opened_at = Some(Instant::now());
            }
        }
    }

    fn push_outcome(&self, state: &mut CircuitBreakerState, success: bool) {
        if state.outcomes.len() >= self.config.window_size.max(1) {
            state.outcomes.pop_front();
        }
        state.outcomes.push_back(success);
    }

    fn transition(&self, state: &mut CircuitBreakerState, to: CircuitState) {
        let from = state.state;
        if from == to {
            return;
        }
        state.state = to;

        tracing::info!(breaker = self.name, from = %from, to = %to, "Circuit breaker state change");
        if let Some(hook) = &self.on_transition {
            hook(from, to);
        }
    }

    pub async fn get_state(&self) -> CircuitState {
        self.state.lock().await.state
    }

    pub async fn get_failure_rate(&self) -> f64 {
        self.state.lock().await.failure_rate()
    }
}

#[derive(Debug)]
pub enum CircuitBreakerError<E> {
    CircuitOpen,
    OperationFailed(E),
}

impl<E: fmt::Display> fmt::Display for CircuitBreakerError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CircuitBreakerError::CircuitOpen => write!(f, "Circuit breaker is open"),
            CircuitBreakerError::OperationFailed(e) => write!(f, "Operation failed: {}", e),
        }
    }
}

impl<E: std::error::Error> std::error::Error for CircuitBreakerError<E> {}
