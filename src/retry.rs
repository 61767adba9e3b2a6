use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info};

pub const DEFAULT_MAX_RETRIES: u32 = 6;
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(5);
pub const RATE_LIMIT_EXCEEDED: &str = "Rate limit exceeded";

/// Delay before retry `retry` (0-based): `base * 2^retry`, saturating.
pub fn backoff_delay(base: Duration, retry: u32) -> Duration {
    base.saturating_mul(2u32.saturating_pow(retry))
}

/// Total time slept after `retries` retries: `base * (2^retries - 1)`.
pub fn cumulative_delay(base: Duration, retries: u32) -> Duration {
    base.saturating_mul(2u32.saturating_pow(retries).saturating_sub(1))
}

#[derive(Debug, Clone, PartialEq)]
pub struct ThrottleConfig {
    pub max_retries: u32,
    pub base_delay: Duration,
    /// Upper bound of uniform random jitter added to each delay. Off by default
    /// so the schedule is exactly `base * 2^n`.
    pub max_jitter: Option<Duration>,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay: DEFAULT_BASE_DELAY,
            max_jitter: None,
        }
    }
}

impl ThrottleConfig {
    /// Delays before each retry, without jitter.
    pub fn schedule(&self) -> Vec<Duration> {
        (0..self.max_retries)
            .map(|retry| backoff_delay(self.base_delay, retry))
            .collect()
    }

    pub fn delay_for(&self, retry: u32) -> Duration {
        let delay = backoff_delay(self.base_delay, retry);
        match self.max_jitter {
            Some(max) if !max.is_zero() => delay.saturating_add(Duration::from_secs_f64(
                rand::random::<f64>() * max.as_secs_f64(),
            )),
            _ => delay,
        }
    }

    /// Longest possible delay before retry `retry`, jitter included.
    pub fn max_delay_for(&self, retry: u32) -> Duration {
        let delay = backoff_delay(self.base_delay, retry);
        delay.saturating_add(self.max_jitter.unwrap_or_default())
    }
}

/// Decides whether a failure is the provider telling us to slow down.
pub trait ThrottleClassifier<E> {
    fn is_throttled(&self, err: &E) -> bool;
}

impl<E, F> ThrottleClassifier<E> for F
where
    F: Fn(&E) -> bool,
{
    fn is_throttled(&self, err: &E) -> bool {
        self(err)
    }
}

/// Errors that may carry a message reported by the remote service.
pub trait ProviderMessage {
    fn provider_message(&self) -> Option<&str>;
}

/// Classifies an error as throttling when its provider message equals a
/// configured literal.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageClassifier {
    message: String,
}

impl MessageClassifier {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn rate_limit_exceeded() -> Self {
        Self::new(RATE_LIMIT_EXCEEDED)
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Default for MessageClassifier {
    fn default() -> Self {
        Self::rate_limit_exceeded()
    }
}

impl<E: ProviderMessage> ThrottleClassifier<E> for MessageClassifier {
    fn is_throttled(&self, err: &E) -> bool {
        err.provider_message() == Some(self.message.as_str())
    }
}

/// Blocking sleep used between synchronous retries.
pub trait Sleeper {
    fn sleep(&self, duration: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Runs one remote call, retrying it with exponential backoff while the
/// failure is classified as throttling.
///
/// Any other failure is returned immediately. After `max_retries` throttled
/// retries the last throttling error is returned, so at most
/// `max_retries + 1` calls are made.
#[derive(Debug, Clone)]
pub struct ThrottledInvoker<C, S = ThreadSleeper> {
    config: ThrottleConfig,
    classifier: C,
    sleeper: S,
}

impl<C> ThrottledInvoker<C> {
    pub fn new(config: ThrottleConfig, classifier: C) -> Self {
        Self {
            config,
            classifier,
            sleeper: ThreadSleeper,
        }
    }
}

impl Default for ThrottledInvoker<MessageClassifier> {
    fn default() -> Self {
        Self::new(ThrottleConfig::default(), MessageClassifier::default())
    }
}

impl<C, S> ThrottledInvoker<C, S> {
    pub fn with_sleeper<S2: Sleeper>(self, sleeper: S2) -> ThrottledInvoker<C, S2> {
        ThrottledInvoker {
            config: self.config,
            classifier: self.classifier,
            sleeper,
        }
    }

    pub fn config(&self) -> &ThrottleConfig {
        &self.config
    }

    pub fn classifier(&self) -> &C {
        &self.classifier
    }

    pub fn sleeper(&self) -> &S {
        &self.sleeper
    }

    /// Blocking variant: sleeps on the calling thread between retries.
    pub fn invoke<T, E, F>(&self, operation: &str, mut op: F) -> Result<T, E>
    where
        F: FnMut() -> Result<T, E>,
        C: ThrottleClassifier<E>,
        S: Sleeper,
        E: Display,
    {
        let mut retries = 0;

        loop {
            let err = match op() {
                Ok(result) => {
                    if retries > 0 {
                        info!("Call of {} succeeded after {} retries", operation, retries);
                    }
                    return Ok(result);
                }
                Err(err) => err,
            };
            if !self.should_retry(operation, retries, &err) {
                return Err(err);
            }

            let delay = self.config.delay_for(retries);
            self.log_throttled(operation, retries, delay);
            self.sleeper.sleep(delay);
            retries += 1;
        }
    }

    /// Async variant for tokio callers: awaits `tokio::time::sleep` between
    /// retries instead of blocking the thread.
    pub async fn invoke_async<T, E, F, Fut>(&self, operation: &str, mut op: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        C: ThrottleClassifier<E>,
        E: Display,
    {
        let mut retries = 0;

        loop {
            let err = match op().await {
                Ok(result) => {
                    if retries > 0 {
                        info!("Call of {} succeeded after {} retries", operation, retries);
                    }
                    return Ok(result);
                }
                Err(err) => err,
            };
            if !self.should_retry(operation, retries, &err) {
                return Err(err);
            }

            let delay = self.config.delay_for(retries);
            self.log_throttled(operation, retries, delay);
            sleep(delay).await;
            retries += 1;
        }
    }

    fn should_retry<E>(&self, operation: &str, retries: u32, err: &E) -> bool
    where
        C: ThrottleClassifier<E>,
        E: Display,
    {
        if !self.classifier.is_throttled(err) {
            return false;
        }
        if retries >= self.config.max_retries {
            error!(
                "Call of {} still throttled after {} retries; giving up: {}",
                operation, retries, err
            );
            return false;
        }
        true
    }

    fn log_throttled(&self, operation: &str, retries: u32, delay: Duration) {
        info!(
            operation,
            retry = retries + 1,
            max_retries = self.config.max_retries,
            "Call of {} got throttled; sleeping {:?} before retrying",
            operation,
            delay
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};

    #[derive(Debug, PartialEq)]
    enum FakeError {
        Throttled,
        Other,
        Opaque,
    }

    impl Display for FakeError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{self:?}")
        }
    }

    impl ProviderMessage for FakeError {
        fn provider_message(&self) -> Option<&str> {
            match self {
                FakeError::Throttled => Some("Rate limit exceeded"),
                FakeError::Other => Some("Sorry, that page does not exist"),
                FakeError::Opaque => None,
            }
        }
    }

    #[derive(Default)]
    struct RecordingSleeper {
        sleeps: RefCell<Vec<Duration>>,
    }

    impl Sleeper for RecordingSleeper {
        fn sleep(&self, duration: Duration) {
            self.sleeps.borrow_mut().push(duration);
        }
    }

    fn invoker() -> ThrottledInvoker<MessageClassifier, RecordingSleeper> {
        ThrottledInvoker::default().with_sleeper(RecordingSleeper::default())
    }

    #[test]
    fn test_backoff_delay_doubles() {
        let base = Duration::from_secs(5);
        assert_eq!(backoff_delay(base, 0), Duration::from_secs(5));
        assert_eq!(backoff_delay(base, 1), Duration::from_secs(10));
        assert_eq!(backoff_delay(base, 5), Duration::from_secs(160));
    }

    #[test]
    fn test_backoff_delay_saturates() {
        let delay = backoff_delay(Duration::from_secs(5), 40);
        assert_eq!(delay, Duration::from_secs(5).saturating_mul(u32::MAX));
    }

    #[test]
    fn test_jittered_delay_saturates() {
        let config = ThrottleConfig {
            max_retries: 6,
            base_delay: Duration::from_secs(u64::MAX),
            max_jitter: Some(Duration::from_millis(10)),
        };
        assert_eq!(config.delay_for(1), Duration::MAX);
        assert_eq!(config.max_delay_for(5), Duration::MAX);
    }

    #[test]
    fn test_max_delay_for_includes_jitter_bound() {
        let mut config = ThrottleConfig::default();
        assert_eq!(config.max_delay_for(2), Duration::from_secs(20));
        config.max_jitter = Some(Duration::from_millis(500));
        assert_eq!(config.max_delay_for(2), Duration::from_millis(20_500));
    }

    #[test]
    fn test_cumulative_delay() {
        let base = Duration::from_secs(5);
        assert_eq!(cumulative_delay(base, 0), Duration::ZERO);
        assert_eq!(cumulative_delay(base, 3), Duration::from_secs(35));
        assert_eq!(cumulative_delay(base, 6), Duration::from_secs(315));
    }

    #[test]
    fn test_default_schedule() {
        let secs: Vec<u64> = ThrottleConfig::default()
            .schedule()
            .iter()
            .map(Duration::as_secs)
            .collect();
        assert_eq!(secs, vec![5, 10, 20, 40, 80, 160]);
    }

    #[test]
    fn test_jitter_stays_within_bound() {
        let config = ThrottleConfig {
            max_retries: 3,
            base_delay: Duration::from_millis(100),
            max_jitter: Some(Duration::from_millis(50)),
        };
        for _ in 0..100 {
            let delay = config.delay_for(1);
            assert!(delay >= Duration::from_millis(200));
            assert!(delay <= Duration::from_millis(250));
        }
    }

    #[test]
    fn test_message_classifier() {
        let classifier = MessageClassifier::rate_limit_exceeded();
        assert!(classifier.is_throttled(&FakeError::Throttled));
        assert!(!classifier.is_throttled(&FakeError::Other));
        assert!(!classifier.is_throttled(&FakeError::Opaque));

        let custom = MessageClassifier::new("Sorry, that page does not exist");
        assert!(custom.is_throttled(&FakeError::Other));
        assert!(!custom.is_throttled(&FakeError::Throttled));
    }

    #[test]
    fn test_closure_classifier() {
        let invoker = ThrottledInvoker::new(ThrottleConfig::default(), |e: &FakeError| {
            *e == FakeError::Opaque
        })
        .with_sleeper(RecordingSleeper::default());

        let calls = Cell::new(0);
        let result = invoker.invoke("opaque", || {
            calls.set(calls.get() + 1);
            if calls.get() == 1 {
                Err(FakeError::Opaque)
            } else {
                Ok("done")
            }
        });

        assert_eq!(result, Ok("done"));
        assert_eq!(*invoker.sleeper().sleeps.borrow(), vec![Duration::from_secs(5)]);
    }

    #[test]
    fn test_opaque_error_propagates_without_retry() {
        let invoker = invoker();
        let calls = Cell::new(0);
        let result: Result<(), _> = invoker.invoke("opaque", || {
            calls.set(calls.get() + 1);
            Err(FakeError::Opaque)
        });

        assert_eq!(result, Err(FakeError::Opaque));
        assert_eq!(calls.get(), 1);
        assert!(invoker.sleeper().sleeps.borrow().is_empty());
    }

    #[test]
    fn test_zero_retries_makes_single_attempt() {
        let invoker = ThrottledInvoker::new(
            ThrottleConfig {
                max_retries: 0,
                ..ThrottleConfig::default()
            },
            MessageClassifier::default(),
        )
        .with_sleeper(RecordingSleeper::default());

        let calls = Cell::new(0);
        let result: Result<(), _> = invoker.invoke("never", || {
            calls.set(calls.get() + 1);
            Err(FakeError::Throttled)
        });

        assert_eq!(result, Err(FakeError::Throttled));
        assert_eq!(calls.get(), 1);
        assert!(invoker.sleeper().sleeps.borrow().is_empty());
    }
}
