use futures_util::future::join_all;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, warn};

use super::{canonical, digest};
use crate::config::Config;
use crate::error::{FingerprintError, ProbeError};
use crate::probe::Probe;
use crate::types::{DigestAlgorithm, Fingerprint, FingerprintVector, ProbeOutcome, ProbeResult};

pub const DEFAULT_SENTINEL: &str = "unavailable";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(1000);
pub const DEFAULT_SHA256_LEN: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorConfig {
    pub sentinel: String,
    pub default_timeout: Duration,
    pub algorithm: DigestAlgorithm,
    pub sha256_len: usize,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            sentinel: DEFAULT_SENTINEL.to_string(),
            default_timeout: DEFAULT_TIMEOUT,
            algorithm: DigestAlgorithm::default(),
            sha256_len: DEFAULT_SHA256_LEN,
        }
    }
}

impl Fingerprint {
    /// Digest an already collected vector. Pure and synchronous.
    pub fn from_vector(vector: &FingerprintVector, config: &GeneratorConfig) -> Self {
        let encoded = canonical::encode_vector(vector, &config.sentinel);
        Self {
            algorithm: config.algorithm,
            hex: digest::digest(&encoded, config.algorithm, config.sha256_len),
        }
    }
}

/// Runs probes and reduces their results to a [`Fingerprint`].
///
/// Stateless between calls: nothing is cached and every call builds a fresh
/// vector.
#[derive(Debug, Clone, Default)]
pub struct Generator {
    config: GeneratorConfig,
}

impl Generator {
    pub fn new(config: GeneratorConfig) -> Self {
        Self { config }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.generator_config())
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Run every probe and digest the results.
    ///
    /// Only an empty list, a duplicate name or an unusable sentinel is an
    /// error, and it is reported before any probe runs.
    pub async fn generate(&self, probes: &[Arc<dyn Probe>]) -> Result<Fingerprint, FingerprintError> {
        let vector = self.collect(probes).await?;
        let fingerprint = Fingerprint::from_vector(&vector, &self.config);

        debug!(
            "Fingerprint {} from {} probes ({} failed)",
            fingerprint.hex,
            vector.len(),
            vector.failed_count()
        );

        Ok(fingerprint)
    }

    /// Run every probe concurrently and return their results in
    /// registration order.
    ///
    /// The sentinel and the probe list are checked before anything runs.
    pub async fn collect(&self, probes: &[Arc<dyn Probe>]) -> Result<FingerprintVector, FingerprintError> {
        canonical::validate_sentinel(&self.config.sentinel)?;
        validate(probes)?;

        let slots = probes.iter().map(|probe| {
            let limit = probe.timeout().unwrap_or(self.config.default_timeout);
            run_isolated(probe.clone(), limit)
        });

        Ok(FingerprintVector {
            results: join_all(slots).await,
        })
    }
}

fn validate(probes: &[Arc<dyn Probe>]) -> Result<(), FingerprintError> {
    if probes.is_empty() {
        return Err(FingerprintError::InvalidInput("probe list is empty".to_string()));
    }

    let mut seen = HashSet::with_capacity(probes.len());
    for probe in probes {
        if !seen.insert(probe.name()) {
            return Err(FingerprintError::InvalidInput(format!(
                "duplicate probe name '{}'",
                probe.name()
            )));
        }
    }

    Ok(())
}

/// Run one probe on its own task with a hard deadline.
///
/// A panic inside the probe surfaces as a `JoinError` and becomes
/// `Faulted`. On timeout the task is aborted so the probe future, and
/// whatever it holds, is dropped.
async fn run_isolated(probe: Arc<dyn Probe>, limit: Duration) -> ProbeResult {
    let name = probe.name().to_string();
    let mut handle = tokio::spawn(async move { probe.run().await });

    let outcome = match timeout(limit, &mut handle).await {
        Ok(Ok(result)) => ProbeOutcome::from(result),
        Ok(Err(join_err)) => ProbeOutcome::Failed(ProbeError::Faulted(join_err.to_string())),
        Err(_) => {
            handle.abort();
            ProbeOutcome::Failed(ProbeError::Timeout(limit))
        }
    };

    match &outcome {
        ProbeOutcome::Ok(value) => debug!("Probe {} -> {}", name, value),
        ProbeOutcome::Failed(e @ (ProbeError::Timeout(_) | ProbeError::Faulted(_))) => {
            warn!("Probe {} failed: {}", name, e)
        }
        ProbeOutcome::Failed(e) => debug!("Probe {} failed: {}", name, e),
    }

    ProbeResult { name, outcome }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::{DelayedProbe, FixedProbe, FnProbe};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn fixed(name: &str, value: &str) -> Arc<dyn Probe> {
        Arc::new(FixedProbe::new(name, value))
    }

    fn failing(name: &str) -> Arc<dyn Probe> {
        Arc::new(FixedProbe::failing(name, ProbeError::Unavailable("absent".to_string())))
    }

    fn delayed(probe: Arc<dyn Probe>, ms: u64) -> Arc<dyn Probe> {
        Arc::new(DelayedProbe::new(probe, Duration::from_millis(ms)))
    }

    fn sha_generator() -> Generator {
        Generator::default()
    }

    #[tokio::test]
    async fn test_generate_is_deterministic() {
        let probes = vec![fixed("screen", "1920x1080"), fixed("locale", "en-US"), fixed("cores", "8")];
        let generator = sha_generator();

        let first = generator.generate(&probes).await.unwrap();
        let second = generator.generate(&probes).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first.hex.len(), DEFAULT_SHA256_LEN);
    }

    #[tokio::test]
    async fn test_concrete_scenario() {
        let generator = sha_generator();

        let full = vec![fixed("screen", "1920x1080"), fixed("locale", "en-US"), fixed("cores", "8")];
        let degraded = vec![fixed("screen", "1920x1080"), fixed("locale", "en-US"), failing("cores")];

        let v1 = generator.collect(&full).await.unwrap();
        let v2 = generator.collect(&degraded).await.unwrap();
        assert_eq!(canonical::encode_vector(&v1, DEFAULT_SENTINEL), "1920x1080|en-US|8");
        assert_eq!(canonical::encode_vector(&v2, DEFAULT_SENTINEL), "1920x1080|en-US|unavailable");

        let d1 = generator.generate(&full).await.unwrap();
        let d2 = generator.generate(&degraded).await.unwrap();
        assert_eq!(d1.hex, digest::sha256_truncated("1920x1080|en-US|8", DEFAULT_SHA256_LEN));
        assert_ne!(d1, d2);
    }

    #[tokio::test]
    async fn test_every_single_change_moves_digest() {
        let generator = Generator::new(GeneratorConfig {
            algorithm: DigestAlgorithm::Rolling32,
            ..GeneratorConfig::default()
        });
        let base = vec![fixed("a", "1"), fixed("b", "2"), fixed("c", "3")];
        let base_fp = generator.generate(&base).await.unwrap();

        for i in 0..base.len() {
            let mut changed = base.clone();
            changed[i] = failing(base[i].name());
            let fp = generator.generate(&changed).await.unwrap();
            assert_ne!(fp, base_fp, "failing slot {} did not change the digest", i);
        }
    }

    #[tokio::test]
    async fn test_sentinel_valued_probe_differs_from_failure() {
        let generator = sha_generator();
        let real = generator.generate(&[fixed("x", DEFAULT_SENTINEL)]).await.unwrap();
        let failed = generator.generate(&[failing("x")]).await.unwrap();
        assert_ne!(real, failed);
    }

    #[tokio::test]
    async fn test_all_failing_still_yields_fingerprint() {
        let probes = vec![failing("a"), failing("b"), failing("c")];

        for algorithm in [DigestAlgorithm::Sha256, DigestAlgorithm::Rolling32] {
            let generator = Generator::new(GeneratorConfig {
                algorithm,
                ..GeneratorConfig::default()
            });
            let first = generator.generate(&probes).await.unwrap();
            let second = generator.generate(&probes).await.unwrap();
            assert_eq!(first, second);
            assert!(first.hex.chars().all(|c| c.is_ascii_hexdigit()));
        }
    }

    #[tokio::test]
    async fn test_empty_list_is_invalid() {
        let err = sha_generator().generate(&[]).await.unwrap_err();
        assert!(matches!(err, FingerprintError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_duplicate_name_rejected_before_running() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let counting: Arc<dyn Probe> = Arc::new(FnProbe::new("cores", move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok("8".to_string())
        }));

        let probes = vec![counting, fixed("screen", "1920x1080"), fixed("screen", "800x600")];
        let err = sha_generator().generate(&probes).await.unwrap_err();

        assert!(matches!(err, FingerprintError::InvalidInput(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_completion_order_does_not_matter() {
        let generator = sha_generator();

        let early_first = vec![
            delayed(fixed("a", "1"), 10),
            delayed(failing("b"), 200),
            delayed(fixed("c", "3"), 300),
        ];
        let late_first = vec![
            delayed(fixed("a", "1"), 300),
            delayed(failing("b"), 10),
            delayed(fixed("c", "3"), 100),
        ];

        let fp1 = generator.generate(&early_first).await.unwrap();
        let fp2 = generator.generate(&late_first).await.unwrap();
        assert_eq!(fp1, fp2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_probe_times_out_at_its_bound() {
        let generator = sha_generator();
        let slow: Arc<dyn Probe> = Arc::new(
            DelayedProbe::new(fixed("audio", "35.73"), Duration::from_millis(500))
                .with_timeout(Duration::from_millis(50)),
        );
        let probes = vec![fixed("screen", "1920x1080"), slow];

        let start = tokio::time::Instant::now();
        let vector = generator.collect(&probes).await.unwrap();
        let elapsed = start.elapsed();

        assert_eq!(
            vector.results[1].outcome,
            ProbeOutcome::Failed(ProbeError::Timeout(Duration::from_millis(50)))
        );
        assert!(elapsed < Duration::from_millis(100), "took {:?}", elapsed);

        let degraded = generator
            .generate(&[fixed("screen", "1920x1080"), failing("audio")])
            .await
            .unwrap();
        assert_eq!(Fingerprint::from_vector(&vector, generator.config()), degraded);
    }

    #[tokio::test(start_paused = true)]
    async fn test_default_timeout_applies() {
        let generator = Generator::new(GeneratorConfig {
            default_timeout: Duration::from_millis(20),
            ..GeneratorConfig::default()
        });
        let probes = vec![delayed(fixed("hung", "x"), 60_000)];
        let vector = generator.collect(&probes).await.unwrap();
        assert_eq!(vector.failed_count(), 1);
    }

    #[tokio::test]
    async fn test_panicking_probe_is_isolated() {
        let boom: Arc<dyn Probe> = Arc::new(FnProbe::new("gpu", || panic!("driver exploded")));
        let probes = vec![fixed("screen", "1920x1080"), boom, fixed("cores", "8")];

        let vector = sha_generator().collect(&probes).await.unwrap();

        assert_eq!(vector.results[0].outcome, ProbeOutcome::Ok("1920x1080".to_string()));
        assert!(matches!(vector.results[1].outcome, ProbeOutcome::Failed(ProbeError::Faulted(_))));
        assert_eq!(vector.results[2].outcome, ProbeOutcome::Ok("8".to_string()));
    }

    #[tokio::test]
    async fn test_blocking_closure_times_out_at_its_bound() {
        let blocking: Arc<dyn Probe> = Arc::new(
            FnProbe::new("audio", || {
                std::thread::sleep(Duration::from_millis(500));
                Ok("x".to_string())
            })
            .with_timeout(Duration::from_millis(50)),
        );
        let probes = vec![fixed("screen", "1920x1080"), blocking];

        let start = std::time::Instant::now();
        let vector = sha_generator().collect(&probes).await.unwrap();
        let elapsed = start.elapsed();

        assert_eq!(vector.results[0].outcome, ProbeOutcome::Ok("1920x1080".to_string()));
        assert_eq!(
            vector.results[1].outcome,
            ProbeOutcome::Failed(ProbeError::Timeout(Duration::from_millis(50)))
        );
        assert!(elapsed < Duration::from_millis(250), "took {:?}", elapsed);
    }

    #[tokio::test]
    async fn test_unusable_sentinel_rejected_before_running() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let counting: Arc<dyn Probe> = Arc::new(FnProbe::new("x", move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok("a".to_string())
        }));

        for sentinel in ["a|b", "a\\b", ""] {
            let generator = Generator::new(GeneratorConfig {
                sentinel: sentinel.to_string(),
                ..GeneratorConfig::default()
            });
            let err = generator.generate(&[counting.clone()]).await.unwrap_err();
            assert!(matches!(err, FingerprintError::InvalidInput(_)), "sentinel {:?}", sentinel);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_custom_sentinel_is_used() {
        let generator = Generator::new(GeneratorConfig {
            sentinel: "n/a".to_string(),
            ..GeneratorConfig::default()
        });
        let vector = generator.collect(&[fixed("a", "1"), failing("b")]).await.unwrap();
        assert_eq!(canonical::encode_vector(&vector, &generator.config().sentinel), "1|n/a");
    }
}
