use std::env;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_parse<T: FromStr>(profile: &str, key: &str, default: T) -> T {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub engine: EngineConfig,
    pub guard: GuardConfig,
    pub alerts: AlertConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `FRAUDLENS_PROFILE`. When set (e.g. `STRICT`),
    /// every key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env_or("FRAUDLENS_PROFILE", "").to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Self {
            profile: p.to_string(),
            engine: EngineConfig::from_env_profiled(p),
            guard: GuardConfig::from_env_profiled(p),
            alerts: AlertConfig::from_env_profiled(p),
        }
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Print a summary for startup logs.
    pub fn log_summary(&self) {
        let e = &self.engine;
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!(
            "  engine:      workers={}, seed={}, weights={:.2}/{:.2}/{:.2}",
            e.resolved_worker_threads(),
            e.seed,
            e.weights.density,
            e.weights.cluster,
            e.weights.reconstruction
        );
        tracing::info!(
            "  detectors:   trees={}, eps={}, min_points={}, epochs={}",
            e.density.trees,
            e.cluster.eps,
            e.cluster.min_points,
            e.reconstruction.epochs
        );
        tracing::info!(
            "  guard:       error_limit={}, timeout={}ms",
            self.guard.error_limit,
            self.guard.timeout_ms
        );
        tracing::info!(
            "  alerts:      priority>={}, confidence>={}",
            self.alerts.priority_threshold,
            self.alerts.confidence_threshold
        );
    }
}

// ── Engine ────────────────────────────────────────────────────

/// Relative trust in each detector family when combining scores.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnsembleWeights {
    pub density: f64,
    pub cluster: f64,
    pub reconstruction: f64,
}

impl Default for EnsembleWeights {
    fn default() -> Self {
        Self {
            density: 0.5,
            cluster: 0.3,
            reconstruction: 0.2,
        }
    }
}

/// Isolation-forest parameters for the density scorer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DensityConfig {
    pub trees: usize,
    /// Rows sampled per tree (capped at the batch size).
    pub sample_size: usize,
}

impl Default for DensityConfig {
    fn default() -> Self {
        Self {
            trees: 100,
            sample_size: 256,
        }
    }
}

/// DBSCAN parameters for the cluster-outlier scorer (standardized space).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    pub eps: f64,
    pub min_points: usize,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            eps: 0.5,
            min_points: 5,
        }
    }
}

/// Autoencoder parameters for the reconstruction-error scorer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconstructionConfig {
    /// Bottleneck width as a fraction of the feature count.
    pub hidden_ratio: f64,
    pub epochs: usize,
    pub learning_rate: f64,
    pub batch_size: usize,
}

impl Default for ReconstructionConfig {
    fn default() -> Self {
        Self {
            hidden_ratio: 0.5,
            epochs: 50,
            learning_rate: 0.01,
            batch_size: 32,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Worker pool size. 0 = available parallelism.
    pub worker_threads: usize,
    /// Seed for every stochastic detector, so a snapshot scores deterministically.
    pub seed: u64,
    pub weights: EnsembleWeights,
    /// Batches with fewer rows than this count as "small".
    pub small_batch_rows: usize,
    /// Threshold percentile for small batches.
    pub small_batch_percentile: f64,
    /// Threshold percentile for everything else.
    pub large_batch_percentile: f64,
    /// Percentile at which each detector casts its own vote for method agreement.
    pub agreement_percentile: f64,
    pub min_samples_small: usize,
    pub min_samples_large: usize,
    /// Advisory processing budget per batch, reported but never enforced.
    pub processing_target_ms: u64,
    /// Size of the rolling performance window.
    pub performance_window: usize,
    pub density: DensityConfig,
    pub cluster: ClusterConfig,
    pub reconstruction: ReconstructionConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            worker_threads: 0,
            seed: 42,
            weights: EnsembleWeights::default(),
            small_batch_rows: 50,
            small_batch_percentile: 80.0,
            large_batch_percentile: 90.0,
            agreement_percentile: 90.0,
            min_samples_small: 5,
            min_samples_large: 10,
            processing_target_ms: 5_000,
            performance_window: 100,
            density: DensityConfig::default(),
            cluster: ClusterConfig::default(),
            reconstruction: ReconstructionConfig::default(),
        }
    }
}

impl EngineConfig {
    fn from_env_profiled(p: &str) -> Self {
        let d = Self::default();
        Self {
            worker_threads: profiled_env_parse(p, "DETECT_WORKER_THREADS", d.worker_threads),
            seed: profiled_env_parse(p, "DETECT_SEED", d.seed),
            weights: EnsembleWeights {
                density: profiled_env_parse(p, "WEIGHT_DENSITY", d.weights.density),
                cluster: profiled_env_parse(p, "WEIGHT_CLUSTER", d.weights.cluster),
                reconstruction: profiled_env_parse(
                    p,
                    "WEIGHT_RECONSTRUCTION",
                    d.weights.reconstruction,
                ),
            },
            small_batch_rows: profiled_env_parse(p, "SMALL_BATCH_ROWS", d.small_batch_rows),
            small_batch_percentile: profiled_env_parse(
                p,
                "SMALL_BATCH_PERCENTILE",
                d.small_batch_percentile,
            ),
            large_batch_percentile: profiled_env_parse(
                p,
                "LARGE_BATCH_PERCENTILE",
                d.large_batch_percentile,
            ),
            agreement_percentile: profiled_env_parse(
                p,
                "AGREEMENT_PERCENTILE",
                d.agreement_percentile,
            ),
            min_samples_small: profiled_env_parse(p, "MIN_SAMPLES_SMALL", d.min_samples_small),
            min_samples_large: profiled_env_parse(p, "MIN_SAMPLES_LARGE", d.min_samples_large),
            processing_target_ms: profiled_env_parse(
                p,
                "PROCESSING_TARGET_MS",
                d.processing_target_ms,
            ),
            performance_window: profiled_env_parse(p, "PERFORMANCE_WINDOW", d.performance_window),
            density: DensityConfig {
                trees: profiled_env_parse(p, "DENSITY_TREES", d.density.trees),
                sample_size: profiled_env_parse(p, "DENSITY_SAMPLE_SIZE", d.density.sample_size),
            },
            cluster: ClusterConfig {
                eps: profiled_env_parse(p, "CLUSTER_EPS", d.cluster.eps),
                min_points: profiled_env_parse(p, "CLUSTER_MIN_POINTS", d.cluster.min_points),
            },
            reconstruction: ReconstructionConfig {
                hidden_ratio: profiled_env_parse(
                    p,
                    "RECON_HIDDEN_RATIO",
                    d.reconstruction.hidden_ratio,
                ),
                epochs: profiled_env_parse(p, "RECON_EPOCHS", d.reconstruction.epochs),
                learning_rate: profiled_env_parse(
                    p,
                    "RECON_LEARNING_RATE",
                    d.reconstruction.learning_rate,
                ),
                batch_size: profiled_env_parse(p, "RECON_BATCH_SIZE", d.reconstruction.batch_size),
            },
        }
    }

    /// Resolve worker thread count (0 means use available parallelism).
    pub fn resolved_worker_threads(&self) -> usize {
        if self.worker_threads == 0 {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4)
        } else {
            self.worker_threads
        }
    }

    pub fn is_small_batch(&self, rows: usize) -> bool {
        rows < self.small_batch_rows
    }

    /// Minimum number of rows a batch of `rows` must carry.
    pub fn required_samples(&self, rows: usize) -> usize {
        if self.is_small_batch(rows) {
            self.min_samples_small
        } else {
            self.min_samples_large
        }
    }

    /// Adaptive threshold percentile: small batches use a more sensitive cut-off.
    pub fn threshold_percentile(&self, rows: usize) -> f64 {
        if self.is_small_batch(rows) {
            self.small_batch_percentile
        } else {
            self.large_batch_percentile
        }
    }
}

// ── Reliability guard ─────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardConfig {
    /// Consecutive failures that open the circuit.
    pub error_limit: u32,
    /// Cool-down after the last failure before the circuit closes again.
    pub timeout_ms: u64,
    /// Clear the failure counter on every successful detection.
    pub reset_on_success: bool,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            error_limit: 5,
            timeout_ms: 300_000,
            reset_on_success: false,
        }
    }
}

impl GuardConfig {
    fn from_env_profiled(p: &str) -> Self {
        let d = Self::default();
        Self {
            error_limit: profiled_env_parse(p, "GUARD_ERROR_LIMIT", d.error_limit),
            timeout_ms: profiled_env_parse(p, "GUARD_TIMEOUT_MS", d.timeout_ms),
            reset_on_success: profiled_env_parse(p, "GUARD_RESET_ON_SUCCESS", d.reset_on_success),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

// ── Alerts ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// Minimum fraud probability for an alert.
    pub priority_threshold: f64,
    /// Minimum overall confidence for an alert.
    pub confidence_threshold: f64,
    /// Fraud probability at which an alert escalates to critical.
    pub critical_threshold: f64,
    /// Fraud probability at which auto-blocking is recommended.
    pub auto_block_threshold: f64,
    /// False-positive likelihood at which even auto-blocked alerts need review.
    pub investigation_fp_threshold: f64,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            priority_threshold: 0.9,
            confidence_threshold: 0.7,
            critical_threshold: 0.95,
            auto_block_threshold: 0.98,
            investigation_fp_threshold: 0.3,
        }
    }
}

impl AlertConfig {
    fn from_env_profiled(p: &str) -> Self {
        let d = Self::default();
        Self {
            priority_threshold: profiled_env_parse(p, "ALERT_PRIORITY_THRESHOLD", d.priority_threshold),
            confidence_threshold: profiled_env_parse(
                p,
                "ALERT_CONFIDENCE_THRESHOLD",
                d.confidence_threshold,
            ),
            critical_threshold: profiled_env_parse(p, "ALERT_CRITICAL_THRESHOLD", d.critical_threshold),
            auto_block_threshold: profiled_env_parse(
                p,
                "ALERT_AUTO_BLOCK_THRESHOLD",
                d.auto_block_threshold,
            ),
            investigation_fp_threshold: profiled_env_parse(
                p,
                "ALERT_INVESTIGATION_FP_THRESHOLD",
                d.investigation_fp_threshold,
            ),
        }
    }
}
