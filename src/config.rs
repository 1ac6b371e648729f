//! Настройки регистров: где лежат сегменты и как часто проверять декогеренцию.

use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Каталог сегментов (переопределяет путь по умолчанию)
pub const ENV_SHM_DIR: &str = "QUBIT_SHM_DIR";
/// Интервал опроса монитора декогеренции, мс
pub const ENV_POLL_INTERVAL_MS: &str = "QUBIT_POLL_INTERVAL_MS";
/// Таймаут декогеренции по умолчанию, мс
pub const ENV_DECOHERE_TIMEOUT_MS: &str = "QUBIT_DECOHERE_TIMEOUT_MS";

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);
pub const DEFAULT_DECOHERE_TIMEOUT: Duration = Duration::from_millis(5000);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterConfig {
    /// Каталог, в котором имя регистра становится файлом сегмента.
    /// На Linux это `/dev/shm`, то есть то же пространство имен, что у `shm_open`.
    pub segment_dir: PathBuf,
    pub poll_interval: Duration,
    pub default_timeout: Duration,
}

impl Default for RegisterConfig {
    fn default() -> Self {
        Self {
            segment_dir: default_segment_dir(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            default_timeout: DEFAULT_DECOHERE_TIMEOUT,
        }
    }
}

impl RegisterConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Значения по умолчанию, переопределенные переменными окружения.
    /// Нечисловые и нулевые интервалы игнорируются.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(dir) = env::var_os(ENV_SHM_DIR).filter(|d| !d.is_empty()) {
            config.segment_dir = PathBuf::from(dir);
        }
        if let Some(interval) = env::var(ENV_POLL_INTERVAL_MS).ok().and_then(|v| parse_millis(&v)) {
            config.poll_interval = interval;
        }
        if let Some(timeout) = env::var(ENV_DECOHERE_TIMEOUT_MS).ok().and_then(|v| parse_millis(&v)) {
            config.default_timeout = timeout;
        }
        config
    }

    pub fn with_segment_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.segment_dir = dir.into();
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    pub fn segment_dir(&self) -> &Path {
        &self.segment_dir
    }

    /// Путь к файлу сегмента. Имя должно быть уже проверено.
    pub fn segment_path(&self, name: &str) -> PathBuf {
        self.segment_dir.join(name)
    }
}

fn default_segment_dir() -> PathBuf {
    if cfg!(target_os = "linux") {
        PathBuf::from("/dev/shm")
    } else {
        env::temp_dir()
    }
}

fn parse_millis(raw: &str) -> Option<Duration> {
    raw.trim()
        .parse::<u64>()
        .ok()
        .filter(|&ms| ms > 0)
        .map(Duration::from_millis)
}
