//! Регистр кубита в именованной разделяемой памяти.
//!
//! Каждый экземпляр владеет своим отображением сегмента, своим замком и
//! своим монитором декогеренции. Замок живет в памяти процесса, а не в
//! сегменте: он упорядочивает операции только внутри одного экземпляра.
//! Другие процессы (и другие экземпляры с тем же именем) пишут в ту же
//! запись без синхронизации, возможны рваные записи.

use std::fmt;
use std::f64::consts::FRAC_1_SQRT_2;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use log::{debug, info, warn};
use num_complex::Complex64;
use once_cell::sync::Lazy;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::config::RegisterConfig;
use super::clock;
use super::decoherence::DecoherenceMonitor;
use super::entanglement::{self, normalize_links};
use super::error::QubitResult;
use super::gates::Gate;
use super::measurement;
use super::record::{CollapseStatus, Outcome, StateRecord};
use super::segment::{self, validate_name, Segment};
use super::snapshot::QubitSnapshot;

/// Допуск, с которым |a0|² + |a1|² считается единицей
pub const NORM_TOLERANCE: f64 = 1e-9;

static DEFAULT_CONFIG: Lazy<RegisterConfig> = Lazy::new(RegisterConfig::from_env);

pub(crate) struct Inner {
    segment: Segment,
    rng: StdRng,
}

/// Общая часть экземпляра: ее держат и регистр, и поток монитора,
/// поэтому отображение не снимается, пока монитор жив.
pub(crate) struct RegisterCore {
    name: String,
    config: RegisterConfig,
    timeout_ms: u64,
    inner: Mutex<Inner>,
}

impl RegisterCore {
    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    // Запись - простые данные, инвариантов поверх паники не держим
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Измерение под уже взятым замком; распространение только при новом коллапсе
    fn measure_locked(&self, inner: &mut Inner) -> Outcome {
        let Inner { segment, rng } = inner;
        let (outcome, collapsed_now) =
            measurement::collapse(segment.record_mut(), rng, clock::now_ms(), self.timeout_ms);
        if collapsed_now {
            let links = segment.record().links();
            entanglement::propagate(&self.config, &self.name, &links, outcome);
        }
        outcome
    }

    /// Один тик монитора
    pub(crate) fn decohere_if_expired(&self) -> Option<Outcome> {
        let mut inner = self.lock();
        if !inner.segment.record().is_expired(clock::now_ms()) {
            return None;
        }
        let outcome = self.measure_locked(&mut inner);
        info!("Кубит '{}' декогерировал в |{}>", self.name, outcome);
        Some(outcome)
    }
}

pub struct SharedRegister {
    core: Arc<RegisterCore>,
    owner_task_id: u32,
    decohere_timeout: Duration,
    monitor: Option<DecoherenceMonitor>,
}

impl SharedRegister {
    /// Открывает регистр в каталоге из окружения (`QUBIT_SHM_DIR`, по умолчанию `/dev/shm`)
    pub fn open_or_create(name: &str, owner_task_id: u32, decohere_timeout: Duration) -> QubitResult<Self> {
        Self::open_with(&DEFAULT_CONFIG, name, owner_task_id, decohere_timeout)
    }

    /// То же, с таймаутом декогеренции из конфигурации
    pub fn open(name: &str, owner_task_id: u32) -> QubitResult<Self> {
        Self::open_with(&DEFAULT_CONFIG, name, owner_task_id, DEFAULT_CONFIG.default_timeout)
    }

    /// Отображает сегмент `name`, создавая его при отсутствии.
    ///
    /// Запись того же владельца переиспользуется как есть; запись другого
    /// владельца сбрасывается в свежее состояние. Ошибка отображения
    /// (`StorageUnavailable`) для процесса фатальна, повторов нет.
    pub fn open_with(
        config: &RegisterConfig,
        name: &str,
        owner_task_id: u32,
        decohere_timeout: Duration,
    ) -> QubitResult<Self> {
        let name = validate_name(name)?;
        let timeout_ms = duration_ms(decohere_timeout);
        let (mut segment, created) = Segment::open_or_create(config, name)?;

        let record = segment.record_mut();
        if created || record.owner_task_id != owner_task_id {
            if !created {
                debug!(
                    "Кубит '{}': владелец {} -> {}, запись сброшена",
                    name, record.owner_task_id, owner_task_id
                );
            }
            *record = StateRecord::fresh(owner_task_id);
            record.touch(clock::now_ms(), timeout_ms);
        }
        debug!("Кубит '{}' отображен из {}", name, segment.path().display());

        let core = Arc::new(RegisterCore {
            name: name.to_string(),
            config: config.clone(),
            timeout_ms,
            inner: Mutex::new(Inner {
                segment,
                rng: StdRng::from_entropy(),
            }),
        });
        let monitor = DecoherenceMonitor::start(Arc::clone(&core), config.poll_interval)?;

        Ok(Self {
            core,
            owner_task_id,
            decohere_timeout,
            monitor: Some(monitor),
        })
    }

    pub fn name(&self) -> &str {
        self.core.name()
    }

    pub fn owner_task_id(&self) -> u32 {
        self.owner_task_id
    }

    pub fn decohere_timeout(&self) -> Duration {
        self.decohere_timeout
    }

    pub fn config(&self) -> &RegisterConfig {
        &self.core.config
    }

    /// Выполняет `f` над записью под замком экземпляра.
    /// Замок отпускается на любом выходе, в том числе при панике в `f`.
    pub fn with_lock<R>(&self, f: impl FnOnce(&mut StateRecord) -> R) -> R {
        let mut inner = self.core.lock();
        f(inner.segment.record_mut())
    }

    fn read<R>(&self, f: impl FnOnce(&StateRecord) -> R) -> R {
        let inner = self.core.lock();
        f(inner.segment.record())
    }

    /// Произвольные амплитуды без нормировки; статус -> суперпозиция.
    /// Связи не трогает.
    pub fn set_state(&self, amplitude0: Complex64, amplitude1: Complex64) {
        let norm = amplitude0.norm_sqr() + amplitude1.norm_sqr();
        if (norm - 1.0).abs() > NORM_TOLERANCE {
            debug!("Кубит '{}': ненормированные амплитуды, |a0|²+|a1|² = {}", self.name(), norm);
        }
        let timeout_ms = self.core.timeout_ms;
        self.with_lock(|record| {
            record.set_amplitudes(amplitude0, amplitude1);
            record.set_status(CollapseStatus::Superposed);
            record.touch(clock::now_ms(), timeout_ms);
        });
    }

    /// Равная суперпозиция (|0> + |1>)/√2 со сброшенными связями
    pub fn init_superposition(&self) {
        let equal = Complex64::new(FRAC_1_SQRT_2, 0.0);
        let timeout_ms = self.core.timeout_ms;
        self.with_lock(|record| {
            record.set_amplitudes(equal, equal);
            record.set_status(CollapseStatus::Superposed);
            record.clear_links();
            record.touch(clock::now_ms(), timeout_ms);
        });
    }

    /// Применяет гейт к суперпозиции и перезапускает отсчет декогеренции.
    /// После коллапса ничего не делает и возвращает false.
    pub fn apply_gate(&self, gate: Gate) -> bool {
        let timeout_ms = self.core.timeout_ms;
        self.with_lock(|record| {
            if record.status().is_collapsed() {
                return false;
            }
            let (amplitude0, amplitude1) = record.amplitudes();
            let (amplitude0, amplitude1) = gate.apply(amplitude0, amplitude1);
            record.set_amplitudes(amplitude0, amplitude1);
            record.touch(clock::now_ms(), timeout_ms);
            true
        })
    }

    /// Гейт по символу. Неизвестный символ логируется и запись не меняет.
    pub fn apply_gate_symbol(&self, symbol: char) -> QubitResult<bool> {
        match Gate::from_symbol(symbol) {
            Ok(gate) => Ok(self.apply_gate(gate)),
            Err(e) => {
                warn!("Кубит '{}': {}", self.name(), e);
                Err(e)
            }
        }
    }

    /// Заменяет таблицу связей. Возвращает число сохраненных пиров (не больше 4).
    pub fn entangle<S: AsRef<str>>(&self, peers: &[S]) -> usize {
        let links = normalize_links(self.name(), peers);
        self.with_lock(|record| record.set_links(&links));
        links.len()
    }

    pub fn links(&self) -> Vec<String> {
        self.read(|record| record.links())
    }

    /// Измерение. Для коллапсированной записи - чистое чтение.
    pub fn measure(&self) -> Outcome {
        let mut inner = self.core.lock();
        self.core.measure_locked(&mut inner)
    }

    /// Принудительный коллапс пиров из таблицы связей; возвращает число достигнутых
    pub fn propagate(&self, outcome: Outcome) -> usize {
        let links = self.links();
        entanglement::propagate(self.config(), self.name(), &links, outcome)
    }

    pub fn is_measured(&self) -> bool {
        self.status().is_collapsed()
    }

    pub fn measurement(&self) -> Option<Outcome> {
        self.status().outcome()
    }

    pub fn status(&self) -> CollapseStatus {
        self.read(|record| record.status())
    }

    pub fn amplitudes(&self) -> (Complex64, Complex64) {
        self.read(|record| record.amplitudes())
    }

    pub fn created_at_ms(&self) -> u64 {
        self.read(|record| record.created_at_ms)
    }

    pub fn snapshot(&self) -> QubitSnapshot {
        self.read(|record| QubitSnapshot::capture(self.name(), record))
    }

    /// Состояние в человекочитаемом виде
    pub fn describe(&self) -> String {
        self.snapshot().to_string()
    }

    pub fn is_monitor_running(&self) -> bool {
        self.monitor.as_ref().map_or(false, DecoherenceMonitor::is_running)
    }

    /// Останавливает монитор и снимает отображение. Сегмент остается.
    pub fn close(mut self) {
        self.shutdown();
    }

    // Порядок важен: сначала остановка и join монитора, потом unmap
    pub(crate) fn shutdown(&mut self) {
        if let Some(mut monitor) = self.monitor.take() {
            monitor.stop();
            debug!("Кубит '{}' закрыт", self.name());
        }
    }
}

impl Drop for SharedRegister {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl fmt::Debug for SharedRegister {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedRegister")
            .field("name", &self.name())
            .field("owner_task_id", &self.owner_task_id)
            .field("decohere_timeout", &self.decohere_timeout)
            .finish()
    }
}

/// Удаляет имя из пространства разделяемой памяти. Не ждет закрытия
/// чужих отображений. `Ok(false)`, если имени не было.
pub fn release(name: &str) -> QubitResult<bool> {
    release_with(&DEFAULT_CONFIG, name)
}

pub fn release_with(config: &RegisterConfig, name: &str) -> QubitResult<bool> {
    segment::unlink(config, name)
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
