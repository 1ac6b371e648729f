//! Запись состояния кубита с фиксированной раскладкой байт.
//!
//! Запись лежит в начале сегмента разделяемой памяти и читается любым
//! процессом, открывшим то же имя, поэтому смещения полей стабильны:
//!
//! ```text
//!   0  f64 x4   amplitude0.re, amplitude0.im, amplitude1.re, amplitude1.im
//!  32  u8       флаг коллапса: 0, 1 = коллапс в |0>, |1>; 2 = суперпозиция
//!  33  [u8;64]x4 имена пиров, NUL-терминированные
//! 289  u8 x3    выравнивание
//! 292  u32      число связей
//! 296  u32      owner_task_id
//! 300  u8 x4    выравнивание
//! 304  u64      created_at, мс
//! 312  u64      decohere_timeout, мс
//! ```

use std::fmt;

use bytemuck::{Pod, Zeroable};
use log::warn;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

/// Максимум пиров в таблице связей
pub const MAX_LINKS: usize = 4;
/// Емкость слота имени вместе с терминатором
pub const LINK_NAME_CAPACITY: usize = 64;
/// Максимальная длина имени в байтах
pub const MAX_NAME_LEN: usize = LINK_NAME_CAPACITY - 1;
pub const RECORD_SIZE: usize = std::mem::size_of::<StateRecord>();

const FLAG_ZERO: u8 = 0;
const FLAG_ONE: u8 = 1;
const FLAG_SUPERPOSED: u8 = 2;

const _: () = assert!(RECORD_SIZE == 320);

/// Исход измерения
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    Zero,
    One,
}

impl Outcome {
    pub fn from_bit(bit: bool) -> Self {
        if bit {
            Outcome::One
        } else {
            Outcome::Zero
        }
    }

    pub fn as_u8(self) -> u8 {
        match self {
            Outcome::Zero => 0,
            Outcome::One => 1,
        }
    }

    /// Детерминированные амплитуды после коллапса: (1,0) или (0,1)
    pub fn amplitudes(self) -> (Complex64, Complex64) {
        let one = Complex64::new(1.0, 0.0);
        let zero = Complex64::new(0.0, 0.0);
        match self {
            Outcome::Zero => (one, zero),
            Outcome::One => (zero, one),
        }
    }
}

impl From<Outcome> for u8 {
    fn from(outcome: Outcome) -> Self {
        outcome.as_u8()
    }
}

impl TryFrom<u8> for Outcome {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Outcome::Zero),
            1 => Ok(Outcome::One),
            other => Err(other),
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u8())
    }
}

/// Статус коллапса записи
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CollapseStatus {
    Superposed,
    Collapsed(Outcome),
}

impl CollapseStatus {
    pub fn is_collapsed(self) -> bool {
        matches!(self, CollapseStatus::Collapsed(_))
    }

    pub fn outcome(self) -> Option<Outcome> {
        match self {
            CollapseStatus::Superposed => None,
            CollapseStatus::Collapsed(outcome) => Some(outcome),
        }
    }

    fn from_flag(flag: u8) -> Option<Self> {
        match flag {
            FLAG_ZERO => Some(CollapseStatus::Collapsed(Outcome::Zero)),
            FLAG_ONE => Some(CollapseStatus::Collapsed(Outcome::One)),
            FLAG_SUPERPOSED => Some(CollapseStatus::Superposed),
            _ => None,
        }
    }

    fn to_flag(self) -> u8 {
        match self {
            CollapseStatus::Superposed => FLAG_SUPERPOSED,
            CollapseStatus::Collapsed(outcome) => outcome.as_u8(),
        }
    }
}

/// Сырая запись в сегменте. Поведения нет, только контракт данных.
///
/// Замка внутри нет: процессы, открывшие одно имя, пишут сюда без
/// межпроцессной синхронизации.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct StateRecord {
    pub alpha_re: f64,
    pub alpha_im: f64,
    pub beta_re: f64,
    pub beta_im: f64,
    pub collapse_flag: u8,
    pub links: [[u8; LINK_NAME_CAPACITY]; MAX_LINKS],
    _pad0: [u8; 3],
    pub link_count: u32,
    pub owner_task_id: u32,
    _pad1: [u8; 4],
    pub created_at_ms: u64,
    pub decohere_timeout_ms: u64,
}

impl StateRecord {
    /// Свежая запись владельца: нули, кроме owner_task_id и амплитуды |0>.
    /// Нулевой флаг означает коллапс в |0>, поэтому амплитуды сразу (1,0).
    pub fn fresh(owner_task_id: u32) -> Self {
        let mut record = Self::zeroed();
        record.owner_task_id = owner_task_id;
        record.alpha_re = 1.0;
        record
    }

    pub fn amplitudes(&self) -> (Complex64, Complex64) {
        (
            Complex64::new(self.alpha_re, self.alpha_im),
            Complex64::new(self.beta_re, self.beta_im),
        )
    }

    pub fn set_amplitudes(&mut self, amplitude0: Complex64, amplitude1: Complex64) {
        self.alpha_re = amplitude0.re;
        self.alpha_im = amplitude0.im;
        self.beta_re = amplitude1.re;
        self.beta_im = amplitude1.im;
    }

    /// Флаг вне {0,1,2} бывает только после рваной записи из другого процесса;
    /// такую запись считаем суперпозицией, следующее измерение ее починит.
    pub fn status(&self) -> CollapseStatus {
        CollapseStatus::from_flag(self.collapse_flag).unwrap_or_else(|| {
            warn!("Поврежденный флаг коллапса {}, считаем суперпозицией", self.collapse_flag);
            CollapseStatus::Superposed
        })
    }

    pub fn set_status(&mut self, status: CollapseStatus) {
        self.collapse_flag = status.to_flag();
    }

    /// Коллапс с заморозкой амплитуд
    pub fn collapse_to(&mut self, outcome: Outcome) {
        let (amplitude0, amplitude1) = outcome.amplitudes();
        self.set_status(CollapseStatus::Collapsed(outcome));
        self.set_amplitudes(amplitude0, amplitude1);
    }

    pub fn link_count(&self) -> usize {
        (self.link_count as usize).min(MAX_LINKS)
    }

    pub fn links(&self) -> Vec<String> {
        self.links[..self.link_count()]
            .iter()
            .map(|slot| {
                let end = slot.iter().position(|&b| b == 0).unwrap_or(MAX_NAME_LEN);
                String::from_utf8_lossy(&slot[..end]).into_owned()
            })
            .collect()
    }

    /// Записывает проверенные имена; лишнее сверх MAX_LINKS отбрасывается,
    /// свободные слоты обнуляются.
    pub fn set_links<S: AsRef<str>>(&mut self, names: &[S]) {
        self.clear_links();
        let mut count = 0;
        for (slot, name) in self.links.iter_mut().zip(names) {
            let bytes = name.as_ref().as_bytes();
            let len = bytes.len().min(MAX_NAME_LEN);
            slot[..len].copy_from_slice(&bytes[..len]);
            count += 1;
        }
        self.link_count = count;
    }

    pub fn clear_links(&mut self) {
        self.links = [[0; LINK_NAME_CAPACITY]; MAX_LINKS];
        self.link_count = 0;
    }

    /// Обновляет метку времени и бюджет декогеренции
    pub fn touch(&mut self, now_ms: u64, timeout_ms: u64) {
        self.created_at_ms = now_ms;
        self.decohere_timeout_ms = timeout_ms;
    }

    pub fn elapsed_ms(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.created_at_ms)
    }

    /// Суперпозиция, пережившая свой бюджет
    pub fn is_expired(&self, now_ms: u64) -> bool {
        self.status() == CollapseStatus::Superposed
            && self.elapsed_ms(now_ms) > self.decohere_timeout_ms
    }
}
