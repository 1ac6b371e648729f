use num_complex::Complex64;
use rand::distributions::{Bernoulli, Distribution};
use rand::Rng;

use super::record::{CollapseStatus, Outcome, StateRecord};

/// Вероятность исхода |1> по правилу Борна.
/// Нормировка не проверяется: для ненормированных амплитуд p0 + p1 != 1.
pub fn probability_of_one(amplitude1: Complex64) -> f64 {
    amplitude1.norm_sqr()
}

/// Одна проба Бернулли с вероятностью успеха `p1`.
/// Значение зажимается в [0, 1], NaN считается нулем.
pub fn sample_outcome<R: Rng + ?Sized>(rng: &mut R, p1: f64) -> Outcome {
    let p1 = if p1.is_nan() { 0.0 } else { p1.clamp(0.0, 1.0) };
    let bit = Bernoulli::new(p1)
        .map(|dist| dist.sample(rng))
        .unwrap_or(false);
    Outcome::from_bit(bit)
}

/// Коллапс суперпозиции: сэмплирование, заморозка амплитуд, новая метка времени.
/// Для уже коллапсированной записи возвращает существующий исход и ничего не пишет.
pub(crate) fn collapse<R: Rng + ?Sized>(
    record: &mut StateRecord,
    rng: &mut R,
    now_ms: u64,
    timeout_ms: u64,
) -> (Outcome, bool) {
    if let CollapseStatus::Collapsed(outcome) = record.status() {
        return (outcome, false);
    }
    let (_, amplitude1) = record.amplitudes();
    let outcome = sample_outcome(rng, probability_of_one(amplitude1));
    record.collapse_to(outcome);
    record.touch(now_ms, timeout_ms);
    (outcome, true)
}
