//! Монотонные часы для меток `created_at`.
//!
//! На unix это CLOCK_MONOTONIC: эпоха общая для всей системы (момент
//! загрузки), так что метку, записанную другим процессом, можно сравнивать
//! с нашей напрямую.

/// Миллисекунды CLOCK_MONOTONIC
#[cfg(unix)]
pub(crate) fn now_ms() -> u64 {
    let mut ts = libc::timespec { tv_sec: 0, tv_nsec: 0 };
    // SAFETY: ts - валидный буфер, CLOCK_MONOTONIC поддерживается всегда
    let rc = unsafe { libc::clock_gettime(libc::CLOCK_MONOTONIC, &mut ts) };
    if rc != 0 {
        return fallback::now_ms();
    }
    (ts.tv_sec as u64)
        .saturating_mul(1_000)
        .saturating_add(ts.tv_nsec as u64 / 1_000_000)
}

#[cfg(not(unix))]
pub(crate) fn now_ms() -> u64 {
    fallback::now_ms()
}

// Без системных монотонных часов эпоха своя у процесса
mod fallback {
    use std::time::Instant;

    use once_cell::sync::Lazy;

    static ANCHOR: Lazy<Instant> = Lazy::new(Instant::now);

    pub(super) fn now_ms() -> u64 {
        u64::try_from(ANCHOR.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}
