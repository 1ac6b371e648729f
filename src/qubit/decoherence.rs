//! Фоновый монитор декогеренции: по одному потоку на открытый экземпляр.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{bounded, RecvTimeoutError, Sender};
use log::{debug, warn};

use super::error::{QubitError, QubitResult};
use super::register::RegisterCore;

/// Поток, который раз в `poll_interval` проверяет, не истек ли бюджет
/// суперпозиции, и коллапсирует запись сам. Не отсоединяется никогда:
/// остановка = сигнал + join.
pub(crate) struct DecoherenceMonitor {
    stop_tx: Option<Sender<()>>,
    thread_handle: Option<thread::JoinHandle<()>>,
}

impl DecoherenceMonitor {
    pub(crate) fn start(core: Arc<RegisterCore>, poll_interval: Duration) -> QubitResult<Self> {
        let (stop_tx, stop_rx) = bounded::<()>(1);
        let thread_name = format!("qubit-decohere:{}", core.name());

        let thread_handle = thread::Builder::new()
            .name(thread_name)
            .spawn(move || {
                debug!("Монитор декогеренции '{}' запущен", core.name());
                loop {
                    match stop_rx.recv_timeout(poll_interval) {
                        Err(RecvTimeoutError::Timeout) => {
                            core.decohere_if_expired();
                        }
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                debug!("Монитор декогеренции '{}' остановлен", core.name());
            })
            .map_err(QubitError::MonitorSpawn)?;

        Ok(Self {
            stop_tx: Some(stop_tx),
            thread_handle: Some(thread_handle),
        })
    }

    pub(crate) fn is_running(&self) -> bool {
        self.thread_handle.is_some()
    }

    /// Сигнал остановки и ожидание выхода из цикла
    pub(crate) fn stop(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            // Канал на одно сообщение; даже если он полон, drop отправителя разорвет его
            let _ = stop_tx.try_send(());
        }
        if let Some(handle) = self.thread_handle.take() {
            if handle.join().is_err() {
                warn!("Поток монитора декогеренции завершился паникой");
            }
        }
    }
}

impl Drop for DecoherenceMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}
