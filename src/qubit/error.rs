use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Результат операций над регистром кубита
pub type QubitResult<T> = Result<T, QubitError>;

/// Ошибки регистра кубита
#[derive(Debug, Error)]
pub enum QubitError {
    /// Сегмент нельзя создать или отобразить в память.
    /// Для вызывающего процесса это фатально: повторных попыток нет.
    #[error("Сегмент '{name}' недоступен ({path}): {source}")]
    StorageUnavailable {
        name: String,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Неизвестный символ гейта
    #[error("Неизвестный гейт: {0:?}")]
    UnsupportedGate(char),

    /// Размер GHZ-группы вне диапазона [2, 5]
    #[error("Размер GHZ-группы должен быть от 2 до 5, получено {0}")]
    InvalidGroupSize(usize),

    /// Пир для распространения коллапса не открылся
    #[error("Пир '{name}' недоступен: {source}")]
    PeerUnreachable {
        name: String,
        #[source]
        source: io::Error,
    },

    /// Имя сегмента не подходит для пространства имен разделяемой памяти
    #[error("Недопустимое имя сегмента: {0:?}")]
    InvalidName(String),

    /// ОС не дала запустить поток монитора декогеренции
    #[error("Не удалось запустить монитор декогеренции: {0}")]
    MonitorSpawn(#[source] io::Error),

    /// Не удалось удалить имя сегмента
    #[error("Не удалось удалить сегмент '{name}': {source}")]
    Release {
        name: String,
        #[source]
        source: io::Error,
    },
}
