//! Именованный сегмент разделяемой памяти, отображенный в процесс.

use std::fs::{self, File, OpenOptions};
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

use log::{debug, error};
use memmap2::{MmapMut, MmapOptions};

use crate::config::RegisterConfig;
use super::error::{QubitError, QubitResult};
use super::record::{StateRecord, MAX_NAME_LEN, RECORD_SIZE};

/// Локальное отображение сегмента. Drop снимает отображение,
/// но сам сегмент остается жить под своим именем.
pub(crate) struct Segment {
    path: PathBuf,
    mmap: MmapMut,
    _file: File,
}

impl Segment {
    /// Открывает сегмент, создавая и обнуляя его при отсутствии.
    /// Второй элемент: true, если записи под этим именем еще не было.
    pub(crate) fn open_or_create(config: &RegisterConfig, name: &str) -> QubitResult<(Self, bool)> {
        let path = config.segment_path(name);
        let unavailable = |source: io::Error| {
            error!("Сегмент '{}' недоступен: {}", name, source);
            QubitError::StorageUnavailable {
                name: name.to_string(),
                path: path.clone(),
                source,
            }
        };

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&path)
            .map_err(unavailable)?;

        let len = file.metadata().map_err(unavailable)?.len();
        let created = len < RECORD_SIZE as u64;
        if created {
            file.set_len(RECORD_SIZE as u64).map_err(unavailable)?;
            debug!("Создан сегмент '{}' ({} байт)", name, RECORD_SIZE);
        }

        let mmap = map_record(&file).map_err(unavailable)?;
        Ok((
            Self {
                path,
                mmap,
                _file: file,
            },
            created,
        ))
    }

    /// Открывает только существующий сегмент, ничего не создавая
    pub(crate) fn open_existing(config: &RegisterConfig, name: &str) -> io::Result<Self> {
        let path = config.segment_path(name);
        let file = OpenOptions::new().read(true).write(true).open(&path)?;
        if file.metadata()?.len() < RECORD_SIZE as u64 {
            return Err(io::Error::new(
                ErrorKind::UnexpectedEof,
                "сегмент короче записи кубита",
            ));
        }
        let mmap = map_record(&file)?;
        Ok(Self {
            path,
            mmap,
            _file: file,
        })
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn record(&self) -> &StateRecord {
        bytemuck::from_bytes(&self.mmap[..RECORD_SIZE])
    }

    pub(crate) fn record_mut(&mut self) -> &mut StateRecord {
        bytemuck::from_bytes_mut(&mut self.mmap[..RECORD_SIZE])
    }
}

fn map_record(file: &File) -> io::Result<MmapMut> {
    // SAFETY: сегмент общий с другими процессами, межпроцессного замка нет.
    // Запись состоит только из Pod-полей, так что любые байты допустимы.
    unsafe { MmapOptions::new().len(RECORD_SIZE).map_mut(file) }
}

/// Удаляет имя сегмента. Чужие отображения продолжают работать.
/// Возвращает false, если такого имени не было.
pub(crate) fn unlink(config: &RegisterConfig, name: &str) -> QubitResult<bool> {
    let name = validate_name(name)?;
    match fs::remove_file(config.segment_path(name)) {
        Ok(()) => {
            debug!("Сегмент '{}' удален", name);
            Ok(true)
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(source) => Err(QubitError::Release {
            name: name.to_string(),
            source,
        }),
    }
}

/// Проверяет имя в стиле `shm_open`: один ведущий '/' допустим и отбрасывается.
pub(crate) fn validate_name(name: &str) -> QubitResult<&str> {
    let trimmed = name.strip_prefix('/').unwrap_or(name);
    let valid = !trimmed.is_empty()
        && trimmed.len() <= MAX_NAME_LEN
        && trimmed != "."
        && trimmed != ".."
        && !trimmed.contains(|c: char| c == '/' || c == '\0');
    if valid {
        Ok(trimmed)
    } else {
        Err(QubitError::InvalidName(name.to_string()))
    }
}
