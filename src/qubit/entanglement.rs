//! Связи запутанности и распространение коллапса по именам пиров.
//!
//! Граф запутанности не хранится живыми объектами: у каждой записи есть
//! до четырех имен пиров, которые разрешаются лениво в момент коллапса.
//! Распространение одношаговое и без подтверждений.

use std::f64::consts::FRAC_1_SQRT_2;

use log::{debug, warn};
use num_complex::Complex64;

use crate::config::RegisterConfig;
use super::error::{QubitError, QubitResult};
use super::record::{Outcome, MAX_LINKS};
use super::register::SharedRegister;
use super::segment::{validate_name, Segment};

pub const MIN_GROUP_SIZE: usize = 2;
pub const MAX_GROUP_SIZE: usize = 5;

/// Готовит таблицу связей: без ссылок на себя, без недопустимых имен,
/// не длиннее MAX_LINKS. Лишние имена молча отбрасываются.
pub(crate) fn normalize_links<S: AsRef<str>>(own_name: &str, peers: &[S]) -> Vec<String> {
    let mut links = Vec::with_capacity(MAX_LINKS);
    for peer in peers {
        let peer = peer.as_ref();
        match validate_name(peer) {
            Ok(name) if name == own_name => {
                debug!("Кубит '{}': ссылка на себя пропущена", own_name);
            }
            Ok(name) if links.len() < MAX_LINKS => links.push(name.to_string()),
            Ok(name) => {
                debug!("Кубит '{}': связь с '{}' сверх лимита {} отброшена", own_name, name, MAX_LINKS);
            }
            Err(e) => warn!("Кубит '{}': {}", own_name, e),
        }
    }
    links
}

/// Принудительно коллапсирует пиров в `outcome`.
/// Недоступный пир пропускается. Возвращает число пиров, до которых дошли.
pub(crate) fn propagate<S: AsRef<str>>(
    config: &RegisterConfig,
    own_name: &str,
    links: &[S],
    outcome: Outcome,
) -> usize {
    let mut reached = 0;
    for peer in links {
        let peer = peer.as_ref();
        if peer == own_name {
            continue;
        }
        match Segment::open_existing(config, peer) {
            Ok(mut segment) => {
                // Межпроцессного замка нет: пишем поверх того, что там было
                segment.record_mut().collapse_to(outcome);
                reached += 1;
            }
            Err(source) => {
                let err = QubitError::PeerUnreachable {
                    name: peer.to_string(),
                    source,
                };
                warn!("Кубит '{}': {}", own_name, err);
            }
        }
    }
    if reached > 0 {
        debug!("Кубит '{}': коллапс |{}> передан {} пирам", own_name, outcome, reached);
    }
    reached
}

/// Формирует GHZ-группу из 2..=5 регистров: каждый связан со всеми остальными
/// и переведен в равную суперпозицию. При неверном размере ничего не меняется.
pub fn form_group(registers: &[&SharedRegister]) -> QubitResult<()> {
    let size = registers.len();
    if !(MIN_GROUP_SIZE..=MAX_GROUP_SIZE).contains(&size) {
        let err = QubitError::InvalidGroupSize(size);
        warn!("{}", err);
        return Err(err);
    }

    let equal = Complex64::new(FRAC_1_SQRT_2, 0.0);
    let names: Vec<&str> = registers.iter().map(|r| r.name()).collect();
    for (i, register) in registers.iter().enumerate() {
        let peers: Vec<&str> = names
            .iter()
            .enumerate()
            .filter(|&(j, _)| j != i)
            .map(|(_, &name)| name)
            .collect();
        register.entangle(&peers);
        register.set_state(equal, equal);
    }
    debug!("GHZ-группа сформирована: {:?}", names);
    Ok(())
}
