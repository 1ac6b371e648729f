use std::fmt;

use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use super::record::{CollapseStatus, StateRecord};

/// Копия записи на момент чтения, для вывода и инспекции
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QubitSnapshot {
    pub name: String,
    pub amplitude0: Complex64,
    pub amplitude1: Complex64,
    pub status: CollapseStatus,
    pub links: Vec<String>,
    pub owner_task_id: u32,
    pub created_at_ms: u64,
    pub decohere_timeout_ms: u64,
}

impl QubitSnapshot {
    pub(crate) fn capture(name: &str, record: &StateRecord) -> Self {
        let (amplitude0, amplitude1) = record.amplitudes();
        Self {
            name: name.to_string(),
            amplitude0,
            amplitude1,
            status: record.status(),
            links: record.links(),
            owner_task_id: record.owner_task_id,
            created_at_ms: record.created_at_ms,
            decohere_timeout_ms: record.decohere_timeout_ms,
        }
    }

    pub fn is_measured(&self) -> bool {
        self.status.is_collapsed()
    }
}

fn fmt_amplitude(f: &mut fmt::Formatter<'_>, amplitude: Complex64) -> fmt::Result {
    let sign = if amplitude.im >= 0.0 { "+" } else { "" };
    write!(f, "({:.3}{}{:.3}i)", amplitude.re, sign, amplitude.im)
}

impl fmt::Display for QubitSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Qubit '{}': ", self.name)?;
        match self.status {
            CollapseStatus::Superposed => {
                write!(f, "|ψ> = ")?;
                fmt_amplitude(f, self.amplitude0)?;
                write!(f, "|0> + ")?;
                fmt_amplitude(f, self.amplitude1)?;
                write!(f, "|1>")?;
            }
            CollapseStatus::Collapsed(outcome) => write!(f, "Collapsed to |{}>", outcome)?,
        }
        write!(f, "\nLinks: {}", self.links.len())?;
        for link in &self.links {
            write!(f, " {}", link)?;
        }
        write!(f, "\nDecoherence: {}ms", self.decohere_timeout_ms)
    }
}
