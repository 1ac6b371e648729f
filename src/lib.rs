pub mod config;
pub mod qubit;

pub use config::RegisterConfig;
pub use qubit::{
    form_group, release, release_with, CollapseStatus, Gate, Outcome, QubitError, QubitResult,
    QubitSnapshot, SharedRegister,
};
