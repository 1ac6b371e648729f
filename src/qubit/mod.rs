pub mod error;
pub mod record;
pub mod gates;
pub mod measurement;
pub mod entanglement;
pub mod register;
pub mod snapshot;

mod clock;
mod decoherence;
mod segment;

pub use error::{QubitError, QubitResult};
pub use record::{CollapseStatus, Outcome, StateRecord, MAX_LINKS, MAX_NAME_LEN, RECORD_SIZE};
pub use gates::Gate;
pub use measurement::{probability_of_one, sample_outcome};
pub use entanglement::{form_group, MAX_GROUP_SIZE, MIN_GROUP_SIZE};
pub use register::{release, release_with, SharedRegister};
pub use snapshot::QubitSnapshot;
