//! playtest-core: the beta testing program engine.
//!
//! Publishers register titles for closed testing; testers accept the
//! confidentiality agreement, enroll, work through the task catalog and
//! submit feedback; completions emit reward events exactly once; the
//! publisher triages feedback and eventually promotes the title out of
//! testing. All state lives in a local SQLite store; reward and
//! notification delivery go through the [`outbound`] seam after commit.
//!
//! Every operation takes an explicit [`Caller`] and performs one capability
//! check at the top; errors are typed [`EngineError`] values mapped onto a
//! small taxonomy via [`ErrorKind`].

pub mod agreement;
pub mod audit;
pub mod config;
pub mod enrollment;
pub mod error;
pub mod feedback;
pub mod model;
pub mod outbound;
pub mod store;
pub mod tasks;
pub mod titles;

pub use error::{EngineError, ErrorKind};
pub use model::Caller;
