//! Project snapshot types.
//!
//! Projects, sessions, and templates are owned by the remote service. The
//! engine reads them as snapshots replaced wholesale on every refresh.

mod session;
mod template;

pub use session::{DialecticProject, DialecticSession, SelectedModel};
pub use template::{DialecticStage, ProcessTemplate, StageTransition};
