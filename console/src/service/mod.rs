//! Application services and view-models

pub mod containers;
pub mod gate;
pub mod session;
pub mod settings;
pub mod stream;

pub use containers::{ContainerDetailView, ContainerListState, ContainerListView};
pub use gate::{Decision, GateEvent, GateState, Guard, SessionGate};
pub use session::{SessionService, SessionStatus};
pub use settings::{SaveStatus, SettingsEditor, SettingsService};
pub use stream::LiveStream;
