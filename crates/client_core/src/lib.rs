//! Client-side orchestration for a Gridworks project: startup loading, the
//! refresh pipeline that follows server-side mutations, and dispatch of
//! mutating commands.

pub mod actions;
pub mod activity;
pub mod busy;
pub mod chain;
pub mod context;
pub mod error;
pub mod loader;
pub mod pipeline;
pub mod remote;
pub mod session;
pub mod transport;
pub mod widgets;

pub use actions::RenameOutcome;
pub use activity::{ActivityFlag, ActivityToken};
pub use busy::{BusyGuard, DEFAULT_BUSY_DELAY};
pub use chain::Chain;
pub use context::{ProjectContext, SharedProject};
pub use error::{ActionError, ChainError, ClientError, DispatchError, UpdateError};
pub use loader::load_project;
pub use pipeline::{build_pipeline, FinallyCallback, PipelineStep, Updater, Widgets};
pub use remote::{RemoteDataView, RemoteFacetEngine, RemoteHistory, RemoteProcessMonitor};
pub use session::{Callbacks, DispatchOutcome, ProjectSession, ResponseCallback};
pub use transport::{CommandBody, CommandTransport, ProjectClient};
pub use widgets::{
    BusyIndicator, CallbackKind, DataView, ExceptionReporter, FacetEngine, HistoryWidget,
    NoopBusyIndicator, ProcessMonitor, TracingReporter,
};

#[cfg(test)]
#[path = "tests/support.rs"]
pub(crate) mod test_support;
