pub mod config;
pub mod dashboard;
pub mod dispatcher;
pub mod error;
pub mod store;
pub mod sync_bridge;
pub mod view_state;

pub use config::{load_settings, Settings};
pub use dashboard::{Dashboard, DashboardChange};
pub use dispatcher::MutationDispatcher;
pub use error::ClientError;
pub use store::{HttpUnitStore, UnitStore};
pub use sync_bridge::{BridgeEvent, SyncBridge};
pub use view_state::{ConnectionStatus, LevelGroup, MergeOutcome, UnitView, ViewState};
