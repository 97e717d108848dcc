//! One active dashboard view: owned view state, the dispatcher and the push
//! subscription, driven from a single task.

use std::sync::Arc;

use shared::domain::Status;
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{debug, error, info, warn};

use crate::{
    config::Settings,
    dispatcher::MutationDispatcher,
    error::ClientError,
    store::UnitStore,
    sync_bridge::{BridgeEvent, SyncBridge},
    view_state::{ConnectionStatus, MergeOutcome, ViewState},
};

#[derive(Debug, Clone, PartialEq)]
pub enum DashboardChange {
    UnitMerged {
        unit_number: String,
        outcome: MergeOutcome,
    },
    ConnectionChanged(ConnectionStatus),
    /// Full reload after the push channel came back.
    Resynced,
}

pub struct Dashboard {
    view: ViewState,
    dispatcher: MutationDispatcher,
    store: Arc<dyn UnitStore>,
    events: mpsc::UnboundedReceiver<BridgeEvent>,
    bridge: Option<SyncBridge>,
    needs_resync: bool,
}

enum LoadStep {
    Loaded(Result<Vec<shared::domain::Unit>, ClientError>),
    Event(Option<BridgeEvent>),
}

impl Dashboard {
    /// Opens the push channel and performs the initial load concurrently.
    pub async fn activate(
        settings: &Settings,
        store: Arc<dyn UnitStore>,
    ) -> Result<Self, ClientError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let bridge = SyncBridge::open(&settings.socket_url, settings.reconnect_delay(), tx)?;
        Ok(Self::start(store, rx, Some(bridge)).await)
    }

    /// Builds a dashboard over an existing event stream. Events already
    /// queued, or arriving before the load finishes, are dropped.
    pub async fn start(
        store: Arc<dyn UnitStore>,
        events: mpsc::UnboundedReceiver<BridgeEvent>,
        bridge: Option<SyncBridge>,
    ) -> Self {
        let mut dashboard = Self {
            view: ViewState::new(),
            dispatcher: MutationDispatcher::new(Arc::clone(&store)),
            store,
            events,
            bridge,
            needs_resync: false,
        };
        dashboard.initial_load().await;
        dashboard
    }

    async fn initial_load(&mut self) {
        let store = Arc::clone(&self.store);
        let load = store.list_units();
        tokio::pin!(load);

        let mut events_open = true;
        let mut dropped = 0usize;
        let result = loop {
            let step = tokio::select! {
                biased;
                event = self.events.recv(), if events_open => LoadStep::Event(event),
                result = &mut load => LoadStep::Loaded(result),
            };
            match step {
                LoadStep::Loaded(result) => break result,
                LoadStep::Event(None) => events_open = false,
                LoadStep::Event(Some(BridgeEvent::UnitUpdated(unit))) => {
                    dropped += 1;
                    debug!(unit_number = %unit.unit_number, "push update before initial load dropped");
                }
                LoadStep::Event(Some(BridgeEvent::Connected)) => {
                    self.view.set_connection(ConnectionStatus::Connected);
                }
                LoadStep::Event(Some(BridgeEvent::Disconnected { reason })) => {
                    warn!(%reason, "push channel down during initial load");
                    self.needs_resync = true;
                    self.view.set_connection(ConnectionStatus::Disconnected);
                }
            }
        };

        match result {
            Ok(units) => {
                info!(units = units.len(), dropped, "initial unit load complete");
                self.view.load(units);
            }
            Err(err) => {
                error!(error = %err, "initial unit load failed; showing empty view");
                self.view.load(Vec::new());
            }
        }
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    /// Cancel-safe; pair with [`Dashboard::apply`] inside `select!` loops.
    pub async fn next_event(&mut self) -> Option<BridgeEvent> {
        self.events.recv().await
    }

    /// Waits for the next bridge event and applies it. `None` once the
    /// bridge is gone.
    pub async fn next_change(&mut self) -> Option<DashboardChange> {
        let event = self.next_event().await?;
        Some(self.apply(event).await)
    }

    pub async fn apply(&mut self, event: BridgeEvent) -> DashboardChange {
        match event {
            BridgeEvent::UnitUpdated(unit) => {
                let unit_number = unit.unit_number.clone();
                let outcome = self.view.merge_update(unit);
                DashboardChange::UnitMerged {
                    unit_number,
                    outcome,
                }
            }
            BridgeEvent::Connected => {
                self.view.set_connection(ConnectionStatus::Connected);
                if !self.needs_resync {
                    return DashboardChange::ConnectionChanged(ConnectionStatus::Connected);
                }
                self.needs_resync = false;
                self.resync().await;
                DashboardChange::Resynced
            }
            BridgeEvent::Disconnected { reason } => {
                warn!(%reason, "push channel down; view may go stale until it returns");
                self.needs_resync = true;
                self.view.set_connection(ConnectionStatus::Disconnected);
                DashboardChange::ConnectionChanged(ConnectionStatus::Disconnected)
            }
        }
    }

    async fn resync(&mut self) {
        match self.store.list_units().await {
            Ok(units) => {
                info!(units = units.len(), "reloaded units after reconnect");
                self.view.reload(units);
            }
            Err(err) => warn!(error = %err, "reload after reconnect failed; keeping current view"),
        }
    }

    pub fn select_level(&mut self, level: impl Into<String>) {
        self.view.select_level(level);
    }

    pub fn toggle_expanded(&mut self, level: &str, unit_number: &str) -> bool {
        self.view.toggle_expanded(level, unit_number)
    }

    pub fn change_status(
        &self,
        level: &str,
        unit_number: &str,
        status: Option<Status>,
    ) -> Option<JoinHandle<()>> {
        self.dispatcher
            .change_status(&self.view, level, unit_number, status)
    }

    pub fn add_comment(&self, level: &str, unit_number: &str, text: &str) -> Option<JoinHandle<()>> {
        self.dispatcher
            .add_comment(&self.view, level, unit_number, text)
    }

    pub fn toggle_comment_resolved(
        &self,
        level: &str,
        unit_number: &str,
        comment_index: usize,
    ) -> Option<JoinHandle<()>> {
        self.dispatcher
            .toggle_comment_resolved(&self.view, level, unit_number, comment_index)
    }

    /// Releases the push channel. Dropping the dashboard also releases it,
    /// without the polite namespace leave.
    pub async fn deactivate(mut self) {
        if let Some(bridge) = self.bridge.take() {
            bridge.close().await;
        }
    }
}

#[cfg(test)]
#[path = "tests/dashboard_tests.rs"]
mod tests;
