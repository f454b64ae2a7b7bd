//! App actor - message loop turning UI events into store operations

use std::future::Future;
use tokio::sync::mpsc;

use crate::app::state::AppState;
use crate::messages::{OpOutcome, RenderState, UiEvent};
use crate::network::ApiError;
use crate::store::Store;

/// App actor that processes UI events, store changes and operation outcomes
pub struct AppActor {
    state: AppState,
    store: Store,
    render_tx: mpsc::UnboundedSender<RenderState>,
    outcome_tx: mpsc::UnboundedSender<OpOutcome>,
    outcome_rx: mpsc::UnboundedReceiver<OpOutcome>,
}

impl AppActor {
    pub fn new(store: Store, render_tx: mpsc::UnboundedSender<RenderState>) -> Self {
        let (outcome_tx, outcome_rx) = mpsc::unbounded_channel();
        AppActor {
            state: AppState::new(store.snapshot()),
            store,
            render_tx,
            outcome_tx,
            outcome_rx,
        }
    }

    /// Run the actor message loop
    pub async fn run(mut self, mut ui_rx: mpsc::UnboundedReceiver<UiEvent>) {
        let mut store_rx = self.store.subscribe();

        let _ = self.render_tx.send(self.state.to_render_state());
        self.spawn_op("Start polling", |store| async move {
            store.start_polling().await;
            Ok(())
        });

        loop {
            tokio::select! {
                Some(event) = ui_rx.recv() => {
                    if self.handle_ui_event(event) {
                        break;
                    }
                }
                Ok(()) = store_rx.changed() => {
                    let latest = store_rx.borrow_and_update().clone();
                    self.state.update_store_state(latest);
                }
                Some(outcome) = self.outcome_rx.recv() => {
                    if let Err(message) = &outcome.result {
                        tracing::warn!(op = outcome.label, %message, "Operation failed");
                    }
                    self.state.handle_outcome(outcome);
                }
                else => break,
            }
            let _ = self.render_tx.send(self.state.to_render_state());
        }

        self.store.stop_polling();
        tracing::info!("App actor stopped");
    }

    /// Run a store operation in the background and report its outcome
    fn spawn_op<F, Fut>(&mut self, label: &'static str, op: F)
    where
        F: FnOnce(Store) -> Fut,
        Fut: Future<Output = Result<(), ApiError>> + Send + 'static,
    {
        self.state.op_started(label);
        let outcome_tx = self.outcome_tx.clone();
        let fut = op(self.store.clone());
        tokio::spawn(async move {
            let outcome = match fut.await {
                Ok(()) => OpOutcome::ok(label),
                Err(e) => OpOutcome::failed(label, e.to_string()),
            };
            let _ = outcome_tx.send(outcome);
        });
    }

    /// Handle a UI event, returns true if quit was requested
    fn handle_ui_event(&mut self, event: UiEvent) -> bool {
        match event {
            // Panel navigation
            UiEvent::NextPanel => self.state.next_panel(),
            UiEvent::PrevPanel => self.state.prev_panel(),
            UiEvent::SelectUp => self.state.select_up(),
            UiEvent::SelectDown => self.state.select_down(),

            // Store actions
            UiEvent::RefreshAll => self.spawn_op("Refresh", |store| async move {
                store.refresh_all().await;
                Ok(())
            }),
            UiEvent::TogglePolling => {
                if self.store.is_polling() {
                    self.store.stop_polling();
                    self.state.set_status("Polling paused");
                } else {
                    self.spawn_op("Resume polling", |store| async move {
                        store.start_polling().await;
                        Ok(())
                    });
                }
            }
            UiEvent::StartServer => {
                self.spawn_op("Start server", |store| async move { store.start_server().await })
            }
            UiEvent::StopServer => {
                self.spawn_op("Stop server", |store| async move { store.stop_server().await })
            }
            UiEvent::DisconnectRepo => self.spawn_op("Disconnect", |store| async move {
                store.disconnect_repo().await?;
                store.reset();
                store.start_polling().await;
                Ok::<(), ApiError>(())
            }),
            UiEvent::CancelTask => match self.state.cancellable_task() {
                Some(id) => self.spawn_op("Cancel task", |store| async move {
                    store.cancel_task(&id).await
                }),
                None => self.state.set_status("Selected task is not running"),
            },
            UiEvent::SnapshotSource => match self.state.selected_source() {
                Some(source) => self.spawn_op("Snapshot", |store| async move {
                    store.create_snapshot(&source.path).await
                }),
                None => self.state.set_status("No snapshot selected"),
            },
            UiEvent::DeleteSnapshot => match self.state.selected_snapshot_id() {
                Some(id) => self.spawn_op("Delete snapshot", |store| async move {
                    store.delete_snapshots(&[id]).await
                }),
                None => self.state.set_status("No snapshot selected"),
            },

            // Popups
            UiEvent::ToggleHelp => self.state.toggle_help(),
            UiEvent::CloseHelp => self.state.close_help(),

            // System
            UiEvent::Quit => return true,
        }

        false
    }
}
