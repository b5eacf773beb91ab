use crate::cart::CartView;
use crate::checkout::CheckoutFlow;
use crate::clients::OrderSyncClient;
use crate::config::SessionConfig;
use crate::gateway::OrderGateway;
use crate::model::OrderId;
use crate::sync_actor::{OrderSyncActor, SyncError};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info};

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Table session failed to start: {0}")]
    Start(#[source] SyncError),
}

/// One device's session at a table.
///
/// # Example
///
/// ```ignore
/// let session = TableSession::start(config, Arc::new(backend)).await?;
/// session.cart().add_product(product).await?;
/// session.shutdown().await;
/// ```
pub struct TableSession {
    client: OrderSyncClient,
    config: SessionConfig,
    handle: JoinHandle<()>,
}

impl TableSession {
    /// Spawns the sync actor without initializing it.
    pub fn spawn(config: SessionConfig, gateway: Arc<dyn OrderGateway>) -> Self {
        let (actor, client) = OrderSyncActor::new(config.clone(), gateway);
        let handle = tokio::spawn(actor.run());
        info!(
            restaurant_id = %config.restaurant_id,
            table_id = %config.table_id,
            "Table session spawned"
        );
        Self {
            client,
            config,
            handle,
        }
    }

    /// Spawns the sync actor and looks up the table's active order.
    ///
    /// On failure the actor is stopped again before the error is returned.
    pub async fn start(
        config: SessionConfig,
        gateway: Arc<dyn OrderGateway>,
    ) -> Result<Self, SessionError> {
        let session = Self::spawn(config, gateway);
        match session.client.initialize().await {
            Ok(order_id) => {
                info!(?order_id, "Table session ready");
                Ok(session)
            }
            Err(e) => {
                error!(error = %e, "Table session failed to start");
                session.shutdown().await;
                Err(SessionError::Start(e))
            }
        }
    }

    pub fn client(&self) -> &OrderSyncClient {
        &self.client
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn active_order_id(&self) -> Option<OrderId> {
        self.client.active_order_id()
    }

    pub fn cart(&self) -> CartView {
        CartView::new(self.client.clone())
    }

    pub fn checkout(&self) -> CheckoutFlow {
        CheckoutFlow::new(self.client.clone(), self.config.tip_presets.clone())
    }

    /// Stops the actor and waits for it to release its subscription.
    pub async fn shutdown(self) {
        self.client.shutdown().await;
        if let Err(e) = self.handle.await {
            error!(error = %e, "Sync actor task failed");
        }
        info!(table_id = %self.config.table_id, "Table session closed");
    }
}
