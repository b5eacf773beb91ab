pub mod order_sync_client;

pub use order_sync_client::OrderSyncClient;
