//! The node operations the submission engine depends on.

use algotx_rpc::{NodeRpc, PendingTransaction, RpcError};
use std::future::Future;

/// Sends signed bytes and waits for their confirmation.
pub trait Broadcaster {
    /// Submit raw signed bytes, returning the transaction id.
    fn send(&self, signed: &[u8]) -> impl Future<Output = Result<String, RpcError>> + Send;

    /// Wait at most `rounds` rounds for `tx_id` to confirm.
    fn wait_for_confirmation(
        &self,
        tx_id: &str,
        rounds: u64,
    ) -> impl Future<Output = Result<PendingTransaction, RpcError>> + Send;
}

impl Broadcaster for NodeRpc {
    async fn send(&self, signed: &[u8]) -> Result<String, RpcError> {
        self.send_raw_transaction(signed).await
    }

    async fn wait_for_confirmation(
        &self,
        tx_id: &str,
        rounds: u64,
    ) -> Result<PendingTransaction, RpcError> {
        NodeRpc::wait_for_confirmation(self, tx_id, rounds).await
    }
}
