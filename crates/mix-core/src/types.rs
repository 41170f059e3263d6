use serde::Serialize;

use crate::error::MixError;

/// Highest layer count the deployed routing program accepts.
pub const MAX_ROUTING_LAYERS: u8 = 4;

/// Everything needed to build one routing transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingRequest {
    /// Pays the network fee.
    pub fee_payer: [u8; 32],
    /// Funds the routed amount.
    pub proxy_payer: [u8; 32],
    /// Final destination of the routed lamports.
    pub recipient: [u8; 32],
    /// Lamports to route.
    pub amount: u64,
    /// Number of intermediate hops.
    pub layer_count: u8,
    /// Per-request derivation seed. Must never be reused.
    pub seed: u64,
}

impl RoutingRequest {
    /// Check the invariants the on-chain program and the verification step
    /// depend on.
    pub fn validate(&self) -> Result<(), MixError> {
        if self.amount == 0 {
            return Err(MixError::InvalidRequest("amount must be > 0".into()));
        }

        if self.layer_count == 0 || self.layer_count > MAX_ROUTING_LAYERS {
            return Err(MixError::InvalidRequest(format!(
                "layer count must be between 1 and {MAX_ROUTING_LAYERS}, got {}",
                self.layer_count
            )));
        }

        // A payer receiving its own routed funds would see fees in the delta.
        if self.recipient == self.fee_payer || self.recipient == self.proxy_payer {
            return Err(MixError::InvalidRequest(
                "recipient must differ from both payers".into(),
            ));
        }

        Ok(())
    }
}

/// One derived hop. `layer_index` doubles as the position among the
/// intermediate accounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntermediateAddress {
    pub layer_index: u8,
    pub address: [u8; 32],
    pub bump: u8,
}

/// Successful end-to-end result of a routing request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionReceipt {
    pub signature: String,
    pub recipient_delta: u64,
    pub recipient_balance_before: u64,
    pub recipient_balance_after: u64,
    pub layer_count: u8,
    /// Base58 addresses of the intermediate hops, in layer order.
    pub intermediates: Vec<String>,
}
