//! End-to-end execution of one routing request.
//!
//! ```text
//! Initial -> BalanceChecked -> Built -> Submitted -> Confirmed -> Verified
//!     \            \             \          \            \
//!      +------------+-------------+----------+------------+--> Failed
//! ```
//!
//! Nothing is retried. A failed run must be restarted as a new request, which
//! draws a new seed and therefore a fresh set of hops.
//!
//! Dropping the `execute` future before `Submitted` has no effect on the
//! ledger. Once submitted, the transaction may land regardless; a timeout is
//! reported as [`MixError::ConfirmationTimeout`] and never as success.

use std::sync::Arc;
use std::time::Duration;

use chain_sol::{bytes_to_address, Keypair};
use serde::Serialize;
use thiserror::Error;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::builder::TransactionBuilder;
use crate::error::MixError;
use crate::ledger::{Commitment, LedgerClient, LedgerError, SignatureStatus, SubmitOptions};
use crate::types::{RoutingRequest, TransactionReceipt};

/// Tunables for submission and confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionOptions {
    /// Depth the transaction must reach before verification; also used for
    /// balance queries.
    pub commitment: Commitment,
    pub preflight_commitment: Commitment,
    /// Upper bound on the confirmation wait.
    pub confirm_timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for ExecutionOptions {
    fn default() -> Self {
        Self {
            commitment: Commitment::Confirmed,
            preflight_commitment: Commitment::Confirmed,
            confirm_timeout: Duration::from_secs(60),
            poll_interval: Duration::from_millis(500),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum ExecutionState {
    #[default]
    Initial,
    BalanceChecked,
    Built,
    Submitted,
    Confirmed,
    Verified,
    Failed,
}

/// Everything observed on the ledger during a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Observations {
    pub proxy_balance: Option<u64>,
    pub recipient_balance_before: Option<u64>,
    pub recipient_balance_after: Option<u64>,
    pub signature: Option<String>,
}

/// A run that ended in `Failed`.
#[derive(Debug, Error)]
#[error("routing failed after reaching {failed_at:?}: {error}")]
pub struct ExecutionFailure {
    /// Last state reached before the failure.
    pub failed_at: ExecutionState,
    pub observed: Observations,
    #[source]
    pub error: MixError,
}

#[derive(Default)]
struct Run {
    state: ExecutionState,
    observed: Observations,
}

impl Run {
    fn advance(&mut self, next: ExecutionState) {
        debug!(from = ?self.state, to = ?next, "routing state transition");
        self.state = next;
    }

    fn fail(self, error: MixError) -> ExecutionFailure {
        warn!(
            failed_at = ?self.state,
            signature = ?self.observed.signature,
            error = %error,
            "routing failed"
        );
        ExecutionFailure {
            failed_at: self.state,
            observed: self.observed,
            error,
        }
    }
}

/// Drives routing requests against a ledger.
///
/// Holds no per-request state, so one orchestrator can serve concurrent
/// requests.
pub struct ExecutionOrchestrator<L: ?Sized> {
    ledger: Arc<L>,
    builder: TransactionBuilder,
    options: ExecutionOptions,
}

impl<L: LedgerClient + ?Sized> ExecutionOrchestrator<L> {
    pub fn new(ledger: Arc<L>, program_id: [u8; 32], options: ExecutionOptions) -> Self {
        Self {
            ledger,
            builder: TransactionBuilder::new(program_id),
            options,
        }
    }

    pub fn options(&self) -> &ExecutionOptions {
        &self.options
    }

    /// Route `amount` lamports from `proxy_payer` to `recipient` through
    /// `layer_count` hops, with `fee_payer` covering the network fee.
    pub async fn execute(
        &self,
        fee_payer: &Keypair,
        proxy_payer: &Keypair,
        recipient: [u8; 32],
        amount: u64,
        layer_count: u8,
    ) -> Result<TransactionReceipt, ExecutionFailure> {
        let request = RoutingRequest {
            fee_payer: fee_payer.pubkey(),
            proxy_payer: proxy_payer.pubkey(),
            recipient,
            amount,
            layer_count,
            seed: crypto_utils::random_u64(),
        };

        self.execute_request(&request, fee_payer, proxy_payer).await
    }

    async fn execute_request(
        &self,
        request: &RoutingRequest,
        fee_payer: &Keypair,
        proxy_payer: &Keypair,
    ) -> Result<TransactionReceipt, ExecutionFailure> {
        let mut run = Run::default();
        match self.drive(&mut run, request, fee_payer, proxy_payer).await {
            Ok(receipt) => Ok(receipt),
            Err(error) => Err(run.fail(error)),
        }
    }

    async fn drive(
        &self,
        run: &mut Run,
        request: &RoutingRequest,
        fee_payer: &Keypair,
        proxy_payer: &Keypair,
    ) -> Result<TransactionReceipt, MixError> {
        request.validate()?;
        let commitment = self.options.commitment;

        let proxy_balance = self
            .ledger
            .get_balance(&request.proxy_payer, commitment)
            .await?;
        run.observed.proxy_balance = Some(proxy_balance);
        info!(
            proxy_payer = %bytes_to_address(&request.proxy_payer),
            balance = proxy_balance,
            amount = request.amount,
            "proxy payer balance"
        );
        if proxy_balance < request.amount {
            return Err(MixError::InsufficientFunds {
                balance: proxy_balance,
                required: request.amount,
            });
        }
        run.advance(ExecutionState::BalanceChecked);

        let balance_before = self
            .ledger
            .get_balance(&request.recipient, commitment)
            .await?;
        run.observed.recipient_balance_before = Some(balance_before);

        let blockhash = self.ledger.latest_blockhash(commitment).await?;
        let built = self.builder.build(request, &blockhash)?;
        run.advance(ExecutionState::Built);

        let signed = built.sign(fee_payer, proxy_payer)?;
        let signature = self.submit(&signed.wire, &signed.signature).await?;
        run.observed.signature = Some(signature.clone());
        run.advance(ExecutionState::Submitted);
        info!(
            signature = %signature,
            layers = request.layer_count,
            "routing transaction submitted"
        );

        let status = self.wait_for_confirmation(&signature).await?;
        run.advance(ExecutionState::Confirmed);
        info!(signature = %signature, slot = status.slot, "routing transaction confirmed");

        let balance_after = self
            .ledger
            .get_balance(&request.recipient, commitment)
            .await?;
        run.observed.recipient_balance_after = Some(balance_after);

        let delta = balance_after as i128 - balance_before as i128;
        if delta != request.amount as i128 {
            return Err(MixError::AmountMismatchOnVerify {
                expected: request.amount,
                actual: delta,
                signature,
            });
        }
        run.advance(ExecutionState::Verified);
        info!(signature = %signature, delta = request.amount, "recipient delta verified");

        Ok(TransactionReceipt {
            signature,
            recipient_delta: request.amount,
            recipient_balance_before: balance_before,
            recipient_balance_after: balance_after,
            layer_count: request.layer_count,
            intermediates: built
                .accounts
                .intermediates()
                .iter()
                .map(|hop| bytes_to_address(&hop.address))
                .collect(),
        })
    }

    /// Send the signed wire transaction.
    ///
    /// A rejection is definitive. A transport failure is not: the node may
    /// have broadcast the transaction before the connection dropped, so the
    /// locally computed signature is returned and confirmation decides.
    async fn submit(&self, wire: &[u8], local_signature: &str) -> Result<String, MixError> {
        let options = SubmitOptions {
            preflight_commitment: self.options.preflight_commitment,
            skip_preflight: false,
        };

        match self.ledger.send_transaction(wire, &options).await {
            Ok(returned) => {
                if returned != local_signature {
                    warn!(
                        returned = %returned,
                        expected = %local_signature,
                        "ledger returned an unexpected signature"
                    );
                }
                Ok(local_signature.to_string())
            }
            Err(LedgerError::Rejected(reason)) => Err(MixError::SubmissionRejected {
                reason,
                signature: Some(local_signature.to_string()),
            }),
            Err(LedgerError::Rpc { code, message }) => Err(MixError::SubmissionRejected {
                reason: format!("rpc error {code}: {message}"),
                signature: Some(local_signature.to_string()),
            }),
            Err(e) => {
                warn!(
                    error = %e,
                    signature = %local_signature,
                    "submission outcome unknown, waiting for confirmation"
                );
                Ok(local_signature.to_string())
            }
        }
    }

    /// Poll until the configured commitment is reached or the timeout expires.
    async fn wait_for_confirmation(&self, signature: &str) -> Result<SignatureStatus, MixError> {
        let target = self.options.commitment;
        let timeout = self.options.confirm_timeout;

        let poll = async {
            let mut ticker = tokio::time::interval(self.options.poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                match self.ledger.signature_status(signature).await {
                    Ok(Some(status)) => {
                        if let Some(err) = &status.err {
                            return Err(MixError::SubmissionRejected {
                                reason: format!("transaction failed on-chain: {err}"),
                                signature: Some(signature.to_string()),
                            });
                        }
                        if status.reached(target) {
                            return Ok(status);
                        }
                        debug!(
                            signature = %signature,
                            confirmation = ?status.confirmation,
                            "waiting for {target}"
                        );
                    }
                    Ok(None) => debug!(signature = %signature, "transaction not yet visible"),
                    Err(e) => warn!(error = %e, "signature status poll failed"),
                }
            }
        };

        match tokio::time::timeout(timeout, poll).await {
            Ok(result) => result,
            Err(_elapsed) => Err(MixError::ConfirmationTimeout {
                signature: signature.to_string(),
                waited_ms: timeout.as_millis() as u64,
            }),
        }
    }
}
