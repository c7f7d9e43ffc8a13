//! Ordered execution over one ledger and one escrow engine.
//!
//! The host is the only writer. It stamps every call with the current
//! block, dispatches it to the ledger or the escrow, and hands back the
//! events the call emitted.

use crate::config::HostConfig;
use crate::error::RuntimeError;
use devoter_escrow::{EscrowEngine, EscrowEvent};
use devoter_ledger::{LedgerEvent, VotingLedger};
use devoter_types::{Address, U256};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Block height and wall-clock time, in seconds, at which calls execute.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockEnv {
    pub number: u64,
    pub timestamp: u64,
}

/// An operation submitted by `Transaction::sender`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "call", rename_all = "snake_case")]
pub enum Call {
    Transfer { to: Address, value: U256 },
    Approve { spender: Address, value: U256 },
    TransferFrom { from: Address, to: Address, value: U256 },
    Mint { to: Address, value: U256 },
    Burn { value: U256 },
    Delegate { delegatee: Address },
    Deposit { amount: U256 },
    Release,
    UpdateReleaseTimestamp { account: Address, release_timestamp: u64 },
    TransferEscrowOwnership { new_owner: Address },
}

impl Call {
    pub fn name(&self) -> &'static str {
        match self {
            Call::Transfer { .. } => "transfer",
            Call::Approve { .. } => "approve",
            Call::TransferFrom { .. } => "transfer_from",
            Call::Mint { .. } => "mint",
            Call::Burn { .. } => "burn",
            Call::Delegate { .. } => "delegate",
            Call::Deposit { .. } => "deposit",
            Call::Release => "release",
            Call::UpdateReleaseTimestamp { .. } => "update_release_timestamp",
            Call::TransferEscrowOwnership { .. } => "transfer_escrow_ownership",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub sender: Address,
    pub call: Call,
}

impl Transaction {
    pub fn new(sender: Address, call: Call) -> Self {
        Self { sender, call }
    }
}

/// Outcome of a successful call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub block: u64,
    pub timestamp: u64,
    pub sender: Address,
    /// Position among all successful calls
    pub index: u64,
    pub ledger_events: Vec<LedgerEvent>,
    pub escrow_events: Vec<EscrowEvent>,
}

/// Owner of the ledger and the escrow engine.
#[derive(Debug, Clone)]
pub struct Host {
    ledger: VotingLedger,
    escrow: EscrowEngine,
    env: BlockEnv,
    executed: u64,
}

impl Host {
    /// Build the ledger and escrow described by `config`.
    pub fn from_config(config: &HostConfig) -> Result<Self, RuntimeError> {
        config
            .validate()
            .map_err(|e| RuntimeError::Config(e.to_string()))?;

        let token = &config.token;
        let ledger = VotingLedger::with_initial_supply(
            token.name.clone(),
            token.symbol.clone(),
            token.issuer,
            token.initial_holder,
            token.initial_supply,
        )?;
        let escrow = EscrowEngine::new(config.escrow.params())?;

        info!(
            name = %token.name,
            symbol = %token.symbol,
            supply = %token.initial_supply,
            fee_percentage = config.escrow.fee_percentage,
            voting_period = config.escrow.voting_period,
            "host initialized"
        );
        Ok(Self::new(ledger, escrow))
    }

    /// Wrap existing components. The clock starts at the ledger's block
    /// and timestamp 0.
    pub fn new(ledger: VotingLedger, escrow: EscrowEngine) -> Self {
        let env = BlockEnv {
            number: ledger.block_number(),
            timestamp: 0,
        };
        Self {
            ledger,
            escrow,
            env,
            executed: 0,
        }
    }

    pub fn ledger(&self) -> &VotingLedger {
        &self.ledger
    }

    pub fn escrow(&self) -> &EscrowEngine {
        &self.escrow
    }

    pub fn block(&self) -> BlockEnv {
        self.env
    }

    /// Number of calls that have committed.
    pub fn executed(&self) -> u64 {
        self.executed
    }

    /// Move the clock to `env`. Neither the block number nor the timestamp
    /// may go backwards; equal values are accepted.
    pub fn advance_to(&mut self, env: BlockEnv) -> Result<(), RuntimeError> {
        if env.timestamp < self.env.timestamp {
            return Err(RuntimeError::TimestampRegression {
                requested: env.timestamp,
                current: self.env.timestamp,
            });
        }
        self.ledger.advance_block(env.number)?;
        self.env = env;
        debug!(block = env.number, timestamp = env.timestamp, "clock advanced");
        Ok(())
    }

    /// Apply one transaction at the current block.
    ///
    /// Calls sent from the zero address or the escrow holding account are
    /// rejected. A rejected call changes nothing and does not consume an
    /// index.
    pub fn execute(&mut self, tx: Transaction) -> Result<Receipt, RuntimeError> {
        let ledger_cursor = self.ledger.events().len();
        let escrow_cursor = self.escrow.events().len();

        if let Err(e) = self
            .check_sender(tx.sender)
            .and_then(|()| self.dispatch(tx.sender, &tx.call))
        {
            warn!(
                sender = %tx.sender,
                call = tx.call.name(),
                code = e.code(),
                error = %e,
                "call rejected"
            );
            return Err(e);
        }

        let receipt = Receipt {
            block: self.env.number,
            timestamp: self.env.timestamp,
            sender: tx.sender,
            index: self.executed,
            ledger_events: self.ledger.events_since(ledger_cursor).to_vec(),
            escrow_events: self.escrow.events_since(escrow_cursor).to_vec(),
        };
        self.executed += 1;
        debug!(
            sender = %tx.sender,
            call = tx.call.name(),
            index = receipt.index,
            "call committed"
        );
        Ok(receipt)
    }

    /// Apply transactions in order, one result per transaction.
    pub fn execute_all(
        &mut self,
        txs: impl IntoIterator<Item = Transaction>,
    ) -> Vec<Result<Receipt, RuntimeError>> {
        txs.into_iter().map(|tx| self.execute(tx)).collect()
    }

    /// The zero address never signs, and the holding account is moved only
    /// by the escrow's own deposit and release.
    fn check_sender(&self, sender: Address) -> Result<(), RuntimeError> {
        if sender.is_zero() {
            return Err(RuntimeError::ZeroSender);
        }
        if sender == self.escrow.holder() {
            return Err(RuntimeError::ReservedSender(sender));
        }
        Ok(())
    }

    fn dispatch(&mut self, sender: Address, call: &Call) -> Result<(), RuntimeError> {
        let now = self.env.timestamp;
        match *call {
            Call::Transfer { to, value } => self.ledger.transfer(sender, to, value)?,
            Call::Approve { spender, value } => self.ledger.approve(sender, spender, value)?,
            Call::TransferFrom { from, to, value } => {
                self.ledger.transfer_from(sender, from, to, value)?
            }
            Call::Mint { to, value } => self.ledger.mint(sender, to, value)?,
            Call::Burn { value } => self.ledger.burn(sender, value)?,
            Call::Delegate { delegatee } => self.ledger.delegate(sender, delegatee)?,
            Call::Deposit { amount } => {
                self.escrow.deposit(&mut self.ledger, sender, amount, now)?;
            }
            Call::Release => {
                self.escrow.release(&mut self.ledger, sender, now)?;
            }
            Call::UpdateReleaseTimestamp {
                account,
                release_timestamp,
            } => self
                .escrow
                .update_release_timestamp(sender, account, release_timestamp)?,
            Call::TransferEscrowOwnership { new_owner } => {
                self.escrow.transfer_ownership(sender, new_owner)?
            }
        }
        Ok(())
    }

    /// Check ledger and escrow invariants against each other.
    pub fn check_invariants(&self) -> Result<(), RuntimeError> {
        self.ledger.check_invariants()?;
        self.escrow.check_invariants(&self.ledger)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(n: u8) -> Address {
        Address::from_bytes([n; 20])
    }

    fn test_host() -> Host {
        let mut config = HostConfig::default();
        config.token.issuer = addr(1);
        config.token.initial_holder = addr(1);
        config.token.initial_supply = U256::from(1_000u64);
        config.escrow.owner = addr(1);
        config.escrow.holder = addr(0xee);
        config.escrow.fee_wallet = addr(0xfe);
        config.escrow.voting_period = 100;
        Host::from_config(&config).unwrap()
    }

    #[test]
    fn test_from_config() {
        let host = test_host();
        assert_eq!(host.ledger().total_supply(), U256::from(1_000u64));
        assert_eq!(host.ledger().balance_of(addr(1)), U256::from(1_000u64));
        assert_eq!(host.escrow().voting_period(), 100);
        assert_eq!(host.block(), BlockEnv::default());
        host.check_invariants().unwrap();
    }

    #[test]
    fn test_from_invalid_config() {
        let mut config = HostConfig::default();
        config.escrow.voting_period = 0;
        let err = Host::from_config(&config).unwrap_err();
        assert_eq!(err.code(), "InvalidConfig");
    }

    #[test]
    fn test_receipt_collects_events() {
        let mut host = test_host();
        host.advance_to(BlockEnv { number: 1, timestamp: 10 }).unwrap();

        let receipt = host
            .execute(Transaction::new(
                addr(1),
                Call::Transfer { to: addr(2), value: U256::from(5u64) },
            ))
            .unwrap();
        assert_eq!(receipt.block, 1);
        assert_eq!(receipt.timestamp, 10);
        assert_eq!(receipt.index, 0);
        assert_eq!(receipt.ledger_events.len(), 1);
        assert!(receipt.escrow_events.is_empty());

        let receipt = host
            .execute(Transaction::new(addr(1), Call::Delegate { delegatee: addr(1) }))
            .unwrap();
        assert_eq!(receipt.index, 1);
        // DelegateChanged + DelegateVotesChanged
        assert_eq!(receipt.ledger_events.len(), 2);
    }

    #[test]
    fn test_rejected_call_consumes_no_index() {
        let mut host = test_host();
        let err = host
            .execute(Transaction::new(addr(2), Call::Release))
            .unwrap_err();
        assert_eq!(err.code(), "NoActiveEscrow");
        assert_eq!(host.executed(), 0);
    }

    #[test]
    fn test_zero_sender_rejected() {
        let mut host = test_host();
        host.execute(Transaction::new(addr(1), Call::Delegate { delegatee: addr(1) }))
            .unwrap();
        let events = host.ledger().events().len();

        let err = host
            .execute(Transaction::new(Address::ZERO, Call::Delegate { delegatee: addr(1) }))
            .unwrap_err();
        assert_eq!(err, RuntimeError::ZeroSender);
        assert_eq!(err.code(), "InvalidRecipient");
        assert_eq!(host.ledger().delegates(Address::ZERO), None);
        assert_eq!(host.ledger().events().len(), events);

        host.execute(Transaction::new(
            addr(1),
            Call::Mint { to: addr(3), value: U256::from(500u64) },
        ))
        .unwrap();
        assert_eq!(host.ledger().get_votes(addr(1)), U256::from(1_000u64));
        host.check_invariants().unwrap();
    }

    #[test]
    fn test_holder_cannot_spend_escrowed_principal() {
        let mut host = test_host();
        let holder = host.escrow().holder();
        host.execute(Transaction::new(
            addr(1),
            Call::Approve { spender: holder, value: U256::from(1_000u64) },
        ))
        .unwrap();
        host.execute(Transaction::new(addr(1), Call::Deposit { amount: U256::from(1_000u64) }))
            .unwrap();
        assert_eq!(host.ledger().balance_of(holder), U256::from(900u64));

        let calls = [
            Call::Transfer { to: addr(3), value: U256::from(900u64) },
            Call::Approve { spender: addr(3), value: U256::from(900u64) },
            Call::Burn { value: U256::from(900u64) },
            Call::Delegate { delegatee: addr(3) },
            Call::Deposit { amount: U256::from(900u64) },
            Call::Release,
        ];
        for call in calls {
            let err = host.execute(Transaction::new(holder, call)).unwrap_err();
            assert_eq!(err, RuntimeError::ReservedSender(holder));
            assert_eq!(err.code(), "Unauthorized");
        }
        assert_eq!(host.ledger().balance_of(holder), U256::from(900u64));
        assert_eq!(host.ledger().allowance(holder, addr(3)), U256::ZERO);
        host.check_invariants().unwrap();

        host.advance_to(BlockEnv { number: 1, timestamp: 100 }).unwrap();
        host.execute(Transaction::new(addr(1), Call::Release)).unwrap();
        assert_eq!(host.ledger().balance_of(addr(1)), U256::from(900u64));
        host.check_invariants().unwrap();
    }

    #[test]
    fn test_clock_regression() {
        let mut host = test_host();
        host.advance_to(BlockEnv { number: 5, timestamp: 50 }).unwrap();

        let err = host
            .advance_to(BlockEnv { number: 6, timestamp: 49 })
            .unwrap_err();
        assert_eq!(err.code(), "ClockRegression");

        let err = host
            .advance_to(BlockEnv { number: 4, timestamp: 60 })
            .unwrap_err();
        assert_eq!(err.code(), "ClockRegression");
        assert_eq!(host.block(), BlockEnv { number: 5, timestamp: 50 });

        host.advance_to(BlockEnv { number: 5, timestamp: 50 }).unwrap();
    }

    #[test]
    fn test_call_json() {
        let call: Call = serde_json::from_str(r#"{"call":"release"}"#).unwrap();
        assert_eq!(call, Call::Release);

        let call: Call = serde_json::from_str(
            r#"{"call":"deposit","amount":"100"}"#,
        )
        .unwrap();
        assert_eq!(call, Call::Deposit { amount: U256::from(100u64) });
        assert_eq!(call.name(), "deposit");
    }
}
