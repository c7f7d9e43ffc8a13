//! Voter escrow state machine.
//!
//! Per account: `Empty -> Active -> Empty`, with `Active -> Active` when the
//! owner overrides the release time. Records survive release with
//! `is_active == false` and are overwritten by the next deposit.

use crate::error::EscrowError;
use crate::events::EscrowEvent;
use crate::guard::ReentrancyGuard;
use crate::FEE_DENOMINATOR;
use devoter_ledger::{LedgerError, VotingLedger};
use devoter_types::{Address, U256};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{info, warn};

/// Escrow record for one account.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Escrow {
    pub is_active: bool,
    /// Principal held, after the fee
    pub amount: U256,
    pub deposit_timestamp: u64,
    pub release_timestamp: u64,
}

/// Construction parameters, immutable afterwards except for `owner`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EscrowParams {
    /// Ledger account holding escrowed principal
    pub holder: Address,
    /// Identity allowed to override release timestamps
    pub owner: Address,
    pub fee_wallet: Address,
    /// Percent of each deposit routed to `fee_wallet`, 0..=100
    pub fee_percentage: u8,
    /// Lock length in seconds
    pub voting_period: u64,
}

/// Fee-charging voter escrow.
#[derive(Debug, Clone)]
pub struct EscrowEngine {
    params: EscrowParams,
    escrows: HashMap<Address, Escrow>,
    /// Sum of active principals
    total_escrowed: U256,
    guard: ReentrancyGuard,
    events: Vec<EscrowEvent>,
}

impl EscrowEngine {
    /// Create a new escrow engine.
    ///
    /// # Errors
    /// - `InvalidParameter` if the fee exceeds 100% or the voting period is 0
    /// - `InvalidRecipient` if the holder, fee wallet or owner is the zero address
    pub fn new(params: EscrowParams) -> Result<Self, EscrowError> {
        if params.fee_percentage as u64 > FEE_DENOMINATOR {
            return Err(EscrowError::InvalidParameter(format!(
                "fee percentage {} exceeds {}",
                params.fee_percentage, FEE_DENOMINATOR
            )));
        }
        if params.voting_period == 0 {
            return Err(EscrowError::InvalidParameter(
                "voting period must be greater than 0".to_string(),
            ));
        }
        if params.holder.is_zero() {
            return Err(EscrowError::InvalidRecipient("holder is the zero address"));
        }
        if params.fee_wallet.is_zero() {
            return Err(EscrowError::InvalidRecipient("fee wallet is the zero address"));
        }
        if params.owner.is_zero() {
            return Err(EscrowError::InvalidRecipient("owner is the zero address"));
        }
        if params.fee_wallet == params.holder {
            return Err(EscrowError::InvalidParameter(
                "fee wallet must differ from the holding account".to_string(),
            ));
        }

        Ok(Self {
            params,
            escrows: HashMap::new(),
            total_escrowed: U256::ZERO,
            guard: ReentrancyGuard::new(),
            events: Vec::new(),
        })
    }

    pub fn holder(&self) -> Address {
        self.params.holder
    }

    pub fn owner(&self) -> Address {
        self.params.owner
    }

    pub fn fee_wallet(&self) -> Address {
        self.params.fee_wallet
    }

    pub fn fee_percentage(&self) -> u8 {
        self.params.fee_percentage
    }

    pub fn voting_period(&self) -> u64 {
        self.params.voting_period
    }

    pub fn total_escrowed(&self) -> U256 {
        self.total_escrowed
    }

    /// Escrow record for `account`, active or not.
    pub fn escrow_of(&self, account: Address) -> Option<&Escrow> {
        self.escrows.get(&account)
    }

    pub fn events(&self) -> &[EscrowEvent] {
        &self.events
    }

    pub fn events_since(&self, cursor: usize) -> &[EscrowEvent] {
        self.events.get(cursor..).unwrap_or(&[])
    }

    /// Fee charged on a deposit of `amount`, rounded down.
    pub fn fee_for(&self, amount: U256) -> Result<U256, EscrowError> {
        amount
            .checked_mul_div(
                &U256::from(self.params.fee_percentage),
                &U256::from(FEE_DENOMINATOR),
            )
            .ok_or(EscrowError::Overflow("fee"))
    }

    /// Lock `amount` of the caller's tokens for the voting period.
    ///
    /// The caller must have approved the holding account for at least
    /// `amount`. Returns the escrowed principal.
    pub fn deposit(
        &mut self,
        ledger: &mut VotingLedger,
        caller: Address,
        amount: U256,
        now: u64,
    ) -> Result<U256, EscrowError> {
        self.guard.enter("deposit", caller)?;
        let result = self.deposit_locked(ledger, caller, amount, now);
        self.guard.exit();
        result
    }

    fn deposit_locked(
        &mut self,
        ledger: &mut VotingLedger,
        caller: Address,
        amount: U256,
        now: u64,
    ) -> Result<U256, EscrowError> {
        if amount.is_zero() {
            return Err(EscrowError::InvalidAmount);
        }
        if self.escrows.get(&caller).is_some_and(|e| e.is_active) {
            return Err(EscrowError::AlreadyEscrowed);
        }

        let fee = self.fee_for(amount)?;
        let principal = amount
            .checked_sub(&fee)
            .ok_or(EscrowError::Overflow("principal"))?;
        if principal.is_zero() {
            return Err(EscrowError::InvalidAmount);
        }
        let release_timestamp = now
            .checked_add(self.params.voting_period)
            .ok_or(EscrowError::Overflow("release timestamp"))?;
        let total_escrowed = self
            .total_escrowed
            .checked_add(&principal)
            .ok_or(EscrowError::Overflow("total escrowed"))?;
        self.precheck_pull(ledger, caller, amount, fee)?;

        let previous = self.escrows.insert(
            caller,
            Escrow {
                is_active: true,
                amount: principal,
                deposit_timestamp: now,
                release_timestamp,
            },
        );
        let previous_total = std::mem::replace(&mut self.total_escrowed, total_escrowed);

        if let Err(e) = self.pull(ledger, caller, amount, fee) {
            match previous {
                Some(record) => self.escrows.insert(caller, record),
                None => self.escrows.remove(&caller),
            };
            self.total_escrowed = previous_total;
            return Err(e);
        }

        self.events.push(EscrowEvent::TokensDeposited {
            account: caller,
            amount: principal,
            release_timestamp,
        });
        info!(account = %caller, %amount, %fee, %principal, release_timestamp, "tokens deposited");
        Ok(principal)
    }

    /// Check every condition the ledger would check for the two pull
    /// transfers, so a failure surfaces before any state is written.
    fn precheck_pull(
        &self,
        ledger: &VotingLedger,
        caller: Address,
        amount: U256,
        fee: U256,
    ) -> Result<(), EscrowError> {
        let holder = self.params.holder;
        let fee_wallet = self.params.fee_wallet;

        let allowance = ledger.allowance(caller, holder);
        if allowance < amount {
            return Err(LedgerError::InsufficientAllowance { have: allowance, need: amount }.into());
        }
        let balance = ledger.balance_of(caller);
        if balance < amount {
            return Err(LedgerError::InsufficientBalance { have: balance, need: amount }.into());
        }
        if caller != holder {
            ledger
                .balance_of(holder)
                .checked_add(&amount)
                .ok_or(LedgerError::Overflow("recipient balance"))?;
        }
        if !fee.is_zero() && caller != fee_wallet {
            ledger
                .balance_of(fee_wallet)
                .checked_add(&fee)
                .ok_or(LedgerError::Overflow("recipient balance"))?;
        }
        Ok(())
    }

    fn pull(
        &self,
        ledger: &mut VotingLedger,
        caller: Address,
        amount: U256,
        fee: U256,
    ) -> Result<(), EscrowError> {
        let holder = self.params.holder;
        ledger.transfer_from(holder, caller, holder, amount)?;
        if !fee.is_zero() {
            ledger.transfer(holder, self.params.fee_wallet, fee)?;
        }
        Ok(())
    }

    /// Return the caller's principal once the lock has expired.
    pub fn release(
        &mut self,
        ledger: &mut VotingLedger,
        caller: Address,
        now: u64,
    ) -> Result<U256, EscrowError> {
        self.guard.enter("release", caller)?;
        let result = self.release_locked(ledger, caller, now);
        self.guard.exit();
        result
    }

    fn release_locked(
        &mut self,
        ledger: &mut VotingLedger,
        caller: Address,
        now: u64,
    ) -> Result<U256, EscrowError> {
        let record = match self.escrows.get(&caller) {
            Some(e) if e.is_active => *e,
            _ => return Err(EscrowError::NoActiveEscrow),
        };
        if now < record.release_timestamp {
            return Err(EscrowError::LockNotExpired {
                now,
                release_timestamp: record.release_timestamp,
            });
        }
        let total_escrowed = self
            .total_escrowed
            .checked_sub(&record.amount)
            .ok_or(EscrowError::Overflow("total escrowed underflow"))?;

        self.escrows.insert(
            caller,
            Escrow {
                is_active: false,
                amount: U256::ZERO,
                ..record
            },
        );
        let previous_total = std::mem::replace(&mut self.total_escrowed, total_escrowed);

        if let Err(e) = ledger.transfer(self.params.holder, caller, record.amount) {
            warn!(account = %caller, error = %e, "release transfer failed, escrow restored");
            self.escrows.insert(caller, record);
            self.total_escrowed = previous_total;
            return Err(e.into());
        }

        self.events.push(EscrowEvent::TokensReleased {
            account: caller,
            amount: record.amount,
        });
        info!(account = %caller, amount = %record.amount, "tokens released");
        Ok(record.amount)
    }

    /// Overwrite the release timestamp of `account`'s escrow. Owner only.
    ///
    /// No bounds are applied: the lock may be shortened or extended, and
    /// inactive or missing records are written as well.
    pub fn update_release_timestamp(
        &mut self,
        caller: Address,
        account: Address,
        new_timestamp: u64,
    ) -> Result<(), EscrowError> {
        if caller != self.params.owner {
            return Err(EscrowError::Unauthorized);
        }

        let record = self.escrows.entry(account).or_default();
        let previous = record.release_timestamp;
        record.release_timestamp = new_timestamp;

        self.events.push(EscrowEvent::ReleaseTimestampUpdated {
            account,
            previous,
            release_timestamp: new_timestamp,
        });
        info!(%account, previous, new_timestamp, "release timestamp overridden");
        Ok(())
    }

    /// Hand the owner role to `new_owner`. Owner only.
    pub fn transfer_ownership(&mut self, caller: Address, new_owner: Address) -> Result<(), EscrowError> {
        if caller != self.params.owner {
            return Err(EscrowError::Unauthorized);
        }
        if new_owner.is_zero() {
            return Err(EscrowError::InvalidRecipient("new owner is the zero address"));
        }

        let previous_owner = std::mem::replace(&mut self.params.owner, new_owner);
        self.events.push(EscrowEvent::OwnershipTransferred {
            previous_owner,
            new_owner,
        });
        info!(%previous_owner, %new_owner, "escrow ownership transferred");
        Ok(())
    }

    /// True while `account` has an active escrow that is still locked.
    pub fn is_voting_period_active(&self, account: Address, now: u64) -> bool {
        self.active(account)
            .is_some_and(|e| now < e.release_timestamp)
    }

    /// True when `account` has an active escrow whose lock has expired.
    pub fn can_release_tokens(&self, account: Address, now: u64) -> bool {
        self.active(account)
            .is_some_and(|e| now >= e.release_timestamp)
    }

    /// Seconds until release, 0 when unlocked or without an active escrow.
    pub fn get_remaining_voting_time(&self, account: Address, now: u64) -> u64 {
        self.active(account)
            .map(|e| e.release_timestamp.saturating_sub(now))
            .unwrap_or(0)
    }

    /// Check that `total_escrowed` matches the active records and that the
    /// holding account covers it.
    pub fn check_invariants(&self, ledger: &VotingLedger) -> Result<(), EscrowError> {
        let mut sum = U256::ZERO;
        for escrow in self.escrows.values().filter(|e| e.is_active) {
            if escrow.amount.is_zero() {
                return Err(EscrowError::InvariantViolation(
                    "active escrow with zero principal".to_string(),
                ));
            }
            sum = sum
                .checked_add(&escrow.amount)
                .ok_or(EscrowError::Overflow("escrow sum"))?;
        }
        if sum != self.total_escrowed {
            return Err(EscrowError::InvariantViolation(format!(
                "active escrows sum to {} but total is {}",
                sum, self.total_escrowed
            )));
        }
        if ledger.balance_of(self.params.holder) < self.total_escrowed {
            return Err(EscrowError::InvariantViolation(format!(
                "holding balance {} below escrowed {}",
                ledger.balance_of(self.params.holder),
                self.total_escrowed
            )));
        }
        Ok(())
    }

    fn active(&self, account: Address) -> Option<&Escrow> {
        self.escrows.get(&account).filter(|e| e.is_active)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VOTING_PERIOD: u64 = 30 * 24 * 60 * 60;
    const START: u64 = 1_700_000_000;

    fn owner() -> Address {
        Address::from_bytes([1u8; 20])
    }

    fn user() -> Address {
        Address::from_bytes([2u8; 20])
    }

    fn fee_wallet() -> Address {
        Address::from_bytes([3u8; 20])
    }

    fn holder() -> Address {
        Address::from_bytes([0xee; 20])
    }

    fn setup(fee_percentage: u8) -> (VotingLedger, EscrowEngine) {
        let mut ledger = VotingLedger::new("Mock DEV Token", "mDEV", owner());
        ledger.mint(owner(), user(), U256::from(1000u64)).unwrap();
        ledger.approve(user(), holder(), U256::from(1000u64)).unwrap();

        let engine = EscrowEngine::new(EscrowParams {
            holder: holder(),
            owner: owner(),
            fee_wallet: fee_wallet(),
            fee_percentage,
            voting_period: VOTING_PERIOD,
        })
        .unwrap();
        (ledger, engine)
    }

    #[test]
    fn test_new_rejects_bad_params() {
        let params = EscrowParams {
            holder: holder(),
            owner: owner(),
            fee_wallet: fee_wallet(),
            fee_percentage: 101,
            voting_period: VOTING_PERIOD,
        };
        assert!(matches!(
            EscrowEngine::new(params.clone()),
            Err(EscrowError::InvalidParameter(_))
        ));
        assert!(matches!(
            EscrowEngine::new(EscrowParams { fee_percentage: 10, voting_period: 0, ..params.clone() }),
            Err(EscrowError::InvalidParameter(_))
        ));
        assert!(matches!(
            EscrowEngine::new(EscrowParams { fee_percentage: 10, fee_wallet: Address::ZERO, ..params }),
            Err(EscrowError::InvalidRecipient(_))
        ));
    }

    #[test]
    fn test_deposit_routes_fee() {
        let (mut ledger, mut engine) = setup(10);

        let principal = engine.deposit(&mut ledger, user(), U256::from(100u64), START).unwrap();

        assert_eq!(principal, U256::from(90u64));
        assert_eq!(ledger.balance_of(user()), U256::from(900u64));
        assert_eq!(ledger.balance_of(holder()), U256::from(90u64));
        assert_eq!(ledger.balance_of(fee_wallet()), U256::from(10u64));

        let escrow = engine.escrow_of(user()).unwrap();
        assert!(escrow.is_active);
        assert_eq!(escrow.amount, U256::from(90u64));
        assert_eq!(escrow.deposit_timestamp, START);
        assert_eq!(escrow.release_timestamp, START + VOTING_PERIOD);
        assert_eq!(
            engine.events(),
            &[EscrowEvent::TokensDeposited {
                account: user(),
                amount: U256::from(90u64),
                release_timestamp: START + VOTING_PERIOD,
            }]
        );
        engine.check_invariants(&ledger).unwrap();
        ledger.check_invariants().unwrap();
    }

    #[test]
    fn test_fee_truncates() {
        let (mut ledger, mut engine) = setup(10);
        engine.deposit(&mut ledger, user(), U256::from(19u64), START).unwrap();
        assert_eq!(ledger.balance_of(fee_wallet()), U256::ONE);
        assert_eq!(engine.escrow_of(user()).unwrap().amount, U256::from(18u64));
    }

    #[test]
    fn test_zero_fee_skips_fee_transfer() {
        let (mut ledger, mut engine) = setup(0);
        let cursor = ledger.events().len();
        engine.deposit(&mut ledger, user(), U256::from(100u64), START).unwrap();

        assert_eq!(ledger.balance_of(holder()), U256::from(100u64));
        assert_eq!(ledger.balance_of(fee_wallet()), U256::ZERO);
        assert_eq!(ledger.events_since(cursor).len(), 1);
    }

    #[test]
    fn test_zero_principal_rejected() {
        let (mut ledger, mut engine) = setup(100);
        let result = engine.deposit(&mut ledger, user(), U256::from(100u64), START);
        assert_eq!(result, Err(EscrowError::InvalidAmount));
        assert!(engine.escrow_of(user()).is_none());
        assert_eq!(ledger.balance_of(user()), U256::from(1000u64));
    }

    #[test]
    fn test_deposit_zero() {
        let (mut ledger, mut engine) = setup(10);
        let result = engine.deposit(&mut ledger, user(), U256::ZERO, START);
        assert_eq!(result, Err(EscrowError::InvalidAmount));
    }

    #[test]
    fn test_second_deposit_rejected() {
        let (mut ledger, mut engine) = setup(10);
        engine.deposit(&mut ledger, user(), U256::from(100u64), START).unwrap();

        let result = engine.deposit(&mut ledger, user(), U256::from(100u64), START + 1);
        assert_eq!(result, Err(EscrowError::AlreadyEscrowed));
        assert_eq!(ledger.balance_of(user()), U256::from(900u64));
    }

    #[test]
    fn test_deposit_without_allowance() {
        let (mut ledger, mut engine) = setup(10);
        ledger.approve(user(), holder(), U256::from(50u64)).unwrap();

        let result = engine.deposit(&mut ledger, user(), U256::from(100u64), START);
        assert!(matches!(
            result,
            Err(EscrowError::Ledger(LedgerError::InsufficientAllowance { .. }))
        ));
        assert!(engine.escrow_of(user()).is_none());
        assert_eq!(engine.total_escrowed(), U256::ZERO);
    }

    #[test]
    fn test_deposit_exceeding_balance() {
        let (mut ledger, mut engine) = setup(10);
        ledger.approve(user(), holder(), U256::MAX).unwrap();
        let events_before = ledger.events().len();

        let result = engine.deposit(&mut ledger, user(), U256::from(1001u64), START);
        assert!(matches!(
            result,
            Err(EscrowError::Ledger(LedgerError::InsufficientBalance { .. }))
        ));
        assert_eq!(ledger.events().len(), events_before);
        assert!(engine.events().is_empty());
    }

    #[test]
    fn test_release_after_period() {
        let (mut ledger, mut engine) = setup(10);
        engine.deposit(&mut ledger, user(), U256::from(100u64), START).unwrap();

        let released = engine
            .release(&mut ledger, user(), START + VOTING_PERIOD)
            .unwrap();

        assert_eq!(released, U256::from(90u64));
        assert_eq!(ledger.balance_of(user()), U256::from(990u64));
        assert_eq!(ledger.balance_of(holder()), U256::ZERO);
        assert!(!engine.escrow_of(user()).unwrap().is_active);
        assert_eq!(engine.total_escrowed(), U256::ZERO);
        engine.check_invariants(&ledger).unwrap();
    }

    #[test]
    fn test_release_before_period() {
        let (mut ledger, mut engine) = setup(10);
        engine.deposit(&mut ledger, user(), U256::from(100u64), START).unwrap();

        let result = engine.release(&mut ledger, user(), START + VOTING_PERIOD - 1);
        assert_eq!(
            result,
            Err(EscrowError::LockNotExpired {
                now: START + VOTING_PERIOD - 1,
                release_timestamp: START + VOTING_PERIOD,
            })
        );
        assert!(engine.escrow_of(user()).unwrap().is_active);
    }

    #[test]
    fn test_release_without_deposit_and_twice() {
        let (mut ledger, mut engine) = setup(10);
        assert_eq!(
            engine.release(&mut ledger, user(), START),
            Err(EscrowError::NoActiveEscrow)
        );

        engine.deposit(&mut ledger, user(), U256::from(100u64), START).unwrap();
        engine.release(&mut ledger, user(), START + VOTING_PERIOD).unwrap();
        assert_eq!(
            engine.release(&mut ledger, user(), START + VOTING_PERIOD),
            Err(EscrowError::NoActiveEscrow)
        );
    }

    #[test]
    fn test_redeposit_after_release() {
        let (mut ledger, mut engine) = setup(10);
        engine.deposit(&mut ledger, user(), U256::from(100u64), START).unwrap();
        engine.release(&mut ledger, user(), START + VOTING_PERIOD).unwrap();

        let later = START + VOTING_PERIOD + 5;
        engine.deposit(&mut ledger, user(), U256::from(200u64), later).unwrap();
        let escrow = engine.escrow_of(user()).unwrap();
        assert_eq!(escrow.amount, U256::from(180u64));
        assert_eq!(escrow.deposit_timestamp, later);
    }

    #[test]
    fn test_views() {
        let (mut ledger, mut engine) = setup(10);
        assert!(!engine.is_voting_period_active(user(), START));
        assert!(!engine.can_release_tokens(user(), START));
        assert_eq!(engine.get_remaining_voting_time(user(), START), 0);

        engine.deposit(&mut ledger, user(), U256::from(100u64), START).unwrap();
        assert!(engine.is_voting_period_active(user(), START));
        assert!(!engine.can_release_tokens(user(), START));
        assert_eq!(engine.get_remaining_voting_time(user(), START), VOTING_PERIOD);
        assert_eq!(engine.get_remaining_voting_time(user(), START + 100), VOTING_PERIOD - 100);

        let release = START + VOTING_PERIOD;
        assert!(!engine.is_voting_period_active(user(), release));
        assert!(engine.can_release_tokens(user(), release));
        assert_eq!(engine.get_remaining_voting_time(user(), release), 0);
    }

    #[test]
    fn test_owner_overrides_release_timestamp() {
        let (mut ledger, mut engine) = setup(10);
        engine.deposit(&mut ledger, user(), U256::from(100u64), START).unwrap();

        engine.update_release_timestamp(owner(), user(), START + 60).unwrap();

        let escrow = engine.escrow_of(user()).unwrap();
        assert_eq!(escrow.release_timestamp, START + 60);
        assert!(escrow.is_active);
        assert_eq!(escrow.amount, U256::from(90u64));
        assert_eq!(escrow.deposit_timestamp, START);

        engine.release(&mut ledger, user(), START + 60).unwrap();
    }

    #[test]
    fn test_override_may_shorten_below_deposit_time() {
        let (mut ledger, mut engine) = setup(10);
        engine.deposit(&mut ledger, user(), U256::from(100u64), START).unwrap();
        engine.update_release_timestamp(owner(), user(), 0).unwrap();
        assert!(engine.can_release_tokens(user(), START));
    }

    #[test]
    fn test_override_not_owner() {
        let (mut ledger, mut engine) = setup(10);
        engine.deposit(&mut ledger, user(), U256::from(100u64), START).unwrap();

        let result = engine.update_release_timestamp(user(), user(), START);
        assert_eq!(result, Err(EscrowError::Unauthorized));
        assert_eq!(
            engine.escrow_of(user()).unwrap().release_timestamp,
            START + VOTING_PERIOD
        );
    }

    #[test]
    fn test_override_on_missing_record_stays_inactive() {
        let (_, mut engine) = setup(10);
        engine.update_release_timestamp(owner(), user(), START).unwrap();
        let escrow = engine.escrow_of(user()).unwrap();
        assert!(!escrow.is_active);
        assert!(!engine.can_release_tokens(user(), START));
    }

    #[test]
    fn test_transfer_ownership() {
        let (_, mut engine) = setup(10);
        engine.transfer_ownership(owner(), user()).unwrap();
        assert_eq!(engine.owner(), user());
        assert_eq!(
            engine.update_release_timestamp(owner(), user(), 1),
            Err(EscrowError::Unauthorized)
        );
        engine.update_release_timestamp(user(), user(), 1).unwrap();
    }

    #[test]
    fn test_reentrant_entry_rejected() {
        let (mut ledger, mut engine) = setup(10);
        engine.guard.enter("deposit", owner()).unwrap();

        let result = engine.deposit(&mut ledger, user(), U256::from(100u64), START);
        assert_eq!(result, Err(EscrowError::Reentrancy("deposit")));
        assert_eq!(ledger.balance_of(user()), U256::from(1000u64));
    }

    #[test]
    fn test_guard_released_after_error() {
        let (mut ledger, mut engine) = setup(10);
        assert!(engine.deposit(&mut ledger, user(), U256::ZERO, START).is_err());
        assert!(!engine.guard.is_entered());
        engine.deposit(&mut ledger, user(), U256::from(10u64), START).unwrap();
    }

    #[test]
    fn test_invariants_detect_drained_holder() {
        let (mut ledger, mut engine) = setup(10);
        engine.deposit(&mut ledger, user(), U256::from(100u64), START).unwrap();
        engine.check_invariants(&ledger).unwrap();

        ledger.transfer(holder(), owner(), U256::from(90u64)).unwrap();
        let err = engine.check_invariants(&ledger).unwrap_err();
        assert!(matches!(err, EscrowError::InvariantViolation(_)));
        assert!(err.to_string().contains("holding balance 0 below escrowed 90"));
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn prop_fee_split_conserves_amount(fee in 0u8..=100, amount in 1u64..=1000) {
                let (mut ledger, mut engine) = setup(fee);
                let fee_amount = engine.fee_for(U256::from(amount)).unwrap();

                match engine.deposit(&mut ledger, user(), U256::from(amount), START) {
                    Ok(principal) => {
                        prop_assert_eq!(principal.checked_add(&fee_amount), Some(U256::from(amount)));
                        prop_assert_eq!(ledger.balance_of(holder()), principal);
                        prop_assert_eq!(ledger.balance_of(fee_wallet()), fee_amount);
                        prop_assert_eq!(ledger.balance_of(user()), U256::from(1000 - amount));
                    }
                    Err(e) => {
                        prop_assert_eq!(e, EscrowError::InvalidAmount);
                        prop_assert_eq!(fee_amount, U256::from(amount));
                        prop_assert_eq!(ledger.balance_of(user()), U256::from(1000u64));
                    }
                }
                prop_assert!(engine.check_invariants(&ledger).is_ok());
                prop_assert!(ledger.check_invariants().is_ok());
            }
        }
    }
}
