//! Voting token ledger.
//!
//! ERC20-style balances extended with delegation and historical voting power.
//! An account's balance only counts as voting power once it is delegated;
//! the delegatee's checkpoint history then tracks every change to it.
//!
//! All mutating operations validate the complete change before writing
//! anything, so a returned error leaves the ledger untouched.

use crate::checkpoint::{Checkpoint, CheckpointArena, SupplyHistory};
use crate::error::LedgerError;
use crate::events::LedgerEvent;
use crate::max_supply;
use devoter_types::{Address, U256};
use std::collections::HashMap;
use tracing::{debug, info};

/// Token decimals (same as the host chain's native unit)
pub const DEFAULT_DECIMALS: u8 = 18;

/// Voting token ledger state.
#[derive(Debug, Clone)]
pub struct VotingLedger {
    name: String,
    symbol: String,
    decimals: u8,
    /// Identity allowed to mint
    issuer: Address,
    total_supply: U256,
    /// Zero balances are not stored
    balances: HashMap<Address, U256>,
    allowances: HashMap<(Address, Address), U256>,
    /// delegator -> delegatee, absent when undelegated
    delegates: HashMap<Address, Address>,
    checkpoints: CheckpointArena,
    supply_history: SupplyHistory,
    /// Current block; checkpoints are dated with it
    block_number: u64,
    events: Vec<LedgerEvent>,
}

/// Voting power change computed ahead of a commit.
#[derive(Debug, Default)]
struct VoteMove {
    debit: Option<(Address, U256)>,
    credit: Option<(Address, U256)>,
}

impl VotingLedger {
    /// Create an empty ledger at block 0.
    pub fn new(name: impl Into<String>, symbol: impl Into<String>, issuer: Address) -> Self {
        Self {
            name: name.into(),
            symbol: symbol.into(),
            decimals: DEFAULT_DECIMALS,
            issuer,
            total_supply: U256::ZERO,
            balances: HashMap::new(),
            allowances: HashMap::new(),
            delegates: HashMap::new(),
            checkpoints: CheckpointArena::new(),
            supply_history: SupplyHistory::default(),
            block_number: 0,
            events: Vec::new(),
        }
    }

    /// Create a ledger and mint `initial_supply` to `holder` at block 0.
    pub fn with_initial_supply(
        name: impl Into<String>,
        symbol: impl Into<String>,
        issuer: Address,
        holder: Address,
        initial_supply: U256,
    ) -> Result<Self, LedgerError> {
        let mut ledger = Self::new(name, symbol, issuer);
        if !initial_supply.is_zero() {
            ledger.mint(issuer, holder, initial_supply)?;
        }
        Ok(ledger)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn decimals(&self) -> u8 {
        self.decimals
    }

    pub fn issuer(&self) -> Address {
        self.issuer
    }

    pub fn total_supply(&self) -> U256 {
        self.total_supply
    }

    pub fn balance_of(&self, account: Address) -> U256 {
        self.balances.get(&account).copied().unwrap_or(U256::ZERO)
    }

    pub fn allowance(&self, owner: Address, spender: Address) -> U256 {
        self.allowances
            .get(&(owner, spender))
            .copied()
            .unwrap_or(U256::ZERO)
    }

    /// Current delegatee of `account`, `None` if it never delegated.
    pub fn delegates(&self, account: Address) -> Option<Address> {
        self.delegates.get(&account).copied()
    }

    pub fn block_number(&self) -> u64 {
        self.block_number
    }

    /// Move the ledger clock forward. Equal numbers are accepted.
    pub fn advance_block(&mut self, number: u64) -> Result<(), LedgerError> {
        if number < self.block_number {
            return Err(LedgerError::ClockRegression {
                requested: number,
                current: self.block_number,
            });
        }
        if number > self.block_number {
            debug!(from = self.block_number, to = number, "ledger clock advanced");
        }
        self.block_number = number;
        Ok(())
    }

    /// Current voting power of `account`.
    pub fn get_votes(&self, account: Address) -> U256 {
        self.checkpoints.latest(&account)
    }

    /// Voting power of `account` at the end of `block`.
    ///
    /// # Errors
    /// `InvalidQuery` unless `block` is strictly before the current block.
    pub fn get_past_votes(&self, account: Address, block: u64) -> Result<U256, LedgerError> {
        self.ensure_past(block)?;
        Ok(self.checkpoints.upper_lookup(&account, block))
    }

    /// Total supply at the end of `block`.
    pub fn get_past_total_supply(&self, block: u64) -> Result<U256, LedgerError> {
        self.ensure_past(block)?;
        Ok(self.supply_history.upper_lookup(block))
    }

    pub fn num_checkpoints(&self, account: Address) -> usize {
        self.checkpoints.len(&account)
    }

    pub fn checkpoint_at(&self, account: Address, pos: usize) -> Option<Checkpoint> {
        self.checkpoints.at(&account, pos)
    }

    /// Full event log, oldest first.
    pub fn events(&self) -> &[LedgerEvent] {
        &self.events
    }

    /// Events appended after the first `cursor` entries.
    pub fn events_since(&self, cursor: usize) -> &[LedgerEvent] {
        self.events.get(cursor..).unwrap_or(&[])
    }

    /// Transfer `value` from `from` to `to`.
    pub fn transfer(&mut self, from: Address, to: Address, value: U256) -> Result<(), LedgerError> {
        if from.is_zero() {
            return Err(LedgerError::InvalidRecipient("transfer from the zero address"));
        }
        if to.is_zero() {
            return Err(LedgerError::InvalidRecipient("transfer to the zero address"));
        }
        if value.is_zero() {
            return Err(LedgerError::InvalidAmount("transfer amount must be greater than 0"));
        }

        self.update(from, to, value)?;
        debug!(%from, %to, %value, "transfer");
        Ok(())
    }

    /// Set the allowance of `spender` over `owner`'s balance.
    pub fn approve(&mut self, owner: Address, spender: Address, value: U256) -> Result<(), LedgerError> {
        if owner.is_zero() {
            return Err(LedgerError::InvalidRecipient("approve from the zero address"));
        }
        if spender.is_zero() {
            return Err(LedgerError::InvalidRecipient("approve to the zero address"));
        }

        if value.is_zero() {
            self.allowances.remove(&(owner, spender));
        } else {
            self.allowances.insert((owner, spender), value);
        }
        self.events.push(LedgerEvent::Approval { owner, spender, value });
        Ok(())
    }

    /// Transfer on behalf of `from`, spending `spender`'s allowance.
    /// An allowance of `U256::MAX` is never decreased.
    pub fn transfer_from(
        &mut self,
        spender: Address,
        from: Address,
        to: Address,
        value: U256,
    ) -> Result<(), LedgerError> {
        let current = self.allowance(from, spender);
        let remaining = current
            .checked_sub(&value)
            .ok_or(LedgerError::InsufficientAllowance { have: current, need: value })?;

        self.transfer(from, to, value)?;

        if current != U256::MAX {
            if remaining.is_zero() {
                self.allowances.remove(&(from, spender));
            } else {
                self.allowances.insert((from, spender), remaining);
            }
        }
        Ok(())
    }

    /// Create `value` new tokens for `to`. Issuer only.
    pub fn mint(&mut self, caller: Address, to: Address, value: U256) -> Result<(), LedgerError> {
        if caller != self.issuer {
            return Err(LedgerError::Unauthorized);
        }
        if to.is_zero() {
            return Err(LedgerError::InvalidRecipient("mint to the zero address"));
        }
        if value.is_zero() {
            return Err(LedgerError::InvalidAmount("mint amount must be greater than 0"));
        }

        self.update(Address::ZERO, to, value)?;
        info!(%to, %value, supply = %self.total_supply, "minted");
        Ok(())
    }

    /// Destroy `value` of the caller's own tokens.
    pub fn burn(&mut self, caller: Address, value: U256) -> Result<(), LedgerError> {
        if caller.is_zero() {
            return Err(LedgerError::InvalidRecipient("burn from the zero address"));
        }
        if value.is_zero() {
            return Err(LedgerError::InvalidAmount("burn amount must be greater than 0"));
        }

        self.update(caller, Address::ZERO, value)?;
        info!(%caller, %value, supply = %self.total_supply, "burned");
        Ok(())
    }

    /// Point `delegator`'s voting power at `delegatee`.
    ///
    /// Delegating to `Address::ZERO` clears the delegation. The delegator's
    /// whole current balance moves from the old delegatee to the new one.
    pub fn delegate(&mut self, delegator: Address, delegatee: Address) -> Result<(), LedgerError> {
        if delegator.is_zero() {
            return Err(LedgerError::InvalidRecipient("delegate from the zero address"));
        }
        let old = self.delegates(delegator);
        let new = (!delegatee.is_zero()).then_some(delegatee);
        let weight = self.balance_of(delegator);

        let plan = self.plan_vote_move(old, new, weight)?;

        match new {
            Some(d) => self.delegates.insert(delegator, d),
            None => self.delegates.remove(&delegator),
        };
        self.events.push(LedgerEvent::DelegateChanged {
            delegator,
            from_delegate: old.unwrap_or(Address::ZERO),
            to_delegate: delegatee,
        });
        self.apply_vote_move(plan);

        info!(
            %delegator,
            %delegatee,
            %weight,
            checkpoint_records = self.checkpoints.total_records(),
            "delegate changed"
        );
        Ok(())
    }

    /// Check that balances add up to the total supply and that every
    /// delegatee's latest checkpoint equals the balances delegated to it.
    pub fn check_invariants(&self) -> Result<(), LedgerError> {
        let mut sum = U256::ZERO;
        for balance in self.balances.values() {
            sum = sum
                .checked_add(balance)
                .ok_or_else(|| LedgerError::InvariantViolation("balance sum overflows".into()))?;
        }
        if sum != self.total_supply {
            return Err(LedgerError::InvariantViolation(format!(
                "balances sum to {} but total supply is {}",
                sum, self.total_supply
            )));
        }

        let mut expected: HashMap<Address, U256> = HashMap::new();
        for (delegator, delegatee) in &self.delegates {
            let entry = expected.entry(*delegatee).or_default();
            *entry = entry
                .checked_add(&self.balance_of(*delegator))
                .ok_or_else(|| LedgerError::InvariantViolation("delegated sum overflows".into()))?;
        }

        for account in self.checkpoints.accounts().chain(expected.keys()) {
            let want = expected.get(account).copied().unwrap_or(U256::ZERO);
            let have = self.checkpoints.latest(account);
            if want != have {
                return Err(LedgerError::InvariantViolation(format!(
                    "{:x} has {} votes but {} is delegated to it",
                    account, have, want
                )));
            }
        }

        Ok(())
    }

    fn ensure_past(&self, block: u64) -> Result<(), LedgerError> {
        if block >= self.block_number {
            return Err(LedgerError::InvalidQuery {
                requested: block,
                current: self.block_number,
            });
        }
        Ok(())
    }

    /// Move `value` between accounts. A zero `from` mints, a zero `to` burns.
    fn update(&mut self, from: Address, to: Address, value: U256) -> Result<(), LedgerError> {
        let new_supply = if from.is_zero() {
            let supply = self
                .total_supply
                .checked_add(&value)
                .ok_or(LedgerError::Overflow("total supply"))?;
            if supply > max_supply() {
                return Err(LedgerError::Overflow("total supply exceeds 2^208 - 1"));
            }
            Some(supply)
        } else if to.is_zero() {
            Some(
                self.total_supply
                    .checked_sub(&value)
                    .ok_or(LedgerError::Overflow("total supply underflow"))?,
            )
        } else {
            None
        };

        let from_balance = if from.is_zero() {
            None
        } else {
            let have = self.balance_of(from);
            Some(
                have.checked_sub(&value)
                    .ok_or(LedgerError::InsufficientBalance { have, need: value })?,
            )
        };

        let to_balance = if to.is_zero() {
            None
        } else {
            let base = match from_balance {
                Some(b) if from == to => b,
                _ => self.balance_of(to),
            };
            Some(
                base.checked_add(&value)
                    .ok_or(LedgerError::Overflow("recipient balance"))?,
            )
        };

        let plan = self.plan_vote_move(self.delegates(from), self.delegates(to), value)?;

        if let Some(supply) = new_supply {
            self.total_supply = supply;
            self.supply_history.push(self.block_number, supply);
        }
        if let Some(balance) = from_balance {
            self.set_balance(from, balance);
        }
        if let Some(balance) = to_balance {
            self.set_balance(to, balance);
        }
        self.events.push(LedgerEvent::Transfer { from, to, value });
        self.apply_vote_move(plan);

        Ok(())
    }

    fn set_balance(&mut self, account: Address, balance: U256) {
        if balance.is_zero() {
            self.balances.remove(&account);
        } else {
            self.balances.insert(account, balance);
        }
    }

    fn plan_vote_move(
        &self,
        src: Option<Address>,
        dst: Option<Address>,
        amount: U256,
    ) -> Result<VoteMove, LedgerError> {
        if src == dst || amount.is_zero() {
            return Ok(VoteMove::default());
        }

        let debit = match src {
            Some(account) => Some((
                account,
                self.get_votes(account)
                    .checked_sub(&amount)
                    .ok_or(LedgerError::Overflow("delegated votes underflow"))?,
            )),
            None => None,
        };
        let credit = match dst {
            Some(account) => Some((
                account,
                self.get_votes(account)
                    .checked_add(&amount)
                    .ok_or(LedgerError::Overflow("delegated votes"))?,
            )),
            None => None,
        };

        Ok(VoteMove { debit, credit })
    }

    fn apply_vote_move(&mut self, plan: VoteMove) {
        for (account, votes) in plan.debit.into_iter().chain(plan.credit) {
            let previous = self.checkpoints.latest(&account);
            self.checkpoints.push(account, self.block_number, votes);
            self.events.push(LedgerEvent::DelegateVotesChanged {
                delegate: account,
                previous_votes: previous,
                new_votes: votes,
            });
        }
    }
}
