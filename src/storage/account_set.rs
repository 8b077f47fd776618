use crate::core::AccountId;
use crate::error::ValidationError;
use std::collections::HashMap;

/// ( K -> account id, V -> balance )
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AccountSet {
    balances: HashMap<AccountId, u128>,
}

impl AccountSet {
    /// Seed `count` accounts, one per genesis index, each holding `initial_balance`
    pub fn genesis(count: usize, initial_balance: u128) -> AccountSet {
        let balances = (0..count)
            .map(|index| (AccountId::genesis(index), initial_balance))
            .collect();
        AccountSet { balances }
    }

    pub fn balance(&self, account: &AccountId) -> Option<u128> {
        self.balances.get(account).copied()
    }

    pub fn contains(&self, account: &AccountId) -> bool {
        self.balances.contains_key(account)
    }

    pub fn len(&self) -> usize {
        self.balances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.balances.is_empty()
    }

    pub fn total_balance(&self) -> u128 {
        self.balances.values().sum()
    }

    /// Check that `amount` can move from `sender` to `receiver` without changing anything
    pub fn check_transfer(
        &self,
        sender: &AccountId,
        receiver: &AccountId,
        amount: u128,
    ) -> Result<(), ValidationError> {
        let available = self
            .balance(sender)
            .ok_or(ValidationError::UnknownAccount)?;
        if !self.contains(receiver) {
            return Err(ValidationError::UnknownAccount);
        }
        if available < amount {
            return Err(ValidationError::InsufficientFunds {
                required: amount,
                available,
            });
        }
        Ok(())
    }

    /// Debit `sender` and credit `receiver`. The total is unchanged.
    pub fn transfer(
        &mut self,
        sender: &AccountId,
        receiver: &AccountId,
        amount: u128,
    ) -> Result<(), ValidationError> {
        self.check_transfer(sender, receiver, amount)?;
        if let Some(balance) = self.balances.get_mut(sender) {
            *balance -= amount;
        }
        if let Some(balance) = self.balances.get_mut(receiver) {
            // bounded by the total supply, which fits since the sender held `amount`
            *balance += amount;
        }
        Ok(())
    }
}
