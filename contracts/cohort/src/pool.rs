//! Custodied balance of the cohort asset.
//!
//! The tracked balance only moves through `credit`/`debit`/`take_all`; token
//! transfers are issued by the contract after the balance is updated.

use soroban_sdk::{token, Address, Env};

use crate::{bump_instance, Asset, CohortError, DataKey};

pub fn balance(env: &Env) -> i128 {
    env.storage().instance().get(&DataKey::Pool).unwrap_or(0)
}

fn set_balance(env: &Env, balance: i128) {
    env.storage().instance().set(&DataKey::Pool, &balance);
    bump_instance(env);
}

pub fn credit(env: &Env, amount: i128) -> i128 {
    let updated = balance(env)
        .checked_add(amount)
        .expect("overflow crediting funding pool");
    set_balance(env, updated);
    updated
}

/// Fails without writing when the pool cannot cover `amount`.
pub fn debit(env: &Env, amount: i128) -> Result<i128, CohortError> {
    let current = balance(env);
    if amount > current {
        return Err(CohortError::InsufficientPoolBalance);
    }
    let updated = current - amount;
    set_balance(env, updated);
    Ok(updated)
}

/// Empties the pool and returns what it held.
pub fn take_all(env: &Env) -> i128 {
    let current = balance(env);
    if current > 0 {
        set_balance(env, 0);
    }
    current
}

pub fn pull(env: &Env, asset: &Asset, from: &Address, amount: i128) {
    let client = token::Client::new(env, asset.address());
    client.transfer(from, &env.current_contract_address(), &amount);
}

pub fn pay(env: &Env, asset: &Asset, to: &Address, amount: i128) {
    let client = token::Client::new(env, asset.address());
    client.transfer(&env.current_contract_address(), to, &amount);
}
