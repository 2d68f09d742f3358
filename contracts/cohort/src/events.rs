//! Domain events consumed by indexers and notifiers.
//!
//! Topics are `(name, subject)`; data tuples end with the ledger timestamp.

use soroban_sdk::{symbol_short, Address, Env, String};

pub fn builder_added(env: &Env, builder: &Address, cap: i128, at: u64) {
    env.events()
        .publish((symbol_short!("added"), builder.clone()), (cap, at));
}

/// Also published on removal, with a cap of 0.
pub fn builder_updated(env: &Env, builder: &Address, cap: i128, at: u64) {
    env.events()
        .publish((symbol_short!("updated"), builder.clone()), (cap, at));
}

pub fn funded(env: &Env, funder: &Address, amount: i128, at: u64) {
    env.events()
        .publish((symbol_short!("funded"), funder.clone()), (amount, at));
}

pub fn withdrawal_requested(
    env: &Env,
    builder: &Address,
    request_id: u32,
    amount: i128,
    reason: &String,
    project: &String,
    at: u64,
) {
    env.events().publish(
        (symbol_short!("requested"), builder.clone()),
        (request_id, amount, reason.clone(), project.clone(), at),
    );
}

/// Funds left the pool for a builder, on the immediate path or on approval.
pub fn withdrawal_completed(
    env: &Env,
    builder: &Address,
    amount: i128,
    reason: &String,
    project: &String,
    at: u64,
) {
    env.events().publish(
        (symbol_short!("withdrew"), builder.clone()),
        (amount, reason.clone(), project.clone(), at),
    );
}

pub fn withdrawal_approved(env: &Env, builder: &Address, request_id: u32, at: u64) {
    env.events()
        .publish((symbol_short!("approved"), builder.clone()), (request_id, at));
}

pub fn withdrawal_rejected(env: &Env, builder: &Address, request_id: u32, at: u64) {
    env.events()
        .publish((symbol_short!("rejected"), builder.clone()), (request_id, at));
}

pub fn contract_locked(env: &Env, locked: bool, at: u64) {
    env.events().publish((symbol_short!("locked"),), (locked, at));
}

pub fn admin_transferred(env: &Env, old_admin: &Address, new_admin: &Address) {
    env.events().publish(
        (symbol_short!("admin"), symbol_short!("transfer")),
        (old_admin.clone(), new_admin.clone()),
    );
}

pub fn drained(env: &Env, destination: &Address, amount: i128, at: u64) {
    env.events().publish(
        (symbol_short!("drained"), destination.clone()),
        (amount, at),
    );
}
