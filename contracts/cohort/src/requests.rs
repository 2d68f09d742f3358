//! Per-builder withdrawal request log.
//!
//! `Requests(builder)` is append-only; request ids are positions in that list.
//! `OpenRequest(builder)` marks the single pending request so the
//! one-outstanding-request rule never scans history. `OpenRequests` lists the
//! builders that currently have one, for the global pending view.

use soroban_sdk::{Address, Env, String, Vec};

use crate::{
    bump_instance, bump_persistent, save_persistent, CohortError, DataKey, RequestStatus,
    WithdrawRequest,
};

pub fn history(env: &Env, builder: &Address) -> Vec<WithdrawRequest> {
    let key = DataKey::Requests(builder.clone());
    match env.storage().persistent().get(&key) {
        Some(log) => {
            bump_persistent(env, &key);
            log
        }
        None => Vec::new(env),
    }
}

pub fn has_pending(env: &Env, builder: &Address) -> bool {
    env.storage()
        .persistent()
        .has(&DataKey::OpenRequest(builder.clone()))
}

pub fn pending(env: &Env, builder: &Address) -> Option<WithdrawRequest> {
    let key = DataKey::OpenRequest(builder.clone());
    let id: u32 = env.storage().persistent().get(&key)?;
    bump_persistent(env, &key);
    history(env, builder).get(id)
}

pub fn builders_with_pending(env: &Env) -> Vec<Address> {
    env.storage()
        .instance()
        .get(&DataKey::OpenRequests)
        .unwrap_or_else(|| Vec::new(env))
}

pub fn get(env: &Env, builder: &Address, request_id: u32) -> Result<WithdrawRequest, CohortError> {
    history(env, builder)
        .get(request_id)
        .ok_or(CohortError::UnknownRequest)
}

/// The request, provided it can still be resolved.
pub fn load_pending(
    env: &Env,
    builder: &Address,
    request_id: u32,
) -> Result<WithdrawRequest, CohortError> {
    let request = get(env, builder, request_id)?;
    if request.status != RequestStatus::Pending {
        return Err(CohortError::RequestAlreadyResolved);
    }
    Ok(request)
}

/// Callers enforce the single-pending rule through `has_pending` first.
pub fn create(
    env: &Env,
    builder: &Address,
    amount: i128,
    reason: String,
    project: String,
    now: u64,
) -> WithdrawRequest {
    let mut log = history(env, builder);
    let request = WithdrawRequest {
        id: log.len(),
        builder: builder.clone(),
        amount,
        reason,
        project,
        requested_at: now,
        status: RequestStatus::Pending,
        resolved_at: None,
    };
    log.push_back(request.clone());
    save_persistent(env, &DataKey::Requests(builder.clone()), &log);
    save_persistent(env, &DataKey::OpenRequest(builder.clone()), &request.id);

    let mut open = builders_with_pending(env);
    open.push_back(builder.clone());
    env.storage().instance().set(&DataKey::OpenRequests, &open);
    bump_instance(env);

    request
}

/// Moves a pending request to its terminal status. Terminal requests are
/// never written again.
pub fn resolve(
    env: &Env,
    builder: &Address,
    request_id: u32,
    approved: bool,
    now: u64,
) -> Result<WithdrawRequest, CohortError> {
    let mut request = load_pending(env, builder, request_id)?;
    request.status = if approved {
        RequestStatus::Approved
    } else {
        RequestStatus::Rejected
    };
    request.resolved_at = Some(now);

    let mut log = history(env, builder);
    log.set(request_id, request.clone());
    save_persistent(env, &DataKey::Requests(builder.clone()), &log);
    env.storage()
        .persistent()
        .remove(&DataKey::OpenRequest(builder.clone()));

    let mut open = builders_with_pending(env);
    if let Some(slot) = open.first_index_of(builder) {
        open.remove(slot);
        env.storage().instance().set(&DataKey::OpenRequests, &open);
        bump_instance(env);
    }

    Ok(request)
}
