//! Admin control plane: primary admin, approval defaults and the lock flag.

use soroban_sdk::{Address, Env};

use crate::{bump_instance, AdminState, ApprovalOverride, BuilderStream, CohortError, DataKey};

pub fn load(env: &Env) -> Result<AdminState, CohortError> {
    env.storage()
        .instance()
        .get(&DataKey::Admin)
        .ok_or(CohortError::NotInitialized)
}

pub fn save(env: &Env, state: &AdminState) {
    env.storage().instance().set(&DataKey::Admin, state);
    bump_instance(env);
}

/// Authenticates `caller` and checks it is the primary admin.
///
/// Runs before any read of the record being changed, so a rejected caller
/// never touches state.
pub fn require_admin(env: &Env, caller: &Address) -> Result<AdminState, CohortError> {
    caller.require_auth();
    let state = load(env)?;
    if !is_admin(&state, caller) {
        return Err(CohortError::AccessDenied);
    }
    Ok(state)
}

pub fn is_admin(state: &AdminState, identity: &Address) -> bool {
    state.primary_admin == *identity
}

pub fn require_unlocked(state: &AdminState) -> Result<(), CohortError> {
    if state.locked {
        return Err(CohortError::ContractIsLocked);
    }
    Ok(())
}

/// The builder's override wins; `Inherit` falls back to the contract default.
pub fn approval_required(state: &AdminState, stream: &BuilderStream) -> bool {
    match stream.approval {
        ApprovalOverride::Always => true,
        ApprovalOverride::Never => false,
        ApprovalOverride::Inherit => state.require_approval,
    }
}
