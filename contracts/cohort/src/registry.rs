//! Builder registry: the ordered slot list of active streams.
//!
//! `ActiveBuilders` holds the slots, `BuilderIndex(builder)` the slot of each
//! active builder. Removal swaps the last slot into the vacated one, so both
//! membership and removal are O(1). Stream records outlive removal with
//! `active = false`.

use soroban_sdk::{Address, Env, Vec};

use crate::{
    bump_instance, bump_persistent, save_persistent, ApprovalOverride, BuilderStream,
    CohortError, DataKey,
};

pub fn active_builders(env: &Env) -> Vec<Address> {
    env.storage()
        .instance()
        .get(&DataKey::ActiveBuilders)
        .unwrap_or_else(|| Vec::new(env))
}

fn set_active_builders(env: &Env, builders: &Vec<Address>) {
    env.storage()
        .instance()
        .set(&DataKey::ActiveBuilders, builders);
    bump_instance(env);
}

pub fn index_of(env: &Env, builder: &Address) -> Option<u32> {
    env.storage()
        .persistent()
        .get(&DataKey::BuilderIndex(builder.clone()))
}

pub fn is_active(env: &Env, builder: &Address) -> bool {
    env.storage()
        .persistent()
        .has(&DataKey::BuilderIndex(builder.clone()))
}

/// Stream record regardless of whether it is still active.
///
/// Reading a record keeps it, and the slot index of an active builder, alive
/// for another TTL period.
pub fn load(env: &Env, builder: &Address) -> Option<BuilderStream> {
    let key = DataKey::Builder(builder.clone());
    let stream: BuilderStream = env.storage().persistent().get(&key)?;
    bump_persistent(env, &key);
    if stream.active {
        bump_persistent(env, &DataKey::BuilderIndex(builder.clone()));
    }
    Some(stream)
}

pub fn active(env: &Env, builder: &Address) -> Option<BuilderStream> {
    load(env, builder).filter(|stream| stream.active)
}

pub fn save(env: &Env, stream: &BuilderStream) {
    save_persistent(env, &DataKey::Builder(stream.builder.clone()), stream);
}

fn check_cap(cap: i128) -> Result<(), CohortError> {
    if cap < 0 {
        return Err(CohortError::InvalidAmount);
    }
    Ok(())
}

/// Starts a fresh stream for `builder`. A previously removed builder gets a
/// new record; its request history is untouched.
pub fn add(env: &Env, builder: &Address, cap: i128, now: u64) -> Result<BuilderStream, CohortError> {
    check_cap(cap)?;
    if is_active(env, builder) {
        return Err(CohortError::DuplicateBuilder);
    }
    Ok(insert(env, builder, cap, now))
}

fn insert(env: &Env, builder: &Address, cap: i128, now: u64) -> BuilderStream {
    let mut builders = active_builders(env);
    let slot = builders.len();
    builders.push_back(builder.clone());
    set_active_builders(env, &builders);
    save_persistent(env, &DataKey::BuilderIndex(builder.clone()), &slot);

    let stream = BuilderStream {
        builder: builder.clone(),
        cap,
        accrual_reset_at: now,
        approval: ApprovalOverride::Inherit,
        active: true,
    };
    save(env, &stream);
    stream
}

/// All-or-nothing: every entry is validated before the first one is stored.
pub fn add_batch(
    env: &Env,
    builders: &Vec<Address>,
    caps: &Vec<i128>,
    now: u64,
) -> Result<Vec<BuilderStream>, CohortError> {
    if builders.len() != caps.len() {
        return Err(CohortError::LengthMismatch);
    }

    for (i, builder) in builders.iter().enumerate() {
        let i = i as u32;
        check_cap(caps.get(i).unwrap_or(0))?;
        if is_active(env, &builder) {
            return Err(CohortError::DuplicateBuilder);
        }
        // Repeated entries inside the batch itself.
        if builders.first_index_of(&builder) != Some(i) {
            return Err(CohortError::DuplicateBuilder);
        }
    }

    let mut added = Vec::new(env);
    for (builder, cap) in builders.iter().zip(caps.iter()) {
        added.push_back(insert(env, &builder, cap, now));
    }
    Ok(added)
}

pub fn remove(env: &Env, builder: &Address) -> Result<BuilderStream, CohortError> {
    let mut stream = active(env, builder).ok_or(CohortError::UnknownBuilder)?;
    let slot = index_of(env, builder).ok_or(CohortError::UnknownBuilder)?;

    let mut builders = active_builders(env);
    let last_slot = builders.len() - 1;
    if slot != last_slot {
        let moved = builders
            .get(last_slot)
            .expect("active builder slots out of sync");
        builders.set(slot, moved.clone());
        save_persistent(env, &DataKey::BuilderIndex(moved), &slot);
    }
    builders.pop_back();
    set_active_builders(env, &builders);
    env.storage()
        .persistent()
        .remove(&DataKey::BuilderIndex(builder.clone()));

    stream.active = false;
    save(env, &stream);
    Ok(stream)
}

/// Leaves `accrual_reset_at` alone: a lower cap limits future unlocks, it does
/// not claw back what already accrued under the old cap.
pub fn update_cap(env: &Env, builder: &Address, cap: i128) -> Result<BuilderStream, CohortError> {
    check_cap(cap)?;
    let mut stream = active(env, builder).ok_or(CohortError::UnknownBuilder)?;
    stream.cap = cap;
    save(env, &stream);
    Ok(stream)
}

pub fn set_approval(
    env: &Env,
    builder: &Address,
    approval: ApprovalOverride,
) -> Result<BuilderStream, CohortError> {
    let mut stream = active(env, builder).ok_or(CohortError::UnknownBuilder)?;
    stream.approval = approval;
    save(env, &stream);
    Ok(stream)
}
