#![no_std]

mod accrual;
mod admin;
mod events;
mod pool;
mod registry;
mod requests;

use soroban_sdk::{
    contract, contractimpl, contracttype, log, Address, Env, IntoVal, String, Val, Vec,
};

// ---------------------------------------------------------------------------
// Data types
// ---------------------------------------------------------------------------

/// Asset held by the funding pool.
///
/// On Soroban the native asset is reached through its Stellar Asset Contract,
/// so both variants carry the contract address used for transfers. They differ
/// only in funding rules: a native-mode pool refuses empty deposits.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Asset {
    Native(Address),
    Token(Address),
}

impl Asset {
    pub fn address(&self) -> &Address {
        match self {
            Asset::Native(address) | Asset::Token(address) => address,
        }
    }

    pub fn is_native(&self) -> bool {
        matches!(self, Asset::Native(_))
    }
}

/// Settings fixed at bootstrap.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CohortConfig {
    pub name: String,
    pub description: String,
    pub asset: Asset,
    /// Seconds over which a stream unlocks its full cap.
    pub cycle: u64,
}

/// Admin-mutable control plane.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AdminState {
    pub primary_admin: Address,
    /// Contract-wide default for builders whose override is `Inherit`.
    pub require_approval: bool,
    pub locked: bool,
}

#[contracttype]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ApprovalOverride {
    Inherit = 0,
    Always = 1,
    Never = 2,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BuilderStream {
    pub builder: Address,
    pub cap: i128,
    /// Start of the current accrual window; moved to "now" by every completed
    /// withdrawal.
    pub accrual_reset_at: u64,
    pub approval: ApprovalOverride,
    pub active: bool,
}

#[contracttype]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RequestStatus {
    Pending = 0,
    Approved = 1,
    Rejected = 2,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct WithdrawRequest {
    pub id: u32,
    pub builder: Address,
    pub amount: i128,
    pub reason: String,
    pub project: String,
    pub requested_at: u64,
    pub status: RequestStatus,
    pub resolved_at: Option<u64>,
}

/// Result of `request_withdrawal`: paid out now, or queued for the admin.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum WithdrawOutcome {
    Completed,
    Requested(u32),
}

/// Read-side projection of one builder's stream.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BuilderData {
    pub builder: Address,
    pub cap: i128,
    pub unlocked: i128,
    pub active: bool,
}

#[soroban_sdk::contracterror]
#[derive(Clone, Copy, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum CohortError {
    NotInitialized = 1,
    AlreadyInitialized = 2,
    AccessDenied = 3,
    ContractIsLocked = 4,
    NoActiveStreamForBuilder = 5,
    DuplicateBuilder = 6,
    UnknownBuilder = 7,
    UnknownRequest = 8,
    RequestAlreadyResolved = 9,
    PendingWithdrawRequestExists = 10,
    InsufficientInStream = 11,
    InsufficientPoolBalance = 12,
    NoValueSent = 13,
    LengthMismatch = 14,
    InvalidAmount = 15,
    InvalidCycle = 16,
}

/// Namespace for all contract storage keys.
#[contracttype]
pub enum DataKey {
    Config,                // Instance: CohortConfig.
    Admin,                 // Instance: AdminState.
    Pool,                  // Instance: tracked pool balance.
    ActiveBuilders,        // Instance: ordered slot list of active builders.
    OpenRequests,          // Instance: builders with a pending request.
    Builder(Address),      // Persistent: BuilderStream, kept after removal.
    BuilderIndex(Address), // Persistent: slot in ActiveBuilders, active builders only.
    Requests(Address),     // Persistent: request history.
    OpenRequest(Address),  // Persistent: id of the pending request.
}

// ---------------------------------------------------------------------------
// Storage helpers
// ---------------------------------------------------------------------------

const TTL_THRESHOLD: u32 = 17280;
const TTL_EXTEND_TO: u32 = 120960;

pub(crate) fn bump_instance(env: &Env) {
    env.storage()
        .instance()
        .extend_ttl(TTL_THRESHOLD, TTL_EXTEND_TO);
}

pub(crate) fn save_persistent<V>(env: &Env, key: &DataKey, value: &V)
where
    V: IntoVal<Env, Val>,
{
    env.storage().persistent().set(key, value);
    bump_persistent(env, key);
}

/// The entry must exist.
pub(crate) fn bump_persistent(env: &Env, key: &DataKey) {
    env.storage()
        .persistent()
        .extend_ttl(key, TTL_THRESHOLD, TTL_EXTEND_TO);
}

fn load_config(env: &Env) -> Result<CohortConfig, CohortError> {
    env.storage()
        .instance()
        .get(&DataKey::Config)
        .ok_or(CohortError::NotInitialized)
}

fn unlocked_now(env: &Env, config: &CohortConfig, stream: &BuilderStream) -> i128 {
    if !stream.active {
        return 0;
    }
    // Every completed withdrawal resets the clock, so nothing has been paid
    // inside the current window.
    accrual::unlocked_amount(
        stream.cap,
        config.cycle,
        env.ledger().timestamp(),
        stream.accrual_reset_at,
        0,
    )
}

// ---------------------------------------------------------------------------
// Contract Implementation
// ---------------------------------------------------------------------------

#[contract]
pub struct CohortStream;

#[contractimpl]
impl CohortStream {
    /// Bootstrap the cohort.
    ///
    /// Must be called exactly once. Stores the immutable `config`, the admin
    /// plane (`admin` as primary admin, `require_approval` as the contract-wide
    /// default, unlocked) and starts a stream for every initial builder with
    /// its accrual clock at the current ledger time.
    ///
    /// # Errors
    /// - `AlreadyInitialized` on a second call
    /// - `InvalidCycle` if `config.cycle` is zero
    /// - `LengthMismatch` if `builders` and `caps` differ in length
    /// - `DuplicateBuilder` / `InvalidAmount` for a repeated builder or a negative cap
    ///
    /// # Events
    /// - `added(builder)` with `(cap, timestamp)` per initial builder
    pub fn init(
        env: Env,
        admin: Address,
        config: CohortConfig,
        builders: Vec<Address>,
        caps: Vec<i128>,
        require_approval: bool,
    ) -> Result<(), CohortError> {
        if env.storage().instance().has(&DataKey::Config) {
            return Err(CohortError::AlreadyInitialized);
        }
        if config.cycle == 0 {
            return Err(CohortError::InvalidCycle);
        }

        let now = env.ledger().timestamp();
        let added = registry::add_batch(&env, &builders, &caps, now)?;

        env.storage().instance().set(&DataKey::Config, &config);
        admin::save(
            &env,
            &AdminState {
                primary_admin: admin,
                require_approval,
                locked: false,
            },
        );

        for stream in added.iter() {
            events::builder_added(&env, &stream.builder, stream.cap, now);
        }
        Ok(())
    }

    /// Deposit `amount` of the cohort asset from `funder` into the pool.
    ///
    /// Funding stays open while the contract is locked. A native-mode pool
    /// rejects empty deposits with `NoValueSent`; a token-mode pool accepts a
    /// zero amount as a no-op. Negative amounts always fail `NoValueSent`.
    ///
    /// Returns the pool balance after the deposit.
    pub fn fund(env: Env, funder: Address, amount: i128) -> Result<i128, CohortError> {
        funder.require_auth();
        let config = load_config(&env)?;

        if amount < 0 || (amount == 0 && config.asset.is_native()) {
            return Err(CohortError::NoValueSent);
        }

        // Pull funds first; a failed transfer aborts before the pool moves.
        if amount > 0 {
            pool::pull(&env, &config.asset, &funder, amount);
        }
        let balance = pool::credit(&env, amount);

        events::funded(&env, &funder, amount, env.ledger().timestamp());
        Ok(balance)
    }

    /// Start a stream for `builder` with `cap` per cycle. Nothing is unlocked
    /// until time passes after the add.
    ///
    /// # Authorization
    /// - Requires authorization from `caller`, who must be the primary admin
    ///
    /// # Errors
    /// - `AccessDenied`
    /// - `DuplicateBuilder` if `builder` already has an active stream
    /// - `InvalidAmount` for a negative cap
    ///
    /// # Events
    /// - `added(builder)` with `(cap, timestamp)`
    pub fn add_builder(
        env: Env,
        caller: Address,
        builder: Address,
        cap: i128,
    ) -> Result<(), CohortError> {
        admin::require_admin(&env, &caller)?;
        let now = env.ledger().timestamp();
        let stream = registry::add(&env, &builder, cap, now)?;
        events::builder_added(&env, &stream.builder, stream.cap, now);
        Ok(())
    }

    /// Add several builders at once. Either all are added or none is.
    pub fn add_batch(
        env: Env,
        caller: Address,
        builders: Vec<Address>,
        caps: Vec<i128>,
    ) -> Result<(), CohortError> {
        admin::require_admin(&env, &caller)?;
        let now = env.ledger().timestamp();
        for stream in registry::add_batch(&env, &builders, &caps, now)?.iter() {
            events::builder_added(&env, &stream.builder, stream.cap, now);
        }
        Ok(())
    }

    /// Deactivate a builder's stream. The record and its request history stay
    /// queryable; the builder can no longer withdraw.
    ///
    /// A pending request of the builder is rejected along with the stream, so
    /// a later re-add starts without an open claim.
    ///
    /// # Events
    /// - `rejected(builder)` with `(request_id, timestamp)` if a request was pending
    /// - `updated(builder)` with `(0, timestamp)`
    pub fn remove_builder(env: Env, caller: Address, builder: Address) -> Result<(), CohortError> {
        admin::require_admin(&env, &caller)?;
        let now = env.ledger().timestamp();
        registry::remove(&env, &builder)?;

        if let Some(request) = requests::pending(&env, &builder) {
            requests::resolve(&env, &builder, request.id, false, now)?;
            events::withdrawal_rejected(&env, &builder, request.id, now);
            log!(&env, "pending withdrawal rejected on removal", builder, request.id);
        }

        events::builder_updated(&env, &builder, 0, now);
        Ok(())
    }

    /// Change a builder's cap. Takes effect for the next unlock computation;
    /// the accrual clock is not reset.
    pub fn update_cap(
        env: Env,
        caller: Address,
        builder: Address,
        new_cap: i128,
    ) -> Result<(), CohortError> {
        admin::require_admin(&env, &caller)?;
        let stream = registry::update_cap(&env, &builder, new_cap)?;
        events::builder_updated(&env, &builder, stream.cap, env.ledger().timestamp());
        Ok(())
    }

    /// Withdraw unlocked funds, or ask the admin to release them.
    ///
    /// # Behavior
    /// 1. Rejects the call while the contract is locked
    /// 2. Requires an active stream and no pending request for `builder`
    /// 3. Checks `amount` against the amount unlocked right now
    /// 4. If the builder needs no approval, pays out immediately: the pool is
    ///    debited, the accrual clock restarts at the current ledger time and
    ///    the tokens are transferred. No request is recorded.
    /// 5. Otherwise records a pending request; no funds move.
    ///
    /// # Authorization
    /// - Requires authorization from `builder`
    ///
    /// # Errors
    /// - `ContractIsLocked`, `NoActiveStreamForBuilder`,
    ///   `PendingWithdrawRequestExists`, `InvalidAmount` (zero or negative),
    ///   `InsufficientInStream`, and `InsufficientPoolBalance` on the immediate
    ///   path when the pool cannot cover the payout
    ///
    /// # Events
    /// - Immediate path: `withdrew(builder)` with `(amount, reason, project, timestamp)`
    /// - Deferred path: `requested(builder)` with `(request_id, amount, reason, project, timestamp)`
    ///
    /// # Usage Notes
    /// - Any completed withdrawal restarts the clock from zero, even when it
    ///   takes less than the full unlocked amount
    pub fn request_withdrawal(
        env: Env,
        builder: Address,
        amount: i128,
        reason: String,
        project: String,
    ) -> Result<WithdrawOutcome, CohortError> {
        builder.require_auth();

        let state = admin::load(&env)?;
        admin::require_unlocked(&state)?;
        let config = load_config(&env)?;
        let mut stream =
            registry::active(&env, &builder).ok_or(CohortError::NoActiveStreamForBuilder)?;
        if requests::has_pending(&env, &builder) {
            return Err(CohortError::PendingWithdrawRequestExists);
        }
        if amount <= 0 {
            return Err(CohortError::InvalidAmount);
        }
        if amount > unlocked_now(&env, &config, &stream) {
            return Err(CohortError::InsufficientInStream);
        }

        let now = env.ledger().timestamp();
        if !admin::approval_required(&state, &stream) {
            Self::complete_withdrawal(&env, &config, &mut stream, amount, now)?;
            events::withdrawal_completed(&env, &builder, amount, &reason, &project, now);
            log!(&env, "withdrawal paid out", builder, amount);
            return Ok(WithdrawOutcome::Completed);
        }

        let request = requests::create(&env, &builder, amount, reason, project, now);
        events::withdrawal_requested(
            &env,
            &builder,
            request.id,
            request.amount,
            &request.reason,
            &request.project,
            now,
        );
        log!(&env, "withdrawal requested", builder, request.id, amount);
        Ok(WithdrawOutcome::Requested(request.id))
    }

    /// Approve a pending request and pay it out.
    ///
    /// The unlocked ceiling was checked when the request was made and is not
    /// re-checked here; only the pool balance is, since the pool may have been
    /// drained in between.
    ///
    /// # Authorization
    /// - Requires authorization from `caller`, who must be the primary admin
    ///
    /// # Errors
    /// - `AccessDenied`, `ContractIsLocked`
    /// - `UnknownRequest` / `RequestAlreadyResolved`
    /// - `NoActiveStreamForBuilder` if the builder has no active stream
    /// - `InsufficientPoolBalance`
    ///
    /// # Events
    /// - `withdrew(builder)` then `approved(builder)` with `(request_id, timestamp)`
    pub fn approve(
        env: Env,
        caller: Address,
        builder: Address,
        request_id: u32,
    ) -> Result<(), CohortError> {
        let state = admin::require_admin(&env, &caller)?;
        admin::require_unlocked(&state)?;
        let config = load_config(&env)?;

        let request = requests::load_pending(&env, &builder, request_id)?;
        let mut stream =
            registry::active(&env, &builder).ok_or(CohortError::NoActiveStreamForBuilder)?;

        let now = env.ledger().timestamp();
        Self::complete_withdrawal(&env, &config, &mut stream, request.amount, now)?;
        requests::resolve(&env, &builder, request_id, true, now)?;

        events::withdrawal_completed(
            &env,
            &builder,
            request.amount,
            &request.reason,
            &request.project,
            now,
        );
        events::withdrawal_approved(&env, &builder, request_id, now);
        log!(&env, "withdrawal approved", builder, request_id);
        Ok(())
    }

    /// Reject a pending request. No funds move and the builder's accrual
    /// clock keeps running. Allowed while locked.
    pub fn reject(
        env: Env,
        caller: Address,
        builder: Address,
        request_id: u32,
    ) -> Result<(), CohortError> {
        admin::require_admin(&env, &caller)?;
        let now = env.ledger().timestamp();
        requests::resolve(&env, &builder, request_id, false, now)?;
        events::withdrawal_rejected(&env, &builder, request_id, now);
        log!(&env, "withdrawal rejected", builder, request_id);
        Ok(())
    }

    /// Send the whole pool balance to `destination`. Returns the amount sent;
    /// an empty pool is a no-op returning 0.
    pub fn drain(env: Env, caller: Address, destination: Address) -> Result<i128, CohortError> {
        admin::require_admin(&env, &caller)?;
        let config = load_config(&env)?;

        let amount = pool::take_all(&env);
        if amount == 0 {
            return Ok(0);
        }
        pool::pay(&env, &config.asset, &destination, amount);

        events::drained(&env, &destination, amount, env.ledger().timestamp());
        log!(&env, "pool drained", destination, amount);
        Ok(amount)
    }

    /// Hand the admin role to `new_admin`. The old admin loses access at once.
    ///
    /// # Authorization
    /// - Requires authorization from `caller`, who must be the primary admin
    ///
    /// # Errors
    /// - `AccessDenied`
    ///
    /// # Events
    /// - `("admin", "transfer")` with `(old_admin, new_admin)`
    pub fn transfer_admin(env: Env, caller: Address, new_admin: Address) -> Result<(), CohortError> {
        let mut state = admin::require_admin(&env, &caller)?;
        let old_admin = state.primary_admin.clone();
        state.primary_admin = new_admin.clone();
        admin::save(&env, &state);
        events::admin_transferred(&env, &old_admin, &new_admin);
        Ok(())
    }

    /// Set whether builders with an `Inherit` override need approval.
    ///
    /// # Authorization
    /// - Requires authorization from `caller`, who must be the primary admin
    ///
    /// # Errors
    /// - `AccessDenied`
    pub fn set_approval_default(env: Env, caller: Address, required: bool) -> Result<(), CohortError> {
        let mut state = admin::require_admin(&env, &caller)?;
        state.require_approval = required;
        admin::save(&env, &state);
        Ok(())
    }

    /// Override the approval requirement for one builder.
    ///
    /// # Authorization
    /// - Requires authorization from `caller`, who must be the primary admin
    ///
    /// # Errors
    /// - `AccessDenied`
    /// - `UnknownBuilder` if `builder` has no active stream
    pub fn set_builder_approval(
        env: Env,
        caller: Address,
        builder: Address,
        approval: ApprovalOverride,
    ) -> Result<(), CohortError> {
        admin::require_admin(&env, &caller)?;
        registry::set_approval(&env, &builder, approval)?;
        Ok(())
    }

    /// Lock or unlock the contract. While locked, builders cannot withdraw and
    /// requests cannot be approved.
    pub fn set_locked(env: Env, caller: Address, locked: bool) -> Result<(), CohortError> {
        let mut state = admin::require_admin(&env, &caller)?;
        state.locked = locked;
        admin::save(&env, &state);
        events::contract_locked(&env, locked, env.ledger().timestamp());
        log!(&env, "lock toggled", locked);
        Ok(())
    }

    // -- Views --------------------------------------------------------------

    pub fn get_config(env: Env) -> Result<CohortConfig, CohortError> {
        load_config(&env)
    }

    pub fn primary_admin(env: Env) -> Result<Address, CohortError> {
        Ok(admin::load(&env)?.primary_admin)
    }

    pub fn is_admin(env: Env, identity: Address) -> Result<bool, CohortError> {
        Ok(admin::is_admin(&admin::load(&env)?, &identity))
    }

    pub fn is_locked(env: Env) -> Result<bool, CohortError> {
        Ok(admin::load(&env)?.locked)
    }

    pub fn contract_approval_default(env: Env) -> Result<bool, CohortError> {
        Ok(admin::load(&env)?.require_approval)
    }

    /// Whether a withdrawal by `builder` would need approval right now.
    pub fn requires_approval(env: Env, builder: Address) -> Result<bool, CohortError> {
        let state = admin::load(&env)?;
        let stream = registry::active(&env, &builder).ok_or(CohortError::UnknownBuilder)?;
        Ok(admin::approval_required(&state, &stream))
    }

    pub fn pool_balance(env: Env) -> i128 {
        pool::balance(&env)
    }

    pub fn active_builders(env: Env) -> Vec<Address> {
        registry::active_builders(&env)
    }

    pub fn builder_index(env: Env, builder: Address) -> Result<u32, CohortError> {
        registry::index_of(&env, &builder).ok_or(CohortError::UnknownBuilder)
    }

    /// Stream record, including removed builders.
    pub fn get_builder(env: Env, builder: Address) -> Result<BuilderStream, CohortError> {
        registry::load(&env, &builder).ok_or(CohortError::UnknownBuilder)
    }

    /// Amount `builder` could withdraw now; 0 for unknown or removed builders.
    pub fn unlocked_amount(env: Env, builder: Address) -> Result<i128, CohortError> {
        let config = load_config(&env)?;
        Ok(registry::load(&env, &builder)
            .map(|stream| unlocked_now(&env, &config, &stream))
            .unwrap_or(0))
    }

    /// Cap and unlocked amount per address, in input order. Unknown addresses
    /// come back with zeros and `active = false`.
    pub fn all_builders_data(
        env: Env,
        builders: Vec<Address>,
    ) -> Result<Vec<BuilderData>, CohortError> {
        let config = load_config(&env)?;
        let mut data = Vec::new(&env);
        for builder in builders.iter() {
            let entry = match registry::load(&env, &builder) {
                Some(stream) => BuilderData {
                    unlocked: unlocked_now(&env, &config, &stream),
                    cap: stream.cap,
                    active: stream.active,
                    builder,
                },
                None => BuilderData {
                    builder,
                    cap: 0,
                    unlocked: 0,
                    active: false,
                },
            };
            data.push_back(entry);
        }
        Ok(data)
    }

    pub fn get_withdraw_request(
        env: Env,
        builder: Address,
        request_id: u32,
    ) -> Result<WithdrawRequest, CohortError> {
        requests::get(&env, &builder, request_id)
    }

    pub fn withdraw_requests(env: Env, builder: Address) -> Vec<WithdrawRequest> {
        requests::history(&env, &builder)
    }

    pub fn pending_request(env: Env, builder: Address) -> Option<WithdrawRequest> {
        requests::pending(&env, &builder)
    }

    /// Every open request across the cohort.
    pub fn pending_requests(env: Env) -> Vec<WithdrawRequest> {
        let mut open = Vec::new(&env);
        for builder in requests::builders_with_pending(&env).iter() {
            if let Some(request) = requests::pending(&env, &builder) {
                open.push_back(request);
            }
        }
        open
    }
}

// ---------------------------------------------------------------------------
// Internal Helpers
// ---------------------------------------------------------------------------

impl CohortStream {
    /// Pays `amount` to the stream's builder and restarts its accrual clock.
    ///
    /// The pool check is the only fallible step and runs before any write;
    /// the pool debit and the clock reset land in the same invocation.
    fn complete_withdrawal(
        env: &Env,
        config: &CohortConfig,
        stream: &mut BuilderStream,
        amount: i128,
        now: u64,
    ) -> Result<(), CohortError> {
        pool::debit(env, amount)?;
        stream.accrual_reset_at = now;
        registry::save(env, stream);

        // CEI: state is settled before the outbound transfer.
        pool::pay(env, &config.asset, &stream.builder, amount);
        Ok(())
    }
}
