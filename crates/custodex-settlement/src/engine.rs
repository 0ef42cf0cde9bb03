//! The settlement engine — custody operations and atomic batch settlement.
//!
//! The engine owns all ledger state and serializes every mutation. Each call
//! takes the current block height explicitly; nothing here reads a clock.
//!
//! Failure discipline: a rejected call leaves the ledger, the nonce window
//! and the withdrawal book exactly as they were. For batches this is done by
//! staging every balance change and nonce consumption in an overlay that is
//! flushed only after the last trade validated.

use std::collections::{HashMap, HashSet};

use custodex_custody::{
    AssetRegistry, BalanceLedger, CustodyAdapter, NonceWindow, WithdrawBook, WithdrawRequest,
};
use custodex_types::constants::{
    MAX_SCALED_BALANCE, NATIVE_ASSET_INDEX, NATIVE_DECIMALS, NATIVE_INTERNAL_DECIMALS,
};
use custodex_types::{
    AccountId, Asset, AssetId, AssetIndex, Batch, CustodexError, EngineConfig, LedgerError,
    Nonce, NonceError, RegistrationError, Result, SettlementEvent, TransferError, WithdrawalError,
};

use crate::validate::{ScaledOrder, validate_order, validate_pair};

// ---------------------------------------------------------------------------
// Batch overlay
// ---------------------------------------------------------------------------

/// Balance changes staged during batch settlement. Reads fall through to the
/// underlying ledger; writes stay here until the whole batch validated.
struct Overlay<'a> {
    ledger: &'a BalanceLedger,
    staged: HashMap<(AccountId, AssetIndex), u64>,
}

impl<'a> Overlay<'a> {
    fn new(ledger: &'a BalanceLedger) -> Self {
        Self {
            ledger,
            staged: HashMap::new(),
        }
    }

    fn balance(&self, owner: AccountId, asset: AssetIndex) -> u64 {
        self.staged
            .get(&(owner, asset))
            .copied()
            .unwrap_or_else(|| self.ledger.balance(owner, asset))
    }

    fn credit(&mut self, owner: AccountId, asset: &Asset, scaled_amount: u64) -> Result<u64> {
        let new_balance = self
            .balance(owner, asset.index)
            .checked_add(scaled_amount)
            .filter(|b| *b <= MAX_SCALED_BALANCE)
            .ok_or(CustodexError::Ledger(LedgerError::Overflow {
                asset: asset.id,
            }))?;
        self.staged.insert((owner, asset.index), new_balance);
        Ok(new_balance)
    }

    fn debit(&mut self, owner: AccountId, asset: &Asset, scaled_amount: u64) -> Result<u64> {
        let available = self.balance(owner, asset.index);
        let new_balance = available.checked_sub(scaled_amount).ok_or(
            CustodexError::Ledger(LedgerError::InsufficientBalance {
                needed: scaled_amount,
                available,
            }),
        )?;
        self.staged.insert((owner, asset.index), new_balance);
        Ok(new_balance)
    }
}

/// Remaining capacity of one order within the batch being settled.
#[derive(Debug, Clone, Copy)]
struct FillState {
    /// Digest of the order that consumed this nonce. A second order under
    /// the same (signer, nonce) with a different digest is a replay.
    digest: [u8; 32],
    /// Unfilled buy quantity, scaled.
    rem_buy: u64,
    /// Unspent sell cost, scaled.
    rem_sell: u64,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// One settlement ledger deployment.
pub struct SettlementEngine {
    config: EngineConfig,
    registry: AssetRegistry,
    ledger: BalanceLedger,
    nonces: NonceWindow,
    withdrawals: WithdrawBook,
    adapters: HashMap<AssetIndex, Box<dyn CustodyAdapter>>,
    events: Vec<SettlementEvent>,
}

impl SettlementEngine {
    /// Create an engine with the native asset pre-registered at index 0.
    ///
    /// # Errors
    /// Propagates the native asset registration, which only fails if the
    /// native decimal constants are misconfigured.
    pub fn new(config: EngineConfig, native_adapter: Box<dyn CustodyAdapter>) -> Result<Self> {
        let mut registry = AssetRegistry::new();
        registry.register(
            AssetId::NATIVE,
            NATIVE_ASSET_INDEX,
            NATIVE_DECIMALS,
            NATIVE_INTERNAL_DECIMALS,
        )?;
        let mut adapters: HashMap<AssetIndex, Box<dyn CustodyAdapter>> = HashMap::new();
        adapters.insert(NATIVE_ASSET_INDEX, native_adapter);

        tracing::info!(
            settlement = %config.settlement_id,
            deployment_block = config.deployment_block,
            wait_blocks = config.wait_blocks,
            "Settlement engine initialized"
        );
        Ok(Self {
            nonces: NonceWindow::new(config.deployment_block),
            config,
            registry,
            ledger: BalanceLedger::new(),
            withdrawals: WithdrawBook::new(),
            adapters,
            events: Vec::new(),
        })
    }

    /// Register a tradable asset and its custody adapter. Native decimals are
    /// taken from the adapter; `internal_decimals` picks the ledger precision.
    ///
    /// # Errors
    /// See [`AssetRegistry::register`].
    pub fn register_asset(
        &mut self,
        id: AssetId,
        index: AssetIndex,
        internal_decimals: u32,
        adapter: Box<dyn CustodyAdapter>,
    ) -> Result<()> {
        let native_decimals = adapter.decimals();
        self.registry
            .register(id, index, native_decimals, internal_decimals)?;
        self.adapters.insert(index, adapter);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Deposits
    // -----------------------------------------------------------------------

    /// Pull `amount` native units of `asset_id` from the owner into custody
    /// and credit the ledger. Returns the owner's post-deposit balance in
    /// native units.
    ///
    /// All internal checks run before the external transfer, so a rejected
    /// deposit never moves funds. The transfer is verified against the
    /// adapter's own custody balance; an adapter that claims success while
    /// moving the wrong amount is caught and no credit is recorded.
    ///
    /// # Errors
    /// Unknown asset, unaligned amount, balance overflow, stale or used
    /// nonce, or a rejected/mismatched external transfer.
    pub fn deposit(
        &mut self,
        nonce: Nonce,
        asset_id: AssetId,
        owner: AccountId,
        amount: u128,
        current_block: u64,
    ) -> Result<u128> {
        let asset = *self.registry.by_id(asset_id)?;
        let scaled = asset.to_scaled(amount)?;
        if self
            .ledger
            .balance(owner, asset.index)
            .checked_add(scaled)
            .filter(|b| *b <= MAX_SCALED_BALANCE)
            .is_none()
        {
            return Err(CustodexError::Ledger(LedgerError::Overflow {
                asset: asset.id,
            }));
        }
        self.nonces.check(nonce, current_block)?;

        let adapter = self.adapters.get_mut(&asset.index).ok_or(
            CustodexError::Registration(RegistrationError::UnknownAsset { asset: asset.id }),
        )?;
        let before = adapter.custody_balance();
        if !adapter.transfer_in(owner, amount) {
            return Err(CustodexError::Transfer(TransferError::TransferRejected {
                asset: asset.id,
            }));
        }
        let moved = adapter.custody_balance().saturating_sub(before);
        if moved != amount {
            return Err(CustodexError::Transfer(TransferError::TransferMismatch {
                asset: asset.id,
                expected: amount,
                moved,
            }));
        }

        self.nonces.mark(nonce);
        let balance = asset.to_native(self.ledger.credit(owner, &asset, scaled)?);
        self.events.push(SettlementEvent::DepositAccepted {
            nonce,
            owner,
            asset: asset.id,
            amount,
            balance,
        });
        tracing::info!(nonce, owner = %owner, asset = %asset.id, amount, "Deposit accepted");
        Ok(balance)
    }

    /// [`deposit`](Self::deposit) of the native asset.
    ///
    /// # Errors
    /// See [`deposit`](Self::deposit).
    pub fn deposit_native(
        &mut self,
        nonce: Nonce,
        owner: AccountId,
        amount: u128,
        current_block: u64,
    ) -> Result<u128> {
        self.deposit(nonce, AssetId::NATIVE, owner, amount, current_block)
    }

    // -----------------------------------------------------------------------
    // Withdrawals
    // -----------------------------------------------------------------------

    /// Open a withdrawal request. Funds stay in the ledger and remain
    /// spendable; the request only becomes completable once the challenge
    /// delay elapsed. Returns the unlock block.
    ///
    /// # Errors
    /// Unknown asset, unaligned amount, an already pending request for this
    /// owner, insufficient balance, or a stale/used nonce.
    pub fn ask_withdraw(
        &mut self,
        nonce: Nonce,
        owner: AccountId,
        asset_id: AssetId,
        amount: u128,
        current_block: u64,
    ) -> Result<u64> {
        let asset = *self.registry.by_id(asset_id)?;
        let scaled = asset.to_scaled(amount)?;
        if self.withdrawals.has_pending(owner) {
            return Err(CustodexError::Withdrawal(WithdrawalError::AlreadyPending {
                owner,
            }));
        }
        let available = self.ledger.balance(owner, asset.index);
        if available < scaled {
            return Err(CustodexError::Ledger(LedgerError::InsufficientBalance {
                needed: scaled,
                available,
            }));
        }
        self.nonces.consume(nonce, current_block)?;

        let request = WithdrawRequest {
            owner,
            asset: asset.index,
            amount,
            requested_at: current_block,
            nonce,
        };
        let unlock_block = request.unlock_block(self.config.wait_blocks);
        self.withdrawals.insert(request)?;
        self.events.push(SettlementEvent::WithdrawAsked {
            nonce,
            owner,
            asset: asset.id,
            amount,
            unlock_block,
        });
        tracing::info!(nonce, owner = %owner, asset = %asset.id, amount, unlock_block, "Withdrawal asked");
        Ok(unlock_block)
    }

    /// Cancel the caller's pending withdrawal request under `nonce`. The
    /// nonce stays burned.
    ///
    /// # Errors
    /// No pending request under this nonce, or it belongs to another owner.
    pub fn cancel_withdraw(&mut self, nonce: Nonce, caller: AccountId) -> Result<()> {
        let request = self.withdrawals.cancel(nonce, caller)?;
        self.events.push(SettlementEvent::WithdrawCancelled {
            nonce,
            owner: request.owner,
        });
        tracing::info!(nonce, owner = %request.owner, "Withdrawal cancelled");
        Ok(())
    }

    /// Complete a pending withdrawal after the challenge delay. The owner,
    /// asset and amount must match the ask exactly. The balance is checked
    /// again here: funds traded away during the challenge window make the
    /// completion fail rather than double-spend.
    ///
    /// Returns the owner's post-withdrawal balance in native units.
    ///
    /// # Errors
    /// Mismatched parameters, delay not elapsed, insufficient balance, or a
    /// rejected/mismatched external transfer.
    pub fn complete_withdraw(
        &mut self,
        nonce: Nonce,
        owner: AccountId,
        asset_id: AssetId,
        amount: u128,
        current_block: u64,
    ) -> Result<u128> {
        let asset = *self.registry.by_id(asset_id)?;
        let request = *self.withdrawals.get(nonce)?;
        if request.owner != owner || request.asset != asset.index || request.amount != amount {
            return Err(CustodexError::Withdrawal(WithdrawalError::AskMismatch {
                nonce,
            }));
        }
        let unlock_block = request.unlock_block(self.config.wait_blocks);
        if current_block < unlock_block {
            return Err(CustodexError::Withdrawal(
                WithdrawalError::ChallengeNotElapsed {
                    unlock_block,
                    current_block,
                },
            ));
        }
        let scaled = asset.to_scaled(amount)?;
        let available = self.ledger.balance(owner, asset.index);
        if available < scaled {
            return Err(CustodexError::Ledger(LedgerError::InsufficientBalance {
                needed: scaled,
                available,
            }));
        }

        let adapter = self.adapters.get_mut(&asset.index).ok_or(
            CustodexError::Registration(RegistrationError::UnknownAsset { asset: asset.id }),
        )?;
        let before = adapter.custody_balance();
        if !adapter.transfer_out(owner, amount) {
            return Err(CustodexError::Transfer(TransferError::TransferRejected {
                asset: asset.id,
            }));
        }
        let moved = before.saturating_sub(adapter.custody_balance());
        if moved != amount {
            return Err(CustodexError::Transfer(TransferError::TransferMismatch {
                asset: asset.id,
                expected: amount,
                moved,
            }));
        }

        let balance = asset.to_native(self.ledger.debit(owner, &asset, scaled)?);
        self.withdrawals.remove(nonce);
        self.events.push(SettlementEvent::WithdrawCompleted {
            nonce,
            owner,
            asset: asset.id,
            amount,
            balance,
        });
        tracing::info!(nonce, owner = %owner, asset = %asset.id, amount, "Withdrawal completed");
        Ok(balance)
    }

    // -----------------------------------------------------------------------
    // Batch settlement
    // -----------------------------------------------------------------------

    /// Settle a batch of trades atomically: either every trade applies and
    /// every touched nonce burns, or nothing changes at all.
    ///
    /// Within the batch an order may fill repeatedly; its remaining capacity
    /// is tracked per (signer, nonce) and its fee is charged once, on the
    /// trade that first admits it. A different order reusing an admitted
    /// nonce rejects the whole batch as a replay.
    ///
    /// # Errors
    /// Any validation, capacity, balance or nonce failure of any trade.
    pub fn commit_batch(&mut self, batch: &Batch, current_block: u64) -> Result<()> {
        let settlement_id = self.config.settlement_id;
        let fee_account = self.config.fee_account;

        let mut overlay = Overlay::new(&self.ledger);
        let mut fills: HashMap<(AccountId, Nonce), FillState> = HashMap::new();
        let mut consumed: HashSet<Nonce> = HashSet::new();
        let mut staged_events: Vec<SettlementEvent> = Vec::new();

        for trade in &batch.trades {
            let maker = validate_order(&trade.maker, &self.registry, &settlement_id)?;
            let taker = validate_order(&trade.taker, &self.registry, &settlement_id)?;
            validate_pair(&maker, &taker)?;

            // base = the asset the maker buys, quote = the asset the maker
            // sells; the taker's legs mirror these.
            let base = *self.registry.by_id(maker.buy_asset)?;
            let quote = *self.registry.by_id(maker.sell_asset)?;

            let (maker_first, mut maker_state) =
                Self::admit(&self.nonces, &mut fills, &mut consumed, &maker, current_block)?;
            let (taker_first, mut taker_state) =
                Self::admit(&self.nonces, &mut fills, &mut consumed, &taker, current_block)?;

            // Fill as much as both capacities allow, priced at the maker's
            // quoted rate, truncating in the quote asset.
            let fill = maker_state.rem_buy.min(taker_state.rem_sell);
            let pay = if fill == 0 {
                0
            } else {
                // fill <= buy_quantity, so the quotient is capped by
                // sell_cost and fits u64.
                #[allow(clippy::cast_possible_truncation)]
                {
                    (u128::from(fill) * u128::from(maker.sell_cost)
                        / u128::from(maker.buy_quantity)) as u64
                }
            };

            maker_state.rem_buy -= fill;
            maker_state.rem_sell = maker_state.rem_sell.saturating_sub(pay);
            taker_state.rem_sell -= fill;
            taker_state.rem_buy = taker_state.rem_buy.saturating_sub(pay);
            fills.insert((maker.signer, maker.nonce), maker_state);
            fills.insert((taker.signer, taker.nonce), taker_state);

            overlay.credit(maker.signer, &base, fill)?;
            overlay.debit(maker.signer, &quote, pay)?;
            overlay.credit(taker.signer, &quote, pay)?;
            overlay.debit(taker.signer, &base, fill)?;

            // Fees are charged after the fill lands, so a buy-side fee may
            // be paid out of the proceeds of this very trade.
            if maker_first {
                let fee_asset = if maker.fee_index() == base.index { &base } else { &quote };
                Self::charge_fee(&mut overlay, &maker, fee_asset, fee_account)?;
            }
            if taker_first {
                let fee_asset = if taker.fee_index() == base.index { &base } else { &quote };
                Self::charge_fee(&mut overlay, &taker, fee_asset, fee_account)?;
            }

            tracing::debug!(
                maker = %maker.signer,
                taker = %taker.signer,
                maker_order = %hex::encode(&maker.digest[..8]),
                taker_order = %hex::encode(&taker.digest[..8]),
                fill,
                pay,
                "Trade staged"
            );
            staged_events.push(SettlementEvent::TradeApplied {
                maker: maker.signer,
                taker: taker.signer,
                maker_nonce: maker.nonce,
                taker_nonce: taker.nonce,
                maker_buy_asset: base.id,
                taker_buy_asset: quote.id,
                filled_quantity: base.to_native(fill),
                filled_cost: quote.to_native(pay),
                maker_buy_balance: base.to_native(overlay.balance(maker.signer, base.index)),
                maker_sell_balance: quote.to_native(overlay.balance(maker.signer, quote.index)),
                taker_buy_balance: quote.to_native(overlay.balance(taker.signer, quote.index)),
                taker_sell_balance: base.to_native(overlay.balance(taker.signer, base.index)),
            });
        }

        // Everything validated; flush.
        let Overlay { staged, .. } = overlay;
        for ((owner, index), balance) in staged {
            self.ledger.set(owner, index, balance);
        }
        for nonce in &consumed {
            self.nonces.mark(*nonce);
        }
        self.events.extend(staged_events);
        self.events.push(SettlementEvent::BatchCommitted {
            trades: batch.trades.len(),
            error_code: 0,
        });
        self.nonces.erase(&batch.erase_nonces, current_block);
        tracing::info!(
            trades = batch.trades.len(),
            nonces = consumed.len(),
            "Batch committed"
        );
        Ok(())
    }

    /// Admit one order into the batch: either it is already filling under
    /// this exact digest, or its nonce must still be fresh.
    fn admit(
        nonces: &NonceWindow,
        fills: &mut HashMap<(AccountId, Nonce), FillState>,
        consumed: &mut HashSet<Nonce>,
        order: &ScaledOrder,
        current_block: u64,
    ) -> Result<(bool, FillState)> {
        if let Some(state) = fills.get(&(order.signer, order.nonce)) {
            if state.digest == order.digest {
                return Ok((false, *state));
            }
            return Err(CustodexError::Nonce(NonceError::NonceUsed {
                nonce: order.nonce,
            }));
        }
        if consumed.contains(&order.nonce) {
            // Consumed within this batch by another signer; the space is
            // global, so this is a replay too.
            return Err(CustodexError::Nonce(NonceError::NonceUsed {
                nonce: order.nonce,
            }));
        }
        nonces.check(order.nonce, current_block)?;
        consumed.insert(order.nonce);
        let state = FillState {
            digest: order.digest,
            rem_buy: order.buy_quantity,
            rem_sell: order.sell_cost,
        };
        fills.insert((order.signer, order.nonce), state);
        Ok((true, state))
    }

    /// Move an order's fee from the signer to the fee account.
    fn charge_fee(
        overlay: &mut Overlay<'_>,
        order: &ScaledOrder,
        fee_asset: &Asset,
        fee_account: AccountId,
    ) -> Result<()> {
        if order.fee == 0 {
            return Ok(());
        }
        overlay.debit(order.signer, fee_asset, order.fee)?;
        overlay.credit(fee_account, fee_asset, order.fee)?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Owner's balance in native units.
    ///
    /// # Errors
    /// `RegistrationError::UnknownAsset` if the asset is not registered.
    pub fn balance(&self, owner: AccountId, asset_id: AssetId) -> Result<u128> {
        let asset = self.registry.by_id(asset_id)?;
        Ok(asset.to_native(self.ledger.balance(owner, asset.index)))
    }

    /// Lower bound of the currently addressable nonce range.
    #[must_use]
    pub fn first_valid_nonce(&self, current_block: u64) -> Nonce {
        self.nonces.first_valid(current_block)
    }

    /// Whether a nonce is currently marked used.
    #[must_use]
    pub fn is_nonce_used(&self, nonce: Nonce) -> bool {
        self.nonces.is_used(nonce)
    }

    /// Compact index of a registered asset.
    ///
    /// # Errors
    /// `RegistrationError::UnknownAsset` if the asset is not registered.
    pub fn asset_index(&self, asset_id: AssetId) -> Result<AssetIndex> {
        Ok(self.registry.by_id(asset_id)?.index)
    }

    /// Scale factor of a registered asset.
    ///
    /// # Errors
    /// `RegistrationError::UnknownAsset` if the asset is not registered.
    pub fn scale_factor(&self, asset_id: AssetId) -> Result<u64> {
        Ok(self.registry.by_id(asset_id)?.scale_factor())
    }

    /// Whether the owner has a pending withdrawal request.
    #[must_use]
    pub fn has_pending_withdrawal(&self, owner: AccountId) -> bool {
        self.withdrawals.has_pending(owner)
    }

    /// The custody adapter of a registered asset, for reconciliation.
    ///
    /// # Errors
    /// `RegistrationError::UnknownAsset` if the asset is not registered.
    pub fn adapter(&self, asset_id: AssetId) -> Result<&dyn CustodyAdapter> {
        let asset = self.registry.by_id(asset_id)?;
        self.adapters
            .get(&asset.index)
            .map(|adapter| &**adapter)
            .ok_or(CustodexError::Registration(
                RegistrationError::UnknownAsset { asset: asset.id },
            ))
    }

    /// The append-only audit log.
    #[must_use]
    pub fn events(&self) -> &[SettlementEvent] {
        &self.events
    }

    /// Engine configuration.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use custodex_custody::{AdapterConduct, MockAdapter};
    use custodex_types::{FeeSide, Order, OrderError, SettlementId, Trade};

    const UNIT: u128 = 1_000_000_000;

    fn token(byte: u8) -> AssetId {
        AssetId([byte; 20])
    }

    fn key(byte: u8) -> ed25519_dalek::SigningKey {
        ed25519_dalek::SigningKey::from_bytes(&[byte; 32])
    }

    fn account(k: &ed25519_dalek::SigningKey) -> AccountId {
        AccountId(k.verifying_key().to_bytes())
    }

    fn fee_account() -> AccountId {
        AccountId([0xfe; 32])
    }

    /// Engine with the native custody seeded for the given owners.
    fn engine_with(native_owners: &[AccountId]) -> SettlementEngine {
        let config = EngineConfig::new(SettlementId([0xaa; 32]), 0, fee_account())
            .with_wait_blocks(2);
        let mut native = MockAdapter::new(18);
        for owner in native_owners {
            native.set_balance(*owner, 1_000 * UNIT);
        }
        SettlementEngine::new(config, Box::new(native)).unwrap()
    }

    fn engine() -> SettlementEngine {
        engine_with(&[])
    }

    /// Register token(1) at index 1 with external funding for the owners.
    fn register_token(engine: &mut SettlementEngine, owners: &[AccountId]) {
        let mut adapter = MockAdapter::new(18);
        for owner in owners {
            adapter.set_balance(*owner, 1_000 * UNIT);
        }
        engine.register_asset(token(1), 1, 9, Box::new(adapter)).unwrap();
    }

    #[test]
    fn deposit_credits_and_burns_nonce() {
        let mut engine = engine();
        let owner = account(&key(1));
        let mut adapter = MockAdapter::new(18);
        adapter.set_balance(owner, 10 * UNIT);
        engine.register_asset(token(1), 1, 9, Box::new(adapter)).unwrap();

        let balance = engine.deposit(5, token(1), owner, 3 * UNIT, 0).unwrap();
        assert_eq!(balance, 3 * UNIT);
        assert!(engine.is_nonce_used(5));

        let err = engine.deposit(5, token(1), owner, UNIT, 0).unwrap_err();
        assert!(matches!(
            err,
            CustodexError::Nonce(NonceError::NonceUsed { nonce: 5 })
        ));
    }

    #[test]
    fn deposit_rejects_lying_adapter_without_state_change() {
        let mut engine = engine();
        let owner = account(&key(1));
        let adapter = MockAdapter::with_conduct(18, AdapterConduct::AcceptWithoutMoving);
        engine.register_asset(token(1), 1, 9, Box::new(adapter)).unwrap();

        let err = engine.deposit(5, token(1), owner, UNIT, 0).unwrap_err();
        assert!(matches!(
            err,
            CustodexError::Transfer(TransferError::TransferMismatch {
                expected,
                moved: 0,
                ..
            }) if expected == UNIT
        ));
        assert_eq!(engine.balance(owner, token(1)).unwrap(), 0);
        assert!(!engine.is_nonce_used(5), "failed deposit must not burn the nonce");
    }

    #[test]
    fn withdrawal_lifecycle() {
        let mut engine = engine();
        let owner = account(&key(1));
        let mut adapter = MockAdapter::new(18);
        adapter.set_balance(owner, 10 * UNIT);
        engine.register_asset(token(1), 1, 9, Box::new(adapter)).unwrap();
        engine.deposit(1, token(1), owner, 10 * UNIT, 0).unwrap();

        let unlock = engine.ask_withdraw(2, owner, token(1), 4 * UNIT, 0).unwrap();
        assert_eq!(unlock, 2);

        // too early
        let err = engine
            .complete_withdraw(2, owner, token(1), 4 * UNIT, 1)
            .unwrap_err();
        assert!(matches!(
            err,
            CustodexError::Withdrawal(WithdrawalError::ChallengeNotElapsed { .. })
        ));

        let balance = engine
            .complete_withdraw(2, owner, token(1), 4 * UNIT, 2)
            .unwrap();
        assert_eq!(balance, 6 * UNIT);
        assert_eq!(engine.adapter(token(1)).unwrap().balance_of(owner), 4 * UNIT);
        assert_eq!(engine.adapter(token(1)).unwrap().custody_balance(), 6 * UNIT);
        assert!(!engine.has_pending_withdrawal(owner));
    }

    #[test]
    fn completion_must_match_ask_exactly() {
        let mut engine = engine();
        let owner = account(&key(1));
        let mut adapter = MockAdapter::new(18);
        adapter.set_balance(owner, 10 * UNIT);
        engine.register_asset(token(1), 1, 9, Box::new(adapter)).unwrap();
        engine.deposit(1, token(1), owner, 10 * UNIT, 0).unwrap();
        engine.ask_withdraw(2, owner, token(1), 4 * UNIT, 0).unwrap();

        let err = engine
            .complete_withdraw(2, owner, token(1), 3 * UNIT, 5)
            .unwrap_err();
        assert!(matches!(
            err,
            CustodexError::Withdrawal(WithdrawalError::AskMismatch { nonce: 2 })
        ));
    }

    #[test]
    fn cancel_frees_the_pending_slot_but_not_the_nonce() {
        let mut engine = engine();
        let owner = account(&key(1));
        let mut adapter = MockAdapter::new(18);
        adapter.set_balance(owner, 10 * UNIT);
        engine.register_asset(token(1), 1, 9, Box::new(adapter)).unwrap();
        engine.deposit(1, token(1), owner, 10 * UNIT, 0).unwrap();

        engine.ask_withdraw(2, owner, token(1), 4 * UNIT, 0).unwrap();
        engine.cancel_withdraw(2, owner).unwrap();
        assert!(!engine.has_pending_withdrawal(owner));
        assert!(engine.is_nonce_used(2));

        // a new ask works, under a fresh nonce
        engine.ask_withdraw(3, owner, token(1), 4 * UNIT, 0).unwrap();
    }

    #[test]
    fn batch_settles_matched_orders() {
        let (alice_key, bob_key) = (key(1), key(2));
        let (alice, bob) = (account(&alice_key), account(&bob_key));
        let mut engine = engine_with(&[bob]);
        register_token(&mut engine, &[alice]);
        let id = engine.config().settlement_id;

        engine.deposit(1, token(1), alice, 10 * UNIT, 0).unwrap();
        engine.deposit_native(2, bob, 10 * UNIT, 0).unwrap();

        // alice sells 8 token(1) for 4 native; bob takes the whole offer
        let maker = Order::signed(
            &alice_key, &id,
            AssetId::NATIVE, 4 * UNIT,
            token(1), 8 * UNIT,
            0, FeeSide::Buy, 3,
        );
        let taker = Order::signed(
            &bob_key, &id,
            token(1), 8 * UNIT,
            AssetId::NATIVE, 4 * UNIT,
            0, FeeSide::Buy, 4,
        );
        engine
            .commit_batch(&Batch::new(vec![Trade { maker, taker }]), 0)
            .unwrap();

        assert_eq!(engine.balance(alice, AssetId::NATIVE).unwrap(), 4 * UNIT);
        assert_eq!(engine.balance(alice, token(1)).unwrap(), 2 * UNIT);
        assert_eq!(engine.balance(bob, AssetId::NATIVE).unwrap(), 6 * UNIT);
        assert_eq!(engine.balance(bob, token(1)).unwrap(), 8 * UNIT);
        assert!(engine.is_nonce_used(3));
        assert!(engine.is_nonce_used(4));

        let last = engine.events().last().unwrap();
        assert!(matches!(
            last,
            SettlementEvent::BatchCommitted { trades: 1, error_code: 0 }
        ));
    }

    #[test]
    fn failed_batch_changes_nothing() {
        let (alice_key, bob_key) = (key(1), key(2));
        let (alice, bob) = (account(&alice_key), account(&bob_key));
        let mut engine = engine_with(&[bob]);
        register_token(&mut engine, &[alice]);
        let id = engine.config().settlement_id;

        engine.deposit(1, token(1), alice, 10 * UNIT, 0).unwrap();
        engine.deposit_native(2, bob, 10 * UNIT, 0).unwrap();

        let good = Trade {
            maker: Order::signed(
                &alice_key, &id,
                AssetId::NATIVE, 4 * UNIT,
                token(1), 8 * UNIT,
                0, FeeSide::Buy, 3,
            ),
            taker: Order::signed(
                &bob_key, &id,
                token(1), 8 * UNIT,
                AssetId::NATIVE, 4 * UNIT,
                0, FeeSide::Buy, 4,
            ),
        };
        // bob cannot pay 100 native; the second trade must sink the first
        let bad = Trade {
            maker: Order::signed(
                &alice_key, &id,
                AssetId::NATIVE, 100 * UNIT,
                token(1), UNIT,
                0, FeeSide::Buy, 5,
            ),
            taker: Order::signed(
                &bob_key, &id,
                token(1), UNIT,
                AssetId::NATIVE, 100 * UNIT,
                0, FeeSide::Buy, 6,
            ),
        };
        let events_before = engine.events().len();
        let err = engine
            .commit_batch(&Batch::new(vec![good, bad]), 0)
            .unwrap_err();
        assert!(matches!(
            err,
            CustodexError::Ledger(LedgerError::InsufficientBalance { .. })
        ));

        assert_eq!(engine.balance(alice, token(1)).unwrap(), 10 * UNIT);
        assert_eq!(engine.balance(bob, AssetId::NATIVE).unwrap(), 10 * UNIT);
        assert!(!engine.is_nonce_used(3), "rolled-back batch must not burn nonces");
        assert!(!engine.is_nonce_used(4));
        assert_eq!(engine.events().len(), events_before);
    }

    #[test]
    fn order_reuse_within_batch_fills_incrementally() {
        let (alice_key, bob_key) = (key(1), key(2));
        let (alice, bob) = (account(&alice_key), account(&bob_key));
        let mut engine = engine_with(&[bob]);
        register_token(&mut engine, &[alice]);
        let id = engine.config().settlement_id;

        engine.deposit(1, token(1), alice, 10 * UNIT, 0).unwrap();
        engine.deposit_native(2, bob, 10 * UNIT, 0).unwrap();

        // one big maker order, consumed by two takers from bob
        let maker = Order::signed(
            &alice_key, &id,
            AssetId::NATIVE, 4 * UNIT,
            token(1), 8 * UNIT,
            0, FeeSide::Buy, 3,
        );
        let taker_a = Order::signed(
            &bob_key, &id,
            token(1), 4 * UNIT,
            AssetId::NATIVE, 2 * UNIT,
            0, FeeSide::Buy, 4,
        );
        let taker_b = Order::signed(
            &bob_key, &id,
            token(1), 4 * UNIT,
            AssetId::NATIVE, 2 * UNIT,
            0, FeeSide::Buy, 5,
        );
        let batch = Batch::new(vec![
            Trade { maker: maker.clone(), taker: taker_a },
            Trade { maker, taker: taker_b },
        ]);
        engine.commit_batch(&batch, 0).unwrap();

        assert_eq!(engine.balance(alice, AssetId::NATIVE).unwrap(), 4 * UNIT);
        assert_eq!(engine.balance(alice, token(1)).unwrap(), 2 * UNIT);
        assert_eq!(engine.balance(bob, token(1)).unwrap(), 8 * UNIT);
    }

    #[test]
    fn different_order_under_used_nonce_rejects_batch() {
        let (alice_key, bob_key) = (key(1), key(2));
        let (alice, bob) = (account(&alice_key), account(&bob_key));
        let mut engine = engine_with(&[bob]);
        register_token(&mut engine, &[alice]);
        let id = engine.config().settlement_id;

        engine.deposit(1, token(1), alice, 10 * UNIT, 0).unwrap();
        engine.deposit_native(2, bob, 10 * UNIT, 0).unwrap();

        let maker = Order::signed(
            &alice_key, &id,
            AssetId::NATIVE, 2 * UNIT,
            token(1), 4 * UNIT,
            0, FeeSide::Buy, 3,
        );
        // same nonce 3, different economics
        let maker_replay = Order::signed(
            &alice_key, &id,
            AssetId::NATIVE, UNIT,
            token(1), 4 * UNIT,
            0, FeeSide::Buy, 3,
        );
        let taker = |nonce| Order::signed(
            &bob_key, &id,
            token(1), 4 * UNIT,
            AssetId::NATIVE, 2 * UNIT,
            0, FeeSide::Buy, nonce,
        );
        let batch = Batch::new(vec![
            Trade { maker, taker: taker(4) },
            Trade { maker: maker_replay, taker: taker(5) },
        ]);
        let err = engine.commit_batch(&batch, 0).unwrap_err();
        assert!(matches!(
            err,
            CustodexError::Nonce(NonceError::NonceUsed { nonce: 3 })
        ));
    }

    #[test]
    fn oversized_fee_rejects_batch_without_panicking() {
        let (alice_key, bob_key) = (key(1), key(2));
        let (alice, bob) = (account(&alice_key), account(&bob_key));
        let mut engine = engine_with(&[bob]);
        register_token(&mut engine, &[alice]);
        let id = engine.config().settlement_id;

        engine.deposit(1, token(1), alice, 10 * UNIT, 0).unwrap();
        engine.deposit_native(2, bob, 10 * UNIT, 0).unwrap();

        // hand-built: the fee word must be bounded before anything hashes it
        let maker = Order {
            buy_asset: AssetId::NATIVE,
            buy_quantity: 4 * UNIT,
            sell_asset: token(1),
            sell_cost: 8 * UNIT,
            fee: u128::MAX,
            fee_side: FeeSide::Sell,
            nonce: 3,
            signer: alice,
            signature: vec![0u8; 64],
        };
        let taker = Order::signed(
            &bob_key, &id,
            token(1), 8 * UNIT,
            AssetId::NATIVE, 4 * UNIT,
            0, FeeSide::Buy, 4,
        );
        let err = engine
            .commit_batch(&Batch::new(vec![Trade { maker, taker }]), 0)
            .unwrap_err();
        assert!(matches!(
            err,
            CustodexError::Order(OrderError::FeeTooLarge { fee: u128::MAX })
        ));

        assert_eq!(engine.balance(alice, token(1)).unwrap(), 10 * UNIT);
        assert_eq!(engine.balance(bob, AssetId::NATIVE).unwrap(), 10 * UNIT);
        assert!(!engine.is_nonce_used(3));
        assert!(!engine.is_nonce_used(4));
    }

    #[test]
    fn fee_charged_once_and_credited_to_fee_account() {
        let (alice_key, bob_key) = (key(1), key(2));
        let (alice, bob) = (account(&alice_key), account(&bob_key));
        let mut engine = engine_with(&[bob]);
        register_token(&mut engine, &[alice]);
        let id = engine.config().settlement_id;

        engine.deposit(1, token(1), alice, 10 * UNIT, 0).unwrap();
        engine.deposit_native(2, bob, 10 * UNIT, 0).unwrap();

        // maker pays 1 token(1) sell-side fee, charged once across two fills
        let maker = Order::signed(
            &alice_key, &id,
            AssetId::NATIVE, 4 * UNIT,
            token(1), 8 * UNIT,
            UNIT, FeeSide::Sell, 3,
        );
        let taker = |nonce| Order::signed(
            &bob_key, &id,
            token(1), 4 * UNIT,
            AssetId::NATIVE, 2 * UNIT,
            0, FeeSide::Buy, nonce,
        );
        let batch = Batch::new(vec![
            Trade { maker: maker.clone(), taker: taker(4) },
            Trade { maker, taker: taker(5) },
        ]);
        engine.commit_batch(&batch, 0).unwrap();

        // 10 - 8 sold - 1 fee
        assert_eq!(engine.balance(alice, token(1)).unwrap(), UNIT);
        assert_eq!(engine.balance(fee_account(), token(1)).unwrap(), UNIT);
    }
}
