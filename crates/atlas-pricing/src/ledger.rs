//! # Voucher Usage Ledger
//!
//! Concurrent-safe reserve/commit/release accounting against per-voucher
//! usage limits.
//!
//! ## Reservation Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Usage Reservation Lifecycle                          │
//! │                                                                         │
//! │  order placed ──► reserve() ──► RESERVED ──┬─► commit() ──► COMMITTED  │
//! │                      │                     │                  │         │
//! │                      │ limit taken         └─► release()      │         │
//! │                      ▼                          │             ▼         │
//! │                  Exhausted                      ▼         release()     │
//! │                                             RELEASED  ◄── (refund:     │
//! │                                                            used_count  │
//! │                                                            decrements) │
//! │                                                                         │
//! │  Headroom = usage_limit − used_count − live RESERVED entries.          │
//! │  reserve() is a compare-and-increment under the per-voucher lock,      │
//! │  so concurrent callers are linearized: at most `headroom` succeed.     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Locking
//! A read-mostly map hands out one `Mutex` per voucher. Operations on
//! different vouchers proceed in parallel; operations on one voucher
//! serialize. The map lock is never held while a voucher lock is taken.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use chrono::{DateTime, Utc};
use tracing::debug;

use atlas_core::types::{
    CustomerId, OrderId, ReservationState, UsageReservation, Voucher, VoucherId,
};

use crate::error::LedgerError;

// =============================================================================
// Usage View
// =============================================================================

/// Usage counters for one voucher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsageTotals {
    /// Committed uses.
    pub used: u32,
    /// Live (RESERVED) reservations.
    pub reserved: u32,
}

/// Read-only usage visibility for the voucher evaluator.
///
/// Keeping this a narrow trait keeps the evaluator pure: it sees
/// counters, never the ledger's locks.
pub trait UsageView {
    /// Current totals for `voucher`, falling back to the catalog's
    /// recorded `used_count` when the ledger has no entry yet.
    fn usage(&self, voucher: &Voucher) -> UsageTotals;

    /// Whether `customer` holds a RESERVED or COMMITTED reservation.
    fn customer_has_used(&self, voucher_id: VoucherId, customer: CustomerId) -> bool;
}

/// A view with no reservation history; validation against a bare
/// catalog snapshot.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoUsage;

impl UsageView for NoUsage {
    fn usage(&self, voucher: &Voucher) -> UsageTotals {
        UsageTotals {
            used: voucher.used_count,
            reserved: 0,
        }
    }

    fn customer_has_used(&self, _voucher_id: VoucherId, _customer: CustomerId) -> bool {
        false
    }
}

// =============================================================================
// Ledger Internals
// =============================================================================

#[derive(Debug)]
struct ReservationRecord {
    state: ReservationState,
    customer_id: Option<CustomerId>,
    created_at: DateTime<Utc>,
}

#[derive(Debug)]
struct VoucherUsage {
    usage_limit: Option<u32>,
    used_count: u32,
    reservations: HashMap<OrderId, ReservationRecord>,
}

impl VoucherUsage {
    fn live_reserved(&self) -> u32 {
        self.reservations
            .values()
            .filter(|r| r.state == ReservationState::Reserved)
            .count() as u32
    }
}

// =============================================================================
// Usage Ledger
// =============================================================================

/// The engine's only mutable state: per-voucher usage counters.
///
/// Entries are lazily seeded from the catalog voucher the first time a
/// voucher is touched, so limits and prior use counts carry over.
#[derive(Debug, Default)]
pub struct UsageLedger {
    entries: RwLock<HashMap<VoucherId, Arc<Mutex<VoucherUsage>>>>,
}

impl UsageLedger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetches (or seeds) the entry for `voucher`.
    fn entry(&self, voucher: &Voucher) -> Arc<Mutex<VoucherUsage>> {
        if let Some(entry) = self.peek(voucher.id) {
            return entry;
        }
        let mut entries = match self.entries.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        entries
            .entry(voucher.id)
            .or_insert_with(|| {
                Arc::new(Mutex::new(VoucherUsage {
                    usage_limit: voucher.usage_limit,
                    used_count: voucher.used_count,
                    reservations: HashMap::new(),
                }))
            })
            .clone()
    }

    /// Fetches an existing entry without seeding.
    fn peek(&self, voucher_id: VoucherId) -> Option<Arc<Mutex<VoucherUsage>>> {
        let entries = match self.entries.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        entries.get(&voucher_id).cloned()
    }

    fn lock(entry: &Arc<Mutex<VoucherUsage>>) -> MutexGuard<'_, VoucherUsage> {
        match entry.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Reserves one use for `order_id`.
    ///
    /// Atomic compare-and-increment against the usage limit: of N
    /// concurrent callers, at most `limit − used − reserved` succeed,
    /// the rest observe [`LedgerError::Exhausted`]. Re-reserving the
    /// same live (voucher, order) pair is a no-op.
    pub fn reserve(
        &self,
        voucher: &Voucher,
        order_id: OrderId,
        customer_id: Option<CustomerId>,
        at: DateTime<Utc>,
    ) -> Result<(), LedgerError> {
        let entry = self.entry(voucher);
        let mut usage = Self::lock(&entry);

        if let Some(existing) = usage.reservations.get(&order_id) {
            if existing.state != ReservationState::Released {
                return Ok(());
            }
        }

        if let Some(limit) = usage.usage_limit {
            if usage.used_count + usage.live_reserved() >= limit {
                debug!(voucher_id = %voucher.id, %order_id, "reserve rejected: exhausted");
                return Err(LedgerError::Exhausted);
            }
        }

        usage.reservations.insert(
            order_id,
            ReservationRecord {
                state: ReservationState::Reserved,
                customer_id,
                created_at: at,
            },
        );
        debug!(voucher_id = %voucher.id, %order_id, "usage reserved");
        Ok(())
    }

    /// Commits the reservation for `order_id`.
    ///
    /// Idempotent: committing twice is a no-op. `NotFound` when no live
    /// reservation exists.
    pub fn commit(&self, voucher_id: VoucherId, order_id: OrderId) -> Result<(), LedgerError> {
        let entry = self.peek(voucher_id).ok_or(LedgerError::NotFound)?;
        let mut usage = Self::lock(&entry);

        let state = usage
            .reservations
            .get(&order_id)
            .map(|r| r.state)
            .ok_or(LedgerError::NotFound)?;
        match state {
            ReservationState::Reserved => {
                if let Some(record) = usage.reservations.get_mut(&order_id) {
                    record.state = ReservationState::Committed;
                }
                usage.used_count += 1;
                debug!(%voucher_id, %order_id, used = usage.used_count, "usage committed");
                Ok(())
            }
            ReservationState::Committed => Ok(()),
            ReservationState::Released => Err(LedgerError::NotFound),
        }
    }

    /// Releases the reservation for `order_id` (cancel/refund).
    ///
    /// Idempotent. A RESERVED reservation simply frees its slot; a
    /// COMMITTED one also decrements `used_count` (compensation).
    pub fn release(&self, voucher_id: VoucherId, order_id: OrderId) -> Result<(), LedgerError> {
        let entry = self.peek(voucher_id).ok_or(LedgerError::NotFound)?;
        let mut usage = Self::lock(&entry);

        let state = usage
            .reservations
            .get(&order_id)
            .map(|r| r.state)
            .ok_or(LedgerError::NotFound)?;
        match state {
            ReservationState::Reserved | ReservationState::Committed => {
                if state == ReservationState::Committed {
                    usage.used_count = usage.used_count.saturating_sub(1);
                }
                if let Some(record) = usage.reservations.get_mut(&order_id) {
                    record.state = ReservationState::Released;
                }
                debug!(%voucher_id, %order_id, used = usage.used_count, "usage released");
                Ok(())
            }
            ReservationState::Released => Ok(()),
        }
    }

    /// The reservation for one (voucher, order) pair, when any.
    pub fn reservation(
        &self,
        voucher_id: VoucherId,
        order_id: OrderId,
    ) -> Option<UsageReservation> {
        let entry = self.peek(voucher_id)?;
        let usage = Self::lock(&entry);
        usage.reservations.get(&order_id).map(|r| UsageReservation {
            voucher_id,
            order_id,
            customer_id: r.customer_id,
            state: r.state,
            created_at: r.created_at,
        })
    }

    /// Committed use count for a voucher the ledger has seen, if any.
    pub fn used_count(&self, voucher_id: VoucherId) -> Option<u32> {
        let entry = self.peek(voucher_id)?;
        let usage = Self::lock(&entry);
        Some(usage.used_count)
    }
}

impl UsageView for UsageLedger {
    fn usage(&self, voucher: &Voucher) -> UsageTotals {
        match self.peek(voucher.id) {
            Some(entry) => {
                let usage = Self::lock(&entry);
                UsageTotals {
                    used: usage.used_count,
                    reserved: usage.live_reserved(),
                }
            }
            None => UsageTotals {
                used: voucher.used_count,
                reserved: 0,
            },
        }
    }

    fn customer_has_used(&self, voucher_id: VoucherId, customer: CustomerId) -> bool {
        match self.peek(voucher_id) {
            Some(entry) => {
                let usage = Self::lock(&entry);
                usage.reservations.values().any(|r| {
                    r.customer_id == Some(customer) && r.state != ReservationState::Released
                })
            }
            None => false,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
