//! Object pool for order records.
//!
//! The pool is the single owner of all order storage. Records are handed
//! out as `OrderRef` slot handles so the price-level lists and the
//! order-id index can hold non-owning references without lifetimes
//! tangling the book structures. Storage grows in fixed blocks and is
//! never freed while the engine runs; released slots are reused LIFO so
//! a hot id keeps hitting warm cache lines.

use crate::protocol::{OrderId, Price, Quantity, Side, StockLocate, Timestamp};

/// Slots added per pool growth step.
pub const POOL_BLOCK_SIZE: usize = 4096;

const BLOCK_SHIFT: u32 = POOL_BLOCK_SIZE.trailing_zeros();
const BLOCK_MASK: usize = POOL_BLOCK_SIZE - 1;

/// Handle to a pooled order slot. Copyable, 4 bytes, no lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderRef(pub(crate) u32);

impl OrderRef {
    /// Sentinel for "no slot", used by the intrusive list links.
    pub const NULL: OrderRef = OrderRef(u32::MAX);

    #[inline]
    pub fn is_null(self) -> bool {
        self == OrderRef::NULL
    }
}

/// A resting order in the book.
///
/// `prev`/`next` are intrusive list links manipulated only by the
/// owning price level. `quantity` never exceeds `original_qty`.
#[derive(Debug, Clone)]
pub struct Order {
    pub order_id: OrderId,
    pub price: Price,
    pub quantity: Quantity,
    pub original_qty: Quantity,
    pub timestamp: Timestamp,
    pub stock_locate: StockLocate,
    pub side: Side,
    pub(crate) prev: OrderRef,
    pub(crate) next: OrderRef,
}

impl Default for Order {
    fn default() -> Self {
        Order {
            order_id: 0,
            price: 0,
            quantity: 0,
            original_qty: 0,
            timestamp: 0,
            stock_locate: 0,
            side: Side::Buy,
            prev: OrderRef::NULL,
            next: OrderRef::NULL,
        }
    }
}

/// Growable free-list pool of order slots.
///
/// `acquire` never allocates unless the free list is empty, so the hot
/// path stays allocation-free once the pool has reached the stream's
/// peak order population.
pub struct OrderPool {
    blocks: Vec<Vec<Order>>,
    free: Vec<OrderRef>,
}

impl OrderPool {
    pub fn new() -> Self {
        let mut pool = OrderPool {
            blocks: Vec::new(),
            free: Vec::new(),
        };
        let first = pool.acquire_cold();
        pool.free.push(first);
        pool
    }

    /// Take a free slot, growing the pool by one block if necessary.
    /// Slots are not zeroed; callers overwrite every field.
    #[inline]
    pub fn acquire(&mut self) -> OrderRef {
        match self.free.pop() {
            Some(slot) => slot,
            None => self.acquire_cold(),
        }
    }

    /// Return a slot to the free list. The caller must not touch the
    /// slot afterwards; it may be handed out again by the next acquire.
    #[inline]
    pub fn release(&mut self, slot: OrderRef) {
        debug_assert!(!slot.is_null());
        self.free.push(slot);
    }

    #[inline]
    pub fn get(&self, slot: OrderRef) -> &Order {
        &self.blocks[slot.0 as usize >> BLOCK_SHIFT][slot.0 as usize & BLOCK_MASK]
    }

    #[inline]
    pub fn get_mut(&mut self, slot: OrderRef) -> &mut Order {
        &mut self.blocks[slot.0 as usize >> BLOCK_SHIFT][slot.0 as usize & BLOCK_MASK]
    }

    /// Total slots ever allocated.
    pub fn capacity(&self) -> usize {
        self.blocks.len() * POOL_BLOCK_SIZE
    }

    /// Slots currently on the free list.
    pub fn available(&self) -> usize {
        self.free.len()
    }

    /// Allocate one block, push all but the first slot onto the free
    /// list and return that first slot.
    #[cold]
    fn acquire_cold(&mut self) -> OrderRef {
        let base = (self.blocks.len() * POOL_BLOCK_SIZE) as u32;
        self.blocks.push(vec![Order::default(); POOL_BLOCK_SIZE]);
        self.free.reserve(POOL_BLOCK_SIZE - 1);
        for i in 1..POOL_BLOCK_SIZE as u32 {
            self.free.push(OrderRef(base + i));
        }
        OrderRef(base)
    }
}

impl Default for OrderPool {
    fn default() -> Self {
        Self::new()
    }
}
