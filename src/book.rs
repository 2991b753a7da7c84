//! Full-depth price-time-priority order book for a single instrument.
//!
//! Two ordered maps carry the price levels (bids iterated descending,
//! asks ascending); each level chains its orders through the intrusive
//! links in the pooled records, oldest first. An open-addressing index
//! resolves order ids to pool slots in O(1). The best bid/offer is
//! cached and refreshed on every mutation of the affected side.
//!
//! A slot is released back to the pool if and only if it has been
//! unlinked from its level list and removed from the id index.

use crate::order_index::OrderIndex;
use crate::pool::{Order, OrderPool, OrderRef};
use crate::protocol::{OrderId, Price, Quantity, Side, StockLocate, Timestamp};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookError {
    #[error("duplicate order id {0}")]
    DuplicateOrder(OrderId),

    #[error("unknown order id {0}")]
    UnknownOrder(OrderId),
}

// ---------------------------------------------------------------------------
// Price level
// ---------------------------------------------------------------------------

/// All resting orders at one price on one side, in arrival order.
///
/// `total_quantity` and `order_count` are maintained on every mutation
/// so depth queries never walk the list.
#[derive(Debug)]
pub struct PriceLevel {
    price: Price,
    head: OrderRef,
    tail: OrderRef,
    total_quantity: Quantity,
    order_count: usize,
}

impl PriceLevel {
    pub fn new(price: Price) -> Self {
        PriceLevel {
            price,
            head: OrderRef::NULL,
            tail: OrderRef::NULL,
            total_quantity: 0,
            order_count: 0,
        }
    }

    /// Append to the tail. The newest order has the lowest time priority.
    pub fn add_order(&mut self, pool: &mut OrderPool, slot: OrderRef) {
        let quantity = {
            let order = pool.get_mut(slot);
            order.prev = self.tail;
            order.next = OrderRef::NULL;
            order.quantity
        };

        if self.tail.is_null() {
            self.head = slot;
        } else {
            pool.get_mut(self.tail).next = slot;
        }
        self.tail = slot;

        self.total_quantity += quantity;
        self.order_count += 1;
    }

    /// Unlink in O(1) via the record's own links. Links are nulled on
    /// exit so a stale slot can never walk back into the list.
    pub fn remove_order(&mut self, pool: &mut OrderPool, slot: OrderRef) {
        let (prev, next, quantity) = {
            let order = pool.get(slot);
            (order.prev, order.next, order.quantity)
        };

        self.total_quantity -= quantity;
        self.order_count -= 1;

        if prev.is_null() {
            self.head = next;
        } else {
            pool.get_mut(prev).next = next;
        }
        if next.is_null() {
            self.tail = prev;
        } else {
            pool.get_mut(next).prev = prev;
        }

        let order = pool.get_mut(slot);
        order.prev = OrderRef::NULL;
        order.next = OrderRef::NULL;
    }

    /// Reduce the record and the level total by `delta`, removing the
    /// record once it reaches zero. `delta` must not exceed the record's
    /// remaining quantity.
    pub fn reduce_quantity(&mut self, pool: &mut OrderPool, slot: OrderRef, delta: Quantity) {
        let now_empty = {
            let order = pool.get_mut(slot);
            debug_assert!(delta <= order.quantity);
            order.quantity -= delta;
            order.quantity == 0
        };
        self.total_quantity -= delta;

        if now_empty {
            self.remove_order(pool, slot);
        }
    }

    pub fn price(&self) -> Price {
        self.price
    }

    pub fn total_quantity(&self) -> Quantity {
        self.total_quantity
    }

    pub fn order_count(&self) -> usize {
        self.order_count
    }

    pub fn is_empty(&self) -> bool {
        self.order_count == 0
    }

    /// Oldest order at this price.
    pub fn front(&self) -> OrderRef {
        self.head
    }

    pub fn back(&self) -> OrderRef {
        self.tail
    }
}

// ---------------------------------------------------------------------------
// BBO
// ---------------------------------------------------------------------------

/// Cached best bid/offer. An empty bid side is price 0, an empty ask
/// side is `Price::MAX`; quantity 0 distinguishes "no market" from a
/// zero-price market on either side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bbo {
    pub bid_price: Price,
    pub ask_price: Price,
    pub bid_quantity: Quantity,
    pub ask_quantity: Quantity,
}

impl Default for Bbo {
    fn default() -> Self {
        Bbo {
            bid_price: 0,
            ask_price: Price::MAX,
            bid_quantity: 0,
            ask_quantity: 0,
        }
    }
}

impl Bbo {
    pub fn has_bid(&self) -> bool {
        self.bid_quantity > 0
    }

    pub fn has_ask(&self) -> bool {
        self.ask_quantity > 0
    }

    /// Ask minus bid, or 0 unless both sides have liquidity.
    pub fn spread(&self) -> Price {
        if !self.has_bid() || !self.has_ask() {
            return 0;
        }
        self.ask_price - self.bid_price
    }

    /// Integer midpoint, or 0 unless both sides have liquidity.
    pub fn midpoint(&self) -> Price {
        if !self.has_bid() || !self.has_ask() {
            return 0;
        }
        (self.bid_price + self.ask_price) / 2
    }
}

/// One row of a depth snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepthLevel {
    pub price: Price,
    pub quantity: Quantity,
    pub order_count: usize,
}

// ---------------------------------------------------------------------------
// Order book
// ---------------------------------------------------------------------------

pub struct OrderBook {
    stock_locate: StockLocate,
    bids: BTreeMap<Price, PriceLevel>,
    asks: BTreeMap<Price, PriceLevel>,
    orders: OrderIndex,
    bbo: Bbo,
    order_count: usize,
}

impl OrderBook {
    pub fn new(stock_locate: StockLocate) -> Self {
        OrderBook {
            stock_locate,
            bids: BTreeMap::new(),
            asks: BTreeMap::new(),
            orders: OrderIndex::new(),
            bbo: Bbo::default(),
            order_count: 0,
        }
    }

    /// Insert a new resting order. Fails on a duplicate id without
    /// touching the book.
    pub fn add_order(
        &mut self,
        pool: &mut OrderPool,
        order_id: OrderId,
        side: Side,
        price: Price,
        quantity: Quantity,
        timestamp: Timestamp,
    ) -> Result<OrderRef, BookError> {
        if self.orders.find(order_id).is_some() {
            return Err(BookError::DuplicateOrder(order_id));
        }

        let slot = pool.acquire();
        {
            let order = pool.get_mut(slot);
            order.order_id = order_id;
            order.price = price;
            order.quantity = quantity;
            order.original_qty = quantity;
            order.timestamp = timestamp;
            order.stock_locate = self.stock_locate;
            order.side = side;
            order.prev = OrderRef::NULL;
            order.next = OrderRef::NULL;
        }

        self.orders.put(order_id, slot);

        let levels = match side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        };
        levels
            .entry(price)
            .or_insert_with(|| PriceLevel::new(price))
            .add_order(pool, slot);

        match side {
            Side::Buy => self.update_best_bid(),
            Side::Sell => self.update_best_ask(),
        }

        self.order_count += 1;
        Ok(slot)
    }

    /// Execute up to `quantity` shares against a resting order.
    /// Returns the executed quantity; 0 when the id is unknown, which
    /// is normal on filtered or warm-started streams.
    pub fn execute_order(
        &mut self,
        pool: &mut OrderPool,
        order_id: OrderId,
        quantity: Quantity,
    ) -> Quantity {
        let Some(slot) = self.orders.find(order_id) else {
            return 0;
        };

        let (side, price, remaining) = {
            let order = pool.get(slot);
            (order.side, order.price, order.quantity)
        };
        let executed = quantity.min(remaining);

        let levels = match side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        };
        if let Some(level) = levels.get_mut(&price) {
            level.reduce_quantity(pool, slot, executed);
            if level.is_empty() {
                levels.remove(&price);
            }
        }

        if pool.get(slot).quantity == 0 {
            self.orders.remove(order_id);
            pool.release(slot);
            self.order_count -= 1;
        }

        match side {
            Side::Buy => self.update_best_bid(),
            Side::Sell => self.update_best_ask(),
        }

        executed
    }

    /// Cancel up to `quantity` shares. Structurally identical to an
    /// execution; the distinction (trade vs. no trade) is the feed's.
    pub fn cancel_order(
        &mut self,
        pool: &mut OrderPool,
        order_id: OrderId,
        quantity: Quantity,
    ) -> Quantity {
        self.execute_order(pool, order_id, quantity)
    }

    /// Remove an order in full regardless of its residual quantity.
    pub fn delete_order(&mut self, pool: &mut OrderPool, order_id: OrderId) -> bool {
        let Some(slot) = self.orders.find(order_id) else {
            return false;
        };

        let (side, price) = {
            let order = pool.get(slot);
            (order.side, order.price)
        };

        let levels = match side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        };
        if let Some(level) = levels.get_mut(&price) {
            level.remove_order(pool, slot);
            if level.is_empty() {
                levels.remove(&price);
            }
        }

        self.orders.remove(order_id);
        pool.release(slot);
        self.order_count -= 1;

        match side {
            Side::Buy => self.update_best_bid(),
            Side::Sell => self.update_best_ask(),
        }

        true
    }

    /// Delete the old order and add the new one on the remembered side.
    /// No observer sees the book between the two halves.
    pub fn replace_order(
        &mut self,
        pool: &mut OrderPool,
        old_order_id: OrderId,
        new_order_id: OrderId,
        new_quantity: Quantity,
        new_price: Price,
        timestamp: Timestamp,
    ) -> Result<OrderRef, BookError> {
        let Some(slot) = self.orders.find(old_order_id) else {
            return Err(BookError::UnknownOrder(old_order_id));
        };
        let side = pool.get(slot).side;

        self.delete_order(pool, old_order_id);
        self.add_order(pool, new_order_id, side, new_price, new_quantity, timestamp)
    }

    pub fn find(&self, order_id: OrderId) -> Option<OrderRef> {
        self.orders.find(order_id)
    }

    pub fn get_order<'p>(&self, pool: &'p OrderPool, order_id: OrderId) -> Option<&'p Order> {
        self.orders.find(order_id).map(|slot| pool.get(slot))
    }

    pub fn bbo(&self) -> &Bbo {
        &self.bbo
    }

    /// The resting level at an exact price, if any.
    pub fn level(&self, side: Side, price: Price) -> Option<&PriceLevel> {
        match side {
            Side::Buy => self.bids.get(&price),
            Side::Sell => self.asks.get(&price),
        }
    }

    /// Top `max_levels` bid levels, best (highest) first.
    pub fn bid_depth(&self, max_levels: usize) -> Vec<DepthLevel> {
        self.bids
            .values()
            .rev()
            .take(max_levels)
            .map(|level| DepthLevel {
                price: level.price(),
                quantity: level.total_quantity(),
                order_count: level.order_count(),
            })
            .collect()
    }

    /// Top `max_levels` ask levels, best (lowest) first.
    pub fn ask_depth(&self, max_levels: usize) -> Vec<DepthLevel> {
        self.asks
            .values()
            .take(max_levels)
            .map(|level| DepthLevel {
                price: level.price(),
                quantity: level.total_quantity(),
                order_count: level.order_count(),
            })
            .collect()
    }

    pub fn order_count(&self) -> usize {
        self.order_count
    }

    pub fn bid_level_count(&self) -> usize {
        self.bids.len()
    }

    pub fn ask_level_count(&self) -> usize {
        self.asks.len()
    }

    pub fn stock_locate(&self) -> StockLocate {
        self.stock_locate
    }

    /// Release every record and drop all levels.
    pub fn clear(&mut self, pool: &mut OrderPool) {
        for level in self.bids.values().chain(self.asks.values()) {
            let mut curr = level.front();
            while !curr.is_null() {
                let next = pool.get(curr).next;
                pool.release(curr);
                curr = next;
            }
        }
        self.bids.clear();
        self.asks.clear();
        self.orders.clear();
        self.bbo = Bbo::default();
        self.order_count = 0;
    }

    fn update_best_bid(&mut self) {
        match self.bids.last_key_value() {
            Some((_, level)) => {
                self.bbo.bid_price = level.price();
                self.bbo.bid_quantity = level.total_quantity();
            }
            None => {
                self.bbo.bid_price = 0;
                self.bbo.bid_quantity = 0;
            }
        }
    }

    fn update_best_ask(&mut self) {
        match self.asks.first_key_value() {
            Some((_, level)) => {
                self.bbo.ask_price = level.price();
                self.bbo.ask_quantity = level.total_quantity();
            }
            None => {
                self.bbo.ask_price = Price::MAX;
                self.bbo.ask_quantity = 0;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_price_level_add_remove() {
        let mut pool = OrderPool::new();
        let mut level = PriceLevel::new(1_500_000);

        assert!(level.is_empty());
        assert_eq!(level.total_quantity(), 0);

        let a = pool.acquire();
        pool.get_mut(a).quantity = 100;
        level.add_order(&mut pool, a);

        let b = pool.acquire();
        pool.get_mut(b).quantity = 200;
        level.add_order(&mut pool, b);

        assert!(!level.is_empty());
        assert_eq!(level.total_quantity(), 300);
        assert_eq!(level.order_count(), 2);
        assert_eq!(level.front(), a);
        assert_eq!(level.back(), b);

        level.remove_order(&mut pool, a);
        assert_eq!(level.total_quantity(), 200);
        assert_eq!(level.front(), b);

        level.remove_order(&mut pool, b);
        assert!(level.is_empty());
        assert_eq!(level.total_quantity(), 0);
    }

    #[test]
    fn test_price_level_reduce_quantity() {
        let mut pool = OrderPool::new();
        let mut level = PriceLevel::new(1_500_000);

        let slot = pool.acquire();
        pool.get_mut(slot).quantity = 500;
        level.add_order(&mut pool, slot);

        level.reduce_quantity(&mut pool, slot, 200);
        assert_eq!(pool.get(slot).quantity, 300);
        assert_eq!(level.total_quantity(), 300);
        assert!(!level.is_empty());

        level.reduce_quantity(&mut pool, slot, 300);
        assert_eq!(pool.get(slot).quantity, 0);
        assert!(level.is_empty());
    }

    #[test]
    fn test_price_level_fifo() {
        let mut pool = OrderPool::new();
        let mut level = PriceLevel::new(1_500_000);

        let mut slots = Vec::new();
        for id in 1..=5u64 {
            let slot = pool.acquire();
            let order = pool.get_mut(slot);
            order.order_id = id;
            order.quantity = 100;
            slots.push(slot);
            level.add_order(&mut pool, slot);
        }

        // Head is the oldest; walking next yields arrival order.
        let mut curr = level.front();
        for id in 1..=5u64 {
            assert_eq!(pool.get(curr).order_id, id);
            curr = pool.get(curr).next;
        }
        assert!(curr.is_null());

        // Remove from the middle and re-verify the chain.
        level.remove_order(&mut pool, slots[2]);
        let order = [1u64, 2, 4, 5];
        let mut curr = level.front();
        for id in order {
            assert_eq!(pool.get(curr).order_id, id);
            curr = pool.get(curr).next;
        }
        assert!(curr.is_null());
    }

    #[test]
    fn test_add_order_and_bbo() {
        let mut pool = OrderPool::new();
        let mut book = OrderBook::new(1);

        let slot = book
            .add_order(&mut pool, 1001, Side::Buy, 1_500_000, 100, 1000)
            .unwrap();
        let order = pool.get(slot);
        assert_eq!(order.order_id, 1001);
        assert_eq!(order.price, 1_500_000);
        assert_eq!(order.quantity, 100);
        assert_eq!(order.original_qty, 100);
        assert_eq!(order.stock_locate, 1);

        assert_eq!(book.order_count(), 1);
        assert_eq!(book.bid_level_count(), 1);
        assert_eq!(book.ask_level_count(), 0);

        let bbo = book.bbo();
        assert_eq!(bbo.bid_price, 1_500_000);
        assert_eq!(bbo.bid_quantity, 100);
        assert!(bbo.has_bid());
        assert!(!bbo.has_ask());
    }

    #[test]
    fn test_bbo_across_levels() {
        let mut pool = OrderPool::new();
        let mut book = OrderBook::new(1);

        book.add_order(&mut pool, 1, Side::Buy, 1_500_000, 100, 1000).unwrap();
        book.add_order(&mut pool, 2, Side::Buy, 1_499_000, 200, 2000).unwrap();
        book.add_order(&mut pool, 3, Side::Buy, 1_501_000, 150, 3000).unwrap();
        book.add_order(&mut pool, 4, Side::Sell, 1_502_000, 100, 4000).unwrap();
        book.add_order(&mut pool, 5, Side::Sell, 1_503_000, 200, 5000).unwrap();
        book.add_order(&mut pool, 6, Side::Sell, 1_501_500, 175, 6000).unwrap();

        let bbo = book.bbo();
        assert_eq!(bbo.bid_price, 1_501_000);
        assert_eq!(bbo.bid_quantity, 150);
        assert_eq!(bbo.ask_price, 1_501_500);
        assert_eq!(bbo.ask_quantity, 175);
        assert_eq!(bbo.spread(), 500);
        assert_eq!(bbo.midpoint(), 1_501_250);
    }

    #[test]
    fn test_execute_order() {
        let mut pool = OrderPool::new();
        let mut book = OrderBook::new(1);

        book.add_order(&mut pool, 1001, Side::Buy, 1_500_000, 500, 1000).unwrap();

        let executed = book.execute_order(&mut pool, 1001, 200);
        assert_eq!(executed, 200);
        assert_eq!(book.order_count(), 1);
        assert_eq!(book.get_order(&pool, 1001).unwrap().quantity, 300);
        assert_eq!(book.bbo().bid_quantity, 300);

        // Over-sized execution clamps to the remainder.
        let executed = book.execute_order(&mut pool, 1001, 999);
        assert_eq!(executed, 300);
        assert_eq!(book.order_count(), 0);
        assert!(book.get_order(&pool, 1001).is_none());
        assert!(!book.bbo().has_bid());
        assert_eq!(book.bid_level_count(), 0);
    }

    #[test]
    fn test_execute_unknown_order() {
        let mut pool = OrderPool::new();
        let mut book = OrderBook::new(1);
        assert_eq!(book.execute_order(&mut pool, 9999, 100), 0);
    }

    #[test]
    fn test_cancel_order() {
        let mut pool = OrderPool::new();
        let mut book = OrderBook::new(1);

        book.add_order(&mut pool, 1001, Side::Sell, 1_510_000, 1000, 1000).unwrap();

        assert_eq!(book.cancel_order(&mut pool, 1001, 300), 300);
        assert_eq!(book.get_order(&pool, 1001).unwrap().quantity, 700);

        assert_eq!(book.cancel_order(&mut pool, 1001, 700), 700);
        assert!(book.get_order(&pool, 1001).is_none());
        assert!(!book.bbo().has_ask());
        assert_eq!(book.bbo().ask_price, Price::MAX);
    }

    #[test]
    fn test_delete_order() {
        let mut pool = OrderPool::new();
        let mut book = OrderBook::new(1);

        book.add_order(&mut pool, 1001, Side::Buy, 1_500_000, 500, 1000).unwrap();
        book.add_order(&mut pool, 1002, Side::Buy, 1_500_000, 300, 2000).unwrap();
        assert_eq!(book.order_count(), 2);
        assert_eq!(book.bid_level_count(), 1);

        assert!(book.delete_order(&mut pool, 1001));
        assert_eq!(book.order_count(), 1);
        assert_eq!(book.bid_level_count(), 1);
        assert!(book.get_order(&pool, 1001).is_none());
        assert!(book.get_order(&pool, 1002).is_some());
        assert_eq!(book.bbo().bid_quantity, 300);

        assert!(book.delete_order(&mut pool, 1002));
        assert_eq!(book.order_count(), 0);
        assert_eq!(book.bid_level_count(), 0);

        assert!(!book.delete_order(&mut pool, 9999));
    }

    #[test]
    fn test_replace_order() {
        let mut pool = OrderPool::new();
        let mut book = OrderBook::new(1);

        book.add_order(&mut pool, 1001, Side::Buy, 1_500_000, 500, 1000).unwrap();

        let slot = book
            .replace_order(&mut pool, 1001, 1002, 750, 1_505_000, 2000)
            .unwrap();
        let order = pool.get(slot);
        assert_eq!(order.order_id, 1002);
        assert_eq!(order.price, 1_505_000);
        assert_eq!(order.quantity, 750);
        assert_eq!(order.side, Side::Buy);

        assert!(book.get_order(&pool, 1001).is_none());
        assert!(book.get_order(&pool, 1002).is_some());
        assert_eq!(book.order_count(), 1);
        assert_eq!(book.bbo().bid_price, 1_505_000);
        assert_eq!(book.bbo().bid_quantity, 750);

        assert_eq!(
            book.replace_order(&mut pool, 7777, 7778, 10, 1_000_000, 3000),
            Err(BookError::UnknownOrder(7777))
        );
    }

    #[test]
    fn test_duplicate_add_rejected() {
        let mut pool = OrderPool::new();
        let mut book = OrderBook::new(1);

        book.add_order(&mut pool, 1001, Side::Buy, 1_500_000, 100, 1000).unwrap();
        let before = pool.available();

        assert_eq!(
            book.add_order(&mut pool, 1001, Side::Buy, 1_500_000, 200, 2000),
            Err(BookError::DuplicateOrder(1001))
        );
        assert_eq!(book.order_count(), 1);
        assert_eq!(book.bbo().bid_quantity, 100);
        // The rejected add must not leak a pool slot.
        assert_eq!(pool.available(), before);
    }

    #[test]
    fn test_delete_then_add_round_trip() {
        let mut pool = OrderPool::new();
        let mut book = OrderBook::new(1);

        book.add_order(&mut pool, 1001, Side::Buy, 1_500_000, 100, 1000).unwrap();
        book.delete_order(&mut pool, 1001);
        book.add_order(&mut pool, 1001, Side::Buy, 1_500_000, 100, 2000).unwrap();

        assert_eq!(book.order_count(), 1);
        assert_eq!(book.bid_level_count(), 1);
        let order = book.get_order(&pool, 1001).unwrap();
        assert_eq!(order.price, 1_500_000);
        assert_eq!(order.quantity, 100);
        assert_eq!(book.bbo().bid_price, 1_500_000);
        assert_eq!(book.bbo().bid_quantity, 100);
    }

    #[test]
    fn test_market_depth() {
        let mut pool = OrderPool::new();
        let mut book = OrderBook::new(1);

        for i in 0..5 {
            let price = 1_500_000 - i as Price * 1000;
            let qty = 100 * (i as Quantity + 1);
            book.add_order(&mut pool, i + 1, Side::Buy, price, qty, i * 1000).unwrap();
        }
        for i in 0..5 {
            let price = 1_501_000 + i as Price * 1000;
            let qty = 150 * (i as Quantity + 1);
            book.add_order(&mut pool, 10 + i, Side::Sell, price, qty, 10_000 + i * 1000)
                .unwrap();
        }

        let bids = book.bid_depth(3);
        assert_eq!(bids.len(), 3);
        assert_eq!(bids[0], DepthLevel { price: 1_500_000, quantity: 100, order_count: 1 });
        assert_eq!(bids[1], DepthLevel { price: 1_499_000, quantity: 200, order_count: 1 });
        assert_eq!(bids[2], DepthLevel { price: 1_498_000, quantity: 300, order_count: 1 });

        let asks = book.ask_depth(3);
        assert_eq!(asks.len(), 3);
        assert_eq!(asks[0], DepthLevel { price: 1_501_000, quantity: 150, order_count: 1 });
        assert_eq!(asks[1], DepthLevel { price: 1_502_000, quantity: 300, order_count: 1 });
        assert_eq!(asks[2], DepthLevel { price: 1_503_000, quantity: 450, order_count: 1 });

        // Requesting more levels than exist returns what is there.
        assert_eq!(book.bid_depth(10).len(), 5);
    }

    #[test]
    fn test_level_invariants_after_mixed_ops() {
        let mut pool = OrderPool::new();
        let mut book = OrderBook::new(1);

        for id in 1..=20u64 {
            let price = 1_500_000 + (id as Price % 5) * 1000;
            let side = if id % 2 == 0 { Side::Buy } else { Side::Sell };
            book.add_order(&mut pool, id, side, price, 100, id).unwrap();
        }
        for id in (1..=20u64).step_by(3) {
            book.execute_order(&mut pool, id, 60);
        }
        for id in (2..=20u64).step_by(4) {
            book.delete_order(&mut pool, id);
        }

        // Cached totals must equal the sums over the intrusive lists,
        // and the book order count must equal the sum of level counts.
        let mut total_orders = 0;
        for level in book.bids.values().chain(book.asks.values()) {
            let mut qty_sum = 0u64;
            let mut count = 0;
            let mut curr = level.front();
            while !curr.is_null() {
                let order = pool.get(curr);
                assert_eq!(order.price, level.price());
                assert_eq!(book.find(order.order_id), Some(curr));
                qty_sum += order.quantity as u64;
                count += 1;
                curr = order.next;
            }
            assert_eq!(qty_sum, level.total_quantity() as u64);
            assert_eq!(count, level.order_count());
            assert!(count > 0, "empty levels must be erased");
            total_orders += count;
        }
        assert_eq!(total_orders, book.order_count());
    }

    #[test]
    fn test_clear_returns_slots() {
        let mut pool = OrderPool::new();
        let mut book = OrderBook::new(1);

        let before = pool.available();
        for id in 1..=50u64 {
            book.add_order(&mut pool, id, Side::Buy, 1_500_000 + id as Price, 100, id).unwrap();
        }
        assert_eq!(pool.available(), before - 50);

        book.clear(&mut pool);
        assert_eq!(pool.available(), before);
        assert_eq!(book.order_count(), 0);
        assert_eq!(book.bid_level_count(), 0);
        assert_eq!(*book.bbo(), Bbo::default());
    }
}
