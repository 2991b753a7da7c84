//! Feed orchestration: decoder callbacks wired to book mutations.
//!
//! `FeedHandler` owns the decoder, the book manager, the symbol
//! directory and the feed counters, and optionally a subscriber and a
//! locate filter. Everything runs on the caller's thread; callbacks
//! fire inline during `process` and every side effect of a message is
//! complete before the next message is decoded.
//!
//! Trade events fire before the book mutation they describe, so the
//! price and side of an execution can be read from the still-resting
//! order. BBO events fire once per message, after all mutations of that
//! message, and only when the best bid or ask *price* moved; quantity
//! changes at an unchanged top price are silent.

use crate::book::Bbo;
use crate::decoder::{Decoder, DecoderStats, MessageHandler};
use crate::directory::SymbolDirectory;
use crate::gap_detector::GapDetector;
use crate::manager::BookManager;
use crate::protocol::*;
use crate::stats::FeedMetrics;
use std::collections::HashSet;

/// A trade print derived from an execution ('E'/'C'), a non-displayed
/// trade ('P') or a cross ('Q').
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TradeEvent {
    pub stock_locate: StockLocate,
    pub price: Price,
    pub quantity: Quantity,
    pub order_ref: OrderId,
    pub match_number: u64,
    pub side: Side,
    pub timestamp: Timestamp,
}

/// Best bid/offer transition for one instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BboEvent {
    pub stock_locate: StockLocate,
    pub old_bbo: Bbo,
    pub new_bbo: Bbo,
    pub timestamp: Timestamp,
}

/// Subscriber callbacks, invoked synchronously from decode. All have
/// empty defaults.
pub trait FeedEvents {
    fn on_trade(&mut self, _event: &TradeEvent) {}
    fn on_bbo_update(&mut self, _event: &BboEvent) {}
    fn on_symbol_added(&mut self, _locate: StockLocate, _symbol: Symbol) {}
    fn on_parse_error(&mut self, _bytes: &[u8], _reason: &str) {}
}

/// The unit subscriber ignores everything; `FeedHandler::new` uses it.
impl FeedEvents for () {}

pub struct FeedHandler<E = ()> {
    decoder: Decoder,
    books: BookManager,
    directory: SymbolDirectory,
    gaps: GapDetector,
    metrics: FeedMetrics,
    events: Option<E>,
    filter: Option<HashSet<StockLocate>>,
}

impl FeedHandler<()> {
    /// A feed handler with no subscriber attached. Without a subscriber
    /// the per-message BBO snapshot is skipped entirely.
    pub fn new() -> Self {
        Self::build(None)
    }
}

impl Default for FeedHandler<()> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: FeedEvents> FeedHandler<E> {
    /// A feed handler that delivers trade, BBO, symbol and parse-error
    /// events to `events`.
    pub fn with_events(events: E) -> Self {
        Self::build(Some(events))
    }

    fn build(events: Option<E>) -> Self {
        FeedHandler {
            decoder: Decoder::new(),
            books: BookManager::new(),
            directory: SymbolDirectory::new(),
            gaps: GapDetector::new(),
            metrics: FeedMetrics::new(),
            events,
            filter: None,
        }
    }

    /// Restrict processing of order and trade messages to these
    /// locates. An empty iterator clears the filter.
    pub fn set_locate_filter<I: IntoIterator<Item = StockLocate>>(&mut self, locates: I) {
        let set: HashSet<StockLocate> = locates.into_iter().collect();
        self.filter = if set.is_empty() { None } else { Some(set) };
    }

    pub fn clear_locate_filter(&mut self) {
        self.filter = None;
    }

    /// Decode a raw concatenation of ITCH messages, applying each to
    /// the books. Returns the bytes consumed; an unconsumed tail is a
    /// partial message awaiting more bytes.
    pub fn process(&mut self, buf: &[u8]) -> usize {
        let mut sink = Dispatch {
            books: &mut self.books,
            directory: &mut self.directory,
            metrics: &mut self.metrics,
            events: self.events.as_mut(),
            filter: self.filter.as_ref(),
        };
        self.decoder.parse(&mut sink, buf)
    }

    /// Decode one MoldUDP64 packet, tracking sequence gaps from the
    /// packet header. Returns the number of messages decoded.
    pub fn process_moldudp64(&mut self, buf: &[u8]) -> usize {
        if let Some(header) = MoldUdp64Header::parse(buf) {
            self.gaps
                .observe(header.sequence(), header.message_count() as u64);
        }
        let mut sink = Dispatch {
            books: &mut self.books,
            directory: &mut self.directory,
            metrics: &mut self.metrics,
            events: self.events.as_mut(),
            filter: self.filter.as_ref(),
        };
        self.decoder.parse_moldudp64(&mut sink, buf)
    }

    pub fn book_manager(&self) -> &BookManager {
        &self.books
    }

    pub fn book_manager_mut(&mut self) -> &mut BookManager {
        &mut self.books
    }

    pub fn symbol_directory(&self) -> &SymbolDirectory {
        &self.directory
    }

    pub fn metrics(&self) -> &FeedMetrics {
        &self.metrics
    }

    pub fn decoder_stats(&self) -> &DecoderStats {
        self.decoder.stats()
    }

    pub fn gap_detector(&self) -> &GapDetector {
        &self.gaps
    }

    pub fn events(&self) -> Option<&E> {
        self.events.as_ref()
    }

    pub fn events_mut(&mut self) -> Option<&mut E> {
        self.events.as_mut()
    }

    /// Drop all book state and counters. The pool keeps its capacity.
    pub fn reset(&mut self) {
        self.books.clear();
        self.decoder.reset_stats();
        self.metrics.reset();
        self.gaps.reset();
    }
}

/// Per-call view over the handler's disjoint fields, so the decoder can
/// borrow the books, the subscriber and the counters at the same time.
struct Dispatch<'a, E> {
    books: &'a mut BookManager,
    directory: &'a mut SymbolDirectory,
    metrics: &'a mut FeedMetrics,
    events: Option<&'a mut E>,
    filter: Option<&'a HashSet<StockLocate>>,
}

impl<E: FeedEvents> Dispatch<'_, E> {
    #[inline]
    fn accepts(&self, locate: StockLocate) -> bool {
        self.filter.map_or(true, |filter| filter.contains(&locate))
    }

    #[inline]
    fn emit_bbo_if_changed(
        &mut self,
        locate: StockLocate,
        old_bbo: Option<Bbo>,
        new_bbo: Bbo,
        ts: Timestamp,
    ) {
        // `old_bbo` is only snapshotted when a subscriber is attached.
        let Some(old_bbo) = old_bbo else { return };
        if old_bbo.bid_price != new_bbo.bid_price || old_bbo.ask_price != new_bbo.ask_price {
            self.metrics.bbo_updates += 1;
            if let Some(events) = self.events.as_mut() {
                events.on_bbo_update(&BboEvent {
                    stock_locate: locate,
                    old_bbo,
                    new_bbo,
                    timestamp: ts,
                });
            }
        }
    }

    fn apply_add(
        &mut self,
        locate: StockLocate,
        order_id: OrderId,
        side: Side,
        price: Price,
        shares: Quantity,
        ts: Timestamp,
    ) {
        let (book, pool) = self.books.book_and_pool(locate);
        let old_bbo = self.events.is_some().then(|| *book.bbo());

        // A duplicate id is rejected by the book and stays a complete
        // no-op here: no add counter, no BBO event.
        let added = book.add_order(pool, order_id, side, price, shares, ts).is_ok();
        let new_bbo = *book.bbo();

        self.metrics.count_message();
        if added {
            self.metrics.orders_added += 1;
            self.emit_bbo_if_changed(locate, old_bbo, new_bbo, ts);
        }
    }

    fn apply_execution(
        &mut self,
        locate: StockLocate,
        order_id: OrderId,
        shares: Quantity,
        match_number: u64,
        // 'C' carries an explicit execution price; 'E' trades at the
        // resting order's price.
        price_override: Option<Price>,
        ts: Timestamp,
    ) {
        let (book, pool) = self.books.book_and_pool(locate);
        let old_bbo = self.events.is_some().then(|| *book.bbo());

        let resting = book.get_order(pool, order_id).map(|o| (o.price, o.side));
        if let Some((resting_price, side)) = resting {
            if let Some(events) = self.events.as_mut() {
                events.on_trade(&TradeEvent {
                    stock_locate: locate,
                    price: price_override.unwrap_or(resting_price),
                    quantity: shares,
                    order_ref: order_id,
                    match_number,
                    side,
                    timestamp: ts,
                });
            }
            book.execute_order(pool, order_id, shares);
        }
        let new_bbo = *book.bbo();

        self.metrics.orders_executed += 1;
        self.metrics.trades += 1;
        self.metrics.count_message();
        self.emit_bbo_if_changed(locate, old_bbo, new_bbo, ts);
    }
}

impl<E: FeedEvents> MessageHandler for Dispatch<'_, E> {
    fn on_add_order(&mut self, msg: AddOrder<'_>, ts: Timestamp) {
        let locate = msg.stock_locate();
        if !self.accepts(locate) {
            return;
        }
        self.apply_add(locate, msg.order_ref(), msg.side(), msg.price(), msg.shares(), ts);
    }

    fn on_add_order_mpid(&mut self, msg: AddOrderMpid<'_>, ts: Timestamp) {
        let locate = msg.stock_locate();
        if !self.accepts(locate) {
            return;
        }
        self.apply_add(locate, msg.order_ref(), msg.side(), msg.price(), msg.shares(), ts);
    }

    fn on_order_executed(&mut self, msg: OrderExecuted<'_>, ts: Timestamp) {
        let locate = msg.stock_locate();
        if !self.accepts(locate) {
            return;
        }
        self.apply_execution(
            locate,
            msg.order_ref(),
            msg.executed_shares(),
            msg.match_number(),
            None,
            ts,
        );
    }

    fn on_order_executed_price(&mut self, msg: OrderExecutedPrice<'_>, ts: Timestamp) {
        let locate = msg.stock_locate();
        if !self.accepts(locate) {
            return;
        }
        self.apply_execution(
            locate,
            msg.order_ref(),
            msg.executed_shares(),
            msg.match_number(),
            Some(msg.execution_price()),
            ts,
        );
    }

    fn on_order_cancel(&mut self, msg: OrderCancel<'_>, ts: Timestamp) {
        let locate = msg.stock_locate();
        if !self.accepts(locate) {
            return;
        }

        let (book, pool) = self.books.book_and_pool(locate);
        let old_bbo = self.events.is_some().then(|| *book.bbo());
        book.cancel_order(pool, msg.order_ref(), msg.cancelled_shares());
        let new_bbo = *book.bbo();

        self.metrics.orders_cancelled += 1;
        self.metrics.count_message();
        self.emit_bbo_if_changed(locate, old_bbo, new_bbo, ts);
    }

    fn on_order_delete(&mut self, msg: OrderDelete<'_>, ts: Timestamp) {
        let locate = msg.stock_locate();
        if !self.accepts(locate) {
            return;
        }

        let (book, pool) = self.books.book_and_pool(locate);
        let old_bbo = self.events.is_some().then(|| *book.bbo());
        book.delete_order(pool, msg.order_ref());
        let new_bbo = *book.bbo();

        self.metrics.orders_deleted += 1;
        self.metrics.count_message();
        self.emit_bbo_if_changed(locate, old_bbo, new_bbo, ts);
    }

    fn on_order_replace(&mut self, msg: OrderReplace<'_>, ts: Timestamp) {
        let locate = msg.stock_locate();
        if !self.accepts(locate) {
            return;
        }

        let (book, pool) = self.books.book_and_pool(locate);
        let old_bbo = self.events.is_some().then(|| *book.bbo());
        // Delete-plus-add runs unobserved; at most one BBO event
        // brackets the pair.
        let _ = book.replace_order(
            pool,
            msg.original_order_ref(),
            msg.new_order_ref(),
            msg.shares(),
            msg.price(),
            ts,
        );
        let new_bbo = *book.bbo();

        self.metrics.orders_replaced += 1;
        self.metrics.count_message();
        self.emit_bbo_if_changed(locate, old_bbo, new_bbo, ts);
    }

    fn on_trade(&mut self, msg: Trade<'_>, ts: Timestamp) {
        let locate = msg.stock_locate();
        if !self.accepts(locate) {
            return;
        }

        // Non-cross trades execute against non-displayed orders; the
        // book is untouched.
        if let Some(events) = self.events.as_mut() {
            events.on_trade(&TradeEvent {
                stock_locate: locate,
                price: msg.price(),
                quantity: msg.shares(),
                order_ref: msg.order_ref(),
                match_number: msg.match_number(),
                side: msg.side(),
                timestamp: ts,
            });
        }
        self.metrics.trades += 1;
        self.metrics.count_message();
    }

    fn on_cross_trade(&mut self, msg: CrossTrade<'_>, ts: Timestamp) {
        let locate = msg.stock_locate();
        if !self.accepts(locate) {
            return;
        }

        // A cross carries no side and no resting order reference.
        if let Some(events) = self.events.as_mut() {
            events.on_trade(&TradeEvent {
                stock_locate: locate,
                price: msg.cross_price(),
                quantity: msg.shares() as Quantity,
                order_ref: 0,
                match_number: msg.match_number(),
                side: Side::Buy,
                timestamp: ts,
            });
        }
        self.metrics.trades += 1;
        self.metrics.count_message();
    }

    fn on_stock_directory(&mut self, msg: StockDirectory<'_>, _ts: Timestamp) {
        let locate = msg.stock_locate();
        let symbol = msg.stock();
        self.directory
            .add_symbol(locate, symbol, msg.market_category(), msg.financial_status());
        if let Some(events) = self.events.as_mut() {
            events.on_symbol_added(locate, symbol);
        }
        self.metrics.count_message();
    }

    fn on_system_event(&mut self, _msg: SystemEvent<'_>, _ts: Timestamp) {
        self.metrics.count_message();
    }

    fn on_stock_trading_action(&mut self, _msg: StockTradingAction<'_>, _ts: Timestamp) {
        self.metrics.count_message();
    }

    fn on_reg_sho_restriction(&mut self, _msg: RegShoRestriction<'_>, _ts: Timestamp) {
        self.metrics.count_message();
    }

    fn on_market_participant_pos(&mut self, _msg: MarketParticipantPos<'_>, _ts: Timestamp) {
        self.metrics.count_message();
    }

    fn on_mwcb_decline_level(&mut self, _msg: MwcbDeclineLevel<'_>, _ts: Timestamp) {
        self.metrics.count_message();
    }

    fn on_mwcb_status(&mut self, _msg: MwcbStatus<'_>, _ts: Timestamp) {
        self.metrics.count_message();
    }

    fn on_ipo_quoting_period(&mut self, _msg: IpoQuotingPeriod<'_>, _ts: Timestamp) {
        self.metrics.count_message();
    }

    fn on_luld_auction_collar(&mut self, _msg: LuldAuctionCollar<'_>, _ts: Timestamp) {
        self.metrics.count_message();
    }

    fn on_operational_halt(&mut self, _msg: OperationalHalt<'_>, _ts: Timestamp) {
        self.metrics.count_message();
    }

    fn on_broken_trade(&mut self, _msg: BrokenTrade<'_>, _ts: Timestamp) {
        self.metrics.count_message();
    }

    fn on_noii(&mut self, _msg: Noii<'_>, _ts: Timestamp) {
        self.metrics.count_message();
    }

    fn on_rpii(&mut self, _msg: Rpii<'_>, _ts: Timestamp) {
        self.metrics.count_message();
    }

    fn on_parse_error(&mut self, bytes: &[u8], reason: &str) {
        if let Some(events) = self.events.as_mut() {
            events.on_parse_error(bytes, reason);
        }
    }
}
