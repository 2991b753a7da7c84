//! ITCH Feed - NASDAQ TotalView-ITCH 5.0 Market Data Engine
//!
//! High-performance, zero-copy ITCH 5.0 feed processor maintaining
//! full-depth price-time-priority order books. Features include:
//! - Zero-copy big-endian message decoding for all 22 ITCH variants
//! - MoldUDP64 framing with sequence gap detection
//! - Per-order book state with O(1) order lookup and cached BBO
//! - Pooled order records, allocation-free on the hot path
//! - Trade and BBO-change event callbacks
//! - Decode and feed counters

pub mod book;
pub mod decoder;
pub mod directory;
pub mod feed;
pub mod gap_detector;
pub mod manager;
pub mod order_index;
pub mod pool;
pub mod protocol;
pub mod stats;

pub use book::{Bbo, BookError, DepthLevel, OrderBook, PriceLevel};
pub use decoder::{Decoder, DecoderStats, MessageHandler};
pub use directory::{SymbolDirectory, SymbolInfo};
pub use feed::{BboEvent, FeedEvents, FeedHandler, TradeEvent};
pub use gap_detector::GapDetector;
pub use manager::BookManager;
pub use order_index::OrderIndex;
pub use pool::{Order, OrderPool, OrderRef};
pub use protocol::{
    message_size, MessageType, MoldUdp64Header, OrderId, Price, Quantity, Side, StockLocate,
    Symbol, Timestamp,
};
pub use stats::FeedMetrics;
