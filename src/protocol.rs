//! NASDAQ TotalView-ITCH 5.0 wire format.
//!
//! All numeric fields are big-endian, packed, no padding. Every message
//! starts with a 1-byte type tag followed by `stock_locate:u16`,
//! `tracking_number:u16` and a 6-byte nanosecond timestamp. Message
//! bodies are accessed through zero-copy views over the caller's buffer;
//! no field is decoded until it is asked for.

use byteorder::{BigEndian, ByteOrder};
use std::fmt;

/// Price in fixed-point with 4 implied decimal places. ITCH carries
/// prices as unsigned 32-bit; widening to signed 64 leaves headroom for
/// spread/midpoint arithmetic.
pub type Price = i64;
pub type Quantity = u32;
pub type OrderId = u64;
/// Nanoseconds since midnight (48 bits on the wire).
pub type Timestamp = u64;
pub type StockLocate = u16;

pub const PRICE_SCALE: i64 = 10_000;

/// Convert a fixed-point price to dollars.
pub fn price_to_f64(price: Price) -> f64 {
    price as f64 / PRICE_SCALE as f64
}

/// Convert dollars to a fixed-point price.
pub fn price_from_f64(price: f64) -> Price {
    (price * PRICE_SCALE as f64) as Price
}

// ---------------------------------------------------------------------------
// Big-endian readers
// ---------------------------------------------------------------------------

/// Read a big-endian u16 at `at`. Byte-wise, no alignment assumption.
#[inline(always)]
pub fn be_u16(buf: &[u8], at: usize) -> u16 {
    BigEndian::read_u16(&buf[at..at + 2])
}

/// Read a big-endian u32 at `at`.
#[inline(always)]
pub fn be_u32(buf: &[u8], at: usize) -> u32 {
    BigEndian::read_u32(&buf[at..at + 4])
}

/// Read a 6-byte big-endian integer at `at`, zero-extended to 64 bits.
/// ITCH timestamps are 48-bit nanoseconds since midnight.
#[inline(always)]
pub fn be_u48(buf: &[u8], at: usize) -> u64 {
    BigEndian::read_uint(&buf[at..at + 6], 6)
}

/// Read a big-endian u64 at `at`.
#[inline(always)]
pub fn be_u64(buf: &[u8], at: usize) -> u64 {
    BigEndian::read_u64(&buf[at..at + 8])
}

// ---------------------------------------------------------------------------
// Side
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Side {
    Buy = b'B',
    Sell = b'S',
}

impl Side {
    /// ITCH buy/sell indicator. Anything other than 'S' is treated as a
    /// buy; the feed never carries other values for displayable orders.
    #[inline]
    pub fn from_wire(b: u8) -> Self {
        if b == b'S' {
            Side::Sell
        } else {
            Side::Buy
        }
    }

    #[inline]
    pub fn is_buy(self) -> bool {
        self == Side::Buy
    }
}

// ---------------------------------------------------------------------------
// Symbol
// ---------------------------------------------------------------------------

/// 8-byte space-padded ASCII stock symbol, compared as raw bytes.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Symbol(pub [u8; 8]);

impl Symbol {
    /// Build from an unpadded name, e.g. `Symbol::new(b"AAPL")`.
    pub fn new(name: &[u8]) -> Self {
        let mut data = [b' '; 8];
        let n = name.len().min(8);
        data[..n].copy_from_slice(&name[..n]);
        Symbol(data)
    }

    pub fn as_bytes(&self) -> &[u8; 8] {
        &self.0
    }

    /// Symbol text with trailing padding removed.
    pub fn trimmed(&self) -> &str {
        std::str::from_utf8(&self.0)
            .unwrap_or("")
            .trim_end_matches(' ')
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({:?})", self.trimmed())
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.trimmed())
    }
}

#[inline]
fn symbol_at(buf: &[u8], at: usize) -> Symbol {
    let mut data = [0u8; 8];
    data.copy_from_slice(&buf[at..at + 8]);
    Symbol(data)
}

// ---------------------------------------------------------------------------
// Message catalogue
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MessageType {
    SystemEvent = b'S',
    StockDirectory = b'R',
    StockTradingAction = b'H',
    RegShoRestriction = b'Y',
    MarketParticipantPos = b'L',
    MwcbDeclineLevel = b'V',
    MwcbStatus = b'W',
    IpoQuotingPeriod = b'K',
    LuldAuctionCollar = b'J',
    OperationalHalt = b'h',
    AddOrder = b'A',
    AddOrderMpid = b'F',
    OrderExecuted = b'E',
    OrderExecutedPrice = b'C',
    OrderCancel = b'X',
    OrderDelete = b'D',
    OrderReplace = b'U',
    Trade = b'P',
    CrossTrade = b'Q',
    BrokenTrade = b'B',
    Noii = b'I',
    Rpii = b'N',
}

impl MessageType {
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            b'S' => Some(MessageType::SystemEvent),
            b'R' => Some(MessageType::StockDirectory),
            b'H' => Some(MessageType::StockTradingAction),
            b'Y' => Some(MessageType::RegShoRestriction),
            b'L' => Some(MessageType::MarketParticipantPos),
            b'V' => Some(MessageType::MwcbDeclineLevel),
            b'W' => Some(MessageType::MwcbStatus),
            b'K' => Some(MessageType::IpoQuotingPeriod),
            b'J' => Some(MessageType::LuldAuctionCollar),
            b'h' => Some(MessageType::OperationalHalt),
            b'A' => Some(MessageType::AddOrder),
            b'F' => Some(MessageType::AddOrderMpid),
            b'E' => Some(MessageType::OrderExecuted),
            b'C' => Some(MessageType::OrderExecutedPrice),
            b'X' => Some(MessageType::OrderCancel),
            b'D' => Some(MessageType::OrderDelete),
            b'U' => Some(MessageType::OrderReplace),
            b'P' => Some(MessageType::Trade),
            b'Q' => Some(MessageType::CrossTrade),
            b'B' => Some(MessageType::BrokenTrade),
            b'I' => Some(MessageType::Noii),
            b'N' => Some(MessageType::Rpii),
            _ => None,
        }
    }
}

/// Fixed on-wire size for a type tag, or 0 for any byte outside the
/// ITCH 5.0 message set.
#[inline]
pub fn message_size(tag: u8) -> usize {
    match tag {
        b'S' => SystemEvent::SIZE,
        b'R' => StockDirectory::SIZE,
        b'H' => StockTradingAction::SIZE,
        b'Y' => RegShoRestriction::SIZE,
        b'L' => MarketParticipantPos::SIZE,
        b'V' => MwcbDeclineLevel::SIZE,
        b'W' => MwcbStatus::SIZE,
        b'K' => IpoQuotingPeriod::SIZE,
        b'J' => LuldAuctionCollar::SIZE,
        b'h' => OperationalHalt::SIZE,
        b'A' => AddOrder::SIZE,
        b'F' => AddOrderMpid::SIZE,
        b'E' => OrderExecuted::SIZE,
        b'C' => OrderExecutedPrice::SIZE,
        b'X' => OrderCancel::SIZE,
        b'D' => OrderDelete::SIZE,
        b'U' => OrderReplace::SIZE,
        b'P' => Trade::SIZE,
        b'Q' => CrossTrade::SIZE,
        b'B' => BrokenTrade::SIZE,
        b'I' => Noii::SIZE,
        b'N' => Rpii::SIZE,
        _ => 0,
    }
}

// ---------------------------------------------------------------------------
// Zero-copy message views
// ---------------------------------------------------------------------------

// Every view wraps a verified-length byte slice; the decoder checks the
// buffer against SIZE before constructing one. The common prefix ends at
// byte 11: tag(1) locate(2) tracking(2) timestamp(6).

macro_rules! message_view {
    ($(#[$meta:meta])* $name:ident, $tag:literal, $size:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy)]
        pub struct $name<'a>(&'a [u8]);

        impl<'a> $name<'a> {
            pub const TAG: u8 = $tag;
            pub const SIZE: usize = $size;

            #[inline]
            pub fn new(buf: &'a [u8]) -> Self {
                debug_assert!(buf.len() >= Self::SIZE);
                debug_assert_eq!(buf[0], Self::TAG);
                Self(buf)
            }

            /// The message bytes, exactly `SIZE` long.
            #[inline]
            pub fn raw(&self) -> &'a [u8] {
                &self.0[..Self::SIZE]
            }

            #[inline]
            pub fn stock_locate(&self) -> StockLocate {
                be_u16(self.0, 1)
            }

            #[inline]
            pub fn tracking_number(&self) -> u16 {
                be_u16(self.0, 3)
            }

            #[inline]
            pub fn timestamp(&self) -> Timestamp {
                be_u48(self.0, 5)
            }
        }
    };
}

message_view!(
    /// System Event ('S'): market-wide session transitions.
    SystemEvent,
    b'S',
    12
);

impl<'a> SystemEvent<'a> {
    pub const EVENT_START_OF_MESSAGES: u8 = b'O';
    pub const EVENT_START_SYSTEM_HOURS: u8 = b'S';
    pub const EVENT_START_MARKET_HOURS: u8 = b'Q';
    pub const EVENT_END_MARKET_HOURS: u8 = b'M';
    pub const EVENT_END_SYSTEM_HOURS: u8 = b'E';
    pub const EVENT_END_OF_MESSAGES: u8 = b'C';

    #[inline]
    pub fn event_code(&self) -> u8 {
        self.0[11]
    }
}

message_view!(
    /// Stock Directory ('R'): per-security reference data.
    StockDirectory,
    b'R',
    39
);

impl<'a> StockDirectory<'a> {
    #[inline]
    pub fn stock(&self) -> Symbol {
        symbol_at(self.0, 11)
    }

    #[inline]
    pub fn market_category(&self) -> u8 {
        self.0[19]
    }

    #[inline]
    pub fn financial_status(&self) -> u8 {
        self.0[20]
    }

    #[inline]
    pub fn round_lot_size(&self) -> u32 {
        be_u32(self.0, 21)
    }

    #[inline]
    pub fn round_lots_only(&self) -> u8 {
        self.0[25]
    }

    #[inline]
    pub fn issue_classification(&self) -> u8 {
        self.0[26]
    }

    #[inline]
    pub fn issue_subtype(&self) -> [u8; 2] {
        [self.0[27], self.0[28]]
    }

    #[inline]
    pub fn authenticity(&self) -> u8 {
        self.0[29]
    }

    #[inline]
    pub fn short_sale_threshold(&self) -> u8 {
        self.0[30]
    }

    #[inline]
    pub fn ipo_flag(&self) -> u8 {
        self.0[31]
    }

    #[inline]
    pub fn luld_ref_price_tier(&self) -> u8 {
        self.0[32]
    }

    #[inline]
    pub fn etp_flag(&self) -> u8 {
        self.0[33]
    }

    #[inline]
    pub fn etp_leverage_factor(&self) -> u32 {
        be_u32(self.0, 34)
    }

    #[inline]
    pub fn inverse_indicator(&self) -> u8 {
        self.0[38]
    }
}

message_view!(
    /// Stock Trading Action ('H'): trading state for one security.
    StockTradingAction,
    b'H',
    25
);

impl<'a> StockTradingAction<'a> {
    pub const STATE_HALTED: u8 = b'H';
    pub const STATE_PAUSED: u8 = b'P';
    pub const STATE_QUOTATION_ONLY: u8 = b'Q';
    pub const STATE_TRADING: u8 = b'T';

    #[inline]
    pub fn stock(&self) -> Symbol {
        symbol_at(self.0, 11)
    }

    #[inline]
    pub fn trading_state(&self) -> u8 {
        self.0[19]
    }

    #[inline]
    pub fn reason(&self) -> [u8; 4] {
        [self.0[21], self.0[22], self.0[23], self.0[24]]
    }
}

message_view!(
    /// Reg SHO Short Sale Price Test Restriction ('Y').
    RegShoRestriction,
    b'Y',
    20
);

impl<'a> RegShoRestriction<'a> {
    #[inline]
    pub fn stock(&self) -> Symbol {
        symbol_at(self.0, 11)
    }

    #[inline]
    pub fn reg_sho_action(&self) -> u8 {
        self.0[19]
    }
}

message_view!(
    /// Market Participant Position ('L').
    MarketParticipantPos,
    b'L',
    26
);

impl<'a> MarketParticipantPos<'a> {
    #[inline]
    pub fn mpid(&self) -> [u8; 4] {
        [self.0[11], self.0[12], self.0[13], self.0[14]]
    }

    #[inline]
    pub fn stock(&self) -> Symbol {
        symbol_at(self.0, 15)
    }

    #[inline]
    pub fn primary_market_maker(&self) -> u8 {
        self.0[23]
    }

    #[inline]
    pub fn market_maker_mode(&self) -> u8 {
        self.0[24]
    }

    #[inline]
    pub fn market_participant_state(&self) -> u8 {
        self.0[25]
    }
}

message_view!(
    /// MWCB Decline Level ('V'): market-wide circuit breaker thresholds.
    MwcbDeclineLevel,
    b'V',
    35
);

impl<'a> MwcbDeclineLevel<'a> {
    #[inline]
    pub fn level1(&self) -> u64 {
        be_u64(self.0, 11)
    }

    #[inline]
    pub fn level2(&self) -> u64 {
        be_u64(self.0, 19)
    }

    #[inline]
    pub fn level3(&self) -> u64 {
        be_u64(self.0, 27)
    }
}

message_view!(
    /// MWCB Status ('W').
    MwcbStatus,
    b'W',
    12
);

impl<'a> MwcbStatus<'a> {
    #[inline]
    pub fn breached_level(&self) -> u8 {
        self.0[11]
    }
}

message_view!(
    /// IPO Quoting Period Update ('K').
    IpoQuotingPeriod,
    b'K',
    28
);

impl<'a> IpoQuotingPeriod<'a> {
    #[inline]
    pub fn stock(&self) -> Symbol {
        symbol_at(self.0, 11)
    }

    #[inline]
    pub fn release_time(&self) -> u32 {
        be_u32(self.0, 19)
    }

    #[inline]
    pub fn release_qualifier(&self) -> u8 {
        self.0[23]
    }

    #[inline]
    pub fn ipo_price(&self) -> Price {
        be_u32(self.0, 24) as Price
    }
}

message_view!(
    /// LULD Auction Collar ('J').
    LuldAuctionCollar,
    b'J',
    35
);

impl<'a> LuldAuctionCollar<'a> {
    #[inline]
    pub fn stock(&self) -> Symbol {
        symbol_at(self.0, 11)
    }

    #[inline]
    pub fn reference_price(&self) -> Price {
        be_u32(self.0, 19) as Price
    }

    #[inline]
    pub fn upper_collar(&self) -> Price {
        be_u32(self.0, 23) as Price
    }

    #[inline]
    pub fn lower_collar(&self) -> Price {
        be_u32(self.0, 27) as Price
    }

    #[inline]
    pub fn extension(&self) -> u32 {
        be_u32(self.0, 31)
    }
}

message_view!(
    /// Operational Halt ('h').
    OperationalHalt,
    b'h',
    21
);

impl<'a> OperationalHalt<'a> {
    #[inline]
    pub fn stock(&self) -> Symbol {
        symbol_at(self.0, 11)
    }

    #[inline]
    pub fn market_code(&self) -> u8 {
        self.0[19]
    }

    #[inline]
    pub fn halt_action(&self) -> u8 {
        self.0[20]
    }
}

message_view!(
    /// Add Order without MPID attribution ('A').
    AddOrder,
    b'A',
    36
);

impl<'a> AddOrder<'a> {
    #[inline]
    pub fn order_ref(&self) -> OrderId {
        be_u64(self.0, 11)
    }

    #[inline]
    pub fn side(&self) -> Side {
        Side::from_wire(self.0[19])
    }

    #[inline]
    pub fn shares(&self) -> Quantity {
        be_u32(self.0, 20)
    }

    #[inline]
    pub fn stock(&self) -> Symbol {
        symbol_at(self.0, 24)
    }

    #[inline]
    pub fn price(&self) -> Price {
        be_u32(self.0, 32) as Price
    }
}

message_view!(
    /// Add Order with MPID attribution ('F').
    AddOrderMpid,
    b'F',
    40
);

impl<'a> AddOrderMpid<'a> {
    #[inline]
    pub fn order_ref(&self) -> OrderId {
        be_u64(self.0, 11)
    }

    #[inline]
    pub fn side(&self) -> Side {
        Side::from_wire(self.0[19])
    }

    #[inline]
    pub fn shares(&self) -> Quantity {
        be_u32(self.0, 20)
    }

    #[inline]
    pub fn stock(&self) -> Symbol {
        symbol_at(self.0, 24)
    }

    #[inline]
    pub fn price(&self) -> Price {
        be_u32(self.0, 32) as Price
    }

    #[inline]
    pub fn attribution(&self) -> [u8; 4] {
        [self.0[36], self.0[37], self.0[38], self.0[39]]
    }
}

message_view!(
    /// Order Executed ('E'): fill at the resting order's price.
    OrderExecuted,
    b'E',
    31
);

impl<'a> OrderExecuted<'a> {
    #[inline]
    pub fn order_ref(&self) -> OrderId {
        be_u64(self.0, 11)
    }

    #[inline]
    pub fn executed_shares(&self) -> Quantity {
        be_u32(self.0, 19)
    }

    #[inline]
    pub fn match_number(&self) -> u64 {
        be_u64(self.0, 23)
    }
}

message_view!(
    /// Order Executed with Price ('C'): fill at an explicit price.
    OrderExecutedPrice,
    b'C',
    36
);

impl<'a> OrderExecutedPrice<'a> {
    #[inline]
    pub fn order_ref(&self) -> OrderId {
        be_u64(self.0, 11)
    }

    #[inline]
    pub fn executed_shares(&self) -> Quantity {
        be_u32(self.0, 19)
    }

    #[inline]
    pub fn match_number(&self) -> u64 {
        be_u64(self.0, 23)
    }

    #[inline]
    pub fn printable(&self) -> u8 {
        self.0[31]
    }

    #[inline]
    pub fn execution_price(&self) -> Price {
        be_u32(self.0, 32) as Price
    }
}

message_view!(
    /// Order Cancel ('X'): partial cancel, shares removed.
    OrderCancel,
    b'X',
    23
);

impl<'a> OrderCancel<'a> {
    #[inline]
    pub fn order_ref(&self) -> OrderId {
        be_u64(self.0, 11)
    }

    #[inline]
    pub fn cancelled_shares(&self) -> Quantity {
        be_u32(self.0, 19)
    }
}

message_view!(
    /// Order Delete ('D'): full removal regardless of residual quantity.
    OrderDelete,
    b'D',
    19
);

impl<'a> OrderDelete<'a> {
    #[inline]
    pub fn order_ref(&self) -> OrderId {
        be_u64(self.0, 11)
    }
}

message_view!(
    /// Order Replace ('U'): delete old ref, add new ref on the same side.
    OrderReplace,
    b'U',
    35
);

impl<'a> OrderReplace<'a> {
    #[inline]
    pub fn original_order_ref(&self) -> OrderId {
        be_u64(self.0, 11)
    }

    #[inline]
    pub fn new_order_ref(&self) -> OrderId {
        be_u64(self.0, 19)
    }

    #[inline]
    pub fn shares(&self) -> Quantity {
        be_u32(self.0, 27)
    }

    #[inline]
    pub fn price(&self) -> Price {
        be_u32(self.0, 31) as Price
    }
}

message_view!(
    /// Trade, non-cross ('P'): execution against a non-displayed order.
    Trade,
    b'P',
    44
);

impl<'a> Trade<'a> {
    #[inline]
    pub fn order_ref(&self) -> OrderId {
        be_u64(self.0, 11)
    }

    #[inline]
    pub fn side(&self) -> Side {
        Side::from_wire(self.0[19])
    }

    #[inline]
    pub fn shares(&self) -> Quantity {
        be_u32(self.0, 20)
    }

    #[inline]
    pub fn stock(&self) -> Symbol {
        symbol_at(self.0, 24)
    }

    #[inline]
    pub fn price(&self) -> Price {
        be_u32(self.0, 32) as Price
    }

    #[inline]
    pub fn match_number(&self) -> u64 {
        be_u64(self.0, 36)
    }
}

message_view!(
    /// Cross Trade ('Q'): auction cross execution. Carries no side.
    CrossTrade,
    b'Q',
    40
);

impl<'a> CrossTrade<'a> {
    #[inline]
    pub fn shares(&self) -> u64 {
        be_u64(self.0, 11)
    }

    #[inline]
    pub fn stock(&self) -> Symbol {
        symbol_at(self.0, 19)
    }

    #[inline]
    pub fn cross_price(&self) -> Price {
        be_u32(self.0, 27) as Price
    }

    #[inline]
    pub fn match_number(&self) -> u64 {
        be_u64(self.0, 31)
    }

    #[inline]
    pub fn cross_type(&self) -> u8 {
        self.0[39]
    }
}

message_view!(
    /// Broken Trade ('B'): a previously reported match was voided.
    BrokenTrade,
    b'B',
    19
);

impl<'a> BrokenTrade<'a> {
    #[inline]
    pub fn match_number(&self) -> u64 {
        be_u64(self.0, 11)
    }
}

message_view!(
    /// Net Order Imbalance Indicator ('I').
    Noii,
    b'I',
    50
);

impl<'a> Noii<'a> {
    #[inline]
    pub fn paired_shares(&self) -> u64 {
        be_u64(self.0, 11)
    }

    #[inline]
    pub fn imbalance_shares(&self) -> u64 {
        be_u64(self.0, 19)
    }

    #[inline]
    pub fn imbalance_direction(&self) -> u8 {
        self.0[27]
    }

    #[inline]
    pub fn stock(&self) -> Symbol {
        symbol_at(self.0, 28)
    }

    #[inline]
    pub fn far_price(&self) -> Price {
        be_u32(self.0, 36) as Price
    }

    #[inline]
    pub fn near_price(&self) -> Price {
        be_u32(self.0, 40) as Price
    }

    #[inline]
    pub fn reference_price(&self) -> Price {
        be_u32(self.0, 44) as Price
    }

    #[inline]
    pub fn cross_type(&self) -> u8 {
        self.0[48]
    }

    #[inline]
    pub fn price_variation_indicator(&self) -> u8 {
        self.0[49]
    }
}

message_view!(
    /// Retail Price Improvement Indicator ('N').
    Rpii,
    b'N',
    20
);

impl<'a> Rpii<'a> {
    #[inline]
    pub fn stock(&self) -> Symbol {
        symbol_at(self.0, 11)
    }

    #[inline]
    pub fn interest_flag(&self) -> u8 {
        self.0[19]
    }
}

// ---------------------------------------------------------------------------
// MoldUDP64 outer framing
// ---------------------------------------------------------------------------

pub const MOLDUDP64_HEADER_SIZE: usize = 20;

/// MoldUDP64 packet header: `session:char[10]`, `sequence:u64`,
/// `message_count:u16`. The payload that follows is `message_count`
/// records of `(length:u16, message:length bytes)`.
#[derive(Clone, Copy)]
pub struct MoldUdp64Header<'a>(&'a [u8]);

impl<'a> MoldUdp64Header<'a> {
    pub fn parse(buf: &'a [u8]) -> Option<Self> {
        if buf.len() < MOLDUDP64_HEADER_SIZE {
            return None;
        }
        Some(Self(buf))
    }

    #[inline]
    pub fn session(&self) -> &'a [u8] {
        &self.0[..10]
    }

    #[inline]
    pub fn sequence(&self) -> u64 {
        be_u64(self.0, 10)
    }

    #[inline]
    pub fn message_count(&self) -> u16 {
        be_u16(self.0, 18)
    }
}
