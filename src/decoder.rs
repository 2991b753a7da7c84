//! Zero-copy ITCH 5.0 stream decoder.
//!
//! The decoder walks a raw byte stream message by message, validates
//! lengths against the fixed size table, and hands typed views straight
//! into the handler's callbacks. Message bodies are never copied; every
//! field read goes through the view into the caller's buffer.
//!
//! Short reads are recoverable: `parse_message` returns 0 and the
//! caller refills and retries. An unknown type tag advances a single
//! byte so a raw concatenation resyncs instead of stalling; on a real
//! wire the MoldUDP64 framing delimits messages.

use crate::protocol::*;

/// Typed callbacks for every ITCH 5.0 message variant. All methods have
/// empty defaults, so a handler implements only what it consumes.
/// Callbacks run inline during parsing; the extracted 48-bit timestamp
/// is passed alongside each view.
pub trait MessageHandler {
    fn on_system_event(&mut self, _msg: SystemEvent<'_>, _ts: Timestamp) {}
    fn on_stock_directory(&mut self, _msg: StockDirectory<'_>, _ts: Timestamp) {}
    fn on_stock_trading_action(&mut self, _msg: StockTradingAction<'_>, _ts: Timestamp) {}
    fn on_reg_sho_restriction(&mut self, _msg: RegShoRestriction<'_>, _ts: Timestamp) {}
    fn on_market_participant_pos(&mut self, _msg: MarketParticipantPos<'_>, _ts: Timestamp) {}
    fn on_mwcb_decline_level(&mut self, _msg: MwcbDeclineLevel<'_>, _ts: Timestamp) {}
    fn on_mwcb_status(&mut self, _msg: MwcbStatus<'_>, _ts: Timestamp) {}
    fn on_ipo_quoting_period(&mut self, _msg: IpoQuotingPeriod<'_>, _ts: Timestamp) {}
    fn on_luld_auction_collar(&mut self, _msg: LuldAuctionCollar<'_>, _ts: Timestamp) {}
    fn on_operational_halt(&mut self, _msg: OperationalHalt<'_>, _ts: Timestamp) {}
    fn on_add_order(&mut self, _msg: AddOrder<'_>, _ts: Timestamp) {}
    fn on_add_order_mpid(&mut self, _msg: AddOrderMpid<'_>, _ts: Timestamp) {}
    fn on_order_executed(&mut self, _msg: OrderExecuted<'_>, _ts: Timestamp) {}
    fn on_order_executed_price(&mut self, _msg: OrderExecutedPrice<'_>, _ts: Timestamp) {}
    fn on_order_cancel(&mut self, _msg: OrderCancel<'_>, _ts: Timestamp) {}
    fn on_order_delete(&mut self, _msg: OrderDelete<'_>, _ts: Timestamp) {}
    fn on_order_replace(&mut self, _msg: OrderReplace<'_>, _ts: Timestamp) {}
    fn on_trade(&mut self, _msg: Trade<'_>, _ts: Timestamp) {}
    fn on_cross_trade(&mut self, _msg: CrossTrade<'_>, _ts: Timestamp) {}
    fn on_broken_trade(&mut self, _msg: BrokenTrade<'_>, _ts: Timestamp) {}
    fn on_noii(&mut self, _msg: Noii<'_>, _ts: Timestamp) {}
    fn on_rpii(&mut self, _msg: Rpii<'_>, _ts: Timestamp) {}

    fn on_parse_error(&mut self, _bytes: &[u8], _reason: &str) {}
}

/// Decode counters. `message_type_counts` is indexed by the raw tag
/// byte.
#[derive(Clone)]
pub struct DecoderStats {
    pub messages_parsed: u64,
    pub bytes_processed: u64,
    pub parse_errors: u64,
    pub message_type_counts: [u64; 256],
}

impl Default for DecoderStats {
    fn default() -> Self {
        DecoderStats {
            messages_parsed: 0,
            bytes_processed: 0,
            parse_errors: 0,
            message_type_counts: [0; 256],
        }
    }
}

impl DecoderStats {
    pub fn reset(&mut self) {
        *self = DecoderStats::default();
    }

    pub fn count_for(&self, tag: u8) -> u64 {
        self.message_type_counts[tag as usize]
    }
}

/// Stream decoder. Holds only counters; all message state lives in the
/// caller's buffer for the duration of the dispatch.
#[derive(Default)]
pub struct Decoder {
    stats: DecoderStats,
}

impl Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> &DecoderStats {
        &self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats.reset();
    }

    /// Decode at most one message from the front of `buf`.
    ///
    /// Returns the bytes consumed: the message size on success, 1 on an
    /// unknown type tag (resync by one byte), or 0 when the buffer is
    /// empty or too short for the tagged message (refill and retry).
    pub fn parse_message<H: MessageHandler>(&mut self, handler: &mut H, buf: &[u8]) -> usize {
        if buf.is_empty() {
            return 0;
        }

        let tag = buf[0];
        let size = message_size(tag);

        if size == 0 {
            self.stats.parse_errors += 1;
            tracing::warn!(tag, "unknown message type");
            handler.on_parse_error(&buf[..1], "unknown type");
            return 1;
        }

        if buf.len() < size {
            return 0;
        }

        let ts = be_u48(buf, 5);
        self.dispatch(handler, tag, buf, ts);

        self.stats.messages_parsed += 1;
        self.stats.bytes_processed += size as u64;
        self.stats.message_type_counts[tag as usize] += 1;

        size
    }

    /// Decode messages until the buffer runs dry. Returns the bytes
    /// consumed; the unconsumed tail is the start of a partial message.
    pub fn parse<H: MessageHandler>(&mut self, handler: &mut H, buf: &[u8]) -> usize {
        let mut offset = 0;
        while offset < buf.len() {
            let consumed = self.parse_message(handler, &buf[offset..]);
            if consumed == 0 {
                break;
            }
            offset += consumed;
        }
        offset
    }

    /// Unwrap one MoldUDP64 packet: a 20-byte header followed by
    /// `message_count` length-prefixed messages. Returns the number of
    /// messages decoded; a length that overruns the packet stops
    /// processing there.
    pub fn parse_moldudp64<H: MessageHandler>(&mut self, handler: &mut H, buf: &[u8]) -> usize {
        let Some(header) = MoldUdp64Header::parse(buf) else {
            return 0;
        };

        let mut offset = MOLDUDP64_HEADER_SIZE;
        let mut decoded = 0;
        for _ in 0..header.message_count() {
            if offset + 2 > buf.len() {
                break;
            }
            let length = be_u16(buf, offset) as usize;
            offset += 2;
            if offset + length > buf.len() {
                break;
            }
            if self.parse_message(handler, &buf[offset..offset + length]) > 0 {
                decoded += 1;
            }
            offset += length;
        }
        decoded
    }

    #[inline]
    fn dispatch<H: MessageHandler>(&mut self, handler: &mut H, tag: u8, buf: &[u8], ts: Timestamp) {
        match tag {
            b'A' => handler.on_add_order(AddOrder::new(buf), ts),
            b'F' => handler.on_add_order_mpid(AddOrderMpid::new(buf), ts),
            b'E' => handler.on_order_executed(OrderExecuted::new(buf), ts),
            b'C' => handler.on_order_executed_price(OrderExecutedPrice::new(buf), ts),
            b'X' => handler.on_order_cancel(OrderCancel::new(buf), ts),
            b'D' => handler.on_order_delete(OrderDelete::new(buf), ts),
            b'U' => handler.on_order_replace(OrderReplace::new(buf), ts),
            b'P' => handler.on_trade(Trade::new(buf), ts),
            b'Q' => handler.on_cross_trade(CrossTrade::new(buf), ts),
            b'B' => handler.on_broken_trade(BrokenTrade::new(buf), ts),
            b'S' => handler.on_system_event(SystemEvent::new(buf), ts),
            b'R' => handler.on_stock_directory(StockDirectory::new(buf), ts),
            b'H' => handler.on_stock_trading_action(StockTradingAction::new(buf), ts),
            b'Y' => handler.on_reg_sho_restriction(RegShoRestriction::new(buf), ts),
            b'L' => handler.on_market_participant_pos(MarketParticipantPos::new(buf), ts),
            b'V' => handler.on_mwcb_decline_level(MwcbDeclineLevel::new(buf), ts),
            b'W' => handler.on_mwcb_status(MwcbStatus::new(buf), ts),
            b'K' => handler.on_ipo_quoting_period(IpoQuotingPeriod::new(buf), ts),
            b'J' => handler.on_luld_auction_collar(LuldAuctionCollar::new(buf), ts),
            b'h' => handler.on_operational_halt(OperationalHalt::new(buf), ts),
            b'I' => handler.on_noii(Noii::new(buf), ts),
            b'N' => handler.on_rpii(Rpii::new(buf), ts),
            // message_size() returned non-zero, so the tag is known.
            _ => unreachable!("dispatch on unknown tag {tag}"),
        }
    }
}
