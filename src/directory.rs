//! Symbol directory built from Stock Directory ('R') messages.
//!
//! Locate-to-symbol lookups go through a flat array; the reverse
//! direction uses a hash map keyed on the raw 8-byte symbol.

use crate::protocol::{StockLocate, Symbol};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy)]
pub struct SymbolInfo {
    pub symbol: Symbol,
    pub market_category: u8,
    pub financial_status: u8,
}

#[derive(Default)]
pub struct SymbolDirectory {
    symbols: Vec<Option<SymbolInfo>>,
    by_symbol: HashMap<Symbol, StockLocate>,
}

impl SymbolDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_symbol(
        &mut self,
        locate: StockLocate,
        symbol: Symbol,
        market_category: u8,
        financial_status: u8,
    ) {
        let idx = locate as usize;
        if idx >= self.symbols.len() {
            self.symbols.resize(idx + 1, None);
        }
        // A locate can be re-announced with a different symbol; drop
        // the stale reverse mapping so the two maps stay inverses.
        if let Some(old) = self.symbols[idx] {
            if old.symbol != symbol {
                self.by_symbol.remove(&old.symbol);
            }
        }
        self.symbols[idx] = Some(SymbolInfo {
            symbol,
            market_category,
            financial_status,
        });
        self.by_symbol.insert(symbol, locate);
        tracing::debug!(locate, symbol = %symbol, "symbol added");
    }

    pub fn get_info(&self, locate: StockLocate) -> Option<&SymbolInfo> {
        self.symbols.get(locate as usize).and_then(|s| s.as_ref())
    }

    pub fn get_locate(&self, symbol: &Symbol) -> Option<StockLocate> {
        self.by_symbol.get(symbol).copied()
    }

    pub fn symbol_count(&self) -> usize {
        self.symbols.iter().flatten().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_lookup() {
        let mut dir = SymbolDirectory::new();
        dir.add_symbol(1, Symbol::new(b"AAPL"), b'Q', b'N');
        dir.add_symbol(2, Symbol::new(b"GOOGL"), b'Q', b'N');
        dir.add_symbol(3, Symbol::new(b"MSFT"), b'Q', b'N');

        assert_eq!(dir.symbol_count(), 3);

        let info = dir.get_info(1).unwrap();
        assert_eq!(info.symbol, Symbol::new(b"AAPL"));
        assert_eq!(info.market_category, b'Q');

        assert_eq!(dir.get_locate(&Symbol::new(b"GOOGL")), Some(2));
        assert_eq!(dir.get_locate(&Symbol::new(b"UNKNOWN")), None);
        assert!(dir.get_info(99).is_none());
    }

    #[test]
    fn test_reannounce_replaces_reverse_mapping() {
        let mut dir = SymbolDirectory::new();
        dir.add_symbol(1, Symbol::new(b"OLD"), b'Q', b'N');
        dir.add_symbol(1, Symbol::new(b"NEW"), b'Q', b'N');

        assert_eq!(dir.symbol_count(), 1);
        assert_eq!(dir.get_locate(&Symbol::new(b"NEW")), Some(1));
        assert_eq!(dir.get_locate(&Symbol::new(b"OLD")), None);
    }
}
