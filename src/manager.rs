//! Multi-symbol book management.
//!
//! Books are looked up by the 16-bit stock locate through a flat array,
//! created lazily on first reference. One order pool is shared by every
//! book; access is single-threaded, so the pool needs no locking.

use crate::book::OrderBook;
use crate::pool::OrderPool;
use crate::protocol::StockLocate;

/// Initial size of the locate-indexed table. ITCH locates are 16-bit
/// but stay well under this in practice; the table grows if one
/// exceeds it.
pub const INITIAL_BOOKS: usize = 8192;

pub struct BookManager {
    books: Vec<Option<OrderBook>>,
    pool: OrderPool,
}

impl BookManager {
    pub fn new() -> Self {
        let mut books = Vec::new();
        books.resize_with(INITIAL_BOOKS, || None);
        BookManager {
            books,
            pool: OrderPool::new(),
        }
    }

    /// The book for `locate`, created on first use.
    pub fn get_book(&mut self, locate: StockLocate) -> &mut OrderBook {
        let idx = locate as usize;
        if idx >= self.books.len() {
            self.books.resize_with(idx + 1, || None);
        }
        self.books[idx].get_or_insert_with(|| OrderBook::new(locate))
    }

    /// The book together with the shared pool, so mutations can borrow
    /// both at once.
    pub fn book_and_pool(&mut self, locate: StockLocate) -> (&mut OrderBook, &mut OrderPool) {
        let idx = locate as usize;
        if idx >= self.books.len() {
            self.books.resize_with(idx + 1, || None);
        }
        let book = self.books[idx].get_or_insert_with(|| OrderBook::new(locate));
        (book, &mut self.pool)
    }

    pub fn has_book(&self, locate: StockLocate) -> bool {
        self.books
            .get(locate as usize)
            .map_or(false, |slot| slot.is_some())
    }

    /// Read-only access without lazily creating the book.
    pub fn book(&self, locate: StockLocate) -> Option<&OrderBook> {
        self.books.get(locate as usize).and_then(|slot| slot.as_ref())
    }

    pub fn order_pool(&self) -> &OrderPool {
        &self.pool
    }

    pub fn order_pool_mut(&mut self) -> &mut OrderPool {
        &mut self.pool
    }

    /// Resting orders across all books.
    pub fn total_order_count(&self) -> usize {
        self.books
            .iter()
            .flatten()
            .map(|book| book.order_count())
            .sum()
    }

    /// Clear every book, returning all records to the pool.
    pub fn clear(&mut self) {
        for slot in &mut self.books {
            if let Some(book) = slot {
                book.clear(&mut self.pool);
            }
        }
    }
}

impl Default for BookManager {
    fn default() -> Self {
        Self::new()
    }
}
