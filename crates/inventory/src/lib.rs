//! Inventory domain: stock items, derived stock status and the movement ledger.
//!
//! Every mutation is a pure function from a snapshot to a [`StockOutcome`]:
//! the next snapshot, the ledger entry to append and the alert to publish.

pub mod events;
pub mod item;
pub mod movement;

pub use events::LowStockEvent;
pub use item::{NewStockItem, StockItem, StockKey, StockOutcome, StockStatus};
pub use movement::{MovementType, StockMovement};
