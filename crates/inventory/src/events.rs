use serde::{Deserialize, Serialize};

use destore_core::ProductId;
use destore_events::Event;
use destore_events::topics::{INVENTORY_LOW_STOCK, INVENTORY_OUT_OF_STOCK, sources};

/// Low/out-of-stock alert.
///
/// The event type is always `inventory.low-stock`; out-of-stock alerts are
/// routed under `inventory.out-of-stock` so consumers can bind to either.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LowStockEvent {
    pub product_id: ProductId,
    pub product_sku: String,
    pub product_name: String,
    /// Available (unreserved) quantity.
    pub current_quantity: u32,
    pub threshold: u32,
    pub reorder_quantity: u32,
    pub warehouse_id: Option<String>,
    pub out_of_stock: bool,
}

impl Event for LowStockEvent {
    fn event_type(&self) -> &'static str {
        INVENTORY_LOW_STOCK
    }

    fn routing_key(&self) -> &'static str {
        if self.out_of_stock {
            INVENTORY_OUT_OF_STOCK
        } else {
            INVENTORY_LOW_STOCK
        }
    }

    fn source(&self) -> &'static str {
        sources::INVENTORY
    }
}
