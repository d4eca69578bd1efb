use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info};
use uuid::Uuid;

/// Domain events emitted after a stock operation commits. Consumers receive
/// them through the channel wired up in `main`; the engine never blocks on
/// downstream processing beyond the channel buffer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    StockInitialized {
        inventory_id: Uuid,
        product_id: Uuid,
        location_id: Uuid,
        quantity: i32,
    },
    StockAdjusted {
        inventory_id: Uuid,
        movement_id: Uuid,
        quantity_change: i32,
        quantity_after: i32,
    },
    StockMovementRecorded {
        movement_id: Uuid,
        inventory_id: Uuid,
        movement_type: String,
        quantity_change: i32,
    },
    StockTransferred {
        product_id: Uuid,
        from_location_id: Uuid,
        to_location_id: Uuid,
        amount: i32,
        reference_id: Uuid,
    },
    LocationCreated(Uuid),
    LocationDeleted(Uuid),
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously.
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }
}

/// Drains the event channel, logging each event. Runs for the lifetime of the
/// process; exits when every sender is dropped.
pub async fn process_events(mut receiver: mpsc::Receiver<Event>) {
    info!("Event processor started");
    while let Some(event) = receiver.recv().await {
        match &event {
            Event::StockTransferred {
                product_id,
                from_location_id,
                to_location_id,
                amount,
                reference_id,
            } => {
                info!(
                    product_id = %product_id,
                    from = %from_location_id,
                    to = %to_location_id,
                    amount = %amount,
                    reference_id = %reference_id,
                    "Stock transferred"
                );
            }
            Event::StockMovementRecorded {
                movement_id,
                movement_type,
                quantity_change,
                ..
            } => {
                info!(
                    movement_id = %movement_id,
                    movement_type = %movement_type,
                    quantity_change = %quantity_change,
                    "Stock movement recorded"
                );
            }
            other => debug!(event = ?other, "Domain event"),
        }
    }
    info!("Event processor stopped");
}
