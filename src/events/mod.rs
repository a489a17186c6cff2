//! Event publishing for downstream real-time consumers.
//!
//! The core publishes a typed event for every state change; the realtime
//! gateway and reporting collaborators subscribe downstream. Publishing is
//! fire-and-forget: a failed send is logged and never fails the state
//! mutation that produced it.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};

// Define the various events that can occur in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Stock request events
    StockRequestCreated {
        request_id: String,
        request_number: String,
        branch: String,
    },
    StockRequestUpdated {
        request_id: String,
    },
    StockRequestAdvanced {
        request_id: String,
        old_status: String,
        new_status: String,
        role: String,
        approved: bool,
    },

    // Transfer events
    TransferCreated {
        transfer_id: String,
        request_id: Option<String>,
    },
    TransferDispatched {
        transfer_id: String,
        dispatch_note_id: String,
        barcode: String,
    },
    TransferDelivered {
        transfer_id: String,
    },
    TransferReceived {
        transfer_id: String,
    },
    TransferCancelled {
        transfer_id: String,
    },
    DispatchNoteReceived {
        note_id: String,
        transfer_id: String,
    },

    // Warehouse / ledger events
    InventoryAdjusted {
        location: String,
        product_id: String,
        old_quantity: i32,
        new_quantity: i32,
        reason: String,
    },
    InventoryReserved {
        location: String,
        product_id: String,
        quantity: i32,
    },
    InventoryReleased {
        location: String,
        product_id: String,
        quantity: i32,
    },
    BatchImported {
        batch_id: String,
        barcode: String,
        product_id: String,
        location: String,
    },
    BatchExhausted {
        batch_id: String,
        barcode: String,
    },
    BatchRemoved {
        batch_id: String,
        barcode: String,
    },
}

impl Event {
    /// Resource bucket as seen by the realtime gateway.
    pub fn resource(&self) -> &'static str {
        match self {
            Event::StockRequestCreated { .. }
            | Event::StockRequestUpdated { .. }
            | Event::StockRequestAdvanced { .. } => "stock_requests",
            Event::TransferCreated { .. }
            | Event::TransferDispatched { .. }
            | Event::TransferDelivered { .. }
            | Event::TransferReceived { .. }
            | Event::TransferCancelled { .. }
            | Event::DispatchNoteReceived { .. } => "stock_transfers",
            Event::InventoryAdjusted { .. }
            | Event::InventoryReserved { .. }
            | Event::InventoryReleased { .. }
            | Event::BatchImported { .. }
            | Event::BatchExhausted { .. }
            | Event::BatchRemoved { .. } => "warehouse",
        }
    }

    pub fn action(&self) -> &'static str {
        match self {
            Event::StockRequestCreated { .. }
            | Event::TransferCreated { .. }
            | Event::BatchImported { .. } => "create",
            Event::BatchRemoved { .. } => "delete",
            _ => "update",
        }
    }
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event, surfacing the failure to the caller.
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Best-effort publish. Failure to publish must never fail the state
    /// mutation that produced the event, so errors are logged and dropped.
    pub async fn publish(&self, event: Event) {
        let resource = event.resource();
        let action = event.action();
        if let Err(e) = self.send(event).await {
            warn!(resource, action, error = %e, "Dropping unpublishable event");
        }
    }
}

/// Drains the event channel, fanning events out to the realtime gateway.
/// Runs for the lifetime of the process; exits when all senders are dropped.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        let payload = match serde_json::to_value(&event) {
            Ok(value) => value,
            Err(e) => {
                warn!(error = %e, "Failed to serialize event payload");
                continue;
            }
        };
        info!(
            resource = event.resource(),
            action = event.action(),
            payload = %payload,
            "Publishing event"
        );
    }

    info!("Event processing loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_map_to_gateway_resources() {
        let event = Event::StockRequestCreated {
            request_id: "REQ-1".into(),
            request_number: "SRQ-TOWNSHOP-20250101-AB12C".into(),
            branch: "townshop".into(),
        };
        assert_eq!(event.resource(), "stock_requests");
        assert_eq!(event.action(), "create");

        let event = Event::TransferReceived {
            transfer_id: "TRF-1".into(),
        };
        assert_eq!(event.resource(), "stock_transfers");
        assert_eq!(event.action(), "update");

        let event = Event::BatchRemoved {
            batch_id: "BATCH-1".into(),
            barcode: "BC-X".into(),
        };
        assert_eq!(event.resource(), "warehouse");
        assert_eq!(event.action(), "delete");
    }

    #[tokio::test]
    async fn publish_is_best_effort_when_receiver_is_gone() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let sender = EventSender::new(tx);
        // Must not panic or error out.
        sender
            .publish(Event::TransferDelivered {
                transfer_id: "TRF-1".into(),
            })
            .await;
    }
}
