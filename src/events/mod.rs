use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::warn;

/// Domain events published by the coupon engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    /// A coupon passed validation for a (possibly anonymous) user.
    CouponValidated {
        coupon_id: i32,
        user_id: Option<i32>,
    },
    /// A validation or application attempt was rejected.
    CouponRejected {
        code: String,
        user_id: Option<i32>,
        reason: String,
    },
    /// A coupon was applied to an order and a redemption recorded.
    CouponApplied {
        coupon_id: i32,
        redemption_id: i32,
        user_id: i32,
        order_id: String,
    },
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Sends an event, logging instead of failing when the channel is
    /// closed or full. Event delivery must never fail a coupon operation.
    pub async fn send_or_log(&self, event: Event) {
        if let Err(err) = self.send(event).await {
            warn!("Failed to publish event: {}", err);
        }
    }
}

/// Creates a bounded event channel and its sender half.
pub fn event_channel(buffer: usize) -> (EventSender, mpsc::Receiver<Event>) {
    let (tx, rx) = mpsc::channel(buffer);
    (EventSender::new(tx), rx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn events_round_trip_through_channel() {
        let (sender, mut rx) = event_channel(4);
        sender
            .send(Event::CouponValidated {
                coupon_id: 1,
                user_id: None,
            })
            .await
            .expect("send failed");

        match rx.recv().await {
            Some(Event::CouponValidated { coupon_id, .. }) => assert_eq!(coupon_id, 1),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn send_or_log_swallows_closed_channel() {
        let (sender, rx) = event_channel(1);
        drop(rx);
        // Must not panic or return an error.
        sender
            .send_or_log(Event::CouponRejected {
                code: "GONE".to_string(),
                user_id: None,
                reason: "closed".to_string(),
            })
            .await;
    }
}
