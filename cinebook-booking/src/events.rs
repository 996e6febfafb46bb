use chrono::{DateTime, Utc};
use cinebook_core::SeatKey;
use cinebook_shared::{SeatEvent, SeatEventKind};
use tokio::sync::broadcast;

/// Fan-out of committed seat changes to live seat-map subscribers.
#[derive(Clone)]
pub struct SeatEventPublisher {
    tx: broadcast::Sender<SeatEvent>,
}

impl SeatEventPublisher {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SeatEvent> {
        self.tx.subscribe()
    }

    pub fn publish(&self, keys: &[SeatKey], kind: SeatEventKind, at: DateTime<Utc>) {
        for key in keys {
            // Err only means nobody is listening
            let _ = self.tx.send(SeatEvent::new(
                key.seat_id.get(),
                key.screening_id.get(),
                kind,
                at,
            ));
        }
    }
}

impl Default for SeatEventPublisher {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cinebook_core::{ScreeningId, SeatId};

    #[test]
    fn test_publish_without_subscribers_is_silent() {
        let events = SeatEventPublisher::new(4);
        events.publish(&[SeatKey::new(SeatId(1), ScreeningId(1))], SeatEventKind::Locked, Utc::now());
    }

    #[tokio::test]
    async fn test_subscriber_sees_one_event_per_key() {
        let events = SeatEventPublisher::new(4);
        let mut rx = events.subscribe();
        let keys = [SeatKey::new(SeatId(1), ScreeningId(7)), SeatKey::new(SeatId(2), ScreeningId(7))];

        events.publish(&keys, SeatEventKind::Reserved, Utc::now());

        assert_eq!(rx.recv().await.unwrap().seat_id, 1);
        let second = rx.recv().await.unwrap();
        assert_eq!(second.seat_id, 2);
        assert_eq!(second.kind, SeatEventKind::Reserved);
    }
}
