//! Change notifications for the stored collections.
//!
//! Every successful write publishes a [RowChangeEvent] that carries the full
//! row. Subscribers pick the collection and kinds of change they care about
//! and receive the matching events in publication order.
//!
//! Delivery is at-most-once: events published while nobody is subscribed are
//! dropped, and a subscriber that falls more than [CHANNEL_CAPACITY] events
//! behind skips the events it missed.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::broadcast::{self, error::RecvError};

use crate::{ledger::LedgerEntry, member::Member};

/// How many events the channel buffers for slow subscribers.
pub const CHANNEL_CAPACITY: usize = 256;

/// A stored collection that publishes change notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    /// The `member` table.
    Members,
    /// The `bounty` ledger table.
    Ledger,
}

/// The kind of write that produced an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    /// A row was inserted.
    Insert,
    /// A row was updated.
    Update,
    /// A row was deleted.
    Delete,
}

/// The row affected by a change. For deletes this is the row as it was
/// before it was removed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ChangedRow {
    /// A member row.
    Member(Member),
    /// A ledger row.
    LedgerEntry(LedgerEntry),
}

impl ChangedRow {
    /// The collection the row belongs to.
    pub fn collection(&self) -> Collection {
        match self {
            ChangedRow::Member(_) => Collection::Members,
            ChangedRow::LedgerEntry(_) => Collection::Ledger,
        }
    }
}

/// A change to a single row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowChangeEvent {
    /// What happened to the row.
    pub kind: ChangeKind,
    /// The full row.
    pub row: ChangedRow,
}

impl RowChangeEvent {
    /// Create an event for an inserted row.
    pub fn insert(row: ChangedRow) -> Self {
        Self {
            kind: ChangeKind::Insert,
            row,
        }
    }

    /// Create an event for an updated row.
    pub fn update(row: ChangedRow) -> Self {
        Self {
            kind: ChangeKind::Update,
            row,
        }
    }

    /// Create an event for a deleted row.
    pub fn delete(row: ChangedRow) -> Self {
        Self {
            kind: ChangeKind::Delete,
            row,
        }
    }

    /// The collection the changed row belongs to.
    pub fn collection(&self) -> Collection {
        self.row.collection()
    }
}

/// Publishes row changes to any number of subscribers.
///
/// Cloning the notifier is cheap; all clones share the same channel.
#[derive(Debug, Clone)]
pub struct ChangeNotifier {
    sender: broadcast::Sender<Arc<RowChangeEvent>>,
}

impl ChangeNotifier {
    /// Create a notifier with room for [CHANNEL_CAPACITY] buffered events.
    pub fn new() -> Self {
        Self::with_capacity(CHANNEL_CAPACITY)
    }

    /// Create a notifier with a custom buffer size.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Send `event` to every current subscriber.
    pub fn publish(&self, event: RowChangeEvent) {
        let collection = event.collection();
        let kind = event.kind;

        // An error only means there are no subscribers right now.
        if self.sender.send(Arc::new(event)).is_err() {
            tracing::debug!("No subscribers for {kind:?} on {collection:?}");
        }
    }

    /// Subscribe to the changes of `kinds` on `collection`.
    ///
    /// Only events published after this call are delivered.
    pub fn subscribe(&self, collection: Collection, kinds: &[ChangeKind]) -> Subscription {
        Subscription {
            receiver: self.sender.subscribe(),
            collection,
            kinds: kinds.to_vec(),
            missed: 0,
        }
    }

    /// The number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for ChangeNotifier {
    fn default() -> Self {
        Self::new()
    }
}

/// A stream of change events for one collection.
///
/// Dropping the subscription, or calling [Subscription::unsubscribe], stops
/// delivery.
#[derive(Debug)]
pub struct Subscription {
    receiver: broadcast::Receiver<Arc<RowChangeEvent>>,
    collection: Collection,
    kinds: Vec<ChangeKind>,
    missed: u64,
}

impl Subscription {
    /// Wait for the next matching event.
    ///
    /// Returns `None` once every [ChangeNotifier] has been dropped.
    pub async fn next(&mut self) -> Option<Arc<RowChangeEvent>> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if self.matches(&event) => return Some(event),
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(
                        "Subscriber for {:?} fell behind and missed {skipped} events",
                        self.collection
                    );
                    self.missed += skipped;
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// The number of events skipped because this subscriber fell behind,
    /// since the last call. Resets the count to zero.
    pub fn take_missed(&mut self) -> u64 {
        std::mem::take(&mut self.missed)
    }

    /// Stop receiving events.
    pub fn unsubscribe(self) {}

    /// The collection this subscription listens to.
    pub fn collection(&self) -> Collection {
        self.collection
    }

    fn matches(&self, event: &RowChangeEvent) -> bool {
        event.collection() == self.collection && self.kinds.contains(&event.kind)
    }
}

#[cfg(test)]
mod notifier_tests {
    use crate::{
        ledger::test_utils::sample_entry,
        member::{Member, MemberName},
        notify::{ChangeKind, ChangeNotifier, ChangedRow, Collection, RowChangeEvent},
    };

    fn member(id: i64) -> Member {
        Member {
            id,
            name: MemberName::new_unchecked("Ann"),
            image: None,
            posts_this_month: 0,
            total_posts: 0,
            order: 0,
        }
    }

    #[tokio::test]
    async fn delivers_events_for_subscribed_collection_and_kind() {
        let notifier = ChangeNotifier::new();
        let mut subscription = notifier.subscribe(Collection::Ledger, &[ChangeKind::Insert]);

        notifier.publish(RowChangeEvent::insert(ChangedRow::Member(member(1))));
        notifier.publish(RowChangeEvent::insert(ChangedRow::LedgerEntry(
            sample_entry(7, 100.0),
        )));

        let event = subscription.next().await.expect("expected an event");
        assert_eq!(event.kind, ChangeKind::Insert);
        assert_eq!(event.row, ChangedRow::LedgerEntry(sample_entry(7, 100.0)));
    }

    #[tokio::test]
    async fn filters_out_other_kinds() {
        let notifier = ChangeNotifier::new();
        let mut subscription = notifier.subscribe(Collection::Members, &[ChangeKind::Delete]);

        notifier.publish(RowChangeEvent::update(ChangedRow::Member(member(1))));
        notifier.publish(RowChangeEvent::delete(ChangedRow::Member(member(2))));

        let event = subscription.next().await.unwrap();
        assert_eq!(event.kind, ChangeKind::Delete);
        assert_eq!(event.row, ChangedRow::Member(member(2)));
    }

    #[tokio::test]
    async fn events_before_subscribing_are_not_delivered() {
        let notifier = ChangeNotifier::new();
        notifier.publish(RowChangeEvent::insert(ChangedRow::Member(member(1))));

        let mut subscription = notifier.subscribe(Collection::Members, &[ChangeKind::Insert]);
        notifier.publish(RowChangeEvent::insert(ChangedRow::Member(member(2))));

        let event = subscription.next().await.unwrap();
        assert_eq!(event.row, ChangedRow::Member(member(2)));
    }

    #[tokio::test]
    async fn lagging_subscriber_skips_missed_events() {
        let notifier = ChangeNotifier::with_capacity(2);
        let mut subscription = notifier.subscribe(Collection::Members, &[ChangeKind::Insert]);

        for id in 1..=5 {
            notifier.publish(RowChangeEvent::insert(ChangedRow::Member(member(id))));
        }

        let event = subscription.next().await.unwrap();
        assert_eq!(event.row, ChangedRow::Member(member(4)));
        assert_eq!(subscription.take_missed(), 3);
        assert_eq!(subscription.take_missed(), 0);
    }

    #[tokio::test]
    async fn subscription_ends_when_notifier_is_dropped() {
        let notifier = ChangeNotifier::new();
        let mut subscription = notifier.subscribe(Collection::Members, &[ChangeKind::Insert]);

        drop(notifier);

        assert!(subscription.next().await.is_none());
    }

    #[test]
    fn unsubscribe_removes_receiver() {
        let notifier = ChangeNotifier::new();
        let subscription = notifier.subscribe(Collection::Members, &[ChangeKind::Insert]);
        assert_eq!(notifier.subscriber_count(), 1);

        subscription.unsubscribe();

        assert_eq!(notifier.subscriber_count(), 0);
    }
}
