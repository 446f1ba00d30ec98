//! In-memory read models that follow the change notifications.
//!
//! A [LiveView] subscribes to a collection, loads its initial snapshot from
//! the database and then folds every matching event into the snapshot. The
//! subscription is opened before the snapshot is loaded so that no write can
//! slip between the two; events for rows already in the snapshot are applied
//! idempotently by row id.

use std::sync::{Arc, Mutex, RwLock};

use rusqlite::Connection;
use serde::Serialize;

use crate::{
    Error,
    ledger::{
        LedgerEntry, LedgerEntryId, RECENT_TRANSACTION_LIMIT, get_latest_entry,
        get_recent_transactions,
    },
    member::{Member, get_all_members},
    notify::{ChangeKind, ChangeNotifier, ChangedRow, Collection, RowChangeEvent, Subscription},
};

/// A projection of a collection that can be rebuilt from the database and
/// kept current with change events.
pub trait ReadModel: Clone + Default + Send + Sync + 'static {
    /// The collection the model follows.
    const COLLECTION: Collection;

    /// The kinds of change the model reacts to.
    const KINDS: &'static [ChangeKind];

    /// Build the model from the rows currently in the database.
    fn load(connection: &Connection) -> Result<Self, Error>;

    /// Fold a single change into the model.
    fn apply(&mut self, event: &RowChangeEvent);
}

/// The shared bounty balance, taken from the newest ledger entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CurrentBounty {
    /// The balance after the newest entry, zero for an empty ledger.
    pub amount: f64,
    #[serde(skip)]
    last_entry_id: Option<LedgerEntryId>,
}

impl CurrentBounty {
    /// The id of the entry the balance was taken from.
    pub fn last_entry_id(&self) -> Option<LedgerEntryId> {
        self.last_entry_id
    }
}

impl ReadModel for CurrentBounty {
    const COLLECTION: Collection = Collection::Ledger;
    const KINDS: &'static [ChangeKind] = &[ChangeKind::Insert];

    fn load(connection: &Connection) -> Result<Self, Error> {
        Ok(match get_latest_entry(connection)? {
            Some(entry) => Self {
                amount: entry.accumulated,
                last_entry_id: Some(entry.id),
            },
            None => Self::default(),
        })
    }

    fn apply(&mut self, event: &RowChangeEvent) {
        let ChangedRow::LedgerEntry(entry) = &event.row else {
            return;
        };

        if self.last_entry_id.is_some_and(|last_id| last_id >= entry.id) {
            return;
        }

        self.amount = entry.accumulated;
        self.last_entry_id = Some(entry.id);
    }
}

/// The ledger entries with the latest transaction dates, at most
/// [RECENT_TRANSACTION_LIMIT] of them.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct RecentTransactions {
    /// Latest transaction date first, ties broken by the higher id.
    pub entries: Vec<LedgerEntry>,
}

impl ReadModel for RecentTransactions {
    const COLLECTION: Collection = Collection::Ledger;
    const KINDS: &'static [ChangeKind] = &[ChangeKind::Insert];

    fn load(connection: &Connection) -> Result<Self, Error> {
        Ok(Self {
            entries: get_recent_transactions(connection)?,
        })
    }

    fn apply(&mut self, event: &RowChangeEvent) {
        let ChangedRow::LedgerEntry(entry) = &event.row else {
            return;
        };

        if self.entries.iter().any(|existing| existing.id == entry.id) {
            return;
        }

        // Same order as the query: latest transaction date first, then highest id.
        let position = self
            .entries
            .iter()
            .position(|existing| {
                (&entry.transaction_date, entry.id) > (&existing.transaction_date, existing.id)
            })
            .unwrap_or(self.entries.len());

        if position >= RECENT_TRANSACTION_LIMIT {
            return;
        }

        self.entries.insert(position, entry.clone());
        self.entries.truncate(RECENT_TRANSACTION_LIMIT);
    }
}

/// Every member with their post counts.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct MemberRanking {
    /// In the order the rows were loaded, new members at the end.
    pub members: Vec<Member>,
}

impl ReadModel for MemberRanking {
    const COLLECTION: Collection = Collection::Members;
    const KINDS: &'static [ChangeKind] =
        &[ChangeKind::Insert, ChangeKind::Update, ChangeKind::Delete];

    fn load(connection: &Connection) -> Result<Self, Error> {
        Ok(Self {
            members: get_all_members(connection)?,
        })
    }

    fn apply(&mut self, event: &RowChangeEvent) {
        let ChangedRow::Member(member) = &event.row else {
            return;
        };

        let position = self
            .members
            .iter()
            .position(|existing| existing.id == member.id);

        match (event.kind, position) {
            (ChangeKind::Delete, Some(index)) => {
                self.members.remove(index);
            }
            (ChangeKind::Delete, None) => {}
            (_, Some(index)) => self.members[index] = member.clone(),
            (_, None) => self.members.push(member.clone()),
        }
    }
}

/// A read model shared between request handlers and the task that keeps it
/// current.
#[derive(Debug, Clone)]
pub struct LiveView<M> {
    model: Arc<RwLock<M>>,
    db_connection: Arc<Mutex<Connection>>,
}

impl<M: ReadModel> LiveView<M> {
    /// Load the model and spawn a task that applies new events to it.
    ///
    /// If the initial load fails the error is logged and the view starts
    /// empty. The task ends when every [ChangeNotifier] has been dropped.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime.
    pub fn start(db_connection: Arc<Mutex<Connection>>, notifier: &ChangeNotifier) -> Self {
        let subscription = notifier.subscribe(M::COLLECTION, M::KINDS);

        let view = Self {
            model: Arc::new(RwLock::new(M::default())),
            db_connection,
        };
        view.refresh();

        tokio::spawn(view.clone().follow(subscription));

        view
    }

    /// A copy of the current state of the model.
    pub fn snapshot(&self) -> Result<M, Error> {
        self.model
            .read()
            .map(|model| model.clone())
            .map_err(|error| {
                tracing::error!("could not acquire read model lock: {error}");
                Error::ReadModelLockError
            })
    }

    /// Reload the model from the database.
    ///
    /// On failure the error is logged and the previous snapshot is kept.
    pub fn refresh(&self) {
        let loaded = match self.db_connection.lock() {
            Ok(connection) => M::load(&connection),
            Err(error) => {
                tracing::error!("could not acquire database lock: {error}");
                Err(Error::DatabaseLockError)
            }
        };

        let loaded = match loaded {
            Ok(loaded) => loaded,
            Err(error) => {
                tracing::error!(
                    "Could not load the {:?} read model, keeping the last snapshot: {error}",
                    M::COLLECTION
                );
                return;
            }
        };

        match self.model.write() {
            Ok(mut model) => *model = loaded,
            Err(error) => tracing::error!("could not acquire read model lock: {error}"),
        }
    }

    fn apply(&self, event: &RowChangeEvent) {
        match self.model.write() {
            Ok(mut model) => model.apply(event),
            Err(error) => tracing::error!("could not acquire read model lock: {error}"),
        }
    }

    async fn follow(self, mut subscription: Subscription) {
        while let Some(event) = subscription.next().await {
            // Events were dropped, so the snapshot can no longer be patched.
            if subscription.take_missed() > 0 {
                self.refresh();
            } else {
                self.apply(&event);
            }
        }

        tracing::debug!("Stopped following {:?}", M::COLLECTION);
    }
}
