//! Dismissal of notifications and the refresh that follows.

use tracing::{debug, info, warn};

use crate::actions::SideActionRegistry;
use crate::cache::CachePublisher;
use crate::notifier::ConsumerNotifier;
use crate::store::NotificationStore;
use crate::types::{DismissTarget, NotificationRecord, Snapshot};

/// Applies dismissals to the store and republishes the cache right after.
pub struct MutationGateway<'a, S: NotificationStore> {
    store: &'a S,
    actions: &'a SideActionRegistry,
    publisher: &'a CachePublisher,
    notifier: &'a dyn ConsumerNotifier,
}

impl<'a, S: NotificationStore> MutationGateway<'a, S> {
    pub fn new(
        store: &'a S,
        actions: &'a SideActionRegistry,
        publisher: &'a CachePublisher,
        notifier: &'a dyn ConsumerNotifier,
    ) -> Self {
        Self {
            store,
            actions,
            publisher,
            notifier,
        }
    }

    /// Dismisses the target and returns the snapshot published afterwards.
    ///
    /// Nothing here fails: side actions and the delete log their errors, and
    /// the refresh runs unconditionally so the consumer sees the result
    /// immediately instead of on the next watch cycle.
    pub fn dismiss(&self, target: DismissTarget) -> Snapshot {
        let affected = self.resolve(target);
        for record in &affected {
            self.actions.run_for(record);
        }

        match self.store.delete(target) {
            Ok(deleted) => info!(target = ?target, deleted, "Dismissed notifications"),
            Err(err) => warn!(target = ?target, error = %err, "Failed to delete notifications"),
        }

        refresh(self.store, self.publisher, self.notifier)
    }

    fn resolve(&self, target: DismissTarget) -> Vec<NotificationRecord> {
        match target {
            DismissTarget::One(id) => match self.store.read_one(id) {
                Some(record) => vec![record],
                None => {
                    debug!(id, "Record already gone before dismissal");
                    vec![]
                }
            },
            DismissTarget::All => self.store.read_all().records().to_vec(),
        }
    }
}

/// Reads the store, publishes the cache and signals the consumer.
///
/// Used by one-shot commands and after dismissals; the watcher has its own
/// cycle that only publishes on change.
pub fn refresh<S: NotificationStore>(
    store: &S,
    publisher: &CachePublisher,
    notifier: &dyn ConsumerNotifier,
) -> Snapshot {
    let snapshot = store.read_all();
    if let Err(err) = publisher.publish(&snapshot) {
        warn!(path = %publisher.path().display(), error = %err, "Failed to publish cache");
    }
    notifier.notify();
    snapshot
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::test_utils::RecordingAction;
    use crate::actions::MAIL_BUNDLE_ID;
    use crate::notifier::test_utils::CountingNotifier;
    use crate::store::fixtures::{payload, FixtureStore};
    use std::path::Path;
    use std::sync::Arc;

    struct Harness {
        fixture: FixtureStore,
        publisher: CachePublisher,
        notifier: CountingNotifier,
        mail: Arc<RecordingAction>,
        registry: SideActionRegistry,
    }

    fn harness(dir: &Path) -> Harness {
        let fixture = FixtureStore::create(dir.join("db"));
        fixture.add_app(1, MAIL_BUNDLE_ID);
        fixture.add_app(2, "com.tinyspeck.slackmacgap");
        fixture.add_record(1, 1, &payload("Alice", "Invoice", ""), 10.0);
        fixture.add_record(2, 2, &payload("#general", "", "ship it"), 20.0);
        fixture.add_record(3, 1, &payload("Bob", "Lunch", ""), 30.0);

        let mail = Arc::new(RecordingAction::new(MAIL_BUNDLE_ID));
        let mut registry = SideActionRegistry::new();
        registry.register(mail.clone());

        Harness {
            fixture,
            publisher: CachePublisher::new(dir.join(".notif_cache.json")),
            notifier: CountingNotifier::default(),
            mail,
            registry,
        }
    }

    fn cached_ids(publisher: &CachePublisher) -> Vec<i64> {
        let content = fs_err::read_to_string(publisher.path()).expect("read cache");
        let records: Vec<NotificationRecord> = serde_json::from_str(&content).expect("parse");
        records.into_iter().map(|r| r.id).collect()
    }

    #[test]
    fn dismiss_one_runs_action_deletes_and_republishes() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let h = harness(temp_dir.path());
        let store = h.fixture.store();
        let gateway = MutationGateway::new(&store, &h.registry, &h.publisher, &h.notifier);

        let snapshot = gateway.dismiss(DismissTarget::One(1));

        assert_eq!(h.mail.seen(), vec![1]);
        assert_eq!(snapshot.identity_set(), [2, 3].into_iter().collect());
        assert_eq!(cached_ids(&h.publisher), vec![3, 2]);
        assert_eq!(h.notifier.count(), 1);
    }

    #[test]
    fn dismiss_unregistered_app_skips_actions() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let h = harness(temp_dir.path());
        let store = h.fixture.store();
        let gateway = MutationGateway::new(&store, &h.registry, &h.publisher, &h.notifier);

        gateway.dismiss(DismissTarget::One(2));

        assert!(h.mail.seen().is_empty());
        assert_eq!(cached_ids(&h.publisher), vec![3, 1]);
    }

    #[test]
    fn dismiss_missing_id_is_silent_and_leaves_others() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let h = harness(temp_dir.path());
        let store = h.fixture.store();
        let gateway = MutationGateway::new(&store, &h.registry, &h.publisher, &h.notifier);

        let snapshot = gateway.dismiss(DismissTarget::One(404));

        assert!(h.mail.seen().is_empty());
        assert_eq!(snapshot.len(), 3);
        assert_eq!(cached_ids(&h.publisher), vec![3, 2, 1]);
        assert_eq!(h.notifier.count(), 1);
    }

    #[test]
    fn dismiss_all_runs_actions_per_record_and_empties_store() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let h = harness(temp_dir.path());
        let store = h.fixture.store();
        let gateway = MutationGateway::new(&store, &h.registry, &h.publisher, &h.notifier);

        let snapshot = gateway.dismiss(DismissTarget::All);

        let mut seen = h.mail.seen();
        seen.sort_unstable();
        assert_eq!(seen, vec![1, 3]);
        assert!(snapshot.is_empty());
        assert!(store.read_all().is_empty());
        assert!(cached_ids(&h.publisher).is_empty());
    }

    #[test]
    fn dismiss_against_missing_store_still_publishes_empty_cache() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let store = crate::store::RecordStore::new(temp_dir.path().join("absent"));
        let registry = SideActionRegistry::new();
        let publisher = CachePublisher::new(temp_dir.path().join(".notif_cache.json"));
        let notifier = CountingNotifier::default();
        let gateway = MutationGateway::new(&store, &registry, &publisher, &notifier);

        gateway.dismiss(DismissTarget::All);

        assert!(cached_ids(&publisher).is_empty());
        assert_eq!(notifier.count(), 1);
    }
}
