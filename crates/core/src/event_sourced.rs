//! Event-sourced aggregate root: stream version + replay.
//!
//! Three distinct rules move the version:
//!
//! 1. **Replay**: +1 per applied event (`rehydrate_from_history`, snapshot catch-up).
//! 2. **Derived**: after a snapshot restore the version is
//!    `snapshot.last_event_position + events_after.len()`, independent of the counter.
//! 3. **Explicit**: a caller-supplied position (replay override or
//!    `mark_events_committed(Some(p))`) always wins.
//!
//! Recording new events never moves the version: it tracks the last *persisted*
//! position while the event queue tracks pending changes.

use crate::aggregate::AggregateRoot;
use crate::error::DomainResult;
use crate::event::DomainEvent;
use crate::snapshot::{Snapshot, SnapshotHooks};
use crate::version::StreamVersion;

/// Aggregate whose state is derived from its event stream.
pub trait EventSourcedAggregate: AggregateRoot {
    /// Snapshot payload type. Aggregates without snapshot support still name one; it is
    /// ignored on replay.
    type SnapshotState;

    fn stream_version(&self) -> &StreamVersion;

    fn stream_version_mut(&mut self) -> &mut StreamVersion;

    /// Pure state transition for a single event. Called exactly once per event.
    fn apply_event(&mut self, event: &DomainEvent<Self::Payload, Self::Id>);

    /// Snapshot capability, if implemented.
    fn snapshot_hooks(&mut self) -> Option<&mut dyn SnapshotHooks<State = Self::SnapshotState>> {
        None
    }

    /// Last known persisted stream position (`-1` before any event).
    fn version(&self) -> i64 {
        self.stream_version().get()
    }

    /// Apply `event` to in-memory state and queue it for persistence.
    ///
    /// The event is validated first, so a rejected event leaves state untouched.
    fn apply_and_record_event(
        &mut self,
        event: DomainEvent<Self::Payload, Self::Id>,
    ) -> DomainResult<()>
    where
        Self: Sized,
    {
        self.ensure_recordable(Some(&event))?;
        self.apply_event(&event);
        self.event_queue_mut().push(event);
        Ok(())
    }

    /// Acknowledge that the pending events are durably persisted and published.
    ///
    /// Only call this after the store commit succeeded; calling it earlier loses events
    /// on a crash.
    fn mark_events_committed(&mut self, last_committed_position: Option<i64>) {
        match last_committed_position {
            Some(position) => self.stream_version_mut().set(position),
            None => {
                let pending = self.event_queue().len();
                if pending > 0 {
                    self.stream_version_mut().advance(pending);
                }
            }
        }
        self.event_queue_mut().clear();
    }

    /// Rebuild state by replaying `events` in order.
    ///
    /// An explicit `version` is authoritative and replaces the replay-derived count.
    fn rehydrate_from_history(
        &mut self,
        events: &[DomainEvent<Self::Payload, Self::Id>],
        version: Option<i64>,
    ) {
        for event in events {
            self.apply_event(event);
            self.stream_version_mut().increment();
        }
        if let Some(version) = version {
            self.stream_version_mut().set(version);
        }
        self.event_queue_mut().clear();
    }

    /// Rebuild state from a snapshot plus the events recorded after it.
    ///
    /// Without snapshot hooks this is exactly `rehydrate_from_history(events_after, version)`
    /// and the snapshot payload is ignored.
    fn rehydrate_from_snapshot(
        &mut self,
        snapshot: &Snapshot<Self::SnapshotState, Self::Id>,
        events_after: &[DomainEvent<Self::Payload, Self::Id>],
        version: Option<i64>,
    ) {
        let restored = match self.snapshot_hooks() {
            Some(hooks) => {
                hooks.restore_snapshot(&snapshot.payload);
                true
            }
            None => false,
        };
        if !restored {
            self.rehydrate_from_history(events_after, version);
            return;
        }

        for event in events_after {
            self.apply_event(event);
            self.stream_version_mut().increment();
        }
        let derived = snapshot.last_event_position + events_after.len() as i64;
        self.stream_version_mut().set(version.unwrap_or(derived));
        self.event_queue_mut().clear();
    }

    /// Capture the current state at the current version.
    ///
    /// Returns `None` while the aggregate has no id.
    fn take_snapshot(
        &self,
        snapshot_version: u32,
    ) -> Option<Snapshot<Self::SnapshotState, Self::Id>>
    where
        Self: SnapshotHooks<State = Self::SnapshotState>,
    {
        let aggregate_id = self.id()?.clone();
        Some(Snapshot::new(
            aggregate_id,
            self.version(),
            snapshot_version,
            self.create_snapshot(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::EventQueue;
    use crate::entity::{Entity, Identity};
    use crate::error::DomainError;
    use crate::AggregateId;
    use proptest::prelude::*;

    #[derive(Debug, Clone, PartialEq)]
    enum AccountEvent {
        Opened { owner: String },
        Deposited { amount: i64 },
        Withdrawn { amount: i64 },
    }

    #[derive(Debug, Clone, PartialEq)]
    struct AccountState {
        owner: String,
        balance: i64,
    }

    #[derive(Debug)]
    struct Account {
        identity: Identity<AggregateId>,
        events: EventQueue<AccountEvent, AggregateId>,
        version: StreamVersion,
        owner: String,
        balance: i64,
        applied: usize,
    }

    impl Account {
        fn empty(id: AggregateId) -> Self {
            Self {
                identity: Identity::new(id),
                events: EventQueue::new(),
                version: StreamVersion::new(),
                owner: String::new(),
                balance: 0,
                applied: 0,
            }
        }

        fn aggregate_id(&self) -> AggregateId {
            *self.identity.get().unwrap()
        }

        fn event(&self, payload: AccountEvent) -> DomainEvent<AccountEvent> {
            DomainEvent::new(self.aggregate_id(), "account", "1.0.0", payload)
        }

        fn open(&mut self, owner: &str) -> DomainResult<()> {
            let event = self.event(AccountEvent::Opened {
                owner: owner.to_string(),
            });
            self.apply_and_record_event(event)
        }

        fn deposit(&mut self, amount: i64) -> DomainResult<()> {
            if amount <= 0 {
                return Err(DomainError::validation("amount must be positive"));
            }
            let event = self.event(AccountEvent::Deposited { amount });
            self.apply_and_record_event(event)
        }

        fn withdraw(&mut self, amount: i64) -> DomainResult<()> {
            if amount > self.balance {
                return Err(DomainError::invariant("insufficient funds"));
            }
            let event = self.event(AccountEvent::Withdrawn { amount });
            self.apply_and_record_event(event)
        }
    }

    impl Entity for Account {
        type Id = AggregateId;

        fn id(&self) -> Option<&AggregateId> {
            self.identity.get()
        }
    }

    impl AggregateRoot for Account {
        type Payload = AccountEvent;

        fn event_queue(&self) -> &EventQueue<AccountEvent, AggregateId> {
            &self.events
        }

        fn event_queue_mut(&mut self) -> &mut EventQueue<AccountEvent, AggregateId> {
            &mut self.events
        }
    }

    impl SnapshotHooks for Account {
        type State = AccountState;

        fn create_snapshot(&self) -> AccountState {
            AccountState {
                owner: self.owner.clone(),
                balance: self.balance,
            }
        }

        fn restore_snapshot(&mut self, state: &AccountState) {
            self.owner = state.owner.clone();
            self.balance = state.balance;
        }
    }

    impl EventSourcedAggregate for Account {
        type SnapshotState = AccountState;

        fn stream_version(&self) -> &StreamVersion {
            &self.version
        }

        fn stream_version_mut(&mut self) -> &mut StreamVersion {
            &mut self.version
        }

        fn apply_event(&mut self, event: &DomainEvent<AccountEvent>) {
            match event.payload() {
                AccountEvent::Opened { owner } => self.owner = owner.clone(),
                AccountEvent::Deposited { amount } => self.balance += amount,
                AccountEvent::Withdrawn { amount } => self.balance -= amount,
            }
            self.applied += 1;
        }

        fn snapshot_hooks(&mut self) -> Option<&mut dyn SnapshotHooks<State = AccountState>> {
            Some(self)
        }
    }

    /// Same domain, no snapshot capability.
    #[derive(Debug)]
    struct Ledger(Account);

    impl Entity for Ledger {
        type Id = AggregateId;

        fn id(&self) -> Option<&AggregateId> {
            self.0.id()
        }
    }

    impl AggregateRoot for Ledger {
        type Payload = AccountEvent;

        fn event_queue(&self) -> &EventQueue<AccountEvent, AggregateId> {
            &self.0.events
        }

        fn event_queue_mut(&mut self) -> &mut EventQueue<AccountEvent, AggregateId> {
            &mut self.0.events
        }
    }

    impl EventSourcedAggregate for Ledger {
        type SnapshotState = AccountState;

        fn stream_version(&self) -> &StreamVersion {
            &self.0.version
        }

        fn stream_version_mut(&mut self) -> &mut StreamVersion {
            &mut self.0.version
        }

        fn apply_event(&mut self, event: &DomainEvent<AccountEvent>) {
            self.0.apply_event(event);
        }
    }

    fn history(id: AggregateId, payloads: Vec<AccountEvent>) -> Vec<DomainEvent<AccountEvent>> {
        payloads
            .into_iter()
            .enumerate()
            .map(|(pos, p)| DomainEvent::new(id, "account", "1.0.0", p).with_position(pos as i64))
            .collect()
    }

    fn snapshot_at(id: AggregateId, position: i64, balance: i64) -> Snapshot<AccountState> {
        Snapshot::new(
            id,
            position,
            1,
            AccountState {
                owner: "snap".to_string(),
                balance,
            },
        )
    }

    #[test]
    fn fresh_aggregate_starts_at_minus_one() {
        let account = Account::empty(AggregateId::new());
        assert_eq!(account.version(), -1);
        assert!(account.domain_events().is_empty());
    }

    #[test]
    fn recording_changes_state_but_not_version() {
        let mut account = Account::empty(AggregateId::new());
        account.open("ada").unwrap();
        account.deposit(50).unwrap();

        assert_eq!(account.balance, 50);
        assert_eq!(account.owner, "ada");
        assert_eq!(account.version(), -1);
        assert_eq!(account.domain_events().len(), 2);
    }

    #[test]
    fn rejected_event_leaves_state_untouched() {
        let mut account = Account::empty(AggregateId::new());
        let foreign = DomainEvent::new(
            AggregateId::new(),
            "account",
            "1.0.0",
            AccountEvent::Deposited { amount: 10 },
        );

        let err = account.apply_and_record_event(foreign).unwrap_err();
        assert!(matches!(err, DomainError::EventAggregateMismatch { .. }));
        assert_eq!(account.balance, 0);
        assert_eq!(account.applied, 0);
        assert!(account.domain_events().is_empty());
    }

    #[test]
    fn business_rule_failures_record_nothing() {
        let mut account = Account::empty(AggregateId::new());
        account.open("ada").unwrap();
        assert!(matches!(
            account.deposit(0),
            Err(DomainError::Validation(_))
        ));
        assert!(matches!(
            account.withdraw(1),
            Err(DomainError::InvariantViolation(_))
        ));
        assert_eq!(account.domain_events().len(), 1);
    }

    #[test]
    fn history_replay_counts_events_and_clears_queue() {
        let id = AggregateId::new();
        let mut account = Account::empty(id);
        account.open("pending").unwrap();

        let events = history(
            id,
            vec![
                AccountEvent::Opened { owner: "ada".into() },
                AccountEvent::Deposited { amount: 30 },
            ],
        );
        account.rehydrate_from_history(&events, None);

        assert_eq!(account.version(), 1);
        assert!(account.domain_events().is_empty());
        assert_eq!(account.owner, "ada");
        assert_eq!(account.balance, 30);
    }

    #[test]
    fn history_replay_honours_explicit_version() {
        let id = AggregateId::new();
        let mut account = Account::empty(id);
        let events = history(id, vec![AccountEvent::Deposited { amount: 5 }]);

        account.rehydrate_from_history(&events, Some(99));

        assert_eq!(account.version(), 99);
        assert_eq!(account.balance, 5);
    }

    #[test]
    fn empty_history_keeps_initial_version() {
        let mut account = Account::empty(AggregateId::new());
        account.rehydrate_from_history(&[], None);
        assert_eq!(account.version(), -1);
    }

    #[test]
    fn mark_committed_advances_by_pending_count() {
        let mut account = Account::empty(AggregateId::new());
        account.open("ada").unwrap();
        account.deposit(10).unwrap();

        account.mark_events_committed(None);

        assert_eq!(account.version(), 1);
        assert!(account.domain_events().is_empty());
    }

    #[test]
    fn mark_committed_with_position_sets_it_exactly() {
        let mut account = Account::empty(AggregateId::new());
        account.open("ada").unwrap();
        account.deposit(10).unwrap();

        account.mark_events_committed(Some(42));

        assert_eq!(account.version(), 42);
        assert!(account.domain_events().is_empty());
    }

    #[test]
    fn mark_committed_without_pending_is_a_no_op_on_version() {
        let mut account = Account::empty(AggregateId::new());
        account.mark_events_committed(None);
        assert_eq!(account.version(), -1);
    }

    #[test]
    fn snapshot_replay_uses_derived_version() {
        let id = AggregateId::new();
        let events = history(
            id,
            vec![
                AccountEvent::Deposited { amount: 7 },
                AccountEvent::Withdrawn { amount: 2 },
            ],
        );

        let mut account = Account::empty(id);
        account.rehydrate_from_snapshot(&snapshot_at(id, 5, 100), &events, None);

        assert_eq!(account.version(), 7);
        assert_eq!(account.owner, "snap");
        assert_eq!(account.balance, 105);
        assert_eq!(account.applied, 2);
        assert!(account.domain_events().is_empty());
    }

    #[test]
    fn snapshot_replay_derivation_ignores_prior_counter() {
        let id = AggregateId::new();
        let events = history(id, vec![AccountEvent::Deposited { amount: 1 }]);

        let mut account = Account::empty(id);
        account.rehydrate_from_history(&history(id, vec![AccountEvent::Deposited { amount: 1 }; 3]), None);
        assert_eq!(account.version(), 2);

        account.rehydrate_from_snapshot(&snapshot_at(id, 5, 0), &events, None);
        assert_eq!(account.version(), 6);
    }

    #[test]
    fn snapshot_replay_with_no_events_after() {
        let id = AggregateId::new();
        let mut account = Account::empty(id);
        account.rehydrate_from_snapshot(&snapshot_at(id, 5, 40), &[], None);

        assert_eq!(account.version(), 5);
        assert_eq!(account.balance, 40);
    }

    #[test]
    fn snapshot_replay_honours_explicit_version() {
        let id = AggregateId::new();
        let events = history(id, vec![AccountEvent::Deposited { amount: 1 }]);
        let mut account = Account::empty(id);

        account.rehydrate_from_snapshot(&snapshot_at(id, 5, 0), &events, Some(7));
        assert_eq!(account.version(), 7);

        let mut other = Account::empty(id);
        other.rehydrate_from_snapshot(&snapshot_at(id, 5, 0), &events, Some(20));
        assert_eq!(other.version(), 20);
    }

    #[test]
    fn snapshot_replay_without_hooks_falls_back_to_history() {
        let id = AggregateId::new();
        let events = history(
            id,
            vec![
                AccountEvent::Opened { owner: "ada".into() },
                AccountEvent::Deposited { amount: 7 },
            ],
        );

        let mut via_snapshot = Ledger(Account::empty(id));
        via_snapshot.rehydrate_from_snapshot(&snapshot_at(id, 5, 1_000), &events, None);

        let mut via_history = Ledger(Account::empty(id));
        via_history.rehydrate_from_history(&events, None);

        // Payload ignored: no "snap" owner, no 1_000 balance.
        assert_eq!(via_snapshot.0.owner, "ada");
        assert_eq!(via_snapshot.0.balance, 7);
        assert_eq!(via_snapshot.version(), 1);
        assert_eq!(via_snapshot.version(), via_history.version());
        assert_eq!(via_snapshot.0.balance, via_history.0.balance);

        let mut with_override = Ledger(Account::empty(id));
        with_override.rehydrate_from_snapshot(&snapshot_at(id, 5, 1_000), &events, Some(11));
        assert_eq!(with_override.version(), 11);
    }

    #[test]
    fn take_snapshot_captures_state_at_current_version() {
        let id = AggregateId::new();
        let mut account = Account::empty(id);
        account.open("ada").unwrap();
        account.deposit(12).unwrap();
        account.mark_events_committed(None);

        let snapshot = account.take_snapshot(3).unwrap();
        assert_eq!(snapshot.aggregate_id, id);
        assert_eq!(snapshot.last_event_position, 1);
        assert_eq!(snapshot.snapshot_version, 3);
        assert_eq!(
            snapshot.payload,
            AccountState {
                owner: "ada".into(),
                balance: 12
            }
        );

        let mut restored = Account::empty(id);
        restored.rehydrate_from_snapshot(&snapshot, &[], None);
        assert_eq!(restored.version(), account.version());
        assert_eq!(restored.create_snapshot(), account.create_snapshot());
    }

    #[test]
    fn snapshot_then_tail_matches_full_history() {
        let id = AggregateId::new();
        let all = history(
            id,
            vec![
                AccountEvent::Opened { owner: "ada".into() },
                AccountEvent::Deposited { amount: 10 },
                AccountEvent::Deposited { amount: 5 },
                AccountEvent::Withdrawn { amount: 3 },
            ],
        );

        let mut full = Account::empty(id);
        full.rehydrate_from_history(&all, None);

        let mut head = Account::empty(id);
        head.rehydrate_from_history(&all[..2], None);
        let snapshot = head.take_snapshot(1).unwrap();

        let mut resumed = Account::empty(id);
        resumed.rehydrate_from_snapshot(&snapshot, &all[2..], None);

        assert_eq!(resumed.version(), full.version());
        assert_eq!(resumed.create_snapshot(), full.create_snapshot());
    }

    fn arb_event() -> impl Strategy<Value = AccountEvent> {
        prop_oneof![
            "[a-z]{1,8}".prop_map(|owner| AccountEvent::Opened { owner }),
            (1i64..1_000).prop_map(|amount| AccountEvent::Deposited { amount }),
            (1i64..1_000).prop_map(|amount| AccountEvent::Withdrawn { amount }),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: replaying the same ordered events always yields the same state and version.
        #[test]
        fn replay_is_deterministic(payloads in prop::collection::vec(arb_event(), 0..32)) {
            let id = AggregateId::new();
            let events = history(id, payloads);

            let mut a = Account::empty(id);
            a.rehydrate_from_history(&events, None);
            let mut b = Account::empty(id);
            b.rehydrate_from_history(&events, None);

            prop_assert_eq!(a.version(), events.len() as i64 - 1);
            prop_assert_eq!(a.version(), b.version());
            prop_assert_eq!(a.create_snapshot(), b.create_snapshot());
        }

        /// Property: live recording + commit ends at the same version and state as replay.
        #[test]
        fn live_mutation_matches_replay(amounts in prop::collection::vec(1i64..500, 1..16)) {
            let id = AggregateId::new();
            let mut live = Account::empty(id);
            live.open("ada").unwrap();
            for amount in &amounts {
                live.deposit(*amount).unwrap();
            }
            let recorded = live.domain_events();
            live.mark_events_committed(None);

            let mut replayed = Account::empty(id);
            replayed.rehydrate_from_history(&recorded, None);

            prop_assert_eq!(live.version(), replayed.version());
            prop_assert_eq!(live.create_snapshot(), replayed.create_snapshot());
        }
    }
}
