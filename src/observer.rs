//! Publish-on-change subscription for tour snapshots.
//!
//! The director publishes once per settled frame and after each action.
//! Observers are only called when the snapshot differs from the previous one.

use crate::chapter::ChapterRegistry;
use crate::tour_state::TourSnapshot;

/// Downstream consumer of tour state (overlay, scene dimming, analytics).
pub trait TourObserver {
    fn on_change(&mut self, snapshot: &TourSnapshot, registry: &ChapterRegistry);
}

impl<F> TourObserver for F
where
    F: FnMut(&TourSnapshot),
{
    fn on_change(&mut self, snapshot: &TourSnapshot, _registry: &ChapterRegistry) {
        self(snapshot)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

#[derive(Default)]
pub struct StatePublisher {
    observers: Vec<(SubscriptionId, Box<dyn TourObserver>)>,
    last: Option<TourSnapshot>,
    next_id: u64,
}

impl StatePublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an observer. It receives the current snapshot on the next
    /// publish even if nothing changed.
    pub fn subscribe(&mut self, observer: Box<dyn TourObserver>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.observers.push((id, observer));
        self.last = None;
        id
    }

    /// Returns false if `id` was not subscribed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(sid, _)| *sid != id);
        self.observers.len() != before
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    /// Notify observers if `snapshot` changed. Returns whether it did.
    pub fn publish(&mut self, snapshot: TourSnapshot, registry: &ChapterRegistry) -> bool {
        if self.last == Some(snapshot) {
            return false;
        }
        self.last = Some(snapshot);
        for (_, observer) in &mut self.observers {
            observer.on_change(&snapshot, registry);
        }
        true
    }

    pub fn last(&self) -> Option<&TourSnapshot> {
        self.last.as_ref()
    }
}
