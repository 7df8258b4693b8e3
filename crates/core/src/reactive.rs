//! Shared subscribe/recompute/re-render plumbing.
//!
//! The router and the view-extension placeholder both derive state from an
//! [`AssemblySource`] and only re-render when the derived state changes. The
//! pieces here keep that shape in one place: [`DerivedState`] holds the last
//! derived value behind an equality guard, the weak adapters let a source
//! notify a component without keeping it alive, and [`Subscription`] ends a
//! registration on drop.

use crate::assembly::{AssemblyChange, AssemblyListener, AssemblySource};
use crate::error::Result;
use async_trait::async_trait;
use modula_api::{ListenerId, LocationChanged, LocationListener, NavigationManager};
use std::sync::{Arc, Weak};

/// Last value derived from a source, replaced only when it differs.
#[derive(Debug, Clone, Default)]
pub struct DerivedState<T> {
    value: Option<T>,
}

impl<T> DerivedState<T> {
    pub fn new() -> Self {
        Self { value: None }
    }

    pub fn get(&self) -> Option<&T> {
        self.value.as_ref()
    }

    /// Stores `next` unless `same(current, next)` holds, returning whether the
    /// value changed. The first update always changes.
    pub fn update(&mut self, next: T, same: impl FnOnce(&T, &T) -> bool) -> bool {
        if let Some(current) = &self.value {
            if same(current, &next) {
                return false;
            }
        }
        self.value = Some(next);
        true
    }

    pub fn clear(&mut self) -> Option<T> {
        self.value.take()
    }
}

impl<T: PartialEq> DerivedState<T> {
    pub fn update_if_changed(&mut self, next: T) -> bool {
        self.update(next, |a, b| a == b)
    }
}

/// Component side of an assembly subscription.
#[async_trait]
pub trait AssemblyObserver: Send + Sync {
    async fn on_assemblies_changed(&self, change: &AssemblyChange) -> Result<()>;
}

/// Component side of a location subscription.
#[async_trait]
pub trait LocationObserver: Send + Sync {
    async fn on_location_changed(&self, event: &LocationChanged);
}

/// Forwards notifications to an observer without owning it.
pub struct WeakListener<T: ?Sized> {
    target: Weak<T>,
}

impl<T: ?Sized> WeakListener<T> {
    pub fn new(target: Weak<T>) -> Self {
        Self { target }
    }
}

#[async_trait]
impl<T: AssemblyObserver + ?Sized> AssemblyListener for WeakListener<T> {
    async fn assemblies_changed(&self, change: &AssemblyChange) -> Result<()> {
        match self.target.upgrade() {
            Some(target) => target.on_assemblies_changed(change).await,
            None => Ok(()),
        }
    }
}

#[async_trait]
impl<T: LocationObserver + ?Sized> LocationListener for WeakListener<T> {
    async fn location_changed(&self, event: &LocationChanged) {
        if let Some(target) = self.target.upgrade() {
            target.on_location_changed(event).await;
        }
    }
}

/// A live registration; dropping it unsubscribes.
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    pub fn to_assemblies<T>(source: &Arc<AssemblySource>, observer: Weak<T>) -> Self
    where
        T: AssemblyObserver + 'static,
    {
        let id = source.subscribe(Arc::new(WeakListener::new(observer)));
        let source = Arc::downgrade(source);
        Self::from_fn(move || {
            if let Some(source) = source.upgrade() {
                source.unsubscribe(id);
            }
        })
    }

    pub fn to_locations<T>(navigation: &Arc<dyn NavigationManager>, observer: Weak<T>) -> Self
    where
        T: LocationObserver + 'static,
    {
        let id: ListenerId = navigation.add_location_listener(Arc::new(WeakListener::new(observer)));
        let navigation = Arc::downgrade(navigation);
        Self::from_fn(move || {
            if let Some(navigation) = navigation.upgrade() {
                navigation.remove_location_listener(id);
            }
        })
    }

    pub fn from_fn(cancel: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    pub fn cancel(mut self) {
        self.run();
    }

    fn run(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.run();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use modula_api::Assembly;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_derived_state_guards_equal_values() {
        let mut state = DerivedState::new();
        assert!(state.update_if_changed(vec![1, 2]));
        assert!(!state.update_if_changed(vec![1, 2]));
        assert!(state.update_if_changed(vec![2]));
        assert_eq!(state.get(), Some(&vec![2]));

        // A comparison that never matches always replaces.
        assert!(state.update(vec![2], |_, _| false));
    }

    #[derive(Default)]
    struct Counter {
        hits: AtomicUsize,
    }

    #[async_trait]
    impl AssemblyObserver for Counter {
        async fn on_assemblies_changed(&self, _change: &AssemblyChange) -> Result<()> {
            self.hits.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_subscription_ends_on_drop() {
        let source = Arc::new(AssemblySource::new());
        let counter = Arc::new(Counter::default());

        let subscription = Subscription::to_assemblies(&source, Arc::downgrade(&counter));
        source
            .add_assembly(Arc::new(Assembly::new("A")), None)
            .await
            .unwrap();
        assert_eq!(counter.hits.load(Ordering::SeqCst), 1);

        drop(subscription);
        assert_eq!(source.listener_count(), 0);
        source
            .add_assembly(Arc::new(Assembly::new("B")), None)
            .await
            .unwrap();
        assert_eq!(counter.hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_weak_listener_does_not_keep_target_alive() {
        let source = Arc::new(AssemblySource::new());
        let counter = Arc::new(Counter::default());
        let weak = Arc::downgrade(&counter);
        let _subscription = Subscription::to_assemblies(&source, weak.clone());

        drop(counter);
        assert!(weak.upgrade().is_none());
        source
            .add_assembly(Arc::new(Assembly::new("A")), None)
            .await
            .unwrap();
    }
}
