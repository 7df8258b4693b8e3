//! Observable set of assemblies contributing component types.
//!
//! The current membership is an immutable [`AssemblySnapshot`] behind an
//! `Arc`; mutations build a new snapshot and swap it in before any listener
//! runs, so readers never observe a half-applied change.

use super::resolver::ComponentResolver;
use crate::error::{AssemblyError, ModulaError, Result};
use async_trait::async_trait;
use modula_api::{Assembly, AssemblyCatalog, AssemblyId, ListenerId, LoaderContext};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_SOURCE: AtomicU64 = AtomicU64::new(1);

tokio::task_local! {
    /// Sources whose listeners are running in the current task.
    static NOTIFYING: Vec<u64>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssemblyEntry {
    pub assembly: Arc<Assembly>,
    pub loader: Option<LoaderContext>,
}

/// Immutable membership of an [`AssemblySource`] at one point in time.
#[derive(Debug, Clone, Default)]
pub struct AssemblySnapshot {
    version: u64,
    entries: HashMap<AssemblyId, AssemblyEntry>,
}

impl AssemblySnapshot {
    /// Monotonically increasing per source; bumped by every effective mutation.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: &AssemblyId) -> bool {
        self.entries.contains_key(id)
    }

    pub fn get(&self, id: &AssemblyId) -> Option<&AssemblyEntry> {
        self.entries.get(id)
    }

    pub fn loader_context(&self, id: &AssemblyId) -> Option<&LoaderContext> {
        self.entries.get(id).and_then(|e| e.loader.as_ref())
    }

    pub fn can_unload(&self, id: &AssemblyId) -> bool {
        self.loader_context(id).is_some_and(|ctx| ctx.collectible)
    }

    /// Assemblies ordered by identity.
    pub fn assemblies(&self) -> Vec<Arc<Assembly>> {
        let mut assemblies: Vec<_> = self.entries.values().map(|e| e.assembly.clone()).collect();
        assemblies.sort_by(|a, b| a.id.cmp(&b.id));
        assemblies
    }

    pub fn ids(&self) -> Vec<AssemblyId> {
        let mut ids: Vec<_> = self.entries.keys().cloned().collect();
        ids.sort();
        ids
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssemblyChangeKind {
    Added(AssemblyId),
    Removed(AssemblyId),
}

/// Payload of a change notification.
#[derive(Debug, Clone)]
pub struct AssemblyChange {
    pub kind: AssemblyChangeKind,
    pub snapshot: Arc<AssemblySnapshot>,
}

#[async_trait]
pub trait AssemblyListener: Send + Sync {
    /// Handles a membership change. An error does not undo the change; it is
    /// reported to the caller that made it.
    async fn assemblies_changed(&self, change: &AssemblyChange) -> Result<()>;
}

pub struct AssemblySource {
    instance: u64,
    current: RwLock<Arc<AssemblySnapshot>>,
    listeners: RwLock<Vec<(ListenerId, Arc<dyn AssemblyListener>)>>,
    next_listener: AtomicU64,
    /// Held from mutation through the end of fan-out; keeps notifications in
    /// mutation order.
    dispatch: tokio::sync::Mutex<()>,
}

impl Default for AssemblySource {
    fn default() -> Self {
        Self::new()
    }
}

impl AssemblySource {
    pub fn new() -> Self {
        Self::with_snapshot(AssemblySnapshot::default())
    }

    fn with_snapshot(snapshot: AssemblySnapshot) -> Self {
        Self {
            instance: NEXT_SOURCE.fetch_add(1, Ordering::Relaxed),
            current: RwLock::new(Arc::new(snapshot)),
            listeners: RwLock::new(Vec::new()),
            next_listener: AtomicU64::new(1),
            dispatch: tokio::sync::Mutex::new(()),
        }
    }

    /// Seeds the source with every component assembly reachable from
    /// `entry`. Seeded assemblies have no loader context and never unload.
    pub fn from_entry_assembly(
        catalog: &dyn AssemblyCatalog,
        resolver: &ComponentResolver,
        entry: &AssemblyId,
    ) -> std::result::Result<Self, AssemblyError> {
        if entry.is_empty() {
            return Err(AssemblyError::InvalidArgument(
                "entry assembly identity must not be empty".to_string(),
            ));
        }

        let entries = resolver
            .enumerate_component_assemblies(catalog, entry)
            .into_iter()
            .map(|assembly| {
                (
                    assembly.id.clone(),
                    AssemblyEntry {
                        assembly,
                        loader: None,
                    },
                )
            })
            .collect();

        Ok(Self::with_snapshot(AssemblySnapshot {
            version: 0,
            entries,
        }))
    }

    pub fn snapshot(&self) -> Arc<AssemblySnapshot> {
        self.current.read().clone()
    }

    pub fn assemblies(&self) -> Vec<Arc<Assembly>> {
        self.snapshot().assemblies()
    }

    pub fn contains_assembly(&self, id: &AssemblyId) -> bool {
        self.current.read().contains(id)
    }

    /// True only if the assembly was registered with a collectible loader context.
    pub fn can_unload(&self, id: &AssemblyId) -> bool {
        self.current.read().can_unload(id)
    }

    pub fn loader_context(&self, id: &AssemblyId) -> Option<LoaderContext> {
        self.current.read().loader_context(id).cloned()
    }

    pub fn subscribe(&self, listener: Arc<dyn AssemblyListener>) -> ListenerId {
        let id = ListenerId(self.next_listener.fetch_add(1, Ordering::Relaxed));
        self.listeners.write().push((id, listener));
        id
    }

    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.write();
        let before = listeners.len();
        listeners.retain(|(lid, _)| *lid != id);
        listeners.len() != before
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }

    /// Adds `assembly`, returning whether membership changed.
    ///
    /// Re-adding an assembly with the same loader context is a no-op; with a
    /// different loader context it is rejected as a duplicate identity.
    /// Returns after every listener has handled the change. If a listener
    /// fails, the assembly stays added and the first listener error is
    /// returned.
    pub async fn add_assembly(
        &self,
        assembly: Arc<Assembly>,
        loader: Option<LoaderContext>,
    ) -> Result<bool> {
        if assembly.id.is_empty() {
            return Err(AssemblyError::InvalidArgument(
                "assembly identity must not be empty".to_string(),
            )
            .into());
        }
        self.reject_reentrant(&assembly.id)?;

        let _gate = self.dispatch.lock().await;

        let change = {
            let mut current = self.current.write();
            if let Some(existing) = current.get(&assembly.id) {
                if existing.loader == loader {
                    return Ok(false);
                }
                return Err(AssemblyError::InvalidArgument(format!(
                    "assembly {} is already registered with another loader context",
                    assembly.id
                ))
                .into());
            }

            let id = assembly.id.clone();
            let mut next = (**current).clone();
            next.version += 1;
            next.entries.insert(id.clone(), AssemblyEntry { assembly, loader });
            let next = Arc::new(next);
            *current = next.clone();

            AssemblyChange {
                kind: AssemblyChangeKind::Added(id),
                snapshot: next,
            }
        };

        tracing::info!(
            "Assembly added: {:?} (version {})",
            change.kind,
            change.snapshot.version()
        );
        self.notify(&change).await?;
        Ok(true)
    }

    /// Removes the assembly, returning whether membership changed.
    ///
    /// Listener errors are reported the same way as for
    /// [`add_assembly`](Self::add_assembly): the assembly is gone either way.
    pub async fn remove_assembly(&self, id: &AssemblyId) -> Result<bool> {
        if id.is_empty() {
            return Err(AssemblyError::InvalidArgument(
                "assembly identity must not be empty".to_string(),
            )
            .into());
        }
        self.reject_reentrant(id)?;

        let _gate = self.dispatch.lock().await;

        let change = {
            let mut current = self.current.write();
            if !current.contains(id) {
                return Ok(false);
            }

            let mut next = (**current).clone();
            next.version += 1;
            next.entries.remove(id);
            let next = Arc::new(next);
            *current = next.clone();

            AssemblyChange {
                kind: AssemblyChangeKind::Removed(id.clone()),
                snapshot: next,
            }
        };

        tracing::info!(
            "Assembly removed: {:?} (version {})",
            change.kind,
            change.snapshot.version()
        );
        self.notify(&change).await?;
        Ok(true)
    }

    fn reject_reentrant(&self, id: &AssemblyId) -> std::result::Result<(), AssemblyError> {
        let reentrant = NOTIFYING
            .try_with(|sources| sources.contains(&self.instance))
            .unwrap_or(false);
        if reentrant {
            return Err(AssemblyError::ReentrantMutation(id.clone()));
        }
        Ok(())
    }

    /// Delivers `change` to every listener, even after one fails, and returns
    /// the first failure.
    async fn notify(&self, change: &AssemblyChange) -> Result<()> {
        // Listeners may unsubscribe while being notified; iterate a copy.
        let listeners: Vec<_> = self
            .listeners
            .read()
            .iter()
            .map(|(_, l)| l.clone())
            .collect();

        let mut sources = NOTIFYING.try_with(|s| s.clone()).unwrap_or_default();
        sources.push(self.instance);

        NOTIFYING
            .scope(sources, async {
                let mut first: Option<ModulaError> = None;
                for listener in listeners {
                    if let Err(e) = listener.assemblies_changed(change).await {
                        tracing::warn!("Listener failed to handle {:?}: {}", change.kind, e);
                        first.get_or_insert(e);
                    }
                }
                first.map_or(Ok(()), Err)
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    #[derive(Default)]
    struct Recorder {
        seen: StdMutex<Vec<(AssemblyChangeKind, u64, usize)>>,
    }

    #[async_trait]
    impl AssemblyListener for Recorder {
        async fn assemblies_changed(&self, change: &AssemblyChange) -> Result<()> {
            self.seen.lock().unwrap().push((
                change.kind.clone(),
                change.snapshot.version(),
                change.snapshot.len(),
            ));
            Ok(())
        }
    }

    fn assembly(name: &str) -> Arc<Assembly> {
        Arc::new(Assembly::new(name))
    }

    #[tokio::test]
    async fn test_add_remove_notifies_once_per_change() {
        let source = AssemblySource::new();
        let recorder = Arc::new(Recorder::default());
        source.subscribe(recorder.clone());

        assert!(source.add_assembly(assembly("A"), None).await.unwrap());
        assert!(!source.add_assembly(assembly("A"), None).await.unwrap());
        assert!(source.remove_assembly(&"A".into()).await.unwrap());
        assert!(!source.remove_assembly(&"A".into()).await.unwrap());

        let seen = recorder.seen.lock().unwrap();
        assert_eq!(
            *seen,
            vec![
                (AssemblyChangeKind::Added("A".into()), 1, 1),
                (AssemblyChangeKind::Removed("A".into()), 2, 0),
            ]
        );
    }

    #[tokio::test]
    async fn test_duplicate_with_other_loader_is_rejected() {
        let source = AssemblySource::new();
        let ctx = LoaderContext::collectible(1, "plugin");
        source
            .add_assembly(assembly("P"), Some(ctx.clone()))
            .await
            .unwrap();

        assert!(!source.add_assembly(assembly("P"), Some(ctx)).await.unwrap());
        let err = source.add_assembly(assembly("P"), None).await.unwrap_err();
        assert!(matches!(
            err,
            ModulaError::Assembly(AssemblyError::InvalidArgument(_))
        ));
    }

    #[tokio::test]
    async fn test_empty_identity_fails_fast() {
        let source = AssemblySource::new();
        let err = source.add_assembly(assembly(" "), None).await.unwrap_err();
        assert!(matches!(
            err,
            ModulaError::Assembly(AssemblyError::InvalidArgument(_))
        ));
        assert_eq!(source.snapshot().version(), 0);
    }

    #[tokio::test]
    async fn test_can_unload_requires_collectible_context() {
        let source = AssemblySource::new();
        source.add_assembly(assembly("Static"), None).await.unwrap();
        source
            .add_assembly(assembly("Pinned"), Some(LoaderContext::new(1, "pinned", false)))
            .await
            .unwrap();
        source
            .add_assembly(assembly("Plugin"), Some(LoaderContext::collectible(2, "plugin")))
            .await
            .unwrap();

        assert!(!source.can_unload(&"Static".into()));
        assert!(!source.can_unload(&"Pinned".into()));
        assert!(source.can_unload(&"Plugin".into()));
        assert!(!source.can_unload(&"Missing".into()));
        assert_eq!(
            source.loader_context(&"Plugin".into()).map(|c| c.collectible),
            Some(true)
        );
    }

    #[tokio::test]
    async fn test_unsubscribed_listener_is_not_notified() {
        let source = AssemblySource::new();
        let recorder = Arc::new(Recorder::default());
        let id = source.subscribe(recorder.clone());
        assert!(source.unsubscribe(id));
        assert!(!source.unsubscribe(id));

        source.add_assembly(assembly("A"), None).await.unwrap();
        assert!(recorder.seen.lock().unwrap().is_empty());
    }

    struct Reentrant {
        source: std::sync::Weak<AssemblySource>,
        result: StdMutex<Option<Result<bool>>>,
    }

    #[async_trait]
    impl AssemblyListener for Reentrant {
        async fn assemblies_changed(&self, _change: &AssemblyChange) -> Result<()> {
            if let Some(source) = self.source.upgrade() {
                let result = source.add_assembly(assembly("Nested"), None).await;
                *self.result.lock().unwrap() = Some(result);
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_reentrant_mutation_is_rejected() {
        let source = Arc::new(AssemblySource::new());
        let listener = Arc::new(Reentrant {
            source: Arc::downgrade(&source),
            result: StdMutex::new(None),
        });
        source.subscribe(listener.clone());

        source.add_assembly(assembly("A"), None).await.unwrap();

        let result = listener.result.lock().unwrap().take().unwrap();
        assert!(matches!(
            result,
            Err(ModulaError::Assembly(AssemblyError::ReentrantMutation(ref id))) if id.as_str() == "Nested"
        ));
        assert!(!source.contains_assembly(&"Nested".into()));
    }

    struct Failing;

    #[async_trait]
    impl AssemblyListener for Failing {
        async fn assemblies_changed(&self, change: &AssemblyChange) -> Result<()> {
            Err(ModulaError::Internal(format!("cannot handle {:?}", change.kind)))
        }
    }

    #[tokio::test]
    async fn test_listener_failure_reaches_caller_after_fan_out() {
        let source = AssemblySource::new();
        source.subscribe(Arc::new(Failing));
        let recorder = Arc::new(Recorder::default());
        source.subscribe(recorder.clone());

        let err = source.add_assembly(assembly("A"), None).await.unwrap_err();
        assert!(matches!(err, ModulaError::Internal(_)));
        // The change stands and later listeners still saw it.
        assert!(source.contains_assembly(&"A".into()));
        assert_eq!(recorder.seen.lock().unwrap().len(), 1);

        assert!(source.remove_assembly(&"A".into()).await.is_err());
        assert!(source.snapshot().is_empty());
        assert_eq!(recorder.seen.lock().unwrap().len(), 2);
    }
}
