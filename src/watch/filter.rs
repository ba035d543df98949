// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Admission of watch events into the reconcile queue.
//!
//! Raw watcher events are classified into create/update/delete notifications,
//! then [`should_reconcile`] decides which of them enqueue a reconciliation.

use futures::{stream, Stream, StreamExt};
use kube::{runtime::watcher, Resource, ResourceExt};
use std::collections::{HashMap, HashSet};
use tracing::trace;

/// A change notification for a watched object
#[derive(Debug, Clone, PartialEq)]
pub enum ResourceEvent<K> {
    Created(K),
    Updated { old: K, new: K },
    Deleted(K),
}

impl<K> ResourceEvent<K> {
    /// The object as it is after the change
    pub fn into_object(self) -> K {
        match self {
            ResourceEvent::Created(obj) | ResourceEvent::Deleted(obj) => obj,
            ResourceEvent::Updated { new, .. } => new,
        }
    }
}

/// Decide whether an event should trigger a reconciliation.
///
/// Deletes never do, removal is left to finalizers. Updates only do while the
/// object isn't being torn down.
pub fn should_reconcile<K: Resource>(event: &ResourceEvent<K>) -> bool {
    match event {
        ResourceEvent::Created(_) => true,
        ResourceEvent::Updated { new, .. } => new.meta().deletion_timestamp.is_none(),
        ResourceEvent::Deleted(_) => false,
    }
}

type Key = (Option<String>, String);

fn key_of<K: Resource>(obj: &K) -> Key {
    (obj.namespace(), obj.name_any())
}

/// Turns watcher events into [`ResourceEvent`]s by remembering the last
/// version seen of every object.
#[derive(Debug)]
pub struct EventClassifier<K> {
    known: HashMap<Key, K>,
    relisted: Option<HashSet<Key>>,
}

impl<K> Default for EventClassifier<K> {
    fn default() -> Self {
        Self {
            known: HashMap::new(),
            relisted: None,
        }
    }
}

impl<K: Resource + Clone> EventClassifier<K> {
    pub fn classify(&mut self, event: watcher::Event<K>) -> Option<ResourceEvent<K>> {
        match event {
            watcher::Event::Apply(obj) => Some(self.applied(obj)),
            watcher::Event::Delete(obj) => {
                let key = key_of(&obj);
                self.known.remove(&key);
                if let Some(relisted) = self.relisted.as_mut() {
                    relisted.remove(&key);
                }
                Some(ResourceEvent::Deleted(obj))
            }
            watcher::Event::Init => {
                self.relisted = Some(HashSet::new());
                None
            }
            watcher::Event::InitApply(obj) => {
                if let Some(relisted) = self.relisted.as_mut() {
                    relisted.insert(key_of(&obj));
                }
                Some(self.applied(obj))
            }
            watcher::Event::InitDone => {
                // Objects missing from the relist were deleted while we weren't watching
                if let Some(relisted) = self.relisted.take() {
                    self.known.retain(|key, _| relisted.contains(key));
                }
                None
            }
        }
    }

    fn applied(&mut self, obj: K) -> ResourceEvent<K> {
        match self.known.insert(key_of(&obj), obj.clone()) {
            Some(old) => ResourceEvent::Updated { old, new: obj },
            None => ResourceEvent::Created(obj),
        }
    }
}

/// Adapt a watcher event stream into the trigger stream fed to the controller:
/// one object per admitted event, watcher errors passed through.
pub fn admitted<K, S>(events: S) -> impl Stream<Item = Result<K, watcher::Error>>
where
    K: Resource + Clone,
    S: Stream<Item = Result<watcher::Event<K>, watcher::Error>>,
{
    let mut classifier = EventClassifier::default();
    events
        .map(move |res| match res {
            Ok(event) => classifier
                .classify(event)
                .filter(|e| {
                    let admit = should_reconcile(e);
                    if !admit {
                        trace!("Dropping event that doesn't need reconciliation");
                    }
                    admit
                })
                .map(|e| Ok(e.into_object())),
            Err(e) => Some(Err(e)),
        })
        .flat_map(stream::iter)
}
