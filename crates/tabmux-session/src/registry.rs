use std::collections::BTreeMap;

use crate::session::{Session, SessionId};

/// Owns every open session.
///
/// Ids only grow, so iterating the map in key order is insertion order,
/// which is also tab order.
pub struct Registry<E> {
    sessions: BTreeMap<SessionId, Session<E>>,
    next_id: SessionId,
}

impl<E> Registry<E> {
    pub fn new() -> Self {
        Self {
            sessions: BTreeMap::new(),
            next_id: 1,
        }
    }

    /// Reserve the next id. Ids are never handed out twice, even if the
    /// session they were reserved for is never inserted.
    pub fn allocate_id(&mut self) -> SessionId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn insert(&mut self, session: Session<E>) {
        self.sessions.insert(session.id, session);
    }

    pub fn get(&self, id: SessionId) -> Option<&Session<E>> {
        self.sessions.get(&id)
    }

    pub fn get_mut(&mut self, id: SessionId) -> Option<&mut Session<E>> {
        self.sessions.get_mut(&id)
    }

    /// Remove a session; unknown ids are ignored.
    pub fn remove(&mut self, id: SessionId) -> Option<Session<E>> {
        self.sessions.remove(&id)
    }

    pub fn contains(&self, id: SessionId) -> bool {
        self.sessions.contains_key(&id)
    }

    /// Ids in insertion order.
    pub fn ids(&self) -> Vec<SessionId> {
        self.sessions.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Session<E>> {
        self.sessions.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Session<E>> {
        self.sessions.values_mut()
    }

    /// Sessions bound to `key`, in insertion order.
    pub fn by_remote_key<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a Session<E>> + 'a {
        self.sessions
            .values()
            .filter(move |s| s.remote_key.as_deref() == Some(key))
    }

    /// Oldest session bound to `key`.
    pub fn first_for_remote_key(&self, key: &str) -> Option<SessionId> {
        self.by_remote_key(key).next().map(|s| s.id)
    }

    /// Position of `id` in tab order.
    pub fn position(&self, id: SessionId) -> Option<usize> {
        self.sessions.keys().position(|&k| k == id)
    }

    /// Id at tab position `index`.
    pub fn id_at(&self, index: usize) -> Option<SessionId> {
        self.sessions.keys().nth(index).copied()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl<E> Default for Registry<E> {
    fn default() -> Self {
        Self::new()
    }
}
