//! In-process registry with lazy TTL expiry.

use super::SessionRegistry;
use crate::error::SessionError;
use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::Instant;

enum SlotValue {
    Text(String),
    List(VecDeque<String>),
}

struct Slot {
    value: SlotValue,
    expires_at: Option<Instant>,
}

impl Slot {
    fn list(value: &str) -> Self {
        Self {
            value: SlotValue::List(VecDeque::from([value.to_string()])),
            expires_at: None,
        }
    }

    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// Registry backed by a sharded concurrent map.
///
/// Each primitive touches one key under that key's shard lock, which makes it atomic.
/// Expired slots are dropped when touched and by [`purge_expired`](SessionRegistry::purge_expired).
#[derive(Default)]
pub struct MemoryRegistry {
    slots: DashMap<String, Slot>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a live slot. An expired slot is evicted and reads as missing.
    fn read<R>(&self, key: &str, f: impl FnOnce(&SlotValue) -> R) -> Option<R> {
        let now = Instant::now();
        let expired = match self.slots.get(key) {
            Some(slot) if !slot.is_expired(now) => return Some(f(&slot.value)),
            Some(_) => true,
            None => false,
        };
        if expired {
            self.slots.remove_if(key, |_, slot| slot.is_expired(now));
        }
        None
    }

    /// Mutate a live slot in place. Returns whether the key was live.
    fn update(&self, key: &str, f: impl FnOnce(&mut Slot, Instant)) -> bool {
        let now = Instant::now();
        let expired = match self.slots.get_mut(key) {
            Some(mut slot) if !slot.is_expired(now) => {
                f(slot.value_mut(), now);
                return true;
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            self.slots.remove_if(key, |_, slot| slot.is_expired(now));
        }
        false
    }
}

fn wrong_type(key: &str) -> SessionError {
    SessionError::RegistryUnavailable(format!("wrong kind of value stored under {key}"))
}

#[async_trait]
impl SessionRegistry for MemoryRegistry {
    async fn push_front(&self, list_key: &str, value: &str) -> Result<(), SessionError> {
        let now = Instant::now();
        match self.slots.entry(list_key.to_string()) {
            Entry::Occupied(mut occupied) => {
                let slot = occupied.get_mut();
                if slot.is_expired(now) {
                    *slot = Slot::list(value);
                    return Ok(());
                }
                match &mut slot.value {
                    SlotValue::List(list) => list.push_front(value.to_string()),
                    SlotValue::Text(_) => return Err(wrong_type(list_key)),
                }
            }
            Entry::Vacant(vacant) => {
                vacant.insert(Slot::list(value));
            }
        }
        Ok(())
    }

    async fn remove(&self, list_key: &str, value: &str) -> Result<bool, SessionError> {
        let now = Instant::now();
        let Entry::Occupied(mut occupied) = self.slots.entry(list_key.to_string()) else {
            return Ok(false);
        };
        if occupied.get().is_expired(now) {
            occupied.remove();
            return Ok(false);
        }

        let SlotValue::List(list) = &mut occupied.get_mut().value else {
            return Err(wrong_type(list_key));
        };
        let Some(idx) = list.iter().position(|v| v == value) else {
            return Ok(false);
        };
        list.remove(idx);
        let now_empty = list.is_empty();

        if now_empty {
            occupied.remove();
        }
        Ok(true)
    }

    async fn range(&self, list_key: &str) -> Result<Vec<String>, SessionError> {
        match self.read(list_key, |value| match value {
            SlotValue::List(list) => Some(list.iter().cloned().collect()),
            SlotValue::Text(_) => None,
        }) {
            Some(Some(values)) => Ok(values),
            Some(None) => Err(wrong_type(list_key)),
            None => Ok(Vec::new()),
        }
    }

    async fn contains(&self, list_key: &str, value: &str) -> Result<bool, SessionError> {
        match self.read(list_key, |stored| match stored {
            SlotValue::List(list) => Some(list.iter().any(|v| v == value)),
            SlotValue::Text(_) => None,
        }) {
            Some(Some(found)) => Ok(found),
            Some(None) => Err(wrong_type(list_key)),
            None => Ok(false),
        }
    }

    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<(), SessionError> {
        self.slots.insert(
            key.to_string(),
            Slot {
                value: SlotValue::Text(value.to_string()),
                expires_at: Some(Instant::now() + ttl),
            },
        );
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, SessionError> {
        match self.read(key, |value| match value {
            SlotValue::Text(text) => Some(text.clone()),
            SlotValue::List(_) => None,
        }) {
            Some(Some(text)) => Ok(Some(text)),
            Some(None) => Err(wrong_type(key)),
            None => Ok(None),
        }
    }

    async fn delete(&self, key: &str) -> Result<bool, SessionError> {
        let now = Instant::now();
        Ok(self
            .slots
            .remove(key)
            .is_some_and(|(_, slot)| !slot.is_expired(now)))
    }

    async fn delete_if_eq(&self, key: &str, expected: &str) -> Result<bool, SessionError> {
        let now = Instant::now();
        let removed = self.slots.remove_if(key, |_, slot| {
            !slot.is_expired(now) && matches!(&slot.value, SlotValue::Text(text) if text == expected)
        });
        Ok(removed.is_some())
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, SessionError> {
        Ok(self.update(key, |slot, now| slot.expires_at = Some(now + ttl)))
    }

    async fn extend_ttl(&self, key: &str, ttl: Duration) -> Result<bool, SessionError> {
        Ok(self.update(key, |slot, now| {
            let target = now + ttl;
            if slot.expires_at.is_none_or(|at| at < target) {
                slot.expires_at = Some(target);
            }
        }))
    }

    async fn purge_expired(&self) -> Result<usize, SessionError> {
        let now = Instant::now();
        let mut purged = 0;
        self.slots.retain(|_, slot| {
            let keep = !slot.is_expired(now);
            if !keep {
                purged += 1;
            }
            keep
        });
        Ok(purged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINUTE: Duration = Duration::from_secs(60);

    #[tokio::test]
    async fn test_list_is_most_recent_first() {
        let registry = MemoryRegistry::new();
        registry.push_front("sessions:u1", "a").await.unwrap();
        registry.push_front("sessions:u1", "b").await.unwrap();

        assert_eq!(registry.range("sessions:u1").await.unwrap(), vec!["b", "a"]);
        assert!(registry.contains("sessions:u1", "a").await.unwrap());
        assert!(!registry.contains("sessions:u2", "a").await.unwrap());
    }

    #[tokio::test]
    async fn test_remove_is_idempotent_and_drops_empty_list() {
        let registry = MemoryRegistry::new();
        registry.push_front("sessions:u1", "a").await.unwrap();

        assert!(registry.remove("sessions:u1", "a").await.unwrap());
        assert!(!registry.remove("sessions:u1", "a").await.unwrap());
        assert!(!registry.delete("sessions:u1").await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_values_expire() {
        let registry = MemoryRegistry::new();
        registry.set_with_ttl("liveness:a", "100", MINUTE).await.unwrap();
        assert_eq!(registry.get("liveness:a").await.unwrap().as_deref(), Some("100"));

        tokio::time::advance(MINUTE).await;
        assert_eq!(registry.get("liveness:a").await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_extend_ttl_never_shortens() {
        let registry = MemoryRegistry::new();
        registry.push_front("sessions:u1", "a").await.unwrap();

        assert!(registry.extend_ttl("sessions:u1", 10 * MINUTE).await.unwrap());
        assert!(registry.extend_ttl("sessions:u1", MINUTE).await.unwrap());

        tokio::time::advance(5 * MINUTE).await;
        assert_eq!(registry.range("sessions:u1").await.unwrap(), vec!["a"]);

        tokio::time::advance(5 * MINUTE).await;
        assert!(registry.range("sessions:u1").await.unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_expire_overrides_ttl() {
        let registry = MemoryRegistry::new();
        registry.push_front("sessions:u1", "a").await.unwrap();
        registry.extend_ttl("sessions:u1", 10 * MINUTE).await.unwrap();
        registry.expire("sessions:u1", MINUTE).await.unwrap();

        tokio::time::advance(MINUTE).await;
        assert!(!registry.contains("sessions:u1", "a").await.unwrap());
        assert!(!registry.expire("sessions:u1", MINUTE).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_if_eq() {
        let registry = MemoryRegistry::new();
        registry.set_with_ttl("passwordReset_u1", "new", MINUTE).await.unwrap();

        assert!(!registry.delete_if_eq("passwordReset_u1", "old").await.unwrap());
        assert_eq!(registry.get("passwordReset_u1").await.unwrap().as_deref(), Some("new"));

        assert!(registry.delete_if_eq("passwordReset_u1", "new").await.unwrap());
        assert_eq!(registry.get("passwordReset_u1").await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_slot_is_replaced_by_push() {
        let registry = MemoryRegistry::new();
        registry.set_with_ttl("sessions:u1", "stale", MINUTE).await.unwrap();

        tokio::time::advance(MINUTE).await;
        registry.push_front("sessions:u1", "a").await.unwrap();
        assert_eq!(registry.range("sessions:u1").await.unwrap(), vec!["a"]);
    }

    #[tokio::test]
    async fn test_wrong_kind_is_an_error() {
        let registry = MemoryRegistry::new();
        registry.set_with_ttl("k", "v", MINUTE).await.unwrap();

        assert!(matches!(
            registry.push_front("k", "x").await,
            Err(SessionError::RegistryUnavailable(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_expired() {
        let registry = MemoryRegistry::new();
        registry.set_with_ttl("a", "1", MINUTE).await.unwrap();
        registry.set_with_ttl("b", "1", 3 * MINUTE).await.unwrap();
        registry.push_front("sessions:u1", "x").await.unwrap();

        tokio::time::advance(2 * MINUTE).await;
        assert_eq!(registry.purge_expired().await.unwrap(), 1);
        assert_eq!(registry.get("b").await.unwrap().as_deref(), Some("1"));
    }
}
