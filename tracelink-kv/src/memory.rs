//! In-process implementation of the command surface.

use crate::commands::{KvCommands, KvError, KvResult};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

#[derive(Clone, Debug)]
enum ValueKind {
    Str(String),
    Hash(HashMap<String, String>),
    List(VecDeque<String>),
    Set(HashSet<String>),
}

#[derive(Clone, Debug)]
struct Entry {
    value: ValueKind,
    expires_at: Option<Instant>,
}

impl Entry {
    fn string(value: impl Into<String>) -> Self {
        Entry {
            value: ValueKind::Str(value.into()),
            expires_at: None,
        }
    }

    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// An in-memory key-value store.
///
/// Cloning shares the underlying data. Expiry is lazy: expired entries are
/// dropped when the key is next touched, and skipped by scans.
#[derive(Clone, Debug, Default)]
pub struct MemoryKv {
    entries: Arc<Mutex<HashMap<String, Entry>>>,
    db_index: u32,
}

impl MemoryKv {
    /// Create an empty store.
    pub fn new() -> Self {
        MemoryKv::default()
    }

    fn with_entries<T>(&self, f: impl FnOnce(&mut HashMap<String, Entry>) -> T) -> T {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut entries)
    }

    fn with_live_string<T>(
        &self,
        key: &str,
        f: impl FnOnce(Option<&mut String>) -> KvResult<T>,
    ) -> KvResult<T> {
        self.with_entries(|entries| match live_entry(entries, key) {
            Some(Entry {
                value: ValueKind::Str(s),
                ..
            }) => f(Some(s)),
            Some(_) => Err(KvError::WrongType),
            None => f(None),
        })
    }

    fn add_to_counter(&self, key: &str, delta: i64) -> KvResult<i64> {
        self.with_entries(|entries| {
            let current = match live_entry(entries, key) {
                Some(Entry {
                    value: ValueKind::Str(s),
                    ..
                }) => s.parse::<i64>().map_err(|_| KvError::NotAnInteger)?,
                Some(_) => return Err(KvError::WrongType),
                None => 0,
            };
            let next = current.checked_add(delta).ok_or(KvError::NotAnInteger)?;
            entries.insert(key.to_string(), Entry::string(next.to_string()));
            Ok(next)
        })
    }

    fn with_hash<T>(
        &self,
        key: &str,
        create: bool,
        f: impl FnOnce(Option<&mut HashMap<String, String>>) -> T,
    ) -> KvResult<T> {
        self.with_entries(|entries| {
            if create && live_entry(entries, key).is_none() {
                entries.insert(
                    key.to_string(),
                    Entry {
                        value: ValueKind::Hash(HashMap::new()),
                        expires_at: None,
                    },
                );
            }
            match live_entry(entries, key) {
                Some(Entry {
                    value: ValueKind::Hash(h),
                    ..
                }) => Ok(f(Some(h))),
                Some(_) => Err(KvError::WrongType),
                None => Ok(f(None)),
            }
        })
    }

    fn with_list<T>(
        &self,
        key: &str,
        create: bool,
        f: impl FnOnce(Option<&mut VecDeque<String>>) -> T,
    ) -> KvResult<T> {
        self.with_entries(|entries| {
            if create && live_entry(entries, key).is_none() {
                entries.insert(
                    key.to_string(),
                    Entry {
                        value: ValueKind::List(VecDeque::new()),
                        expires_at: None,
                    },
                );
            }
            match live_entry(entries, key) {
                Some(Entry {
                    value: ValueKind::List(l),
                    ..
                }) => Ok(f(Some(l))),
                Some(_) => Err(KvError::WrongType),
                None => Ok(f(None)),
            }
        })
    }

    fn with_set<T>(
        &self,
        key: &str,
        create: bool,
        f: impl FnOnce(Option<&mut HashSet<String>>) -> T,
    ) -> KvResult<T> {
        self.with_entries(|entries| {
            if create && live_entry(entries, key).is_none() {
                entries.insert(
                    key.to_string(),
                    Entry {
                        value: ValueKind::Set(HashSet::new()),
                        expires_at: None,
                    },
                );
            }
            match live_entry(entries, key) {
                Some(Entry {
                    value: ValueKind::Set(s),
                    ..
                }) => Ok(f(Some(s))),
                Some(_) => Err(KvError::WrongType),
                None => Ok(f(None)),
            }
        })
    }
}

/// Access an entry, evicting it first if its expiry has passed.
fn live_entry<'a>(entries: &'a mut HashMap<String, Entry>, key: &str) -> Option<&'a mut Entry> {
    let now = Instant::now();
    if entries.get(key).is_some_and(|entry| entry.is_expired(now)) {
        entries.remove(key);
        return None;
    }
    entries.get_mut(key)
}

/// Glob match supporting `*` and `?`.
fn glob_match(pattern: &[u8], text: &[u8]) -> bool {
    match pattern.split_first() {
        None => text.is_empty(),
        Some((b'*', rest)) => (0..=text.len()).any(|i| glob_match(rest, &text[i..])),
        Some((b'?', rest)) => text
            .split_first()
            .is_some_and(|(_, tail)| glob_match(rest, tail)),
        Some((&c, rest)) => text
            .split_first()
            .is_some_and(|(&t, tail)| t == c && glob_match(rest, tail)),
    }
}

impl KvCommands for MemoryKv {
    fn incr(&self, key: &str) -> KvResult<i64> {
        self.add_to_counter(key, 1)
    }

    fn decr(&self, key: &str) -> KvResult<i64> {
        self.add_to_counter(key, -1)
    }

    fn incr_by(&self, key: &str, delta: i64) -> KvResult<i64> {
        self.add_to_counter(key, delta)
    }

    fn decr_by(&self, key: &str, delta: i64) -> KvResult<i64> {
        let delta = delta.checked_neg().ok_or(KvError::NotAnInteger)?;
        self.add_to_counter(key, delta)
    }

    fn get(&self, key: &str) -> KvResult<Option<String>> {
        self.with_live_string(key, |s| Ok(s.map(|s| s.clone())))
    }

    fn set(&self, key: &str, value: &str) -> KvResult<()> {
        self.with_entries(|entries| {
            entries.insert(key.to_string(), Entry::string(value));
        });
        Ok(())
    }

    fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> KvResult<()> {
        self.with_entries(|entries| {
            entries.insert(
                key.to_string(),
                Entry {
                    value: ValueKind::Str(value.to_string()),
                    expires_at: Some(Instant::now() + Duration::from_secs(ttl_secs)),
                },
            );
        });
        Ok(())
    }

    fn get_set(&self, key: &str, value: &str) -> KvResult<Option<String>> {
        self.with_entries(|entries| match live_entry(entries, key) {
            Some(Entry {
                value: ValueKind::Str(s),
                ..
            }) => {
                let previous = std::mem::replace(s, value.to_string());
                Ok(Some(previous))
            }
            Some(_) => Err(KvError::WrongType),
            None => {
                entries.insert(key.to_string(), Entry::string(value));
                Ok(None)
            }
        })
    }

    fn append(&self, key: &str, value: &str) -> KvResult<u64> {
        self.with_entries(|entries| match live_entry(entries, key) {
            Some(Entry {
                value: ValueKind::Str(s),
                ..
            }) => {
                s.push_str(value);
                Ok(s.len() as u64)
            }
            Some(_) => Err(KvError::WrongType),
            None => {
                entries.insert(key.to_string(), Entry::string(value));
                Ok(value.len() as u64)
            }
        })
    }

    fn strlen(&self, key: &str) -> KvResult<u64> {
        self.with_live_string(key, |s| Ok(s.map(|s| s.len() as u64).unwrap_or(0)))
    }

    fn mget(&self, keys: &[&str]) -> KvResult<Vec<Option<String>>> {
        Ok(self.with_entries(|entries| {
            keys.iter()
                .map(|key| match live_entry(entries, key) {
                    Some(Entry {
                        value: ValueKind::Str(s),
                        ..
                    }) => Some(s.clone()),
                    // Non-string values read as absent in a multi-get.
                    _ => None,
                })
                .collect()
        }))
    }

    fn mset(&self, pairs: &[(&str, &str)]) -> KvResult<()> {
        self.with_entries(|entries| {
            for (key, value) in pairs {
                entries.insert((*key).to_string(), Entry::string(*value));
            }
        });
        Ok(())
    }

    fn del(&self, key: &str) -> KvResult<bool> {
        Ok(self.with_entries(|entries| live_entry(entries, key).is_some() && entries.remove(key).is_some()))
    }

    fn exists(&self, key: &str) -> KvResult<bool> {
        Ok(self.with_entries(|entries| live_entry(entries, key).is_some()))
    }

    fn expire(&self, key: &str, ttl_secs: u64) -> KvResult<bool> {
        Ok(self.with_entries(|entries| match live_entry(entries, key) {
            Some(entry) => {
                entry.expires_at = Some(Instant::now() + Duration::from_secs(ttl_secs));
                true
            }
            None => false,
        }))
    }

    fn ttl(&self, key: &str) -> KvResult<i64> {
        Ok(self.with_entries(|entries| match live_entry(entries, key) {
            Some(Entry {
                expires_at: Some(at),
                ..
            }) => at.saturating_duration_since(Instant::now()).as_secs() as i64,
            Some(_) => -1,
            None => -2,
        }))
    }

    fn persist(&self, key: &str) -> KvResult<bool> {
        Ok(self.with_entries(|entries| match live_entry(entries, key) {
            Some(entry) => entry.expires_at.take().is_some(),
            None => false,
        }))
    }

    fn rename(&self, key: &str, new_key: &str) -> KvResult<()> {
        self.with_entries(|entries| {
            if live_entry(entries, key).is_none() {
                return Err(KvError::NoSuchKey);
            }
            if let Some(entry) = entries.remove(key) {
                entries.insert(new_key.to_string(), entry);
            }
            Ok(())
        })
    }

    fn keys(&self, pattern: &str) -> KvResult<Vec<String>> {
        Ok(self.with_entries(|entries| {
            let now = Instant::now();
            entries
                .iter()
                .filter(|(_, entry)| !entry.is_expired(now))
                .filter(|(key, _)| glob_match(pattern.as_bytes(), key.as_bytes()))
                .map(|(key, _)| key.clone())
                .collect()
        }))
    }

    fn hset(&self, key: &str, field: &str, value: &str) -> KvResult<bool> {
        self.with_hash(key, true, |hash| match hash {
            Some(hash) => hash.insert(field.to_string(), value.to_string()).is_none(),
            None => false,
        })
    }

    fn hget(&self, key: &str, field: &str) -> KvResult<Option<String>> {
        self.with_hash(key, false, |hash| hash.and_then(|h| h.get(field).cloned()))
    }

    fn hdel(&self, key: &str, field: &str) -> KvResult<bool> {
        self.with_hash(key, false, |hash| {
            hash.map(|h| h.remove(field).is_some()).unwrap_or(false)
        })
    }

    fn hlen(&self, key: &str) -> KvResult<u64> {
        self.with_hash(key, false, |hash| hash.map(|h| h.len() as u64).unwrap_or(0))
    }

    fn hkeys(&self, key: &str) -> KvResult<Vec<String>> {
        self.with_hash(key, false, |hash| {
            hash.map(|h| h.keys().cloned().collect()).unwrap_or_default()
        })
    }

    fn hgetall(&self, key: &str) -> KvResult<Vec<(String, String)>> {
        self.with_hash(key, false, |hash| {
            hash.map(|h| h.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
                .unwrap_or_default()
        })
    }

    fn lpush(&self, key: &str, value: &str) -> KvResult<u64> {
        self.with_list(key, true, |list| match list {
            Some(list) => {
                list.push_front(value.to_string());
                list.len() as u64
            }
            None => 0,
        })
    }

    fn rpush(&self, key: &str, value: &str) -> KvResult<u64> {
        self.with_list(key, true, |list| match list {
            Some(list) => {
                list.push_back(value.to_string());
                list.len() as u64
            }
            None => 0,
        })
    }

    fn lpop(&self, key: &str) -> KvResult<Option<String>> {
        self.with_list(key, false, |list| list.and_then(|l| l.pop_front()))
    }

    fn rpop(&self, key: &str) -> KvResult<Option<String>> {
        self.with_list(key, false, |list| list.and_then(|l| l.pop_back()))
    }

    fn llen(&self, key: &str) -> KvResult<u64> {
        self.with_list(key, false, |list| list.map(|l| l.len() as u64).unwrap_or(0))
    }

    fn lrange(&self, key: &str, start: i64, stop: i64) -> KvResult<Vec<String>> {
        self.with_list(key, false, |list| {
            let Some(list) = list else {
                return Vec::new();
            };
            let len = list.len() as i64;
            let normalize = |index: i64| if index < 0 { index + len } else { index };
            let start = normalize(start).max(0);
            let stop = normalize(stop).min(len - 1);
            if start > stop || len == 0 {
                return Vec::new();
            }
            list.iter()
                .skip(start as usize)
                .take((stop - start + 1) as usize)
                .cloned()
                .collect()
        })
    }

    fn sadd(&self, key: &str, member: &str) -> KvResult<bool> {
        self.with_set(key, true, |set| {
            set.map(|s| s.insert(member.to_string())).unwrap_or(false)
        })
    }

    fn srem(&self, key: &str, member: &str) -> KvResult<bool> {
        self.with_set(key, false, |set| set.map(|s| s.remove(member)).unwrap_or(false))
    }

    fn scard(&self, key: &str) -> KvResult<u64> {
        self.with_set(key, false, |set| set.map(|s| s.len() as u64).unwrap_or(0))
    }

    fn sismember(&self, key: &str, member: &str) -> KvResult<bool> {
        self.with_set(key, false, |set| {
            set.map(|s| s.contains(member)).unwrap_or(false)
        })
    }

    fn db_index(&self) -> u32 {
        self.db_index
    }

    fn is_connected(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_start_from_zero() {
        let kv = MemoryKv::new();
        assert_eq!(kv.incr("hits"), Ok(1));
        assert_eq!(kv.incr("hits"), Ok(2));
        assert_eq!(kv.decr("hits"), Ok(1));
        assert_eq!(kv.incr_by("hits", 10), Ok(11));
        assert_eq!(kv.decr_by("hits", 5), Ok(6));
        assert_eq!(kv.get("hits"), Ok(Some("6".to_string())));
    }

    #[test]
    fn incr_on_non_integer_fails() {
        let kv = MemoryKv::new();
        kv.set("name", "alice").unwrap();
        assert_eq!(kv.incr("name"), Err(KvError::NotAnInteger));
    }

    #[test]
    fn decr_by_rejects_unnegatable_delta() {
        let kv = MemoryKv::new();
        kv.set("hits", "1").unwrap();
        assert_eq!(kv.decr_by("hits", i64::MIN), Err(KvError::NotAnInteger));
        assert_eq!(kv.get("hits"), Ok(Some("1".to_string())));
    }

    #[test]
    fn type_mismatch_is_an_error() {
        let kv = MemoryKv::new();
        kv.lpush("queue", "a").unwrap();
        assert_eq!(kv.get("queue"), Err(KvError::WrongType));
        assert_eq!(kv.hget("queue", "f"), Err(KvError::WrongType));
        assert_eq!(kv.sadd("queue", "m"), Err(KvError::WrongType));
    }

    #[test]
    fn expired_keys_behave_as_missing() {
        let kv = MemoryKv::new();
        kv.set_ex("flash", "gone", 0).unwrap();
        assert_eq!(kv.get("flash"), Ok(None));
        assert_eq!(kv.exists("flash"), Ok(false));
        assert_eq!(kv.ttl("flash"), Ok(-2));
        // An expired key can be rewritten as any type.
        assert_eq!(kv.incr("flash"), Ok(1));
    }

    #[test]
    fn ttl_and_persist() {
        let kv = MemoryKv::new();
        kv.set("stable", "v").unwrap();
        assert_eq!(kv.ttl("stable"), Ok(-1));

        assert_eq!(kv.expire("stable", 60), Ok(true));
        let remaining = kv.ttl("stable").unwrap();
        assert!((0..=60).contains(&remaining));

        assert_eq!(kv.persist("stable"), Ok(true));
        assert_eq!(kv.ttl("stable"), Ok(-1));
        assert_eq!(kv.persist("stable"), Ok(false));

        assert_eq!(kv.expire("missing", 60), Ok(false));
    }

    #[test]
    fn get_set_and_append() {
        let kv = MemoryKv::new();
        assert_eq!(kv.get_set("k", "one"), Ok(None));
        assert_eq!(kv.get_set("k", "two"), Ok(Some("one".to_string())));
        assert_eq!(kv.append("k", "!"), Ok(4));
        assert_eq!(kv.strlen("k"), Ok(4));
        assert_eq!(kv.strlen("missing"), Ok(0));
    }

    #[test]
    fn multi_get_and_set() {
        let kv = MemoryKv::new();
        kv.mset(&[("a", "1"), ("b", "2")]).unwrap();
        assert_eq!(
            kv.mget(&["a", "missing", "b"]),
            Ok(vec![Some("1".to_string()), None, Some("2".to_string())])
        );
    }

    #[test]
    fn rename_moves_the_entry() {
        let kv = MemoryKv::new();
        kv.set("old", "v").unwrap();
        kv.rename("old", "new").unwrap();
        assert_eq!(kv.get("old"), Ok(None));
        assert_eq!(kv.get("new"), Ok(Some("v".to_string())));
        assert_eq!(kv.rename("missing", "x"), Err(KvError::NoSuchKey));
    }

    #[test]
    fn keys_glob_matching() {
        let kv = MemoryKv::new();
        kv.mset(&[("user:1", "a"), ("user:2", "b"), ("order:1", "c")])
            .unwrap();

        let mut users = kv.keys("user:*").unwrap();
        users.sort();
        assert_eq!(users, vec!["user:1", "user:2"]);

        assert_eq!(kv.keys("user:?").unwrap().len(), 2);
        assert_eq!(kv.keys("nothing*").unwrap().len(), 0);
        assert_eq!(kv.keys("*").unwrap().len(), 3);
    }

    #[test]
    fn hash_operations() {
        let kv = MemoryKv::new();
        assert_eq!(kv.hset("h", "f1", "v1"), Ok(true));
        assert_eq!(kv.hset("h", "f1", "v2"), Ok(false));
        assert_eq!(kv.hget("h", "f1"), Ok(Some("v2".to_string())));
        assert_eq!(kv.hlen("h"), Ok(1));
        assert_eq!(kv.hkeys("h"), Ok(vec!["f1".to_string()]));
        assert_eq!(kv.hdel("h", "f1"), Ok(true));
        assert_eq!(kv.hdel("h", "f1"), Ok(false));
        assert_eq!(kv.hgetall("missing"), Ok(vec![]));
    }

    #[test]
    fn list_operations() {
        let kv = MemoryKv::new();
        kv.rpush("l", "a").unwrap();
        kv.rpush("l", "b").unwrap();
        kv.lpush("l", "z").unwrap();
        assert_eq!(kv.llen("l"), Ok(3));
        assert_eq!(
            kv.lrange("l", 0, -1),
            Ok(vec!["z".to_string(), "a".to_string(), "b".to_string()])
        );
        assert_eq!(kv.lrange("l", -2, -1), Ok(vec!["a".to_string(), "b".to_string()]));
        assert_eq!(kv.lrange("l", 2, 1), Ok(vec![]));
        assert_eq!(kv.lpop("l"), Ok(Some("z".to_string())));
        assert_eq!(kv.rpop("l"), Ok(Some("b".to_string())));
        assert_eq!(kv.lpop("missing"), Ok(None));
    }

    #[test]
    fn set_operations() {
        let kv = MemoryKv::new();
        assert_eq!(kv.sadd("s", "m"), Ok(true));
        assert_eq!(kv.sadd("s", "m"), Ok(false));
        assert_eq!(kv.sismember("s", "m"), Ok(true));
        assert_eq!(kv.scard("s"), Ok(1));
        assert_eq!(kv.srem("s", "m"), Ok(true));
        assert_eq!(kv.scard("s"), Ok(0));
        assert_eq!(kv.sismember("missing", "m"), Ok(false));
    }

    #[test]
    fn clones_share_data() {
        let kv = MemoryKv::new();
        let clone = kv.clone();
        kv.set("shared", "yes").unwrap();
        assert_eq!(clone.get("shared"), Ok(Some("yes".to_string())));
    }

    #[test]
    fn del_and_exists() {
        let kv = MemoryKv::new();
        kv.set("k", "v").unwrap();
        assert_eq!(kv.exists("k"), Ok(true));
        assert_eq!(kv.del("k"), Ok(true));
        assert_eq!(kv.del("k"), Ok(false));
        assert_eq!(kv.exists("k"), Ok(false));
    }
}
