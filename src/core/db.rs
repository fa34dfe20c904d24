use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::anyhow;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::core::helpers::{gravatar_url, hash_password, now_iso};
use crate::models::models::{Comment, Like, Post, Profile, User};

/// A stored document plus its write version. Versions start at 1 and bump on
/// every write; an absent key counts as version 0.
#[derive(Serialize, Deserialize, Clone)]
struct Doc {
    version: u64,
    data: Value,
}

struct Inner {
    docs: HashMap<String, Doc>,
    path: Option<PathBuf>,
}

/// JSON document store behind a shared handle.
///
/// Entities live under string keys (`user:{id}`, `profile:{user_id}`,
/// `post:{id}`) with index lists (`users_list`, `profiles_list`, `feed`)
/// standing in for collection scans. Read-modify-write sequences use
/// `get_json_versioned` plus `set_json_checked` so concurrent writers cannot
/// silently overwrite each other. When a snapshot path is configured, every
/// write is flushed to disk atomically.
#[derive(Clone)]
pub struct Store {
    inner: Arc<RwLock<Inner>>,
}

impl Store {
    pub fn in_memory() -> Self {
        Store {
            inner: Arc::new(RwLock::new(Inner {
                docs: HashMap::new(),
                path: None,
            })),
        }
    }

    /// Open a snapshot-backed store, loading the file when it exists.
    pub fn open(path: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let path = path.into();
        let docs = if path.exists() {
            let bytes = fs::read(&path)?;
            serde_json::from_slice(&bytes)?
        } else {
            HashMap::new()
        };

        Ok(Store {
            inner: Arc::new(RwLock::new(Inner {
                docs,
                path: Some(path),
            })),
        })
    }

    fn read(&self) -> anyhow::Result<RwLockReadGuard<'_, Inner>> {
        self.inner.read().map_err(|_| anyhow!("store lock poisoned"))
    }

    fn write(&self) -> anyhow::Result<RwLockWriteGuard<'_, Inner>> {
        self.inner.write().map_err(|_| anyhow!("store lock poisoned"))
    }

    pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> anyhow::Result<Option<T>> {
        let inner = self.read()?;
        match inner.docs.get(key) {
            Some(doc) => Ok(Some(serde_json::from_value(doc.data.clone())?)),
            None => Ok(None),
        }
    }

    /// Like `get_json` but also returns the document version for a later
    /// conditional write.
    pub fn get_json_versioned<T: DeserializeOwned>(
        &self,
        key: &str,
    ) -> anyhow::Result<Option<(T, u64)>> {
        let inner = self.read()?;
        match inner.docs.get(key) {
            Some(doc) => Ok(Some((serde_json::from_value(doc.data.clone())?, doc.version))),
            None => Ok(None),
        }
    }

    pub fn set_json<T: Serialize>(&self, key: &str, value: &T) -> anyhow::Result<()> {
        let mut inner = self.write()?;
        let version = inner.docs.get(key).map(|d| d.version).unwrap_or(0) + 1;
        let data = serde_json::to_value(value)?;
        inner.docs.insert(key.to_string(), Doc { version, data });
        persist(&inner)
    }

    /// Conditional write: applies only while the stored version still equals
    /// `expected` (0 for a key that must not exist yet). Returns whether the
    /// write happened.
    pub fn set_json_checked<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        expected: u64,
    ) -> anyhow::Result<bool> {
        let mut inner = self.write()?;
        let current = inner.docs.get(key).map(|d| d.version).unwrap_or(0);
        if current != expected {
            return Ok(false);
        }
        let data = serde_json::to_value(value)?;
        inner.docs.insert(
            key.to_string(),
            Doc {
                version: current + 1,
                data,
            },
        );
        persist(&inner)?;
        Ok(true)
    }

    pub fn delete(&self, key: &str) -> anyhow::Result<()> {
        let mut inner = self.write()?;
        inner.docs.remove(key);
        persist(&inner)
    }

    pub fn flush(&self) -> anyhow::Result<()> {
        let inner = self.read()?;
        persist(&inner)
    }
}

// Write the whole snapshot through a temp file so a crash mid-write cannot
// leave a truncated database behind.
fn persist(inner: &Inner) -> anyhow::Result<()> {
    let path = match &inner.path {
        Some(p) => p,
        None => return Ok(()),
    };
    let bytes = serde_json::to_vec_pretty(&inner.docs)?;
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, &bytes)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

/// Read-modify-write for the shared index lists (`users_list`,
/// `profiles_list`, `feed`). Retries when another writer moved the version
/// between the read and the write.
pub fn update_list(
    store: &Store,
    key: &str,
    apply: impl Fn(&mut Vec<String>),
) -> anyhow::Result<Vec<String>> {
    loop {
        let (mut list, version) = match store.get_json_versioned::<Vec<String>>(key)? {
            Some(found) => found,
            None => (Vec::new(), 0),
        };
        apply(&mut list);
        if store.set_json_checked(key, &list, version)? {
            return Ok(list);
        }
    }
}

pub fn find_user_by_email(store: &Store, email: &str) -> anyhow::Result<Option<User>> {
    let ids: Vec<String> = store.get_json("users_list")?.unwrap_or_default();
    for id in &ids {
        if let Some(u) = store.get_json::<User>(&format!("user:{}", id))? {
            if u.email == email {
                return Ok(Some(u));
            }
        }
    }
    Ok(None)
}

pub fn all_posts(store: &Store) -> anyhow::Result<Vec<Post>> {
    let feed: Vec<String> = store.get_json("feed")?.unwrap_or_default();
    let mut posts = Vec::new();
    for id in feed.iter() {
        if let Some(p) = store.get_json::<Post>(&format!("post:{}", id))? {
            posts.push(p);
        }
    }

    // Sort by date in descending order (newest first)
    posts.sort_by(|a, b| b.date.cmp(&a.date));

    Ok(posts)
}

pub fn all_profiles(store: &Store) -> anyhow::Result<Vec<Profile>> {
    let ids: Vec<String> = store.get_json("profiles_list")?.unwrap_or_default();
    let mut profiles = Vec::new();
    for id in ids.iter() {
        if let Some(p) = store.get_json::<Profile>(&format!("profile:{}", id))? {
            profiles.push(p);
        }
    }
    Ok(profiles)
}

pub fn find_profile_by_handle(store: &Store, handle: &str) -> anyhow::Result<Option<Profile>> {
    let ids: Vec<String> = store.get_json("profiles_list")?.unwrap_or_default();
    for id in &ids {
        if let Some(p) = store.get_json::<Profile>(&format!("profile:{}", id))? {
            if p.handle == handle {
                return Ok(Some(p));
            }
        }
    }
    Ok(None)
}

/// Seed a couple of demo accounts with profiles and posts. Safe to call on
/// every boot, existing accounts are left alone.
pub fn seed_demo_data(store: &Store) -> anyhow::Result<()> {
    if find_user_by_email(store, "ada@example.com")?.is_some() {
        return Ok(());
    }

    let mut users: Vec<String> = store.get_json("users_list")?.unwrap_or_default();
    let mut profiles: Vec<String> = store.get_json("profiles_list")?.unwrap_or_default();
    let mut feed: Vec<String> = store.get_json("feed")?.unwrap_or_default();

    let ada_id = Uuid::new_v4().to_string();
    let ada = User {
        id: ada_id.clone(),
        name: "Ada Lovelace".to_string(),
        email: "ada@example.com".to_string(),
        password: hash_password("engine123")?,
        avatar: Some(gravatar_url("ada@example.com")),
        date: now_iso(),
    };
    store.set_json(&format!("user:{}", ada_id), &ada)?;
    users.push(ada_id.clone());

    let grace_id = Uuid::new_v4().to_string();
    let grace = User {
        id: grace_id.clone(),
        name: "Grace Hopper".to_string(),
        email: "grace@example.com".to_string(),
        password: hash_password("compiler1")?,
        avatar: Some(gravatar_url("grace@example.com")),
        date: now_iso(),
    };
    store.set_json(&format!("user:{}", grace_id), &grace)?;
    users.push(grace_id.clone());

    let ada_profile = Profile {
        user: ada_id.clone(),
        handle: "ada".to_string(),
        company: Some("Analytical Engines Ltd".to_string()),
        website: None,
        location: Some("London".to_string()),
        status: "Developer".to_string(),
        skills: vec!["Rust".to_string(), "Mathematics".to_string()],
        bio: Some("First programmer".to_string()),
        githubusername: Some("ada".to_string()),
        experience: Vec::new(),
        education: Vec::new(),
        date: now_iso(),
    };
    store.set_json(&format!("profile:{}", ada_id), &ada_profile)?;
    profiles.push(ada_id.clone());

    let post_id = Uuid::new_v4().to_string();
    let post = Post {
        id: post_id.clone(),
        user: ada_id.clone(),
        text: "Notes on the analytical engine, part one.".to_string(),
        name: ada.name.clone(),
        avatar: ada.avatar.clone(),
        likes: vec![Like {
            user: grace_id.clone(),
        }],
        comments: vec![Comment {
            id: Uuid::new_v4().to_string(),
            user: grace_id.clone(),
            text: "Looking forward to part two.".to_string(),
            name: grace.name.clone(),
            avatar: grace.avatar.clone(),
            date: now_iso(),
        }],
        date: now_iso(),
    };
    store.set_json(&format!("post:{}", post_id), &post)?;
    feed.insert(0, post_id);

    store.set_json("users_list", &users)?;
    store.set_json("profiles_list", &profiles)?;
    store.set_json("feed", &feed)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_set_roundtrip() {
        let store = Store::in_memory();
        store.set_json("k", &vec!["a".to_string()]).unwrap();
        let got: Option<Vec<String>> = store.get_json("k").unwrap();
        assert_eq!(got, Some(vec!["a".to_string()]));

        let missing: Option<Vec<String>> = store.get_json("nope").unwrap();
        assert!(missing.is_none());
    }

    #[test]
    fn test_versions_bump_on_write() {
        let store = Store::in_memory();
        store.set_json("k", &1u32).unwrap();
        let (_, v1) = store.get_json_versioned::<u32>("k").unwrap().unwrap();
        store.set_json("k", &2u32).unwrap();
        let (val, v2) = store.get_json_versioned::<u32>("k").unwrap().unwrap();
        assert_eq!(val, 2);
        assert_eq!(v2, v1 + 1);
    }

    #[test]
    fn test_checked_write_rejects_stale_version() {
        let store = Store::in_memory();
        store.set_json("k", &1u32).unwrap();
        let (_, version) = store.get_json_versioned::<u32>("k").unwrap().unwrap();

        // Another writer gets in first
        store.set_json("k", &2u32).unwrap();

        assert!(!store.set_json_checked("k", &3u32, version).unwrap());
        let current: Option<u32> = store.get_json("k").unwrap();
        assert_eq!(current, Some(2));

        // Retry with the fresh version succeeds
        let (_, fresh) = store.get_json_versioned::<u32>("k").unwrap().unwrap();
        assert!(store.set_json_checked("k", &3u32, fresh).unwrap());
        let current: Option<u32> = store.get_json("k").unwrap();
        assert_eq!(current, Some(3));
    }

    #[test]
    fn test_checked_write_creates_when_absent() {
        let store = Store::in_memory();
        assert!(store.set_json_checked("k", &1u32, 0).unwrap());
        assert!(!store.set_json_checked("k", &2u32, 0).unwrap());
    }

    #[test]
    fn test_update_list_keeps_concurrent_pushes() {
        let store = Store::in_memory();

        std::thread::scope(|scope| {
            for worker in 0..8 {
                let store = store.clone();
                scope.spawn(move || {
                    for n in 0..25 {
                        update_list(&store, "ids", |list| {
                            list.push(format!("{}-{}", worker, n));
                        })
                        .unwrap();
                    }
                });
            }
        });

        let ids: Vec<String> = store.get_json("ids").unwrap().unwrap();
        assert_eq!(ids.len(), 200);
    }

    #[test]
    fn test_delete_removes_document() {
        let store = Store::in_memory();
        store.set_json("k", &1u32).unwrap();
        store.delete("k").unwrap();
        let got: Option<u32> = store.get_json("k").unwrap();
        assert!(got.is_none());
    }

    #[test]
    fn test_snapshot_survives_reopen() {
        let path = std::env::temp_dir().join(format!("devlink-db-{}.json", Uuid::new_v4()));

        {
            let store = Store::open(&path).unwrap();
            store.set_json("k", &"hello".to_string()).unwrap();
        }

        let reopened = Store::open(&path).unwrap();
        let got: Option<String> = reopened.get_json("k").unwrap();
        assert_eq!(got, Some("hello".to_string()));

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_seed_demo_data_is_idempotent() {
        let store = Store::in_memory();
        seed_demo_data(&store).unwrap();
        seed_demo_data(&store).unwrap();

        let users: Vec<String> = store.get_json("users_list").unwrap().unwrap_or_default();
        assert_eq!(users.len(), 2);
        let feed: Vec<String> = store.get_json("feed").unwrap().unwrap_or_default();
        assert_eq!(feed.len(), 1);
    }
}
