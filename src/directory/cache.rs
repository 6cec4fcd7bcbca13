//! Shared read-only lookup cache
//!
//! Wraps any [`Directory`] so parallel resolutions share one fetch per id.
//! Each id gets its own `OnceCell`: the first caller performs the lookup and
//! concurrent callers for the same id wait on it instead of racing a
//! duplicate request. Every inner call is bounded by the per-call timeout.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::OnceCell;

use super::traits::Directory;
use crate::error::DirectoryError;
use crate::model::{Person, TitleSet};

type Slot = Arc<OnceCell<Option<Person>>>;

pub struct CachedDirectory<D> {
    inner: D,
    timeout: Duration,
    slots: Mutex<HashMap<String, Slot>>,
    fetches: AtomicUsize,
}

impl<D: Directory> CachedDirectory<D> {
    pub fn new(inner: D, timeout: Duration) -> Self {
        Self {
            inner,
            timeout,
            slots: Mutex::new(HashMap::new()),
            fetches: AtomicUsize::new(0),
        }
    }

    /// Number of id lookups forwarded to the wrapped directory
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::Relaxed)
    }

    fn slot(&self, id: &str) -> Slot {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.entry(id.to_string()).or_default().clone()
    }

    async fn bounded<T>(
        &self,
        key: &str,
        call: impl Future<Output = Result<T, DirectoryError>>,
    ) -> Result<T, DirectoryError> {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(DirectoryError::Timeout {
                key: key.to_string(),
                timeout: self.timeout,
            }),
        }
    }
}

#[async_trait]
impl<D: Directory> Directory for CachedDirectory<D> {
    async fn lookup_by_id(&self, id: &str) -> Result<Option<Person>, DirectoryError> {
        let slot = self.slot(id);
        let person = slot
            .get_or_try_init(|| async {
                self.fetches.fetch_add(1, Ordering::Relaxed);
                self.bounded(id, self.inner.lookup_by_id(id)).await
            })
            .await?;
        Ok(person.clone())
    }

    async fn lookup_by_username(&self, username: &str) -> Result<Vec<Person>, DirectoryError> {
        self.bounded(username, self.inner.lookup_by_username(username))
            .await
    }

    async fn search_principals(&self, titles: &TitleSet) -> Result<Vec<Person>, DirectoryError> {
        let principals = self
            .bounded("principal search", self.inner.search_principals(titles))
            .await?;

        for person in &principals {
            // Already-populated slots keep their value.
            let _ = self.slot(&person.id).set(Some(person.clone()));
        }
        Ok(principals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::SnapshotDirectory;

    /// Directory that answers slowly and counts calls
    struct SlowDirectory {
        inner: SnapshotDirectory,
        delay: Duration,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Directory for SlowDirectory {
        async fn lookup_by_id(&self, id: &str) -> Result<Option<Person>, DirectoryError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.inner.lookup_by_id(id).await
        }

        async fn lookup_by_username(&self, username: &str) -> Result<Vec<Person>, DirectoryError> {
            self.inner.lookup_by_username(username).await
        }

        async fn search_principals(
            &self,
            titles: &TitleSet,
        ) -> Result<Vec<Person>, DirectoryError> {
            self.inner.search_principals(titles).await
        }
    }

    fn slow(delay: Duration) -> SlowDirectory {
        let mut pi = Person::new("cn=pi", "pi");
        pi.title = "Professor".to_string();
        SlowDirectory {
            inner: SnapshotDirectory::from_people([pi, Person::new("cn=s1", "s1")]),
            delay,
            calls: AtomicUsize::new(0),
        }
    }

    #[tokio::test]
    async fn test_concurrent_lookups_share_one_fetch() {
        let cache = CachedDirectory::new(slow(Duration::from_millis(50)), Duration::from_secs(5));

        let (a, b, c) = tokio::join!(
            cache.lookup_by_id("cn=s1"),
            cache.lookup_by_id("cn=s1"),
            cache.lookup_by_id("cn=s1"),
        );

        assert_eq!(a.unwrap().unwrap().username, "s1");
        assert_eq!(b.unwrap(), c.unwrap());
        assert_eq!(cache.fetch_count(), 1);
        assert_eq!(cache.inner.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_not_found_is_cached() {
        let cache = CachedDirectory::new(slow(Duration::ZERO), Duration::from_secs(5));
        assert!(cache.lookup_by_id("cn=ghost").await.unwrap().is_none());
        assert!(cache.lookup_by_id("cn=ghost").await.unwrap().is_none());
        assert_eq!(cache.fetch_count(), 1);
    }

    #[tokio::test]
    async fn test_timeout_is_scoped_to_lookup() {
        let cache =
            CachedDirectory::new(slow(Duration::from_millis(500)), Duration::from_millis(10));

        let err = cache.lookup_by_id("cn=s1").await.unwrap_err();
        assert!(matches!(err, DirectoryError::Timeout { ref key, .. } if key == "cn=s1"));

        // Failures are not cached; the next caller retries.
        let _ = cache.lookup_by_id("cn=s1").await;
        assert_eq!(cache.fetch_count(), 2);
    }

    #[tokio::test]
    async fn test_principal_search_seeds_cache() {
        let cache = CachedDirectory::new(slow(Duration::ZERO), Duration::from_secs(5));
        let titles = TitleSet::new(["Professor"]);

        let principals = cache.search_principals(&titles).await.unwrap();
        assert_eq!(principals.len(), 1);

        let pi = cache.lookup_by_id("cn=pi").await.unwrap().unwrap();
        assert_eq!(pi.username, "pi");
        assert_eq!(cache.fetch_count(), 0);
    }
}
