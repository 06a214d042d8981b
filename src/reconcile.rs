use std::collections::HashSet;

use crate::backend::MarketplaceBackend;
use crate::cache::{self, CacheStore};
use crate::identity::CanonicalId;
use crate::models::{InterestRecord, InterestStatus};
use crate::notify::Notifier;

/// The single consistent view the rest of the client renders from.
#[derive(Debug, Clone)]
pub struct MergedMatches {
    pub active: Vec<InterestRecord>,
    pub archived: Vec<InterestRecord>,
    /// True when the backend was unreachable and the view was served
    /// entirely from the local cache.
    pub from_cache: bool,
}

impl MergedMatches {
    pub fn empty() -> Self {
        Self {
            active: Vec::new(),
            archived: Vec::new(),
            from_cache: false,
        }
    }
}

#[derive(Debug)]
pub struct MergeResult {
    pub active: Vec<InterestRecord>,
    pub archived: Vec<InterestRecord>,
    pub newly_archived: usize,
}

/// One reconciliation pass over the interest listing.
#[derive(Debug, Default)]
pub struct SyncStats {
    pub fetched: usize,
    pub newly_archived: usize,
    pub from_cache: bool,
}

/// Merge the authoritative interest listing with the cached archived and
/// accepted partitions.
///
/// Precedence, in order: a cached-archived id never re-enters the active
/// set; a cached-accepted id is served as accepted even when the backend
/// still says pending or already says rejected (the cache override keeps
/// a just-confirmed local accept from being undone by backend lag); any
/// remaining backend-rejected record is folded into the archive.
/// Backend duplicates are deduplicated by id, first occurrence wins.
pub fn merge(
    backend_records: Vec<InterestRecord>,
    cached_archived: Vec<InterestRecord>,
    accepted_ids: &HashSet<String>,
) -> MergeResult {
    let mut archived = cached_archived;
    let mut archived_ids: HashSet<String> = archived.iter().map(|r| r.id.clone()).collect();

    let mut seen: HashSet<String> = HashSet::new();
    let mut active = Vec::new();
    let mut newly_archived = 0;

    for mut record in backend_records {
        if !seen.insert(record.id.clone()) {
            continue;
        }
        if archived_ids.contains(&record.id) {
            continue;
        }
        if accepted_ids.contains(&record.id) {
            record.status = InterestStatus::Accepted;
            active.push(record);
            continue;
        }
        if record.status == InterestStatus::Rejected {
            archived_ids.insert(record.id.clone());
            archived.push(record);
            newly_archived += 1;
            continue;
        }
        active.push(record);
    }

    MergeResult {
        active,
        archived,
        newly_archived,
    }
}

/// Fetch, merge, and write the unioned archive back so the next pass does
/// not depend on the backend still reporting old rejections. On fetch
/// failure the view is served entirely from cache: degraded, not down.
pub fn sync(
    backend: &dyn MarketplaceBackend,
    cache: &CacheStore,
    user: &CanonicalId,
    notifier: &mut dyn Notifier,
) -> (MergedMatches, SyncStats) {
    let cached_archived: Vec<InterestRecord> = cache.load(cache::ARCHIVED_MATCHES, user);
    let cached_accepted: Vec<InterestRecord> = cache.load(cache::ACCEPTED_MATCHES, user);
    let accepted_ids: HashSet<String> = cached_accepted.iter().map(|r| r.id.clone()).collect();

    match backend.fetch_interests(user) {
        Ok(records) => {
            let fetched = records.len();
            let result = merge(records, cached_archived, &accepted_ids);
            if result.newly_archived > 0 {
                cache.save(cache::ARCHIVED_MATCHES, user, &result.archived);
            }
            (
                MergedMatches {
                    active: result.active,
                    archived: result.archived,
                    from_cache: false,
                },
                SyncStats {
                    fetched,
                    newly_archived: result.newly_archived,
                    from_cache: false,
                },
            )
        }
        Err(e) => {
            notifier.notify(&format!("{} (showing cached matches)", e));
            let mut active = cached_accepted;
            for record in &mut active {
                record.status = InterestStatus::Accepted;
            }
            (
                MergedMatches {
                    active,
                    archived: cached_archived,
                    from_cache: true,
                },
                SyncStats {
                    from_cache: true,
                    ..SyncStats::default()
                },
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheStore;
    use crate::identity::{RawUser, canonical_id};
    use crate::models::{ApplicationRecord, CompanyProfile, ShortlistEntry};
    use crate::notify::BufferNotifier;
    use anyhow::{Result, anyhow};

    fn record(id: &str, status: InterestStatus) -> InterestRecord {
        InterestRecord {
            id: id.to_string(),
            company: CompanyProfile {
                name: format!("Company {}", id),
                industry: None,
                logo_url: None,
                size: None,
                location: None,
                description: None,
                contact_email: None,
            },
            status,
            skills_required: Vec::new(),
            internship_details: None,
            message: None,
        }
    }

    fn uid(id: &str) -> CanonicalId {
        canonical_id(&RawUser {
            user_id: Some(id.to_string()),
            record_id: None,
            name: None,
        })
        .unwrap()
    }

    fn ids(records: &[InterestRecord]) -> Vec<&str> {
        records.iter().map(|r| r.id.as_str()).collect()
    }

    /// Serves a fixed interest listing, or errors when `interests` is None.
    struct FixedBackend {
        interests: Option<Vec<InterestRecord>>,
    }

    impl MarketplaceBackend for FixedBackend {
        fn fetch_interests(&self, _student: &CanonicalId) -> Result<Vec<InterestRecord>> {
            match &self.interests {
                Some(records) => Ok(records.clone()),
                None => Err(anyhow!("connection refused")),
            }
        }

        fn accept_interest(&self, _company_id: &str) -> Result<()> {
            unreachable!("not exercised by reconciliation tests")
        }

        fn decline_interest(&self, _company_id: &str) -> Result<()> {
            unreachable!("not exercised by reconciliation tests")
        }

        fn add_shortlist(
            &self,
            _company: &CanonicalId,
            _student_id: &str,
            _notes: Option<&str>,
        ) -> Result<ShortlistEntry> {
            unreachable!("not exercised by reconciliation tests")
        }

        fn remove_shortlist(&self, _company: &CanonicalId, _student_id: &str) -> Result<()> {
            unreachable!("not exercised by reconciliation tests")
        }

        fn submit_application(&self, _company_id: &str, _slot_id: &str) -> Result<()> {
            unreachable!("not exercised by reconciliation tests")
        }

        fn fetch_applications(&self, _student: &CanonicalId) -> Result<Vec<ApplicationRecord>> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_pending_record_passes_through() {
        let result = merge(
            vec![record("c1", InterestStatus::Pending)],
            Vec::new(),
            &HashSet::new(),
        );

        assert_eq!(ids(&result.active), vec!["c1"]);
        assert_eq!(result.active[0].status, InterestStatus::Pending);
        assert!(result.archived.is_empty());
        assert_eq!(result.newly_archived, 0);
    }

    #[test]
    fn test_backend_rejection_folds_into_archive() {
        let result = merge(
            vec![record("c1", InterestStatus::Rejected)],
            Vec::new(),
            &HashSet::new(),
        );

        assert!(result.active.is_empty());
        assert_eq!(ids(&result.archived), vec!["c1"]);
        assert_eq!(result.newly_archived, 1);
    }

    #[test]
    fn test_cached_accept_overrides_backend_status() {
        let accepted: HashSet<String> = ["c1".to_string()].into();

        // Backend lag may still report pending, or a race may even report
        // rejected; the cached accept wins either way.
        for backend_status in [InterestStatus::Pending, InterestStatus::Rejected] {
            let result = merge(vec![record("c1", backend_status)], Vec::new(), &accepted);
            assert_eq!(ids(&result.active), vec!["c1"]);
            assert_eq!(result.active[0].status, InterestStatus::Accepted);
            assert!(result.archived.is_empty());
        }
    }

    #[test]
    fn test_archived_id_never_reenters_active() {
        let result = merge(
            vec![record("c1", InterestStatus::Pending)],
            vec![record("c1", InterestStatus::Rejected)],
            &HashSet::new(),
        );

        assert!(result.active.is_empty());
        assert_eq!(ids(&result.archived), vec!["c1"]);
        assert_eq!(result.newly_archived, 0);
    }

    #[test]
    fn test_backend_duplicates_deduplicated_by_id() {
        let result = merge(
            vec![
                record("c1", InterestStatus::Pending),
                record("c1", InterestStatus::Pending),
                record("c2", InterestStatus::Pending),
            ],
            Vec::new(),
            &HashSet::new(),
        );

        assert_eq!(ids(&result.active), vec!["c1", "c2"]);
    }

    #[test]
    fn test_sync_writes_archive_back() {
        let store = CacheStore::open_in_memory().unwrap();
        let user = uid("s1");
        let backend = FixedBackend {
            interests: Some(vec![record("c1", InterestStatus::Rejected)]),
        };
        let mut notifier = BufferNotifier::new();

        let (matches, stats) = sync(&backend, &store, &user, &mut notifier);

        assert!(matches.active.is_empty());
        assert_eq!(ids(&matches.archived), vec!["c1"]);
        assert_eq!(stats.newly_archived, 1);

        let persisted: Vec<InterestRecord> = store.load(cache::ARCHIVED_MATCHES, &user);
        assert_eq!(ids(&persisted), vec!["c1"]);
    }

    #[test]
    fn test_second_pass_is_stable() {
        let store = CacheStore::open_in_memory().unwrap();
        let user = uid("s1");
        let backend = FixedBackend {
            interests: Some(vec![record("c1", InterestStatus::Rejected)]),
        };
        let mut notifier = BufferNotifier::new();

        let (_, first) = sync(&backend, &store, &user, &mut notifier);
        let (matches, second) = sync(&backend, &store, &user, &mut notifier);

        assert_eq!(first.newly_archived, 1);
        assert_eq!(second.newly_archived, 0);
        assert!(matches.active.is_empty());
        assert_eq!(ids(&matches.archived), vec!["c1"]);
    }

    #[test]
    fn test_fetch_failure_serves_cache_and_notifies() {
        let store = CacheStore::open_in_memory().unwrap();
        let user = uid("s1");
        store.save(
            cache::ACCEPTED_MATCHES,
            &user,
            &[record("c1", InterestStatus::Accepted)],
        );
        store.save(
            cache::ARCHIVED_MATCHES,
            &user,
            &[record("c2", InterestStatus::Rejected)],
        );

        let backend = FixedBackend { interests: None };
        let mut notifier = BufferNotifier::new();
        let handle = notifier.handle();

        let (matches, stats) = sync(&backend, &store, &user, &mut notifier);

        assert!(matches.from_cache);
        assert!(stats.from_cache);
        assert_eq!(ids(&matches.active), vec!["c1"]);
        assert_eq!(matches.active[0].status, InterestStatus::Accepted);
        assert_eq!(ids(&matches.archived), vec!["c2"]);
        assert_eq!(handle.borrow().len(), 1);
        assert!(handle.borrow()[0].contains("connection refused"));
    }
}
