use std::collections::HashSet;

use crate::backend::MarketplaceBackend;
use crate::cache::{self, CacheStore};
use crate::identity::CanonicalId;
use crate::models::{InterestRecord, InterestStatus, ShortlistEntry};
use crate::notify::Notifier;
use crate::reconcile::{self, MergedMatches, SyncStats};

/// Result of a student-driven accept/decline transition.
///
/// Accept and decline update local state before the backend confirms and
/// do not roll back on failure, so the caller learns which of the two it
/// got instead of a bare success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The backend confirmed the transition.
    Confirmed,
    /// Local state was updated but the backend call failed; the view is
    /// ahead of the backend until a later pass catches it up.
    OptimisticPending,
}

/// Result of an application submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Submitted,
    /// Short-circuited by the local applied-set; no backend call is made.
    AlreadyApplied,
    /// Backend rejected or was unreachable; nothing was recorded.
    Failed,
}

/// Tracks the lifecycle of interest matches, applications, and shortlist
/// entries for one signed-in user, keeping the local cache and the
/// backend as close as the failure mode of the moment allows.
///
/// Transition rules:
/// - `accept`/`decline` are optimistic: cache and view first, backend
///   second, no rollback.
/// - `shortlist_toggle` and `apply_slot` are confirm-first: local state
///   changes only after the backend says yes, so those can never show a
///   false-positive committed state.
pub struct MatchSession<'a> {
    user: CanonicalId,
    backend: &'a dyn MarketplaceBackend,
    cache: &'a CacheStore,
    notifier: Box<dyn Notifier>,
    matches: MergedMatches,
    applied: HashSet<String>,
    shortlist: Vec<ShortlistEntry>,
}

impl<'a> MatchSession<'a> {
    pub fn new(
        user: CanonicalId,
        backend: &'a dyn MarketplaceBackend,
        cache: &'a CacheStore,
        notifier: Box<dyn Notifier>,
    ) -> Self {
        Self {
            user,
            backend,
            cache,
            notifier,
            matches: MergedMatches::empty(),
            applied: HashSet::new(),
            shortlist: Vec::new(),
        }
    }

    pub fn user(&self) -> &CanonicalId {
        &self.user
    }

    pub fn matches(&self) -> &MergedMatches {
        &self.matches
    }

    pub fn applied(&self) -> &HashSet<String> {
        &self.applied
    }

    pub fn shortlist(&self) -> &[ShortlistEntry] {
        &self.shortlist
    }

    /// Look up a match in either partition, active first.
    pub fn find(&self, interest_id: &str) -> Option<&InterestRecord> {
        self.matches
            .active
            .iter()
            .chain(self.matches.archived.iter())
            .find(|r| r.id == interest_id)
    }

    /// Reconcile interests with the backend and seed the applied-set and
    /// shortlist replica. The applied-set is unioned, never replaced: an
    /// application recorded this session stays recorded even when the
    /// backend listing lags behind.
    pub fn refresh(&mut self) -> SyncStats {
        let (matches, stats) =
            reconcile::sync(self.backend, self.cache, &self.user, self.notifier.as_mut());
        self.matches = matches;

        let cached: Vec<String> = self.cache.load(cache::APPLIED_SLOTS, &self.user);
        self.applied.extend(cached);
        match self.backend.fetch_applications(&self.user) {
            Ok(records) => {
                self.applied.extend(records.into_iter().map(|r| r.slot_id));
                let slots: Vec<String> = self.applied.iter().cloned().collect();
                self.cache.save(cache::APPLIED_SLOTS, &self.user, &slots);
            }
            Err(e) => {
                self.notifier
                    .notify(&format!("{} (using cached application list)", e));
            }
        }

        self.shortlist = self.cache.load(cache::SHORTLIST, &self.user);
        stats
    }

    /// Accept a company's interest. Optimistic: the active view and the
    /// cached accepted-set change immediately; the backend call only
    /// decides whether the result is confirmed or still pending. Replaying
    /// an accept re-issues the backend call and overwrites the cache entry
    /// with itself.
    ///
    /// Returns `None` when no active match carries this id.
    pub fn accept(&mut self, interest_id: &str) -> Option<Outcome> {
        let record = self
            .matches
            .active
            .iter_mut()
            .find(|r| r.id == interest_id)?;
        record.status = InterestStatus::Accepted;
        let snapshot = record.clone();

        let mut accepted: Vec<InterestRecord> = self.cache.load(cache::ACCEPTED_MATCHES, &self.user);
        accepted.retain(|r| r.id != snapshot.id);
        accepted.push(snapshot);
        self.cache.save(cache::ACCEPTED_MATCHES, &self.user, &accepted);

        match self.backend.accept_interest(interest_id) {
            Ok(()) => Some(Outcome::Confirmed),
            Err(e) => {
                self.notifier.notify(&e.to_string());
                Some(Outcome::OptimisticPending)
            }
        }
    }

    /// Decline a company's interest: the record leaves the active set
    /// entirely and lands in the archive. Same optimistic contract as
    /// `accept`. Declining an already-archived id is a replay and only
    /// re-issues the backend call.
    ///
    /// Returns `None` when the id matches neither partition.
    pub fn decline(&mut self, interest_id: &str) -> Option<Outcome> {
        let record = if let Some(i) = self.matches.active.iter().position(|r| r.id == interest_id) {
            let mut record = self.matches.active.remove(i);
            record.status = InterestStatus::Rejected;
            record
        } else if let Some(record) = self.matches.archived.iter().find(|r| r.id == interest_id) {
            record.clone()
        } else {
            return None;
        };

        if !self.matches.archived.iter().any(|r| r.id == record.id) {
            self.matches.archived.push(record);
        }
        self.cache
            .save(cache::ARCHIVED_MATCHES, &self.user, &self.matches.archived);

        match self.backend.decline_interest(interest_id) {
            Ok(()) => Some(Outcome::Confirmed),
            Err(e) => {
                self.notifier.notify(&e.to_string());
                Some(Outcome::OptimisticPending)
            }
        }
    }

    /// Toggle a student on the company's shortlist. Unlike accept/decline
    /// this waits for backend confirmation before touching any local
    /// state: toggling is reversible and cheap to retry, so correctness
    /// wins over perceived latency.
    ///
    /// Returns the new membership, or `None` when the backend call failed
    /// and nothing changed.
    pub fn shortlist_toggle(&mut self, student_id: &str, notes: Option<&str>) -> Option<bool> {
        match self
            .shortlist
            .iter()
            .position(|e| e.student_id == student_id)
        {
            Some(i) => match self.backend.remove_shortlist(&self.user, student_id) {
                Ok(()) => {
                    self.shortlist.remove(i);
                    self.cache.save(cache::SHORTLIST, &self.user, &self.shortlist);
                    Some(false)
                }
                Err(e) => {
                    self.notifier.notify(&e.to_string());
                    None
                }
            },
            None => match self.backend.add_shortlist(&self.user, student_id, notes) {
                Ok(entry) => {
                    self.shortlist.push(entry);
                    self.cache.save(cache::SHORTLIST, &self.user, &self.shortlist);
                    Some(true)
                }
                Err(e) => {
                    self.notifier.notify(&e.to_string());
                    None
                }
            },
        }
    }

    /// Apply for a company's internship slot. Applying is presented as
    /// irreversible, so there is no optimistic add: membership is recorded
    /// only after the backend accepts, and an existing membership
    /// short-circuits without any network call.
    pub fn apply_slot(&mut self, company_id: &str, slot_id: &str) -> ApplyOutcome {
        if self.applied.contains(slot_id) {
            return ApplyOutcome::AlreadyApplied;
        }

        match self.backend.submit_application(company_id, slot_id) {
            Ok(()) => {
                self.applied.insert(slot_id.to_string());
                let slots: Vec<String> = self.applied.iter().cloned().collect();
                self.cache.save(cache::APPLIED_SLOTS, &self.user, &slots);
                ApplyOutcome::Submitted
            }
            Err(e) => {
                self.notifier.notify(&e.to_string());
                ApplyOutcome::Failed
            }
        }
    }
}
