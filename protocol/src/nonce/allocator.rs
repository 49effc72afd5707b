//! Per-account nonce allocation with optimistic reservations.
//!
//! The allocator is the only shared mutable state in the process. The
//! generator task and every faucet request task call [`NonceAllocator::reserve`]
//! concurrently; all mutations of an account's counter happen under one
//! `parking_lot::Mutex`, and the guard never lives across an `.await`.
//!
//! ## Protocol
//!
//! 1. `reserve` hands out the next nonce and advances the counter *before*
//!    the transaction is submitted.
//! 2. The caller resolves the [`Reservation`] exactly once: `commit` when the
//!    node accepted the transaction, `rollback` when building or submitting
//!    failed.
//! 3. A rolled-back nonce is the next one handed out for that account.
//!
//! When the rolled-back nonce is the most recent one issued, the counter just
//! steps back. When later nonces are still outstanding (a faucet request in
//! flight while the generator's submission failed), the nonce is parked in a
//! released set and reissued, lowest first, before the counter advances.
//! Either way no value is issued twice while it is still held.

use parking_lot::Mutex;
use std::collections::{BTreeSet, HashMap};
use std::fmt;

use super::{NonceSource, PrimeError};

#[derive(Debug, Default)]
struct AccountNonces {
    /// Lowest value never handed out.
    next: u64,
    /// Values below `next` that were rolled back and not yet reissued.
    released: BTreeSet<u64>,
}

impl AccountNonces {
    fn starting_at(next: u64) -> Self {
        Self {
            next,
            released: BTreeSet::new(),
        }
    }

    fn take(&mut self) -> Option<u64> {
        if let Some(nonce) = self.released.pop_first() {
            return Some(nonce);
        }
        let nonce = self.next;
        self.next = nonce.checked_add(1)?;
        Some(nonce)
    }

    fn give_back(&mut self, nonce: u64) {
        if nonce >= self.next {
            return;
        }
        if nonce + 1 == self.next {
            self.next = nonce;
            // Collapse any parked values that are now at the top.
            while self.next > 0 && self.released.remove(&(self.next - 1)) {
                self.next -= 1;
            }
        } else {
            self.released.insert(nonce);
        }
    }

    fn peek(&self) -> u64 {
        self.released.first().copied().unwrap_or(self.next)
    }
}

/// Hands out unique sequence numbers per account.
///
/// Owned service object: callers only see `prime`, `reserve`, and the
/// reservation's resolve methods. The underlying map is never exposed.
#[derive(Default)]
pub struct NonceAllocator {
    accounts: Mutex<HashMap<String, AccountNonces>>,
}

impl NonceAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds every account from the node's committed nonce, one at a time.
    ///
    /// The local counter starts at `committed + 1`. The first failure aborts
    /// priming: an account that was never primed can't be given safe nonces,
    /// so the caller should treat the error as fatal.
    pub async fn prime<S>(&self, source: &S, accounts: &[String]) -> Result<(), PrimeError>
    where
        S: NonceSource + ?Sized,
    {
        for account in accounts {
            let committed = source
                .committed_nonce(account)
                .await
                .map_err(|source| PrimeError::Fetch {
                    account: account.clone(),
                    source,
                })?;
            let next = committed.checked_add(1).ok_or_else(|| PrimeError::Exhausted {
                account: account.clone(),
            })?;

            self.seed(account, next);
            tracing::info!(account = %account, committed, next, "nonce primed");
        }
        Ok(())
    }

    /// Sets an account's next nonce directly, discarding any previous state.
    pub fn seed(&self, account: &str, next: u64) {
        self.accounts
            .lock()
            .insert(account.to_string(), AccountNonces::starting_at(next));
    }

    /// Reserves the next nonce for `account`.
    ///
    /// Returns `None` if the account was never primed (or its counter is
    /// exhausted). The caller must skip the transaction rather than guess.
    pub fn reserve(&self, account: &str) -> Option<Reservation<'_>> {
        let nonce = {
            let mut accounts = self.accounts.lock();
            accounts.get_mut(account)?.take()?
        };
        tracing::trace!(account, nonce, "nonce reserved");
        Some(Reservation {
            allocator: self,
            account: account.to_string(),
            nonce,
            resolved: false,
        })
    }

    /// The value the next `reserve` for `account` would return.
    pub fn peek(&self, account: &str) -> Option<u64> {
        self.accounts.lock().get(account).map(AccountNonces::peek)
    }

    fn release(&self, account: &str, nonce: u64) {
        if let Some(state) = self.accounts.lock().get_mut(account) {
            state.give_back(nonce);
        }
        tracing::debug!(account, nonce, "nonce released for reuse");
    }
}

impl fmt::Debug for NonceAllocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NonceAllocator")
            .field("accounts", &self.accounts.lock().len())
            .finish()
    }
}

/// A provisional claim on one nonce.
///
/// Resolving consumes the reservation, so resolving twice does not compile.
/// Dropping it unresolved (for example when a faucet request is cancelled
/// mid-submission) rolls the nonce back and logs a warning.
#[must_use = "a reservation must be committed or rolled back"]
pub struct Reservation<'a> {
    allocator: &'a NonceAllocator,
    account: String,
    nonce: u64,
    resolved: bool,
}

impl Reservation<'_> {
    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    pub fn account(&self) -> &str {
        &self.account
    }

    /// The transaction was accepted; the nonce stays consumed.
    pub fn commit(self) {
        self.resolve(true);
    }

    /// The transaction was not accepted; the nonce goes back to the pool.
    pub fn rollback(self) {
        self.resolve(false);
    }

    /// Resolves by submission outcome.
    pub fn resolve(mut self, success: bool) {
        self.resolved = true;
        if !success {
            self.allocator.release(&self.account, self.nonce);
        }
    }
}

impl Drop for Reservation<'_> {
    fn drop(&mut self) {
        if !self.resolved {
            tracing::warn!(
                account = %self.account,
                nonce = self.nonce,
                "reservation dropped without being resolved, rolling back"
            );
            self.allocator.release(&self.account, self.nonce);
        }
    }
}

impl fmt::Debug for Reservation<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reservation")
            .field("account", &self.account)
            .field("nonce", &self.nonce)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::NodeError;
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::Arc;

    fn primed(account: &str, next: u64) -> NonceAllocator {
        let alloc = NonceAllocator::new();
        alloc.seed(account, next);
        alloc
    }

    struct FixedSource(HashMap<String, u64>);

    #[async_trait]
    impl NonceSource for FixedSource {
        async fn committed_nonce(&self, account: &str) -> Result<u64, NodeError> {
            self.0
                .get(account)
                .copied()
                .ok_or(NodeError::UnexpectedStatus(404))
        }
    }

    #[test]
    fn unprimed_account_is_unavailable() {
        let alloc = NonceAllocator::new();
        assert!(alloc.reserve("ghost").is_none());
        assert_eq!(alloc.peek("ghost"), None);
    }

    #[test]
    fn sequential_commits_have_no_gaps() {
        let alloc = primed("a", 5);
        let got: Vec<u64> = (0..4)
            .map(|_| {
                let r = alloc.reserve("a").unwrap();
                let n = r.nonce();
                r.commit();
                n
            })
            .collect();
        assert_eq!(got, vec![5, 6, 7, 8]);
        assert_eq!(alloc.peek("a"), Some(9));
    }

    #[test]
    fn rollback_reissues_same_nonce() {
        let alloc = primed("a", 5);
        let r = alloc.reserve("a").unwrap();
        assert_eq!(r.nonce(), 5);
        r.rollback();

        let r = alloc.reserve("a").unwrap();
        assert_eq!(r.nonce(), 5);
        r.commit();
        assert_eq!(alloc.reserve("a").unwrap().nonce(), 6);
    }

    #[test]
    fn rollback_behind_outstanding_reservation_is_parked() {
        let alloc = primed("a", 5);
        let r5 = alloc.reserve("a").unwrap();
        let r6 = alloc.reserve("a").unwrap();
        let r7 = alloc.reserve("a").unwrap();

        r5.commit();
        r6.rollback();
        r7.commit();

        // 6 comes back first, then the counter resumes at 8.
        let again = alloc.reserve("a").unwrap();
        assert_eq!(again.nonce(), 6);
        again.commit();
        let next = alloc.reserve("a").unwrap();
        assert_eq!(next.nonce(), 8);
        next.commit();
    }

    #[test]
    fn parked_values_collapse_when_top_rolls_back() {
        let alloc = primed("a", 10);
        let r10 = alloc.reserve("a").unwrap();
        let r11 = alloc.reserve("a").unwrap();
        let r12 = alloc.reserve("a").unwrap();

        r11.rollback();
        r12.rollback();
        assert_eq!(alloc.peek("a"), Some(11));

        r10.rollback();
        assert_eq!(alloc.peek("a"), Some(10));
        assert_eq!(alloc.reserve("a").unwrap().nonce(), 10);
    }

    #[test]
    fn dropped_reservation_rolls_back() {
        let alloc = primed("a", 3);
        {
            let _r = alloc.reserve("a").unwrap();
        }
        assert_eq!(alloc.peek("a"), Some(3));
    }

    #[test]
    fn accounts_are_independent() {
        let alloc = NonceAllocator::new();
        alloc.seed("a", 1);
        alloc.seed("b", 100);

        let ra = alloc.reserve("a").unwrap();
        let rb = alloc.reserve("b").unwrap();
        assert_eq!((ra.nonce(), rb.nonce()), (1, 100));
        ra.rollback();
        rb.commit();
        assert_eq!(alloc.peek("a"), Some(1));
        assert_eq!(alloc.peek("b"), Some(101));
    }

    #[test]
    fn exhausted_counter_is_unavailable() {
        let alloc = primed("a", u64::MAX);
        assert!(alloc.reserve("a").is_none());
    }

    #[test]
    fn concurrent_reserves_are_distinct_and_contiguous() {
        const THREADS: usize = 8;
        const PER_THREAD: usize = 250;

        let alloc = Arc::new(primed("a", 1_000));
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let alloc = Arc::clone(&alloc);
                std::thread::spawn(move || {
                    (0..PER_THREAD)
                        .map(|_| {
                            let r = alloc.reserve("a").unwrap();
                            let n = r.nonce();
                            r.commit();
                            n
                        })
                        .collect::<Vec<u64>>()
                })
            })
            .collect();

        let all: Vec<u64> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        let unique: HashSet<u64> = all.iter().copied().collect();

        assert_eq!(all.len(), THREADS * PER_THREAD);
        assert_eq!(unique.len(), all.len(), "a nonce was handed out twice");
        let expected: HashSet<u64> = (1_000..1_000 + (THREADS * PER_THREAD) as u64).collect();
        assert_eq!(unique, expected);
    }

    #[test]
    fn concurrent_rollbacks_never_duplicate_committed_nonces() {
        let alloc = Arc::new(primed("a", 0));
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let alloc = Arc::clone(&alloc);
                std::thread::spawn(move || {
                    let mut committed = Vec::new();
                    for i in 0..200 {
                        let r = alloc.reserve("a").unwrap();
                        if (i + t) % 3 == 0 {
                            r.rollback();
                        } else {
                            committed.push(r.nonce());
                            r.commit();
                        }
                    }
                    committed
                })
            })
            .collect();

        let committed: Vec<u64> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        let unique: HashSet<u64> = committed.iter().copied().collect();
        assert_eq!(unique.len(), committed.len());
    }

    #[tokio::test]
    async fn prime_sets_counter_past_committed() {
        let source = FixedSource(HashMap::from([("a".to_string(), 4), ("b".to_string(), 0)]));
        let alloc = NonceAllocator::new();
        alloc
            .prime(&source, &["a".to_string(), "b".to_string()])
            .await
            .unwrap();
        assert_eq!(alloc.peek("a"), Some(5));
        assert_eq!(alloc.peek("b"), Some(1));
    }

    #[tokio::test]
    async fn prime_fails_on_any_account() {
        let source = FixedSource(HashMap::from([("a".to_string(), 4)]));
        let alloc = NonceAllocator::new();
        let err = alloc
            .prime(&source, &["a".to_string(), "missing".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err, PrimeError::Fetch { ref account, .. } if account == "missing"));
        assert_eq!(alloc.peek("missing"), None);
    }

    #[tokio::test]
    async fn prime_rejects_exhausted_counter() {
        let source = FixedSource(HashMap::from([("a".to_string(), u64::MAX)]));
        let alloc = NonceAllocator::new();
        let err = alloc.prime(&source, &["a".to_string()]).await.unwrap_err();
        assert!(matches!(err, PrimeError::Exhausted { .. }));
    }
}
