use std::collections::HashSet;
use std::fmt;
use std::ops::RangeInclusive;
use std::sync::Mutex;

use crate::id::Pt;

/// Payload identifiers 96–127 are used for payloads defined dynamically during a session.
pub const DYNAMIC_PT_RANGE: RangeInclusive<u8> = 96..=127;

/// Hands out dynamic payload type numbers.
///
/// A handler asks for a number each time a format without a static assignment
/// is registered. One manager can serve several handlers (and sessions), so
/// implementations take `&self` and must do their own locking.
///
/// Numbers are held in shares. A number stays taken until every share given
/// out by [`allocate`][PayloadManager::allocate] and
/// [`register`][PayloadManager::register] has been released.
pub trait PayloadManager: fmt::Debug + Send + Sync {
    /// Claim a free number, avoiding anything in `used`.
    ///
    /// `None` when the range is exhausted.
    fn allocate(&self, used: &HashSet<Pt>) -> Option<Pt>;

    /// Take a share of a specific number, i.e. one imposed by a remote offer.
    ///
    /// The number may already be held by others. `false` if it is out of
    /// range, in which case there is nothing to release later.
    fn register(&self, pt: Pt) -> bool;

    /// Give back one share of a number.
    fn release(&self, pt: Pt);
}

pub(crate) trait Claimed {
    fn claim(&mut self, pt: Pt);
    fn unclaim(&mut self, pt: Pt);
    fn is_claimed(&self, pt: Pt) -> bool;
    fn find_unclaimed(&self, range: &RangeInclusive<u8>, used: &HashSet<Pt>) -> Option<Pt>;
}

impl Claimed for [u16; 128] {
    fn claim(&mut self, pt: Pt) {
        let idx = *pt as usize;
        self[idx] = self[idx].saturating_add(1);
    }

    fn unclaim(&mut self, pt: Pt) {
        let idx = *pt as usize;
        self[idx] = self[idx].saturating_sub(1);
    }

    fn is_claimed(&self, pt: Pt) -> bool {
        self[*pt as usize] > 0
    }

    fn find_unclaimed(&self, range: &RangeInclusive<u8>, used: &HashSet<Pt>) -> Option<Pt> {
        range
            .clone()
            .map(Pt::from)
            .find(|pt| !self.is_claimed(*pt) && !used.contains(pt))
    }
}

/// Allocates lowest-first out of a range, keeping track of what it handed out.
pub struct DynamicPayloadManager {
    range: RangeInclusive<u8>,
    // Number of shares held per PT, 0-127.
    claimed: Mutex<[u16; 128]>,
}

impl DynamicPayloadManager {
    /// Manager for the RFC 3551 dynamic range, `96..=127`.
    pub fn new() -> Self {
        Self::with_range(DYNAMIC_PT_RANGE)
    }

    /// Manager for a custom range. The end is clamped to 127.
    pub fn with_range(range: RangeInclusive<u8>) -> Self {
        let end = (*range.end()).min(127);
        DynamicPayloadManager {
            range: *range.start()..=end,
            claimed: Mutex::new([0; 128]),
        }
    }

    pub fn range(&self) -> &RangeInclusive<u8> {
        &self.range
    }

    /// Whether anyone holds a share of `pt`.
    pub fn is_claimed(&self, pt: Pt) -> bool {
        self.range.contains(&*pt) && self.with_claimed(|c| c.is_claimed(pt))
    }

    fn with_claimed<T>(&self, f: impl FnOnce(&mut [u16; 128]) -> T) -> T {
        let mut lock = self.claimed.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut lock)
    }
}

impl Default for DynamicPayloadManager {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for DynamicPayloadManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let claimed = self.with_claimed(|c| c.iter().filter(|v| **v > 0).count());
        f.debug_struct("DynamicPayloadManager")
            .field("range", &self.range)
            .field("claimed", &claimed)
            .finish()
    }
}

impl PayloadManager for DynamicPayloadManager {
    fn allocate(&self, used: &HashSet<Pt>) -> Option<Pt> {
        self.with_claimed(|claimed| {
            let pt = claimed.find_unclaimed(&self.range, used)?;
            claimed.claim(pt);
            trace!("Allocated dynamic PT {}", pt);
            Some(pt)
        })
    }

    fn register(&self, pt: Pt) -> bool {
        if !self.range.contains(&*pt) {
            return false;
        }
        self.with_claimed(|claimed| claimed.claim(pt));
        true
    }

    fn release(&self, pt: Pt) {
        if !self.range.contains(&*pt) {
            return;
        }
        self.with_claimed(|claimed| claimed.unclaim(pt));
    }
}
