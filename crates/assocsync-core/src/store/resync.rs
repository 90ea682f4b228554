use std::sync::atomic::{AtomicU64, Ordering};

///
/// ResyncTickets
///
/// Generation counter for collection reads. A read result may be applied
/// only if its ticket is newer than the last applied one; invalidation
/// retires every ticket issued so far.
///

#[derive(Debug, Default)]
pub(crate) struct ResyncTickets {
    issued: AtomicU64,
    applied: AtomicU64,
}

impl ResyncTickets {
    pub(crate) fn issue(&self) -> u64 {
        self.issued.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Claim `ticket` for publishing. Fails if a newer result already won.
    pub(crate) fn try_apply(&self, ticket: u64) -> bool {
        self.applied
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |applied| {
                (ticket > applied).then_some(ticket)
            })
            .is_ok()
    }

    /// Retire every in-flight ticket.
    pub(crate) fn invalidate(&self) {
        let issued = self.issued.load(Ordering::Acquire);
        self.applied.fetch_max(issued, Ordering::AcqRel);
    }
}
