//! Seat Reservations
//!
//! The availability check in [`crate::model::Listing::is_available`] and the
//! eventual seat decrement in the content store are separated by the whole
//! payment flow (session creation, the buyer's time to pay, the automation
//! step that writes the decrement), so two buyers can race for the last seat.
//!
//! A reservation places a short-lived hold between the check and the
//! settlement commit, turning check-then-sell into an atomic step within this
//! process. Holds expire when a checkout is abandoned; commits keep shadowing
//! the seat for one catalog-cache TTL, which is exactly the window in which a
//! cached listing may still show the pre-sale count.
//!
//! [`MemorySeatLedger`] serializes reservations per listing id under a single
//! lock. Multi-instance deployments need an implementation backed by an
//! upstream transactional counter behind the same trait.

use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Opaque handle for one held seat.
///
/// The token travels in checkout-session metadata so the settlement path can
/// commit the matching hold.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReservationToken(String);

impl ReservationToken {
    /// Generate a fresh token.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }

    /// Parse from a string (e.g. out of session metadata).
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the token as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReservationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Seat accounting for the window between availability check and settlement.
#[async_trait]
pub trait SeatReservations: Send + Sync {
    /// Hold one seat. Returns `None` when the listing is sold out once
    /// active holds and recent commits are counted against `seats_remaining`.
    /// An absent seat count means unlimited and always grants.
    async fn reserve(
        &self,
        listing_id: &str,
        seats_remaining: Option<i64>,
    ) -> Option<ReservationToken>;

    /// Release a hold without a sale (checkout failed or was abandoned).
    async fn release(&self, listing_id: &str, token: &ReservationToken);

    /// Convert a hold into a committed sale at settlement time. Unknown or
    /// expired tokens still count: the seat was sold regardless.
    async fn commit(&self, listing_id: &str, token: &ReservationToken);
}

/// Per-listing hold and commit state.
#[derive(Default)]
struct ListingSeats {
    /// Active holds, each with its expiry instant
    holds: HashMap<ReservationToken, Instant>,

    /// Expiry instants of recently committed sales
    committed: Vec<Instant>,
}

impl ListingSeats {
    fn prune(&mut self, now: Instant) {
        self.holds.retain(|_, expires| *expires > now);
        self.committed.retain(|expires| *expires > now);
    }

    fn taken(&self) -> i64 {
        (self.holds.len() + self.committed.len()) as i64
    }

    fn is_empty(&self) -> bool {
        self.holds.is_empty() && self.committed.is_empty()
    }
}

/// Process-local seat ledger.
pub struct MemorySeatLedger {
    /// How long a hold survives an abandoned checkout
    hold_ttl: Duration,

    /// How long a committed sale keeps shadowing the (possibly stale)
    /// upstream seat count; set this to the catalog cache TTL
    commit_shadow: Duration,

    listings: Mutex<HashMap<String, ListingSeats>>,
}

impl MemorySeatLedger {
    pub fn new(hold_ttl: Duration, commit_shadow: Duration) -> Self {
        Self {
            hold_ttl,
            commit_shadow,
            listings: Mutex::new(HashMap::new()),
        }
    }

    /// 30-minute holds, 5-minute commit shadow (the default catalog TTL).
    pub fn with_defaults() -> Self {
        Self::new(Duration::from_secs(30 * 60), Duration::from_secs(5 * 60))
    }
}

#[async_trait]
impl SeatReservations for MemorySeatLedger {
    async fn reserve(
        &self,
        listing_id: &str,
        seats_remaining: Option<i64>,
    ) -> Option<ReservationToken> {
        let now = Instant::now();
        let mut listings = self.listings.lock().unwrap();
        let seats = listings.entry(listing_id.to_string()).or_default();
        seats.prune(now);

        if let Some(remaining) = seats_remaining {
            if seats.taken() >= remaining {
                tracing::debug!(listing_id = %listing_id, remaining, "seat hold denied");
                return None;
            }
        }

        let token = ReservationToken::generate();
        seats.holds.insert(token.clone(), now + self.hold_ttl);
        tracing::debug!(listing_id = %listing_id, token = %token, "seat hold granted");
        Some(token)
    }

    async fn release(&self, listing_id: &str, token: &ReservationToken) {
        let mut listings = self.listings.lock().unwrap();
        if let Some(seats) = listings.get_mut(listing_id) {
            seats.holds.remove(token);
            if seats.is_empty() {
                listings.remove(listing_id);
            }
            tracing::debug!(listing_id = %listing_id, token = %token, "seat hold released");
        }
    }

    async fn commit(&self, listing_id: &str, token: &ReservationToken) {
        let now = Instant::now();
        let mut listings = self.listings.lock().unwrap();
        let seats = listings.entry(listing_id.to_string()).or_default();
        seats.prune(now);
        seats.holds.remove(token);
        seats.committed.push(now + self.commit_shadow);
        tracing::debug!(listing_id = %listing_id, token = %token, "seat commit recorded");
    }
}
