//! Domain Models
//!
//! Core data types for the lab marketplace. All monetary amounts are integer
//! minor-currency units (cents); fee arithmetic lives in [`crate::fee`].

use serde::{Deserialize, Serialize};

/// A sellable catalog item: a bookable lab with a bounded seat count.
///
/// Listings are created and edited in the external content store; this core
/// reads them (fresh or through a bounded-TTL cache) and never writes back.
/// The seat decrement after a completed sale is an automation-side effect.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Listing {
    /// Content-store item id, unique within its collection
    pub id: String,

    /// Display title
    pub title: String,

    /// URL slug, when the collection exposes one
    pub slug: Option<String>,

    /// Processor-side price reference; preferred over the inline amount
    pub price_id: Option<String>,

    /// Inline unit price in minor currency units
    pub price_cents: Option<i64>,

    /// Remaining seat count; `None` means unlimited
    pub seats_remaining: Option<i64>,

    /// Reference to the payee record receiving the destination share
    pub payee_ref: Option<String>,

    /// Redirect target after successful payment (path or absolute URL)
    pub success_path: Option<String>,

    /// Redirect target after a cancelled checkout (path or absolute URL)
    pub cancel_path: Option<String>,
}

impl Listing {
    /// Availability guard: `false` only when a seat count is present and has
    /// reached zero. An absent count means unlimited seats.
    ///
    /// This check and the eventual seat decrement in the content store are
    /// separated by the whole payment flow; [`crate::reservation`] closes
    /// that window.
    pub fn is_available(&self) -> bool {
        match self.seats_remaining {
            Some(n) => n > 0,
            None => true,
        }
    }
}

/// Returns true when `value` is shaped like a processor connected-account id:
/// the `acct_` prefix followed by at least eight ASCII alphanumerics.
pub fn is_connected_account_id(value: &str) -> bool {
    match value.strip_prefix("acct_") {
        Some(rest) => rest.len() >= 8 && rest.chars().all(|c| c.is_ascii_alphanumeric()),
        None => false,
    }
}
