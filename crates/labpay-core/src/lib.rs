//! # labpay-core
//!
//! Domain types and pure policies shared across the labpay workspace:
//! listings and their availability, the marketplace fee policy, and the
//! seat-reservation interface that guards the last-seat race.

pub mod fee;
pub mod model;
pub mod reservation;

pub use fee::{DEFAULT_FEE_PERCENT, FeePolicy};
pub use model::{Listing, is_connected_account_id};
pub use reservation::{MemorySeatLedger, ReservationToken, SeatReservations};
