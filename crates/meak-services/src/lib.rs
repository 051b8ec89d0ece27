//! Typed access to the Meak tables.
//!
//! Each service wraps a shared [`TableBackend`](meak_transport::TableBackend)
//! and turns rows into the types from `meak-protocol`:
//!
//! - [`ProfilesService`]: read and upsert `profiles`
//! - [`BookingsService`]: the `tasks` a client booked or a provider works on
//! - [`ProvidersService`]: provider lookup, search and `reviews` ratings

mod bookings;
mod error;
mod profiles;
mod providers;
mod rows;

pub use bookings::{BookingsService, NewTask};
pub use error::RemoteError;
pub use profiles::{ProfileUpdate, ProfilesService};
pub use providers::{ProviderRating, ProviderSearch, ProvidersService, SEARCH_CONFIG};
