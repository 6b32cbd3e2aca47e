#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![forbid(unsafe_code)]

//! In-memory adapters for the store and provider ports.

mod provider;
mod store;

pub use provider::{InMemoryCalendarProvider, InjectedFailure, ProviderCall, ProviderOperation};
pub use store::InMemoryStore;
