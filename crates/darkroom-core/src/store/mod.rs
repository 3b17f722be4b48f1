//! Object store gateway: the only component that touches durable storage.
//!
//! - **gateway**: the [`ObjectGateway`] trait and its result types
//! - **object**: [`ObjectStoreGateway`], the `object_store`-backed implementation

mod gateway;
mod object;
#[cfg(test)]
pub(crate) mod testing;

pub use gateway::{FetchedObject, ObjectGateway};
pub use object::ObjectStoreGateway;
