//! # Remote Memory Access
//!
//! The stream-shaped view onto device memory and the range checks guarding it.
//!
//! ## Components
//! - **Stream**: [`MemoryStream`], cursor plus chunked read/write engines
//! - **Validator**: [`AddressValidator`] and the [`RegionMap`] implementation

pub mod stream;
pub mod validator;


pub use stream::{MemoryStream, SeekOrigin, XBE_HEADER_ADDRESS};
pub use validator::{AddressValidator, AllowAll, MemoryRegion, RegionMap};
