//! Binary output encoding
//!
//! Serializes a resampled channel matrix plus session metadata into the
//! target analysis tool's binary layout. The layout itself is an external
//! contract consumed as given; see `ld` for the field-by-field description.

pub mod ld;

pub use ld::encode;
