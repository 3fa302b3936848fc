//! Streaming codec (C5): encode/decode a [`crate::value::Value`] against a
//! validated [`crate::schema::Schema`].

pub mod decoder;
pub mod encoder;

pub use decoder::{decode, decode_root};
pub use encoder::{encode, encode_root};
