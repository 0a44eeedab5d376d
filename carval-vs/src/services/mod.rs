//! External service clients

pub mod vin_decoder;

pub use vin_decoder::{DecodeError, VinDecoder};
