//! Sending and receiving files through secretshare.
//!
//! A sender encrypts a file under a fresh key, uploads the ciphertext to a
//! bucket through URLs handed out by the secretshare server, and gives the key
//! to the receiver over some other channel. The receiver recomputes the
//! object's location from the key and downloads it directly from the bucket.

pub mod client;
pub mod config;
pub mod crypto;
pub mod error;
pub mod receive;
pub mod share;

#[cfg(test)]
mod testing;

pub use secretshare_protocol as protocol;
