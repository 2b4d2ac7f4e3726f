//! Cardmarket module - client and payload normalisation for the articles API

pub mod messages;
pub mod parser;
pub mod rest;

pub use rest::CardmarketRestClient;
