//! Cardsync Trello - Card store over the Trello REST API
//!
//! Requests are issued one at a time with a minimum interval between them,
//! and oversized text is reported as a payload error before it is sent.

mod board;
mod client;
mod error;
mod models;

pub use board::TrelloBoard;
pub use client::TrelloClient;
pub use error::{Error, Result};
