//! # Session Relay Server Library
//!
//! This library provides the relay server for the multiplayer free-roam
//! racing session. It owns the authoritative participant roster and the
//! session-wide jump records, and fans every accepted client update out
//! to the rest of the session.
//!
//! ## Core Responsibilities
//!
//! ### Session Registry
//! Tracks who is connected, under what display name and color, where
//! their vehicle last was, and when they were last heard from. Entries
//! are created at accept time, before any message from the connection
//! is processed, and removed exactly once however the connection ends.
//!
//! ### Update Relaying
//! The server does not simulate vehicles. Each client publishes its own
//! transform on a fixed cadence; the relay stores the latest value for
//! late joiners and forwards it to everyone else. Name changes and jump
//! records are broadcast to the whole session, including the sender.
//!
//! ### Record Keeping
//! Jump reports feed per-player statistics plus two record tables: best
//! height over each named landmark and the single longest airtime. A
//! record only moves when strictly beaten, so ties never flap holders.
//!
//! ## Architecture Design
//!
//! All session state lives on one relay task. Connection tasks decode
//! frames off their TCP socket and push them through a channel, so the
//! registry and record tables are mutated from a single place in arrival
//! order and handlers never block on locks or I/O. An idle sweep runs on
//! the same task and evicts participants whose publish cadence stopped.
//!
//! ## Module Organization
//!
//! - `registry`: participant roster and lifecycle
//! - `records`: landmark and airtime record tables
//! - `network`: TCP accept loop, framing, relay loop, idle sweep
//! - `utils`: display color palette
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::network::Server;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut server = Server::new("127.0.0.1:8080", Duration::from_secs(30)).await?;
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

pub mod network;
pub mod records;
pub mod registry;
pub mod utils;
