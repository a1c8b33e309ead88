//! # Racing Sync Client Library
//!
//! This library provides the complete client-side implementation for the
//! shared-session racing layer. It connects to a relay server, publishes
//! the local vehicle's movement, mirrors every other participant, tracks
//! checkpoint progression and laps, and gates the track editor behind the
//! designated identity.
//!
//! ## Architecture Overview
//!
//! The client never simulates other vehicles. The server relays each
//! participant's published transforms, and the client's job is to present
//! them smoothly while keeping its own lap and jump bookkeeping local:
//!
//! ### Local Publishing
//! A transform source (a real vehicle, a scripted drive, or nothing at
//! all for spectators) is sampled on a fixed cadence. Each sample is
//! published to the server and simultaneously fed to the jump detector
//! and the checkpoint progression machine.
//!
//! ### Remote Mirroring
//! Remote participants are held as mirrors: a displayed position that
//! eases toward the most recently received target. Mirrors tolerate
//! messages arriving in surprising orders; an update for an unknown
//! participant simply materializes it.
//!
//! ### Jump Detection
//! Airborne state is inferred from published transforms alone. A landing
//! that was high and long enough becomes a jump report, attributed to the
//! nearest landmark at takeoff if one was close.
//!
//! ## Module Organization
//!
//! ### Checkpoints Module (`checkpoints`)
//! Checkpoint progression and lap timing:
//! - Ordered capture with a latch/release hysteresis per gate
//! - Lap clock driven by crossings of checkpoint zero
//! - Layout loading with fallback to the built-in ring
//!
//! ### Drive Module (`drive`)
//! Built-in transform sources:
//! - A scripted drive for demos and end-to-end testing
//! - A spectator source that publishes nothing
//!
//! ### Editor Module (`editor`)
//! Track editing for the designated identity:
//! - Authorization recomputed on every confirmed rename
//! - Checkpoint dragging while driving in edit mode
//! - Layout upload to an optional persistence endpoint
//!
//! ### Mirror Module (`mirror`)
//! Remote participant presentation:
//! - Per-participant smoothing toward network targets
//! - Session membership driven by server notifications
//!
//! ### Network Module (`network`)
//! The connection itself:
//! - TCP framing shared with the server
//! - A select loop over inbound messages and publish ticks
//!
//! ### Publisher Module (`publisher`)
//! Local movement publishing:
//! - Fixed-cadence sampling of the transform source
//! - The airborne state machine and jump thresholds
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use client::drive::ScriptedDrive;
//! use client::network::Client;
//! use shared::track::default_checkpoint_positions;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut client = Client::new(
//!         "127.0.0.1:8080",
//!         "Player",
//!         Box::new(ScriptedDrive::new()),
//!         default_checkpoint_positions(),
//!         None,
//!     )
//!     .await?;
//!
//!     client.run().await
//! }
//! ```
//!
//! ## Design Philosophy
//!
//! ### Server Confirmation
//! Identity-sensitive state changes locally only when the server confirms
//! them. A rename takes effect on the NameChanged echo, and editing
//! authorization follows the confirmed name, never the requested one.
//!
//! ### Smoothness Over Exactness
//! Mirrors ease toward targets instead of teleporting. A mirror is never
//! authoritative; it exists to look right at 60 frames per second while
//! updates arrive at 20 per second.
//!
//! ### Soft Failure
//! Losing the persistence endpoint, a malformed layout file, or a missing
//! vehicle never takes the session down. Each degrades to a logged
//! fallback.

pub mod checkpoints;
pub mod drive;
pub mod editor;
pub mod mirror;
pub mod network;
pub mod publisher;
