//! Wire protocol spoken between the relay server and every client.
//!
//! Messages travel over a persistent TCP connection as bincode payloads,
//! each prefixed with a big-endian `u32` byte length. A connection that
//! produces an unparseable or oversized frame is dropped; the stream has
//! no way to resynchronize after corrupt framing.

use serde::{Deserialize, Serialize};
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::math::Transform;

///Session identifier assigned at accept time, unique for the connection's lifetime.
pub type ParticipantId = u32;

///Largest frame either side will encode or accept.
pub const MAX_FRAME_BYTES: usize = 64 * 1024;

///Per-player jump bookkeeping, mirrored to every client in snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct PlayerStats {
    pub highest_jump: f32,
    pub total_jumps: u32,
    ///Duration of the most recent jump, in seconds.
    pub last_airtime: f32,
}

impl PlayerStats {
    ///Folds one reported jump into the running stats.
    pub fn apply_jump(&mut self, height: f32, airtime: f32) {
        if height > self.highest_jump {
            self.highest_jump = height;
        }
        self.total_jumps += 1;
        self.last_airtime = airtime;
    }
}

///Everything a client needs to materialize one remote participant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticipantInfo {
    pub id: ParticipantId,
    pub name: String,
    pub color: String,
    pub transform: Transform,
    pub stats: PlayerStats,
}

///Current best jump height over one named landmark.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LandmarkBest {
    pub landmark: String,
    pub height: f32,
    pub holder: ParticipantId,
    pub holder_name: String,
}

///Session-wide longest airtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AirtimeBest {
    pub airtime: f32,
    pub holder: ParticipantId,
    pub holder_name: String,
}

///All records held at the moment a snapshot is taken. Landmarks nobody
///has jumped yet are absent from the list.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RecordsSnapshot {
    pub landmarks: Vec<LandmarkBest>,
    pub airtime: Option<AirtimeBest>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub enum Message {
    ///Announces or changes the sender's display name.
    JoinName {
        name: String,
    },
    ///Local vehicle state, published on a fixed cadence.
    TransformUpdate {
        transform: Transform,
    },
    ///A completed jump that cleared the reporting thresholds.
    JumpReport {
        height: f32,
        airtime: f32,
        landmark: Option<String>,
    },

    ///First message a client receives: its own id, everyone already
    ///in the session, and the records table.
    Snapshot {
        self_id: ParticipantId,
        participants: Vec<ParticipantInfo>,
        records: RecordsSnapshot,
    },
    ParticipantJoined {
        participant: ParticipantInfo,
    },
    ParticipantMoved {
        id: ParticipantId,
        name: String,
        transform: Transform,
    },
    NameChanged {
        id: ParticipantId,
        name: String,
    },
    ParticipantLeft {
        id: ParticipantId,
    },
    LandmarkRecord {
        landmark: String,
        height: f32,
        holder_name: String,
    },
    AirtimeRecord {
        airtime: f32,
        holder_name: String,
    },
}

///Encodes one message onto the stream with its length prefix.
pub async fn write_message<W>(writer: &mut W, message: &Message) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let payload = bincode::serialize(message)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    if payload.len() > MAX_FRAME_BYTES {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("outbound frame of {} bytes exceeds cap", payload.len()),
        ));
    }
    writer.write_all(&(payload.len() as u32).to_be_bytes()).await?;
    writer.write_all(&payload).await?;
    writer.flush().await?;
    Ok(())
}

///Decodes the next message off the stream. Any error leaves the stream
///unusable and the caller is expected to drop the connection.
pub async fn read_message<R>(reader: &mut R) -> io::Result<Message>
where
    R: AsyncRead + Unpin,
{
    let mut len_bytes = [0u8; 4];
    reader.read_exact(&mut len_bytes).await?;
    let len = u32::from_be_bytes(len_bytes) as usize;
    if len > MAX_FRAME_BYTES {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("inbound frame length {} exceeds cap", len),
        ));
    }
    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await?;
    bincode::deserialize(&payload).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}
