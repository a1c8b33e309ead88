//! Server network layer handling TCP connections and session relaying

use crate::records::RecordTracker;
use crate::registry::SessionRegistry;
use log::{debug, error, info, warn};
use shared::track::default_landmarks;
use shared::{read_message, write_message, Message, ParticipantId, IDLE_SWEEP_INTERVAL_MS};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::interval;

/// Events sent from connection tasks to the relay loop
#[derive(Debug)]
pub enum ConnectionEvent {
    Inbound {
        id: ParticipantId,
        message: Message,
    },
    Closed {
        id: ParticipantId,
    },
}

/// Main server coordinating connections, the session registry and the
/// record tables
///
/// All session state is owned by the relay loop. Connection tasks only
/// decode frames and push them through a channel, so every mutation of
/// the registry and records happens on one task in arrival order and no
/// handler ever waits on a lock.
pub struct Server {
    listener: TcpListener,
    registry: SessionRegistry,
    records: RecordTracker,
    /// Outbound queues, one per live connection
    peers: HashMap<ParticipantId, mpsc::UnboundedSender<Message>>,
    next_id: ParticipantId,
    idle_timeout: Duration,

    // Channel from connection tasks into the relay loop
    event_tx: mpsc::UnboundedSender<ConnectionEvent>,
    event_rx: mpsc::UnboundedReceiver<ConnectionEvent>,
}

impl Server {
    pub async fn new(
        addr: &str,
        idle_timeout: Duration,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let listener = TcpListener::bind(addr).await?;
        info!("Server listening on {}", listener.local_addr()?);

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let landmark_ids = default_landmarks().into_iter().map(|l| l.id);

        Ok(Server {
            listener,
            registry: SessionRegistry::new(),
            records: RecordTracker::new(landmark_ids),
            peers: HashMap::new(),
            next_id: 1,
            idle_timeout,
            event_tx,
            event_rx,
        })
    }

    /// The address the server actually bound, for callers that asked
    /// for an ephemeral port.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Main relay loop coordinating all operations
    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let mut sweep_interval = interval(Duration::from_millis(IDLE_SWEEP_INTERVAL_MS));

        info!("Server started successfully");

        loop {
            tokio::select! {
                // New connections
                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((stream, addr)) => self.accept_connection(stream, addr),
                        Err(e) => error!("Failed to accept connection: {}", e),
                    }
                },

                // Decoded frames and connection teardowns
                event = self.event_rx.recv() => {
                    match event {
                        Some(ConnectionEvent::Inbound { id, message }) => {
                            self.handle_message(id, message);
                        },
                        Some(ConnectionEvent::Closed { id }) => {
                            self.drop_participant(id);
                        },
                        None => {
                            info!("Server shutting down");
                            break;
                        }
                    }
                },

                // Idle participant eviction
                _ = sweep_interval.tick() => {
                    self.sweep_idle();
                },
            }
        }

        Ok(())
    }

    /// Registers a fresh connection and starts its socket tasks
    ///
    /// The registry entry is created here, before the connection task
    /// has a chance to deliver a single frame, so no message can arrive
    /// for an unregistered id. The snapshot is queued first on a fresh
    /// outbound channel and therefore reaches the client ahead of any
    /// broadcast triggered by later events.
    fn accept_connection(&mut self, stream: TcpStream, addr: SocketAddr) {
        let id = self.next_id;
        self.next_id += 1;

        let joined = self.registry.connect(id);
        info!("Connection from {} registered as participant {}", addr, id);

        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let snapshot = Message::Snapshot {
            self_id: id,
            participants: self.registry.snapshot_for(id),
            records: self.records.snapshot(),
        };
        if outbound_tx.send(snapshot).is_err() {
            error!("Failed to queue snapshot for participant {}", id);
        }
        self.peers.insert(id, outbound_tx);

        self.broadcast(&Message::ParticipantJoined { participant: joined }, Some(id));

        spawn_connection(stream, id, self.event_tx.clone(), outbound_rx);
    }

    /// Processes one decoded frame and relays the resulting broadcasts
    fn handle_message(&mut self, id: ParticipantId, message: Message) {
        match message {
            Message::JoinName { name } => {
                if let Some(final_name) = self.registry.set_name(id, &name) {
                    info!("Participant {} is now known as {}", id, final_name);
                    self.broadcast(
                        &Message::NameChanged {
                            id,
                            name: final_name,
                        },
                        None,
                    );
                }
            }

            Message::TransformUpdate { transform } => {
                if self.registry.apply_transform(id, transform) {
                    if let Some(name) = self.registry.name_of(id) {
                        self.broadcast(
                            &Message::ParticipantMoved {
                                id,
                                name,
                                transform,
                            },
                            Some(id),
                        );
                    }
                } else {
                    debug!("Dropping transform from unknown participant {}", id);
                }
            }

            Message::JumpReport {
                height,
                airtime,
                landmark,
            } => {
                if self.registry.record_jump(id, height, airtime).is_none() {
                    debug!("Dropping jump report from unknown participant {}", id);
                    return;
                }
                let name = match self.registry.name_of(id) {
                    Some(name) => name,
                    None => return,
                };

                let outcome =
                    self.records
                        .report_jump(id, &name, height, airtime, landmark.as_deref());

                if let Some((landmark, best)) = outcome.landmark_record {
                    info!("{} set a {}m record over the {} ramp", name, best, landmark);
                    self.broadcast(
                        &Message::LandmarkRecord {
                            landmark,
                            height: best,
                            holder_name: name.clone(),
                        },
                        None,
                    );
                }
                if let Some(best) = outcome.airtime_record {
                    info!("{} now holds the longest airtime at {:.2}s", name, best);
                    self.broadcast(
                        &Message::AirtimeRecord {
                            airtime: best,
                            holder_name: name.clone(),
                        },
                        None,
                    );
                }
            }

            _ => {
                warn!("Unexpected message type from participant {}", id);
            }
        }
    }

    /// Tears down one participant after their connection closed
    ///
    /// Both the reader task ending and the idle sweep funnel into the
    /// same registry removal, which reports whether the entry was still
    /// present, so the departure is announced exactly once.
    fn drop_participant(&mut self, id: ParticipantId) {
        self.peers.remove(&id);
        if self.registry.disconnect(id) {
            self.broadcast(&Message::ParticipantLeft { id }, None);
        }
    }

    fn sweep_idle(&mut self) {
        for id in self.registry.check_timeouts(self.idle_timeout) {
            warn!("Participant {} timed out", id);
            self.peers.remove(&id);
            self.broadcast(&Message::ParticipantLeft { id }, None);
        }
    }

    /// Queues a message for every live connection, optionally skipping
    /// the participant it originated from
    fn broadcast(&self, message: &Message, exclude: Option<ParticipantId>) {
        for (peer_id, outbound) in &self.peers {
            if Some(*peer_id) == exclude {
                continue;
            }
            if outbound.send(message.clone()).is_err() {
                debug!("Outbound queue for participant {} is gone", peer_id);
            }
        }
    }
}

/// Splits a fresh connection into its reader and writer tasks
///
/// The writer drains the outbound queue until the relay loop drops the
/// sending side or the socket dies. The reader pushes decoded frames to
/// the relay loop and reports the close exactly once, whatever ended
/// the stream.
fn spawn_connection(
    stream: TcpStream,
    id: ParticipantId,
    event_tx: mpsc::UnboundedSender<ConnectionEvent>,
    mut outbound_rx: mpsc::UnboundedReceiver<Message>,
) {
    let (mut reader, mut writer) = stream.into_split();

    tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            if let Err(e) = write_message(&mut writer, &message).await {
                debug!("Write to participant {} failed: {}", id, e);
                break;
            }
        }
    });

    tokio::spawn(async move {
        loop {
            match read_message(&mut reader).await {
                Ok(message) => {
                    if event_tx
                        .send(ConnectionEvent::Inbound { id, message })
                        .is_err()
                    {
                        break;
                    }
                }
                Err(e) => {
                    debug!("Read from participant {} ended: {}", id, e);
                    break;
                }
            }
        }
        let _ = event_tx.send(ConnectionEvent::Closed { id });
    });
}
