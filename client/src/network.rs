//! Client connection: joins a session, publishes the local vehicle and
//! mirrors everyone else

use crate::checkpoints::{CheckpointTracker, LapEvent};
use crate::editor::{EditorEvent, EditorGate};
use crate::mirror::MirrorSet;
use crate::publisher::{LocalPublisher, TransformSource};
use log::{debug, info, warn};
use shared::track::default_landmarks;
use shared::{
    now_ms, read_message, write_message, Message, ParticipantId, Vec3,
    TRANSFORM_PUBLISH_INTERVAL_MS,
};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::time::{interval, Duration};

const MIRROR_TICK_INTERVAL_MS: u64 = 16;

pub struct Client {
    reader: OwnedReadHalf,
    writer: OwnedWriteHalf,
    self_id: Option<ParticipantId>,
    display_name: String,

    mirrors: MirrorSet,
    publisher: LocalPublisher,
    checkpoints: CheckpointTracker,
    editor: EditorGate,
}

impl Client {
    pub async fn new(
        server_addr: &str,
        name: &str,
        source: Box<dyn TransformSource + Send>,
        checkpoint_positions: Vec<Vec3>,
        persist_url: Option<String>,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let stream = TcpStream::connect(server_addr).await?;
        let (reader, writer) = stream.into_split();
        info!("Connected to {}", server_addr);

        Ok(Client {
            reader,
            writer,
            self_id: None,
            display_name: name.to_string(),
            mirrors: MirrorSet::new(),
            publisher: LocalPublisher::new(source, default_landmarks()),
            checkpoints: CheckpointTracker::new(checkpoint_positions),
            editor: EditorGate::new(persist_url),
        })
    }

    pub fn self_id(&self) -> Option<ParticipantId> {
        self.self_id
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn mirrors(&self) -> &MirrorSet {
        &self.mirrors
    }

    pub fn checkpoints(&self) -> &CheckpointTracker {
        &self.checkpoints
    }

    pub fn editor(&self) -> &EditorGate {
        &self.editor
    }

    /// Asks the server for a new display name. The change only takes
    /// effect locally once the server confirms it.
    pub async fn set_name(&mut self, name: &str) -> Result<(), std::io::Error> {
        write_message(
            &mut self.writer,
            &Message::JoinName {
                name: name.to_string(),
            },
        )
        .await
    }

    pub fn toggle_edit_mode(&mut self) -> EditorEvent {
        let event = self.editor.toggle_edit_mode();
        self.log_editor_event(&event);
        event
    }

    /// Uploads the current checkpoint layout as the track default.
    pub async fn save_track_layout(&mut self, config_name: &str) -> EditorEvent {
        let positions = self.checkpoints.positions();
        let event = self.editor.save_as_default(config_name, &positions).await;
        self.log_editor_event(&event);
        event
    }

    /// Swaps in a different checkpoint layout mid-session.
    pub fn reload_checkpoints(&mut self, positions: Vec<Vec3>) {
        self.checkpoints.reload(positions);
    }

    async fn join(&mut self) -> Result<(), std::io::Error> {
        write_message(
            &mut self.writer,
            &Message::JoinName {
                name: self.display_name.clone(),
            },
        )
        .await
    }

    fn handle_message(&mut self, message: Message) {
        match message {
            Message::Snapshot {
                self_id,
                participants,
                records,
            } => {
                info!(
                    "Joined session as participant {} with {} others",
                    self_id,
                    participants.len()
                );
                self.self_id = Some(self_id);
                self.mirrors.apply_snapshot(participants);
                for best in &records.landmarks {
                    info!(
                        "{} record: {:.0} by {}",
                        best.landmark, best.height, best.holder_name
                    );
                }
                if let Some(best) = &records.airtime {
                    info!("Airtime record: {:.2}s by {}", best.airtime, best.holder_name);
                }
            }

            Message::ParticipantJoined { participant } => {
                if Some(participant.id) != self.self_id {
                    info!("{} joined the race", participant.name);
                    self.mirrors.on_joined(participant);
                }
            }

            Message::ParticipantMoved {
                id,
                name,
                transform,
            } => {
                if Some(id) != self.self_id {
                    self.mirrors.on_moved(id, name, transform);
                }
            }

            Message::NameChanged { id, name } => {
                if Some(id) == self.self_id {
                    info!("Now racing as {}", name);
                    self.display_name = name.clone();
                    if let Some(event) = self.editor.on_name_changed(&name) {
                        self.log_editor_event(&event);
                    }
                } else if let Some(old) = self.mirrors.on_name_changed(id, &name) {
                    info!("{} is now {}", old, name);
                }
            }

            Message::ParticipantLeft { id } => {
                if let Some(name) = self.mirrors.on_left(id) {
                    info!("{} left the race", name);
                }
            }

            Message::LandmarkRecord {
                landmark,
                height,
                holder_name,
            } => {
                info!("{} set a {} record: {:.0}", holder_name, landmark, height);
            }

            Message::AirtimeRecord {
                airtime,
                holder_name,
            } => {
                info!("{} set an airtime record: {:.2}s", holder_name, airtime);
            }

            _ => {
                warn!("Unexpected message type");
            }
        }
    }

    async fn publish_tick(&mut self) -> Result<(), std::io::Error> {
        let now = now_ms();
        let (transform, jump) = self.publisher.poll(now);

        if let Some(transform) = transform {
            if let Some(index) = self.editor.drag_checkpoint(&mut self.checkpoints, &transform) {
                debug!("Checkpoint {} follows the vehicle", index);
            }

            for event in self.checkpoints.observe(&transform.position, now) {
                match event {
                    LapEvent::CheckpointPassed { index } => {
                        debug!("Passed checkpoint {}", index);
                    }
                    LapEvent::LapStarted => info!("Lap started"),
                    LapEvent::LapFinished { lap_ms, best } => {
                        if best {
                            info!("Lap finished in {:.3}s, a new best", lap_ms as f64 / 1000.0);
                        } else {
                            info!("Lap finished in {:.3}s", lap_ms as f64 / 1000.0);
                        }
                    }
                }
            }

            write_message(&mut self.writer, &Message::TransformUpdate { transform }).await?;
        }

        if let Some(jump) = jump {
            info!(
                "Landed a {:.0} unit jump after {:.2}s",
                jump.height, jump.airtime
            );
            write_message(
                &mut self.writer,
                &Message::JumpReport {
                    height: jump.height,
                    airtime: jump.airtime,
                    landmark: jump.landmark,
                },
            )
            .await?;
        }

        Ok(())
    }

    fn log_editor_event(&self, event: &EditorEvent) {
        match event {
            EditorEvent::Denied => warn!("Track editing is not available to this player"),
            EditorEvent::Entered => info!("Track editing enabled"),
            EditorEvent::Exited => info!("Track editing disabled"),
            EditorEvent::Revoked => warn!("Track editing authorization revoked"),
            EditorEvent::Saved { config_name } => {
                info!("Track layout saved as '{}'", config_name)
            }
            EditorEvent::SaveFailed { reason } => {
                warn!("Track layout save failed: {}", reason)
            }
        }
    }

    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.join().await?;

        let mut publish_interval =
            interval(Duration::from_millis(TRANSFORM_PUBLISH_INTERVAL_MS));
        let mut smooth_interval = interval(Duration::from_millis(MIRROR_TICK_INTERVAL_MS));

        loop {
            tokio::select! {
                result = read_message(&mut self.reader) => {
                    match result {
                        Ok(message) => self.handle_message(message),
                        Err(e) => {
                            info!("Connection closed: {}", e);
                            break;
                        }
                    }
                },

                _ = publish_interval.tick() => {
                    if let Err(e) = self.publish_tick().await {
                        info!("Connection closed: {}", e);
                        break;
                    }
                },

                _ = smooth_interval.tick() => {
                    self.mirrors.tick();
                },
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drive::NoVehicle;
    use shared::{ParticipantInfo, PlayerStats, RecordsSnapshot, Transform};

    fn participant(id: ParticipantId, name: &str) -> ParticipantInfo {
        ParticipantInfo {
            id,
            name: name.to_string(),
            color: "#ff0000".to_string(),
            transform: Transform::default(),
            stats: PlayerStats::default(),
        }
    }

    async fn connected_client() -> (Client, TcpStream) {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let accept = tokio::spawn(async move { listener.accept().await.unwrap() });

        let client = Client::new(
            &addr.to_string(),
            "Test",
            Box::new(NoVehicle),
            vec![],
            None,
        )
        .await
        .unwrap();
        let (server_side, _) = accept.await.unwrap();
        (client, server_side)
    }

    #[tokio::test]
    async fn test_snapshot_sets_identity_and_mirrors() {
        let (mut client, _server_side) = connected_client().await;

        client.handle_message(Message::Snapshot {
            self_id: 7,
            participants: vec![participant(1, "Ada"), participant(2, "Lin")],
            records: RecordsSnapshot::default(),
        });

        assert_eq!(client.self_id(), Some(7));
        assert_eq!(client.mirrors().len(), 2);
    }

    #[tokio::test]
    async fn test_own_updates_never_become_mirrors() {
        let (mut client, _server_side) = connected_client().await;

        client.handle_message(Message::Snapshot {
            self_id: 7,
            participants: vec![],
            records: RecordsSnapshot::default(),
        });
        client.handle_message(Message::ParticipantJoined {
            participant: participant(7, "Test"),
        });
        client.handle_message(Message::ParticipantMoved {
            id: 7,
            name: "Test".to_string(),
            transform: Transform::default(),
        });

        assert!(client.mirrors().is_empty());
    }

    #[tokio::test]
    async fn test_confirmed_rename_updates_name_and_gate() {
        let (mut client, _server_side) = connected_client().await;

        client.handle_message(Message::Snapshot {
            self_id: 3,
            participants: vec![],
            records: RecordsSnapshot::default(),
        });
        client.handle_message(Message::NameChanged {
            id: 3,
            name: shared::EDITOR_IDENTITY.to_string(),
        });

        assert_eq!(client.display_name(), shared::EDITOR_IDENTITY);
        assert!(client.editor().is_authorized());

        client.handle_message(Message::NameChanged {
            id: 3,
            name: "Someone".to_string(),
        });
        assert!(!client.editor().is_authorized());
    }

    #[tokio::test]
    async fn test_departure_clears_the_mirror() {
        let (mut client, _server_side) = connected_client().await;

        client.handle_message(Message::Snapshot {
            self_id: 1,
            participants: vec![participant(2, "Ada")],
            records: RecordsSnapshot::default(),
        });
        assert_eq!(client.mirrors().len(), 1);

        client.handle_message(Message::ParticipantLeft { id: 2 });
        assert!(client.mirrors().is_empty());
    }
}
