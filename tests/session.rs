//! End-to-end session scenarios against a scripted in-memory server.
//!
//! The server side reuses `PacketChannel` oriented to read server-bound
//! packets, over the other end of a `tokio::io::duplex` pipe.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use bytes::Bytes;
use mcproto_client::config::{ClientConfig, UnknownPacketPolicy};
use mcproto_client::core::cipher::SharedSecret;
use mcproto_client::error::{ProtocolError, Result};
use mcproto_client::protocol::dispatcher::EventSink;
use mcproto_client::protocol::handshake;
use mcproto_client::protocol::packet::Packet;
use mcproto_client::protocol::registry::PacketRegistry;
use mcproto_client::protocol::state::{Direction, NextState, Phase};
use mcproto_client::protocol::{game, login};
use mcproto_client::service::{PacketChannel, PacketSender, Session, SessionEnd};
use mcproto_client::transport::Transport;
use rand_core::OsRng;
use rsa::pkcs8::EncodePublicKey;
use rsa::{Pkcs1v15Encrypt, RsaPrivateKey};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

const PLAYER_UUID: Uuid = Uuid::from_u128(0x0123_4567_89ab_cdef_0123_4567_89ab_cdef);
const STEP: Duration = Duration::from_secs(5);

/// Scripted server end of the pipe.
struct Server {
    transport: Arc<Transport>,
}

impl Server {
    fn channel(&self, registry: PacketRegistry) -> PacketChannel {
        PacketChannel::with_inbound(
            Arc::clone(&self.transport),
            Arc::new(registry),
            Direction::ServerBound,
        )
        .with_read_timeout(Some(STEP))
    }

    /// Read the handshake and login start, checking both.
    async fn accept_login(&self) -> PacketChannel {
        let handshake = self.channel(PacketRegistry::handshake());
        match handshake.receive().await.unwrap() {
            Packet::Handshake(handshake::Serverbound::Handshake {
                protocol_version,
                server_address,
                server_port,
                next_state,
            }) => {
                assert_eq!(protocol_version, 754);
                assert_eq!(server_address, "localhost");
                assert_eq!(server_port, 25565);
                assert_eq!(next_state, NextState::Login);
            }
            other => panic!("expected Handshake, got {other:?}"),
        }

        let login = self.channel(PacketRegistry::login());
        assert_eq!(
            login.receive().await.unwrap(),
            Packet::from(login::Serverbound::LoginStart {
                name: "Nick".into()
            })
        );
        login
    }

    async fn login_success(&self, login: &PacketChannel) {
        login
            .send(login::Clientbound::LoginSuccess {
                uuid: PLAYER_UUID,
                username: "Nick".into(),
            })
            .await
            .unwrap();
    }

    async fn expect_game(&self, game: &PacketChannel) -> game::Serverbound {
        match game.receive().await.unwrap() {
            Packet::GameServerbound(packet) => packet,
            other => panic!("expected a game packet, got {other:?}"),
        }
    }
}

struct Client {
    handle: JoinHandle<Result<SessionEnd>>,
    cancel: CancellationToken,
    sender: PacketSender,
    phase: watch::Receiver<Phase>,
    metrics: Arc<mcproto_client::utils::SessionMetrics>,
}

impl Client {
    async fn finish(self) -> Result<SessionEnd> {
        tokio::time::timeout(STEP, self.handle)
            .await
            .expect("session should end promptly")
            .expect("session task panicked")
    }

    async fn wait_for_game(&mut self) {
        tokio::time::timeout(STEP, self.phase.wait_for(|p| *p == Phase::Game))
            .await
            .expect("game phase not reached")
            .unwrap();
    }
}

fn config() -> ClientConfig {
    ClientConfig::new("localhost", 25565).with_username("Nick")
}

fn start(config: ClientConfig, sink: Arc<EventSink>) -> (Client, Server) {
    let (client_io, server_io) = tokio::io::duplex(64 * 1024);
    let session = Session::new(config, sink).unwrap();
    let client = Client {
        cancel: session.cancel_token(),
        sender: session.sender(),
        phase: session.phase_watcher(),
        metrics: session.metrics(),
        handle: tokio::spawn(session.run(client_io)),
    };
    let server = Server {
        transport: Arc::new(Transport::new(server_io, CancellationToken::new())),
    };
    (client, server)
}

fn recording_sink() -> (Arc<EventSink>, Arc<Mutex<Vec<game::Clientbound>>>) {
    let sink = Arc::new(EventSink::new());
    let seen = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&seen);
    sink.subscribe(move |_, packet| log.lock().unwrap().push(packet.clone()))
        .unwrap();
    (sink, seen)
}

#[tokio::test]
async fn plain_join_reaches_game() {
    let (sink, _) = recording_sink();
    let (mut client, server) = start(config(), sink);

    let login = server.accept_login().await;
    server.login_success(&login).await;
    client.wait_for_game().await;

    assert!(!server.transport.is_encrypted().await);
    server.transport.close().await;
    assert_eq!(client.finish().await.unwrap(), SessionEnd::Closed);
}

#[tokio::test]
async fn encrypted_join_switches_both_directions() {
    let private = RsaPrivateKey::new(&mut OsRng, 1024).unwrap();
    let der = private
        .to_public_key()
        .to_public_key_der()
        .unwrap()
        .as_bytes()
        .to_vec();

    let (sink, seen) = recording_sink();
    let (mut client, server) = start(config(), sink);
    let login = server.accept_login().await;

    login
        .send(login::Clientbound::EncryptionRequest {
            server_id: String::new(),
            public_key: der,
            verify_token: vec![1, 2, 3, 4],
        })
        .await
        .unwrap();

    let (shared_secret, verify_token) = match login.receive().await.unwrap() {
        Packet::LoginServerbound(login::Serverbound::EncryptionResponse {
            shared_secret,
            verify_token,
        }) => (shared_secret, verify_token),
        other => panic!("expected EncryptionResponse, got {other:?}"),
    };
    assert!(!shared_secret.is_empty());
    assert!(!verify_token.is_empty());
    assert_eq!(
        private.decrypt(Pkcs1v15Encrypt, &verify_token).unwrap(),
        vec![1, 2, 3, 4]
    );

    let secret = private.decrypt(Pkcs1v15Encrypt, &shared_secret).unwrap();
    server
        .transport
        .install_cipher(&SharedSecret::from_slice(&secret).unwrap())
        .await
        .unwrap();

    server.login_success(&login).await;
    client.wait_for_game().await;

    // Both directions now only make sense through the cipher.
    let game = server.channel(PacketRegistry::game());
    game.send(game::Clientbound::KeepAlive { id: 7 })
        .await
        .unwrap();
    assert_eq!(
        server.expect_game(&game).await,
        game::Serverbound::KeepAlive { id: 7 }
    );

    server.transport.close().await;
    assert_eq!(client.finish().await.unwrap(), SessionEnd::Closed);
    assert_eq!(
        *seen.lock().unwrap(),
        vec![game::Clientbound::KeepAlive { id: 7 }]
    );
}

#[tokio::test]
async fn rejected_login_never_enters_game() {
    let (sink, seen) = recording_sink();
    let (client, server) = start(config(), sink);
    let login = server.accept_login().await;

    login
        .send(login::Clientbound::Disconnect {
            reason: "Server full".into(),
        })
        .await
        .unwrap();

    let phase = client.phase.clone();
    match client.finish().await {
        Err(ProtocolError::LoginRejected(reason)) => assert_eq!(reason, "Server full"),
        other => panic!("expected LoginRejected, got {other:?}"),
    }
    assert_eq!(*phase.borrow(), Phase::Login);
    assert!(seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn keep_alive_is_echoed_before_handler_sends() {
    let sink = Arc::new(EventSink::new());
    sink.subscribe(|sender, packet| {
        if let game::Clientbound::KeepAlive { .. } = packet {
            sender
                .send(game::Serverbound::ChatMessage {
                    message: "pong".into(),
                })
                .unwrap();
        }
    })
    .unwrap();

    let (mut client, server) = start(config(), sink);
    let login = server.accept_login().await;
    server.login_success(&login).await;
    client.wait_for_game().await;

    let game = server.channel(PacketRegistry::game());
    game.send(game::Clientbound::KeepAlive { id: 42 })
        .await
        .unwrap();

    assert_eq!(
        server.expect_game(&game).await,
        game::Serverbound::KeepAlive { id: 42 }
    );
    assert_eq!(
        server.expect_game(&game).await,
        game::Serverbound::ChatMessage {
            message: "pong".into()
        }
    );

    client.cancel.cancel();
    assert_eq!(client.finish().await.unwrap(), SessionEnd::Cancelled);
}

#[tokio::test]
async fn keep_alive_ids_are_echoed_unchanged() {
    let (sink, _) = recording_sink();
    let (mut client, server) = start(config(), sink);
    let login = server.accept_login().await;
    server.login_success(&login).await;
    client.wait_for_game().await;

    let game = server.channel(PacketRegistry::game());
    for id in [0, -1, i64::MAX, rand::random::<i64>(), rand::random::<i64>()] {
        game.send(game::Clientbound::KeepAlive { id }).await.unwrap();
        assert_eq!(
            server.expect_game(&game).await,
            game::Serverbound::KeepAlive { id }
        );
    }

    client.cancel.cancel();
    assert_eq!(client.finish().await.unwrap(), SessionEnd::Cancelled);
}

#[tokio::test]
async fn handler_echo_of_an_answered_keep_alive_is_dropped() {
    let sink = Arc::new(EventSink::new());
    sink.subscribe(|sender, packet| {
        if let game::Clientbound::KeepAlive { id } = packet {
            sender.send(game::Serverbound::KeepAlive { id: *id }).unwrap();
            sender
                .send(game::Serverbound::ChatMessage {
                    message: format!("seen {id}"),
                })
                .unwrap();
        }
    })
    .unwrap();

    let (mut client, server) = start(config(), sink);
    let login = server.accept_login().await;
    server.login_success(&login).await;
    client.wait_for_game().await;

    let game = server.channel(PacketRegistry::game());
    for id in [7, 8] {
        game.send(game::Clientbound::KeepAlive { id }).await.unwrap();
        assert_eq!(
            server.expect_game(&game).await,
            game::Serverbound::KeepAlive { id }
        );
        assert_eq!(
            server.expect_game(&game).await,
            game::Serverbound::ChatMessage {
                message: format!("seen {id}")
            }
        );
    }

    client.cancel.cancel();
    let metrics = Arc::clone(&client.metrics);
    assert_eq!(client.finish().await.unwrap(), SessionEnd::Cancelled);
    assert_eq!(metrics.snapshot().keep_alives_answered, 2);
}

#[tokio::test]
async fn handlers_answer_keep_alives_when_auto_reply_is_off() {
    let sink = Arc::new(EventSink::new());
    sink.subscribe(|sender, packet| {
        if let game::Clientbound::KeepAlive { id } = packet {
            sender.send(game::Serverbound::KeepAlive { id: *id }).unwrap();
        }
    })
    .unwrap();

    let mut cfg = config();
    cfg.auto_keep_alive = false;
    let (mut client, server) = start(cfg, sink);
    let login = server.accept_login().await;
    server.login_success(&login).await;
    client.wait_for_game().await;

    let game = server.channel(PacketRegistry::game());
    game.send(game::Clientbound::KeepAlive { id: -9 })
        .await
        .unwrap();
    assert_eq!(
        server.expect_game(&game).await,
        game::Serverbound::KeepAlive { id: -9 }
    );

    client.cancel.cancel();
    let metrics = Arc::clone(&client.metrics);
    assert_eq!(client.finish().await.unwrap(), SessionEnd::Cancelled);
    assert_eq!(metrics.snapshot().keep_alives_answered, 0);
}

#[tokio::test]
async fn cancel_unblocks_receive_and_is_idempotent() {
    let (sink, _) = recording_sink();
    let (mut client, server) = start(config(), sink);
    let login = server.accept_login().await;
    server.login_success(&login).await;
    client.wait_for_game().await;

    // The session is now parked in receive with nothing to read.
    client.cancel.cancel();
    client.cancel.cancel();

    let sender = client.sender.clone();
    assert_eq!(client.finish().await.unwrap(), SessionEnd::Cancelled);
    assert!(matches!(
        sender.send(game::Serverbound::KeepAlive { id: 1 }),
        Err(ProtocolError::Cancelled)
    ));

    // The client released its end of the pipe.
    assert!(matches!(
        server.transport.read_frame().await,
        Err(ProtocolError::ConnectionClosed)
    ));
}

#[tokio::test]
async fn compression_is_negotiated_during_login() {
    let (sink, seen) = recording_sink();
    let (mut client, server) = start(config(), sink);
    let login = server.accept_login().await;

    login
        .send(login::Clientbound::SetCompression { threshold: 64 })
        .await
        .unwrap();
    server.transport.install_compression(64).await.unwrap();
    server.login_success(&login).await;
    client.wait_for_game().await;

    let long_chat = format!("{{\"text\":\"{}\"}}", "a".repeat(300));
    let game = server.channel(PacketRegistry::game());
    game.send(game::Clientbound::ChatMessage {
        json: long_chat.clone(),
        position: 0,
        sender: Uuid::nil(),
    })
    .await
    .unwrap();
    game.send(game::Clientbound::Disconnect {
        reason: "bye".into(),
    })
    .await
    .unwrap();

    assert_eq!(
        client.finish().await.unwrap(),
        SessionEnd::Kicked("bye".into())
    );
    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 2);
    assert!(matches!(&seen[0], game::Clientbound::ChatMessage { json, .. } if *json == long_chat));
}

#[tokio::test]
async fn negative_compression_threshold_installs_nothing() {
    let (sink, _) = recording_sink();
    let (mut client, server) = start(config(), sink);
    let login = server.accept_login().await;

    login
        .send(login::Clientbound::SetCompression { threshold: -1 })
        .await
        .unwrap();
    server.login_success(&login).await;
    client.wait_for_game().await;

    // Still plain framing: a compressed-format frame would be misread.
    let game = server.channel(PacketRegistry::game());
    game.send(game::Clientbound::KeepAlive { id: 3 })
        .await
        .unwrap();
    assert_eq!(
        server.expect_game(&game).await,
        game::Serverbound::KeepAlive { id: 3 }
    );

    client.cancel.cancel();
    assert_eq!(client.finish().await.unwrap(), SessionEnd::Cancelled);
}

#[tokio::test]
async fn plugin_requests_are_ignored_during_login() {
    let (sink, _) = recording_sink();
    let (mut client, server) = start(config(), sink);
    let login = server.accept_login().await;

    login
        .send(login::Clientbound::PluginRequest {
            message_id: 1,
            channel: "minecraft:brand".into(),
            data: b"vanilla".to_vec(),
        })
        .await
        .unwrap();
    server.login_success(&login).await;
    client.wait_for_game().await;

    client.cancel.cancel();
    assert_eq!(client.finish().await.unwrap(), SessionEnd::Cancelled);
}

#[tokio::test]
async fn unknown_login_packet_is_fatal() {
    let (sink, _) = recording_sink();
    let (client, server) = start(config(), sink);
    let _login = server.accept_login().await;

    server
        .transport
        .write_frame(Bytes::from_static(&[0x09]))
        .await
        .unwrap();

    assert!(matches!(
        client.finish().await,
        Err(ProtocolError::UnknownPacket {
            phase: Phase::Login,
            id: 0x09,
            ..
        })
    ));
}

#[tokio::test]
async fn unknown_game_packets_are_skipped_by_default() {
    let (sink, seen) = recording_sink();
    let (mut client, server) = start(config(), sink);
    let login = server.accept_login().await;
    server.login_success(&login).await;
    client.wait_for_game().await;

    server
        .transport
        .write_frame(Bytes::from_static(&[0x7A, 1, 2, 3]))
        .await
        .unwrap();
    let game = server.channel(PacketRegistry::game());
    game.send(game::Clientbound::KeepAlive { id: 5 })
        .await
        .unwrap();
    assert_eq!(
        server.expect_game(&game).await,
        game::Serverbound::KeepAlive { id: 5 }
    );

    client.cancel.cancel();
    let metrics = Arc::clone(&client.metrics);
    assert_eq!(client.finish().await.unwrap(), SessionEnd::Cancelled);

    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.unknown_packets_skipped, 1);
    assert_eq!(snapshot.keep_alives_answered, 1);
    assert_eq!(
        *seen.lock().unwrap(),
        vec![game::Clientbound::KeepAlive { id: 5 }]
    );
}

#[tokio::test]
async fn unknown_game_packets_can_be_fatal() {
    let (sink, _) = recording_sink();
    let mut cfg = config();
    cfg.unknown_game_packets = UnknownPacketPolicy::Fail;
    let (mut client, server) = start(cfg, sink);
    let login = server.accept_login().await;
    server.login_success(&login).await;
    client.wait_for_game().await;

    server
        .transport
        .write_frame(Bytes::from_static(&[0x7A]))
        .await
        .unwrap();

    assert!(matches!(
        client.finish().await,
        Err(ProtocolError::UnknownPacket {
            phase: Phase::Game,
            id: 0x7A,
            ..
        })
    ));
}

#[tokio::test]
async fn external_sender_reaches_the_server() {
    let (sink, _) = recording_sink();
    let (mut client, server) = start(config(), sink);
    let login = server.accept_login().await;
    server.login_success(&login).await;
    client.wait_for_game().await;

    client
        .sender
        .send(game::Serverbound::ChatMessage {
            message: "hello".into(),
        })
        .unwrap();

    let game = server.channel(PacketRegistry::game());
    assert_eq!(
        server.expect_game(&game).await,
        game::Serverbound::ChatMessage {
            message: "hello".into()
        }
    );

    server.transport.close().await;
    assert_eq!(client.finish().await.unwrap(), SessionEnd::Closed);
}
