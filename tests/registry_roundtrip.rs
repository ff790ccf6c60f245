//! Every registered packet survives decode followed by encode byte for byte.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use bytes::{BufMut, Bytes, BytesMut};
use mcproto_client::core::codec::{FrameDecoder, FrameEncoder};
use mcproto_client::core::types::{write_string, write_uuid, write_varint, MAX_STRING_LEN};
use mcproto_client::protocol::packet::Packet;
use mcproto_client::protocol::registry::PacketRegistry;
use mcproto_client::protocol::state::{Direction, NextState, Phase};
use mcproto_client::protocol::{game, handshake, login};
use tokio_util::codec::{Decoder, Encoder};
use uuid::Uuid;

/// One sample of every packet each registry knows.
fn samples() -> Vec<Packet> {
    vec![
        handshake::Serverbound::Handshake {
            protocol_version: 754,
            server_address: "play.example.net".into(),
            server_port: 25565,
            next_state: NextState::Login,
        }
        .into(),
        login::Clientbound::Disconnect {
            reason: "{\"text\":\"Server full\"}".into(),
        }
        .into(),
        login::Clientbound::EncryptionRequest {
            server_id: String::new(),
            public_key: vec![0x30; 162],
            verify_token: vec![1, 2, 3, 4],
        }
        .into(),
        login::Clientbound::LoginSuccess {
            uuid: Uuid::from_u128(0xdead_beef_0000_4000_8000_0000_0000_0001),
            username: "Nick".into(),
        }
        .into(),
        login::Clientbound::SetCompression { threshold: 256 }.into(),
        login::Clientbound::SetCompression { threshold: -1 }.into(),
        login::Clientbound::PluginRequest {
            message_id: 3,
            channel: "velocity:player_info".into(),
            data: vec![9, 8, 7],
        }
        .into(),
        login::Serverbound::LoginStart {
            name: "Nick".into(),
        }
        .into(),
        login::Serverbound::EncryptionResponse {
            shared_secret: vec![0xAA; 128],
            verify_token: vec![0xBB; 128],
        }
        .into(),
        login::Serverbound::PluginResponse {
            message_id: 3,
            data: Some(vec![1]),
        }
        .into(),
        login::Serverbound::PluginResponse {
            message_id: 4,
            data: None,
        }
        .into(),
        game::Clientbound::ChatMessage {
            json: "{\"text\":\"hi\"}".into(),
            position: 1,
            sender: Uuid::nil(),
        }
        .into(),
        game::Clientbound::Disconnect {
            reason: "{\"text\":\"bye\"}".into(),
        }
        .into(),
        game::Clientbound::KeepAlive { id: i64::MIN }.into(),
        game::Clientbound::PlayerPositionAndLook {
            x: 1.5,
            y: 64.0,
            z: -8.25,
            yaw: 90.0,
            pitch: -12.5,
            flags: 0x1F,
            teleport_id: 12,
        }
        .into(),
        game::Serverbound::TeleportConfirm { teleport_id: 12 }.into(),
        game::Serverbound::ChatMessage {
            message: "hello there".into(),
        }
        .into(),
        game::Serverbound::KeepAlive { id: 42 }.into(),
    ]
}

#[test]
fn test_every_registry_packet_roundtrips() {
    for packet in samples() {
        let registry = PacketRegistry::for_phase(packet.phase());
        let bytes = registry.encode_to_bytes(&packet).unwrap();
        let decoded = registry.decode(packet.direction(), bytes.clone()).unwrap();
        assert_eq!(decoded, packet, "{}", packet.name());

        let again = registry.encode_to_bytes(&decoded).unwrap();
        assert_eq!(again, bytes, "{} re-encodes differently", packet.name());
    }
}

#[test]
fn test_registered_names_match_packet_names() {
    for packet in samples() {
        let registry = PacketRegistry::for_phase(packet.phase());
        let entry = registry.lookup(packet.direction(), packet.id()).unwrap();
        assert_eq!(entry.name, packet.name(), "0x{:02X}", packet.id());
    }
}

#[test]
fn test_chat_fields_accept_long_json() {
    let json = format!("{{\"text\":\"{}\"}}", "a".repeat(40_000));
    assert!(json.len() > MAX_STRING_LEN);

    let mut chat = BytesMut::new();
    write_varint(&mut chat, game::ids::clientbound::CHAT_MESSAGE);
    write_string(&mut chat, &json);
    chat.put_u8(0);
    write_uuid(&mut chat, &Uuid::nil());
    let decoded = PacketRegistry::game()
        .decode(Direction::ClientBound, chat.freeze())
        .unwrap();
    assert_eq!(
        decoded,
        Packet::from(game::Clientbound::ChatMessage {
            json: json.clone(),
            position: 0,
            sender: Uuid::nil(),
        })
    );

    for packet in [
        Packet::from(game::Clientbound::Disconnect {
            reason: json.clone(),
        }),
        Packet::from(login::Clientbound::Disconnect {
            reason: json.clone(),
        }),
    ] {
        let registry = PacketRegistry::for_phase(packet.phase());
        let bytes = registry.encode_to_bytes(&packet).unwrap();
        assert_eq!(registry.decode(Direction::ClientBound, bytes).unwrap(), packet);
    }
}

#[test]
fn test_samples_cover_every_registered_id() {
    let samples = samples();
    for phase in [Phase::Handshake, Phase::Login, Phase::Game] {
        let registry = PacketRegistry::for_phase(phase);
        for direction in [Direction::ClientBound, Direction::ServerBound] {
            for id in registry.ids(direction) {
                assert!(
                    samples
                        .iter()
                        .any(|p| p.phase() == phase && p.direction() == direction && p.id() == id),
                    "no sample for {phase:?} {direction:?} 0x{id:02X}"
                );
            }
        }
    }
}

#[test]
fn test_frames_roundtrip_through_every_codec_mode() {
    for threshold in [None, Some(0), Some(64), Some(100_000)] {
        let mut encoder = FrameEncoder::new();
        let mut decoder = FrameDecoder::new();
        if let Some(threshold) = threshold {
            encoder.enable_compression(threshold).unwrap();
            decoder.enable_compression(threshold).unwrap();
        }

        let mut wire = BytesMut::new();
        let bodies: Vec<Bytes> = samples()
            .iter()
            .map(|p| {
                PacketRegistry::for_phase(p.phase())
                    .encode_to_bytes(p)
                    .unwrap()
            })
            .collect();
        for body in &bodies {
            encoder.encode(body.clone(), &mut wire).unwrap();
        }

        for body in &bodies {
            let frame = decoder.decode(&mut wire).unwrap().expect("complete frame");
            assert_eq!(&frame, body, "threshold {threshold:?}");
        }
        assert!(wire.is_empty());
    }
}
