// test-only module included via protocol/mod.rs
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use crate::core::cipher::{SharedSecret, StreamDecryptor, StreamEncryptor};
use crate::error::ProtocolError;
use crate::protocol::packet::Packet;
use crate::protocol::registry::PacketRegistry;
use crate::protocol::security::{respond_to_encryption_request, respond_with_secret};
use crate::protocol::state::{Direction, NextState, Phase};
use crate::protocol::{game, handshake, login};
use rand_core::OsRng;
use rsa::pkcs8::EncodePublicKey;
use rsa::{Pkcs1v15Encrypt, RsaPrivateKey};
use std::sync::OnceLock;

/// Server key pair shared by the tests; generating one is slow.
fn server_key() -> &'static (RsaPrivateKey, Vec<u8>) {
    static KEY: OnceLock<(RsaPrivateKey, Vec<u8>)> = OnceLock::new();
    KEY.get_or_init(|| {
        let private = RsaPrivateKey::new(&mut OsRng, 1024).expect("key generation");
        let der = private
            .to_public_key()
            .to_public_key_der()
            .expect("public key DER")
            .as_bytes()
            .to_vec();
        (private, der)
    })
}

#[test]
fn test_encryption_handshake_flow() {
    let (private, der) = server_key();
    let token = [1u8, 2, 3, 4];

    // =================== Step 1: Client answers the request ===================
    let exchange =
        respond_to_encryption_request("", der, &token).expect("client response should succeed");

    let (enc_secret, enc_token) = match &exchange.response {
        login::Serverbound::EncryptionResponse {
            shared_secret,
            verify_token,
        } => (shared_secret.clone(), verify_token.clone()),
        _ => panic!("Expected EncryptionResponse"),
    };
    assert!(!enc_secret.is_empty());
    assert!(!enc_token.is_empty());

    // =================== Step 2: Server decrypts both fields ===================
    let secret_bytes = private
        .decrypt(Pkcs1v15Encrypt, &enc_secret)
        .expect("server should decrypt the secret");
    let token_back = private
        .decrypt(Pkcs1v15Encrypt, &enc_token)
        .expect("server should decrypt the token");

    assert_eq!(token_back, token);
    assert_eq!(secret_bytes.as_slice(), exchange.secret.as_bytes());

    // =================== Step 3: Both sides key the stream cipher ===================
    let server_secret = SharedSecret::from_slice(&secret_bytes).unwrap();
    let mut client_out = StreamEncryptor::new(&exchange.secret);
    let mut server_in = StreamDecryptor::new(&server_secret);

    let plaintext = b"\x05\x10\x00\x00\x00\x00\x00\x00\x00\x2a".to_vec();
    let mut wire = plaintext.clone();
    client_out.apply(&mut wire);
    assert_ne!(wire, plaintext);

    server_in.apply(&mut wire);
    assert_eq!(wire, plaintext);
}

#[test]
fn test_fixed_secret_is_what_the_server_recovers() {
    let (private, der) = server_key();
    let secret = SharedSecret::new([0x42; 16]);

    let exchange = respond_with_secret("", der, &[9, 9], secret.clone()).unwrap();
    let login::Serverbound::EncryptionResponse { shared_secret, .. } = &exchange.response else {
        panic!("Expected EncryptionResponse");
    };

    let recovered = private.decrypt(Pkcs1v15Encrypt, shared_secret).unwrap();
    assert_eq!(recovered.as_slice(), secret.as_bytes());
}

#[test]
fn test_encryption_response_travels_through_login_registry() {
    let (_, der) = server_key();
    let exchange = respond_to_encryption_request("", der, &[1, 2, 3, 4]).unwrap();

    let registry = PacketRegistry::login();
    let packet = Packet::from(exchange.response);
    let body = registry.encode_to_bytes(&packet).unwrap();
    let decoded = registry.decode(Direction::ServerBound, body).unwrap();
    assert_eq!(decoded, packet);
}

#[test]
fn test_invalid_public_key_aborts() {
    let result = respond_to_encryption_request("", &[0x30, 0x03, 0x01, 0x02, 0x03], &[1]);
    assert!(matches!(result, Err(ProtocolError::CryptoFailure(_))));
}

#[test]
fn test_registries_never_cross_phases() {
    let intent = Packet::from(handshake::login_intent(754, "localhost", 25565).unwrap());
    let keep_alive = Packet::from(game::Serverbound::KeepAlive { id: 1 });

    for (registry, foreign) in [
        (PacketRegistry::login(), &intent),
        (PacketRegistry::handshake(), &keep_alive),
        (PacketRegistry::game(), &intent),
    ] {
        assert!(matches!(
            registry.encode_to_bytes(foreign),
            Err(ProtocolError::WrongPhase { .. })
        ));
    }
}

#[test]
fn test_same_id_means_different_packets_per_phase() {
    // 0x00 server-bound is Handshake, LoginStart and TeleportConfirm.
    let handshake_body = PacketRegistry::handshake()
        .encode_to_bytes(&Packet::from(handshake::Serverbound::Handshake {
            protocol_version: 754,
            server_address: "localhost".into(),
            server_port: 25565,
            next_state: NextState::Login,
        }))
        .unwrap();
    assert_eq!(handshake_body[0], 0x00);

    let as_login = PacketRegistry::login().decode(Direction::ServerBound, handshake_body);
    assert!(as_login.is_err(), "handshake bytes must not decode as LoginStart");

    assert_eq!(PacketRegistry::login().phase(), Phase::Login);
}
