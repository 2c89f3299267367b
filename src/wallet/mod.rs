use rand::rngs::OsRng;
use secp256k1::{Message, PublicKey, Secp256k1, SecretKey, ecdsa::Signature};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

use crate::blockchain::Block;

/// Balance every address starts from before any recorded transfer.
pub const STARTING_BALANCE: u64 = 1000;

/// A secp256k1 keypair. The hex of the compressed public key doubles as the
/// address (didactic).
pub struct Wallet {
    secret_key: SecretKey,
    public_key: PublicKey,
}

impl Wallet {
    pub fn new() -> Self {
        let secp = Secp256k1::new();
        let (secret_key, public_key) = secp.generate_keypair(&mut OsRng);
        Self {
            secret_key,
            public_key,
        }
    }

    pub fn address(&self) -> String {
        hex::encode(self.public_key.serialize()) // compressed (33 bytes)
    }

    /// Sign a 32-byte digest, returning the hex-encoded DER signature.
    pub fn sign(&self, msg32: [u8; 32]) -> String {
        let secp = Secp256k1::new();
        let msg = Message::from_slice(&msg32).expect("digest is 32 bytes");
        let sig = secp.sign_ecdsa(&msg, &self.secret_key);
        hex::encode(sig.serialize_der())
    }
}

impl Default for Wallet {
    fn default() -> Self {
        Self::new()
    }
}

/// Verify a signature (hex DER) against the given address (hex, compressed
/// pubkey) and message digest.
pub fn verify_signature_hex(
    address_hex: &str,
    sig_hex: &str,
    msg32: [u8; 32],
) -> Result<bool, &'static str> {
    let secp = Secp256k1::verification_only();

    let sig_bytes = hex::decode(sig_hex).map_err(|_| "invalid signature hex")?;
    let sig = Signature::from_der(&sig_bytes).map_err(|_| "invalid DER signature")?;

    let pk_bytes = hex::decode(address_hex).map_err(|_| "invalid pubkey hex")?;
    let pk = PublicKey::from_slice(&pk_bytes).map_err(|_| "invalid pubkey bytes")?;

    let msg = Message::from_slice(&msg32).map_err(|_| "invalid message length")?;
    Ok(secp.verify_ecdsa(&msg, &sig, &pk).is_ok())
}

/// SHA-256 of the canonical JSON form of an output map; the payload a
/// transfer's signature commits to.
pub fn output_map_digest(output_map: &BTreeMap<String, u64>) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(serde_json::to_vec(output_map).expect("serialize output map"));
    let digest = hasher.finalize();
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest[..]);
    out
}

/// Replay the chain to derive `address`'s spendable balance.
///
/// Walks blocks from the tip down, summing outputs addressed to `address`.
/// The walk stops after the first block in which the address itself conducted
/// a transfer: its self-output there already folds in all earlier history.
/// `STARTING_BALANCE` applies only to addresses that never conducted one.
pub fn calculate_balance(chain: &[Block], address: &str) -> u64 {
    let mut has_conducted_transfer = false;
    let mut outputs_total: u64 = 0;

    for block in chain.iter().skip(1).rev() {
        for transaction in &block.data {
            if transaction.input_address() == address {
                has_conducted_transfer = true;
            }
            if let Some(amount) = transaction.output_to(address) {
                outputs_total += amount;
            }
        }
        if has_conducted_transfer {
            break;
        }
    }

    if has_conducted_transfer {
        outputs_total
    } else {
        STARTING_BALANCE + outputs_total
    }
}
