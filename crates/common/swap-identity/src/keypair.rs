use k256::ecdsa::{RecoveryId, Signature as EcdsaSignature, SigningKey, VerifyingKey};
use rand::rngs::OsRng;
use std::fmt;
use swap_types::crypto::keccak256;
use swap_types::Address;
use thiserror::Error;

pub const SIGNATURE_LENGTH: usize = 65;

/// Recoverable secp256k1 signature laid out as `r || s || v`, with `v` in {27, 28}.
pub type Signature = [u8; SIGNATURE_LENGTH];

#[derive(Debug, Error)]
pub enum KeyError {
    #[error("invalid secret key: {0}")]
    InvalidSecret(String),
    #[error("signing failed: {0}")]
    Signing(String),
    #[error("malformed signature: {0}")]
    MalformedSignature(String),
    #[error("signer recovery failed: {0}")]
    Recovery(String),
}

/// secp256k1 keypair bound to its chain address.
#[derive(Clone)]
pub struct KeyPair {
    pub address: Address,
    pk: VerifyingKey,
    sk: SigningKey,
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

impl KeyPair {
    /// Generate a new random keypair.
    pub fn generate() -> Self {
        Self::from_signing_key(SigningKey::random(&mut OsRng))
    }

    /// Rebuild a keypair from its 32-byte secret scalar.
    pub fn from_secret_bytes(bytes: &[u8]) -> Result<Self, KeyError> {
        let sk = SigningKey::from_slice(bytes).map_err(|e| KeyError::InvalidSecret(e.to_string()))?;
        Ok(Self::from_signing_key(sk))
    }

    fn from_signing_key(sk: SigningKey) -> Self {
        let pk = *sk.verifying_key();
        let address = address_from_public_key(&pk);
        Self { address, pk, sk }
    }

    pub fn public_key(&self) -> &VerifyingKey {
        &self.pk
    }

    /// Uncompressed SEC1 encoding (65 bytes, leading 0x04).
    pub fn public_key_bytes(&self) -> Vec<u8> {
        self.pk.to_encoded_point(false).as_bytes().to_vec()
    }

    /// Return the bytes of the signing key
    pub fn to_bytes(&self) -> [u8; 32] {
        let mut out = [0u8; 32];
        out.copy_from_slice(&self.sk.to_bytes());
        out
    }

    /// Sign a 32-byte digest, producing a recoverable signature.
    pub fn sign_hash(&self, hash: &[u8; 32]) -> Result<Signature, KeyError> {
        let (sig, recid) = self
            .sk
            .sign_prehash_recoverable(hash)
            .map_err(|e| KeyError::Signing(e.to_string()))?;
        let mut out = [0u8; SIGNATURE_LENGTH];
        out[..64].copy_from_slice(&sig.to_bytes());
        out[64] = 27 + recid.to_byte();
        Ok(out)
    }
}

/// Chain address of a public key: the last 20 bytes of keccak256 over the
/// uncompressed point without its 0x04 tag.
pub fn address_from_public_key(pk: &VerifyingKey) -> Address {
    let point = pk.to_encoded_point(false);
    let digest = keccak256(&point.as_bytes()[1..]);
    let mut raw = [0u8; 20];
    raw.copy_from_slice(&digest[12..]);
    Address(raw)
}

/// Recover the address that produced `signature` over `hash`.
///
/// Accepts `v` either as a raw recovery id (0/1) or in the 27/28 form.
pub fn recover_address(hash: &[u8; 32], signature: &[u8]) -> Result<Address, KeyError> {
    if signature.len() != SIGNATURE_LENGTH {
        return Err(KeyError::MalformedSignature(format!(
            "expected {} bytes, got {}",
            SIGNATURE_LENGTH,
            signature.len()
        )));
    }
    let v = signature[64];
    let recid_byte = if v >= 27 { v - 27 } else { v };
    let recid = RecoveryId::from_byte(recid_byte)
        .ok_or_else(|| KeyError::MalformedSignature(format!("invalid recovery id {}", v)))?;
    let sig = EcdsaSignature::from_slice(&signature[..64])
        .map_err(|e| KeyError::MalformedSignature(e.to_string()))?;
    let pk = VerifyingKey::recover_from_prehash(hash, &sig, recid)
        .map_err(|e| KeyError::Recovery(e.to_string()))?;
    Ok(address_from_public_key(&pk))
}
