// RSA Module - Main module file
// Exports all RSA-related functionality

pub mod bigint;
pub mod keygen;
pub mod encrypt;
pub mod decrypt;

pub use keygen::{
    derive_keypair, generate_keypair, generate_keypair_from, resolve_key_size, KeyGenerator,
    PrimeFactors, RsaKeyPair, RsaPrivateKey, RsaPublicKey,
};
pub use encrypt::{encode_line, encode_unit, encrypt_text, serialize_unit, EncodedUnit};
pub use decrypt::{decode_line, decode_unit, decrypt_text, parse_unit};
