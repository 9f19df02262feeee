// Cryptography for the wallet core: ed25519 keys and the signer capability
pub mod keys;
pub mod signer;

pub use keys::{KeyPair, PrivateKey, PublicKey, Signature};
pub use signer::{Signer, SoftwareSigner, verify_message};
