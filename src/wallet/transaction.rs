//! Borsh layout of a NEAR transaction carrying a single function call, and
//! its ed25519 signature.

use crate::wallet::keystore::Credentials;
use base64::{
    Engine as _,
    engine::general_purpose::STANDARD as BASE64,
};
use borsh::BorshSerialize;
use ed25519_dalek::Signer;
use sha2::{
    Digest,
    Sha256,
};
use std::io;

/// 30 Tgas, the default attached to wallet-signed function calls.
pub const DEFAULT_FUNCTION_CALL_GAS: u64 = 30_000_000_000_000;

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize)]
pub enum PublicKey {
    Ed25519([u8; 32]),
}

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize)]
pub enum Signature {
    Ed25519([u8; 64]),
}

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize)]
pub struct FunctionCallAction {
    pub method_name: String,
    pub args: Vec<u8>,
    pub gas: u64,
    pub deposit: u128,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Action {
    FunctionCall(FunctionCallAction),
}

// Variant tags follow the ledger's action enum, where FunctionCall is index 2.
impl BorshSerialize for Action {
    fn serialize<W: io::Write>(&self, writer: &mut W) -> io::Result<()> {
        match self {
            Action::FunctionCall(call) => {
                2u8.serialize(writer)?;
                call.serialize(writer)
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize)]
pub struct Transaction {
    pub signer_id: String,
    pub public_key: PublicKey,
    pub nonce: u64,
    pub receiver_id: String,
    pub block_hash: [u8; 32],
    pub actions: Vec<Action>,
}

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize)]
pub struct SignedTransaction {
    pub transaction: Transaction,
    pub signature: Signature,
}

impl Transaction {
    pub fn function_call(
        credentials: &Credentials,
        receiver_id: impl Into<String>,
        nonce: u64,
        block_hash: [u8; 32],
        call: FunctionCallAction,
    ) -> Self {
        Self {
            signer_id: credentials.account_id.clone(),
            public_key: PublicKey::Ed25519(credentials.public_key()),
            nonce,
            receiver_id: receiver_id.into(),
            block_hash,
            actions: vec![Action::FunctionCall(call)],
        }
    }

    pub fn hash(&self) -> io::Result<[u8; 32]> {
        let digest = Sha256::digest(borsh::to_vec(self)?);
        let mut hash = [0u8; 32];
        hash.copy_from_slice(&digest);
        Ok(hash)
    }

    pub fn sign(self, credentials: &Credentials) -> io::Result<SignedTransaction> {
        let hash = self.hash()?;
        let signature = credentials.signing_key.sign(&hash);
        Ok(SignedTransaction {
            transaction: self,
            signature: Signature::Ed25519(signature.to_bytes()),
        })
    }
}

impl SignedTransaction {
    /// The transaction hash in the base58 form explorers display.
    pub fn hash_string(&self) -> io::Result<String> {
        Ok(bs58::encode(self.transaction.hash()?).into_string())
    }

    pub fn to_base64(&self) -> io::Result<String> {
        Ok(BASE64.encode(borsh::to_vec(self)?))
    }
}
