//! X3DH (Extended Triple Diffie-Hellman) Protocol
//!
//! Реализация протокола установки ключей из Signal Protocol.
//!
//! ## Ключи
//!
//! ### Alice (инициатор)
//! - **IK_A**: Identity Key (долгосрочный, Ed25519; для DH берётся его X25519 форма)
//! - **EK_A**: Ephemeral Key (одноразовый, генерируется для каждой сессии)
//!
//! ### Bob (получатель)
//! - **IK_B**: Identity Key
//! - **SPK_B**: Signed Prekey (среднесрочный, ротируется)
//! - **Sig(SPK_B)**: Подпись SPK_B identity-ключом
//! - **OPK_B**: One-time Prekey (опционально, одноразовый)
//!
//! ## Протокол
//!
//! ```text
//! DH1 = DH(IK_A, SPK_B)
//! DH2 = DH(EK_A, IK_B)
//! DH3 = DH(EK_A, SPK_B)
//! DH4 = DH(EK_A, OPK_B)        // только если OPK_B есть в bundle
//!
//! SK = HKDF(salt = 0^32, ikm = DH1 || DH2 || DH3 [|| DH4], info = "X3DH")
//! ```
//!
//! Ответчик считает те же DH в обратную сторону. Наличие OPK меняет SK:
//! это отдельный вариант протокола, а не заполнитель.

use crate::crypto::keys::{IdentityKeyPair, KeyPair};
use crate::crypto::provider::CryptoProvider;
use crate::crypto::signature::verify_signed_pre_key_signature_with;
use crate::error::{ProtocolError, Result};
use crate::utils::{b64, validation};
use serde::{Deserialize, Serialize};
use std::marker::PhantomData;
use tracing::{debug, trace};
use zeroize::Zeroizing;

/// Info label для HKDF в X3DH
const X3DH_INFO: &[u8] = b"X3DH";

/// Общий секрет X3DH (root key), стирается при drop
pub type RootKey = Zeroizing<[u8; 32]>;

/// Ссылка на one-time prekey в bundle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OneTimePreKeyRef {
    pub key_id: u32,
    pub public_key: [u8; 32],
}

/// Публичные ключи для инициации сессии
///
/// Alice получает этот bundle от сервера перед началом handshake с Bob.
/// One-time prekey моделируется явным `Option`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct X3DHKeyBundle {
    /// Bob's Identity Public Key (IK_B, Ed25519 verifying key)
    pub identity_key: [u8; 32],

    /// Bob's Signed Prekey Public Key (SPK_B)
    pub signed_pre_key: [u8; 32],

    pub signed_pre_key_id: u32,

    /// Signature over signed_pre_key (Sig(SPK_B))
    pub signed_pre_key_signature: Vec<u8>,

    /// Bob's One-time Prekey (OPK_B)
    pub one_time_pre_key: Option<OneTimePreKeyRef>,

    /// Crypto suite ID
    pub suite_id: u16,
}

/// JSON wire-формат bundle: ключи и подпись в base64
#[derive(Serialize, Deserialize)]
struct BundleWire {
    identity_key: String,
    signed_pre_key: String,
    signed_pre_key_id: u32,
    signed_pre_key_signature: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    one_time_pre_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    one_time_pre_key_id: Option<u32>,
    suite_id: u16,
}

impl X3DHKeyBundle {
    pub fn to_json(&self) -> Result<String> {
        let wire = BundleWire {
            identity_key: b64::encode(&self.identity_key),
            signed_pre_key: b64::encode(&self.signed_pre_key),
            signed_pre_key_id: self.signed_pre_key_id,
            signed_pre_key_signature: b64::encode(&self.signed_pre_key_signature),
            one_time_pre_key: self
                .one_time_pre_key
                .as_ref()
                .map(|opk| b64::encode(&opk.public_key)),
            one_time_pre_key_id: self.one_time_pre_key.as_ref().map(|opk| opk.key_id),
            suite_id: self.suite_id,
        };
        Ok(serde_json::to_string(&wire)?)
    }

    /// Разобрать bundle из JSON. Ключи неверной длины дают `InvalidKeyMaterial`.
    pub fn from_json(json: &str) -> Result<Self> {
        let wire: BundleWire = serde_json::from_str(json)?;

        let identity_key = validation::public_key_array(
            "identity_key",
            &b64::decode("identity_key", &wire.identity_key)?,
        )?;
        let signed_pre_key = validation::public_key_array(
            "signed_pre_key",
            &b64::decode("signed_pre_key", &wire.signed_pre_key)?,
        )?;
        let signed_pre_key_signature =
            b64::decode("signed_pre_key_signature", &wire.signed_pre_key_signature)?;

        let one_time_pre_key = match (wire.one_time_pre_key, wire.one_time_pre_key_id) {
            (Some(key), Some(key_id)) => Some(OneTimePreKeyRef {
                key_id,
                public_key: validation::public_key_array(
                    "one_time_pre_key",
                    &b64::decode("one_time_pre_key", &key)?,
                )?,
            }),
            (None, None) => None,
            _ => {
                return Err(ProtocolError::InvalidKeyMaterial(
                    "one_time_pre_key and one_time_pre_key_id must be present together"
                        .to_string(),
                ))
            }
        };

        Ok(Self {
            identity_key,
            signed_pre_key,
            signed_pre_key_id: wire.signed_pre_key_id,
            signed_pre_key_signature,
            one_time_pre_key,
            suite_id: wire.suite_id,
        })
    }
}

/// X3DH Protocol Implementation
///
/// Stateless struct - все данные передаются через параметры методов.
pub struct X3DHProtocol<P: CryptoProvider> {
    _phantom: PhantomData<P>,
}

impl<P: CryptoProvider> X3DHProtocol<P> {
    /// X3DH со стороны инициатора.
    ///
    /// Подпись SPK проверяется до любого DH: при отказе ни один секрет не
    /// вычисляется.
    pub fn perform_as_initiator(
        local_identity: &IdentityKeyPair,
        ephemeral: &KeyPair,
        remote_bundle: &X3DHKeyBundle,
    ) -> Result<RootKey> {
        debug!(target: "crypto::x3dh", "Starting X3DH as initiator (Alice)");
        trace!(
            target: "crypto::x3dh",
            suite_id = remote_bundle.suite_id,
            has_one_time_prekey = remote_bundle.one_time_pre_key.is_some()
        );

        // 1. Verify signature on signed prekey
        verify_signed_pre_key_signature_with::<P>(
            &remote_bundle.identity_key,
            &remote_bundle.signed_pre_key,
            &remote_bundle.signed_pre_key_signature,
        )
        .map_err(|e| {
            debug!(target: "crypto::x3dh", error = %e, "Signature verification failed");
            e
        })?;
        debug!(target: "crypto::x3dh", "Signature verified successfully");

        let remote_identity_dh = P::identity_dh_public_key(&remote_bundle.identity_key)?;
        let local_identity_dh = local_identity.dh_private_key();

        // 2. DH1 = DH(IK_A, SPK_B)
        let dh1 = Zeroizing::new(P::shared_secret(
            &local_identity_dh,
            &remote_bundle.signed_pre_key,
        )?);
        // 3. DH2 = DH(EK_A, IK_B)
        let dh2 = Zeroizing::new(P::shared_secret(
            ephemeral.private_key(),
            &remote_identity_dh,
        )?);
        // 4. DH3 = DH(EK_A, SPK_B)
        let dh3 = Zeroizing::new(P::shared_secret(
            ephemeral.private_key(),
            &remote_bundle.signed_pre_key,
        )?);
        // 5. DH4 = DH(EK_A, OPK_B)
        let dh4 = match &remote_bundle.one_time_pre_key {
            Some(opk) => Some(Zeroizing::new(P::shared_secret(
                ephemeral.private_key(),
                &opk.public_key,
            )?)),
            None => None,
        };

        let root_key = Self::derive_root_key(&dh1, &dh2, &dh3, dh4.as_deref())?;
        debug!(target: "crypto::x3dh", "X3DH completed as initiator");
        Ok(root_key)
    }

    /// X3DH со стороны ответчика (зеркальные DH).
    ///
    /// `one_time_pre_key` должен быть тем ключом, на который сослался
    /// инициатор; при несовпадении получится другой root key и первое же
    /// сообщение не пройдёт AEAD.
    pub fn perform_as_responder(
        local_identity: &IdentityKeyPair,
        signed_pre_key: &KeyPair,
        one_time_pre_key: Option<&KeyPair>,
        remote_identity: &[u8; 32],
        remote_ephemeral: &[u8; 32],
    ) -> Result<RootKey> {
        debug!(target: "crypto::x3dh", "Starting X3DH as responder (Bob)");

        let remote_identity_dh = P::identity_dh_public_key(remote_identity)?;
        let local_identity_dh = local_identity.dh_private_key();

        // DH1 = DH(SPK_B, IK_A)
        let dh1 = Zeroizing::new(P::shared_secret(
            signed_pre_key.private_key(),
            &remote_identity_dh,
        )?);
        // DH2 = DH(IK_B, EK_A)
        let dh2 = Zeroizing::new(P::shared_secret(&local_identity_dh, remote_ephemeral)?);
        // DH3 = DH(SPK_B, EK_A)
        let dh3 = Zeroizing::new(P::shared_secret(
            signed_pre_key.private_key(),
            remote_ephemeral,
        )?);
        // DH4 = DH(OPK_B, EK_A)
        let dh4 = match one_time_pre_key {
            Some(opk) => Some(Zeroizing::new(P::shared_secret(
                opk.private_key(),
                remote_ephemeral,
            )?)),
            None => None,
        };

        let root_key = Self::derive_root_key(&dh1, &dh2, &dh3, dh4.as_deref())?;
        debug!(target: "crypto::x3dh", "X3DH completed as responder");
        Ok(root_key)
    }

    fn derive_root_key(
        dh1: &[u8; 32],
        dh2: &[u8; 32],
        dh3: &[u8; 32],
        dh4: Option<&[u8; 32]>,
    ) -> Result<RootKey> {
        let mut concat = Zeroizing::new(Vec::with_capacity(32 * 4));
        concat.extend_from_slice(dh1);
        concat.extend_from_slice(dh2);
        concat.extend_from_slice(dh3);
        if let Some(dh4) = dh4 {
            concat.extend_from_slice(dh4);
        }

        let okm = Zeroizing::new(P::hkdf_derive_key(&concat, &[0u8; 32], X3DH_INFO, 32)?);
        let mut root_key = Zeroizing::new([0u8; 32]);
        root_key.copy_from_slice(&okm);
        Ok(root_key)
    }
}
