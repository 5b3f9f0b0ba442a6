//! Состояние ratchet одной сессии
//!
//! Symmetric ratchet (KDF_CK на каждое сообщение) плюс DH ratchet
//! (KDF_RK при смене направления). Все операции сначала вычисляют новые
//! значения и только после успеха AEAD/DH записывают их в состояние:
//! упавший вызов ничего не меняет.

use crate::crypto::keys::KeyPair;
use crate::crypto::provider::CryptoProvider;
use crate::error::{ProtocolError, Result};
use crate::utils::validation::is_all_zero;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, trace};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// Info label для root key из общего секрета X3DH
const ROOT_INFO: &[u8] = b"DoubleRatchetRoot";
/// Info label цепочки инициатор → ответчик
const INITIATOR_CHAIN_INFO: &[u8] = b"DoubleRatchetChain:initiator";
/// Info label цепочки ответчик → инициатор
const RESPONDER_CHAIN_INFO: &[u8] = b"DoubleRatchetChain:responder";

#[derive(Clone, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct RatchetState {
    root_key: [u8; 32],

    chain_key_send: [u8; 32],
    /// Последний message key отправки (для диагностики и тестов)
    message_key_send: [u8; 32],
    send_count: u64,

    chain_key_recv: [u8; 32],
    message_key_recv: [u8; 32],
    recv_count: u64,

    /// Наш текущий ratchet key
    local_ratchet: KeyPair,
    /// Текущий ratchet key партнёра
    #[zeroize(skip)]
    remote_ratchet: [u8; 32],
    /// Длина send chain до последнего DH ratchet
    previous_send_count: u64,
    /// Наша очередь делать DH ratchet. Первым ходит ответчик.
    has_turn: bool,
}

impl RatchetState {
    /// Инициализировать состояние из root key X3DH.
    ///
    /// Инициатор: `local_ratchet` = ephemeral key, `remote_ratchet` = SPK ответчика.
    /// Ответчик: `local_ratchet` = свой SPK, `remote_ratchet` = ephemeral инициатора.
    pub fn initialize<P: CryptoProvider>(
        shared_secret: &[u8; 32],
        is_initiator: bool,
        local_ratchet: KeyPair,
        remote_ratchet: [u8; 32],
    ) -> Result<Self> {
        let salt = [0u8; 32];
        let root = Zeroizing::new(P::hkdf_derive_key(shared_secret, &salt, ROOT_INFO, 32)?);
        let initiator_chain = Zeroizing::new(P::hkdf_derive_key(
            shared_secret,
            &salt,
            INITIATOR_CHAIN_INFO,
            32,
        )?);
        let responder_chain = Zeroizing::new(P::hkdf_derive_key(
            shared_secret,
            &salt,
            RESPONDER_CHAIN_INFO,
            32,
        )?);

        let (send, recv) = if is_initiator {
            (&initiator_chain, &responder_chain)
        } else {
            (&responder_chain, &initiator_chain)
        };

        let mut state = Self {
            root_key: [0u8; 32],
            chain_key_send: [0u8; 32],
            message_key_send: [0u8; 32],
            send_count: 0,
            chain_key_recv: [0u8; 32],
            message_key_recv: [0u8; 32],
            recv_count: 0,
            local_ratchet,
            remote_ratchet,
            previous_send_count: 0,
            has_turn: !is_initiator,
        };
        state.root_key.copy_from_slice(&root);
        state.chain_key_send.copy_from_slice(send);
        state.chain_key_recv.copy_from_slice(recv);

        debug!(
            target: "crypto::ratchet",
            is_initiator,
            "Ratchet state initialized"
        );

        Ok(state)
    }

    /// Зашифровать сообщение следующим message key отправки.
    pub fn encrypt<P: CryptoProvider>(&mut self, plaintext: &[u8]) -> Result<Vec<u8>> {
        let (message_key, next_chain) = P::kdf_ck(&self.chain_key_send)?;
        let message_key = Zeroizing::new(message_key);
        let next_chain = Zeroizing::new(next_chain);

        let ciphertext = P::aead_encrypt(&message_key[..], plaintext)?;

        self.chain_key_send = *next_chain;
        self.message_key_send = *message_key;
        self.send_count += 1;

        trace!(
            target: "crypto::ratchet",
            send_count = self.send_count,
            plaintext_len = plaintext.len(),
            ciphertext_len = ciphertext.len(),
            "Message encrypted"
        );

        Ok(ciphertext)
    }

    /// Расшифровать следующее сообщение receive chain.
    ///
    /// Строго по порядку: ровно один кандидатный ключ. При ошибке AEAD
    /// chain не сдвигается.
    pub fn decrypt<P: CryptoProvider>(&mut self, ciphertext: &[u8]) -> Result<Vec<u8>> {
        let (message_key, next_chain) = P::kdf_ck(&self.chain_key_recv)?;
        let message_key = Zeroizing::new(message_key);
        let next_chain = Zeroizing::new(next_chain);

        let plaintext = P::aead_decrypt(&message_key[..], ciphertext).map_err(|e| {
            debug!(
                target: "crypto::ratchet",
                recv_count = self.recv_count,
                "Decryption failed"
            );
            e
        })?;

        self.chain_key_recv = *next_chain;
        self.message_key_recv = *message_key;
        self.recv_count += 1;

        trace!(
            target: "crypto::ratchet",
            recv_count = self.recv_count,
            "Message decrypted"
        );

        Ok(plaintext)
    }

    /// DH ratchet на стороне отправителя.
    ///
    /// Генерирует новый ratchet key, пересевает send chain из
    /// `KDF_RK(root, DH(new, remote))` и отдаёт очередь партнёру.
    /// Возвращает новый публичный ключ, который нужно передать партнёру.
    pub fn advance_sending_ratchet<P: CryptoProvider>(&mut self) -> Result<[u8; 32]> {
        if !self.has_turn {
            return Err(ProtocolError::RatchetOutOfTurn);
        }

        let new_ratchet = P::generate_key_pair()?;
        let dh = Zeroizing::new(P::shared_secret(
            new_ratchet.private_key(),
            &self.remote_ratchet,
        )?);
        let (root_key, chain_key) = P::kdf_rk(&self.root_key, &dh)?;

        self.previous_send_count = self.send_count;
        self.root_key = root_key;
        self.chain_key_send = chain_key;
        self.send_count = 0;
        let public_key = new_ratchet.public_key;
        self.local_ratchet = new_ratchet;
        self.has_turn = false;

        debug!(
            target: "crypto::ratchet",
            previous_send_count = self.previous_send_count,
            ratchet_key = %hex::encode(public_key),
            "Sending ratchet advanced"
        );

        Ok(public_key)
    }

    /// DH ratchet на стороне получателя.
    ///
    /// Пересевает receive chain из `KDF_RK(root, DH(local, new_remote))`
    /// и забирает очередь.
    pub fn receive_new_ratchet_key<P: CryptoProvider>(
        &mut self,
        new_remote: &[u8; 32],
    ) -> Result<()> {
        if self.has_turn {
            return Err(ProtocolError::RatchetOutOfTurn);
        }
        if is_all_zero(new_remote) {
            return Err(ProtocolError::InvalidKeyMaterial(
                "ratchet key is the zero key".to_string(),
            ));
        }
        if *new_remote == self.remote_ratchet {
            return Err(ProtocolError::InvalidKeyMaterial(
                "ratchet key is unchanged".to_string(),
            ));
        }

        let dh = Zeroizing::new(P::shared_secret(
            self.local_ratchet.private_key(),
            new_remote,
        )?);
        let (root_key, chain_key) = P::kdf_rk(&self.root_key, &dh)?;

        self.root_key = root_key;
        self.chain_key_recv = chain_key;
        self.recv_count = 0;
        self.remote_ratchet = *new_remote;
        self.has_turn = true;

        debug!(
            target: "crypto::ratchet",
            ratchet_key = %hex::encode(new_remote),
            "Receiving ratchet advanced"
        );

        Ok(())
    }

    pub fn chain_key_send(&self) -> &[u8; 32] {
        &self.chain_key_send
    }

    pub fn message_key_send(&self) -> &[u8; 32] {
        &self.message_key_send
    }

    pub fn send_count(&self) -> u64 {
        self.send_count
    }

    pub fn chain_key_recv(&self) -> &[u8; 32] {
        &self.chain_key_recv
    }

    pub fn message_key_recv(&self) -> &[u8; 32] {
        &self.message_key_recv
    }

    pub fn recv_count(&self) -> u64 {
        self.recv_count
    }

    pub fn previous_send_count(&self) -> u64 {
        self.previous_send_count
    }

    /// Наш текущий ratchet public key
    pub fn ratchet_public_key(&self) -> &[u8; 32] {
        &self.local_ratchet.public_key
    }

    pub fn remote_ratchet_key(&self) -> &[u8; 32] {
        &self.remote_ratchet
    }

    pub fn has_turn(&self) -> bool {
        self.has_turn
    }
}

impl fmt::Debug for RatchetState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RatchetState")
            .field("send_count", &self.send_count)
            .field("recv_count", &self.recv_count)
            .field("previous_send_count", &self.previous_send_count)
            .field("ratchet_key", &hex::encode(self.local_ratchet.public_key))
            .field("remote_ratchet_key", &hex::encode(self.remote_ratchet))
            .field("has_turn", &self.has_turn)
            .finish_non_exhaustive()
    }
}
