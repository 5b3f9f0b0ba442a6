//! Session API - High-level interface for secure messaging sessions
//!
//! Объединяет X3DH (handshake) + RatchetState (ratchet) и identity-ключ
//! локального пользователя в один объект на разговор.
//!
//! ## Состояния
//!
//! ```text
//! Uninitialized ──establish_session / accept_session──→ Established
//!      ↑                        │
//!      └──── любая ошибка ──────┘  (state остаётся None)
//! ```
//!
//! ## Типичный сценарий использования
//!
//! ### Alice (инициатор)
//! ```text
//! 1. Alice получает Bob's bundle от сервера
//! 2. handshake = session.establish_session(&bundle)?
//! 3. ciphertext = session.encrypt_message(plaintext)?
//! 4. Отправляет handshake + ciphertext → Server → Bob
//! ```
//!
//! ### Bob (получатель)
//! ```text
//! 1. session.accept_session_with_keys(&handshake, &mut key_manager)?
//! 2. plaintext = session.decrypt_message(&ciphertext)?
//! ```
//!
//! ## Конкурентность
//!
//! Один писатель на сессию: вызывающий код сериализует encrypt, decrypt и
//! ротацию одной сессии (актор разговора, мьютекс, event loop). Своего
//! замка у сессии нет.

use crate::crypto::handshake::{InitialHandshake, X3DHKeyBundle, X3DHProtocol};
use crate::crypto::keys::{IdentityKeyPair, KeyManager, KeyPair};
use crate::crypto::messaging::RatchetState;
use crate::crypto::provider::CryptoProvider;
use crate::crypto::suites::classic::ClassicSuiteProvider;
use crate::error::{ProtocolError, Result};
use crate::rotation::IdentityKeyRotationManager;
use crate::utils::clock::elapsed_since;
use crate::utils::serialization;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::marker::PhantomData;
use std::time::Duration;
use tracing::{debug, info};
use zeroize::Zeroize;

/// Сессия с одним контактом
pub struct SignalSession<P: CryptoProvider = ClassicSuiteProvider> {
    session_id: String,
    local_user: String,
    remote_user: String,

    /// Текущий identity-ключ локального пользователя
    identity: IdentityKeyPair,

    /// Предыдущий identity-ключ, выставляется только ротацией
    previous_identity_key: Option<[u8; 32]>,

    /// Identity-ключ партнёра, известный после handshake
    remote_identity_key: Option<[u8; 32]>,

    key_rotation_time: DateTime<Utc>,
    is_initiator: bool,

    /// None пока сессия не установлена
    state: Option<RatchetState>,

    _phantom: PhantomData<P>,
}

impl<P: CryptoProvider> SignalSession<P> {
    pub fn new(
        local_user: impl Into<String>,
        remote_user: impl Into<String>,
        identity: IdentityKeyPair,
        is_initiator: bool,
    ) -> Self {
        Self::new_at(local_user, remote_user, identity, is_initiator, Utc::now())
    }

    /// Как [`Self::new`], но с явным моментом создания identity-ключа
    pub fn new_at(
        local_user: impl Into<String>,
        remote_user: impl Into<String>,
        identity: IdentityKeyPair,
        is_initiator: bool,
        key_rotation_time: DateTime<Utc>,
    ) -> Self {
        Self {
            session_id: uuid::Uuid::new_v4().to_string(),
            local_user: local_user.into(),
            remote_user: remote_user.into(),
            identity,
            previous_identity_key: None,
            remote_identity_key: None,
            key_rotation_time,
            is_initiator,
            state: None,
            _phantom: PhantomData,
        }
    }

    // ========================================================================
    // Установка сессии
    // ========================================================================

    /// Установить сессию как инициатор.
    ///
    /// Проверяет подпись bundle, выполняет X3DH и инициализирует ratchet.
    /// Состояние записывается только при полном успехе; при любой ошибке
    /// сессия остаётся неустановленной.
    pub fn establish_session(&mut self, bundle: &X3DHKeyBundle) -> Result<InitialHandshake> {
        if !self.is_initiator {
            return Err(ProtocolError::RoleMismatch);
        }

        debug!(
            target: "crypto::session",
            session_id = %self.session_id,
            remote_user = %self.remote_user,
            "Establishing session as initiator"
        );

        let ephemeral = P::generate_key_pair()?;
        let root_key = X3DHProtocol::<P>::perform_as_initiator(&self.identity, &ephemeral, bundle)?;

        let ephemeral_key = ephemeral.public_key;
        let state =
            RatchetState::initialize::<P>(&root_key, true, ephemeral, bundle.signed_pre_key)?;

        self.state = Some(state);
        self.remote_identity_key = Some(bundle.identity_key);

        info!(
            target: "crypto::session",
            session_id = %self.session_id,
            one_time_prekey = bundle.one_time_pre_key.is_some(),
            "Session established"
        );

        Ok(InitialHandshake {
            initiator_identity: *self.identity.public_key(),
            ephemeral_key,
            signed_pre_key_id: bundle.signed_pre_key_id,
            one_time_pre_key_id: bundle.one_time_pre_key.as_ref().map(|opk| opk.key_id),
        })
    }

    /// Принять сессию как ответчик с явно переданными prekeys.
    pub fn accept_session(
        &mut self,
        handshake: &InitialHandshake,
        signed_pre_key: &KeyPair,
        one_time_pre_key: Option<&KeyPair>,
    ) -> Result<()> {
        if self.is_initiator {
            return Err(ProtocolError::RoleMismatch);
        }
        if handshake.one_time_pre_key_id.is_some() != one_time_pre_key.is_some() {
            return Err(ProtocolError::InvalidKeyMaterial(
                "one-time prekey does not match the handshake".to_string(),
            ));
        }

        debug!(
            target: "crypto::session",
            session_id = %self.session_id,
            remote_user = %self.remote_user,
            "Accepting session as responder"
        );

        let root_key = X3DHProtocol::<P>::perform_as_responder(
            &self.identity,
            signed_pre_key,
            one_time_pre_key,
            &handshake.initiator_identity,
            &handshake.ephemeral_key,
        )?;

        let state = RatchetState::initialize::<P>(
            &root_key,
            false,
            signed_pre_key.clone(),
            handshake.ephemeral_key,
        )?;

        self.state = Some(state);
        self.remote_identity_key = Some(handshake.initiator_identity);

        info!(
            target: "crypto::session",
            session_id = %self.session_id,
            "Session accepted"
        );

        Ok(())
    }

    /// Принять сессию, найдя prekeys в `KeyManager`.
    ///
    /// One-time prekey изымается из менеджера только после успешного X3DH.
    pub fn accept_session_with_keys(
        &mut self,
        handshake: &InitialHandshake,
        keys: &mut KeyManager<P>,
    ) -> Result<()> {
        let signed_pre_key = keys
            .get_prekey(handshake.signed_pre_key_id)
            .ok_or(ProtocolError::PreKeyNotFound(handshake.signed_pre_key_id))?
            .key_pair
            .clone();

        let one_time_pre_key = match handshake.one_time_pre_key_id {
            Some(key_id) => Some(
                keys.one_time_prekey(key_id)
                    .ok_or(ProtocolError::PreKeyNotFound(key_id))?
                    .key_pair
                    .clone(),
            ),
            None => None,
        };

        self.accept_session(handshake, &signed_pre_key, one_time_pre_key.as_ref())?;

        if let Some(key_id) = handshake.one_time_pre_key_id {
            keys.take_one_time_prekey(key_id)?;
        }
        Ok(())
    }

    // ========================================================================
    // Data plane
    // ========================================================================

    /// Зашифровать сообщение. Результат: `nonce || ciphertext || tag`.
    pub fn encrypt_message(&mut self, plaintext: &[u8]) -> Result<Vec<u8>> {
        self.state_mut()?.encrypt::<P>(plaintext)
    }

    /// Расшифровать следующее сообщение партнёра.
    pub fn decrypt_message(&mut self, ciphertext: &[u8]) -> Result<Vec<u8>> {
        self.state_mut()?.decrypt::<P>(ciphertext)
    }

    /// DH ratchet: новый ratchet key для передачи партнёру
    pub fn advance_sending_ratchet(&mut self) -> Result<[u8; 32]> {
        self.state_mut()?.advance_sending_ratchet::<P>()
    }

    /// DH ratchet: принять новый ratchet key партнёра
    pub fn receive_new_ratchet_key(&mut self, ratchet_key: &[u8; 32]) -> Result<()> {
        self.state_mut()?.receive_new_ratchet_key::<P>(ratchet_key)
    }

    fn state_mut(&mut self) -> Result<&mut RatchetState> {
        self.state.as_mut().ok_or(ProtocolError::UninitializedSession)
    }

    // ========================================================================
    // Identity-ключ
    // ========================================================================

    /// Заменить identity-ключ на свежий.
    ///
    /// Новый ключ генерируется до изменения полей, поэтому наблюдатель
    /// видит либо старое состояние, либо новое целиком. Ratchet state не
    /// трогается: уже установленная сессия продолжает работать.
    pub fn rotate_identity_key_at(&mut self, now: DateTime<Utc>) -> Result<[u8; 32]> {
        let new_identity = P::generate_identity_key_pair()?;
        let old_public = *self.identity.public_key();
        let new_public = *new_identity.public_key();

        // Проверка до присваивания: при отказе сессия не меняется
        IdentityKeyRotationManager::<P>::verify_identity_key_rotation(&old_public, &new_public)?;

        self.identity = new_identity;
        self.previous_identity_key = Some(old_public);
        self.key_rotation_time = now;

        info!(
            target: "crypto::session",
            session_id = %self.session_id,
            old_key = %hex::encode(old_public),
            new_key = %hex::encode(new_public),
            "Identity key rotated"
        );

        Ok(new_public)
    }

    /// Признаётся ли ключ identity-ключом этой стороны.
    ///
    /// Текущий ключ - всегда. Предыдущий - только пока с момента ротации
    /// прошло меньше `grace`.
    pub fn recognizes_identity_key(
        &self,
        key: &[u8; 32],
        now: DateTime<Utc>,
        grace: Duration,
    ) -> bool {
        if key == self.identity.public_key() {
            return true;
        }
        match &self.previous_identity_key {
            Some(previous) if previous == key => elapsed_since(self.key_rotation_time, now)
                .map(|elapsed| elapsed < grace)
                .unwrap_or(true),
            _ => false,
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn local_user(&self) -> &str {
        &self.local_user
    }

    pub fn remote_user(&self) -> &str {
        &self.remote_user
    }

    pub fn identity_key(&self) -> &[u8; 32] {
        self.identity.public_key()
    }

    pub fn identity(&self) -> &IdentityKeyPair {
        &self.identity
    }

    pub fn previous_identity_key(&self) -> Option<&[u8; 32]> {
        self.previous_identity_key.as_ref()
    }

    pub fn remote_identity_key(&self) -> Option<&[u8; 32]> {
        self.remote_identity_key.as_ref()
    }

    pub fn key_rotation_time(&self) -> DateTime<Utc> {
        self.key_rotation_time
    }

    pub fn is_initiator(&self) -> bool {
        self.is_initiator
    }

    pub fn is_established(&self) -> bool {
        self.state.is_some()
    }

    pub fn state(&self) -> Option<&RatchetState> {
        self.state.as_ref()
    }

    // ========================================================================
    // Persistence
    // ========================================================================

    pub fn to_snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.session_id.clone(),
            local_user: self.local_user.clone(),
            remote_user: self.remote_user.clone(),
            identity_seed: *self.identity.seed(),
            previous_identity_key: self.previous_identity_key,
            remote_identity_key: self.remote_identity_key,
            key_rotation_time: self.key_rotation_time,
            is_initiator: self.is_initiator,
            state: self.state.clone(),
            suite_id: P::suite_id(),
        }
    }

    pub fn from_snapshot(snapshot: &SessionSnapshot) -> Result<Self> {
        if snapshot.suite_id != P::suite_id() {
            return Err(ProtocolError::Serialization(format!(
                "snapshot suite {} does not match provider suite {}",
                snapshot.suite_id,
                P::suite_id()
            )));
        }

        Ok(Self {
            session_id: snapshot.session_id.clone(),
            local_user: snapshot.local_user.clone(),
            remote_user: snapshot.remote_user.clone(),
            identity: IdentityKeyPair::from_seed(&snapshot.identity_seed),
            previous_identity_key: snapshot.previous_identity_key,
            remote_identity_key: snapshot.remote_identity_key,
            key_rotation_time: snapshot.key_rotation_time,
            is_initiator: snapshot.is_initiator,
            state: snapshot.state.clone(),
            _phantom: PhantomData,
        })
    }
}

/// Сериализуемый снимок сессии для слоя хранения
#[derive(Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub session_id: String,
    pub local_user: String,
    pub remote_user: String,
    identity_seed: [u8; 32],
    pub previous_identity_key: Option<[u8; 32]>,
    pub remote_identity_key: Option<[u8; 32]>,
    pub key_rotation_time: DateTime<Utc>,
    pub is_initiator: bool,
    state: Option<RatchetState>,
    pub suite_id: u16,
}

impl SessionSnapshot {
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        serialization::to_bytes(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        serialization::from_bytes(bytes)
    }
}

impl Drop for SessionSnapshot {
    fn drop(&mut self) {
        self.identity_seed.zeroize();
    }
}
