// 登録キー・ストアキーの暗号化
//
// ストアキーを不透明な外部向けトークンへ決定的かつ可逆に変換する。
// 同じキーは常に同じ暗号文になるため、検索インデックスの
// ドキュメントIDとしてそのまま使える。

use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockDecrypt, BlockEncrypt, KeyInit};
use aes::Aes128;
use thiserror::Error;

/// AESブロック長（バイト）
const BLOCK_SIZE: usize = 16;

/// キー暗号化のエラー型
#[derive(Debug, Error, Clone, PartialEq)]
pub enum KeyCipherError {
    /// 暗号鍵が不正
    #[error("invalid encryption key: {0}")]
    InvalidKey(String),

    /// 暗号文が復号できない
    #[error("invalid ciphertext: {0}")]
    InvalidCiphertext(String),

    /// 環境変数が欠落
    #[error("missing environment variable: {0}")]
    MissingEnvVar(String),
}

/// ストアキーの決定的・可逆変換
///
/// encryptは同じ入力に対して常に同じ出力を返すこと。
pub trait RegistrationKeyCipher: Send + Sync {
    /// ストアキーを不透明トークンへ変換
    fn encrypt(&self, plaintext: &str) -> String;

    /// 不透明トークンからストアキーを復元
    fn decrypt(&self, ciphertext: &str) -> Result<String, KeyCipherError>;
}

/// AES-128ブロック暗号による実装
///
/// 平文をゼロパディングしてブロック単位で暗号化し、16進文字列にする。
/// IVを使わないため決定的だが、キーは高エントロピーの内部識別子で
/// あることを前提とする。
#[derive(Clone)]
pub struct AesRegistrationKeyCipher {
    cipher: Aes128,
}

impl std::fmt::Debug for AesRegistrationKeyCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AesRegistrationKeyCipher").finish_non_exhaustive()
    }
}

impl AesRegistrationKeyCipher {
    /// 16バイトの鍵から作成
    pub fn new(key: [u8; BLOCK_SIZE]) -> Self {
        Self {
            cipher: Aes128::new(GenericArray::from_slice(&key)),
        }
    }

    /// 32文字の16進文字列から作成
    pub fn from_hex(hex_key: &str) -> Result<Self, KeyCipherError> {
        let bytes = hex::decode(hex_key.trim())
            .map_err(|e| KeyCipherError::InvalidKey(e.to_string()))?;
        let key: [u8; BLOCK_SIZE] = bytes.try_into().map_err(|_| {
            KeyCipherError::InvalidKey(format!(
                "key must be {} hex characters",
                BLOCK_SIZE * 2
            ))
        })?;
        Ok(Self::new(key))
    }

    /// 環境変数から作成
    ///
    /// 環境変数:
    /// - ENCRYPTION_KEY: 32文字の16進文字列
    pub fn from_env() -> Result<Self, KeyCipherError> {
        let hex_key = std::env::var("ENCRYPTION_KEY")
            .map_err(|_| KeyCipherError::MissingEnvVar("ENCRYPTION_KEY".to_string()))?;
        Self::from_hex(&hex_key)
    }
}

impl RegistrationKeyCipher for AesRegistrationKeyCipher {
    fn encrypt(&self, plaintext: &str) -> String {
        let mut bytes = plaintext.as_bytes().to_vec();
        // ブロック境界までゼロパディング
        let padded_len = bytes.len().div_ceil(BLOCK_SIZE).max(1) * BLOCK_SIZE;
        bytes.resize(padded_len, 0u8);

        for chunk in bytes.chunks_mut(BLOCK_SIZE) {
            let block = GenericArray::from_mut_slice(chunk);
            self.cipher.encrypt_block(block);
        }

        hex::encode(bytes)
    }

    fn decrypt(&self, ciphertext: &str) -> Result<String, KeyCipherError> {
        let mut bytes = hex::decode(ciphertext.trim())
            .map_err(|e| KeyCipherError::InvalidCiphertext(e.to_string()))?;

        if bytes.is_empty() || bytes.len() % BLOCK_SIZE != 0 {
            return Err(KeyCipherError::InvalidCiphertext(format!(
                "ciphertext length {} is not a multiple of the block size",
                bytes.len()
            )));
        }

        for chunk in bytes.chunks_mut(BLOCK_SIZE) {
            let block = GenericArray::from_mut_slice(chunk);
            self.cipher.decrypt_block(block);
        }

        // パディングを取り除く
        while bytes.last() == Some(&0u8) {
            bytes.pop();
        }

        String::from_utf8(bytes).map_err(|e| KeyCipherError::InvalidCiphertext(e.to_string()))
    }
}
