//! SQLite-backed store for scored windows. The scalar columns the dashboard
//! queries stay plaintext; the full classification detail is AES-GCM
//! encrypted. Key derived from a device-bound secret (in production: Secure
//! Enclave / Keystore / DPAPI).

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use rand::RngCore;
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::Mutex;

use crate::ensemble::ClassificationResult;
use crate::features::FeatureVector;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

const NONCE_LEN: usize = 12;
const KEY_LEN: usize = 32;

fn derive_key(seed: &[u8]) -> [u8; KEY_LEN] {
    use ring::digest;
    let mut out = [0u8; KEY_LEN];
    let h = digest::digest(&digest::SHA256, seed);
    out[..h.as_ref().len().min(KEY_LEN)].copy_from_slice(h.as_ref());
    out
}

fn encrypt(key: &[u8; KEY_LEN], plaintext: &[u8]) -> Result<String, aes_gcm::Error> {
    let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| aes_gcm::Error)?;
    let mut nonce = [0u8; NONCE_LEN];
    rand::thread_rng().fill_bytes(&mut nonce);
    let ciphertext = cipher.encrypt((&nonce).into(), plaintext)?;
    let mut out = nonce.to_vec();
    out.extend(ciphertext);
    Ok(BASE64.encode(&out))
}

fn decrypt(key: &[u8; KEY_LEN], encoded: &str) -> Result<Vec<u8>, BoxError> {
    let raw = BASE64.decode(encoded)?;
    if raw.len() < NONCE_LEN {
        return Err("payload too short".into());
    }
    let (nonce, ct) = raw.split_at(NONCE_LEN);
    let cipher = Aes256Gcm::new_from_slice(key).map_err(|e| format!("{:?}", e))?;
    Ok(cipher.decrypt(nonce.into(), ct)?)
}

/// One row per scored window: `(ts, verdict, combined_prob, syscall_rate,
/// churn_rate)` in the clear for the dashboard, full result JSON encrypted.
pub struct EventStore {
    conn: Mutex<Connection>,
    key: [u8; KEY_LEN],
}

impl EventStore {
    /// Open or create the DB at path. Key is derived from `secret`.
    pub fn open(path: &Path, secret: &[u8]) -> Result<Self, rusqlite::Error> {
        let conn = Connection::open(path)?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS windows (
                id TEXT PRIMARY KEY,
                ts INTEGER NOT NULL,
                verdict TEXT NOT NULL,
                combined_prob REAL NOT NULL,
                syscall_rate REAL NOT NULL,
                churn_rate REAL NOT NULL,
                detail_enc TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_windows_ts ON windows(ts);
            "#,
        )?;
        let key = derive_key(secret);
        Ok(Self {
            conn: Mutex::new(conn),
            key,
        })
    }

    /// Persist one scored window; returns the row id. A failure here is the
    /// caller's to log; persistence never gates ingestion.
    pub fn record(
        &self,
        result: &ClassificationResult,
        vector: &FeatureVector,
    ) -> Result<String, BoxError> {
        let id = uuid::Uuid::new_v4().to_string();
        let detail = serde_json::to_string(result)?;
        let enc = encrypt(&self.key, detail.as_bytes())?;
        self.conn.lock().unwrap().execute(
            "INSERT INTO windows (id, ts, verdict, combined_prob, syscall_rate, churn_rate, detail_enc)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                id,
                result.ts,
                result.verdict.as_str(),
                result.combined_prob,
                vector.get("syscall_rate").unwrap_or(0.0),
                vector.get("file_churn_rate").unwrap_or(0.0),
                enc
            ],
        )?;
        Ok(id)
    }

    /// Most recent scored windows, newest first:
    /// `(ts, verdict, combined_prob, syscall_rate, churn_rate)`.
    pub fn recent(&self, limit: u32) -> Result<Vec<(i64, String, f64, f64, f64)>, BoxError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT ts, verdict, combined_prob, syscall_rate, churn_rate
             FROM windows ORDER BY ts DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit], |row| {
            Ok((
                row.get(0)?,
                row.get(1)?,
                row.get(2)?,
                row.get(3)?,
                row.get(4)?,
            ))
        })?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    /// Decrypt the stored classification detail for one window id.
    pub fn get_detail(&self, id: &str) -> Result<Option<ClassificationResult>, BoxError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT detail_enc FROM windows WHERE id = ?1")?;
        let mut rows = stmt.query(params![id])?;
        if let Some(row) = rows.next()? {
            let enc: String = row.get(0)?;
            let plain = decrypt(&self.key, &enc)?;
            return Ok(Some(serde_json::from_slice(&plain)?));
        }
        Ok(None)
    }

    /// Retention: delete windows older than the given timestamp.
    pub fn prune_before(&self, ts: i64) -> Result<u64, rusqlite::Error> {
        let n = self
            .conn
            .lock()
            .unwrap()
            .execute("DELETE FROM windows WHERE ts < ?1", params![ts])?;
        Ok(n as u64)
    }
}
