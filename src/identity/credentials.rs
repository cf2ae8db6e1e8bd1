use std::fmt;
use std::path::{Path, PathBuf};

use base64::Engine;
use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ClientError, ClientResult};

/// Key under which the bearer credential is persisted.
pub const CREDENTIAL_KEY: &str = "access_token";

/// Opaque bearer token issued by the identity service.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new<S: Into<String>>(token: S) -> Self { Credential(token.into()) }

    pub fn as_str(&self) -> &str { &self.0 }

    pub fn bearer_header(&self) -> String { format!("Bearer {}", self.0) }

    /// Expiry from the `exp` claim when the token is a JWT. The signature is not
    /// checked; the value is informational only.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        let payload = self.0.split('.').nth(1)?;
        let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(payload.trim_end_matches('='))
            .ok()?;
        let claims: serde_json::Value = serde_json::from_slice(&bytes).ok()?;
        let exp = claims.get("exp")?.as_i64()?;
        Utc.timestamp_opt(exp, 0).single()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str("Credential(<redacted>)") }
}

/// Persistent slot for exactly one credential value.
pub trait CredentialStore: Send + Sync {
    fn load(&self) -> ClientResult<Option<Credential>>;
    fn save(&self, credential: &Credential) -> ClientResult<()>;
    fn remove(&self) -> ClientResult<()>;
}

#[derive(Serialize, Deserialize)]
struct CredentialFile {
    #[serde(rename = "access_token")]
    access_token: String,
}

/// JSON file holding `{"access_token": "..."}`.
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self { Self { path: path.into() } }

    pub fn path(&self) -> &Path { &self.path }

    fn tmp_path(&self) -> PathBuf { self.path.with_extension("json.tmp") }
}

impl CredentialStore for FileCredentialStore {
    fn load(&self) -> ClientResult<Option<Credential>> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(t) => t,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let file: CredentialFile = serde_json::from_str(&text)
            .map_err(|e| ClientError::storage(format!("corrupt credential file {}: {}", self.path.display(), e)))?;
        if file.access_token.is_empty() { return Ok(None); }
        Ok(Some(Credential::new(file.access_token)))
    }

    fn save(&self, credential: &Credential) -> ClientResult<()> {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() { std::fs::create_dir_all(dir)?; }
        }
        let body = serde_json::to_string_pretty(&CredentialFile { access_token: credential.as_str().to_string() })?;
        // write then rename so a crash never leaves a half-written token behind
        let tmp = self.tmp_path();
        std::fs::write(&tmp, body)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&tmp, std::fs::Permissions::from_mode(0o600))?;
        }
        std::fs::rename(&tmp, &self.path)?;
        debug!(target: "careerscope::session", "credential persisted path='{}'", self.path.display());
        Ok(())
    }

    fn remove(&self) -> ClientResult<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-process slot; nothing survives a restart.
#[derive(Default)]
pub struct MemoryCredentialStore {
    slot: Mutex<Option<Credential>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self { Self::default() }

    pub fn with_credential(credential: Credential) -> Self { Self { slot: Mutex::new(Some(credential)) } }
}

impl CredentialStore for MemoryCredentialStore {
    fn load(&self) -> ClientResult<Option<Credential>> { Ok(self.slot.lock().clone()) }

    fn save(&self, credential: &Credential) -> ClientResult<()> {
        *self.slot.lock() = Some(credential.clone());
        Ok(())
    }

    fn remove(&self) -> ClientResult<()> {
        *self.slot.lock() = None;
        Ok(())
    }
}
