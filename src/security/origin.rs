//! Origin policy for stream WebSocket upgrades.
//!
//! - No `Origin` header: allowed (units, CLI tools and test clients don't send one).
//! - Otherwise the origin must exactly match an entry of the allow-list.
//! - Without a configured allow-list only the local dev servers are allowed.

use thiserror::Error;

/// Environment variable holding the comma-separated allow-list.
pub const ALLOWED_ORIGINS_ENV: &str = "CORS_ALLOWED_ORIGINS";

/// Origins allowed when nothing is configured.
pub const DEV_ORIGINS: [&str; 2] = ["http://localhost:5173", "http://localhost:3000"];

#[derive(Debug, Error, PartialEq, Eq)]
#[error("origin '{origin}' is not in the allowlist")]
pub struct OriginRejected {
    pub origin: String,
}

/// Allow-list of browser origins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OriginPolicy {
    allowed: Vec<String>,
}

impl OriginPolicy {
    /// Policy from an explicit list; `None` or an empty list falls back to
    /// [`DEV_ORIGINS`].
    pub fn new(allowed: Option<Vec<String>>) -> Self {
        let allowed: Vec<String> = allowed
            .unwrap_or_default()
            .into_iter()
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty())
            .collect();

        if allowed.is_empty() {
            Self::development()
        } else {
            Self { allowed }
        }
    }

    /// Policy from a raw comma-separated setting such as the value of
    /// `CORS_ALLOWED_ORIGINS`.
    pub fn from_setting(setting: Option<&str>) -> Self {
        let allowed = setting.map(|raw| raw.split(',').map(String::from).collect());
        Self::new(allowed)
    }

    pub fn development() -> Self {
        Self {
            allowed: DEV_ORIGINS.iter().map(|o| o.to_string()).collect(),
        }
    }

    pub fn allowed(&self) -> &[String] {
        &self.allowed
    }

    /// Decide on the declared origin of an upgrade request.
    pub fn check(&self, origin: Option<&str>) -> Result<(), OriginRejected> {
        let Some(origin) = origin else {
            return Ok(());
        };

        if self.allowed.iter().any(|allowed| allowed == origin) {
            Ok(())
        } else {
            Err(OriginRejected {
                origin: origin.to_string(),
            })
        }
    }

    pub fn is_allowed(&self, origin: Option<&str>) -> bool {
        self.check(origin).is_ok()
    }
}

impl Default for OriginPolicy {
    fn default() -> Self {
        Self::development()
    }
}
