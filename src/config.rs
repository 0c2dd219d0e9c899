use std::time::Duration;

#[cfg(feature = "fs")]
use std::path::Path;

use crate::gap::{uuid, Uuid};

/// Default service UUID.
pub const DEFAULT_SERVICE: Uuid = uuid(0x6D8FE6C4_9557_445A_846C_BA502F8997CF);

/// Default characteristic UUID.
pub const DEFAULT_CHARACTERISTIC: Uuid = uuid(0x2DE8E7DD_273D_40B7_ACB7_BB2FCD3D8429);

/// Peripheral configuration. Missing fields take their default values.
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Published and advertised service UUID.
    pub service: Uuid,
    /// UUID of the readable characteristic.
    pub characteristic: Uuid,
    /// Local name included in the advertisement.
    pub local_name: Option<String>,
    /// Maximum time to wait for each radio stack confirmation, serialized as
    /// milliseconds. `0` or `null` waits indefinitely.
    #[serde(with = "opt_millis")]
    pub stage_timeout: Option<Duration>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service: DEFAULT_SERVICE,
            characteristic: DEFAULT_CHARACTERISTIC,
            local_name: None,
            // Same as the ATT transaction timeout ([Vol 3] Part F, Section 3.3.3)
            stage_timeout: Some(Duration::from_secs(30)),
        }
    }
}

#[cfg(feature = "fs")]
impl Config {
    const FILE_NAME: &'static str = "peripheral.json";

    /// Loads the configuration from a JSON file. A missing file produces the
    /// default configuration.
    pub fn load(path: impl AsRef<Path>) -> crate::Result<Self> {
        use std::io;
        let path = path.as_ref();
        let s = match std::fs::read_to_string(path) {
            Ok(s) => s,
            Err(e) if matches!(e.kind(), io::ErrorKind::NotFound) => {
                tracing::debug!("No configuration at {}, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(e) => {
                tracing::error!("Failed to read: {} ({e})", path.display());
                return Err(e.into());
            }
        };
        serde_json::from_str(&s).map_err(|e| {
            tracing::error!("Invalid file contents: {} ({e})", path.display());
            e.into()
        })
    }

    /// Loads the configuration from the current user's configuration
    /// directory. The defaults are used if the directory cannot be determined.
    pub fn per_user(app: impl AsRef<Path>) -> crate::Result<Self> {
        let Some(dir) = dirs::config_dir() else {
            tracing::warn!("User configuration directory not available");
            return Ok(Self::default());
        };
        Self::load(dir.join(app.as_ref()).join(Self::FILE_NAME))
    }

    /// Saves the configuration as a JSON file, creating parent directories as
    /// needed.
    pub fn save(&self, path: impl AsRef<Path>) -> crate::Result<()> {
        let path = path.as_ref();
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        tracing::debug!("Wrote: {}", path.display());
        Ok(())
    }
}

mod opt_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(v: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(v.map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        let ms = Option::<u64>::deserialize(d)?;
        Ok(ms.filter(|&ms| ms != 0).map(Duration::from_millis))
    }
}
