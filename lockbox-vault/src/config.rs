//! Key derivation configuration.

use crate::error::{VaultError, VaultResult};
use lockbox_crypto::KdfParams;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Lowest Argon2id cost accepted when the floor is enforced
/// (memory KiB, passes, lanes).
pub const KDF_FLOOR: KdfParams = KdfParams {
    memory_kib: 19 * 1024,
    iterations: 2,
    parallelism: 1,
};

/// Configuration for the Lockbox key hierarchy.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LockboxConfig {
    /// Argon2id parameters used for every passphrase derivation.
    #[serde(default)]
    pub kdf: KdfParams,

    /// Refuse parameters below [`KDF_FLOOR`] instead of only warning.
    #[serde(default = "default_enforce_floor")]
    pub enforce_kdf_floor: bool,
}

fn default_enforce_floor() -> bool {
    true
}

impl Default for LockboxConfig {
    fn default() -> Self {
        Self {
            kdf: KdfParams::default(),
            enforce_kdf_floor: true,
        }
    }
}

impl LockboxConfig {
    /// Cheap derivation for tests; the floor is not enforced.
    pub fn for_tests() -> Self {
        Self {
            kdf: KdfParams::for_tests(),
            enforce_kdf_floor: false,
        }
    }

    /// Parses and validates a JSON config.
    pub fn from_json(json: &str) -> VaultResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the KDF parameters against the floor.
    pub fn validate(&self) -> VaultResult<()> {
        let below = [
            ("memory_kib", self.kdf.memory_kib, KDF_FLOOR.memory_kib),
            ("iterations", self.kdf.iterations, KDF_FLOOR.iterations),
            ("parallelism", self.kdf.parallelism, KDF_FLOOR.parallelism),
        ];

        for (name, value, floor) in below {
            if value >= floor {
                continue;
            }
            if self.enforce_kdf_floor {
                return Err(VaultError::Config(format!(
                    "argon2 {name} {value} is below minimum {floor}"
                )));
            }
            warn!(param = name, value, floor, "argon2 parameter below production floor");
        }

        if self.kdf.parallelism == 0 || self.kdf.iterations == 0 {
            return Err(VaultError::Config(
                "argon2 iterations and parallelism must be non-zero".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_passes_floor() {
        assert!(LockboxConfig::default().validate().is_ok());
    }

    #[test]
    fn test_config_only_warns() {
        assert!(LockboxConfig::for_tests().validate().is_ok());
    }

    #[test]
    fn weak_params_rejected_when_enforced() {
        let config = LockboxConfig {
            kdf: KdfParams::for_tests(),
            enforce_kdf_floor: true,
        };
        let err = config.validate().unwrap_err();
        assert!(matches!(err, VaultError::Config(msg) if msg.contains("memory_kib")));
    }

    #[test]
    fn from_json_fills_defaults() {
        let config = LockboxConfig::from_json("{}").unwrap();
        assert_eq!(config.kdf, KdfParams::default());
        assert!(config.enforce_kdf_floor);
    }

    #[test]
    fn from_json_reads_kdf_section() {
        let json = r#"{
            "kdf": { "memory_kib": 2048, "iterations": 1, "parallelism": 1 },
            "enforce_kdf_floor": false
        }"#;
        let config = LockboxConfig::from_json(json).unwrap();
        assert_eq!(config.kdf.memory_kib, 2048);
    }

    #[test]
    fn zero_parallelism_always_rejected() {
        let config = LockboxConfig {
            kdf: KdfParams {
                parallelism: 0,
                ..KdfParams::for_tests()
            },
            enforce_kdf_floor: false,
        };
        assert!(matches!(config.validate(), Err(VaultError::Config(_))));
    }

    #[test]
    fn malformed_json_is_serialization_error() {
        assert!(matches!(
            LockboxConfig::from_json("{ not json"),
            Err(VaultError::Serialization(_))
        ));
    }
}
