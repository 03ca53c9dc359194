//! Configuration for a [`Hub`](crate::hub::Hub) instance.
//!
//! All fields have defaults, so an empty JSON object is a valid configuration.
//! Durations are serialized as integer milliseconds.

use serde::{Deserialize, Serialize};
use std::{fs::File, io::BufReader, path::Path, time::Duration};

use crate::{Error, InternalResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HubConfig {
    /// Per-subscriber buffering window of a channel, in messages. A subscriber
    /// that falls more than this many messages behind the newest push observes
    /// a `Lagged` error and resumes from the oldest retained message.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    /// Default bound applied by the host bridge to blocking waits that do not
    /// specify their own timeout.
    #[serde(default = "default_wait_timeout", with = "duration_ms")]
    pub wait_timeout: Duration,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
            wait_timeout: default_wait_timeout(),
        }
    }
}

impl HubConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> InternalResult<Self> {
        from_file(path)
    }

    pub fn from_str(s: &str) -> InternalResult<Self> {
        from_str(s)
    }
}

pub fn from_file<T: for<'de> Deserialize<'de>, P: AsRef<Path>>(path: P) -> InternalResult<T> {
    let file = File::open(path)
        .map_err(|e| Error::Internal(format!("Failed to open config file: {}", e)))?;
    let reader = BufReader::new(file);
    let config = serde_json::from_reader(reader)
        .map_err(|e| Error::Internal(format!("Failed to parse config file: {}", e)))?;
    Ok(config)
}

pub fn from_str<T: for<'de> Deserialize<'de>>(s: &str) -> InternalResult<T> {
    let config = serde_json::from_str(s)
        .map_err(|e| Error::Internal(format!("Failed to parse config: {}", e)))?;
    Ok(config)
}

fn default_channel_capacity() -> usize {
    256
}

fn default_wait_timeout() -> Duration {
    Duration::from_secs(30)
}

pub mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
