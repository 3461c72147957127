//! Tick and grace lengths as whole milliseconds, for
//! `#[serde(with = "crate::serde_duration")]`.

use std::time::Duration;

use serde::ser::Error as _;
use serde::{Deserialize, Deserializer, Serializer};

pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    let millis = u32::try_from(value.as_millis())
        .map_err(|_| S::Error::custom(format!("{:?} is too long to store in milliseconds", value)))?;
    serializer.serialize_u32(millis)
}

pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
    u32::deserialize(deserializer).map(|millis| Duration::from_millis(millis.into()))
}
