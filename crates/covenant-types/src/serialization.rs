//! Serde implementations for covenant-types.
//!
//! Addresses serialize as their Bech32m string. Amounts are `u128`, which
//! TOML cannot represent, so config files use the [`amount`] adapter.
//! Durations accept `"2d"`-style strings through [`duration`].

use crate::{parse_amount, parse_duration, Address, Amount, Timestamp};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::str::FromStr;

impl Serialize for Address {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.to_string().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Address::from_str(&s).map_err(serde::de::Error::custom)
    }
}

/// `#[serde(with = "covenant_types::serialization::amount")]`
///
/// Writes amounts as decimal strings; reads either a string accepted by
/// [`parse_amount`] or a plain integer.
pub mod amount {
    use super::*;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Int(u64),
        Str(String),
    }

    pub fn serialize<S>(value: &Amount, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value.to_string().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Amount, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Repr::deserialize(deserializer)? {
            Repr::Int(v) => Ok(v as Amount),
            Repr::Str(s) => parse_amount(&s).map_err(serde::de::Error::custom),
        }
    }
}

/// `#[serde(with = "covenant_types::serialization::duration")]`
///
/// Writes seconds as an integer; reads an integer or a string accepted by
/// [`parse_duration`].
pub mod duration {
    use super::*;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Int(u64),
        Str(String),
    }

    pub fn serialize<S>(value: &Timestamp, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(*value)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Timestamp, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Repr::deserialize(deserializer)? {
            Repr::Int(v) => Ok(v),
            Repr::Str(s) => parse_duration(&s).map_err(serde::de::Error::custom),
        }
    }
}
