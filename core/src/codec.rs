//! JSON encoding and the BaaS date representation.
//!
//! # Design
//! The server is inconsistent about dates: class bodies carry plain ISO
//! strings (`createdAt`, `updatedAt`), sometimes without milliseconds, while
//! the documented wire shape is the tagged object
//! `{"__type":"Date","iso":"2022-01-19T15:33:58.177Z"}`. Date fields opt in
//! with `#[serde(with = "codec::date")]` (or `codec::date::option`):
//!
//! - encoding always emits the tagged object with millisecond precision;
//! - decoding accepts a plain string with milliseconds, a plain string
//!   without them, or the tagged object.
//!
//! Everything else is plain `serde_json`.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// `yyyy-MM-dd'T'HH:mm:ss.SSS'Z'`, always UTC.
pub const DATE_FORMAT_MS: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// `yyyy-MM-dd'T'HH:mm:ss'Z'`, always UTC.
pub const DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

const INVALID_DATE: &str = "An invalid date string was provided when decoding dates.";

/// Encode a value as a JSON body.
pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec(value)
}

/// Decode a JSON body.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, serde_json::Error> {
    serde_json::from_slice(bytes)
}

/// Render a date with millisecond precision. Sub-millisecond digits are
/// truncated.
pub fn format_date(date: &DateTime<Utc>) -> String {
    date.format(DATE_FORMAT_MS).to_string()
}

/// Parse a plain date string. A literal `.` selects the millisecond format,
/// otherwise the second-precision format is used.
pub fn parse_date(value: &str) -> Option<DateTime<Utc>> {
    let format = if value.contains('.') {
        DATE_FORMAT_MS
    } else {
        DATE_FORMAT
    };
    parse_with(value, format)
}

fn parse_with(value: &str, format: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(value, format)
        .ok()
        .map(|naive| naive.and_utc())
}

/// Serde adapter for `DateTime<Utc>` fields.
pub mod date {
    use chrono::{DateTime, Utc};
    use serde::de::Error as _;
    use serde::ser::SerializeStruct;
    use serde::{Deserialize, Deserializer, Serializer};

    use super::{format_date, parse_date, parse_with, DATE_FORMAT_MS, INVALID_DATE};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum DateRepr {
        Plain(String),
        Tagged { iso: Option<String> },
    }

    pub fn serialize<S: Serializer>(date: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        let mut tagged = serializer.serialize_struct("Date", 2)?;
        tagged.serialize_field("__type", "Date")?;
        tagged.serialize_field("iso", &format_date(date))?;
        tagged.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let parsed = match DateRepr::deserialize(deserializer) {
            Ok(DateRepr::Plain(value)) => parse_date(&value),
            Ok(DateRepr::Tagged { iso }) => iso.and_then(|iso| parse_with(&iso, DATE_FORMAT_MS)),
            Err(_) => None,
        };
        parsed.ok_or_else(|| D::Error::custom(INVALID_DATE))
    }

    /// Serde adapter for `Option<DateTime<Utc>>` fields. Pair with
    /// `#[serde(default, skip_serializing_if = "Option::is_none")]`.
    pub mod option {
        use chrono::{DateTime, Utc};
        use serde::{Deserialize, Deserializer, Serializer};

        #[derive(Deserialize)]
        struct Wrapped(#[serde(deserialize_with = "super::deserialize")] DateTime<Utc>);

        pub fn serialize<S: Serializer>(
            date: &Option<DateTime<Utc>>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match date {
                Some(date) => super::serialize(date, serializer),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<DateTime<Utc>>, D::Error> {
            Ok(Option::<Wrapped>::deserialize(deserializer)?.map(|Wrapped(date)| date))
        }
    }
}
