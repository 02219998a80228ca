//! Opaque cursors and list envelopes shared by paginated endpoints.
//!
//! A cursor wraps the ordering key of the last item on a page. It travels as
//! unpadded base64url-encoded JSON so clients treat it as an opaque token.
//!
//! ```
//! use pagination::Cursor;
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, PartialEq, Serialize, Deserialize)]
//! struct Key {
//!     id: u32,
//! }
//!
//! let token = Cursor::new(Key { id: 7 }).encode().unwrap();
//! let decoded: Cursor<Key> = Cursor::decode(&token).unwrap();
//! assert_eq!(decoded.into_key(), Key { id: 7 });
//! ```

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Page size used when the client does not ask for one.
pub const DEFAULT_LIMIT: usize = 20;
/// Largest page size a client may request.
pub const MAX_LIMIT: usize = 100;

/// Failures decoding or validating pagination input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PaginationError {
    /// The cursor is not valid base64url.
    #[error("cursor is not valid base64url")]
    InvalidEncoding,
    /// The cursor decoded but does not hold a key of the expected shape.
    #[error("cursor payload is malformed: {message}")]
    InvalidPayload {
        /// Deserialiser message.
        message: String,
    },
    /// The key could not be serialised.
    #[error("cursor key could not be encoded: {message}")]
    Encode {
        /// Serialiser message.
        message: String,
    },
    /// The requested limit lies outside `1..=MAX_LIMIT`.
    #[error("limit must be between 1 and {max}", max = MAX_LIMIT)]
    InvalidLimit {
        /// Requested value.
        requested: usize,
    },
}

/// An opaque position in an ordered listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cursor<K> {
    key: K,
}

impl<K> Cursor<K> {
    /// Wrap an ordering key.
    #[must_use]
    pub const fn new(key: K) -> Self {
        Self { key }
    }

    /// Borrow the ordering key.
    #[must_use]
    pub const fn key(&self) -> &K {
        &self.key
    }

    /// Unwrap the ordering key.
    #[must_use]
    pub fn into_key(self) -> K {
        self.key
    }
}

impl<K: Serialize> Cursor<K> {
    /// Encode the key as an opaque token.
    ///
    /// # Errors
    /// Returns [`PaginationError::Encode`] when the key cannot be serialised.
    pub fn encode(&self) -> Result<String, PaginationError> {
        let json = serde_json::to_vec(&self.key).map_err(|err| PaginationError::Encode {
            message: err.to_string(),
        })?;
        Ok(URL_SAFE_NO_PAD.encode(json))
    }
}

impl<K: DeserializeOwned> Cursor<K> {
    /// Decode a token produced by [`Cursor::encode`].
    ///
    /// # Errors
    /// Returns [`PaginationError::InvalidEncoding`] or
    /// [`PaginationError::InvalidPayload`] for tampered tokens.
    pub fn decode(token: &str) -> Result<Self, PaginationError> {
        let bytes = URL_SAFE_NO_PAD
            .decode(token.trim())
            .map_err(|_| PaginationError::InvalidEncoding)?;
        let key = serde_json::from_slice(&bytes).map_err(|err| PaginationError::InvalidPayload {
            message: err.to_string(),
        })?;
        Ok(Self { key })
    }
}

/// Raw `cursor` and `limit` query parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageParams {
    /// Token of the previous page's last item.
    #[serde(default)]
    pub cursor: Option<String>,
    /// Requested page size.
    #[serde(default)]
    pub limit: Option<usize>,
}

impl PageParams {
    /// The requested limit, defaulting to [`DEFAULT_LIMIT`].
    ///
    /// # Errors
    /// Returns [`PaginationError::InvalidLimit`] outside `1..=MAX_LIMIT`.
    pub fn limit(&self) -> Result<usize, PaginationError> {
        match self.limit {
            None => Ok(DEFAULT_LIMIT),
            Some(requested) if (1..=MAX_LIMIT).contains(&requested) => Ok(requested),
            Some(requested) => Err(PaginationError::InvalidLimit { requested }),
        }
    }

    /// Decode the cursor, if one was supplied.
    ///
    /// # Errors
    /// Propagates [`Cursor::decode`] failures.
    pub fn cursor<K: DeserializeOwned>(&self) -> Result<Option<Cursor<K>>, PaginationError> {
        self.cursor
            .as_deref()
            .filter(|token| !token.trim().is_empty())
            .map(Cursor::decode)
            .transpose()
    }
}

/// Envelope returned by list endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Paginated<T> {
    /// Items on this page.
    pub data: Vec<T>,
    /// Token for the following page, absent on the last page.
    pub next_cursor: Option<String>,
}

impl<T> Paginated<T> {
    /// Build an envelope, encoding the next key when present.
    ///
    /// # Errors
    /// Returns [`PaginationError::Encode`] when the key cannot be serialised.
    pub fn new<K: Serialize>(data: Vec<T>, next: Option<K>) -> Result<Self, PaginationError> {
        let next_cursor = next.map(|key| Cursor::new(key).encode()).transpose()?;
        Ok(Self { data, next_cursor })
    }
}

#[cfg(test)]
mod tests {
    //! Cursor encoding and query parameter validation.

    use super::*;
    use rstest::rstest;

    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct Key {
        created_at: String,
        id: String,
    }

    fn key() -> Key {
        Key {
            created_at: "2026-03-10T09:00:00Z".to_owned(),
            id: "0b0c3f9e-0000-4000-8000-000000000001".to_owned(),
        }
    }

    #[rstest]
    fn tokens_are_url_safe() {
        let token = Cursor::new(key()).encode().expect("encode");
        assert!(
            token
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
        let decoded: Cursor<Key> = Cursor::decode(&token).expect("decode");
        assert_eq!(decoded.key(), &key());
    }

    #[rstest]
    #[case::not_base64("***", PaginationError::InvalidEncoding)]
    fn rejects_garbage(#[case] token: &str, #[case] expected: PaginationError) {
        let err = Cursor::<Key>::decode(token).expect_err("garbage");
        assert_eq!(err, expected);
    }

    #[rstest]
    fn rejects_foreign_payloads() {
        let token = URL_SAFE_NO_PAD.encode(br#"{"page":2}"#);
        let err = Cursor::<Key>::decode(&token).expect_err("wrong shape");
        assert!(matches!(err, PaginationError::InvalidPayload { .. }));
    }

    #[rstest]
    #[case(None, Ok(DEFAULT_LIMIT))]
    #[case(Some(1), Ok(1))]
    #[case(Some(MAX_LIMIT), Ok(MAX_LIMIT))]
    #[case(Some(0), Err(PaginationError::InvalidLimit { requested: 0 }))]
    #[case(Some(MAX_LIMIT + 1), Err(PaginationError::InvalidLimit { requested: MAX_LIMIT + 1 }))]
    fn limits_are_validated(
        #[case] limit: Option<usize>,
        #[case] expected: Result<usize, PaginationError>,
    ) {
        let params = PageParams {
            cursor: None,
            limit,
        };
        assert_eq!(params.limit(), expected);
    }

    #[rstest]
    fn blank_cursors_mean_first_page() {
        let params = PageParams {
            cursor: Some("  ".to_owned()),
            limit: None,
        };
        assert_eq!(params.cursor::<Key>(), Ok(None));
    }

    #[rstest]
    fn envelope_serialises_camel_case() {
        let page = Paginated::new(vec![1, 2], Some(key())).expect("envelope");
        let value = serde_json::to_value(&page).expect("json");
        assert_eq!(value["data"], serde_json::json!([1, 2]));
        assert!(value["nextCursor"].is_string());

        let last = Paginated::new(vec![3], None::<Key>).expect("envelope");
        let value = serde_json::to_value(&last).expect("json");
        assert!(value["nextCursor"].is_null());
    }
}
