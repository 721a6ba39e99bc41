//! One-time launch payload parsing.
//!
//! The payload is a URL-encoded query string. Its authenticity hash is exposed verbatim and never
//! verified here.

use std::cell::RefCell;

use chrono::{DateTime, Duration, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};
use url::form_urlencoded;

use crate::error::LaunchDataError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// User identity carried by the launch payload.
pub struct User {
    /// Unique identifier.
    pub id: i64,
    /// Whether the user is a bot.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_bot: Option<bool>,
    /// First name.
    pub first_name: String,
    /// Last name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    /// Username without the leading `@`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// IETF language tag of the user's client.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language_code: Option<String>,
    /// Whether the user has a premium subscription.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_premium: Option<bool>,
    /// Profile photo URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
/// Kind of chat the app was opened from.
pub enum ChatType {
    /// Basic group.
    Group,
    /// Supergroup.
    Supergroup,
    /// Channel.
    Channel,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Chat context carried by the launch payload.
pub struct Chat {
    /// Unique identifier.
    pub id: i64,
    /// Chat kind.
    #[serde(rename = "type")]
    pub chat_type: ChatType,
    /// Title.
    pub title: String,
    /// Public username.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Chat photo URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
/// Parsed launch payload in its raw, untyped and typed forms.
pub struct LaunchData {
    /// Payload exactly as received.
    pub raw: String,
    /// Every key; JSON objects and arrays are decoded, other values stay strings.
    pub unsafe_params: Map<String, Value>,
    /// Session start time.
    pub auth_date: DateTime<Utc>,
    /// Authenticity hash, unverified.
    pub hash: String,
    /// Session identifier for inline answers.
    pub query_id: Option<String>,
    /// Start parameter from the launch link.
    pub start_param: Option<String>,
    /// Time after which messages may be sent through the session.
    pub can_send_after: Option<DateTime<Utc>>,
    /// Invoking user.
    pub user: Option<User>,
    /// Chat partner in private chats.
    pub receiver: Option<User>,
    /// Group or channel the app was opened from.
    pub chat: Option<Chat>,
}

impl Default for LaunchData {
    fn default() -> Self {
        Self {
            raw: String::new(),
            unsafe_params: Map::new(),
            auth_date: DateTime::<Utc>::UNIX_EPOCH,
            hash: String::new(),
            query_id: None,
            start_param: None,
            can_send_after: None,
            user: None,
            receiver: None,
            chat: None,
        }
    }
}

impl LaunchData {
    /// Parses a URL-encoded launch payload.
    ///
    /// # Errors
    ///
    /// Fails when `auth_date` or `hash` is missing or any known field cannot be decoded.
    pub fn parse(raw: &str) -> Result<Self, LaunchDataError> {
        let mut unsafe_params = Map::new();
        for (key, value) in form_urlencoded::parse(raw.as_bytes()) {
            let decoded = match serde_json::from_str::<Value>(&value) {
                Ok(json @ (Value::Object(_) | Value::Array(_))) => json,
                _ => Value::String(value.into_owned()),
            };
            unsafe_params.insert(key.into_owned(), decoded);
        }

        let text = |field: &'static str| -> Option<String> {
            unsafe_params.get(field).and_then(Value::as_str).map(str::to_string)
        };

        let auth_seconds = parse_seconds(
            "auth_date",
            &text("auth_date").ok_or(LaunchDataError::MissingField("auth_date"))?,
        )?;
        let auth_date = DateTime::<Utc>::from_timestamp(auth_seconds, 0).ok_or(
            LaunchDataError::InvalidField {
                field: "auth_date",
                reason: format!("{auth_seconds} is out of range"),
            },
        )?;
        let hash = text("hash").ok_or(LaunchDataError::MissingField("hash"))?;

        let can_send_after = match text("can_send_after") {
            Some(raw) => {
                let delay = parse_seconds("can_send_after", &raw)?;
                Some(auth_date + Duration::seconds(delay))
            }
            None => None,
        };

        Ok(Self {
            raw: raw.to_string(),
            auth_date,
            hash,
            query_id: text("query_id"),
            start_param: text("start_param"),
            can_send_after,
            user: typed(&unsafe_params, "user")?,
            receiver: typed(&unsafe_params, "receiver")?,
            chat: typed(&unsafe_params, "chat")?,
            unsafe_params,
        })
    }
}

fn parse_seconds(field: &'static str, raw: &str) -> Result<i64, LaunchDataError> {
    raw.trim()
        .parse::<i64>()
        .map_err(|err| LaunchDataError::InvalidField {
            field,
            reason: err.to_string(),
        })
}

fn typed<T: DeserializeOwned>(
    params: &Map<String, Value>,
    field: &'static str,
) -> Result<Option<T>, LaunchDataError> {
    params
        .get(field)
        .map(|value| {
            serde_json::from_value(value.clone()).map_err(|err| LaunchDataError::InvalidField {
                field,
                reason: err.to_string(),
            })
        })
        .transpose()
}

#[derive(Debug, Default)]
/// Holder of the current launch snapshot.
pub struct LaunchDataStore {
    current: RefCell<LaunchData>,
}

impl LaunchDataStore {
    /// Creates a store holding the empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses `raw` and replaces the snapshot wholesale.
    ///
    /// # Errors
    ///
    /// Returns the parse failure and keeps the previous snapshot.
    pub fn apply_launch_data(&self, raw: &str) -> Result<(), LaunchDataError> {
        let parsed = LaunchData::parse(raw)?;
        *self.current.borrow_mut() = parsed;
        Ok(())
    }

    /// Copy of the current snapshot.
    pub fn snapshot(&self) -> LaunchData {
        self.current.borrow().clone()
    }

    /// Payload exactly as received.
    pub fn raw(&self) -> String {
        self.current.borrow().raw.clone()
    }

    /// Session start time.
    pub fn auth_date(&self) -> DateTime<Utc> {
        self.current.borrow().auth_date
    }

    /// Authenticity hash, unverified.
    pub fn hash(&self) -> String {
        self.current.borrow().hash.clone()
    }

    /// Invoking user.
    pub fn user(&self) -> Option<User> {
        self.current.borrow().user.clone()
    }

    /// Chat the app was opened from.
    pub fn chat(&self) -> Option<Chat> {
        self.current.borrow().chat.clone()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    const USER_JSON: &str =
        r#"{"id":279058397,"first_name":"Vladislav","last_name":"Kibenko","username":"vdkfrost","language_code":"ru","is_premium":true}"#;

    fn encode(pairs: &[(&str, &str)]) -> String {
        form_urlencoded::Serializer::new(String::new())
            .extend_pairs(pairs)
            .finish()
    }

    #[test]
    fn parses_typed_and_untyped_views() {
        let raw = encode(&[
            ("query_id", "AAHdF6IQAAAAAN0XohDhrOrc"),
            ("user", USER_JSON),
            ("auth_date", "1662771648"),
            ("can_send_after", "30"),
            ("hash", "c501b71e775f74ce10e377dea85a7ea24ecd640b223ea86dfe453e0eaed2e2b2"),
            ("future_field", "kept"),
        ]);

        let data = LaunchData::parse(&raw).expect("parse");

        assert_eq!(data.raw, raw);
        assert_eq!(data.auth_date.timestamp(), 1_662_771_648);
        assert_eq!(
            data.can_send_after.map(|at| at.timestamp()),
            Some(1_662_771_678)
        );
        assert_eq!(data.query_id.as_deref(), Some("AAHdF6IQAAAAAN0XohDhrOrc"));
        let user = data.user.expect("user");
        assert_eq!(user.id, 279_058_397);
        assert_eq!(user.username.as_deref(), Some("vdkfrost"));
        assert_eq!(user.is_premium, Some(true));
        assert_eq!(data.unsafe_params["future_field"], json!("kept"));
        assert_eq!(data.unsafe_params["user"]["first_name"], json!("Vladislav"));
    }

    #[test]
    fn chat_payloads_decode_their_type() {
        let raw = encode(&[
            ("auth_date", "1"),
            ("hash", "h"),
            ("chat", r#"{"id":-100,"type":"supergroup","title":"Team"}"#),
            ("start_param", "ref42"),
        ]);
        let data = LaunchData::parse(&raw).expect("parse");
        let chat = data.chat.expect("chat");
        assert_eq!(chat.chat_type, ChatType::Supergroup);
        assert_eq!(chat.title, "Team");
        assert_eq!(data.start_param.as_deref(), Some("ref42"));
    }

    #[test]
    fn required_fields_and_bad_values_fail() {
        assert_eq!(
            LaunchData::parse("hash=abc"),
            Err(LaunchDataError::MissingField("auth_date"))
        );
        assert_eq!(
            LaunchData::parse("auth_date=1"),
            Err(LaunchDataError::MissingField("hash"))
        );
        assert!(matches!(
            LaunchData::parse("auth_date=soon&hash=abc"),
            Err(LaunchDataError::InvalidField { field: "auth_date", .. })
        ));
        assert!(matches!(
            LaunchData::parse(&encode(&[("auth_date", "1"), ("hash", "h"), ("user", r#"{"id":"x"}"#)])),
            Err(LaunchDataError::InvalidField { field: "user", .. })
        ));
    }

    #[test]
    fn store_replaces_snapshots_wholesale() {
        let store = LaunchDataStore::new();
        assert_eq!(store.auth_date(), DateTime::<Utc>::UNIX_EPOCH);
        assert_eq!(store.hash(), "");

        let first = encode(&[("auth_date", "10"), ("hash", "a"), ("user", USER_JSON)]);
        store.apply_launch_data(&first).expect("first");
        assert_eq!(store.raw(), first);
        assert!(store.user().is_some());

        let second = "auth_date=20&hash=b";
        store.apply_launch_data(second).expect("second");
        assert_eq!(store.raw(), second);
        assert_eq!(store.user(), None);
        assert_eq!(store.snapshot().unsafe_params.len(), 2);

        assert!(store.apply_launch_data("garbage").is_err());
        assert_eq!(store.raw(), second);
    }
}
