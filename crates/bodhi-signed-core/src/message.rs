use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::build::compose_nvr;
use crate::{Error, Result};

/// A message as delivered by the bus: a topic plus a JSON body.
///
/// Build tagging messages carry their payload under `body.msg`:
///
/// ```json
/// {
///   "topic": "org.fedoraproject.prod.buildsys.tag",
///   "body": {
///     "msg_id": "2017-821031da-be3a-4f4b-91df-0baa834ca8a4",
///     "timestamp": 1484692585,
///     "msg": {
///       "build_id": 442562,
///       "name": "colord",
///       "version": "1.3.4",
///       "release": "1.fc26",
///       "tag": "f26-updates-testing-pending",
///       "tag_id": 214,
///       "instance": "s390",
///       "user": "sharkcz",
///       "owner": "sharkcz"
///     }
///   }
/// }
/// ```
///
/// Any other keys are carried along untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub topic: String,
    #[serde(default)]
    pub body: Value,
}

impl Message {
    #[must_use]
    pub fn new(topic: impl Into<String>, body: Value) -> Self {
        Self {
            id: Some(Uuid::new_v4().to_string()),
            topic: topic.into(),
            body,
        }
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let mut message: Self = serde_json::from_str(raw)?;
        if message.id.is_none() {
            message.id = message
                .body
                .get("msg_id")
                .and_then(Value::as_str)
                .map(String::from);
        }
        Ok(message)
    }

    /// Identifier used to correlate log lines; falls back to a fresh UUID.
    #[must_use]
    pub fn log_id(&self) -> String {
        self.id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string())
    }

    /// When the publisher sent the message, if the body says so.
    #[must_use]
    pub fn sent_at(&self) -> Option<DateTime<Utc>> {
        let secs = self.body.get("timestamp")?.as_i64()?;
        DateTime::from_timestamp(secs, 0)
    }
}

/// The fields of a build tagging event this crate cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagEvent {
    pub build_id: Option<i64>,
    pub name: String,
    pub version: String,
    pub release: String,
    pub tag: String,
}

impl TagEvent {
    /// Pull the tagging payload out of `body.msg`.
    ///
    /// Only key presence is checked. Numeric values are accepted and rendered
    /// as text, so a version of `2` reads as `"2"`.
    pub fn from_message(message: &Message) -> Result<Self> {
        let msg = match message.body.get("msg") {
            Some(Value::Object(msg)) => msg,
            Some(_) => {
                return Err(Error::MalformedMessage(
                    "'msg' is not an object".to_string(),
                ))
            }
            None => return Err(Error::missing_key("msg")),
        };

        Ok(Self {
            build_id: msg.get("build_id").and_then(Value::as_i64),
            name: text_field(msg, "name")?,
            version: text_field(msg, "version")?,
            release: text_field(msg, "release")?,
            tag: text_field(msg, "tag")?,
        })
    }

    #[must_use]
    pub fn nvr(&self) -> String {
        compose_nvr(&self.name, &self.version, &self.release)
    }
}

fn text_field(msg: &Map<String, Value>, key: &str) -> Result<String> {
    match msg.get(key) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(other) => Err(Error::MalformedMessage(format!(
            "key '{key}' has unexpected value {other}"
        ))),
        None => Err(Error::missing_key(key)),
    }
}
