use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::ShareError;

// Method-call envelope shared with the host application.
// A call is a method name plus a bag of loosely typed arguments, the reply is exactly one of
// success, error(code, message) or not-implemented. Both sides can be carried as JSON.

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Bytes(Vec<u8>),
    List(Vec<Value>),
    Map(HashMap<String, Value>),
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {Value::Bool(value)}
}
impl From<&str> for Value {
    fn from(value: &str) -> Self {Value::String(value.to_string())}
}
impl From<String> for Value {
    fn from(value: String) -> Self {Value::String(value)}
}
impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {Value::Bytes(value)}
}
impl From<i64> for Value {
    fn from(value: i64) -> Self {Value::Int(value)}
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Arguments(HashMap<String, Value>);

impl Arguments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: &str, value: impl Into<Value>) {
        self.0.insert(key.to_string(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// A non-empty string argument. Anything else reads as absent.
    pub fn string(&self, key: &str) -> Option<&str> {
        match self.get(key) {
            Some(Value::String(s)) if !s.is_empty() => Some(s.as_str()),
            _ => None,
        }
    }

    /// The first key in `keys` holding a non-empty string.
    pub fn first_string(&self, keys: &[&str]) -> Option<&str> {
        keys.iter().find_map(|key| self.string(key))
    }

    /// Raw bytes, sent either as a byte buffer or as a list of integers in 0..=255.
    pub fn bytes(&self, key: &str) -> Option<Vec<u8>> {
        match self.get(key)? {
            Value::Bytes(bytes) => Some(bytes.clone()),
            Value::List(items) => items.iter().map(|item| match item {
                Value::Int(i) => u8::try_from(*i).ok(),
                _ => None,
            }).collect(),
            _ => None,
        }
    }
}

impl FromIterator<(String, Value)> for Arguments {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        Arguments(iter.into_iter().collect())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodCall {
    pub method: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub arguments: Arguments,
}

/// Host channels send `"arguments": null` for calls without arguments.
fn null_as_empty<'de, D: serde::Deserializer<'de>>(deserializer: D) -> Result<Arguments, D::Error> {
    Ok(Option::<Arguments>::deserialize(deserializer)?.unwrap_or_default())
}

impl MethodCall {
    pub fn new(method: &str, arguments: Arguments) -> Self {
        MethodCall{method: method.to_string(), arguments}
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Reply {
    Success(Value),
    Error { code: String, message: String },
    NotImplemented,
}

impl Reply {
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            format!(r#"{{"error":{{"code":"SHARE_FAILED","message":"{}"}}}}"#, e.to_string().replace('"', "'"))
        })
    }
}

impl From<Result<Value, ShareError>> for Reply {
    fn from(result: Result<Value, ShareError>) -> Self {
        match result {
            Ok(value) => Reply::Success(value),
            Err(ShareError::NotImplemented(_)) => Reply::NotImplemented,
            Err(e) => Reply::Error{code: e.code().to_string(), message: e.to_string()},
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_json_call() {
        let call = MethodCall::from_json(
            r##"{"method":"saveToGallery","arguments":{"fileName":"a.png","imageBytes":[137,80,78,71],"backgroundTopColor":"#FFFFFF"}}"##
        ).unwrap();
        assert_eq!(call.method, "saveToGallery");
        assert_eq!(call.arguments.string("fileName"), Some("a.png"));
        assert_eq!(call.arguments.bytes("imageBytes"), Some(vec![137, 80, 78, 71]));
        assert_eq!(call.arguments.string("backgroundTopColor"), Some("#FFFFFF"));
    }

    #[test]
    fn arguments_default_to_empty() {
        let call = MethodCall::from_json(r#"{"method":"isInstagramInstalled"}"#).unwrap();
        assert_eq!(call.arguments, Arguments::new());
    }

    #[test]
    fn null_arguments_read_as_empty() {
        let call = MethodCall::from_json(r#"{"method":"isInstagramInstalled","arguments":null}"#).unwrap();
        assert_eq!(call.arguments, Arguments::new());
    }

    #[test]
    fn empty_and_mistyped_strings_read_as_absent() {
        let args = Arguments::new().with("stickerPath", "").with("imagePath", 3i64);
        assert_eq!(args.string("stickerPath"), None);
        assert_eq!(args.string("imagePath"), None);
        assert_eq!(args.string("missing"), None);
    }

    #[test]
    fn first_string_prefers_earlier_keys() {
        let args = Arguments::new().with("appID", "222").with("appId", "111");
        assert_eq!(args.first_string(&["appId", "appID"]), Some("111"));
        let args = Arguments::new().with("appID", "222");
        assert_eq!(args.first_string(&["appId", "appID"]), Some("222"));
    }

    #[test]
    fn out_of_range_byte_lists_are_rejected() {
        let args: Arguments = [("imageBytes".to_string(), Value::List(vec![Value::Int(1), Value::Int(300)]))]
            .into_iter().collect();
        assert_eq!(args.bytes("imageBytes"), None);
    }

    #[test]
    fn replies_serialise() {
        assert_eq!(Reply::Success(Value::Bool(true)).to_json(), r#"{"success":true}"#);
        assert_eq!(Reply::NotImplemented.to_json(), r#""notImplemented""#);
        let reply: Reply = Err::<Value, _>(ShareError::PermissionDenied).into();
        assert_eq!(
            reply.to_json(),
            r#"{"error":{"code":"PERMISSION_DENIED","message":"Photo library permission denied"}}"#
        );
        let reply: Reply = Err::<Value, _>(ShareError::NotImplemented("share".into())).into();
        assert_eq!(reply, Reply::NotImplemented);
    }
}
