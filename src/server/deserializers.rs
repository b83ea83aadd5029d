use serde::{Deserialize, Deserializer};
use serde_json::Value;

// the web client keeps ids as whatever it got from the last response, so they may come back
// as numbers or as numeric strings
#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(i64),
    String(String),
}

#[derive(Deserialize, Debug, PartialEq)]
#[serde(try_from = "NumberOrString")]
pub struct Stri64(pub i64);

impl TryFrom<NumberOrString> for Stri64 {
    type Error = String;

    fn try_from(value: NumberOrString) -> Result<Self, Self::Error> {
        match value {
            NumberOrString::Number(v) => Ok(Stri64(v)),
            NumberOrString::String(s) => match s.trim().parse::<i64>() {
                Ok(v) => Ok(Stri64(v)),
                Err(_) => Err(format!("Wrong value {s}, can not parse to i64")),
            },
        }
    }
}

// `null` and a missing list both mean nothing was asked yet
pub fn deserialize_ids<'de, D>(deserializer: D) -> Result<Vec<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let values = Option::<Vec<Stri64>>::deserialize(deserializer)?;
    Ok(values
        .unwrap_or_default()
        .into_iter()
        .map(|v| v.0)
        .collect())
}

// keeps `null` apart from a missing key: with `#[serde(default)]` a missing key stays `None`
// while an explicit `null` becomes `Some(Value::Null)`
pub fn deserialize_present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

// a value of the wrong type counts as missing, so the request fails validation
// instead of being rejected as a malformed body
pub fn deserialize_lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Ok(Some(s)),
        _ => Ok(None),
    }
}

pub fn deserialize_lenient_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| Stri64::deserialize(v).ok()).map(|v| v.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Ids {
        #[serde(default, deserialize_with = "deserialize_ids")]
        ids: Vec<i64>,
    }

    fn ids(json: &str) -> Result<Vec<i64>, serde_json::Error> {
        serde_json::from_str::<Ids>(json).map(|v| v.ids)
    }

    #[test]
    fn accepts_numbers_and_numeric_strings() {
        assert_eq!(ids(r#"{"ids": [1, "2", " 3 "]}"#).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn null_and_missing_are_empty() {
        assert!(ids(r#"{"ids": null}"#).unwrap().is_empty());
        assert!(ids("{}").unwrap().is_empty());
    }

    #[derive(Deserialize)]
    struct Lenient {
        #[serde(default, deserialize_with = "deserialize_lenient_string")]
        text: Option<String>,
        #[serde(default, deserialize_with = "deserialize_lenient_i64")]
        number: Option<i64>,
        #[serde(default, deserialize_with = "deserialize_present")]
        marker: Option<Value>,
    }

    #[test]
    fn lenient_fields_drop_wrong_types() {
        let v: Lenient = serde_json::from_str(r#"{"text": 5, "number": "hard"}"#).unwrap();
        assert_eq!(v.text, None);
        assert_eq!(v.number, None);

        let v: Lenient = serde_json::from_str(r#"{"text": "Q", "number": "7"}"#).unwrap();
        assert_eq!(v.text.as_deref(), Some("Q"));
        assert_eq!(v.number, Some(7));
    }

    #[test]
    fn present_null_differs_from_missing() {
        let v: Lenient = serde_json::from_str(r#"{"marker": null}"#).unwrap();
        assert_eq!(v.marker, Some(Value::Null));
        let v: Lenient = serde_json::from_str("{}").unwrap();
        assert_eq!(v.marker, None);
    }

    #[test]
    fn rejects_garbage() {
        assert!(ids(r#"{"ids": ["abc"]}"#).is_err());
        assert!(ids(r#"{"ids": [true]}"#).is_err());
    }
}
