use axum::http::{uri::PathAndQuery, Uri};
use serde_json::{Map, Value};

/// Decode a raw query string into ordered key/value pairs
///
/// `+` is treated as a space. Pairs without `=` get an empty value; values
/// that are not valid percent-encoded UTF-8 are kept as written.
pub fn parse_pairs(query: &str) -> Vec<(String, String)> {
    query
        .split('&')
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            let (key, value) = segment.split_once('=').unwrap_or((segment, ""));
            (decode(key), decode(value))
        })
        .collect()
}

fn decode(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    match urlencoding::decode(&spaced) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => spaced,
    }
}

/// Encode pairs back into a query string
pub fn encode_pairs(pairs: &[(String, String)]) -> String {
    pairs
        .iter()
        .map(|(key, value)| format!("{}={}", urlencoding::encode(key), urlencoding::encode(value)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Rebuild `uri` with its query replaced by `pairs`
pub fn replace_query(uri: &Uri, pairs: &[(String, String)]) -> anyhow::Result<Uri> {
    let encoded = encode_pairs(pairs);
    let path_and_query = if encoded.is_empty() {
        uri.path().to_string()
    } else {
        format!("{}?{}", uri.path(), encoded)
    };

    let mut parts = uri.clone().into_parts();
    parts.path_and_query = Some(PathAndQuery::try_from(path_and_query)?);
    Ok(Uri::from_parts(parts)?)
}

/// Build a JSON object from pairs; repeated keys become arrays
pub fn pairs_to_object(pairs: &[(String, String)]) -> Map<String, Value> {
    let mut map = Map::new();
    for (key, value) in pairs {
        let value = Value::String(value.clone());
        match map.get_mut(key) {
            Some(Value::Array(existing)) => existing.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
            None => {
                map.insert(key.clone(), value);
            }
        }
    }
    map
}

/// Flatten a JSON object back into pairs
///
/// Arrays repeat their key; nested objects and nulls are skipped.
pub fn object_to_pairs(map: &Map<String, Value>) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    for (key, value) in map {
        match value {
            Value::Array(items) => {
                for item in items {
                    if let Some(text) = scalar_text(item) {
                        pairs.push((key.clone(), text));
                    }
                }
            }
            other => {
                if let Some(text) = scalar_text(other) {
                    pairs.push((key.clone(), text));
                }
            }
        }
    }
    pairs
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_pairs_decodes() {
        let pairs = parse_pairs("search=hola+mundo&language=es&flag&name=caf%C3%A9");
        assert_eq!(
            pairs,
            vec![
                ("search".to_string(), "hola mundo".to_string()),
                ("language".to_string(), "es".to_string()),
                ("flag".to_string(), String::new()),
                ("name".to_string(), "café".to_string()),
            ]
        );
        assert!(parse_pairs("").is_empty());
    }

    #[test]
    fn test_repeated_keys_become_arrays() {
        let pairs = parse_pairs("tag=a&tag=b&tag=c&page=1");
        let object = pairs_to_object(&pairs);
        assert_eq!(Value::Object(object), json!({ "tag": ["a", "b", "c"], "page": "1" }));
    }

    #[test]
    fn test_object_to_pairs_stringifies_scalars() {
        let object = json!({ "page": 2, "draft": false, "tag": ["a", "b"], "nested": { "x": 1 } });
        let Value::Object(map) = object else { unreachable!() };
        let mut pairs = object_to_pairs(&map);
        pairs.sort();
        assert_eq!(
            pairs,
            vec![
                ("draft".to_string(), "false".to_string()),
                ("page".to_string(), "2".to_string()),
                ("tag".to_string(), "a".to_string()),
                ("tag".to_string(), "b".to_string()),
            ]
        );
    }

    #[test]
    fn test_replace_query_keeps_path() {
        let uri: Uri = "/api/courses?search=%3Cb%3E".parse().unwrap();
        let pairs = vec![("search".to_string(), "&lt;b&gt;".to_string())];
        let rebuilt = replace_query(&uri, &pairs).unwrap();
        assert_eq!(rebuilt.path(), "/api/courses");
        assert_eq!(parse_pairs(rebuilt.query().unwrap()), pairs);

        let bare = replace_query(&uri, &[]).unwrap();
        assert_eq!(bare.to_string(), "/api/courses");
    }

    #[test]
    fn test_encode_pairs_escapes() {
        let pairs = vec![("search".to_string(), "a&b c".to_string())];
        assert_eq!(encode_pairs(&pairs), "search=a%26b%20c");
    }
}
