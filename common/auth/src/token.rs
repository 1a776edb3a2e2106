//! Compact serialization: `b64u(header) "." b64u(payload) "." b64u(signature)`.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::base64url;
use crate::error::{JwtError, JwtResult};

/// A token split into its parts. Nothing here has been verified yet.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedToken<'a> {
    pub header: Map<String, Value>,
    pub payload: Map<String, Value>,
    pub signature: Vec<u8>,
    /// The received `header.payload` substring, byte for byte.
    pub signing_input: &'a str,
}

pub fn decode(token: &str) -> JwtResult<DecodedToken<'_>> {
    let mut segments = token.split('.');
    let (Some(header), Some(payload), Some(signature), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        return Err(JwtError::MalformedToken("expected three segments"));
    };

    let signing_input = &token[..header.len() + 1 + payload.len()];
    let header = decode_object(header, "header")?;
    let payload = decode_object(payload, "payload")?;
    let signature = base64url::decode(signature)
        .map_err(|_| JwtError::MalformedToken("signature is not base64url"))?;

    Ok(DecodedToken {
        header,
        payload,
        signature,
        signing_input,
    })
}

/// Produce the signing input for `header` and `payload` as compact JSON.
pub fn encode<H, P>(header: &H, payload: &P) -> JwtResult<String>
where
    H: Serialize + ?Sized,
    P: Serialize + ?Sized,
{
    let header = serde_json::to_vec(header)
        .map_err(|_| JwtError::MalformedToken("header is not serializable"))?;
    let payload = serde_json::to_vec(payload)
        .map_err(|_| JwtError::MalformedToken("payload is not serializable"))?;
    Ok(format!(
        "{}.{}",
        base64url::encode(header),
        base64url::encode(payload)
    ))
}

fn decode_object(segment: &str, part: &'static str) -> JwtResult<Map<String, Value>> {
    let bytes = base64url::decode(segment).map_err(|_| match part {
        "header" => JwtError::MalformedToken("header is not base64url"),
        _ => JwtError::MalformedToken("payload is not base64url"),
    })?;

    match serde_json::from_slice::<Value>(&bytes) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) if part == "header" => Err(JwtError::MalformedToken("header is not a JSON object")),
        Ok(_) => Err(JwtError::MalformedToken("payload is not a JSON object")),
        Err(_) if part == "header" => Err(JwtError::MalformedToken("header is not valid JSON")),
        Err(_) => Err(JwtError::MalformedToken("payload is not valid JSON")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn segment(value: &str) -> String {
        base64url::encode(value.as_bytes())
    }

    #[test]
    fn encode_joins_compact_json_segments() {
        let input = encode(&json!({"alg": "HS256"}), &json!({"iss": "ada"})).unwrap();
        assert_eq!(input, format!("{}.{}", segment(r#"{"alg":"HS256"}"#), segment(r#"{"iss":"ada"}"#)));
    }

    #[test]
    fn decode_keeps_original_signing_input() {
        // Whitespace in the JSON must not be normalised away.
        let header = segment("{ \"alg\" : \"HS256\" }");
        let payload = segment("{\n  \"iss\": \"ada\"\n}");
        let token = format!("{header}.{payload}.{}", base64url::encode([1u8, 2, 3]));

        let decoded = decode(&token).unwrap();
        assert_eq!(decoded.signing_input, format!("{header}.{payload}"));
        assert_eq!(decoded.header.get("alg"), Some(&json!("HS256")));
        assert_eq!(decoded.payload.get("iss"), Some(&json!("ada")));
        assert_eq!(decoded.signature, vec![1, 2, 3]);
    }

    #[test]
    fn decode_rejects_wrong_segment_counts() {
        for token in ["onlyonepart", "two.parts", "not.a.jwt.four.parts", ""] {
            assert_eq!(
                decode(token).unwrap_err(),
                JwtError::MalformedToken("expected three segments"),
                "{token}"
            );
        }
    }

    #[test]
    fn decode_rejects_non_object_json() {
        let object = segment(r#"{"alg":"HS256"}"#);
        for body in ["[1,2]", "\"text\"", "null", "42"] {
            let token = format!("{object}.{}.sig", segment(body));
            assert_eq!(
                decode(&token).unwrap_err(),
                JwtError::MalformedToken("payload is not a JSON object")
            );
            let token = format!("{}.{object}.sig", segment(body));
            assert_eq!(
                decode(&token).unwrap_err(),
                JwtError::MalformedToken("header is not a JSON object")
            );
        }
    }

    #[test]
    fn decode_rejects_bad_encoding_and_json() {
        let object = segment("{}");
        assert_eq!(
            decode(&format!("@@@.{object}.sig")).unwrap_err(),
            JwtError::MalformedToken("header is not base64url")
        );
        assert_eq!(
            decode(&format!("{object}.{}.sig", segment("{not json"))).unwrap_err(),
            JwtError::MalformedToken("payload is not valid JSON")
        );
        assert_eq!(
            decode(&format!("{object}.{object}.+++")).unwrap_err(),
            JwtError::MalformedToken("signature is not base64url")
        );
    }
}
