//! Unpadded base64url codec for compact JWT segments.

// crates.io
use base64::{DecodeError, Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
// self
use crate::_prelude::*;

/// Encodes bytes with the URL-safe alphabet and no padding.
pub fn encode(input: impl AsRef<[u8]>) -> String {
	URL_SAFE_NO_PAD.encode(input)
}

/// Decodes an unpadded base64url segment; `+`, `/`, and `=` are rejected.
pub fn decode(input: &str) -> Result<Vec<u8>, DecodeError> {
	URL_SAFE_NO_PAD.decode(input)
}

/// Serializes `value` to JSON and encodes the bytes as a segment.
pub fn encode_json<T>(value: &T) -> Result<String, serde_json::Error>
where
	T: ?Sized + Serialize,
{
	serde_json::to_vec(value).map(encode)
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn segments_never_contain_standard_alphabet_or_padding() {
		let samples = [
			r#"{"alg":"RS256","typ":"JWT"}"#,
			r#"{"q":"???"}"#,
			r#"{"q":">>>"}"#,
			r#"{"iss":"ünïcødé@example.com","note":"日本語テキスト"}"#,
			r#"{"emoji":"🔐🚀","pad":"a"}"#,
			r#"{"pad":"ab"}"#,
			"",
		];

		for sample in samples {
			let encoded = encode(sample);

			assert!(
				!encoded.contains(['+', '/', '=']),
				"Segment `{encoded}` must stay within the URL-safe, unpadded alphabet."
			);

			let decoded = decode(&encoded).expect("Encoded segment should decode.");

			assert_eq!(String::from_utf8(decoded).expect("Decoded bytes should be UTF-8."), sample);
		}
	}

	#[test]
	fn decode_rejects_standard_alphabet_and_padding() {
		assert!(decode("Pz8/").is_err());
		assert!(decode("Pj4+").is_err());
		assert!(decode("YQ==").is_err());
		assert_eq!(decode("Pz8_").expect("URL-safe segment should decode."), b"???");
	}

	#[test]
	fn encode_json_matches_manual_encoding() {
		let value = serde_json::json!({ "alg": "RS256" });

		assert_eq!(
			encode_json(&value).expect("JSON value should serialize."),
			encode(r#"{"alg":"RS256"}"#)
		);
	}
}
