use ai_trace_collector::normalizer::{
    normalize_timestamp, parse_iso, redact_credentials, redact_json,
};
use chrono::{DateTime, Utc};
use proptest::prelude::*;
use serde_json::json;

const COCOA_EPOCH_OFFSET: i64 = 978_307_200;

fn unix(secs: i64) -> String {
    DateTime::<Utc>::from_timestamp(secs, 0)
        .unwrap()
        .to_rfc3339_opts(chrono::SecondsFormat::AutoSi, false)
}

proptest! {
    #[test]
    fn redaction_is_idempotent(text in "\\PC{0,200}") {
        let once = redact_credentials(&text);
        prop_assert_eq!(redact_credentials(&once), once);
    }

    #[test]
    fn redaction_is_idempotent_on_secret_shaped_input(
        prefix in "[a-z ]{0,20}",
        key in "[A-Za-z0-9]{20,48}",
        suffix in "[a-z ]{0,20}",
    ) {
        let text = format!("{}sk-{} token={}{}", prefix, key, key, suffix);
        let once = redact_credentials(&text);
        let secret = format!("sk-{}", key);
        prop_assert!(!once.contains(&secret));
        prop_assert_eq!(redact_credentials(&once), once);
    }

    #[test]
    fn json_redaction_is_idempotent(key in "[a-z_]{1,12}", value in "\\PC{0,80}") {
        let document = json!({ key.clone(): value, "nested": [{ "password": 1 }] });
        let once = redact_json(&document);
        prop_assert_eq!(redact_json(&once), once.clone());
        prop_assert_eq!(&once["nested"][0]["password"], &json!("[REDACTED]"));
    }

    #[test]
    fn unix_seconds_and_millis_agree(secs in 1_000_000_001i64..4_000_000_000i64) {
        let from_secs = normalize_timestamp(secs);
        prop_assert_eq!(from_secs.clone(), Some(unix(secs)));
        prop_assert_eq!(normalize_timestamp(secs * 1000), from_secs);
    }

    #[test]
    fn cocoa_seconds_are_offset_from_2001(secs in 100_000_001i64..1_000_000_000i64) {
        prop_assert_eq!(normalize_timestamp(secs), Some(unix(secs + COCOA_EPOCH_OFFSET)));
    }

    #[test]
    fn normalized_output_parses_back(secs in 1_000_000_001i64..4_000_000_000i64) {
        let normalized = normalize_timestamp(secs).unwrap();
        let parsed = parse_iso(&normalized).unwrap();
        prop_assert_eq!(parsed.timestamp(), secs);
        prop_assert_eq!(normalize_timestamp(normalized.as_str()), Some(normalized.clone()));
    }

    #[test]
    fn normalization_never_panics(text in "\\PC{0,64}", number in any::<f64>()) {
        let _ = normalize_timestamp(text.as_str());
        let _ = normalize_timestamp(number);
    }

    #[test]
    fn normalized_output_has_four_digit_year(number in 1e8f64..1e20f64) {
        if let Some(normalized) = normalize_timestamp(number) {
            prop_assert!(normalized.as_bytes()[..4].iter().all(u8::is_ascii_digit));
            prop_assert_eq!(normalized.as_bytes()[4], b'-');
        }
    }

    #[test]
    fn small_numbers_are_rejected(n in -1_000_000i64..=100_000_000i64) {
        prop_assert_eq!(normalize_timestamp(n), None);
    }
}
