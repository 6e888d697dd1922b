#[cfg(test)]
mod tests {
    use crate::models::time::{elapsed_seconds, instant_or_now, parse_instant, TimeInput};
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_parse_rfc3339_with_offset() {
        let parsed = parse_instant(&TimeInput::from("2024-05-01T12:00:00+02:00")).unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap());
    }

    #[test]
    fn test_parse_naive_is_utc() {
        let parsed = parse_instant(&TimeInput::from("2024-05-01T10:00:00.250")).unwrap();
        assert_eq!(parsed.timestamp_subsec_millis(), 250);
        assert_eq!(parsed.timestamp(), Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap().timestamp());
    }

    #[test]
    fn test_parse_bare_date() {
        let parsed = parse_instant(&TimeInput::from("2024-05-01")).unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_parse_epoch_millis() {
        let parsed = parse_instant(&TimeInput::Millis(1_700_000_000_000)).unwrap();
        assert_eq!(parsed.timestamp(), 1_700_000_000);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        let err = parse_instant(&TimeInput::from("not-a-date")).unwrap_err();
        assert_eq!(err.to_string(), "Invalid date format");
        assert_eq!(err.input, "not-a-date");
        assert!(parse_instant(&TimeInput::from("2024-13-45")).is_err());
    }

    #[test]
    fn test_blank_input_defaults_to_now() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 8, 30, 0).unwrap();
        assert_eq!(instant_or_now(None, now).unwrap(), now);
        assert_eq!(instant_or_now(Some(&TimeInput::from("  ")), now).unwrap(), now);
    }

    #[test]
    fn test_untagged_deserialization() {
        let text: TimeInput = serde_json::from_str("\"2024-05-01\"").unwrap();
        assert_eq!(text, TimeInput::Text("2024-05-01".to_string()));
        let millis: TimeInput = serde_json::from_str("1700000000000").unwrap();
        assert_eq!(millis, TimeInput::Millis(1_700_000_000_000));
    }

    #[test]
    fn test_elapsed_seconds_keeps_sign() {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let t1 = t0 + chrono::Duration::milliseconds(600_500);
        assert_eq!(elapsed_seconds(t0, t1), 600.5);
        assert_eq!(elapsed_seconds(t1, t0), -600.5);
    }
}
