#[cfg(test)]
mod tests {
    use crate::api::{RaceId, UserId};
    use uuid::Uuid;

    #[test]
    fn test_user_id_round_trips_through_display() {
        let id = UserId::generate();
        let parsed: UserId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_parse_rejects_malformed_ids() {
        assert!(RaceId::parse("not-an-id").is_none());
        assert!(RaceId::parse("").is_none());
        assert!(UserId::parse("60b8c0d5b1d4d50015e1a123").is_none());
    }

    #[test]
    fn test_parse_tolerates_surrounding_whitespace() {
        let raw = Uuid::new_v4();
        let parsed = UserId::parse(&format!("  {}  ", raw)).unwrap();
        assert_eq!(parsed.value(), raw);
    }

    #[test]
    fn test_ids_serialize_as_plain_strings() {
        let raw = Uuid::new_v4();
        let id = RaceId::new(raw);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", raw));
        let back: RaceId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn test_id_conversions() {
        let raw = Uuid::new_v4();
        let id: UserId = raw.into();
        let back: Uuid = id.into();
        assert_eq!(raw, back);
        assert_ne!(UserId::generate(), UserId::generate());
    }
}
