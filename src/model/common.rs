use chrono::{DateTime, Utc};
use uuid::Uuid;

pub type Id = String;

pub fn generate_id() -> Id {
    Uuid::new_v4().to_string()
}

/// Default user for records created before audit fields existed
pub(crate) fn default_user() -> String {
    "legacy-user".to_string()
}

/// Default timestamp for records created before audit fields existed
pub(crate) fn default_timestamp() -> DateTime<Utc> {
    DateTime::from_timestamp(0, 0).unwrap_or_else(Utc::now)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_unique_uuids() {
        let a = generate_id();
        let b = generate_id();
        assert_ne!(a, b);
        assert!(Uuid::parse_str(&a).is_ok());
    }

    #[test]
    fn legacy_timestamp_is_epoch() {
        assert_eq!(default_timestamp().timestamp(), 0);
    }
}
