use chrono::NaiveDate;
use tracing::debug;

use crate::records::ParticipantProfile;
use crate::spec::field::FieldDefinition;
use crate::value::{FieldValue, ValueStore};

/// Seeds well-known fields from a participant profile. Only empty slots are
/// filled, so running it again never changes the result.
#[derive(Debug, Clone, Copy)]
pub struct PrefillResolver {
    today: NaiveDate,
}

impl PrefillResolver {
    pub fn new(today: NaiveDate) -> Self {
        Self { today }
    }

    pub fn today() -> Self {
        Self::new(chrono::Local::now().date_naive())
    }

    /// Fills absent keys and returns the keys it filled, in field order.
    pub fn apply(
        &self,
        fields: &[FieldDefinition],
        profile: &ParticipantProfile,
        store: &mut ValueStore,
    ) -> Vec<String> {
        let mut filled = Vec::new();
        for field in fields {
            if store.contains_key(&field.field_key) {
                continue;
            }
            if let Some(value) = self.value_for(&field.field_key, profile) {
                store.set(field.field_key.clone(), value);
                filled.push(field.field_key.clone());
            }
        }
        debug!(filled = filled.len(), "applied participant prefill");
        filled
    }

    /// The profile-derived value for a well-known key, if the profile has one.
    pub fn value_for(&self, field_key: &str, profile: &ParticipantProfile) -> Option<FieldValue> {
        let ndis = profile.ndis_details.as_ref();
        let text = match field_key {
            "participant_name" | "client_name" | "full_name" => profile.participant_name.clone(),
            "date_of_birth" | "dob" => profile.date_of_birth.as_deref().map(date_only),
            "address" | "home_address" | "participant_address" => profile.home_address.clone(),
            "phone" | "phone_number" | "contact_number" => profile.phone_number.clone(),
            "email" | "email_address" => profile.email.clone(),
            "is_ndis_participant" | "ndis_participant" => {
                if profile.category.is_none() && ndis.is_none() {
                    None
                } else if profile.is_ndis_participant() {
                    Some("yes".to_string())
                } else {
                    Some("no".to_string())
                }
            }
            "ndis_number" => ndis.and_then(|details| details.ndis_number.clone()),
            "plan_start_date" | "ndis_plan_start_date" => ndis
                .and_then(|details| details.ndis_plan_start_date.as_deref())
                .map(date_only),
            "plan_end_date" | "ndis_plan_end_date" => ndis
                .and_then(|details| details.ndis_plan_end_date.as_deref())
                .map(date_only),
            "signature_date" | "date_signed" | "consent_date" => {
                Some(self.today.format("%Y-%m-%d").to_string())
            }
            _ => None,
        };
        text.filter(|text| !text.is_empty()).map(FieldValue::Text)
    }
}

/// Trims ISO timestamps down to the `YYYY-MM-DD` a date input expects.
fn date_only(raw: &str) -> String {
    match raw.get(..10) {
        Some(prefix) if NaiveDate::parse_from_str(prefix, "%Y-%m-%d").is_ok() => prefix.to_string(),
        _ => raw.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::NdisDetails;
    use crate::spec::field::FieldType;

    fn profile() -> ParticipantProfile {
        ParticipantProfile {
            participant_name: Some("Alex Citizen".into()),
            date_of_birth: Some("1961-04-09T00:00:00.000Z".into()),
            home_address: Some("1 Example St".into()),
            phone_number: None,
            email: Some("alex@example.org".into()),
            category: Some("NDIS".into()),
            ndis_details: Some(NdisDetails {
                ndis_number: Some("430000000".into()),
                ndis_plan_start_date: Some("2026-01-01".into()),
                ndis_plan_end_date: None,
            }),
        }
    }

    fn fields() -> Vec<FieldDefinition> {
        [
            ("participant_name", FieldType::Text),
            ("date_of_birth", FieldType::Date),
            ("phone_number", FieldType::Text),
            ("is_ndis_participant", FieldType::YesNo),
            ("ndis_number", FieldType::Text),
            ("signature_date", FieldType::Date),
            ("goals", FieldType::Textarea),
        ]
        .into_iter()
        .map(|(key, kind)| FieldDefinition::new(key, key, kind))
        .collect()
    }

    fn resolver() -> PrefillResolver {
        PrefillResolver::new(NaiveDate::from_ymd_opt(2026, 10, 19).expect("date"))
    }

    #[test]
    fn fills_known_keys_from_profile() {
        let mut store = ValueStore::new();
        let filled = resolver().apply(&fields(), &profile(), &mut store);
        assert_eq!(
            filled,
            vec![
                "participant_name",
                "date_of_birth",
                "is_ndis_participant",
                "ndis_number",
                "signature_date"
            ]
        );
        assert_eq!(store.get("date_of_birth"), Some(&FieldValue::text("1961-04-09")));
        assert_eq!(store.get("is_ndis_participant"), Some(&FieldValue::text("yes")));
        assert_eq!(store.get("signature_date"), Some(&FieldValue::text("2026-10-19")));
        assert!(!store.contains_key("phone_number"));
        assert!(!store.contains_key("goals"));
    }

    #[test]
    fn never_overwrites_existing_values() {
        let mut store: ValueStore = [("participant_name", "Alex C.")].into_iter().collect();
        resolver().apply(&fields(), &profile(), &mut store);
        assert_eq!(store.get("participant_name"), Some(&FieldValue::text("Alex C.")));
    }

    #[test]
    fn second_pass_is_a_no_op() {
        let mut once = ValueStore::new();
        resolver().apply(&fields(), &profile(), &mut once);
        let mut twice = once.clone();
        let filled = resolver().apply(&fields(), &profile(), &mut twice);
        assert!(filled.is_empty());
        assert_eq!(once, twice);
    }

    #[test]
    fn only_defined_fields_are_filled() {
        let mut store = ValueStore::new();
        resolver().apply(&[], &profile(), &mut store);
        assert!(store.is_empty());
    }
}
