use chrono::NaiveDate;

use form_engine::{
    EngineConfig, FieldValue, FormSession, InMemoryBackend, NdisDetails, ParticipantProfile,
    PrefillResolver, SessionError, SessionMode, TemplateDocument, load_for_create, load_submission,
};

fn fixture() -> TemplateDocument {
    serde_json::from_str(include_str!("fixtures/consent_form.json")).expect("deserialize fixture")
}

fn profile() -> ParticipantProfile {
    ParticipantProfile {
        participant_name: Some("Alex Citizen".into()),
        date_of_birth: Some("1961-04-09".into()),
        email: Some("alex@example.org".into()),
        category: Some("NDIS".into()),
        ndis_details: Some(NdisDetails {
            ndis_number: Some("430000000".into()),
            ..NdisDetails::default()
        }),
        ..ParticipantProfile::default()
    }
}

fn resolver() -> PrefillResolver {
    PrefillResolver::new(NaiveDate::from_ymd_opt(2026, 10, 19).expect("date"))
}

#[tokio::test]
async fn create_session_is_prefilled_from_profile() {
    let backend = InMemoryBackend::new()
        .with_template(fixture())
        .with_profile("client-1", profile());

    let loaded = load_for_create(&backend, "tpl-consent", "client-1").await;
    let session =
        FormSession::from_loaded(loaded, SessionMode::Create, EngineConfig::default(), resolver())
            .expect("session");

    assert_eq!(
        session.values().get("participant_name"),
        Some(&FieldValue::text("Alex Citizen"))
    );
    assert_eq!(
        session.values().get("ndis_number"),
        Some(&FieldValue::text("430000000"))
    );
    assert_eq!(
        session.values().get("signature_date"),
        Some(&FieldValue::text("2026-10-19"))
    );
    let keys: Vec<_> = session
        .visible_fields()
        .into_iter()
        .map(|field| field.field_key.as_str())
        .collect();
    assert!(keys.contains(&"ndis_number"));
}

#[tokio::test]
async fn failed_profile_load_leaves_profile_absent() {
    let backend = InMemoryBackend::new()
        .with_template(fixture())
        .with_profile("client-1", profile());
    backend.fail_operation("get_participant_profile");

    let loaded = load_for_create(&backend, "tpl-consent", "client-1").await;
    assert!(loaded.template.is_some());
    assert!(loaded.profile.is_none());

    let session =
        FormSession::from_loaded(loaded, SessionMode::Create, EngineConfig::default(), resolver())
            .expect("session");
    assert!(session.values().is_empty());
}

#[tokio::test]
async fn missing_template_is_reported() {
    let backend = InMemoryBackend::new();
    let loaded = load_for_create(&backend, "tpl-missing", "client-1").await;
    let error =
        FormSession::from_loaded(loaded, SessionMode::Create, EngineConfig::default(), resolver())
            .unwrap_err();
    assert!(matches!(error, SessionError::NotFound("template")));
}

#[tokio::test]
async fn missing_submission_is_reported() {
    let backend = InMemoryBackend::new().with_template(fixture());
    let loaded = load_submission(&backend, "sub-missing").await;
    assert!(loaded.submission.is_none());
    let error = FormSession::from_loaded(
        loaded,
        SessionMode::Edit {
            submission_id: "sub-missing".into(),
        },
        EngineConfig::default(),
        resolver(),
    )
    .unwrap_err();
    assert!(matches!(error, SessionError::NotFound("template")));
}
