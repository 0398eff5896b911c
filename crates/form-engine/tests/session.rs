use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::NaiveDate;
use serde_json::json;

use form_engine::{
    EngineConfig, FieldValue, FormSession, InMemoryBackend, ParticipantContext, ParticipantProfile,
    Point, PrefillResolver, SessionError, SessionMode, SubmitError, TemplateDocument, load_submission,
};

fn fixture() -> TemplateDocument {
    serde_json::from_str(include_str!("fixtures/consent_form.json")).expect("deserialize fixture")
}

fn session() -> FormSession {
    FormSession::new(fixture(), SessionMode::Create, EngineConfig::default()).expect("session")
}

fn fill_valid(session: &mut FormSession) {
    session
        .set_value("participant_name", "Alex Citizen")
        .expect("name");
    session
        .set_value("is_ndis_participant", "no")
        .expect("ndis flag");
    session
        .open_signature("participant_signature")
        .expect("open pad")
        .draw(&[Point::new(20.0, 20.0), Point::new(120.0, 60.0)])
        .expect("draw");
    session.save_signature().expect("save signature");
}

#[test]
fn hidden_required_field_does_not_block_submit() {
    let mut session = session();
    fill_valid(&mut session);

    let visible: Vec<_> = session
        .visible_fields()
        .into_iter()
        .map(|field| field.field_key.as_str())
        .collect();
    assert!(!visible.contains(&"ndis_number"));
    assert!(session.validate());
}

#[test]
fn visible_required_field_blocks_submit() {
    let mut session = session();
    fill_valid(&mut session);
    session
        .set_value("is_ndis_participant", "yes")
        .expect("ndis flag");

    let error = session.begin_submit().unwrap_err();
    match error {
        SubmitError::Invalid(errors) => {
            assert_eq!(
                errors.get("ndis_number").map(String::as_str),
                Some("NDIS Number is required")
            );
            assert_eq!(errors.len(), 1);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!session.is_submitting());
}

#[test]
fn errors_clear_on_change_and_disappear_when_hidden() {
    let mut session = session();
    fill_valid(&mut session);
    session
        .set_value("is_ndis_participant", "yes")
        .expect("ndis flag");
    assert!(!session.validate());
    assert!(session.error("ndis_number").is_some());

    session.set_value("ndis_number", "12ab").expect("ndis number");
    assert_eq!(session.error("ndis_number"), None);
    assert!(!session.validate());
    assert_eq!(session.error("ndis_number"), Some("NDIS Number format is invalid"));

    session
        .set_value("is_ndis_participant", "no")
        .expect("ndis flag");
    assert!(session.validate());
    assert!(session.errors().is_empty());
}

#[test]
fn email_field_checks_shape() {
    let mut session = session();
    fill_valid(&mut session);
    session.set_value("email", "foo@bar").expect("email");
    assert!(!session.validate());
    assert_eq!(session.error("email"), Some("Please enter a valid email address"));

    session.set_value("email", "foo@bar.com").expect("email");
    assert!(session.validate());
}

#[test]
fn number_bounds_are_inclusive() {
    let mut session = session();
    fill_valid(&mut session);
    for accepted in [1.0, 5.0] {
        session
            .set_value("visits_per_week", accepted)
            .expect("visits");
        assert!(session.validate(), "{accepted} should be accepted");
    }
    session.set_raw("visits_per_week", &json!("6")).expect("visits");
    assert!(!session.validate());
    assert_eq!(
        session.error("visits_per_week"),
        Some("Visits per week must be no more than 5")
    );
}

#[test]
fn rating_sets_value_and_fill_state() {
    let mut session = session();
    session.set_rating("satisfaction", 4).expect("rating");
    assert_eq!(session.values().get("satisfaction"), Some(&FieldValue::Number(4.0)));

    let payload = session.render();
    let rating = payload
        .field("satisfaction")
        .and_then(|field| field.rating.clone())
        .expect("rating display");
    assert_eq!(rating.filled, vec![true, true, true, true, false]);

    session.set_rating("satisfaction", 9).expect("rating");
    assert_eq!(session.values().get("satisfaction"), Some(&FieldValue::Number(5.0)));
}

#[test]
fn signature_required_until_saved() {
    let mut session = session();
    session
        .set_value("participant_name", "Alex Citizen")
        .expect("name");
    session
        .set_value("is_ndis_participant", "no")
        .expect("ndis flag");
    assert!(!session.validate());
    assert_eq!(
        session.error("participant_signature"),
        Some("Participant Signature is required")
    );

    session.open_signature("participant_signature").expect("open pad");
    session
        .signature_pad_mut()
        .expect("active pad")
        .draw(&[Point::new(5.0, 5.0), Point::new(50.0, 40.0)])
        .expect("draw");
    let payload = session.save_signature().expect("save");
    assert!(payload.starts_with("data:image/png;base64,"));
    assert!(session.signature_pad().is_none());
    assert_eq!(session.error("participant_signature"), None);
    assert!(session.validate());
}

#[test]
fn multiselect_toggles_like_a_set() {
    let mut session = session();
    session.toggle_option("shared_with", "gp").expect("toggle");
    session
        .toggle_option("shared_with", "family")
        .expect("toggle");
    let before = session.values().get("shared_with").cloned();

    for _ in 0..3 {
        session
            .toggle_option("shared_with", "support_coordinator")
            .expect("toggle");
        session
            .toggle_option("shared_with", "support_coordinator")
            .expect("toggle");
    }
    assert_eq!(session.values().get("shared_with").cloned(), before);

    session.toggle_option("shared_with", "gp").expect("toggle");
    let selected = session
        .toggle_option("shared_with", "support_coordinator")
        .expect("toggle")
        .to_vec();
    assert_eq!(selected, vec!["family", "support_coordinator"]);
}

#[test]
fn multiselect_scenario() {
    let mut session = session();
    session.toggle_option("shared_with", "gp").expect("toggle");
    session.toggle_option("shared_with", "family").expect("toggle");
    session.toggle_option("shared_with", "gp").expect("toggle");
    assert_eq!(
        session.values().get("shared_with"),
        Some(&FieldValue::List(vec!["family".into()]))
    );
}

#[test]
fn prefill_fills_only_empty_slots() {
    let mut session = session();
    session.set_value("participant_name", "Alex C.").expect("name");
    let profile = ParticipantProfile {
        participant_name: Some("Alex Citizen".into()),
        email: Some("alex@example.org".into()),
        category: Some("NDIS".into()),
        ..ParticipantProfile::default()
    };
    let resolver = PrefillResolver::new(NaiveDate::from_ymd_opt(2026, 10, 19).expect("date"));

    let filled = session.apply_prefill(profile.clone(), resolver);
    assert_eq!(filled, vec!["email", "is_ndis_participant", "signature_date"]);
    let once = session.values().clone();

    assert!(session.apply_prefill(profile, resolver).is_empty());
    assert_eq!(session.values(), &once);
    assert_eq!(
        session.values().get("participant_name"),
        Some(&FieldValue::text("Alex C."))
    );
}

#[test]
fn signature_fields_reject_plain_values() {
    let mut session = session();
    let error = session
        .set_value("participant_signature", "scribble")
        .unwrap_err();
    assert!(matches!(error, SessionError::WrongFieldType { .. }));
    assert!(matches!(
        session.set_value("missing", "x").unwrap_err(),
        SessionError::UnknownField(_)
    ));
}

#[test]
fn duplicate_field_keys_are_rejected() {
    let mut document = fixture();
    let copy = document.fields[0].clone();
    document.fields.push(copy);
    let error = FormSession::new(document, SessionMode::Create, EngineConfig::default()).unwrap_err();
    assert!(matches!(error, SessionError::DuplicateFieldKeys(keys) if keys == vec!["participant_name"]));
}

#[tokio::test]
async fn submit_round_trips_through_backend() {
    let backend = InMemoryBackend::new().with_template(fixture());
    let mut session = session();
    fill_valid(&mut session);
    session
        .set_value("participant_name", "x")
        .expect("name");
    session.set_value("visits_per_week", 5.0).expect("visits");

    let notified = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&notified);
    session.on_submitted(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    let submission = session
        .submit(&backend, &ParticipantContext::new("client-7"))
        .await
        .expect("submit");
    assert_eq!(notified.load(Ordering::SeqCst), 1);
    assert!(!session.is_submitting());
    assert_eq!(submission.client_id, "client-7");
    assert_eq!(submission.validity_period.as_deref(), Some("12 months"));

    let loaded = load_submission(&backend, &submission.id).await;
    let reloaded = FormSession::from_loaded(
        loaded,
        SessionMode::Edit {
            submission_id: submission.id.clone(),
        },
        EngineConfig::default(),
        PrefillResolver::today(),
    )
    .expect("reload");
    assert_eq!(
        reloaded.values().get("participant_name"),
        Some(&FieldValue::text("x"))
    );
    assert_eq!(
        reloaded.values().get("visits_per_week"),
        Some(&FieldValue::Number(5.0))
    );
    assert_eq!(reloaded.values(), session.values());
    assert_eq!(reloaded.signatures(), session.signatures());

    let signatures = backend.signatures_for(&submission.id);
    assert_eq!(signatures[0].signer_name, "Participant");
}

#[tokio::test]
async fn second_submit_while_in_flight_is_refused() {
    let mut session = session();
    fill_valid(&mut session);
    let request = session.begin_submit().expect("first submit");
    assert!(session.is_submitting());
    assert!(matches!(session.begin_submit(), Err(SubmitError::InFlight)));

    let backend = InMemoryBackend::new();
    let result = request
        .send(
            &backend,
            session.config(),
            &ParticipantContext::new("client-1").with_name("Alex Citizen"),
        )
        .await;
    let submission = session.finish_submit(result).expect("submitted");
    assert!(!session.is_submitting());
    assert_eq!(backend.signatures_for(&submission.id)[0].signer_name, "Alex Citizen");
}

#[tokio::test]
async fn failed_submit_keeps_the_form_populated() {
    let backend = InMemoryBackend::new();
    backend.fail_operation("create_submission");
    let mut session = session();
    fill_valid(&mut session);
    let before = session.values().clone();

    let error = session
        .submit(&backend, &ParticipantContext::new("client-1"))
        .await
        .unwrap_err();
    assert!(matches!(error, SubmitError::Backend { completed_writes: 0, .. }));
    assert!(!session.is_submitting());
    assert_eq!(session.values(), &before);
    assert!(backend.submissions().is_empty());
}

#[tokio::test]
async fn view_mode_is_read_only() {
    let backend = InMemoryBackend::new().with_template(fixture());
    let mut editor = session();
    fill_valid(&mut editor);
    let submission = editor
        .submit(&backend, &ParticipantContext::new("client-1"))
        .await
        .expect("submit");

    let loaded = load_submission(&backend, &submission.id).await;
    let mut viewer = FormSession::from_loaded(
        loaded,
        SessionMode::View {
            submission_id: submission.id,
        },
        EngineConfig::default(),
        PrefillResolver::today(),
    )
    .expect("viewer");

    assert!(viewer.is_read_only());
    assert!(matches!(
        viewer.set_value("participant_name", "y"),
        Err(SessionError::ReadOnly)
    ));
    assert!(matches!(
        viewer.open_signature("participant_signature"),
        Err(SessionError::ReadOnly)
    ));
    assert!(matches!(
        viewer.submit(&backend, &ParticipantContext::new("client-1")).await,
        Err(SubmitError::ReadOnly)
    ));
    assert!(viewer.signatures().contains("participant_signature"));
}
