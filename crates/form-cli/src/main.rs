use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use form_engine::{
    EngineConfig, ErrorMap, FormSession, InMemoryBackend, ParticipantContext, ParticipantProfile,
    Point, PrefillResolver, SessionMode, SignatureRecord, TemplateDocument, render_json_ui,
    render_text, values_schema,
};
use serde_json::{Value, json};
use tracing::info;
use tracing_subscriber::EnvFilter;

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Care form engine CLI",
    long_about = "Validates, renders, prefills and dry-run submits care form templates stored as JSON"
)]
struct Cli {
    /// Optional engine configuration JSON.
    #[arg(long, global = true, value_name = "CONFIG")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum RenderMode {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Validate field values against a template.
    Validate {
        /// Template document (template + fields) JSON.
        #[arg(long, value_name = "TEMPLATE")]
        template: PathBuf,
        /// JSON object of field key to value.
        #[arg(long, value_name = "VALUES")]
        values: PathBuf,
        /// JSON object of signature field key to PNG data URL.
        #[arg(long, value_name = "SIGNATURES")]
        signatures: Option<PathBuf>,
    },
    /// Render the currently visible fields.
    Render {
        #[arg(long, value_name = "TEMPLATE")]
        template: PathBuf,
        #[arg(long, value_name = "VALUES")]
        values: Option<PathBuf>,
        #[arg(long, value_name = "SIGNATURES")]
        signatures: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = RenderMode::Text)]
        format: RenderMode,
    },
    /// Fill well-known fields from a participant profile and print the values.
    Prefill {
        #[arg(long, value_name = "TEMPLATE")]
        template: PathBuf,
        /// Participant profile JSON.
        #[arg(long, value_name = "PROFILE")]
        profile: PathBuf,
        /// Values already entered; these are never overwritten.
        #[arg(long, value_name = "VALUES")]
        values: Option<PathBuf>,
        /// Date used for signature-date fields (defaults to today).
        #[arg(long, value_name = "YYYY-MM-DD")]
        today: Option<NaiveDate>,
    },
    /// Print the JSON Schema of the values expected for the visible fields.
    Schema {
        #[arg(long, value_name = "TEMPLATE")]
        template: PathBuf,
        #[arg(long, value_name = "VALUES")]
        values: Option<PathBuf>,
    },
    /// Draw strokes onto a signature field and print the signature store.
    Sign {
        #[arg(long, value_name = "TEMPLATE")]
        template: PathBuf,
        /// Signature field key.
        #[arg(long, value_name = "FIELD")]
        field: String,
        /// JSON array of strokes, each an array of [x, y] points.
        #[arg(long, value_name = "STROKES")]
        strokes: PathBuf,
        #[arg(long, value_name = "SIGNATURES")]
        signatures: Option<PathBuf>,
    },
    /// Validate and submit against an in-memory backend, printing every write.
    Submit {
        #[arg(long, value_name = "TEMPLATE")]
        template: PathBuf,
        #[arg(long, value_name = "VALUES")]
        values: PathBuf,
        #[arg(long, value_name = "SIGNATURES")]
        signatures: Option<PathBuf>,
        #[arg(long, value_name = "CLIENT_ID")]
        client_id: String,
        #[arg(long, value_name = "NAME")]
        participant_name: Option<String>,
    },
}

#[tokio::main]
async fn main() -> CliResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    match cli.command {
        Command::Validate {
            template,
            values,
            signatures,
        } => run_validate(config, &template, &values, signatures.as_deref()),
        Command::Render {
            template,
            values,
            signatures,
            format,
        } => run_render(config, &template, values.as_deref(), signatures.as_deref(), format),
        Command::Prefill {
            template,
            profile,
            values,
            today,
        } => run_prefill(config, &template, &profile, values.as_deref(), today),
        Command::Schema { template, values } => run_schema(config, &template, values.as_deref()),
        Command::Sign {
            template,
            field,
            strokes,
            signatures,
        } => run_sign(config, &template, &field, &strokes, signatures.as_deref()),
        Command::Submit {
            template,
            values,
            signatures,
            client_id,
            participant_name,
        } => {
            run_submit(
                config,
                &template,
                &values,
                signatures.as_deref(),
                client_id,
                participant_name,
            )
            .await
        }
    }
}

fn read_json(path: &Path) -> CliResult<Value> {
    let raw = fs::read_to_string(path)
        .map_err(|error| format!("failed to read {}: {}", path.display(), error))?;
    Ok(serde_json::from_str(&raw)?)
}

fn load_document(path: &Path) -> CliResult<TemplateDocument> {
    Ok(serde_json::from_value(read_json(path)?)?)
}

/// Opens a create-mode session seeded with the given values and signatures.
fn open_session(
    config: EngineConfig,
    template: &Path,
    values: Option<&Path>,
    signatures: Option<&Path>,
) -> CliResult<FormSession> {
    let mut session = FormSession::new(load_document(template)?, SessionMode::Create, config)?;
    if let Some(path) = values {
        let values = read_json(path)?;
        let entries = values
            .as_object()
            .ok_or_else(|| format!("{} must contain a JSON object", path.display()))?;
        for (key, raw) in entries {
            session.set_raw(key, raw)?;
        }
    }
    if let Some(path) = signatures {
        let records: Vec<SignatureRecord> = read_json(path)?
            .as_object()
            .ok_or_else(|| format!("{} must contain a JSON object", path.display()))?
            .iter()
            .filter_map(|(role, data)| {
                data.as_str().map(|data| SignatureRecord {
                    signer_name: String::new(),
                    signer_role: role.clone(),
                    signature_data: data.to_string(),
                    signed_at: None,
                })
            })
            .collect();
        session.seed(Vec::new(), records);
    }
    Ok(session)
}

fn run_validate(
    config: EngineConfig,
    template: &Path,
    values: &Path,
    signatures: Option<&Path>,
) -> CliResult<()> {
    let mut session = open_session(config, template, Some(values), signatures)?;
    let valid = session.validate();
    println!(
        "Validation result: {}",
        if valid { "valid" } else { "invalid" }
    );
    describe_errors(session.errors());

    if valid {
        Ok(())
    } else {
        Err("validation failed".into())
    }
}

fn describe_errors(errors: &ErrorMap) {
    if errors.is_empty() {
        return;
    }
    println!("Errors:");
    for (field_key, message) in errors {
        println!("  {} - {}", field_key, message);
    }
}

fn run_render(
    config: EngineConfig,
    template: &Path,
    values: Option<&Path>,
    signatures: Option<&Path>,
    format: RenderMode,
) -> CliResult<()> {
    let session = open_session(config, template, values, signatures)?;
    let payload = session.render();
    match format {
        RenderMode::Text => println!("{}", render_text(&payload)),
        RenderMode::Json => println!("{}", serde_json::to_string_pretty(&render_json_ui(&payload))?),
    }
    Ok(())
}

fn run_prefill(
    config: EngineConfig,
    template: &Path,
    profile: &Path,
    values: Option<&Path>,
    today: Option<NaiveDate>,
) -> CliResult<()> {
    let mut session = open_session(config, template, values, None)?;
    let profile: ParticipantProfile = serde_json::from_value(read_json(profile)?)?;
    let resolver = today.map(PrefillResolver::new).unwrap_or_else(PrefillResolver::today);
    let filled = session.apply_prefill(profile, resolver);
    println!(
        "{}",
        serde_json::to_string_pretty(&json!({
            "filled": filled,
            "values": session.values(),
        }))?
    );
    Ok(())
}

fn run_schema(config: EngineConfig, template: &Path, values: Option<&Path>) -> CliResult<()> {
    let session = open_session(config, template, values, None)?;
    let schema = values_schema(session.document(), &session.visibility());
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(())
}

fn parse_strokes(value: &Value) -> CliResult<Vec<Vec<Point>>> {
    let strokes = value.as_array().ok_or("strokes must be a JSON array")?;
    let mut parsed = Vec::with_capacity(strokes.len());
    for stroke in strokes {
        let points = stroke
            .as_array()
            .ok_or("each stroke must be an array of points")?;
        let mut stroke_points = Vec::with_capacity(points.len());
        for point in points {
            let pair = point
                .as_array()
                .filter(|pair| pair.len() == 2)
                .ok_or("each point must be an [x, y] pair")?;
            let (Some(x), Some(y)) = (pair[0].as_f64(), pair[1].as_f64()) else {
                return Err("point coordinates must be numbers".into());
            };
            stroke_points.push(Point::new(x as f32, y as f32));
        }
        parsed.push(stroke_points);
    }
    Ok(parsed)
}

fn run_sign(
    config: EngineConfig,
    template: &Path,
    field: &str,
    strokes: &Path,
    signatures: Option<&Path>,
) -> CliResult<()> {
    let strokes = parse_strokes(&read_json(strokes)?)?;
    let mut session = open_session(config, template, None, signatures)?;
    let pad = session.open_signature(field)?;
    for stroke in &strokes {
        pad.draw(stroke)?;
    }
    session.save_signature()?;
    println!("{}", serde_json::to_string_pretty(session.signatures())?);
    Ok(())
}

async fn run_submit(
    config: EngineConfig,
    template: &Path,
    values: &Path,
    signatures: Option<&Path>,
    client_id: String,
    participant_name: Option<String>,
) -> CliResult<()> {
    let mut session = open_session(config, template, Some(values), signatures)?;
    let backend = InMemoryBackend::new();
    let participant = ParticipantContext {
        client_id,
        participant_name,
        linked_document_type: None,
    };
    info!(template = %session.template().id, "submitting against in-memory backend");
    let submission = match session.submit(&backend, &participant).await {
        Ok(submission) => submission,
        Err(form_engine::SubmitError::Invalid(errors)) => {
            println!("Validation result: invalid");
            describe_errors(&errors);
            return Err("validation failed".into());
        }
        Err(error) => return Err(error.into()),
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&json!({
            "submission": submission,
            "values": backend.values_for(&submission.id),
            "signatures": backend.signatures_for(&submission.id),
        }))?
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_cmd::Command;
    use assert_fs::TempDir;
    use assert_fs::prelude::*;
    use serde_json::{Value, json};

    fn template() -> Value {
        json!({
            "template": {
                "id": "tpl-intake",
                "name": "Intake",
                "category": "assessment"
            },
            "fields": [
                {
                    "id": "f1",
                    "fieldKey": "participant_name",
                    "label": "Participant Name",
                    "fieldType": "text",
                    "order": "1",
                    "isRequired": "yes"
                },
                {
                    "id": "f2",
                    "fieldKey": "is_ndis_participant",
                    "label": "NDIS Participant?",
                    "fieldType": "yes_no",
                    "order": "2"
                },
                {
                    "id": "f3",
                    "fieldKey": "ndis_number",
                    "label": "NDIS Number",
                    "fieldType": "text",
                    "order": "3",
                    "isRequired": "yes",
                    "conditionalOn": "is_ndis_participant",
                    "conditionalValue": "yes"
                },
                {
                    "id": "f4",
                    "fieldKey": "signature",
                    "label": "Signature",
                    "fieldType": "signature",
                    "order": "4"
                }
            ]
        })
    }

    fn write(dir: &TempDir, name: &str, value: &Value) -> PathBuf {
        let file = dir.child(name);
        file.write_str(&value.to_string()).expect("write fixture");
        file.path().to_path_buf()
    }

    #[test]
    fn parse_strokes_reads_point_pairs() {
        let strokes = parse_strokes(&json!([[[0, 0], [10, 5]], [[3, 3]]])).expect("strokes");
        assert_eq!(strokes.len(), 2);
        assert_eq!(strokes[0][1], Point::new(10.0, 5.0));
        assert!(parse_strokes(&json!([[[0]]])).is_err());
        assert!(parse_strokes(&json!({"x": 1})).is_err());
    }

    #[test]
    fn validate_reports_visible_required_field() -> Result<(), Box<dyn std::error::Error>> {
        let dir = TempDir::new()?;
        let template = write(&dir, "template.json", &template());
        let values = write(
            &dir,
            "values.json",
            &json!({ "participant_name": "Alex", "is_ndis_participant": "yes" }),
        );

        Command::cargo_bin("care-forms")?
            .arg("validate")
            .arg("--template")
            .arg(&template)
            .arg("--values")
            .arg(&values)
            .assert()
            .failure()
            .stdout(predicates::str::contains("ndis_number - NDIS Number is required"));
        Ok(())
    }

    #[test]
    fn validate_accepts_hidden_required_field() -> Result<(), Box<dyn std::error::Error>> {
        let dir = TempDir::new()?;
        let template = write(&dir, "template.json", &template());
        let values = write(
            &dir,
            "values.json",
            &json!({ "participant_name": "Alex", "is_ndis_participant": "no" }),
        );

        Command::cargo_bin("care-forms")?
            .arg("validate")
            .arg("--template")
            .arg(&template)
            .arg("--values")
            .arg(&values)
            .assert()
            .success()
            .stdout(predicates::str::contains("Validation result: valid"));
        Ok(())
    }

    #[test]
    fn submit_prints_value_records() -> Result<(), Box<dyn std::error::Error>> {
        let dir = TempDir::new()?;
        let template = write(&dir, "template.json", &template());
        let values = write(
            &dir,
            "values.json",
            &json!({ "participant_name": "Alex", "is_ndis_participant": "no" }),
        );

        let output = Command::cargo_bin("care-forms")?
            .arg("submit")
            .arg("--template")
            .arg(&template)
            .arg("--values")
            .arg(&values)
            .arg("--client-id")
            .arg("client-9")
            .output()?;
        assert!(output.status.success());
        let parsed: Value = serde_json::from_slice(&output.stdout)?;
        assert_eq!(parsed["submission"]["clientId"], "client-9");
        assert_eq!(parsed["submission"]["validityPeriod"], "12 months");
        let field_ids: Vec<_> = parsed["values"]
            .as_array()
            .expect("values")
            .iter()
            .map(|record| record["fieldId"].as_str().unwrap_or_default().to_string())
            .collect();
        assert_eq!(field_ids, vec!["f1", "f2"]);
        Ok(())
    }

    #[test]
    fn prefill_keeps_entered_values() -> Result<(), Box<dyn std::error::Error>> {
        let dir = TempDir::new()?;
        let template = write(&dir, "template.json", &template());
        let profile = write(
            &dir,
            "profile.json",
            &json!({
                "participantName": "Alex Citizen",
                "category": "NDIS",
                "ndisDetails": { "ndisNumber": "430000000" }
            }),
        );
        let values = write(&dir, "values.json", &json!({ "participant_name": "Alex C." }));

        let output = Command::cargo_bin("care-forms")?
            .arg("prefill")
            .arg("--template")
            .arg(&template)
            .arg("--profile")
            .arg(&profile)
            .arg("--values")
            .arg(&values)
            .arg("--today")
            .arg("2026-10-19")
            .output()?;
        assert!(output.status.success());
        let parsed: Value = serde_json::from_slice(&output.stdout)?;
        assert_eq!(parsed["values"]["participant_name"], "Alex C.");
        assert_eq!(parsed["values"]["is_ndis_participant"], "yes");
        assert_eq!(parsed["values"]["ndis_number"], "430000000");
        assert_eq!(parsed["filled"], json!(["is_ndis_participant", "ndis_number"]));
        Ok(())
    }

    #[test]
    fn sign_writes_png_payload() -> Result<(), Box<dyn std::error::Error>> {
        let dir = TempDir::new()?;
        let template = write(&dir, "template.json", &template());
        let strokes = write(&dir, "strokes.json", &json!([[[10, 10], [100, 40], [180, 20]]]));

        let output = Command::cargo_bin("care-forms")?
            .arg("sign")
            .arg("--template")
            .arg(&template)
            .arg("--field")
            .arg("signature")
            .arg("--strokes")
            .arg(&strokes)
            .output()?;
        assert!(output.status.success());
        let parsed: Value = serde_json::from_slice(&output.stdout)?;
        assert!(
            parsed["signature"]
                .as_str()
                .is_some_and(|payload| payload.starts_with("data:image/png;base64,"))
        );
        Ok(())
    }
}
