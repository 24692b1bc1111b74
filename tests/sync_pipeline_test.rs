use anyhow::Result;
use doadores_sync::infra::github::GithubPublisher;
use doadores_sync::infra::http_source::HttpSource;
use doadores_sync::pipeline::{parse_table, render, transform, validate, TransformOptions};
use doadores_sync::{Config, DonorRecord, Profile, PublishOutcome, SyncError, SyncUseCase};
use serde_json::{json, Value};
use std::time::Duration;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SHEET: &str = "NOME,CPF,Equipamento1,Equipamento2,Equipamento3\n\
Maria Silva Souza,123.456.789-09,Notebook Dell XPS 13,,Mouse\n\
Pelé,123,Rádio,,\n\
José,98765432100,,,\n";

const CONTENTS: &str = "/repos/acme/doacoes/contents/dados/doador.json";

fn config_for(server: &MockServer) -> Config {
    Config {
        source_url: format!("{}/sheet.csv", server.uri()),
        repository: "acme/doacoes".to_string(),
        api_base_url: server.uri(),
        ..Config::default()
    }
}

async fn mount_sheet(server: &MockServer, body: &str) {
    Mock::given(method("GET"))
        .and(path("/sheet.csv"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

fn use_case(config: Config) -> SyncUseCase {
    let source = HttpSource::new(config.source_url.clone(), Duration::from_secs(5)).unwrap();
    let publisher = GithubPublisher::from_config(&config, "test-token").unwrap();
    SyncUseCase::new(Box::new(source), Box::new(publisher), config)
}

#[test]
fn example_row_yields_two_masked_records() -> Result<()> {
    let table = parse_table(SHEET)?;
    let rows = validate(&table, &Config::default())?.rows;
    let records = transform(&rows, &TransformOptions::from(&Config::default()));

    let json: Value = serde_json::from_str(&render(&records[..2], "unused")?)?;
    assert_eq!(
        json,
        json!([
            {"formattedName": "MARIA***SOUZA", "cpf": "123***09", "celulares": ["NOTEB***PS 13"]},
            {"formattedName": "MARIA***SOUZA", "cpf": "123***09", "celulares": ["MOUSE"]}
        ])
    );

    // One record per filled slot across the whole sheet.
    assert_eq!(records.len(), 3);
    assert_eq!(records[2].formatted_name, "PELÉ");
    assert_eq!(records[2].masked_tax_id, "CPF INVALIDO");
    assert_eq!(records[2].equipment_list, vec!["RÁDIO"]);
    Ok(())
}

#[test]
fn rendering_twice_is_byte_identical() -> Result<()> {
    let config = Config {
        profile: Profile::Minimal,
        ..Config::default()
    };
    let render_once = || -> Result<String> {
        let rows = validate(&parse_table(SHEET)?, &config)?.rows;
        Ok(render(&transform(&rows, &TransformOptions::from(&config)), &config.empty_message)?)
    };
    assert_eq!(render_once()?, render_once()?);
    Ok(())
}

#[test]
fn extended_sheet_publishes_contact_and_totals() -> Result<()> {
    let sheet = "CARIMBO,NOME,CPF,TELEFONE,ENDERECO,CIDADE,ESTADO,CEP,TAMANHO_CAMISA,\
Equipamento1,Equipamento2,Equipamento3,TOTAL_EQUIP,UNICOS_CPF\n\
01/02/2025 10:00:00,Ana Lima,111.222.333-44,(11) 90000-0000,Praça da Sé 1,São Paulo,SP,01001-000,M,Tablet,Celular Motorola G8,,99,99\n\
02/02/2025 11:00:00,Ana Lima,111.222.333-44,,,,,,,Mouse,,,,\n";
    let config = Config {
        profile: Profile::Extended,
        ..Config::default()
    };

    let rows = validate(&parse_table(sheet)?, &config)?.rows;
    let records = transform(&rows, &TransformOptions::from(&config));
    assert_eq!(records.len(), 3);

    let document = render(&records, &config.empty_message)?;
    doadores_sync::pipeline::validate_output(&document)?;
    assert!(document.contains("Praça da Sé 1"));

    let parsed: Vec<DonorRecord> = serde_json::from_str(&document)?;
    assert_eq!(parsed[1].equipment_list, vec!["CELUL***LA G8"]);
    assert!(parsed.iter().all(|r| r.total_equipment_count == Some(3)));
    assert!(parsed.iter().all(|r| r.unique_donor_count == Some(1)));
    assert_eq!(parsed[0].equipment_count_this_row, Some(2));
    assert_eq!(parsed[2].equipment_count_this_row, Some(1));
    assert_eq!(parsed[2].phone, None);
    Ok(())
}

#[tokio::test]
async fn full_run_creates_file_when_absent() -> Result<()> {
    let server = MockServer::start().await;
    mount_sheet(&server, SHEET).await;
    Mock::given(method("GET"))
        .and(path(CONTENTS))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"message": "Not Found"})))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path(CONTENTS))
        .and(body_partial_json(json!({"message": "Criação inicial de doador"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let report = use_case(config_for(&server)).execute().await?;
    assert_eq!(report.outcome, PublishOutcome::Created);
    assert_eq!(report.rows, 3);
    assert_eq!(report.records, 3);
    assert_eq!(report.invalid_tax_ids, 1);
    Ok(())
}

#[tokio::test]
async fn full_run_updates_existing_file() -> Result<()> {
    let server = MockServer::start().await;
    mount_sheet(&server, SHEET).await;
    Mock::given(method("GET"))
        .and(path(CONTENTS))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "sha": "prev-sha",
            "content": "W10=\n"
        })))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path(CONTENTS))
        .and(body_partial_json(json!({
            "message": "Atualização de doador",
            "sha": "prev-sha"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let report = use_case(config_for(&server)).execute().await?;
    assert_eq!(report.outcome, PublishOutcome::Updated);
    Ok(())
}

#[tokio::test]
async fn conflict_on_update_fails_the_run() {
    let server = MockServer::start().await;
    mount_sheet(&server, SHEET).await;
    Mock::given(method("GET"))
        .and(path(CONTENTS))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "sha": "prev-sha",
            "content": ""
        })))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "message": "dados/doador.json does not match prev-sha"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let err = use_case(config_for(&server)).execute().await.unwrap_err();
    assert!(matches!(err, SyncError::RemoteWriteConflict { .. }));
    assert_eq!(err.category(), "remote-conflict");
}

#[tokio::test]
async fn missing_columns_abort_before_any_remote_call() {
    let server = MockServer::start().await;
    mount_sheet(&server, "NOME,CPF,Equipamento1\nAna,12345678909,Radio\n").await;
    Mock::given(method("GET"))
        .and(path(CONTENTS))
        .respond_with(ResponseTemplate::new(404))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let err = use_case(config_for(&server)).execute().await.unwrap_err();
    match err {
        SyncError::Schema { missing } => assert_eq!(missing, vec!["Equipamento2", "Equipamento3"]),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn header_only_sheet_is_empty_data() {
    let server = MockServer::start().await;
    mount_sheet(&server, "NOME,CPF,Equipamento1,Equipamento2,Equipamento3\n").await;

    let err = use_case(config_for(&server)).execute().await.unwrap_err();
    assert!(matches!(err, SyncError::EmptyData));
    assert_eq!(err.category(), "empty-data");
}

#[tokio::test]
async fn bad_credentials_surface_as_access_error() {
    let server = MockServer::start().await;
    mount_sheet(&server, SHEET).await;
    Mock::given(method("GET"))
        .and(path(CONTENTS))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"message": "Bad credentials"})),
        )
        .mount(&server)
        .await;

    let err = use_case(config_for(&server)).execute().await.unwrap_err();
    assert!(matches!(err, SyncError::RemoteAccess { status: Some(401), .. }));
}

#[tokio::test]
async fn source_outage_is_a_fetch_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/sheet.csv"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = use_case(config_for(&server)).execute().await.unwrap_err();
    assert!(matches!(err, SyncError::Fetch { status: Some(503), .. }));
}
