use clap::Parser;
use reqwest::Method;
use serde_json::{json, Value};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::api::memory::MemoryApi;
use crate::api::ApiError;
use crate::auth::TokenFile;
use crate::cli::args::CliArgs;
use crate::config::ConfigFile;
use crate::filter::{SearchField, SearchSpec};
use crate::notify::{NoticeLevel, NoticeLog};
use crate::output::build_report;
use crate::screens::{builtin_screens, find_screen, ListScreen};
use crate::source::{Collection, ListDataSource};
use crate::view::{ListViewModel, LoadEvent, LoadState, Mutation};

fn screen(name: &str) -> ListScreen {
    find_screen(&builtin_screens(), name).unwrap().clone()
}

fn lots() -> Value {
    json!({"lots": [
        {"id": 1, "name": "A-1", "warehouse_id": 1, "area": 12.5, "price": 100, "status": "free"},
        {"id": 2, "name": "A-2", "warehouse_id": 2, "area": 20, "price": 150, "status": "rented"},
        {"id": 3, "name": "B-1", "warehouse_id": 3, "area": 8, "price": 90, "status": "free"},
    ]})
}

fn warehouse(id: u64, name: &str) -> Value {
    json!({"warehouse": {"id": id, "name": name}})
}

fn temp_path(name: &str) -> std::path::PathBuf {
    std::env::temp_dir()
        .join(format!("leasedesk-scenario-{}", std::process::id()))
        .join(name)
}

#[tokio::test]
async fn one_failed_related_fetch_only_blanks_its_row() {
    let api = MemoryApi::new()
        .with_json(Method::GET, "lots", lots())
        .with_json(Method::GET, "warehouses/1", warehouse(1, "North"))
        .with_status(Method::GET, "warehouses/2", 500, "boom")
        .with_json(Method::GET, "warehouses/3", warehouse(3, "South"));
    let mut vm = ListViewModel::new(screen("lots"));

    assert_eq!(vm.load(&api).await, LoadEvent::Ready { items: 3 });
    assert_eq!(vm.state(), &LoadState::Ready);
    assert_eq!(vm.related().resolved_count("warehouse_id"), 2);

    let report = build_report(&vm);
    let warehouse_col: Vec<&str> = report.rows.iter().map(|r| r.cells[1].as_str()).collect();
    assert_eq!(warehouse_col, vec!["North", "no data", "South"]);
    assert_eq!(report.rows[0].cells[4], "Free");
}

#[tokio::test]
async fn shared_foreign_ids_are_fetched_once_each() {
    let rentals: Vec<Value> = (1..=6)
        .map(|i| json!({"id": i, "customer_id": i % 2 + 1, "lot_id": 10 + i % 3, "status": "active"}))
        .collect();
    let mut api = MemoryApi::new().with_json(
        Method::GET,
        "rentals",
        json!({"rentals": rentals, "totalPages": 1}),
    );
    for id in 1..=2 {
        api = api.with_json(
            Method::GET,
            &format!("users/{id}"),
            json!({"user": {"id": id, "first_name": "Ann", "last_name": format!("Lee{id}")}}),
        );
    }
    for id in 10..=12 {
        api = api.with_json(
            Method::GET,
            &format!("lots/{id}"),
            json!({"lot": {"id": id, "name": format!("L-{id}")}}),
        );
    }

    let mut vm = ListViewModel::new(screen("rentals"));
    assert_eq!(vm.load(&api).await, LoadEvent::Ready { items: 6 });
    assert_eq!(api.count_prefix("users/"), 2);
    assert_eq!(api.count_prefix("lots/"), 3);

    let first = api.calls()[0].clone();
    assert!(first.query.contains(&("limit".to_string(), "10".to_string())));

    vm.set_search(SearchSpec::new(SearchField::Field("customer_id".into()), "lee2"));
    assert_eq!(vm.filtered_count(), 3);
}

#[tokio::test]
async fn unauthorized_primary_fetch_is_not_a_server_error() {
    let api = MemoryApi::new().with_status(Method::GET, "lots", 401, "");
    let collection = Collection::new("lots", "lots");
    let err = ListDataSource::new(&api, &collection)
        .fetch(None)
        .await
        .unwrap_err();
    assert!(err.is_auth());
    assert!(!matches!(err, ApiError::Server { .. }));

    let mut vm = ListViewModel::new(screen("lots"));
    assert_eq!(vm.load(&api).await, LoadEvent::SessionExpired);
}

#[tokio::test]
async fn unauthorized_related_fetch_expires_the_session() {
    let api = MemoryApi::new()
        .with_json(Method::GET, "lots", lots())
        .with_json(Method::GET, "warehouses/1", warehouse(1, "North"))
        .with_status(Method::GET, "warehouses/2", 401, "")
        .with_json(Method::GET, "warehouses/3", warehouse(3, "South"));
    let mut vm = ListViewModel::new(screen("lots"));
    assert_eq!(vm.load(&api).await, LoadEvent::SessionExpired);
    assert!(vm.items().is_empty());
}

#[tokio::test]
async fn successful_create_notifies_and_refetches() {
    let api = MemoryApi::new()
        .with_json(Method::GET, "warehouses", json!({"warehouses": [{"id": 1, "name": "North"}]}))
        .with_json(Method::POST, "warehouses/create", json!({"id": 2}));
    let log = NoticeLog::new();
    let mut vm = ListViewModel::new(screen("warehouses"));
    vm.load(&api).await;

    api.set_json(
        Method::GET,
        "warehouses",
        json!({"warehouses": [{"id": 1, "name": "North"}, {"id": 2, "name": "East"}]}),
    );
    let event = vm
        .mutate(&api, Mutation::Create(json!({"name": "East"})), &log)
        .await
        .unwrap();
    assert_eq!(event, LoadEvent::Ready { items: 2 });
    assert_eq!(api.count(Method::GET, "warehouses"), 2);

    let created = api
        .calls()
        .into_iter()
        .find(|c| c.method == Method::POST)
        .unwrap();
    assert_eq!(created.body, Some(json!({"name": "East"})));
    assert_eq!(log.notices()[0].level, NoticeLevel::Success);
}

#[tokio::test]
async fn search_matches_related_display_text() {
    let api = MemoryApi::new()
        .with_json(Method::GET, "lots", lots())
        .with_json(Method::GET, "warehouses/1", warehouse(1, "North"))
        .with_json(Method::GET, "warehouses/2", warehouse(2, "Northgate"))
        .with_json(Method::GET, "warehouses/3", warehouse(3, "South"));
    let mut vm = ListViewModel::new(screen("lots"));
    vm.load(&api).await;

    vm.set_search(SearchSpec::new(SearchField::Field("warehouse_id".into()), "NORTH"));
    let ids: Vec<String> = vm.visible_rows().iter().filter_map(|e| e.id()).collect();
    assert_eq!(ids, vec!["1", "2"]);

    vm.set_search(SearchSpec::new(SearchField::All, "rented"));
    assert_eq!(vm.filtered_count(), 1);
}

#[tokio::test]
async fn cli_run_renders_json_through_http_backend() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/lots"))
        .and(header("authorization", "Bearer s3cret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(lots()))
        .expect(1)
        .mount(&server)
        .await;
    for (id, name) in [(1, "North"), (2, "East"), (3, "South")] {
        Mock::given(method("GET"))
            .and(path(format!("/warehouses/{id}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(warehouse(id, name)))
            .expect(1)
            .mount(&server)
            .await;
    }

    let token = temp_path("token");
    TokenFile::new(token.clone()).store("s3cret").unwrap();
    let out = temp_path("lots.json");
    let args = CliArgs::parse_from([
        "leasedesk",
        "-u",
        server.uri().as_str(),
        "--token-file",
        token.to_str().unwrap(),
        "--screen",
        "lots",
        "--page-size",
        "2",
        "--page",
        "2",
        "--output",
        out.to_str().unwrap(),
        "--no-color",
    ]);
    let run = crate::app::build_run_config(args, ConfigFile::default()).unwrap();
    crate::app::run_async(run).await.unwrap();

    let report: Value = serde_json::from_slice(&std::fs::read(&out).unwrap()).unwrap();
    assert_eq!(report["window"]["current_page"], 2);
    assert_eq!(report["window"]["total_pages"], 2);
    assert_eq!(report["rows"][0]["id"], "3");
    assert_eq!(report["rows"][0]["cells"][1], "South");
}

#[tokio::test]
async fn cli_run_reports_session_expiry() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rentals"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let args = CliArgs::parse_from([
        "leasedesk",
        "-u",
        server.uri().as_str(),
        "--token-file",
        temp_path("no-token").to_str().unwrap(),
        "-s",
        "rentals",
    ]);
    let run = crate::app::build_run_config(args, ConfigFile::default()).unwrap();
    let err = crate::app::run_async(run).await.unwrap_err();
    assert!(err.contains("--save-token"));
}
