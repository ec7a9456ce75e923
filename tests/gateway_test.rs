//! End-to-end pipeline tests against a seeded database, using the canned
//! generation mode so no network access is needed.

use nlq_gateway::config::DUMMY_API_KEY;
use nlq_gateway::schema::setup_database;
use nlq_gateway::{LlmClient, QueryGateway, ResponseEnvelope};
use serde_json::Value;
use std::path::PathBuf;

fn seeded_gateway(dir: &tempfile::TempDir) -> (QueryGateway, PathBuf) {
    let db = dir.path().join("gateway.db");
    setup_database(&db).unwrap();

    let llm = LlmClient::new(
        DUMMY_API_KEY.to_string(),
        "test-model".to_string(),
        "http://localhost:0".to_string(),
    );
    (QueryGateway::new(llm, &db), db)
}

#[tokio::test]
async fn listing_customers_returns_success_envelope() {
    let dir = tempfile::tempdir().unwrap();
    let (gateway, _db) = seeded_gateway(&dir);

    let envelope = gateway.handle("list all customers").await;
    assert_eq!(envelope.status(), (200, "OK"));

    let json = envelope.to_json();
    assert_eq!(json["status"], "success");
    assert_eq!(json["original_prompt"], "list all customers");
    assert_eq!(json["generated_query"], "SELECT * FROM Clientes;");
    assert_eq!(
        json["columns"],
        serde_json::json!(["cliente_id", "nome", "email", "data_cadastro"])
    );

    let results = json["results"].as_array().unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0]["nome"], "Alice Silva");
    assert_eq!(results[0]["cliente_id"], 1);
    assert_eq!(results[1]["email"], "bruno@email.com");
}

#[tokio::test]
async fn empty_prompt_maps_to_client_error() {
    let dir = tempfile::tempdir().unwrap();
    let (gateway, _db) = seeded_gateway(&dir);

    let envelope = gateway.handle("   ").await;
    assert_eq!(envelope, ResponseEnvelope::MissingPrompt);
    assert_eq!(envelope.status(), (400, "Bad Request"));
    assert_eq!(
        envelope.to_json(),
        serde_json::json!({"error": "prompt field is required"})
    );
}

#[tokio::test]
async fn generated_mutation_is_forbidden_with_query_echoed() {
    let dir = tempfile::tempdir().unwrap();
    let (gateway, _db) = seeded_gateway(&dir);

    // The canned generator answers mutation-flavored prompts with a DELETE.
    let envelope = gateway.handle("delete all products").await;
    assert_eq!(envelope.status(), (403, "Forbidden"));

    let json = envelope.to_json();
    assert_eq!(json["error"], "non-SELECT queries are not permitted");
    assert_eq!(json["generated_query"], "DELETE FROM Produtos;");
}

#[tokio::test]
async fn unknown_table_maps_to_db_error() {
    let dir = tempfile::tempdir().unwrap();
    let (gateway, _db) = seeded_gateway(&dir);

    let envelope =
        gateway.respond_to_generated("count the orders", "SELECT COUNT(*) FROM Pedidos");
    assert_eq!(envelope.status(), (500, "Internal Server Error"));

    let json = envelope.to_json();
    assert_eq!(json["status"], "db_error");
    assert_eq!(json["original_prompt"], "count the orders");
    assert_eq!(json["generated_query"], "SELECT COUNT(*) FROM Pedidos");
    let message = json["message"].as_str().unwrap();
    assert!(message.contains("Pedidos"), "message: {}", message);
}

#[tokio::test]
async fn guard_runs_before_execution_even_without_database() {
    let dir = tempfile::tempdir().unwrap();
    let llm = LlmClient::new(
        DUMMY_API_KEY.to_string(),
        "test-model".to_string(),
        "http://localhost:0".to_string(),
    );
    // Point at a database that does not exist: a rejected statement must
    // never get as far as opening the store.
    let gateway = QueryGateway::new(llm, dir.path().join("missing.db"));

    let envelope = gateway.respond_to_generated("drop it", "DROP TABLE Clientes");
    assert_eq!(envelope.status(), (403, "Forbidden"));
}

#[tokio::test]
async fn missing_database_surfaces_as_db_error() {
    let dir = tempfile::tempdir().unwrap();
    let llm = LlmClient::new(
        DUMMY_API_KEY.to_string(),
        "test-model".to_string(),
        "http://localhost:0".to_string(),
    );
    let gateway = QueryGateway::new(llm, dir.path().join("missing.db"));

    let envelope = gateway.respond_to_generated("list customers", "SELECT * FROM Clientes");
    assert_eq!(envelope.status(), (500, "Internal Server Error"));
    assert_eq!(envelope.to_json()["status"], "db_error");
}

#[tokio::test]
async fn repeated_requests_give_identical_results() {
    let dir = tempfile::tempdir().unwrap();
    let (gateway, _db) = seeded_gateway(&dir);

    let first = gateway.handle("list all products").await;
    let second = gateway.handle("list all products").await;

    assert_eq!(first.to_json(), second.to_json());
}

#[tokio::test]
async fn every_prompt_reaches_a_wellformed_envelope() {
    let dir = tempfile::tempdir().unwrap();
    let (gateway, _db) = seeded_gateway(&dir);

    for prompt in [
        "list all customers",
        "show products",
        "what was sold last month",
        "delete the sales table",
        "something entirely unrelated",
    ] {
        let envelope = gateway.handle(prompt).await;
        let (status, _) = envelope.status();
        assert!(matches!(status, 200 | 400 | 403 | 500));

        // Every envelope is a JSON object with either a status or an error
        // indicator.
        let json = envelope.to_json();
        let object = json.as_object().unwrap();
        assert!(
            object.contains_key("status") || object.contains_key("error"),
            "envelope: {}",
            json
        );
    }
}

#[tokio::test]
async fn success_results_match_column_arity() {
    let dir = tempfile::tempdir().unwrap();
    let (gateway, _db) = seeded_gateway(&dir);

    let envelope = gateway.respond_to_generated(
        "sales with customer names",
        "SELECT v.venda_id, c.nome, v.quantidade \
         FROM Vendas v JOIN Clientes c ON c.cliente_id = v.cliente_id \
         ORDER BY v.venda_id",
    );

    let json = envelope.to_json();
    assert_eq!(json["status"], "success");
    let columns = json["columns"].as_array().unwrap();
    for row in json["results"].as_array().unwrap() {
        let object = row.as_object().unwrap();
        assert_eq!(object.len(), columns.len());
        for column in columns {
            assert!(object.contains_key(column.as_str().unwrap()));
        }
    }

    let results = json["results"].as_array().unwrap();
    assert_eq!(results.len(), 3);
    assert_eq!(results[0]["nome"], Value::from("Alice Silva"));
}
