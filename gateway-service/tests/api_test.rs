mod common;

use common::TestApp;
use reqwest::Method;
use serde_json::{json, Value};

const NOT_FOUND: &str = "Error! Query does not match any document";
const INSERT_ONE_FAILED: &str = "Error! Could not insert document.";
const INSERT_MANY_FAILED: &str = "Error! Could not insert documents.";
const FIND_FAILED: &str = "Error! Problem occured while searching documents";
const UPDATE_ONE_FAILED: &str = "Error! Could not update document";
const UPDATE_MANY_FAILED: &str = "Error! Could not update documents";
const DELETE_FAILED: &str = "Error! Could not delete documents";
const MALFORMED_ID: &str = "Error! Malformed document identifier";

fn users() -> Value {
    json!([
        { "name": "ada", "role": "admin", "age": 36 },
        { "name": "grace", "role": "admin", "age": 45 },
        { "name": "alan", "role": "user", "age": 41 },
    ])
}

#[tokio::test]
async fn insert_one_then_find_by_returned_id() {
    let app = TestApp::spawn().await;

    let (status, body) = app
        .insert_one(&json!({ "name": "ada", "email": "ada@example.com" }))
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["status"], 200);
    assert_eq!(body["message"], "Single document insertion successful");
    let id = body["data"]["_id"]
        .as_str()
        .expect("_id is a string")
        .to_string();
    assert_eq!(id.len(), 24);

    let (status, body) = app.find(&json!({ "_id": id })).await;
    assert_eq!(status, 200);
    assert_eq!(body["message"], "Finding documents successful");
    assert_eq!(body["data"]["num_docs"], 1);
    assert_eq!(
        body["data"]["docs"][0],
        json!({ "_id": id, "name": "ada", "email": "ada@example.com" })
    );
}

#[tokio::test]
async fn insert_many_reports_count_and_ids() {
    let app = TestApp::spawn().await;

    let (status, body) = app.insert_many(&users()).await;
    assert_eq!(status, 200);
    assert_eq!(body["message"], "Multiple documents insertion successful");
    assert_eq!(body["data"]["num_inserted"], 3);
    assert_eq!(body["data"]["_ids"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn empty_query_finds_every_document() {
    let app = TestApp::spawn().await;
    app.insert_many(&users()).await;

    let (_, body) = app.find(&json!({})).await;
    assert_eq!(body["data"]["num_docs"], 3);
    assert_eq!(body["data"]["docs"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn update_one_without_match_is_not_found() {
    let app = TestApp::spawn().await;
    app.insert_many(&users()).await;

    let update = json!({
        "query": { "name": "nobody" },
        "update": { "$set": { "age": 1 } }
    });
    let (status, body) = app.update_one(&update).await;
    assert_eq!(status, 200);
    assert_eq!(
        body,
        json!({ "status": 404, "message": NOT_FOUND, "data": {} })
    );
}

#[tokio::test]
async fn update_one_returns_snapshots() {
    let app = TestApp::spawn().await;
    app.insert_many(&users()).await;

    let update = json!({
        "query": { "name": "alan" },
        "update": { "$inc": { "age": 1 } }
    });
    let (status, body) = app.update_one(&update).await;
    assert_eq!(status, 200);
    assert_eq!(body["message"], "Single document update successful");

    let data = &body["data"];
    assert_eq!(data["matched_count"], 1);
    assert_eq!(data["modified_count"], 1);
    assert_eq!(data["document_before_update"]["age"], 41);
    assert_eq!(data["document_after_update"]["age"], 42);
    assert_eq!(
        data["document_before_update"]["_id"],
        data["document_after_update"]["_id"]
    );
}

#[tokio::test]
async fn update_many_counts_documents_matching_before_update() {
    let app = TestApp::spawn().await;
    app.insert_many(&users()).await;

    let (_, before) = app.find(&json!({ "role": "admin" })).await;
    let matching = before["data"]["num_docs"].as_u64().unwrap();

    let update = json!({
        "query": { "role": "admin" },
        "update": { "$set": { "age": 45 } }
    });
    let (status, body) = app.update_many(&update).await;
    assert_eq!(status, 200);
    assert_eq!(body["message"], "Multiple documents update successful");

    let matched = body["data"]["matched_count"].as_u64().unwrap();
    let modified = body["data"]["modified_count"].as_u64().unwrap();
    assert_eq!(matched, matching);
    assert_eq!(modified, 1);
    assert!(modified <= matched);
}

#[tokio::test]
async fn update_many_without_match_is_not_found() {
    let app = TestApp::spawn().await;

    let update = json!({
        "query": { "role": "guest" },
        "update": { "$set": { "age": 1 } }
    });
    let (status, body) = app.update_many(&update).await;
    assert_eq!(status, 200);
    assert_eq!(body["status"], 404);
    assert_eq!(body["message"], NOT_FOUND);
}

#[tokio::test]
async fn delete_one_removes_exactly_one_match() {
    let app = TestApp::spawn().await;
    app.insert_many(&users()).await;

    let (_, before) = app.find(&json!({ "role": "admin" })).await;
    let first = before["data"]["docs"][0].clone();

    let (status, body) = app.delete_one(&json!({ "role": "admin" })).await;
    assert_eq!(status, 200);
    assert_eq!(body["message"], "Single document deletion successful");
    assert_eq!(body["data"]["deleted_count"], 1);
    assert_eq!(body["data"]["deleted_document"], first);

    let (_, after) = app.find(&json!({ "role": "admin" })).await;
    assert_eq!(after["data"]["num_docs"], 1);

    let (_, all) = app.find(&json!({})).await;
    assert_eq!(all["data"]["num_docs"], 2);
}

#[tokio::test]
async fn delete_many_removes_all_matches() {
    let app = TestApp::spawn().await;
    app.insert_many(&users()).await;

    let (status, body) = app.delete_many(&json!({ "role": "admin" })).await;
    assert_eq!(status, 200);
    assert_eq!(body["message"], "Deletion of multiple documents successful");
    assert_eq!(body["data"]["deleted_count"], 2);

    let (status, body) = app.delete_many(&json!({ "role": "admin" })).await;
    assert_eq!(status, 200);
    assert_eq!(body["message"], NOT_FOUND);
}

#[tokio::test]
async fn delete_one_by_id() {
    let app = TestApp::spawn().await;
    let (_, inserted) = app.insert_one(&json!({ "name": "ada" })).await;
    let id = inserted["data"]["_id"].clone();

    let (_, body) = app.delete_one(&json!({ "_id": id })).await;
    assert_eq!(body["data"]["deleted_document"]["_id"], id);

    let (_, body) = app.delete_one(&json!({ "_id": id })).await;
    assert_eq!(body["message"], NOT_FOUND);
}

#[tokio::test]
async fn malformed_identifier_has_its_own_envelope() {
    let app = TestApp::spawn().await;

    for (method, route, body) in [
        (Method::GET, "find", json!({ "_id": "nope" })),
        (
            Method::PUT,
            "update_one",
            json!({ "query": { "_id": "nope" }, "update": { "$set": { "a": 1 } } }),
        ),
        (Method::DELETE, "delete_one", json!({ "_id": "nope" })),
    ] {
        let (status, envelope) = app.call(method, route, &body).await;
        assert_eq!(status, 200);
        assert_eq!(
            envelope,
            json!({ "status": 404, "message": MALFORMED_ID, "data": {} })
        );
    }
}

#[tokio::test]
async fn malformed_json_yields_generic_failure_on_every_route() {
    let app = TestApp::spawn().await;

    let cases = [
        (Method::POST, "insert_one", INSERT_ONE_FAILED),
        (Method::POST, "insert_many", INSERT_MANY_FAILED),
        (Method::GET, "find", FIND_FAILED),
        (Method::PUT, "update_one", UPDATE_ONE_FAILED),
        (Method::PUT, "update_many", UPDATE_MANY_FAILED),
        (Method::DELETE, "delete_one", DELETE_FAILED),
        (Method::DELETE, "delete_many", DELETE_FAILED),
    ];

    for (method, route, message) in cases {
        let (status, envelope) = app.call_raw(method, route, "{ this is not json").await;
        assert_eq!(status, 200, "{route}");
        assert_eq!(
            envelope,
            json!({ "status": 404, "message": message, "data": {} }),
            "{route}"
        );
    }
}

#[tokio::test]
async fn wrong_body_shapes_yield_generic_failure() {
    let app = TestApp::spawn().await;

    let (_, body) = app.insert_one(&json!([{ "name": "ada" }])).await;
    assert_eq!(body["message"], INSERT_ONE_FAILED);

    let (_, body) = app.insert_many(&json!({ "name": "ada" })).await;
    assert_eq!(body["message"], INSERT_MANY_FAILED);

    let (_, body) = app.insert_many(&json!([])).await;
    assert_eq!(body["message"], INSERT_MANY_FAILED);

    let (_, body) = app.update_one(&json!({ "query": { "name": "ada" } })).await;
    assert_eq!(body["message"], UPDATE_ONE_FAILED);
}

#[tokio::test]
async fn replacement_update_is_rejected_without_touching_data() {
    let app = TestApp::spawn().await;
    app.insert_many(&users()).await;

    let update = json!({
        "query": { "role": "admin" },
        "update": { "role": "owner" }
    });
    let (status, body) = app.update_many(&update).await;
    assert_eq!(status, 200);
    assert_eq!(body["status"], 404);
    assert_eq!(body["message"], UPDATE_MANY_FAILED);

    let (_, body) = app.find(&json!({ "role": "admin" })).await;
    assert_eq!(body["data"]["num_docs"], 2);
}

#[tokio::test]
async fn responses_carry_a_request_id() {
    let app = TestApp::spawn().await;

    let response = app
        .client
        .get(format!("{}/api/find", app.address))
        .header("x-request-id", "req-42")
        .json(&json!({}))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.headers()["x-request-id"], "req-42");
}
