use family_tree_rust::{build_app, InMemoryStore, LayoutConfig};
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::net::TcpListener;

// Test client wrapper for making API calls
struct TestClient {
    client: Client,
    base_url: String,
}

impl TestClient {
    /// Serve a fresh in-memory store on an ephemeral port
    async fn spawn() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        let app = build_app(Arc::new(InMemoryStore::new()), LayoutConfig::default());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            client: Client::new(),
            base_url: format!("http://{}", address),
        }
    }

    async fn post(&self, path: &str, json: Value) -> reqwest::Result<reqwest::Response> {
        self.client
            .post(format!("{}{}", self.base_url, path))
            .header("X-User-Id", "integration-tester")
            .json(&json)
            .send()
            .await
    }

    async fn put(&self, path: &str, json: Value) -> reqwest::Result<reqwest::Response> {
        self.client
            .put(format!("{}{}", self.base_url, path))
            .header("X-User-Id", "integration-tester")
            .json(&json)
            .send()
            .await
    }

    async fn patch(&self, path: &str, json: Value) -> reqwest::Result<reqwest::Response> {
        self.client
            .patch(format!("{}{}", self.base_url, path))
            .json(&json)
            .send()
            .await
    }

    async fn get(&self, path: &str) -> reqwest::Result<reqwest::Response> {
        self.client
            .get(format!("{}{}", self.base_url, path))
            .send()
            .await
    }

    async fn delete(&self, path: &str) -> reqwest::Result<reqwest::Response> {
        self.client
            .delete(format!("{}{}", self.base_url, path))
            .send()
            .await
    }

    async fn create_tree(&self, name: &str) -> String {
        let response = self.post("/trees", json!({"name": name})).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let tree: Value = response.json().await.unwrap();
        tree["id"].as_str().unwrap().to_string()
    }

    async fn create_member(&self, tree_id: &str, first_name: &str, gender: &str) -> String {
        let response = self
            .post(
                &format!("/trees/{}/members", tree_id),
                json!({"firstName": first_name, "lastName": "Integration", "gender": gender}),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let member: Value = response.json().await.unwrap();
        member["id"].as_str().unwrap().to_string()
    }

    async fn member(&self, tree_id: &str, member_id: &str) -> Value {
        self.get(&format!("/trees/{}/members/{}", tree_id, member_id))
            .await
            .unwrap()
            .json()
            .await
            .unwrap()
    }
}

#[tokio::test]
async fn test_family_tree_complete_workflow() {
    let client = TestClient::spawn().await;

    let health = client.get("/health").await.unwrap();
    assert_eq!(health.status(), StatusCode::OK);

    let tree_id = client.create_tree("Integration Family").await;
    let tree: Value = client
        .get(&format!("/trees/{}", tree_id))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(tree["ownerId"], "integration-tester");

    let grandpa = client.create_member(&tree_id, "Walter", "male").await;
    let grandma = client.create_member(&tree_id, "Irene", "female").await;
    let father = client.create_member(&tree_id, "Paul", "male").await;
    let mother = client.create_member(&tree_id, "Nadia", "female").await;
    let child = client.create_member(&tree_id, "Sam", "other").await;

    // Edge records and adjacency edits end up in the same place
    let response = client
        .post(
            &format!("/trees/{}/relationships", tree_id),
            json!({"member1Id": grandpa, "member2Id": grandma, "relationshipType": "spouse"}),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = client
        .put(
            &format!("/trees/{}/members/{}/relationships", tree_id, father),
            json!({"proposed": {"parents": [grandpa, grandma], "spouseId": mother}}),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let outcome: Value = response.json().await.unwrap();
    assert_eq!(outcome["member"]["updatedBy"], "integration-tester");

    let response = client
        .post(
            &format!("/trees/{}/relationships", tree_id),
            json!({"member1Id": father, "member2Id": child, "relationshipType": "parent"}),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    assert_eq!(
        client.member(&tree_id, &grandma).await["spouseId"],
        json!(grandpa)
    );
    assert_eq!(
        client.member(&tree_id, &mother).await["spouseId"],
        json!(father)
    );
    assert_eq!(
        client.member(&tree_id, &father).await["children"],
        json!([child])
    );

    // Derived edge view
    let relationships: Value = client
        .get(&format!("/trees/{}/relationships", tree_id))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let spouse_edges = relationships["items"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|edge| edge["relationshipType"] == "spouse")
        .count();
    assert_eq!(spouse_edges, 2);

    // Layout: married-in mother shares her husband's band
    let layout: Value = client
        .get(&format!("/trees/{}/layout", tree_id))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let positions = &layout["positions"];
    assert_eq!(positions.as_object().unwrap().len(), 5);
    assert_eq!(positions[&grandpa]["generation"], 0);
    assert_eq!(positions[&mother]["generation"], 1);
    assert_eq!(positions[&father]["generation"], 1);
    assert_eq!(positions[&child]["generation"], 2);
    assert_eq!(positions[&child]["y"], 300.0);

    // Deleting the father strips every pointer to him
    let response = client
        .delete(&format!("/trees/{}/members/{}", tree_id, father))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let deletion: Value = response.json().await.unwrap();
    assert_eq!(deletion["cleanup"].as_array().unwrap().len(), 4);

    assert!(client.member(&tree_id, &mother).await.get("spouseId").is_none());
    assert_eq!(client.member(&tree_id, &child).await["parents"], json!([]));
    assert_eq!(client.member(&tree_id, &grandpa).await["children"], json!([]));

    let response = client.delete(&format!("/trees/{}", tree_id)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let response = client.get(&format!("/trees/{}/members", tree_id)).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_rejected_edits_leave_tree_untouched() {
    let client = TestClient::spawn().await;
    let tree_id = client.create_tree("Rejections").await;

    let parent = client.create_member(&tree_id, "Parent", "female").await;
    let first = client.create_member(&tree_id, "First", "male").await;
    let second = client.create_member(&tree_id, "Second", "female").await;

    let response = client
        .put(
            &format!("/trees/{}/members/{}/relationships", tree_id, parent),
            json!({"proposed": {"children": [first, second]}}),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Siblings cannot marry
    let response = client
        .put(
            &format!("/trees/{}/members/{}/relationships", tree_id, first),
            json!({"proposed": {"parents": [parent], "spouseId": second}}),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let error: Value = response.json().await.unwrap();
    assert_eq!(error["code"], "sibling_spouse");

    // Same member as parent and child
    let response = client
        .post(
            &format!("/trees/{}/members/{}/relationships/validate", tree_id, first),
            json!({"proposed": {"parents": [parent], "children": [parent]}}),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let preview: Value = response.json().await.unwrap();
    assert_eq!(preview["valid"], false);
    assert_eq!(preview["code"], "parent_child_overlap");

    // Unknown member reference
    let response = client
        .put(
            &format!("/trees/{}/members/{}/relationships", tree_id, first),
            json!({"proposed": {"parents": [parent, "ghost"]}}),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let second_member = client.member(&tree_id, &second).await;
    assert!(second_member.get("spouseId").is_none());
    assert_eq!(second_member["version"], 1);

    // Profile validation
    let response = client
        .patch(
            &format!("/trees/{}/members/{}", tree_id, first),
            json!({"birthDate": "1990-05-01", "deathDate": "1980-01-01"}),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let error: Value = response.json().await.unwrap();
    assert_eq!(error["code"], "death_before_birth");
}

#[tokio::test]
async fn test_concurrent_spouse_claims_conflict() {
    let client = TestClient::spawn().await;
    let tree_id = client.create_tree("Conflicts").await;

    let a = client.create_member(&tree_id, "A", "male").await;
    let b = client.create_member(&tree_id, "B", "female").await;

    let first = client.member(&tree_id, &a).await;
    let response = client
        .put(
            &format!("/trees/{}/members/{}/relationships", tree_id, a),
            json!({"oldState": {}, "expectedVersion": first["version"], "proposed": {"spouseId": b}}),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Replaying the same request against the now outdated version
    let response = client
        .put(
            &format!("/trees/{}/members/{}/relationships", tree_id, a),
            json!({"oldState": {}, "expectedVersion": first["version"], "proposed": {}}),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let error: Value = response.json().await.unwrap();
    assert_eq!(error["code"], "stale_state");
    assert_eq!(error["details"]["currentState"]["spouseId"], json!(b));
}
