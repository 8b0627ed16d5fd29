//! HTTP client for the hosted `vehicles` table (PostgREST dialect).

use crate::config::AppConfig;
use crate::inventory::{Vehicle, VehiclePatch};
use crate::sync::remote::{RemoteStore, VehicleRow};
use crate::{InventoryError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Method, RequestBuilder};
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

const RETURN_REPRESENTATION: &str = "return=representation";
const UPSERT_PREFERENCE: &str = "resolution=merge-duplicates,return=representation";

/// REST client for the remote vehicle table.
///
/// No request timeout is configured: a hung call stays pending until the
/// server or the network gives up.
pub struct RestClient {
    client: reqwest::Client,
    table_url: String,
    api_key: String,
}

#[derive(Serialize)]
struct PatchBody<'a> {
    #[serde(flatten)]
    patch: &'a VehiclePatch,
    updated_at: DateTime<Utc>,
}

impl RestClient {
    /// Create a client for `table` under the backend at `base_url`.
    pub fn new(base_url: &str, api_key: &str, table: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| InventoryError::Config(format!("HTTP client: {}", e)))?;

        Ok(Self {
            client,
            table_url: format!("{}/rest/v1/{}", base_url.trim_end_matches('/'), table),
            api_key: api_key.to_string(),
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Self::new(&config.remote_url, &config.api_key, &config.table)
    }

    pub fn table_url(&self) -> &str {
        &self.table_url
    }

    // --- Internal helpers ---

    fn request(&self, method: Method, query: &str) -> RequestBuilder {
        let url = if query.is_empty() {
            self.table_url.clone()
        } else {
            format!("{}?{}", self.table_url, query)
        };

        let builder = self.client.request(method, url);
        if self.api_key.is_empty() {
            builder
        } else {
            builder
                .header("apikey", &self.api_key)
                .bearer_auth(&self.api_key)
        }
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Vec<u8>> {
        let resp = builder.send().await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_else(|_| "unknown".to_string());
            return Err(InventoryError::Remote(format!(
                "Remote error {}: {}",
                status, body
            )));
        }

        Ok(resp.bytes().await?.to_vec())
    }

    async fn send_rows(&self, builder: RequestBuilder) -> Result<Vec<Vehicle>> {
        let body = self.send(builder).await?;
        let rows: Vec<VehicleRow> = serde_json::from_slice(&body)
            .map_err(|e| InventoryError::Remote(format!("Invalid response: {}", e)))?;
        Ok(rows.into_iter().map(Vehicle::from).collect())
    }
}

fn id_filter(id: Uuid) -> String {
    format!("id=eq.{}", id)
}

#[async_trait]
impl RemoteStore for RestClient {
    async fn list(&self) -> Result<Vec<Vehicle>> {
        let rows = self
            .send_rows(self.request(Method::GET, "select=*&order=updated_at.desc"))
            .await?;
        debug!("Listed {} remote vehicles", rows.len());
        Ok(rows)
    }

    async fn insert(&self, vehicle: &Vehicle) -> Result<Vehicle> {
        let body = vec![VehicleRow::from(vehicle)];
        let builder = self
            .request(Method::POST, "")
            .header("Prefer", RETURN_REPRESENTATION)
            .json(&body);

        self.send_rows(builder)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| InventoryError::Remote("Insert returned no row".to_string()))
    }

    async fn update(
        &self,
        id: Uuid,
        patch: &VehiclePatch,
        updated_at: DateTime<Utc>,
    ) -> Result<Vehicle> {
        let body = PatchBody { patch, updated_at };
        let builder = self
            .request(Method::PATCH, &id_filter(id))
            .header("Prefer", RETURN_REPRESENTATION)
            .json(&body);

        self.send_rows(builder)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| InventoryError::NotFound(id.to_string()))
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        self.send(self.request(Method::DELETE, &id_filter(id)))
            .await?;
        Ok(())
    }

    async fn upsert(&self, vehicles: &[Vehicle]) -> Result<Vec<Vehicle>> {
        if vehicles.is_empty() {
            return Ok(Vec::new());
        }
        let body: Vec<VehicleRow> = vehicles.iter().map(VehicleRow::from).collect();
        let builder = self
            .request(Method::POST, "")
            .header("Prefer", UPSERT_PREFERENCE)
            .json(&body);

        self.send_rows(builder).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::{NewVehicle, Status};
    use axum::extract::{Query, State};
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::get;
    use axum::{Json, Router};
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    type Table = Arc<Mutex<Vec<VehicleRow>>>;

    const KEY: &str = "anon-key";

    fn authorized(headers: &HeaderMap) -> bool {
        headers.get("apikey").and_then(|v| v.to_str().ok()) == Some(KEY)
            && headers.get("authorization").and_then(|v| v.to_str().ok())
                == Some("Bearer anon-key")
    }

    fn parse_id(params: &HashMap<String, String>) -> Option<Uuid> {
        params
            .get("id")
            .and_then(|f| f.strip_prefix("eq."))
            .and_then(|s| Uuid::parse_str(s).ok())
    }

    async fn list(
        State(table): State<Table>,
        headers: HeaderMap,
        Query(params): Query<HashMap<String, String>>,
    ) -> std::result::Result<Json<Vec<VehicleRow>>, StatusCode> {
        if !authorized(&headers) {
            return Err(StatusCode::UNAUTHORIZED);
        }
        if params.get("order").map(String::as_str) != Some("updated_at.desc") {
            return Err(StatusCode::BAD_REQUEST);
        }
        let mut rows = table.lock().unwrap().clone();
        rows.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(Json(rows))
    }

    async fn insert(
        State(table): State<Table>,
        headers: HeaderMap,
        Json(rows): Json<Vec<VehicleRow>>,
    ) -> std::result::Result<(StatusCode, Json<Vec<VehicleRow>>), StatusCode> {
        if !authorized(&headers) {
            return Err(StatusCode::UNAUTHORIZED);
        }
        let merge = headers
            .get("prefer")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|p| p.contains("merge-duplicates"));

        let mut stored = table.lock().unwrap();
        for row in &rows {
            match stored.iter_mut().find(|r| r.id == row.id) {
                Some(existing) if merge => *existing = row.clone(),
                Some(_) => return Err(StatusCode::CONFLICT),
                None => stored.push(row.clone()),
            }
        }
        Ok((StatusCode::CREATED, Json(rows)))
    }

    async fn patch(
        State(table): State<Table>,
        Query(params): Query<HashMap<String, String>>,
        Json(changes): Json<serde_json::Value>,
    ) -> Json<Vec<VehicleRow>> {
        let id = parse_id(&params);
        let mut stored = table.lock().unwrap();
        let Some(row) = stored.iter_mut().find(|r| Some(r.id) == id) else {
            return Json(Vec::new());
        };
        let mut value = serde_json::to_value(&*row).unwrap();
        for (k, v) in changes.as_object().unwrap() {
            value[k] = v.clone();
        }
        *row = serde_json::from_value(value).unwrap();
        Json(vec![row.clone()])
    }

    async fn remove(
        State(table): State<Table>,
        Query(params): Query<HashMap<String, String>>,
    ) -> StatusCode {
        let id = parse_id(&params);
        table.lock().unwrap().retain(|r| Some(r.id) != id);
        StatusCode::NO_CONTENT
    }

    async fn spawn(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    async fn rest_table() -> (RestClient, Table) {
        let table: Table = Arc::default();
        let router = Router::new()
            .route(
                "/rest/v1/vehicles",
                get(list).post(insert).patch(patch).delete(remove),
            )
            .with_state(table.clone());
        let base = spawn(router).await;
        (RestClient::new(&base, KEY, "vehicles").unwrap(), table)
    }

    fn rav4() -> Vehicle {
        Vehicle::new(
            NewVehicle {
                make: "Toyota".to_string(),
                model: "RAV4".to_string(),
                year: 2024,
                price: 32999.0,
                ..Default::default()
            },
            Utc::now(),
        )
    }

    #[test]
    fn table_url_strips_trailing_slash() {
        let client = RestClient::new("https://example.supabase.co/", "k", "vehicles").unwrap();
        assert_eq!(
            client.table_url(),
            "https://example.supabase.co/rest/v1/vehicles"
        );
    }

    #[test]
    fn patch_body_carries_updated_at() {
        let patch = VehiclePatch {
            status: Some(Status::Sold),
            ..Default::default()
        };
        let body = PatchBody {
            patch: &patch,
            updated_at: Utc::now(),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["status"], "sold");
        assert!(json.get("updated_at").is_some());
        assert!(json.get("price").is_none());
    }

    #[tokio::test]
    async fn insert_then_list() {
        let (client, table) = rest_table().await;
        let vehicle = rav4();

        let stored = client.insert(&vehicle).await.unwrap();
        assert_eq!(stored, vehicle);
        assert_eq!(table.lock().unwrap().len(), 1);

        let listed = client.list().await.unwrap();
        assert_eq!(listed, vec![vehicle]);
    }

    #[tokio::test]
    async fn update_returns_server_row() {
        let (client, _table) = rest_table().await;
        let vehicle = client.insert(&rav4()).await.unwrap();

        let patch = VehiclePatch {
            price: Some(31000.0),
            ..Default::default()
        };
        let later = vehicle.created_at + chrono::Duration::minutes(5);
        let updated = client.update(vehicle.id, &patch, later).await.unwrap();
        assert_eq!(updated.price, 31000.0);
        assert_eq!(updated.updated_at, later);
        assert_eq!(updated.make, "Toyota");

        let missing = client.update(Uuid::new_v4(), &patch, later).await;
        assert!(matches!(missing, Err(InventoryError::NotFound(_))));
    }

    #[tokio::test]
    async fn delete_and_upsert() {
        let (client, table) = rest_table().await;
        let first = client.insert(&rav4()).await.unwrap();

        let mut changed = first.clone();
        changed.status = Status::Sold;
        let second = rav4();
        client.upsert(&[changed, second]).await.unwrap();
        assert_eq!(table.lock().unwrap().len(), 2);
        assert!(table
            .lock()
            .unwrap()
            .iter()
            .any(|r| r.id == first.id && r.status == Status::Sold));

        client.delete(first.id).await.unwrap();
        assert_eq!(table.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn wrong_key_is_remote_error() {
        let router = Router::new()
            .route("/rest/v1/vehicles", get(list))
            .with_state(Table::default());
        let base = spawn(router).await;

        let client = RestClient::new(&base, "wrong", "vehicles").unwrap();
        match client.list().await {
            Err(InventoryError::Remote(msg)) => assert!(msg.contains("401")),
            other => panic!("expected remote error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn unreachable_server_is_remote_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = RestClient::new(&format!("http://{}", addr), KEY, "vehicles").unwrap();
        assert!(matches!(
            client.list().await,
            Err(InventoryError::Remote(_))
        ));
    }
}
