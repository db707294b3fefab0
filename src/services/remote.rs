use crate::models::{Record, RecordId};
use crate::services::store::{
    record_id, BatchResponse, Entity, FetchResponse, FieldError, RecordQuery, RecordResponse, RecordResult,
    RecordStore, SortDirection, StoreError,
};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde_json::{json, Value};
use std::time::Duration;

/// Collection IDs in the hosted store
#[derive(Debug, Clone)]
pub struct StoreCollections {
    pub property: String,
    pub saved_property: String,
}

impl StoreCollections {
    fn for_entity(&self, entity: Entity) -> &str {
        match entity {
            Entity::Property => &self.property,
            Entity::SavedProperty => &self.saved_property,
        }
    }
}

/// Hosted record store client
///
/// Speaks the Appwrite-style document REST API:
/// - `GET    /databases/{db}/collections/{collection}/documents`
/// - `GET    /databases/{db}/collections/{collection}/documents/{id}`
/// - `POST   /databases/{db}/collections/{collection}/documents`
/// - `PATCH  /databases/{db}/collections/{collection}/documents/{id}`
/// - `DELETE /databases/{db}/collections/{collection}/documents/{id}`
///
/// Batch operations are issued one document at a time and reported per record.
pub struct RemoteRecordStore {
    base_url: String,
    api_key: String,
    project_id: String,
    database_id: String,
    timeout: Duration,
    client: Client,
    collections: StoreCollections,
}

impl RemoteRecordStore {
    /// Create a new store client
    pub fn new(
        base_url: String,
        api_key: String,
        project_id: String,
        database_id: String,
        collections: StoreCollections,
        timeout: Duration,
    ) -> Result<Self, StoreError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            base_url,
            api_key,
            project_id,
            database_id,
            timeout,
            client,
            collections,
        })
    }

    fn documents_url(&self, entity: Entity) -> String {
        format!(
            "{}/databases/{}/collections/{}/documents",
            self.base_url.trim_end_matches('/'),
            self.database_id,
            self.collections.for_entity(entity)
        )
    }

    fn document_url(&self, entity: Entity, id: &RecordId) -> String {
        format!("{}/{}", self.documents_url(entity), urlencoding::encode(id.as_str()))
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, StoreError> {
        let response = request
            .header("X-Appwrite-Key", &self.api_key)
            .header("X-Appwrite-Project", &self.project_id)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    StoreError::Timeout(self.timeout.as_millis() as u64)
                } else {
                    StoreError::RequestError(e)
                }
            })?;

        if response.status() == StatusCode::UNAUTHORIZED {
            return Err(StoreError::Unauthorized);
        }

        Ok(response)
    }

    /// Send one document write; any failure becomes that record's outcome
    ///
    /// Earlier records in a batch may already be written, so a failure here
    /// must not abort the rest.
    async fn write(&self, request: RequestBuilder) -> RecordResult {
        let response = match self.send(request).await {
            Ok(response) => response,
            Err(StoreError::Unauthorized) => return RecordResult::failed(401, StoreError::Unauthorized.to_string()),
            Err(e) => {
                tracing::warn!("Store write failed: {}", e);
                return RecordResult::failed(503, e.to_string());
            }
        };

        match Self::record_result(response).await {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!("Store write rejected: {}", e);
                RecordResult::failed(500, e.to_string())
            }
        }
    }

    /// Per-record outcome for a write call
    async fn record_result(response: Response) -> Result<RecordResult, StoreError> {
        let status = response.status();
        if status.is_success() {
            if status == StatusCode::NO_CONTENT {
                return Ok(RecordResult::ok(None));
            }
            let body: Value = response.json().await?;
            return Ok(RecordResult::ok(document_to_record(&body)));
        }

        if status.is_server_error() {
            return Err(StoreError::ApiError(format!("Store returned {}", status)));
        }

        let message = error_message(response).await;
        let mut result = RecordResult::failed(status.as_u16(), message.clone());
        if status == StatusCode::BAD_REQUEST {
            result = result.with_errors(vec![FieldError {
                field_label: field_from_message(&message).unwrap_or_default(),
                message,
            }]);
        }
        Ok(result)
    }
}

/// Render a query in the store's query-string syntax
fn encode_queries(query: &RecordQuery) -> Vec<String> {
    let mut queries: Vec<String> = query
        .conditions
        .iter()
        .map(|c| format!("equal(\"{}\", {})", c.field, Value::Array(c.values.clone())))
        .collect();

    if let Some(order) = &query.order_by {
        queries.push(match order.direction {
            SortDirection::Ascending => format!("orderAsc(\"{}\")", order.field),
            SortDirection::Descending => format!("orderDesc(\"{}\")", order.field),
        });
    }
    if let Some(limit) = query.limit {
        queries.push(format!("limit({})", limit));
    }
    if let Some(offset) = query.offset {
        queries.push(format!("offset({})", offset));
    }

    queries
}

/// Convert a store document into a record keyed the way repositories expect
///
/// `$id` becomes `Id`; other `$`-prefixed metadata is dropped except the
/// audit timestamps.
fn document_to_record(document: &Value) -> Option<Record> {
    let doc = document.as_object()?;
    let mut record = Record::new();

    for (key, value) in doc {
        match key.as_str() {
            "$id" => {
                record.insert("Id".into(), value.clone());
            }
            "$createdAt" => {
                record.insert("CreatedOn".into(), value.clone());
            }
            "$updatedAt" => {
                record.insert("ModifiedOn".into(), value.clone());
            }
            k if k.starts_with('$') => {}
            _ => {
                record.insert(key.clone(), value.clone());
            }
        }
    }

    Some(record)
}

async fn error_message(response: Response) -> String {
    let status = response.status();
    match response.json::<Value>().await {
        Ok(body) => body
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| status.to_string()),
        Err(_) => status.to_string(),
    }
}

/// Pulls the attribute name out of messages like `Invalid document structure: Attribute "price" ...`
fn field_from_message(message: &str) -> Option<String> {
    let start = message.find("Attribute \"")? + "Attribute \"".len();
    let end = message[start..].find('"')? + start;
    Some(message[start..end].to_string())
}

#[async_trait]
impl RecordStore for RemoteRecordStore {
    async fn fetch_records(&self, entity: Entity, query: &RecordQuery) -> Result<FetchResponse, StoreError> {
        let queries_json = serde_json::to_string(&encode_queries(query))
            .map_err(|e| StoreError::InvalidResponse(format!("Failed to encode query: {}", e)))?;
        let url = format!("{}?queries={}", self.documents_url(entity), urlencoding::encode(&queries_json));

        tracing::debug!("Fetching {} records from: {}", entity, url);

        let response = self.send(self.client.get(&url)).await?;
        if !response.status().is_success() {
            let status = response.status();
            return Ok(FetchResponse {
                success: false,
                data: vec![],
                message: Some(format!("Failed to fetch {} records: {}", entity, status)),
            });
        }

        let json: Value = response.json().await?;
        let documents = json
            .get("documents")
            .and_then(|d| d.as_array())
            .ok_or_else(|| StoreError::InvalidResponse("Missing documents array".into()))?;

        let data: Vec<Record> = documents.iter().filter_map(document_to_record).collect();
        let total = json.get("total").and_then(|t| t.as_u64()).unwrap_or(0);

        tracing::debug!("Fetched {} {} records (total: {})", data.len(), entity, total);

        Ok(FetchResponse {
            success: true,
            data,
            message: None,
        })
    }

    async fn get_record_by_id(&self, entity: Entity, id: &RecordId) -> Result<RecordResponse, StoreError> {
        let response = self.send(self.client.get(self.document_url(entity, id))).await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Ok(RecordResponse {
                success: false,
                data: None,
                message: Some(format!("Record {} not found in {}", id, entity)),
            });
        }
        if !status.is_success() {
            return Err(StoreError::ApiError(format!("Failed to fetch {} {}: {}", entity, id, status)));
        }

        let body: Value = response.json().await?;
        Ok(RecordResponse {
            success: true,
            data: document_to_record(&body),
            message: None,
        })
    }

    async fn create_records(&self, entity: Entity, records: Vec<Record>) -> Result<BatchResponse, StoreError> {
        let url = self.documents_url(entity);
        let mut results = Vec::with_capacity(records.len());

        for record in records {
            let payload = json!({
                "documentId": uuid::Uuid::new_v4().to_string(),
                "data": record,
            });
            results.push(self.write(self.client.post(&url).json(&payload)).await);
        }

        tracing::debug!("Created {} {} records", results.iter().filter(|r| r.success).count(), entity);
        Ok(BatchResponse::from_results(results))
    }

    async fn update_records(&self, entity: Entity, records: Vec<Record>) -> Result<BatchResponse, StoreError> {
        let mut results = Vec::with_capacity(records.len());

        for mut record in records {
            let Some(id) = record_id(&record) else {
                results.push(RecordResult::failed(400, "Record is missing Id"));
                continue;
            };
            record.remove("Id");
            record.remove("id");

            let payload = json!({ "data": record });
            results.push(
                self.write(self.client.patch(self.document_url(entity, &id)).json(&payload))
                    .await,
            );
        }

        Ok(BatchResponse::from_results(results))
    }

    async fn delete_records(&self, entity: Entity, ids: &[RecordId]) -> Result<BatchResponse, StoreError> {
        let mut results = Vec::with_capacity(ids.len());

        for id in ids {
            results.push(self.write(self.client.delete(self.document_url(entity, id))).await);
        }

        Ok(BatchResponse::from_results(results))
    }

    fn backend_name(&self) -> &'static str {
        "remote"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_store(base_url: String) -> RemoteRecordStore {
        RemoteRecordStore::new(
            base_url,
            "test_key".to_string(),
            "test_project".to_string(),
            "test_db".to_string(),
            StoreCollections {
                property: "property".to_string(),
                saved_property: "saved_property".to_string(),
            },
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn test_store_creation() {
        let store = create_store("https://store.test/v1/".to_string());
        assert_eq!(
            store.documents_url(Entity::SavedProperty),
            "https://store.test/v1/databases/test_db/collections/saved_property/documents"
        );
        assert_eq!(store.api_key, "test_key");
    }

    #[test]
    fn test_encode_queries() {
        let query = RecordQuery::new()
            .equal_to("property_id", vec![json!(7)])
            .order_by("saved_date", SortDirection::Ascending)
            .limit(25);

        assert_eq!(
            encode_queries(&query),
            vec![
                "equal(\"property_id\", [7])".to_string(),
                "orderAsc(\"saved_date\")".to_string(),
                "limit(25)".to_string(),
            ]
        );
    }

    #[test]
    fn test_document_to_record() {
        let doc = json!({"$id": "abc", "$collectionId": "property", "$createdAt": "2024-01-01", "address": "x"});
        let record = document_to_record(&doc).unwrap();
        assert_eq!(record["Id"], json!("abc"));
        assert_eq!(record["CreatedOn"], json!("2024-01-01"));
        assert!(!record.contains_key("$collectionId"));
    }

    #[test]
    fn test_field_from_message() {
        let message = r#"Invalid document structure: Attribute "price" has invalid type."#;
        assert_eq!(field_from_message(message), Some("price".to_string()));
        assert_eq!(field_from_message("something else"), None);
    }

    #[tokio::test]
    async fn test_fetch_records() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", mockito::Matcher::Regex(r"^/databases/test_db/collections/property/documents".into()))
            .match_header("X-Appwrite-Project", "test_project")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"total": 1, "documents": [{"$id": "p1", "address": "12 Oak St", "price": 300000}]}"#)
            .create_async()
            .await;

        let store = create_store(server.url());
        let fetched = store.fetch_records(Entity::Property, &RecordQuery::new()).await.unwrap();

        mock.assert_async().await;
        assert!(fetched.success);
        assert_eq!(record_id(&fetched.data[0]), Some(RecordId::from("p1")));
    }

    #[tokio::test]
    async fn test_create_conflict_reported_per_record() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/databases/test_db/collections/saved_property/documents")
            .with_status(409)
            .with_header("content-type", "application/json")
            .with_body(r#"{"message": "Document with the requested ID already exists.", "code": 409}"#)
            .create_async()
            .await;

        let store = create_store(server.url());
        let mut record = Record::new();
        record.insert("property_id".into(), json!("p1"));
        let batch = store.create_records(Entity::SavedProperty, vec![record]).await.unwrap();

        assert!(!batch.success);
        assert_eq!(batch.results[0].status, Some(409));
    }

    #[tokio::test]
    async fn test_server_error_on_one_record_keeps_the_others() {
        let mut server = mockito::Server::new_async().await;
        let created = server
            .mock("POST", "/databases/test_db/collections/property/documents")
            .match_body(mockito::Matcher::PartialJson(json!({"data": {"address": "12 Oak St"}})))
            .with_status(201)
            .with_header("content-type", "application/json")
            .with_body(r#"{"$id": "p1", "address": "12 Oak St", "price": 300000}"#)
            .create_async()
            .await;
        server
            .mock("POST", "/databases/test_db/collections/property/documents")
            .match_body(mockito::Matcher::PartialJson(json!({"data": {"address": "5 Elm Ave"}})))
            .with_status(500)
            .create_async()
            .await;

        let store = create_store(server.url());
        let mut first = Record::new();
        first.insert("address".into(), json!("12 Oak St"));
        first.insert("price".into(), json!(300000));
        let mut second = Record::new();
        second.insert("address".into(), json!("5 Elm Ave"));
        second.insert("price".into(), json!(900000));

        let batch = store.create_records(Entity::Property, vec![first, second]).await.unwrap();

        created.assert_async().await;
        assert!(!batch.success);
        assert!(batch.results[0].success);
        assert_eq!(record_id(batch.results[0].data.as_ref().unwrap()), Some(RecordId::from("p1")));
        assert!(!batch.results[1].success);
        assert_eq!(batch.results[1].status, Some(500));
    }

    #[tokio::test]
    async fn test_update_failure_is_per_record() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("PATCH", "/databases/test_db/collections/property/documents/p1")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"$id": "p1", "price": 310000}"#)
            .create_async()
            .await;
        server
            .mock("PATCH", "/databases/test_db/collections/property/documents/p2")
            .with_status(503)
            .create_async()
            .await;

        let store = create_store(server.url());
        let records = vec![
            json!({"Id": "p1", "price": 310000}).as_object().cloned().unwrap(),
            json!({"Id": "p2", "price": 950000}).as_object().cloned().unwrap(),
        ];
        let batch = store.update_records(Entity::Property, records).await.unwrap();

        assert!(batch.results[0].success);
        assert!(!batch.results[1].success);
    }

    #[tokio::test]
    async fn test_get_missing_record() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/databases/test_db/collections/property/documents/nope")
            .with_status(404)
            .create_async()
            .await;

        let store = create_store(server.url());
        let response = store.get_record_by_id(Entity::Property, &RecordId::from("nope")).await.unwrap();
        assert!(!response.success);
    }

    #[tokio::test]
    async fn test_unauthorized() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", mockito::Matcher::Any)
            .with_status(401)
            .create_async()
            .await;

        let store = create_store(server.url());
        let result = store.fetch_records(Entity::Property, &RecordQuery::new()).await;
        assert!(matches!(result, Err(StoreError::Unauthorized)));
    }
}
