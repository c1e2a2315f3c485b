// Split Bill - REST API (axum)
// Routes are built here so the server binary and the tests share them.

use crate::error::{Result, SplitBillError};
use crate::expense::{ExpenseRecord, NewExpense};
use crate::settlement::{self, SettlementReport};
use crate::store::ExpenseStore;
use crate::summary::ExpenseSummary;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::Serialize;
use std::sync::{Arc, Mutex};
use tower_http::cors::CorsLayer;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    store: Arc<Mutex<Box<dyn ExpenseStore + Send>>>,
}

impl AppState {
    pub fn new<S>(store: S) -> Self
    where
        S: ExpenseStore + Send + 'static,
    {
        Self {
            store: Arc::new(Mutex::new(Box::new(store))),
        }
    }

    /// Run `op` with the store locked. The lock is released before returning.
    fn with_store<T, F>(&self, op: F) -> Result<T>
    where
        F: FnOnce(&mut dyn ExpenseStore) -> Result<T>,
    {
        let mut guard = self
            .store
            .lock()
            .map_err(|_| SplitBillError::StoreUnavailable("lock poisoned".to_string()))?;
        op(&mut **guard)
    }
}

/// API Response wrapper
#[derive(Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    fn fail(error: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error),
        }
    }
}

#[derive(Serialize)]
struct DeleteResponse {
    removed: usize,
}

fn status_for(err: &SplitBillError) -> StatusCode {
    match err {
        SplitBillError::InvalidRecord { .. } => StatusCode::BAD_REQUEST,
        SplitBillError::NotFound(_) => StatusCode::NOT_FOUND,
        // "nothing to settle" is an answer, not a failure
        SplitBillError::EmptyInput => StatusCode::OK,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn respond<T: Serialize>(result: Result<T>, success: StatusCode) -> Response {
    match result {
        Ok(data) => (success, Json(ApiResponse::ok(data))).into_response(),
        Err(e) => {
            let status = status_for(&e);
            if status.is_server_error() {
                tracing::error!(error = %e, "request failed");
            } else {
                tracing::debug!(error = %e, "request rejected");
            }
            (status, Json(ApiResponse::<T>::fail(e.to_string()))).into_response()
        }
    }
}

/// Malformed or incomplete bodies are invalid records, not framework errors
fn expense_body(body: std::result::Result<Json<NewExpense>, JsonRejection>) -> Result<NewExpense> {
    body.map(|Json(input)| input)
        .map_err(|rejection| SplitBillError::invalid("body", rejection.body_text()))
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /api/expenses - All expenses, oldest first
async fn list_expenses(State(state): State<AppState>) -> Response {
    respond(state.with_store(|store| store.list()), StatusCode::OK)
}

/// POST /api/expenses - Add an expense
async fn create_expense(
    State(state): State<AppState>,
    body: std::result::Result<Json<NewExpense>, JsonRejection>,
) -> Response {
    let result = expense_body(body).and_then(|input| state.with_store(|store| store.create(input)));
    respond(result, StatusCode::CREATED)
}

/// PUT /api/expenses/:id - Replace participant, amount, description
async fn update_expense(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: std::result::Result<Json<NewExpense>, JsonRejection>,
) -> Response {
    let result = expense_body(body).and_then(|input| state.with_store(|store| store.update(&id, input)));
    respond(result, StatusCode::OK)
}

/// DELETE /api/expenses/:id
async fn delete_expense(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let result = state.with_store(|store| {
        if store.delete(&id)? {
            Ok(DeleteResponse { removed: 1 })
        } else {
            Err(SplitBillError::NotFound(id.clone()))
        }
    });
    respond(result, StatusCode::OK)
}

/// DELETE /api/expenses - Remove everything
async fn delete_all_expenses(State(state): State<AppState>) -> Response {
    respond(
        state.with_store(|store| store.delete_all().map(|removed| DeleteResponse { removed })),
        StatusCode::OK,
    )
}

/// GET /api/settlement - Balances and transfers for the current expenses
async fn get_settlement(State(state): State<AppState>) -> Response {
    let result: Result<SettlementReport> = state
        .with_store(|store| store.list())
        .and_then(|records| settlement::settle(&records));
    respond(result, StatusCode::OK)
}

/// GET /api/summary - Totals by participant and by description
async fn get_summary(State(state): State<AppState>) -> Response {
    let result = state
        .with_store(|store| store.list())
        .map(|records: Vec<ExpenseRecord>| ExpenseSummary::from_records(&records));
    respond(result, StatusCode::OK)
}

pub fn router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route(
            "/expenses",
            get(list_expenses)
                .post(create_expense)
                .delete(delete_all_expenses),
        )
        .route("/expenses/:id", axum::routing::put(update_expense).delete(delete_expense))
        .route("/settlement", get(get_settlement))
        .route("/summary", get(get_summary))
        .with_state(state);

    Router::new()
        .nest("/api", api_routes)
        .layer(CorsLayer::permissive())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryExpenseStore;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn app() -> Router {
        router(AppState::new(MemoryExpenseStore::new(vec![
            "Kunal".to_string(),
            "Himanshu".to_string(),
            "Aakash".to_string(),
        ])))
    }

    async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = call(&app(), "GET", "/api/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"], "OK");
    }

    #[tokio::test]
    async fn test_settlement_of_empty_store() {
        let (status, body) = call(&app(), "GET", "/api/settlement", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], false);
        assert!(body["error"].as_str().unwrap().contains("nothing to settle"));
    }

    #[tokio::test]
    async fn test_create_and_settle() {
        let app = app();
        for (who, amount, what) in [("Kunal", 300.0, "Rent"), ("Aakash", 60.0, "Food")] {
            let (status, _) = call(
                &app,
                "POST",
                "/api/expenses",
                Some(json!({"participant": who, "amount": amount, "description": what})),
            )
            .await;
            assert_eq!(status, StatusCode::CREATED);
        }

        let (status, body) = call(&app, "GET", "/api/settlement", None).await;
        assert_eq!(status, StatusCode::OK);

        let data = &body["data"];
        assert_eq!(data["participant_count"], 2);
        assert_eq!(data["total"], 360.0);
        assert_eq!(data["transfers"][0]["payer"], "Aakash");
        assert_eq!(data["transfers"][0]["receiver"], "Kunal");
        assert_eq!(data["transfers"][0]["amount"], 120.0);
    }

    #[tokio::test]
    async fn test_invalid_expense_is_bad_request() {
        let (status, body) = call(
            &app(),
            "POST",
            "/api/expenses",
            Some(json!({"participant": "Kunal", "amount": 0.0, "description": "Rent"})),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_missing_field_is_bad_request() {
        let app = app();
        let (status, body) = call(
            &app,
            "POST",
            "/api/expenses",
            Some(json!({"participant": "Kunal", "amount": 10.0})),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert!(body["error"].as_str().unwrap().contains("description"));

        let (_, created) = call(
            &app,
            "POST",
            "/api/expenses",
            Some(json!({"participant": "Kunal", "amount": 10.0, "description": "Tea"})),
        )
        .await;
        let id = created["data"]["id"].as_str().unwrap().to_string();

        let (status, body) = call(
            &app,
            "PUT",
            &format!("/api/expenses/{}", id),
            Some(json!({"amount": 12.0, "description": "Tea"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("participant"));
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let app = app();
        let (_, created) = call(
            &app,
            "POST",
            "/api/expenses",
            Some(json!({"participant": "Kunal", "amount": 10.0, "description": "Tea"})),
        )
        .await;
        let id = created["data"]["id"].as_str().unwrap().to_string();

        let (status, updated) = call(
            &app,
            "PUT",
            &format!("/api/expenses/{}", id),
            Some(json!({"participant": "Aakash", "amount": 12.5, "description": "Tea"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["data"]["participant"], "Aakash");

        let (status, _) = call(&app, "DELETE", &format!("/api/expenses/{}", id), None).await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = call(&app, "DELETE", &format!("/api/expenses/{}", id), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_summary_and_delete_all() {
        let app = app();
        for (who, amount, what) in [("Kunal", 10.0, "Tea"), ("Aakash", 5.0, "Tea"), ("Kunal", 7.0, "Bus")] {
            call(
                &app,
                "POST",
                "/api/expenses",
                Some(json!({"participant": who, "amount": amount, "description": what})),
            )
            .await;
        }

        let (_, summary) = call(&app, "GET", "/api/summary", None).await;
        assert_eq!(summary["data"]["total"], 22.0);
        assert_eq!(summary["data"]["by_participant"][1]["label"], "Kunal");
        assert_eq!(summary["data"]["by_description"][1]["amount"], 15.0);

        let (_, removed) = call(&app, "DELETE", "/api/expenses", None).await;
        assert_eq!(removed["data"]["removed"], 3);

        let (_, list) = call(&app, "GET", "/api/expenses", None).await;
        assert_eq!(list["data"].as_array().unwrap().len(), 0);
    }
}
