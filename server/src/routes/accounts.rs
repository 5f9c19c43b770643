//! Account endpoint routes.

use axum::{
    extract::{rejection::FormRejection, Path, Query, State},
    routing::{get, post},
    Form, Router,
};

use crate::envelope::Envelope;
use crate::error::{AppError, Result};
use crate::handlers::{
    handle_create_account, handle_delete_account, handle_get_account, handle_get_all_accounts,
    handle_search_accounts, handle_update_account, parse_id, AccountForm, SearchQuery,
};
use crate::AppState;

/// Create account routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/accounts",
            get(list_handler).fallback(method_not_allowed),
        )
        .route(
            "/accounts/new",
            post(create_handler).fallback(method_not_allowed),
        )
        .route(
            "/accounts/search",
            get(search_handler).fallback(method_not_allowed),
        )
        .route(
            "/accounts/{id}",
            get(get_handler)
                .post(update_handler)
                .delete(delete_handler)
                .fallback(method_not_allowed),
        )
}

fn form_body(form: std::result::Result<Form<AccountForm>, FormRejection>) -> Result<AccountForm> {
    form.map(|Form(form)| form)
        .map_err(|e| AppError::BadRequest(e.body_text()))
}

/// GET /accounts - List all accounts.
async fn list_handler(State(state): State<AppState>) -> Result<Envelope> {
    handle_get_all_accounts(&state.sync).await
}

/// POST /accounts/new - Create an account.
async fn create_handler(
    State(state): State<AppState>,
    form: std::result::Result<Form<AccountForm>, FormRejection>,
) -> Result<Envelope> {
    handle_create_account(&state.sync, form_body(form)?).await
}

/// GET /accounts/search?q= - Search accounts.
async fn search_handler(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Envelope> {
    handle_search_accounts(&state.sync, query).await
}

/// GET /accounts/{id} - Read an account.
async fn get_handler(State(state): State<AppState>, Path(id): Path<String>) -> Result<Envelope> {
    handle_get_account(&state.sync, parse_id(&id)?).await
}

/// POST /accounts/{id} - Update an account.
async fn update_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    form: std::result::Result<Form<AccountForm>, FormRejection>,
) -> Result<Envelope> {
    let id = parse_id(&id)?;
    handle_update_account(&state.sync, id, form_body(form)?).await
}

/// DELETE /accounts/{id} - Delete an account.
async fn delete_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Envelope> {
    handle_delete_account(&state.sync, parse_id(&id)?).await
}

async fn method_not_allowed() -> AppError {
    AppError::MethodNotAllowed
}

#[cfg(test)]
mod tests {
    use crate::AppState;
    use axum::{
        body::{to_bytes, Body},
        http::{header::CONTENT_TYPE, Method, Request, StatusCode},
        Router,
    };
    use finance_engine::{MemoryCache, MemoryPrimaryStore, MemorySearchIndex, Synchronizer};
    use serde_json::Value;
    use std::sync::Arc;
    use tower::ServiceExt;

    struct TestApp {
        router: Router,
        cache: Arc<MemoryCache>,
        index: Arc<MemorySearchIndex>,
    }

    fn app() -> TestApp {
        let cache = Arc::new(MemoryCache::new());
        let index = Arc::new(MemorySearchIndex::new());
        let sync = Synchronizer::builder(
            Arc::new(MemoryPrimaryStore::new()),
            cache.clone(),
            index.clone(),
        )
        .build();
        let router = super::routes().with_state(AppState::new(sync, None));
        TestApp {
            router,
            cache,
            index,
        }
    }

    async fn send(app: &TestApp, method: Method, uri: &str, form: Option<&str>) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        let body = match form {
            Some(form) => {
                request = request.header(CONTENT_TYPE, "application/x-www-form-urlencoded");
                Body::from(form.to_string())
            }
            None => Body::empty(),
        };
        let response = app
            .router
            .clone()
            .oneshot(request.body(body).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn account_lifecycle_over_http() {
        let app = app();

        let (status, body) = send(&app, Method::POST, "/accounts/new", Some("name=Alice&balance=100")).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["status"], 201);
        assert_eq!(body["data"]["id"], 1);
        assert_eq!(body["data"]["rowsAffected"], 1);

        let (status, body) = send(&app, Method::GET, "/accounts/1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["name"], "Alice");
        assert_eq!(body["data"]["balance"], 100.0);
        assert!(body["data"].get("deletedAt").is_none());

        let (status, body) = send(
            &app,
            Method::POST,
            "/accounts/1",
            Some("name=Alice+Smith&balance=150"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["rowsAffected"], 1);

        let (_, body) = send(&app, Method::GET, "/accounts/1", None).await;
        assert_eq!(body["data"]["name"], "Alice Smith");
        assert_eq!(body["data"]["balance"], 150.0);

        let (status, body) = send(&app, Method::DELETE, "/accounts/1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"], serde_json::json!({"id": 1, "rowsAffected": 1}));

        let (status, body) = send(&app, Method::GET, "/accounts/1", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["status"], 404);
        assert_eq!(body["error"], "account 1 not found");
    }

    #[tokio::test]
    async fn list_reflects_writes() {
        let app = app();
        send(&app, Method::POST, "/accounts/new", Some("name=Alice&balance=1")).await;

        let (status, body) = send(&app, Method::GET, "/accounts", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"].as_array().unwrap().len(), 1);

        send(&app, Method::POST, "/accounts/new", Some("name=Bob&balance=2")).await;
        let (_, body) = send(&app, Method::GET, "/accounts", None).await;
        let names: Vec<_> = body["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|a| a["name"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["Alice", "Bob"]);
    }

    #[tokio::test]
    async fn cache_outage_is_invisible_to_clients() {
        let app = app();
        app.cache.set_offline(true);
        app.index.set_offline(true);

        let (status, _) = send(&app, Method::POST, "/accounts/new", Some("name=Alice&balance=5")).await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, body) = send(&app, Method::GET, "/accounts/1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["name"], "Alice");

        let (status, _) = send(&app, Method::GET, "/accounts", None).await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = send(&app, Method::DELETE, "/accounts/1", None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn undecodable_cache_entry_is_served_from_the_database() {
        let app = app();
        send(&app, Method::POST, "/accounts/new", Some("name=Alice&balance=100")).await;
        app.cache.seed("accounts:1", "not json");

        let (status, body) = send(&app, Method::GET, "/accounts/1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["name"], "Alice");

        app.cache.seed("accounts:all", "[{");
        let (status, body) = send(&app, Method::GET, "/accounts", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"][0]["name"], "Alice");
    }

    #[tokio::test]
    async fn search_returns_hydrated_accounts() {
        let app = app();
        send(&app, Method::POST, "/accounts/new", Some("name=Alice+Stone&balance=1")).await;
        send(&app, Method::POST, "/accounts/new", Some("name=Bob&balance=2")).await;

        let (status, body) = send(&app, Method::GET, "/accounts/search?q=stone", None).await;
        assert_eq!(status, StatusCode::OK);
        let hits = body["data"].as_array().unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0]["name"], "Alice Stone");

        let (status, body) = send(&app, Method::GET, "/accounts/search", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], 400);

        app.index.set_offline(true);
        let (status, body) = send(&app, Method::GET, "/accounts/search?q=stone", None).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "internal server error");
    }

    #[tokio::test]
    async fn unsupported_methods_get_envelope() {
        let app = app();

        for (method, uri) in [
            (Method::GET, "/accounts/new"),
            (Method::DELETE, "/accounts"),
            (Method::PUT, "/accounts/1"),
            (Method::POST, "/accounts/search"),
        ] {
            let (status, body) = send(&app, method, uri, None).await;
            assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED, "{uri}");
            assert_eq!(body["status"], 405);
            assert_eq!(body["error"], "method not allowed");
        }
    }

    #[tokio::test]
    async fn bad_input() {
        let app = app();

        let (status, body) = send(&app, Method::GET, "/accounts/abc", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["status"], 404);

        let (status, body) = send(
            &app,
            Method::POST,
            "/accounts/new",
            Some("name=Alice&balance=lots"),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "invalid balance 'lots'");

        let (status, _) = send(&app, Method::POST, "/accounts/new", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(&app, Method::POST, "/accounts/9", Some("name=X&balance=1")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn missing_balance_defaults_to_zero() {
        let app = app();
        send(&app, Method::POST, "/accounts/new", Some("name=Alice")).await;

        let (_, body) = send(&app, Method::GET, "/accounts/1", None).await;
        assert_eq!(body["data"]["balance"], 0.0);
    }
}
