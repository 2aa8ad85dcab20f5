use axum::{
    extract::DefaultBodyLimit,
    http::Method,
    routing::{get, post},
    Router,
};
use configuration::Settings;
use core_types::{Group, User};
use database::{DatabaseName, DbRepository, SchemaOptions};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::watch;
use tower_http::{
    cors::{AllowHeaders, AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

pub mod error;
pub mod handlers;

/// Startup progress, as reported by `GET /api/health`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Readiness {
    /// Waiting for the database or creating the schema.
    Starting,
    /// Bootstrap finished; requests can be served.
    Ready,
    /// The schema could not be created. Needs operator attention.
    Failed,
}

/// The shared application state that all handlers can access.
#[derive(Clone)]
pub struct AppState {
    pub db_repo: DbRepository,
    pub readiness: watch::Receiver<Readiness>,
}

/// Builds the application router with CORS and request tracing applied.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::any())
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(AllowHeaders::any());

    Router::new()
        .route("/api/health", get(handlers::health))
        .route(
            "/api/usuarios",
            get(handlers::list::<User>).post(handlers::create::<User>),
        )
        .route(
            "/api/usuarios/:id",
            get(handlers::find::<User>)
                .put(handlers::rename::<User>)
                .delete(handlers::delete::<User>),
        )
        .route(
            "/api/grupos",
            get(handlers::list::<Group>).post(handlers::create::<Group>),
        )
        .route(
            "/api/grupos/:id",
            get(handlers::groups::get_group)
                .put(handlers::rename::<Group>)
                .delete(handlers::delete::<Group>),
        )
        // Segment names must match the sibling route above: `:id` is the group.
        .route(
            "/api/grupos/:id/:user_id",
            post(handlers::memberships::add).delete(handlers::memberships::remove),
        )
        .with_state(state)
        .layer(cors)
        // This middleware will automatically log information about every incoming request.
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(64 * 1024))
}

/// Waits for the database, creates the schema and publishes the outcome.
async fn run_bootstrap(
    repo: DbRepository,
    options: SchemaOptions,
    retry_interval: std::time::Duration,
    readiness: watch::Sender<Readiness>,
) {
    match database::bootstrap(repo.pool(), repo.database(), options, retry_interval).await {
        Ok(()) => {
            tracing::info!("Bootstrap complete, service is ready.");
            readiness.send_replace(Readiness::Ready);
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to initialize the database.");
            readiness.send_replace(Readiness::Failed);
        }
    }
}

/// The main function to configure and run the web server.
///
/// The listener binds right away; the database wait and schema bootstrap run in
/// the background and `GET /api/health` reports when they are done.
pub async fn run_server(settings: &Settings) -> anyhow::Result<()> {
    // Tracing is initialized by the binary before this is called.
    let database = DatabaseName::new(settings.database.name.clone())?;
    let pool = database::connect(&settings.database);
    let db_repo = DbRepository::new(pool, database);

    let (readiness_tx, readiness_rx) = watch::channel(Readiness::Starting);
    tokio::spawn(run_bootstrap(
        db_repo.clone(),
        SchemaOptions {
            unique_memberships: settings.membership.unique_pairs,
        },
        settings.database.retry_interval,
        readiness_tx,
    ));

    let app_state = Arc::new(AppState {
        db_repo,
        readiness: readiness_rx,
    });
    let app = router(app_state);

    let listener =
        tokio::net::TcpListener::bind((settings.server.host.as_str(), settings.server.port)).await?;
    let addr: SocketAddr = listener.local_addr()?;
    tracing::info!("Web server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
    };
    use configuration::DatabaseSettings;
    use serde_json::{json, Value};
    use std::time::Duration;
    use tower::ServiceExt;

    /// State whose database is unreachable: anything that gets as far as the
    /// store fails fast.
    fn unreachable_state() -> (Arc<AppState>, watch::Sender<Readiness>) {
        let pool = database::connect(&DatabaseSettings {
            host: "127.0.0.1".to_string(),
            port: 1,
            acquire_timeout: Duration::from_millis(100),
            ..DatabaseSettings::default()
        });
        let db_repo = DbRepository::new(pool, DatabaseName::new("users_groups").unwrap());
        let (tx, rx) = watch::channel(Readiness::Starting);
        let state = Arc::new(AppState {
            db_repo,
            readiness: rx,
        });
        (state, tx)
    }

    /// A router over [`unreachable_state`]; store-backed routes answer 500.
    fn create_test_app() -> (Router, watch::Sender<Readiness>) {
        let (state, tx) = unreachable_state();
        (router(state), tx)
    }

    fn assert_send<T: Send>(_: T) {}

    async fn send(app: Router, method: &str, uri: &str, body: Option<&str>) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                request = request.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        let response = app.oneshot(request.body(body).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    #[tokio::test]
    async fn health_follows_the_bootstrap() {
        let (app, readiness) = create_test_app();

        let (status, body) = send(app.clone(), "GET", "/api/health", None).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body, json!({ "status": "starting" }));

        readiness.send_replace(Readiness::Ready);
        let (status, body) = send(app.clone(), "GET", "/api/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "status": "ready" }));

        readiness.send_replace(Readiness::Failed);
        let (status, _) = send(app, "GET", "/api/health", None).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn membership_routes_reject_non_numeric_ids() {
        let (app, _readiness) = create_test_app();

        let (status, body) = send(app.clone(), "POST", "/api/grupos/abc/1", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Los ids de grupo/usuario deben ser numéricos");

        let (status, _) = send(app, "DELETE", "/api/grupos/1/xyz", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn membership_routes_answer_json_for_undecodable_segments() {
        let (app, _readiness) = create_test_app();

        for (method, uri) in [("POST", "/api/grupos/%FF/1"), ("DELETE", "/api/grupos/1/%FF")] {
            let response = app
                .clone()
                .oneshot(Request::builder().method(method).uri(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{method} {uri}");
            assert_eq!(
                response.headers()[header::CONTENT_TYPE],
                "application/json",
                "{method} {uri}"
            );
            let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
            let body: Value = serde_json::from_slice(&bytes).unwrap();
            assert!(body["error"].is_string());
        }
    }

    #[tokio::test]
    async fn entity_routes_reject_non_numeric_ids() {
        let (app, _readiness) = create_test_app();

        for (method, uri) in [
            ("GET", "/api/usuarios/1%20OR%201=1"),
            ("DELETE", "/api/usuarios/abc"),
            ("GET", "/api/grupos/abc"),
            ("DELETE", "/api/grupos/abc"),
        ] {
            let (status, body) = send(app.clone(), method, uri, None).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{method} {uri}");
            assert!(body["error"].is_string());
        }

        let (status, _) = send(app, "PUT", "/api/grupos/abc", Some(r#"{"name":"Devs"}"#)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn invalid_names_are_rejected_before_the_store() {
        let (app, _readiness) = create_test_app();

        let too_long = format!(r#"{{"name":"{}"}}"#, "a".repeat(31));
        for body in [r#"{}"#, r#"{"name":""}"#, r#"{"name":"   "}"#, too_long.as_str(), "not json"] {
            let (status, response) = send(app.clone(), "POST", "/api/usuarios", Some(body)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "body {body}");
            assert!(response["error"].is_string());
        }

        let (status, _) = send(app, "PUT", "/api/usuarios/1", Some(r#"{"name":null}"#)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn store_failures_become_opaque_500s() {
        let (app, _readiness) = create_test_app();

        let (status, body) = send(app.clone(), "GET", "/api/usuarios", None).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body,
            json!({ "error": "Ha habido un error al devolver los datos de los usuarios" })
        );

        let (status, body) = send(app.clone(), "GET", "/api/grupos/1", None).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Ha habido un error al devolver los datos del grupo");

        let (status, body) = send(app, "POST", "/api/grupos/1/2", None).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Ha habido un error al añadir el usuario al grupo");
    }

    #[tokio::test]
    async fn cors_allows_any_origin() {
        let (app, _readiness) = create_test_app();

        let response = app
            .oneshot(
                Request::builder()
                    .method("OPTIONS")
                    .uri("/api/usuarios")
                    .header(header::ORIGIN, "http://example.com")
                    .header(header::ACCESS_CONTROL_REQUEST_METHOD, "DELETE")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "*"
        );
        let methods = response.headers()[header::ACCESS_CONTROL_ALLOW_METHODS]
            .to_str()
            .unwrap();
        assert!(methods.contains("DELETE"));
    }

    #[tokio::test]
    async fn run_server_refuses_a_database_name_that_is_not_an_identifier() {
        let mut settings = Settings::default();
        settings.database.name = "users`; DROP DATABASE x; --".to_string();

        let error = run_server(&settings).await.unwrap_err();
        assert!(matches!(
            error.downcast_ref::<database::DbError>(),
            Some(database::DbError::InvalidDatabaseName(_))
        ));
    }

    #[tokio::test]
    async fn bootstrap_and_handler_futures_are_send() {
        let (state, readiness) = unreachable_state();
        let repo = state.db_repo.clone();

        // Never polled: these only have to type-check as `Send`.
        assert_send(run_bootstrap(
            repo.clone(),
            SchemaOptions::default(),
            Duration::from_secs(2),
            readiness,
        ));
        assert_send(database::ensure_schema(
            repo.pool(),
            repo.database(),
            SchemaOptions::default(),
        ));
        assert_send(repo.get_group_with_members(1));
        assert_send(handlers::list::<User>(axum::extract::State(state.clone())));
        assert_send(handlers::groups::get_group(
            axum::extract::State(state),
            axum_extra::extract::WithRejection(
                axum::extract::Path(1),
                std::marker::PhantomData,
            ),
        ));
    }
}
