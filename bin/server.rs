// Sacramental Records - Web Server
// Read-only JSON API with Axum: typeahead lookups and table counts

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tower_http::cors::CorsLayer;
use tracing::{error, info};

use sen_records::config;
use sen_records::entities::{ledger, person};
use sen_records::{open_database, table_counts, Ledger, Person, Residence};

/// Maximum persons returned by the person typeahead
const PEOPLE_LIMIT: usize = 20;

/// Shared application state
#[derive(Clone)]
struct AppState {
    db: Arc<Mutex<Connection>>,
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

#[derive(Deserialize)]
struct TypeaheadQuery {
    #[serde(default)]
    q: String,
}

#[derive(Serialize)]
struct TableCount {
    table: &'static str,
    count: i64,
}

/// Ledger as shown in a typeahead list
#[derive(Serialize)]
struct LedgerResponse {
    id: i64,
    title: String,
    notary: String,
    year: i32,
}

impl From<Ledger> for LedgerResponse {
    fn from(ledger: Ledger) -> Self {
        Self {
            id: ledger.id,
            title: ledger.title(),
            notary: ledger.notary_name,
            year: ledger.year,
        }
    }
}

#[derive(Serialize)]
struct PersonResponse {
    id: i64,
    name: String,
    sex: String,
}

impl From<Person> for PersonResponse {
    fn from(person: Person) -> Self {
        Self {
            id: person.id,
            name: person.full_name(),
            sex: person.sex,
        }
    }
}

/// Run a query against the shared connection, mapping failures to a 500
fn with_db<T, F>(state: &AppState, what: &str, f: F) -> axum::response::Response
where
    T: Serialize,
    F: FnOnce(&Connection) -> anyhow::Result<T>,
{
    let conn = match state.db.lock() {
        Ok(conn) => conn,
        Err(_) => {
            error!(what, "database mutex poisoned");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::<T>::err("database unavailable")),
            )
                .into_response();
        }
    };

    match f(&conn) {
        Ok(data) => (StatusCode::OK, Json(ApiResponse::ok(data))).into_response(),
        Err(e) => {
            error!(what, error = %e, "query failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::<T>::err(e.to_string())),
            )
                .into_response()
        }
    }
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /api/stats - Row counts per table
async fn get_stats(State(state): State<AppState>) -> impl IntoResponse {
    with_db(&state, "stats", |conn| {
        let counts = table_counts(conn)?
            .into_iter()
            .map(|(table, count)| TableCount { table, count })
            .collect::<Vec<_>>();
        Ok(counts)
    })
}

/// GET /api/ledgers/typeahead?q= - Ledgers by notary name prefix
async fn ledger_typeahead(
    State(state): State<AppState>,
    Query(query): Query<TypeaheadQuery>,
) -> impl IntoResponse {
    with_db(&state, "ledger typeahead", |conn| {
        let ledgers = ledger::typeahead(conn, query.q.trim())?
            .into_iter()
            .map(LedgerResponse::from)
            .collect::<Vec<_>>();
        Ok(ledgers)
    })
}

/// GET /api/people/typeahead?q= - Persons by first or last name prefix
async fn people_typeahead(
    State(state): State<AppState>,
    Query(query): Query<TypeaheadQuery>,
) -> impl IntoResponse {
    with_db(&state, "people typeahead", |conn| {
        let people = person::typeahead(conn, query.q.trim(), PEOPLE_LIMIT)?
            .into_iter()
            .map(PersonResponse::from)
            .collect::<Vec<_>>();
        Ok(people)
    })
}

/// GET /api/people/:id/residences - Residences of one person
async fn person_residences(
    State(state): State<AppState>,
    Path(person_id): Path<i64>,
) -> impl IntoResponse {
    with_db(&state, "residences", |conn| -> anyhow::Result<Vec<Residence>> {
        Ok(ledger::residences_for_person(conn, person_id)?)
    })
}

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    config::init_logging();

    let db_path = config::database_path(None);
    let conn = open_database(&db_path)?;
    info!(database = %db_path.display(), "database opened");

    // Create shared state
    let state = AppState {
        db: Arc::new(Mutex::new(conn)),
    };

    // Build API routes
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/stats", get(get_stats))
        .route("/ledgers/typeahead", get(ledger_typeahead))
        .route("/people/typeahead", get(people_typeahead))
        .route("/people/:id/residences", get(person_residences))
        .with_state(state);

    let app = Router::new()
        .nest("/api", api_routes)
        .layer(CorsLayer::permissive());

    // Start server
    let addr = std::env::var("SEN_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, "server running");

    axum::serve(listener, app).await?;
    Ok(())
}
