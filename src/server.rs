//! JSON/CSV API consumed by the dashboard front-end.

use actix_web::{
    HttpResponse, ResponseError, get,
    http::{StatusCode, header::ContentDisposition},
    post, web,
};
use serde::Deserialize;
use serde_json::json;

use crate::{
    cache::HistoryCache,
    error::CursError,
    exchange_rate::RateQuote,
    table::{self, CSV_FILE_NAME, DEFAULT_SELECTION, MAIN_CURRENCIES, PERIODS},
};

pub struct AppState {
    pub cache: HistoryCache,
}

#[derive(Debug, Default, Deserialize)]
pub struct RateQuery {
    days: Option<i64>,
    currencies: Option<String>,
}

impl RateQuery {
    fn days(&self) -> i64 {
        self.days.unwrap_or(PERIODS[0].days)
    }

    fn selection(&self) -> Vec<String> {
        table::parse_selection(self.currencies.as_deref())
    }
}

impl ResponseError for CursError {
    fn status_code(&self) -> StatusCode {
        match self {
            CursError::InvalidWindow(..) | CursError::NoSelection => StatusCode::BAD_REQUEST,
            CursError::NoData => StatusCode::SERVICE_UNAVAILABLE,
            CursError::Csv(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({ "error": self.to_string() }))
    }
}

async fn selected_rows(
    state: &AppState,
    query: &RateQuery,
) -> Result<(Vec<RateQuote>, Vec<String>), CursError> {
    let history = state.cache.history(query.days()).await?;
    if history.is_empty() {
        return Err(CursError::NoData);
    }

    let codes = query.selection();
    if codes.is_empty() {
        return Err(CursError::NoSelection);
    }

    Ok((table::filter_codes(&history, &codes), codes))
}

#[get("/api/options")]
async fn options() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "currencies": MAIN_CURRENCIES,
        "default_selection": DEFAULT_SELECTION,
        "periods": PERIODS,
    }))
}

#[get("/api/rates")]
async fn rates(
    state: web::Data<AppState>,
    query: web::Query<RateQuery>,
) -> Result<HttpResponse, CursError> {
    let (rows, _) = selected_rows(&state, &query).await?;
    Ok(HttpResponse::Ok().json(rows))
}

#[get("/api/latest")]
async fn latest(
    state: web::Data<AppState>,
    query: web::Query<RateQuery>,
) -> Result<HttpResponse, CursError> {
    let (rows, codes) = selected_rows(&state, &query).await?;
    Ok(HttpResponse::Ok().json(table::latest_rates(&rows, &codes)))
}

#[get("/api/series")]
async fn series(
    state: web::Data<AppState>,
    query: web::Query<RateQuery>,
) -> Result<HttpResponse, CursError> {
    let (rows, codes) = selected_rows(&state, &query).await?;
    Ok(HttpResponse::Ok().json(table::series(&rows, &codes)))
}

#[get("/api/table")]
async fn pivot_table(
    state: web::Data<AppState>,
    query: web::Query<RateQuery>,
) -> Result<HttpResponse, CursError> {
    let (rows, _) = selected_rows(&state, &query).await?;
    Ok(HttpResponse::Ok().json(table::pivot(&rows)))
}

#[get("/api/table.csv")]
async fn pivot_csv(
    state: web::Data<AppState>,
    query: web::Query<RateQuery>,
) -> Result<HttpResponse, CursError> {
    let (rows, _) = selected_rows(&state, &query).await?;
    let csv = table::pivot(&rows).to_csv()?;

    Ok(HttpResponse::Ok()
        .content_type("text/csv; charset=utf-8")
        .insert_header(ContentDisposition::attachment(CSV_FILE_NAME))
        .body(csv))
}

#[post("/api/reload")]
async fn reload(state: web::Data<AppState>) -> HttpResponse {
    state.cache.clear();
    HttpResponse::NoContent().finish()
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(options)
        .service(rates)
        .service(latest)
        .service(series)
        .service(pivot_table)
        .service(pivot_csv)
        .service(reload);
}
