use actix_cors::Cors;
use actix_web::{http::StatusCode, web, HttpResponse, ResponseError};
use foodie_finds::{
    data::Envelope,
    db::{self as db_api, Param, RestaurantFilterBuilder, Store},
    StorageError,
};

pub(super) struct ApiState {
    store: Store,
}

impl ApiState {
    pub(super) fn new(store: Store) -> Self {
        Self { store }
    }
}

#[derive(serde::Serialize)]
struct NotFoundJsonResp {
    message: String,
}

#[derive(serde::Serialize)]
struct ErrJsonResp {
    error: String,
}

#[derive(Debug, thiserror::Error)]
pub(super) enum ApiError {
    #[error("{0}")]
    NotFound(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            Self::NotFound(message) => HttpResponse::NotFound().json(NotFoundJsonResp {
                message: message.clone(),
            }),
            Self::Storage(err) => {
                tracing::error!("fail to query database: {err}");
                HttpResponse::InternalServerError().json(ErrJsonResp {
                    error: err.to_string(),
                })
            }
        }
    }
}

type ApiResult = Result<HttpResponse, ApiError>;

/// Turn a query result into 200 with the envelope, or 404 with `not_found` when it is empty.
fn respond<E: Envelope>(
    result: Result<E, StorageError>,
    not_found: impl FnOnce() -> String,
) -> ApiResult {
    let envelope = result?;
    if envelope.is_empty() {
        return Err(ApiError::NotFound(not_found()));
    }
    Ok(HttpResponse::Ok().json(envelope))
}

pub(super) fn cors() -> Cors {
    Cors::default()
        .allow_any_origin()
        .allow_any_method()
        .allow_any_header()
}

pub(super) fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(home)
        .service(restaurants)
        .service(restaurant_details)
        .service(restaurants_by_cuisine)
        .service(restaurants_by_filter)
        .service(restaurants_by_rating)
        .service(dishes)
        .service(dish_details)
        .service(dishes_by_filter)
        .service(dishes_by_price);
}

#[actix_web::get("/")]
async fn home() -> &'static str {
    "Welcome to FoodieFinds..."
}

#[actix_web::get("/restaurants")]
async fn restaurants(data: web::Data<ApiState>) -> ApiResult {
    respond(db_api::all_restaurants(&data.store).await, || {
        "No restaurants found.".to_string()
    })
}

#[actix_web::get("/restaurants/details/{id}")]
async fn restaurant_details(data: web::Data<ApiState>, path: web::Path<String>) -> ApiResult {
    let id = path.into_inner();
    respond(
        db_api::restaurant_by_id(&data.store, Param::id(&id)).await,
        || format!("No restaurant found for id : {id}"),
    )
}

#[actix_web::get("/restaurants/cuisine/{cuisine}")]
async fn restaurants_by_cuisine(data: web::Data<ApiState>, path: web::Path<String>) -> ApiResult {
    let cuisine = path.into_inner();
    respond(
        db_api::restaurants_by_cuisine(&data.store, &cuisine).await,
        || format!("No restaurants found for cuisine : {cuisine}"),
    )
}

/// Raw query pairs. A repeated key keeps its first value instead of rejecting the request.
type QueryPairs = web::Query<Vec<(String, String)>>;

fn flag(query: &QueryPairs, key: &str) -> Param {
    query
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| Param::flag(v))
        .unwrap_or_default()
}

#[actix_web::get("/restaurants/filter")]
async fn restaurants_by_filter(data: web::Data<ApiState>, query: QueryPairs) -> ApiResult {
    let filter = RestaurantFilterBuilder::default()
        .is_veg(flag(&query, "isVeg"))
        .has_outdoor_seating(flag(&query, "hasOutdoorSeating"))
        .is_luxury(flag(&query, "isLuxury"))
        .build()
        .unwrap();
    respond(db_api::restaurants_by_filter(&data.store, filter).await, || {
        "No restaurants found.".to_string()
    })
}

#[actix_web::get("/restaurants/sort-by-rating")]
async fn restaurants_by_rating(data: web::Data<ApiState>) -> ApiResult {
    respond(
        db_api::restaurants_sorted_by_rating(&data.store).await,
        || "No restaurants found.".to_string(),
    )
}

#[actix_web::get("/dishes")]
async fn dishes(data: web::Data<ApiState>) -> ApiResult {
    respond(db_api::all_dishes(&data.store).await, || {
        "No dishes found.".to_string()
    })
}

#[actix_web::get("/dishes/details/{id}")]
async fn dish_details(data: web::Data<ApiState>, path: web::Path<String>) -> ApiResult {
    let id = path.into_inner();
    respond(db_api::dish_by_id(&data.store, Param::id(&id)).await, || {
        format!("No dish found for id : {id}")
    })
}

#[actix_web::get("/dishes/filter")]
async fn dishes_by_filter(data: web::Data<ApiState>, query: QueryPairs) -> ApiResult {
    respond(
        db_api::dishes_by_filter(&data.store, flag(&query, "isVeg")).await,
        || "No dishes found for veg".to_string(),
    )
}

#[actix_web::get("/dishes/sort-by-price")]
async fn dishes_by_price(data: web::Data<ApiState>) -> ApiResult {
    respond(db_api::dishes_sorted_by_price(&data.store).await, || {
        "No dishes found.".to_string()
    })
}
