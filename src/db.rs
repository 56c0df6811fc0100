use std::str::FromStr;

use anyhow::Context;
use derive_builder::Builder;
use sqlx::{
    query::Query,
    sqlite::{Sqlite, SqliteArguments, SqliteConnectOptions, SqlitePool},
};

use crate::{
    data::{record_from_row, DishDetail, DishList, Record, RestaurantDetail, RestaurantList},
    StorageError,
};

/// A value bound to a `?` placeholder.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Param {
    Int(i64),
    Text(String),
    #[default]
    Null,
}

impl Param {
    /// Decode a path id: numeric ids bind as integers, anything else is forwarded as text.
    pub fn id(raw: &str) -> Self {
        match raw.parse() {
            Ok(id) => Self::Int(id),
            Err(_) => Self::Text(raw.to_string()),
        }
    }

    /// Decode a boolean-like flag against 0/1 columns.
    ///
    /// `true`/`1` bind as `1`, `false`/`0` bind as `0`, other values are
    /// forwarded verbatim as text.
    pub fn flag(raw: &str) -> Self {
        if raw == "1" || raw.eq_ignore_ascii_case("true") {
            Self::Int(1)
        } else if raw == "0" || raw.eq_ignore_ascii_case("false") {
            Self::Int(0)
        } else {
            Self::Text(raw.to_string())
        }
    }
}

fn bind_all<'q>(
    mut query: Query<'q, Sqlite, SqliteArguments<'q>>,
    params: &'q [Param],
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    for param in params {
        query = match param {
            Param::Int(value) => query.bind(*value),
            Param::Text(value) => query.bind(value.as_str()),
            Param::Null => query.bind(None::<i64>),
        };
    }
    query
}

/// Shared handle to the restaurant store. Cloning is cheap.
#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    /// Open an existing store read-only. A missing file is an error, never created.
    pub async fn open(url: &str) -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .with_context(|| format!("invalid database url {url}"))?
            .read_only(true);
        let pool = SqlitePool::connect_with(options)
            .await
            .with_context(|| format!("fail to open database {url}"))?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn fetch_optional(
        &self,
        sql: &str,
        params: &[Param],
    ) -> Result<Option<Record>, StorageError> {
        let row = bind_all(sqlx::query(sql), params)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(record_from_row).transpose()?)
    }

    pub async fn fetch_all(&self, sql: &str, params: &[Param]) -> Result<Vec<Record>, StorageError> {
        let rows = bind_all(sqlx::query(sql), params)
            .fetch_all(&self.pool)
            .await?;
        let records = rows
            .iter()
            .map(record_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }
}

pub async fn all_restaurants(store: &Store) -> Result<RestaurantList, StorageError> {
    let restaurants = store.fetch_all("SELECT * FROM restaurants", &[]).await?;
    Ok(RestaurantList { restaurants })
}

pub async fn restaurant_by_id(store: &Store, id: Param) -> Result<RestaurantDetail, StorageError> {
    let restaurant = store
        .fetch_optional("SELECT * FROM restaurants WHERE id = ?", &[id])
        .await?;
    Ok(RestaurantDetail { restaurant })
}

pub async fn restaurants_by_cuisine(
    store: &Store,
    cuisine: &str,
) -> Result<RestaurantList, StorageError> {
    let restaurants = store
        .fetch_all(
            "SELECT * FROM restaurants WHERE cuisine = ?",
            &[Param::Text(cuisine.to_string())],
        )
        .await?;
    Ok(RestaurantList { restaurants })
}

/// Conjunctive flag filter. Unset flags stay `NULL` and match nothing.
#[derive(Debug, Clone, Builder)]
pub struct RestaurantFilter {
    #[builder(default)]
    is_veg: Param,
    #[builder(default)]
    has_outdoor_seating: Param,
    #[builder(default)]
    is_luxury: Param,
}

pub async fn restaurants_by_filter(
    store: &Store,
    filter: RestaurantFilter,
) -> Result<RestaurantList, StorageError> {
    let RestaurantFilter {
        is_veg,
        has_outdoor_seating,
        is_luxury,
    } = filter;

    let restaurants = store
        .fetch_all(
            r#"
SELECT * FROM restaurants
WHERE
    isVeg = ? AND hasOutdoorSeating = ? AND isLuxury = ?"#,
            &[is_veg, has_outdoor_seating, is_luxury],
        )
        .await?;
    Ok(RestaurantList { restaurants })
}

pub async fn restaurants_sorted_by_rating(store: &Store) -> Result<RestaurantList, StorageError> {
    let restaurants = store
        .fetch_all("SELECT * FROM restaurants ORDER BY rating DESC", &[])
        .await?;
    Ok(RestaurantList { restaurants })
}

pub async fn all_dishes(store: &Store) -> Result<DishList, StorageError> {
    let dishes = store.fetch_all("SELECT * FROM dishes", &[]).await?;
    Ok(DishList { dishes })
}

pub async fn dish_by_id(store: &Store, id: Param) -> Result<DishDetail, StorageError> {
    let dish = store
        .fetch_optional("SELECT * FROM dishes WHERE id = ?", &[id])
        .await?;
    Ok(DishDetail { dish })
}

pub async fn dishes_by_filter(store: &Store, is_veg: Param) -> Result<DishList, StorageError> {
    let dishes = store
        .fetch_all("SELECT * FROM dishes WHERE isVeg = ?", &[is_veg])
        .await?;
    Ok(DishList { dishes })
}

pub async fn dishes_sorted_by_price(store: &Store) -> Result<DishList, StorageError> {
    let dishes = store
        .fetch_all("SELECT * FROM dishes ORDER BY price", &[])
        .await?;
    Ok(DishList { dishes })
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    const SEED: &str = include_str!("../fixtures/foodie.sql");

    // in-memory databases are per connection, so the pool holds exactly one
    async fn seeded_store() -> Store {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        sqlx::query(SEED).execute(&pool).await.unwrap();
        Store::from_pool(pool)
    }

    fn ids(records: &[Record]) -> Vec<i64> {
        records.iter().map(|r| r["id"].as_i64().unwrap()).collect()
    }

    #[test]
    fn flag_decoding() {
        assert_eq!(Param::flag("true"), Param::Int(1));
        assert_eq!(Param::flag("TRUE"), Param::Int(1));
        assert_eq!(Param::flag("1"), Param::Int(1));
        assert_eq!(Param::flag("false"), Param::Int(0));
        assert_eq!(Param::flag("0"), Param::Int(0));
        assert_eq!(Param::flag("no"), Param::Text("no".to_string()));
    }

    #[test]
    fn id_decoding() {
        assert_eq!(Param::id("42"), Param::Int(42));
        assert_eq!(Param::id("abc"), Param::Text("abc".to_string()));
    }

    #[tokio::test]
    async fn lists_every_restaurant_column() {
        let store = seeded_store().await;
        let list = all_restaurants(&store).await.unwrap();
        assert_eq!(ids(&list.restaurants), vec![1, 2, 3, 4, 5]);

        let first = &list.restaurants[0];
        assert_eq!(first["name"], "Spice Kitchen");
        assert_eq!(first["priceForTwo"], 1500);
        assert_eq!(first["rating"], 4.5);
    }

    #[tokio::test]
    async fn looks_up_restaurant_by_id() {
        let store = seeded_store().await;
        let found = restaurant_by_id(&store, Param::id("2")).await.unwrap();
        assert_eq!(found.restaurant.unwrap()["id"], 2);

        let missing = restaurant_by_id(&store, Param::id("99")).await.unwrap();
        assert!(missing.restaurant.is_none());

        let garbage = restaurant_by_id(&store, Param::id("abc")).await.unwrap();
        assert!(garbage.restaurant.is_none());
    }

    #[tokio::test]
    async fn filters_restaurants_by_cuisine() {
        let store = seeded_store().await;
        let italian = restaurants_by_cuisine(&store, "Italian").await.unwrap();
        assert_eq!(ids(&italian.restaurants), vec![2, 4]);

        let mexican = restaurants_by_cuisine(&store, "Mexican").await.unwrap();
        assert!(mexican.restaurants.is_empty());
    }

    #[tokio::test]
    async fn restaurant_filter_is_a_conjunction() {
        let store = seeded_store().await;
        let filter = RestaurantFilterBuilder::default()
            .is_veg(Param::flag("true"))
            .has_outdoor_seating(Param::flag("true"))
            .is_luxury(Param::flag("true"))
            .build()
            .unwrap();
        let list = restaurants_by_filter(&store, filter).await.unwrap();
        assert_eq!(ids(&list.restaurants), vec![3, 5]);
        for r in &list.restaurants {
            assert_eq!(r["isVeg"], 1);
            assert_eq!(r["hasOutdoorSeating"], 1);
            assert_eq!(r["isLuxury"], 1);
        }
    }

    #[tokio::test]
    async fn missing_filter_flag_matches_nothing() {
        let store = seeded_store().await;
        let filter = RestaurantFilterBuilder::default()
            .is_veg(Param::Int(1))
            .has_outdoor_seating(Param::Int(1))
            .build()
            .unwrap();
        let list = restaurants_by_filter(&store, filter).await.unwrap();
        assert!(list.restaurants.is_empty());
    }

    #[tokio::test]
    async fn sorts_restaurants_by_rating_descending() {
        let store = seeded_store().await;
        let list = restaurants_sorted_by_rating(&store).await.unwrap();
        let ratings: Vec<f64> = list
            .restaurants
            .iter()
            .map(|r| r["rating"].as_f64().unwrap())
            .collect();
        assert_eq!(ratings.len(), 5);
        assert!(ratings.windows(2).all(|w| w[0] >= w[1]));
    }

    #[tokio::test]
    async fn dish_lookups() {
        let store = seeded_store().await;
        assert_eq!(all_dishes(&store).await.unwrap().dishes.len(), 5);

        let dish = dish_by_id(&store, Param::id("4")).await.unwrap();
        assert_eq!(dish.dish.unwrap()["name"], "Butter Chicken");
        assert!(dish_by_id(&store, Param::id("0")).await.unwrap().dish.is_none());
    }

    #[tokio::test]
    async fn filters_non_veg_dishes() {
        let store = seeded_store().await;
        let list = dishes_by_filter(&store, Param::flag("false")).await.unwrap();
        assert_eq!(ids(&list.dishes), vec![2, 4]);
        assert!(list.dishes.iter().all(|d| d["isVeg"] == 0));
    }

    #[tokio::test]
    async fn sorts_dishes_by_price_ascending() {
        let store = seeded_store().await;
        let list = dishes_sorted_by_price(&store).await.unwrap();
        let prices: Vec<f64> = list
            .dishes
            .iter()
            .map(|d| d["price"].as_f64().unwrap())
            .collect();
        assert_eq!(prices, vec![250.0, 300.0, 400.0, 450.0, 500.0]);
    }

    #[tokio::test]
    async fn engine_faults_surface_as_storage_errors() {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        let store = Store::from_pool(pool);
        let err = all_dishes(&store).await.unwrap_err();
        assert!(matches!(err, StorageError::Engine(_)));
        assert!(err.to_string().contains("no such table"));
    }
}
