use serde::Serialize;
use serde_json::{Map, Number, Value};
use sqlx::{sqlite::SqliteRow, Column, Row, TypeInfo, ValueRef};

/// One row as returned by `SELECT *`, keyed by column name.
pub type Record = Map<String, Value>;

/// A response body whose emptiness decides between 200 and 404.
pub trait Envelope: Serialize {
    fn is_empty(&self) -> bool;
}

#[derive(Debug, Serialize)]
pub struct RestaurantList {
    pub restaurants: Vec<Record>,
}

#[derive(Debug, Serialize)]
pub struct RestaurantDetail {
    pub restaurant: Option<Record>,
}

#[derive(Debug, Serialize)]
pub struct DishList {
    pub dishes: Vec<Record>,
}

#[derive(Debug, Serialize)]
pub struct DishDetail {
    pub dish: Option<Record>,
}

impl Envelope for RestaurantList {
    fn is_empty(&self) -> bool {
        self.restaurants.is_empty()
    }
}

impl Envelope for RestaurantDetail {
    fn is_empty(&self) -> bool {
        self.restaurant.is_none()
    }
}

impl Envelope for DishList {
    fn is_empty(&self) -> bool {
        self.dishes.is_empty()
    }
}

impl Envelope for DishDetail {
    fn is_empty(&self) -> bool {
        self.dish.is_none()
    }
}

/// Convert a row into JSON, following the storage class of each value.
pub(crate) fn record_from_row(row: &SqliteRow) -> Result<Record, sqlx::Error> {
    let mut record = Record::new();
    for column in row.columns() {
        let idx = column.ordinal();
        let raw = row.try_get_raw(idx)?;
        let value = if raw.is_null() {
            Value::Null
        } else {
            let class = raw.type_info().name().to_string();
            match class.as_str() {
                "INTEGER" | "BOOLEAN" => Value::from(row.try_get_unchecked::<i64, _>(idx)?),
                "REAL" => Number::from_f64(row.try_get_unchecked::<f64, _>(idx)?)
                    .map(Value::Number)
                    .unwrap_or(Value::Null),
                "BLOB" => Value::from(row.try_get_unchecked::<Vec<u8>, _>(idx)?),
                _ => Value::from(row.try_get_unchecked::<String, _>(idx)?),
            }
        };
        record.insert(column.name().to_string(), value);
    }
    Ok(record)
}
