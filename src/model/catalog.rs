//! Products, variations and categories

use super::{
    array, as_object, flag, optional_int, required_id, text, text_or, RecordError, RecordResult,
};
use serde_json::{Map, Value};

const DEFAULT_STOCK_STATUS: &str = "instock";
const DEFAULT_PRODUCT_TYPE: &str = "simple";

/// Physical dimensions, kept as the API's strings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dimensions {
    pub length: String,
    pub width: String,
    pub height: String,
}

impl Dimensions {
    fn from_parent(record: &Map<String, Value>) -> RecordResult<Self> {
        match record.get("dimensions") {
            None | Some(Value::Null) => Ok(Self::default()),
            Some(Value::Object(dims)) => Ok(Self {
                length: text(dims, "length")?,
                width: text(dims, "width")?,
                height: text(dims, "height")?,
            }),
            Some(_) => Err(RecordError::InvalidField {
                field: "dimensions".to_string(),
                expected: "object",
            }),
        }
    }
}

/// A category reference embedded in a product
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryRef {
    pub remote_id: i64,
    pub name: String,
}

/// A product as returned by `GET products`
#[derive(Debug, Clone, PartialEq)]
pub struct ProductRecord {
    pub remote_id: i64,
    pub name: String,
    pub slug: String,
    pub permalink: String,
    pub sku: String,
    pub price: String,
    pub regular_price: String,
    pub sale_price: String,
    pub description: String,
    pub short_description: String,
    pub weight: String,
    pub dimensions: Dimensions,
    pub shipping_class: String,
    pub stock_quantity: Option<i64>,
    pub stock_status: String,
    pub manage_stock: bool,
    pub featured: bool,
    pub product_type: String,
    pub categories: Vec<CategoryRef>,
    pub tags: Vec<String>,
    pub attributes: Value,
}

impl ProductRecord {
    pub fn from_remote_record(record: &Value) -> RecordResult<Self> {
        let record = as_object(record)?;

        let categories = array(record, "categories")?
            .iter()
            .map(|item| {
                let item = as_object(item)?;
                Ok(CategoryRef {
                    remote_id: required_id(item, "id").map_err(|e| nested("categories", e))?,
                    name: text(item, "name")?,
                })
            })
            .collect::<RecordResult<Vec<_>>>()?;

        let tags = array(record, "tags")?
            .iter()
            .map(|item| text(as_object(item)?, "name"))
            .collect::<RecordResult<Vec<_>>>()?;

        Ok(Self {
            remote_id: required_id(record, "id")?,
            name: text(record, "name")?,
            slug: text(record, "slug")?,
            permalink: text(record, "permalink")?,
            sku: text(record, "sku")?,
            price: text(record, "price")?,
            regular_price: text(record, "regular_price")?,
            sale_price: text(record, "sale_price")?,
            description: text(record, "description")?,
            short_description: text(record, "short_description")?,
            weight: text(record, "weight")?,
            dimensions: Dimensions::from_parent(record)?,
            shipping_class: text(record, "shipping_class")?,
            stock_quantity: optional_int(record, "stock_quantity")?,
            stock_status: text_or(record, "stock_status", DEFAULT_STOCK_STATUS)?,
            manage_stock: flag(record, "manage_stock", false)?,
            featured: flag(record, "featured", false)?,
            product_type: text_or(record, "type", DEFAULT_PRODUCT_TYPE)?,
            categories,
            tags,
            attributes: Value::Array(array(record, "attributes")?.to_vec()),
        })
    }

    /// Variable products own variations fetched from a sub-resource
    pub fn is_variable(&self) -> bool {
        self.product_type == "variable"
    }

    pub fn in_stock(&self) -> bool {
        self.stock_status == DEFAULT_STOCK_STATUS
    }
}

/// A product variation as returned by `GET products/{id}/variations`
#[derive(Debug, Clone, PartialEq)]
pub struct VariationRecord {
    pub remote_id: i64,
    pub sku: String,
    pub price: String,
    pub regular_price: String,
    pub sale_price: String,
    pub stock_quantity: Option<i64>,
    pub stock_status: String,
    pub weight: String,
    pub dimensions: Dimensions,
    pub attributes: Value,
}

impl VariationRecord {
    pub fn from_remote_record(record: &Value) -> RecordResult<Self> {
        let record = as_object(record)?;
        Ok(Self {
            remote_id: required_id(record, "id")?,
            sku: text(record, "sku")?,
            price: text(record, "price")?,
            regular_price: text(record, "regular_price")?,
            sale_price: text(record, "sale_price")?,
            stock_quantity: optional_int(record, "stock_quantity")?,
            stock_status: text_or(record, "stock_status", DEFAULT_STOCK_STATUS)?,
            weight: text(record, "weight")?,
            dimensions: Dimensions::from_parent(record)?,
            attributes: Value::Array(array(record, "attributes")?.to_vec()),
        })
    }

    /// The attribute set serialized as a JSON list
    pub fn attributes_json(&self) -> String {
        self.attributes.to_string()
    }
}

/// A product category
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryRecord {
    pub remote_id: i64,
    pub name: String,
    pub slug: String,
    pub description: String,
    /// Remote id of the parent; the API's `0` means top level
    pub parent: Option<i64>,
}

impl CategoryRecord {
    pub fn from_remote_record(record: &Value) -> RecordResult<Self> {
        let record = as_object(record)?;
        Ok(Self {
            remote_id: required_id(record, "id")?,
            name: text(record, "name")?,
            slug: text(record, "slug")?,
            description: text(record, "description")?,
            parent: optional_int(record, "parent")?.filter(|&p| p != 0),
        })
    }
}

fn nested(parent: &str, err: RecordError) -> RecordError {
    match err {
        RecordError::MissingField(field) => {
            RecordError::MissingField(format!("{}[].{}", parent, field))
        }
        RecordError::InvalidField { field, expected } => RecordError::InvalidField {
            field: format!("{}[].{}", parent, field),
            expected,
        },
        other => other,
    }
}
