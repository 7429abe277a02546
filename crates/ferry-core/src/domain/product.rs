//! Product - 下流 API に転送するドメインレコード
//!
//! リレーは Product を保存しません。メッセージ本文からデコードし、
//! 検証して、下流へ渡すだけです。`id` は下流が採番するため、
//! 転送が成功するまでは `None` のままです。

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 下流に転送されるレコード
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(serialize_with = "rust_decimal::serde::float::serialize")]
    pub price: Decimal,
    pub quantity: u32,
}

impl Product {
    pub fn new(name: impl Into<String>, price: Decimal, quantity: u32) -> Self {
        Self {
            id: None,
            name: name.into(),
            description: None,
            price,
            quantity,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// メッセージ本文の素の形
///
/// 必須項目も Option で受けておき、欠落は JSON 構文エラーではなく
/// 検証エラー（ValidationError::MissingField）として扱います。
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductPayload {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub quantity: Option<i64>,
}

impl ProductPayload {
    /// JSON テキストをデコード
    pub fn decode(body: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(body)
    }
}

/// Product の不変条件違反
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("required field `{0}` is missing")]
    MissingField(&'static str),

    #[error("name must not be blank")]
    BlankName,

    #[error("price must be greater than 0 (got {0})")]
    NonPositivePrice(Decimal),

    #[error("quantity must be non-negative (got {0})")]
    NegativeQuantity(i64),

    #[error("quantity {0} is out of range")]
    QuantityOutOfRange(i64),
}

impl TryFrom<ProductPayload> for Product {
    type Error = ValidationError;

    fn try_from(payload: ProductPayload) -> Result<Self, Self::Error> {
        let name = payload.name.ok_or(ValidationError::MissingField("name"))?;
        if name.trim().is_empty() {
            return Err(ValidationError::BlankName);
        }

        let price = payload.price.ok_or(ValidationError::MissingField("price"))?;
        if price <= Decimal::ZERO {
            return Err(ValidationError::NonPositivePrice(price));
        }

        let quantity = payload
            .quantity
            .ok_or(ValidationError::MissingField("quantity"))?;
        if quantity < 0 {
            return Err(ValidationError::NegativeQuantity(quantity));
        }
        let quantity =
            u32::try_from(quantity).map_err(|_| ValidationError::QuantityOutOfRange(quantity))?;

        Ok(Self {
            id: payload.id,
            name,
            description: payload.description,
            price,
            quantity,
        })
    }
}
