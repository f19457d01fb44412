use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, ActiveValue::Set, ConnectionTrait};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Product catalog entry; `stock_quantity` doubles as the stock ledger.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, Validate, ToSchema)]
#[schema(as = Product)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    #[validate(length(
        min = 1,
        max = 255,
        message = "Product name must be between 1 and 255 characters"
    ))]
    pub name: String,

    #[validate(length(max = 2000, message = "Description cannot exceed 2000 characters"))]
    pub description: Option<String>,

    /// Unit of sale (e.g. "500ml", "1L", "250g")
    pub unit: String,

    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub price: Decimal,

    /// Discounted selling price; when set, order line items snapshot this
    #[sea_orm(column_type = "Decimal(Some((19, 4)))", nullable)]
    pub discount_price: Option<Decimal>,

    /// On-hand stock; never negative
    pub stock_quantity: i32,

    pub status: ProductStatus,

    pub image_url: Option<String>,

    pub category: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Product lifecycle status; `OutOfStock` is derived from the ledger while
/// `Inactive` is an explicit admin decision and is never auto-overridden.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
pub enum ProductStatus {
    #[sea_orm(string_value = "active")]
    Active,
    #[sea_orm(string_value = "inactive")]
    Inactive,
    #[sea_orm(string_value = "out_of_stock")]
    OutOfStock,
}

impl Model {
    /// Effective selling price: the discount price when present, else the
    /// list price. Frozen onto order line items at order-creation time.
    pub fn selling_price(&self) -> Decimal {
        self.discount_price.unwrap_or(self.price)
    }

    /// Whether `quantity` units can currently be ordered.
    pub fn can_fulfil(&self, quantity: i32) -> bool {
        self.status == ProductStatus::Active && self.stock_quantity >= quantity
    }

    /// Status the product should carry for a given stock level.
    pub fn derived_status(status: ProductStatus, stock_quantity: i32) -> ProductStatus {
        match status {
            ProductStatus::Inactive => ProductStatus::Inactive,
            _ if stock_quantity <= 0 => ProductStatus::OutOfStock,
            _ => ProductStatus::Active,
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::order_item::Entity")]
    OrderItems,
}

impl Related<super::order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderItems.def()
    }
}

#[async_trait::async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let mut active_model = self;

        if insert {
            if let ActiveValue::NotSet = active_model.stock_quantity {
                active_model.stock_quantity = Set(0);
            }
            active_model.created_at = Set(Utc::now());
        }
        active_model.updated_at = Set(Some(Utc::now()));

        let model: Model = active_model.clone().try_into().map_err(|_| {
            DbErr::Custom("Failed to convert ActiveModel to Model for validation".to_string())
        })?;

        if model.stock_quantity < 0 {
            return Err(DbErr::Custom("Stock quantity cannot be negative".into()));
        }
        if let Err(err) = model.validate() {
            return Err(DbErr::Custom(format!("Validation error: {}", err)));
        }

        // Keep the derived status in line with the ledger on direct saves
        let derived = Model::derived_status(model.status, model.stock_quantity);
        if derived != model.status {
            active_model.status = Set(derived);
        }

        Ok(active_model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn milk(stock: i32, status: ProductStatus) -> Model {
        Model {
            id: Uuid::new_v4(),
            name: "Full Cream Milk".to_string(),
            description: None,
            unit: "1L".to_string(),
            price: dec!(60),
            discount_price: None,
            stock_quantity: stock,
            status,
            image_url: None,
            category: Some("milk".to_string()),
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[test]
    fn selling_price_prefers_discount() {
        let mut product = milk(10, ProductStatus::Active);
        assert_eq!(product.selling_price(), dec!(60));
        product.discount_price = Some(dec!(55));
        assert_eq!(product.selling_price(), dec!(55));
    }

    #[test]
    fn fulfilment_requires_active_status_and_stock() {
        assert!(milk(5, ProductStatus::Active).can_fulfil(5));
        assert!(!milk(4, ProductStatus::Active).can_fulfil(5));
        assert!(!milk(5, ProductStatus::Inactive).can_fulfil(1));
        assert!(!milk(0, ProductStatus::OutOfStock).can_fulfil(1));
    }

    #[test]
    fn status_flips_with_stock_but_respects_inactive() {
        assert_eq!(
            Model::derived_status(ProductStatus::Active, 0),
            ProductStatus::OutOfStock
        );
        assert_eq!(
            Model::derived_status(ProductStatus::OutOfStock, 3),
            ProductStatus::Active
        );
        assert_eq!(
            Model::derived_status(ProductStatus::Inactive, 100),
            ProductStatus::Inactive
        );
    }
}
