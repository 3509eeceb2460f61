use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// 促销码实体
/// 说明:
/// - code 统一大写，数据库唯一索引保证不重复
/// - discount_percent 每次写入都会被限制在 [0, 100]
/// - usage_limit 为 NULL 或 0 表示不限次数
/// - times_used 由订单系统维护，本服务只读
/// - 状态 (active/scheduled/expired/inactive) 不落库，读取时实时计算
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "promotions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub brand_id: Uuid,
    #[sea_orm(unique)]
    pub code: String,
    pub description: String,
    pub discount_percent: i32,
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
    pub is_active: bool,
    pub usage_limit: Option<i32>,
    pub times_used: i32,
    pub created_by: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Model {
    /// 有效的使用上限 (0 / NULL 视为不限)
    pub fn effective_usage_limit(&self) -> Option<i32> {
        self.usage_limit.filter(|limit| *limit > 0)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::brands::Entity",
        from = "Column::BrandId",
        to = "super::brands::Column::Id",
        on_update = "NoAction",
        on_delete = "Restrict"
    )]
    Brand,
}

impl Related<super::brands::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Brand.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
