use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entities::promotion_entity as promotions;
use crate::utils::{Extension, PromotionMetrics, PromotionStatus, UrgencyLevel, evaluate};
use crate::error::AppResult;

/// 促销码响应 (存储字段 + 实时计算字段)
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PromotionResponse {
    pub id: Uuid,
    pub brand_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brand_name: Option<String>,
    pub code: String,
    pub description: String,
    pub discount_percent: i32,
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
    pub is_active: bool,
    /// null / 0 表示不限次数
    pub usage_limit: Option<i32>,
    pub times_used: i32,
    pub created_by: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub metrics: PromotionMetrics,
}

impl PromotionResponse {
    pub fn from_model(m: promotions::Model, now: DateTime<Utc>, expiring_soon_days: i64) -> Self {
        let metrics = evaluate(&m, now, expiring_soon_days);
        PromotionResponse {
            id: m.id,
            brand_id: m.brand_id,
            brand_name: None,
            code: m.code,
            description: m.description,
            discount_percent: m.discount_percent,
            valid_from: m.valid_from,
            valid_until: m.valid_until,
            is_active: m.is_active,
            usage_limit: m.usage_limit,
            times_used: m.times_used,
            created_by: m.created_by,
            created_at: m.created_at,
            updated_at: m.updated_at,
            metrics,
        }
    }

    pub fn with_brand_name(mut self, brand_name: Option<String>) -> Self {
        self.brand_name = brand_name;
        self
    }
}

/// 促销码列表查询参数
#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
pub struct PromotionListQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub brand_id: Option<Uuid>,
    /// scheduled / active / expired / inactive
    pub status: Option<String>,
    /// 按 code / description 模糊搜索
    pub search: Option<String>,
}

/// 批量操作与列表共用的筛选条件
#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
pub struct PromotionFilter {
    pub brand_id: Option<Uuid>,
    pub status: Option<String>,
    pub search: Option<String>,
}

impl From<&PromotionListQuery> for PromotionFilter {
    fn from(q: &PromotionListQuery) -> Self {
        PromotionFilter {
            brand_id: q.brand_id,
            status: q.status.clone(),
            search: q.search.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct CreatePromotionRequest {
    pub brand_id: Uuid,
    /// 与 auto_generate_code 二选一
    pub code: Option<String>,
    #[serde(default)]
    pub auto_generate_code: bool,
    /// 自动生成时的前缀
    pub code_prefix: Option<String>,
    #[serde(default)]
    pub description: String,
    /// 任意整数，写入时限制到 [0, 100]
    pub discount_percent: i64,
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
    pub is_active: Option<bool>,
    pub usage_limit: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
pub struct UpdatePromotionRequest {
    pub brand_id: Option<Uuid>,
    pub code: Option<String>,
    pub description: Option<String>,
    pub discount_percent: Option<i64>,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
    pub is_active: Option<bool>,
    /// 0 表示不限次数
    pub usage_limit: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
pub struct TogglePromotionRequest {
    /// 不传则取反
    pub is_active: Option<bool>,
}

/// 延期请求: new_date 与 days/hours 二选一
#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
pub struct ExtendPromotionRequest {
    pub new_date: Option<DateTime<Utc>>,
    pub days: Option<i64>,
    pub hours: Option<i64>,
}

impl ExtendPromotionRequest {
    pub fn to_extension(&self, now: DateTime<Utc>) -> AppResult<Extension> {
        Extension::from_parts(self.new_date, self.days, self.hours, now)
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
pub struct DuplicatePromotionRequest {
    /// 不传则基于原促销码前缀自动生成
    pub code: Option<String>,
    pub brand_id: Option<Uuid>,
    pub description: Option<String>,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DeleteOutcome {
    /// 从未被使用，记录已删除
    Deleted,
    /// 已有使用记录，仅停用以保留历史
    Deactivated,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DeletePromotionResponse {
    pub id: Uuid,
    pub outcome: DeleteOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub promotion: Option<PromotionResponse>,
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct ValidatePromotionRequest {
    pub code: String,
    pub user_id: Option<String>,
    pub brand_id: Option<Uuid>,
}

pub const USER_USAGE_CHECK_NOT_IMPLEMENTED: &str = "not_implemented";

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ValidatePromotionResponse {
    pub valid: bool,
    pub reasons: Vec<String>,
    pub promotion: Option<PromotionResponse>,
    /// 按用户去重尚未实现
    pub user_usage_check: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
pub struct ExpiringPromotionsQuery {
    /// 默认取配置中的 expiring_soon_days
    pub days: Option<i64>,
    pub brand_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct UrgencyCounts {
    pub critical: i64,
    pub high: i64,
    pub medium: i64,
    pub low: i64,
}

impl UrgencyCounts {
    pub fn record(&mut self, level: UrgencyLevel) {
        match level {
            UrgencyLevel::Critical => self.critical += 1,
            UrgencyLevel::High => self.high += 1,
            UrgencyLevel::Medium => self.medium += 1,
            UrgencyLevel::Low => self.low += 1,
            UrgencyLevel::Expired => {}
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ExpiringPromotionsResponse {
    pub days: i64,
    pub total: i64,
    pub by_urgency: UrgencyCounts,
    pub promotions: Vec<PromotionResponse>,
}

// -----------------------------
// 批量操作
// -----------------------------

pub const ALL_BRANDS: &str = "all";

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct BulkCreatePromotionsRequest {
    /// 品牌ID列表，或 ["all"] 表示全部启用的品牌
    pub brands: Vec<String>,
    /// 每个品牌生成的数量，默认 1
    pub count_per_brand: Option<u32>,
    #[serde(default)]
    pub auto_generate_codes: bool,
    pub code_prefix: Option<String>,
    /// 支持 {BRAND} 与 {N} 占位符
    pub code_template: Option<String>,
    #[serde(default)]
    pub description: String,
    pub discount_percent: i64,
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
    pub usage_limit: Option<i32>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct BulkCreateError {
    pub brand_id: String,
    /// 该品牌下的序号 (从 1 开始)，品牌级错误为 0
    pub index: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    pub error: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BulkCreatePromotionsResponse {
    pub requested: i64,
    pub created_count: i64,
    pub failed_count: i64,
    pub partial_success: bool,
    pub promotions: Vec<PromotionResponse>,
    pub errors: Vec<BulkCreateError>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
pub struct BulkExtendPromotionsRequest {
    /// 与 filter 二选一
    pub promotion_ids: Option<Vec<Uuid>>,
    pub filter: Option<PromotionFilter>,
    #[serde(flatten)]
    pub extension: ExtendPromotionRequest,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BulkExtendItemResult {
    pub id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_valid_until: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_valid_until: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BulkExtendPromotionsResponse {
    pub total: i64,
    pub succeeded: i64,
    pub failed: i64,
    pub results: Vec<BulkExtendItemResult>,
}

// -----------------------------
// 统计
// -----------------------------

#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
pub struct PromotionAnalyticsQuery {
    /// 按创建时间筛选，默认最近 N 天
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub brand_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct StatusCounts {
    pub active: i64,
    pub scheduled: i64,
    pub expired: i64,
    pub inactive: i64,
}

impl StatusCounts {
    pub fn record(&mut self, status: PromotionStatus) {
        match status {
            PromotionStatus::Active => self.active += 1,
            PromotionStatus::Scheduled => self.scheduled += 1,
            PromotionStatus::Expired => self.expired += 1,
            PromotionStatus::Inactive => self.inactive += 1,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
pub struct UsageStats {
    pub total_uses: i64,
    pub average_uses: f64,
    /// 设置了使用上限的促销码数量
    pub limited_promotions: i64,
    pub fully_used: i64,
    /// 仅统计设置了上限的促销码
    pub average_usage_percentage: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
pub struct DiscountStats {
    pub min: Option<i32>,
    pub max: Option<i32>,
    pub average: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct TopPromotion {
    pub id: Uuid,
    pub code: String,
    pub brand_id: Uuid,
    pub brand_name: Option<String>,
    pub times_used: i32,
    pub usage_percentage: i64,
    pub computed_status: PromotionStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct BrandBreakdown {
    pub brand_id: Uuid,
    pub brand_name: Option<String>,
    pub total: i64,
    pub active: i64,
    pub total_uses: i64,
    pub average_discount: f64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PromotionAnalytics {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub total: i64,
    pub status_counts: StatusCounts,
    pub expiring_soon: i64,
    pub usage: UsageStats,
    pub discounts: DiscountStats,
    pub top_promotions: Vec<TopPromotion>,
    pub by_brand: Vec<BrandBreakdown>,
}
