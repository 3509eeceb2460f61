use crate::entities::promotion_entity as promotions;
use crate::database::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::{
    BrandBreakdown, DiscountStats, PromotionAnalytics, PromotionAnalyticsQuery, StatusCounts,
    TopPromotion, UsageStats,
};
use crate::services::BrandService;
use crate::utils::{PromotionStatus, evaluate};
use chrono::{DateTime, Duration, Utc};
use sea_orm::{ColumnTrait, Condition, EntityTrait, QueryFilter};
use std::collections::HashMap;
use uuid::Uuid;

const TOP_PROMOTIONS: usize = 5;

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn average(sum: f64, count: usize) -> f64 {
    if count == 0 { 0.0 } else { round2(sum / count as f64) }
}

/// 内存聚合 (纯函数，便于测试)
pub fn aggregate(
    models: &[promotions::Model],
    brand_names: &HashMap<Uuid, String>,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
    now: DateTime<Utc>,
    expiring_soon_days: i64,
) -> PromotionAnalytics {
    let mut status_counts = StatusCounts::default();
    let mut expiring_soon = 0;
    let mut total_uses: i64 = 0;
    let mut fully_used = 0;
    let mut limited: Vec<i64> = Vec::new();
    let mut discount_sum = 0.0;
    let mut discount_min: Option<i32> = None;
    let mut discount_max: Option<i32> = None;
    let mut by_brand: HashMap<Uuid, (i64, i64, i64, f64)> = HashMap::new();
    let mut ranked: Vec<TopPromotion> = Vec::with_capacity(models.len());

    for m in models {
        let metrics = evaluate(m, now, expiring_soon_days);
        status_counts.record(metrics.computed_status);
        if metrics.is_expiring_soon {
            expiring_soon += 1;
        }
        total_uses += i64::from(m.times_used);
        if metrics.is_fully_used {
            fully_used += 1;
        }
        if m.effective_usage_limit().is_some() {
            limited.push(metrics.usage_percentage);
        }

        discount_sum += f64::from(m.discount_percent);
        discount_min = Some(discount_min.map_or(m.discount_percent, |v| v.min(m.discount_percent)));
        discount_max = Some(discount_max.map_or(m.discount_percent, |v| v.max(m.discount_percent)));

        let entry = by_brand.entry(m.brand_id).or_insert((0, 0, 0, 0.0));
        entry.0 += 1;
        if metrics.computed_status == PromotionStatus::Active {
            entry.1 += 1;
        }
        entry.2 += i64::from(m.times_used);
        entry.3 += f64::from(m.discount_percent);

        ranked.push(TopPromotion {
            id: m.id,
            code: m.code.clone(),
            brand_id: m.brand_id,
            brand_name: brand_names.get(&m.brand_id).cloned(),
            times_used: m.times_used,
            usage_percentage: metrics.usage_percentage,
            computed_status: metrics.computed_status,
        });
    }

    ranked.sort_by(|a, b| b.times_used.cmp(&a.times_used).then_with(|| a.code.cmp(&b.code)));
    ranked.truncate(TOP_PROMOTIONS);

    let mut by_brand: Vec<BrandBreakdown> = by_brand
        .into_iter()
        .map(|(brand_id, (total, active, uses, discounts))| BrandBreakdown {
            brand_id,
            brand_name: brand_names.get(&brand_id).cloned(),
            total,
            active,
            total_uses: uses,
            average_discount: average(discounts, total as usize),
        })
        .collect();
    by_brand.sort_by(|a, b| {
        b.total
            .cmp(&a.total)
            .then_with(|| a.brand_name.cmp(&b.brand_name))
            .then_with(|| a.brand_id.cmp(&b.brand_id))
    });

    let total = models.len();
    let limited_sum: i64 = limited.iter().sum();

    PromotionAnalytics {
        from,
        to,
        total: total as i64,
        status_counts,
        expiring_soon,
        usage: UsageStats {
            total_uses,
            average_uses: average(total_uses as f64, total),
            limited_promotions: limited.len() as i64,
            fully_used,
            average_usage_percentage: average(limited_sum as f64, limited.len()),
        },
        discounts: DiscountStats {
            min: discount_min,
            max: discount_max,
            average: average(discount_sum, total),
        },
        top_promotions: ranked,
        by_brand,
    }
}

#[derive(Clone)]
pub struct PromotionAnalyticsService {
    pool: DbPool,
    brand_service: BrandService,
    default_days: i64,
    expiring_soon_days: i64,
}

impl PromotionAnalyticsService {
    pub fn new(
        pool: DbPool,
        brand_service: BrandService,
        default_days: i64,
        expiring_soon_days: i64,
    ) -> Self {
        Self {
            pool,
            brand_service,
            default_days,
            expiring_soon_days,
        }
    }

    /// 统计指定创建时间范围内的促销码
    pub async fn analytics(&self, query: &PromotionAnalyticsQuery) -> AppResult<PromotionAnalytics> {
        let now = Utc::now();
        let to = query.to.unwrap_or(now);
        let from = query.from.unwrap_or(to - Duration::days(self.default_days));
        if from >= to {
            return Err(AppError::ValidationError(
                "from must be earlier than to".to_string(),
            ));
        }

        let mut condition = Condition::all()
            .add(promotions::Column::CreatedAt.gte(from))
            .add(promotions::Column::CreatedAt.lte(to));
        if let Some(brand_id) = query.brand_id {
            condition = condition.add(promotions::Column::BrandId.eq(brand_id));
        }

        let models = promotions::Entity::find()
            .filter(condition)
            .all(self.pool.as_ref())
            .await?;

        let brand_ids: Vec<Uuid> = models.iter().map(|m| m.brand_id).collect();
        let names = self.brand_service.names_for(&brand_ids).await?;

        Ok(aggregate(&models, &names, from, to, now, self.expiring_soon_days))
    }
}
