//! 促销码状态与派生指标计算
//!
//! 所有派生字段 (computed_status / usage_percentage / days_until_expiry /
//! urgency_level / is_expiring_soon / is_fully_used) 都只依赖于存储字段与
//! 当前时间，从不落库。所有返回促销码的接口都通过这里统一计算。

use crate::entities::promotion_entity as promotions;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// 促销码实时状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PromotionStatus {
    Scheduled,
    Active,
    Expired,
    Inactive,
}

impl fmt::Display for PromotionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PromotionStatus::Scheduled => write!(f, "scheduled"),
            PromotionStatus::Active => write!(f, "active"),
            PromotionStatus::Expired => write!(f, "expired"),
            PromotionStatus::Inactive => write!(f, "inactive"),
        }
    }
}

impl FromStr for PromotionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "scheduled" => Ok(PromotionStatus::Scheduled),
            "active" => Ok(PromotionStatus::Active),
            "expired" => Ok(PromotionStatus::Expired),
            "inactive" => Ok(PromotionStatus::Inactive),
            other => Err(format!("Unknown promotion status: {other}")),
        }
    }
}

/// 到期紧急程度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum UrgencyLevel {
    Expired,
    Critical,
    High,
    Medium,
    Low,
}

/// 派生指标 (响应中与存储字段平铺在一起)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct PromotionMetrics {
    pub computed_status: PromotionStatus,
    /// 可能超过 100 (取消订单回退与新下单交错时)
    pub usage_percentage: i64,
    /// 可能为负数 (已过期)
    pub days_until_expiry: i64,
    pub urgency_level: UrgencyLevel,
    pub is_expiring_soon: bool,
    pub is_fully_used: bool,
}

/// 状态判定优先级: inactive > scheduled > expired > active
pub fn evaluate_status(promotion: &promotions::Model, now: DateTime<Utc>) -> PromotionStatus {
    if !promotion.is_active {
        PromotionStatus::Inactive
    } else if now < promotion.valid_from {
        PromotionStatus::Scheduled
    } else if now > promotion.valid_until {
        PromotionStatus::Expired
    } else {
        PromotionStatus::Active
    }
}

pub fn usage_percentage(times_used: i32, usage_limit: Option<i32>) -> i64 {
    match usage_limit {
        Some(limit) if limit > 0 => {
            (f64::from(times_used) / f64::from(limit) * 100.0).round() as i64
        }
        _ => 0,
    }
}

pub fn days_until_expiry(valid_until: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let millis = (valid_until - now).num_milliseconds();
    (millis as f64 / MILLIS_PER_DAY).ceil() as i64
}

pub fn urgency_level(days_until_expiry: i64) -> UrgencyLevel {
    match days_until_expiry {
        d if d < 0 => UrgencyLevel::Expired,
        d if d <= 1 => UrgencyLevel::Critical,
        d if d <= 3 => UrgencyLevel::High,
        d if d <= 7 => UrgencyLevel::Medium,
        _ => UrgencyLevel::Low,
    }
}

pub fn is_fully_used(promotion: &promotions::Model) -> bool {
    promotion
        .effective_usage_limit()
        .is_some_and(|limit| promotion.times_used >= limit)
}

pub fn evaluate(
    promotion: &promotions::Model,
    now: DateTime<Utc>,
    expiring_soon_days: i64,
) -> PromotionMetrics {
    let computed_status = evaluate_status(promotion, now);
    let days = days_until_expiry(promotion.valid_until, now);

    PromotionMetrics {
        computed_status,
        usage_percentage: usage_percentage(promotion.times_used, promotion.usage_limit),
        days_until_expiry: days,
        urgency_level: urgency_level(days),
        is_expiring_soon: computed_status == PromotionStatus::Active && days <= expiring_soon_days,
        is_fully_used: is_fully_used(promotion),
    }
}

/// 校验促销码能否被使用，返回所有不满足的规则 (不短路)
pub fn validation_reasons(
    promotion: &promotions::Model,
    brand_id: Option<Uuid>,
    now: DateTime<Utc>,
) -> Vec<String> {
    let mut reasons = Vec::new();

    if !promotion.is_active {
        reasons.push("Promotion is inactive".to_string());
    }
    if now < promotion.valid_from {
        reasons.push(format!(
            "Promotion is not valid until {}",
            promotion.valid_from.format("%Y-%m-%d")
        ));
    }
    if now > promotion.valid_until {
        reasons.push(format!(
            "Promotion expired on {}",
            promotion.valid_until.format("%Y-%m-%d")
        ));
    }
    if let Some(limit) = promotion.effective_usage_limit()
        && promotion.times_used >= limit
    {
        reasons.push(format!(
            "Promotion usage limit reached ({}/{})",
            promotion.times_used, limit
        ));
    }
    if let Some(brand_id) = brand_id
        && brand_id != promotion.brand_id
    {
        reasons.push("Promotion is not valid for this brand".to_string());
    }

    reasons
}


#[cfg(test)]
mod tests {
    use super::fixtures::{at, sample_promotion};
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_inactive_wins_over_time_window() {
        let mut p = sample_promotion();
        p.is_active = false;
        for now in [at(2023, 12, 1), at(2024, 1, 5), at(2024, 2, 1)] {
            assert_eq!(evaluate_status(&p, now), PromotionStatus::Inactive);
        }
    }

    #[test]
    fn test_status_follows_time_window() {
        let p = sample_promotion();
        assert_eq!(evaluate_status(&p, at(2023, 12, 31)), PromotionStatus::Scheduled);
        assert_eq!(evaluate_status(&p, at(2024, 1, 1)), PromotionStatus::Active);
        assert_eq!(evaluate_status(&p, at(2024, 1, 10)), PromotionStatus::Active);
        assert_eq!(
            evaluate_status(&p, at(2024, 1, 10) + Duration::seconds(1)),
            PromotionStatus::Expired
        );
    }

    #[test]
    fn test_fully_used_active_promotion() {
        let mut p = sample_promotion();
        p.times_used = 10;
        let metrics = evaluate(&p, at(2024, 1, 5), 7);
        assert_eq!(metrics.computed_status, PromotionStatus::Active);
        assert!(metrics.is_fully_used);
        assert_eq!(metrics.usage_percentage, 100);
        assert_eq!(metrics.days_until_expiry, 5);
        assert_eq!(metrics.urgency_level, UrgencyLevel::Medium);
        assert!(metrics.is_expiring_soon);
    }

    #[test]
    fn test_usage_percentage() {
        assert_eq!(usage_percentage(5, Some(0)), 0);
        assert_eq!(usage_percentage(5, None), 0);
        assert_eq!(usage_percentage(1, Some(3)), 33);
        assert_eq!(usage_percentage(2, Some(3)), 67);
        // 超出上限时不截断
        assert_eq!(usage_percentage(15, Some(10)), 150);
    }

    #[test]
    fn test_unlimited_promotion_is_never_fully_used() {
        let mut p = sample_promotion();
        p.usage_limit = Some(0);
        p.times_used = 1_000;
        assert!(!is_fully_used(&p));
        p.usage_limit = None;
        assert!(!is_fully_used(&p));
    }

    #[test]
    fn test_days_until_expiry_rounds_up() {
        let now = at(2024, 1, 1);
        assert_eq!(days_until_expiry(now + Duration::hours(1), now), 1);
        assert_eq!(days_until_expiry(now + Duration::days(2), now), 2);
        assert_eq!(days_until_expiry(now + Duration::hours(49), now), 3);
        assert_eq!(days_until_expiry(now - Duration::days(2), now), -2);
        assert_eq!(days_until_expiry(now - Duration::hours(36), now), -1);
    }

    #[test]
    fn test_urgency_buckets() {
        assert_eq!(urgency_level(-1), UrgencyLevel::Expired);
        assert_eq!(urgency_level(0), UrgencyLevel::Critical);
        assert_eq!(urgency_level(1), UrgencyLevel::Critical);
        assert_eq!(urgency_level(2), UrgencyLevel::High);
        assert_eq!(urgency_level(3), UrgencyLevel::High);
        assert_eq!(urgency_level(7), UrgencyLevel::Medium);
        assert_eq!(urgency_level(8), UrgencyLevel::Low);
    }

    #[test]
    fn test_expiring_soon_only_for_active() {
        let mut p = sample_promotion();
        p.valid_from = at(2024, 1, 20);
        p.valid_until = at(2024, 1, 22);
        let metrics = evaluate(&p, at(2024, 1, 19), 7);
        assert_eq!(metrics.computed_status, PromotionStatus::Scheduled);
        assert!(!metrics.is_expiring_soon);
    }

    #[test]
    fn test_expired_promotion_reports_single_reason() {
        let p = sample_promotion();
        let reasons = validation_reasons(&p, None, at(2024, 1, 11));
        assert_eq!(reasons, vec!["Promotion expired on 2024-01-10".to_string()]);
    }

    #[test]
    fn test_reasons_accumulate() {
        let mut p = sample_promotion();
        p.is_active = false;
        let other_brand = Uuid::new_v4();
        let reasons = validation_reasons(&p, Some(other_brand), at(2024, 2, 1));
        assert_eq!(reasons.len(), 3);
        assert!(reasons.iter().any(|r| r.contains("inactive")));
        assert!(reasons.iter().any(|r| r.contains("expired")));
        assert!(reasons.iter().any(|r| r.contains("brand")));
    }

    #[test]
    fn test_valid_promotion_has_no_reasons() {
        let mut p = sample_promotion();
        p.times_used = 9;
        let brand = p.brand_id;
        assert!(validation_reasons(&p, Some(brand), at(2024, 1, 5)).is_empty());

        p.times_used = 10;
        let reasons = validation_reasons(&p, Some(brand), at(2024, 1, 5));
        assert_eq!(reasons, vec!["Promotion usage limit reached (10/10)".to_string()]);
    }

    #[test]
    fn test_status_from_str() {
        assert_eq!("Active".parse::<PromotionStatus>(), Ok(PromotionStatus::Active));
        assert!("paused".parse::<PromotionStatus>().is_err());
    }
}
