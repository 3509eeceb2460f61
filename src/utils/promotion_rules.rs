use crate::entities::promotion_entity as promotions;
use crate::error::{AppError, AppResult};
use chrono::{DateTime, Duration, Utc};

const MAX_EXTENSION_DAYS: i64 = 3650;

/// 折扣比例写入前统一限制在 [0, 100]
pub fn clamp_discount(discount_percent: i64) -> i32 {
    discount_percent.clamp(0, 100) as i32
}

pub fn validate_window(valid_from: DateTime<Utc>, valid_until: DateTime<Utc>) -> AppResult<()> {
    if valid_until <= valid_from {
        return Err(AppError::ValidationError(
            "valid_until must be later than valid_from".to_string(),
        ));
    }
    Ok(())
}

/// 0 表示不限次数，负数非法
pub fn validate_usage_limit(usage_limit: Option<i32>) -> AppResult<Option<i32>> {
    match usage_limit {
        Some(limit) if limit < 0 => Err(AppError::ValidationError(
            "usage_limit must not be negative".to_string(),
        )),
        other => Ok(other),
    }
}

/// 延期方式: 指定新的到期时间，或在当前到期时间上顺延
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extension {
    Until(DateTime<Utc>),
    By(Duration),
}

impl Extension {
    /// 从请求参数构造，`new_date` 与 `days`/`hours` 只能二选一
    pub fn from_parts(
        new_date: Option<DateTime<Utc>>,
        days: Option<i64>,
        hours: Option<i64>,
        now: DateTime<Utc>,
    ) -> AppResult<Self> {
        let has_offset = days.is_some() || hours.is_some();
        match (new_date, has_offset) {
            (Some(_), true) => Err(AppError::ValidationError(
                "Provide either new_date or days/hours, not both".to_string(),
            )),
            (Some(date), false) => {
                if date <= now {
                    return Err(AppError::ValidationError(
                        "new_date must be in the future".to_string(),
                    ));
                }
                Ok(Extension::Until(date))
            }
            (None, true) => {
                let max_hours = MAX_EXTENSION_DAYS * 24;
                let (d, h) = (days.unwrap_or(0), hours.unwrap_or(0));
                // 先分别限定范围再相加，避免极端输入溢出
                let total_hours = if (-MAX_EXTENSION_DAYS..=MAX_EXTENSION_DAYS).contains(&d)
                    && (-max_hours..=max_hours).contains(&h)
                {
                    d * 24 + h
                } else {
                    i64::MAX
                };
                if !(-max_hours..=max_hours).contains(&total_hours) {
                    return Err(AppError::ValidationError(format!(
                        "Extension offset must be within {MAX_EXTENSION_DAYS} days"
                    )));
                }
                let offset = Duration::hours(total_hours);
                if offset <= Duration::zero() {
                    return Err(AppError::ValidationError(
                        "Extension offset must be positive".to_string(),
                    ));
                }
                Ok(Extension::By(offset))
            }
            (None, false) => Err(AppError::ValidationError(
                "Either new_date or days/hours is required".to_string(),
            )),
        }
    }

    /// 计算新的 valid_until，并保证晚于 valid_from
    pub fn apply(&self, promotion: &promotions::Model) -> AppResult<DateTime<Utc>> {
        let new_until = match self {
            Extension::Until(date) => *date,
            Extension::By(offset) => promotion.valid_until + *offset,
        };
        validate_window(promotion.valid_from, new_until)?;
        Ok(new_until)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::promotion_metrics::fixtures::{at, sample_promotion};

    #[test]
    fn test_clamp_discount() {
        assert_eq!(clamp_discount(-5), 0);
        assert_eq!(clamp_discount(0), 0);
        assert_eq!(clamp_discount(42), 42);
        assert_eq!(clamp_discount(100), 100);
        assert_eq!(clamp_discount(250), 100);
        assert_eq!(clamp_discount(i64::MAX), 100);
    }

    #[test]
    fn test_validate_window() {
        assert!(validate_window(at(2024, 1, 1), at(2024, 1, 2)).is_ok());
        assert!(validate_window(at(2024, 1, 2), at(2024, 1, 2)).is_err());
        assert!(validate_window(at(2024, 1, 3), at(2024, 1, 2)).is_err());
    }

    #[test]
    fn test_validate_usage_limit() {
        assert_eq!(validate_usage_limit(None).unwrap(), None);
        assert_eq!(validate_usage_limit(Some(0)).unwrap(), Some(0));
        assert!(validate_usage_limit(Some(-1)).is_err());
    }

    #[test]
    fn test_offset_extends_by_exact_amount() {
        let p = sample_promotion();
        let ext = Extension::from_parts(None, Some(2), Some(6), at(2024, 1, 5)).unwrap();
        assert_eq!(ext.apply(&p).unwrap(), p.valid_until + Duration::hours(54));

        let ext = Extension::from_parts(None, None, Some(3), at(2024, 1, 5)).unwrap();
        assert_eq!(ext.apply(&p).unwrap(), p.valid_until + Duration::hours(3));
    }

    #[test]
    fn test_new_date_in_past_rejected() {
        let now = at(2024, 1, 5);
        assert!(Extension::from_parts(Some(at(2024, 1, 4)), None, None, now).is_err());
        assert!(Extension::from_parts(Some(now), None, None, now).is_err());
        let ext = Extension::from_parts(Some(at(2024, 2, 1)), None, None, now).unwrap();
        assert_eq!(ext, Extension::Until(at(2024, 2, 1)));
    }

    #[test]
    fn test_invalid_extension_requests() {
        let now = at(2024, 1, 5);
        assert!(Extension::from_parts(None, None, None, now).is_err());
        assert!(Extension::from_parts(None, Some(0), Some(0), now).is_err());
        assert!(Extension::from_parts(None, Some(-1), None, now).is_err());
        assert!(Extension::from_parts(Some(at(2024, 2, 1)), Some(1), None, now).is_err());
    }

    #[test]
    fn test_extreme_offsets_rejected() {
        let now = at(2024, 1, 5);
        for value in [i64::MIN, i64::MAX] {
            assert!(matches!(
                Extension::from_parts(None, Some(value), None, now),
                Err(AppError::ValidationError(_))
            ));
            assert!(matches!(
                Extension::from_parts(None, None, Some(value), now),
                Err(AppError::ValidationError(_))
            ));
            assert!(matches!(
                Extension::from_parts(None, Some(value), Some(value), now),
                Err(AppError::ValidationError(_))
            ));
        }
    }

    #[test]
    fn test_combined_offset_bounded() {
        let now = at(2024, 1, 5);
        let ext = Extension::from_parts(None, Some(MAX_EXTENSION_DAYS), None, now).unwrap();
        assert_eq!(ext, Extension::By(Duration::days(MAX_EXTENSION_DAYS)));
        assert!(Extension::from_parts(None, Some(MAX_EXTENSION_DAYS), Some(1), now).is_err());
        assert!(
            Extension::from_parts(None, Some(MAX_EXTENSION_DAYS), Some(MAX_EXTENSION_DAYS * 24), now)
                .is_err()
        );
        let ext = Extension::from_parts(None, Some(MAX_EXTENSION_DAYS), Some(-1), now).unwrap();
        assert_eq!(ext, Extension::By(Duration::days(MAX_EXTENSION_DAYS) - Duration::hours(1)));
    }

    #[test]
    fn test_new_date_must_follow_valid_from() {
        let mut p = sample_promotion();
        p.valid_from = at(2024, 3, 1);
        p.valid_until = at(2024, 3, 10);
        let ext = Extension::Until(at(2024, 2, 1));
        assert!(ext.apply(&p).is_err());
    }
}
