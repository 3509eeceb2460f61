use crate::entities::promotion_entity as promotions;
use crate::error::{AppError, AppResult};
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QuerySelect};
use std::future::Future;

/// 生成唯一促销码:
/// 1. 由 `candidate(attempt)` 产生候选码
/// 2. 通过 `exists(code)` 查询是否已被占用
/// 3. 占用则重试，最多 `max_attempts` 次，用尽返回 GenerationFailed
///
/// 查询与插入是两次独立操作，并发下仍可能撞码；
/// 插入时的唯一索引冲突才是最终判定 (见 AppError::from_write_error)。
pub async fn generate_unique_with<C, E, Fut>(
    mut candidate: C,
    mut exists: E,
    max_attempts: u32,
) -> AppResult<String>
where
    C: FnMut(u32) -> String,
    E: FnMut(String) -> Fut,
    Fut: Future<Output = AppResult<bool>>,
{
    let attempts = max_attempts.max(1);
    for attempt in 1..=attempts {
        let code = candidate(attempt);
        if !exists(code.clone()).await? {
            return Ok(code);
        }
        log::debug!("Promotion code {code} already taken (attempt {attempt}/{attempts})");
    }

    Err(AppError::GenerationFailed(format!(
        "Could not generate a unique promotion code after {attempts} attempts"
    )))
}

/// 查询促销码是否已存在 (精确匹配规范化后的 code)
pub async fn promotion_code_exists<C: ConnectionTrait>(db: &C, code: &str) -> AppResult<bool> {
    let existing = promotions::Entity::find()
        .filter(promotions::Column::Code.eq(code))
        .limit(1)
        .one(db)
        .await?;
    Ok(existing.is_some())
}

/// 基于数据库的唯一促销码生成
pub async fn generate_unique_promotion_code<C, F>(
    db: &C,
    candidate: F,
    max_attempts: u32,
) -> AppResult<String>
where
    C: ConnectionTrait,
    F: FnMut(u32) -> String,
{
    generate_unique_with(
        candidate,
        |code| async move { promotion_code_exists(db, &code).await },
        max_attempts,
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[tokio::test]
    async fn test_returns_first_free_candidate() {
        let taken: HashSet<String> = ["CODE1".to_string(), "CODE2".to_string()].into();
        let code = generate_unique_with(
            |attempt| format!("CODE{attempt}"),
            |code| {
                let taken = taken.clone();
                async move { Ok(taken.contains(&code)) }
            },
            5,
        )
        .await
        .unwrap();
        assert_eq!(code, "CODE3");
    }

    #[tokio::test]
    async fn test_exhausted_retries_is_generation_failed() {
        let mut calls = 0;
        let result = generate_unique_with(
            |attempt| format!("CODE{attempt}"),
            |_| {
                calls += 1;
                async { Ok(true) }
            },
            5,
        )
        .await;
        assert!(matches!(result, Err(AppError::GenerationFailed(_))));
        assert_eq!(calls, 5);
    }

    #[tokio::test]
    async fn test_store_error_is_propagated() {
        let result = generate_unique_with(
            |attempt| format!("CODE{attempt}"),
            |_| async {
                Err(AppError::DatabaseError(sea_orm::DbErr::Custom(
                    "connection refused".into(),
                )))
            },
            5,
        )
        .await;
        assert!(matches!(result, Err(AppError::DatabaseError(_))));
    }
}
