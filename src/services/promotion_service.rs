use crate::config::PromotionConfig;
use crate::entities::promotion_entity as promotions;
use crate::database::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::{
    CreatePromotionRequest, DeleteOutcome, DeletePromotionResponse, DuplicatePromotionRequest,
    ExpiringPromotionsQuery, ExpiringPromotionsResponse, ExtendPromotionRequest, PaginatedResponse,
    PaginationParams, PromotionFilter, PromotionListQuery, PromotionResponse,
    TogglePromotionRequest, USER_USAGE_CHECK_NOT_IMPLEMENTED, UpdatePromotionRequest,
    UrgencyCounts, ValidatePromotionRequest, ValidatePromotionResponse,
};
use crate::services::BrandService;
use crate::utils::{
    AuthUser, Extension, PromotionStatus, clamp_discount, generate_unique_promotion_code,
    normalize_code, promotion_code_exists, random_code, sanitize_affix, validate_code_format,
    validate_usage_limit, validate_window, validation_reasons,
};
use chrono::{DateTime, Duration, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, IntoActiveModel,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

const MAX_EXPIRING_WINDOW_DAYS: i64 = 365;
const DUPLICATE_PREFIX_LEN: usize = 8;
const DEFAULT_DUPLICATE_PREFIX: &str = "PROMO";

/// 实时状态对应的 SQL 条件 (与 evaluate_status 的判定顺序一致)
pub fn status_condition(status: PromotionStatus, now: DateTime<Utc>) -> Condition {
    let active = Condition::all().add(promotions::Column::IsActive.eq(true));
    match status {
        PromotionStatus::Inactive => Condition::all().add(promotions::Column::IsActive.eq(false)),
        PromotionStatus::Scheduled => active.add(promotions::Column::ValidFrom.gt(now)),
        PromotionStatus::Expired => active
            .add(promotions::Column::ValidFrom.lte(now))
            .add(promotions::Column::ValidUntil.lt(now)),
        PromotionStatus::Active => active
            .add(promotions::Column::ValidFrom.lte(now))
            .add(promotions::Column::ValidUntil.gte(now)),
    }
}

/// 列表与批量延期共用的筛选条件
pub fn filter_condition(filter: &PromotionFilter, now: DateTime<Utc>) -> AppResult<Condition> {
    let mut condition = Condition::all();

    if let Some(brand_id) = filter.brand_id {
        condition = condition.add(promotions::Column::BrandId.eq(brand_id));
    }
    if let Some(status) = filter.status.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let status: PromotionStatus = status.parse().map_err(AppError::ValidationError)?;
        condition = condition.add(status_condition(status, now));
    }
    if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        condition = condition.add(
            Condition::any()
                .add(promotions::Column::Code.contains(search.to_ascii_uppercase()))
                .add(promotions::Column::Description.contains(search)),
        );
    }

    Ok(condition)
}

/// 新记录的 ActiveModel (所有字段显式赋值)
pub fn new_active_model(model: &promotions::Model) -> promotions::ActiveModel {
    promotions::ActiveModel {
        id: Set(model.id),
        brand_id: Set(model.brand_id),
        code: Set(model.code.clone()),
        description: Set(model.description.clone()),
        discount_percent: Set(model.discount_percent),
        valid_from: Set(model.valid_from),
        valid_until: Set(model.valid_until),
        is_active: Set(model.is_active),
        usage_limit: Set(model.usage_limit),
        times_used: Set(model.times_used),
        created_by: Set(model.created_by.clone()),
        created_at: Set(model.created_at),
        updated_at: Set(model.updated_at),
    }
}

/// 复制时的前缀: 原促销码开头的字母 (最多 8 位)
fn duplicate_prefix(code: &str) -> String {
    let prefix: String = code
        .chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .take(DUPLICATE_PREFIX_LEN)
        .collect();
    if prefix.is_empty() {
        DEFAULT_DUPLICATE_PREFIX.to_string()
    } else {
        prefix
    }
}

#[derive(Clone)]
pub struct PromotionService {
    pool: DbPool,
    brand_service: BrandService,
    config: PromotionConfig,
}

impl PromotionService {
    pub fn new(pool: DbPool, brand_service: BrandService, config: PromotionConfig) -> Self {
        Self {
            pool,
            brand_service,
            config,
        }
    }

    /// 分页查询 (按创建时间倒序)
    pub async fn list(
        &self,
        query: &PromotionListQuery,
    ) -> AppResult<PaginatedResponse<PromotionResponse>> {
        let params = PaginationParams::new(query.page, query.per_page);
        let condition = filter_condition(&PromotionFilter::from(query), Utc::now())?;

        let base_query = promotions::Entity::find().filter(condition);
        let total = base_query.clone().count(self.pool.as_ref()).await?;

        let models = base_query
            .order_by_desc(promotions::Column::CreatedAt)
            .order_by_asc(promotions::Column::Code)
            .limit(params.get_limit())
            .offset(params.get_offset())
            .all(self.pool.as_ref())
            .await?;

        let items = self.enrich_many(models).await?;
        Ok(PaginatedResponse::new(items, &params, total))
    }

    pub async fn get(&self, id: Uuid) -> AppResult<PromotionResponse> {
        let model = self.find_model(id).await?;
        self.enrich(model).await
    }

    /// 创建促销码
    /// 1. 品牌必须存在
    /// 2. code 手动指定 (规范化 + 格式校验) 或自动生成
    /// 3. 折扣限制在 [0, 100]，有效期必须 valid_until > valid_from
    pub async fn create(
        &self,
        user: &AuthUser,
        req: CreatePromotionRequest,
    ) -> AppResult<PromotionResponse> {
        validate_window(req.valid_from, req.valid_until)?;
        let usage_limit = validate_usage_limit(req.usage_limit)?;
        let brand = self.brand_service.find(req.brand_id).await?;

        let code = match (req.code.as_deref(), req.auto_generate_code) {
            (Some(_), true) => {
                return Err(AppError::ValidationError(
                    "Provide either code or auto_generate_code, not both".to_string(),
                ));
            }
            (Some(raw), false) => self.claim_code(raw).await?,
            (None, true) => {
                let prefix = sanitize_affix(req.code_prefix.as_deref())?;
                self.generate_code(&prefix).await?
            }
            (None, false) => {
                return Err(AppError::ValidationError(
                    "code is required unless auto_generate_code is set".to_string(),
                ));
            }
        };

        let now = Utc::now();
        let draft = promotions::Model {
            id: Uuid::new_v4(),
            brand_id: brand.id,
            code,
            description: req.description.trim().to_string(),
            discount_percent: clamp_discount(req.discount_percent),
            valid_from: req.valid_from,
            valid_until: req.valid_until,
            is_active: req.is_active.unwrap_or(true),
            usage_limit,
            times_used: 0,
            created_by: Some(user.user_id.clone()),
            created_at: Some(now),
            updated_at: Some(now),
        };

        let created = new_active_model(&draft)
            .insert(self.pool.as_ref())
            .await
            .map_err(|e| AppError::from_write_error(e, &draft.code))?;

        log::info!(
            "Promotion {} ({}) created by {}",
            created.code,
            created.id,
            user.user_id
        );
        Ok(self.respond(created, Some(brand.name)))
    }

    /// 部分更新，更新后重新校验全部不变量
    pub async fn update(&self, id: Uuid, req: UpdatePromotionRequest) -> AppResult<PromotionResponse> {
        let existing = self.find_model(id).await?;

        let valid_from = req.valid_from.unwrap_or(existing.valid_from);
        let valid_until = req.valid_until.unwrap_or(existing.valid_until);
        validate_window(valid_from, valid_until)?;
        let usage_limit = match req.usage_limit {
            Some(limit) => validate_usage_limit(Some(limit))?,
            None => existing.usage_limit,
        };

        let mut brand_name = None;
        if let Some(brand_id) = req.brand_id
            && brand_id != existing.brand_id
        {
            brand_name = Some(self.brand_service.find(brand_id).await?.name);
        }

        let code = match req.code.as_deref() {
            Some(raw) if normalize_code(raw) != existing.code => self.claim_code(raw).await?,
            _ => existing.code.clone(),
        };

        let mut am = existing.clone().into_active_model();
        am.brand_id = Set(req.brand_id.unwrap_or(existing.brand_id));
        am.code = Set(code.clone());
        if let Some(description) = req.description {
            am.description = Set(description.trim().to_string());
        }
        if let Some(discount) = req.discount_percent {
            am.discount_percent = Set(clamp_discount(discount));
        }
        am.valid_from = Set(valid_from);
        am.valid_until = Set(valid_until);
        if let Some(is_active) = req.is_active {
            am.is_active = Set(is_active);
        }
        am.usage_limit = Set(usage_limit);
        am.updated_at = Set(Some(Utc::now()));

        let updated = am
            .update(self.pool.as_ref())
            .await
            .map_err(|e| AppError::from_write_error(e, &code))?;

        log::info!("Promotion {} ({}) updated", updated.code, updated.id);
        match brand_name {
            Some(name) => Ok(self.respond(updated, Some(name))),
            None => self.enrich(updated).await,
        }
    }

    /// 删除: 从未使用过的直接删除；已被使用的只停用，保留历史
    pub async fn delete(&self, id: Uuid) -> AppResult<DeletePromotionResponse> {
        let existing = self.find_model(id).await?;

        if existing.times_used == 0 {
            promotions::Entity::delete_by_id(id).exec(self.pool.as_ref()).await?;
            log::info!("Promotion {} ({}) deleted", existing.code, id);
            return Ok(DeletePromotionResponse {
                id,
                outcome: DeleteOutcome::Deleted,
                promotion: None,
            });
        }

        let model = if existing.is_active {
            let mut am = existing.into_active_model();
            am.is_active = Set(false);
            am.updated_at = Set(Some(Utc::now()));
            am.update(self.pool.as_ref()).await?
        } else {
            existing
        };
        log::info!(
            "Promotion {} ({}) has {} uses, deactivated instead of deleted",
            model.code,
            id,
            model.times_used
        );

        Ok(DeletePromotionResponse {
            id,
            outcome: DeleteOutcome::Deactivated,
            promotion: Some(self.enrich(model).await?),
        })
    }

    /// 启用/停用；不传 is_active 时取反
    pub async fn toggle(
        &self,
        id: Uuid,
        req: Option<TogglePromotionRequest>,
    ) -> AppResult<PromotionResponse> {
        let existing = self.find_model(id).await?;
        let target = req
            .and_then(|r| r.is_active)
            .unwrap_or(!existing.is_active);

        let mut am = existing.into_active_model();
        am.is_active = Set(target);
        am.updated_at = Set(Some(Utc::now()));
        let updated = am.update(self.pool.as_ref()).await?;

        log::info!(
            "Promotion {} ({}) is_active set to {}",
            updated.code,
            id,
            target
        );
        self.enrich(updated).await
    }

    pub async fn extend(&self, id: Uuid, req: ExtendPromotionRequest) -> AppResult<PromotionResponse> {
        let extension = req.to_extension(Utc::now())?;
        let existing = self.find_model(id).await?;
        let updated = self.apply_extension(existing, &extension).await?;
        self.enrich(updated).await
    }

    /// 计算并写入新的 valid_until
    pub async fn apply_extension(
        &self,
        promotion: promotions::Model,
        extension: &Extension,
    ) -> AppResult<promotions::Model> {
        let new_until = extension.apply(&promotion)?;
        let old_until = promotion.valid_until;

        let mut am = promotion.into_active_model();
        am.valid_until = Set(new_until);
        am.updated_at = Set(Some(Utc::now()));
        let updated = am.update(self.pool.as_ref()).await?;

        log::info!(
            "Promotion {} extended from {} to {}",
            updated.code,
            old_until,
            new_until
        );
        Ok(updated)
    }

    /// 复制促销码: 新 code、使用次数清零，可覆盖品牌/有效期/启用状态
    pub async fn duplicate(
        &self,
        user: &AuthUser,
        id: Uuid,
        req: DuplicatePromotionRequest,
    ) -> AppResult<PromotionResponse> {
        let source = self.find_model(id).await?;

        let valid_from = req.valid_from.unwrap_or(source.valid_from);
        let valid_until = req.valid_until.unwrap_or(source.valid_until);
        validate_window(valid_from, valid_until)?;

        let brand = self
            .brand_service
            .find(req.brand_id.unwrap_or(source.brand_id))
            .await?;

        let code = match req.code.as_deref() {
            Some(raw) => self.claim_code(raw).await?,
            None => self.generate_code(&duplicate_prefix(&source.code)).await?,
        };

        let now = Utc::now();
        let draft = promotions::Model {
            id: Uuid::new_v4(),
            brand_id: brand.id,
            code,
            description: req.description.unwrap_or_else(|| source.description.clone()),
            discount_percent: clamp_discount(i64::from(source.discount_percent)),
            valid_from,
            valid_until,
            is_active: req.is_active.unwrap_or(source.is_active),
            usage_limit: source.usage_limit,
            times_used: 0,
            created_by: Some(user.user_id.clone()),
            created_at: Some(now),
            updated_at: Some(now),
        };

        let created = new_active_model(&draft)
            .insert(self.pool.as_ref())
            .await
            .map_err(|e| AppError::from_write_error(e, &draft.code))?;

        log::info!(
            "Promotion {} duplicated from {} by {}",
            created.code,
            source.code,
            user.user_id
        );
        Ok(self.respond(created, Some(brand.name)))
    }

    /// 校验促销码能否使用 (只读，不修改 times_used)
    pub async fn validate_code(
        &self,
        req: ValidatePromotionRequest,
    ) -> AppResult<ValidatePromotionResponse> {
        let code = normalize_code(&req.code);
        if code.is_empty() {
            return Err(AppError::ValidationError("code is required".to_string()));
        }

        let promotion = promotions::Entity::find()
            .filter(promotions::Column::Code.eq(code.as_str()))
            .one(self.pool.as_ref())
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Promotion code {code} not found")))?;

        // 按用户去重未实现，user_id 仅用于日志
        if let Some(user_id) = req.user_id.as_deref() {
            log::debug!("Validating promotion {code} for user {user_id}");
        }

        let reasons = validation_reasons(&promotion, req.brand_id, Utc::now());
        Ok(ValidatePromotionResponse {
            valid: reasons.is_empty(),
            reasons,
            promotion: Some(self.enrich(promotion).await?),
            user_usage_check: USER_USAGE_CHECK_NOT_IMPLEMENTED.to_string(),
        })
    }

    /// 即将到期的启用中促销码 (按到期时间升序)
    pub async fn expiring(&self, query: &ExpiringPromotionsQuery) -> AppResult<ExpiringPromotionsResponse> {
        let days = query.days.unwrap_or(self.config.expiring_soon_days);
        if !(1..=MAX_EXPIRING_WINDOW_DAYS).contains(&days) {
            return Err(AppError::ValidationError(format!(
                "days must be between 1 and {MAX_EXPIRING_WINDOW_DAYS}"
            )));
        }

        let now = Utc::now();
        let mut condition = status_condition(PromotionStatus::Active, now)
            .add(promotions::Column::ValidUntil.lte(now + Duration::days(days)));
        if let Some(brand_id) = query.brand_id {
            condition = condition.add(promotions::Column::BrandId.eq(brand_id));
        }

        let models = promotions::Entity::find()
            .filter(condition)
            .order_by_asc(promotions::Column::ValidUntil)
            .all(self.pool.as_ref())
            .await?;

        let promotions = self.enrich_many(models).await?;
        let mut by_urgency = UrgencyCounts::default();
        for p in &promotions {
            by_urgency.record(p.metrics.urgency_level);
        }

        Ok(ExpiringPromotionsResponse {
            days,
            total: promotions.len() as i64,
            by_urgency,
            promotions,
        })
    }

    pub async fn find_model(&self, id: Uuid) -> AppResult<promotions::Model> {
        promotions::Entity::find_by_id(id)
            .one(self.pool.as_ref())
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Promotion {id} not found")))
    }

    pub fn respond(&self, model: promotions::Model, brand_name: Option<String>) -> PromotionResponse {
        PromotionResponse::from_model(model, Utc::now(), self.config.expiring_soon_days)
            .with_brand_name(brand_name)
    }

    pub async fn enrich(&self, model: promotions::Model) -> AppResult<PromotionResponse> {
        let brand_name = self.brand_service.find_name(model.brand_id).await?;
        Ok(self.respond(model, brand_name))
    }

    pub async fn enrich_many(&self, models: Vec<promotions::Model>) -> AppResult<Vec<PromotionResponse>> {
        let brand_ids: Vec<Uuid> = models.iter().map(|m| m.brand_id).collect();
        let names = self.brand_service.names_for(&brand_ids).await?;
        Ok(models
            .into_iter()
            .map(|m| {
                let name = names.get(&m.brand_id).cloned();
                self.respond(m, name)
            })
            .collect())
    }

    /// 管理员指定的 code: 规范化、格式校验、查重
    async fn claim_code(&self, raw: &str) -> AppResult<String> {
        let code = normalize_code(raw);
        validate_code_format(&code)?;
        if promotion_code_exists(self.pool.as_ref(), &code).await? {
            return Err(AppError::Conflict(format!(
                "Promotion code {code} already exists"
            )));
        }
        Ok(code)
    }

    async fn generate_code(&self, prefix: &str) -> AppResult<String> {
        let length = self.config.generated_code_length;
        generate_unique_promotion_code(
            self.pool.as_ref(),
            |_| random_code(prefix, "", length),
            self.config.code_generation_attempts,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::brand_entity as brands;
    use crate::utils::promotion_metrics::fixtures::sample_promotion;
    use crate::utils::ROLE_ADMIN;
    use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase, MockExecResult};
    use std::sync::Arc;

    fn brand_for(promotion: &promotions::Model) -> brands::Model {
        brands::Model {
            id: promotion.brand_id,
            name: "Acme".to_string(),
            slug: "acme".to_string(),
            is_active: true,
            created_at: None,
        }
    }

    fn service(db: DatabaseConnection) -> PromotionService {
        let db: DbPool = Arc::new(db);
        PromotionService::new(db.clone(), BrandService::new(db), PromotionConfig::default())
    }

    fn admin() -> AuthUser {
        AuthUser {
            user_id: "admin-1".to_string(),
            role: ROLE_ADMIN.to_string(),
        }
    }

    #[test]
    fn test_duplicate_prefix() {
        assert_eq!(duplicate_prefix("SUMMER10"), "SUMMER");
        assert_eq!(duplicate_prefix("BLACKFRIDAY24"), "BLACKFRI");
        assert_eq!(duplicate_prefix("2024SALE"), "PROMO");
    }

    #[test]
    fn test_unknown_status_filter_rejected() {
        let filter = PromotionFilter {
            status: Some("paused".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            filter_condition(&filter, Utc::now()),
            Err(AppError::ValidationError(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_unused_promotion_removes_row() {
        let promotion = sample_promotion();
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![promotion.clone()]])
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }])
            .into_connection();

        let result = service(db).delete(promotion.id).await.unwrap();
        assert!(matches!(result.outcome, DeleteOutcome::Deleted));
        assert!(result.promotion.is_none());
    }

    #[tokio::test]
    async fn test_delete_used_promotion_deactivates() {
        let mut promotion = sample_promotion();
        promotion.times_used = 3;
        let mut deactivated = promotion.clone();
        deactivated.is_active = false;
        let brand = brand_for(&promotion);

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![promotion.clone()]])
            .append_query_results([vec![deactivated]])
            .append_query_results([vec![brand]])
            .into_connection();

        let result = service(db).delete(promotion.id).await.unwrap();
        assert!(matches!(result.outcome, DeleteOutcome::Deactivated));
        let kept = result.promotion.unwrap();
        assert!(!kept.is_active);
        assert_eq!(kept.times_used, 3);
        assert_eq!(kept.metrics.computed_status, PromotionStatus::Inactive);
        assert_eq!(kept.brand_name.as_deref(), Some("Acme"));
    }

    #[tokio::test]
    async fn test_validate_unknown_code_is_not_found() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<promotions::Model>::new()])
            .into_connection();

        let req = ValidatePromotionRequest {
            code: "nope10".to_string(),
            user_id: None,
            brand_id: None,
        };
        assert!(matches!(
            service(db).validate_code(req).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_validate_expired_code_reports_reason() {
        // 有效期 2024-01-01 ~ 2024-01-10，已过期
        let promotion = sample_promotion();
        let brand = brand_for(&promotion);
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![promotion.clone()]])
            .append_query_results([vec![brand]])
            .into_connection();

        let req = ValidatePromotionRequest {
            code: " summer10 ".to_string(),
            user_id: Some("customer-1".to_string()),
            brand_id: Some(promotion.brand_id),
        };
        let result = service(db).validate_code(req).await.unwrap();

        assert!(!result.valid);
        assert_eq!(result.reasons, vec!["Promotion expired on 2024-01-10".to_string()]);
        assert_eq!(result.user_usage_check, "not_implemented");
        let enriched = result.promotion.unwrap();
        assert_eq!(enriched.times_used, 0);
        assert_eq!(enriched.metrics.computed_status, PromotionStatus::Expired);
    }

    #[tokio::test]
    async fn test_create_with_duplicate_code_is_conflict() {
        let existing = sample_promotion();
        let brand = brand_for(&existing);
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![brand.clone()]])
            .append_query_results([vec![existing.clone()]])
            .into_connection();

        let req = CreatePromotionRequest {
            brand_id: brand.id,
            code: Some("summer10".to_string()),
            auto_generate_code: false,
            code_prefix: None,
            description: String::new(),
            discount_percent: 10,
            valid_from: existing.valid_from,
            valid_until: existing.valid_until,
            is_active: None,
            usage_limit: None,
        };
        assert!(matches!(
            service(db).create(&admin(), req).await,
            Err(AppError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_create_clamps_discount_and_normalizes_code() {
        let template = sample_promotion();
        let brand = brand_for(&template);
        let mut stored = template.clone();
        stored.code = "WINTER24".to_string();
        stored.discount_percent = 100;

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![brand.clone()]])
            .append_query_results([Vec::<promotions::Model>::new()])
            .append_query_results([vec![stored]])
            .into_connection();

        let req = CreatePromotionRequest {
            brand_id: brand.id,
            code: Some(" winter24 ".to_string()),
            auto_generate_code: false,
            code_prefix: None,
            description: "Winter".to_string(),
            discount_percent: 250,
            valid_from: template.valid_from,
            valid_until: template.valid_until,
            is_active: Some(true),
            usage_limit: Some(0),
        };
        let created = service(db).create(&admin(), req).await.unwrap();
        assert_eq!(created.code, "WINTER24");
        assert_eq!(created.discount_percent, 100);
        assert_eq!(created.brand_name.as_deref(), Some("Acme"));
    }

    #[tokio::test]
    async fn test_create_rejects_inverted_window_before_touching_store() {
        let template = sample_promotion();
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();

        let req = CreatePromotionRequest {
            brand_id: template.brand_id,
            code: Some("WINTER24".to_string()),
            auto_generate_code: false,
            code_prefix: None,
            description: String::new(),
            discount_percent: 10,
            valid_from: template.valid_until,
            valid_until: template.valid_from,
            is_active: None,
            usage_limit: None,
        };
        assert!(matches!(
            service(db).create(&admin(), req).await,
            Err(AppError::ValidationError(_))
        ));
    }

    #[tokio::test]
    async fn test_toggle_flips_active_flag() {
        let promotion = sample_promotion();
        let mut flipped = promotion.clone();
        flipped.is_active = false;
        let brand = brand_for(&promotion);

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![promotion.clone()]])
            .append_query_results([vec![flipped]])
            .append_query_results([vec![brand]])
            .into_connection();

        let toggled = service(db).toggle(promotion.id, None).await.unwrap();
        assert!(!toggled.is_active);
        assert_eq!(toggled.metrics.computed_status, PromotionStatus::Inactive);
    }

    #[tokio::test]
    async fn test_update_clamps_discount_before_writing() {
        let existing = sample_promotion();
        let mut stored = existing.clone();
        stored.discount_percent = 100;
        let brand = brand_for(&existing);

        let db: DbPool = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([vec![existing.clone()]])
                .append_query_results([vec![stored]])
                .append_query_results([vec![brand]])
                .into_connection(),
        );
        let service = PromotionService::new(
            db.clone(),
            BrandService::new(db.clone()),
            PromotionConfig::default(),
        );

        let req = UpdatePromotionRequest {
            discount_percent: Some(150),
            ..Default::default()
        };
        let updated = service.update(existing.id, req).await.unwrap();
        assert_eq!(updated.discount_percent, 100);
        assert_eq!(updated.code, existing.code);

        drop(service);
        let log = match Arc::try_unwrap(db) {
            Ok(conn) => conn.into_transaction_log(),
            Err(_) => panic!("connection still shared"),
        };
        // 第二条语句为 UPDATE，写入的是限制后的折扣
        let written = format!("{:?}", log[1]);
        assert!(written.contains("Int(Some(100))"));
        assert!(!written.contains("Int(Some(150))"));
    }
}
