use crate::entities::{brand_entity as brands, promotion_entity as promotions};
use crate::database::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::{
    BulkCreateError, BulkCreatePromotionsRequest, BulkCreatePromotionsResponse,
    BulkExtendItemResult, BulkExtendPromotionsRequest, BulkExtendPromotionsResponse,
};
use crate::services::{BrandService, PromotionService, filter_condition, new_active_model};
use crate::utils::{
    AuthUser, Extension, clamp_discount, generate_unique_with, promotion_code_exists, random_code,
    render_template, sanitize_affix, timestamped_code, validate_code_format, validate_usage_limit,
    validate_window,
};
use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DbErr, EntityTrait, QueryFilter, QueryOrder, QuerySelect,
};
use std::collections::{HashMap, HashSet};
use std::future::Future;
use uuid::Uuid;

pub const MAX_COUNT_PER_BRAND: u32 = 100;
pub const MAX_BULK_EXTEND_TARGETS: usize = 500;

/// 批量创建时每条记录共用的字段
#[derive(Debug, Clone)]
pub struct DraftTemplate {
    pub description: String,
    pub discount_percent: i32,
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
    pub usage_limit: Option<i32>,
    pub is_active: bool,
    pub created_by: Option<String>,
}

/// 促销码来源
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodeMode {
    /// 自动生成: 首次尝试用时间戳码，撞码后改用随机码
    Auto { prefix: String },
    /// 调用方模板 ({BRAND} / {N})
    Template(String),
}

impl CodeMode {
    fn from_request(req: &BulkCreatePromotionsRequest) -> AppResult<Self> {
        let template = req
            .code_template
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty());
        match (req.auto_generate_codes, template) {
            (true, None) => Ok(CodeMode::Auto {
                prefix: sanitize_affix(req.code_prefix.as_deref())?,
            }),
            (false, Some(template)) => Ok(CodeMode::Template(template.to_string())),
            (true, Some(_)) => Err(AppError::ValidationError(
                "Use either auto_generate_codes or code_template, not both".to_string(),
            )),
            (false, None) => Err(AppError::ValidationError(
                "Either auto_generate_codes or code_template is required".to_string(),
            )),
        }
    }
}

/// 待写入的促销码及其在品牌内的序号 (从 1 开始)
#[derive(Debug, Clone)]
pub struct PlannedDraft {
    pub index: u32,
    pub promotion: promotions::Model,
}

/// 生成参数
#[derive(Debug, Clone, Copy)]
pub struct PlanOptions {
    pub count_per_brand: u32,
    pub timestamp_millis: i64,
    pub code_length: usize,
    pub max_attempts: u32,
}

fn item_error(brand: &brands::Model, index: u32, code: Option<String>, error: String) -> BulkCreateError {
    BulkCreateError {
        brand_id: brand.id.to_string(),
        index,
        code,
        error,
    }
}

/// 为每个品牌生成 `count_per_brand` 条草稿。
/// 单条失败 (撞码、生成失败、查询失败) 只记入错误列表，不中断其余条目。
/// 批内重复由 `seen` 拦截，库内重复由 `exists` 判定。
pub async fn plan_drafts<E, Fut>(
    brands: &[brands::Model],
    mode: &CodeMode,
    template: &DraftTemplate,
    options: PlanOptions,
    mut exists: E,
) -> (Vec<PlannedDraft>, Vec<BulkCreateError>)
where
    E: FnMut(String) -> Fut,
    Fut: Future<Output = AppResult<bool>>,
{
    let mut drafts = Vec::new();
    let mut errors = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    for brand in brands {
        let tag = brand.code_tag();
        for n in 1..=options.count_per_brand {
            let outcome: Result<String, (Option<String>, AppError)> = match mode {
                CodeMode::Auto { prefix } => {
                    let random_prefix = format!("{prefix}{tag}");
                    generate_unique_with(
                        |attempt| {
                            if attempt == 1 {
                                timestamped_code(prefix, &tag, options.timestamp_millis, n)
                            } else {
                                random_code(&random_prefix, "", options.code_length)
                            }
                        },
                        |code| {
                            let in_batch = seen.contains(&code);
                            let lookup = exists(code);
                            async move { if in_batch { Ok(true) } else { lookup.await } }
                        },
                        options.max_attempts,
                    )
                    .await
                    .map_err(|e| (None, e))
                }
                CodeMode::Template(tpl) => {
                    let code = render_template(tpl, &tag, n, options.count_per_brand);
                    let checked = if let Err(e) = validate_code_format(&code) {
                        Err(e)
                    } else if seen.contains(&code) {
                        Err(AppError::Conflict(format!(
                            "Promotion code {code} is duplicated within the batch"
                        )))
                    } else {
                        match exists(code.clone()).await {
                            Ok(true) => Err(AppError::Conflict(format!(
                                "Promotion code {code} already exists"
                            ))),
                            Ok(false) => Ok(()),
                            Err(e) => Err(e),
                        }
                    };
                    checked.map(|()| code.clone()).map_err(|e| (Some(code), e))
                }
            };

            match outcome {
                Ok(code) => {
                    seen.insert(code.clone());
                    let now = Utc::now();
                    let promotion = promotions::Model {
                        id: Uuid::new_v4(),
                        brand_id: brand.id,
                        code,
                        description: template.description.clone(),
                        discount_percent: template.discount_percent,
                        valid_from: template.valid_from,
                        valid_until: template.valid_until,
                        is_active: template.is_active,
                        usage_limit: template.usage_limit,
                        times_used: 0,
                        created_by: template.created_by.clone(),
                        created_at: Some(now),
                        updated_at: Some(now),
                    };
                    drafts.push(PlannedDraft {
                        index: n,
                        promotion,
                    });
                }
                Err((code, e)) => errors.push(item_error(brand, n, code, e.to_string())),
            }
        }
    }

    (drafts, errors)
}

/// 逐条写入，失败的条目记入错误列表并继续处理其余条目
pub async fn insert_each<F, Fut>(
    drafts: Vec<PlannedDraft>,
    mut insert: F,
    errors: &mut Vec<BulkCreateError>,
) -> Vec<promotions::Model>
where
    F: FnMut(&promotions::Model) -> Fut,
    Fut: Future<Output = Result<promotions::Model, DbErr>>,
{
    let mut created = Vec::with_capacity(drafts.len());
    for draft in drafts {
        match insert(&draft.promotion).await {
            Ok(model) => created.push(model),
            Err(e) => errors.push(BulkCreateError {
                brand_id: draft.promotion.brand_id.to_string(),
                index: draft.index,
                code: Some(draft.promotion.code.clone()),
                error: AppError::from_write_error(e, &draft.promotion.code).to_string(),
            }),
        }
    }
    created
}

pub fn summarize_extend(results: Vec<BulkExtendItemResult>) -> BulkExtendPromotionsResponse {
    let succeeded = results.iter().filter(|r| r.success).count() as i64;
    let total = results.len() as i64;
    BulkExtendPromotionsResponse {
        total,
        succeeded,
        failed: total - succeeded,
        results,
    }
}

#[derive(Clone)]
pub struct PromotionBulkService {
    pool: DbPool,
    brand_service: BrandService,
    promotion_service: PromotionService,
    code_length: usize,
    max_attempts: u32,
}

impl PromotionBulkService {
    pub fn new(
        pool: DbPool,
        brand_service: BrandService,
        promotion_service: PromotionService,
        code_length: usize,
        max_attempts: u32,
    ) -> Self {
        Self {
            pool,
            brand_service,
            promotion_service,
            code_length,
            max_attempts,
        }
    }

    /// 批量创建
    /// 1. 校验公共字段与生成方式
    /// 2. 解析品牌 (非法/不存在的品牌记为错误)
    /// 3. 逐条生成草稿
    /// 4. insert_many 一次写入；若遇到并发撞码则逐条重试
    pub async fn bulk_create(
        &self,
        user: &AuthUser,
        req: BulkCreatePromotionsRequest,
    ) -> AppResult<BulkCreatePromotionsResponse> {
        let count_per_brand = req.count_per_brand.unwrap_or(1);
        if !(1..=MAX_COUNT_PER_BRAND).contains(&count_per_brand) {
            return Err(AppError::ValidationError(format!(
                "count_per_brand must be between 1 and {MAX_COUNT_PER_BRAND}"
            )));
        }
        if req.brands.is_empty() {
            return Err(AppError::ValidationError("brands must not be empty".to_string()));
        }
        validate_window(req.valid_from, req.valid_until)?;
        let usage_limit = validate_usage_limit(req.usage_limit)?;
        let mode = CodeMode::from_request(&req)?;

        let selection = self.brand_service.resolve_selection(&req.brands).await?;
        let mut errors: Vec<BulkCreateError> = selection
            .rejected
            .iter()
            .map(|(brand_id, error)| BulkCreateError {
                brand_id: brand_id.clone(),
                index: 0,
                code: None,
                error: error.clone(),
            })
            .collect();

        let template = DraftTemplate {
            description: req.description.trim().to_string(),
            discount_percent: clamp_discount(req.discount_percent),
            valid_from: req.valid_from,
            valid_until: req.valid_until,
            usage_limit,
            is_active: req.is_active.unwrap_or(true),
            created_by: Some(user.user_id.clone()),
        };
        let options = PlanOptions {
            count_per_brand,
            timestamp_millis: Utc::now().timestamp_millis(),
            code_length: self.code_length,
            max_attempts: self.max_attempts,
        };

        let pool = self.pool.as_ref();
        let (drafts, draft_errors) = plan_drafts(
            &selection.brands,
            &mode,
            &template,
            options,
            |code| async move { promotion_code_exists(pool, &code).await },
        )
        .await;
        errors.extend(draft_errors);

        let created = self.insert_drafts(drafts, &mut errors).await?;

        let brand_names: HashMap<Uuid, String> = selection
            .brands
            .iter()
            .map(|b| (b.id, b.name.clone()))
            .collect();
        let promotions: Vec<_> = created
            .into_iter()
            .map(|m| {
                let name = brand_names.get(&m.brand_id).cloned();
                self.promotion_service.respond(m, name)
            })
            .collect();

        let requested =
            ((selection.brands.len() + selection.rejected.len()) as i64) * i64::from(count_per_brand);
        let created_count = promotions.len() as i64;
        let failed_count = requested - created_count;

        if errors.is_empty() {
            log::info!("Bulk created {created_count} promotions by {}", user.user_id);
        } else {
            log::warn!(
                "Bulk create by {}: {created_count} created, {failed_count} failed",
                user.user_id
            );
        }

        Ok(BulkCreatePromotionsResponse {
            requested,
            created_count,
            failed_count,
            partial_success: created_count > 0 && failed_count > 0,
            promotions,
            errors,
        })
    }

    async fn insert_drafts(
        &self,
        drafts: Vec<PlannedDraft>,
        errors: &mut Vec<BulkCreateError>,
    ) -> AppResult<Vec<promotions::Model>> {
        if drafts.is_empty() {
            return Ok(Vec::new());
        }

        let bulk = promotions::Entity::insert_many(drafts.iter().map(|d| new_active_model(&d.promotion)))
            .exec(self.pool.as_ref())
            .await;
        match bulk {
            Ok(_) => Ok(drafts.into_iter().map(|d| d.promotion).collect()),
            Err(err) if AppError::is_unique_violation(&err) => {
                log::warn!("Bulk insert hit a unique violation, retrying promotions one by one");
                let pool = self.pool.as_ref();
                Ok(insert_each(drafts, |draft| new_active_model(draft).insert(pool), errors).await)
            }
            Err(err) => Err(err.into()),
        }
    }

    /// 批量延期 (非原子，逐条独立处理)
    pub async fn bulk_extend(
        &self,
        req: BulkExtendPromotionsRequest,
    ) -> AppResult<BulkExtendPromotionsResponse> {
        let now = Utc::now();
        let extension = req.extension.to_extension(now)?;
        let ids = self.resolve_targets(&req, now).await?;

        let results = join_all(ids.into_iter().map(|id| self.extend_one(id, &extension))).await;
        let summary = summarize_extend(results);

        if summary.failed > 0 {
            log::warn!(
                "Bulk extend: {} succeeded, {} failed",
                summary.succeeded,
                summary.failed
            );
        } else {
            log::info!("Bulk extended {} promotions", summary.succeeded);
        }
        Ok(summary)
    }

    async fn resolve_targets(
        &self,
        req: &BulkExtendPromotionsRequest,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<Uuid>> {
        match (&req.promotion_ids, &req.filter) {
            (Some(_), Some(_)) => Err(AppError::ValidationError(
                "Use either promotion_ids or filter, not both".to_string(),
            )),
            (Some(ids), None) => {
                if ids.is_empty() {
                    return Err(AppError::ValidationError(
                        "promotion_ids must not be empty".to_string(),
                    ));
                }
                if ids.len() > MAX_BULK_EXTEND_TARGETS {
                    return Err(AppError::ValidationError(format!(
                        "At most {MAX_BULK_EXTEND_TARGETS} promotions can be extended at once"
                    )));
                }
                let mut unique = Vec::with_capacity(ids.len());
                for id in ids {
                    if !unique.contains(id) {
                        unique.push(*id);
                    }
                }
                Ok(unique)
            }
            (None, Some(filter)) => {
                let models = promotions::Entity::find()
                    .filter(filter_condition(filter, now)?)
                    .order_by_asc(promotions::Column::ValidUntil)
                    .limit(MAX_BULK_EXTEND_TARGETS as u64)
                    .all(self.pool.as_ref())
                    .await?;
                Ok(models.into_iter().map(|m| m.id).collect())
            }
            (None, None) => Err(AppError::ValidationError(
                "Either promotion_ids or filter is required".to_string(),
            )),
        }
    }

    async fn extend_one(&self, id: Uuid, extension: &Extension) -> BulkExtendItemResult {
        let promotion = match self.promotion_service.find_model(id).await {
            Ok(p) => p,
            Err(e) => {
                return BulkExtendItemResult {
                    id,
                    code: None,
                    success: false,
                    old_valid_until: None,
                    new_valid_until: None,
                    error: Some(e.to_string()),
                };
            }
        };

        let code = promotion.code.clone();
        let old_valid_until = promotion.valid_until;
        match self.promotion_service.apply_extension(promotion, extension).await {
            Ok(updated) => BulkExtendItemResult {
                id,
                code: Some(code),
                success: true,
                old_valid_until: Some(old_valid_until),
                new_valid_until: Some(updated.valid_until),
                error: None,
            },
            Err(e) => BulkExtendItemResult {
                id,
                code: Some(code),
                success: false,
                old_valid_until: Some(old_valid_until),
                new_valid_until: None,
                error: Some(e.to_string()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::promotion_metrics::fixtures::at;
    use crate::models::ExtendPromotionRequest;
    use crate::utils::promotion_metrics::fixtures::sample_promotion;
    use chrono::Duration;
    use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase, MockExecResult};
    use std::sync::Arc;

    fn brand(name: &str) -> brands::Model {
        brands::Model {
            id: Uuid::new_v4(),
            name: name.to_string(),
            slug: name.to_lowercase(),
            is_active: true,
            created_at: None,
        }
    }

    fn template() -> DraftTemplate {
        DraftTemplate {
            description: "Spring".to_string(),
            discount_percent: 15,
            valid_from: at(2024, 3, 1),
            valid_until: at(2024, 3, 31),
            usage_limit: Some(100),
            is_active: true,
            created_by: Some("admin-1".to_string()),
        }
    }

    fn bulk_service(db: DatabaseConnection) -> PromotionBulkService {
        let db: DbPool = Arc::new(db);
        let brand_service = BrandService::new(db.clone());
        let promotion_service =
            PromotionService::new(db.clone(), brand_service.clone(), Default::default());
        PromotionBulkService::new(db, brand_service, promotion_service, 8, 5)
    }

    fn admin() -> AuthUser {
        AuthUser {
            user_id: "admin-1".to_string(),
            role: crate::utils::ROLE_ADMIN.to_string(),
        }
    }

    fn auto_request(brands: Vec<String>, count_per_brand: u32) -> BulkCreatePromotionsRequest {
        BulkCreatePromotionsRequest {
            brands,
            count_per_brand: Some(count_per_brand),
            auto_generate_codes: true,
            code_prefix: None,
            code_template: None,
            description: "Spring".to_string(),
            discount_percent: 120,
            valid_from: at(2024, 3, 1),
            valid_until: at(2024, 3, 31),
            usage_limit: None,
            is_active: None,
        }
    }

    fn options(count_per_brand: u32) -> PlanOptions {
        PlanOptions {
            count_per_brand,
            timestamp_millis: 1_709_251_200_000,
            code_length: 8,
            max_attempts: 5,
        }
    }

    #[tokio::test]
    async fn test_two_brands_two_auto_codes_each() {
        let brands = vec![brand("Acme"), brand("Zeta")];
        let mode = CodeMode::Auto {
            prefix: "SPR".to_string(),
        };

        let (drafts, errors) =
            plan_drafts(&brands, &mode, &template(), options(2), |_| async { Ok(false) }).await;

        assert!(errors.is_empty());
        assert_eq!(drafts.len(), 4);
        let codes: HashSet<_> = drafts.iter().map(|d| d.promotion.code.clone()).collect();
        assert_eq!(codes.len(), 4);
        assert!(drafts.iter().all(|d| d.promotion.code.starts_with("SPR")));
        assert!(drafts
            .iter()
            .all(|d| d.promotion.times_used == 0 && d.promotion.discount_percent == 15));
        assert_eq!(drafts.iter().filter(|d| d.promotion.brand_id == brands[0].id).count(), 2);
        let indexes: Vec<_> = drafts.iter().map(|d| d.index).collect();
        assert_eq!(indexes, vec![1, 2, 1, 2]);
    }

    #[tokio::test]
    async fn test_same_brand_tag_falls_back_to_random_code() {
        // 两个品牌标识相同，时间戳码在批内撞车后改用随机码
        let brands = vec![brand("Acme"), brand("ACME Outlet")];
        let mode = CodeMode::Auto {
            prefix: String::new(),
        };

        let (drafts, errors) =
            plan_drafts(&brands, &mode, &template(), options(1), |_| async { Ok(false) }).await;

        assert!(errors.is_empty());
        assert_eq!(drafts.len(), 2);
        assert_ne!(drafts[0].promotion.code, drafts[1].promotion.code);
    }

    #[tokio::test]
    async fn test_exhausted_generation_is_item_error() {
        let brands = vec![brand("Acme")];
        let mode = CodeMode::Auto {
            prefix: String::new(),
        };

        let (drafts, errors) =
            plan_drafts(&brands, &mode, &template(), options(2), |_| async { Ok(true) }).await;

        assert!(drafts.is_empty());
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].index, 1);
        assert_eq!(errors[1].index, 2);
        assert!(errors[0].error.contains("Code generation failed"));
    }

    #[tokio::test]
    async fn test_template_collisions_become_item_errors() {
        let brands = vec![brand("Acme")];
        let mode = CodeMode::Template("{BRAND}-SPRING".to_string());
        let taken = "ACME-SPRING-2".to_string();

        let (drafts, errors) = plan_drafts(&brands, &mode, &template(), options(3), |code| {
            let hit = code == taken;
            async move { Ok(hit) }
        })
        .await;

        let codes: Vec<_> = drafts.iter().map(|d| d.promotion.code.as_str()).collect();
        assert_eq!(codes, vec!["ACME-SPRING-1", "ACME-SPRING-3"]);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].index, 2);
        assert_eq!(errors[0].code.as_deref(), Some("ACME-SPRING-2"));
        assert!(errors[0].error.contains("already exists"));
    }

    #[tokio::test]
    async fn test_template_without_counter_duplicates_within_batch() {
        // 同名品牌生成同一模板码
        let brands = vec![brand("Acme"), brand("Acme")];
        let mode = CodeMode::Template("{BRAND}10".to_string());

        let (drafts, errors) =
            plan_drafts(&brands, &mode, &template(), options(1), |_| async { Ok(false) }).await;

        assert_eq!(drafts.len(), 1);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].error.contains("within the batch"));
        assert_eq!(errors[0].brand_id, brands[1].id.to_string());
    }

    #[test]
    fn test_code_mode_must_be_exclusive() {
        let mut req = BulkCreatePromotionsRequest {
            brands: vec!["all".to_string()],
            count_per_brand: None,
            auto_generate_codes: true,
            code_prefix: Some("spr".to_string()),
            code_template: Some("{BRAND}".to_string()),
            description: String::new(),
            discount_percent: 10,
            valid_from: at(2024, 3, 1),
            valid_until: at(2024, 3, 31),
            usage_limit: None,
            is_active: None,
        };
        assert!(CodeMode::from_request(&req).is_err());

        req.code_template = None;
        assert_eq!(
            CodeMode::from_request(&req).unwrap(),
            CodeMode::Auto {
                prefix: "SPR".to_string()
            }
        );

        req.auto_generate_codes = false;
        assert!(CodeMode::from_request(&req).is_err());
    }

    #[test]
    fn test_summarize_extend() {
        let ok = BulkExtendItemResult {
            id: Uuid::new_v4(),
            code: Some("A".to_string()),
            success: true,
            old_valid_until: Some(at(2024, 1, 1)),
            new_valid_until: Some(at(2024, 1, 8)),
            error: None,
        };
        let failed = BulkExtendItemResult {
            id: Uuid::new_v4(),
            code: None,
            success: false,
            old_valid_until: None,
            new_valid_until: None,
            error: Some("Not found".to_string()),
        };
        let summary = summarize_extend(vec![ok, failed]);
        assert_eq!(summary.total, 2);
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.failed, 1);
    }

    #[tokio::test]
    async fn test_bulk_extend_requires_targets() {
        let service = bulk_service(MockDatabase::new(DatabaseBackend::Postgres).into_connection());

        let req = BulkExtendPromotionsRequest {
            promotion_ids: None,
            filter: None,
            extension: ExtendPromotionRequest {
                new_date: None,
                days: Some(7),
                hours: None,
            },
        };
        assert!(matches!(
            service.bulk_extend(req).await,
            Err(AppError::ValidationError(_))
        ));
    }

    #[tokio::test]
    async fn test_insert_each_keeps_brand_index_on_failure() {
        let brand_id = Uuid::new_v4();
        let drafts: Vec<PlannedDraft> = ["ACME-1", "ACME-2", "ACME-3"]
            .iter()
            .zip(1..)
            .map(|(code, index)| {
                let mut promotion = sample_promotion();
                promotion.brand_id = brand_id;
                promotion.code = code.to_string();
                PlannedDraft { index, promotion }
            })
            .collect();

        let mut errors = Vec::new();
        let created = insert_each(
            drafts,
            |draft| {
                let result = if draft.code == "ACME-2" {
                    Err(DbErr::Custom("insert failed".to_string()))
                } else {
                    Ok(draft.clone())
                };
                async move { result }
            },
            &mut errors,
        )
        .await;

        let codes: Vec<_> = created.iter().map(|p| p.code.as_str()).collect();
        assert_eq!(codes, vec!["ACME-1", "ACME-3"]);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].index, 2);
        assert_eq!(errors[0].brand_id, brand_id.to_string());
        assert_eq!(errors[0].code.as_deref(), Some("ACME-2"));
    }

    #[tokio::test]
    async fn test_bulk_create_counts_rejected_brand_as_failed() {
        let acme = brand("Acme");
        let missing = Uuid::new_v4();
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![acme.clone()]])
            .append_query_results([
                Vec::<promotions::Model>::new(),
                Vec::<promotions::Model>::new(),
            ])
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 2,
            }])
            .into_connection();

        let req = auto_request(vec![acme.id.to_string(), missing.to_string()], 2);
        let result = bulk_service(db).bulk_create(&admin(), req).await.unwrap();

        assert_eq!(result.requested, 4);
        assert_eq!(result.created_count, 2);
        assert_eq!(result.failed_count, 2);
        assert!(result.partial_success);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].brand_id, missing.to_string());
        assert_eq!(result.errors[0].index, 0);
        assert!(result.promotions.iter().all(|p| p.discount_percent == 100));
        assert!(result
            .promotions
            .iter()
            .all(|p| p.brand_name.as_deref() == Some("Acme")));
    }

    #[tokio::test]
    async fn test_bulk_create_propagates_other_store_errors() {
        let acme = brand("Acme");
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![acme.clone()]])
            .append_query_results([Vec::<promotions::Model>::new()])
            .append_exec_errors([DbErr::Custom("connection reset".to_string())])
            .into_connection();

        let req = auto_request(vec![acme.id.to_string()], 1);
        assert!(matches!(
            bulk_service(db).bulk_create(&admin(), req).await,
            Err(AppError::DatabaseError(_))
        ));
    }

    #[tokio::test]
    async fn test_bulk_extend_reports_missing_item_without_rollback() {
        let found = sample_promotion();
        let mut extended = found.clone();
        extended.valid_until = found.valid_until + Duration::days(7);
        let missing = Uuid::new_v4();

        // join_all 按顺序轮询: 先完成 found 的查询与更新，再查询 missing
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![found.clone()]])
            .append_query_results([vec![extended.clone()]])
            .append_query_results([Vec::<promotions::Model>::new()])
            .into_connection();

        let req = BulkExtendPromotionsRequest {
            promotion_ids: Some(vec![found.id, missing]),
            filter: None,
            extension: ExtendPromotionRequest {
                new_date: None,
                days: Some(7),
                hours: None,
            },
        };
        let summary = bulk_service(db).bulk_extend(req).await.unwrap();

        assert_eq!(summary.total, 2);
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.failed, 1);
        let ok = &summary.results[0];
        assert!(ok.success);
        assert_eq!(ok.old_valid_until, Some(found.valid_until));
        assert_eq!(ok.new_valid_until, Some(extended.valid_until));
        let failed = &summary.results[1];
        assert_eq!(failed.id, missing);
        assert!(!failed.success);
        assert!(failed.error.as_deref().unwrap_or_default().contains("not found"));
    }
}
