use crate::error::{AppError, AppResult};
use crate::models::*;
use crate::services::{PromotionAnalyticsService, PromotionBulkService, PromotionService};
use crate::utils::AuthUser;
use actix_web::{HttpMessage, HttpRequest, HttpResponse, ResponseError, Result, web};
use serde::de::DeserializeOwned;
use uuid::Uuid;

/// 从请求扩展中获取当前用户（中间件在鉴权后注入）
pub fn current_user(req: &HttpRequest) -> Option<AuthUser> {
    req.extensions().get::<AuthUser>().cloned()
}

/// 管理接口: 未登录 401，非管理员 403
pub fn require_admin(req: &HttpRequest) -> AppResult<AuthUser> {
    let user = current_user(req)
        .ok_or_else(|| AppError::AuthError("Missing access token".to_string()))?;
    if !user.is_admin() {
        return Err(AppError::Forbidden);
    }
    Ok(user)
}

/// 可选请求体: 空 body 视为未传，格式错误返回 400
pub fn optional_json<T: DeserializeOwned>(body: &[u8]) -> AppResult<Option<T>> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    serde_json::from_slice(body)
        .map(Some)
        .map_err(|e| AppError::ValidationError(format!("Invalid request body: {e}")))
}

#[utoipa::path(
    get,
    path = "/promotions",
    tag = "promotions",
    params(
        ("page" = Option<u32>, Query, description = "页码 (默认1)"),
        ("per_page" = Option<u32>, Query, description = "每页数量 (默认20，最大100)"),
        ("brand_id" = Option<Uuid>, Query, description = "品牌ID"),
        ("status" = Option<String>, Query, description = "scheduled / active / expired / inactive"),
        ("search" = Option<String>, Query, description = "按 code / description 搜索")
    ),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "获取促销码列表成功", body = PaginatedPromotionResponse),
        (status = 400, description = "参数错误"),
        (status = 401, description = "未授权"),
        (status = 403, description = "需要管理员权限")
    )
)]
/// 分页查询促销码（按创建时间倒序）
pub async fn list_promotions(
    service: web::Data<PromotionService>,
    req: HttpRequest,
    query: web::Query<PromotionListQuery>,
) -> Result<HttpResponse> {
    if let Err(e) = require_admin(&req) {
        return Ok(e.error_response());
    }
    match service.list(&query.into_inner()).await {
        Ok(page) => Ok(HttpResponse::Ok().json(ApiResponse::success(page))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/promotions",
    tag = "promotions",
    request_body = CreatePromotionRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 201, description = "创建成功", body = PromotionResponse),
        (status = 400, description = "参数错误"),
        (status = 404, description = "品牌不存在"),
        (status = 409, description = "促销码已存在")
    )
)]
/// 创建促销码（手动指定或自动生成 code）
pub async fn create_promotion(
    service: web::Data<PromotionService>,
    req: HttpRequest,
    body: web::Json<CreatePromotionRequest>,
) -> Result<HttpResponse> {
    let user = match require_admin(&req) {
        Ok(user) => user,
        Err(e) => return Ok(e.error_response()),
    };
    match service.create(&user, body.into_inner()).await {
        Ok(data) => Ok(HttpResponse::Created().json(ApiResponse::success(data))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/promotions/{id}",
    tag = "promotions",
    params(("id" = Uuid, Path, description = "促销码ID")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "获取成功", body = PromotionResponse),
        (status = 404, description = "促销码不存在")
    )
)]
pub async fn get_promotion(
    service: web::Data<PromotionService>,
    req: HttpRequest,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    if let Err(e) = require_admin(&req) {
        return Ok(e.error_response());
    }
    match service.get(path.into_inner()).await {
        Ok(data) => Ok(HttpResponse::Ok().json(ApiResponse::success(data))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    put,
    path = "/promotions/{id}",
    tag = "promotions",
    params(("id" = Uuid, Path, description = "促销码ID")),
    request_body = UpdatePromotionRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "更新成功", body = PromotionResponse),
        (status = 400, description = "参数错误"),
        (status = 404, description = "促销码不存在"),
        (status = 409, description = "促销码已存在")
    )
)]
pub async fn update_promotion(
    service: web::Data<PromotionService>,
    req: HttpRequest,
    path: web::Path<Uuid>,
    body: web::Json<UpdatePromotionRequest>,
) -> Result<HttpResponse> {
    if let Err(e) = require_admin(&req) {
        return Ok(e.error_response());
    }
    match service.update(path.into_inner(), body.into_inner()).await {
        Ok(data) => Ok(HttpResponse::Ok().json(ApiResponse::success(data))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    delete,
    path = "/promotions/{id}",
    tag = "promotions",
    params(("id" = Uuid, Path, description = "促销码ID")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "已删除或已停用", body = DeletePromotionResponse),
        (status = 404, description = "促销码不存在")
    )
)]
/// 删除促销码；已被使用过的只会停用
pub async fn delete_promotion(
    service: web::Data<PromotionService>,
    req: HttpRequest,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    if let Err(e) = require_admin(&req) {
        return Ok(e.error_response());
    }
    match service.delete(path.into_inner()).await {
        Ok(data) => Ok(HttpResponse::Ok().json(ApiResponse::success(data))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    patch,
    path = "/promotions/{id}/toggle",
    tag = "promotions",
    params(("id" = Uuid, Path, description = "促销码ID")),
    request_body = TogglePromotionRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "切换成功", body = PromotionResponse),
        (status = 404, description = "促销码不存在")
    )
)]
pub async fn toggle_promotion(
    service: web::Data<PromotionService>,
    req: HttpRequest,
    path: web::Path<Uuid>,
    body: web::Bytes,
) -> Result<HttpResponse> {
    if let Err(e) = require_admin(&req) {
        return Ok(e.error_response());
    }
    let body = match optional_json::<TogglePromotionRequest>(&body) {
        Ok(body) => body,
        Err(e) => return Ok(e.error_response()),
    };
    match service.toggle(path.into_inner(), body).await {
        Ok(data) => Ok(HttpResponse::Ok().json(ApiResponse::success(data))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    patch,
    path = "/promotions/{id}/extend",
    tag = "promotions",
    params(("id" = Uuid, Path, description = "促销码ID")),
    request_body = ExtendPromotionRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "延期成功", body = PromotionResponse),
        (status = 400, description = "参数错误"),
        (status = 404, description = "促销码不存在")
    )
)]
/// 延期: 指定 new_date 或在当前到期时间上增加 days / hours
pub async fn extend_promotion(
    service: web::Data<PromotionService>,
    req: HttpRequest,
    path: web::Path<Uuid>,
    body: web::Json<ExtendPromotionRequest>,
) -> Result<HttpResponse> {
    if let Err(e) = require_admin(&req) {
        return Ok(e.error_response());
    }
    match service.extend(path.into_inner(), body.into_inner()).await {
        Ok(data) => Ok(HttpResponse::Ok().json(ApiResponse::success(data))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/promotions/{id}/duplicate",
    tag = "promotions",
    params(("id" = Uuid, Path, description = "源促销码ID")),
    request_body = DuplicatePromotionRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 201, description = "复制成功", body = PromotionResponse),
        (status = 404, description = "促销码不存在"),
        (status = 409, description = "促销码已存在")
    )
)]
pub async fn duplicate_promotion(
    service: web::Data<PromotionService>,
    req: HttpRequest,
    path: web::Path<Uuid>,
    body: web::Bytes,
) -> Result<HttpResponse> {
    let user = match require_admin(&req) {
        Ok(user) => user,
        Err(e) => return Ok(e.error_response()),
    };
    let body = match optional_json::<DuplicatePromotionRequest>(&body) {
        Ok(body) => body.unwrap_or_default(),
        Err(e) => return Ok(e.error_response()),
    };
    match service.duplicate(&user, path.into_inner(), body).await {
        Ok(data) => Ok(HttpResponse::Created().json(ApiResponse::success(data))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/promotions/validate",
    tag = "promotions",
    request_body = ValidatePromotionRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "校验完成 (valid 表示能否使用)", body = ValidatePromotionResponse),
        (status = 401, description = "未授权"),
        (status = 404, description = "促销码不存在")
    )
)]
/// 校验促销码能否使用（任意登录用户，只读）
pub async fn validate_promotion(
    service: web::Data<PromotionService>,
    body: web::Json<ValidatePromotionRequest>,
) -> Result<HttpResponse> {
    match service.validate_code(body.into_inner()).await {
        Ok(data) => Ok(HttpResponse::Ok().json(ApiResponse::success(data))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/promotions/expiring",
    tag = "promotions",
    params(
        ("days" = Option<i64>, Query, description = "到期窗口天数 (默认7)"),
        ("brand_id" = Option<Uuid>, Query, description = "品牌ID")
    ),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "获取成功", body = ExpiringPromotionsResponse),
        (status = 400, description = "参数错误")
    )
)]
/// 即将到期的促销码（按到期时间升序）
pub async fn expiring_promotions(
    service: web::Data<PromotionService>,
    req: HttpRequest,
    query: web::Query<ExpiringPromotionsQuery>,
) -> Result<HttpResponse> {
    if let Err(e) = require_admin(&req) {
        return Ok(e.error_response());
    }
    match service.expiring(&query.into_inner()).await {
        Ok(data) => Ok(HttpResponse::Ok().json(ApiResponse::success(data))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/promotions/analytics",
    tag = "promotions",
    params(
        ("from" = Option<String>, Query, description = "创建时间起 (RFC3339)，默认30天前"),
        ("to" = Option<String>, Query, description = "创建时间止 (RFC3339)，默认当前"),
        ("brand_id" = Option<Uuid>, Query, description = "品牌ID")
    ),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "统计成功", body = PromotionAnalytics),
        (status = 400, description = "参数错误")
    )
)]
pub async fn promotion_analytics(
    service: web::Data<PromotionAnalyticsService>,
    req: HttpRequest,
    query: web::Query<PromotionAnalyticsQuery>,
) -> Result<HttpResponse> {
    if let Err(e) = require_admin(&req) {
        return Ok(e.error_response());
    }
    match service.analytics(&query.into_inner()).await {
        Ok(data) => Ok(HttpResponse::Ok().json(ApiResponse::success(data))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/promotions/bulk-create",
    tag = "promotions",
    request_body = BulkCreatePromotionsRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "批量创建完成 (可能部分成功)", body = BulkCreatePromotionsResponse),
        (status = 400, description = "参数错误")
    )
)]
/// 批量创建: 按品牌生成多个促销码，单条失败不影响其余
pub async fn bulk_create_promotions(
    service: web::Data<PromotionBulkService>,
    req: HttpRequest,
    body: web::Json<BulkCreatePromotionsRequest>,
) -> Result<HttpResponse> {
    let user = match require_admin(&req) {
        Ok(user) => user,
        Err(e) => return Ok(e.error_response()),
    };
    match service.bulk_create(&user, body.into_inner()).await {
        Ok(data) => Ok(HttpResponse::Ok().json(ApiResponse::success(data))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/promotions/bulk-extend",
    tag = "promotions",
    request_body = BulkExtendPromotionsRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "批量延期完成 (逐条结果)", body = BulkExtendPromotionsResponse),
        (status = 400, description = "参数错误")
    )
)]
pub async fn bulk_extend_promotions(
    service: web::Data<PromotionBulkService>,
    req: HttpRequest,
    body: web::Json<BulkExtendPromotionsRequest>,
) -> Result<HttpResponse> {
    if let Err(e) = require_admin(&req) {
        return Ok(e.error_response());
    }
    match service.bulk_extend(body.into_inner()).await {
        Ok(data) => Ok(HttpResponse::Ok().json(ApiResponse::success(data))),
        Err(e) => Ok(e.error_response()),
    }
}

/// 路由配置（固定路径需注册在 /{id} 之前）
pub fn promotion_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/promotions")
            .route("", web::get().to(list_promotions))
            .route("", web::post().to(create_promotion))
            .route("/validate", web::post().to(validate_promotion))
            .route("/expiring", web::get().to(expiring_promotions))
            .route("/analytics", web::get().to(promotion_analytics))
            .route("/bulk-create", web::post().to(bulk_create_promotions))
            .route("/bulk-extend", web::post().to(bulk_extend_promotions))
            .route("/{id}", web::get().to(get_promotion))
            .route("/{id}", web::put().to(update_promotion))
            .route("/{id}", web::delete().to(delete_promotion))
            .route("/{id}/toggle", web::patch().to(toggle_promotion))
            .route("/{id}/extend", web::patch().to(extend_promotion))
            .route("/{id}/duplicate", web::post().to(duplicate_promotion)),
    );
}
