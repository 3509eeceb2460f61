use crate::models::*;
use crate::services::BrandService;
use actix_web::{HttpResponse, ResponseError, Result, web};

#[utoipa::path(
    get,
    path = "/brands",
    tag = "brands",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "获取启用中的品牌成功", body = [BrandResponse]),
        (status = 401, description = "未授权")
    )
)]
/// 启用中的品牌（供管理后台表单选择）
pub async fn list_brands(service: web::Data<BrandService>) -> Result<HttpResponse> {
    match service.list_active().await {
        Ok(list) => Ok(HttpResponse::Ok().json(ApiResponse::success(list))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn brand_config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope("/brands").route("", web::get().to(list_brands)));
}
