use actix_web::web;
use utoipa::OpenApi;
use utoipa::{
    Modify,
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
};
use utoipa_swagger_ui::SwaggerUi;

use crate::handlers;
use crate::models::*;
use crate::utils::{PromotionMetrics, PromotionStatus, UrgencyLevel};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            )
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::promotion::list_promotions,
        handlers::promotion::create_promotion,
        handlers::promotion::get_promotion,
        handlers::promotion::update_promotion,
        handlers::promotion::delete_promotion,
        handlers::promotion::toggle_promotion,
        handlers::promotion::extend_promotion,
        handlers::promotion::duplicate_promotion,
        handlers::promotion::validate_promotion,
        handlers::promotion::expiring_promotions,
        handlers::promotion::promotion_analytics,
        handlers::promotion::bulk_create_promotions,
        handlers::promotion::bulk_extend_promotions,
        handlers::brand::list_brands,
    ),
    components(
        schemas(
            PromotionResponse,
            PromotionMetrics,
            PromotionStatus,
            UrgencyLevel,
            PromotionListQuery,
            PromotionFilter,
            PaginatedPromotionResponse,
            CreatePromotionRequest,
            UpdatePromotionRequest,
            TogglePromotionRequest,
            ExtendPromotionRequest,
            DuplicatePromotionRequest,
            DeleteOutcome,
            DeletePromotionResponse,
            ValidatePromotionRequest,
            ValidatePromotionResponse,
            ExpiringPromotionsQuery,
            ExpiringPromotionsResponse,
            UrgencyCounts,
            BulkCreatePromotionsRequest,
            BulkCreatePromotionsResponse,
            BulkCreateError,
            BulkExtendPromotionsRequest,
            BulkExtendPromotionsResponse,
            BulkExtendItemResult,
            PromotionAnalyticsQuery,
            PromotionAnalytics,
            StatusCounts,
            UsageStats,
            DiscountStats,
            TopPromotion,
            BrandBreakdown,
            BrandResponse,
            ErrorBody,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "promotions", description = "促销码管理与校验"),
        (name = "brands", description = "品牌")
    ),
    info(
        title = "Storefront Promotions API",
        version = "1.0.0",
        description = "Storefront promotion service REST API documentation"
    ),
    servers(
        (url = "/api/v1", description = "Local server")
    )
)]
pub struct ApiDoc;

pub fn swagger_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()),
    )
    .route(
        "/swagger-ui",
        web::get().to(|| async {
            actix_web::HttpResponse::Found()
                .append_header(("Location", "/swagger-ui/"))
                .finish()
        }),
    );
}
