use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entities::brand_entity as brands;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BrandResponse {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub is_active: bool,
}

impl From<brands::Model> for BrandResponse {
    fn from(m: brands::Model) -> Self {
        BrandResponse {
            id: m.id,
            name: m.name,
            slug: m.slug,
            is_active: m.is_active,
        }
    }
}
