use crate::entities::brand_entity as brands;
use crate::database::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::{ALL_BRANDS, BrandResponse};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use std::collections::HashMap;
use uuid::Uuid;

/// 批量创建时解析出的品牌集合
#[derive(Debug, Default)]
pub struct BrandSelection {
    pub brands: Vec<brands::Model>,
    /// (原始输入, 错误信息)
    pub rejected: Vec<(String, String)>,
}

#[derive(Clone)]
pub struct BrandService {
    pool: DbPool,
}

impl BrandService {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// 启用中的品牌 (按名称排序)
    pub async fn list_active(&self) -> AppResult<Vec<BrandResponse>> {
        let list = self.active_models().await?;
        Ok(list.into_iter().map(Into::into).collect())
    }

    pub async fn find(&self, id: Uuid) -> AppResult<brands::Model> {
        brands::Entity::find_by_id(id)
            .one(self.pool.as_ref())
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Brand {id} not found")))
    }

    pub async fn find_name(&self, id: Uuid) -> AppResult<Option<String>> {
        let brand = brands::Entity::find_by_id(id).one(self.pool.as_ref()).await?;
        Ok(brand.map(|b| b.name))
    }

    /// 批量查询品牌名称，用于列表/统计结果回填
    pub async fn names_for(&self, ids: &[Uuid]) -> AppResult<HashMap<Uuid, String>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let mut unique = ids.to_vec();
        unique.sort();
        unique.dedup();

        let list = brands::Entity::find()
            .filter(brands::Column::Id.is_in(unique))
            .all(self.pool.as_ref())
            .await?;
        Ok(list.into_iter().map(|b| (b.id, b.name)).collect())
    }

    /// 解析批量创建的品牌参数:
    /// - `["all"]` 表示全部启用的品牌
    /// - 否则逐个解析 UUID，非法或不存在的记入 rejected，不影响其余品牌
    pub async fn resolve_selection(&self, raw: &[String]) -> AppResult<BrandSelection> {
        if raw.iter().any(|r| r.trim().eq_ignore_ascii_case(ALL_BRANDS)) {
            if raw.len() > 1 {
                return Err(AppError::ValidationError(
                    "\"all\" cannot be combined with explicit brand ids".to_string(),
                ));
            }
            let brands = self.active_models().await?;
            if brands.is_empty() {
                return Err(AppError::ValidationError("No active brands found".to_string()));
            }
            return Ok(BrandSelection {
                brands,
                rejected: Vec::new(),
            });
        }

        let mut selection = BrandSelection::default();
        let mut ids = Vec::new();
        for entry in raw {
            match Uuid::parse_str(entry.trim()) {
                Ok(id) if !ids.contains(&id) => ids.push(id),
                Ok(_) => {}
                Err(_) => selection
                    .rejected
                    .push((entry.clone(), format!("Invalid brand id: {entry}"))),
            }
        }

        if !ids.is_empty() {
            let found = brands::Entity::find()
                .filter(brands::Column::Id.is_in(ids.clone()))
                .all(self.pool.as_ref())
                .await?;
            // 保持调用方给出的顺序
            for id in ids {
                match found.iter().find(|b| b.id == id) {
                    Some(brand) => selection.brands.push(brand.clone()),
                    None => selection
                        .rejected
                        .push((id.to_string(), format!("Brand {id} not found"))),
                }
            }
        }

        Ok(selection)
    }

    async fn active_models(&self) -> AppResult<Vec<brands::Model>> {
        let list = brands::Entity::find()
            .filter(brands::Column::IsActive.eq(true))
            .order_by_asc(brands::Column::Name)
            .all(self.pool.as_ref())
            .await?;
        Ok(list)
    }
}
