use serde::{Deserialize, Serialize};

use crate::config::PaginationConfig;
use crate::util::QueryParams;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
}

impl Pagination {
    pub fn new(page: i64, limit: i64, config: &PaginationConfig) -> Self {
        Self {
            page: page.max(1),
            limit: limit.clamp(1, config.max_limit.max(1)),
        }
    }

    pub fn from_params(params: &QueryParams, config: &PaginationConfig) -> Self {
        Self::new(
            params.get_i64_or("page", 1),
            params.get_i64_or("limit", config.default_limit),
            config,
        )
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }

    pub fn page_info(&self, total: i64) -> PageInfo {
        let total_pages = ((total + self.limit - 1) / self.limit).max(1);
        PageInfo {
            page: self.page,
            limit: self.limit,
            total,
            total_pages,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub total_pages: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub pagination: PageInfo,
}

impl<T> Page<T> {
    pub fn new(data: Vec<T>, pagination: &Pagination, total: i64) -> Self {
        Self {
            data,
            pagination: pagination.page_info(total),
        }
    }
}
