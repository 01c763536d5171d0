//! Page-offset computation.

use crate::error::{DbError, DbResult};
use crate::models::query::{Params, QueryParam};
use serde::Serialize;

/// Limit and offset for one page of a result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageSpec {
    pub limit: i64,
    pub offset: i64,
    pub page: i64,
    pub page_size: i64,
}

impl PageSpec {
    /// Compute `offset = (page - 1) * page_size` and `limit = page_size`.
    ///
    /// Pages are 1-based. A page or page size below 1 is rejected, as is an
    /// offset that would overflow.
    pub fn new(page: i64, page_size: i64) -> DbResult<Self> {
        if page < 1 {
            return Err(DbError::validation(format!(
                "page must be at least 1, got {}",
                page
            )));
        }
        if page_size < 1 {
            return Err(DbError::validation(format!(
                "page_size must be at least 1, got {}",
                page_size
            )));
        }
        let offset = (page - 1).checked_mul(page_size).ok_or_else(|| {
            DbError::validation(format!(
                "offset for page {} with page_size {} overflows",
                page, page_size
            ))
        })?;

        Ok(Self {
            limit: page_size,
            offset,
            page,
            page_size,
        })
    }

    /// Bind parameters for `LIMIT :limit OFFSET :offset`.
    pub fn params(&self) -> Params {
        let mut params = Params::new();
        params.insert("limit".to_string(), QueryParam::Int(self.limit));
        params.insert("offset".to_string(), QueryParam::Int(self.offset));
        params
    }
}
