//! Limit/offset paging shared by every list endpoint

use crate::config::PaginationConfig;
use crate::errors::{AppError, Result};
use serde::{Deserialize, Serialize};

/// Raw paging parameters as they arrive on the query string
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageParams {
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

/// A resolved page window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: u64,
    pub offset: u64,
}

impl Page {
    pub fn new(limit: u64, offset: u64) -> Self {
        Self { limit, offset }
    }

    /// Resolve query parameters against the configured defaults
    ///
    /// A missing limit falls back to the default, a larger one is clamped to
    /// the maximum, and an explicit zero is rejected. Offsets must fit a
    /// signed 64-bit SQL OFFSET.
    pub fn resolve(params: PageParams, config: &PaginationConfig) -> Result<Self> {
        let limit = match params.limit {
            Some(0) => {
                return Err(AppError::Parse {
                    name: "limit".to_string(),
                    message: "limit must be greater than zero".to_string(),
                })
            }
            Some(limit) => limit.min(config.max_limit),
            None => config.default_limit,
        };

        let offset = params.offset.unwrap_or(0);
        if i64::try_from(offset).is_err() {
            return Err(AppError::Parse {
                name: "offset".to_string(),
                message: format!("offset must not exceed {}", i64::MAX),
            });
        }

        Ok(Self { limit, offset })
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::resolve(PageParams::default(), &PaginationConfig::default()).unwrap_or(Self {
            limit: 30,
            offset: 0,
        })
    }
}

/// One page of rows plus the number of rows matching the query overall
#[derive(Debug, Clone, Serialize)]
pub struct Paged<T> {
    pub items: Vec<T>,
    pub total: u64,
}

impl<T> Paged<T> {
    pub fn new(items: Vec<T>, total: u64) -> Self {
        Self { items, total }
    }

    /// Convert each row, keeping the total
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Paged<U> {
        Paged {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_apply() {
        let page = Page::resolve(PageParams::default(), &PaginationConfig::default()).unwrap();
        assert_eq!(page, Page::new(30, 0));
    }

    #[test]
    fn test_limit_is_clamped() {
        let params = PageParams {
            limit: Some(5_000),
            offset: Some(20),
        };
        let page = Page::resolve(params, &PaginationConfig::default()).unwrap();
        assert_eq!(page, Page::new(100, 20));
    }

    #[test]
    fn test_zero_limit_rejected() {
        let params = PageParams {
            limit: Some(0),
            offset: None,
        };
        assert!(matches!(
            Page::resolve(params, &PaginationConfig::default()),
            Err(AppError::Parse { .. })
        ));
    }

    #[test]
    fn test_offset_must_fit_sql() {
        let config = PaginationConfig::default();
        let params = PageParams {
            limit: None,
            offset: Some(i64::MAX as u64),
        };
        assert_eq!(Page::resolve(params, &config).unwrap().offset, i64::MAX as u64);

        let params = PageParams {
            limit: None,
            offset: Some(i64::MAX as u64 + 1),
        };
        match Page::resolve(params, &config) {
            Err(AppError::Parse { name, .. }) => assert_eq!(name, "offset"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_map_keeps_total() {
        let paged = Paged::new(vec![1, 2], 7).map(|n| n * 10);
        assert_eq!(paged.items, vec![10, 20]);
        assert_eq!(paged.total, 7);
    }
}
