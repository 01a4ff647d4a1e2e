use serde::{Deserialize, Serialize};

/// 1-based page window. Every paginated endpoint pairs `offset()`/`limit()`
/// with a count over the identical predicate; `Paginated::new` then derives
/// `total_pages` and `has_next_page` from that count.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PageParams {
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_per_page")]
    pub per_page: i64,
}

fn default_page() -> i64 { 1 }
fn default_per_page() -> i64 { 4 }

impl PageParams {
    pub fn new(page: Option<i64>, per_page: Option<i64>, default_per_page: i64) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            per_page: per_page.unwrap_or(default_per_page).clamp(1, 100),
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page.max(1) - 1) * self.limit()
    }

    pub fn limit(&self) -> i64 {
        self.per_page.clamp(1, 100)
    }
}

impl Default for PageParams {
    fn default() -> Self {
        Self { page: 1, per_page: default_per_page() }
    }
}

#[derive(Debug, Serialize)]
pub struct Paginated<T: Serialize> {
    pub items: Vec<T>,
    pub page: i64,
    pub total_pages: i64,
    pub has_next_page: bool,
}

impl<T: Serialize> Paginated<T> {
    pub fn new(items: Vec<T>, total: i64, params: &PageParams) -> Self {
        let per_page = params.limit();
        let total_pages = if total == 0 { 0 } else { (total + per_page - 1) / per_page };
        Self {
            items,
            page: params.page,
            total_pages,
            has_next_page: params.page < total_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_math() {
        let p = PageParams::new(Some(3), Some(4), 4);
        assert_eq!(p.offset(), 8);
        assert_eq!(p.limit(), 4);

        // page and per_page are clamped to sane bounds
        let p = PageParams::new(Some(0), Some(0), 4);
        assert_eq!(p.offset(), 0);
        assert_eq!(p.limit(), 1);
    }

    #[test]
    fn total_pages_and_next_page() {
        let params = PageParams::new(Some(2), Some(4), 4);
        let page: Paginated<i32> = Paginated::new(vec![1, 2, 3, 4], 9, &params);
        assert_eq!(page.total_pages, 3);
        assert!(page.has_next_page);

        let params = PageParams::new(Some(3), Some(4), 4);
        let page: Paginated<i32> = Paginated::new(vec![9], 9, &params);
        assert!(!page.has_next_page);

        let params = PageParams::new(Some(1), Some(4), 4);
        let page: Paginated<i32> = Paginated::new(vec![], 0, &params);
        assert_eq!(page.total_pages, 0);
        assert!(!page.has_next_page);
    }
}
