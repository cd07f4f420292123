use serde::{Deserialize, Serialize};

use super::error::TypeError;
use crate::constants::{MAX_PAGE_LIMIT, RECIPE_COUNT_PER_PAGE};

/// Window of a listing, built from the `limit` and `page` query parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageQuery {
    pub limit: i64,
    pub offset: i64,
}

impl PageQuery {
    /// `page` is 1-based; missing or non-positive values fall back to the
    /// first page of `RECIPE_COUNT_PER_PAGE` rows. A page whose offset does
    /// not fit an i64 is rejected.
    pub fn new(page: Option<i64>, limit: Option<i64>) -> Result<Self, TypeError> {
        let limit = limit
            .filter(|limit| *limit > 0)
            .unwrap_or(RECIPE_COUNT_PER_PAGE)
            .min(MAX_PAGE_LIMIT);
        let page = page.filter(|page| *page > 0).unwrap_or(1);

        let offset = (page - 1)
            .checked_mul(limit)
            .ok_or_else(|| TypeError::new("Page out of range"))?;

        Ok(Self { limit, offset })
    }

    pub fn page(&self) -> i64 {
        self.offset / self.limit + 1
    }
}

impl Default for PageQuery {
    fn default() -> Self {
        Self {
            limit: RECIPE_COUNT_PER_PAGE,
            offset: 0,
        }
    }
}

#[derive(Serialize, Deserialize, Debug)]
pub struct PageContext<T> {
    pub count: i64,
    pub next: Option<i64>,
    pub previous: Option<i64>,
    pub results: Vec<T>,
}

impl<T> PageContext<T> {
    pub fn from_rows(rows: Vec<T>, total_rows: i64, query: PageQuery) -> Self {
        if rows.is_empty() {
            return Self::no_rows(total_rows, query);
        }

        let page = query.page();
        let next = (query.offset + query.limit < total_rows).then_some(page + 1);
        let previous = (page > 1).then_some(page - 1);

        Self {
            count: total_rows,
            next,
            previous,
            results: rows,
        }
    }

    /// An empty page. Past the last page the total is unknown to the query,
    /// so only the link back is kept.
    pub fn no_rows(total_rows: i64, query: PageQuery) -> Self {
        let page = query.page();

        Self {
            count: total_rows,
            next: None,
            previous: (page > 1).then_some(page - 1),
            results: vec![],
        }
    }

    pub fn map<U, F>(self, f: F) -> PageContext<U>
    where
        F: FnMut(T) -> U,
    {
        PageContext {
            count: self.count,
            next: self.next,
            previous: self.previous,
            results: self.results.into_iter().map(f).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(None, None, 6, 0)]
    #[case(Some(3), None, 6, 12)]
    #[case(Some(2), Some(10), 10, 10)]
    #[case(Some(0), Some(-5), 6, 0)]
    #[case(Some(1), Some(1000), MAX_PAGE_LIMIT, 0)]
    fn builds_window_from_query(
        #[case] page: Option<i64>,
        #[case] limit: Option<i64>,
        #[case] expected_limit: i64,
        #[case] expected_offset: i64,
    ) {
        let query = PageQuery::new(page, limit).unwrap();

        assert_eq!(query.limit, expected_limit);
        assert_eq!(query.offset, expected_offset);
    }

    #[rstest]
    #[case(Some(i64::MAX), Some(6))]
    #[case(Some(i64::MAX / 2), None)]
    #[case(Some(i64::MAX), Some(MAX_PAGE_LIMIT))]
    fn rejects_pages_past_the_offset_range(#[case] page: Option<i64>, #[case] limit: Option<i64>) {
        assert!(PageQuery::new(page, limit).is_err());
    }

    #[test]
    fn default_is_the_first_page() {
        assert_eq!(PageQuery::default(), PageQuery::new(None, None).unwrap());
    }

    #[test]
    fn middle_page_links_both_ways() {
        let query = PageQuery::new(Some(2), Some(2)).unwrap();
        let page = PageContext::from_rows(vec![3, 4], 5, query);

        assert_eq!(page.count, 5);
        assert_eq!(page.next, Some(3));
        assert_eq!(page.previous, Some(1));
    }

    #[test]
    fn last_page_has_no_next() {
        let query = PageQuery::new(Some(3), Some(2)).unwrap();
        let page = PageContext::from_rows(vec![5], 5, query);

        assert_eq!(page.next, None);
        assert_eq!(page.previous, Some(2));
    }

    #[test]
    fn empty_first_page() {
        let page: PageContext<i32> = PageContext::from_rows(vec![], 0, PageQuery::default());

        assert_eq!(page.count, 0);
        assert!(page.results.is_empty());
        assert_eq!(page.next, None);
        assert_eq!(page.previous, None);
    }
}
