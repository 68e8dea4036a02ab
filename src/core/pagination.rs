use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::config::{MAX_PAGE_SIZE, PAGE_SIZE};
use crate::core::errors::ApiError;
use crate::core::query_params::{build_link, get_positive_int};

const PAGE_QUERY_PARAM: &str = "page";
const PAGE_SIZE_QUERY_PARAM: &str = "page_size";

/// Page-number pagination with a client-overridable, capped page size.
#[derive(Debug, Clone, Copy)]
pub struct Pagination {
    pub page_size: usize,
    pub max_page_size: usize,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page_size: PAGE_SIZE,
            max_page_size: MAX_PAGE_SIZE,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub count: usize,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    pub fn try_map<U, E>(self, f: impl FnMut(T) -> Result<U, E>) -> Result<Page<U>, E> {
        Ok(Page {
            count: self.count,
            next: self.next,
            previous: self.previous,
            results: self.results.into_iter().map(f).collect::<Result<_, _>>()?,
        })
    }
}

impl Pagination {
    pub fn page_size_for(&self, params: &HashMap<String, String>) -> usize {
        get_positive_int(params, PAGE_SIZE_QUERY_PARAM)
            .map(|size| size.min(self.max_page_size))
            .unwrap_or(self.page_size)
    }

    /// Cut one page out of `items`.
    ///
    /// `path` and `params` are the request's, used to build `next`/`previous`.
    pub fn paginate<T>(
        &self,
        items: Vec<T>,
        params: &HashMap<String, String>,
        path: &str,
    ) -> Result<Page<T>, ApiError> {
        let page_size = self.page_size_for(params);
        let count = items.len();
        // an empty collection still has one (empty) page
        let num_pages = count.div_ceil(page_size).max(1);

        let page = match params.get(PAGE_QUERY_PARAM).map(|s| s.as_str()) {
            None | Some("") => 1,
            Some("last") => num_pages,
            Some(raw) => raw
                .parse::<usize>()
                .ok()
                .filter(|n| (1..=num_pages).contains(n))
                .ok_or_else(|| ApiError::NotFound("Invalid page.".to_string()))?,
        };

        let results = items
            .into_iter()
            .skip((page - 1) * page_size)
            .take(page_size)
            .collect();

        let next = (page < num_pages).then(|| page_link(path, params, page + 1));
        let previous = (page > 1).then(|| page_link(path, params, page - 1));

        Ok(Page {
            count,
            next,
            previous,
            results,
        })
    }
}

fn page_link(path: &str, params: &HashMap<String, String>, page: usize) -> String {
    let mut params: BTreeMap<String, String> = params
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    if page == 1 {
        params.remove(PAGE_QUERY_PARAM);
    } else {
        params.insert(PAGE_QUERY_PARAM.to_string(), page.to_string());
    }

    build_link(path, &params)
}
