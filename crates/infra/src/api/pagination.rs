//! Page-by-page collection
//!
//! A page body is either a bare JSON array of items or an object carrying
//! the items under `items_field` and an optional boolean `has_more_field`.

use serde_json::Value;

/// Controls [`ApiClient::paginate`](super::ApiClient::paginate)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginateOptions {
    /// Query parameter carrying the page number
    pub page_param: String,
    /// Query parameter carrying the page size
    pub size_param: String,
    pub page_size: usize,
    pub start_page: u32,
    /// Upper bound on requests issued; `None` means unbounded
    pub max_pages: Option<u32>,
    pub items_field: String,
    pub has_more_field: String,
}

impl Default for PaginateOptions {
    fn default() -> Self {
        Self {
            page_param: "page".to_string(),
            size_param: "limit".to_string(),
            page_size: 20,
            start_page: 1,
            max_pages: Some(100),
            items_field: "data".to_string(),
            has_more_field: "hasMore".to_string(),
        }
    }
}

impl PaginateOptions {
    pub fn page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn max_pages(mut self, max_pages: Option<u32>) -> Self {
        self.max_pages = max_pages;
        self
    }

    pub fn start_page(mut self, start_page: u32) -> Self {
        self.start_page = start_page;
        self
    }

    pub fn params(mut self, page_param: impl Into<String>, size_param: impl Into<String>) -> Self {
        self.page_param = page_param.into();
        self.size_param = size_param.into();
        self
    }

    pub fn fields(mut self, items_field: impl Into<String>, has_more_field: impl Into<String>) -> Self {
        self.items_field = items_field.into();
        self.has_more_field = has_more_field.into();
        self
    }
}

/// Items and continuation flag read from one page
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Page {
    pub items: Vec<Value>,
    pub has_more: Option<bool>,
}

impl Page {
    pub fn parse(body: Value, options: &PaginateOptions) -> Self {
        match body {
            Value::Array(items) => Self { items, has_more: None },
            Value::Object(mut map) => {
                let has_more = map.get(&options.has_more_field).and_then(Value::as_bool);
                let items = match map.remove(&options.items_field) {
                    Some(Value::Array(items)) => items,
                    _ => Vec::new(),
                };
                Self { items, has_more }
            }
            _ => Self { items: Vec::new(), has_more: None },
        }
    }

    /// Whether another page should be requested after `pages_fetched` pages
    pub fn is_last(&self, options: &PaginateOptions, pages_fetched: u32) -> bool {
        self.has_more == Some(false)
            || self.items.is_empty()
            || self.items.len() < options.page_size
            || options.max_pages.is_some_and(|max| pages_fetched >= max)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn parses_bare_arrays_and_objects() {
        let options = PaginateOptions::default();

        let page = Page::parse(json!([1, 2]), &options);
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.has_more, None);

        let page = Page::parse(json!({"data": [1], "hasMore": true}), &options);
        assert_eq!(page.items, vec![json!(1)]);
        assert_eq!(page.has_more, Some(true));

        let page = Page::parse(json!({"other": []}), &options);
        assert!(page.items.is_empty());
    }

    #[test]
    fn stop_conditions() {
        let options = PaginateOptions::default().page_size(2).max_pages(Some(3));
        let full = Page { items: vec![json!(1), json!(2)], has_more: None };
        let short = Page { items: vec![json!(1)], has_more: Some(true) };
        let done = Page { items: vec![json!(1), json!(2)], has_more: Some(false) };

        assert!(!full.is_last(&options, 1));
        assert!(full.is_last(&options, 3));
        assert!(short.is_last(&options, 1));
        assert!(done.is_last(&options, 1));
        assert!(!full.is_last(&options.clone().max_pages(None), 1000));
    }

    #[test]
    fn empty_page_ends_even_with_zero_page_size() {
        let options = PaginateOptions::default().page_size(0).max_pages(None);
        let empty = Page { items: Vec::new(), has_more: None };
        assert!(empty.is_last(&options, 1));
    }
}
