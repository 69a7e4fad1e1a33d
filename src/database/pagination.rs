use potion::Error;
use serde::Serialize;

use crate::{constants::MAX_PAGE_SIZE, error::{ApiError, HtmlError}};

use super::form::{Form, FormData};

#[derive(Serialize, Debug)]
pub struct Page<T> {
    pub count: i64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PageStyle {
    /// `?page=N&limit=M`
    PageNumber { page: i64 },
    /// `?limit=M&offset=K`
    LimitOffset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub limit: i64,
    pub offset: i64,
    style: PageStyle,
}

fn read_limit(form: &Form, default_limit: i64) -> Result<i64, Error> {
    let limit = form.get_number::<i64>("limit")?.unwrap_or(default_limit);
    if limit <= 0 {
        return Err(HtmlError::InvalidRequest.new("'limit' must be a positive number"));
    }
    Ok(limit.min(MAX_PAGE_SIZE))
}

impl PageRequest {
    pub fn page_number(form: &Form, default_limit: i64) -> Result<Self, Error> {
        let limit = read_limit(form, default_limit)?;
        let page = form.get_number::<i64>("page")?.unwrap_or(1);
        if page <= 0 {
            return Err(ApiError::NotFound.new("Invalid page."));
        }

        let offset = (page - 1)
            .checked_mul(limit)
            .ok_or_else(|| ApiError::NotFound.new("Invalid page."))?;

        Ok(Self {
            limit,
            offset,
            style: PageStyle::PageNumber { page },
        })
    }

    pub fn limit_offset(form: &Form, default_limit: i64) -> Result<Self, Error> {
        let limit = read_limit(form, default_limit)?;
        let offset = form.get_number::<i64>("offset")?.unwrap_or(0).max(0);

        Ok(Self {
            limit,
            offset,
            style: PageStyle::LimitOffset,
        })
    }

    /// Rejects page numbers past the end, the way an out-of-range page is a 404.
    pub fn check_rows(&self, row_count: usize) -> Result<(), Error> {
        match self.style {
            PageStyle::PageNumber { page } if page > 1 && row_count == 0 => {
                Err(ApiError::NotFound.new("Invalid page."))
            }
            _ => Ok(()),
        }
    }

    fn next(&self, form: &Form, count: i64) -> Option<FormData> {
        let end = self.offset.checked_add(self.limit)?;
        if end >= count {
            return None;
        }

        Some(match self.style {
            PageStyle::PageNumber { page } => {
                form.with_value("page", &page.saturating_add(1).to_string())
            }
            PageStyle::LimitOffset => {
                let mut data = form.with_value("limit", &self.limit.to_string());
                data.retain(|(k, _)| k != "offset");
                data.push(("offset".to_string(), end.to_string()));
                data
            }
        })
    }

    fn previous(&self, form: &Form) -> Option<FormData> {
        match self.style {
            PageStyle::PageNumber { page } if page <= 1 => None,
            PageStyle::PageNumber { page: 2 } => Some(form.without("page")),
            PageStyle::PageNumber { page } => Some(form.with_value("page", &(page - 1).to_string())),
            PageStyle::LimitOffset if self.offset <= 0 => None,
            PageStyle::LimitOffset if self.offset <= self.limit => {
                let mut data = form.with_value("limit", &self.limit.to_string());
                data.retain(|(k, _)| k != "offset");
                Some(data)
            }
            PageStyle::LimitOffset => {
                let mut data = form.with_value("limit", &self.limit.to_string());
                data.retain(|(k, _)| k != "offset");
                data.push((
                    "offset".to_string(),
                    self.offset.saturating_sub(self.limit).to_string(),
                ));
                Some(data)
            }
        }
    }
}

fn link(path: &str, data: FormData) -> String {
    match serde_urlencoded::to_string(&data) {
        Ok(query) if !query.is_empty() => format!("{path}?{query}"),
        _ => path.to_string(),
    }
}

impl<T> Page<T> {
    pub fn from_rows(
        results: Vec<T>,
        count: i64,
        request: &PageRequest,
        path: &str,
        form: &Form,
    ) -> Self {
        Self {
            count,
            next: request.next(form, count).map(|data| link(path, data)),
            previous: request.previous(form).map(|data| link(path, data)),
            results,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(pairs: &[(&str, &str)]) -> Form {
        Form::from_data(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[test]
    fn first_page_links_forward_only() {
        let form = form(&[("tags", "lunch")]);
        let request = PageRequest::page_number(&form, 6).unwrap();
        assert_eq!(request.offset, 0);

        let page = Page::from_rows(vec![1, 2, 3, 4, 5, 6], 14, &request, "/api/recipes/", &form);

        assert_eq!(page.count, 14);
        assert_eq!(page.next.as_deref(), Some("/api/recipes/?tags=lunch&page=2"));
        assert_eq!(page.previous, None);
    }

    #[test]
    fn last_page_links_back_only() {
        let form = form(&[("page", "3"), ("limit", "5")]);
        let request = PageRequest::page_number(&form, 6).unwrap();
        assert_eq!(request.offset, 10);
        assert_eq!(request.limit, 5);

        let page = Page::from_rows(vec![1, 2], 12, &request, "/api/recipes/", &form);

        assert_eq!(page.next, None);
        assert_eq!(page.previous.as_deref(), Some("/api/recipes/?limit=5&page=2"));
    }

    #[test]
    fn second_page_links_back_without_page_number() {
        let form = form(&[("page", "2")]);
        let request = PageRequest::page_number(&form, 6).unwrap();
        let page = Page::from_rows(vec![1], 7, &request, "/api/recipes/", &form);

        assert_eq!(page.previous.as_deref(), Some("/api/recipes/"));
    }

    #[test]
    fn limit_offset_links() {
        let form = form(&[("limit", "2"), ("offset", "2")]);
        let request = PageRequest::limit_offset(&form, 10).unwrap();
        let page = Page::from_rows(vec!["c", "d"], 5, &request, "/api/users/", &form);

        assert_eq!(page.next.as_deref(), Some("/api/users/?limit=2&offset=4"));
        assert_eq!(page.previous.as_deref(), Some("/api/users/?limit=2"));
    }

    #[test]
    fn invalid_page_requests_are_rejected() {
        assert_eq!(
            PageRequest::page_number(&form(&[("page", "0")]), 6)
                .unwrap_err()
                .code as u16,
            404
        );
        assert_eq!(
            PageRequest::page_number(&form(&[("limit", "-1")]), 6)
                .unwrap_err()
                .code as u16,
            400
        );

        let past_end = PageRequest::page_number(&form(&[("page", "9")]), 6).unwrap();
        assert!(past_end.check_rows(0).is_err());
        assert!(past_end.check_rows(1).is_ok());
        let first = PageRequest::page_number(&form(&[]), 6).unwrap();
        assert!(first.check_rows(0).is_ok());
    }

    #[test]
    fn huge_page_numbers_are_not_found() {
        let max = i64::MAX.to_string();
        let request = PageRequest::page_number(&form(&[("page", max.as_str())]), 6);

        assert_eq!(request.unwrap_err().code as u16, 404);
    }

    #[test]
    fn huge_offsets_have_no_next_page() {
        let max = i64::MAX.to_string();
        let form = form(&[("limit", "10"), ("offset", max.as_str())]);
        let request = PageRequest::limit_offset(&form, 10).unwrap();
        assert_eq!(request.offset, i64::MAX);

        let page: Page<i64> = Page::from_rows(vec![], 3, &request, "/api/users/", &form);

        assert_eq!(page.next, None);
        assert_eq!(
            page.previous,
            Some(format!("/api/users/?limit=10&offset={}", i64::MAX - 10))
        );
    }

    #[test]
    fn limit_is_capped() {
        let request = PageRequest::limit_offset(&form(&[("limit", "5000")]), 10).unwrap();
        assert_eq!(request.limit, MAX_PAGE_SIZE);
    }
}
