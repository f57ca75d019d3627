use url::form_urlencoded;

use super::error::ApiError;
use crate::models::{PageRequest, RecipeFilter, User};

pub const MAX_PAGE_SIZE: u32 = 100;

/// Query string of the recipe list. `tags` may repeat, hence the manual parse.
#[derive(Debug, Default, PartialEq)]
pub struct RecipeListQuery {
    pub tags: Vec<String>,
    pub author: Option<i64>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl RecipeListQuery {
    pub fn parse(raw: Option<&str>) -> Result<Self, ApiError> {
        let mut query = Self::default();
        for (key, value) in form_urlencoded::parse(raw.unwrap_or_default().as_bytes()) {
            match key.as_ref() {
                "tags" if !value.is_empty() => query.tags.push(value.into_owned()),
                "author" => query.author = Some(number(&key, &value)?),
                "is_favorited" => query.is_favorited = value == "1",
                "is_in_shopping_cart" => query.is_in_shopping_cart = value == "1",
                "page" => query.page = Some(positive(&key, &value)?),
                "limit" => query.limit = Some(positive(&key, &value)?),
                _ => {}
            }
        }
        Ok(query)
    }

    pub fn filter(&self, caller: Option<&User>) -> RecipeFilter {
        let caller_id = caller.map(|user| user.id);
        RecipeFilter {
            tags: self.tags.clone(),
            author: self.author,
            favorited_by: caller_id.filter(|_| self.is_favorited),
            in_cart_of: caller_id.filter(|_| self.is_in_shopping_cart),
        }
    }

    pub fn page(&self, default_limit: u32) -> PageRequest {
        page_request(self.page, self.limit, default_limit)
    }
}

/// `page` and `limit` of plain paginated lists.
#[derive(Debug, Default, PartialEq)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl PageQuery {
    pub fn parse(raw: Option<&str>) -> Result<Self, ApiError> {
        let mut query = Self::default();
        for (key, value) in form_urlencoded::parse(raw.unwrap_or_default().as_bytes()) {
            match key.as_ref() {
                "page" => query.page = Some(positive(&key, &value)?),
                "limit" => query.limit = Some(positive(&key, &value)?),
                _ => {}
            }
        }
        Ok(query)
    }

    pub fn page(&self, default_limit: u32) -> PageRequest {
        page_request(self.page, self.limit, default_limit)
    }
}

fn page_request(page: Option<u32>, limit: Option<u32>, default_limit: u32) -> PageRequest {
    PageRequest {
        page: page.unwrap_or(1),
        limit: limit.unwrap_or(default_limit).min(MAX_PAGE_SIZE),
    }
}

fn number(key: &str, value: &str) -> Result<i64, ApiError> {
    value
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("{key} must be an integer")))
}

fn positive(key: &str, value: &str) -> Result<u32, ApiError> {
    value
        .parse()
        .ok()
        .filter(|n| *n >= 1)
        .ok_or_else(|| ApiError::BadRequest(format!("{key} must be a positive integer")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caller() -> User {
        User {
            id: 42,
            email: "cook@example.com".to_string(),
            username: "cook".to_string(),
            first_name: "Ann".to_string(),
            last_name: "Cook".to_string(),
            is_superuser: false,
        }
    }

    #[test]
    fn collects_repeated_tags() {
        let query = RecipeListQuery::parse(Some("tags=breakfast&tags=lunch&author=3&page=2")).unwrap();
        assert_eq!(query.tags, vec!["breakfast", "lunch"]);
        assert_eq!(query.author, Some(3));
        assert_eq!(query.page, Some(2));
    }

    #[test]
    fn empty_tag_values_are_ignored() {
        let query = RecipeListQuery::parse(Some("tags=&tags=lunch&tags=")).unwrap();
        assert_eq!(query.tags, vec!["lunch"]);

        let query = RecipeListQuery::parse(Some("tags=")).unwrap();
        assert!(query.tags.is_empty());
        assert_eq!(query.filter(None), RecipeFilter::default());
    }

    #[test]
    fn caller_flags_need_a_caller() {
        let query = RecipeListQuery::parse(Some("is_favorited=1&is_in_shopping_cart=1")).unwrap();

        let anonymous = query.filter(None);
        assert_eq!(anonymous.favorited_by, None);
        assert_eq!(anonymous.in_cart_of, None);

        let user = caller();
        let own = query.filter(Some(&user));
        assert_eq!(own.favorited_by, Some(42));
        assert_eq!(own.in_cart_of, Some(42));
    }

    #[test]
    fn flag_values_other_than_one_are_ignored() {
        let query = RecipeListQuery::parse(Some("is_favorited=0")).unwrap();
        assert!(!query.is_favorited);
    }

    #[test]
    fn bad_numbers_are_rejected() {
        assert!(RecipeListQuery::parse(Some("author=me")).is_err());
        assert!(RecipeListQuery::parse(Some("page=0")).is_err());
        assert!(RecipeListQuery::parse(Some("limit=-1")).is_err());
    }

    #[test]
    fn page_defaults_and_cap() {
        let query = RecipeListQuery::parse(None).unwrap();
        assert_eq!(query.page(6), PageRequest { page: 1, limit: 6 });

        let query = RecipeListQuery::parse(Some("limit=1000")).unwrap();
        assert_eq!(query.page(6).limit, MAX_PAGE_SIZE);
    }

    #[test]
    fn plain_pages_ignore_recipe_filters() {
        let query = PageQuery::parse(Some("page=3&limit=2&tags=lunch")).unwrap();
        assert_eq!(query.page(6), PageRequest { page: 3, limit: 2 });
        assert!(PageQuery::parse(Some("page=0")).is_err());
    }
}
