//! Query builders for keyword search and filtered selection.
//!
//! Both run as full scans in identifier order:
//! - [`Find`] keeps records whose string fields contain a keyword
//! - [`Select`] keeps records matching an AND or OR clause, or all of them
//!
//! Results are projected to the requested [`Fields`] and then paged.

mod fields;
mod filter;

pub use fields::{project, Fields};
pub use filter::{contains_keyword, loose_eq, Criteria, Page, Predicate};

/// Case-insensitive keyword search.
#[derive(Clone, Debug)]
pub struct Find {
    pub search_fields: Fields,
    pub keyword: String,
    pub fields: Fields,
    pub page: Page,
}

impl Find {
    pub fn new(search_fields: impl Into<Fields>, keyword: impl Into<String>) -> Self {
        Self {
            search_fields: search_fields.into(),
            keyword: keyword.into(),
            fields: Fields::All,
            page: Page::default(),
        }
    }

    /// Project matches to these fields.
    pub fn fields(mut self, fields: impl Into<Fields>) -> Self {
        self.fields = fields.into();
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.page.limit = Some(limit);
        self
    }

    pub fn start(mut self, start: usize) -> Self {
        self.page.start = start;
        self
    }
}

/// Filtered selection.
///
/// When both clauses are set only the AND clause applies.
#[derive(Clone, Debug, Default)]
pub struct Select {
    pub fields: Fields,
    pub where_and: Option<Criteria>,
    pub where_or: Option<Criteria>,
    pub page: Page,
}

impl Select {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fields(mut self, fields: impl Into<Fields>) -> Self {
        self.fields = fields.into();
        self
    }

    pub fn where_and(mut self, criteria: Criteria) -> Self {
        self.where_and = Some(criteria);
        self
    }

    pub fn where_or(mut self, criteria: Criteria) -> Self {
        self.where_or = Some(criteria);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.page.limit = Some(limit);
        self
    }

    pub fn start(mut self, start: usize) -> Self {
        self.page.start = start;
        self
    }

    /// The predicate this selection applies.
    pub fn predicate(&self) -> Predicate {
        match (&self.where_and, &self.where_or) {
            (Some(and), _) => Predicate::And(and.clone()),
            (None, Some(or)) => Predicate::Or(or.clone()),
            (None, None) => Predicate::All,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn criteria(value: serde_json::Value) -> Criteria {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn test_and_clause_wins() {
        let select = Select::new()
            .where_or(criteria(json!({"b": 2})))
            .where_and(criteria(json!({"a": 1})));

        assert_eq!(select.predicate(), Predicate::And(criteria(json!({"a": 1}))));
    }

    #[test]
    fn test_defaults() {
        assert_eq!(Select::new().predicate(), Predicate::All);

        let find = Find::new("name", "ada").limit(10).start(5);
        assert_eq!(find.fields, Fields::All);
        assert_eq!(find.page, Page { start: 5, limit: Some(10) });
    }
}
