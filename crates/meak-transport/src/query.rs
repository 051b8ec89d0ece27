//! Typed table queries.
//!
//! A [`TableQuery`] names a table, the columns to return, and a list of
//! filters, plus an optional ordering and limit. It renders to the
//! PostgREST query-string convention (`column=eq.value`,
//! `order=column.desc`) but carries no behavior of its own: the backend
//! does all the filtering.

/// How a single column is filtered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterOp {
    /// Column equals the value.
    Eq(String),

    /// Full-text "web search" syntax against the column, using the given
    /// text-search configuration (`english`, `simple`, ...).
    WebSearch { query: String, config: String },
}

/// One filter clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub column: String,
    pub op: FilterOp,
}

impl Filter {
    fn render(&self) -> (String, String) {
        let value = match &self.op {
            FilterOp::Eq(v) => format!("eq.{v}"),
            FilterOp::WebSearch { query, config } => {
                format!("wfts({config}).{query}")
            }
        };
        (self.column.clone(), value)
    }
}

/// Sort order for the result set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub column: String,
    pub ascending: bool,
}

/// A select/update target on one table.
///
/// ```rust
/// use meak_transport::TableQuery;
///
/// let q = TableQuery::from("tasks")
///     .eq("client_id", "c1")
///     .order("created_at", false);
///
/// assert_eq!(
///     q.to_query_pairs(),
///     vec![
///         ("select".to_string(), "*".to_string()),
///         ("client_id".to_string(), "eq.c1".to_string()),
///         ("order".to_string(), "created_at.desc".to_string()),
///     ]
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableQuery {
    pub table: String,
    pub columns: String,
    pub filters: Vec<Filter>,
    pub order: Option<Order>,
    pub limit: Option<usize>,
}

impl TableQuery {
    /// Starts a query on `table` selecting every column.
    pub fn from(table: &str) -> Self {
        Self {
            table: table.to_string(),
            columns: "*".to_string(),
            filters: Vec::new(),
            order: None,
            limit: None,
        }
    }

    /// Restricts the returned columns (comma-separated, PostgREST syntax).
    pub fn select(mut self, columns: &str) -> Self {
        self.columns = columns.to_string();
        self
    }

    /// Adds `column = value`.
    pub fn eq(mut self, column: &str, value: impl Into<String>) -> Self {
        self.filters.push(Filter {
            column: column.to_string(),
            op: FilterOp::Eq(value.into()),
        });
        self
    }

    /// Adds a web-search full-text filter on `column`.
    pub fn web_search(mut self, column: &str, query: &str, config: &str) -> Self {
        self.filters.push(Filter {
            column: column.to_string(),
            op: FilterOp::WebSearch {
                query: query.to_string(),
                config: config.to_string(),
            },
        });
        self
    }

    /// Sorts by `column`.
    pub fn order(mut self, column: &str, ascending: bool) -> Self {
        self.order = Some(Order {
            column: column.to_string(),
            ascending,
        });
        self
    }

    /// Caps the number of rows returned.
    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }

    /// Returns the value of the first `eq` filter on `column`, if any.
    pub fn eq_value(&self, column: &str) -> Option<&str> {
        self.filters.iter().find_map(|f| match &f.op {
            FilterOp::Eq(v) if f.column == column => Some(v.as_str()),
            _ => None,
        })
    }

    /// Renders the full query string for a read: columns, filters,
    /// ordering, limit.
    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![("select".to_string(), self.columns.clone())];
        pairs.extend(self.filter_pairs());
        if let Some(order) = &self.order {
            let dir = if order.ascending { "asc" } else { "desc" };
            pairs.push(("order".to_string(), format!("{}.{dir}", order.column)));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit".to_string(), limit.to_string()));
        }
        pairs
    }

    /// Renders only the filters, for writes (`PATCH`) that must not carry
    /// a `select` or `order`.
    pub fn filter_pairs(&self) -> Vec<(String, String)> {
        self.filters.iter().map(Filter::render).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(k: &str, v: &str) -> (String, String) {
        (k.to_string(), v.to_string())
    }

    #[test]
    fn test_query_defaults_to_all_columns() {
        let q = TableQuery::from("profiles");
        assert_eq!(q.to_query_pairs(), vec![pair("select", "*")]);
    }

    #[test]
    fn test_query_web_search_renders_wfts_with_config() {
        let q = TableQuery::from("profiles")
            .web_search("first_name", "plumber casablanca", "english")
            .eq("postal_code", "20000");

        assert_eq!(
            q.to_query_pairs(),
            vec![
                pair("select", "*"),
                pair("first_name", "wfts(english).plumber casablanca"),
                pair("postal_code", "eq.20000"),
            ]
        );
    }

    #[test]
    fn test_query_select_and_limit() {
        let q = TableQuery::from("reviews")
            .select("rating")
            .eq("reviewee_id", "p1")
            .order("created_at", true)
            .limit(10);

        assert_eq!(
            q.to_query_pairs(),
            vec![
                pair("select", "rating"),
                pair("reviewee_id", "eq.p1"),
                pair("order", "created_at.asc"),
                pair("limit", "10"),
            ]
        );
    }

    #[test]
    fn test_filter_pairs_omit_select_and_order() {
        let q = TableQuery::from("tasks").eq("id", "t1").order("id", true);
        assert_eq!(q.filter_pairs(), vec![pair("id", "eq.t1")]);
    }

    #[test]
    fn test_eq_value_finds_first_matching_column() {
        let q = TableQuery::from("tasks").eq("id", "t1").eq("status", "pending");
        assert_eq!(q.eq_value("status"), Some("pending"));
        assert_eq!(q.eq_value("client_id"), None);
    }
}
