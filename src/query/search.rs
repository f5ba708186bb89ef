//! Builders for the search-side SELECT statements.
//!
//! Statements are composed with sea-query and executed by the engine in
//! `super`; keeping them as plain builders makes the generated SQL easy to
//! pin down in tests.

use sea_query::{Alias, Asterisk, Cond, Expr, Func, Order, Query, SelectStatement};

use super::Tags;
use crate::models::tag::TagStatus;

/// `status IN ('active', 'deprecated')` - the implicit read filter.
/// Deleted and merged rows never show up in listings.
fn readable() -> sea_query::SimpleExpr {
    Expr::col(Tags::Status).is_in([
        TagStatus::Active.as_str(),
        TagStatus::Deprecated.as_str(),
    ])
}

pub(crate) fn search_statement(
    keyword: &str,
    category: Option<&str>,
    domain: Option<&str>,
    limit: u64,
) -> SelectStatement {
    let mut cond = Cond::all().add(readable());

    if !keyword.is_empty() {
        // note that `LIKE` is case-insensitive :)
        let pattern = format!("%{keyword}%");
        cond = cond.add(
            Cond::any()
                .add(Expr::col(Tags::Name).like(pattern.clone()))
                .add(Expr::col(Tags::NameAlt).like(pattern.clone()))
                .add(Expr::col(Tags::Description).like(pattern.clone()))
                // aliases live in a json array column; a substring match on
                // its text is exactly the lookup we want here
                .add(Expr::col(Tags::Aliases).like(pattern)),
        );
    }

    if let Some(category) = category {
        cond = cond.add(Expr::col(Tags::Category).eq(category));
    }

    if let Some(domain) = domain {
        cond = cond.add(Expr::col(Tags::Domain).eq(domain));
    }

    let mut select = Query::select();
    select
        .column(Asterisk)
        .from(Tags::Table)
        .cond_where(cond)
        .order_by(Tags::UsageCount, Order::Desc)
        .order_by(Tags::QualityScore, Order::Desc)
        .order_by(Tags::Name, Order::Asc)
        .limit(limit);
    select
}

pub(crate) fn suggestions_statement(partial_name: &str, limit: u64) -> SelectStatement {
    let mut select = Query::select();
    select
        .column(Asterisk)
        .from(Tags::Table)
        .cond_where(
            Cond::all()
                .add(readable())
                .add(Expr::col(Tags::Name).like(format!("{partial_name}%"))),
        )
        .order_by(Tags::UsageCount, Order::Desc)
        .order_by(Tags::QualityScore, Order::Desc)
        .order_by(Tags::Name, Order::Asc)
        .limit(limit);
    select
}

pub(crate) fn popular_statement(limit: u64) -> SelectStatement {
    let mut select = Query::select();
    select
        .column(Asterisk)
        .from(Tags::Table)
        .cond_where(Cond::all().add(readable()))
        .order_by(Tags::UsageCount, Order::Desc)
        .order_by(Tags::PopularityScore, Order::Desc)
        .limit(limit);
    select
}

pub(crate) fn categories_statement() -> SelectStatement {
    let mut select = Query::select();
    select
        .column(Tags::Category)
        .expr_as(Func::count(Expr::col(Tags::Id)), Alias::new("count"))
        .from(Tags::Table)
        .cond_where(Cond::all().add(readable()))
        .group_by_col(Tags::Category)
        .order_by_expr(Func::count(Expr::col(Tags::Id)).into(), Order::Desc);
    select
}

#[cfg(test)]
mod tests {
    use sea_query::SqliteQueryBuilder;
    use sea_query_binder::SqlxBinder as _;

    use super::*;

    #[test]
    fn search_sql_shape() {
        let (sql, values) =
            search_statement("cat", Some("biological"), None, 5).build_sqlx(SqliteQueryBuilder);

        assert!(sql.starts_with(r#"SELECT * FROM "tags""#), "got: {sql}");
        assert!(sql.contains(r#""status" IN"#), "got: {sql}");
        assert!(sql.contains(r#""name" LIKE"#), "got: {sql}");
        assert!(sql.contains(r#""aliases" LIKE"#), "got: {sql}");
        assert!(
            sql.contains(r#"ORDER BY "usage_count" DESC, "quality_score" DESC, "name" ASC"#),
            "got: {sql}"
        );

        // status pair, four LIKE patterns, category, limit
        assert_eq!(values.0 .0.len(), 8);
        assert!(values
            .0
             .0
            .contains(&sea_query::Value::String(Some(Box::new("%cat%".into())))));
    }

    #[test]
    fn suggestions_use_a_prefix_pattern() {
        let (sql, values) = suggestions_statement("ca", 10).build_sqlx(SqliteQueryBuilder);

        assert!(sql.contains(r#""name" LIKE"#), "got: {sql}");
        assert!(values
            .0
             .0
            .contains(&sea_query::Value::String(Some(Box::new("ca%".into())))));
    }

    #[test]
    fn popular_orders_by_usage_then_popularity() {
        let (sql, _values) = popular_statement(20).build_sqlx(SqliteQueryBuilder);
        assert!(
            sql.contains(r#"ORDER BY "usage_count" DESC, "popularity_score" DESC"#),
            "got: {sql}"
        );
    }

    #[test]
    fn categories_group_and_sort_by_count() {
        let (sql, _values) = categories_statement().build_sqlx(SqliteQueryBuilder);
        assert!(sql.contains(r#"GROUP BY "category""#), "got: {sql}");
        assert!(sql.contains(r#"ORDER BY COUNT("id") DESC"#), "got: {sql}");
    }
}
