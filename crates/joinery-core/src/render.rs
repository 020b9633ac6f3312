//! Rendering of resolved statements into SQL text and parameters.
//!
//! Values never reach the SQL text: every literal, LIMIT and OFFSET is a
//! placeholder with its value in [`Rendered::params`]. The same statement
//! always renders to the same text and parameter order.

use crate::dialect::Dialect;
use crate::error::{Error, Result};
use crate::expr::{BinaryOp, ColumnRef, ExprNode, UnaryOp};
use crate::statement::{
    DeleteStatement, InsertStatement, SelectStatement, Statement, TableRef, UpdateStatement,
};
use crate::value::SqlValue;

/// SQL text with its ordered parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Rendered {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

struct Writer<'a> {
    dialect: &'a dyn Dialect,
    sql: String,
    params: Vec<SqlValue>,
    outer: &'a [SqlValue],
    missing: Option<usize>,
    /// Column references print with their table alias.
    qualify: bool,
}

impl<'a> Writer<'a> {
    fn new(dialect: &'a dyn Dialect, outer: &'a [SqlValue]) -> Self {
        Self {
            dialect,
            sql: String::new(),
            params: Vec::new(),
            outer,
            missing: None,
            qualify: true,
        }
    }

    fn finish(self) -> Rendered {
        Rendered {
            sql: self.sql,
            params: self.params,
        }
    }

    fn push(&mut self, text: &str) {
        self.sql.push_str(text);
    }

    fn ident(&mut self, name: &str) {
        let quoted = self.dialect.quote_identifier(name);
        self.sql.push_str(&quoted);
    }

    fn param(&mut self, value: SqlValue) {
        self.params.push(value);
        let placeholder = self.dialect.placeholder(self.params.len());
        self.sql.push_str(&placeholder);
    }

    fn list<T>(&mut self, items: &[T], mut each: impl FnMut(&mut Self, &T)) {
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                self.push(", ");
            }
            each(self, item);
        }
    }

    fn table(&mut self, table: &TableRef) {
        self.ident(table.table);
        if table.alias != table.table {
            self.push(" AS ");
            self.ident(&table.alias);
        }
    }

    fn column(&mut self, column: &ColumnRef) {
        if self.qualify {
            self.ident(&column.path.alias());
            self.push(".");
        }
        self.ident(column.column.name);
    }

    fn expr(&mut self, node: &ExprNode) {
        match node {
            ExprNode::Column(column) => self.column(column),
            ExprNode::Param(value) => self.param(value.clone()),
            ExprNode::Outer(index) => {
                let value = if let Some(value) = self.outer.get(*index) {
                    value.clone()
                } else {
                    self.missing.get_or_insert(*index);
                    SqlValue::Null
                };
                self.param(value);
            }
            ExprNode::Binary { op, left, right } => {
                self.operand(left, *op);
                self.push(" ");
                self.push(op.as_sql());
                self.push(" ");
                self.operand(right, *op);
            }
            ExprNode::Unary { op, operand } => match op {
                UnaryOp::Not => {
                    self.push("NOT (");
                    self.expr(operand);
                    self.push(")");
                }
                UnaryOp::Neg => {
                    self.push("-");
                    if is_atom(operand) {
                        self.expr(operand);
                    } else {
                        self.push("(");
                        self.expr(operand);
                        self.push(")");
                    }
                }
                UnaryOp::IsNull => {
                    self.grouped(operand);
                    self.push(" IS NULL");
                }
                UnaryOp::IsNotNull => {
                    self.grouped(operand);
                    self.push(" IS NOT NULL");
                }
            },
            ExprNode::Function { name, args } => {
                self.push(name);
                self.push("(");
                self.list(args, Self::expr);
                self.push(")");
            }
            ExprNode::CountAll => self.push("COUNT(*)"),
            ExprNode::Cast { expr, data_type } => {
                self.push("CAST(");
                self.expr(expr);
                self.push(" AS ");
                self.push(data_type.to_sql());
                self.push(")");
            }
            ExprNode::Between {
                expr,
                low,
                high,
                negated,
            } => {
                self.grouped(expr);
                self.push(if *negated { " NOT BETWEEN " } else { " BETWEEN " });
                self.grouped(low);
                self.push(" AND ");
                self.grouped(high);
            }
            ExprNode::InList {
                expr,
                list,
                negated,
            } => {
                if list.is_empty() {
                    self.push(if *negated { "1 = 1" } else { "1 = 0" });
                    return;
                }
                self.grouped(expr);
                self.push(if *negated { " NOT IN (" } else { " IN (" });
                self.list(list, Self::expr);
                self.push(")");
            }
            ExprNode::Row(items) => {
                self.push("(");
                self.list(items, Self::expr);
                self.push(")");
            }
            ExprNode::InSubquery { expr, query } => {
                self.grouped(expr);
                self.push(" IN (");
                self.select(query);
                self.push(")");
            }
        }
    }

    /// Writes the operand of a binary operator, grouped where precedence
    /// would otherwise change its meaning.
    fn operand(&mut self, node: &ExprNode, parent: BinaryOp) {
        let needs_parens = match node {
            ExprNode::Binary { op, .. } => {
                if parent.is_logical() {
                    op.is_logical() && *op != parent
                } else {
                    true
                }
            }
            ExprNode::Between { .. } | ExprNode::InList { .. } | ExprNode::Unary { .. } => {
                !parent.is_logical()
            }
            _ => false,
        };
        if needs_parens {
            self.push("(");
            self.expr(node);
            self.push(")");
        } else {
            self.expr(node);
        }
    }

    /// Writes a postfix or infix operand, grouping anything compound.
    fn grouped(&mut self, node: &ExprNode) {
        if matches!(
            node,
            ExprNode::Binary { .. }
                | ExprNode::Between { .. }
                | ExprNode::InList { .. }
                | ExprNode::Unary { .. }
        ) {
            self.push("(");
            self.expr(node);
            self.push(")");
        } else {
            self.expr(node);
        }
    }

    fn limit(&mut self, value: u64) {
        self.param(SqlValue::Int(i64::try_from(value).unwrap_or(i64::MAX)));
    }

    fn select(&mut self, statement: &SelectStatement) {
        self.push("SELECT ");
        if statement.distinct {
            self.push("DISTINCT ");
        }
        self.list(&statement.columns, |w, column| {
            w.expr(&column.expr);
            if let Some(alias) = &column.alias {
                w.push(" AS ");
                w.ident(alias);
            }
        });
        self.push(" FROM ");
        self.table(&statement.from);
        for join in &statement.joins {
            self.push(" ");
            self.push(join.kind.as_sql());
            self.push(" ");
            self.table(&join.table);
            self.push(" ON ");
            self.expr(&join.on);
        }
        if let Some(filter) = &statement.filter {
            self.push(" WHERE ");
            self.expr(filter);
        }
        if !statement.group_by.is_empty() {
            self.push(" GROUP BY ");
            self.list(&statement.group_by, Self::expr);
        }
        if let Some(having) = &statement.having {
            self.push(" HAVING ");
            self.expr(having);
        }
        if !statement.order_by.is_empty() {
            self.push(" ORDER BY ");
            self.list(&statement.order_by, |w, (expr, order)| {
                w.expr(expr);
                w.push(" ");
                w.push(order.as_sql());
            });
        }
        match (statement.limit, statement.offset) {
            (Some(limit), _) => {
                self.push(" LIMIT ");
                self.limit(limit);
            }
            (None, Some(_)) if self.dialect.requires_limit_for_offset() => {
                self.push(" LIMIT ");
                self.push(self.dialect.unbounded_limit());
            }
            (None, _) => {}
        }
        if let Some(offset) = statement.offset {
            self.push(" OFFSET ");
            self.limit(offset);
        }
    }

    fn insert(&mut self, statement: &InsertStatement) {
        self.push("INSERT INTO ");
        self.ident(statement.table.table);
        if statement.columns.is_empty() {
            self.push(" DEFAULT VALUES");
        } else {
            self.push(" (");
            self.list(&statement.columns, |w, column| w.ident(column));
            self.push(") VALUES ");
            self.list(&statement.rows, |w, row| {
                w.push("(");
                w.list(row, Self::expr);
                w.push(")");
            });
        }
        if statement.has_returning() {
            self.push(" RETURNING ");
            self.qualify = false;
            self.list(&statement.returning, Self::expr);
            self.qualify = true;
        }
    }

    fn update(&mut self, statement: &UpdateStatement) {
        self.push("UPDATE ");
        self.ident(statement.table.table);
        self.push(" SET ");
        self.list(&statement.sets, |w, (column, value)| {
            w.ident(column);
            w.push(" = ");
            w.expr(value);
        });
        if let Some(filter) = &statement.filter {
            self.push(" WHERE ");
            self.expr(filter);
        }
    }

    fn delete(&mut self, statement: &DeleteStatement) {
        self.push("DELETE FROM ");
        self.ident(statement.table.table);
        if let Some(filter) = &statement.filter {
            self.push(" WHERE ");
            self.expr(filter);
        }
    }
}

impl Statement {
    /// Renders the statement for `dialect`.
    #[must_use]
    pub fn render(&self, dialect: &dyn Dialect) -> Rendered {
        let mut writer = Writer::new(dialect, &[]);
        match self {
            Self::Select(statement) => writer.select(statement),
            Self::Insert(statement) => writer.insert(statement),
            Self::Update(statement) => writer.update(statement),
            Self::Delete(statement) => writer.delete(statement),
        }
        writer.finish()
    }
}

impl SelectStatement {
    #[must_use]
    pub fn render(&self, dialect: &dyn Dialect) -> Rendered {
        let mut writer = Writer::new(dialect, &[]);
        writer.select(self);
        writer.finish()
    }

    /// Renders a multiset sub-select with the values of the enclosing row
    /// bound to its correlated references.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Metadata`] when `outer` lacks a referenced value.
    pub fn render_correlated(&self, dialect: &dyn Dialect, outer: &[SqlValue]) -> Result<Rendered> {
        let mut writer = Writer::new(dialect, outer);
        writer.select(self);
        match writer.missing {
            Some(index) => Err(Error::metadata(format!(
                "correlated value {index} is missing; {} bound",
                outer.len()
            ))),
            None => Ok(writer.finish()),
        }
    }
}

/// Nodes that never need grouping under a prefix operator.
const fn is_atom(node: &ExprNode) -> bool {
    matches!(
        node,
        ExprNode::Column(_)
            | ExprNode::Param(_)
            | ExprNode::Outer(_)
            | ExprNode::Function { .. }
            | ExprNode::CountAll
            | ExprNode::Cast { .. }
            | ExprNode::Row(_)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{delete_from, insert_into, select, update, BuildStatement};
    use crate::dialect::{GenericDialect, PostgresDialect};
    use crate::expr::count_all;
    use crate::projection::multiset;
    use crate::schema::Table;
    use crate::statement::Slot;
    use crate::testing::{self, AthleteTable, ClubTable, CompetitionTable, SeriesTable};

    fn sql(statement: &impl BuildStatement) -> Rendered {
        let schema = testing::schema();
        statement.to_sql(&schema, &GenericDialect).unwrap()
    }

    #[test]
    fn test_select_with_bound_literal() {
        let a = AthleteTable::root();
        let rendered = sql(&select((a.first_name(), a.last_name()))
            .from(&a)
            .where_clause(a.id().eq(1000_i64)));
        assert_eq!(
            rendered.sql,
            "SELECT \"athlete\".\"first_name\", \"athlete\".\"last_name\" FROM \"athlete\" \
             WHERE \"athlete\".\"id\" = ?"
        );
        assert_eq!(rendered.params, vec![SqlValue::Int(1000)]);
    }

    #[test]
    fn test_literals_never_reach_sql_text() {
        let a = AthleteTable::root();
        let hostile = "'; DROP TABLE athlete; --";
        let rendered = sql(&select(a.id()).from(&a).where_clause(a.last_name().eq(hostile)));
        assert!(!rendered.sql.contains("DROP"));
        assert_eq!(rendered.params, vec![SqlValue::Text(hostile.into())]);
    }

    #[test]
    fn test_implicit_join_rendering() {
        let a = AthleteTable::root();
        let rendered = sql(&select((a.first_name(), a.club().name()))
            .from(&a)
            .where_clause(a.club().name().eq("Louisiana State University")));
        assert_eq!(
            rendered.sql,
            "SELECT \"athlete\".\"first_name\", \"athlete__club\".\"name\" FROM \"athlete\" \
             INNER JOIN \"club\" AS \"athlete__club\" \
             ON \"athlete__club\".\"id\" = \"athlete\".\"club_id\" \
             WHERE \"athlete__club\".\"name\" = ?"
        );
    }

    #[test]
    fn test_explicit_join_with_alias() {
        let a = AthleteTable::root();
        let c = ClubTable::aliased("c");
        let rendered = sql(&select((a.last_name(), c.name()))
            .from(&a)
            .left_join(&c)
            .on(c.id().eq(a.club_id())));
        assert_eq!(
            rendered.sql,
            "SELECT \"athlete\".\"last_name\", \"c\".\"name\" FROM \"athlete\" \
             LEFT JOIN \"club\" AS \"c\" ON \"c\".\"id\" = \"athlete\".\"club_id\""
        );
    }

    #[test]
    fn test_grouping_and_labels() {
        let a = AthleteTable::root();
        let rendered = sql(&select((a.club_id(), count_all().as_("athletes")))
            .from(&a)
            .group_by(a.club_id())
            .having(count_all().gt(1_i64))
            .order_by_desc(count_all()));
        assert_eq!(
            rendered.sql,
            "SELECT \"athlete\".\"club_id\", COUNT(*) AS \"athletes\" FROM \"athlete\" \
             GROUP BY \"athlete\".\"club_id\" HAVING COUNT(*) > ? ORDER BY COUNT(*) DESC"
        );
    }

    #[test]
    fn test_limit_and_offset_are_parameters() {
        let a = AthleteTable::root();
        let rendered = sql(&select(a.id()).from(&a).order_by(a.id()).limit(10).offset(20));
        assert!(rendered.sql.ends_with("ORDER BY \"athlete\".\"id\" ASC LIMIT ? OFFSET ?"));
        assert_eq!(rendered.params, vec![SqlValue::Int(10), SqlValue::Int(20)]);
    }

    #[test]
    fn test_offset_without_limit_uses_dialect_hook() {
        struct Strict;
        impl Dialect for Strict {
            fn name(&self) -> &'static str {
                "strict"
            }
            fn requires_limit_for_offset(&self) -> bool {
                true
            }
            fn unbounded_limit(&self) -> &'static str {
                "-1"
            }
        }
        let schema = testing::schema();
        let a = AthleteTable::root();
        let rendered = select(a.id()).from(&a).offset(5).to_sql(&schema, &Strict).unwrap();
        assert!(rendered.sql.ends_with("LIMIT -1 OFFSET ?"));
        assert_eq!(rendered.params, vec![SqlValue::Int(5)]);
    }

    #[test]
    fn test_postgres_numbers_placeholders() {
        let schema = testing::schema();
        let a = AthleteTable::root();
        let rendered = select(a.id())
            .from(&a)
            .where_clause(a.id().eq(1000_i64))
            .where_clause(a.year_of_birth().gt(1990))
            .to_sql(&schema, &PostgresDialect)
            .unwrap();
        assert!(rendered
            .sql
            .ends_with("WHERE \"athlete\".\"id\" = $1 AND \"athlete\".\"year_of_birth\" > $2"));
    }

    #[test]
    fn test_or_inside_and_is_grouped() {
        let a = AthleteTable::root();
        let rendered = sql(&select(a.id()).from(&a).where_clause(
            a.gender()
                .eq("M")
                .and(a.first_name().eq("Armand").or(a.first_name().eq("Mondo"))),
        ));
        assert!(rendered.sql.ends_with(
            "WHERE \"athlete\".\"gender\" = ? AND \
             (\"athlete\".\"first_name\" = ? OR \"athlete\".\"first_name\" = ?)"
        ));
    }

    #[test]
    fn test_arithmetic_and_empty_in_list() {
        let a = AthleteTable::root();
        let rendered = sql(&select((a.year_of_birth() + 1).as_("next"))
            .from(&a)
            .where_clause(a.id().in_list(Vec::<i64>::new()).not()));
        assert_eq!(
            rendered.sql,
            "SELECT \"athlete\".\"year_of_birth\" + ? AS \"next\" FROM \"athlete\" \
             WHERE NOT (1 = 0)"
        );
    }

    #[test]
    fn test_double_negation_is_grouped() {
        let a = AthleteTable::root();
        let rendered = sql(&select((-(-a.year_of_birth().expr())).as_("y")).from(&a));
        assert_eq!(
            rendered.sql,
            "SELECT -(-\"athlete\".\"year_of_birth\") AS \"y\" FROM \"athlete\""
        );
        assert!(!rendered.sql.contains("--"));

        let rendered = sql(&select((-(a.year_of_birth() + 1)).as_("y")).from(&a));
        assert!(rendered.sql.starts_with("SELECT -(\"athlete\".\"year_of_birth\" + ?)"));
    }

    #[test]
    fn test_unary_operands_of_comparisons_are_grouped() {
        let a = AthleteTable::root();
        let rendered = sql(&select(a.id())
            .from(&a)
            .where_clause(a.club_id().is_null().eq(a.id().gt(1000_i64))));
        assert!(rendered.sql.ends_with(
            "WHERE (\"athlete\".\"club_id\" IS NULL) = (\"athlete\".\"id\" > ?)"
        ));

        let rendered = sql(&select(a.id())
            .from(&a)
            .where_clause(a.id().gt(1000_i64).eq(a.club_id().is_null().not())));
        assert!(rendered.sql.ends_with(
            "WHERE (\"athlete\".\"id\" > ?) = (NOT (\"athlete\".\"club_id\" IS NULL))"
        ));

        let rendered = sql(&select(a.id())
            .from(&a)
            .where_clause(a.club_id().is_null().and(a.id().gt(1000_i64))));
        assert!(rendered.sql.ends_with(
            "WHERE \"athlete\".\"club_id\" IS NULL AND \"athlete\".\"id\" > ?"
        ));
    }

    #[test]
    fn test_rendering_is_deterministic() {
        let schema = testing::schema();
        let a = AthleteTable::root();
        let statement = select((a.club().name(), a.organization().name(), a.last_name()))
            .from(&a)
            .where_clause(a.club().organization().name().like("%League%"))
            .build(&schema)
            .unwrap();
        assert_eq!(statement.render(&GenericDialect), statement.render(&GenericDialect));
    }

    #[test]
    fn test_insert_returning() {
        let a = AthleteTable::root();
        let rendered = sql(&insert_into(&a)
            .set(a.first_name(), "Mondo")
            .set(a.year_of_birth(), 1999)
            .returning(a.id()));
        assert_eq!(
            rendered.sql,
            "INSERT INTO \"athlete\" (\"first_name\", \"year_of_birth\") VALUES (?, ?) \
             RETURNING \"id\""
        );
        assert_eq!(
            rendered.params,
            vec![SqlValue::Text("Mondo".into()), SqlValue::Int(1999)]
        );
    }

    #[test]
    fn test_multi_row_insert() {
        let c = ClubTable::root();
        let rendered = sql(&insert_into(&c)
            .columns((c.name(), c.organization_id()))
            .values(("Ole Miss", 1_i64))
            .values(("Texas A&M", 1_i64)));
        assert_eq!(
            rendered.sql,
            "INSERT INTO \"club\" (\"name\", \"organization_id\") VALUES (?, ?), (?, ?)"
        );
        assert_eq!(rendered.params.len(), 4);
    }

    #[test]
    fn test_update_sets_only_assigned_columns() {
        let a = AthleteTable::root();
        let rendered = sql(&update(&a)
            .set(a.year_of_birth(), 2000)
            .where_clause(a.id().eq(1000_i64)));
        assert_eq!(
            rendered.sql,
            "UPDATE \"athlete\" SET \"year_of_birth\" = ? WHERE \"athlete\".\"id\" = ?"
        );
        assert_eq!(rendered.params, vec![SqlValue::Int(2000), SqlValue::Int(1000)]);
    }

    #[test]
    fn test_delete_through_navigation() {
        let a = AthleteTable::root();
        let rendered = sql(&delete_from(&a).where_clause(a.club().name().eq("LSU")));
        assert_eq!(
            rendered.sql,
            "DELETE FROM \"athlete\" WHERE \"athlete\".\"id\" IN \
             (SELECT \"athlete\".\"id\" FROM \"athlete\" \
             INNER JOIN \"club\" AS \"athlete__club\" \
             ON \"athlete__club\".\"id\" = \"athlete\".\"club_id\" \
             WHERE \"athlete__club\".\"name\" = ?)"
        );
    }

    #[test]
    fn test_multiset_renders_hidden_key_and_correlated_subselect() {
        let schema = testing::schema();
        let s = SeriesTable::root();
        let c = CompetitionTable::root();
        let statement = select((
            s.name(),
            multiset(
                select((c.id(), c.name()))
                    .from(&c)
                    .where_clause(c.series_id().eq(s.id()))
                    .order_by(c.id()),
            )
            .into_multiset()
            .as_("competitions"),
        ))
        .from(&s)
        .build(&schema)
        .unwrap();

        let rendered = statement.render(&GenericDialect);
        assert_eq!(
            rendered.sql,
            "SELECT \"series\".\"name\", \"series\".\"id\" FROM \"series\""
        );

        let Some(Slot::Multiset { query, .. }) = statement.layout().and_then(|l| l.slots.get(1))
        else {
            panic!("expected a multiset slot");
        };
        let child = query
            .render_correlated(&GenericDialect, &[SqlValue::Int(7)])
            .unwrap();
        assert_eq!(
            child.sql,
            "SELECT \"competition\".\"id\", \"competition\".\"name\" FROM \"competition\" \
             WHERE \"competition\".\"series_id\" = ? ORDER BY \"competition\".\"id\" ASC"
        );
        assert_eq!(child.params, vec![SqlValue::Int(7)]);
        assert!(query.render_correlated(&GenericDialect, &[]).is_err());
    }
}
