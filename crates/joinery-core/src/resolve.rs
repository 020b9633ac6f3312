//! Resolution of builder queries into statements.
//!
//! This is where table paths meet the schema. Every column reference is
//! walked from its root alias through its navigation steps; each distinct
//! (parent path, foreign key) edge becomes exactly one INNER JOIN aliased
//! `<parent alias>__<navigation>`.

use crate::builder::{DeleteQuery, InsertQuery, JoinKind, SelectQuery, UpdateQuery};
use crate::error::{Error, Result};
use crate::expr::{BinaryOp, ColumnRef, ExprNode};
use crate::projection::ProjectionItem;
use crate::row::{Label, Origin};
use crate::schema::{ColumnDef, ForeignKeyDef, Schema, Step, TableDef, TablePath};
use crate::statement::{
    DeleteStatement, InsertStatement, Join, Layout, SelectColumn, SelectStatement, Slot,
    TableRef, UpdateStatement,
};

struct ScopeEntry {
    alias: String,
    def: &'static TableDef,
    /// `None` for the FROM table, the explicit join index otherwise.
    anchor: Option<usize>,
}

struct ImplicitJoin {
    alias: String,
    def: &'static TableDef,
    on: ExprNode,
    anchor: Option<usize>,
}

#[derive(Default)]
struct Projection {
    columns: Vec<SelectColumn>,
    hidden: Vec<SelectColumn>,
}

impl Projection {
    fn push(&mut self, expr: ExprNode, label: Option<String>) -> Slot {
        let index = self.columns.len();
        let origin = match &expr {
            ExprNode::Column(column) => Some(Origin {
                alias: column.path.alias(),
                column: column.column.name,
            }),
            _ => None,
        };
        let name = label.clone().unwrap_or_else(|| default_label(&expr));
        self.columns.push(SelectColumn { expr, alias: label });
        Slot::Column {
            index,
            label: Label { name, origin },
        }
    }
}

fn default_label(expr: &ExprNode) -> String {
    match expr {
        ExprNode::Column(column) => column.column.name.to_string(),
        ExprNode::Function { name, .. } => name.to_ascii_lowercase(),
        ExprNode::CountAll => String::from("count"),
        ExprNode::Cast { expr, .. } => default_label(expr),
        _ => String::from("expr"),
    }
}

fn column_node(path: TablePath, column: &'static ColumnDef) -> ExprNode {
    ExprNode::Column(ColumnRef { path, column })
}

fn shift_bindings(slots: &mut [Slot], base: usize) {
    for slot in slots {
        match slot {
            Slot::Column { .. } => {}
            Slot::Nested { slots, .. } => shift_bindings(slots, base),
            Slot::Multiset { bindings, .. } => {
                bindings.iter_mut().for_each(|index| *index += base);
            }
        }
    }
}

fn contains_multiset(slots: &[Slot]) -> bool {
    slots.iter().any(|slot| match slot {
        Slot::Column { .. } => false,
        Slot::Nested { slots, .. } => contains_multiset(slots),
        Slot::Multiset { .. } => true,
    })
}

struct Resolver<'s> {
    schema: &'s Schema,
    scope: Vec<ScopeEntry>,
    implicit: Vec<ImplicitJoin>,
    /// References to enclosing statements, when resolving a multiset.
    outer: Option<Vec<(String, ExprNode)>>,
}

impl<'s> Resolver<'s> {
    const fn new(schema: &'s Schema, correlated: bool) -> Self {
        Self {
            schema,
            scope: Vec::new(),
            implicit: Vec::new(),
            outer: if correlated { Some(Vec::new()) } else { None },
        }
    }

    fn enter(&mut self, path: &TablePath, anchor: Option<usize>) -> Result<&'static TableDef> {
        if !path.is_root() {
            return Err(Error::metadata(format!(
                "`{path}` is a navigation; FROM and JOIN take a table handle"
            )));
        }
        let def = self.schema.table(path.table())?;
        let alias = path.alias();
        if self.scope.iter().any(|entry| entry.alias == alias) {
            return Err(Error::metadata(format!(
                "alias `{alias}` is used twice; alias one of the tables"
            )));
        }
        self.scope.push(ScopeEntry { alias, def, anchor });
        Ok(def)
    }

    /// Enters the target of an INSERT, UPDATE or DELETE.
    fn enter_target(&mut self, path: &TablePath) -> Result<&'static TableDef> {
        if path.root_alias() != path.table() {
            return Err(Error::metadata(format!(
                "`{}` is aliased; data changes need the table's own handle",
                path.root_alias()
            )));
        }
        self.enter(path, None)
    }

    fn expr(&mut self, node: &ExprNode) -> Result<ExprNode> {
        Ok(match node {
            ExprNode::Column(column) => return self.column(column),
            ExprNode::Param(_)
            | ExprNode::Outer(_)
            | ExprNode::CountAll
            | ExprNode::InSubquery { .. } => node.clone(),
            ExprNode::Binary { op, left, right } => ExprNode::Binary {
                op: *op,
                left: Box::new(self.expr(left)?),
                right: Box::new(self.expr(right)?),
            },
            ExprNode::Unary { op, operand } => ExprNode::Unary {
                op: *op,
                operand: Box::new(self.expr(operand)?),
            },
            ExprNode::Function { name, args } => ExprNode::Function {
                name,
                args: self.exprs(args)?,
            },
            ExprNode::Cast { expr, data_type } => ExprNode::Cast {
                expr: Box::new(self.expr(expr)?),
                data_type: *data_type,
            },
            ExprNode::Between {
                expr,
                low,
                high,
                negated,
            } => ExprNode::Between {
                expr: Box::new(self.expr(expr)?),
                low: Box::new(self.expr(low)?),
                high: Box::new(self.expr(high)?),
                negated: *negated,
            },
            ExprNode::InList {
                expr,
                list,
                negated,
            } => ExprNode::InList {
                expr: Box::new(self.expr(expr)?),
                list: self.exprs(list)?,
                negated: *negated,
            },
            ExprNode::Row(items) => ExprNode::Row(self.exprs(items)?),
        })
    }

    fn exprs(&mut self, nodes: &[ExprNode]) -> Result<Vec<ExprNode>> {
        nodes.iter().map(|node| self.expr(node)).collect()
    }

    fn column(&mut self, column: &ColumnRef) -> Result<ExprNode> {
        let path = &column.path;
        let Some(entry) = self
            .scope
            .iter()
            .find(|entry| entry.alias == path.root_alias())
        else {
            return self.correlate(column);
        };
        if entry.def.name != path.root_table() {
            return Err(Error::metadata(format!(
                "alias `{}` names table `{}`, not `{}`",
                entry.alias,
                entry.def.name,
                path.root_table()
            )));
        }
        let anchor = entry.anchor;
        let mut def = entry.def;
        let mut current = TablePath::aliased(path.root_table(), path.root_alias());
        for step in path.steps() {
            let fk = match step {
                Step::Foreign(name) => self.schema.navigation(def.name, name)?,
                Step::ToTable(target) => self.schema.edge_to(def.name, target)?,
            };
            let target = self.schema.table(fk.target_table().name)?;
            let next = current.navigate(fk.name, target.name);
            self.join_edge(&current, def, &next, target, fk, anchor)?;
            current = next;
            def = target;
        }
        let resolved = def.column(column.column.name).ok_or_else(|| {
            Error::metadata(format!(
                "unknown column `{}` on table `{}`",
                column.column.name, def.name
            ))
        })?;
        Ok(column_node(current, resolved))
    }

    fn join_edge(
        &mut self,
        parent: &TablePath,
        parent_def: &'static TableDef,
        child: &TablePath,
        child_def: &'static TableDef,
        fk: &'static ForeignKeyDef,
        anchor: Option<usize>,
    ) -> Result<()> {
        let alias = child.alias();
        if self.implicit.iter().any(|join| join.alias == alias) {
            return Ok(());
        }
        if self.scope.iter().any(|entry| entry.alias == alias) {
            return Err(Error::metadata(format!(
                "navigation alias `{alias}` collides with an explicit table alias"
            )));
        }
        let mut conditions = Vec::new();
        for (source, target) in fk.columns.iter().zip(fk.target_columns()) {
            let source = parent_def.column(source).ok_or_else(|| {
                Error::metadata(format!("unknown column `{}.{source}`", parent_def.name))
            })?;
            let target = child_def.column(target).ok_or_else(|| {
                Error::metadata(format!("unknown column `{}.{target}`", child_def.name))
            })?;
            conditions.push(ExprNode::binary(
                column_node(child.clone(), target),
                BinaryOp::Eq,
                column_node(parent.clone(), source),
            ));
        }
        let on = ExprNode::and_all(conditions).ok_or_else(|| {
            Error::metadata(format!("foreign key `{}` has no columns", fk.name))
        })?;
        self.implicit.push(ImplicitJoin {
            alias,
            def: child_def,
            on,
            anchor,
        });
        Ok(())
    }

    fn correlate(&mut self, column: &ColumnRef) -> Result<ExprNode> {
        let Some(outer) = self.outer.as_mut() else {
            return Err(Error::metadata(format!(
                "table `{}` is not in scope; add it to FROM or join it",
                column.path.root_alias()
            )));
        };
        let key = format!("{}.{}", column.path.alias(), column.column.name);
        let index = if let Some(index) = outer.iter().position(|(k, _)| *k == key) {
            index
        } else {
            outer.push((key, ExprNode::Column(column.clone())));
            outer.len() - 1
        };
        Ok(ExprNode::Outer(index))
    }

    fn items(&mut self, items: &[ProjectionItem], out: &mut Projection) -> Result<Vec<Slot>> {
        let mut slots = Vec::with_capacity(items.len());
        for item in items {
            match item {
                ProjectionItem::Expr { node, label } => {
                    let expr = self.expr(node)?;
                    slots.push(out.push(expr, label.clone()));
                }
                ProjectionItem::AllColumns { path } => {
                    let def = self.schema.table(path.table())?;
                    for column in def.columns {
                        let expr = self.column(&ColumnRef {
                            path: path.clone(),
                            column,
                        })?;
                        slots.push(out.push(expr, None));
                    }
                }
                ProjectionItem::Asterisk => {
                    let tables: Vec<(String, &'static TableDef)> = self
                        .scope
                        .iter()
                        .map(|entry| (entry.alias.clone(), entry.def))
                        .collect();
                    for (alias, def) in tables {
                        for column in def.columns {
                            let path = TablePath::aliased(def.name, &alias);
                            slots.push(out.push(column_node(path, column), None));
                        }
                    }
                }
                ProjectionItem::Nested { label, items } => {
                    let nested = self.items(items, out)?;
                    slots.push(Slot::Nested {
                        label: label.clone(),
                        slots: nested,
                    });
                }
                ProjectionItem::Multiset { label, query } => {
                    let (statement, outer_refs) = select_scoped(self.schema, query, true)?;
                    let mut bindings = Vec::with_capacity(outer_refs.len());
                    for node in &outer_refs {
                        let expr = self.expr(node)?;
                        bindings.push(out.hidden.len());
                        out.hidden.push(SelectColumn { expr, alias: None });
                    }
                    slots.push(Slot::Multiset {
                        label: label.clone(),
                        query: Box::new(statement),
                        bindings,
                    });
                }
            }
        }
        Ok(slots)
    }

    /// Implicit joins first, then each explicit join followed by the
    /// implicit joins that navigate from it.
    fn joins(&mut self, explicit: Vec<(JoinKind, TableRef, ExprNode)>) -> Vec<Join> {
        let implicit = std::mem::take(&mut self.implicit);
        let to_join = |join: &ImplicitJoin| Join {
            kind: JoinKind::Inner,
            table: TableRef::new(join.def.name, join.alias.clone()),
            on: join.on.clone(),
            implicit: true,
        };
        let mut joins: Vec<Join> = implicit
            .iter()
            .filter(|join| join.anchor.is_none())
            .map(to_join)
            .collect();
        for (index, (kind, table, on)) in explicit.into_iter().enumerate() {
            joins.push(Join {
                kind,
                table,
                on,
                implicit: false,
            });
            joins.extend(
                implicit
                    .iter()
                    .filter(|join| join.anchor == Some(index))
                    .map(to_join),
            );
        }
        joins
    }

    /// Rewrites a navigating UPDATE or DELETE condition into
    /// `pk IN (SELECT pk FROM t JOIN ... WHERE condition)`.
    fn key_subquery(
        &mut self,
        def: &'static TableDef,
        filter: Option<ExprNode>,
    ) -> Result<Option<ExprNode>> {
        if self.implicit.is_empty() {
            return Ok(filter);
        }
        if def.primary_key.is_empty() {
            return Err(Error::Unsupported(format!(
                "`{}` has no primary key, so its conditions cannot navigate",
                def.name
            )));
        }
        let key: Vec<ExprNode> = def
            .primary_key
            .iter()
            .filter_map(|name| def.column(name))
            .map(|column| column_node(TablePath::root(def.name), column))
            .collect();
        let joins = self.joins(Vec::new());
        let subquery = SelectStatement {
            distinct: false,
            columns: key
                .iter()
                .map(|expr| SelectColumn {
                    expr: expr.clone(),
                    alias: None,
                })
                .collect(),
            from: TableRef::new(def.name, def.name),
            joins,
            filter,
            group_by: Vec::new(),
            having: None,
            order_by: Vec::new(),
            limit: None,
            offset: None,
            layout: Layout::default(),
        };
        let lhs = match <[ExprNode; 1]>::try_from(key) {
            Ok([single]) => single,
            Err(many) => ExprNode::Row(many),
        };
        Ok(Some(ExprNode::InSubquery {
            expr: Box::new(lhs),
            query: Box::new(subquery),
        }))
    }
}

/// Resolves a SELECT.
pub(crate) fn select(schema: &Schema, query: &SelectQuery) -> Result<SelectStatement> {
    select_scoped(schema, query, false).map(|(statement, _)| statement)
}

fn select_scoped(
    schema: &Schema,
    query: &SelectQuery,
    correlated: bool,
) -> Result<(SelectStatement, Vec<ExprNode>)> {
    let mut resolver = Resolver::new(schema, correlated);
    let from = query
        .from
        .as_ref()
        .ok_or_else(|| Error::metadata("SELECT needs a FROM table"))?;
    let from_def = resolver.enter(from, None)?;
    let mut tables = Vec::with_capacity(query.joins.len());
    for (index, join) in query.joins.iter().enumerate() {
        let def = resolver.enter(&join.path, Some(index))?;
        tables.push(TableRef::new(def.name, join.path.alias()));
    }
    if query.items.is_empty() {
        return Err(Error::metadata("SELECT needs at least one item"));
    }

    let mut projection = Projection::default();
    let mut slots = resolver.items(&query.items, &mut projection)?;
    let mut explicit = Vec::with_capacity(query.joins.len());
    for (join, table) in query.joins.iter().zip(tables) {
        explicit.push((join.kind, table, resolver.expr(&join.on)?));
    }
    let filter = query
        .filter
        .as_ref()
        .map(|f| resolver.expr(f))
        .transpose()?;
    let group_by = resolver.exprs(&query.group_by)?;
    let having = query
        .having
        .as_ref()
        .map(|h| resolver.expr(h))
        .transpose()?;
    let mut order_by = Vec::with_capacity(query.order_by.len());
    for spec in &query.order_by {
        order_by.push((resolver.expr(&spec.expr)?, spec.order));
    }

    shift_bindings(&mut slots, projection.columns.len());
    let mut columns = projection.columns;
    columns.extend(projection.hidden);
    let joins = resolver.joins(explicit);
    let outer = resolver
        .outer
        .take()
        .map(|refs| refs.into_iter().map(|(_, node)| node).collect())
        .unwrap_or_default();

    let statement = SelectStatement {
        distinct: query.distinct,
        columns,
        from: TableRef::new(from_def.name, from.alias()),
        joins,
        filter,
        group_by,
        having,
        order_by,
        limit: query.limit,
        offset: query.offset,
        layout: Layout { slots },
    };
    Ok((statement, outer))
}

/// Resolves an INSERT.
pub(crate) fn insert(schema: &Schema, query: &InsertQuery) -> Result<InsertStatement> {
    let mut resolver = Resolver::new(schema, false);
    let def = resolver.enter_target(&query.table)?;
    let mut columns: Vec<&'static str> = Vec::with_capacity(query.columns.len());
    for column in &query.columns {
        let resolved = def.column(column.name).ok_or_else(|| {
            Error::metadata(format!("unknown column `{}.{}`", def.name, column.name))
        })?;
        if columns.contains(&resolved.name) {
            return Err(Error::metadata(format!(
                "column `{}` is assigned twice",
                resolved.name
            )));
        }
        columns.push(resolved.name);
    }
    if !columns.is_empty() && query.rows.is_empty() {
        return Err(Error::metadata("INSERT names columns but has no rows"));
    }
    let mut rows = Vec::with_capacity(query.rows.len());
    for row in &query.rows {
        if row.len() != columns.len() {
            return Err(Error::metadata(format!(
                "INSERT row has {} value(s) for {} column(s)",
                row.len(),
                columns.len()
            )));
        }
        rows.push(resolver.exprs(row)?);
    }

    let (returning, layout) = if query.returning.is_empty() {
        (Vec::new(), None)
    } else {
        let mut projection = Projection::default();
        let slots = resolver.items(&query.returning, &mut projection)?;
        if contains_multiset(&slots) {
            return Err(Error::Unsupported(String::from(
                "RETURNING cannot contain a multiset",
            )));
        }
        let returning = projection.columns.into_iter().map(|c| c.expr).collect();
        (returning, Some(Layout { slots }))
    };
    if !resolver.implicit.is_empty() {
        return Err(Error::metadata("INSERT cannot navigate to other tables"));
    }

    Ok(InsertStatement {
        table: TableRef::new(def.name, def.name),
        primary_key: def
            .primary_key
            .iter()
            .filter_map(|name| def.column(name))
            .collect(),
        columns,
        rows,
        returning,
        layout,
    })
}

/// Resolves an UPDATE.
pub(crate) fn update(schema: &Schema, query: &UpdateQuery) -> Result<UpdateStatement> {
    let mut resolver = Resolver::new(schema, false);
    let def = resolver.enter_target(&query.table)?;
    let mut sets: Vec<(&'static str, ExprNode)> = Vec::with_capacity(query.sets.len());
    for (column, value) in &query.sets {
        let resolved = def.column(column.name).ok_or_else(|| {
            Error::metadata(format!("unknown column `{}.{}`", def.name, column.name))
        })?;
        if sets.iter().any(|(name, _)| *name == resolved.name) {
            return Err(Error::metadata(format!(
                "column `{}` is assigned twice",
                resolved.name
            )));
        }
        sets.push((resolved.name, resolver.expr(value)?));
    }
    if !resolver.implicit.is_empty() {
        return Err(Error::metadata("SET values cannot navigate to other tables"));
    }
    let filter = query
        .filter
        .as_ref()
        .map(|f| resolver.expr(f))
        .transpose()?;
    let filter = resolver.key_subquery(def, filter)?;
    Ok(UpdateStatement {
        table: TableRef::new(def.name, def.name),
        sets,
        filter,
    })
}

/// Resolves a DELETE.
pub(crate) fn delete(schema: &Schema, query: &DeleteQuery) -> Result<DeleteStatement> {
    let mut resolver = Resolver::new(schema, false);
    let def = resolver.enter_target(&query.table)?;
    let filter = query
        .filter
        .as_ref()
        .map(|f| resolver.expr(f))
        .transpose()?;
    let filter = resolver.key_subquery(def, filter)?;
    Ok(DeleteStatement {
        table: TableRef::new(def.name, def.name),
        filter,
    })
}
