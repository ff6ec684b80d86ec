//! Query binding: FROM, WHERE, GROUP BY, HAVING, select list, ORDER BY, TOP
//! and set operations.

use std::collections::HashSet;

use crate::diagnostics::DiagnosticId;
use crate::parser::{NodeId, SyntaxKind, SyntaxNodeKind, TokenId};
use crate::text::TextSpan;
use crate::types::{DataType, Value};

use super::conversion::common_type;
use super::expression::BoundExpression;
use super::model::Symbol;
use super::relation::{BoundQuery, BoundRelation, JoinType, QueryColumn, SetOperation, SortKey};
use super::scope::{
    AggregatedValue, ClauseContext, ColumnInstance, ComputedValue, TableInstance, ValueSlot,
};
use super::semantic::Binder;

/// One column of a select list after wildcard expansion.
struct SelectItem {
    node: Option<NodeId>,
    span: TextSpan,
    expression: BoundExpression,
    name: String,
    has_alias: bool,
}

enum OrderTarget {
    /// Select-list alias, by item index.
    Item(usize),
    Expression(BoundExpression),
}

struct OrderItem {
    node: NodeId,
    target: OrderTarget,
    ascending: bool,
}

fn empty_query() -> BoundQuery {
    BoundQuery {
        relation: BoundRelation::Constant,
        output_columns: Vec::new(),
    }
}

fn with_compute(input: BoundRelation, values: Vec<ComputedValue>) -> BoundRelation {
    if values.is_empty() {
        input
    } else {
        BoundRelation::Compute {
            input: Box::new(input),
            values,
        }
    }
}

impl Binder<'_> {
    /// Binds any query node and records the result.
    pub(super) fn bind_query(&mut self, node: NodeId) -> BoundQuery {
        let tree = self.tree;
        let query = match &tree.node(node).kind {
            SyntaxNodeKind::SelectQuery { .. } => self.bind_select_query(node, &[]),
            SyntaxNodeKind::OrderedQuery { query, columns, .. } => {
                self.bind_ordered_query(*query, &columns.items)
            }
            SyntaxNodeKind::CombinedQuery {
                left,
                operator,
                all_keyword,
                right,
            } => self.bind_combined_query(*left, *operator, all_keyword.is_some(), *right),
            SyntaxNodeKind::ParenthesizedQuery { query, .. } => self.bind_query(*query),
            _ => empty_query(),
        };
        self.output.queries.insert(node, query.clone());
        query
    }

    fn set_clause(&mut self, clause: ClauseContext) -> ClauseContext {
        match self.state_mut() {
            Some(state) => std::mem::replace(&mut state.clause, clause),
            None => ClauseContext::None,
        }
    }

    fn bind_clause_condition(&mut self, node: NodeId, clause: ClauseContext) -> BoundExpression {
        let saved = self.set_clause(clause);
        let condition = self.bind_condition(node);
        self.set_clause(saved);
        condition
    }

    fn order_column_parts(&self, node: NodeId) -> (NodeId, bool) {
        match &self.tree.node(node).kind {
            SyntaxNodeKind::OrderByColumn {
                expression,
                modifier,
            } => {
                let ascending =
                    modifier.map_or(true, |m| self.tree.token(m).kind != SyntaxKind::DescKeyword);
                (*expression, ascending)
            }
            _ => (node, true),
        }
    }

    fn bind_ordered_query(&mut self, inner: NodeId, order_columns: &[NodeId]) -> BoundQuery {
        if matches!(
            self.tree.node(inner).kind,
            SyntaxNodeKind::SelectQuery { .. }
        ) {
            let query = self.bind_select_query(inner, order_columns);
            self.output.queries.insert(inner, query.clone());
            return query;
        }

        let query = self.bind_query(inner);
        let outputs = query.output_slots();

        // Only the combined output columns are visible to ORDER BY here.
        let saved = self.push_state(self.current);
        if let Some(state) = self.state_mut() {
            state.clause = ClauseContext::OrderBy;
            state.tables.push(TableInstance {
                name: String::new(),
                table: None,
                columns: query
                    .output_columns
                    .iter()
                    .map(|c| ColumnInstance {
                        name: c.name.clone(),
                        slot: c.slot.clone(),
                    })
                    .collect(),
            });
        }
        let mut keys = Vec::new();
        for column in order_columns {
            let (expression, ascending) = self.order_column_parts(*column);
            match self.bind_expression(expression) {
                BoundExpression::ValueSlot(slot) if outputs.contains(&slot) => {
                    keys.push(SortKey { slot, ascending });
                }
                BoundExpression::Error => {}
                _ => self.report(
                    DiagnosticId::OrderByItemsMustBeInSelectListIfUnionSpecified,
                    self.span(expression),
                    vec![],
                ),
            }
        }
        self.pop_state(saved);

        if keys.is_empty() {
            return query;
        }
        BoundQuery {
            relation: BoundRelation::Sort {
                input: Box::new(query.relation),
                keys,
            },
            output_columns: query.output_columns,
        }
    }

    fn bind_combined_query(
        &mut self,
        left: NodeId,
        operator: TokenId,
        all: bool,
        right: NodeId,
    ) -> BoundQuery {
        let op = match (self.tree.token(operator).kind, all) {
            (SyntaxKind::UnionKeyword, true) => SetOperation::UnionAll,
            (SyntaxKind::UnionKeyword, false) => SetOperation::Union,
            (SyntaxKind::IntersectKeyword, _) => SetOperation::Intersect,
            _ => SetOperation::Except,
        };
        let left_query = self.bind_query(left);
        let right_query = self.bind_query(right);

        if left_query.output_columns.len() != right_query.output_columns.len() {
            self.report(
                DiagnosticId::DifferentExpressionCountInBinaryQuery,
                self.token_span(operator),
                vec![op.to_string()],
            );
            return left_query;
        }

        let mut left_conversions = Vec::new();
        let mut right_conversions = Vec::new();
        let mut left_values = Vec::new();
        let mut right_values = Vec::new();
        let mut output_columns = Vec::new();
        for (l, r) in left_query
            .output_columns
            .iter()
            .zip(&right_query.output_columns)
        {
            let left_type = l.slot.data_type;
            let right_type = r.slot.data_type;
            let data_type = match common_type(self.context, &[left_type, right_type]) {
                Some(data_type) => data_type,
                None => {
                    self.report_cannot_convert(self.span(right), right_type, left_type);
                    left_type
                }
            };
            left_values.push(self.converted_value(&l.slot, data_type, &mut left_conversions));
            right_values.push(self.converted_value(&r.slot, data_type, &mut right_conversions));
            output_columns.push(QueryColumn {
                name: l.name.clone(),
                slot: self.slots.create(&l.name, data_type),
            });
        }

        let outputs = output_columns.iter().map(|c| c.slot.clone()).collect();
        BoundQuery {
            relation: BoundRelation::Combined {
                op,
                left: Box::new(with_compute(left_query.relation, left_conversions)),
                right: Box::new(with_compute(right_query.relation, right_conversions)),
                left_values,
                right_values,
                outputs,
            },
            output_columns,
        }
    }

    /// Returns `slot`, or a new slot holding it converted to `data_type`.
    fn converted_value(
        &mut self,
        slot: &ValueSlot,
        data_type: DataType,
        conversions: &mut Vec<ComputedValue>,
    ) -> ValueSlot {
        if slot.data_type == data_type || data_type.is_unknown() {
            return slot.clone();
        }
        let converted = self.slots.create(&slot.name, data_type);
        conversions.push(ComputedValue {
            expression: BoundExpression::slot(slot).convert_to(data_type),
            slot: converted.clone(),
        });
        converted
    }

    // ========================================================================
    // SELECT
    // ========================================================================

    fn bind_select_query(&mut self, node: NodeId, order_columns: &[NodeId]) -> BoundQuery {
        let tree = self.tree;
        let SyntaxNodeKind::SelectQuery {
            quantifier,
            top,
            columns,
            from,
            where_clause,
            group_by,
            having,
            ..
        } = &tree.node(node).kind
        else {
            return empty_query();
        };
        let saved = self.push_state(self.current);

        let mut relation = match from {
            Some(from) => self.bind_from(*from),
            None => BoundRelation::Constant,
        };

        if let Some(SyntaxNodeKind::WhereClause { condition, .. }) =
            where_clause.map(|w| &tree.node(w).kind)
        {
            let condition = self.bind_clause_condition(*condition, ClauseContext::Where);
            if !condition.is_error() {
                relation = BoundRelation::filter(relation, condition);
            }
        }

        if let Some(SyntaxNodeKind::GroupByClause { columns, .. }) =
            group_by.map(|g| &tree.node(g).kind)
        {
            self.set_clause(ClauseContext::GroupBy);
            for group in &columns.items {
                let expression = self.bind_expression(*group);
                if expression.is_error() {
                    continue;
                }
                let slot = self.register_grouping(expression);
                self.record_slot(*group, &slot);
            }
        }

        self.set_clause(ClauseContext::Select);
        let mut items = Vec::new();
        for column in &columns.items {
            match &tree.node(*column).kind {
                SyntaxNodeKind::ExpressionSelectColumn {
                    expression, alias, ..
                } => {
                    let bound = self.bind_expression(*expression);
                    let name = match alias {
                        Some(alias) => self.name_of(*alias),
                        None => self.implicit_column_name(*expression),
                    };
                    items.push(SelectItem {
                        node: Some(*column),
                        span: self.span(*expression),
                        expression: bound,
                        name,
                        has_alias: alias.is_some(),
                    });
                }
                SyntaxNodeKind::WildcardSelectColumn { table_name, .. } => {
                    self.expand_wildcard(*column, *table_name, &mut items);
                }
                _ => {}
            }
        }

        let mut having_condition = None;
        if let Some(SyntaxNodeKind::HavingClause { condition, .. }) =
            having.map(|h| &tree.node(h).kind)
        {
            let bound = self.bind_clause_condition(*condition, ClauseContext::Having);
            having_condition = Some((*condition, bound));
        }

        self.set_clause(ClauseContext::OrderBy);
        let mut orders = Vec::new();
        for column in order_columns {
            let (expression, ascending) = self.order_column_parts(*column);
            let target = match self.select_alias(expression, &items) {
                Some(index) => OrderTarget::Item(index),
                None => OrderTarget::Expression(self.bind_expression(expression)),
            };
            orders.push(OrderItem {
                node: expression,
                target,
                ascending,
            });
        }

        let is_grouped = group_by.is_some()
            || having.is_some()
            || items.iter().any(|i| i.expression.contains_aggregate())
            || orders.iter().any(|o| match &o.target {
                OrderTarget::Expression(e) => e.contains_aggregate(),
                OrderTarget::Item(_) => false,
            });
        if is_grouped {
            self.hoist_grouped_expressions(&mut items, &mut having_condition, &mut orders);
        }

        let mut output_columns = Vec::new();
        for item in &items {
            let slot = match &item.expression {
                BoundExpression::ValueSlot(slot) => slot.clone(),
                expression => self.project(expression.clone(), &item.name),
            };
            if let Some(node) = item.node {
                self.record_slot(node, &slot);
            }
            output_columns.push(QueryColumn {
                name: item.name.clone(),
                slot,
            });
        }
        let output_slots: Vec<ValueSlot> = output_columns.iter().map(|c| c.slot.clone()).collect();

        let distinct =
            quantifier.is_some_and(|q| tree.token(q).kind == SyntaxKind::DistinctKeyword);
        let keys = self.bind_sort_keys(orders, &output_columns, distinct);
        let top = top.and_then(|t| self.bind_top(t, !keys.is_empty()));

        let state = self.pop_state(saved);
        if is_grouped {
            let computed = state
                .groupings
                .iter()
                .filter(|g| g.expression != BoundExpression::slot(&g.slot))
                .cloned()
                .collect();
            relation = with_compute(relation, computed);
            relation = BoundRelation::GroupBy {
                input: Box::new(relation),
                groups: state.groupings.iter().map(|g| g.slot.clone()).collect(),
                aggregates: state.aggregates,
            };
            if let Some((_, condition)) = having_condition {
                if !condition.is_error() {
                    relation = BoundRelation::filter(relation, condition);
                }
            }
        }
        relation = with_compute(relation, state.projections);
        if distinct {
            let mut seen = HashSet::new();
            relation = BoundRelation::GroupBy {
                input: Box::new(relation),
                groups: output_slots
                    .iter()
                    .filter(|s| seen.insert((*s).clone()))
                    .cloned()
                    .collect(),
                aggregates: Vec::new(),
            };
        }
        if !keys.is_empty() {
            relation = BoundRelation::Sort {
                input: Box::new(relation),
                keys: keys.clone(),
            };
        }
        if let Some((limit, with_ties)) = top {
            relation = BoundRelation::Top {
                input: Box::new(relation),
                limit,
                ties: if with_ties { keys } else { Vec::new() },
            };
        }

        BoundQuery {
            relation: BoundRelation::project(relation, output_slots),
            output_columns,
        }
    }

    fn implicit_column_name(&self, expression: NodeId) -> String {
        match &self.tree.node(expression).kind {
            SyntaxNodeKind::NameExpression { name }
            | SyntaxNodeKind::PropertyAccessExpression { name, .. } => self.name_of(*name),
            SyntaxNodeKind::ParenthesizedExpression { expression, .. } => {
                self.implicit_column_name(*expression)
            }
            _ => String::new(),
        }
    }

    fn expand_wildcard(
        &mut self,
        node: NodeId,
        table_name: Option<TokenId>,
        items: &mut Vec<SelectItem>,
    ) {
        let span = self.span(node);
        let Some(state) = self.state() else {
            return;
        };
        let tables: Vec<TableInstance> = match table_name {
            Some(token) => {
                let name = self.name_of(token);
                match state.get_table(&name) {
                    Some(table) => vec![table.clone()],
                    None => {
                        if !name.is_empty() && !state.has_undeclared_table {
                            self.report(
                                DiagnosticId::UndeclaredTable,
                                self.token_span(token),
                                vec![name],
                            );
                        }
                        return;
                    }
                }
            }
            None => {
                let tables = state.tables.clone();
                if tables.is_empty() && !state.has_undeclared_table {
                    self.report(DiagnosticId::MustSpecifyTableToSelectFrom, span, vec![]);
                }
                tables
            }
        };
        for table in tables {
            for column in table.columns {
                items.push(SelectItem {
                    node: None,
                    span,
                    expression: BoundExpression::ValueSlot(column.slot),
                    name: column.name,
                    has_alias: false,
                });
            }
        }
    }

    fn select_alias(&self, expression: NodeId, items: &[SelectItem]) -> Option<usize> {
        let SyntaxNodeKind::NameExpression { name } = &self.tree.node(expression).kind else {
            return None;
        };
        let name = self.name_of(*name);
        items
            .iter()
            .position(|i| i.has_alias && !name.is_empty() && i.name.eq_ignore_ascii_case(&name))
    }

    /// Records a GROUP BY expression; duplicates share a slot.
    fn register_grouping(&mut self, expression: BoundExpression) -> ValueSlot {
        let Some(index) = self.current else {
            return self.slots.create("group", expression.data_type());
        };
        if let Some(slot) = self.states[index].replaced.get(&expression) {
            return slot.clone();
        }
        let slot = match &expression {
            BoundExpression::ValueSlot(slot) => slot.clone(),
            other => self.slots.create("group", other.data_type()),
        };
        let state = &mut self.states[index];
        state.groupings.push(ComputedValue {
            expression: expression.clone(),
            slot: slot.clone(),
        });
        state.replaced.insert(expression, slot.clone());
        slot
    }

    /// Replaces grouping expressions and aggregates with slot references.
    fn hoist(&mut self, expression: BoundExpression) -> BoundExpression {
        let Some(index) = self.current else {
            return expression;
        };
        let state = &mut self.states[index];
        let slots = &mut self.slots;
        expression.rewrite(&mut |e| {
            if let Some(slot) = state.replaced.get(&e) {
                return BoundExpression::slot(slot);
            }
            if let BoundExpression::Aggregate {
                aggregate,
                argument,
                data_type,
            } = &e
            {
                let slot = slots.create(&aggregate.name.to_ascii_lowercase(), *data_type);
                state.aggregates.push(AggregatedValue {
                    aggregate: aggregate.clone(),
                    argument: argument.as_deref().cloned(),
                    slot: slot.clone(),
                });
                state.replaced.insert(e.clone(), slot.clone());
                return BoundExpression::ValueSlot(slot);
            }
            e
        })
    }

    /// Name of a column read by `expression` that is neither grouped nor
    /// aggregated.
    fn ungrouped_column(&self, expression: &BoundExpression) -> Option<String> {
        let state = self.state()?;
        let groups: HashSet<&ValueSlot> = state.groupings.iter().map(|g| &g.slot).collect();
        let ungrouped = expression.find(&|e| {
            matches!(e, BoundExpression::ValueSlot(slot)
                if state.owns_column(slot) && !groups.contains(slot))
        })?;
        match ungrouped {
            BoundExpression::ValueSlot(slot) => Some(slot.name.to_string()),
            _ => None,
        }
    }

    fn hoist_grouped_expressions(
        &mut self,
        items: &mut [SelectItem],
        having: &mut Option<(NodeId, BoundExpression)>,
        orders: &mut [OrderItem],
    ) {
        for item in items.iter_mut() {
            let expression = std::mem::replace(&mut item.expression, BoundExpression::Error);
            item.expression = self.hoist(expression);
        }
        if let Some((_, condition)) = having.as_mut() {
            let expression = std::mem::replace(condition, BoundExpression::Error);
            *condition = self.hoist(expression);
        }
        for order in orders.iter_mut() {
            if let OrderTarget::Expression(expression) = &mut order.target {
                let hoisted = self.hoist(std::mem::replace(expression, BoundExpression::Error));
                *expression = hoisted;
            }
        }

        let mut checks: Vec<(TextSpan, String)> = Vec::new();
        for item in items.iter() {
            if let Some(column) = self.ungrouped_column(&item.expression) {
                checks.push((item.span, column));
            }
        }
        if let Some((node, condition)) = having.as_ref() {
            if let Some(column) = self.ungrouped_column(condition) {
                checks.push((self.span(*node), column));
            }
        }
        for order in orders.iter() {
            if let OrderTarget::Expression(expression) = &order.target {
                if let Some(column) = self.ungrouped_column(expression) {
                    checks.push((self.span(order.node), column));
                }
            }
        }
        for (span, column) in checks {
            self.report(
                DiagnosticId::SelectExpressionNotAggregatedOrGrouped,
                span,
                vec![column],
            );
        }
    }

    /// Computes `expression` in the projection step; identical expressions
    /// share a slot.
    fn project(&mut self, expression: BoundExpression, name: &str) -> ValueSlot {
        let Some(index) = self.current else {
            return self.slots.create(name, expression.data_type());
        };
        if let Some(slot) = self.states[index].replaced.get(&expression) {
            return slot.clone();
        }
        let slot_name = if name.is_empty() { "expr" } else { name };
        let slot = self.slots.create(slot_name, expression.data_type());
        let state = &mut self.states[index];
        state.projections.push(ComputedValue {
            expression: expression.clone(),
            slot: slot.clone(),
        });
        state.replaced.insert(expression, slot.clone());
        slot
    }

    fn bind_sort_keys(
        &mut self,
        orders: Vec<OrderItem>,
        output_columns: &[QueryColumn],
        distinct: bool,
    ) -> Vec<SortKey> {
        let outputs: Vec<&ValueSlot> = output_columns.iter().map(|c| &c.slot).collect();
        let mut keys = Vec::new();
        for order in orders {
            let slot = match order.target {
                OrderTarget::Item(index) => {
                    let column = &output_columns[index];
                    self.output.symbols.insert(
                        order.node,
                        Symbol::Alias {
                            name: column.name.clone(),
                            slot: column.slot.clone(),
                        },
                    );
                    Some(column.slot.clone())
                }
                OrderTarget::Expression(BoundExpression::Error) => None,
                OrderTarget::Expression(expression) => {
                    if expression.is_constant() {
                        self.report(
                            DiagnosticId::ConstantExpressionInOrderBy,
                            self.span(order.node),
                            vec![],
                        );
                    }
                    let existing = match &expression {
                        BoundExpression::ValueSlot(slot) => Some(slot.clone()),
                        other => self
                            .state()
                            .and_then(|s| s.replaced.get(other))
                            .cloned(),
                    };
                    match existing {
                        Some(slot) if outputs.contains(&&slot) => Some(slot),
                        _ if distinct => {
                            self.report(
                                DiagnosticId::OrderByItemsMustBeInSelectListIfDistinct,
                                self.span(order.node),
                                vec![],
                            );
                            None
                        }
                        Some(slot) => Some(slot),
                        None => Some(self.project(expression, "")),
                    }
                }
            };
            if let Some(slot) = slot {
                keys.push(SortKey {
                    slot,
                    ascending: order.ascending,
                });
            }
        }
        keys
    }

    /// Returns the row limit and whether ties are kept.
    fn bind_top(&mut self, node: NodeId, has_order_by: bool) -> Option<(u64, bool)> {
        let SyntaxNodeKind::TopClause {
            value,
            with_keyword,
            ..
        } = &self.tree.node(node).kind
        else {
            return None;
        };
        let token = self.tree.token(*value);
        if token.missing {
            return None;
        }
        let limit = match &token.value {
            Some(Value::Int32(n)) => u64::try_from(*n).ok(),
            Some(Value::Int64(n)) => u64::try_from(*n).ok(),
            _ => None,
        };
        let Some(limit) = limit else {
            self.report(
                DiagnosticId::InvalidTopValue,
                token.span,
                vec![self.tree.token_text(*value).to_string()],
            );
            return None;
        };
        let with_ties = with_keyword.is_some();
        if with_ties && !has_order_by {
            self.report(
                DiagnosticId::TopWithTiesRequiresOrderBy,
                self.span(node),
                vec![],
            );
        }
        Some((limit, with_ties && has_order_by))
    }

    // ========================================================================
    // FROM
    // ========================================================================

    fn bind_from(&mut self, from: NodeId) -> BoundRelation {
        let SyntaxNodeKind::FromClause { tables, .. } = &self.tree.node(from).kind else {
            return BoundRelation::Constant;
        };
        let mut relation: Option<BoundRelation> = None;
        for table in &tables.items {
            let right = self.bind_table_reference(*table);
            relation = Some(match relation {
                None => right,
                Some(left) => BoundRelation::join(JoinType::Inner, left, right, None),
            });
        }
        relation.unwrap_or(BoundRelation::Constant)
    }

    fn introduce_table(&mut self, instance: TableInstance, span: TextSpan) {
        let Some(state) = self.state() else {
            return;
        };
        if !instance.name.is_empty() && state.get_table(&instance.name).is_some() {
            self.report(
                DiagnosticId::DuplicateTableRefInFrom,
                span,
                vec![instance.name.clone()],
            );
        }
        if let Some(state) = self.state_mut() {
            state.tables.push(instance);
        }
    }

    fn mark_undeclared_table(&mut self) -> BoundRelation {
        if let Some(state) = self.state_mut() {
            state.has_undeclared_table = true;
        }
        BoundRelation::Empty { output: Vec::new() }
    }

    fn bind_table_reference(&mut self, node: NodeId) -> BoundRelation {
        let tree = self.tree;
        match &tree.node(node).kind {
            SyntaxNodeKind::NamedTableReference {
                table_name, alias, ..
            } => {
                let name = self.name_of(*table_name);
                if name.is_empty() {
                    return self.mark_undeclared_table();
                }
                let Some(table) = self.context.get_table(&name).cloned() else {
                    self.report(
                        DiagnosticId::UndeclaredTable,
                        self.token_span(*table_name),
                        vec![name],
                    );
                    return self.mark_undeclared_table();
                };
                let instance_name = match alias {
                    Some(alias) => self.name_of(*alias),
                    None => table.name.clone(),
                };
                let columns = table
                    .columns
                    .iter()
                    .map(|c| ColumnInstance {
                        name: c.name.clone(),
                        slot: self.slots.create(&c.name, c.data_type),
                    })
                    .collect();
                let instance = TableInstance {
                    name: instance_name,
                    table: Some(table),
                    columns,
                };
                self.output
                    .symbols
                    .insert(node, Symbol::Table(instance.clone()));
                self.introduce_table(instance.clone(), self.span(node));
                BoundRelation::Table(instance)
            }
            SyntaxNodeKind::DerivedTableReference { query, alias, .. } => {
                // Derived tables see the enclosing query's outer scopes but not
                // their sibling FROM tables.
                let saved = self.current;
                self.current = self.state().and_then(|s| s.parent);
                let bound = self.bind_query(*query);
                self.current = saved;

                let instance = TableInstance {
                    name: self.name_of(*alias),
                    table: None,
                    columns: bound
                        .output_columns
                        .iter()
                        .map(|c| ColumnInstance {
                            name: c.name.clone(),
                            slot: c.slot.clone(),
                        })
                        .collect(),
                };
                self.output
                    .symbols
                    .insert(node, Symbol::Table(instance.clone()));
                self.introduce_table(instance, self.span(node));
                bound.relation
            }
            SyntaxNodeKind::JoinedTableReference {
                left,
                join_type_keyword,
                right,
                condition,
                ..
            } => {
                let left = self.bind_table_reference(*left);
                let right = self.bind_table_reference(*right);
                let join_type = match join_type_keyword.map(|k| tree.token(k).kind) {
                    Some(SyntaxKind::LeftKeyword) => JoinType::LeftOuter,
                    Some(SyntaxKind::RightKeyword) => JoinType::RightOuter,
                    Some(SyntaxKind::FullKeyword) => JoinType::FullOuter,
                    _ => JoinType::Inner,
                };
                let condition = condition
                    .map(|c| self.bind_clause_condition(c, ClauseContext::On))
                    .filter(|c| !c.is_error());
                BoundRelation::join(join_type, left, right, condition)
            }
            _ => BoundRelation::Constant,
        }
    }
}
