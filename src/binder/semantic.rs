//! Semantic analysis: binding expressions against scopes and the data context.

use tracing::debug;

use crate::catalog::{AggregateFunction, AggregateSymbol, DataContext};
use crate::diagnostics::{DiagnosticBag, DiagnosticId};
use crate::parser::{NodeId, SyntaxKind, SyntaxNodeKind, SyntaxTree, TokenId};
use crate::text::TextSpan;
use crate::types::{DataType, Value};

use super::conversion::{classify, common_type, ConversionKind};
use super::expression::{BoundExpression, CaseLabel};
use super::model::{BindOutput, BoundRoot, Symbol};
use super::operators::{
    resolve_binary, resolve_unary, BinaryOperator, OperatorResolution, UnaryOperator,
};
use super::overload::{resolve_overload, OverloadResolution};
use super::relation::BoundQuery;
use super::scope::{
    BoundQueryState, ClauseContext, ColumnInstance, TableInstance, ValueSlot, ValueSlotFactory,
};

/// What a simple name refers to.
enum NameResolution {
    Column(TableInstance, ColumnInstance),
    Table(TableInstance),
    Ambiguous(Vec<String>),
    NotFound,
}

/// Semantic binder.
///
/// Walks a syntax tree top-down and builds the bound tree bottom-up. Binding
/// never fails; problems are reported as diagnostics and bind to
/// [`BoundExpression::Error`].
pub struct Binder<'a> {
    pub(super) tree: &'a SyntaxTree,
    pub(super) context: &'a DataContext,
    pub(super) slots: ValueSlotFactory,
    pub(super) states: Vec<BoundQueryState>,
    pub(super) current: Option<usize>,
    pub(super) diagnostics: DiagnosticBag,
    pub(super) output: BindOutput,
}

impl<'a> Binder<'a> {
    /// Creates a binder for `tree`.
    #[must_use]
    pub fn new(tree: &'a SyntaxTree, context: &'a DataContext) -> Self {
        Binder {
            tree,
            context,
            slots: ValueSlotFactory::default(),
            states: Vec::new(),
            current: None,
            diagnostics: DiagnosticBag::new(),
            output: BindOutput::default(),
        }
    }

    /// Binds the root of the tree.
    pub(crate) fn bind(mut self) -> BindOutput {
        let root = self.tree.root_syntax();
        let bound = if self.tree.node(root).kind.is_query() {
            BoundRoot::Query(self.bind_query(root))
        } else {
            BoundRoot::Expression(self.bind_expression(root))
        };
        self.output.root = Some(bound);
        self.output.diagnostics = self.diagnostics.into_vec();
        debug!(
            expressions = self.output.expressions.len(),
            queries = self.output.queries.len(),
            diagnostics = self.output.diagnostics.len(),
            "bound syntax tree"
        );
        self.output
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    pub(super) fn span(&self, node: NodeId) -> TextSpan {
        self.tree.span(node)
    }

    pub(super) fn token_span(&self, token: TokenId) -> TextSpan {
        self.tree.token(token).span
    }

    /// Unquoted identifier text; empty for missing tokens.
    pub(super) fn name_of(&self, token: TokenId) -> String {
        self.tree.token(token).identifier_name().to_string()
    }

    pub(super) fn report(&mut self, id: DiagnosticId, span: TextSpan, args: Vec<String>) {
        self.diagnostics.report(id, span, args);
    }

    pub(super) fn type_name(&self, data_type: DataType) -> String {
        self.context.type_name(data_type)
    }

    fn type_list(&self, types: &[DataType]) -> String {
        types
            .iter()
            .map(|t| self.type_name(*t))
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub(super) fn state(&self) -> Option<&BoundQueryState> {
        self.current.map(|i| &self.states[i])
    }

    pub(super) fn state_mut(&mut self) -> Option<&mut BoundQueryState> {
        self.current.map(|i| &mut self.states[i])
    }

    /// Enters a new query scope whose parent is `parent`.
    pub(super) fn push_state(&mut self, parent: Option<usize>) -> Option<usize> {
        let saved = self.current;
        self.states.push(BoundQueryState::new(parent));
        self.current = Some(self.states.len() - 1);
        saved
    }

    /// Leaves the innermost query scope and returns it.
    pub(super) fn pop_state(&mut self, saved: Option<usize>) -> BoundQueryState {
        self.current = saved;
        self.states.pop().unwrap_or_default()
    }

    fn clause(&self) -> ClauseContext {
        self.state().map_or(ClauseContext::None, |s| s.clause)
    }

    /// Whether some enclosing FROM clause named a table that does not exist.
    fn in_scope_of_undeclared_table(&self) -> bool {
        let mut index = self.current;
        while let Some(i) = index {
            if self.states[i].has_undeclared_table {
                return true;
            }
            index = self.states[i].parent;
        }
        false
    }

    fn resolve_name(&self, name: &str) -> NameResolution {
        let mut index = self.current;
        while let Some(i) = index {
            let state = &self.states[i];
            let matches: Vec<(&TableInstance, &ColumnInstance)> = state
                .tables
                .iter()
                .filter_map(|t| t.get_column(name).map(|c| (t, c)))
                .collect();
            match matches.as_slice() {
                [(table, column)] => {
                    return NameResolution::Column((*table).clone(), (*column).clone())
                }
                [] => {}
                many => {
                    return NameResolution::Ambiguous(
                        many.iter()
                            .map(|(t, c)| format!("'{}.{}'", t.name, c.name))
                            .collect(),
                    )
                }
            }
            if let Some(table) = state.get_table(name) {
                return NameResolution::Table(table.clone());
            }
            index = state.parent;
        }
        NameResolution::NotFound
    }

    /// Resolves the `t` of `t.x` when it names a table instance.
    fn resolve_table_qualifier(&self, name: &str) -> Option<TableInstance> {
        let mut index = self.current;
        while let Some(i) = index {
            let state = &self.states[i];
            if let Some(table) = state.get_table(name) {
                return Some(table.clone());
            }
            if state.tables.iter().any(|t| t.get_column(name).is_some()) {
                return None;
            }
            index = state.parent;
        }
        None
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    /// Binds an expression node and records the result.
    pub(super) fn bind_expression(&mut self, node: NodeId) -> BoundExpression {
        let bound = self.bind_expression_internal(node);
        self.output.expressions.insert(node, bound.clone());
        bound
    }

    fn bind_expression_internal(&mut self, node: NodeId) -> BoundExpression {
        let tree = self.tree;
        match &tree.node(node).kind {
            SyntaxNodeKind::LiteralExpression { token } => self.bind_literal(*token),
            SyntaxNodeKind::VariableExpression { name, .. } => self.bind_variable(node, *name),
            SyntaxNodeKind::NameExpression { name } => self.bind_name(node, *name),
            SyntaxNodeKind::PropertyAccessExpression { target, name, .. } => {
                self.bind_property_access(node, *target, *name)
            }
            SyntaxNodeKind::MethodInvocationExpression {
                target,
                name,
                arguments,
                ..
            } => self.bind_method_invocation(node, *target, *name, *arguments),
            SyntaxNodeKind::FunctionInvocationExpression { name, arguments } => {
                self.bind_function_invocation(node, *name, *arguments)
            }
            SyntaxNodeKind::CountAllExpression { name, .. } => {
                let function_name = tree.token_text(*name).to_string();
                match self.context.get_aggregate(&function_name).cloned() {
                    Some(aggregate) => self.bind_aggregate(node, aggregate, None),
                    None => {
                        self.report(
                            DiagnosticId::UndeclaredAggregate,
                            self.span(node),
                            vec![function_name],
                        );
                        BoundExpression::Error
                    }
                }
            }
            SyntaxNodeKind::UnaryExpression { operator, operand } => {
                let operand = self.bind_expression(*operand);
                match UnaryOperator::from_token(tree.token(*operator).kind) {
                    Some(op) => self.bind_unary_operator(self.span(node), op, operand),
                    None => BoundExpression::Error,
                }
            }
            SyntaxNodeKind::BinaryExpression {
                left,
                operator,
                right,
            } => {
                let left = self.bind_expression(*left);
                let right = self.bind_expression(*right);
                match BinaryOperator::from_token(tree.token(*operator).kind) {
                    Some(op) => self.bind_binary_operator(self.span(node), op, left, right),
                    None => BoundExpression::Error,
                }
            }
            SyntaxNodeKind::ParenthesizedExpression { expression, .. } => {
                self.bind_expression(*expression)
            }
            SyntaxNodeKind::CastExpression {
                expression,
                type_name,
                ..
            } => self.bind_cast(node, *expression, *type_name),
            SyntaxNodeKind::CoalesceExpression { arguments, .. } => {
                let arguments: Vec<BoundExpression> = arguments
                    .items
                    .iter()
                    .map(|a| self.bind_expression(*a))
                    .collect();
                self.bind_coalesce(node, arguments)
            }
            SyntaxNodeKind::NullIfExpression { left, right, .. } => {
                let left = self.bind_expression(*left);
                let right = self.bind_expression(*right);
                self.bind_null_if(node, left, right)
            }
            SyntaxNodeKind::IsNullExpression {
                expression,
                not_keyword,
                ..
            } => {
                let expression = self.bind_expression(*expression);
                if expression.is_error() {
                    return BoundExpression::Error;
                }
                BoundExpression::IsNull {
                    expression: Box::new(expression),
                    negated: not_keyword.is_some(),
                }
            }
            SyntaxNodeKind::LikeExpression {
                left,
                not_keyword,
                right,
                ..
            } => {
                let left = self.bind_expression(*left);
                let right = self.bind_expression(*right);
                let like =
                    self.bind_binary_operator(self.span(node), BinaryOperator::Like, left, right);
                negate_if(like, not_keyword.is_some())
            }
            SyntaxNodeKind::BetweenExpression {
                expression,
                not_keyword,
                lower,
                upper,
                ..
            } => {
                let span = self.span(node);
                let expression = self.bind_expression(*expression);
                let lower = self.bind_expression(*lower);
                let upper = self.bind_expression(*upper);
                let low = self.bind_binary_operator(
                    span,
                    BinaryOperator::GreaterOrEqual,
                    expression.clone(),
                    lower,
                );
                let high =
                    self.bind_binary_operator(span, BinaryOperator::LessOrEqual, expression, upper);
                if low.is_error() || high.is_error() {
                    return BoundExpression::Error;
                }
                negate_if(BoundExpression::and(low, high), not_keyword.is_some())
            }
            SyntaxNodeKind::InExpression {
                expression,
                not_keyword,
                arguments,
                ..
            } => {
                let span = self.span(node);
                let expression = self.bind_expression(*expression);
                let mut equalities = Vec::new();
                for argument in self.argument_nodes(*arguments) {
                    let argument = self.bind_expression(argument);
                    equalities.push(self.bind_binary_operator(
                        span,
                        BinaryOperator::Equal,
                        expression.clone(),
                        argument,
                    ));
                }
                if equalities.is_empty() || equalities.iter().any(BoundExpression::is_error) {
                    return BoundExpression::Error;
                }
                let chain = equalities
                    .into_iter()
                    .reduce(BoundExpression::or)
                    .unwrap_or(BoundExpression::Error);
                negate_if(chain, not_keyword.is_some())
            }
            SyntaxNodeKind::CaseExpression {
                input,
                labels,
                else_expression,
                ..
            } => self.bind_case(node, *input, labels, *else_expression),
            SyntaxNodeKind::ExistsSubselect { query, .. } => {
                let query = self.bind_subquery(*query);
                BoundExpression::Exists {
                    query: Box::new(query),
                }
            }
            SyntaxNodeKind::SingleRowSubselect { query, .. } => {
                self.bind_single_row_subselect(*query)
            }
            _ => BoundExpression::Error,
        }
    }

    fn argument_nodes(&self, list: NodeId) -> Vec<NodeId> {
        match &self.tree.node(list).kind {
            SyntaxNodeKind::ArgumentList { arguments, .. } => arguments.items.clone(),
            _ => Vec::new(),
        }
    }

    fn bind_literal(&mut self, token: TokenId) -> BoundExpression {
        let token = self.tree.token(token);
        match token.kind {
            SyntaxKind::NullKeyword => BoundExpression::literal(Value::Null),
            SyntaxKind::TrueKeyword => BoundExpression::boolean(true),
            SyntaxKind::FalseKeyword => BoundExpression::boolean(false),
            _ => match &token.value {
                Some(value) => BoundExpression::literal(value.clone()),
                // Malformed numbers were reported by the lexer.
                None => BoundExpression::Error,
            },
        }
    }

    fn bind_variable(&mut self, node: NodeId, name: TokenId) -> BoundExpression {
        let variable_name = self.name_of(name);
        if variable_name.is_empty() {
            return BoundExpression::Error;
        }
        match self.context.get_variable(&variable_name).cloned() {
            Some(symbol) => {
                self.output
                    .symbols
                    .insert(node, Symbol::Variable(symbol.clone()));
                BoundExpression::Variable(symbol)
            }
            None => {
                self.report(
                    DiagnosticId::UndeclaredVariable,
                    self.span(node),
                    vec![variable_name],
                );
                BoundExpression::Error
            }
        }
    }

    fn bind_name(&mut self, node: NodeId, name: TokenId) -> BoundExpression {
        let column_name = self.name_of(name);
        if column_name.is_empty() {
            return BoundExpression::Error;
        }
        match self.resolve_name(&column_name) {
            NameResolution::Column(table, column) => {
                self.output.symbols.insert(
                    node,
                    Symbol::Column {
                        table: table.name,
                        name: column.name,
                        slot: column.slot.clone(),
                    },
                );
                BoundExpression::ValueSlot(column.slot)
            }
            NameResolution::Table(table) => {
                let table_name = table.name.clone();
                self.output.symbols.insert(node, Symbol::Table(table));
                self.report(
                    DiagnosticId::InvalidRowReference,
                    self.span(node),
                    vec![table_name],
                );
                BoundExpression::Error
            }
            NameResolution::Ambiguous(candidates) => {
                self.report(
                    DiagnosticId::AmbiguousColumnRef,
                    self.span(node),
                    vec![column_name, candidates.join(", ")],
                );
                BoundExpression::Error
            }
            NameResolution::NotFound => {
                if !self.in_scope_of_undeclared_table() {
                    self.report(
                        DiagnosticId::ColumnTableOrVariableNotDeclared,
                        self.span(node),
                        vec![column_name],
                    );
                }
                BoundExpression::Error
            }
        }
    }

    fn bind_property_access(
        &mut self,
        node: NodeId,
        target: NodeId,
        name: TokenId,
    ) -> BoundExpression {
        let tree = self.tree;
        let property_name = self.name_of(name);

        if let SyntaxNodeKind::NameExpression { name: qualifier } = &tree.node(target).kind {
            let qualifier_name = self.name_of(*qualifier);
            if let Some(table) = self.resolve_table_qualifier(&qualifier_name) {
                self.output
                    .symbols
                    .insert(target, Symbol::Table(table.clone()));
                if property_name.is_empty() {
                    return BoundExpression::Error;
                }
                return match table.get_column(&property_name).cloned() {
                    Some(column) => {
                        self.output.symbols.insert(
                            node,
                            Symbol::Column {
                                table: table.name.clone(),
                                name: column.name,
                                slot: column.slot.clone(),
                            },
                        );
                        BoundExpression::ValueSlot(column.slot)
                    }
                    None => {
                        self.report(
                            DiagnosticId::UndeclaredColumn,
                            self.token_span(name),
                            vec![table.name, property_name],
                        );
                        BoundExpression::Error
                    }
                };
            }
        }

        let target = self.bind_expression(target);
        let target_type = target.data_type();
        if target_type.is_unknown() || property_name.is_empty() {
            return BoundExpression::Error;
        }
        match self
            .context
            .lookup_properties(target_type, &property_name)
            .into_iter()
            .next()
        {
            Some(property) => {
                self.output
                    .symbols
                    .insert(node, Symbol::Property(property.clone()));
                BoundExpression::PropertyAccess {
                    target: Box::new(target),
                    property,
                }
            }
            None => {
                self.report(
                    DiagnosticId::UndeclaredProperty,
                    self.token_span(name),
                    vec![self.type_name(target_type), property_name],
                );
                BoundExpression::Error
            }
        }
    }

    fn bind_method_invocation(
        &mut self,
        node: NodeId,
        target: NodeId,
        name: TokenId,
        arguments: NodeId,
    ) -> BoundExpression {
        let method_name = self.name_of(name);
        let target = self.bind_expression(target);
        let arguments: Vec<BoundExpression> = self
            .argument_nodes(arguments)
            .into_iter()
            .map(|a| self.bind_expression(a))
            .collect();

        let target_type = target.data_type();
        let argument_types: Vec<DataType> = arguments.iter().map(BoundExpression::data_type).collect();
        if method_name.is_empty()
            || target_type.is_unknown()
            || argument_types.iter().any(DataType::is_unknown)
        {
            return BoundExpression::Error;
        }

        let candidates = self.context.lookup_methods(target_type, &method_name);
        let resolution = resolve_overload(
            self.context,
            candidates.iter().map(|m| m.parameters.as_slice()),
            &argument_types,
        );
        match resolution {
            OverloadResolution::Best(index) => {
                let method = candidates[index].clone();
                self.output
                    .symbols
                    .insert(node, Symbol::Method(method.clone()));
                let arguments = convert_arguments(arguments, &method.parameters);
                BoundExpression::MethodInvocation {
                    target: Box::new(target),
                    method,
                    arguments,
                }
            }
            OverloadResolution::NotApplicable => {
                self.report(
                    DiagnosticId::UndeclaredMethod,
                    self.span(node),
                    vec![
                        self.type_name(target_type),
                        method_name,
                        self.type_list(&argument_types),
                    ],
                );
                BoundExpression::Error
            }
            OverloadResolution::Ambiguous(indices) => {
                let signatures = indices
                    .iter()
                    .map(|i| {
                        let m = &candidates[*i];
                        format!("'{}({})'", m.name, self.type_list(&m.parameters))
                    })
                    .collect::<Vec<_>>()
                    .join(" and ");
                self.report(
                    DiagnosticId::AmbiguousInvocation,
                    self.span(node),
                    vec![method_name, signatures],
                );
                BoundExpression::Error
            }
        }
    }

    fn bind_function_invocation(
        &mut self,
        node: NodeId,
        name: TokenId,
        arguments: NodeId,
    ) -> BoundExpression {
        let function_name = self.name_of(name);
        let argument_nodes = self.argument_nodes(arguments);

        if let Some(aggregate) = self.context.get_aggregate(&function_name).cloned() {
            if argument_nodes.len() == 1 {
                return self.bind_aggregate(node, aggregate, Some(argument_nodes[0]));
            }
        }

        let arguments: Vec<BoundExpression> = argument_nodes
            .into_iter()
            .map(|a| self.bind_expression(a))
            .collect();
        let argument_types: Vec<DataType> = arguments.iter().map(BoundExpression::data_type).collect();
        if function_name.is_empty() || argument_types.iter().any(DataType::is_unknown) {
            return BoundExpression::Error;
        }

        let candidates = self.context.functions(&function_name);
        let resolution = resolve_overload(
            self.context,
            candidates.iter().map(|f| f.parameters.as_slice()),
            &argument_types,
        );
        match resolution {
            OverloadResolution::Best(index) => {
                let function = candidates[index].clone();
                self.output
                    .symbols
                    .insert(node, Symbol::Function(function.clone()));
                let arguments = convert_arguments(arguments, &function.parameters);
                BoundExpression::FunctionInvocation {
                    function,
                    arguments,
                }
            }
            OverloadResolution::NotApplicable => {
                self.report(
                    DiagnosticId::UndeclaredFunction,
                    self.span(node),
                    vec![function_name, self.type_list(&argument_types)],
                );
                BoundExpression::Error
            }
            OverloadResolution::Ambiguous(indices) => {
                let signatures = indices
                    .iter()
                    .map(|i| format!("'{}'", candidates[*i]))
                    .collect::<Vec<_>>()
                    .join(" and ");
                self.report(
                    DiagnosticId::AmbiguousInvocation,
                    self.span(node),
                    vec![function_name, signatures],
                );
                BoundExpression::Error
            }
        }
    }

    fn bind_aggregate(
        &mut self,
        node: NodeId,
        aggregate: AggregateSymbol,
        argument: Option<NodeId>,
    ) -> BoundExpression {
        let span = self.span(node);
        let misplaced = match self.clause() {
            ClauseContext::Where => Some(DiagnosticId::AggregateInWhere),
            ClauseContext::On => Some(DiagnosticId::AggregateInOn),
            ClauseContext::GroupBy => Some(DiagnosticId::AggregateInGroupBy),
            _ => None,
        };
        if let Some(id) = misplaced {
            self.report(id, span, vec![]);
            return BoundExpression::Error;
        }
        if self.state().is_some_and(|s| s.in_aggregate) {
            self.report(
                DiagnosticId::AggregateCannotContainAggregate,
                span,
                vec![aggregate.name.clone()],
            );
            return BoundExpression::Error;
        }

        self.output
            .symbols
            .insert(node, Symbol::Aggregate(aggregate.clone()));

        let Some(argument) = argument else {
            return BoundExpression::Aggregate {
                aggregate,
                argument: None,
                data_type: DataType::Int32,
            };
        };

        if let Some(state) = self.state_mut() {
            state.in_aggregate = true;
        }
        let argument = self.bind_expression(argument);
        if let Some(state) = self.state_mut() {
            state.in_aggregate = false;
        }

        let argument_type = argument.data_type();
        if argument_type.is_unknown() {
            return BoundExpression::Error;
        }

        let typed = match aggregate.function {
            AggregateFunction::Count => Some((argument, DataType::Int32)),
            AggregateFunction::Min | AggregateFunction::Max => {
                (argument_type.is_orderable() || argument_type == DataType::Null)
                    .then_some((argument, argument_type))
            }
            AggregateFunction::Sum => self.sum_signature(argument_type).map(|(input, result)| {
                (argument.convert_to(input), result)
            }),
            AggregateFunction::Avg => self.sum_signature(argument_type).and_then(|(input, sum)| {
                match resolve_binary(self.context, BinaryOperator::Divide, sum, DataType::Int32) {
                    OperatorResolution::Resolved(signature) => {
                        Some((argument.convert_to(input), signature.result))
                    }
                    _ => None,
                }
            }),
        };

        match typed {
            Some((argument, data_type)) => BoundExpression::Aggregate {
                aggregate,
                argument: Some(Box::new(argument)),
                data_type,
            },
            None => {
                self.report(
                    DiagnosticId::AggregateDoesNotSupportType,
                    span,
                    vec![aggregate.name, self.type_name(argument_type)],
                );
                BoundExpression::Error
            }
        }
    }

    /// Input and result type of summing values of `data_type`.
    fn sum_signature(&self, data_type: DataType) -> Option<(DataType, DataType)> {
        match resolve_binary(self.context, BinaryOperator::Add, data_type, data_type) {
            OperatorResolution::Resolved(signature) if signature.result.is_numeric() => {
                Some((signature.parameters[0], signature.result))
            }
            _ => None,
        }
    }

    pub(super) fn bind_unary_operator(
        &mut self,
        span: TextSpan,
        op: UnaryOperator,
        operand: BoundExpression,
    ) -> BoundExpression {
        let operand_type = operand.data_type();
        if operand_type.is_unknown() {
            return BoundExpression::Error;
        }
        match resolve_unary(self.context, op, operand_type) {
            OperatorResolution::Resolved(signature) => BoundExpression::Unary {
                op,
                operand: Box::new(operand.convert_to(signature.parameters[0])),
                data_type: signature.result,
            },
            OperatorResolution::NotApplicable => {
                self.report(
                    DiagnosticId::CannotApplyUnaryOperator,
                    span,
                    vec![op.to_string(), self.type_name(operand_type)],
                );
                BoundExpression::Error
            }
            OperatorResolution::Ambiguous(_) => {
                self.report(
                    DiagnosticId::AmbiguousUnaryOperator,
                    span,
                    vec![op.to_string(), self.type_name(operand_type)],
                );
                BoundExpression::Error
            }
        }
    }

    pub(super) fn bind_binary_operator(
        &mut self,
        span: TextSpan,
        op: BinaryOperator,
        left: BoundExpression,
        right: BoundExpression,
    ) -> BoundExpression {
        let left_type = left.data_type();
        let right_type = right.data_type();
        if left_type.is_unknown() || right_type.is_unknown() {
            return BoundExpression::Error;
        }
        if left_type == DataType::Null && right_type == DataType::Null {
            let data_type = if op.is_predicate() {
                DataType::Bool
            } else {
                DataType::Null
            };
            return BoundExpression::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
                data_type,
            };
        }

        match resolve_binary(self.context, op, left_type, right_type) {
            OperatorResolution::Resolved(signature) => BoundExpression::Binary {
                op,
                left: Box::new(left.convert_to(signature.parameters[0])),
                right: Box::new(right.convert_to(signature.parameters[1])),
                data_type: signature.result,
            },
            OperatorResolution::NotApplicable => {
                self.report(
                    DiagnosticId::CannotApplyBinaryOperator,
                    span,
                    vec![
                        op.to_string(),
                        self.type_name(left_type),
                        self.type_name(right_type),
                    ],
                );
                BoundExpression::Error
            }
            OperatorResolution::Ambiguous(_) => {
                self.report(
                    DiagnosticId::AmbiguousBinaryOperator,
                    span,
                    vec![
                        op.to_string(),
                        self.type_name(left_type),
                        self.type_name(right_type),
                    ],
                );
                BoundExpression::Error
            }
        }
    }

    fn bind_cast(&mut self, node: NodeId, expression: NodeId, type_name: TokenId) -> BoundExpression {
        let expression = self.bind_expression(expression);
        let name = self.name_of(type_name);
        if name.is_empty() {
            return BoundExpression::Error;
        }
        let Some(target) = self.context.resolve_type(&name) else {
            self.report(
                DiagnosticId::UndeclaredType,
                self.token_span(type_name),
                vec![name],
            );
            return BoundExpression::Error;
        };
        self.output.symbols.insert(node, Symbol::Type(target));

        let source = expression.data_type();
        if source.is_unknown() {
            return BoundExpression::Error;
        }
        match classify(self.context, source, target) {
            ConversionKind::Identity => expression,
            ConversionKind::Implicit | ConversionKind::Explicit => BoundExpression::Conversion {
                expression: Box::new(expression),
                data_type: target,
            },
            ConversionKind::None => {
                self.report_cannot_convert(self.span(node), source, target);
                BoundExpression::Error
            }
        }
    }

    pub(super) fn report_cannot_convert(&mut self, span: TextSpan, from: DataType, to: DataType) {
        let from = self.type_name(from);
        let to = self.type_name(to);
        self.diagnostics.report_cannot_convert(span, &from, &to);
    }

    /// Reports the first argument type that blocks a common type.
    fn report_no_common_type(&mut self, span: TextSpan, types: &[DataType]) {
        let target = types
            .iter()
            .copied()
            .find(|t| *t != DataType::Null)
            .unwrap_or(DataType::Null);
        let source = types
            .iter()
            .copied()
            .find(|t| !classify(self.context, *t, target).is_implicit())
            .unwrap_or(target);
        self.report_cannot_convert(span, source, target);
    }

    fn bind_coalesce(&mut self, node: NodeId, arguments: Vec<BoundExpression>) -> BoundExpression {
        let types: Vec<DataType> = arguments.iter().map(BoundExpression::data_type).collect();
        match common_type(self.context, &types) {
            Some(DataType::Unknown) => BoundExpression::Error,
            Some(data_type) => BoundExpression::Coalesce {
                arguments: arguments
                    .into_iter()
                    .map(|a| a.convert_to(data_type))
                    .collect(),
                data_type,
            },
            None => {
                self.report_no_common_type(self.span(node), &types);
                BoundExpression::Error
            }
        }
    }

    fn bind_null_if(
        &mut self,
        node: NodeId,
        left: BoundExpression,
        right: BoundExpression,
    ) -> BoundExpression {
        let data_type = left.data_type();
        let comparison =
            self.bind_binary_operator(self.span(node), BinaryOperator::Equal, left, right);
        let BoundExpression::Binary { left, right, .. } = comparison else {
            return BoundExpression::Error;
        };
        // Compared in the equality's parameter types; the result keeps e1's type.
        let compared_type = left.data_type();
        BoundExpression::NullIf {
            left,
            right,
            data_type: compared_type,
        }
        .convert_to(data_type)
    }

    /// Binds a predicate and insists on a boolean result.
    pub(super) fn bind_condition(&mut self, node: NodeId) -> BoundExpression {
        let condition = self.bind_expression(node);
        let data_type = condition.data_type();
        match data_type {
            DataType::Bool | DataType::Unknown => condition,
            DataType::Null => condition.convert_to(DataType::Bool),
            other => {
                self.report_cannot_convert(self.span(node), other, DataType::Bool);
                BoundExpression::Error
            }
        }
    }

    fn bind_case(
        &mut self,
        node: NodeId,
        input: Option<NodeId>,
        labels: &[NodeId],
        else_expression: Option<NodeId>,
    ) -> BoundExpression {
        let tree = self.tree;
        let input = input.map(|i| self.bind_expression(i));

        let mut conditions = Vec::new();
        let mut results = Vec::new();
        for label in labels {
            let SyntaxNodeKind::CaseLabel {
                when_expression,
                then_expression,
                ..
            } = &tree.node(*label).kind
            else {
                continue;
            };
            let condition = match &input {
                Some(input) => {
                    let when = self.bind_expression(*when_expression);
                    self.bind_binary_operator(
                        self.span(*when_expression),
                        BinaryOperator::Equal,
                        input.clone(),
                        when,
                    )
                }
                None => self.bind_condition(*when_expression),
            };
            conditions.push(condition);
            results.push(self.bind_expression(*then_expression));
        }
        let else_result = else_expression.map(|e| self.bind_expression(e));

        if conditions.iter().any(BoundExpression::is_error) {
            return BoundExpression::Error;
        }
        let mut types: Vec<DataType> = results.iter().map(BoundExpression::data_type).collect();
        types.extend(else_result.as_ref().map(BoundExpression::data_type));
        let data_type = match common_type(self.context, &types) {
            Some(DataType::Unknown) => return BoundExpression::Error,
            Some(data_type) => data_type,
            None => {
                self.report_no_common_type(self.span(node), &types);
                return BoundExpression::Error;
            }
        };

        BoundExpression::Case {
            labels: conditions
                .into_iter()
                .zip(results)
                .map(|(condition, result)| CaseLabel {
                    condition,
                    result: result.convert_to(data_type),
                })
                .collect(),
            else_expression: else_result.map(|e| Box::new(e.convert_to(data_type))),
            data_type,
        }
    }

    /// Binds a nested query; its scope's parent is the current scope.
    pub(super) fn bind_subquery(&mut self, node: NodeId) -> BoundQuery {
        let saved = self.current;
        let query = self.bind_query(node);
        self.current = saved;
        query
    }

    fn bind_single_row_subselect(&mut self, query: NodeId) -> BoundExpression {
        let wildcard = self.find_wildcard(query);
        let bound = self.bind_subquery(query);
        if let Some(wildcard) = wildcard {
            self.report(DiagnosticId::WildcardNotAllowed, self.span(wildcard), vec![]);
            return BoundExpression::Error;
        }
        match bound.output_columns.as_slice() {
            [column] => {
                let data_type = column.slot.data_type;
                BoundExpression::SingleRowSubselect {
                    query: Box::new(bound),
                    data_type,
                }
            }
            _ => {
                self.report(
                    DiagnosticId::TooManyExpressionsInSelectListOfSubquery,
                    self.span(query),
                    vec![],
                );
                BoundExpression::Error
            }
        }
    }

    /// First wildcard column in the select list that determines the output
    /// of `query`.
    fn find_wildcard(&self, query: NodeId) -> Option<NodeId> {
        match &self.tree.node(query).kind {
            SyntaxNodeKind::SelectQuery { columns, .. } => columns.items.iter().copied().find(|c| {
                matches!(
                    self.tree.node(*c).kind,
                    SyntaxNodeKind::WildcardSelectColumn { .. }
                )
            }),
            SyntaxNodeKind::OrderedQuery { query, .. }
            | SyntaxNodeKind::ParenthesizedQuery { query, .. } => self.find_wildcard(*query),
            SyntaxNodeKind::CombinedQuery { left, .. } => self.find_wildcard(*left),
            _ => None,
        }
    }

    /// Records the slot a syntax node's value lives in.
    pub(super) fn record_slot(&mut self, node: NodeId, slot: &ValueSlot) {
        self.output.slots.insert(node, slot.clone());
        if let Some(state) = self.state_mut() {
            state.node_slots.insert(node, slot.clone());
        }
    }
}

fn negate_if(expression: BoundExpression, negated: bool) -> BoundExpression {
    if negated && !expression.is_error() {
        BoundExpression::not(expression)
    } else {
        expression
    }
}

fn convert_arguments(arguments: Vec<BoundExpression>, parameters: &[DataType]) -> Vec<BoundExpression> {
    arguments
        .into_iter()
        .zip(parameters)
        .map(|(a, p)| a.convert_to(*p))
        .collect()
}
