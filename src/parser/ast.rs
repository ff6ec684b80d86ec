//! Syntax node definitions for queries and expressions.
//!
//! Nodes live in the arena of a [`SyntaxTree`](super::SyntaxTree) and refer
//! to their children by [`NodeId`] and [`TokenId`].

use serde::{Deserialize, Serialize};

/// Index of a node in a syntax tree's node arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u32);

/// Index of a token in a syntax tree's token arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TokenId(pub u32);

impl NodeId {
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl TokenId {
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A child of a node, in document order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyntaxElement {
    Node(NodeId),
    Token(TokenId),
}

/// Comma-separated list of nodes; `separators.len()` is `items.len() - 1`
/// or, after error recovery, equal to it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeparatedList {
    pub items: Vec<NodeId>,
    pub separators: Vec<TokenId>,
}

impl SeparatedList {
    fn push_elements(&self, out: &mut Vec<SyntaxElement>) {
        for (i, item) in self.items.iter().enumerate() {
            out.push(SyntaxElement::Node(*item));
            if let Some(separator) = self.separators.get(i) {
                out.push(SyntaxElement::Token(*separator));
            }
        }
    }
}

/// A node in the syntax tree with the range of tokens it covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxNode {
    pub kind: SyntaxNodeKind,
    pub first_token: TokenId,
    pub last_token: TokenId,
}

/// Every production of the grammar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyntaxNodeKind {
    /// Root: a single expression or query followed by end of file.
    CompilationUnit {
        root: NodeId,
        end_of_file: TokenId,
    },

    // ==================== Expressions ====================
    LiteralExpression {
        token: TokenId,
    },
    VariableExpression {
        at_token: TokenId,
        name: TokenId,
    },
    NameExpression {
        name: TokenId,
    },
    PropertyAccessExpression {
        target: NodeId,
        dot: TokenId,
        name: TokenId,
    },
    MethodInvocationExpression {
        target: NodeId,
        dot: TokenId,
        name: TokenId,
        arguments: NodeId,
    },
    FunctionInvocationExpression {
        name: TokenId,
        arguments: NodeId,
    },
    CountAllExpression {
        name: TokenId,
        left_paren: TokenId,
        asterisk: TokenId,
        right_paren: TokenId,
    },
    ArgumentList {
        left_paren: TokenId,
        arguments: SeparatedList,
        right_paren: TokenId,
    },
    UnaryExpression {
        operator: TokenId,
        operand: NodeId,
    },
    BinaryExpression {
        left: NodeId,
        operator: TokenId,
        right: NodeId,
    },
    ParenthesizedExpression {
        left_paren: TokenId,
        expression: NodeId,
        right_paren: TokenId,
    },
    CastExpression {
        cast_keyword: TokenId,
        left_paren: TokenId,
        expression: NodeId,
        as_keyword: TokenId,
        type_name: TokenId,
        right_paren: TokenId,
    },
    CoalesceExpression {
        coalesce_keyword: TokenId,
        left_paren: TokenId,
        arguments: SeparatedList,
        right_paren: TokenId,
    },
    NullIfExpression {
        nullif_keyword: TokenId,
        left_paren: TokenId,
        left: NodeId,
        comma: TokenId,
        right: NodeId,
        right_paren: TokenId,
    },
    IsNullExpression {
        expression: NodeId,
        is_keyword: TokenId,
        not_keyword: Option<TokenId>,
        null_keyword: TokenId,
    },
    LikeExpression {
        left: NodeId,
        not_keyword: Option<TokenId>,
        like_keyword: TokenId,
        right: NodeId,
    },
    BetweenExpression {
        expression: NodeId,
        not_keyword: Option<TokenId>,
        between_keyword: TokenId,
        lower: NodeId,
        and_keyword: TokenId,
        upper: NodeId,
    },
    InExpression {
        expression: NodeId,
        not_keyword: Option<TokenId>,
        in_keyword: TokenId,
        arguments: NodeId,
    },
    CaseExpression {
        case_keyword: TokenId,
        input: Option<NodeId>,
        labels: Vec<NodeId>,
        else_keyword: Option<TokenId>,
        else_expression: Option<NodeId>,
        end_keyword: TokenId,
    },
    CaseLabel {
        when_keyword: TokenId,
        when_expression: NodeId,
        then_keyword: TokenId,
        then_expression: NodeId,
    },
    ExistsSubselect {
        exists_keyword: TokenId,
        left_paren: TokenId,
        query: NodeId,
        right_paren: TokenId,
    },
    SingleRowSubselect {
        left_paren: TokenId,
        query: NodeId,
        right_paren: TokenId,
    },

    // ==================== Queries ====================
    SelectQuery {
        select_keyword: TokenId,
        /// `DISTINCT` or `ALL`.
        quantifier: Option<TokenId>,
        top: Option<NodeId>,
        columns: SeparatedList,
        from: Option<NodeId>,
        where_clause: Option<NodeId>,
        group_by: Option<NodeId>,
        having: Option<NodeId>,
    },
    TopClause {
        top_keyword: TokenId,
        value: TokenId,
        with_keyword: Option<TokenId>,
        ties_keyword: Option<TokenId>,
    },
    ExpressionSelectColumn {
        expression: NodeId,
        as_keyword: Option<TokenId>,
        alias: Option<TokenId>,
    },
    WildcardSelectColumn {
        table_name: Option<TokenId>,
        dot: Option<TokenId>,
        asterisk: TokenId,
    },
    FromClause {
        from_keyword: TokenId,
        tables: SeparatedList,
    },
    NamedTableReference {
        table_name: TokenId,
        as_keyword: Option<TokenId>,
        alias: Option<TokenId>,
    },
    DerivedTableReference {
        left_paren: TokenId,
        query: NodeId,
        right_paren: TokenId,
        as_keyword: Option<TokenId>,
        alias: TokenId,
    },
    JoinedTableReference {
        left: NodeId,
        /// `INNER`, `LEFT`, `RIGHT`, `FULL` or `CROSS`.
        join_type_keyword: Option<TokenId>,
        outer_keyword: Option<TokenId>,
        join_keyword: TokenId,
        right: NodeId,
        on_keyword: Option<TokenId>,
        condition: Option<NodeId>,
    },
    WhereClause {
        where_keyword: TokenId,
        condition: NodeId,
    },
    GroupByClause {
        group_keyword: TokenId,
        by_keyword: TokenId,
        columns: SeparatedList,
    },
    HavingClause {
        having_keyword: TokenId,
        condition: NodeId,
    },
    OrderedQuery {
        query: NodeId,
        order_keyword: TokenId,
        by_keyword: TokenId,
        columns: SeparatedList,
    },
    OrderByColumn {
        expression: NodeId,
        /// `ASC` or `DESC`.
        modifier: Option<TokenId>,
    },
    CombinedQuery {
        left: NodeId,
        /// `UNION`, `INTERSECT` or `EXCEPT`.
        operator: TokenId,
        all_keyword: Option<TokenId>,
        right: NodeId,
    },
    ParenthesizedQuery {
        left_paren: TokenId,
        query: NodeId,
        right_paren: TokenId,
    },
}

fn node(out: &mut Vec<SyntaxElement>, id: NodeId) {
    out.push(SyntaxElement::Node(id));
}

fn token(out: &mut Vec<SyntaxElement>, id: TokenId) {
    out.push(SyntaxElement::Token(id));
}

fn opt_node(out: &mut Vec<SyntaxElement>, id: Option<NodeId>) {
    if let Some(id) = id {
        node(out, id);
    }
}

fn opt_token(out: &mut Vec<SyntaxElement>, id: Option<TokenId>) {
    if let Some(id) = id {
        token(out, id);
    }
}

impl SyntaxNodeKind {
    /// Ordered children of this node.
    #[must_use]
    pub fn children(&self) -> Vec<SyntaxElement> {
        use SyntaxNodeKind as K;
        let mut out = Vec::new();
        let o = &mut out;
        match self {
            K::CompilationUnit { root, end_of_file } => {
                node(o, *root);
                token(o, *end_of_file);
            }
            K::LiteralExpression { token: t } | K::NameExpression { name: t } => token(o, *t),
            K::VariableExpression { at_token, name } => {
                token(o, *at_token);
                token(o, *name);
            }
            K::PropertyAccessExpression { target, dot, name } => {
                node(o, *target);
                token(o, *dot);
                token(o, *name);
            }
            K::MethodInvocationExpression {
                target,
                dot,
                name,
                arguments,
            } => {
                node(o, *target);
                token(o, *dot);
                token(o, *name);
                node(o, *arguments);
            }
            K::FunctionInvocationExpression { name, arguments } => {
                token(o, *name);
                node(o, *arguments);
            }
            K::CountAllExpression {
                name,
                left_paren,
                asterisk,
                right_paren,
            } => {
                for t in [name, left_paren, asterisk, right_paren] {
                    token(o, *t);
                }
            }
            K::ArgumentList {
                left_paren,
                arguments,
                right_paren,
            } => {
                token(o, *left_paren);
                arguments.push_elements(o);
                token(o, *right_paren);
            }
            K::CoalesceExpression {
                coalesce_keyword,
                left_paren,
                arguments,
                right_paren,
            } => {
                token(o, *coalesce_keyword);
                token(o, *left_paren);
                arguments.push_elements(o);
                token(o, *right_paren);
            }
            K::UnaryExpression { operator, operand } => {
                token(o, *operator);
                node(o, *operand);
            }
            K::BinaryExpression {
                left,
                operator,
                right,
            } => {
                node(o, *left);
                token(o, *operator);
                node(o, *right);
            }
            K::ParenthesizedExpression {
                left_paren,
                expression: inner,
                right_paren,
            }
            | K::SingleRowSubselect {
                left_paren,
                query: inner,
                right_paren,
            }
            | K::ParenthesizedQuery {
                left_paren,
                query: inner,
                right_paren,
            } => {
                token(o, *left_paren);
                node(o, *inner);
                token(o, *right_paren);
            }
            K::CastExpression {
                cast_keyword,
                left_paren,
                expression,
                as_keyword,
                type_name,
                right_paren,
            } => {
                token(o, *cast_keyword);
                token(o, *left_paren);
                node(o, *expression);
                token(o, *as_keyword);
                token(o, *type_name);
                token(o, *right_paren);
            }
            K::NullIfExpression {
                nullif_keyword,
                left_paren,
                left,
                comma,
                right,
                right_paren,
            } => {
                token(o, *nullif_keyword);
                token(o, *left_paren);
                node(o, *left);
                token(o, *comma);
                node(o, *right);
                token(o, *right_paren);
            }
            K::IsNullExpression {
                expression,
                is_keyword,
                not_keyword,
                null_keyword,
            } => {
                node(o, *expression);
                token(o, *is_keyword);
                opt_token(o, *not_keyword);
                token(o, *null_keyword);
            }
            K::LikeExpression {
                left,
                not_keyword,
                like_keyword,
                right,
            } => {
                node(o, *left);
                opt_token(o, *not_keyword);
                token(o, *like_keyword);
                node(o, *right);
            }
            K::BetweenExpression {
                expression,
                not_keyword,
                between_keyword,
                lower,
                and_keyword,
                upper,
            } => {
                node(o, *expression);
                opt_token(o, *not_keyword);
                token(o, *between_keyword);
                node(o, *lower);
                token(o, *and_keyword);
                node(o, *upper);
            }
            K::InExpression {
                expression,
                not_keyword,
                in_keyword,
                arguments,
            } => {
                node(o, *expression);
                opt_token(o, *not_keyword);
                token(o, *in_keyword);
                node(o, *arguments);
            }
            K::CaseExpression {
                case_keyword,
                input,
                labels,
                else_keyword,
                else_expression,
                end_keyword,
            } => {
                token(o, *case_keyword);
                opt_node(o, *input);
                for label in labels {
                    node(o, *label);
                }
                opt_token(o, *else_keyword);
                opt_node(o, *else_expression);
                token(o, *end_keyword);
            }
            K::CaseLabel {
                when_keyword,
                when_expression,
                then_keyword,
                then_expression,
            } => {
                token(o, *when_keyword);
                node(o, *when_expression);
                token(o, *then_keyword);
                node(o, *then_expression);
            }
            K::ExistsSubselect {
                exists_keyword,
                left_paren,
                query,
                right_paren,
            } => {
                token(o, *exists_keyword);
                token(o, *left_paren);
                node(o, *query);
                token(o, *right_paren);
            }
            K::SelectQuery {
                select_keyword,
                quantifier,
                top,
                columns,
                from,
                where_clause,
                group_by,
                having,
            } => {
                token(o, *select_keyword);
                opt_token(o, *quantifier);
                opt_node(o, *top);
                columns.push_elements(o);
                opt_node(o, *from);
                opt_node(o, *where_clause);
                opt_node(o, *group_by);
                opt_node(o, *having);
            }
            K::TopClause {
                top_keyword,
                value,
                with_keyword,
                ties_keyword,
            } => {
                token(o, *top_keyword);
                token(o, *value);
                opt_token(o, *with_keyword);
                opt_token(o, *ties_keyword);
            }
            K::ExpressionSelectColumn {
                expression,
                as_keyword,
                alias,
            } => {
                node(o, *expression);
                opt_token(o, *as_keyword);
                opt_token(o, *alias);
            }
            K::WildcardSelectColumn {
                table_name,
                dot,
                asterisk,
            } => {
                opt_token(o, *table_name);
                opt_token(o, *dot);
                token(o, *asterisk);
            }
            K::FromClause {
                from_keyword,
                tables,
            } => {
                token(o, *from_keyword);
                tables.push_elements(o);
            }
            K::NamedTableReference {
                table_name,
                as_keyword,
                alias,
            } => {
                token(o, *table_name);
                opt_token(o, *as_keyword);
                opt_token(o, *alias);
            }
            K::DerivedTableReference {
                left_paren,
                query,
                right_paren,
                as_keyword,
                alias,
            } => {
                token(o, *left_paren);
                node(o, *query);
                token(o, *right_paren);
                opt_token(o, *as_keyword);
                token(o, *alias);
            }
            K::JoinedTableReference {
                left,
                join_type_keyword,
                outer_keyword,
                join_keyword,
                right,
                on_keyword,
                condition,
            } => {
                node(o, *left);
                opt_token(o, *join_type_keyword);
                opt_token(o, *outer_keyword);
                token(o, *join_keyword);
                node(o, *right);
                opt_token(o, *on_keyword);
                opt_node(o, *condition);
            }
            K::WhereClause {
                where_keyword: keyword,
                condition,
            }
            | K::HavingClause {
                having_keyword: keyword,
                condition,
            } => {
                token(o, *keyword);
                node(o, *condition);
            }
            K::GroupByClause {
                group_keyword,
                by_keyword,
                columns,
            } => {
                token(o, *group_keyword);
                token(o, *by_keyword);
                columns.push_elements(o);
            }
            K::OrderedQuery {
                query,
                order_keyword,
                by_keyword,
                columns,
            } => {
                node(o, *query);
                token(o, *order_keyword);
                token(o, *by_keyword);
                columns.push_elements(o);
            }
            K::OrderByColumn {
                expression,
                modifier,
            } => {
                node(o, *expression);
                opt_token(o, *modifier);
            }
            K::CombinedQuery {
                left,
                operator,
                all_keyword,
                right,
            } => {
                node(o, *left);
                token(o, *operator);
                opt_token(o, *all_keyword);
                node(o, *right);
            }
        }
        out
    }

    /// Whether this node is a query.
    #[must_use]
    pub fn is_query(&self) -> bool {
        matches!(
            self,
            SyntaxNodeKind::SelectQuery { .. }
                | SyntaxNodeKind::OrderedQuery { .. }
                | SyntaxNodeKind::CombinedQuery { .. }
                | SyntaxNodeKind::ParenthesizedQuery { .. }
        )
    }

    /// Short name of the production.
    #[must_use]
    pub fn name(&self) -> &'static str {
        use SyntaxNodeKind as K;
        match self {
            K::CompilationUnit { .. } => "CompilationUnit",
            K::LiteralExpression { .. } => "LiteralExpression",
            K::VariableExpression { .. } => "VariableExpression",
            K::NameExpression { .. } => "NameExpression",
            K::PropertyAccessExpression { .. } => "PropertyAccessExpression",
            K::MethodInvocationExpression { .. } => "MethodInvocationExpression",
            K::FunctionInvocationExpression { .. } => "FunctionInvocationExpression",
            K::CountAllExpression { .. } => "CountAllExpression",
            K::ArgumentList { .. } => "ArgumentList",
            K::UnaryExpression { .. } => "UnaryExpression",
            K::BinaryExpression { .. } => "BinaryExpression",
            K::ParenthesizedExpression { .. } => "ParenthesizedExpression",
            K::CastExpression { .. } => "CastExpression",
            K::CoalesceExpression { .. } => "CoalesceExpression",
            K::NullIfExpression { .. } => "NullIfExpression",
            K::IsNullExpression { .. } => "IsNullExpression",
            K::LikeExpression { .. } => "LikeExpression",
            K::BetweenExpression { .. } => "BetweenExpression",
            K::InExpression { .. } => "InExpression",
            K::CaseExpression { .. } => "CaseExpression",
            K::CaseLabel { .. } => "CaseLabel",
            K::ExistsSubselect { .. } => "ExistsSubselect",
            K::SingleRowSubselect { .. } => "SingleRowSubselect",
            K::SelectQuery { .. } => "SelectQuery",
            K::TopClause { .. } => "TopClause",
            K::ExpressionSelectColumn { .. } => "ExpressionSelectColumn",
            K::WildcardSelectColumn { .. } => "WildcardSelectColumn",
            K::FromClause { .. } => "FromClause",
            K::NamedTableReference { .. } => "NamedTableReference",
            K::DerivedTableReference { .. } => "DerivedTableReference",
            K::JoinedTableReference { .. } => "JoinedTableReference",
            K::WhereClause { .. } => "WhereClause",
            K::GroupByClause { .. } => "GroupByClause",
            K::HavingClause { .. } => "HavingClause",
            K::OrderedQuery { .. } => "OrderedQuery",
            K::OrderByColumn { .. } => "OrderByColumn",
            K::CombinedQuery { .. } => "CombinedQuery",
            K::ParenthesizedQuery { .. } => "ParenthesizedQuery",
        }
    }
}
