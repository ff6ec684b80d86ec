//! Query planner module.
//!
//! The planner applies optimization rules to the bound relation of a query
//! and renders plans for EXPLAIN.

pub mod optimizer;

pub use optimizer::{
    estimate, AtMostOneRowRule, CardinalityEstimate, FilterPushdownRule, OptimizerRule,
    PredicateSimplificationRule, SubqueryUnnestingRule, Transformed,
};

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::binder::BoundRelation;
use crate::error::Result;

/// Which optimizer rules run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    /// Turn `EXISTS` filters into semi joins.
    pub unnest_subqueries: bool,
    /// Fold constant predicates.
    pub simplify_predicates: bool,
    /// Move filters below sorts, projections and computations.
    pub push_down_filters: bool,
    /// Drop `Top` and `Sort` that cannot matter and reassociate semi joins.
    pub at_most_one_row: bool,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            unnest_subqueries: true,
            simplify_predicates: true,
            push_down_filters: true,
            at_most_one_row: true,
        }
    }
}

impl OptimizerConfig {
    /// Creates a configuration with every rule enabled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables or disables subquery unnesting.
    #[must_use]
    pub fn with_unnest_subqueries(mut self, enabled: bool) -> Self {
        self.unnest_subqueries = enabled;
        self
    }

    /// Enables or disables predicate simplification.
    #[must_use]
    pub fn with_simplify_predicates(mut self, enabled: bool) -> Self {
        self.simplify_predicates = enabled;
        self
    }

    /// Enables or disables filter pushdown.
    #[must_use]
    pub fn with_push_down_filters(mut self, enabled: bool) -> Self {
        self.push_down_filters = enabled;
        self
    }

    /// Enables or disables the at-most-one-row rewrites.
    #[must_use]
    pub fn with_at_most_one_row(mut self, enabled: bool) -> Self {
        self.at_most_one_row = enabled;
        self
    }
}

/// Query planner.
pub struct Planner {
    optimizer_rules: Vec<Box<dyn OptimizerRule>>,
}

impl Default for Planner {
    fn default() -> Self {
        Self::new()
    }
}

impl Planner {
    /// Creates a new planner with default optimizer rules.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(&OptimizerConfig::default())
    }

    /// Creates a planner running the rules `config` enables, in the fixed
    /// order unnesting, simplification, pushdown, at-most-one-row.
    #[must_use]
    pub fn with_config(config: &OptimizerConfig) -> Self {
        let mut planner = Self::without_optimization();
        if config.unnest_subqueries {
            planner.add_rule(Box::new(SubqueryUnnestingRule));
        }
        if config.simplify_predicates {
            planner.add_rule(Box::new(PredicateSimplificationRule));
        }
        if config.push_down_filters {
            planner.add_rule(Box::new(FilterPushdownRule));
        }
        if config.at_most_one_row {
            planner.add_rule(Box::new(AtMostOneRowRule));
        }
        planner
    }

    /// Creates a planner without any optimizer rules.
    #[must_use]
    pub fn without_optimization() -> Self {
        Planner {
            optimizer_rules: Vec::new(),
        }
    }

    /// Adds an optimizer rule.
    pub fn add_rule(&mut self, rule: Box<dyn OptimizerRule>) {
        self.optimizer_rules.push(rule);
    }

    /// Applies all optimizer rules to the relation.
    pub fn optimize(&self, plan: BoundRelation) -> Result<BoundRelation> {
        self.optimize_with_tracking(plan).map(|(plan, _)| plan)
    }

    /// Applies all optimizer rules and returns both the plan and applied rules.
    pub fn optimize_with_tracking(
        &self,
        plan: BoundRelation,
    ) -> Result<(BoundRelation, Vec<String>)> {
        let mut current_plan = plan;
        let mut applied_rules = Vec::new();

        for rule in &self.optimizer_rules {
            let transformed = rule.rewrite(current_plan)?;
            trace!(rule = rule.name(), changed = transformed.was_transformed(), "applied rule");
            if transformed.was_transformed() {
                applied_rules.push(rule.name().to_string());
            }
            current_plan = transformed.into_inner();
        }

        debug!(?applied_rules, "optimized plan");
        Ok((current_plan, applied_rules))
    }

    /// Returns a textual description of the plan for EXPLAIN.
    #[must_use]
    pub fn explain(&self, plan: &BoundRelation) -> String {
        format!("{plan}")
    }

    /// Returns a detailed EXPLAIN with output values and row bounds.
    #[must_use]
    pub fn explain_verbose(&self, plan: &BoundRelation) -> String {
        let mut output = String::new();

        output.push_str("=== Logical Plan ===\n");
        output.push_str(&format!("{plan}"));

        output.push_str("\n=== Output Schema ===\n");
        for slot in plan.output_values() {
            output.push_str(&format!("  {slot} : {}\n", slot.data_type));
        }

        output.push_str("\n=== Cardinality ===\n");
        output.push_str(&format!("  {}\n", estimate(plan)));

        output
    }
}
