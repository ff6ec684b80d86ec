//! The data context: everything a query can name.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{Result, RuqlError};
use crate::types::{CustomTypeId, DataType};

use super::schema::{
    AggregateFunction, AggregateSymbol, FunctionSymbol, MethodSymbol, PropertySymbol, TableSymbol,
    VariableSymbol,
};

/// Supplies the properties readable on values of a type.
pub trait PropertyProvider: Send + Sync {
    /// Returns the properties of `data_type`; unknown types yield none.
    fn properties(&self, data_type: DataType) -> Vec<PropertySymbol>;
}

/// Supplies the methods callable on values of a type.
pub trait MethodProvider: Send + Sync {
    /// Returns the methods of `data_type`; unknown types yield none.
    fn methods(&self, data_type: DataType) -> Vec<MethodSymbol>;
}

/// Properties of the built-in types.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltInPropertyProvider;

impl PropertyProvider for BuiltInPropertyProvider {
    fn properties(&self, data_type: DataType) -> Vec<PropertySymbol> {
        match data_type {
            DataType::String => vec![PropertySymbol::new(
                DataType::String,
                "Length",
                DataType::Int32,
            )],
            _ => Vec::new(),
        }
    }
}

/// Methods of the built-in types.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltInMethodProvider;

impl MethodProvider for BuiltInMethodProvider {
    fn methods(&self, data_type: DataType) -> Vec<MethodSymbol> {
        use DataType::{Bool, Int32, String};
        match data_type {
            String => vec![
                MethodSymbol::new(String, "ToUpper", vec![], String),
                MethodSymbol::new(String, "ToLower", vec![], String),
                MethodSymbol::new(String, "Trim", vec![], String),
                MethodSymbol::new(String, "Substring", vec![Int32], String),
                MethodSymbol::new(String, "Substring", vec![Int32, Int32], String),
                MethodSymbol::new(String, "Contains", vec![String], Bool),
                MethodSymbol::new(String, "StartsWith", vec![String], Bool),
                MethodSymbol::new(String, "EndsWith", vec![String], Bool),
                MethodSymbol::new(String, "IndexOf", vec![String], Int32),
            ],
            _ => Vec::new(),
        }
    }
}

/// A host-registered conversion between two types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegisteredConversion {
    pub from: DataType,
    pub to: DataType,
    pub implicit: bool,
}

/// Read-only registry of tables, functions, aggregates, variables, member
/// providers, custom types and conversions.
///
/// Built with [`DataContextBuilder`]. Lookups ignore case.
#[derive(Clone)]
pub struct DataContext {
    tables: Vec<TableSymbol>,
    functions: HashMap<String, Vec<FunctionSymbol>>,
    aggregates: HashMap<String, AggregateSymbol>,
    variables: HashMap<String, VariableSymbol>,
    property_providers: Vec<Arc<dyn PropertyProvider>>,
    method_providers: Vec<Arc<dyn MethodProvider>>,
    custom_types: Vec<String>,
    conversions: Vec<RegisteredConversion>,
}

impl Default for DataContext {
    /// A context with the built-in functions, aggregates and members but no
    /// tables or variables.
    fn default() -> Self {
        DataContextBuilder::new().build()
    }
}

impl fmt::Debug for DataContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataContext")
            .field("tables", &self.table_names())
            .field("functions", &self.functions.len())
            .field("aggregates", &self.aggregates.len())
            .field("variables", &self.variables.len())
            .field("custom_types", &self.custom_types)
            .finish_non_exhaustive()
    }
}

impl DataContext {
    /// Creates a builder pre-populated with the built-ins.
    #[must_use]
    pub fn builder() -> DataContextBuilder {
        DataContextBuilder::new()
    }

    /// Retrieves a table by name.
    #[must_use]
    pub fn get_table(&self, name: &str) -> Option<&TableSymbol> {
        self.tables
            .iter()
            .find(|t| t.name.eq_ignore_ascii_case(name))
    }

    /// Returns all tables in registration order.
    #[must_use]
    pub fn tables(&self) -> &[TableSymbol] {
        &self.tables
    }

    #[must_use]
    pub fn table_names(&self) -> Vec<&str> {
        self.tables.iter().map(|t| t.name.as_str()).collect()
    }

    /// Returns the overloads registered under `name`.
    #[must_use]
    pub fn functions(&self, name: &str) -> &[FunctionSymbol] {
        self.functions
            .get(&name.to_ascii_lowercase())
            .map_or(&[], Vec::as_slice)
    }

    #[must_use]
    pub fn get_aggregate(&self, name: &str) -> Option<&AggregateSymbol> {
        self.aggregates.get(&name.to_ascii_lowercase())
    }

    #[must_use]
    pub fn get_variable(&self, name: &str) -> Option<&VariableSymbol> {
        self.variables.get(&name.to_ascii_lowercase())
    }

    /// Collects the properties named `name` on `data_type` from every provider.
    #[must_use]
    pub fn lookup_properties(&self, data_type: DataType, name: &str) -> Vec<PropertySymbol> {
        self.property_providers
            .iter()
            .flat_map(|p| p.properties(data_type))
            .filter(|p| p.name.eq_ignore_ascii_case(name))
            .collect()
    }

    /// Collects the methods named `name` on `data_type` from every provider.
    #[must_use]
    pub fn lookup_methods(&self, data_type: DataType, name: &str) -> Vec<MethodSymbol> {
        self.method_providers
            .iter()
            .flat_map(|p| p.methods(data_type))
            .filter(|m| m.name.eq_ignore_ascii_case(name))
            .collect()
    }

    /// Resolves a type name: built-ins first, then custom types.
    #[must_use]
    pub fn resolve_type(&self, name: &str) -> Option<DataType> {
        DataType::from_name(name).or_else(|| {
            self.custom_types
                .iter()
                .position(|t| t.eq_ignore_ascii_case(name))
                .and_then(|i| u32::try_from(i).ok())
                .map(|i| DataType::Custom(CustomTypeId(i)))
        })
    }

    /// Display name of a type, including custom types.
    #[must_use]
    pub fn type_name(&self, data_type: DataType) -> String {
        match data_type {
            DataType::Custom(CustomTypeId(id)) => self
                .custom_types
                .get(id as usize)
                .cloned()
                .unwrap_or_else(|| data_type.to_string()),
            other => other.name().to_string(),
        }
    }

    /// Finds a registered conversion from `from` to `to`.
    #[must_use]
    pub fn registered_conversion(&self, from: DataType, to: DataType) -> Option<RegisteredConversion> {
        self.conversions
            .iter()
            .find(|c| c.from == from && c.to == to)
            .copied()
    }
}

/// Builder for [`DataContext`].
pub struct DataContextBuilder {
    context: DataContext,
}

impl Default for DataContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl DataContextBuilder {
    /// Creates a builder holding the built-in functions, aggregates, property
    /// provider and method provider.
    #[must_use]
    pub fn new() -> Self {
        let mut builder = Self::empty();
        for function in built_in_functions() {
            builder.push_function(function);
        }
        for function in [
            AggregateFunction::Count,
            AggregateFunction::Sum,
            AggregateFunction::Avg,
            AggregateFunction::Min,
            AggregateFunction::Max,
        ] {
            builder
                .context
                .aggregates
                .insert(function.name().to_ascii_lowercase(), AggregateSymbol::new(function.name(), function));
        }
        builder
            .context
            .property_providers
            .push(Arc::new(BuiltInPropertyProvider));
        builder
            .context
            .method_providers
            .push(Arc::new(BuiltInMethodProvider));
        builder
    }

    /// Creates a builder with no symbols at all.
    #[must_use]
    pub fn empty() -> Self {
        DataContextBuilder {
            context: DataContext {
                tables: Vec::new(),
                functions: HashMap::new(),
                aggregates: HashMap::new(),
                variables: HashMap::new(),
                property_providers: Vec::new(),
                method_providers: Vec::new(),
                custom_types: Vec::new(),
                conversions: Vec::new(),
            },
        }
    }

    /// Registers a table and returns its assigned ID.
    ///
    /// # Errors
    ///
    /// Returns an error if a table with the same name already exists.
    pub fn add_table(&mut self, mut table: TableSymbol) -> Result<u32> {
        if self.context.get_table(&table.name).is_some() {
            return Err(RuqlError::SchemaError(format!(
                "Table '{}' already exists",
                table.name
            )));
        }
        let table_id = u32::try_from(self.context.tables.len())
            .map_err(|_| RuqlError::SchemaError("Too many tables".into()))?;
        table.table_id = table_id;
        self.context.tables.push(table);
        Ok(table_id)
    }

    /// Registers a function overload.
    ///
    /// # Errors
    ///
    /// Returns an error if an overload with the same parameter types exists.
    pub fn add_function(&mut self, function: FunctionSymbol) -> Result<()> {
        let exists = self
            .context
            .functions(&function.name)
            .iter()
            .any(|f| f.parameters == function.parameters);
        if exists {
            return Err(RuqlError::SchemaError(format!(
                "Function '{function}' already exists"
            )));
        }
        self.push_function(function);
        Ok(())
    }

    fn push_function(&mut self, function: FunctionSymbol) {
        self.context
            .functions
            .entry(function.name.to_ascii_lowercase())
            .or_default()
            .push(function);
    }

    /// Registers an aggregate name.
    ///
    /// # Errors
    ///
    /// Returns an error if an aggregate with the same name exists.
    pub fn add_aggregate(&mut self, aggregate: AggregateSymbol) -> Result<()> {
        let key = aggregate.name.to_ascii_lowercase();
        if self.context.aggregates.contains_key(&key) {
            return Err(RuqlError::SchemaError(format!(
                "Aggregate '{}' already exists",
                aggregate.name
            )));
        }
        self.context.aggregates.insert(key, aggregate);
        Ok(())
    }

    /// Registers a variable.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable with the same name exists.
    pub fn add_variable(&mut self, variable: VariableSymbol) -> Result<()> {
        let key = variable.name.to_ascii_lowercase();
        if self.context.variables.contains_key(&key) {
            return Err(RuqlError::SchemaError(format!(
                "Variable '{}' already exists",
                variable.name
            )));
        }
        self.context.variables.insert(key, variable);
        Ok(())
    }

    /// Registers a custom type and returns its type.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is taken by a built-in or custom type.
    pub fn add_custom_type(&mut self, name: impl Into<String>) -> Result<DataType> {
        let name = name.into();
        if self.context.resolve_type(&name).is_some() {
            return Err(RuqlError::SchemaError(format!(
                "Type '{name}' already exists"
            )));
        }
        let id = u32::try_from(self.context.custom_types.len())
            .map_err(|_| RuqlError::SchemaError("Too many custom types".into()))?;
        self.context.custom_types.push(name);
        Ok(DataType::Custom(CustomTypeId(id)))
    }

    /// Registers a conversion between two types.
    ///
    /// # Errors
    ///
    /// Returns an error if a conversion between the two types already exists.
    pub fn add_conversion(&mut self, from: DataType, to: DataType, implicit: bool) -> Result<()> {
        if self.context.registered_conversion(from, to).is_some() {
            return Err(RuqlError::SchemaError(format!(
                "Conversion from '{}' to '{}' already exists",
                self.context.type_name(from),
                self.context.type_name(to)
            )));
        }
        self.context
            .conversions
            .push(RegisteredConversion { from, to, implicit });
        Ok(())
    }

    /// Adds a property provider; providers are consulted in order.
    pub fn add_property_provider(&mut self, provider: Arc<dyn PropertyProvider>) {
        self.context.property_providers.push(provider);
    }

    /// Adds a method provider; providers are consulted in order.
    pub fn add_method_provider(&mut self, provider: Arc<dyn MethodProvider>) {
        self.context.method_providers.push(provider);
    }

    #[must_use]
    pub fn build(self) -> DataContext {
        self.context
    }
}

fn built_in_functions() -> Vec<FunctionSymbol> {
    use DataType::{Decimal, Float64, Int32, Int64, String};
    vec![
        FunctionSymbol::new("ABS", vec![Int32], Int32),
        FunctionSymbol::new("ABS", vec![Int64], Int64),
        FunctionSymbol::new("ABS", vec![Float64], Float64),
        FunctionSymbol::new("ABS", vec![Decimal], Decimal),
        FunctionSymbol::new("ROUND", vec![Float64], Float64),
        FunctionSymbol::new("ROUND", vec![Float64, Int32], Float64),
        FunctionSymbol::new("ROUND", vec![Decimal, Int32], Decimal),
        FunctionSymbol::new("LEN", vec![String], Int32),
        FunctionSymbol::new("UPPER", vec![String], String),
        FunctionSymbol::new("LOWER", vec![String], String),
        FunctionSymbol::new("TRIM", vec![String], String),
        FunctionSymbol::new("SUBSTRING", vec![String, Int32, Int32], String),
        FunctionSymbol::new("CONCAT", vec![String, String], String),
        FunctionSymbol::new("TO_STRING", vec![DataType::Object], String),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ColumnSymbol;

    fn orders() -> TableSymbol {
        TableSymbol::new(
            "Orders",
            vec![
                ColumnSymbol::new("Id", DataType::Int32).unwrap(),
                ColumnSymbol::new("Customer", DataType::String).unwrap(),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_duplicate_table_is_schema_error() {
        let mut builder = DataContextBuilder::new();
        assert_eq!(builder.add_table(orders()).unwrap(), 0);
        let result = builder.add_table(orders());
        assert!(matches!(result, Err(RuqlError::SchemaError(_))));
    }

    #[test]
    fn test_default_context_has_built_ins() {
        let context = DataContext::default();
        assert_eq!(context.functions("abs").len(), 4);
        assert_eq!(
            context.get_aggregate("count").map(|a| a.function),
            Some(AggregateFunction::Count)
        );
        assert_eq!(context.lookup_properties(DataType::String, "length").len(), 1);
        assert_eq!(context.lookup_methods(DataType::String, "SUBSTRING").len(), 2);
        assert!(context.tables().is_empty());
    }

    #[test]
    fn test_empty_builder_has_nothing() {
        let context = DataContextBuilder::empty().build();
        assert!(context.functions("ABS").is_empty());
        assert!(context.get_aggregate("SUM").is_none());
    }

    #[test]
    fn test_custom_types_and_conversions() {
        let mut builder = DataContextBuilder::new();
        let money = builder.add_custom_type("Money").unwrap();
        assert!(builder.add_custom_type("money").is_err());
        assert!(builder.add_custom_type("int").is_err());
        builder.add_conversion(money, DataType::Decimal, true).unwrap();
        assert!(builder.add_conversion(money, DataType::Decimal, false).is_err());

        let context = builder.build();
        assert_eq!(context.resolve_type("MONEY"), Some(money));
        assert_eq!(context.type_name(money), "Money");
        assert!(context
            .registered_conversion(money, DataType::Decimal)
            .is_some_and(|c| c.implicit));
    }

    #[test]
    fn test_duplicate_function_overload_rejected() {
        let mut builder = DataContextBuilder::new();
        let result = builder.add_function(FunctionSymbol::new(
            "abs",
            vec![DataType::Int32],
            DataType::Int32,
        ));
        assert!(result.is_err());
        builder
            .add_function(FunctionSymbol::new("ABS", vec![DataType::Int16], DataType::Int16))
            .unwrap();
        assert_eq!(builder.build().functions("Abs").len(), 5);
    }
}
