//! Symbol definitions for tables, columns, functions and the other names a
//! query can resolve against.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, RuqlError};
use crate::types::DataType;

/// Definition of a single column in a table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnSymbol {
    /// Column name.
    pub name: String,
    /// Column data type.
    pub data_type: DataType,
}

impl ColumnSymbol {
    /// Creates a new column definition.
    ///
    /// # Errors
    ///
    /// Returns an error if the column name is empty.
    pub fn new(name: impl Into<String>, data_type: DataType) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(RuqlError::SchemaError("Column name cannot be empty".into()));
        }
        Ok(ColumnSymbol { name, data_type })
    }
}

/// A table the host exposes to queries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableSymbol {
    /// Internal table ID, assigned when the table is added to a data context.
    pub table_id: u32,
    /// Table name.
    pub name: String,
    /// Ordered list of column definitions.
    pub columns: Vec<ColumnSymbol>,
}

impl TableSymbol {
    /// Creates a new table with validation.
    ///
    /// # Errors
    ///
    /// Returns an error if the table has no columns or two columns share a
    /// name (compared case-insensitively).
    pub fn new(name: impl Into<String>, columns: Vec<ColumnSymbol>) -> Result<Self> {
        let table = TableSymbol {
            table_id: 0, // Will be set by the data context
            name: name.into(),
            columns,
        };
        table.validate()?;
        Ok(table)
    }

    fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(RuqlError::SchemaError("Table name cannot be empty".into()));
        }
        if self.columns.is_empty() {
            return Err(RuqlError::SchemaError(format!(
                "Table '{}' must have at least one column",
                self.name
            )));
        }

        let mut seen = HashSet::new();
        for col in &self.columns {
            if !seen.insert(col.name.to_ascii_lowercase()) {
                return Err(RuqlError::SchemaError(format!(
                    "Duplicate column name '{}' in table '{}'",
                    col.name, self.name
                )));
            }
        }
        Ok(())
    }

    /// Finds a column by name, ignoring case.
    #[must_use]
    pub fn get_column(&self, name: &str) -> Option<&ColumnSymbol> {
        self.columns
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Finds the index of a column by name, ignoring case.
    #[must_use]
    pub fn get_column_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.name.eq_ignore_ascii_case(name))
    }
}

/// One overload of a scalar function.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FunctionSymbol {
    pub name: String,
    pub parameters: Vec<DataType>,
    pub return_type: DataType,
}

impl FunctionSymbol {
    #[must_use]
    pub fn new(name: impl Into<String>, parameters: Vec<DataType>, return_type: DataType) -> Self {
        FunctionSymbol {
            name: name.into(),
            parameters,
            return_type,
        }
    }
}

impl fmt::Display for FunctionSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        for (i, parameter) in self.parameters.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{parameter}")?;
        }
        write!(f, ") : {}", self.return_type)
    }
}

/// Built-in aggregate computations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AggregateFunction {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

impl AggregateFunction {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            AggregateFunction::Count => "COUNT",
            AggregateFunction::Sum => "SUM",
            AggregateFunction::Avg => "AVG",
            AggregateFunction::Min => "MIN",
            AggregateFunction::Max => "MAX",
        }
    }
}

/// An aggregate name visible to queries.
///
/// Hosts may register additional names for the built-in computations.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AggregateSymbol {
    pub name: String,
    pub function: AggregateFunction,
}

impl AggregateSymbol {
    #[must_use]
    pub fn new(name: impl Into<String>, function: AggregateFunction) -> Self {
        AggregateSymbol {
            name: name.into(),
            function,
        }
    }
}

/// A host variable, referenced as `@name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VariableSymbol {
    pub name: String,
    pub data_type: DataType,
}

impl VariableSymbol {
    #[must_use]
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        VariableSymbol {
            name: name.into(),
            data_type,
        }
    }
}

/// A property readable on values of `owner`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PropertySymbol {
    pub owner: DataType,
    pub name: String,
    pub data_type: DataType,
}

impl PropertySymbol {
    #[must_use]
    pub fn new(owner: DataType, name: impl Into<String>, data_type: DataType) -> Self {
        PropertySymbol {
            owner,
            name: name.into(),
            data_type,
        }
    }
}

/// A method callable on values of `owner`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MethodSymbol {
    pub owner: DataType,
    pub name: String,
    pub parameters: Vec<DataType>,
    pub return_type: DataType,
}

impl MethodSymbol {
    #[must_use]
    pub fn new(
        owner: DataType,
        name: impl Into<String>,
        parameters: Vec<DataType>,
        return_type: DataType,
    ) -> Self {
        MethodSymbol {
            owner,
            name: name.into(),
            parameters,
            return_type,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_rejects_duplicate_columns() {
        let result = TableSymbol::new(
            "Orders",
            vec![
                ColumnSymbol::new("Id", DataType::Int32).unwrap(),
                ColumnSymbol::new("ID", DataType::Int64).unwrap(),
            ],
        );
        assert!(matches!(result, Err(RuqlError::SchemaError(_))));
    }

    #[test]
    fn test_table_rejects_empty_column_list() {
        assert!(TableSymbol::new("Empty", vec![]).is_err());
        assert!(ColumnSymbol::new("", DataType::Int32).is_err());
    }

    #[test]
    fn test_column_lookup_ignores_case() {
        let table = TableSymbol::new(
            "Orders",
            vec![
                ColumnSymbol::new("Id", DataType::Int32).unwrap(),
                ColumnSymbol::new("Total", DataType::Decimal).unwrap(),
            ],
        )
        .unwrap();
        assert_eq!(table.get_column_index("total"), Some(1));
        assert_eq!(table.get_column("ID").map(|c| c.data_type), Some(DataType::Int32));
        assert!(table.get_column("missing").is_none());
    }

    #[test]
    fn test_function_display() {
        let f = FunctionSymbol::new(
            "SUBSTRING",
            vec![DataType::String, DataType::Int32, DataType::Int32],
            DataType::String,
        );
        assert_eq!(f.to_string(), "SUBSTRING(string, int, int) : string");
    }
}
