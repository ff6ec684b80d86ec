//! Catalog of the symbols queries resolve against.

mod context;
mod schema;

pub use context::{
    BuiltInMethodProvider, BuiltInPropertyProvider, DataContext, DataContextBuilder,
    MethodProvider, PropertyProvider, RegisteredConversion,
};
pub use schema::{
    AggregateFunction, AggregateSymbol, ColumnSymbol, FunctionSymbol, MethodSymbol,
    PropertySymbol, TableSymbol, VariableSymbol,
};
