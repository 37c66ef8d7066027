//! Table catalog derived from the DDL itself.
//!
//! The DDL strings in [`Table::ddl`] are the single source of truth for column
//! types and keys; this module parses them back so callers (the `.schema`
//! shell command, shape checks) never keep a second hand-written copy.

use crate::{SchemaError, Table};
use sqlparser::ast::*;
use sqlparser::dialect::SQLiteDialect;
use sqlparser::parser::Parser;

#[derive(Debug, Clone, PartialEq)]
pub struct TableDef {
    pub table: Table,
    pub columns: Vec<ColumnDef>,
    pub primary_key: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDef {
    pub name: String,
    pub data_type: String,
    pub nullable: bool,
}

impl TableDef {
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }
}

/// Parse the DDL of every table.
pub fn tables() -> Result<Vec<TableDef>, SchemaError> {
    Table::ALL.into_iter().map(table_def).collect()
}

/// Parse the DDL of one table.
pub fn table_def(table: Table) -> Result<TableDef, SchemaError> {
    let dialect = SQLiteDialect {};
    let statements = Parser::parse_sql(&dialect, table.ddl())?;

    for stmt in statements {
        if let Statement::CreateTable {
            columns: sql_columns,
            constraints: sql_constraints,
            ..
        } = stmt
        {
            let mut columns = Vec::new();
            let mut primary_key = Vec::new();

            for col in &sql_columns {
                let mut nullable = true;
                for opt in &col.options {
                    match &opt.option {
                        ColumnOption::NotNull => nullable = false,
                        ColumnOption::Unique {
                            is_primary: true, ..
                        } => primary_key.push(col.name.value.clone()),
                        _ => {}
                    }
                }
                columns.push(ColumnDef {
                    name: col.name.value.clone(),
                    data_type: col.data_type.to_string(),
                    nullable,
                });
            }

            for constraint in &sql_constraints {
                if let TableConstraint::Unique {
                    columns: pk_cols,
                    is_primary: true,
                    ..
                } = constraint
                {
                    primary_key = pk_cols.iter().map(|c| c.value.clone()).collect();
                }
            }

            return Ok(TableDef {
                table,
                columns,
                primary_key,
            });
        }
    }

    Err(SchemaError::MissingDdl { table })
}
