//! Stored procedure invocation.

use super::{Assembler, BuiltQuery, QueryBuilder};
use crate::dialect::DialectFeature;
use crate::error::{DbError, DbResult};
use crate::models::QueryParam;
use crate::models::identifier::validate_identifier;
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;

/// A parameter declared by the procedure, as read from the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcedureParameter {
    /// Name as declared, SQL Server names keep their `@`
    pub name: String,
    pub is_output: bool,
}

impl ProcedureParameter {
    pub fn input(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_output: false,
        }
    }

    fn bare_name(&self) -> &str {
        self.name.trim_start_matches('@')
    }
}

impl QueryBuilder {
    /// Invocation statement for a stored procedure.
    ///
    /// With `declared` parameters, every non-output parameter must be present in
    /// `supplied` (keys match with or without a leading `@`, ignoring case) and
    /// arguments follow the declaration order. Without them, the supplied
    /// parameters are passed in name order.
    pub fn procedure_call(
        &self,
        schema: &str,
        name: &str,
        declared: &[ProcedureParameter],
        supplied: &BTreeMap<String, JsonValue>,
    ) -> DbResult<BuiltQuery> {
        if !self.supports(DialectFeature::StoredProcedures) {
            return Err(DbError::not_supported(DialectFeature::StoredProcedures.name()));
        }
        validate_identifier("procedure", name)?;
        if !schema.is_empty() {
            validate_identifier("schema", schema)?;
        }

        let lookup = |param: &str| {
            supplied
                .iter()
                .find(|(key, _)| key.trim_start_matches('@').eq_ignore_ascii_case(param))
                .map(|(_, value)| value.clone())
        };

        let mut named: Vec<(String, JsonValue)> = Vec::new();
        if declared.is_empty() {
            for (key, value) in supplied {
                let bare = key.trim_start_matches('@');
                validate_identifier("parameter", bare)?;
                named.push((bare.to_string(), value.clone()));
            }
        } else {
            for param in declared.iter().filter(|p| !p.is_output) {
                let bare = param.bare_name();
                let value = lookup(bare).ok_or_else(|| DbError::missing_parameter(bare))?;
                named.push((bare.to_string(), value));
            }
        }

        let target = self.qualify_table(schema, name);
        let params: Vec<&str> = named.iter().map(|(param, _)| param.as_str()).collect();
        let sql = self.dialect().procedure_invocation(&target, &params);

        let q = Assembler {
            dialect: self.dialect(),
            sql,
            args: named
                .into_iter()
                .map(|(_, value)| QueryParam::from_json(value))
                .collect(),
        };
        Ok(q.finish("procedure_call"))
    }
}
