//! View tools.

use crate::db::DatasourceManager;
use crate::dialect::DialectFeature;
use crate::error::{DbError, DbResult};
use crate::models::{PageInfo, PaginationParams, resolve_schema};
use crate::tools::listing::{
    DefinitionOutput, ListingFilter, cell, cell_or_empty, display_name, fetch_definition,
    listing_schema, name_filter, page_info, required_identifier,
};
use crate::tools::procedure::ListRoutinesInput;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const FEATURE: DialectFeature = DialectFeature::Views;

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ViewEntry {
    pub schema: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_altered: Option<String>,
}

/// Output from the list_views tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ListViewsOutput {
    pub views: Vec<ViewEntry>,
    pub count: usize,
    pub pagination: PageInfo,
    pub filter: ListingFilter,
}

/// Input for the get_view_definition tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ViewDefinitionInput {
    /// View name
    pub view_name: String,
    /// Schema name (optional, driver default when omitted)
    #[serde(default)]
    pub schema: Option<String>,
}

/// Handler for view tools.
pub struct ViewToolHandler {
    manager: Arc<DatasourceManager>,
}

impl ViewToolHandler {
    pub fn new(manager: Arc<DatasourceManager>) -> Self {
        Self { manager }
    }

    pub async fn list_views(&self, input: ListRoutinesInput) -> DbResult<ListViewsOutput> {
        let datasource = self.manager.current().await?;
        let schema = listing_schema(input.schema.as_deref())?;
        let name = name_filter(input.name_filter.as_deref());
        let page = PaginationParams::listing(input.page, input.page_size);

        let query = datasource
            .builder
            .list_views(schema.as_deref(), name.as_deref(), page.page_size, page.offset)
            .ok_or_else(|| DbError::not_supported(FEATURE.name()))?;
        let rows = self.manager.executor().fetch(&datasource.pool, &query).await?;

        let views: Vec<ViewEntry> = rows
            .rows
            .iter()
            .map(|row| ViewEntry {
                schema: cell_or_empty(row, 0),
                name: cell_or_empty(row, 1),
                created: cell(row, 2),
                last_altered: cell(row, 3),
            })
            .collect();

        Ok(ListViewsOutput {
            count: views.len(),
            pagination: page_info(page, &rows),
            views,
            filter: ListingFilter {
                schema,
                name_filter: name,
                ..Default::default()
            },
        })
    }

    pub async fn get_view_definition(
        &self,
        input: ViewDefinitionInput,
    ) -> DbResult<DefinitionOutput> {
        let datasource = self.manager.current().await?;
        let name = required_identifier("view", &input.view_name)?;
        let schema = resolve_schema(input.schema.as_deref(), datasource.builder.default_schema())?;

        let query = datasource
            .builder
            .view_definition(&schema, &name)
            .ok_or_else(|| DbError::not_supported(FEATURE.name()))?;
        let definition = fetch_definition(
            &datasource,
            self.manager.executor(),
            &query,
            "definition",
            &display_name(&schema, &name),
        )
        .await?;

        Ok(DefinitionOutput {
            schema,
            name,
            definition,
        })
    }
}
