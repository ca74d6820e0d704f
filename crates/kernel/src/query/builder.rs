//! Request-driven query builder.
//!
//! One `QueryBuilder` serves one request. Each stage extends the compiled
//! spec; `execute` consumes the builder, runs the data and count reads
//! concurrently and returns the page with its metadata.
//!
//! ```ignore
//! let result = QueryBuilder::new(&store, &params, &DOCTOR_QUERY_CONFIG)
//!     .search()
//!     .filter()
//!     .and_where(doctor_baseline())
//!     .include(&doctor_mandatory_includes())
//!     .dynamic_include()
//!     .paginate()
//!     .sort()
//!     .fields()
//!     .execute()
//!     .await?;
//! ```

use anyhow::{Context, Result};

use super::config::QueryConfig;
use super::filter::compile_filters;
use super::include::{merge_mandatory, merge_optional, resolve_dynamic};
use super::paginate::{PageWindow, paginate};
use super::params::parse_params;
use super::projection::project_fields;
use super::search::compile_search;
use super::sort::compile_sort;
use super::store::QueryStore;
use super::types::{
    CompiledQuerySpec, IncludeTree, PagedResult, ParsedParams, Predicate, QueryParams,
};

/// Fluent list-query builder bound to a store, a request and an entity config.
pub struct QueryBuilder<'a, S: QueryStore + ?Sized> {
    store: &'a S,
    config: &'a QueryConfig,
    params: ParsedParams,
    spec: CompiledQuerySpec,
    window: Option<PageWindow>,
    searched: bool,
    filtered: bool,
}

impl<'a, S: QueryStore + ?Sized> QueryBuilder<'a, S> {
    pub fn new(store: &'a S, params: &QueryParams, config: &'a QueryConfig) -> Self {
        Self {
            store,
            config,
            params: parse_params(params),
            spec: CompiledQuerySpec::default(),
            window: None,
            searched: false,
            filtered: false,
        }
    }

    /// OR the search term across the searchable fields.
    pub fn search(mut self) -> Self {
        if self.searched {
            return self;
        }
        self.searched = true;
        if let Some(predicate) = compile_search(
            self.params.search_term.as_deref(),
            &self.config.text_search_fields(),
        ) {
            self.spec.where_clause.push(predicate);
        }
        self
    }

    /// Add a predicate per allow-listed residual key.
    pub fn filter(mut self) -> Self {
        if self.filtered {
            return self;
        }
        self.filtered = true;
        let predicates = compile_filters(&self.params.filters, self.config);
        self.spec.where_clause.extend(predicates);
        self
    }

    /// AND a caller-supplied predicate, such as a soft-delete exclusion.
    /// Client input never removes it.
    pub fn and_where(mut self, predicate: Predicate) -> Self {
        self.spec.where_clause.push(predicate);
        self
    }

    /// Add relations every response carries.
    pub fn include(mut self, mandatory: &IncludeTree) -> Self {
        merge_mandatory(&mut self.spec.include, mandatory);
        self
    }

    /// Add the whitelisted relations named by the `includes` parameter.
    pub fn dynamic_include(mut self) -> Self {
        let optional = resolve_dynamic(
            &self.params.includes,
            &self.config.dynamic_include_whitelist,
        );
        merge_optional(&mut self.spec.include, optional);
        self
    }

    pub fn paginate(mut self) -> Self {
        self.apply_window();
        self
    }

    fn apply_window(&mut self) -> PageWindow {
        let window = paginate(self.params.page, self.params.limit, self.config);
        self.spec.skip = window.skip;
        self.spec.take = Some(window.limit);
        self.window = Some(window);
        window
    }

    pub fn sort(mut self) -> Self {
        self.spec.order_by = Some(compile_sort(
            self.params.sort_by.as_deref(),
            self.params.sort_order,
            self.config,
        ));
        self
    }

    /// Restrict the returned columns to the allowed subset of `fields`.
    pub fn fields(mut self) -> Self {
        self.spec.select = project_fields(&self.params.fields, self.config);
        self
    }

    /// The spec compiled so far.
    pub fn spec(&self) -> &CompiledQuerySpec {
        &self.spec
    }

    /// Finish compilation without executing. Pagination is applied if no
    /// stage asked for it, so the spec is always bounded.
    pub fn compile(mut self) -> (CompiledQuerySpec, PageWindow) {
        let window = match self.window {
            Some(window) => window,
            None => self.apply_window(),
        };
        let mut spec = self.spec;
        spec.finalize();
        (spec, window)
    }

    /// Run the data and count reads and assemble the page.
    pub async fn execute(self) -> Result<PagedResult<S::Record>> {
        let store = self.store;
        let (spec, window) = self.compile();
        let count_spec = spec.count_spec();

        let (data, total) = tokio::try_join!(
            async {
                store
                    .find_many(&spec)
                    .await
                    .context("failed to execute list query")
            },
            async {
                store
                    .count(&count_spec)
                    .await
                    .context("failed to execute count query")
            },
        )?;

        Ok(PagedResult {
            data,
            meta: window.meta(total),
        })
    }
}
