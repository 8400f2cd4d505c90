//! Field specifications and field lookup resolution
//!
//! Record types declare which of their fields are searchable, filterable or
//! relations to other types. Declarations are registered once into a
//! `SchemaBuilder` and built into an immutable `Schema`, which:
//!
//! - flattens inherited fields (a subtype sees its ancestors' fields, and may
//!   redeclare one to override it)
//! - records the ancestor and descendant chains of every type
//! - resolves field names, including dotted relation paths, for a purpose
//!
//! # Example
//!
//! ```
//! use sift_core::schema::{FieldPurpose, FieldSpec, ModelSpec, SchemaBuilder};
//!
//! let schema = SchemaBuilder::new()
//!     .model(ModelSpec::new("Book")
//!         .field(FieldSpec::search("title").filterable())
//!         .field(FieldSpec::filter("number_of_pages")))
//!     .model(ModelSpec::new("Novel").extends("Book")
//!         .field(FieldSpec::search("setting")))
//!     .build()
//!     .unwrap();
//!
//! assert!(schema.is_subtype("Novel", "Book"));
//! assert!(schema.resolve_one("Novel", "number_of_pages", FieldPurpose::Filter).is_ok());
//! assert!(schema.resolve_one("Book", "setting", FieldPurpose::Search).is_err());
//! ```

use crate::error::{Error, FieldError, FieldErrorReason, Result};
use crate::record::Record;
use crate::value::Value;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::Arc;

/// Function deriving a searchable value from a record
pub type ComputedFn = Arc<dyn Fn(&Record) -> Option<Value> + Send + Sync>;

// ============================================================================
// FieldPurpose
// ============================================================================

/// What a field is being resolved for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldPurpose {
    /// Text matching; requires `searchable`
    Search,
    /// Record set predicates; requires `filterable`
    Filter,
    /// Result ordering; requires `filterable` on a non-relation field
    Order,
}

impl fmt::Display for FieldPurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FieldPurpose::Search => "search",
            FieldPurpose::Filter => "filter",
            FieldPurpose::Order => "order by",
        };
        f.write_str(s)
    }
}

// ============================================================================
// FieldSpec
// ============================================================================

/// Declaration of one field on a record type
#[derive(Clone)]
pub struct FieldSpec {
    name: String,
    searchable: bool,
    filterable: bool,
    boost: f32,
    related_model: Option<String>,
    computed: Option<ComputedFn>,
}

impl FieldSpec {
    fn new(name: impl Into<String>) -> Self {
        FieldSpec {
            name: name.into(),
            searchable: false,
            filterable: false,
            boost: 1.0,
            related_model: None,
            computed: None,
        }
    }

    /// Searchable stored field
    pub fn search(name: impl Into<String>) -> Self {
        FieldSpec::new(name).searchable()
    }

    /// Filterable stored field
    pub fn filter(name: impl Into<String>) -> Self {
        FieldSpec::new(name).filterable()
    }

    /// Relation to another record type
    ///
    /// Searchable by default: the related records' searchable fields are
    /// indexed under `name.field`.
    pub fn related(name: impl Into<String>, model: impl Into<String>) -> Self {
        let mut spec = FieldSpec::new(name).searchable();
        spec.related_model = Some(model.into());
        spec
    }

    /// Searchable value computed from the record
    pub fn computed<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&Record) -> Option<Value> + Send + Sync + 'static,
    {
        let mut spec = FieldSpec::new(name).searchable();
        spec.computed = Some(Arc::new(f));
        spec
    }

    /// Builder: mark searchable
    pub fn searchable(mut self) -> Self {
        self.searchable = true;
        self
    }

    /// Builder: mark filterable
    pub fn filterable(mut self) -> Self {
        self.filterable = true;
        self
    }

    /// Builder: set boost
    pub fn boost(mut self, boost: f32) -> Self {
        self.boost = boost;
        self
    }

    /// Builder: keep the relation for traversal only
    pub fn not_searchable(mut self) -> Self {
        self.searchable = false;
        self
    }

    /// Field name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether text queries may match this field
    pub fn is_searchable(&self) -> bool {
        self.searchable
    }

    /// Whether record set predicates may use this field
    pub fn is_filterable(&self) -> bool {
        self.filterable
    }

    /// Score multiplier for matches in this field
    pub fn field_boost(&self) -> f32 {
        self.boost
    }

    /// Related type, if this field is a relation
    pub fn related_model(&self) -> Option<&str> {
        self.related_model.as_deref()
    }

    /// Whether this field is a relation
    pub fn is_relation(&self) -> bool {
        self.related_model.is_some()
    }

    /// Whether the value is computed rather than stored
    pub fn is_computed(&self) -> bool {
        self.computed.is_some()
    }

    /// Read this field's value from a record
    ///
    /// Computed fields call their function; stored fields read the record.
    /// Relations have no scalar value and return `Null`.
    pub fn value_of(&self, record: &Record) -> Value {
        match &self.computed {
            Some(f) => f(record).unwrap_or(Value::Null),
            None => record.get(&self.name).cloned().unwrap_or(Value::Null),
        }
    }
}

impl fmt::Debug for FieldSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldSpec")
            .field("name", &self.name)
            .field("searchable", &self.searchable)
            .field("filterable", &self.filterable)
            .field("boost", &self.boost)
            .field("related_model", &self.related_model)
            .field("computed", &self.computed.is_some())
            .finish()
    }
}

// ============================================================================
// ModelSpec
// ============================================================================

/// Declaration of a record type
#[derive(Debug, Clone)]
pub struct ModelSpec {
    name: String,
    parent: Option<String>,
    fields: Vec<FieldSpec>,
}

impl ModelSpec {
    /// Create a new type declaration with no fields
    pub fn new(name: impl Into<String>) -> Self {
        ModelSpec {
            name: name.into(),
            parent: None,
            fields: Vec::new(),
        }
    }

    /// Builder: declare the parent type
    pub fn extends(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// Builder: add a field
    pub fn field(mut self, field: FieldSpec) -> Self {
        self.fields.push(field);
        self
    }

    /// Type name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parent type name
    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    /// Fields declared directly on this type
    pub fn own_fields(&self) -> &[FieldSpec] {
        &self.fields
    }
}

// ============================================================================
// ResolvedField
// ============================================================================

/// A field name resolved against a schema
#[derive(Debug, Clone)]
pub struct ResolvedField {
    /// The path as requested (`a.b.c`)
    pub path: String,
    /// Relation fields traversed before the final field, with the model each
    /// hop was resolved on
    pub hops: Vec<(String, FieldSpec)>,
    /// Model declaring the final field
    pub model: String,
    /// The final field
    pub field: FieldSpec,
}

// ============================================================================
// Schema
// ============================================================================

#[derive(Debug)]
struct ModelEntry {
    spec: ModelSpec,
    /// Parent first, root last
    ancestors: Vec<String>,
    /// Transitive subtypes in registration order
    descendants: Vec<String>,
    /// Effective fields: inherited first, overrides replace in place
    fields: Vec<FieldSpec>,
}

/// Builder collecting type declarations
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    models: Vec<ModelSpec>,
}

impl SchemaBuilder {
    /// Create an empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: register a type
    pub fn model(mut self, spec: ModelSpec) -> Self {
        self.models.push(spec);
        self
    }

    /// Validate declarations and build the field tables
    ///
    /// # Errors
    ///
    /// Returns `Error::Schema` for duplicate types, unknown parents,
    /// inheritance cycles and relations to undeclared types.
    pub fn build(self) -> Result<Schema> {
        let mut order = Vec::with_capacity(self.models.len());
        let mut specs: BTreeMap<String, ModelSpec> = BTreeMap::new();
        for spec in self.models {
            if specs.contains_key(spec.name()) {
                return Err(Error::Schema(format!("model '{}' declared twice", spec.name())));
            }
            order.push(spec.name().to_string());
            specs.insert(spec.name().to_string(), spec);
        }

        let mut ancestors_of: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for name in &order {
            let mut chain = Vec::new();
            let mut seen = HashSet::new();
            seen.insert(name.clone());
            let mut current = specs[name].parent().map(str::to_string);
            while let Some(parent) = current {
                let Some(parent_spec) = specs.get(&parent) else {
                    return Err(Error::Schema(format!(
                        "model '{}' extends undeclared model '{}'",
                        name, parent
                    )));
                };
                if !seen.insert(parent.clone()) {
                    return Err(Error::Schema(format!(
                        "inheritance cycle through model '{}'",
                        name
                    )));
                }
                current = parent_spec.parent().map(str::to_string);
                chain.push(parent);
            }
            ancestors_of.insert(name.clone(), chain);
        }

        for spec in specs.values() {
            for field in spec.own_fields() {
                if let Some(related) = field.related_model() {
                    if !specs.contains_key(related) {
                        return Err(Error::Schema(format!(
                            "field '{}.{}' relates to undeclared model '{}'",
                            spec.name(),
                            field.name(),
                            related
                        )));
                    }
                }
            }
        }

        let mut models = BTreeMap::new();
        for name in &order {
            let ancestors = ancestors_of[name].clone();

            let mut fields: Vec<FieldSpec> = Vec::new();
            for model in ancestors.iter().rev().chain(std::iter::once(name)) {
                for field in specs[model].own_fields() {
                    match fields.iter_mut().find(|f| f.name() == field.name()) {
                        Some(existing) => *existing = field.clone(),
                        None => fields.push(field.clone()),
                    }
                }
            }

            let descendants = order
                .iter()
                .filter(|other| ancestors_of[*other].contains(name))
                .cloned()
                .collect();

            models.insert(
                name.clone(),
                ModelEntry {
                    spec: specs[name].clone(),
                    ancestors,
                    descendants,
                    fields,
                },
            );
        }

        Ok(Schema { order, models })
    }
}

/// Immutable table of record types and their effective fields
#[derive(Debug)]
pub struct Schema {
    order: Vec<String>,
    models: BTreeMap<String, ModelEntry>,
}

impl Schema {
    fn entry(&self, model: &str) -> Result<&ModelEntry> {
        self.models
            .get(model)
            .ok_or_else(|| Error::UnknownModel(model.to_string()))
    }

    /// Check if a type is declared
    pub fn contains(&self, model: &str) -> bool {
        self.models.contains_key(model)
    }

    /// Type names in registration order
    pub fn models(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Declaration of a type
    pub fn model(&self, model: &str) -> Result<&ModelSpec> {
        Ok(&self.entry(model)?.spec)
    }

    /// Effective fields of a type, including inherited ones
    pub fn fields(&self, model: &str) -> Result<&[FieldSpec]> {
        Ok(&self.entry(model)?.fields)
    }

    /// Effective field by name
    pub fn field(&self, model: &str, name: &str) -> Option<&FieldSpec> {
        self.models
            .get(model)
            .and_then(|e| e.fields.iter().find(|f| f.name() == name))
    }

    /// Topmost ancestor of a type (the type itself if it has no parent)
    pub fn root_of<'a>(&'a self, model: &'a str) -> Result<&'a str> {
        let entry = self.entry(model)?;
        Ok(entry.ancestors.last().map(String::as_str).unwrap_or(model))
    }

    /// Ancestors of a type, parent first
    pub fn ancestors(&self, model: &str) -> Result<&[String]> {
        Ok(&self.entry(model)?.ancestors)
    }

    /// Transitive subtypes of a type
    pub fn subtypes(&self, model: &str) -> Result<&[String]> {
        Ok(&self.entry(model)?.descendants)
    }

    /// Check if `model` is `ancestor` or one of its subtypes
    pub fn is_subtype(&self, model: &str, ancestor: &str) -> bool {
        model == ancestor
            || self
                .models
                .get(model)
                .is_some_and(|e| e.ancestors.iter().any(|a| a == ancestor))
    }

    /// Check if a type declares (or inherits) a searchable field
    ///
    /// Filterable fields alone do not make a type indexed.
    pub fn is_indexed(&self, model: &str) -> bool {
        self.models
            .get(model)
            .is_some_and(|e| e.fields.iter().any(FieldSpec::is_searchable))
    }

    /// Check if a type or any of its subtypes is indexed
    pub fn has_indexed_family(&self, model: &str) -> bool {
        self.is_indexed(model)
            || self
                .models
                .get(model)
                .is_some_and(|e| e.descendants.iter().any(|d| self.is_indexed(d)))
    }

    /// Searchable effective fields of a type
    pub fn searchable_fields(&self, model: &str) -> Result<Vec<&FieldSpec>> {
        Ok(self
            .fields(model)?
            .iter()
            .filter(|f| f.is_searchable())
            .collect())
    }

    /// Resolve several field names, failing on the first that does not resolve
    ///
    /// # Errors
    ///
    /// Returns `Error::UnknownModel` if the type is undeclared, otherwise
    /// `Error::Field` naming the first failing field.
    pub fn resolve<S: AsRef<str>>(
        &self,
        model: &str,
        names: &[S],
        purpose: FieldPurpose,
    ) -> Result<Vec<ResolvedField>> {
        names
            .iter()
            .map(|name| self.resolve_one(model, name.as_ref(), purpose))
            .collect()
    }

    /// Resolve one (possibly dotted) field name for a purpose
    ///
    /// Every segment but the last must be a relation; the last segment is
    /// looked up on the related type's own fields and must satisfy `purpose`.
    pub fn resolve_one(&self, model: &str, path: &str, purpose: FieldPurpose) -> Result<ResolvedField> {
        self.entry(model)?;
        let fail = |reason| Error::from(FieldError::new(path, model, purpose, reason));

        let segments: Vec<&str> = path.split('.').collect();
        let (last, hops_path) = match segments.split_last() {
            Some(split) => split,
            None => return Err(fail(FieldErrorReason::Unknown)),
        };

        let mut current = model.to_string();
        let mut hops = Vec::with_capacity(hops_path.len());
        for segment in hops_path {
            let field = self
                .field(&current, segment)
                .ok_or_else(|| fail(FieldErrorReason::Unknown))?;
            let related = field
                .related_model()
                .ok_or_else(|| fail(FieldErrorReason::NotARelation))?
                .to_string();
            hops.push((current.clone(), field.clone()));
            current = related;
        }

        let field = self
            .field(&current, last)
            .ok_or_else(|| fail(FieldErrorReason::Unknown))?;
        match purpose {
            FieldPurpose::Search if !field.is_searchable() => {
                return Err(fail(FieldErrorReason::NotSearchable))
            }
            FieldPurpose::Filter if !field.is_filterable() => {
                return Err(fail(FieldErrorReason::NotFilterable))
            }
            FieldPurpose::Order if !field.is_filterable() || field.is_relation() => {
                return Err(fail(FieldErrorReason::NotOrderable))
            }
            _ => {}
        }

        Ok(ResolvedField {
            path: path.to_string(),
            hops,
            model: current,
            field: field.clone(),
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
