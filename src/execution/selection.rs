//! Operation parsing and field collection
//!
//! The query document is parsed once into an owned [`Operation`]: variables
//! are substituted, `@skip`/`@include` are applied and fragment spreads are
//! expanded. Type conditions stay in the tree and are matched against the
//! concrete type when fields are collected.

use crate::core::error::ExecutionError;
use crate::schema::executable::ExecutableSchema;
use graphql_parser::query::{
    Definition, Directive as AstDirective, FragmentDefinition, OperationDefinition,
    Selection, SelectionSet, TypeCondition, Value as GqlValue, VariableDefinition, parse_query,
};
use graphql_parser::query::Type as AstType;
use indexmap::IndexMap;
use serde_json::{Map, Value};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Query,
    Mutation,
}

/// A parsed operation ready for planning and execution
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    pub kind: OperationKind,
    pub name: Option<String>,
    pub selection: Vec<SelectionItem>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SelectionItem {
    Field(FieldSelection),
    /// Inline fragment or expanded fragment spread
    Fragment(FragmentSelection),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldSelection {
    pub name: String,
    pub alias: Option<String>,
    pub arguments: IndexMap<String, Value>,
    pub selection: Vec<SelectionItem>,
}

impl FieldSelection {
    /// Key of the field in the response
    pub fn response_key(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FragmentSelection {
    pub type_condition: Option<String>,
    pub selection: Vec<SelectionItem>,
}

/// Parse a query document and select the operation to run
pub fn parse_operation(
    query: &str,
    operation_name: Option<&str>,
    variables: &Map<String, Value>,
) -> Result<Operation, ExecutionError> {
    let document = parse_query::<String>(query).map_err(|e| ExecutionError::Parse {
        message: e.to_string(),
    })?;

    let mut fragments = HashMap::new();
    let mut operations = Vec::new();
    for definition in &document.definitions {
        match definition {
            Definition::Fragment(fragment) => {
                fragments.insert(fragment.name.clone(), fragment);
            }
            Definition::Operation(operation) => operations.push(operation),
        }
    }

    let operation = match operation_name {
        Some(name) => operations
            .into_iter()
            .find(|op| operation_name_of(op) == Some(name))
            .ok_or_else(|| ExecutionError::UnknownOperation {
                name: name.to_string(),
            })?,
        None => match operations.as_slice() {
            [] => return Err(ExecutionError::NoOperation),
            [single] => *single,
            _ => {
                return Err(ExecutionError::UnknownOperation {
                    name: "<anonymous>".to_string(),
                });
            }
        },
    };

    let (kind, definitions, selection_set) = match operation {
        OperationDefinition::SelectionSet(set) => (OperationKind::Query, &[][..], set),
        OperationDefinition::Query(q) => {
            (OperationKind::Query, q.variable_definitions.as_slice(), &q.selection_set)
        }
        OperationDefinition::Mutation(m) => (
            OperationKind::Mutation,
            m.variable_definitions.as_slice(),
            &m.selection_set,
        ),
        OperationDefinition::Subscription(_) => {
            return Err(ExecutionError::UnsupportedOperation {
                kind: "Subscription".to_string(),
            });
        }
    };

    let lowering = Lowering {
        variables: bind_variables(definitions, variables)?,
        fragments,
    };
    let selection = lowering.selection_set(selection_set, &mut Vec::new())?;

    Ok(Operation {
        kind,
        name: operation_name_of(operation).map(str::to_string),
        selection,
    })
}

fn operation_name_of<'a>(operation: &'a OperationDefinition<'_, String>) -> Option<&'a str> {
    match operation {
        OperationDefinition::SelectionSet(_) => None,
        OperationDefinition::Query(q) => q.name.as_deref(),
        OperationDefinition::Mutation(m) => m.name.as_deref(),
        OperationDefinition::Subscription(s) => s.name.as_deref(),
    }
}

/// Provided variables, completed with defaults
fn bind_variables(
    definitions: &[VariableDefinition<'_, String>],
    provided: &Map<String, Value>,
) -> Result<HashMap<String, Value>, ExecutionError> {
    let mut bound = HashMap::new();
    for definition in definitions {
        let value = match provided.get(&definition.name) {
            Some(value) => value.clone(),
            None => match &definition.default_value {
                Some(default) => const_to_json(default),
                None if matches!(definition.var_type, AstType::NonNullType(_)) => {
                    return Err(ExecutionError::MissingVariable {
                        name: definition.name.clone(),
                    });
                }
                None => continue,
            },
        };
        bound.insert(definition.name.clone(), value);
    }
    Ok(bound)
}

fn const_to_json(value: &GqlValue<'_, String>) -> Value {
    value_to_json(value, &HashMap::new())
}

fn value_to_json(value: &GqlValue<'_, String>, variables: &HashMap<String, Value>) -> Value {
    match value {
        GqlValue::Variable(name) => variables.get(name).cloned().unwrap_or(Value::Null),
        GqlValue::Null => Value::Null,
        GqlValue::Int(i) => i.as_i64().map(Value::from).unwrap_or(Value::Null),
        GqlValue::Float(f) => serde_json::Number::from_f64(*f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        GqlValue::String(s) => Value::String(s.clone()),
        GqlValue::Boolean(b) => Value::Bool(*b),
        GqlValue::Enum(e) => Value::String(e.clone()),
        GqlValue::List(items) => {
            Value::Array(items.iter().map(|v| value_to_json(v, variables)).collect())
        }
        GqlValue::Object(fields) => Value::Object(
            fields
                .iter()
                .map(|(k, v)| (k.clone(), value_to_json(v, variables)))
                .collect(),
        ),
    }
}

struct Lowering<'d, 'a> {
    variables: HashMap<String, Value>,
    fragments: HashMap<String, &'d FragmentDefinition<'a, String>>,
}

impl<'d, 'a> Lowering<'d, 'a> {
    fn selection_set(
        &self,
        set: &SelectionSet<'a, String>,
        spreading: &mut Vec<String>,
    ) -> Result<Vec<SelectionItem>, ExecutionError> {
        let mut items = Vec::with_capacity(set.items.len());

        for selection in &set.items {
            match selection {
                Selection::Field(field) => {
                    if !self.included(&field.directives) {
                        continue;
                    }
                    items.push(SelectionItem::Field(FieldSelection {
                        name: field.name.clone(),
                        alias: field.alias.clone(),
                        arguments: field
                            .arguments
                            .iter()
                            .filter(|(_, value)| self.bound(value))
                            .map(|(name, value)| (name.clone(), value_to_json(value, &self.variables)))
                            .collect(),
                        selection: self.selection_set(&field.selection_set, spreading)?,
                    }));
                }
                Selection::InlineFragment(fragment) => {
                    if !self.included(&fragment.directives) {
                        continue;
                    }
                    items.push(SelectionItem::Fragment(FragmentSelection {
                        type_condition: fragment.type_condition.as_ref().map(condition_name),
                        selection: self.selection_set(&fragment.selection_set, spreading)?,
                    }));
                }
                Selection::FragmentSpread(spread) => {
                    if !self.included(&spread.directives) {
                        continue;
                    }
                    let name = &spread.fragment_name;
                    if spreading.contains(name) {
                        return Err(ExecutionError::FragmentCycle { name: name.clone() });
                    }
                    let fragment = self.fragments.get(name).ok_or_else(|| {
                        ExecutionError::UnknownFragment { name: name.clone() }
                    })?;

                    spreading.push(name.clone());
                    let selection = self.selection_set(&fragment.selection_set, spreading)?;
                    spreading.pop();

                    items.push(SelectionItem::Fragment(FragmentSelection {
                        type_condition: Some(condition_name(&fragment.type_condition)),
                        selection,
                    }));
                }
            }
        }

        Ok(items)
    }

    /// An argument given as a variable that was neither provided nor defaulted is omitted
    fn bound(&self, value: &GqlValue<'a, String>) -> bool {
        match value {
            GqlValue::Variable(name) => self.variables.contains_key(name),
            _ => true,
        }
    }

    /// Apply `@skip(if:)` and `@include(if:)`
    fn included(&self, directives: &[AstDirective<'a, String>]) -> bool {
        directives.iter().all(|directive| {
            let condition = directive
                .arguments
                .iter()
                .find(|(name, _)| name == "if")
                .map(|(_, value)| value_to_json(value, &self.variables))
                .and_then(|value| value.as_bool());
            match (directive.name.as_str(), condition) {
                ("skip", Some(true)) => false,
                ("include", Some(false)) => false,
                _ => true,
            }
        })
    }
}

fn condition_name(condition: &TypeCondition<'_, String>) -> String {
    match condition {
        TypeCondition::On(name) => name.clone(),
    }
}

/// Fields selected on a concrete type, merged by response key
///
/// A fragment applies when it has no type condition, when the condition is
/// the concrete type, or when the concrete type is a possible type of it.
pub fn collect_fields(
    schema: &ExecutableSchema,
    items: &[SelectionItem],
    concrete_type: &str,
) -> IndexMap<String, FieldSelection> {
    let mut fields: IndexMap<String, FieldSelection> = IndexMap::new();
    collect_into(schema, items, concrete_type, &mut fields);
    fields
}

fn collect_into(
    schema: &ExecutableSchema,
    items: &[SelectionItem],
    concrete_type: &str,
    fields: &mut IndexMap<String, FieldSelection>,
) {
    for item in items {
        match item {
            SelectionItem::Field(field) => match fields.get_mut(field.response_key()) {
                Some(existing) => existing.selection.extend(field.selection.iter().cloned()),
                None => {
                    fields.insert(field.response_key().to_string(), field.clone());
                }
            },
            SelectionItem::Fragment(fragment) => {
                let applies = match &fragment.type_condition {
                    None => true,
                    Some(condition) => {
                        condition == concrete_type
                            || schema
                                .possible_types(condition)
                                .iter()
                                .any(|t| t == concrete_type)
                    }
                };
                if applies {
                    collect_into(schema, &fragment.selection, concrete_type, fields);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::schema::SchemaBuilder;
    use serde_json::json;

    fn parse(query: &str) -> Result<Operation, ExecutionError> {
        parse_operation(query, None, &Map::new())
    }

    fn field(item: &SelectionItem) -> &FieldSelection {
        match item {
            SelectionItem::Field(field) => field,
            other => panic!("expected a field, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_aliases_and_arguments() {
        let op = parse(r#"{ first: user(id: 1, name: "a") { id } }"#).unwrap();
        assert_eq!(op.kind, OperationKind::Query);

        let user = field(&op.selection[0]);
        assert_eq!(user.name, "user");
        assert_eq!(user.response_key(), "first");
        assert_eq!(user.arguments["id"], json!(1));
        assert_eq!(user.arguments["name"], json!("a"));
    }

    #[test]
    fn test_variables_and_defaults() {
        let mut variables = Map::new();
        variables.insert("id".to_string(), json!("7"));

        let op = parse_operation(
            "query Q($id: ID!, $limit: Int = 5) { user(id: $id, limit: $limit) { id } }",
            None,
            &variables,
        )
        .unwrap();
        let user = field(&op.selection[0]);
        assert_eq!(user.arguments["id"], json!("7"));
        assert_eq!(user.arguments["limit"], json!(5));
        assert_eq!(op.name.as_deref(), Some("Q"));

        let err = parse("query Q($id: ID!) { user(id: $id) { id } }").unwrap_err();
        assert_eq!(err, ExecutionError::MissingVariable { name: "id".to_string() });
    }

    #[test]
    fn test_unbound_nullable_variable_omits_argument() {
        let op = parse("query Q($limit: Int, $name: String) { users(limit: $limit, name: $name, first: null) { id } }")
            .unwrap();
        let users = field(&op.selection[0]);

        assert!(!users.arguments.contains_key("limit"));
        assert!(!users.arguments.contains_key("name"));
        assert_eq!(users.arguments["first"], json!(null));

        let mut variables = Map::new();
        variables.insert("limit".to_string(), json!(null));
        let op = parse_operation("query Q($limit: Int) { users(limit: $limit) { id } }", None, &variables)
            .unwrap();
        assert_eq!(field(&op.selection[0]).arguments["limit"], json!(null));
    }

    #[test]
    fn test_skip_and_include() {
        let op = parse("{ a @skip(if: true) b @include(if: false) c @include(if: true) }").unwrap();
        assert_eq!(op.selection.len(), 1);
        assert_eq!(field(&op.selection[0]).name, "c");
    }

    #[test]
    fn test_fragment_errors() {
        assert_eq!(
            parse("{ ...Missing }").unwrap_err(),
            ExecutionError::UnknownFragment { name: "Missing".to_string() }
        );
        assert_eq!(
            parse("{ ...A } fragment A on Query { ...B } fragment B on Query { ...A }").unwrap_err(),
            ExecutionError::FragmentCycle { name: "A".to_string() }
        );
    }

    #[test]
    fn test_operation_selection() {
        let query = "query A { a } query B { b }";
        assert!(matches!(parse(query), Err(ExecutionError::UnknownOperation { .. })));

        let op = parse_operation(query, Some("B"), &Map::new()).unwrap();
        assert_eq!(field(&op.selection[0]).name, "b");

        assert!(matches!(
            parse("subscription { a }"),
            Err(ExecutionError::UnsupportedOperation { .. })
        ));
        assert!(matches!(parse("{ a"), Err(ExecutionError::Parse { .. })));
    }

    #[test]
    fn test_collect_fields_matches_type_conditions() {
        let schema = SchemaBuilder::new(EngineConfig::default_config())
            .build_sdl(
                r#"
                type Query { content: [Content] }
                type Post { id: ID title: String }
                type Task { id: ID name: String }
                union Content = Post | Task
                "#,
            )
            .unwrap();

        let op = parse(
            "{ content { ... on Post { id title } ... on Task { name } ... on Content { id } } }",
        )
        .unwrap();
        let content = field(&op.selection[0]);

        let post: Vec<_> = collect_fields(&schema, &content.selection, "Post")
            .into_keys()
            .collect();
        assert_eq!(post, vec!["id", "title"]);

        let task: Vec<_> = collect_fields(&schema, &content.selection, "Task")
            .into_keys()
            .collect();
        assert_eq!(task, vec!["name", "id"]);
    }

    #[test]
    fn test_collect_fields_merges_sub_selections() {
        let schema = SchemaBuilder::new(EngineConfig::default_config())
            .build_sdl("type Query { user: User } type User { id: ID name: String }")
            .unwrap();

        let op = parse("{ user { id } user { name } }").unwrap();
        let fields = collect_fields(&schema, &op.selection, "Query");
        assert_eq!(fields.len(), 1);
        assert_eq!(fields["user"].selection.len(), 2);
    }
}
