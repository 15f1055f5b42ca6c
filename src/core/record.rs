//! Model records and their loaded relations
//!
//! A [`Record`] is one row of a model together with any relations the
//! dispatcher attached to it. Field resolvers read relations from here and
//! never go back to the store.

use indexmap::IndexMap;
use serde_json::Value;

/// Loaded data of one relation
#[derive(Debug, Clone, PartialEq)]
pub enum Relation {
    /// Singular relation (belongs-to, has-one, morph-to); `None` when absent
    One(Option<Box<Record>>),
    /// Collection relation (has-many, morph-many)
    Many(Vec<Record>),
}

impl Relation {
    /// Mutable access to every loaded related record
    pub fn records_mut(&mut self) -> Vec<&mut Record> {
        match self {
            Relation::One(Some(record)) => vec![record.as_mut()],
            Relation::One(None) => Vec::new(),
            Relation::Many(records) => records.iter_mut().collect(),
        }
    }

    pub fn records(&self) -> Vec<&Record> {
        match self {
            Relation::One(Some(record)) => vec![record.as_ref()],
            Relation::One(None) => Vec::new(),
            Relation::Many(records) => records.iter().collect(),
        }
    }
}

/// A model instance
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    model: String,
    attributes: IndexMap<String, Value>,
    relations: IndexMap<String, Relation>,
}

impl Record {
    /// Create an empty record of the given model
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            attributes: IndexMap::new(),
            relations: IndexMap::new(),
        }
    }

    /// Create a record from a JSON object, non-object values yield no attributes
    pub fn from_json(model: impl Into<String>, value: Value) -> Self {
        let mut record = Self::new(model);
        if let Value::Object(map) = value {
            record.attributes = map.into_iter().collect();
        }
        record
    }

    /// Builder-style attribute setter
    pub fn with(mut self, attribute: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(attribute.into(), value.into());
        self
    }

    /// The model (and default concrete GraphQL type) of this record
    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    pub fn attributes(&self) -> &IndexMap<String, Value> {
        &self.attributes
    }

    pub fn set_attribute(&mut self, name: impl Into<String>, value: Value) {
        self.attributes.insert(name.into(), value);
    }

    /// The `id` attribute as a comparable key
    pub fn key(&self) -> Option<String> {
        self.attribute_key("id")
    }

    /// An attribute as a comparable key (strings and numbers compare by text)
    pub fn attribute_key(&self, name: &str) -> Option<String> {
        self.attributes.get(name).and_then(value_key)
    }

    pub fn relation(&self, name: &str) -> Option<&Relation> {
        self.relations.get(name)
    }

    pub fn relation_mut(&mut self, name: &str) -> Option<&mut Relation> {
        self.relations.get_mut(name)
    }

    pub fn set_relation(&mut self, name: impl Into<String>, relation: Relation) {
        self.relations.insert(name.into(), relation);
    }

    /// Whether a (possibly dotted) relation path is loaded on this record
    ///
    /// Every record along the path must have the next segment loaded.
    pub fn relation_loaded(&self, path: &str) -> bool {
        let mut segments = path.split('.');
        let Some(first) = segments.next() else {
            return false;
        };
        let rest: Vec<&str> = segments.collect();

        match self.relations.get(first) {
            None => false,
            Some(_) if rest.is_empty() => true,
            Some(relation) => {
                let rest = rest.join(".");
                relation
                    .records()
                    .iter()
                    .all(|related| related.relation_loaded(&rest))
            }
        }
    }

    /// Plain JSON view of the attributes and loaded relations
    pub fn to_json(&self) -> Value {
        let mut map: serde_json::Map<String, Value> = self
            .attributes
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        for (name, relation) in &self.relations {
            let value = match relation {
                Relation::One(Some(record)) => record.to_json(),
                Relation::One(None) => Value::Null,
                Relation::Many(records) => {
                    Value::Array(records.iter().map(Record::to_json).collect())
                }
            };
            map.insert(name.clone(), value);
        }
        Value::Object(map)
    }
}

/// Comparable text key of a JSON scalar
pub fn value_key(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn user_with_posts() -> Record {
        let mut post = Record::new("Post").with("id", 10);
        post.set_relation("comments", Relation::Many(vec![Record::new("Comment").with("id", 1)]));

        let mut user = Record::new("User").with("id", "1").with("name", "Ada");
        user.set_relation("posts", Relation::Many(vec![post, Record::new("Post").with("id", 11)]));
        user
    }

    #[test]
    fn test_keys_compare_numbers_and_strings() {
        let a = Record::new("User").with("id", 1);
        let b = Record::new("User").with("id", "1");
        assert_eq!(a.key(), b.key());
        assert_eq!(Record::new("User").key(), None);
    }

    #[test]
    fn test_relation_loaded_follows_dotted_path() {
        let user = user_with_posts();
        assert!(user.relation_loaded("posts"));
        assert!(!user.relation_loaded("tasks"));
        // second post has no comments loaded
        assert!(!user.relation_loaded("posts.comments"));
    }

    #[test]
    fn test_relation_loaded_empty_relation() {
        let mut user = Record::new("User");
        user.set_relation("posts", Relation::Many(Vec::new()));
        assert!(user.relation_loaded("posts"));
        assert!(user.relation_loaded("posts.comments"));
    }

    #[test]
    fn test_to_json_includes_relations() {
        let user = user_with_posts();
        let value = user.to_json();
        assert_eq!(value["name"], json!("Ada"));
        assert_eq!(value["posts"][0]["comments"][0]["id"], json!(1));
    }

    #[test]
    fn test_from_json() {
        let record = Record::from_json("Task", json!({"id": 3, "title": "Write"}));
        assert_eq!(record.model(), "Task");
        assert_eq!(record.attribute("title"), Some(&json!("Write")));
        assert_eq!(record.key(), Some("3".to_string()));
    }
}
