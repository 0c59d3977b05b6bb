use serde::Serialize;

/// Column order of the product table, also the key set of every record.
pub const PRODUCT_FIELDS: [&str; 15] = [
    "title",
    "price",
    "product_url",
    "ean",
    "highlights",
    "main_image_urls",
    "description_images",
    "description_text_title",
    "description_text",
    "box_images",
    "box_descriptions",
    "questions",
    "answers",
    "closer_look_name",
    "closer_look_value",
];

/// What a field rule produces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Text(String),
    List(Vec<String>),
    /// Ordered name → value pairs.
    Map(Vec<(String, String)>),
}

impl Value {
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Text(_) => "text",
            Value::List(_) => "list",
            Value::Map(_) => "mapping",
        }
    }

    /// Cell form: text as-is, lists and mappings as JSON.
    pub fn to_cell(&self) -> String {
        match self {
            Value::Text(s) => s.clone(),
            Value::List(_) | Value::Map(_) => serde_json::to_string(self).unwrap_or_default(),
        }
    }
}

/// One scraped page: every schema field, present or absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    fields: Vec<(&'static str, Option<Value>)>,
}

impl Record {
    pub fn empty(schema: &[&'static str]) -> Self {
        Self {
            fields: schema.iter().map(|name| (*name, None)).collect(),
        }
    }

    /// Sets a schema field. Returns false when `name` is not in the schema.
    pub(crate) fn set(&mut self, name: &str, value: Value) -> bool {
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => {
                *slot = Some(value);
                true
            }
            None => false,
        }
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.iter().any(|(n, _)| *n == name)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(n, _)| *n == name)
            .and_then(|(_, v)| v.as_ref())
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().map(|(n, _)| *n)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, Option<&Value>)> {
        self.fields.iter().map(|(n, v)| (*n, v.as_ref()))
    }

    pub fn present(&self) -> usize {
        self.fields.iter().filter(|(_, v)| v.is_some()).count()
    }

    /// One cell per field; absent fields are empty.
    pub fn to_cells(&self) -> Vec<String> {
        self.fields
            .iter()
            .map(|(_, v)| v.as_ref().map(Value::to_cell).unwrap_or_default())
            .collect()
    }
}
