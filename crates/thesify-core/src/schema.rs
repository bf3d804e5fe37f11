//! Function-call schemas handed to the LLM as the only allowed reply shape.
//!
//! Schemas are built as typed [`SchemaNode`] trees rather than ad hoc JSON so
//! that closure (no undeclared properties, everything required) can be checked
//! locally with [`FunctionSchema::is_closed`] before a request goes out.

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

use crate::catalog::{Catalog, Category};

/// Name of the single function the model is forced to call.
pub const FUNCTION_NAME: &str = "extract_investment_categories_from_thesis";

/// Top-level field holding the classification in every reply.
pub const CATEGORIES_FIELD: &str = "categories";

const ACCURACY_DESCRIPTION: &str = "Given a thesis, identify whether each investment approach \
in the list applies. Return true or false, plus a justification.";

const LABEL_SET_DESCRIPTION: &str = "Given a thesis, identify which of the provided categories \
are present. Return an array of the categories present, use the exact labels of the categories given.";

/// A function definition in the shape chat-completion APIs expect under
/// `tools[].function`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionSchema {
    pub name: String,
    pub description: String,
    pub strict: bool,
    pub parameters: SchemaNode,
}

/// A JSON-schema node restricted to the constructs the classifiers use.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SchemaNode {
    Object {
        #[serde(skip_serializing_if = "Option::is_none")]
        description: Option<String>,
        #[serde(serialize_with = "ordered_properties")]
        properties: Vec<(String, SchemaNode)>,
        required: Vec<String>,
        #[serde(rename = "additionalProperties")]
        additional_properties: bool,
    },
    Array {
        #[serde(skip_serializing_if = "Option::is_none")]
        description: Option<String>,
        items: Box<SchemaNode>,
    },
    Boolean {
        #[serde(skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
    String {
        #[serde(skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
}

impl SchemaNode {
    /// A closed object: every property required, nothing else allowed.
    pub fn closed_object(description: Option<String>, properties: Vec<(String, SchemaNode)>) -> Self {
        let required = properties.iter().map(|(name, _)| name.clone()).collect();
        Self::Object {
            description,
            properties,
            required,
            additional_properties: false,
        }
    }

    /// Declared property names of an object node, in declaration order.
    pub fn property_names(&self) -> Vec<&str> {
        match self {
            Self::Object { properties, .. } => properties.iter().map(|(n, _)| n.as_str()).collect(),
            _ => Vec::new(),
        }
    }

    /// Look up a direct child property of an object node.
    pub fn property(&self, name: &str) -> Option<&SchemaNode> {
        match self {
            Self::Object { properties, .. } => {
                properties.iter().find(|(n, _)| n == name).map(|(_, node)| node)
            }
            _ => None,
        }
    }

    fn is_closed(&self) -> bool {
        match self {
            Self::Object {
                properties,
                required,
                additional_properties,
                ..
            } => {
                !additional_properties
                    && required.len() == properties.len()
                    && properties.iter().zip(required).all(|((n, _), r)| n == r)
                    && properties.iter().all(|(_, node)| node.is_closed())
            }
            Self::Array { items, .. } => items.is_closed(),
            Self::Boolean { .. } | Self::String { .. } => true,
        }
    }
}

impl FunctionSchema {
    /// True when every object in the tree forbids additional properties and
    /// requires exactly the properties it declares.
    pub fn is_closed(&self) -> bool {
        self.parameters.is_closed()
    }

    /// The `categories` node under the parameters object.
    pub fn categories_node(&self) -> Option<&SchemaNode> {
        self.parameters.property(CATEGORIES_FIELD)
    }
}

/// Schema for one accuracy-mode call: a `{value, justification}` pair for
/// each category in `batch`, all required.
pub fn accuracy_schema(batch: &[Category]) -> FunctionSchema {
    let properties = batch
        .iter()
        .map(|c| (c.label.clone(), verdict_node(c)))
        .collect();

    let categories = SchemaNode::closed_object(
        Some(
            "A dictionary of categories with booleans representing their presence in the input text"
                .to_string(),
        ),
        properties,
    );

    FunctionSchema {
        name: FUNCTION_NAME.to_string(),
        description: ACCURACY_DESCRIPTION.to_string(),
        strict: true,
        parameters: SchemaNode::closed_object(None, vec![(CATEGORIES_FIELD.to_string(), categories)]),
    }
}

/// Schema for a cost-mode call: a single array of category labels.
pub fn label_set_schema() -> FunctionSchema {
    let categories = SchemaNode::Array {
        description: Some("An array of categories present in the thesis.".to_string()),
        items: Box::new(SchemaNode::String { description: None }),
    };

    FunctionSchema {
        name: FUNCTION_NAME.to_string(),
        description: LABEL_SET_DESCRIPTION.to_string(),
        strict: true,
        parameters: SchemaNode::closed_object(None, vec![(CATEGORIES_FIELD.to_string(), categories)]),
    }
}

/// Serialize the whole catalog as a JSON array of `{label, description}`.
///
/// Used to embed the taxonomy in the cost-mode system prompt so that every
/// category reaches the model verbatim.
pub fn catalog_json(catalog: &Catalog) -> serde_json::Result<String> {
    serde_json::to_string(catalog.categories())
}

fn verdict_node(category: &Category) -> SchemaNode {
    let label = &category.label;
    SchemaNode::closed_object(
        None,
        vec![
            (
                "value".to_string(),
                SchemaNode::Boolean {
                    description: Some(format!(
                        "Indicates if {label} approach is present in the thesis, described as: {}",
                        category.description
                    )),
                },
            ),
            (
                "justification".to_string(),
                SchemaNode::String {
                    description: Some(format!(
                        "A brief explanation of why the {label} category was assigned true or false, \
                         using quotes or references to the thesis text."
                    )),
                },
            ),
        ],
    )
}

fn ordered_properties<S: Serializer>(
    properties: &[(String, SchemaNode)],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(properties.len()))?;
    for (name, node) in properties {
        map.serialize_entry(name, node)?;
    }
    map.end()
}
