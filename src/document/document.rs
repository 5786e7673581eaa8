//! Document structure for ingestion.

use serde::{Deserialize, Serialize};

use crate::document::field_value::FieldValue;
use crate::schema::TypeFlags;

/// One typed value of a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentField {
    /// Name of the declared field the value belongs to.
    pub name: String,
    /// The value.
    pub value: FieldValue,
    /// Structures to index the value into; [`TypeFlags::DEFAULT`] means all
    /// types declared on the field.
    pub types: TypeFlags,
}

/// A document represents a single item to be indexed.
///
/// Fields are kept in insertion order. The same name may appear more than
/// once, each value is indexed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    external_id: Vec<u8>,
    score: f64,
    payload: Option<Vec<u8>>,
    fields: Vec<DocumentField>,
}

impl Document {
    /// Create a new document with an external id, a default score and an
    /// optional payload.
    pub fn new<I: Into<Vec<u8>>>(external_id: I, score: f64, payload: Option<Vec<u8>>) -> Self {
        Document {
            external_id: external_id.into(),
            score,
            payload,
            fields: Vec::new(),
        }
    }

    /// Create a document with a score of 1.0 and no payload.
    pub fn simple<I: Into<Vec<u8>>>(external_id: I) -> Self {
        Document::new(external_id, 1.0, None)
    }

    /// Add a text value.
    pub fn add_text<S: Into<String>, T: Into<String>>(
        &mut self,
        name: S,
        text: T,
        types: TypeFlags,
    ) -> &mut Self {
        self.add_field(name, FieldValue::Text(text.into()), types)
    }

    /// Add a numeric value.
    pub fn add_number<S: Into<String>>(&mut self, name: S, number: f64, types: TypeFlags) -> &mut Self {
        self.add_field(name, FieldValue::Numeric(number), types)
    }

    /// Add a field value to the document.
    pub fn add_field<S: Into<String>>(
        &mut self,
        name: S,
        value: FieldValue,
        types: TypeFlags,
    ) -> &mut Self {
        self.fields.push(DocumentField {
            name: name.into(),
            value,
            types,
        });
        self
    }

    /// The caller supplied identifier.
    pub fn external_id(&self) -> &[u8] {
        &self.external_id
    }

    /// The default score.
    pub fn score(&self) -> f64 {
        self.score
    }

    /// The opaque payload.
    pub fn payload(&self) -> Option<&[u8]> {
        self.payload.as_deref()
    }

    /// Get all field values.
    pub fn fields(&self) -> &[DocumentField] {
        &self.fields
    }

    /// Get the first value of a field.
    pub fn get_field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.iter().find(|f| f.name == name).map(|f| &f.value)
    }

    /// Get the number of field values.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Check if the document has no field values.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Create a builder for constructing documents.
    pub fn builder<I: Into<Vec<u8>>>(external_id: I) -> DocumentBuilder {
        DocumentBuilder::new(external_id)
    }

    pub(crate) fn into_parts(self) -> (Vec<u8>, f64, Option<Vec<u8>>, Vec<DocumentField>) {
        (self.external_id, self.score, self.payload, self.fields)
    }
}

/// A builder for constructing documents in a fluent manner.
#[derive(Debug)]
pub struct DocumentBuilder {
    document: Document,
}

impl DocumentBuilder {
    /// Create a new document builder.
    pub fn new<I: Into<Vec<u8>>>(external_id: I) -> Self {
        DocumentBuilder {
            document: Document::simple(external_id),
        }
    }

    /// Set the default score.
    pub fn score(mut self, score: f64) -> Self {
        self.document.score = score;
        self
    }

    /// Set the payload.
    pub fn payload<P: Into<Vec<u8>>>(mut self, payload: P) -> Self {
        self.document.payload = Some(payload.into());
        self
    }

    /// Add a text value indexed as every declared type of the field.
    pub fn add_text<S: Into<String>, T: Into<String>>(mut self, name: S, value: T) -> Self {
        self.document.add_text(name, value, TypeFlags::DEFAULT);
        self
    }

    /// Add a numeric value indexed as every declared type of the field.
    pub fn add_number<S: Into<String>>(mut self, name: S, value: f64) -> Self {
        self.document.add_number(name, value, TypeFlags::DEFAULT);
        self
    }

    /// Add a value with explicit type flags.
    pub fn add_field<S: Into<String>>(mut self, name: S, value: FieldValue, types: TypeFlags) -> Self {
        self.document.add_field(name, value, types);
        self
    }

    /// Build the final document.
    pub fn build(self) -> Document {
        self.document
    }
}
