//! Schema management for an index.

use ahash::AHashMap;
use log::debug;

use crate::error::{QuarryError, Result};
use crate::schema::field::{FieldOptions, FieldSpec, TypeFlags};

/// Maximum number of full-text fields, bounded by the posting field mask width.
pub const MAX_TEXT_FIELDS: usize = 128;

/// Outcome of declaring a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Declaration {
    /// A new field was added.
    Created,
    /// The field already covered the requested types and options.
    Unchanged,
    /// The field's type set or options grew.
    Widened,
}

/// The declared fields of one index.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    /// Fields in declaration order.
    fields: Vec<FieldSpec>,
    /// Map of field names to their ordinal.
    by_name: AHashMap<String, usize>,
    /// Number of full-text bits handed out.
    text_fields: usize,
}

impl Schema {
    /// Create an empty schema.
    pub fn new() -> Self {
        Schema::default()
    }

    /// Declare a field, or re-declare an existing one.
    ///
    /// Re-declaring with a subset of the existing types and options is a
    /// no-op. Re-declaring with a superset widens the field. Any other
    /// combination fails with [`QuarryError::DuplicateField`].
    pub fn declare(
        &mut self,
        name: &str,
        types: TypeFlags,
        options: FieldOptions,
    ) -> Result<(usize, Declaration)> {
        if name.is_empty() {
            return Err(QuarryError::invalid_argument("Field name cannot be empty"));
        }
        if types.indexing().is_empty() {
            return Err(QuarryError::invalid_argument(format!(
                "Field '{name}' must be declared with at least one indexing type"
            )));
        }

        if let Some(&ordinal) = self.by_name.get(name) {
            let existing = &self.fields[ordinal];
            let narrower =
                existing.types().contains(types) && existing.options().contains(options);
            let wider = types.contains(existing.types()) && options.contains(existing.options());

            if narrower {
                return Ok((ordinal, Declaration::Unchanged));
            }
            if !wider {
                return Err(QuarryError::duplicate_field(format!(
                    "Field '{name}' already exists as {:?} and cannot be redeclared as {:?}",
                    existing.types(),
                    types
                )));
            }

            let needs_text_bit =
                types.contains(TypeFlags::FULLTEXT) && existing.text_bit().is_none();
            let bit = if needs_text_bit {
                Some(self.allocate_text_bit(name)?)
            } else {
                None
            };
            let field = &mut self.fields[ordinal];
            field.grow(types, options);
            if let Some(bit) = bit {
                field.set_text_bit(bit);
            }
            debug!("Widened field '{name}' to {:?}", field.types());
            return Ok((ordinal, Declaration::Widened));
        }

        let ordinal = self.fields.len();
        let mut field = FieldSpec::new(name.to_string(), types, options, ordinal);
        if types.contains(TypeFlags::FULLTEXT) {
            field.set_text_bit(self.allocate_text_bit(name)?);
        }
        debug!("Declared field '{name}' as {types:?}");
        self.fields.push(field);
        self.by_name.insert(name.to_string(), ordinal);
        Ok((ordinal, Declaration::Created))
    }

    fn allocate_text_bit(&mut self, name: &str) -> Result<u8> {
        if self.text_fields >= MAX_TEXT_FIELDS {
            return Err(QuarryError::invalid_argument(format!(
                "Cannot declare '{name}': at most {MAX_TEXT_FIELDS} full-text fields are supported"
            )));
        }
        let bit = self.text_fields as u8;
        self.text_fields += 1;
        Ok(bit)
    }

    /// Set the tag separator of a declared field.
    pub fn set_tag_separator(&mut self, name: &str, separator: char) -> Result<()> {
        let ordinal = *self
            .by_name
            .get(name)
            .ok_or_else(|| QuarryError::unknown_field(name))?;
        self.fields[ordinal].set_tag_separator(separator);
        Ok(())
    }

    /// Get a field by name.
    pub fn get(&self, name: &str) -> Option<&FieldSpec> {
        self.by_name.get(name).map(|&ordinal| &self.fields[ordinal])
    }

    /// Get a field by name, failing with [`QuarryError::UnknownField`].
    pub fn require(&self, name: &str) -> Result<&FieldSpec> {
        self.get(name)
            .ok_or_else(|| QuarryError::unknown_field(name))
    }

    /// Get a field by ordinal.
    pub fn field(&self, ordinal: usize) -> Option<&FieldSpec> {
        self.fields.get(ordinal)
    }

    /// Check if a field exists.
    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// All fields in declaration order.
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Union of the masks of every full-text field.
    pub fn text_mask(&self) -> u128 {
        self.fields.iter().fold(0, |mask, f| mask | f.text_mask())
    }

    /// Union of the masks of full-text fields with phonetic matching.
    pub fn phonetic_mask(&self) -> u128 {
        self.fields
            .iter()
            .filter(|f| f.is_phonetic())
            .fold(0, |mask, f| mask | f.text_mask())
    }
}
