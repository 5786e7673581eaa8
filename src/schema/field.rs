//! Field declarations.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// The structures a field value is indexed into.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct TypeFlags: u32 {
        /// Tokenized into the full-text dictionary.
        const FULLTEXT = 1 << 0;
        /// Parsed as a number into the numeric range tree.
        const NUMERIC = 1 << 1;
        /// Split into whole values in the field's tag index.
        const TAG = 1 << 2;
        /// Kept in the per-document sorting vector for random access.
        const SORTABLE = 1 << 3;
    }
}

impl TypeFlags {
    /// On a document value: index as every type the field declares.
    pub const DEFAULT: TypeFlags = TypeFlags::empty();

    /// The flags that route a value into an index structure.
    pub fn indexing(self) -> TypeFlags {
        self & (TypeFlags::FULLTEXT | TypeFlags::NUMERIC | TypeFlags::TAG)
    }
}

impl Default for TypeFlags {
    fn default() -> Self {
        TypeFlags::DEFAULT
    }
}

bitflags! {
    /// Per-field options.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct FieldOptions: u32 {
        /// Index phonetic keys next to full-text terms.
        const PHONETIC = 1 << 0;
        /// Keep tag values as written instead of lowercasing them.
        const CASE_SENSITIVE = 1 << 1;
    }
}

impl FieldOptions {
    /// No options.
    pub const NONE: FieldOptions = FieldOptions::empty();
}

impl Default for FieldOptions {
    fn default() -> Self {
        FieldOptions::NONE
    }
}

/// Default separator between tag values.
pub const DEFAULT_TAG_SEPARATOR: char = ',';

/// A declared field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    name: String,
    types: TypeFlags,
    options: FieldOptions,
    tag_separator: char,
    /// Position in the schema's field list.
    ordinal: usize,
    /// Bit of this field in posting field masks, assigned on first FULLTEXT.
    text_bit: Option<u8>,
}

impl FieldSpec {
    pub(crate) fn new(name: String, types: TypeFlags, options: FieldOptions, ordinal: usize) -> Self {
        FieldSpec {
            name,
            types,
            options,
            tag_separator: DEFAULT_TAG_SEPARATOR,
            ordinal,
            text_bit: None,
        }
    }

    /// The field name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared type flags.
    pub fn types(&self) -> TypeFlags {
        self.types
    }

    /// Declared options.
    pub fn options(&self) -> FieldOptions {
        self.options
    }

    /// Separator used to split tag values.
    pub fn tag_separator(&self) -> char {
        self.tag_separator
    }

    /// Position of the field in declaration order.
    pub fn ordinal(&self) -> usize {
        self.ordinal
    }

    /// Check whether the field declares all of the given types.
    pub fn has_type(&self, types: TypeFlags) -> bool {
        self.types.contains(types)
    }

    pub fn is_fulltext(&self) -> bool {
        self.types.contains(TypeFlags::FULLTEXT)
    }

    pub fn is_numeric(&self) -> bool {
        self.types.contains(TypeFlags::NUMERIC)
    }

    pub fn is_tag(&self) -> bool {
        self.types.contains(TypeFlags::TAG)
    }

    pub fn is_sortable(&self) -> bool {
        self.types.contains(TypeFlags::SORTABLE)
    }

    pub fn is_phonetic(&self) -> bool {
        self.is_fulltext() && self.options.contains(FieldOptions::PHONETIC)
    }

    pub fn is_case_sensitive(&self) -> bool {
        self.options.contains(FieldOptions::CASE_SENSITIVE)
    }

    /// The bit of this field in posting field masks (0 if not full-text).
    pub fn text_mask(&self) -> u128 {
        self.text_bit.map_or(0, |bit| 1u128 << bit)
    }

    pub(crate) fn text_bit(&self) -> Option<u8> {
        self.text_bit
    }

    pub(crate) fn set_text_bit(&mut self, bit: u8) {
        self.text_bit = Some(bit);
    }

    pub(crate) fn set_tag_separator(&mut self, separator: char) {
        self.tag_separator = separator;
    }

    pub(crate) fn grow(&mut self, types: TypeFlags, options: FieldOptions) {
        self.types |= types;
        self.options |= options;
    }
}
