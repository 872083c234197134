//! Immutable document collections with identity-based set algebra.
//!
//! A [`DocumentCollection`] is a cheap-to-clone, shared list of documents.
//! Every operation returns a new collection and leaves its operands untouched,
//! so a pipeline can keep the collection it had before a stage and fall back
//! to it when the stage fails.
//!
//! ```
//! use litreview::{Document, DocumentCollection};
//!
//! let doc = |title: &str| Document { title: title.into(), ..Default::default() };
//! let a = DocumentCollection::from(vec![doc("One"), doc("Two")]);
//! let b = DocumentCollection::from(vec![doc("two"), doc("Three")]);
//!
//! assert_eq!(a.union(&b).len(), 3);
//! assert_eq!(a.difference(&b).len(), 1);
//! ```

use crate::identity::IdentityIndex;
use crate::{Document, PropertyValue};
use std::sync::Arc;
use thiserror::Error;

/// Error types for collection operations
#[derive(Debug, Error)]
pub enum CollectionError {
    #[error("Property '{name}' has {values} values for {documents} documents")]
    LengthMismatch {
        name: String,
        values: usize,
        documents: usize,
    },
}

/// An ordered, immutable set of documents.
#[derive(Debug, Clone, Default)]
pub struct DocumentCollection {
    documents: Arc<Vec<Document>>,
}

impl DocumentCollection {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Document> {
        self.documents.iter()
    }

    pub fn get(&self, index: usize) -> Option<&Document> {
        self.documents.get(index)
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    /// Ids of the members, in order.
    pub fn ids(&self) -> Vec<&str> {
        self.documents.iter().map(|d| d.id.as_str()).collect()
    }

    /// Whether both values share the same underlying storage.
    pub fn ptr_eq(&self, other: &DocumentCollection) -> bool {
        Arc::ptr_eq(&self.documents, &other.documents)
    }

    /// All members of `self` followed by the members of `other` that match
    /// no member of `self`.
    ///
    /// A member of `other` that matches a member of `self` is not added;
    /// instead it fills fields the kept member is missing.
    #[must_use]
    pub fn union(&self, other: &DocumentCollection) -> DocumentCollection {
        if other.is_empty() {
            return self.clone();
        }
        if self.is_empty() {
            return other.clone();
        }

        let index = IdentityIndex::build(self.iter());
        let mut merged: Vec<Document> = self.documents.as_ref().clone();

        for document in other.iter() {
            match index.find(&document.identity()) {
                Some(position) => merged[position].fill_missing_from(document),
                None => merged.push(document.clone()),
            }
        }

        merged.into()
    }

    /// Members of `self` that match no member of `other`.
    #[must_use]
    pub fn difference(&self, other: &DocumentCollection) -> DocumentCollection {
        if other.is_empty() {
            return self.clone();
        }

        let index = IdentityIndex::build(other.iter());
        self.filter(|document| index.find(&document.identity()).is_none())
    }

    /// Members for which `predicate` holds.
    #[must_use]
    pub fn filter<F>(&self, predicate: F) -> DocumentCollection
    where
        F: Fn(&Document) -> bool,
    {
        self.iter()
            .filter(|d| predicate(d))
            .cloned()
            .collect::<Vec<_>>()
            .into()
    }

    /// Attaches `values[i]` as property `name` of the i-th member.
    ///
    /// # Errors
    ///
    /// Returns `CollectionError::LengthMismatch` unless there is exactly one
    /// value per member.
    pub fn with_property<V>(
        &self,
        name: &str,
        values: impl IntoIterator<Item = V>,
    ) -> Result<DocumentCollection, CollectionError>
    where
        V: Into<PropertyValue>,
    {
        let values: Vec<PropertyValue> = values.into_iter().map(Into::into).collect();
        if values.len() != self.len() {
            return Err(CollectionError::LengthMismatch {
                name: name.to_string(),
                values: values.len(),
                documents: self.len(),
            });
        }

        let tagged: Vec<Document> = self
            .iter()
            .zip(values)
            .map(|(document, value)| {
                let mut document = document.clone();
                document.properties.insert(name.to_string(), value);
                document
            })
            .collect();
        Ok(tagged.into())
    }
}

impl From<Vec<Document>> for DocumentCollection {
    fn from(documents: Vec<Document>) -> Self {
        Self {
            documents: Arc::new(documents),
        }
    }
}

impl FromIterator<Document> for DocumentCollection {
    fn from_iter<I: IntoIterator<Item = Document>>(iter: I) -> Self {
        iter.into_iter().collect::<Vec<_>>().into()
    }
}

impl<'a> IntoIterator for &'a DocumentCollection {
    type Item = &'a Document;
    type IntoIter = std::slice::Iter<'a, Document>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
