//! Column-wise helpers over a batch of documents.
//!
//! Operators receive a batch as a `Vec<Document>`. [`Documents`] adds the
//! field accessors that read or write one path across the whole batch, the
//! accessors for chunk fields (arrays of nested documents) and the tag list
//! helpers.

use std::cmp::Ordering;

use crate::document::{Document, PATH_SEPARATOR};
use crate::error::{DocumentError, DocumentResult};
use crate::value::Value;

/// Batch operations on a slice of documents.
pub trait Documents {
    /// Reads `path` from every document, in batch order.
    fn get_field(&self, path: &str) -> Vec<Option<&Value>>;

    /// Writes the same value at `path` in every document.
    fn set_field(&mut self, path: &str, value: impl Into<Value>);

    /// Writes one value per document at `path`.
    ///
    /// Fails without writing anything if the number of values differs from
    /// the batch size.
    fn set_field_each<V: Into<Value>>(&mut self, path: &str, values: Vec<V>) -> DocumentResult<()>;

    /// Serializes the batch as a JSON array.
    fn to_json(&self) -> serde_json::Value;

    /// Reads `field` from each chunk stored under `chunk_field`, grouped per
    /// document. A document without chunks yields an empty group.
    fn get_chunks(&self, chunk_field: &str, field: &str) -> Vec<Vec<Option<&Value>>>;

    /// Like [`get_chunks`](Documents::get_chunks), flattened over the batch.
    fn get_chunks_as_flat(&self, chunk_field: &str, field: &str) -> Vec<Option<&Value>>;

    /// Writes one value per chunk, in the order of
    /// [`get_chunks_as_flat`](Documents::get_chunks_as_flat).
    ///
    /// Only existing chunks are written. Fails without writing anything if
    /// the number of values differs from the number of chunks, or if a chunk
    /// is not a map.
    fn set_chunks_from_flat<V: Into<Value>>(
        &mut self,
        chunk_field: &str,
        field: &str,
        values: Vec<V>,
    ) -> DocumentResult<()>;

    /// Appends a tag to the tag list at `field` in every document.
    ///
    /// A missing list is created.
    fn append_tag(&mut self, field: &str, tag: impl Into<Value>) -> DocumentResult<()>;

    /// Appends one tag per document to the tag list at `field`.
    fn append_tag_each<V: Into<Value>>(&mut self, field: &str, tags: Vec<V>) -> DocumentResult<()>;

    /// Removes every tag whose `key` equals `value`, where `path` is
    /// `<tag list>.<key>`. The tag list is written back even when empty.
    fn remove_tag(&mut self, path: &str, value: impl Into<Value>) -> DocumentResult<()>;

    /// Sorts each tag list by a key, where `path` is `<tag list>.<key>`.
    ///
    /// Numbers, text and booleans compare among themselves. Tags without the
    /// key sort last. Documents without the tag list are left alone.
    fn sort_tags(&mut self, path: &str, reverse: bool) -> DocumentResult<()>;
}

impl Documents for [Document] {
    fn get_field(&self, path: &str) -> Vec<Option<&Value>> {
        self.iter().map(|document| document.get(path)).collect()
    }

    fn set_field(&mut self, path: &str, value: impl Into<Value>) {
        let value = value.into();
        for document in self.iter_mut() {
            document.set(path, value.clone());
        }
    }

    fn set_field_each<V: Into<Value>>(&mut self, path: &str, values: Vec<V>) -> DocumentResult<()> {
        check_length(self.len(), values.len())?;
        for (document, value) in self.iter_mut().zip(values) {
            document.set(path, value);
        }
        Ok(())
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Array(self.iter().map(Document::to_json).collect())
    }

    fn get_chunks(&self, chunk_field: &str, field: &str) -> Vec<Vec<Option<&Value>>> {
        self.iter()
            .map(|document| {
                chunks(document, chunk_field)
                    .iter()
                    .map(|chunk| value_at(chunk, field))
                    .collect()
            })
            .collect()
    }

    fn get_chunks_as_flat(&self, chunk_field: &str, field: &str) -> Vec<Option<&Value>> {
        self.get_chunks(chunk_field, field)
            .into_iter()
            .flatten()
            .collect()
    }

    fn set_chunks_from_flat<V: Into<Value>>(
        &mut self,
        chunk_field: &str,
        field: &str,
        values: Vec<V>,
    ) -> DocumentResult<()> {
        let mut total = 0;
        for document in self.iter() {
            for chunk in chunks(document, chunk_field) {
                if chunk.as_map().is_none() {
                    return Err(DocumentError::NotAMap {
                        found: chunk.kind(),
                    });
                }
                total += 1;
            }
        }
        check_length(total, values.len())?;

        let mut values = values.into_iter();
        for document in self.iter_mut() {
            let Some(Value::Array(slots)) = document.get_mut(chunk_field) else {
                continue;
            };
            for (chunk, value) in slots.iter_mut().zip(values.by_ref()) {
                let mut chunk_document = Document::from_value(std::mem::take(chunk))?;
                chunk_document.set(field, value);
                *chunk = chunk_document.into_value();
            }
        }
        Ok(())
    }

    fn append_tag(&mut self, field: &str, tag: impl Into<Value>) -> DocumentResult<()> {
        let tag = tag.into();
        for document in self.iter_mut() {
            push_tag(document, field, tag.clone())?;
        }
        Ok(())
    }

    fn append_tag_each<V: Into<Value>>(&mut self, field: &str, tags: Vec<V>) -> DocumentResult<()> {
        check_length(self.len(), tags.len())?;
        for document in self.iter() {
            tag_list(document, field)?;
        }
        for (document, tag) in self.iter_mut().zip(tags) {
            push_tag(document, field, tag.into())?;
        }
        Ok(())
    }

    fn remove_tag(&mut self, path: &str, value: impl Into<Value>) -> DocumentResult<()> {
        let (field, key) = split_tag_path(path)?;
        let value = value.into();
        for document in self.iter() {
            tag_list(document, field)?;
        }
        for document in self.iter_mut() {
            let kept: Vec<Value> = tag_list(document, field)?
                .iter()
                .filter(|tag| tag.get(key) != Some(&value))
                .cloned()
                .collect();
            document.set(field, kept);
        }
        Ok(())
    }

    fn sort_tags(&mut self, path: &str, reverse: bool) -> DocumentResult<()> {
        let (field, key) = split_tag_path(path)?;
        for document in self.iter() {
            tag_list(document, field)?;
        }
        for document in self.iter_mut() {
            if let Some(Value::Array(tags)) = document.get_mut(field) {
                tags.sort_by(|a, b| compare_keys(a.get(key), b.get(key), reverse));
            }
        }
        Ok(())
    }
}

fn check_length(expected: usize, found: usize) -> DocumentResult<()> {
    if expected == found {
        Ok(())
    } else {
        Err(DocumentError::LengthMismatch { expected, found })
    }
}

fn chunks<'a>(document: &'a Document, chunk_field: &str) -> &'a [Value] {
    document
        .get(chunk_field)
        .and_then(Value::as_array)
        .unwrap_or_default()
}

fn value_at<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split(PATH_SEPARATOR)
        .try_fold(value, |current, segment| current.get(segment))
}

/// The tag list at `field`, empty if absent.
fn tag_list<'a>(document: &'a Document, field: &str) -> DocumentResult<&'a [Value]> {
    match document.get(field) {
        None => Ok(&[]),
        Some(Value::Array(tags)) => Ok(tags),
        Some(other) => Err(DocumentError::NotAnArray {
            path: field.to_string(),
            found: other.kind(),
        }),
    }
}

fn push_tag(document: &mut Document, field: &str, tag: Value) -> DocumentResult<()> {
    let mut tags = tag_list(document, field)?.to_vec();
    tags.push(tag);
    document.set(field, tags);
    Ok(())
}

fn split_tag_path(path: &str) -> DocumentResult<(&str, &str)> {
    match path.rsplit_once(PATH_SEPARATOR) {
        Some((field, key)) if !field.is_empty() && !key.is_empty() => Ok((field, key)),
        _ => Err(DocumentError::InvalidTagPath {
            path: path.to_string(),
        }),
    }
}

fn compare_keys(a: Option<&Value>, b: Option<&Value>, reverse: bool) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) if reverse => compare_values(b, a),
        (Some(a), Some(b)) => compare_values(a, b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Text(a), Value::Text(b)) => a.cmp(b),
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        (Value::Integer(a), Value::Integer(b)) => a.cmp(b),
        _ => match (a.as_f64(), b.as_f64()) {
            (Some(a), Some(b)) => a.total_cmp(&b),
            _ => Ordering::Equal,
        },
    }
}
