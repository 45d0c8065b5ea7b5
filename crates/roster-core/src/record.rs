//! Student record domain models.
//!
//! Contains the displayed [`StudentRecord`], the validated creation payload
//! [`NewStudentRecord`], and the snapshot-replaced [`RecordList`].

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::capability::Document;
use crate::error::{Result, RosterError};

/// A single student record as stored in the remote collection.
///
/// The `id` is assigned by the remote store on creation. Content fields carry
/// no invariants beyond being non-empty on creation; in particular the
/// student ID is free-form and not unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentRecord {
    /// Document ID assigned by the remote store.
    pub id: String,
    /// Full name.
    pub name: String,
    /// Student ID number (free-form).
    pub student_id: String,
    /// Department name.
    pub department: String,
}

impl StudentRecord {
    /// Builds a record from a raw store document.
    ///
    /// Missing or non-string fields become empty strings; the store's
    /// contents are taken as-is without schema validation.
    pub fn from_document(doc: &Document) -> Self {
        Self {
            id: doc.id.clone(),
            name: string_field(&doc.fields, "name"),
            student_id: string_field(&doc.fields, "student_id"),
            department: string_field(&doc.fields, "department"),
        }
    }
}

fn string_field(fields: &Map<String, Value>, key: &str) -> String {
    fields
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// A validated payload for creating a student record.
///
/// Construction trims all fields and rejects empty ones, so a
/// `NewStudentRecord` can only exist in a writable state. Validation happens
/// before any remote call is made.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewStudentRecord {
    name: String,
    student_id: String,
    department: String,
}

impl NewStudentRecord {
    /// Validates and creates a new record payload.
    ///
    /// # Errors
    ///
    /// Returns [`RosterError::Validation`] naming the first field that is
    /// empty after trimming.
    pub fn new(name: &str, student_id: &str, department: &str) -> Result<Self> {
        let name = name.trim();
        let student_id = student_id.trim();
        let department = department.trim();

        if name.is_empty() {
            return Err(RosterError::validation("name"));
        }
        if student_id.is_empty() {
            return Err(RosterError::validation("student_id"));
        }
        if department.is_empty() {
            return Err(RosterError::validation("department"));
        }

        Ok(Self {
            name: name.to_string(),
            student_id: student_id.to_string(),
            department: department.to_string(),
        })
    }

    /// Converts the payload into store document fields.
    pub fn into_fields(self) -> Map<String, Value> {
        let mut fields = Map::new();
        fields.insert("name".to_string(), Value::String(self.name));
        fields.insert("student_id".to_string(), Value::String(self.student_id));
        fields.insert("department".to_string(), Value::String(self.department));
        fields
    }
}

/// The displayed list of student records.
///
/// An ordered-by-arrival collection addressable by record ID. The list is
/// fully replaced on every snapshot the store delivers (never merged or
/// patched) and preserves the store's delivery order without client-side
/// sorting. Its lifetime is bounded by the active session: created when a
/// subscription opens, emptied when it closes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordList {
    records: Vec<StudentRecord>,
}

impl RecordList {
    /// Builds a list from a store snapshot, preserving delivery order.
    pub fn from_snapshot(documents: &[Document]) -> Self {
        Self {
            records: documents.iter().map(StudentRecord::from_document).collect(),
        }
    }

    /// Returns the records in arrival order.
    pub fn records(&self) -> &[StudentRecord] {
        &self.records
    }

    /// Looks up a record by its store-assigned ID.
    pub fn get(&self, id: &str) -> Option<&StudentRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: &str, name: &str, student_id: &str, department: &str) -> Document {
        let mut fields = Map::new();
        fields.insert("name".to_string(), Value::String(name.to_string()));
        fields.insert("student_id".to_string(), Value::String(student_id.to_string()));
        fields.insert("department".to_string(), Value::String(department.to_string()));
        Document {
            id: id.to_string(),
            fields,
        }
    }

    #[test]
    fn test_new_record_trims_fields() {
        let record = NewStudentRecord::new("  Ada ", " NIM001 ", " CS ").unwrap();
        let fields = record.into_fields();
        assert_eq!(fields["name"], "Ada");
        assert_eq!(fields["student_id"], "NIM001");
        assert_eq!(fields["department"], "CS");
    }

    #[test]
    fn test_new_record_rejects_empty_fields() {
        let err = NewStudentRecord::new("", "123", "CS").unwrap_err();
        assert_eq!(err, RosterError::validation("name"));

        let err = NewStudentRecord::new("Ada", "   ", "CS").unwrap_err();
        assert_eq!(err, RosterError::validation("student_id"));

        let err = NewStudentRecord::new("Ada", "123", "").unwrap_err();
        assert_eq!(err, RosterError::validation("department"));
    }

    #[test]
    fn test_from_document_tolerates_missing_fields() {
        let bare = Document {
            id: "r1".to_string(),
            fields: Map::new(),
        };
        let record = StudentRecord::from_document(&bare);
        assert_eq!(record.id, "r1");
        assert_eq!(record.name, "");
        assert_eq!(record.student_id, "");
        assert_eq!(record.department, "");
    }

    #[test]
    fn test_record_list_preserves_delivery_order() {
        let docs = vec![
            doc("r2", "Grace", "NIM002", "EE"),
            doc("r1", "Ada", "NIM001", "CS"),
        ];
        let list = RecordList::from_snapshot(&docs);

        assert_eq!(list.len(), 2);
        assert_eq!(list.records()[0].name, "Grace");
        assert_eq!(list.records()[1].name, "Ada");
        assert_eq!(list.get("r1").unwrap().student_id, "NIM001");
        assert!(list.get("r9").is_none());
    }
}
