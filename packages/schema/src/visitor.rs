use crate::field::FieldKind;
use crate::schema::{FieldDef, TabDef};

/// Visitor pattern for traversing a declarative schema immutably
///
/// Default implementations walk the whole nesting (fields, tabs, tab fields).
/// Override specific visit_* methods to act on nodes.
pub trait Visitor: Sized {
    fn visit_field(&mut self, field: &FieldDef) {
        walk_field(self, field);
    }

    fn visit_tab(&mut self, tab: &TabDef) {
        walk_tab(self, tab);
    }
}

pub fn walk_fields<V: Visitor>(visitor: &mut V, fields: &[FieldDef]) {
    for field in fields {
        visitor.visit_field(field);
    }
}

pub fn walk_field<V: Visitor>(visitor: &mut V, field: &FieldDef) {
    for child in &field.fields {
        visitor.visit_field(child);
    }
    for tab in &field.tabs {
        visitor.visit_tab(tab);
    }
}

pub fn walk_tab<V: Visitor>(visitor: &mut V, tab: &TabDef) {
    for child in &tab.fields {
        visitor.visit_field(child);
    }
}

/// Collects data-field names in document order
#[derive(Debug, Default)]
pub struct NameCollector {
    pub names: Vec<String>,
}

impl Visitor for NameCollector {
    fn visit_field(&mut self, field: &FieldDef) {
        if field.kind() == FieldKind::Data {
            if let Some(name) = field.name() {
                self.names.push(name.to_string());
            }
        }
        walk_field(self, field);
    }
}
