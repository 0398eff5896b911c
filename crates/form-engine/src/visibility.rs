use crate::spec::field::FieldDefinition;
use crate::value::ValueStore;

pub type VisibilityMap = std::collections::BTreeMap<String, bool>;

/// Whether `field` is shown given the current values. Fields without a
/// rule are always visible.
pub fn is_visible(field: &FieldDefinition, store: &ValueStore) -> bool {
    match field.condition() {
        Some(condition) => condition.evaluate(store),
        None => true,
    }
}

/// Visible fields in `order` sequence. Ties keep their template position.
pub fn visible_fields<'a>(fields: &'a [FieldDefinition], store: &ValueStore) -> Vec<&'a FieldDefinition> {
    let mut visible: Vec<&FieldDefinition> = fields
        .iter()
        .filter(|field| is_visible(field, store))
        .collect();
    visible.sort_by_key(|field| field.order);
    visible
}

pub fn resolve_visibility(fields: &[FieldDefinition], store: &ValueStore) -> VisibilityMap {
    fields
        .iter()
        .map(|field| (field.field_key.clone(), is_visible(field, store)))
        .collect()
}
