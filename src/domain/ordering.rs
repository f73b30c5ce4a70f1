//! Field Positioning
//!
//! Keeps `order` equal to list position (0, 1, 2, ...).

use super::field::Field;

/// Reindex fields to be sequential in their current list order
pub fn resequence(fields: &mut [Field]) {
    for (position, field) in fields.iter_mut().enumerate() {
        field.order = position as u32;
    }
}

/// Sort by stored order, keeping relative position on ties, then reindex.
///
/// Gaps and duplicates from earlier state are discarded.
pub fn normalize(fields: &mut [Field]) {
    fields.sort_by_key(|field| field.order);
    resequence(fields);
}

/// True when every `order` matches the field's position
pub fn is_dense(fields: &[Field]) -> bool {
    fields
        .iter()
        .enumerate()
        .all(|(position, field)| field.order as usize == position)
}

/// Move the field at `from` so it ends up at `to`, with list-splice semantics.
///
/// A destination past the end means "append". Returns false (and leaves the
/// list untouched) when `from` is out of range or the move changes nothing.
pub fn move_field(fields: &mut Vec<Field>, from: usize, to: usize) -> bool {
    if from >= fields.len() || from == to {
        return false;
    }

    let to = to.min(fields.len() - 1);
    if to == from {
        return false;
    }

    let moved = fields.remove(from);
    fields.insert(to, moved);
    resequence(fields);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FieldType, Locale};

    fn fields_with_orders(orders: &[u32]) -> Vec<Field> {
        orders
            .iter()
            .map(|order| Field::new(FieldType::Text, *order, &Locale::En))
            .collect()
    }

    fn ids(fields: &[Field]) -> Vec<String> {
        fields.iter().map(|f| f.id.clone()).collect()
    }

    #[test]
    fn test_normalize_is_stable_on_ties() {
        let mut fields = fields_with_orders(&[5, 2, 5, 0]);
        let original = ids(&fields);

        normalize(&mut fields);

        assert_eq!(
            ids(&fields),
            vec![original[3].clone(), original[1].clone(), original[0].clone(), original[2].clone()]
        );
        assert!(is_dense(&fields));
    }

    #[test]
    fn test_move_forward_and_back_restores() {
        let mut fields = fields_with_orders(&[0, 1, 2, 3]);
        let original = ids(&fields);

        assert!(move_field(&mut fields, 0, 2));
        assert_eq!(ids(&fields)[2], original[0]);
        assert!(is_dense(&fields));

        assert!(move_field(&mut fields, 2, 0));
        assert_eq!(ids(&fields), original);
    }

    #[test]
    fn test_move_past_end_appends() {
        let mut fields = fields_with_orders(&[0, 1, 2]);
        let original = ids(&fields);

        assert!(move_field(&mut fields, 0, 10));
        assert_eq!(ids(&fields)[2], original[0]);
        assert!(is_dense(&fields));
    }

    #[test]
    fn test_move_noops() {
        let mut fields = fields_with_orders(&[0, 1, 2]);
        let original = ids(&fields);

        assert!(!move_field(&mut fields, 1, 1));
        assert!(!move_field(&mut fields, 3, 0));
        // Last field moved "past the end" stays where it is
        assert!(!move_field(&mut fields, 2, 7));
        assert_eq!(ids(&fields), original);
    }
}
