//! Index expansion.

use crate::error::{DecodeError, DecodeResult};

/// Expand an index array against a shared value table.
///
/// Produces `output[i] = table[indices[i]]` in order. Points, normals and
/// colors are each rebuilt this way from the same table.
///
/// `context` names the index array in any error (e.g. `"points"`).
///
/// # Errors
///
/// Returns [`DecodeError::IndexOutOfRange`] if any index is negative or not
/// less than `table.len()`. No partial output is returned.
pub fn expand(table: &[f64], indices: &[i64], context: &'static str) -> DecodeResult<Vec<f64>> {
    indices
        .iter()
        .map(|&index| {
            usize::try_from(index)
                .ok()
                .and_then(|i| table.get(i).copied())
                .ok_or(DecodeError::IndexOutOfRange {
                    context,
                    index,
                    len: table.len(),
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_expand_empty() {
        let result = expand(&[1.0, 2.0], &[], "points").unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn test_expand_repeats_shared_values() {
        let table = [0.0, 0.5, 1.0];
        let result = expand(&table, &[2, 0, 0, 1, 2], "normals").unwrap();
        assert_eq!(result, vec![1.0, 0.0, 0.0, 0.5, 1.0]);
    }

    #[test]
    fn test_expand_index_equal_to_len() {
        let result = expand(&[1.0, 2.0], &[0, 2], "points");
        assert_eq!(
            result,
            Err(DecodeError::IndexOutOfRange {
                context: "points",
                index: 2,
                len: 2,
            })
        );
    }

    #[test]
    fn test_expand_negative_index() {
        let result = expand(&[1.0], &[-1], "colors");
        assert!(matches!(
            result,
            Err(DecodeError::IndexOutOfRange { index: -1, .. })
        ));
    }

    #[test]
    fn test_expand_against_empty_table() {
        assert!(expand(&[], &[0], "points").is_err());
    }

    proptest! {
        #[test]
        fn prop_expand_matches_lookup(
            (table, indices) in proptest::collection::vec(-1e6f64..1e6, 1..32)
                .prop_flat_map(|table| {
                    let len = table.len() as i64;
                    (Just(table), proptest::collection::vec(0..len, 0..64))
                }),
        ) {
            let result = expand(&table, &indices, "points").unwrap();
            prop_assert_eq!(result.len(), indices.len());
            for (k, &index) in indices.iter().enumerate() {
                #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
                let expected = table[index as usize];
                prop_assert_eq!(result[k], expected);
            }
        }

        #[test]
        fn prop_expand_rejects_out_of_range(
            table in proptest::collection::vec(-1e6f64..1e6, 0..16),
            mut indices in proptest::collection::vec(0i64..16, 0..16),
            offset in 0i64..100,
            position in any::<proptest::sample::Index>(),
        ) {
            let bad = table.len() as i64 + offset;
            let at = position.index(indices.len() + 1);
            indices.insert(at, bad);
            let result = expand(&table, &indices, "points");
            prop_assert!(
                matches!(result, Err(DecodeError::IndexOutOfRange { .. })),
                "expected IndexOutOfRange"
            );
        }
    }
}
