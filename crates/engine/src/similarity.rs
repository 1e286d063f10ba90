//! Item-item cosine similarity
//!
//! Columns of the interaction matrix are L2-normalised once and the full
//! similarity matrix is one product `Nᵀ·N`. An all-zero column (an item nobody
//! interacted with) stays zero, so its similarity to every item, itself
//! included, is 0 rather than NaN.

use ndarray::{Array2, ArrayView1, Axis};

use crate::matrix::InteractionMatrix;

/// Symmetric item x item similarity matrix
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityMatrix {
    values: Array2<f64>,
}

impl SimilarityMatrix {
    pub fn from_interactions(interactions: &InteractionMatrix) -> Self {
        let mut normalized = interactions.values().to_owned();
        let num_items = normalized.ncols();
        let mut has_interactions = vec![false; num_items];

        for (idx, mut column) in normalized.axis_iter_mut(Axis(1)).enumerate() {
            let norm = column.dot(&column).sqrt();
            if norm > 0.0 {
                column.mapv_inplace(|v| v / norm);
                has_interactions[idx] = true;
            }
        }

        let mut values = normalized.t().dot(&normalized);

        // Mirror the upper triangle so symmetry is exact, not just within rounding
        for i in 0..num_items {
            values[[i, i]] = if has_interactions[i] { 1.0 } else { 0.0 };
            for j in (i + 1)..num_items {
                let similarity = snap_unit(values[[i, j]]);
                values[[i, j]] = similarity;
                values[[j, i]] = similarity;
            }
        }

        Self { values }
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.values[[i, j]]
    }

    /// Similarities of item `i` to every item, in item index order
    pub fn row(&self, i: usize) -> ArrayView1<'_, f64> {
        self.values.row(i)
    }

    pub fn len(&self) -> usize {
        self.values.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    /// Up to `n` items most similar to `item_idx` as `(item_idx, similarity)`
    ///
    /// Excludes the item itself and zero similarities; ties by item index.
    pub fn most_similar(&self, item_idx: usize, n: usize) -> Vec<(usize, f64)> {
        let mut neighbours: Vec<(usize, f64)> = self
            .values
            .row(item_idx)
            .iter()
            .enumerate()
            .filter(|&(idx, &similarity)| idx != item_idx && similarity > 0.0)
            .map(|(idx, &similarity)| (idx, similarity))
            .collect();

        neighbours.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        neighbours.truncate(n);
        neighbours
    }
}

/// Clamp to [-1, 1]; values within rounding of 1.0 (parallel columns) become exactly 1.0
fn snap_unit(similarity: f64) -> f64 {
    if (1.0 - similarity).abs() <= PARALLEL_TOLERANCE {
        1.0
    } else {
        similarity.clamp(-1.0, 1.0)
    }
}

const PARALLEL_TOLERANCE: f64 = 8.0 * f64::EPSILON;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::InteractionAggregator;
    use crate::types::{Event, Item};
    use crate::weights::{EventWeightPolicy, UnknownEventKindPolicy};
    use streamrec_core::math::cosine_similarity;

    fn matrix_from(events: &[Event], items: &[Item]) -> InteractionMatrix {
        let weights = EventWeightPolicy::default();
        let aggregation = InteractionAggregator::new(&weights, UnknownEventKindPolicy::Skip)
            .aggregate(events, items)
            .unwrap();
        InteractionMatrix::build(&aggregation, &[], items)
    }

    /// Three users; item A = [8000, 0, 2000], item B = [4000, 0, 1000],
    /// item C = [0, 500, 100], item Z never watched.
    fn fixture() -> InteractionMatrix {
        let items = vec![
            Item::new("a", "A", "movie", "drama"),
            Item::new("b", "B", "movie", "drama"),
            Item::new("c", "C", "series", "comedy"),
            Item::new("z", "Z", "series", "comedy"),
        ];
        let events = vec![
            Event::new("u1", "a", "play", 8000.0),
            Event::new("u3", "a", "play", 2000.0),
            Event::new("u1", "b", "play", 4000.0),
            Event::new("u3", "b", "play", 1000.0),
            Event::new("u2", "c", "play", 500.0),
            Event::new("u3", "c", "play", 100.0),
        ];
        matrix_from(&events, &items)
    }

    #[test]
    fn test_parallel_vectors_are_fully_similar() {
        let matrix = fixture();
        let similarity = SimilarityMatrix::from_interactions(&matrix);
        let a = matrix.items().index_of("a").unwrap();
        let b = matrix.items().index_of("b").unwrap();

        assert_eq!(similarity.get(a, b), 1.0);
        assert_eq!(similarity.get(b, a), 1.0);
    }

    #[test]
    fn test_scaled_columns_are_exactly_one() {
        let items = vec![
            Item::new("p", "P", "movie", "drama"),
            Item::new("q", "Q", "movie", "drama"),
        ];
        let events = vec![
            Event::new("u1", "p", "play", 1.0),
            Event::new("u2", "p", "play", 7.0),
            Event::new("u3", "p", "play", 13.0),
            Event::new("u1", "q", "play", 3.3),
            Event::new("u2", "q", "play", 23.1),
            Event::new("u3", "q", "play", 42.9),
        ];
        let matrix = matrix_from(&events, &items);
        let similarity = SimilarityMatrix::from_interactions(&matrix);
        let p = matrix.items().index_of("p").unwrap();
        let q = matrix.items().index_of("q").unwrap();

        assert_eq!(similarity.get(p, q), 1.0);
    }

    #[test]
    fn test_zero_vector_similarity_is_zero() {
        let matrix = fixture();
        let similarity = SimilarityMatrix::from_interactions(&matrix);
        let z = matrix.items().index_of("z").unwrap();

        for j in 0..similarity.len() {
            assert_eq!(similarity.get(z, j), 0.0);
            assert_eq!(similarity.get(j, z), 0.0);
            assert!(!similarity.get(z, j).is_nan());
        }
    }

    #[test]
    fn test_symmetry_and_diagonal() {
        let matrix = fixture();
        let similarity = SimilarityMatrix::from_interactions(&matrix);
        let z = matrix.items().index_of("z").unwrap();

        for i in 0..similarity.len() {
            for j in 0..similarity.len() {
                assert_eq!(similarity.get(i, j), similarity.get(j, i));
                assert!((-1.0..=1.0).contains(&similarity.get(i, j)));
            }
            if i != z {
                assert_eq!(similarity.get(i, i), 1.0);
            }
        }
    }

    #[test]
    fn test_matches_pairwise_cosine() {
        let matrix = fixture();
        let similarity = SimilarityMatrix::from_interactions(&matrix);

        for i in 0..matrix.num_items() {
            for j in 0..matrix.num_items() {
                if i == j {
                    continue;
                }
                let col_i: Vec<f64> = matrix.item_column(i).to_vec();
                let col_j: Vec<f64> = matrix.item_column(j).to_vec();
                let expected = cosine_similarity(&col_i, &col_j);
                assert!((similarity.get(i, j) - expected).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn test_most_similar_excludes_self_and_zero() {
        let matrix = fixture();
        let similarity = SimilarityMatrix::from_interactions(&matrix);
        let a = matrix.items().index_of("a").unwrap();
        let b = matrix.items().index_of("b").unwrap();
        let c = matrix.items().index_of("c").unwrap();

        let neighbours = similarity.most_similar(a, 10);
        let ids: Vec<usize> = neighbours.iter().map(|(idx, _)| *idx).collect();
        assert_eq!(ids, vec![b, c]);
        assert!(neighbours[0].1 > neighbours[1].1);

        assert_eq!(similarity.most_similar(a, 1).len(), 1);
    }

    #[test]
    fn test_empty_matrix() {
        let matrix = matrix_from(&[], &[]);
        let similarity = SimilarityMatrix::from_interactions(&matrix);
        assert!(similarity.is_empty());
    }
}
