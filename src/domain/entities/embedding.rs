use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Embedding(pub Vec<f32>);

impl Embedding {
    pub fn new(vec: Vec<f32>) -> Self {
        Self(vec)
    }

    /// Cosine similarity in `[-1, 1]`; mismatched or zero vectors score 0.
    pub fn cosine_similarity(&self, other: &[f32]) -> f64 {
        if self.0.len() != other.len() || self.0.is_empty() {
            return 0.0;
        }

        let dot_product: f64 = self
            .0
            .iter()
            .zip(other.iter())
            .map(|(a, b)| f64::from(*a) * f64::from(*b))
            .sum();
        let norm_a: f64 = self.0.iter().map(|x| f64::from(*x).powi(2)).sum::<f64>().sqrt();
        let norm_b: f64 = other.iter().map(|x| f64::from(*x).powi(2)).sum::<f64>().sqrt();

        if norm_a == 0.0 || norm_b == 0.0 {
            return 0.0;
        }

        dot_product / (norm_a * norm_b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_similarity_identical() {
        let a = Embedding::new(vec![1.0, 2.0, 3.0]);
        assert!((a.cosine_similarity(&[1.0, 2.0, 3.0]) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_cosine_similarity_orthogonal_and_mismatched() {
        let a = Embedding::new(vec![1.0, 0.0]);
        assert!(a.cosine_similarity(&[0.0, 1.0]).abs() < 1e-9);
        assert_eq!(a.cosine_similarity(&[1.0, 0.0, 0.0]), 0.0);
        assert_eq!(a.cosine_similarity(&[0.0, 0.0]), 0.0);
    }
}
