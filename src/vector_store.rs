use crate::error::{Error, Result};

/// Row-aligned embedding vectors for one generation.
///
/// Layout: `data[row * dimension + dim_idx]`, row-major, one row per
/// document. Each row's unit-normalized copy is computed once at
/// construction; rows with zero norm normalize to the zero vector.
#[derive(Debug, Clone, Default)]
pub struct VectorStore {
    dimension: usize,
    rows: usize,
    data: Vec<f32>,
    normalized: Vec<f32>,
}

impl VectorStore {
    /// An empty store. The dimension is fixed by the first non-empty build.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a store from per-document vectors.
    ///
    /// Fails if vectors disagree on dimension or contain NaN/infinite values.
    pub fn from_rows(vectors: Vec<Vec<f32>>) -> Result<Self> {
        let Some(first) = vectors.first() else {
            return Ok(Self::empty());
        };
        let dimension = first.len();
        if dimension == 0 {
            return Err(Error::InvalidVector("zero-length embedding".into()));
        }

        let rows = vectors.len();
        let mut data = Vec::with_capacity(rows * dimension);
        for (row, vector) in vectors.into_iter().enumerate() {
            if vector.len() != dimension {
                return Err(Error::InvalidVector(format!(
                    "row {row} has dimension {}, expected {dimension}",
                    vector.len()
                )));
            }
            check_finite(&vector)
                .map_err(|e| Error::InvalidVector(format!("row {row}: {e}")))?;
            data.extend_from_slice(&vector);
        }

        let mut normalized = data.clone();
        for chunk in normalized.chunks_exact_mut(dimension) {
            normalize_in_place(chunk);
        }

        Ok(Self {
            dimension,
            rows,
            data,
            normalized,
        })
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    /// The raw vector stored for `row`.
    pub fn row(&self, row: usize) -> Option<&[f32]> {
        (row < self.rows)
            .then(|| &self.data[row * self.dimension..(row + 1) * self.dimension])
    }

    /// The unit-normalized vector for `row` (all zeros for a zero-norm row).
    pub fn normalized_row(&self, row: usize) -> Option<&[f32]> {
        (row < self.rows).then(|| {
            &self.normalized[row * self.dimension..(row + 1) * self.dimension]
        })
    }
}

/// Reject vectors containing NaN or infinite components.
pub fn check_finite(vector: &[f32]) -> std::result::Result<(), String> {
    match vector.iter().position(|v| !v.is_finite()) {
        Some(idx) => Err(format!("non-finite value at index {idx}")),
        None => Ok(()),
    }
}

pub fn l2_norm(vector: &[f32]) -> f32 {
    // Accumulate in f64 so long vectors of small values keep precision.
    vector
        .iter()
        .map(|&v| f64::from(v) * f64::from(v))
        .sum::<f64>()
        .sqrt() as f32
}

/// Scale `vector` to unit L2 norm. Vectors whose norm is zero or not finite
/// become all zeros, so they score 0 against everything.
pub fn normalize_in_place(vector: &mut [f32]) {
    let norm = l2_norm(vector);
    if norm > 0.0 && norm.is_finite() {
        for v in vector.iter_mut() {
            *v /= norm;
        }
    } else {
        vector.fill(0.0);
    }
}

pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(&x, &y)| f64::from(x) * f64::from(y))
        .sum::<f64>() as f32
}

/// Cosine similarity clamped to `[-1, 1]`; 0 when either side has zero norm.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let mut a = a.to_vec();
    let mut b = b.to_vec();
    normalize_in_place(&mut a);
    normalize_in_place(&mut b);
    dot(&a, &b).clamp(-1.0, 1.0)
}
