//! Request-scoped vector index over document chunks.
//!
//! Combines an HNSW approximate index (cosine distance) for candidate
//! selection with exact cosine re-scoring, so results are ordered by true
//! similarity. Built fresh for every document and dropped with the request.
//!
//! Zero vectors (text with no hashable tokens) have no direction, so they
//! stay out of the graph and are scored exactly with similarity 0.

use anndists::dist::DistCosine;
use hnsw_rs::hnsw::Hnsw;

use crate::document::Chunk;
use crate::error::IndexError;

/// A chunk returned by retrieval.
#[derive(Debug, Clone)]
pub struct RetrievedChunk {
    pub chunk: Chunk,
    /// Cosine similarity to the query (1.0 = same direction).
    pub similarity: f32,
}

/// In-memory similarity index over one document's chunks.
pub struct VectorIndex {
    chunks: Vec<Chunk>,
    vectors: Vec<Vec<f32>>,
    hnsw: Hnsw<'static, f32, DistCosine>,
    /// Chunks whose embedding is all zeros; not in `hnsw`.
    zero_ids: Vec<usize>,
    dimension: usize,
}

impl VectorIndex {
    /// Index `chunks`; `embeddings[i]` belongs to `chunks[i]`.
    pub fn build(chunks: Vec<Chunk>, embeddings: Vec<Vec<f32>>) -> Result<Self, IndexError> {
        if chunks.is_empty() {
            return Err(IndexError::Empty);
        }
        if chunks.len() != embeddings.len() {
            return Err(IndexError::CountMismatch {
                chunks: chunks.len(),
                embeddings: embeddings.len(),
            });
        }
        let dimension = embeddings[0].len();
        if dimension == 0 {
            return Err(IndexError::Hnsw {
                message: "embeddings have zero dimensions".into(),
            });
        }
        if let Some(bad) = embeddings.iter().find(|v| v.len() != dimension) {
            return Err(IndexError::DimensionMismatch {
                expected: dimension,
                actual: bad.len(),
            });
        }

        // max_nb_connection 16, ef_construction 200; layers scale with size.
        let max_elements = chunks.len();
        let max_layer = ((max_elements as f64).log2().ceil() as usize).clamp(4, 16);
        let hnsw = Hnsw::new(16, max_elements, max_layer, 200, DistCosine {});
        let mut zero_ids = Vec::new();
        for (id, vector) in embeddings.iter().enumerate() {
            if is_zero(vector) {
                zero_ids.push(id);
            } else {
                hnsw.insert((vector.as_slice(), id));
            }
        }

        tracing::debug!(
            chunks = max_elements,
            zero = zero_ids.len(),
            dimension,
            "built vector index"
        );
        Ok(Self {
            chunks,
            vectors: embeddings,
            hnsw,
            zero_ids,
            dimension,
        })
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// The `k` chunks most similar to `query`, most similar first.
    ///
    /// Ties are broken by chunk index. Asking for more chunks than exist
    /// returns all of them.
    pub fn retrieve(&self, query: &[f32], k: usize) -> Result<Vec<RetrievedChunk>, IndexError> {
        if query.len() != self.dimension {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }
        let k = k.min(self.chunks.len());
        if k == 0 {
            return Ok(Vec::new());
        }

        let indexed = self.chunks.len() - self.zero_ids.len();
        let candidates: Vec<usize> =
            if k == self.chunks.len() || indexed == 0 || is_zero(query) {
                (0..self.chunks.len()).collect()
            } else {
                let ef_search = (k * 2).max(32);
                let mut ids: Vec<usize> = self
                    .hnsw
                    .search(query, k.min(indexed), ef_search)
                    .into_iter()
                    .map(|n| n.d_id)
                    .filter(|id| *id < self.chunks.len())
                    .collect();
                ids.extend_from_slice(&self.zero_ids);
                ids
            };

        let mut scored: Vec<(usize, f32)> = candidates
            .into_iter()
            .map(|id| (id, cosine_similarity(query, &self.vectors[id])))
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        scored.dedup_by_key(|(id, _)| *id);
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(id, similarity)| RetrievedChunk {
                chunk: self.chunks[id].clone(),
                similarity,
            })
            .collect())
    }
}

impl std::fmt::Debug for VectorIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorIndex")
            .field("chunks", &self.chunks.len())
            .field("dimension", &self.dimension)
            .finish()
    }
}

fn is_zero(vector: &[f32]) -> bool {
    vector.iter().all(|x| *x == 0.0)
}

/// Cosine similarity; 0.0 when either vector has zero length.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embed::HashingEmbedder;

    fn chunk(index: usize, text: &str) -> Chunk {
        Chunk {
            index,
            page: 0,
            text: text.into(),
        }
    }

    fn build(texts: &[&str]) -> (VectorIndex, HashingEmbedder) {
        let embedder = HashingEmbedder::new(128);
        let chunks: Vec<Chunk> = texts.iter().enumerate().map(|(i, t)| chunk(i, t)).collect();
        let vectors = texts.iter().map(|t| embedder.embed(t)).collect();
        (VectorIndex::build(chunks, vectors).unwrap(), embedder)
    }

    #[test]
    fn empty_index_is_rejected() {
        let err = VectorIndex::build(Vec::new(), Vec::new()).unwrap_err();
        assert!(matches!(err, IndexError::Empty));
    }

    #[test]
    fn count_and_dimension_are_checked() {
        let err = VectorIndex::build(vec![chunk(0, "a")], vec![]).unwrap_err();
        assert!(matches!(err, IndexError::CountMismatch { .. }));

        let err = VectorIndex::build(
            vec![chunk(0, "a"), chunk(1, "b")],
            vec![vec![1.0, 0.0], vec![1.0]],
        )
        .unwrap_err();
        assert!(matches!(
            err,
            IndexError::DimensionMismatch {
                expected: 2,
                actual: 1
            }
        ));
    }

    #[test]
    fn most_similar_chunk_comes_first() {
        let (index, embedder) = build(&[
            "the french revolution began in 1789",
            "chloroplasts perform photosynthesis in plants",
            "newton formulated three laws of motion",
        ]);
        let results = index
            .retrieve(&embedder.embed("photosynthesis chloroplasts"), 2)
            .unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].chunk.index, 1);
        assert!(results[0].similarity >= results[1].similarity);
    }

    #[test]
    fn k_beyond_len_returns_everything_in_order() {
        let (index, embedder) = build(&["alpha beta", "beta gamma", "delta"]);
        let results = index.retrieve(&embedder.embed("beta"), 20).unwrap();
        assert_eq!(results.len(), 3);
        for pair in results.windows(2) {
            assert!(pair[0].similarity >= pair[1].similarity);
        }
    }

    #[test]
    fn ties_break_by_chunk_index() {
        let chunks = vec![chunk(0, "x"), chunk(1, "y"), chunk(2, "z")];
        let vectors = vec![vec![0.0, 1.0], vec![1.0, 0.0], vec![1.0, 0.0]];
        let index = VectorIndex::build(chunks, vectors).unwrap();
        let results = index.retrieve(&[1.0, 0.0], 3).unwrap();
        let order: Vec<usize> = results.iter().map(|r| r.chunk.index).collect();
        assert_eq!(order, vec![1, 2, 0]);
    }

    #[test]
    fn query_dimension_must_match() {
        let (index, _) = build(&["one", "two"]);
        let err = index.retrieve(&[1.0, 2.0], 1).unwrap_err();
        assert!(matches!(err, IndexError::DimensionMismatch { .. }));
    }

    #[test]
    fn zero_vectors_survive_graph_search() {
        let (index, embedder) = build(&[
            "----",
            "mitochondria produce atp",
            "!!!",
            "ribosomes build proteins",
            "----",
            "the nucleus stores dna",
        ]);
        let results = index.retrieve(&embedder.embed("mitochondria atp"), 3).unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].chunk.index, 1);
        assert!(results.iter().all(|r| r.similarity.is_finite()));
        for pair in results.windows(2) {
            assert!(pair[0].similarity >= pair[1].similarity);
        }

        // A query with no tokens ranks everything at 0, in chunk order.
        let results = index.retrieve(&embedder.embed("..."), 2).unwrap();
        let order: Vec<usize> = results.iter().map(|r| r.chunk.index).collect();
        assert_eq!(order, vec![0, 1]);
        assert!(results.iter().all(|r| r.similarity == 0.0));
    }

    #[test]
    fn all_zero_index_still_answers() {
        let (index, embedder) = build(&["----", "!!!", "..."]);
        let results = index.retrieve(&embedder.embed("anything"), 2).unwrap();
        let order: Vec<usize> = results.iter().map(|r| r.chunk.index).collect();
        assert_eq!(order, vec![0, 1]);
    }

    #[test]
    fn zero_vectors_have_zero_similarity() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert!((cosine_similarity(&[2.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
    }
}
