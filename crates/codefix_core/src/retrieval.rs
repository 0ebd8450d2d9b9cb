use crate::model::{BugExample, BugSolution, Decision, MatchOutcome};

/// Steepness of the logistic curve that spreads raw similarities into
/// confidence scores.
pub const SIGMOID_SLOPE: f32 = 10.0;
/// Similarity at which confidence crosses 0.5.
pub const SIGMOID_MIDPOINT: f32 = 0.5;
/// A match is returned only when confidence is strictly above this.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.5;

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.is_empty() || b.is_empty() || a.len() != b.len() {
        return 0.0;
    }

    let (dot, na, nb) = a
        .iter()
        .zip(b.iter())
        .fold((0.0f32, 0.0f32, 0.0f32), |(d, aa, bb), (x, y)| {
            (d + (x * y), aa + (x * x), bb + (y * y))
        });

    if na == 0.0 || nb == 0.0 {
        0.0
    } else {
        dot / (na.sqrt() * nb.sqrt())
    }
}

/// Map a raw cosine similarity to a confidence in [0, 1] through a fixed
/// logistic curve centred on SIGMOID_MIDPOINT.
pub fn confidence_from_similarity(similarity: f32) -> f32 {
    let spread = 1.0 / (1.0 + (-SIGMOID_SLOPE * (similarity - SIGMOID_MIDPOINT)).exp());
    spread.clamp(0.0, 1.0)
}

/// Brute-force scan: indices of the `k` most similar example embeddings,
/// best first. Ties resolve to the earliest index (stable sort).
pub fn top_k(query: &[f32], embeddings: &[Vec<f32>], k: usize) -> Vec<(usize, f32)> {
    let mut scored: Vec<(usize, f32)> = embeddings
        .iter()
        .enumerate()
        .map(|(index, embedding)| (index, cosine_similarity(query, embedding)))
        .collect();

    scored.sort_by(|a, b| b.1.total_cmp(&a.1));
    scored.truncate(k);
    scored
}

pub fn top_match(query: &[f32], embeddings: &[Vec<f32>]) -> Option<(usize, f32)> {
    top_k(query, embeddings, 1).into_iter().next()
}

/// Arg-max over the example embeddings, then the sigmoid/threshold check.
/// A hit carries the matched example's solution; a miss still names the
/// nearest candidate so callers can report how close the query came.
pub fn decide(
    query: &[f32],
    examples: &[BugExample],
    embeddings: &[Vec<f32>],
    threshold: f32,
) -> MatchOutcome {
    debug_assert_eq!(examples.len(), embeddings.len());

    let Some((index, similarity)) = top_match(query, embeddings) else {
        return MatchOutcome {
            decision: Decision::Miss,
            best_title: None,
            similarity: 0.0,
            confidence: 0.0,
            solution: None,
        };
    };

    let confidence = confidence_from_similarity(similarity);
    let example = &examples[index];

    if confidence > threshold {
        MatchOutcome {
            decision: Decision::Hit,
            best_title: Some(example.title.clone()),
            similarity,
            confidence,
            solution: Some(BugSolution::from_example(example, confidence, similarity)),
        }
    } else {
        MatchOutcome {
            decision: Decision::Miss,
            best_title: Some(example.title.clone()),
            similarity,
            confidence,
            solution: None,
        }
    }
}
