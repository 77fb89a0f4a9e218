/// Cosine similarity in `[-1, 1]`. Mismatched lengths and zero vectors score `0.0`.
pub fn cosine_similarity(left: &[f32], right: &[f32]) -> f32 {
	if left.is_empty() || left.len() != right.len() {
		return 0.0;
	}

	let mut dot = 0.0_f32;
	let mut left_norm = 0.0_f32;
	let mut right_norm = 0.0_f32;

	for (l, r) in left.iter().zip(right) {
		dot += l * r;
		left_norm += l * l;
		right_norm += r * r;
	}

	let denom = left_norm.sqrt() * right_norm.sqrt();

	if denom <= f32::EPSILON {
		return 0.0;
	}

	dot / denom
}

/// Squared Euclidean distance. Callers guarantee equal lengths.
pub fn squared_l2(left: &[f32], right: &[f32]) -> f32 {
	left.iter().zip(right).map(|(l, r)| (l - r) * (l - r)).sum()
}
