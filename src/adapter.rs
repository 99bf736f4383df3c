//! Blendshape result adapter.
//!
//! Turns a [`FaceLandmarkerResult`] into the fixed-size arrays the native face
//! engine consumes, and into display rows (label + two-decimal score).
//!
//! Slot arrays persist across updates: when a result carries fewer than
//! [`BLENDSHAPE_SLOTS`] categories, the trailing key/score slots keep their
//! previous values while the display rows for those slots read empty.

use std::sync::Arc;

use crate::error::Result;
use crate::tracking::{Category, FaceLandmarkerResult};

/// Number of blendshape slots forwarded per update
pub const BLENDSHAPE_SLOTS: usize = 52;
/// Number of elements in a facial transformation matrix
pub const MATRIX_LEN: usize = 16;

const NO_VALUE: &str = "--";

/// Receiver of forwarded blendshape data (the native side of the boundary).
pub trait BlendshapeSink {
    /// Category names, most-likely-first
    fn set_blendshape_keys(&self, keys: &[String]) -> Result<()>;

    /// Scores parallel to the keys, plus the column-major facial transform
    fn set_blendshapes_and_matrix(
        &self,
        scores: &[f32; BLENDSHAPE_SLOTS],
        matrix: &[f32; MATRIX_LEN],
    ) -> Result<()>;
}

impl<T: BlendshapeSink + ?Sized> BlendshapeSink for Arc<T> {
    fn set_blendshape_keys(&self, keys: &[String]) -> Result<()> {
        (**self).set_blendshape_keys(keys)
    }

    fn set_blendshapes_and_matrix(
        &self,
        scores: &[f32; BLENDSHAPE_SLOTS],
        matrix: &[f32; MATRIX_LEN],
    ) -> Result<()> {
        (**self).set_blendshapes_and_matrix(scores, matrix)
    }
}

/// Text for one display row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowText {
    pub label: String,
    pub score: String,
}

/// Sorts, truncates and forwards blendshape results; exposes them as rows.
pub struct BlendshapeAdapter<S> {
    categories: Vec<Option<Category>>,
    keys: Vec<String>,
    scores: [f32; BLENDSHAPE_SLOTS],
    matrix: [f32; MATRIX_LEN],
    sink: S,
}

impl<S: BlendshapeSink> BlendshapeAdapter<S> {
    pub fn new(sink: S) -> Self {
        Self {
            categories: vec![None; BLENDSHAPE_SLOTS],
            keys: vec![String::new(); BLENDSHAPE_SLOTS],
            scores: [0.0; BLENDSHAPE_SLOTS],
            matrix: [0.0; MATRIX_LEN],
            sink,
        }
    }

    /// Apply a new landmarker result and forward it to the sink.
    ///
    /// A missing result, or one without a face, clears the display rows and
    /// forwards nothing.
    pub fn update_results(&mut self, result: Option<&FaceLandmarkerResult>) -> Result<()> {
        self.categories = vec![None; BLENDSHAPE_SLOTS];

        let Some(result) = result else {
            return Ok(());
        };
        let Some(face) = result.first_face() else {
            tracing::debug!("Landmarker result without a face, nothing forwarded");
            return Ok(());
        };

        // Descending by score, NaN last
        let mut sorted = face.to_vec();
        sorted.sort_by(|a, b| match (a.score.is_nan(), b.score.is_nan()) {
            (false, false) => b.score.total_cmp(&a.score),
            (a_nan, b_nan) => a_nan.cmp(&b_nan),
        });

        for (i, category) in sorted.into_iter().take(BLENDSHAPE_SLOTS).enumerate() {
            self.keys[i] = category.category_name.clone();
            self.scores[i] = category.score;
            self.categories[i] = Some(category);
        }

        if let Some(matrix) = result.first_matrix() {
            self.matrix = *matrix;
        }

        self.sink.set_blendshape_keys(&self.keys)?;
        self.sink
            .set_blendshapes_and_matrix(&self.scores, &self.matrix)?;
        Ok(())
    }

    /// Number of display rows (always [`BLENDSHAPE_SLOTS`])
    pub fn item_count(&self) -> usize {
        self.categories.len()
    }

    /// Display text for the row at `position`
    pub fn row(&self, position: usize) -> Option<RowText> {
        let category = self.categories.get(position)?;
        Some(match category {
            Some(c) => RowText {
                label: c.category_name.clone(),
                score: format_score(c.score),
            },
            None => RowText {
                label: NO_VALUE.to_string(),
                score: NO_VALUE.to_string(),
            },
        })
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn scores(&self) -> &[f32; BLENDSHAPE_SLOTS] {
        &self.scores
    }

    pub fn matrix(&self) -> &[f32; MATRIX_LEN] {
        &self.matrix
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }
}

/// Two-decimal score text. Ties round half-up on the shortest decimal form of
/// the score, so `0.125` shows as `"0.13"`.
fn format_score(score: f32) -> String {
    if !score.is_finite() {
        return score.to_string();
    }

    let repr = score.abs().to_string();
    let (int_part, frac_part) = repr.split_once('.').unwrap_or((repr.as_str(), ""));

    // Integer digits followed by exactly two fraction digits
    let mut digits: Vec<u8> = int_part
        .bytes()
        .chain(frac_part.bytes().chain(std::iter::repeat(b'0')).take(2))
        .map(|b| b - b'0')
        .collect();

    if frac_part.as_bytes().get(2).is_some_and(|&d| d >= b'5') {
        let mut i = digits.len();
        loop {
            if i == 0 {
                digits.insert(0, 1);
                break;
            }
            i -= 1;
            if digits[i] == 9 {
                digits[i] = 0;
            } else {
                digits[i] += 1;
                break;
            }
        }
    }

    let text: String = digits.iter().map(|&d| char::from(b'0' + d)).collect();
    let (whole, frac) = text.split_at(text.len() - 2);
    let sign = if score.is_sign_negative() { "-" } else { "" };
    format!("{}{}.{}", sign, whole, frac)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSink {
        calls: Mutex<Vec<Forwarded>>,
    }

    #[derive(Debug, Clone, PartialEq)]
    enum Forwarded {
        Keys(Vec<String>),
        Values(Vec<f32>, Vec<f32>),
    }

    impl BlendshapeSink for RecordingSink {
        fn set_blendshape_keys(&self, keys: &[String]) -> Result<()> {
            self.calls.lock().unwrap().push(Forwarded::Keys(keys.to_vec()));
            Ok(())
        }

        fn set_blendshapes_and_matrix(
            &self,
            scores: &[f32; BLENDSHAPE_SLOTS],
            matrix: &[f32; MATRIX_LEN],
        ) -> Result<()> {
            self.calls
                .lock()
                .unwrap()
                .push(Forwarded::Values(scores.to_vec(), matrix.to_vec()));
            Ok(())
        }
    }

    impl RecordingSink {
        fn calls(&self) -> Vec<Forwarded> {
            self.calls.lock().unwrap().clone()
        }
    }

    fn result(categories: &[(&str, f32)], matrix: Option<[f32; 16]>) -> FaceLandmarkerResult {
        FaceLandmarkerResult {
            face_blendshapes: vec![categories
                .iter()
                .map(|(n, s)| Category::new(*n, *s))
                .collect()],
            facial_transformation_matrixes: matrix.into_iter().collect(),
        }
    }

    fn full_face() -> Vec<(String, f32)> {
        (0..60).map(|i| (format!("shape{}", i), i as f32 / 100.0)).collect()
    }

    #[test]
    fn test_sorts_descending_and_forwards() {
        let mut adapter = BlendshapeAdapter::new(RecordingSink::default());
        let r = result(&[("jawOpen", 0.2), ("eyeBlinkLeft", 0.9), ("mouthSmileLeft", 0.5)], None);
        adapter.update_results(Some(&r)).unwrap();

        assert_eq!(&adapter.keys()[..3], &["eyeBlinkLeft", "mouthSmileLeft", "jawOpen"]);
        assert_eq!(&adapter.scores()[..3], &[0.9, 0.5, 0.2]);

        let calls = adapter.sink().calls();
        assert_eq!(calls.len(), 2);
        match &calls[0] {
            Forwarded::Keys(keys) => {
                assert_eq!(keys.len(), BLENDSHAPE_SLOTS);
                assert_eq!(keys[0], "eyeBlinkLeft");
                assert_eq!(keys[3], "");
            }
            other => panic!("expected keys first, got {:?}", other),
        }
        match &calls[1] {
            Forwarded::Values(scores, matrix) => {
                assert_eq!(scores.len(), BLENDSHAPE_SLOTS);
                assert_eq!(matrix.len(), MATRIX_LEN);
            }
            other => panic!("expected values second, got {:?}", other),
        }
    }

    #[test]
    fn test_truncates_to_slot_count() {
        let mut adapter = BlendshapeAdapter::new(RecordingSink::default());
        let face = full_face();
        let refs: Vec<(&str, f32)> = face.iter().map(|(n, s)| (n.as_str(), *s)).collect();
        adapter.update_results(Some(&result(&refs, None))).unwrap();

        assert_eq!(adapter.keys()[0], "shape59");
        assert_eq!(adapter.keys()[51], "shape8");
        assert!(adapter.row(51).unwrap().label == "shape8");
        assert!(adapter.row(52).is_none());
    }

    #[test]
    fn test_ties_keep_input_order() {
        let mut adapter = BlendshapeAdapter::new(RecordingSink::default());
        let r = result(&[("a", 0.5), ("b", 0.5), ("c", 0.7)], None);
        adapter.update_results(Some(&r)).unwrap();
        assert_eq!(&adapter.keys()[..3], &["c", "a", "b"]);
    }

    #[test]
    fn test_short_result_keeps_trailing_slots() {
        let mut adapter = BlendshapeAdapter::new(RecordingSink::default());
        let face = full_face();
        let refs: Vec<(&str, f32)> = face.iter().map(|(n, s)| (n.as_str(), *s)).collect();
        adapter.update_results(Some(&result(&refs, None))).unwrap();

        adapter
            .update_results(Some(&result(&[("jawOpen", 0.3), ("eyeWideLeft", 0.4)], None)))
            .unwrap();

        assert_eq!(adapter.keys()[0], "eyeWideLeft");
        assert_eq!(adapter.keys()[1], "jawOpen");
        // Slots past the new result retain the previous update
        assert_eq!(adapter.keys()[2], "shape57");
        assert!((adapter.scores()[2] - 0.57).abs() < 1e-6);
        // ...but display rows for them are empty
        assert_eq!(
            adapter.row(2).unwrap(),
            RowText {
                label: "--".into(),
                score: "--".into()
            }
        );
    }

    #[test]
    fn test_row_formatting() {
        let mut adapter = BlendshapeAdapter::new(RecordingSink::default());
        assert_eq!(adapter.item_count(), BLENDSHAPE_SLOTS);
        assert_eq!(adapter.row(0).unwrap().label, "--");

        adapter
            .update_results(Some(&result(&[("jawOpen", 0.5678)], None)))
            .unwrap();
        let row = adapter.row(0).unwrap();
        assert_eq!(row.label, "jawOpen");
        assert_eq!(row.score, "0.57");
    }

    #[test]
    fn test_row_ties_round_half_up() {
        let mut adapter = BlendshapeAdapter::new(RecordingSink::default());
        adapter
            .update_results(Some(&result(
                &[("a", 0.125), ("b", 0.375), ("c", 0.625)],
                None,
            )))
            .unwrap();

        let scores: Vec<String> = (0..3).map(|i| adapter.row(i).unwrap().score).collect();
        assert_eq!(scores, vec!["0.63", "0.38", "0.13"]);
    }

    #[test]
    fn test_format_score() {
        assert_eq!(format_score(0.0), "0.00");
        assert_eq!(format_score(1.0), "1.00");
        assert_eq!(format_score(0.5), "0.50");
        assert_eq!(format_score(0.999), "1.00");
        assert_eq!(format_score(0.994), "0.99");
        assert_eq!(format_score(0.005), "0.01");
        assert_eq!(format_score(1e-10), "0.00");
        assert_eq!(format_score(9.995), "10.00");
        assert_eq!(format_score(-0.125), "-0.13");
    }

    #[test]
    fn test_nan_scores_sort_last() {
        let mut adapter = BlendshapeAdapter::new(RecordingSink::default());
        let r = result(&[("nan", f32::NAN), ("low", 0.1), ("high", 0.8)], None);
        adapter.update_results(Some(&r)).unwrap();
        assert_eq!(&adapter.keys()[..3], &["high", "low", "nan"]);
    }

    #[test]
    fn test_missing_result_forwards_nothing() {
        let mut adapter = BlendshapeAdapter::new(RecordingSink::default());
        adapter
            .update_results(Some(&result(&[("jawOpen", 0.5)], None)))
            .unwrap();
        assert_eq!(adapter.sink().calls().len(), 2);

        adapter.update_results(None).unwrap();
        assert_eq!(adapter.sink().calls().len(), 2);
        assert_eq!(adapter.row(0).unwrap().label, "--");
        // Forwarding arrays are untouched
        assert_eq!(adapter.keys()[0], "jawOpen");
    }

    #[test]
    fn test_result_without_face_forwards_nothing() {
        let mut adapter = BlendshapeAdapter::new(RecordingSink::default());
        adapter
            .update_results(Some(&FaceLandmarkerResult::default()))
            .unwrap();
        assert!(adapter.sink().calls().is_empty());
    }

    #[test]
    fn test_matrix_copied_in_full() {
        let mut adapter = BlendshapeAdapter::new(RecordingSink::default());
        let mut m = [0.0f32; 16];
        for (i, v) in m.iter_mut().enumerate() {
            *v = i as f32 + 1.0;
        }
        adapter
            .update_results(Some(&result(&[("jawOpen", 0.5)], Some(m))))
            .unwrap();
        assert_eq!(adapter.matrix(), &m);
        assert_eq!(adapter.matrix()[15], 16.0);
    }

    #[test]
    fn test_empty_matrix_list_keeps_previous() {
        let mut adapter = BlendshapeAdapter::new(RecordingSink::default());
        let m = [2.0f32; 16];
        adapter
            .update_results(Some(&result(&[("jawOpen", 0.5)], Some(m))))
            .unwrap();
        adapter
            .update_results(Some(&result(&[("jawOpen", 0.1)], None)))
            .unwrap();
        assert_eq!(adapter.matrix(), &m);

        match adapter.sink().calls().last() {
            Some(Forwarded::Values(_, matrix)) => assert_eq!(matrix.as_slice(), &m),
            other => panic!("unexpected {:?}", other),
        }
    }
}
