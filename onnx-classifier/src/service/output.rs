use std::io::Write;

use serde::Serialize;

use super::{labels::LabelTable, prepare::softmax, ServiceError};

/// Default number of predictions reported for an image.
pub const DEFAULT_TOP_K: usize = 5;

/// How the predictions of a run are written out.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ReportFormat {
    /// A pretty printed JSON array with the top k predictions.
    #[default]
    Json,
    /// A single line with the most probable class.
    Single,
}

/// A class of the label table together with the confidence the model gave it.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Prediction {
    #[serde(rename = "class")]
    pub label: String,
    /// Probability in percent, rounded to two decimals.
    pub confidence: f64,
    /// Position of the class in the label table.
    pub index: usize,
}

/// The scores of one inference, turned into probabilities and ranked.
#[derive(Clone, Debug)]
pub struct InferenceOutput {
    probabilities: Vec<f64>,
    ranking: Vec<usize>,
    labels: LabelTable,
}

impl InferenceOutput {
    /// Checks the raw scores against the label table and applies the softmax.
    pub fn new(logits: &[f32], labels: LabelTable) -> Result<Self, ServiceError> {
        if logits.is_empty() {
            return Err(ServiceError::EmptyOutput);
        }
        if logits.len() != labels.len() {
            return Err(ServiceError::ShapeMismatch {
                expected: labels.len(),
                actual: logits.len(),
            });
        }

        let probabilities = softmax(logits)?;
        let ranking = rank(&probabilities);
        Ok(Self {
            probabilities,
            ranking,
            labels,
        })
    }

    /// Probability of every class, in label table order.
    pub fn probabilities(&self) -> &[f64] {
        &self.probabilities
    }

    /// The most probable class. On ties the lowest index wins.
    pub fn best(&self) -> Prediction {
        // `new` refuses empty outputs, so the ranking has at least one entry
        self.prediction(self.ranking[0])
    }

    /// The `k` most probable classes, or all of them if there are fewer than `k`.
    pub fn top_k(&self, k: usize) -> Vec<Prediction> {
        self.ranking
            .iter()
            .take(k)
            .map(|&i| self.prediction(i))
            .collect()
    }

    pub fn top_k_class_names(&self, k: usize) -> Vec<String> {
        self.top_k(k)
            .into_iter()
            .map(|prediction| prediction.label)
            .collect()
    }

    /// Writes the predictions in the given format and returns the ones that were written.
    pub fn report<W>(
        &self,
        format: ReportFormat,
        k: usize,
        mut writer: W,
    ) -> Result<Vec<Prediction>, ServiceError>
    where
        W: Write,
    {
        match format {
            ReportFormat::Json => {
                let predictions = self.top_k(k);
                serde_json::to_writer_pretty(&mut writer, &predictions)?;
                writeln!(writer)?;
                Ok(predictions)
            }
            ReportFormat::Single => {
                let best = self.best();
                writeln!(
                    writer,
                    "Prediction: {}, Confidence: {:.2}%",
                    best.label, best.confidence
                )?;
                Ok(vec![best])
            }
        }
    }

    fn prediction(&self, index: usize) -> Prediction {
        Prediction {
            label: self.labels.get(index).unwrap_or_default().to_string(),
            confidence: to_percent(self.probabilities[index]),
            index,
        }
    }
}

/// Class indices sorted by decreasing reported confidence, equal confidences by increasing index.
fn rank(probabilities: &[f64]) -> Vec<usize> {
    let confidences = probabilities.iter().map(|&p| to_percent(p)).collect::<Vec<_>>();
    let mut indices = (0..confidences.len()).collect::<Vec<_>>();
    indices.sort_by(|&a, &b| confidences[b].total_cmp(&confidences[a]).then(a.cmp(&b)));
    indices
}

fn to_percent(probability: f64) -> f64 {
    (probability * 100.0 * 100.0).round() / 100.0
}
