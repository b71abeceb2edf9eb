use std::collections::HashMap;

use ndarray::{Array2, ArrayView2, Axis};

use crate::error::{Error, Result};

/// Encode class labels to one-hot rows and decode them back.
#[derive(Debug, Clone, PartialEq)]
pub struct OneHotEncoder {
    label_to_id: HashMap<String, usize>,
    id_to_label: Vec<String>,
}

impl OneHotEncoder {
    /// Record the class vocabulary. Labels must be unique.
    pub fn new<L: Into<String>>(label_kinds: impl IntoIterator<Item = L>) -> Result<Self> {
        let id_to_label: Vec<String> = label_kinds.into_iter().map(Into::into).collect();
        let label_to_id: HashMap<String, usize> = id_to_label
            .iter()
            .cloned()
            .enumerate()
            .map(|(id, label)| (label, id))
            .collect();
        if label_to_id.len() != id_to_label.len() {
            return Err(Error::Configuration(format!(
                "class labels must be unique, got {id_to_label:?}"
            )));
        }
        Ok(Self {
            label_to_id,
            id_to_label,
        })
    }

    pub fn classes(&self) -> &[String] {
        &self.id_to_label
    }

    pub fn len(&self) -> usize {
        self.id_to_label.len()
    }

    pub fn is_empty(&self) -> bool {
        self.id_to_label.is_empty()
    }

    pub fn id(&self, label: &str) -> Result<usize> {
        self.label_to_id
            .get(label)
            .copied()
            .ok_or_else(|| Error::LabelMismatch(format!("unknown class label {label:?}")))
    }

    /// Encode labels to a `(n_data, n_classes)` matrix.
    pub fn encode<S: AsRef<str>>(&self, labels: &[S]) -> Result<Array2<f64>> {
        let mut one_hot = Array2::zeros((labels.len(), self.len()));
        for (row, label) in labels.iter().enumerate() {
            one_hot[[row, self.id(label.as_ref())?]] = 1.0;
        }
        Ok(one_hot)
    }

    /// Decode rows to labels by taking the argmax of each row.
    pub fn decode(&self, one_hot_vecs: ArrayView2<f64>) -> Vec<String> {
        one_hot_vecs
            .lanes(Axis(1))
            .into_iter()
            .map(|one_hot| {
                one_hot
                    .iter()
                    .enumerate()
                    .fold(
                        (0, f64::NEG_INFINITY),
                        |(max_index, max_elem), (index, &one_hot_elem)| {
                            if one_hot_elem > max_elem {
                                (index, one_hot_elem)
                            } else {
                                (max_index, max_elem)
                            }
                        },
                    )
                    .0
            })
            .map(|id| self.id_to_label[id].clone())
            .collect()
    }
}
