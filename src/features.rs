//! SVMlight / LETOR feature records.
//!
//! Lines look like
//!
//! ```text
//! 2 qid:10032 1:0.056537 2:0.000000 ... 46:0.076923 #docid = GX029-35-5225211
//! ```
//!
//! The leading label and the optional `qid:` token are kept for reporting
//! but never scored. Feature indices are 1-based on the wire and 0-based in
//! the dense buffer.

use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum ParseError {
    #[error("Line {line}: empty record")]
    Empty { line: usize },

    #[error("Line {line}: malformed token '{token}'")]
    MalformedToken { line: usize, token: String },

    #[error("Line {line}: invalid feature index '{index}'")]
    InvalidIndex { line: usize, index: String },

    #[error("Line {line}: invalid feature value '{value}'")]
    InvalidValue { line: usize, value: String },
}

#[derive(Error, Debug, PartialEq)]
pub enum FeatureError {
    #[error("Feature index {index} outside 1..={width}")]
    OutOfRange { index: u32, width: usize },
}

/// One parsed record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SparseRecord {
    pub label: String,
    pub query_id: Option<String>,
    /// `(index, value)` pairs with 1-based indices, in input order
    pub features: Vec<(u32, f32)>,
}

impl SparseRecord {
    /// Build a record from 1-based pairs.
    pub fn from_pairs(pairs: &[(u32, f32)]) -> Self {
        Self {
            features: pairs.to_vec(),
            ..Default::default()
        }
    }
}

/// Parse one line. Returns `Ok(None)` for blank and comment-only lines.
///
/// `line_no` is only used in error messages.
pub fn parse_line(line: &str, line_no: usize) -> Result<Option<SparseRecord>, ParseError> {
    let body = match line.split_once('#') {
        Some((body, _comment)) => body,
        None => line,
    };
    let mut tokens = body.split_whitespace();
    let label = match tokens.next() {
        Some(label) => label.to_string(),
        None => return Ok(None),
    };

    let mut record = SparseRecord {
        label,
        ..Default::default()
    };

    for token in tokens {
        let (key, value) = token.split_once(':').ok_or_else(|| ParseError::MalformedToken {
            line: line_no,
            token: token.to_string(),
        })?;

        if key == "qid" {
            record.query_id = Some(value.to_string());
            continue;
        }

        let index: u32 = key
            .parse()
            .ok()
            .filter(|i| *i > 0)
            .ok_or_else(|| ParseError::InvalidIndex {
                line: line_no,
                index: key.to_string(),
            })?;
        let value: f32 = value.parse().map_err(|_| ParseError::InvalidValue {
            line: line_no,
            value: value.to_string(),
        })?;
        record.features.push((index, value));
    }

    Ok(Some(record))
}

/// Like [`parse_line`] but an all-blank line is an error.
pub fn parse_record(line: &str, line_no: usize) -> Result<SparseRecord, ParseError> {
    parse_line(line, line_no)?.ok_or(ParseError::Empty { line: line_no })
}

/// Scatter `pairs` into `dense`, resetting every slot to `missing` first.
///
/// The reset is what keeps a pooled buffer from carrying values over from
/// the previous request.
pub fn fill_dense(dense: &mut [f32], pairs: &[(u32, f32)], missing: f32) -> Result<(), FeatureError> {
    dense.fill(missing);
    for &(index, value) in pairs {
        let slot = (index as usize)
            .checked_sub(1)
            .filter(|i| *i < dense.len())
            .ok_or(FeatureError::OutOfRange {
                index,
                width: dense.len(),
            })?;
        dense[slot] = value;
    }
    Ok(())
}
