//! Feature schemas the two classifiers were trained on.
//!
//! Column order is part of the schema. A classifier scored against columns in
//! any other order produces silently wrong probabilities, so schemas are
//! compared as a whole and never patched column by column.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A named, versioned, ordered list of feature columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureSchema {
    pub name: &'static str,
    pub version: u32,
    pub columns: &'static [&'static str],
}

impl FeatureSchema {
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    /// Compare against a schema declared by a model artifact.
    ///
    /// Returns a description of the first difference found.
    pub fn check(&self, declared: &DeclaredSchema) -> Result<(), String> {
        if declared.name != self.name {
            return Err(format!(
                "schema name '{}' does not match expected '{}'",
                declared.name, self.name
            ));
        }
        if declared.version != self.version {
            return Err(format!(
                "schema {} version {} does not match expected version {}",
                self.name, declared.version, self.version
            ));
        }
        if declared.columns.len() != self.columns.len() {
            return Err(format!(
                "schema {} declares {} columns, expected {}",
                self.name,
                declared.columns.len(),
                self.columns.len()
            ));
        }
        if let Some((pos, (got, want))) = declared
            .columns
            .iter()
            .zip(self.columns.iter())
            .enumerate()
            .find(|(_, (got, want))| got.as_str() != **want)
        {
            return Err(format!(
                "schema {} column {} is '{}', expected '{}'",
                self.name, pos, got, want
            ));
        }
        Ok(())
    }
}

impl fmt::Display for FeatureSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/v{} ({} columns)", self.name, self.version, self.columns.len())
    }
}

/// Schema sidecar shipped next to a model artifact (`<artifact>.schema.json`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeclaredSchema {
    pub name: String,
    pub version: u32,
    pub columns: Vec<String>,
    /// Column of the probability tensor holding the positive class
    #[serde(default)]
    pub positive_class_index: Option<usize>,
}

impl From<&FeatureSchema> for DeclaredSchema {
    fn from(schema: &FeatureSchema) -> Self {
        Self {
            name: schema.name.to_string(),
            version: schema.version,
            columns: schema.columns.iter().map(|c| c.to_string()).collect(),
            positive_class_index: Some(1),
        }
    }
}

pub const SVM_SCHEMA: FeatureSchema = FeatureSchema {
    name: "svm",
    version: 1,
    columns: &[
        "eSTR",
        "TAD",
        "location_Middle",
        "location_First",
        "location_Last",
        "region_exon",
        "UTR_3",
        "UTR_5",
        "promoter",
        "tissue_simple_Nervous_System",
        "tissue_simple_No_expression",
        "tissue_simple_Other",
        "gerp",
        "loeuf",
        "pLi",
        "gc_content",
        "gene_distance",
        "per_c",
        "per_t",
        "per_a",
        "per_g",
    ],
};

pub const XGB_SCHEMA: FeatureSchema = FeatureSchema {
    name: "xgb",
    version: 1,
    columns: &[
        "RAD21",
        "opReg",
        "location_Middle",
        "location_First",
        "location_Last",
        "region_intron",
        "region_exon",
        "UTR_5",
        "promoter",
        "tissue_simple_Nervous_System",
        "tissue_simple_Other",
        "tissue_simple_No_expression",
        "gerp",
        "eSh0",
        "eTr2",
        "eTr3",
        "eS6",
        "eS",
        "eX1R",
        "eX2",
        "eX5",
    ],
};

/// Union of both schemas' columns, first-seen order.
pub fn all_feature_columns() -> Vec<&'static str> {
    let mut columns: Vec<&'static str> = Vec::new();
    for column in SVM_SCHEMA.columns.iter().chain(XGB_SCHEMA.columns.iter()) {
        if !columns.contains(column) {
            columns.push(column);
        }
    }
    columns
}
