use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineRecord {
    pub line_number: usize,
    pub text: String,
    pub start_offset: usize,
    pub end_offset: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub text: String,
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSpan {
    pub name: String,
    pub text: String,
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShadowLineRecord {
    pub line_number: usize,
    pub adjustment: i32,
    pub full_match: Span,
    pub groups: Vec<GroupSpan>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub line_number: usize,
    pub full_match: Span,
    pub groups: Vec<GroupSpan>,
    pub shadow_lines: Vec<ShadowLineRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlatField {
    pub name: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub spans: Vec<(usize, usize)>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlatRecord {
    pub fields: Vec<FlatField>,
}

impl FlatRecord {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|field| field.name == name)
            .map(|field| field.value.as_str())
    }

    pub fn field_mut(&mut self, name: &str) -> Option<&mut FlatField> {
        self.fields.iter_mut().find(|field| field.name == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|field| field.name.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceEntry {
    pub path: String,
    pub sha256: Option<String>,
    pub status: String,
    pub line_count: usize,
    pub anchor_count: usize,
    pub shadow_line_count: usize,
    pub record_count: usize,
    pub records_path: Option<String>,
    pub matches_path: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExtractPaths {
    pub output_dir: String,
    pub shape_source: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExtractRunManifest {
    pub manifest_version: u32,
    pub run_id: String,
    pub generated_at: String,
    pub shape_regex: String,
    pub paths: ExtractPaths,
    pub sources: Vec<SourceEntry>,
    pub record_total: usize,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShapeSummary {
    pub key: String,
    pub member_count: usize,
    pub first_line: usize,
    pub token_str: String,
    pub regex: String,
    pub document_match_count: usize,
}
