//! Raw YAML shape of a descriptor source, before validation.

use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(super) struct RawInterface {
    pub name: Option<String>,
    #[serde(rename = "class")]
    pub class_name: Option<String>,
    pub library: Option<String>,
    #[serde(default)]
    pub prefix: RawPrefix,
    pub convention: Option<String>,
    pub binding: Option<String>,
    pub number: Option<u32>,
    #[serde(default)]
    pub documentation: String,
    #[serde(default)]
    pub types: Vec<RawType>,
    #[serde(default)]
    pub constants: Vec<RawConstant>,
    #[serde(default)]
    pub enums: Vec<RawEnumExtension>,
    #[serde(default)]
    pub functions: Vec<RawFunction>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(super) struct RawPrefix {
    #[serde(default)]
    pub constant: String,
    #[serde(default)]
    pub function: String,
}

/// Integer-or-text scalar; quoted hex literals keep their spelling.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(super) enum RawScalar {
    Int(i64),
    Text(String),
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(super) struct RawType {
    pub name: String,
    pub kind: String,
    #[serde(default)]
    pub doc: String,
    #[serde(default)]
    pub members: Vec<RawMember>,
    #[serde(default)]
    pub values: Vec<RawEnumValue>,
    pub dispatchable: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(super) struct RawMember {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    pub count: Option<usize>,
    #[serde(default)]
    pub doc: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(super) struct RawEnumValue {
    pub name: String,
    pub value: RawScalar,
    #[serde(default)]
    pub doc: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(super) struct RawConstant {
    pub name: String,
    #[serde(default)]
    pub doc: String,
    #[serde(rename = "type")]
    pub ty: Option<String>,
    pub kind: Option<String>,
    pub int: Option<RawScalar>,
    pub string: Option<String>,
    pub expr: Option<String>,
    #[serde(rename = "ref")]
    pub reference: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(super) struct RawEnumExtension {
    pub name: String,
    pub extends: String,
    #[serde(default)]
    pub doc: String,
    pub value: Option<RawScalar>,
    pub offset: Option<u32>,
    #[serde(default)]
    pub negative: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(super) struct RawFunction {
    pub name: String,
    pub returns: Option<String>,
    #[serde(default)]
    pub doc: String,
    pub return_doc: Option<String>,
    #[serde(default)]
    pub params: Vec<RawParam>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(super) struct RawParam {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(default)]
    pub doc: String,
    #[serde(default)]
    pub modifiers: Vec<String>,
    pub length_of: Option<String>,
    pub length: Option<String>,
    pub check: Option<u64>,
    #[serde(default)]
    pub returned_length: bool,
    #[serde(default)]
    pub includes_nul: bool,
}
