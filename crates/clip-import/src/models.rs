//! Record types read from the source files
//!
//! Each type declares the ordered field names of its source file. The reader
//! maps the n-th `|`-separated value of a line to the n-th name, so the lists
//! below are the file layout.

use serde::de::DeserializeOwned;
use serde::Deserialize;

/// A record type that can be read from a delimited source file
pub trait SourceRecord: DeserializeOwned + Send + Sync + 'static {
    /// Field names in file order
    const FIELD_NAMES: &'static [&'static str];

    /// Entity label used in logs and step names
    const ENTITY: &'static str;
}

/// Form category reference row (`clip_form_category`)
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CategoryRecord {
    pub code: String,
    pub name: Option<String>,
    pub status: Option<String>,
}

impl SourceRecord for CategoryRecord {
    const FIELD_NAMES: &'static [&'static str] = &["code", "name", "status"];
    const ENTITY: &'static str = "category";
}

/// Form metadata row (`clip_form`)
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormRecord {
    pub form_id: i64,
    pub category_code: Option<String>,
    pub form_name: Option<String>,
    pub description: Option<String>,
    pub create_date: Option<String>,
    pub create_user_id: Option<String>,
    pub update_date: Option<String>,
    pub update_user_id: Option<String>,
}

impl SourceRecord for FormRecord {
    const FIELD_NAMES: &'static [&'static str] = &[
        "formId",
        "categoryCode",
        "formName",
        "description",
        "createDate",
        "createUserId",
        "updateDate",
        "updateUserId",
    ];
    const ENTITY: &'static str = "form";
}

/// Form payload row (`clip_form_data`)
///
/// `base64_form_data` comes from the file: base64 text of a UTF-16LE XML
/// document. `form_data` is never read; the transcoding processor fills it
/// with the UTF-8 bytes the destination stores.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormDataRecord {
    /// Only used to identify the record in logs
    pub product_id: Option<String>,
    pub form_id: i64,
    pub base64_form_data: Option<String>,
    #[serde(skip)]
    pub form_data: Option<Vec<u8>>,
    pub create_date: Option<String>,
    pub create_user_id: Option<String>,
    pub update_date: Option<String>,
    pub update_user_id: Option<String>,
}

impl SourceRecord for FormDataRecord {
    const FIELD_NAMES: &'static [&'static str] = &[
        "productId",
        "formId",
        "base64FormData",
        "createDate",
        "createUserId",
        "updateDate",
        "updateUserId",
    ];
    const ENTITY: &'static str = "form_data";
}
